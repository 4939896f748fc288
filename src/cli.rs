use std::ops::RangeInclusive;

use anyhow::{bail, Result};
use clap::Args;

/// Positional year range shared by every binary: none, one year, or an inclusive range.
#[derive(Debug, Clone, Args)]
pub struct PeriodArgs {
    /// First year, or the only year when END is omitted
    pub start: Option<i32>,
    /// Last year, inclusive
    pub end: Option<i32>,
}

impl PeriodArgs {
    pub fn resolve(&self, default: RangeInclusive<i32>) -> Result<RangeInclusive<i32>> {
        match (self.start, self.end) {
            (None, _) => Ok(default),
            (Some(start), None) => Ok(start..=start),
            (Some(start), Some(end)) if start <= end => Ok(start..=end),
            (Some(start), Some(end)) => bail!("Start year {} is after end year {}", start, end),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        periods: PeriodArgs,
        #[arg(long)]
        no_subjects: bool,
    }

    fn resolve(args: &[&str]) -> Result<RangeInclusive<i32>> {
        let cli = Cli::try_parse_from(std::iter::once("undl_votes").chain(args.iter().copied()))?;
        cli.periods.resolve(1946..=2024)
    }

    #[test]
    fn no_args_is_default_range() {
        assert_eq!(resolve(&[]).unwrap(), 1946..=2024);
    }

    #[test]
    fn one_arg_is_single_year() {
        assert_eq!(resolve(&["1999"]).unwrap(), 1999..=1999);
    }

    #[test]
    fn two_args_inclusive() {
        assert_eq!(resolve(&["1990", "1995"]).unwrap(), 1990..=1995);
        assert!(resolve(&["1995", "1990"]).is_err());
    }

    #[test]
    fn trailing_flag() {
        let cli = Cli::try_parse_from(["undl_votes", "2005", "--no-subjects"]).unwrap();
        assert!(cli.no_subjects);
        assert_eq!(cli.periods.resolve(1946..=2024).unwrap(), 2005..=2005);
    }

    #[test]
    fn non_numeric_rejected() {
        assert!(resolve(&["nineteen"]).is_err());
        assert!(resolve(&["1990", "1991", "1992"]).is_err());
    }
}
