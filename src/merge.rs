use std::io::Write;
use std::ops::RangeInclusive;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::Settings;
use crate::table::{self, Table};

#[derive(Debug)]
pub struct MergeSummary {
    pub path: PathBuf,
    pub merged: Vec<i32>,
    pub missing: Vec<i32>,
    pub rows: usize,
}

/// Concatenate the per-period tables in ascending period order into the merged table.
pub fn merge_tables(settings: &Settings, periods: RangeInclusive<i32>) -> Result<MergeSummary> {
    if !settings.data_dir.is_dir() {
        bail!("The data folder {} does not exist", settings.data_dir.display());
    }

    let loaded: Vec<(i32, Option<Table>)> = periods
        .into_par_iter()
        .map(|period| -> Result<(i32, Option<Table>)> {
            Ok((period, table::read_table(&settings.period_table(period))?))
        })
        .collect::<Result<_>>()?;

    let path = settings.merged_table();
    let mut out = table::create(&path)?;
    let mut summary = MergeSummary {
        path: path.clone(),
        merged: Vec::new(),
        missing: Vec::new(),
        rows: 0,
    };

    for (period, table) in loaded {
        let Some(table) = table else {
            warn!("Records file for year {} is missing", period);
            summary.missing.push(period);
            continue;
        };
        if !table.has_standard_header() {
            bail!(
                "Records file for year {} has columns {:?}; cannot merge",
                period,
                table.header
            );
        }

        info!("Loading records for year {}...", period);
        for row in &table.rows {
            table::write_row(&mut out, row)?;
        }
        summary.rows += table.rows.len();
        summary.merged.push(period);
    }

    out.flush().with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(summary)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    const HEADER: &str = "ID,Body,Title,Date,Resolution,Subjects,Voting Data\n";

    #[test]
    fn concatenates_in_period_order() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::for_tests(dir.path());
        std::fs::write(
            settings.period_table(2001),
            format!("{}\"20\",\"General Assembly\",\"B\",\"D\",\"R\",\"{{}}\",\"Consensus\"\n", HEADER),
        )
        .unwrap();
        std::fs::write(
            settings.period_table(2000),
            format!("{}\"10\",\"Security Council\",\"A, \"\"quoted\"\"\",\"D\",\"R\",\"{{'X'}}\",\"Y CHAD\"\n", HEADER),
        )
        .unwrap();

        let summary = merge_tables(&settings, 2000..=2002).unwrap();
        assert_eq!(summary.merged, [2000, 2001]);
        assert_eq!(summary.missing, [2002]);
        assert_eq!(summary.rows, 2);

        let merged = Dataset::preload(&summary.path).unwrap();
        let ids: Vec<&str> = merged.records().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["10", "20"]);
        assert_eq!(merged.get("10").unwrap().title, "A, \"quoted\"");

        let text = std::fs::read_to_string(&summary.path).unwrap();
        assert!(text.starts_with(HEADER));
        assert!(text.find("\"10\"").unwrap() < text.find("\"20\"").unwrap());
    }

    #[test]
    fn foreign_columns_abort() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::for_tests(dir.path());
        std::fs::write(settings.period_table(2000), "ID,Title\n\"1\",\"T\"\n").unwrap();
        assert!(merge_tables(&settings, 2000..=2000).is_err());
    }

    #[test]
    fn missing_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::for_tests(&dir.path().join("absent"));
        assert!(merge_tables(&settings, 2000..=2000).is_err());
    }
}
