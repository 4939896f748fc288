use anyhow::bail;
use clap::Parser;

use undl_votes::cli::PeriodArgs;
use undl_votes::config::Settings;
use undl_votes::verify;

#[derive(Parser)]
#[command(name = "verify", about = "Check per-year tables against expected record counts")]
struct Cli {
    #[command(flatten)]
    periods: PeriodArgs,
}

fn main() -> anyhow::Result<()> {
    undl_votes::init_tracing();

    let cli = Cli::parse();
    let settings = Settings::load()?;
    let mut expected = verify::load_expected_counts(&settings.expected_counts_file)?;

    let (Some(&first), Some(&last)) = (expected.keys().next(), expected.keys().next_back()) else {
        bail!("No expected counts in {}", settings.expected_counts_file.display());
    };
    let periods = cli.periods.resolve(first..=last)?;
    expected.retain(|period, _| periods.contains(period));

    let checks = verify::verify_all(&settings, &expected);
    let mut failed = 0usize;
    for check in &checks {
        for line in check.errors() {
            println!("{}", line);
        }
        if !check.passed() {
            failed += 1;
        }
    }

    if failed == 0 {
        println!("Verification completed successfully ({} years)", checks.len());
        Ok(())
    } else {
        println!("Verification failed!");
        bail!("{} of {} years failed verification", failed, checks.len())
    }
}
