use clap::Parser;

use undl_votes::cli::PeriodArgs;
use undl_votes::config::Settings;
use undl_votes::merge;

#[derive(Parser)]
#[command(name = "merge", about = "Concatenate per-year tables into one records table")]
struct Cli {
    #[command(flatten)]
    periods: PeriodArgs,
}

fn main() -> anyhow::Result<()> {
    undl_votes::init_tracing();

    let cli = Cli::parse();
    let settings = Settings::load()?;
    let periods = cli
        .periods
        .resolve(settings.first_period..=settings.last_period())?;

    println!("Merging {}..={}...", periods.start(), periods.end());
    let summary = merge::merge_tables(&settings, periods)?;

    if !summary.missing.is_empty() {
        println!("Missing years: {:?}", summary.missing);
    }
    println!(
        "Saved {} records from {} years to {}",
        summary.rows,
        summary.merged.len(),
        summary.path.display()
    );
    Ok(())
}
