use std::time::Instant;

use clap::Parser;
use tracing::info;

use undl_votes::cli::PeriodArgs;
use undl_votes::config::Settings;
use undl_votes::crawl::{Crawler, SubjectSource};
use undl_votes::fetcher::HttpFetcher;

#[derive(Parser)]
#[command(
    name = "undl_votes",
    about = "Harvest UN Digital Library voting records into one table per year"
)]
struct Cli {
    #[command(flatten)]
    periods: PeriodArgs,
    /// Crawl each body and year as one unfiltered query instead of one query per subject
    #[arg(long)]
    no_subjects: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    undl_votes::init_tracing();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    let periods = cli
        .periods
        .resolve(settings.first_period..=settings.last_period())?;

    let subjects = match (&settings.subjects_file, cli.no_subjects) {
        (_, true) => SubjectSource::Disabled,
        (Some(path), false) => SubjectSource::from_file(path)?,
        (None, false) => SubjectSource::Facets,
    };
    info!(
        "Crawling {}..={} into {} ({:?})",
        periods.start(),
        periods.end(),
        settings.data_dir.display(),
        subjects
    );

    let fetcher = HttpFetcher::new(&settings)?;
    let crawler = Crawler::new(fetcher, settings, subjects)?;
    let summaries = crawler.crawl_range(periods).await?;

    for s in &summaries {
        println!(
            "{}: {} new, {} updated, {} total ({} cached) -> {}",
            s.period,
            s.counts.created,
            s.counts.updated,
            s.total,
            s.cached,
            s.table.display()
        );
        for (id, reason) in &s.flush.skipped {
            println!("  not saved: {} ({})", id, reason);
        }
    }
    let created: usize = summaries.iter().map(|s| s.counts.created).sum();
    println!("Total crawled: {}", created);

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
