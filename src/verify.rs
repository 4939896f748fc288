use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use tracing::warn;

use crate::config::Settings;
use crate::table;

const PLACEHOLDERS: &[&str] = &["", "None"];

/// Outcome of checking one period's table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodCheck {
    pub period: i32,
    pub expected: usize,
    /// `None` when the table file is missing.
    pub actual: Option<usize>,
    pub standard_header: bool,
    /// Ids of rows with an empty or placeholder cell, in file order.
    pub incomplete: Vec<String>,
    /// Set when the table exists but could not be read.
    pub error: Option<String>,
}

impl PeriodCheck {
    pub fn passed(&self) -> bool {
        self.error.is_none()
            && self.actual == Some(self.expected)
            && self.standard_header
            && self.incomplete.is_empty()
    }

    /// Human-readable problems, one per line.
    pub fn errors(&self) -> Vec<String> {
        if let Some(error) = &self.error {
            return vec![format!("[Error][{}] Unreadable record file: {}", self.period, error)];
        }
        let Some(actual) = self.actual else {
            return vec![format!("[Error][{}] Record file does not exist", self.period)];
        };

        let mut errors = Vec::new();
        if !self.standard_header {
            errors.push(format!("[Error][{}] Unexpected table header", self.period));
        }
        if actual != self.expected {
            errors.push(format!(
                "[Error][{}] Wrong record count: [Expected {}, Actual {}]",
                self.period, self.expected, actual
            ));
        }
        for id in &self.incomplete {
            errors.push(format!("[Error][{}] Missing value for record {}", self.period, id));
        }
        errors
    }
}

/// Parse `<year> <count>` lines; blank lines are ignored.
pub fn parse_expected_counts(text: &str) -> Result<BTreeMap<i32, usize>> {
    let mut counts = BTreeMap::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (Some(year), Some(count), None) = (parts.next(), parts.next(), parts.next()) else {
            bail!("line {}: expected \"<year> <count>\", got {:?}", n + 1, line);
        };
        let year: i32 = year.parse().with_context(|| format!("line {}: bad year", n + 1))?;
        let count: usize = count.parse().with_context(|| format!("line {}: bad count", n + 1))?;
        counts.insert(year, count);
    }
    Ok(counts)
}

pub fn load_expected_counts(path: &Path) -> Result<BTreeMap<i32, usize>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read expected counts {}", path.display()))?;
    parse_expected_counts(&text).with_context(|| format!("In {}", path.display()))
}

pub fn verify_period(path: &Path, period: i32, expected: usize) -> Result<PeriodCheck> {
    let Some(table) = table::read_table(path)? else {
        return Ok(PeriodCheck {
            period,
            expected,
            actual: None,
            standard_header: false,
            incomplete: Vec::new(),
            error: None,
        });
    };

    let incomplete = table
        .rows
        .iter()
        .filter(|row| {
            row.len() != table.header.len()
                || row.iter().any(|cell| PLACEHOLDERS.contains(&cell.as_str()))
        })
        .map(|row| row.first().cloned().unwrap_or_default())
        .collect();

    Ok(PeriodCheck {
        period,
        expected,
        actual: Some(table.rows.len()),
        standard_header: table.has_standard_header(),
        incomplete,
        error: None,
    })
}

/// Check every period that has a baseline, independently and in parallel.
/// Results come back in ascending period order; a table that fails to read
/// fails only its own period.
pub fn verify_all(settings: &Settings, expected: &BTreeMap<i32, usize>) -> Vec<PeriodCheck> {
    expected
        .par_iter()
        .map(|(&period, &count)| {
            verify_period(&settings.period_table(period), period, count).unwrap_or_else(|e| {
                warn!("Could not check year {}: {:#}", period, e);
                PeriodCheck {
                    period,
                    expected: count,
                    actual: None,
                    standard_header: false,
                    incomplete: Vec::new(),
                    error: Some(format!("{:#}", e)),
                }
            })
        })
        .collect()
}

// ── Tests ──
