use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;
use tracing::debug;

use crate::record::RecordContent;

static LABEL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span.title").unwrap());

const TITLE_LABEL: &str = "Title";
const DATE_LABEL: &str = "Vote date";
const RESOLUTION_LABEL: &str = "Resolution";
const VOTING_LABEL: &str = "Vote";

pub const CONSENSUS: &str = "Consensus";

const TITLE_ARTIFACTS: &[char] = &['\u{0301}', '\u{0302}'];
const DOTTED_I: &[&str] = &["Ä°", "\u{0130}"];
const BALLOT_PREFIXES: &[&str] = &["A ", "Y ", "N "];
const UNKNOWN_BALLOT_PREFIX: &str = "X ";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("record page has no {0} field")]
    MissingField(&'static str),
}

/// Read title, date, resolution and voting summary from a record page.
pub fn parse_record(html: &str) -> Result<RecordContent, ExtractError> {
    let doc = Html::parse_document(html);

    let title = field_value(&doc, TITLE_LABEL)
        .map(|v| strip_title_artifacts(&field_text(v)))
        .ok_or(ExtractError::MissingField("title"))?;
    let date = field_value(&doc, DATE_LABEL)
        .map(field_text)
        .ok_or(ExtractError::MissingField("date"))?;
    let resolution = field_value(&doc, RESOLUTION_LABEL)
        .map(field_text)
        .unwrap_or_default();
    let voting_summary = field_value(&doc, VOTING_LABEL)
        .map(voting_summary)
        .unwrap_or_else(|| CONSENSUS.to_string());

    Ok(RecordContent {
        title,
        date,
        resolution,
        voting_summary,
    })
}

/// The element following the `span.title` label whose trimmed text is exactly `label`.
fn field_value<'a>(doc: &'a Html, label: &str) -> Option<ElementRef<'a>> {
    let label_el = doc
        .select(&LABEL_SEL)
        .find(|el| el.text().collect::<String>().trim() == label)?;
    label_el.next_siblings().find_map(ElementRef::wrap)
}

/// Text of `el` split at `<br>` in document order, each line trimmed, blank lines dropped.
fn field_lines(el: ElementRef<'_>) -> Vec<String> {
    let mut text = String::new();
    for node in el.descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if e.name() == "br" => text.push('\n'),
            _ => {}
        }
    }

    let lines: Vec<String> = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    let blank = text.split('\n').count() - lines.len();
    if blank > 0 {
        debug!("Dropped {} blank line(s) from <{}>", blank, el.value().name());
    }
    lines
}

fn field_text(el: ElementRef<'_>) -> String {
    field_lines(el).join("\n")
}

fn voting_summary(el: ElementRef<'_>) -> String {
    field_lines(el)
        .iter()
        .map(|line| normalize_ballot_line(line))
        .collect::<Vec<_>>()
        .join(";")
}

pub fn strip_title_artifacts(title: &str) -> String {
    title.chars().filter(|c| !TITLE_ARTIFACTS.contains(c)).collect()
}

pub fn repair_dotted_i(line: &str) -> String {
    DOTTED_I
        .iter()
        .fold(line.to_string(), |acc, lookalike| acc.replace(lookalike, "I"))
}

/// Repair the line and make sure it starts with a ballot position, tagging it `X ` otherwise.
pub fn normalize_ballot_line(line: &str) -> String {
    let line = repair_dotted_i(line);
    if BALLOT_PREFIXES.iter().any(|p| line.starts_with(p)) {
        line
    } else {
        format!("{}{}", UNKNOWN_BALLOT_PREFIX, line)
    }
}

// ── Tests ──
