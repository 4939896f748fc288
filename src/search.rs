use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

static RECORD_ID_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("abbr.unapi-id").unwrap());
static NEXT_PAGE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(r#"img[alt="next"]"#).unwrap());
static INPUT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("input[id]").unwrap());
static SUBJECT_CHECKBOX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^fct__8").unwrap());

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPage {
    /// Presentation order, duplicates kept.
    pub record_ids: Vec<String>,
    pub has_next_page: bool,
}

/// Record ids and the next page marker. A page with no results is not an error.
pub fn parse_search_page(html: &str) -> SearchPage {
    let doc = Html::parse_document(html);

    let record_ids = doc
        .select(&RECORD_ID_SEL)
        .filter_map(|abbr| abbr.value().attr("title"))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    let has_next_page = doc.select(&NEXT_PAGE_SEL).next().is_some();

    SearchPage {
        record_ids,
        has_next_page,
    }
}

/// Subject facets offered for the search, in page order.
pub fn parse_subjects(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);

    doc.select(&INPUT_SEL)
        .filter(|input| {
            input
                .value()
                .id()
                .is_some_and(|id| SUBJECT_CHECKBOX_RE.is_match(id))
        })
        .filter_map(|input| input.value().attr("aria-label"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Tests ──
