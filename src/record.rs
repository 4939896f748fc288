use std::collections::BTreeSet;

/// Fields read from a record's own page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordContent {
    pub title: String,
    pub date: String,
    pub resolution: String,
    pub voting_summary: String,
}

/// One harvested voting item. Everything except `subjects` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub governing_body: String,
    pub title: String,
    pub date: String,
    pub resolution: String,
    pub voting_summary: String,
    pub subjects: BTreeSet<String>,
}

impl Record {
    pub fn new(id: &str, governing_body: &str, subject: Option<&str>, content: RecordContent) -> Self {
        Record {
            id: id.to_string(),
            governing_body: governing_body.to_string(),
            title: content.title,
            date: content.date,
            resolution: content.resolution,
            voting_summary: content.voting_summary,
            subjects: subject.map(str::to_string).into_iter().collect(),
        }
    }

    /// Adds `subject` to the record; false if it was already there.
    pub fn add_subject(&mut self, subject: &str) -> bool {
        if self.subjects.contains(subject) {
            return false;
        }
        self.subjects.insert(subject.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoverningBody {
    GeneralAssembly,
    SecurityCouncil,
}

impl GoverningBody {
    /// Crawl order.
    pub const ALL: [GoverningBody; 2] = [GoverningBody::GeneralAssembly, GoverningBody::SecurityCouncil];

    pub fn label(self) -> &'static str {
        match self {
            GoverningBody::GeneralAssembly => "General Assembly",
            GoverningBody::SecurityCouncil => "Security Council",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteFilter {
    Vote,
    WithoutVote,
}

impl VoteFilter {
    pub fn label(self) -> &'static str {
        match self {
            VoteFilter::Vote => "Vote",
            VoteFilter::WithoutVote => "Without Vote",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Vote" => Some(VoteFilter::Vote),
            "Without Vote" => Some(VoteFilter::WithoutVote),
            _ => None,
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> RecordContent {
        RecordContent {
            title: "Question of Palestine".to_string(),
            date: "1999-12-01".to_string(),
            resolution: "A/RES/54/42".to_string(),
            voting_summary: "Y ALBANIA;N ISRAEL".to_string(),
        }
    }

    #[test]
    fn new_with_subject() {
        let r = Record::new("123", "General Assembly", Some("PALESTINE QUESTION"), content());
        assert_eq!(r.subjects.len(), 1);
        assert!(r.subjects.contains("PALESTINE QUESTION"));
        assert_eq!(r.governing_body, "General Assembly");
    }

    #[test]
    fn new_without_subject() {
        let r = Record::new("123", "", None, content());
        assert!(r.subjects.is_empty());
    }

    #[test]
    fn add_subject_reports_change() {
        let mut r = Record::new("123", "General Assembly", Some("A"), content());
        assert!(r.add_subject("B"));
        assert!(!r.add_subject("A"));
        assert!(!r.add_subject("B"));
        assert_eq!(r.subjects.len(), 2);
    }

    #[test]
    fn vote_filter_round_trips_label() {
        for f in [VoteFilter::Vote, VoteFilter::WithoutVote] {
            assert_eq!(VoteFilter::from_label(f.label()), Some(f));
        }
        assert_eq!(VoteFilter::from_label("Abstain"), None);
    }
}
