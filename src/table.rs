use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::mem::take;
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::warn;

use crate::config::RECORD_TABLE_HEADER;
use crate::record::Record;

const SEP: char = ',';

/// A record that cannot be written as a row.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("record has no identifier")]
    MissingId,
    #[error("{field} contains a NUL byte")]
    NulByte { field: &'static str },
}

/// A persisted row that cannot be read back into a record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("expected 7 columns, found {0}")]
    ColumnCount(usize),
    #[error("malformed subject set {0:?}")]
    Subjects(String),
}

/// Raw contents of a persisted table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn has_standard_header(&self) -> bool {
        self.header.iter().map(String::as_str).eq(RECORD_TABLE_HEADER)
    }
}

/// Outcome of writing a table; rows that could not be serialised are listed, not fatal.
#[derive(Debug, Default)]
pub struct FlushReport {
    pub written: usize,
    pub skipped: Vec<(String, RowError)>,
}

/* ---------------- Files ---------------- */

/// Read a table; `Ok(None)` when the file does not exist.
pub fn read_table(path: &Path) -> Result<Option<Table>> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };

    let mut rows = parse_rows(&text);
    if rows.is_empty() {
        return Ok(Some(Table { header: Vec::new(), rows }));
    }
    let header = rows.remove(0);
    Ok(Some(Table { header, rows }))
}

/// Overwrite `path` with the header and one row per record.
pub fn write_records<'a>(path: &Path, records: impl IntoIterator<Item = &'a Record>) -> Result<FlushReport> {
    let mut out = create(path)?;
    let mut report = FlushReport::default();

    for record in records {
        match to_row(record) {
            Ok(cells) => {
                write_row(&mut out, &cells)?;
                report.written += 1;
            }
            Err(e) => {
                warn!("Skipping record {:?}: {}", record.id, e);
                report.skipped.push((record.id.clone(), e));
            }
        }
    }

    out.flush().with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(report)
}

/// Ensure the parent directory, truncate the file and write the header.
pub fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{}", RECORD_TABLE_HEADER.join(","))?;
    Ok(out)
}

/* ---------------- Rows ---------------- */

pub fn to_row(record: &Record) -> Result<Vec<String>, RowError> {
    if record.id.trim().is_empty() {
        return Err(RowError::MissingId);
    }

    let cells = [
        ("ID", record.id.clone()),
        ("Body", record.governing_body.clone()),
        ("Title", record.title.clone()),
        ("Date", record.date.clone()),
        ("Resolution", record.resolution.clone()),
        ("Subjects", format_subjects(&record.subjects)),
        ("Voting Data", record.voting_summary.clone()),
    ];
    if let Some((field, _)) = cells.iter().find(|(_, v)| v.contains('\0')) {
        return Err(RowError::NulByte { field: *field });
    }

    Ok(cells.into_iter().map(|(_, v)| v).collect())
}

pub fn from_row(cells: &[String]) -> Result<Record, TableError> {
    let [id, body, title, date, resolution, subjects, voting] = cells else {
        return Err(TableError::ColumnCount(cells.len()));
    };

    Ok(Record {
        id: id.clone(),
        governing_body: body.clone(),
        title: title.clone(),
        date: date.clone(),
        resolution: resolution.clone(),
        voting_summary: voting.clone(),
        subjects: parse_subjects(subjects)?,
    })
}

/// Write one row with every cell quoted and embedded quotes doubled.
pub fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first { write!(w, "{}", SEP)?; } else { first = false; }
        write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
    }
    writeln!(w)
}

/// Quote-aware CSV parser; quoted cells may span lines.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if matches!(chars.peek(), Some('"')) {
                        chars.next(); // doubled quote
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            c if c == SEP && !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) { chars.next(); }
                row.push(take(&mut field));
                push_row(&mut rows, take(&mut row));
            }
            _ => field.push(ch),
        }
    }

    // Trailing row without a final newline, or with unterminated quotes.
    row.push(field);
    push_row(&mut rows, row);

    rows
}

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    let blank = row.len() == 1 && row[0].is_empty();
    if !blank {
        rows.push(row);
    }
}

/* ---------------- Subject set literal ---------------- */

/// `{'A', 'B'}`; members sorted, `\` and `'` escaped, `{}` when empty.
pub fn format_subjects(subjects: &BTreeSet<String>) -> String {
    let members: Vec<String> = subjects
        .iter()
        .map(|s| format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")))
        .collect();
    format!("{{{}}}", members.join(", "))
}

/// Inverse of [`format_subjects`]; also accepts `set()` and double-quoted members.
pub fn parse_subjects(literal: &str) -> Result<BTreeSet<String>, TableError> {
    let malformed = || TableError::Subjects(literal.to_string());
    let trimmed = literal.trim();
    if trimmed.is_empty() || trimmed == "set()" {
        return Ok(BTreeSet::new());
    }
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(malformed)?;

    let mut subjects = BTreeSet::new();
    let mut chars = inner.chars().peekable();
    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        let quote = match chars.next() {
            None => break,
            Some(q @ ('\'' | '"')) => q,
            Some(_) => return Err(malformed()),
        };

        let mut member = String::new();
        loop {
            match chars.next() {
                None => return Err(malformed()),
                Some('\\') => member.push(chars.next().ok_or_else(malformed)?),
                Some(c) if c == quote => break,
                Some(c) => member.push(c),
            }
        }
        subjects.insert(member);

        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some(',') => {}
            Some(_) => return Err(malformed()),
        }
    }

    Ok(subjects)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn record() -> Record {
        Record {
            id: "3801234".to_string(),
            governing_body: "General Assembly".to_string(),
            title: "The \"Question\" of Palestine,\nrevisited".to_string(),
            date: "1999-12-01".to_string(),
            resolution: String::new(),
            voting_summary: "Y ALBANIA;N ISRAEL;X COMOROS".to_string(),
            subjects: set(&["PALESTINE QUESTION", "CÔTE D'IVOIRE", r"BACK\SLASH"]),
        }
    }

    #[test]
    fn row_survives_a_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/records_1999.csv");
        let original = record();

        let report = write_records(&path, [&original]).unwrap();
        assert_eq!(report.written, 1);

        let table = read_table(&path).unwrap().unwrap();
        assert!(table.has_standard_header());
        assert_eq!(table.rows.len(), 1);
        assert_eq!(from_row(&table.rows[0]).unwrap(), original);
    }

    #[test]
    fn quotes_are_doubled() {
        let mut buf = Vec::new();
        write_row(&mut buf, &["a\"b".to_string(), "c,d".to_string()]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "\"a\"\"b\",\"c,d\"\n");
    }

    #[test]
    fn header_is_fixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        write_records(&path, Vec::<&Record>::new()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "ID,Body,Title,Date,Resolution,Subjects,Voting Data\n");
    }

    #[test]
    fn unserialisable_record_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let mut bad = record();
        bad.id = String::new();
        let mut nul = record();
        nul.id = "2".to_string();
        nul.title = "a\0b".to_string();
        let good = record();

        let report = write_records(&path, [&bad, &nul, &good]).unwrap();
        assert_eq!(report.written, 1);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].1, RowError::MissingId);
        assert_eq!(report.skipped[1].1, RowError::NulByte { field: "Title" });
        assert_eq!(read_table(&path).unwrap().unwrap().rows.len(), 1);
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_table(&dir.path().join("nope.csv")).unwrap().is_none());
    }

    #[test]
    fn wrong_column_count() {
        let cells: Vec<String> = vec!["1".to_string(), "x".to_string()];
        assert_eq!(from_row(&cells).unwrap_err(), TableError::ColumnCount(2));
    }

    #[test]
    fn parse_crlf_and_blank_lines() {
        let rows = parse_rows("a,b\r\n\r\n\"c\",\"d\"");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn subjects_literal() {
        assert_eq!(format_subjects(&set(&[])), "{}");
        assert_eq!(format_subjects(&set(&["B", "A"])), "{'A', 'B'}");
        assert_eq!(format_subjects(&set(&["D'X"])), r"{'D\'X'}");
    }

    #[test]
    fn subjects_parse_variants() {
        assert_eq!(parse_subjects("{}").unwrap(), set(&[]));
        assert_eq!(parse_subjects("set()").unwrap(), set(&[]));
        assert_eq!(parse_subjects("{'A', 'B'}").unwrap(), set(&["A", "B"]));
        assert_eq!(
            parse_subjects(r#"{"CÔTE D'IVOIRE", 'X'}"#).unwrap(),
            set(&["CÔTE D'IVOIRE", "X"])
        );
    }

    #[test]
    fn subjects_parse_rejects_garbage() {
        assert!(parse_subjects("['A']").is_err());
        assert!(parse_subjects("{'A' 'B'}").is_err());
        assert!(parse_subjects("{'unterminated}").is_err());
        assert!(parse_subjects("{A}").is_err());
    }
}
