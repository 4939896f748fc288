use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use crate::record::{Record, RecordContent};
use crate::table::{self, FlushReport};

/// What an [`Dataset::upsert`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// First sighting; the record page was fetched.
    Created,
    /// Already known; the subject was added.
    Updated,
    /// Already known with this subject, or no subject given.
    Unchanged,
}

/// All records of one crawl run, keyed by identifier. Only ever grows.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Dataset {
    records: BTreeMap<String, Record>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a previously flushed table. A missing file gives an empty dataset;
    /// rows that cannot be parsed are skipped with a warning.
    pub fn preload(path: &Path) -> Result<Self> {
        let mut dataset = Dataset::new();
        let Some(table) = table::read_table(path)? else {
            info!("No cached records at {}", path.display());
            return Ok(dataset);
        };
        if !table.header.is_empty() && !table.has_standard_header() {
            bail!(
                "Unexpected header in {}: {:?}",
                path.display(),
                table.header
            );
        }

        let mut skipped = 0usize;
        for (i, cells) in table.rows.iter().enumerate() {
            match table::from_row(cells) {
                Ok(record) => dataset.insert_cached(record),
                Err(e) => {
                    skipped += 1;
                    // +2: header line, 1-based
                    warn!("{}: skipping row {}: {}", path.display(), i + 2, e);
                }
            }
        }

        info!(
            "Loaded {} cached records from {} ({} skipped)",
            dataset.len(),
            path.display(),
            skipped
        );
        Ok(dataset)
    }

    fn insert_cached(&mut self, record: Record) {
        match self.records.get_mut(&record.id) {
            Some(existing) => existing.subjects.extend(record.subjects),
            None => {
                self.records.insert(record.id.clone(), record);
            }
        }
    }

    /// Insert `id` if unseen (calling `fetch` for its content), otherwise add
    /// `subject` to the existing record. `fetch` runs at most once per id.
    pub async fn upsert<F, Fut>(
        &mut self,
        id: &str,
        governing_body: &str,
        subject: Option<&str>,
        fetch: F,
    ) -> Result<Upsert>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RecordContent>>,
    {
        if let Some(existing) = self.records.get_mut(id) {
            return Ok(match subject {
                Some(s) if existing.add_subject(s) => {
                    debug!("Adding subject {:?} to record {}", s, id);
                    Upsert::Updated
                }
                _ => Upsert::Unchanged,
            });
        }

        debug!("Creating new record {}", id);
        let content = fetch().await?;
        self.records
            .insert(id.to_string(), Record::new(id, governing_body, subject, content));
        Ok(Upsert::Created)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Records in ascending identifier order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Overwrite `path` with the whole dataset.
    pub fn flush(&self, path: &Path) -> Result<FlushReport> {
        info!("Saving {} records to {}...", self.len(), path.display());
        let report = table::write_records(path, self.records())?;
        if !report.skipped.is_empty() {
            warn!("{} records could not be saved", report.skipped.len());
        }
        Ok(report)
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    async fn fetched(title: &str) -> Result<RecordContent> {
        Ok(RecordContent {
            title: title.to_string(),
            date: "1999-12-01".to_string(),
            resolution: "A/RES/54/63".to_string(),
            voting_summary: "Y ALBANIA".to_string(),
        })
    }

    #[tokio::test]
    async fn one_record_many_subjects() {
        let mut ds = Dataset::new();
        let calls = Cell::new(0);
        let counter = &calls;
        let fetch = move || async move {
            counter.set(counter.get() + 1);
            fetched("T").await
        };

        let a = ds.upsert("1", "General Assembly", Some("A"), fetch).await.unwrap();
        let b = ds.upsert("1", "Security Council", Some("B"), fetch).await.unwrap();
        let again = ds.upsert("1", "General Assembly", Some("A"), fetch).await.unwrap();
        let none = ds.upsert("1", "General Assembly", None, fetch).await.unwrap();

        assert_eq!((a, b, again, none), (Upsert::Created, Upsert::Updated, Upsert::Unchanged, Upsert::Unchanged));
        assert_eq!(calls.get(), 1);
        assert_eq!(ds.len(), 1);
        let r = ds.get("1").unwrap();
        assert_eq!(r.subjects.iter().map(String::as_str).collect::<Vec<_>>(), ["A", "B"]);
        // body is fixed by the first sighting
        assert_eq!(r.governing_body, "General Assembly");
    }

    #[tokio::test]
    async fn subjectless_insert() {
        let mut ds = Dataset::new();
        let up = ds
            .upsert("9", "", None, || fetched("T"))
            .await
            .unwrap();
        assert_eq!(up, Upsert::Created);
        assert!(ds.get("9").unwrap().subjects.is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_leaves_dataset_untouched() {
        let mut ds = Dataset::new();
        let res = ds
            .upsert("1", "General Assembly", Some("A"), || async {
                Err::<RecordContent, _>(anyhow::anyhow!("connection reset"))
            })
            .await;
        assert!(res.is_err());
        assert!(ds.is_empty());
    }

    #[tokio::test]
    async fn flush_then_preload_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records_1999.csv");
        let mut ds = Dataset::new();
        for (id, subject) in [("2", Some("X")), ("1", Some("Y")), ("2", Some("Z")), ("3", None)] {
            ds.upsert(id, "General Assembly", subject, || fetched("Title, \"quoted\""))
                .await
                .unwrap();
        }

        let report = ds.flush(&path).unwrap();
        assert_eq!(report.written, 3);
        assert_eq!(Dataset::preload(&path).unwrap(), ds);
    }

    #[test]
    fn preload_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ds = Dataset::preload(&dir.path().join("records_2001.csv")).unwrap();
        assert!(ds.is_empty());
    }

    #[test]
    fn preload_skips_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records_2001.csv");
        std::fs::write(
            &path,
            "ID,Body,Title,Date,Resolution,Subjects,Voting Data\n\
             \"1\",\"General Assembly\",\"T\",\"D\",\"R\",\"{'A'}\",\"Consensus\"\n\
             \"2\",\"General Assembly\",\"T\"\n\
             \"3\",\"General Assembly\",\"T\",\"D\",\"R\",\"[broken\",\"Consensus\"\n",
        )
        .unwrap();
        let ds = Dataset::preload(&path).unwrap();
        assert_eq!(ds.len(), 1);
        assert!(ds.contains("1"));
    }

    #[test]
    fn preload_rejects_foreign_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records_2001.csv");
        std::fs::write(&path, "Name,Number\n\"a\",\"1\"\n").unwrap();
        assert!(Dataset::preload(&path).is_err());
    }
}
