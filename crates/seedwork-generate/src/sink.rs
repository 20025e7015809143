use std::collections::BTreeMap;

use seedwork_core::Record;

use crate::errors::GenerationError;

/// Destination for finished collections.
///
/// Tables arrive one at a time as complete, homogeneous batches. Nothing is
/// visible to readers until `commit`; `abort` discards everything appended
/// so far.
pub trait StorageSink {
    fn append(
        &mut self,
        table: &str,
        columns: &[&str],
        records: Vec<Record>,
    ) -> Result<(), GenerationError>;

    fn commit(&mut self) -> Result<(), GenerationError>;

    fn abort(&mut self) -> Result<(), GenerationError>;
}

/// Keeps committed tables in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pending: BTreeMap<String, Vec<Record>>,
    committed: BTreeMap<String, Vec<Record>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed rows of `table`.
    pub fn rows(&self, table: &str) -> &[Record] {
        self.committed
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.committed.keys().map(String::as_str)
    }

    pub fn is_committed(&self) -> bool {
        !self.committed.is_empty()
    }

    pub fn pending_tables(&self) -> usize {
        self.pending.len()
    }
}

impl StorageSink for MemorySink {
    fn append(
        &mut self,
        table: &str,
        _columns: &[&str],
        records: Vec<Record>,
    ) -> Result<(), GenerationError> {
        self.pending
            .entry(table.to_string())
            .or_default()
            .extend(records);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), GenerationError> {
        for (table, rows) in std::mem::take(&mut self.pending) {
            self.committed.entry(table).or_default().extend(rows);
        }
        Ok(())
    }

    fn abort(&mut self) -> Result<(), GenerationError> {
        self.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> Record {
        Record::default().field("id", id)
    }

    #[test]
    fn rows_are_hidden_until_commit() {
        let mut sink = MemorySink::new();
        sink.append("users", &["id"], vec![record("a"), record("b")])
            .unwrap();
        assert!(sink.rows("users").is_empty());

        sink.commit().unwrap();
        assert_eq!(sink.rows("users").len(), 2);
        assert_eq!(sink.rows("users")[0].get("id").unwrap().render(), "a");
    }

    #[test]
    fn abort_discards_pending_rows() {
        let mut sink = MemorySink::new();
        sink.append("users", &["id"], vec![record("a")]).unwrap();
        sink.abort().unwrap();
        sink.commit().unwrap();
        assert!(!sink.is_committed());
        assert_eq!(sink.pending_tables(), 0);
    }
}
