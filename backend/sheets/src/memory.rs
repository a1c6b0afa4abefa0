//! In-memory record store for dry runs and tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::info;

use flexscan_core::{FlexscanError, NewRecord, RecordField, RecordRef, RecordStore};

/// One stored record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryRow {
    pub cells: BTreeMap<RecordField, String>,
}

impl MemoryRow {
    pub fn get(&self, field: RecordField) -> Option<&str> {
        self.cells.get(&field).map(String::as_str)
    }
}

#[derive(Default)]
struct Inner {
    rows: Vec<MemoryRow>,
    updates: Vec<(RecordRef, RecordField, String)>,
    fail_create: bool,
    fail_fields: HashSet<RecordField>,
}

/// Rows live in a vector; `RecordRef(n)` addresses `rows[n - 2]` so refs look
/// like sheet rows under a header.
#[derive(Default)]
pub struct InMemoryRecordStore {
    inner: Mutex<Inner>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subsequent `create_record` fail.
    pub fn fail_creates(&self, fail: bool) {
        self.lock().fail_create = fail;
    }

    /// Make writes to `field` fail until [`Self::heal`] is called.
    pub fn fail_field(&self, field: RecordField) {
        self.lock().fail_fields.insert(field);
    }

    /// Clear all injected failures.
    pub fn heal(&self) {
        let mut inner = self.lock();
        inner.fail_create = false;
        inner.fail_fields.clear();
    }

    pub fn rows(&self) -> Vec<MemoryRow> {
        self.lock().rows.clone()
    }

    pub fn row(&self, record: RecordRef) -> Option<MemoryRow> {
        let index = (record.0 as usize).checked_sub(2)?;
        self.lock().rows.get(index).cloned()
    }

    /// Successful writes to one field.
    pub fn writes_to(&self, field: RecordField) -> usize {
        self.lock().updates.iter().filter(|(_, f, _)| *f == field).count()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_record(&self, record: &NewRecord) -> Result<RecordRef, FlexscanError> {
        let mut inner = self.lock();
        if inner.fail_create {
            return Err(FlexscanError::Storage("injected create failure".into()));
        }
        let mut row = MemoryRow::default();
        row.cells.insert(RecordField::Timestamp, record.timestamp_text());
        row.cells.insert(RecordField::Booking, record.booking.clone());
        row.cells.insert(RecordField::Submitter, record.submitter.clone());
        inner.rows.push(row);

        let record_ref = RecordRef(inner.rows.len() as u32 + 1);
        info!(row = record_ref.0, "Record created in memory");
        Ok(record_ref)
    }

    async fn update_field(
        &self,
        record: RecordRef,
        field: RecordField,
        value: &str,
    ) -> Result<(), FlexscanError> {
        let mut inner = self.lock();
        if inner.fail_fields.contains(&field) {
            return Err(FlexscanError::Storage(format!("injected failure writing {field}")));
        }
        let index = (record.0 as usize)
            .checked_sub(2)
            .filter(|i| *i < inner.rows.len())
            .ok_or_else(|| FlexscanError::Storage(format!("no such record: {record}")))?;
        inner.rows[index].cells.insert(field, value.to_string());
        inner.updates.push((record, field, value.to_string()));
        Ok(())
    }
}
