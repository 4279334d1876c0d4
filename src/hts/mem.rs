//! In-memory record source and sink, used by tests and embedders.

use std::sync::{Arc, Mutex};

use crate::errors::Result;
use crate::hts::{Header, Record, RecordSink, RecordSource};

pub struct MemorySource {
    header: Header,
    records: Vec<Record>,
    index: usize,
}

impl MemorySource {
    pub fn new(header: Header, records: Vec<Record>) -> Self {
        Self {
            header,
            records,
            index: 0,
        }
    }
}

impl RecordSource for MemorySource {
    fn header(&self) -> &Header {
        &self.header
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        let record = self.records.get(self.index).cloned();
        if record.is_some() {
            self.index += 1;
        }
        Ok(record)
    }

    fn skip_chromosome(&mut self, tid: u32) -> Result<()> {
        while matches!(self.records.get(self.index), Some(r) if r.tid == Some(tid)) {
            self.index += 1;
        }
        Ok(())
    }
}

/// Collects written records behind a shared handle, so they can be inspected
/// after the chain that owns the sink is torn down.
pub struct MemorySink {
    records: Arc<Mutex<Vec<Record>>>,
}

impl MemorySink {
    pub fn new() -> (Self, Arc<Mutex<Vec<Record>>>) {
        let records = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                records: Arc::clone(&records),
            },
            records,
        )
    }
}

impl RecordSink for MemorySink {
    fn write_header(&mut self, _header: &Header) -> Result<()> {
        Ok(())
    }

    fn write_record(&mut self, _header: &Header, record: &Record) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
