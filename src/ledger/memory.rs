//! In-process ledger backed by a vector of rows.

use async_trait::async_trait;
use log::debug;
use tokio::sync::Mutex;

use super::{Ledger, LedgerError, Row};

#[derive(Debug, Default)]
pub struct MemoryLedger {
    rows: Mutex<Vec<Row>>,
    formatted: Mutex<Vec<usize>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given rows, header included if wanted
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows: Mutex::new(rows),
            formatted: Mutex::new(Vec::new()),
        }
    }

    pub async fn rows(&self) -> Vec<Row> {
        self.rows.lock().await.clone()
    }

    /// Row numbers that received formatting, in call order
    pub async fn formatted_rows(&self) -> Vec<usize> {
        self.formatted.lock().await.clone()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn read_rows(&self) -> Result<Vec<Row>, LedgerError> {
        Ok(self.rows.lock().await.clone())
    }

    async fn append_row(&self, row: Row) -> Result<(), LedgerError> {
        let mut rows = self.rows.lock().await;
        rows.push(row);
        debug!("Memory ledger now holds {} rows", rows.len());
        Ok(())
    }

    async fn delete_row(&self, row_number: usize) -> Result<(), LedgerError> {
        let mut rows = self.rows.lock().await;
        if row_number == 0 || row_number > rows.len() {
            return Err(LedgerError::RowOutOfRange(row_number));
        }
        rows.remove(row_number - 1);
        Ok(())
    }

    async fn format_row(&self, row_number: usize) -> Result<(), LedgerError> {
        if row_number == 0 || row_number > self.rows.lock().await.len() {
            return Err(LedgerError::RowOutOfRange(row_number));
        }
        self.formatted.lock().await.push(row_number);
        Ok(())
    }
}
