//! Read cache in front of a remote ledger. Every write invalidates it, so a
//! read that follows a write always reaches the backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::debug;
use tokio::sync::Mutex;

use super::{Ledger, LedgerError, Row};

#[derive(Debug)]
pub struct CachedLedger<L> {
    inner: L,
    ttl: Duration,
    snapshot: Mutex<Option<(Instant, Vec<Row>)>>,
}

impl<L: Ledger> CachedLedger<L> {
    /// A zero `ttl` disables caching
    pub fn new(inner: L, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            snapshot: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    async fn invalidate(&self) {
        self.snapshot.lock().await.take();
    }
}

#[async_trait]
impl<L: Ledger> Ledger for CachedLedger<L> {
    async fn read_rows(&self) -> Result<Vec<Row>, LedgerError> {
        if self.ttl.is_zero() {
            return self.inner.read_rows().await;
        }

        let mut snapshot = self.snapshot.lock().await;
        if let Some((taken, rows)) = snapshot.as_ref() {
            if taken.elapsed() < self.ttl {
                debug!("Serving {} ledger rows from cache", rows.len());
                return Ok(rows.clone());
            }
        }

        let rows = self.inner.read_rows().await?;
        *snapshot = Some((Instant::now(), rows.clone()));
        Ok(rows)
    }

    async fn append_row(&self, row: Row) -> Result<(), LedgerError> {
        self.invalidate().await;
        let result = self.inner.append_row(row).await;
        self.invalidate().await;
        result
    }

    async fn delete_row(&self, row_number: usize) -> Result<(), LedgerError> {
        self.invalidate().await;
        let result = self.inner.delete_row(row_number).await;
        self.invalidate().await;
        result
    }

    async fn format_row(&self, row_number: usize) -> Result<(), LedgerError> {
        self.inner.format_row(row_number).await
    }
}
