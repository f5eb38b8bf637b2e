//! # Conversation Tests
//!
//! End-to-end runs of the tracker against in-process ledgers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use mileage_bot::access::AccessGuard;
use mileage_bot::dialogue::{DialogueState, Prompt};
use mileage_bot::distribution::DistributionError;
use mileage_bot::fuel::{Distribution, FuelRates};
use mileage_bot::ledger::{column, Ledger, LedgerError, MemoryLedger, Row};
use mileage_bot::reports::LastRecord;
use mileage_bot::tracker::{Action, MenuKind, Reply, Tracker};

const OWNER: u64 = 1001;

fn reference_rates() -> FuelRates {
    FuelRates {
        city: 11.66,
        district: 11.17,
        highway: 10.19,
    }
}

fn header() -> Row {
    ["Дата", "Одометр", "Різниця"].iter().map(|c| c.to_string()).collect()
}

fn previous_trip(odometer: u32) -> Row {
    let mut row = vec![String::new(); 14];
    row[column::RECORDED_AT] = "2026-10-01 08:00:00".to_string();
    row[column::ODOMETER] = odometer.to_string();
    row[column::DIFF] = "100".to_string();
    row
}

fn tracker_with(ledger: Arc<dyn Ledger>, owner: Option<u64>) -> Tracker {
    Tracker::new(
        ledger,
        AccessGuard::new(owner),
        reference_rates(),
        chrono_tz::Europe::Kyiv,
        Duration::from_secs(1800),
    )
}

/// Ledger whose appends fail while `failing` is set
struct FlakyLedger {
    inner: MemoryLedger,
    failing: AtomicBool,
}

#[async_trait]
impl Ledger for FlakyLedger {
    async fn read_rows(&self) -> Result<Vec<Row>, LedgerError> {
        self.inner.read_rows().await
    }

    async fn append_row(&self, row: Row) -> Result<(), LedgerError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LedgerError::Api {
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }
        self.inner.append_row(row).await
    }

    async fn delete_row(&self, row_number: usize) -> Result<(), LedgerError> {
        self.inner.delete_row(row_number).await
    }

    async fn format_row(&self, row_number: usize) -> Result<(), LedgerError> {
        self.inner.format_row(row_number).await
    }
}

/// Ledger whose first read after an append fails, as when the backend drops
/// the connection right after accepting the row
struct FlakyReadLedger {
    inner: MemoryLedger,
    fail_next_read: AtomicBool,
}

#[async_trait]
impl Ledger for FlakyReadLedger {
    async fn read_rows(&self) -> Result<Vec<Row>, LedgerError> {
        if self.fail_next_read.swap(false, Ordering::SeqCst) {
            return Err(LedgerError::Api {
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }
        self.inner.read_rows().await
    }

    async fn append_row(&self, row: Row) -> Result<(), LedgerError> {
        self.inner.append_row(row).await?;
        self.fail_next_read.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_row(&self, row_number: usize) -> Result<(), LedgerError> {
        self.inner.delete_row(row_number).await
    }

    async fn format_row(&self, row_number: usize) -> Result<(), LedgerError> {
        self.inner.format_row(row_number).await
    }
}

#[tokio::test]
async fn test_full_trip_is_appended_and_formatted() -> Result<()> {
    let ledger = Arc::new(MemoryLedger::with_rows(vec![header(), previous_trip(53000)]));
    let tracker = tracker_with(ledger.clone(), Some(OWNER));

    let reply = tracker.handle(OWNER, Action::Add).await;
    assert_eq!(
        reply,
        Reply::Dialogue(Prompt::AskOdometer {
            previous: Some(53000)
        })
    );

    let reply = tracker.handle(OWNER, Action::Text("53200".to_string())).await;
    assert_eq!(
        reply,
        Reply::Dialogue(Prompt::AskDistribution {
            diff: 200,
            example: Distribution::new(66, 66, 68),
        })
    );

    let reply = tracker
        .handle(OWNER, Action::Text("місто 100 район 60 траса 40".to_string()))
        .await;
    let trip = match reply {
        Reply::Dialogue(Prompt::ConfirmTrip(trip)) => trip,
        other => panic!("expected confirmation, got {other:?}"),
    };
    assert_eq!(trip.distribution, Distribution::new(100, 60, 40));
    assert_eq!(trip.consumption.total.rounded, 22.44);

    assert_eq!(tracker.handle(OWNER, Action::Save).await, Reply::Saved);
    assert!(tracker.sessions().is_empty().await);

    let rows = ledger.rows().await;
    assert_eq!(rows.len(), 3);
    let saved = &rows[2];
    assert_eq!(saved.len(), 14);
    assert_eq!(saved[column::ODOMETER], "53200");
    assert_eq!(saved[column::DIFF], "200");
    assert_eq!(saved[column::DISTRICT_EXACT], "6.7020");
    assert_eq!(saved[column::TOTAL_EXACT], "22.4380");
    assert_eq!(saved[column::TOTAL_ROUNDED], "22.44");
    assert_eq!(ledger.formatted_rows().await, vec![3]);

    Ok(())
}

#[tokio::test]
async fn test_saved_trip_is_reported_as_last_record() -> Result<()> {
    let ledger = Arc::new(MemoryLedger::new());
    let tracker = tracker_with(ledger, None);

    tracker.handle(7, Action::Add).await;
    tracker.handle(7, Action::Text("150".to_string())).await;
    tracker.handle(7, Action::Text("50/50/50".to_string())).await;
    assert_eq!(tracker.handle(7, Action::Save).await, Reply::Saved);

    match tracker.handle(7, Action::Last).await {
        Reply::LastRecord(Some(LastRecord::Record(record))) => {
            assert_eq!(record.odometer, 150);
            assert_eq!(record.diff, 150);
            assert_eq!(record.distribution, Distribution::new(50, 50, 50));
        }
        other => panic!("expected the saved record, got {other:?}"),
    }

    // The next trip counts from the saved odometer
    assert_eq!(
        tracker.handle(7, Action::Add).await,
        Reply::Dialogue(Prompt::AskOdometer { previous: Some(150) })
    );

    Ok(())
}

#[tokio::test]
async fn test_wrong_sum_keeps_asking_for_distribution() -> Result<()> {
    let ledger = Arc::new(MemoryLedger::with_rows(vec![previous_trip(53000)]));
    let tracker = tracker_with(ledger.clone(), None);

    tracker.handle(OWNER, Action::Add).await;
    tracker.handle(OWNER, Action::Text("53200".to_string())).await;

    let reply = tracker.handle(OWNER, Action::Text("70 70 70".to_string())).await;
    assert_eq!(
        reply,
        Reply::Dialogue(Prompt::InvalidDistribution {
            diff: 200,
            error: DistributionError::SumMismatch {
                expected: 200,
                actual: 210
            },
        })
    );
    assert_eq!(
        tracker.sessions().get(OWNER).await,
        DialogueState::AwaitingDistribution {
            odometer: 53200,
            diff: 200
        }
    );
    assert_eq!(ledger.rows().await.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_failed_save_can_be_retried() -> Result<()> {
    let flaky = Arc::new(FlakyLedger {
        inner: MemoryLedger::new(),
        failing: AtomicBool::new(true),
    });
    let tracker = tracker_with(flaky.clone(), None);

    tracker.handle(OWNER, Action::Add).await;
    tracker.handle(OWNER, Action::Text("300".to_string())).await;
    tracker.handle(OWNER, Action::Text("100 100 100".to_string())).await;

    assert_eq!(tracker.handle(OWNER, Action::Save).await, Reply::SaveFailed);
    assert!(matches!(
        tracker.sessions().get(OWNER).await,
        DialogueState::AwaitingConfirmation { .. }
    ));

    flaky.failing.store(false, Ordering::SeqCst);
    assert_eq!(tracker.handle(OWNER, Action::Save).await, Reply::Saved);
    assert_eq!(flaky.inner.rows().await.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_stranger_is_denied_without_state() -> Result<()> {
    let ledger = Arc::new(MemoryLedger::new());
    let tracker = tracker_with(ledger.clone(), Some(OWNER));

    assert_eq!(tracker.handle(42, Action::Add).await, Reply::Denied);
    assert_eq!(tracker.handle(42, Action::Text("100".to_string())).await, Reply::Denied);
    assert_eq!(tracker.handle(42, Action::Delete).await, Reply::Denied);

    assert!(tracker.sessions().is_empty().await);
    assert!(ledger.rows().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_save_without_session_asks_to_restart() -> Result<()> {
    let tracker = tracker_with(Arc::new(MemoryLedger::new()), None);
    assert_eq!(
        tracker.handle(OWNER, Action::Save).await,
        Reply::Dialogue(Prompt::SessionLost)
    );
    Ok(())
}

#[tokio::test]
async fn test_cancel_and_reset_clear_the_conversation() -> Result<()> {
    let ledger = Arc::new(MemoryLedger::new());
    let tracker = tracker_with(ledger.clone(), None);

    tracker.handle(OWNER, Action::Add).await;
    tracker.handle(OWNER, Action::Text("120".to_string())).await;
    assert_eq!(
        tracker.handle(OWNER, Action::Cancel).await,
        Reply::Dialogue(Prompt::Cancelled)
    );
    assert!(tracker.sessions().is_empty().await);

    tracker.handle(OWNER, Action::Add).await;
    assert_eq!(
        tracker.handle(OWNER, Action::Reset).await,
        Reply::Menu(MenuKind::AfterReset)
    );
    assert!(tracker.sessions().is_empty().await);
    assert!(ledger.rows().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_delete_keeps_the_header() -> Result<()> {
    let ledger = Arc::new(MemoryLedger::with_rows(vec![header(), previous_trip(53000)]));
    let tracker = tracker_with(ledger.clone(), None);

    assert_eq!(tracker.handle(OWNER, Action::Delete).await, Reply::Deleted);
    assert_eq!(tracker.handle(OWNER, Action::Delete).await, Reply::NothingToDelete);
    assert_eq!(ledger.rows().await, vec![header()]);

    Ok(())
}

#[tokio::test]
async fn test_reports_on_an_empty_ledger() -> Result<()> {
    let tracker = tracker_with(Arc::new(MemoryLedger::new()), None);

    assert_eq!(tracker.handle(OWNER, Action::Last).await, Reply::LastRecord(None));
    match tracker.handle(OWNER, Action::Report).await {
        Reply::Monthly(report) => {
            assert_eq!(report.records, 0);
            assert_eq!(report.total_liters, 0.0);
        }
        other => panic!("expected a monthly report, got {other:?}"),
    }
    match tracker.handle(OWNER, Action::Stats).await {
        Reply::Stats(stats) => assert_eq!(stats.average_per_100km, None),
        other => panic!("expected statistics, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn test_stored_trip_is_not_written_twice_when_reread_fails() -> Result<()> {
    let ledger = Arc::new(FlakyReadLedger {
        inner: MemoryLedger::new(),
        fail_next_read: AtomicBool::new(false),
    });
    let tracker = tracker_with(ledger.clone(), None);

    tracker.handle(OWNER, Action::Add).await;
    tracker.handle(OWNER, Action::Text("300".to_string())).await;
    tracker.handle(OWNER, Action::Text("100 100 100".to_string())).await;

    assert_eq!(tracker.handle(OWNER, Action::Save).await, Reply::Saved);
    assert_eq!(ledger.inner.rows().await.len(), 1);
    assert!(tracker.sessions().is_empty().await);

    // A second press finds no pending trip instead of appending again
    assert_eq!(
        tracker.handle(OWNER, Action::Save).await,
        Reply::Dialogue(Prompt::SessionLost)
    );
    assert_eq!(ledger.inner.rows().await.len(), 1);

    Ok(())
}
