//! # Tracker Module
//!
//! The application service behind the bot. It applies the access guard, keeps
//! each user's conversation in the session store, drives the dialogue state
//! machine and performs the ledger reads and writes the conversation asks for.
//! Every ledger failure is turned into a [`Reply`]; nothing here returns an
//! error to the chat layer.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, error, info};

use crate::access::AccessGuard;
use crate::dialogue::{transition, DialogueState, Effect, Event, Prompt};
use crate::fuel::FuelRates;
use crate::ledger::{
    append_record, delete_last_record, last_odometer, Ledger, LedgerRecord, Row, TIMESTAMP_FORMAT,
};
use crate::reports::{
    last_record, monthly_report, statistics, LastRecord, MonthlyReport, Statistics,
};
use crate::session::SessionStore;

/// Something the user did, independent of how the chat platform delivered it
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Start,
    Help,
    Add,
    Last,
    Delete,
    Report,
    Stats,
    Reset,
    Save,
    Cancel,
    Text(String),
}

/// Which greeting accompanies the main menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKind {
    Greeting,
    AfterReset,
}

/// Outcome of an action, rendered by the chat layer
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Denied,
    Menu(MenuKind),
    Help,
    Dialogue(Prompt),
    Saved,
    /// The record is still held; pressing Save again retries
    SaveFailed,
    LedgerUnavailable,
    LastRecord(Option<LastRecord>),
    Deleted,
    NothingToDelete,
    Monthly(MonthlyReport),
    Stats(Statistics),
}

pub struct Tracker {
    ledger: Arc<dyn Ledger>,
    sessions: SessionStore,
    guard: AccessGuard,
    rates: FuelRates,
    timezone: Tz,
}

impl Tracker {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        guard: AccessGuard,
        rates: FuelRates,
        timezone: Tz,
        session_ttl: Duration,
    ) -> Self {
        Self {
            ledger,
            sessions: SessionStore::new(session_ttl),
            guard,
            rates,
            timezone,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one interaction of one user
    pub async fn handle(&self, user_id: u64, action: Action) -> Reply {
        if !self.guard.is_allowed(user_id) {
            return Reply::Denied;
        }
        debug!(user_id, action = ?action, "Handling action");

        match action {
            Action::Start => {
                self.sessions.clear(user_id).await;
                Reply::Menu(MenuKind::Greeting)
            }
            Action::Reset => {
                self.sessions.clear(user_id).await;
                Reply::Menu(MenuKind::AfterReset)
            }
            Action::Help => Reply::Help,
            Action::Add => self.begin(user_id).await,
            Action::Text(text) => self.advance(user_id, Event::Text(text)).await,
            Action::Save => self.advance(user_id, Event::Confirm).await,
            Action::Cancel => self.advance(user_id, Event::Cancel).await,
            Action::Last => match self.read_rows(user_id).await {
                Ok(rows) => Reply::LastRecord(last_record(&rows)),
                Err(reply) => reply,
            },
            Action::Delete => match delete_last_record(self.ledger.as_ref()).await {
                Ok(true) => {
                    info!(user_id, "Last ledger record deleted");
                    Reply::Deleted
                }
                Ok(false) => Reply::NothingToDelete,
                Err(e) => {
                    error!(user_id, error = %e, "Failed to delete last ledger record");
                    Reply::LedgerUnavailable
                }
            },
            Action::Report => match self.read_rows(user_id).await {
                Ok(rows) => Reply::Monthly(monthly_report(&rows, self.now())),
                Err(reply) => reply,
            },
            Action::Stats => match self.read_rows(user_id).await {
                Ok(rows) => Reply::Stats(statistics(&rows, self.now())),
                Err(reply) => reply,
            },
        }
    }

    /// Local wall-clock time in the configured zone
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.timezone).naive_local()
    }

    async fn read_rows(&self, user_id: u64) -> Result<Vec<Row>, Reply> {
        self.ledger.read_rows().await.map_err(|e| {
            error!(user_id, error = %e, "Failed to read ledger");
            Reply::LedgerUnavailable
        })
    }

    async fn begin(&self, user_id: u64) -> Reply {
        let rows = match self.read_rows(user_id).await {
            Ok(rows) => rows,
            Err(reply) => return reply,
        };
        let previous = last_odometer(&rows);
        self.advance(user_id, Event::Begin { previous }).await
    }

    async fn advance(&self, user_id: u64, event: Event) -> Reply {
        let state = self.sessions.get(user_id).await;
        let step = transition(state, event, &self.rates);

        match step.effect {
            Effect::Reply(prompt) => {
                self.sessions.set(user_id, step.state).await;
                Reply::Dialogue(prompt)
            }
            Effect::Persist(trip) => {
                let recorded_at = self.now().format(TIMESTAMP_FORMAT).to_string();
                let record = LedgerRecord::from_trip(&trip, recorded_at);

                match append_record(self.ledger.as_ref(), &record).await {
                    Ok(row_number) => {
                        info!(
                            user_id,
                            row_number = ?row_number,
                            odometer = trip.odometer,
                            "Trip saved"
                        );
                        self.sessions.set(user_id, DialogueState::Idle).await;
                        Reply::Saved
                    }
                    Err(e) => {
                        error!(user_id, error = %e, "Failed to save trip, keeping it for retry");
                        self.sessions.set(user_id, step.state).await;
                        Reply::SaveFailed
                    }
                }
            }
        }
    }
}
