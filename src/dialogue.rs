//! # Dialogue Module
//!
//! The "add record" conversation as an explicit state machine. The transition
//! function is pure: it never talks to the chat platform or the ledger. Data
//! the conversation needs from the ledger (the previous odometer) is carried in
//! the [`Event::Begin`] event, and writing the record is requested through
//! [`Effect::Persist`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::distribution::{parse_distribution_for, DistributionError};
use crate::fuel::{Distribution, FuelRates};
use crate::trip::Trip;

/// Represents the conversation state for one user
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum DialogueState {
    #[default]
    Idle,
    AwaitingOdometer {
        previous: Option<u32>,
    },
    AwaitingDistribution {
        odometer: u32,
        diff: u32,
    },
    AwaitingConfirmation {
        trip: Trip,
    },
}

/// Input driving the conversation
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// User asked to add a record; carries the last odometer in the ledger
    Begin { previous: Option<u32> },
    /// Free text typed by the user
    Text(String),
    Confirm,
    Cancel,
}

/// What the user should be told after a transition
#[derive(Clone, Debug, PartialEq)]
pub enum Prompt {
    AskOdometer { previous: Option<u32> },
    InvalidOdometer,
    OdometerNotIncreasing { odometer: u32, previous: u32 },
    AskDistribution { diff: u32, example: Distribution },
    InvalidDistribution { diff: u32, error: DistributionError },
    ConfirmTrip(Trip),
    /// Text arrived while Save/Cancel buttons are expected
    ChooseSaveOrCancel,
    /// Confirm arrived while a record is still being entered
    NothingToConfirm,
    /// Confirm arrived but no record is held for this user
    SessionLost,
    /// Text arrived outside of any conversation
    UseMenu,
    Cancelled,
}

/// Side effect requested by a transition
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Reply(Prompt),
    /// Write the trip to the ledger. The state stays in confirmation until
    /// the caller reports success.
    Persist(Trip),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: DialogueState,
    pub effect: Effect,
}

impl Transition {
    fn reply(state: DialogueState, prompt: Prompt) -> Self {
        Self {
            state,
            effect: Effect::Reply(prompt),
        }
    }
}

/// Reasons an odometer input is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OdometerError {
    #[error("odometer value is not a number")]
    NotANumber,
    #[error("odometer {odometer} is not greater than the previous {previous}")]
    NotIncreasing { odometer: u32, previous: u32 },
}

/// Parse an odometer reading. Decimal readings are truncated.
pub fn parse_odometer(text: &str) -> Result<u32, OdometerError> {
    let trimmed = text.trim();
    let integer_part = match trimmed.split_once(|c: char| c == '.' || c == ',') {
        Some((integer, fraction)) if fraction.chars().all(|c| c.is_ascii_digit()) => integer,
        Some(_) => return Err(OdometerError::NotANumber),
        None => trimmed,
    };

    if integer_part.is_empty() || !integer_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(OdometerError::NotANumber);
    }

    integer_part
        .parse::<u32>()
        .map_err(|_| OdometerError::NotANumber)
}

/// Distance since the previous reading. Without a previous reading the
/// distance is counted from zero.
pub fn odometer_diff(odometer: u32, previous: Option<u32>) -> Result<u32, OdometerError> {
    match previous {
        None => Ok(odometer),
        Some(previous) if odometer > previous => Ok(odometer - previous),
        Some(previous) => Err(OdometerError::NotIncreasing { odometer, previous }),
    }
}

/// Advance the conversation by one event
pub fn transition(state: DialogueState, event: Event, rates: &FuelRates) -> Transition {
    match (state, event) {
        (_, Event::Begin { previous }) => Transition::reply(
            DialogueState::AwaitingOdometer { previous },
            Prompt::AskOdometer { previous },
        ),

        (_, Event::Cancel) => Transition::reply(DialogueState::Idle, Prompt::Cancelled),

        (DialogueState::AwaitingOdometer { previous }, Event::Text(text)) => {
            let outcome = parse_odometer(&text).and_then(|odometer| {
                odometer_diff(odometer, previous).map(|diff| (odometer, diff))
            });

            match outcome {
                Ok((odometer, diff)) => Transition::reply(
                    DialogueState::AwaitingDistribution { odometer, diff },
                    Prompt::AskDistribution {
                        diff,
                        example: Distribution::example_for(diff),
                    },
                ),
                Err(OdometerError::NotANumber) => Transition::reply(
                    DialogueState::AwaitingOdometer { previous },
                    Prompt::InvalidOdometer,
                ),
                Err(OdometerError::NotIncreasing { odometer, previous: last }) => {
                    Transition::reply(
                        DialogueState::AwaitingOdometer { previous },
                        Prompt::OdometerNotIncreasing {
                            odometer,
                            previous: last,
                        },
                    )
                }
            }
        }

        (DialogueState::AwaitingDistribution { odometer, diff }, Event::Text(text)) => {
            match parse_distribution_for(&text, diff) {
                Ok(distribution) => {
                    let trip = Trip::compute(odometer, diff, distribution, rates);
                    Transition::reply(
                        DialogueState::AwaitingConfirmation { trip },
                        Prompt::ConfirmTrip(trip),
                    )
                }
                Err(error) => Transition::reply(
                    DialogueState::AwaitingDistribution { odometer, diff },
                    Prompt::InvalidDistribution { diff, error },
                ),
            }
        }

        (DialogueState::AwaitingConfirmation { trip }, Event::Confirm) => Transition {
            state: DialogueState::AwaitingConfirmation { trip },
            effect: Effect::Persist(trip),
        },

        (state @ DialogueState::AwaitingConfirmation { .. }, Event::Text(_)) => {
            Transition::reply(state, Prompt::ChooseSaveOrCancel)
        }

        (DialogueState::Idle, Event::Confirm) => {
            Transition::reply(DialogueState::Idle, Prompt::SessionLost)
        }

        (DialogueState::Idle, Event::Text(_)) => {
            Transition::reply(DialogueState::Idle, Prompt::UseMenu)
        }

        (state, Event::Confirm) => Transition::reply(state, Prompt::NothingToConfirm),
    }
}
