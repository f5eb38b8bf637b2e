//! # Mileage Bot
//!
//! A Telegram bot that records odometer readings, splits the distance into
//! city, district and highway kilometers, computes the fuel used with fixed
//! per-100 km rates and appends one row per trip to a spreadsheet ledger.

pub mod access;
pub mod bot;
pub mod config;
pub mod dialogue;
pub mod distribution;
pub mod fuel;
pub mod ledger;
pub mod localization;
pub mod reports;
pub mod session;
pub mod tracker;
pub mod trip;
pub mod webhook;
