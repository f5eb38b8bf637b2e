//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::dialogue::Prompt;
use crate::distribution::DistributionError;
use crate::fuel::RoadCategory;
use crate::ledger::column;
use crate::localization::{t_args_lang, t_lang};
use crate::reports::{LastRecord, MonthlyReport, Statistics};
use crate::tracker::{MenuKind, Reply};
use crate::trip::Trip;

use super::commands::callback;

/// Create the main menu keyboard
pub fn main_menu_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    let button = |key: &str, data: &str| {
        InlineKeyboardButton::callback(t_lang(key, language_code), data.to_string())
    };

    InlineKeyboardMarkup::new(vec![
        vec![button("button-add", callback::ADD), button("button-last", callback::LAST)],
        vec![button("button-delete", callback::DELETE), button("button-report", callback::REPORT)],
        vec![button("button-stats", callback::STATS), button("button-reset", callback::RESET)],
        vec![button("button-help", callback::HELP)],
    ])
}

/// Save/Cancel buttons shown under a computed trip
pub fn confirm_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(t_lang("button-save", language_code), callback::SAVE),
        InlineKeyboardButton::callback(t_lang("button-cancel", language_code), callback::CANCEL),
    ]])
}

/// Single Cancel button shown while a record is being entered
pub fn cancel_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        t_lang("button-cancel", language_code),
        callback::CANCEL,
    )]])
}

fn category_label(category: RoadCategory, language_code: Option<&str>) -> String {
    t_lang(category.label_key(), language_code)
}

/// Render a tracker reply as message text plus an optional keyboard
pub fn render_reply(
    reply: &Reply,
    language_code: Option<&str>,
) -> (String, Option<InlineKeyboardMarkup>) {
    let menu = || Some(main_menu_keyboard(language_code));

    match reply {
        Reply::Denied => (t_lang("access-denied", language_code), None),
        Reply::Menu(MenuKind::Greeting) => (t_lang("menu-greeting", language_code), menu()),
        Reply::Menu(MenuKind::AfterReset) => (t_lang("menu-reset", language_code), menu()),
        Reply::Help => (t_lang("help-text", language_code), menu()),
        Reply::Dialogue(prompt) => render_prompt(prompt, language_code),
        Reply::Saved => (t_lang("saved", language_code), menu()),
        Reply::SaveFailed => (
            t_lang("save-failed", language_code),
            Some(confirm_keyboard(language_code)),
        ),
        Reply::LedgerUnavailable => (t_lang("ledger-unavailable", language_code), menu()),
        Reply::LastRecord(None) => (t_lang("no-records", language_code), menu()),
        Reply::LastRecord(Some(last)) => (format_last_record(last, language_code), menu()),
        Reply::Deleted => (t_lang("deleted", language_code), menu()),
        Reply::NothingToDelete => (t_lang("nothing-to-delete", language_code), menu()),
        Reply::Monthly(report) => (format_monthly_report(report, language_code), menu()),
        Reply::Stats(stats) => (format_statistics(stats, language_code), menu()),
    }
}

fn render_prompt(
    prompt: &Prompt,
    language_code: Option<&str>,
) -> (String, Option<InlineKeyboardMarkup>) {
    let cancel = || Some(cancel_keyboard(language_code));

    match prompt {
        Prompt::AskOdometer { previous: Some(previous) } => (
            t_args_lang("ask-odometer", &[("previous", &previous.to_string())], language_code),
            cancel(),
        ),
        Prompt::AskOdometer { previous: None } => {
            (t_lang("ask-odometer-first", language_code), cancel())
        }
        Prompt::InvalidOdometer => (t_lang("invalid-odometer", language_code), cancel()),
        Prompt::OdometerNotIncreasing { odometer, previous } => (
            t_args_lang(
                "odometer-not-increasing",
                &[("odometer", &odometer.to_string()), ("previous", &previous.to_string())],
                language_code,
            ),
            cancel(),
        ),
        Prompt::AskDistribution { diff, example } => (
            t_args_lang(
                "ask-distribution",
                &[
                    ("city", &example.city.to_string()),
                    ("district", &example.district.to_string()),
                    ("highway", &example.highway.to_string()),
                    ("diff", &diff.to_string()),
                ],
                language_code,
            ),
            cancel(),
        ),
        Prompt::InvalidDistribution { diff, error } => (
            t_args_lang(
                "invalid-distribution",
                &[
                    ("reason", &distribution_reason(error, language_code)),
                    ("diff", &diff.to_string()),
                ],
                language_code,
            ),
            cancel(),
        ),
        Prompt::ConfirmTrip(trip) => (
            format_trip_summary(trip, language_code),
            Some(confirm_keyboard(language_code)),
        ),
        Prompt::ChooseSaveOrCancel => (
            t_lang("choose-save-or-cancel", language_code),
            Some(confirm_keyboard(language_code)),
        ),
        Prompt::NothingToConfirm => (t_lang("nothing-to-confirm", language_code), cancel()),
        Prompt::SessionLost => (
            t_lang("session-lost", language_code),
            Some(main_menu_keyboard(language_code)),
        ),
        Prompt::UseMenu => (
            t_lang("use-menu", language_code),
            Some(main_menu_keyboard(language_code)),
        ),
        Prompt::Cancelled => (
            t_lang("cancelled", language_code),
            Some(main_menu_keyboard(language_code)),
        ),
    }
}

/// Human readable reason a distribution was rejected
pub fn distribution_reason(error: &DistributionError, language_code: Option<&str>) -> String {
    match error {
        DistributionError::WrongCount { found } => {
            t_args_lang("distribution-wrong-count", &[("found", &found.to_string())], language_code)
        }
        DistributionError::MissingNumber(category) => t_args_lang(
            "distribution-missing-number",
            &[("category", &category_label(*category, language_code))],
            language_code,
        ),
        DistributionError::DuplicateCategory(category) => t_args_lang(
            "distribution-duplicate-category",
            &[("category", &category_label(*category, language_code))],
            language_code,
        ),
        DistributionError::MissingCategory(category) => t_args_lang(
            "distribution-missing-category",
            &[("category", &category_label(*category, language_code))],
            language_code,
        ),
        DistributionError::NumberTooLarge(number) => {
            t_args_lang("distribution-number-too-large", &[("number", number)], language_code)
        }
        DistributionError::SumMismatch { expected, actual } => t_args_lang(
            "distribution-sum-mismatch",
            &[("actual", &actual.to_string()), ("expected", &expected.to_string())],
            language_code,
        ),
    }
}

/// Summary of a computed trip, shown before saving
pub fn format_trip_summary(trip: &Trip, language_code: Option<&str>) -> String {
    let mut lines = vec![
        t_args_lang("summary-odometer", &[("odometer", &trip.odometer.to_string())], language_code),
        t_args_lang("summary-distance", &[("km", &trip.diff.to_string())], language_code),
    ];

    for category in RoadCategory::ALL {
        lines.push(t_args_lang(
            "summary-category",
            &[
                ("label", &category_label(category, language_code)),
                ("km", &trip.distribution.km(category).to_string()),
                ("liters", &format!("{:.2}", trip.consumption.for_category(category).rounded)),
            ],
            language_code,
        ));
    }

    lines.push(t_args_lang(
        "summary-total",
        &[("liters", &format!("{:.2}", trip.consumption.total.rounded))],
        language_code,
    ));
    lines.push(String::new());
    lines.push(t_lang("confirm-question", language_code));

    lines.join("\n")
}

/// Last ledger row. Parsed rows are re-rendered with the stored precision,
/// unparsed rows are shown cell by cell as stored.
pub fn format_last_record(last: &LastRecord, language_code: Option<&str>) -> String {
    let cells = match last {
        LastRecord::Record(record) => record.to_row(),
        LastRecord::Unparsed(cells) => cells.clone(),
    };
    let cell = |index: usize| cells.get(index).map(String::as_str).unwrap_or("");

    let mut lines = vec![
        t_args_lang("last-recorded-at", &[("value", cell(column::RECORDED_AT))], language_code),
        t_args_lang("summary-odometer", &[("odometer", cell(column::ODOMETER))], language_code),
        t_args_lang("summary-distance", &[("km", cell(column::DIFF))], language_code),
    ];

    let category_cells = [
        (RoadCategory::City, column::CITY_KM),
        (RoadCategory::District, column::DISTRICT_KM),
        (RoadCategory::Highway, column::HIGHWAY_KM),
    ];
    for (category, km_column) in category_cells {
        lines.push(t_args_lang(
            "last-category",
            &[
                ("label", &category_label(category, language_code)),
                ("km", cell(km_column)),
                ("exact", cell(km_column + 1)),
                ("rounded", cell(km_column + 2)),
            ],
            language_code,
        ));
    }

    lines.push(t_args_lang(
        "last-total",
        &[
            ("exact", cell(column::TOTAL_EXACT)),
            ("rounded", cell(column::TOTAL_ROUNDED)),
        ],
        language_code,
    ));

    lines.join("\n")
}

pub fn format_monthly_report(report: &MonthlyReport, language_code: Option<&str>) -> String {
    t_args_lang(
        "report-monthly",
        &[
            ("count", &report.records.to_string()),
            ("month", &report.month),
            ("liters", &format!("{:.2}", report.total_liters)),
        ],
        language_code,
    )
}

pub fn format_statistics(stats: &Statistics, language_code: Option<&str>) -> String {
    if stats.records == 0 {
        return t_lang("no-records", language_code);
    }

    let mut lines = vec![
        t_lang("stats-title", language_code),
        t_args_lang("stats-records", &[("count", &stats.records.to_string())], language_code),
        t_args_lang(
            "stats-total",
            &[
                ("km", &stats.total_km.to_string()),
                ("liters", &format!("{:.2}", stats.total_liters)),
            ],
            language_code,
        ),
    ];

    if let Some(average) = stats.average_per_100km {
        lines.push(t_args_lang(
            "stats-average",
            &[("value", &format!("{:.2}", average))],
            language_code,
        ));
    }

    lines.push(String::new());
    for category in &stats.categories {
        lines.push(t_args_lang(
            "stats-category",
            &[
                ("label", &category_label(category.category, language_code)),
                ("km", &category.km.to_string()),
                ("liters", &format!("{:.2}", category.liters)),
                ("percent", &format!("{:.1}", category.share_percent)),
                ("bar", &category.bar()),
            ],
            language_code,
        ));
    }

    lines.push(String::new());
    let week = &stats.last_7_days;
    lines.push(t_args_lang(
        "stats-week",
        &[
            ("count", &week.records.to_string()),
            ("km", &week.km.to_string()),
            ("liters", &format!("{:.2}", week.liters)),
        ],
        language_code,
    ));

    lines.join("\n")
}
