//! Mapping of slash commands and inline button payloads to tracker actions

use crate::tracker::Action;

/// Callback payloads carried by the inline buttons
pub mod callback {
    pub const ADD: &str = "add";
    pub const LAST: &str = "last";
    pub const DELETE: &str = "delete";
    pub const REPORT: &str = "report";
    pub const STATS: &str = "stats";
    pub const RESET: &str = "reset";
    pub const HELP: &str = "help";
    pub const SAVE: &str = "save";
    pub const CANCEL: &str = "cancel";
}

/// Parse a `/command` or `/command@BotName` message. Anything after the
/// command word is ignored. Returns `None` for plain text and unknown commands.
pub fn parse_command(text: &str) -> Option<Action> {
    let word = text.trim().split_whitespace().next()?.strip_prefix('/')?;
    let name = word.split('@').next().unwrap_or(word).to_lowercase();

    let action = match name.as_str() {
        "start" => Action::Start,
        "help" => Action::Help,
        "cancel" => Action::Cancel,
        "reset" => Action::Reset,
        "add" => Action::Add,
        "last" => Action::Last,
        "delete" => Action::Delete,
        "report" => Action::Report,
        "stats" => Action::Stats,
        _ => return None,
    };
    Some(action)
}

pub fn parse_callback(data: &str) -> Option<Action> {
    let action = match data {
        callback::ADD => Action::Add,
        callback::LAST => Action::Last,
        callback::DELETE => Action::Delete,
        callback::REPORT => Action::Report,
        callback::STATS => Action::Stats,
        callback::RESET => Action::Reset,
        callback::HELP => Action::Help,
        callback::SAVE => Action::Save,
        callback::CANCEL => Action::Cancel,
        _ => return None,
    };
    Some(action)
}

/// Action for an incoming text message: a known command, or free text for the
/// conversation
pub fn action_for_text(text: &str) -> Action {
    parse_command(text).unwrap_or_else(|| Action::Text(text.to_string()))
}
