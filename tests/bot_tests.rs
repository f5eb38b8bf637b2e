use mileage_bot::bot::commands::{action_for_text, parse_callback};
use mileage_bot::bot::ui_builder::{format_statistics, render_reply};
use mileage_bot::dialogue::Prompt;
use mileage_bot::fuel::Distribution;
use mileage_bot::ledger::{column, Row};
use mileage_bot::reports::{last_record, statistics};
use mileage_bot::tracker::{Action, MenuKind, Reply};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    /// Every button of the main menu maps back to an action
    #[test]
    fn test_menu_buttons_round_trip_to_actions() {
        let (_, keyboard) = render_reply(&Reply::Menu(MenuKind::Greeting), Some("en"));
        let keyboard = keyboard.expect("menu has a keyboard");

        let mut actions = Vec::new();
        for button in keyboard.inline_keyboard.iter().flatten() {
            let data = match &button.kind {
                teloxide::types::InlineKeyboardButtonKind::CallbackData(data) => data.clone(),
                other => panic!("unexpected button kind {other:?}"),
            };
            actions.push(parse_callback(&data).expect("known payload"));
        }

        assert_eq!(
            actions,
            vec![
                Action::Add,
                Action::Last,
                Action::Delete,
                Action::Report,
                Action::Stats,
                Action::Reset,
                Action::Help,
            ]
        );
    }

    #[test]
    fn test_command_addressed_to_bot() {
        assert_eq!(action_for_text("/report@mileage_bot"), Action::Report);
        assert_eq!(action_for_text("привіт"), Action::Text("привіт".to_string()));
    }

    #[test]
    fn test_distribution_prompt_contains_example() {
        let prompt = Prompt::AskDistribution {
            diff: 200,
            example: Distribution::example_for(200),
        };
        let (text, keyboard) = render_reply(&Reply::Dialogue(prompt), Some("en"));
        assert!(text.contains("66/66/68"));
        assert!(text.contains("200 km"));
        assert!(keyboard.is_some());
    }

    #[test]
    fn test_unparsed_last_record_shows_raw_cells() {
        let mut row: Row = vec![String::new(); 3];
        row[column::RECORDED_AT] = "2026-10-18".to_string();
        row[column::ODOMETER] = "53000".to_string();
        row[column::DIFF] = "??".to_string();

        let last = last_record(&[row]);
        let (text, _) = render_reply(&Reply::LastRecord(last), Some("en"));
        assert!(text.contains("2026-10-18"));
        assert!(text.contains("53000"));
        assert!(text.contains("??"));
    }

    #[test]
    fn test_statistics_rendering() {
        let row: Row = [
            "2026-10-18 18:30:00",
            "53200",
            "200",
            "100",
            "11.6600",
            "11.66",
            "60",
            "6.7020",
            "6.70",
            "40",
            "4.0760",
            "4.08",
            "22.4380",
            "22.44",
        ]
        .iter()
        .map(|cell| cell.to_string())
        .collect();
        let now =
            NaiveDateTime::parse_from_str("2026-10-19 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap();

        let text = format_statistics(&statistics(&[row], now), Some("en"));
        assert!(text.contains("Records: 1"));
        assert!(text.contains("Distance: 200 km, fuel: 22.44 l"));
        assert!(text.contains("Average consumption: 11.22 l/100 km"));
        assert!(text.contains("50.0%"));
        assert!(text.contains("█████░░░░░"));
        assert!(text.contains("Last 7 days: 1 records"));
    }
}
