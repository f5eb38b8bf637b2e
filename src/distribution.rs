//! # Distribution Parser
//!
//! Parses the free-text split of a trip into city, district and highway
//! kilometers. Input is tokenized into words and numbers; words that are known
//! category labels (Ukrainian, Russian or English) tag the number that follows
//! them. Without any labels, exactly three bare numbers are read in
//! city/district/highway order.
//!
//! Accepted forms include:
//! - `місто 50 район 30 траса 20`
//! - `м 50 р 30 т 20`, `траса 20 місто 50 район 30`
//! - `50/30/20`, `50 30 20`

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::fuel::{Distribution, RoadCategory};

lazy_static! {
    static ref TOKEN_REGEX: Regex =
        Regex::new(r"(\p{L}+)|(\d+)").expect("Token pattern should be valid");
}

/// Reasons a distribution input is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistributionError {
    #[error("expected exactly three numbers, found {found}")]
    WrongCount { found: usize },
    #[error("category {0:?} is not followed by a number")]
    MissingNumber(RoadCategory),
    #[error("category {0:?} is given more than once")]
    DuplicateCategory(RoadCategory),
    #[error("category {0:?} is missing")]
    MissingCategory(RoadCategory),
    #[error("number {0} is too large")]
    NumberTooLarge(String),
    #[error("kilometers add up to {actual}, expected {expected}")]
    SumMismatch { expected: u32, actual: u64 },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Label(RoadCategory),
    Number(u32),
    Word,
}

/// Map a lower-cased word to the category it labels
fn category_for_label(word: &str) -> Option<RoadCategory> {
    match word {
        "місто" | "м" | "город" | "г" | "city" | "c" => Some(RoadCategory::City),
        "район" | "р" | "district" | "d" => Some(RoadCategory::District),
        "траса" | "т" | "шосе" | "ш" | "highway" | "h" => Some(RoadCategory::Highway),
        _ => None,
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, DistributionError> {
    let lowered = text.to_lowercase();
    let mut tokens = Vec::new();

    for capture in TOKEN_REGEX.captures_iter(&lowered) {
        if let Some(word) = capture.get(1) {
            tokens.push(match category_for_label(word.as_str()) {
                Some(category) => Token::Label(category),
                None => Token::Word,
            });
        } else if let Some(number) = capture.get(2) {
            let value = number
                .as_str()
                .parse::<u32>()
                .map_err(|_| DistributionError::NumberTooLarge(number.as_str().to_string()))?;
            tokens.push(Token::Number(value));
        }
    }

    Ok(tokens)
}

fn parse_labeled(tokens: &[Token]) -> Result<Distribution, DistributionError> {
    let mut values: [Option<u32>; 3] = [None; 3];

    for (i, token) in tokens.iter().enumerate() {
        if let Token::Label(category) = token {
            let value = match tokens.get(i + 1) {
                Some(Token::Number(value)) => *value,
                _ => return Err(DistributionError::MissingNumber(*category)),
            };
            let slot = &mut values[category_index(*category)];
            if slot.is_some() {
                return Err(DistributionError::DuplicateCategory(*category));
            }
            *slot = Some(value);
        }
    }

    let numbers = tokens
        .iter()
        .filter(|t| matches!(t, Token::Number(_)))
        .count();
    if numbers != 3 {
        return Err(DistributionError::WrongCount { found: numbers });
    }

    let take = |category: RoadCategory| {
        values[category_index(category)].ok_or(DistributionError::MissingCategory(category))
    };
    Ok(Distribution::new(
        take(RoadCategory::City)?,
        take(RoadCategory::District)?,
        take(RoadCategory::Highway)?,
    ))
}

fn parse_positional(tokens: &[Token]) -> Result<Distribution, DistributionError> {
    let numbers: Vec<u32> = tokens
        .iter()
        .filter_map(|t| match t {
            Token::Number(n) => Some(*n),
            _ => None,
        })
        .collect();

    match numbers.as_slice() {
        [city, district, highway] => Ok(Distribution::new(*city, *district, *highway)),
        other => Err(DistributionError::WrongCount { found: other.len() }),
    }
}

fn category_index(category: RoadCategory) -> usize {
    match category {
        RoadCategory::City => 0,
        RoadCategory::District => 1,
        RoadCategory::Highway => 2,
    }
}

/// Parse the distribution text without checking it against the trip distance
pub fn parse_distribution(text: &str) -> Result<Distribution, DistributionError> {
    let tokens = tokenize(text)?;
    let labeled = tokens.iter().any(|t| matches!(t, Token::Label(_)));

    if labeled {
        parse_labeled(&tokens)
    } else {
        parse_positional(&tokens)
    }
}

/// Parse the distribution text and require it to add up to `diff` kilometers
pub fn parse_distribution_for(text: &str, diff: u32) -> Result<Distribution, DistributionError> {
    let distribution = parse_distribution(text)?;
    let actual = distribution.total();

    if actual != diff as u64 {
        debug!(expected = diff, actual, "Distribution sum mismatch");
        return Err(DistributionError::SumMismatch {
            expected: diff,
            actual,
        });
    }

    Ok(distribution)
}
