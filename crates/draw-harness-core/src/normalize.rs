//! Record normalization.
//!
//! Draw sources disagree on field names and encodings: the 3-digit result may
//! arrive as `number` or `red`, the period as `period` or `code`, red balls as
//! a JSON array or a comma-separated string. This module is the one place
//! those shapes are reconciled. Consumers only ever see [`Fc3dDraw`] and
//! [`SsqDraw`].
//!
//! # Aliases
//!
//! Each logical field has an ordered alias list. The first alias whose value
//! is present and non-empty wins (`null`, `""`, `0` and `false` count as
//! absent).
//!
//! | Field | Aliases |
//! |-------|---------|
//! | period | `period`, `code` |
//! | date | `date` |
//! | 3-digit number | `number`, `red` |
//! | red balls | `redBalls`, `red` |
//! | blue ball | `blueBall`, `blue` |
//!
//! # Rejections
//!
//! A record that fails validation is rejected as a whole; no partially valid
//! record ever reaches a dataset. [`normalize_batch`] logs and drops
//! rejections so one bad entry never sinks the batch.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{Draw, Fc3dDraw, SsqDraw};

pub const PERIOD_ALIASES: &[&str] = &["period", "code"];
pub const DATE_ALIASES: &[&str] = &["date"];
pub const DIGIT_ALIASES: &[&str] = &["number", "red"];
pub const RED_BALL_ALIASES: &[&str] = &["redBalls", "red"];
pub const BLUE_BALL_ALIASES: &[&str] = &["blueBall", "blue"];

/// Why a raw record was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("missing field (tried {0:?})")]
    MissingField(&'static [&'static str]),
    #[error("expected 3 digits, got {found} from {raw:?}")]
    DigitCount { found: usize, raw: String },
    #[error("expected 6 red balls, got {0}")]
    RedBallCount(usize),
    #[error("red ball {0} outside 1-33")]
    RedBallOutOfRange(i64),
    #[error("duplicate red ball {0}")]
    DuplicateRedBall(u8),
    #[error("blue ball {0} outside 1-16")]
    BlueBallOutOfRange(i64),
}

/// Conversion from one loosely typed raw record into a canonical draw.
pub trait Normalize: Sized {
    fn normalize(raw: &Value) -> Result<Self, Rejection>;
}

/// Result of normalizing a batch: accepted records in input order, plus the
/// input index and reason of every rejected entry.
#[derive(Debug, Clone)]
pub struct Normalized<D> {
    pub records: Vec<D>,
    pub rejected: Vec<(usize, Rejection)>,
}

/// Normalize a batch of raw records, dropping (and logging) rejections.
pub fn normalize_batch<D: Draw>(raw: &[Value]) -> Normalized<D> {
    let mut records = Vec::with_capacity(raw.len());
    let mut rejected = Vec::new();

    for (idx, item) in raw.iter().enumerate() {
        match D::normalize(item) {
            Ok(draw) => records.push(draw),
            Err(reason) => {
                tracing::warn!(game = %D::GAME, index = idx, %reason, "dropping malformed record");
                rejected.push((idx, reason));
            }
        }
    }

    Normalized { records, rejected }
}

impl Normalize for Fc3dDraw {
    fn normalize(raw: &Value) -> Result<Self, Rejection> {
        let obj = raw.as_object().ok_or(Rejection::NotAnObject)?;

        let number = lookup(obj, DIGIT_ALIASES)
            .and_then(scalar_text)
            .ok_or(Rejection::MissingField(DIGIT_ALIASES))?;

        let cleaned: Vec<u8> = number
            .bytes()
            .filter(u8::is_ascii_digit)
            .map(|b| b - b'0')
            .collect();
        let digits: [u8; 3] = cleaned
            .as_slice()
            .try_into()
            .map_err(|_| Rejection::DigitCount {
                found: cleaned.len(),
                raw: number.clone(),
            })?;

        Ok(Fc3dDraw {
            period: text_field(obj, PERIOD_ALIASES),
            date: text_field(obj, DATE_ALIASES),
            digits,
        })
    }
}

impl Normalize for SsqDraw {
    fn normalize(raw: &Value) -> Result<Self, Rejection> {
        let obj = raw.as_object().ok_or(Rejection::NotAnObject)?;

        let reds = lookup(obj, RED_BALL_ALIASES)
            .and_then(BallList::from_value)
            .ok_or(Rejection::MissingField(RED_BALL_ALIASES))?
            .values();
        if reds.len() != 6 {
            return Err(Rejection::RedBallCount(reds.len()));
        }
        let mut red_balls = [0u8; 6];
        for (slot, &n) in red_balls.iter_mut().zip(reds.iter()) {
            if !(1..=33).contains(&n) {
                return Err(Rejection::RedBallOutOfRange(n));
            }
            *slot = n as u8;
        }
        red_balls.sort_unstable();
        if let Some(pair) = red_balls.windows(2).find(|w| w[0] == w[1]) {
            return Err(Rejection::DuplicateRedBall(pair[0]));
        }

        let blue = lookup(obj, BLUE_BALL_ALIASES)
            .and_then(scalar_int)
            .ok_or(Rejection::MissingField(BLUE_BALL_ALIASES))?;
        if !(1..=16).contains(&blue) {
            return Err(Rejection::BlueBallOutOfRange(blue));
        }

        Ok(SsqDraw {
            period: text_field(obj, PERIOD_ALIASES),
            date: text_field(obj, DATE_ALIASES),
            red_balls,
            blue_ball: blue as u8,
        })
    }
}

/// The two encodings of a red-ball collection.
enum BallList<'a> {
    Array(&'a [Value]),
    Delimited(String),
}

impl<'a> BallList<'a> {
    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(BallList::Array(items)),
            Value::String(s) => Some(BallList::Delimited(s.clone())),
            Value::Number(n) => Some(BallList::Delimited(n.to_string())),
            _ => None,
        }
    }

    /// Numeric values in input order; unreadable tokens are skipped.
    fn values(&self) -> Vec<i64> {
        match self {
            BallList::Array(items) => items.iter().filter_map(scalar_int).collect(),
            BallList::Delimited(s) => s.split(',').filter_map(parse_int_prefix).collect(),
        }
    }
}

fn lookup<'a>(obj: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| is_present(value))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_field(obj: &Map<String, Value>, aliases: &[&str]) -> String {
    lookup(obj, aliases)
        .and_then(scalar_text)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn scalar_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => parse_int_prefix(s),
        _ => None,
    }
}

/// Parse the leading integer of `s`, ignoring surrounding whitespace and any
/// trailing garbage (`" 07"` → 7, `"12a"` → 12, `"x1"` → none).
fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok().map(|n| sign * n)
}
