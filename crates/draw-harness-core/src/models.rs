//! Canonical draw records for the two supported games.
//!
//! Every record that reaches a dataset has passed through
//! [`normalize`](crate::normalize). Derived figures (sums, spans, parity and
//! size counts) are computed on demand from the numbers and never stored.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::normalize::Normalize;

/// The two lottery games handled by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Game {
    /// 3-digit game: three digits 0-9 per draw.
    Fc3d,
    /// 6+1 ball game: six red balls 1-33 plus one blue ball 1-16.
    Ssq,
}

impl Game {
    pub const ALL: [Game; 2] = [Game::Fc3d, Game::Ssq];

    /// Path segment used by the draw API (`/api/{slug}`) and by cache keys.
    pub fn slug(&self) -> &'static str {
        match self {
            Game::Fc3d => "fc3d",
            Game::Ssq => "ssq",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Game::Fc3d => "3-digit",
            Game::Ssq => "6+1 ball",
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Game {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fc3d" | "3d" => Ok(Game::Fc3d),
            "ssq" => Ok(Game::Ssq),
            other => Err(format!("unknown game '{}'. Must be fc3d or ssq.", other)),
        }
    }
}

/// A canonical draw record of one game.
///
/// Implemented by [`Fc3dDraw`] and [`SsqDraw`]. Lets the cache store and the
/// acquisition pipeline handle both games through one generic code path.
pub trait Draw: Normalize + Serialize + Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// The game this record type belongs to.
    const GAME: Game;

    fn period(&self) -> &str;

    fn date(&self) -> &str;
}

/// One 3-digit game result.
///
/// Serializes to `{"period", "date", "number": "123"}`, which is itself an
/// accepted raw record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fc3dDraw {
    pub period: String,
    pub date: String,
    #[serde(rename = "number", serialize_with = "digits_as_string")]
    pub digits: [u8; 3],
}

/// Derived figures of a 3-digit draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fc3dStats {
    pub sum: u32,
    pub span: u8,
    pub odd_count: u8,
    pub even_count: u8,
    pub big_count: u8,
    pub small_count: u8,
}

impl Fc3dDraw {
    /// The digits as a 3-character string (`"047"`).
    pub fn number(&self) -> String {
        self.digits.iter().map(|d| char::from(b'0' + d)).collect()
    }

    pub fn stats(&self) -> Fc3dStats {
        let d = &self.digits;
        let max = d.iter().copied().max().unwrap_or(0);
        let min = d.iter().copied().min().unwrap_or(0);
        let odd = d.iter().filter(|&&n| n % 2 == 1).count() as u8;
        let big = d.iter().filter(|&&n| n >= 5).count() as u8;
        Fc3dStats {
            sum: d.iter().map(|&n| u32::from(n)).sum(),
            span: max - min,
            odd_count: odd,
            even_count: 3 - odd,
            big_count: big,
            small_count: 3 - big,
        }
    }
}

impl Draw for Fc3dDraw {
    const GAME: Game = Game::Fc3d;

    fn period(&self) -> &str {
        &self.period
    }

    fn date(&self) -> &str {
        &self.date
    }
}

fn digits_as_string<S: Serializer>(digits: &[u8; 3], serializer: S) -> Result<S::Ok, S::Error> {
    let s: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
    serializer.serialize_str(&s)
}

/// One 6+1 ball game result.
///
/// `red_balls` holds six distinct values in 1-33, ascending. Serializes to
/// `{"period", "date", "redBalls": [..], "blueBall": n}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SsqDraw {
    pub period: String,
    pub date: String,
    #[serde(rename = "redBalls")]
    pub red_balls: [u8; 6],
    #[serde(rename = "blueBall")]
    pub blue_ball: u8,
}

/// Derived figures of a 6+1 draw, over the red balls only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SsqStats {
    pub red_sum: u32,
    pub red_odd_count: u8,
    pub red_even_count: u8,
    pub red_big_count: u8,
    pub red_small_count: u8,
}

impl SsqDraw {
    pub fn stats(&self) -> SsqStats {
        let reds = &self.red_balls;
        let odd = reds.iter().filter(|&&n| n % 2 == 1).count() as u8;
        let big = reds.iter().filter(|&&n| n > 16).count() as u8;
        SsqStats {
            red_sum: reds.iter().map(|&n| u32::from(n)).sum(),
            red_odd_count: odd,
            red_even_count: 6 - odd,
            red_big_count: big,
            red_small_count: 6 - big,
        }
    }
}

impl Draw for SsqDraw {
    const GAME: Game = Game::Ssq;

    fn period(&self) -> &str {
        &self.period
    }

    fn date(&self) -> &str {
        &self.date
    }
}

/// A draw together with its derived figures, flattened into one JSON object.
///
/// Used by the companion draw service so consumers get the same shape the
/// browser front end renders.
#[derive(Debug, Serialize)]
pub struct DrawView<'a, D: Serialize, S: Serialize> {
    #[serde(flatten)]
    pub draw: &'a D,
    #[serde(flatten)]
    pub stats: S,
}

impl<'a> From<&'a Fc3dDraw> for DrawView<'a, Fc3dDraw, Fc3dStats> {
    fn from(draw: &'a Fc3dDraw) -> Self {
        DrawView {
            draw,
            stats: draw.stats(),
        }
    }
}

impl<'a> From<&'a SsqDraw> for DrawView<'a, SsqDraw, SsqStats> {
    fn from(draw: &'a SsqDraw) -> Self {
        DrawView {
            draw,
            stats: draw.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fc3d_stats() {
        let draw = Fc3dDraw {
            period: "2024001".to_string(),
            date: "2024-01-01".to_string(),
            digits: [7, 0, 4],
        };
        let stats = draw.stats();
        assert_eq!(stats.sum, 11);
        assert_eq!(stats.span, 7);
        assert_eq!(stats.odd_count, 1);
        assert_eq!(stats.even_count, 2);
        assert_eq!(stats.big_count, 1);
        assert_eq!(stats.small_count, 2);
        assert_eq!(draw.number(), "704");
    }

    #[test]
    fn test_ssq_stats() {
        let draw = SsqDraw {
            period: "2024001".to_string(),
            date: "2024-01-01".to_string(),
            red_balls: [1, 8, 16, 17, 25, 33],
            blue_ball: 9,
        };
        let stats = draw.stats();
        assert_eq!(stats.red_sum, 100);
        assert_eq!(stats.red_odd_count, 4);
        assert_eq!(stats.red_even_count, 2);
        assert_eq!(stats.red_big_count, 3);
        assert_eq!(stats.red_small_count, 3);
    }

    #[test]
    fn test_canonical_serialization() {
        let fc3d = Fc3dDraw {
            period: "1".to_string(),
            date: "2024-01-01".to_string(),
            digits: [0, 0, 9],
        };
        let json = serde_json::to_value(&fc3d).unwrap();
        assert_eq!(json["number"], "009");
        assert!(json.get("digits").is_none());

        let ssq = SsqDraw {
            period: "1".to_string(),
            date: "2024-01-01".to_string(),
            red_balls: [1, 2, 3, 4, 5, 6],
            blue_ball: 16,
        };
        let json = serde_json::to_value(&ssq).unwrap();
        assert_eq!(json["redBalls"], serde_json::json!([1, 2, 3, 4, 5, 6]));
        assert_eq!(json["blueBall"], 16);
    }

    #[test]
    fn test_draw_view_flattens_stats() {
        let draw = Fc3dDraw {
            period: "1".to_string(),
            date: "2024-01-01".to_string(),
            digits: [1, 2, 3],
        };
        let json = serde_json::to_value(DrawView::from(&draw)).unwrap();
        assert_eq!(json["number"], "123");
        assert_eq!(json["sum"], 6);
        assert_eq!(json["oddCount"], 2);
    }

    #[test]
    fn test_game_from_str() {
        assert_eq!("fc3d".parse::<Game>().unwrap(), Game::Fc3d);
        assert_eq!(" SSQ ".parse::<Game>().unwrap(), Game::Ssq);
        assert!("keno".parse::<Game>().is_err());
    }
}
