//! Synthetic draw history.
//!
//! Produces plausible-looking datasets for demos, tests and the companion
//! draw service when no upstream is reachable. Records are newest first,
//! numbered `2024{1000-i:03}` and dated one day apart going back from
//! `today`.
//!
//! 3-digit draws pick each digit from a slightly skewed distribution and
//! never come out as a triple (`777`). 6+1 draws pick six distinct reds and
//! a uniform blue.

use chrono::{Duration, NaiveDate};
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use draw_harness_core::models::{Fc3dDraw, SsqDraw};

/// Upper bound on records generated per call.
pub const MAX_SYNTHETIC: usize = 1000;

const DIGIT_WEIGHTS: [f64; 10] = [
    0.105, 0.108, 0.102, 0.095, 0.098, 0.100, 0.102, 0.105, 0.108, 0.107,
];

pub struct DrawGenerator {
    rng: StdRng,
    digits: WeightedIndex<f64>,
}

impl DrawGenerator {
    /// A generator seeded from `seed`, or from OS entropy when `None`.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let digits = WeightedIndex::new(DIGIT_WEIGHTS).expect("digit weights are positive");
        Self { rng, digits }
    }

    pub fn fc3d(&mut self, count: usize, today: NaiveDate) -> Vec<Fc3dDraw> {
        (0..count.min(MAX_SYNTHETIC))
            .map(|i| Fc3dDraw {
                period: period(i),
                date: date(today, i),
                digits: self.fc3d_digits(),
            })
            .collect()
    }

    pub fn ssq(&mut self, count: usize, today: NaiveDate) -> Vec<SsqDraw> {
        (0..count.min(MAX_SYNTHETIC))
            .map(|i| {
                let mut red_balls = [0u8; 6];
                for (slot, n) in red_balls
                    .iter_mut()
                    .zip(index::sample(&mut self.rng, 33, 6).into_iter())
                {
                    *slot = n as u8 + 1;
                }
                red_balls.sort_unstable();
                SsqDraw {
                    period: period(i),
                    date: date(today, i),
                    red_balls,
                    blue_ball: self.rng.gen_range(1..=16),
                }
            })
            .collect()
    }

    fn fc3d_digits(&mut self) -> [u8; 3] {
        let mut digits = [0u8; 3];
        for d in digits.iter_mut() {
            *d = self.digits.sample(&mut self.rng) as u8;
        }
        while digits[0] == digits[1] && digits[1] == digits[2] {
            digits[2] = self.rng.gen_range(0..=9);
        }
        digits
    }
}

fn period(i: usize) -> String {
    format!("2024{:03}", 1000 - i)
}

fn date(today: NaiveDate, i: usize) -> String {
    (today - Duration::days(i as i64))
        .format("%Y-%m-%d")
        .to_string()
}
