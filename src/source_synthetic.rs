//! Offline [`DrawSource`] backed by [`DrawGenerator`].
//!
//! Ignores the base URL and always answers. Selected with
//! `[source] kind = "synthetic"`.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};

use draw_harness_core::clock::Clock;
use draw_harness_core::models::Game;

use crate::generator::DrawGenerator;
use crate::traits::{DrawSource, FetchError, FetchOutcome};

pub struct SyntheticSource {
    generator: Mutex<DrawGenerator>,
    clock: Arc<dyn Clock>,
}

impl SyntheticSource {
    pub fn new(seed: Option<u64>, clock: Arc<dyn Clock>) -> Self {
        Self {
            generator: Mutex::new(DrawGenerator::new(seed)),
            clock,
        }
    }
}

#[async_trait]
impl DrawSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn health(&self, _base_url: &str) -> Result<(), FetchError> {
        Ok(())
    }

    async fn fetch(&self, _base_url: &str, game: Game, limit: usize) -> FetchOutcome<Vec<Value>> {
        let today = self.clock.now().date_naive();
        let mut generator = self.generator.lock().unwrap_or_else(PoisonError::into_inner);
        let raw = match game {
            Game::Fc3d => serde_json::to_value(generator.fc3d(limit, today)),
            Game::Ssq => serde_json::to_value(generator.ssq(limit, today)),
        };
        match raw {
            Ok(Value::Array(records)) if !records.is_empty() => FetchOutcome::Data(records),
            Ok(_) => FetchOutcome::Empty,
            Err(e) => FetchOutcome::Failed(FetchError::Parse(e.to_string())),
        }
    }
}
