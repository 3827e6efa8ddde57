use std::collections::HashMap;
use std::ops::Range;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;

use super::domain::{ClientId, RiskAssessment};

/// Error raised when a bureau lookup cannot complete.
#[derive(Debug, thiserror::Error)]
pub enum BureauError {
    #[error("risk bureau transport failed: {0}")]
    Transport(String),
}

/// Boundary over the external credit bureau. The engine performs exactly one
/// lookup per submission and never retries on its own; operators resubmit
/// after a failure instead.
#[async_trait]
pub trait RiskAssessmentClient: Send + Sync {
    async fn assess(
        &self,
        subject_id: &ClientId,
        monthly_income: Decimal,
    ) -> Result<RiskAssessment, BureauError>;
}

const UNKNOWN_SCORE_RANGE: Range<u16> = 400..800;
const DEFAULT_LATENCY: Duration = Duration::from_millis(1500);

/// Stand-in bureau used until the real integration lands.
///
/// Subjects in the seeded profile table always score the same, which keeps
/// demos and parity tests stable. Any other subject draws a fresh uniform
/// score from [400, 800) on every call, so two lookups for the same unknown
/// subject can disagree.
#[derive(Debug, Clone)]
pub struct SimulatedBureau {
    profiles: HashMap<String, u16>,
    latency: Duration,
}

impl SimulatedBureau {
    pub fn new(latency: Duration) -> Self {
        let profiles = HashMap::from([
            ("C-1001".to_string(), 750),
            ("C-1002".to_string(), 650),
            ("C-1003".to_string(), 450),
        ]);

        Self { profiles, latency }
    }

    /// Replace the seeded score table, e.g. to mirror staging bureau data.
    pub fn with_profiles(mut self, profiles: impl IntoIterator<Item = (String, u16)>) -> Self {
        self.profiles = profiles.into_iter().collect();
        self
    }

    fn score_for(&self, subject_id: &ClientId) -> u16 {
        match self.profiles.get(subject_id.0.as_str()) {
            Some(score) => *score,
            None => rand::rng().random_range(UNKNOWN_SCORE_RANGE),
        }
    }
}

impl Default for SimulatedBureau {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY)
    }
}

#[async_trait]
impl RiskAssessmentClient for SimulatedBureau {
    async fn assess(
        &self,
        subject_id: &ClientId,
        monthly_income: Decimal,
    ) -> Result<RiskAssessment, BureauError> {
        tokio::time::sleep(self.latency).await;
        Ok(RiskAssessment::from_score(
            self.score_for(subject_id),
            monthly_income,
        ))
    }
}
