use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Trade direction emitted at a velocity crossover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    /// The action that must follow this one in a well-formed event stream.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Action::Buy => Action::Sell,
            Action::Sell => Action::Buy,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Buy => write!(f, "Buy"),
            Action::Sell => write!(f, "Sell"),
        }
    }
}

/// A discrete trend reversal at a single observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReversalEvent {
    /// Position of the observation in its price series.
    pub index: usize,
    pub date: NaiveDate,
    pub action: Action,
    pub price: f64,
}
