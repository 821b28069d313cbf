//! Summarization fallback state
//!
//! Summaries are tried on the outline model first, then the writer model,
//! each with the same attempt schedule. When both tiers are exhausted the
//! chapter still completes with an empty summary.

use std::fmt;

/// Which configured model a summary attempt uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Outline,
    Writer,
}

impl ModelTier {
    /// Tier tried after this one, if any
    pub fn next(self) -> Option<Self> {
        match self {
            ModelTier::Outline => Some(ModelTier::Writer),
            ModelTier::Writer => None,
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelTier::Outline => write!(f, "outline"),
            ModelTier::Writer => write!(f, "writer"),
        }
    }
}

/// Where summarization stands; `attempt` is 1-based within the tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryState {
    Attempting { tier: ModelTier, attempt: usize },
    Degraded,
}

impl SummaryState {
    /// First state for a schedule of `attempts_per_tier` attempts
    pub fn start(attempts_per_tier: usize) -> Self {
        if attempts_per_tier == 0 {
            SummaryState::Degraded
        } else {
            SummaryState::Attempting {
                tier: ModelTier::Outline,
                attempt: 1,
            }
        }
    }

    /// State after a rejected attempt
    pub fn advance(self, attempts_per_tier: usize) -> Self {
        match self {
            SummaryState::Attempting { tier, attempt } if attempt < attempts_per_tier => SummaryState::Attempting {
                tier,
                attempt: attempt + 1,
            },
            SummaryState::Attempting { tier, .. } => match tier.next() {
                Some(tier) if attempts_per_tier > 0 => SummaryState::Attempting { tier, attempt: 1 },
                _ => SummaryState::Degraded,
            },
            SummaryState::Degraded => SummaryState::Degraded,
        }
    }
}
