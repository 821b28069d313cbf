//! Bounded retry with an escalating output budget
//!
//! Scene planning and summarization both ask for structured JSON and both
//! retry locally when the response fails validation. The schedule is data:
//! each attempt carries its own sampling parameters, so later attempts can
//! get a larger token budget.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Sampling parameters for one attempt
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttemptSpec {
    pub temperature: f32,
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,
}

impl AttemptSpec {
    pub const fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

/// The result of one attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    Accepted(T),
    Rejected { raw: String, reason: String },
}

/// The result of running a whole sequence
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome<T> {
    /// `attempt` is 1-based
    Accepted { value: T, attempt: usize },
    Exhausted { last_error: String },
}

impl<T> AttemptOutcome<T> {
    pub fn into_value(self) -> Option<T> {
        match self {
            AttemptOutcome::Accepted { value, .. } => Some(value),
            AttemptOutcome::Exhausted { .. } => None,
        }
    }
}

/// An ordered list of attempts tried until one validates
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptSequence {
    attempts: Vec<AttemptSpec>,
}

impl AttemptSequence {
    pub fn new(attempts: Vec<AttemptSpec>) -> Self {
        Self { attempts }
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn specs(&self) -> &[AttemptSpec] {
        &self.attempts
    }

    /// Run attempt `n` (1-based); `None` when the sequence has no such attempt
    ///
    /// `call` performs the model request and yields raw text. Its errors are
    /// returned untouched; only validation failures become `Rejected`.
    pub async fn attempt<T, E, F, Fut, V>(&self, n: usize, call: &mut F, validate: &V) -> Result<Option<Step<T>>, E>
    where
        F: FnMut(AttemptSpec) -> Fut,
        Fut: Future<Output = Result<String, E>>,
        V: Fn(&str) -> Result<T, String>,
    {
        let Some(spec) = n.checked_sub(1).and_then(|i| self.attempts.get(i)).copied() else {
            debug!(%n, "attempt: past end of sequence");
            return Ok(None);
        };
        debug!(%n, temperature = spec.temperature, max_tokens = spec.max_tokens, "attempt: called");

        let raw = call(spec).await?;
        match validate(&raw) {
            Ok(value) => Ok(Some(Step::Accepted(value))),
            Err(reason) => Ok(Some(Step::Rejected { raw, reason })),
        }
    }

    /// Try each attempt in order until one validates
    ///
    /// `on_reject(n, raw)` runs after every rejected attempt, before the next
    /// one starts. An error from `call` or `on_reject` ends the run.
    pub async fn run<T, E, F, Fut, V, R>(&self, mut call: F, validate: V, mut on_reject: R) -> Result<AttemptOutcome<T>, E>
    where
        F: FnMut(AttemptSpec) -> Fut,
        Fut: Future<Output = Result<String, E>>,
        V: Fn(&str) -> Result<T, String>,
        R: FnMut(usize, &str) -> Result<(), E>,
    {
        debug!(attempts = %self.attempts.len(), "run: called");
        let mut last_error = String::from("no attempts configured");

        for n in 1..=self.attempts.len() {
            match self.attempt(n, &mut call, &validate).await? {
                Some(Step::Accepted(value)) => {
                    debug!(%n, "run: accepted");
                    return Ok(AttemptOutcome::Accepted { value, attempt: n });
                }
                Some(Step::Rejected { raw, reason }) => {
                    warn!(%n, %reason, "run: attempt rejected");
                    on_reject(n, &raw)?;
                    last_error = reason;
                }
                None => break,
            }
        }

        Ok(AttemptOutcome::Exhausted { last_error })
    }
}
