//! Behavior tables for the monkey layer
//!
//! A behavior is a weighted rule: with probability `frequency` the response
//! gets corrupted by its effect. The residual mass `1 - Σfrequency` passes
//! requests through untouched.

mod selector;

use std::path::Path;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

pub use selector::select;

/// Absolute tolerance when comparing accumulated frequencies against 1.
pub const FREQUENCY_EPSILON: f64 = 1e-9;

/// One behavior as written in the YAML file.
///
/// ```yaml
/// # Returns a 404 30% of the time
/// - status: 404
///   frequency: 0.3
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BehaviorRecord {
    pub frequency: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Byte count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garbage: Option<usize>,
}

/// What happens to a response when its behavior fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Reserved slot: fires, but the delegate's response goes out untouched
    Noop,
    /// Delegate's real response, sent late
    Delay(Duration),
    /// Delegate's real response with the status code forced
    Status(u16),
    /// Body replaced verbatim; 200 unless `status` is set
    Body { body: String, status: Option<u16> },
    /// Exactly `bytes` of filler; 200 unless `status` is set
    Garbage { bytes: usize, status: Option<u16> },
}

impl Effect {
    /// Short name for logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Delay(_) => "delay",
            Self::Status(_) => "status",
            Self::Body { .. } => "body",
            Self::Garbage { .. } => "garbage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BehaviorError {
    #[error("frequency {0} is outside [0, 1]")]
    FrequencyOutOfRange(f64),
    #[error("{0} is not a valid HTTP status code")]
    InvalidStatus(u16),
    #[error("conflicting effects {0:?}: set only one of body, delay, garbage")]
    ConflictingEffects(Vec<&'static str>),
    #[error("delay cannot be combined with a status override")]
    DelayWithStatus,
}

/// A validated, immutable weighted rule
#[derive(Debug, Clone, PartialEq)]
pub struct Behavior {
    frequency: f64,
    effect: Effect,
}

impl Behavior {
    /// # Errors
    ///
    /// Returns error if `frequency` is not a finite value in `[0, 1]` or the
    /// effect carries an invalid status code.
    pub fn new(frequency: f64, effect: Effect) -> Result<Self, BehaviorError> {
        if !frequency.is_finite() || !(0.0..=1.0).contains(&frequency) {
            return Err(BehaviorError::FrequencyOutOfRange(frequency));
        }
        let status = match &effect {
            Effect::Status(code) => Some(*code),
            Effect::Body { status, .. } | Effect::Garbage { status, .. } => *status,
            Effect::Noop | Effect::Delay(_) => None,
        };
        if let Some(code) = status {
            if !(100..=599).contains(&code) {
                return Err(BehaviorError::InvalidStatus(code));
            }
        }
        Ok(Self { frequency, effect })
    }

    #[must_use]
    pub const fn frequency(&self) -> f64 {
        self.frequency
    }

    #[must_use]
    pub const fn effect(&self) -> &Effect {
        &self.effect
    }
}

impl TryFrom<BehaviorRecord> for Behavior {
    type Error = BehaviorError;

    /// A status override may accompany a body or garbage replacement (it is
    /// the replacement's status line). Any other combination is rejected.
    fn try_from(record: BehaviorRecord) -> Result<Self, Self::Error> {
        let mut payloads = Vec::new();
        if record.body.is_some() {
            payloads.push("body");
        }
        if record.delay.is_some() {
            payloads.push("delay");
        }
        if record.garbage.is_some() {
            payloads.push("garbage");
        }
        if payloads.len() > 1 {
            return Err(BehaviorError::ConflictingEffects(payloads));
        }

        let effect = match (record.body, record.delay, record.garbage, record.status) {
            (Some(body), _, _, status) => Effect::Body { body, status },
            (_, Some(_), _, Some(_)) => return Err(BehaviorError::DelayWithStatus),
            (_, Some(ms), _, None) => Effect::Delay(Duration::from_millis(ms)),
            (_, _, Some(bytes), status) => Effect::Garbage { bytes, status },
            (None, None, None, Some(code)) => Effect::Status(code),
            (None, None, None, None) => Effect::Noop,
        };
        Self::new(record.frequency, effect)
    }
}

/// Ordered, validated behaviors whose frequencies sum to at most 1
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BehaviorTable {
    behaviors: Vec<Behavior>,
}

impl BehaviorTable {
    /// # Errors
    ///
    /// Returns [`ConfigError::FrequencyOverflow`] if the frequencies sum to
    /// more than 1.
    pub fn new(behaviors: Vec<Behavior>) -> Result<Self, ConfigError> {
        let total: f64 = behaviors.iter().map(Behavior::frequency).sum();
        if total > 1.0 + FREQUENCY_EPSILON {
            return Err(ConfigError::FrequencyOverflow { total });
        }
        Ok(Self { behaviors })
    }

    /// Validate raw records, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns the first invalid record (with its index) or the overflow.
    pub fn from_records(records: Vec<BehaviorRecord>) -> Result<Self, ConfigError> {
        let behaviors = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                Behavior::try_from(record)
                    .map_err(|source| ConfigError::InvalidBehavior { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(behaviors)
    }

    /// # Errors
    ///
    /// Returns error if the YAML is malformed or any record is invalid.
    pub fn parse_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let records: Vec<BehaviorRecord> =
            serde_yml::from_str(yaml).map_err(|e| ConfigError::Parse(format!("behaviors: {e}")))?;
        Self::from_records(records)
    }

    /// # Errors
    ///
    /// Returns error if the file cannot be read or fails [`Self::parse_yaml`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;
        Self::parse_yaml(&content)
    }

    /// Pick the behavior for one request. See [`select`].
    #[must_use]
    pub fn select(&self, draw: f64) -> Option<&Behavior> {
        select(&self.behaviors, draw)
    }

    #[must_use]
    pub fn total_frequency(&self) -> f64 {
        self.behaviors.iter().map(Behavior::frequency).sum()
    }

    /// True when no behavior can ever fire
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.behaviors.iter().all(|b| b.frequency() <= 0.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Behavior> {
        self.behaviors.iter()
    }
}
