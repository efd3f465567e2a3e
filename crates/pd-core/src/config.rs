//! Agent configuration.
//!
//! Numeric parameters come from an external source (the game server's
//! configuration, a JSON file, …) through the [`ConfigSource`] trait, which
//! only needs synchronous key lookup.  [`AgentConfig::from_source`] reads every
//! key exactly once; the resulting value is passed explicitly (usually in an
//! `Arc`) to every component for the lifetime of the process.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

// ── ConfigSource ──────────────────────────────────────────────────────────────

/// Synchronous, cached key lookup by name.
pub trait ConfigSource {
    /// Numeric value for `key`, or `None` if the source does not define it.
    fn get(&self, key: &str) -> Option<f64>;
}

/// A [`ConfigSource`] over a flat JSON object (`{"max_retries": 3, …}`).
///
/// Non-numeric values are treated as absent.
#[derive(Clone, Debug, Default)]
pub struct JsonConfig {
    doc: serde_json::Map<String, serde_json::Value>,
}

impl JsonConfig {
    pub fn from_value(value: serde_json::Value) -> CoreResult<Self> {
        match value {
            serde_json::Value::Object(doc) => Ok(Self { doc }),
            other => Err(CoreError::Config(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn parse(text: &str) -> CoreResult<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null      => "null",
        serde_json::Value::Bool(_)   => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_)  => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl ConfigSource for JsonConfig {
    fn get(&self, key: &str) -> Option<f64> {
        self.doc.get(key).and_then(serde_json::Value::as_f64)
    }
}

// ── NormalizationKind ─────────────────────────────────────────────────────────

/// Which reward-normalization strategy ranks pickup candidates.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationKind {
    /// `(reward · w_r) / (distance · w_d)`
    #[default]
    Linear,
    /// `reward / distance^w_d`
    Aggressive,
    /// `reward^w_r / distance^w_d`
    Sophisticated,
}

impl NormalizationKind {
    fn from_code(code: f64) -> CoreResult<Self> {
        match code as i64 {
            0 => Ok(NormalizationKind::Linear),
            1 => Ok(NormalizationKind::Aggressive),
            2 => Ok(NormalizationKind::Sophisticated),
            n => Err(CoreError::Config(format!("unknown normalization code {n}"))),
        }
    }
}

// ── AgentConfig ───────────────────────────────────────────────────────────────

/// Every numeric parameter the agent core reads.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Nominal duration of one environment move.
    pub movement_duration_ms: u64,

    /// Reward decays by one point every `decay_interval_ms`.  `None` means
    /// rewards never decay.
    pub decay_interval_ms: Option<u64>,

    /// Manhattan radius within which parcels are visible.
    pub parcels_observation_distance: u32,

    /// Manhattan radius within which other agents are visible.
    pub agents_observation_distance: u32,

    /// A collaboration without a successful hand-off for this long is reset.
    pub collaboration_timeout_ms: u64,

    /// Retries of a blocked move before the plan fails.
    pub max_retries: u32,

    /// Wait between retries of a blocked move.
    pub retry_backoff_ms: u64,

    /// Deliberation tick = `tick_multiplier × movement_duration_ms`.
    pub tick_multiplier: u32,

    /// Per-agent movement-history length; the oldest entry is dropped.
    pub history_len: usize,

    /// Maximum path distance considered by the explore desire.
    pub explore_lookahead: u32,

    /// Minimum distance of the delivery/spawn fallback target.
    pub min_fallback_distance: u32,

    /// Explorers ignore parcels this close to the hand-off midpoint.
    pub midpoint_exclusion_radius: u32,

    /// Jitter bounds of the `available_to_help` announcement interval.
    pub announce_min_ms: u64,
    pub announce_max_ms: u64,

    pub normalization: NormalizationKind,
    pub reward_weight: f64,
    pub distance_weight: f64,

    /// Global RNG seed; combined with the agent id.
    pub seed: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            movement_duration_ms:         500,
            decay_interval_ms:            Some(1_000),
            parcels_observation_distance: 5,
            agents_observation_distance:  5,
            collaboration_timeout_ms:     20_000,
            max_retries:                  3,
            retry_backoff_ms:             250,
            tick_multiplier:              2,
            history_len:                  10,
            explore_lookahead:            12,
            min_fallback_distance:        2,
            midpoint_exclusion_radius:    2,
            announce_min_ms:              3_000,
            announce_max_ms:              6_000,
            normalization:                NormalizationKind::Linear,
            reward_weight:                1.0,
            distance_weight:              1.0,
            seed:                         0,
        }
    }
}

impl AgentConfig {
    /// Read every key once from `source`, falling back to defaults for
    /// missing keys, then validate.
    pub fn from_source(source: &dyn ConfigSource) -> CoreResult<Self> {
        let d = Self::default();
        let u64_or = |key: &str, def: u64| source.get(key).map_or(def, |v| v.max(0.0) as u64);
        let u32_or = |key: &str, def: u32| source.get(key).map_or(def, |v| v.max(0.0) as u32);

        let decay_interval_ms = match source.get("decay_interval_ms") {
            Some(v) if v <= 0.0 => None,
            Some(v)             => Some(v as u64),
            None                => d.decay_interval_ms,
        };
        let normalization = match source.get("normalization") {
            Some(code) => NormalizationKind::from_code(code)?,
            None       => d.normalization,
        };

        let cfg = Self {
            movement_duration_ms:         u64_or("movement_duration_ms", d.movement_duration_ms),
            decay_interval_ms,
            parcels_observation_distance: u32_or("parcels_observation_distance", d.parcels_observation_distance),
            agents_observation_distance:  u32_or("agents_observation_distance", d.agents_observation_distance),
            collaboration_timeout_ms:     u64_or("collaboration_timeout_ms", d.collaboration_timeout_ms),
            max_retries:                  u32_or("max_retries", d.max_retries),
            retry_backoff_ms:             u64_or("retry_backoff_ms", d.retry_backoff_ms),
            tick_multiplier:              u32_or("tick_multiplier", d.tick_multiplier),
            history_len:                  u64_or("history_len", d.history_len as u64) as usize,
            explore_lookahead:            u32_or("explore_lookahead", d.explore_lookahead),
            min_fallback_distance:        u32_or("min_fallback_distance", d.min_fallback_distance),
            midpoint_exclusion_radius:    u32_or("midpoint_exclusion_radius", d.midpoint_exclusion_radius),
            announce_min_ms:              u64_or("announce_min_ms", d.announce_min_ms),
            announce_max_ms:              u64_or("announce_max_ms", d.announce_max_ms),
            normalization,
            reward_weight:                source.get("reward_weight").unwrap_or(d.reward_weight),
            distance_weight:              source.get("distance_weight").unwrap_or(d.distance_weight),
            seed:                         u64_or("seed", d.seed),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the rest of the framework cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.movement_duration_ms == 0 {
            return Err(CoreError::Config("movement_duration_ms must be > 0".into()));
        }
        if self.tick_multiplier == 0 {
            return Err(CoreError::Config("tick_multiplier must be > 0".into()));
        }
        if self.decay_interval_ms == Some(0) {
            return Err(CoreError::Config("decay_interval_ms must be > 0 or absent".into()));
        }
        if !(self.reward_weight > 0.0 && self.distance_weight > 0.0) {
            return Err(CoreError::Config("normalization weights must be positive".into()));
        }
        if self.normalization == NormalizationKind::Sophisticated
            && (self.reward_weight >= 1.0 || self.distance_weight >= 1.0)
        {
            return Err(CoreError::Config(
                "sophisticated normalization needs both weights in (0, 1)".into(),
            ));
        }
        if self.announce_max_ms < self.announce_min_ms {
            return Err(CoreError::Config("announce_max_ms < announce_min_ms".into()));
        }
        Ok(())
    }

    /// Period of the deliberation tick.
    #[inline]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.movement_duration_ms * self.tick_multiplier as u64)
    }

    #[inline]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
