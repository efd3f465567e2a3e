//! Reward decay and the candidate-ranking value functions.
//!
//! A parcel observed with reward `R` is worth `max(0, R − ⌊t/τ⌋)` after `t`
//! milliseconds, where `τ` is the decay interval.  Travel time is estimated
//! as `steps × movement_duration`.
//!
//! # Normalization
//!
//! | Kind            | `value(r, d)`              |
//! |-----------------|----------------------------|
//! | `Linear`        | `(r · w_r) / (d · w_d)`    |
//! | `Aggressive`    | `r / d^w_d`                |
//! | `Sophisticated` | `r^w_r / d^w_d`            |
//!
//! `d` is clamped to at least 1 so a parcel on the agent's own tile ranks
//! finite.

use pd_core::{AgentConfig, NormalizationKind, Timestamp};
use pd_belief::Parcel;

/// Reward left after `elapsed_ms`; `None` interval means no decay.
#[inline]
pub fn decayed(reward: u32, elapsed_ms: u64, decay_interval_ms: Option<u64>) -> u32 {
    match decay_interval_ms {
        Some(tau) if tau > 0 => {
            let lost = elapsed_ms / tau;
            (reward as u64).saturating_sub(lost) as u32
        }
        _ => reward,
    }
}

// ── Normalization ─────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Normalization {
    pub kind:            NormalizationKind,
    pub reward_weight:   f64,
    pub distance_weight: f64,
}

impl Normalization {
    pub fn from_config(cfg: &AgentConfig) -> Self {
        Self {
            kind:            cfg.normalization,
            reward_weight:   cfg.reward_weight,
            distance_weight: cfg.distance_weight,
        }
    }

    pub fn value(&self, reward: f64, distance: u32) -> f64 {
        let d = distance.max(1) as f64;
        match self.kind {
            NormalizationKind::Linear => {
                (reward * self.reward_weight) / (d * self.distance_weight)
            }
            NormalizationKind::Aggressive => reward / d.powf(self.distance_weight),
            NormalizationKind::Sophisticated => {
                reward.powf(self.reward_weight) / d.powf(self.distance_weight)
            }
        }
    }
}

// ── RewardModel ───────────────────────────────────────────────────────────────

/// Decay and normalization parameters of one agent.
#[derive(Copy, Clone, Debug)]
pub struct RewardModel {
    pub norm:                 Normalization,
    pub movement_duration_ms: u64,
    pub decay_interval_ms:    Option<u64>,
}

impl RewardModel {
    pub fn from_config(cfg: &AgentConfig) -> Self {
        Self {
            norm:                 Normalization::from_config(cfg),
            movement_duration_ms: cfg.movement_duration_ms,
            decay_interval_ms:    cfg.decay_interval_ms,
        }
    }

    /// Current reward of a believed parcel, decayed since it was observed.
    pub fn estimated(&self, parcel: &Parcel, now: Timestamp) -> u32 {
        decayed(parcel.reward, now.since(parcel.observed_at), self.decay_interval_ms)
    }

    /// Reward left after travelling `steps` moves.
    pub fn after_steps(&self, reward: u32, steps: u32) -> u32 {
        decayed(reward, steps as u64 * self.movement_duration_ms, self.decay_interval_ms)
    }

    #[inline]
    pub fn value(&self, reward: u32, distance: u32) -> f64 {
        self.norm.value(reward as f64, distance)
    }

    /// Gain of picking up one more parcel before delivering.
    ///
    /// `carried` are the current rewards of the parcels on board,
    /// `base_distance` the steps to deliver directly, `detour_distance` the
    /// steps via the candidate.  Positive means the detour pays.
    pub fn additional_pickup_gain(
        &self,
        carried:          &[u32],
        base_distance:    u32,
        candidate_reward: u32,
        detour_distance:  u32,
    ) -> f64 {
        let base: u32 = carried.iter().map(|&r| self.after_steps(r, base_distance)).sum();
        let combined: u32 = carried
            .iter()
            .chain(std::iter::once(&candidate_reward))
            .map(|&r| self.after_steps(r, detour_distance))
            .sum();
        self.value(combined, detour_distance) - self.value(base, base_distance)
    }
}
