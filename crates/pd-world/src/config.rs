use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Rules of the in-memory environment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Every move takes this long before it resolves.
    pub movement_duration_ms: u64,
    /// Parcels lose one reward point per interval; `None` disables decay.
    pub decay_interval_ms: Option<u64>,
    pub parcels_observation_distance: u32,
    pub agents_observation_distance:  u32,
    /// Period of the spawn/decay/sense cycle driven by [`World::run`](crate::World::run).
    pub spawn_interval_ms: u64,
    /// No random spawns while this many parcels lie uncarried.  0 disables
    /// random spawning.
    pub max_parcels: usize,
    pub reward_min: u32,
    pub reward_max: u32,
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            movement_duration_ms:         500,
            decay_interval_ms:            Some(1_000),
            parcels_observation_distance: 5,
            agents_observation_distance:  5,
            spawn_interval_ms:            1_000,
            max_parcels:                  5,
            reward_min:                   10,
            reward_max:                   50,
            seed:                         0,
        }
    }
}

impl WorldConfig {
    #[inline]
    pub fn movement_duration(&self) -> Duration {
        Duration::from_millis(self.movement_duration_ms)
    }

    #[inline]
    pub fn spawn_interval(&self) -> Duration {
        Duration::from_millis(self.spawn_interval_ms.max(1))
    }
}
