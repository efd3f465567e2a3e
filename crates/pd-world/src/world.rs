//! Shared world state.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use pd_belief::{AgentSighting, ParcelSighting, SelfState};
use pd_core::{AgentId, Direction, ParcelId, Position, SimRng, Timestamp};
use pd_executor::Perception;
use pd_spatial::{Tile, TileMap};

use crate::{WorldConfig, WorldError, WorldGateway, WorldResult};

// ── State ─────────────────────────────────────────────────────────────────────

struct WorldAgent {
    name:     String,
    position: Position,
    score:    i64,
    inbox:    UnboundedSender<Perception>,
}

#[derive(Clone, Debug)]
struct WorldParcel {
    position:   Position,
    carried_by: Option<AgentId>,
    reward:     u32,
    spawned_at: Timestamp,
}

pub(crate) struct WorldState {
    map:     TileMap,
    tiles:   Vec<Tile>,
    config:  WorldConfig,
    agents:  BTreeMap<AgentId, WorldAgent>,
    parcels: BTreeMap<ParcelId, WorldParcel>,
    rng:     SimRng,
    next_parcel: u64,
    started: Instant,
}

impl WorldState {
    fn now(&self) -> Timestamp {
        Timestamp::from_elapsed(self.started.elapsed())
    }

    fn reward_of(&self, p: &WorldParcel, now: Timestamp) -> u32 {
        match self.config.decay_interval_ms {
            Some(tau) if tau > 0 => {
                let lost = now.since(p.spawned_at) / tau;
                p.reward.saturating_sub(lost.min(u32::MAX as u64) as u32)
            }
            _ => p.reward,
        }
    }

    fn occupied_by_other(&self, pos: Position, me: &AgentId) -> bool {
        self.agents.iter().any(|(id, a)| id != me && a.position == pos)
    }

    fn add_parcel(&mut self, position: Position, reward: u32) -> ParcelId {
        self.next_parcel += 1;
        let id = ParcelId::new(format!("p{}", self.next_parcel));
        let spawned_at = self.now();
        self.parcels.insert(id.clone(), WorldParcel { position, carried_by: None, reward, spawned_at });
        id
    }

    /// Remove parcels whose reward decayed to zero.
    fn expire(&mut self, now: Timestamp) {
        let dead: Vec<ParcelId> = self
            .parcels
            .iter()
            .filter(|(_, p)| self.reward_of(p, now) == 0)
            .map(|(id, _)| id.clone())
            .collect();
        for id in dead {
            trace!(parcel = %id, "parcel expired");
            self.parcels.remove(&id);
        }
    }

    /// One random spawn on a spawn tile, if under the cap.
    fn maybe_spawn(&mut self) -> Option<ParcelId> {
        let cap = self.config.max_parcels;
        let lying = self.parcels.values().filter(|p| p.carried_by.is_none()).count();
        if cap == 0 || lying >= cap {
            return None;
        }
        let pool: Vec<Position> = if self.map.spawn_tiles().is_empty() {
            self.map.walkable().collect()
        } else {
            self.map.spawn_tiles().to_vec()
        };
        let at = *self.rng.choose(&pool)?;
        let (lo, hi) = (self.config.reward_min, self.config.reward_max.max(self.config.reward_min));
        let reward = self.rng.gen_range(lo..=hi).max(1);
        let id = self.add_parcel(at, reward);
        debug!(parcel = %id, at = %at, reward, "parcel spawned");
        Some(id)
    }

    /// Push the current view to every connected agent.
    fn sense_all(&self) {
        let now = self.now();
        for (id, agent) in &self.agents {
            let me = agent.position;
            let _ = agent.inbox.send(Perception::SelfState(SelfState {
                id:    id.clone(),
                name:  agent.name.clone(),
                x:     me.x as f32,
                y:     me.y as f32,
                score: agent.score,
            }));
            let parcels = self
                .parcels
                .iter()
                .filter(|(_, p)| p.position.manhattan(me) < self.config.parcels_observation_distance)
                .map(|(pid, p)| ParcelSighting {
                    id:         pid.clone(),
                    position:   p.position,
                    carried_by: p.carried_by.clone(),
                    reward:     self.reward_of(p, now),
                })
                .collect();
            let _ = agent.inbox.send(Perception::Parcels(parcels));
            let others = self
                .agents
                .iter()
                .filter(|(oid, o)| *oid != id && o.position.manhattan(me) < self.config.agents_observation_distance)
                .map(|(oid, o)| AgentSighting {
                    id:    oid.clone(),
                    name:  o.name.clone(),
                    x:     o.position.x as f32,
                    y:     o.position.y as f32,
                    score: o.score,
                })
                .collect();
            let _ = agent.inbox.send(Perception::Agents(others));
        }
    }

    // ── Agent operations ──────────────────────────────────────────────────

    pub(crate) fn apply_move(&mut self, id: &AgentId, dir: Direction) -> bool {
        let Some(from) = self.agents.get(id).map(|a| a.position) else { return false };
        let to = from.step(dir);
        if !self.map.is_walkable(to) || self.occupied_by_other(to, id) {
            trace!(agent = %id, from = %from, to = %to, "move refused");
            return false;
        }
        if let Some(a) = self.agents.get_mut(id) {
            a.position = to;
        }
        for p in self.parcels.values_mut().filter(|p| p.carried_by.as_ref() == Some(id)) {
            p.position = to;
        }
        self.sense_all();
        true
    }

    pub(crate) fn apply_pickup(&mut self, id: &AgentId) -> bool {
        let Some(at) = self.agents.get(id).map(|a| a.position) else { return false };
        let mut taken = 0;
        for p in self.parcels.values_mut() {
            if p.carried_by.is_none() && p.position == at {
                p.carried_by = Some(id.clone());
                taken += 1;
            }
        }
        if taken > 0 {
            debug!(agent = %id, at = %at, taken, "picked up");
            self.sense_all();
        }
        taken > 0
    }

    pub(crate) fn apply_putdown(&mut self, id: &AgentId) -> bool {
        let Some(at) = self.agents.get(id).map(|a| a.position) else { return false };
        let carried: Vec<ParcelId> = self
            .parcels
            .iter()
            .filter(|(_, p)| p.carried_by.as_ref() == Some(id))
            .map(|(pid, _)| pid.clone())
            .collect();
        if carried.is_empty() {
            return false;
        }
        if self.map.is_delivery(at) {
            let now = self.now();
            let mut gained = 0i64;
            for pid in &carried {
                if let Some(p) = self.parcels.remove(pid) {
                    gained += self.reward_of(&p, now) as i64;
                }
            }
            if let Some(a) = self.agents.get_mut(id) {
                a.score += gained;
            }
            info!(agent = %id, at = %at, parcels = carried.len(), gained, "delivered");
        } else {
            for pid in &carried {
                if let Some(p) = self.parcels.get_mut(pid) {
                    p.carried_by = None;
                }
            }
            debug!(agent = %id, at = %at, parcels = carried.len(), "dropped");
        }
        self.sense_all();
        true
    }

    pub(crate) fn relay(&self, from: &AgentId, to: &AgentId, payload: String) {
        if let Some(a) = self.agents.get(to) {
            let _ = a.inbox.send(Perception::Message { from: from.clone(), payload });
        }
    }
}

// ── World ─────────────────────────────────────────────────────────────────────

/// Cheap-to-clone handle on the shared world.
#[derive(Clone)]
pub struct World {
    state: Arc<Mutex<WorldState>>,
    movement: std::time::Duration,
}

impl World {
    pub fn new(map: TileMap, config: WorldConfig) -> World {
        let movement = config.movement_duration();
        let tiles = map.tiles().collect();
        let rng = SimRng::new(config.seed);
        World {
            state: Arc::new(Mutex::new(WorldState {
                map,
                tiles,
                config,
                agents: BTreeMap::new(),
                parcels: BTreeMap::new(),
                rng,
                next_parcel: 0,
                started: Instant::now(),
            })),
            movement,
        }
    }

    /// Place agent `id` at `start` and return its gateway and perception
    /// stream.  The map and a first sensing round are queued immediately.
    pub async fn connect(
        &self,
        id:    AgentId,
        name:  impl Into<String>,
        start: Position,
    ) -> WorldResult<(WorldGateway, UnboundedReceiver<Perception>)> {
        let mut st = self.state.lock().await;
        if st.agents.contains_key(&id) {
            return Err(WorldError::DuplicateAgent(id));
        }
        if !st.map.is_walkable(start) {
            return Err(WorldError::NotWalkable(start));
        }
        if st.occupied_by_other(start, &id) {
            return Err(WorldError::Occupied(start));
        }
        let (tx, rx) = unbounded_channel();
        let _ = tx.send(Perception::Map(st.tiles.clone()));
        st.agents.insert(id.clone(), WorldAgent { name: name.into(), position: start, score: 0, inbox: tx });
        st.sense_all();
        info!(agent = %id, at = %start, "agent connected");
        Ok((WorldGateway::new(self.clone(), id), rx))
    }

    /// Remove an agent; its perception stream closes.
    pub async fn disconnect(&self, id: &AgentId) {
        let mut st = self.state.lock().await;
        if st.agents.remove(id).is_some() {
            for p in st.parcels.values_mut().filter(|p| p.carried_by.as_ref() == Some(id)) {
                p.carried_by = None;
            }
            st.sense_all();
        }
    }

    /// Place a parcel explicitly.
    pub async fn spawn_parcel(&self, at: Position, reward: u32) -> WorldResult<ParcelId> {
        let mut st = self.state.lock().await;
        if !st.map.is_walkable(at) {
            return Err(WorldError::NotWalkable(at));
        }
        let id = st.add_parcel(at, reward);
        st.sense_all();
        Ok(id)
    }

    /// One environment cycle: expire, maybe spawn, sense.
    pub async fn step(&self) {
        let mut st = self.state.lock().await;
        let now = st.now();
        st.expire(now);
        st.maybe_spawn();
        st.sense_all();
    }

    /// Run [`step`](Self::step) every `spawn_interval_ms` until `cancel`.
    pub async fn run(self, cancel: CancellationToken) {
        let period = self.state.lock().await.config.spawn_interval();
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => self.step().await,
            }
        }
        debug!("world loop stopped");
    }

    pub async fn score(&self, id: &AgentId) -> Option<i64> {
        self.state.lock().await.agents.get(id).map(|a| a.score)
    }

    pub async fn total_score(&self) -> i64 {
        self.state.lock().await.agents.values().map(|a| a.score).sum()
    }

    pub async fn position_of(&self, id: &AgentId) -> Option<Position> {
        self.state.lock().await.agents.get(id).map(|a| a.position)
    }

    pub async fn parcel_count(&self) -> usize {
        self.state.lock().await.parcels.len()
    }

    pub async fn carried_by(&self, id: &AgentId) -> Vec<ParcelId> {
        self.state
            .lock()
            .await
            .parcels
            .iter()
            .filter(|(_, p)| p.carried_by.as_ref() == Some(id))
            .map(|(pid, _)| pid.clone())
            .collect()
    }

    pub(crate) async fn occupied_for(&self, me: &AgentId, pos: Position) -> bool {
        self.state.lock().await.occupied_by_other(pos, me)
    }

    pub(crate) fn movement_duration(&self) -> std::time::Duration {
        self.movement
    }

    pub(crate) fn state(&self) -> &Mutex<WorldState> {
        &self.state
    }
}
