//! `BeliefStore`: everything one agent currently holds to be true.
//!
//! # Semantics
//!
//! Every field is last-write-wins and is replaced whole; nothing is merged.
//! The only derived state is the [`MapIndex`] (rebuilt on every `set_map`),
//! the per-tile staleness clock and the capped movement history.
//!
//! # Sharing
//!
//! The deliberation loop keeps the store behind an
//! `Arc<tokio::sync::RwLock<_>>` and planners work on a clone.  The map and
//! its index sit behind `Arc`s, so cloning copies the small per-tick facts
//! only.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use pd_core::{AgentConfig, AgentId, IntentionKind, ParcelId, Position, Role, Timestamp};
use pd_spatial::{MapIndex, Obstacles, TileMap};

use crate::{AgentSighting, Collaboration, OtherAgent, Parcel, ParcelSighting, SelfState};

// ── BeliefKey ─────────────────────────────────────────────────────────────────

/// The closed key space of the store, for presence checks and removal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BeliefKey {
    Position,
    Map,
    Parcels,
    Agents,
    Role,
    Collaboration,
    Teammates,
    TeammatePosition(AgentId),
    TeammateIntention(AgentId),
    Bookings(AgentId),
    History(AgentId),
}

/// One movement-history entry.
pub type Waypoint = (Timestamp, Position);

// ── BeliefStore ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct BeliefStore {
    config: Arc<AgentConfig>,

    me:       AgentId,
    name:     Option<String>,
    position: Option<Position>,
    score:    i64,

    map:       Option<Arc<TileMap>>,
    index:     Option<Arc<MapIndex>>,
    /// Indexed by `TileId`; `None` = never inside the observation range.
    last_seen: Vec<Option<Timestamp>>,

    parcels: BTreeMap<ParcelId, Parcel>,
    agents:  BTreeMap<AgentId, OtherAgent>,

    role:          Role,
    /// Bumped on every role change so intentions can tell whether the role
    /// they were adopted under has since been cleared.
    role_epoch:    u64,
    collaboration: Option<Collaboration>,

    teammates:           BTreeSet<AgentId>,
    teammate_positions:  FxHashMap<AgentId, Position>,
    teammate_intentions: FxHashMap<AgentId, IntentionKind>,
    bookings:            FxHashMap<AgentId, Vec<ParcelId>>,

    history: FxHashMap<AgentId, VecDeque<Waypoint>>,
}

impl BeliefStore {
    pub fn new(me: AgentId, config: Arc<AgentConfig>) -> Self {
        Self {
            config,
            me,
            name: None,
            position: None,
            score: 0,
            map: None,
            index: None,
            last_seen: Vec::new(),
            parcels: BTreeMap::new(),
            agents: BTreeMap::new(),
            role: Role::None,
            role_epoch: 0,
            collaboration: None,
            teammates: BTreeSet::new(),
            teammate_positions: FxHashMap::default(),
            teammate_intentions: FxHashMap::default(),
            bookings: FxHashMap::default(),
            history: FxHashMap::default(),
        }
    }

    // ── Key space ─────────────────────────────────────────────────────────

    pub fn has(&self, key: &BeliefKey) -> bool {
        match key {
            BeliefKey::Position             => self.position.is_some(),
            BeliefKey::Map                  => self.map.is_some(),
            BeliefKey::Parcels              => !self.parcels.is_empty(),
            BeliefKey::Agents               => !self.agents.is_empty(),
            BeliefKey::Role                 => self.role != Role::None,
            BeliefKey::Collaboration        => self.collaboration.is_some(),
            BeliefKey::Teammates            => !self.teammates.is_empty(),
            BeliefKey::TeammatePosition(id) => self.teammate_positions.contains_key(id),
            BeliefKey::TeammateIntention(id) => self.teammate_intentions.contains_key(id),
            BeliefKey::Bookings(id)         => self.bookings.contains_key(id),
            BeliefKey::History(id)          => self.history.contains_key(id),
        }
    }

    pub fn unset(&mut self, key: &BeliefKey) {
        match key {
            BeliefKey::Position => self.position = None,
            BeliefKey::Map => {
                self.map = None;
                self.index = None;
                self.last_seen.clear();
            }
            BeliefKey::Parcels       => self.parcels.clear(),
            BeliefKey::Agents        => self.agents.clear(),
            BeliefKey::Role          => self.set_role(Role::None),
            BeliefKey::Collaboration => self.collaboration = None,
            BeliefKey::Teammates     => self.teammates.clear(),
            BeliefKey::TeammatePosition(id) => {
                self.teammate_positions.remove(id);
            }
            BeliefKey::TeammateIntention(id) => {
                self.teammate_intentions.remove(id);
            }
            BeliefKey::Bookings(id) => {
                self.bookings.remove(id);
            }
            BeliefKey::History(id) => {
                self.history.remove(id);
            }
        }
    }

    // ── Self ──────────────────────────────────────────────────────────────

    pub fn id(&self) -> &AgentId {
        &self.me
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    /// Apply a self-state report.
    pub fn sense_self(&mut self, state: &SelfState, now: Timestamp) {
        self.name  = Some(state.name.clone());
        self.score = state.score;
        let pos = self.snap(state.x, state.y);
        self.set_position(pos, now);
    }

    /// Record the agent's own tile, its history and the tiles now in view.
    pub fn set_position(&mut self, pos: Position, now: Timestamp) {
        self.position = Some(pos);
        let me = self.me.clone();
        self.record_history(me, pos, now);
        self.mark_seen_around(pos, now);
    }

    /// `true` if `pos` lies inside the parcel observation range.
    pub fn in_parcel_range(&self, pos: Position) -> bool {
        self.position
            .is_some_and(|me| me.manhattan(pos) < self.config.parcels_observation_distance)
    }

    // ── Map ───────────────────────────────────────────────────────────────

    /// Install the mission map, build its index and reset staleness.  Tiles
    /// in view of a known position count as seen at `now`.
    pub fn set_map(&mut self, map: TileMap, now: Timestamp) {
        let index = MapIndex::build(&map);
        debug!(agent = %self.me, tiles = index.len(), "map received, index built");
        self.last_seen = vec![None; map.cell_count()];
        self.map   = Some(Arc::new(map));
        self.index = Some(Arc::new(index));
        if let Some(pos) = self.position {
            self.mark_seen_around(pos, now);
        }
    }

    pub fn map(&self) -> Option<&TileMap> {
        self.map.as_deref()
    }

    pub fn index(&self) -> Option<&MapIndex> {
        self.index.as_deref()
    }

    /// Static hop distance between two tiles, ignoring other agents.
    pub fn distance(&self, a: Position, b: Position) -> Option<u32> {
        self.index.as_ref()?.distance(a, b)
    }

    /// Last time `pos` was inside the observation range.
    pub fn last_seen(&self, pos: Position) -> Option<Timestamp> {
        let id = self.map.as_ref()?.tile_id(pos)?;
        self.last_seen.get(id.index()).copied().flatten()
    }

    /// Snap a reported coordinate to a tile: nearest walkable tile once the
    /// map is known, plain rounding before.
    pub fn snap(&self, x: f32, y: f32) -> Position {
        self.map
            .as_ref()
            .and_then(|m| m.snap_to_walkable(x, y))
            .unwrap_or_else(|| Position::new(x.round() as i32, y.round() as i32))
    }

    fn mark_seen_around(&mut self, pos: Position, now: Timestamp) {
        let Some(map) = self.map.as_ref() else { return };
        let r = self.config.parcels_observation_distance as i32;
        for dy in -r..=r {
            for dx in -r..=r {
                let p = Position::new(pos.x + dx, pos.y + dy);
                if pos.manhattan(p) >= r as u32 {
                    continue;
                }
                if let Some(id) = map.tile_id(p) {
                    self.last_seen[id.index()] = Some(now);
                }
            }
        }
    }

    // ── Parcels ───────────────────────────────────────────────────────────

    pub fn parcels(&self) -> impl Iterator<Item = &Parcel> {
        self.parcels.values()
    }

    pub fn parcel(&self, id: &ParcelId) -> Option<&Parcel> {
        self.parcels.get(id)
    }

    pub fn set_parcel(&mut self, parcel: Parcel) {
        self.parcels.insert(parcel.id.clone(), parcel);
    }

    /// Apply a parcel report.
    ///
    /// Visible parcels replace their entries.  A remembered parcel that is
    /// not visible is forgotten when its tile is inside the observation range
    /// or when it was last seen carried; otherwise it stays believed.
    pub fn sense_parcels(&mut self, visible: &[ParcelSighting], now: Timestamp) {
        let seen: FxHashSet<&ParcelId> = visible.iter().map(|s| &s.id).collect();
        let me  = self.position;
        let r   = self.config.parcels_observation_distance;
        let before = self.parcels.len();
        self.parcels.retain(|id, p| {
            seen.contains(id)
                || (!p.is_carried() && !me.is_some_and(|m| m.manhattan(p.position) < r))
        });
        let forgotten = before - self.parcels.len();
        for s in visible {
            self.parcels.insert(s.id.clone(), Parcel::from_sighting(s, now));
        }
        trace!(agent = %self.me, visible = visible.len(), forgotten, "parcels sensed");
    }

    /// Parcels carried by this agent.
    pub fn carried(&self) -> impl Iterator<Item = &Parcel> {
        self.parcels.values().filter(|p| p.is_carried_by(&self.me))
    }

    pub fn is_carrying(&self) -> bool {
        self.carried().next().is_some()
    }

    /// Parcels nobody carries and no teammate has booked.
    pub fn pickupable(&self) -> impl Iterator<Item = &Parcel> {
        self.parcels
            .values()
            .filter(|p| !p.is_carried() && !self.is_booked_by_teammate(&p.id))
    }

    // ── Other agents ──────────────────────────────────────────────────────

    pub fn agents(&self) -> impl Iterator<Item = &OtherAgent> {
        self.agents.values()
    }

    pub fn agent(&self, id: &AgentId) -> Option<&OtherAgent> {
        self.agents.get(id)
    }

    /// Replace the agent table with the current sightings.
    pub fn sense_agents(&mut self, visible: &[AgentSighting], now: Timestamp) {
        let mut table = BTreeMap::new();
        for s in visible {
            if s.id == self.me {
                continue;
            }
            let position = self.snap(s.x, s.y);
            if self.teammates.contains(&s.id) {
                self.teammate_positions.insert(s.id.clone(), position);
            }
            self.record_history(s.id.clone(), position, now);
            table.insert(s.id.clone(), OtherAgent {
                id: s.id.clone(),
                name: s.name.clone(),
                position,
                score: s.score,
                observed_at: now,
            });
        }
        self.agents = table;
    }

    /// Tiles occupied by other agents and teammates, never including the
    /// agent's own tile.
    pub fn obstacles(&self) -> Obstacles {
        let mut out: Obstacles = self.agents.values().map(|a| a.position).collect();
        out.extend(self.teammate_positions.values().copied());
        if let Some(me) = self.position {
            out.remove(&me);
        }
        out
    }

    // ── Role and collaboration ────────────────────────────────────────────

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn role_epoch(&self) -> u64 {
        self.role_epoch
    }

    pub fn set_role(&mut self, role: Role) {
        if self.role != role {
            debug!(agent = %self.me, from = %self.role, to = %role, "role changed");
            self.role = role;
            self.role_epoch += 1;
        }
    }

    pub fn collaboration(&self) -> Option<&Collaboration> {
        self.collaboration.as_ref()
    }

    pub fn is_collaborating(&self) -> bool {
        self.collaboration.is_some()
    }

    /// Hand-off tile of the active collaboration.
    pub fn midpoint(&self) -> Option<Position> {
        self.collaboration.as_ref().map(|c| c.midpoint)
    }

    /// Enter a collaboration.  Re-entering with the same role bumps nothing.
    pub fn start_collaboration(&mut self, role: Role, partner: AgentId, midpoint: Position, now: Timestamp) {
        self.set_role(role);
        self.collaboration = Some(Collaboration {
            partner,
            midpoint,
            started_at: now,
            last_progress: now,
        });
    }

    /// Restart the collaboration timeout after a delivery or hand-off.
    pub fn mark_collaboration_progress(&mut self, now: Timestamp) {
        if let Some(c) = self.collaboration.as_mut() {
            c.last_progress = now;
        }
    }

    /// Return role and collaboration to neutral.
    pub fn reset_collaboration(&mut self) {
        self.set_role(Role::None);
        self.collaboration = None;
    }

    // ── Teammates ─────────────────────────────────────────────────────────

    pub fn set_teammates<I: IntoIterator<Item = AgentId>>(&mut self, teammates: I) {
        self.teammates = teammates.into_iter().filter(|t| *t != self.me).collect();
    }

    pub fn teammates(&self) -> impl Iterator<Item = &AgentId> {
        self.teammates.iter()
    }

    pub fn is_teammate(&self, id: &AgentId) -> bool {
        self.teammates.contains(id)
    }

    pub fn teammate_position(&self, id: &AgentId) -> Option<Position> {
        self.teammate_positions.get(id).copied()
    }

    pub fn set_teammate_position(&mut self, id: AgentId, pos: Position) {
        self.teammate_positions.insert(id, pos);
    }

    pub fn teammate_intention(&self, id: &AgentId) -> Option<IntentionKind> {
        self.teammate_intentions.get(id).copied()
    }

    pub fn set_teammate_intention(&mut self, id: AgentId, kind: IntentionKind) {
        self.teammate_intentions.insert(id, kind);
    }

    /// Replace a teammate's bookings; an empty list un-books everything.
    pub fn set_bookings(&mut self, teammate: AgentId, ids: Vec<ParcelId>) {
        if ids.is_empty() {
            self.bookings.remove(&teammate);
        } else {
            self.bookings.insert(teammate, ids);
        }
    }

    pub fn bookings_of(&self, teammate: &AgentId) -> &[ParcelId] {
        self.bookings.get(teammate).map_or(&[], Vec::as_slice)
    }

    pub fn is_booked_by_teammate(&self, parcel: &ParcelId) -> bool {
        self.bookings.values().any(|ids| ids.contains(parcel))
    }

    // ── History ───────────────────────────────────────────────────────────

    pub fn history(&self, id: &AgentId) -> impl Iterator<Item = &Waypoint> {
        self.history.get(id).into_iter().flatten()
    }

    fn record_history(&mut self, id: AgentId, pos: Position, now: Timestamp) {
        let cap = self.config.history_len;
        if cap == 0 {
            return;
        }
        let log = self.history.entry(id).or_default();
        log.push_back((now, pos));
        while log.len() > cap {
            log.pop_front();
        }
    }
}
