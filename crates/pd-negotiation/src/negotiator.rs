//! The explorer/courier handshake.
//!
//! ```text
//!  A (idle near spawn)                 B (foraging, not delivering)
//!  ── available_to_help{pos} ────────►
//!                                      role := Explorer, midpoint M
//!  ◄──────────────────── help_here{M} ─
//!  active ∈ {none, move}?
//!    yes: role := Courier, midpoint M
//!    no:  ── not_available_to_help ──► B resets
//! ```
//!
//! Either side resets on `not_available_to_help`.  The explorer resets and
//! announces unavailability when no delivery or hand-off happened within
//! `collaboration_timeout_ms`.

use tracing::{debug, info};

use pd_belief::BeliefStore;
use pd_core::{AgentId, AgentRng, IntentionKind, Position, Role, Timestamp};

use crate::{midpoint, Message, Outgoing};

/// What the agent loop must do after a message was handled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reaction {
    pub replies: Vec<Outgoing>,
    /// Cancel the running plan; the role changed under it.
    pub abort:   bool,
}

impl Reaction {
    fn reply(to: &AgentId, message: Message) -> Self {
        Self { replies: vec![Outgoing::new(to.clone(), message)], abort: false }
    }
}

pub struct Negotiator {
    rng:           AgentRng,
    next_announce: Option<Timestamp>,
}

impl Negotiator {
    pub fn new(beliefs: &BeliefStore) -> Self {
        Self {
            rng:           AgentRng::new(beliefs.config().seed, beliefs.id()),
            next_announce: None,
        }
    }

    /// `Message` to every declared teammate.
    pub fn broadcast(beliefs: &BeliefStore, message: Message) -> Vec<Outgoing> {
        beliefs
            .teammates()
            .map(|t| Outgoing::new(t.clone(), message.clone()))
            .collect()
    }

    // ── Announcing ────────────────────────────────────────────────────────

    /// Offer help to every teammate when idle near a spawn tile.
    ///
    /// "Idle" means no collaboration, nothing carried and no active pickup
    /// or delivery.  Offers are spaced by a jittered interval; the first
    /// call only schedules.
    pub fn maybe_announce(
        &mut self,
        beliefs: &BeliefStore,
        active:  Option<IntentionKind>,
        now:     Timestamp,
    ) -> Vec<Outgoing> {
        let cfg = beliefs.config();
        let due = match self.next_announce {
            None => {
                self.schedule(cfg.announce_min_ms, cfg.announce_max_ms, now);
                return vec![];
            }
            Some(at) => now >= at,
        };
        if !due || beliefs.is_collaborating() || beliefs.is_carrying() {
            return vec![];
        }
        if active.is_some_and(|k| k.is_pickup_family() || k.is_deliver_family()) {
            return vec![];
        }
        let Some(me) = beliefs.position() else { return vec![] };
        let (Some(map), Some(index)) = (beliefs.map(), beliefs.index()) else { return vec![] };
        let near_spawn = index
            .nearest(me, map.spawn_tiles().iter().copied())
            .is_some_and(|(_, d)| d <= cfg.parcels_observation_distance);
        if !near_spawn {
            return vec![];
        }

        self.schedule(cfg.announce_min_ms, cfg.announce_max_ms, now);
        debug!(agent = %beliefs.id(), "announcing availability");
        Self::broadcast(beliefs, Message::AvailableToHelp { position: me })
    }

    fn schedule(&mut self, min_ms: u64, max_ms: u64, now: Timestamp) {
        self.next_announce = Some(now + self.rng.jitter_ms(min_ms, max_ms));
    }

    // ── Handling ──────────────────────────────────────────────────────────

    /// React to `message` from `from`.  Messages from non-teammates are
    /// dropped.
    pub fn handle(
        &mut self,
        beliefs: &mut BeliefStore,
        active:  Option<IntentionKind>,
        from:    &AgentId,
        message: Message,
        now:     Timestamp,
    ) -> Reaction {
        if !beliefs.is_teammate(from) {
            debug!(agent = %beliefs.id(), from = %from, kind = message.kind(), "dropping message from non-teammate");
            return Reaction::default();
        }
        match message {
            Message::AvailableToHelp { position } => {
                beliefs.set_teammate_position(from.clone(), position);
                Self::on_available(beliefs, active, from, position, now)
            }
            Message::HelpHere { midpoint } => Self::on_help_here(beliefs, active, from, midpoint, now),
            Message::NotAvailableToHelp {} => {
                if beliefs.collaboration().is_some_and(|c| &c.partner == from) {
                    info!(agent = %beliefs.id(), partner = %from, "collaboration ended by partner");
                    beliefs.reset_collaboration();
                    return Reaction { replies: vec![], abort: true };
                }
                Reaction::default()
            }
            Message::PositionUpdate { position } => {
                beliefs.set_teammate_position(from.clone(), position);
                Reaction::default()
            }
            Message::IntentionUpdate { kind } => {
                beliefs.set_teammate_intention(from.clone(), kind);
                Reaction::default()
            }
            Message::BookParcel { ids } => {
                beliefs.set_bookings(from.clone(), ids);
                Reaction::default()
            }
        }
    }

    fn on_available(
        beliefs:  &mut BeliefStore,
        active:   Option<IntentionKind>,
        from:     &AgentId,
        position: Position,
        now:      Timestamp,
    ) -> Reaction {
        if let Some(c) = beliefs.collaboration() {
            // Duplicate offer from the current courier: repeat the answer.
            if &c.partner == from && beliefs.role() == Role::Explorer {
                return Reaction::reply(from, Message::HelpHere { midpoint: c.midpoint });
            }
            return Reaction::default();
        }
        let delivering = beliefs.is_carrying() || active.is_some_and(IntentionKind::is_deliver_family);
        let Some(me) = beliefs.position() else { return Reaction::default() };
        let (Some(map), Some(index)) = (beliefs.map(), beliefs.index()) else {
            return Reaction::default();
        };
        let reaches_spawn = index.nearest(me, map.spawn_tiles().iter().copied()).is_some();
        if delivering || !reaches_spawn {
            return Reaction::default();
        }
        let Some(m) = midpoint(map, index, me, position) else {
            debug!(agent = %beliefs.id(), partner = %from, "no common midpoint");
            return Reaction::default();
        };

        info!(agent = %beliefs.id(), partner = %from, midpoint = %m, "becoming explorer");
        beliefs.start_collaboration(Role::Explorer, from.clone(), m, now);
        Reaction {
            replies: vec![Outgoing::new(from.clone(), Message::HelpHere { midpoint: m })],
            abort:   true,
        }
    }

    fn on_help_here(
        beliefs:  &mut BeliefStore,
        active:   Option<IntentionKind>,
        from:     &AgentId,
        midpoint: Position,
        now:      Timestamp,
    ) -> Reaction {
        let same = beliefs
            .collaboration()
            .is_some_and(|c| &c.partner == from && c.midpoint == midpoint);
        if same && beliefs.role() == Role::Courier {
            return Reaction::default();
        }
        if active.is_some_and(|k| !k.is_move_family()) {
            debug!(agent = %beliefs.id(), partner = %from, "busy, declining hand-off");
            return Reaction::reply(from, Message::NotAvailableToHelp {});
        }
        info!(agent = %beliefs.id(), partner = %from, midpoint = %midpoint, "becoming courier");
        beliefs.start_collaboration(Role::Courier, from.clone(), midpoint, now);
        Reaction { replies: vec![], abort: true }
    }

    // ── Timeout ───────────────────────────────────────────────────────────

    /// Reset a collaboration that made no progress for
    /// `collaboration_timeout_ms`, telling every teammate.
    pub fn check_timeout(&mut self, beliefs: &mut BeliefStore, now: Timestamp) -> Vec<Outgoing> {
        let timeout = beliefs.config().collaboration_timeout_ms;
        let expired = beliefs
            .collaboration()
            .is_some_and(|c| now.since(c.last_progress) >= timeout);
        if !expired {
            return vec![];
        }
        info!(agent = %beliefs.id(), role = %beliefs.role(), "collaboration timed out");
        beliefs.reset_collaboration();
        Self::broadcast(beliefs, Message::NotAvailableToHelp {})
    }
}
