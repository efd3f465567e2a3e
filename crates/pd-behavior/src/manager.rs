//! `IntentionManager`: the single committed goal and its retirement rules.
//!
//! `revise` is the only place an intention is retired for belief reasons;
//! the deliberation loop retires it otherwise only when its plan ends.

use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use pd_belief::BeliefStore;
use pd_core::{ParcelId, Timestamp};

use crate::{pickup_candidates, Intention, RewardModel};

/// Why an intention left the active slot.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum DropReason {
    /// A candidate parcel was carried away or vanished from view.
    CandidatesGone,
    /// Deliver-family intention with nothing on board.
    NothingCarried,
    /// Move-family intention whose target tile was reached.
    TargetReached,
    /// Move-family intention preempted by a new pickupable parcel.
    ParcelSpotted,
    /// Role-tagged intention whose collaboration ended.
    RoleCleared,
    /// Another intention was adopted.
    Replaced,
    /// Its plan completed.
    Achieved,
    /// Its plan failed.
    PlanFailed,
    /// Its plan was cancelled.
    Cancelled,
    /// No plan could be found for it.
    Unplannable,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::CandidatesGone => "candidates_gone",
            DropReason::NothingCarried => "nothing_carried",
            DropReason::TargetReached  => "target_reached",
            DropReason::ParcelSpotted  => "parcel_spotted",
            DropReason::RoleCleared    => "role_cleared",
            DropReason::Replaced       => "replaced",
            DropReason::Achieved       => "achieved",
            DropReason::PlanFailed     => "plan_failed",
            DropReason::Cancelled      => "cancelled",
            DropReason::Unplannable    => "unplannable",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The committed intention plus what was true when it was adopted.
#[derive(Clone, Debug)]
pub struct ActiveIntention {
    pub intention:  Intention,
    pub adopted_at: Timestamp,
    pub role_epoch: u64,
    /// Pickup candidates already visible at adoption; only parcels outside
    /// this set preempt a move.
    pub known_parcels: BTreeSet<ParcelId>,
}

#[derive(Clone, Debug)]
pub struct ArchivedIntention {
    pub intention:  Intention,
    pub adopted_at: Timestamp,
    pub dropped_at: Timestamp,
    pub reason:     DropReason,
}

pub struct IntentionManager {
    model:   RewardModel,
    active:  Option<ActiveIntention>,
    archive: Vec<ArchivedIntention>,
}

impl IntentionManager {
    pub fn new(model: RewardModel) -> Self {
        Self { model, active: None, archive: Vec::new() }
    }

    pub fn active(&self) -> Option<&Intention> {
        self.active.as_ref().map(|a| &a.intention)
    }

    pub fn active_entry(&self) -> Option<&ActiveIntention> {
        self.active.as_ref()
    }

    /// Append-only history of retired intentions.
    pub fn archive(&self) -> &[ArchivedIntention] {
        &self.archive
    }

    /// Commit to `intention`.  Returns `false` (and changes nothing) if it
    /// equals the active one; otherwise the previous one is archived as
    /// replaced.
    pub fn adopt(&mut self, intention: Intention, beliefs: &BeliefStore, now: Timestamp) -> bool {
        if self.active() == Some(&intention) {
            return false;
        }
        self.drop_active(DropReason::Replaced, now);
        let known_parcels = pickup_candidates(beliefs, &self.model, now)
            .map(|p| p.id.clone())
            .collect();
        debug!(agent = %beliefs.id(), intention = %intention, "intention adopted");
        self.active = Some(ActiveIntention {
            intention,
            adopted_at: now,
            role_epoch: beliefs.role_epoch(),
            known_parcels,
        });
        true
    }

    /// Move the active intention to the archive.
    pub fn drop_active(&mut self, reason: DropReason, now: Timestamp) -> Option<Intention> {
        let active = self.active.take()?;
        self.archive.push(ArchivedIntention {
            intention:  active.intention.clone(),
            adopted_at: active.adopted_at,
            dropped_at: now,
            reason,
        });
        Some(active.intention)
    }

    /// Check the active intention's guard and drop it if violated.
    pub fn revise(&mut self, beliefs: &BeliefStore, now: Timestamp) -> Option<DropReason> {
        let reason = self.violated_guard(beliefs, now)?;
        if let Some(active) = &self.active {
            debug!(
                agent = %beliefs.id(),
                intention = %active.intention,
                reason = %reason,
                "intention dropped on revision"
            );
        }
        self.drop_active(reason, now);
        Some(reason)
    }

    fn violated_guard(&self, beliefs: &BeliefStore, now: Timestamp) -> Option<DropReason> {
        let active = self.active.as_ref()?;
        let kind = active.intention.kind();

        if kind.is_role_tagged()
            && (beliefs.role() != kind.role() || beliefs.role_epoch() != active.role_epoch)
        {
            return Some(DropReason::RoleCleared);
        }

        if kind.is_pickup_family() {
            let gone = active.intention.candidates().iter().any(|id| match beliefs.parcel(id) {
                None    => true,
                Some(p) => p.is_carried() || beliefs.is_booked_by_teammate(id),
            });
            return gone.then_some(DropReason::CandidatesGone);
        }

        if kind.is_deliver_family() {
            return (!beliefs.is_carrying()).then_some(DropReason::NothingCarried);
        }

        // Move family.
        if active.intention.target().is_some() && beliefs.position() == active.intention.target() {
            return Some(DropReason::TargetReached);
        }
        let spotted = pickup_candidates(beliefs, &self.model, now)
            .any(|p| beliefs.in_parcel_range(p.position) && !active.known_parcels.contains(&p.id));
        spotted.then_some(DropReason::ParcelSpotted)
    }
}
