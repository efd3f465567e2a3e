//! `pd-behavior` — what the agent wants and what it commits to.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                        |
//! |---------------|-----------------------------------------------------------------|
//! | [`intention`] | `Intention`: closed enum, one variant per intention kind        |
//! | [`reward`]    | `decayed`, `Normalization`, `RewardModel` (detour gain)         |
//! | [`desire`]    | `DesireModel` trait, `RewardDrivenDesires`, `DeliberationContext` |
//! | [`manager`]   | `IntentionManager`: adopt / drop / revise, plus the archive     |
//!
//! # Design notes
//!
//! Desire generation is a pure function of the beliefs and the current time,
//! so a `DesireModel` only needs to be `Send + Sync`.  All mutable
//! commitment state lives in the `IntentionManager`, owned by the agent loop.

pub mod desire;
pub mod intention;
pub mod manager;
pub mod reward;


pub use desire::{pickup_candidates, DeliberationContext, DesireModel, RewardDrivenDesires};
pub use intention::Intention;
pub use manager::{ActiveIntention, ArchivedIntention, DropReason, IntentionManager};
pub use reward::{decayed, Normalization, RewardModel};
