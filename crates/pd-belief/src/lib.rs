//! `pd-belief` — the agent's typed fact base.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                         |
//! |------------|------------------------------------------------------------------|
//! | [`facts`]  | `Parcel`, `OtherAgent`, `Collaboration` and the sighting types   |
//! | [`store`]  | `BeliefStore` (per-field accessors), `BeliefKey` (`has`/`unset`) |

pub mod facts;
pub mod store;


pub use facts::{AgentSighting, Collaboration, OtherAgent, Parcel, ParcelSighting, SelfState};
pub use store::{BeliefKey, BeliefStore, Waypoint};
