//! `pd-negotiation` — teammate coordination.
//!
//! | Module         | Contents                                                  |
//! |----------------|-----------------------------------------------------------|
//! | [`message`]    | `Message` (the six wire kinds), `Outgoing`                |
//! | [`midpoint`]   | hand-off tile selection between two agents                |
//! | [`negotiator`] | `Negotiator`: announce, handle, timeout                   |
//! | [`error`]      | `NegotiationError`, `NegotiationResult<T>`                |
//!
//! The protocol is best effort: messages may be lost, reordered or
//! duplicated, and every handler is idempotent.  Two agents announcing at
//! the same moment can both end up in the same role; the collaboration
//! timeout resets them.

pub mod error;
pub mod message;
pub mod midpoint;
pub mod negotiator;

#[cfg(test)]
mod tests;

pub use error::{NegotiationError, NegotiationResult};
pub use message::{Message, Outgoing};
pub use midpoint::midpoint;
pub use negotiator::{Negotiator, Reaction};
