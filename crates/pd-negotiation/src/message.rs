//! Wire format of teammate messages.
//!
//! Every payload is JSON text of the form `{"type": "<kind>", "data": {...}}`:
//!
//! ```text
//! {"type":"help_here","data":{"midpoint":{"x":3,"y":1}}}
//! {"type":"book_parcel","data":{"ids":["p1","p7"]}}
//! ```
//!
//! Unknown kinds and malformed payloads fail to decode; callers drop them.

use serde::{Deserialize, Serialize};

use pd_core::{AgentId, IntentionKind, ParcelId, Position};

use crate::NegotiationResult;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Message {
    /// Sender is idle near a spawn tile and offers to shuttle parcels.
    AvailableToHelp { position: Position },
    /// Reply to `AvailableToHelp`: become courier, hand-offs happen here.
    HelpHere { midpoint: Position },
    /// Decline a `HelpHere`, or end the collaboration.
    NotAvailableToHelp {},
    PositionUpdate { position: Position },
    IntentionUpdate { kind: IntentionKind },
    /// Parcels the sender is about to pick up.  Replaces earlier bookings;
    /// an empty list un-books.
    BookParcel { ids: Vec<ParcelId> },
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::AvailableToHelp { .. }  => "available_to_help",
            Message::HelpHere { .. }         => "help_here",
            Message::NotAvailableToHelp {}   => "not_available_to_help",
            Message::PositionUpdate { .. }   => "position_update",
            Message::IntentionUpdate { .. }  => "intention_update",
            Message::BookParcel { .. }       => "book_parcel",
        }
    }

    pub fn encode(&self) -> NegotiationResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(payload: &str) -> NegotiationResult<Message> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// A message addressed to one teammate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outgoing {
    pub to:      AgentId,
    pub message: Message,
}

impl Outgoing {
    pub fn new(to: AgentId, message: Message) -> Self {
        Self { to, message }
    }
}
