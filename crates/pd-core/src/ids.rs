//! Strongly typed identifier wrappers.
//!
//! Environment-assigned identities (agents, parcels) are opaque strings and
//! wrap `String`.  Map tiles get a dense `u32` index so they can address the
//! rows of the all-pairs distance matrix directly.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generate an opaque string ID wrapper.
macro_rules! string_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[derive(Serialize, Deserialize)]
        #[serde(transparent)]
        $vis struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_id! {
    /// Environment-assigned agent identity (self, teammates and strangers).
    pub struct AgentId;
}

string_id! {
    /// Environment-assigned parcel identity.
    pub struct ParcelId;
}

/// Row-major index of a grid cell: `y * width + x`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct TileId(pub u32);

impl TileId {
    /// Position in per-cell vectors.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
