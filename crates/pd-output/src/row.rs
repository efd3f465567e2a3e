//! Plain data row types written by trace backends.

/// One executed action attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRow {
    pub agent:   String,
    /// Milliseconds since the agent started.
    pub at_ms:   u64,
    /// Index of the action within its plan.
    pub index:   usize,
    pub action:  &'static str,
    pub attempt: u32,
    pub status:  String,
    /// Believed position after the attempt.
    pub x:       i32,
    pub y:       i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentionEvent {
    Adopted,
    Dropped,
    RoleChanged,
}

impl IntentionEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            IntentionEvent::Adopted     => "adopted",
            IntentionEvent::Dropped     => "dropped",
            IntentionEvent::RoleChanged => "role_changed",
        }
    }
}

/// One intention lifecycle event.
///
/// For `RoleChanged`, `subject` is the new role and `detail` the old one;
/// for `Dropped`, `detail` is the drop reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentionRow {
    pub agent:   String,
    pub at_ms:   u64,
    pub event:   IntentionEvent,
    pub subject: String,
    pub detail:  String,
}
