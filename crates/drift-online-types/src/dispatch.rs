//! How a public operation left things when it returned.

use std::fmt;

/// Whether an accepted request has already finished.
///
/// Every request produces exactly one completion notification. `Complete`
/// means that notification has already fired by the time the call
/// returns; `Pending` means it fires during a later tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Complete,
    Pending,
}

impl Dispatch {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Pending => write!(f, "pending"),
        }
    }
}
