//! How a controller operation ended.

use lockerbox_api::Failure;

/// Outcome of a controller operation.
///
/// Failures are also reported on the notice channel where the user should
/// see them; the value returned here lets callers and tests inspect what
/// happened without draining that channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The result was applied to the controller's state.
    Applied,
    /// The result arrived for a selector that is no longer current and was dropped.
    Discarded,
    /// The remote operation failed; state is unchanged.
    Failed(Failure),
    /// Input was rejected locally; nothing was sent.
    Invalid(String),
    /// Nothing was done: no session, or the request was already satisfied.
    Skipped,
}

impl Completion {
    /// Whether the operation's result was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, Completion::Applied)
    }

    /// The failure, if the remote operation failed.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Completion::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}
