//! Sender-side session state machine.

use std::fmt;

/// Progress of one session on the sending side.
///
/// ```text
/// Created -> AckSent -> [ReadyConfirmed] -> Streaming* -> CompletionSent
///                                                      \-> Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session identity chosen, nothing published yet.
    Created,
    /// Handshake ack published to the caller.
    AckSent,
    /// Caller confirmed its session subscription.
    ReadyConfirmed,
    /// At least one data frame published.
    Streaming,
    /// Completion frame published.
    CompletionSent,
    /// The session ended without a completion frame.
    Aborted,
}

impl SessionState {
    /// Returns true if the handler may still publish frames.
    pub fn can_publish(&self) -> bool {
        matches!(
            self,
            SessionState::AckSent | SessionState::ReadyConfirmed | SessionState::Streaming
        )
    }

    /// Returns true once the session is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::CompletionSent | SessionState::Aborted)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Created => "created",
            SessionState::AckSent => "ack-sent",
            SessionState::ReadyConfirmed => "ready-confirmed",
            SessionState::Streaming => "streaming",
            SessionState::CompletionSent => "completion-sent",
            SessionState::Aborted => "aborted",
        })
    }
}
