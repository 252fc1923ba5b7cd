//! Connection lifecycle: Open → Closing → Closed.

/// WebSocket connection state.
///
/// A connection starts `Open` once the handshake has completed. Sending or
/// receiving a Close frame moves it to `Closing`; it is `Closed` once the
/// transport has been shut down. The state never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ConnectionState {
    /// Connection is open and ready for data transfer.
    #[default]
    Open,
    /// A Close frame was queued or received; no more frames may be enqueued.
    Closing,
    /// The transport has been shut down.
    Closed,
}

impl ConnectionState {
    /// Returns `true` once a Close frame has been sent or received.
    #[must_use]
    #[inline]
    pub const fn is_closed(&self) -> bool {
        !matches!(self, ConnectionState::Open)
    }

    /// Check if enqueuing frames is allowed in this state.
    ///
    /// Returns `true` only for `Open` state.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Move to `next` unless that would go backwards.
    #[must_use]
    pub fn advance(self, next: ConnectionState) -> ConnectionState {
        self.max(next)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closing => write!(f, "Closing"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert_eq!(ConnectionState::default(), ConnectionState::Open);
    }

    #[test]
    fn test_can_send_in_each_state() {
        assert!(ConnectionState::Open.can_send());
        assert!(!ConnectionState::Closing.can_send());
        assert!(!ConnectionState::Closed.can_send());
    }

    #[test]
    fn test_is_closed() {
        assert!(!ConnectionState::Open.is_closed());
        assert!(ConnectionState::Closing.is_closed());
        assert!(ConnectionState::Closed.is_closed());
    }

    #[test]
    fn test_advance_never_goes_back() {
        assert_eq!(
            ConnectionState::Open.advance(ConnectionState::Closing),
            ConnectionState::Closing
        );
        assert_eq!(
            ConnectionState::Closed.advance(ConnectionState::Closing),
            ConnectionState::Closed
        );
        assert_eq!(
            ConnectionState::Closing.advance(ConnectionState::Open),
            ConnectionState::Closing
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Open.to_string(), "Open");
        assert_eq!(ConnectionState::Closing.to_string(), "Closing");
        assert_eq!(ConnectionState::Closed.to_string(), "Closed");
    }
}
