//! WebSocket connection role (client or server).

/// Which side of the handshake a connection was created on.
///
/// Only client-initiated connections own a masking key; every frame they
/// send is masked with a fresh key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Client role - must mask outgoing frames.
    Client,
    /// Server role - must not mask outgoing frames.
    Server,
}

impl Role {
    /// Check if this role must mask outgoing frames.
    ///
    /// Clients must mask all frames sent to servers.
    #[inline]
    #[must_use]
    pub const fn must_mask(&self) -> bool {
        matches!(self, Role::Client)
    }

    /// Config defaults for this role.
    #[must_use]
    pub fn default_config(&self) -> crate::Config {
        match self {
            Role::Client => crate::Config::client(),
            Role::Server => crate::Config::server(),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Client => write!(f, "Client"),
            Role::Server => write!(f, "Server"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_must_mask() {
        assert!(Role::Client.must_mask());
    }

    #[test]
    fn test_server_must_not_mask() {
        assert!(!Role::Server.must_mask());
    }

    #[test]
    fn test_default_config_per_role() {
        assert_eq!(
            Role::Client.default_config().limits.max_frame_size,
            crate::Config::client().limits.max_frame_size
        );
        assert_eq!(
            Role::Server.default_config().limits.max_frame_size,
            crate::Config::server().limits.max_frame_size
        );
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Client.to_string(), "Client");
        assert_eq!(Role::Server.to_string(), "Server");
    }

}
