//! SHA-1 digest engine used by the opening handshake.
//!
//! Each [`Sha1Engine`] owns its hashing state; there is no shared scratch
//! memory between instances, so engines can be used from any number of tasks
//! at once.

use sha1::{Digest, Sha1};

/// Length of a SHA-1 digest in bytes.
pub const DIGEST_LEN: usize = 20;

/// Incremental SHA-1 hasher.
#[derive(Clone, Default)]
pub struct Sha1Engine {
    state: Sha1,
}

impl std::fmt::Debug for Sha1Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sha1Engine").finish_non_exhaustive()
    }
}

impl Sha1Engine {
    /// Create an engine with empty input.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed more input.
    pub fn update(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        self.state.update(data.as_ref());
        self
    }

    /// Finish hashing and return the digest.
    #[must_use]
    pub fn finalize(self) -> [u8; DIGEST_LEN] {
        self.state.finalize().into()
    }

    /// Return the digest of everything fed so far and reset the engine for
    /// reuse.
    pub fn finalize_reset(&mut self) -> [u8; DIGEST_LEN] {
        self.state.finalize_reset().into()
    }
}

/// One-shot SHA-1 of `data`.
#[must_use]
pub fn sha1(data: impl AsRef<[u8]>) -> [u8; DIGEST_LEN] {
    let mut engine = Sha1Engine::new();
    engine.update(data);
    engine.finalize()
}

/// Lowercase hex rendering of a digest.
#[must_use]
pub fn to_hex(digest: &[u8; DIGEST_LEN]) -> String {
    use std::fmt::Write;

    digest.iter().fold(String::with_capacity(DIGEST_LEN * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
