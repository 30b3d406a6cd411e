use argon2::password_hash::rand_core::{OsRng, RngCore};
use std::fmt;

use crate::error::TrainerError;

/// Length in bytes of the per-installation session secret.
pub const SECRET_LENGTH: usize = 24;

/// The per-installation key that signs session tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionSecret([u8; SECRET_LENGTH]);

impl SessionSecret {
    /// Fresh secret from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_LENGTH];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<Vec<u8>> for SessionSecret {
    type Error = TrainerError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        let len = bytes.len();
        let arr: [u8; SECRET_LENGTH] = bytes.try_into().map_err(|_| {
            TrainerError::Integrity(format!(
                "stored session secret is {len} bytes, expected {SECRET_LENGTH}"
            ))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionSecret(<redacted>)")
    }
}
