//! File signatures
//!
//! SHA-256 computed incrementally over accepted chunks.

use sha2::{Digest, Sha256};
use std::fmt;

/// Digest size in bytes
pub const SIGNATURE_SIZE: usize = 32;

/// Finalized SHA-256 file signature
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileSignature([u8; SIGNATURE_SIZE]);

impl FileSignature {
    /// Wrap raw digest bytes
    pub const fn new(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Digest bytes
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }

    /// Lower-case contiguous hex, for lookups and logs
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Human-readable diagnostic line: `SHA256: XXXX XXXX ...` + newline
    pub fn diagnostic_line(&self) -> String {
        format!("SHA256: {}\n", self)
    }
}

impl From<[u8; SIGNATURE_SIZE]> for FileSignature {
    fn from(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }
}

/// Upper-case hex pairs, grouped two bytes at a time
impl fmt::Display for FileSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pair) in self.0.chunks(2).enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            for b in pair {
                write!(f, "{:02X}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FileSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileSignature({})", self.to_hex())
    }
}

/// In-progress digest; consumed by [`SignatureAccumulator::finalize`]
#[derive(Clone, Default)]
pub struct SignatureAccumulator {
    hasher: Sha256,
}

impl SignatureAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed more file bytes
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Seal the digest
    pub fn finalize(self) -> FileSignature {
        FileSignature(self.hasher.finalize().into())
    }
}

impl fmt::Debug for SignatureAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureAccumulator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn test_known_digest() {
        let mut acc = SignatureAccumulator::new();
        acc.update(b"a");
        acc.update(b"bc");
        assert_eq!(acc.finalize().to_hex(), ABC_SHA256);
    }

    #[test]
    fn test_diagnostic_line_grouping() {
        let mut bytes = [0u8; SIGNATURE_SIZE];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        let line = FileSignature::new(bytes).diagnostic_line();

        assert!(line.starts_with("SHA256: 0001 0203 0405"));
        assert!(line.ends_with("1C1D 1E1F\n"));
        let body = line.trim_start_matches("SHA256: ").trim_end();
        assert_eq!(body.split(' ').count(), 16);
        assert!(body.split(' ').all(|g| g.len() == 4));
    }
}
