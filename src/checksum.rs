//! Streaming checksum computation and verification.
//!
//! Packages can contain multi-gigabyte objects, so digests are always
//! computed incrementally over fixed-size chunks; a file is never loaded into
//! memory as a whole. Declared digests are compared case-insensitively.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;

/// Chunk size for incremental digest computation.
const CHUNK_SIZE: usize = 64 * 1024;

/// Default algorithm used when building packages.
pub const DEFAULT_ALGORITHM: Algorithm = Algorithm::Sha256;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl Algorithm {
    /// Resolve a declared algorithm name. Accepts the dashed and undashed
    /// spellings used in description documents, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "SHA-1" | "SHA1" => Some(Algorithm::Sha1),
            "SHA-256" | "SHA256" => Some(Algorithm::Sha256),
            "SHA-512" | "SHA512" => Some(Algorithm::Sha512),
            _ => None,
        }
    }

    /// Canonical name as written into description documents.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Sha1 => "SHA-1",
            Algorithm::Sha256 => "SHA-256",
            Algorithm::Sha512 => "SHA-512",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure to verify a declared checksum.
#[derive(Error, Debug)]
pub enum IntegrityError {
    /// The declared algorithm name is not recognized
    #[error("Unknown checksum algorithm: {0}")]
    UnknownAlgorithm(String),

    /// The computed digest differs from the declared one
    #[error("Checksum mismatch ({algorithm}): declared {declared}, computed {computed}")]
    Mismatch {
        algorithm: Algorithm,
        declared: String,
        computed: String,
    },

    /// The file could not be read while computing the digest
    #[error("Error computing checksum: {0}")]
    Io(#[from] std::io::Error),
}

enum Hasher {
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Hasher {
    fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Sha1 => Hasher::Sha1(Sha1::new()),
            Algorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            Algorithm::Sha512 => Hasher::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha1(h) => h.update(data),
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Hasher::Sha1(h) => to_hex(&h.finalize()),
            Hasher::Sha256(h) => to_hex(&h.finalize()),
            Hasher::Sha512(h) => to_hex(&h.finalize()),
        }
    }
}

fn to_hex(digest: &[u8]) -> String {
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Compute the hex digest of a file, streaming it in fixed-size chunks.
pub fn compute(path: &Path, algorithm: Algorithm) -> Result<String, IntegrityError> {
    let mut file = File::open(path)?;
    let mut hasher = Hasher::new(algorithm);
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize_hex())
}

/// Verify a file against a declared checksum.
///
/// The algorithm is looked up by name; an unknown name is a distinct error
/// from a digest mismatch. The comparison is case-insensitive.
pub fn verify(path: &Path, algorithm_name: &str, declared_hex: &str) -> Result<(), IntegrityError> {
    let algorithm = Algorithm::from_name(algorithm_name)
        .ok_or_else(|| IntegrityError::UnknownAlgorithm(algorithm_name.to_string()))?;
    let computed = compute(path, algorithm)?;
    if computed.eq_ignore_ascii_case(declared_hex.trim()) {
        Ok(())
    } else {
        Err(IntegrityError::Mismatch {
            algorithm,
            declared: declared_hex.trim().to_ascii_lowercase(),
            computed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture(content: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn test_algorithm_names_round_trip() {
        for algo in [Algorithm::Sha1, Algorithm::Sha256, Algorithm::Sha512] {
            assert_eq!(Algorithm::from_name(algo.name()), Some(algo));
        }
        assert_eq!(Algorithm::from_name("sha256"), Some(Algorithm::Sha256));
        assert_eq!(Algorithm::from_name("MD2"), None);
    }

    #[test]
    fn test_known_sha256_digest() {
        let f = fixture(b"abc");
        let digest = compute(f.path(), Algorithm::Sha256).unwrap();
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_verify_is_deterministic_and_case_insensitive() {
        let f = fixture(b"hello world");
        let digest = compute(f.path(), Algorithm::Sha1).unwrap();
        assert!(verify(f.path(), "SHA-1", &digest).is_ok());
        assert!(verify(f.path(), "sha1", &digest.to_ascii_uppercase()).is_ok());
        // same inputs, same verdict
        assert!(verify(f.path(), "SHA-1", &digest).is_ok());
    }

    #[test]
    fn test_one_byte_corruption_flips_verification() {
        let f = fixture(b"checksum target");
        let digest = compute(f.path(), Algorithm::Sha256).unwrap();
        assert!(verify(f.path(), "SHA-256", &digest).is_ok());

        let corrupted = fixture(b"checksum targeT");
        match verify(corrupted.path(), "SHA-256", &digest) {
            Err(IntegrityError::Mismatch { .. }) => {}
            other => panic!("expected mismatch, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_unknown_algorithm_is_distinct_error() {
        let f = fixture(b"data");
        match verify(f.path(), "CRC-96", "00") {
            Err(IntegrityError::UnknownAlgorithm(name)) => assert_eq!(name, "CRC-96"),
            other => panic!("expected unknown algorithm, got {:?}", other.err()),
        }
    }
}
