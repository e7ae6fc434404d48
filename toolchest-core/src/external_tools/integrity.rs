//! Content hashing for downloaded artifacts.
//!
//! Files are streamed through the hasher in fixed-size chunks, so archives of
//! any size are verified with bounded memory.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use super::types::{Checksum, HashAlgorithm};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Computes the lowercase hex digest of the file at `path`.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> io::Result<String> {
    let file = File::open(path)?;
    hash_reader(BufReader::with_capacity(READ_BUFFER_SIZE, file), algorithm)
}

/// Computes the lowercase hex digest of an in-memory buffer.
pub fn hash_bytes(data: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Blake3 => blake3::hash(data).to_hex().to_string(),
        HashAlgorithm::Sha256 => format_hex(&Sha256::digest(data)),
    }
}

/// Returns true iff the file's digest equals `expected` (hex, any case).
pub fn verify(path: &Path, expected: &Checksum) -> io::Result<bool> {
    let actual = hash_file(path, expected.algorithm)?;
    Ok(expected.matches(&actual))
}

fn hash_reader<R: Read>(mut reader: R, algorithm: HashAlgorithm) -> io::Result<String> {
    match algorithm {
        HashAlgorithm::Blake3 => {
            let mut hasher = blake3::Hasher::new();
            io::copy(&mut reader, &mut hasher)?;
            Ok(hasher.finalize().to_hex().to_string())
        }
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            io::copy(&mut reader, &mut hasher)?;
            Ok(format_hex(&hasher.finalize()))
        }
    }
}

fn format_hex(hash: &[u8]) -> String {
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}
