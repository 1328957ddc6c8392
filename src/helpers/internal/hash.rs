//! Streaming content hashes for artifacts.
//!
//! SHA-256 is what release manifests publish; SHA-512 is accepted when a
//! manifest entry carries nothing else.

use indicatif::ProgressBar;
use sha2::Digest;
use std::io::Read;
use std::path::Path;

/// Chunk size for reading files during hashing (1MB)
const CHUNK_SIZE: usize = 1024 * 1024;

/// Threshold for showing progress (100MB)
const PROGRESS_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }

    /// Guess the algorithm from a hex digest's length.
    pub fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            64 => Some(Self::Sha256),
            128 => Some(Self::Sha512),
            _ => None,
        }
    }
}

/// Hash a file, returning the lowercase hex digest.
///
/// `progress` is advanced for files larger than 100MB; pass
/// `ProgressBar::hidden()` to stay silent.
pub fn hash_file(
    file: &Path,
    algorithm: HashAlgorithm,
    progress: &ProgressBar,
) -> std::io::Result<String> {
    let mut f = std::fs::File::open(file)?;
    let file_size = f.metadata().map(|m| m.len()).unwrap_or(0);
    let pb = if file_size > PROGRESS_THRESHOLD {
        progress.set_length(file_size);
        Some(progress)
    } else {
        None
    };

    match algorithm {
        HashAlgorithm::Sha256 => hash_with_progress::<sha2::Sha256>(&mut f, pb),
        HashAlgorithm::Sha512 => hash_with_progress::<sha2::Sha512>(&mut f, pb),
    }
}

fn hash_with_progress<D: Digest>(
    reader: &mut impl Read,
    progress: Option<&ProgressBar>,
) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut total_read = 0u64;

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        total_read += n as u64;
        if let Some(pb) = progress {
            pb.set_position(total_read);
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Case-insensitive comparison of hex digests, ignoring surrounding space.
pub fn digests_equal(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
