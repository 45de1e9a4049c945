use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("At least one file is required")]
    EmptyInput,
}

/// Content fingerprint of an upload: SHA-256 over the file buffers
/// concatenated in submission order, encoded as 0x + 64 lowercase hex digits.
///
/// Order matters — swapping two files yields a different fingerprint.
pub fn fingerprint_of<B: AsRef<[u8]>>(buffers: &[B]) -> Result<String, FingerprintError> {
    if buffers.is_empty() {
        return Err(FingerprintError::EmptyInput);
    }

    let mut hasher = Sha256::new();
    for buffer in buffers {
        hasher.update(buffer.as_ref());
    }

    Ok(format!("0x{}", hex::encode(hasher.finalize())))
}

/// True when `value` is a canonical fingerprint: 0x-prefixed, exactly 64
/// lowercase hex digits.
pub fn is_canonical(value: &str) -> bool {
    match value.strip_prefix("0x") {
        Some(rest) => rest.len() == 64 && rest.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')),
        None => false,
    }
}
