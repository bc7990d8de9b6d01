//! Inbound receipt normalisation.
//!
//! Receipts arrive as base64 text that has often been re-wrapped or had its
//! padding stripped by the client transport. Everything that reaches the
//! validation service goes through [`ReceiptDecoder::normalize`] first.

use base64::{
    alphabet,
    engine::{general_purpose::STANDARD, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use sha2::{Digest, Sha256};

/// Lenient decoder for unpadded input with non-canonical trailing bits.
/// Output is always re-encoded with the canonical `STANDARD` engine.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("receipt payload is empty")]
    Empty,

    #[error("receipt payload is not valid base64")]
    NotBase64,
}

/// Canonical base64 receipt, safe to forward verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedReceipt(String);

impl NormalizedReceipt {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Short SHA-256 prefix for log correlation without logging the receipt
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..16].to_string()
    }
}

pub struct ReceiptDecoder;

impl ReceiptDecoder {
    pub fn normalize(raw: &str) -> Result<NormalizedReceipt, DecodeError> {
        let stripped: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if stripped.is_empty() {
            return Err(DecodeError::Empty);
        }

        // Padding is recomputed on re-encode, so any amount of it is accepted
        let unpadded = stripped.trim_end_matches('=');
        if unpadded.is_empty() {
            return Err(DecodeError::Empty);
        }

        let bytes = LENIENT
            .decode(unpadded.as_bytes())
            .map_err(|_| DecodeError::NotBase64)?;
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        let canonical = STANDARD.encode(&bytes);
        if canonical != stripped {
            tracing::debug!(
                input_len = stripped.len(),
                canonical_len = canonical.len(),
                "Receipt re-encoded to canonical base64"
            );
            return Ok(NormalizedReceipt(canonical));
        }

        Ok(NormalizedReceipt(stripped))
    }
}
