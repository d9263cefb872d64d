//! KRC payload decryption
//!
//! KuGou ships lyrics as `krc1` + XOR-obfuscated zlib stream. The decryptor is
//! a trait so callers (and tests) can swap in another implementation.

use std::io::Read;

use base64::{Engine as _, engine::general_purpose};
use flate2::read::ZlibDecoder;

use crate::features::encoding::{ScoreProfile, decode_bytes};

/// Magic prefix of an encrypted KRC file
pub const KRC_MAGIC: &[u8] = b"krc1";

/// Fixed XOR key applied over the compressed stream
const KRC_KEY: [u8; 16] = [
    0x40, 0x47, 0x61, 0x77, 0x5E, 0x32, 0x74, 0x47, 0x51, 0x36, 0x31, 0x2D, 0xCE, 0xD2, 0x6E,
    0x69,
];

/// Errors that can occur while turning a payload into text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload string is not valid Base64
    Base64(String),
    /// Nothing left to decode
    Empty,
    /// zlib stream is corrupt
    Decompress(String),
    /// Decompressed bytes are not text
    InvalidText,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Base64(e) => write!(f, "Invalid base64 payload: {}", e),
            DecodeError::Empty => write!(f, "Empty lyrics payload"),
            DecodeError::Decompress(e) => write!(f, "Failed to decompress lyrics: {}", e),
            DecodeError::InvalidText => write!(f, "Decrypted payload is not text"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Reverses a platform's obfuscation of a lyrics payload
pub trait LyricsDecryptor {
    fn decrypt(&self, payload: &[u8]) -> Result<String, DecodeError>;

    /// Decrypt a payload delivered as a Base64 string
    fn decrypt_base64(&self, payload: &str) -> Result<String, DecodeError> {
        let bytes = general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| DecodeError::Base64(e.to_string()))?;
        self.decrypt(&bytes)
    }
}

impl<F> LyricsDecryptor for F
where
    F: Fn(&[u8]) -> Result<String, DecodeError>,
{
    fn decrypt(&self, payload: &[u8]) -> Result<String, DecodeError> {
        self(payload)
    }
}

/// Decryptor for KuGou `.krc` payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct KrcDecryptor;

impl LyricsDecryptor for KrcDecryptor {
    fn decrypt(&self, payload: &[u8]) -> Result<String, DecodeError> {
        let body = payload.strip_prefix(KRC_MAGIC).unwrap_or(payload);
        if body.is_empty() {
            return Err(DecodeError::Empty);
        }

        let compressed = xor_krc(body);
        let mut decoder = ZlibDecoder::new(compressed.as_slice());
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| DecodeError::Decompress(e.to_string()))?;

        if decompressed.is_empty() {
            return Err(DecodeError::Empty);
        }
        if decompressed.contains(&0) && std::str::from_utf8(&decompressed).is_err() {
            return Err(DecodeError::InvalidText);
        }

        let text = decode_bytes(&decompressed, ScoreProfile::LyricFile);
        tracing::debug!(
            "Decrypted KRC payload: {} -> {} bytes",
            payload.len(),
            text.len()
        );
        Ok(text)
    }
}

fn xor_krc(data: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(KRC_KEY.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect()
}

/// Build an encrypted KRC payload from plain text
#[cfg(test)]
pub(crate) fn encrypt_krc(text: &str) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut out = KRC_MAGIC.to_vec();
    out.extend(xor_krc(&compressed));
    out
}
