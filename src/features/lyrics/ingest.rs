//! Payload ingestion
//!
//! Turns what the network layer hands over (raw bytes or a Base64 string plus
//! the declared kind) into parsed lyrics. Plaintext skips the decryptor and
//! goes through encoding recovery and format detection instead.

use base64::{Engine as _, engine::general_purpose};

use super::decrypt::{DecodeError, LyricsDecryptor};
use super::parser::{ParsedLyrics, parse_krc, parse_lyrics};
use crate::features::encoding::{ScoreProfile, decode_bytes};

/// Raw payload body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadData {
    Bytes(Vec<u8>),
    Base64(String),
}

/// What the source says the payload is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadFormat {
    /// Readable lyrics text (LRC, KRC or plain)
    #[default]
    Plaintext,
    /// Encrypted KRC
    EncryptedKrc,
}

/// A lyrics payload as delivered by a remote catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsPayload {
    pub data: PayloadData,
    pub format: PayloadFormat,
}

impl LyricsPayload {
    pub fn plaintext(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: PayloadData::Bytes(bytes.into()),
            format: PayloadFormat::Plaintext,
        }
    }

    pub fn encrypted(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: PayloadData::Bytes(bytes.into()),
            format: PayloadFormat::EncryptedKrc,
        }
    }

    pub fn encrypted_base64(payload: impl Into<String>) -> Self {
        Self {
            data: PayloadData::Base64(payload.into()),
            format: PayloadFormat::EncryptedKrc,
        }
    }
}

/// Decode (and decrypt when needed) a payload into text
pub fn payload_text(
    payload: &LyricsPayload,
    decryptor: &dyn LyricsDecryptor,
) -> Result<String, DecodeError> {
    match (&payload.format, &payload.data) {
        (PayloadFormat::EncryptedKrc, PayloadData::Bytes(bytes)) => decryptor.decrypt(bytes),
        (PayloadFormat::EncryptedKrc, PayloadData::Base64(text)) => {
            decryptor.decrypt_base64(text)
        }
        (PayloadFormat::Plaintext, PayloadData::Bytes(bytes)) => {
            Ok(decode_bytes(bytes, ScoreProfile::LyricFile))
        }
        (PayloadFormat::Plaintext, PayloadData::Base64(text)) => {
            let bytes = general_purpose::STANDARD
                .decode(text.trim())
                .map_err(|e| DecodeError::Base64(e.to_string()))?;
            Ok(decode_bytes(&bytes, ScoreProfile::LyricFile))
        }
    }
}

/// Decode a payload and parse it into tracks
pub fn ingest(
    payload: &LyricsPayload,
    decryptor: &dyn LyricsDecryptor,
) -> Result<ParsedLyrics, DecodeError> {
    let text = payload_text(payload, decryptor)?;
    let parsed = match payload.format {
        PayloadFormat::EncryptedKrc => parse_krc(&text),
        PayloadFormat::Plaintext => parse_lyrics(&text),
    };
    tracing::debug!(
        "Ingested {:?} payload: {} original lines, tracks {:?}",
        payload.format,
        parsed.original().len(),
        parsed.tracks.kinds().collect::<Vec<_>>()
    );
    Ok(parsed)
}
