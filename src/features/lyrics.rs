//! Lyrics module - decoding, parsing and export
//!
//! - `decrypt`: KRC payload decryption
//! - `ingest`: payload to parsed tracks
//! - `parser`: KRC and LRC parsing, format detection
//! - `align`: matching translation/romanization lines to the original
//! - `export`: LRC and SRT rendering

pub mod align;
pub mod decrypt;
pub mod export;
pub mod ingest;
pub mod parser;

// Re-export commonly used items
pub use decrypt::{DecodeError, KrcDecryptor, LyricsDecryptor};
pub use export::{ExportOptions, LrcFormat, Precision, SubtitleFormat, export};
pub use ingest::{LyricsPayload, PayloadData, PayloadFormat, ingest};
pub use parser::*;
