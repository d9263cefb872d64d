//! Media file tag I/O
//!
//! Handles reading and writing lyrics and metadata for local audio files:
//! 1. Same-name lyrics files (`.lrc`, `.krc`, `.txt`)
//! 2. Embedded metadata through lofty
//! 3. Raw ID3v2 frames and container-native chunks when lofty falls short

pub mod container;
pub mod id3;
pub mod lyrics;
pub mod metadata;

pub use container::{ContainerKind, ContainerTags, read_container_tags};
pub use id3::TagError;
pub use lyrics::{
    FoundLyrics, LyricsSource, LyricsWriteResult, find_lyrics, save_lyrics, sidecar_path,
};
pub use metadata::{AudioMetadata, extract_metadata};

use std::path::Path;

/// Supported audio file extensions
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "wav", "m4a", "ogg", "opus", "aac", "wma", "aiff",
];

/// Check if a file extension is a supported audio format
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
