//! Audio metadata extraction with encoding fallback
//!
//! Uses lofty for metadata reading, with custom encoding handling
//! for legacy files that use GBK/Big5/etc. Fields lofty leaves empty are
//! filled from the container's own tag chunks.

use anyhow::{Context, Result};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey};
use serde::Serialize;
use std::path::Path;

use super::container::read_container_tags_from_path;
use crate::features::encoding::{decode_string, normalize_string};

/// Extracted metadata from an audio file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_ms: u64,
    pub track_number: Option<i64>,
    pub year: Option<i64>,
    pub genre: Option<String>,
    pub composer: Option<String>,
    pub format: String,
}

impl Default for AudioMetadata {
    fn default() -> Self {
        Self {
            title: "Unknown Title".to_string(),
            artist: "Unknown Artist".to_string(),
            album: "Unknown Album".to_string(),
            duration_ms: 0,
            track_number: None,
            year: None,
            genre: None,
            composer: None,
            format: "unknown".to_string(),
        }
    }
}

fn recover(text: &str) -> String {
    normalize_string(&decode_string(text.as_bytes()))
}

/// Extract metadata from an audio file
///
/// lofty first; year, genre, composer and track number it cannot provide
/// come from FLAC/RIFF/ID3 chunks. A file lofty cannot open at all still gets
/// the container fields.
pub fn extract_metadata(path: &Path) -> Result<AudioMetadata> {
    // Determine format from file extension
    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_else(|| "unknown".to_string());

    let mut metadata = AudioMetadata {
        format,
        ..Default::default()
    };

    match Probe::open(path)
        .context("Failed to open audio file")
        .and_then(|probe| probe.read().context("Failed to read audio file"))
    {
        Ok(tagged_file) => {
            metadata.duration_ms = tagged_file.properties().duration().as_millis() as u64;

            // Try to get the primary tag, or any available tag
            let tag = tagged_file
                .primary_tag()
                .or_else(|| tagged_file.first_tag());

            if let Some(tag) = tag {
                if let Some(title) = tag.title() {
                    metadata.title = recover(&title);
                }
                if let Some(artist) = tag.artist() {
                    metadata.artist = recover(&artist);
                }
                if let Some(album) = tag.album() {
                    metadata.album = recover(&album);
                }
                metadata.track_number = tag.track().map(|t| t as i64);
                metadata.year = tag.year().map(|y| y as i64);
                metadata.genre = tag.genre().map(|g| recover(&g));
                metadata.composer = tag.get_string(&ItemKey::Composer).map(recover);
            }
        }
        Err(e) => tracing::debug!("lofty could not read {:?}: {:#}", path, e),
    }

    if metadata.year.is_none()
        || metadata.genre.is_none()
        || metadata.composer.is_none()
        || metadata.track_number.is_none()
    {
        let fallback = read_container_tags_from_path(path)?;
        metadata.year = metadata.year.or(fallback.year);
        metadata.genre = metadata.genre.or(fallback.genre);
        metadata.composer = metadata.composer.or(fallback.composer);
        metadata.track_number = metadata.track_number.or(fallback.track_number);
    }

    // If title is still unknown, use filename
    if metadata.title == "Unknown Title" {
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            metadata.title = stem.to_string();
        }
    }

    Ok(metadata)
}
