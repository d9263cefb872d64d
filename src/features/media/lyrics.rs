//! Lyrics discovery and persistence for local audio files
//!
//! Reads lyrics from a sidecar file or embedded tags, and writes them back
//! either into the MP3's ID3v2 tag or into a `.lrc` file beside the audio.

use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::ItemKey;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::id3::{Id3Tag, TagError, read_lyrics_frame, splice_lyrics};
use crate::features::encoding::{ScoreProfile, decode_bytes};
use crate::features::lyrics::decrypt::KRC_MAGIC;
use crate::features::lyrics::{KrcDecryptor, LyricsDecryptor};
use crate::features::settings::WriteSettings;

/// Supported lyrics file extensions
pub const LYRICS_EXTENSIONS: &[&str] = &[
    "lrc", // Standard LRC
    "krc", // KuGou KRC, encrypted or plain
    "txt", // Unsynchronised text
];

/// Where lyrics were found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LyricsSource {
    Sidecar(PathBuf),
    /// Read through the tag library
    Embedded,
    /// Read by the raw ID3v2 reader after the tag library found nothing
    RawId3,
}

/// Lyrics text and its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundLyrics {
    pub text: String,
    pub source: LyricsSource,
}

/// Outcome of [`save_lyrics`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LyricsWriteResult {
    pub success: bool,
    pub message: String,
    /// File that now holds the lyrics
    pub path: Option<PathBuf>,
}

impl LyricsWriteResult {
    fn ok(message: String, path: PathBuf) -> Self {
        Self {
            success: true,
            message,
            path: Some(path),
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            path: None,
        }
    }
}

/// Find lyrics for an audio file
///
/// Priority:
/// 1. Same-name lyrics file (.lrc, .krc, .txt)
/// 2. Embedded lyrics via lofty (USLT, Vorbis LYRICS, ...)
/// 3. Raw ID3v2 lyrics frame
pub fn find_lyrics(audio_path: &Path) -> Option<FoundLyrics> {
    // Priority 1: Check for same-name lyrics file (any supported format)
    if let Some(lyrics_path) = find_lyrics_file(audio_path) {
        if let Some(text) = read_lyrics_file(&lyrics_path) {
            tracing::debug!("Loaded {} bytes of lyrics from {:?}", text.len(), lyrics_path);
            return Some(FoundLyrics {
                text,
                source: LyricsSource::Sidecar(lyrics_path),
            });
        }
    }

    // Priority 2: Check embedded lyrics
    if let Some(text) = extract_embedded_lyrics(audio_path) {
        tracing::debug!("Loaded embedded lyrics from {:?}", audio_path);
        return Some(FoundLyrics {
            text,
            source: LyricsSource::Embedded,
        });
    }

    // Priority 3: Parse the ID3v2 tag ourselves
    let bytes = fs::read(audio_path).ok()?;
    match read_lyrics_frame(&bytes) {
        Ok(Some(text)) => Some(FoundLyrics {
            text,
            source: LyricsSource::RawId3,
        }),
        Ok(None) => None,
        Err(e) => {
            tracing::debug!("No raw ID3 lyrics in {:?}: {}", audio_path, e);
            None
        }
    }
}

/// Find lyrics file with same name as audio file
/// Searches for all supported extensions
fn find_lyrics_file(audio_path: &Path) -> Option<PathBuf> {
    let parent = audio_path.parent()?;
    let stem = audio_path.file_stem()?.to_str()?;

    for ext in LYRICS_EXTENSIONS {
        // Try lowercase extension
        let path = parent.join(format!("{}.{}", stem, ext));
        if path.exists() {
            return Some(path);
        }

        // Try uppercase extension
        let path = parent.join(format!("{}.{}", stem, ext.to_uppercase()));
        if path.exists() {
            return Some(path);
        }
    }

    None
}

/// Read a lyrics file of unknown encoding; encrypted KRC is decrypted
pub fn read_lyrics_file(path: &Path) -> Option<String> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read lyrics file {:?}: {}", path, e);
            return None;
        }
    };

    let text = if bytes.starts_with(KRC_MAGIC) {
        match KrcDecryptor.decrypt(&bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to decrypt {:?}: {}", path, e);
                return None;
            }
        }
    } else {
        decode_bytes(&bytes, ScoreProfile::LyricFile)
    };

    let text = text.trim_start_matches('\u{FEFF}');
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Extract embedded lyrics from audio file
fn extract_embedded_lyrics(audio_path: &Path) -> Option<String> {
    let tagged_file = Probe::open(audio_path).ok()?.read().ok()?;

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())?;

    if let Some(lyrics) = tag.get_string(&ItemKey::Lyrics) {
        if !lyrics.trim().is_empty() {
            return Some(lyrics.to_string());
        }
    }

    None
}

/// Sidecar path for an audio file (song.mp3 -> song.lrc)
pub fn sidecar_path(audio_path: &Path) -> PathBuf {
    audio_path.with_extension("lrc")
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

/// Write through a temp file and rename over `path`
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), TagError> {
    let temp = temp_path(path);

    if let Err(e) = fs::write(&temp, bytes) {
        let _ = fs::remove_file(&temp);
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&temp, path) {
        tracing::error!("Failed to rename temp file {:?}: {}", temp, e);
        let _ = fs::remove_file(&temp);
        return Err(e.into());
    }
    Ok(())
}

fn is_mp3(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mp3"))
}

/// Read the spliced file back before it replaces the original
fn verify_splice(original: &[u8], spliced: &[u8], expected: &str) -> Result<(), TagError> {
    let old_len = Id3Tag::parse(original)?.map_or(0, |(_, len)| len);
    let new_len = Id3Tag::parse(spliced)?.map_or(0, |(_, len)| len);
    if spliced[new_len..] != original[old_len..] {
        return Err(TagError::Verify("audio data changed".into()));
    }

    match read_lyrics_frame(spliced)? {
        Some(text) if text == expected.trim_end_matches('\0') => Ok(()),
        Some(_) => Err(TagError::Verify("lyrics read back differ".into())),
        None => Err(TagError::Verify("lyrics frame missing".into())),
    }
}

/// Embed `text` into the ID3v2 tag of the MP3 at `path`
pub fn embed_lyrics(path: &Path, text: &str, language: &str) -> Result<(), TagError> {
    let original = fs::read(path)?;
    let spliced = splice_lyrics(&original, text, language)?;
    verify_splice(&original, &spliced, text)?;
    write_atomic(path, &spliced)?;
    tracing::info!("Embedded {} bytes of lyrics into {:?}", text.len(), path);
    Ok(())
}

/// Write `text` as UTF-8 beside the audio file
pub fn write_sidecar(audio_path: &Path, text: &str) -> Result<PathBuf, TagError> {
    let path = sidecar_path(audio_path);
    write_atomic(&path, text.as_bytes())?;
    tracing::info!("Wrote lyrics sidecar {:?}", path);
    Ok(path)
}

/// Save lyrics for an audio file
///
/// MP3 files get an embedded lyrics frame when `settings.embed` is set; any
/// other file, or a failed embed, gets a `.lrc` sidecar instead.
pub fn save_lyrics(audio_path: &Path, text: &str, settings: &WriteSettings) -> LyricsWriteResult {
    if text.trim().is_empty() {
        return LyricsWriteResult::failed("No lyrics to save".to_string());
    }

    if settings.embed && is_mp3(audio_path) {
        match embed_lyrics(audio_path, text, &settings.language) {
            Ok(()) => {
                return LyricsWriteResult::ok(
                    "Lyrics embedded into audio file".to_string(),
                    audio_path.to_path_buf(),
                );
            }
            Err(e) => {
                tracing::warn!(
                    "Embedding lyrics into {:?} failed, writing sidecar: {}",
                    audio_path,
                    e
                );
            }
        }
    }

    match write_sidecar(audio_path, text) {
        Ok(path) => LyricsWriteResult::ok("Lyrics saved to sidecar file".to_string(), path),
        Err(e) => {
            tracing::error!("Failed to save lyrics for {:?}: {}", audio_path, e);
            LyricsWriteResult::failed(format!("Failed to save lyrics: {}", e))
        }
    }
}
