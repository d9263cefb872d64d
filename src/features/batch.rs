//! Recursive folder processing with parallel workers
//!
//! Walks a directory for audio files and handles each one independently on
//! the rayon pool: embedding sidecar lyrics into MP3 tags, or exporting found
//! lyrics as LRC/SRT files. One file failing never stops the others.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use walkdir::WalkDir;

use super::lyrics::{LyricsFormat, SubtitleFormat, detect_format, export, parse_lyrics};
use super::media::lyrics::{LyricsSource, find_lyrics, save_lyrics};
use super::media::{extract_metadata, is_audio_file};
use super::settings::{Settings, WriteSettings};

/// What to do with each discovered file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Embed same-name lyrics files into MP3 tags
    Embed,
    /// Write found lyrics beside each file in the given format
    Export(SubtitleFormat),
}

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub mode: BatchMode,
    /// Maximum depth to scan (None = unlimited)
    pub max_depth: Option<usize>,
    /// File extensions to include (empty = all supported)
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            mode: BatchMode::Embed,
            max_depth: None,
            extensions: Vec::new(),
        }
    }
}

/// Result of processing a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Lyrics now live in the audio file's tag
    Embedded,
    /// Lyrics written to this file
    Written(PathBuf),
    Skipped(String),
    Failed(String),
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOutcome::Embedded => write!(f, "embedded"),
            FileOutcome::Written(path) => write!(f, "wrote {}", path.display()),
            FileOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            FileOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Per-file outcomes of a scan, in discovery order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<(PathBuf, FileOutcome)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Embedded | FileOutcome::Written(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed(_)))
    }

    fn count(&self, f: impl Fn(&FileOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| f(o)).count()
    }
}

/// Scan a directory for audio files
///
/// Returns a list of audio file paths found
pub fn discover_audio_files(root: &Path, config: &ScanConfig) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(root).follow_links(true);
    if let Some(max_depth) = config.max_depth {
        walker = walker.max_depth(max_depth);
    }

    walker
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| {
            if !config.extensions.is_empty() {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| {
                        config
                            .extensions
                            .iter()
                            .any(|ext| ext.eq_ignore_ascii_case(e))
                    })
                    .unwrap_or(false)
            } else {
                is_audio_file(p)
            }
        })
        .collect()
}

/// Lyrics text ready for embedding; KRC is flattened to LRC first
fn embeddable_text(text: String, settings: &Settings) -> String {
    if detect_format(&text) == LyricsFormat::Krc {
        export(&parse_lyrics(&text), SubtitleFormat::Lrc, &settings.export)
    } else {
        text
    }
}

fn embed_file(path: &Path, settings: &Settings) -> Result<FileOutcome> {
    let is_mp3 = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mp3"));
    if !is_mp3 {
        return Ok(FileOutcome::Skipped("embedding needs an MP3 file".into()));
    }

    let Some(found) = find_lyrics(path) else {
        return Ok(FileOutcome::Skipped("no lyrics found".into()));
    };
    if !matches!(found.source, LyricsSource::Sidecar(_)) {
        return Ok(FileOutcome::Skipped("lyrics already embedded".into()));
    }

    let text = embeddable_text(found.text, settings);
    let write = WriteSettings {
        embed: true,
        ..settings.write.clone()
    };
    let result = save_lyrics(path, &text, &write);
    match (result.success, result.path) {
        (true, Some(written)) if written == path => Ok(FileOutcome::Embedded),
        (true, Some(written)) => Ok(FileOutcome::Written(written)),
        _ => anyhow::bail!(result.message),
    }
}

fn export_file(path: &Path, format: SubtitleFormat, settings: &Settings) -> Result<FileOutcome> {
    let Some(found) = find_lyrics(path) else {
        return Ok(FileOutcome::Skipped("no lyrics found".into()));
    };

    let target = path.with_extension(format.extension());
    if found.source == LyricsSource::Sidecar(target.clone()) {
        return Ok(FileOutcome::Skipped("would overwrite its own source".into()));
    }

    let mut options = settings.export.clone();
    if options.total_duration.is_none() {
        options.total_duration = extract_metadata(path)
            .ok()
            .map(|m| m.duration_ms)
            .filter(|d| *d > 0);
    }

    let rendered = export(&parse_lyrics(&found.text), format, &options);
    std::fs::write(&target, rendered)
        .with_context(|| format!("Failed to write {:?}", target))?;
    Ok(FileOutcome::Written(target))
}

/// Process a single audio file
fn process_file(path: &Path, config: &ScanConfig, settings: &Settings) -> Result<FileOutcome> {
    let file_meta = std::fs::metadata(path).context("Failed to read file metadata")?;

    // Skip empty files
    if file_meta.len() == 0 {
        return Ok(FileOutcome::Skipped("empty file".into()));
    }

    match config.mode {
        BatchMode::Embed => embed_file(path, settings),
        BatchMode::Export(format) => export_file(path, format, settings),
    }
}

/// Scan `root` and process every audio file in parallel
pub fn scan(root: &Path, config: &ScanConfig, settings: &Settings) -> Result<BatchReport> {
    if !root.is_dir() {
        anyhow::bail!("{:?} is not a directory", root);
    }

    let files = discover_audio_files(root, config);
    tracing::info!("Found {} audio files under {:?}", files.len(), root);

    let outcomes: Vec<(PathBuf, FileOutcome)> = files
        .par_iter()
        .map(|path| {
            let outcome = process_file(path, config, settings).unwrap_or_else(|e| {
                tracing::warn!("Failed to process {:?}: {:#}", path, e);
                FileOutcome::Failed(format!("{:#}", e))
            });
            tracing::debug!("{:?}: {}", path, outcome);
            (path.clone(), outcome)
        })
        .collect();

    Ok(BatchReport { outcomes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::media::id3::read_lyrics_frame;
    use std::fs;

    const FAKE_AUDIO: &[u8] = &[0xFF, 0xFB, 0x90, 0x64, 0, 0, 0, 0, 0, 0, 0, 0];

    #[test]
    fn test_discover_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.mp3"), FAKE_AUDIO).unwrap();
        fs::write(dir.path().join("sub").join("b.FLAC"), b"fLaC").unwrap();
        fs::write(dir.path().join("c.lrc"), b"[00:01.00]x").unwrap();

        let files = discover_audio_files(dir.path(), &ScanConfig::default());
        assert_eq!(files.len(), 2);

        let shallow = ScanConfig {
            max_depth: Some(1),
            ..Default::default()
        };
        assert_eq!(discover_audio_files(dir.path(), &shallow).len(), 1);
    }

    #[test]
    fn test_embed_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.mp3"), FAKE_AUDIO).unwrap();
        fs::write(dir.path().join("one.krc"), "[1000,1000]<0,1000,0>Hello").unwrap();
        fs::write(dir.path().join("two.mp3"), FAKE_AUDIO).unwrap();
        fs::write(dir.path().join("three.mp3"), b"").unwrap();

        let report = scan(dir.path(), &ScanConfig::default(), &Settings::default()).unwrap();
        assert_eq!(report.total(), 3);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.failed(), 0);

        let bytes = fs::read(dir.path().join("one.mp3")).unwrap();
        let embedded = read_lyrics_frame(&bytes).unwrap().unwrap();
        assert!(embedded.ends_with("[00:01.00]Hello"));
    }

    #[test]
    fn test_export_srt() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("song.wav"), b"RIFF\0\0\0\0WAVE").unwrap();
        fs::write(
            dir.path().join("song.lrc"),
            "[00:01.00]One\n[00:02.00]Two\n[00:03.00]",
        )
        .unwrap();

        let config = ScanConfig {
            mode: BatchMode::Export(SubtitleFormat::Srt),
            ..Default::default()
        };
        let report = scan(dir.path(), &config, &Settings::default()).unwrap();
        assert_eq!(report.succeeded(), 1);

        let srt = fs::read_to_string(dir.path().join("song.srt")).unwrap();
        assert!(srt.starts_with("1\n00:00:01,000 --> 00:00:02,000\nOne\n\n2\n"));
    }

    #[test]
    fn test_export_never_overwrites_source() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("song.wav"), b"RIFF\0\0\0\0WAVE").unwrap();
        fs::write(dir.path().join("song.lrc"), "[00:01.00]One").unwrap();

        let config = ScanConfig {
            mode: BatchMode::Export(SubtitleFormat::Lrc),
            ..Default::default()
        };
        let report = scan(dir.path(), &config, &Settings::default()).unwrap();
        assert_eq!(report.skipped(), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("song.lrc")).unwrap(),
            "[00:01.00]One"
        );
    }

    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan(&dir.path().join("nope"), &ScanConfig::default(), &Settings::default()).is_err());
    }
}
