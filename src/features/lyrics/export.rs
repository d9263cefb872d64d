//! Subtitle export
//!
//! - `lrc`: LRC in line-level, ESLyric word-level or enhanced (A2) flavour
//! - `srt`: numbered SubRip cues
//! - `timestamp`: shared time formatting

mod lrc;
mod srt;
mod timestamp;

pub use lrc::to_lrc;
pub use srt::to_srt;
pub use timestamp::{LrcTimestamp, Precision, format_lrc_time, format_srt_time};

use serde::{Deserialize, Serialize};

use super::parser::{ParsedLyrics, TrackKind};

/// Output container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleFormat {
    #[default]
    Lrc,
    Srt,
}

impl SubtitleFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Lrc => "lrc",
            SubtitleFormat::Srt => "srt",
        }
    }
}

/// How words of an LRC line are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LrcFormat {
    /// `[start]text`
    #[default]
    LineTimed,
    /// `[start]word[end]word[end]`
    WordTimed,
    /// `[start]<start>word<end>word<end>`
    Enhanced,
}

/// Export preferences shared by the LRC and SRT writers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub format: LrcFormat,
    pub precision: Precision,
    /// Tracks emitted per original line, in this order
    pub order: Vec<TrackKind>,
    /// Render a single-word last track as a closing fragment
    pub trailing_reference: bool,
    /// Emit an empty `[end]` line when a gap follows a line (line-timed LRC only)
    pub close_gaps: bool,
    /// Song length, used to close the last SRT cue
    pub total_duration: Option<u64>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: LrcFormat::LineTimed,
            precision: Precision::Centis,
            order: vec![
                TrackKind::Original,
                TrackKind::Romanization,
                TrackKind::Translation,
            ],
            trailing_reference: false,
            close_gaps: false,
            total_duration: None,
        }
    }
}

/// Render `parsed` in `format`
pub fn export(parsed: &ParsedLyrics, format: SubtitleFormat, options: &ExportOptions) -> String {
    match format {
        SubtitleFormat::Lrc => to_lrc(parsed, options),
        SubtitleFormat::Srt => to_srt(parsed, options),
    }
}
