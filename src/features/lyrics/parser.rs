//! Lyrics parsing module
//!
//! Supports:
//! - KRC: KuGou word-level lyrics with an embedded translation/romanization side-channel
//! - LRC: Standard line-level lyrics [mm:ss.xx]text
//! - Plain text without timestamps

mod krc;
mod lrc;
mod types;

pub use krc::parse_krc;
pub use lrc::parse_lrc;
pub(crate) use lrc::parse_clock;
pub use types::*;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref KRC_LINE_HINT: Regex = Regex::new(r"^\[\d+(:\d+([.:]\d+)?)?,\d+\]").unwrap();
    static ref LRC_LINE_HINT: Regex = Regex::new(r"^\[\d+:\d+([.:]\d+)?\]").unwrap();
    static ref TAG_LINE_HINT: Regex = Regex::new(r"^\[[A-Za-z]+:.*\]$").unwrap();
}

/// Detect lyrics format from content
pub fn detect_format(content: &str) -> LyricsFormat {
    let mut has_tags = false;

    for line in content.trim_start_matches('\u{FEFF}').lines() {
        let line = line.trim();
        if KRC_LINE_HINT.is_match(line) {
            return LyricsFormat::Krc;
        }
        if LRC_LINE_HINT.is_match(line) {
            return LyricsFormat::Lrc;
        }
        has_tags |= TAG_LINE_HINT.is_match(line);
    }

    if has_tags {
        LyricsFormat::Lrc
    } else {
        LyricsFormat::Plain
    }
}

/// Parse lyrics from string content
pub fn parse_lyrics(content: &str) -> ParsedLyrics {
    let format = detect_format(content);
    parse_lyrics_with_format(content, format)
}

/// Parse lyrics with specified format
pub fn parse_lyrics_with_format(content: &str, format: LyricsFormat) -> ParsedLyrics {
    match format {
        LyricsFormat::Krc => krc::parse_krc(content),
        LyricsFormat::Lrc => lrc::parse_lrc(content),
        LyricsFormat::Plain => ParsedLyrics::from_original(LyricsData::from_plain_text(content)),
    }
}
