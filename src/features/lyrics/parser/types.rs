//! Lyrics data types
//!
//! Line/word containers, the multi-track set and the parse result.
//! Everything here is plain value data: parsers build it, the aligner and
//! exporters only read it.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Lyrics format enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LyricsFormat {
    /// KuGou KRC format `[start,duration]<offset,duration,0>word`
    Krc,
    /// Standard LRC format [mm:ss.xx]text
    Lrc,
    /// Plain text without timestamps
    Plain,
}

/// Metadata tags such as `ar`, `ti`, `offset`
pub type TagMap = HashMap<String, String>;

/// A single word in a lyric line
///
/// Both timestamps absent means plain, unsynchronized text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricWord {
    /// Start time in milliseconds
    pub start: Option<u64>,
    /// End time in milliseconds
    pub end: Option<u64>,
    /// The word text
    pub text: String,
}

impl LyricWord {
    pub fn new(start: Option<u64>, end: Option<u64>, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Word without any timing
    pub fn untimed(text: impl Into<String>) -> Self {
        Self::new(None, None, text)
    }

    /// Check if the word is empty (whitespace only)
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A single line of lyrics
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricLine {
    /// Start time in milliseconds
    #[serde(default)]
    pub start: Option<u64>,
    /// End time in milliseconds
    #[serde(default)]
    pub end: Option<u64>,
    /// Words in this line (for word-level sync)
    pub words: Vec<LyricWord>,
}

impl LyricLine {
    pub fn new(start: Option<u64>, end: Option<u64>, words: Vec<LyricWord>) -> Self {
        Self { start, end, words }
    }

    /// Get the full line text by joining all words
    pub fn text(&self) -> String {
        self.words.iter().map(|w| w.text.as_str()).collect()
    }

    /// Whether at least one word carries visible text
    pub fn has_content(&self) -> bool {
        self.words.iter().any(|w| !w.is_empty())
    }

    /// Start time, preferring the first word over the line bound
    pub fn effective_start(&self) -> Option<u64> {
        self.words.first().and_then(|w| w.start).or(self.start)
    }

    /// End time, preferring the last word over the line bound
    pub fn effective_end(&self) -> Option<u64> {
        self.words.last().and_then(|w| w.end).or(self.end)
    }
}

/// One track of lyrics, in temporal (insertion) order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsData {
    pub lines: Vec<LyricLine>,
}

impl LyricsData {
    pub fn new(lines: Vec<LyricLine>) -> Self {
        Self { lines }
    }

    /// Build a track from unstructured text: one untimed word per non-blank line
    pub fn from_plain_text(text: &str) -> Self {
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| LyricLine::new(None, None, vec![LyricWord::untimed(line)]))
            .collect();
        Self { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// New track where every line has both bounds when they can be derived
    ///
    /// Only line-level granularity is considered: a missing start falls back to
    /// the first word, a missing end to the last word, then the next line's start,
    /// then `total_duration` for the last line.
    pub fn with_filled_end_times(&self, total_duration: Option<u64>) -> Self {
        let starts: Vec<Option<u64>> = self
            .lines
            .iter()
            .map(|line| line.start.or_else(|| line.words.first().and_then(|w| w.start)))
            .collect();

        let lines = self
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let end = line
                    .end
                    .or_else(|| line.words.last().and_then(|w| w.end))
                    .or_else(|| starts[i + 1..].iter().find_map(|s| *s))
                    .or(total_duration);
                LyricLine {
                    start: starts[i],
                    end,
                    words: line.words.clone(),
                }
            })
            .collect();

        Self { lines }
    }
}

/// Identifier of one language variant of a song's lyrics
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    /// Original text (`orig`)
    #[serde(rename = "orig")]
    Original,
    /// Timed translation (`ts`)
    #[serde(rename = "ts")]
    Translation,
    /// Romanization (`roma`)
    #[serde(rename = "roma")]
    Romanization,
}

impl TrackKind {
    pub fn key(&self) -> &'static str {
        match self {
            TrackKind::Original => "orig",
            TrackKind::Translation => "ts",
            TrackKind::Romanization => "roma",
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for TrackKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orig" | "original" => Ok(TrackKind::Original),
            "ts" | "translation" => Ok(TrackKind::Translation),
            "roma" | "romanization" => Ok(TrackKind::Romanization),
            other => Err(format!("unknown track kind: {other}")),
        }
    }
}

/// Tracks keyed by language variant; a missing key means not available
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MultiLyricsData {
    tracks: BTreeMap<TrackKind, LyricsData>,
}

impl MultiLyricsData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set containing only the original track
    pub fn with_original(original: LyricsData) -> Self {
        let mut set = Self::new();
        set.insert(TrackKind::Original, original);
        set
    }

    pub fn insert(&mut self, kind: TrackKind, track: LyricsData) {
        self.tracks.insert(kind, track);
    }

    pub fn get(&self, kind: TrackKind) -> Option<&LyricsData> {
        self.tracks.get(&kind)
    }

    pub fn contains(&self, kind: TrackKind) -> bool {
        self.tracks.contains_key(&kind)
    }

    /// The original track, empty if absent
    pub fn original(&self) -> &LyricsData {
        static EMPTY: LyricsData = LyricsData { lines: Vec::new() };
        self.tracks.get(&TrackKind::Original).unwrap_or(&EMPTY)
    }

    pub fn kinds(&self) -> impl Iterator<Item = TrackKind> + '_ {
        self.tracks.keys().copied()
    }
}

/// Original line index to a track's own line index
pub type LineIndexMap = BTreeMap<usize, usize>;

/// Per-track index correspondences, only for tracks whose line counts diverge
pub type AlignmentMap = HashMap<TrackKind, LineIndexMap>;

/// Everything a parser extracts from one decoded payload
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedLyrics {
    pub tags: TagMap,
    pub tracks: MultiLyricsData,
    pub alignment: AlignmentMap,
}

impl ParsedLyrics {
    /// Result holding only an original track and no tags
    pub fn from_original(original: LyricsData) -> Self {
        Self {
            tracks: MultiLyricsData::with_original(original),
            ..Default::default()
        }
    }

    pub fn original(&self) -> &LyricsData {
        self.tracks.original()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed(start: u64, end: u64, text: &str) -> LyricWord {
        LyricWord::new(Some(start), Some(end), text)
    }

    #[test]
    fn test_line_text() {
        let line = LyricLine::new(
            Some(0),
            Some(1000),
            vec![timed(0, 500, "Hello "), timed(500, 1000, "World")],
        );
        assert_eq!(line.text(), "Hello World");
        assert!(line.has_content());
    }

    #[test]
    fn test_empty_line() {
        let line = LyricLine::new(Some(0), Some(1000), Vec::new());
        assert_eq!(line.text(), "");
        assert!(!line.has_content());

        let blank = LyricLine::new(None, None, vec![LyricWord::untimed("  ")]);
        assert!(!blank.has_content());
    }

    #[test]
    fn test_from_plain_text() {
        let data = LyricsData::from_plain_text("first\n\n  second  \r\n");
        assert_eq!(data.len(), 2);
        assert_eq!(data.lines[0].words, vec![LyricWord::untimed("first")]);
        assert_eq!(data.lines[1].text(), "second");
        assert_eq!(data.lines[1].start, None);
    }

    #[test]
    fn test_filled_end_times() {
        let data = LyricsData::new(vec![
            LyricLine::new(Some(1000), None, vec![LyricWord::untimed("a")]),
            LyricLine::new(None, None, Vec::new()),
            LyricLine::new(Some(3000), None, vec![LyricWord::untimed("b")]),
        ]);
        let filled = data.with_filled_end_times(Some(9000));
        assert_eq!(filled.lines[0].end, Some(3000));
        assert_eq!(filled.lines[1].start, None);
        assert_eq!(filled.lines[1].end, Some(3000));
        assert_eq!(filled.lines[2].end, Some(9000));
        // the source track is untouched
        assert_eq!(data.lines[0].end, None);
    }

    #[test]
    fn test_track_kind_keys() {
        assert_eq!(TrackKind::Original.key(), "orig");
        assert_eq!("roma".parse::<TrackKind>(), Ok(TrackKind::Romanization));
        assert!("xx".parse::<TrackKind>().is_err());
    }

    #[test]
    fn test_original_missing() {
        let set = MultiLyricsData::new();
        assert!(set.original().is_empty());
        assert!(!set.contains(TrackKind::Original));
    }
}
