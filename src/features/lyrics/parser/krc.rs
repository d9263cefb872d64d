//! KuGou KRC format parser
//!
//! KRC 逐字歌词格式 (酷狗音乐)
//! 格式: [line_start,line_duration]<word_offset,word_duration,0>word<...>word
//! Word offsets are relative to the line start. The `[language:...]` tag carries
//! Base64 JSON with romanization (type 0) and translation (type 1) tracks.

use anyhow::{Context, Result, anyhow};
use base64::{Engine as _, engine::general_purpose};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use super::lrc::parse_clock;
use super::types::{
    LineIndexMap, LyricLine, LyricWord, LyricsData, ParsedLyrics, TagMap, TrackKind,
};

lazy_static! {
    static ref TAG_LINE: Regex = Regex::new(r"^\[([A-Za-z][A-Za-z_]*):(.*)\]$").unwrap();
    static ref LYRIC_LINE: Regex =
        Regex::new(r"^\[(\d+(?::\d+(?:[.:]\d+)?)?),(\d+)\](.*)$").unwrap();
    static ref WORD: Regex = Regex::new(r"<(\d+),(\d+),[^>]*>([^<]*)").unwrap();
}

/// Tag holding the side-channel tracks
const LANGUAGE_TAG: &str = "language";

/// Side-channel entry type for per-word romanization
const SIDE_ROMANIZATION: i64 = 0;
/// Side-channel entry type for per-line translation
const SIDE_TRANSLATION: i64 = 1;

#[derive(Debug, Deserialize)]
struct SideChannel {
    #[serde(default)]
    content: Vec<SideChannelEntry>,
}

#[derive(Debug, Deserialize)]
struct SideChannelEntry {
    #[serde(rename = "type")]
    kind: i64,
    #[serde(rename = "lyricContent", default)]
    lyric_content: Vec<Vec<String>>,
}

/// Running state of the line fold
#[derive(Debug, Default)]
struct KrcAccumulator {
    tags: TagMap,
    lines: Vec<LyricLine>,
}

impl KrcAccumulator {
    fn feed(mut self, raw: &str) -> Self {
        let line = raw.trim_start_matches('\u{FEFF}').trim();
        if line.is_empty() {
            return self;
        }

        if let Some(parsed) = parse_line(line) {
            self.lines.push(parsed);
        } else if let Some(caps) = TAG_LINE.captures(line) {
            self.tags
                .insert(caps[1].to_string(), caps[2].trim().to_string());
        }
        self
    }
}

/// Parse line start: integer milliseconds or a `mm:ss[.fff]` clock
fn parse_line_start(src: &str) -> Option<u64> {
    if src.contains(':') {
        parse_clock(src)
    } else {
        src.parse().ok()
    }
}

/// Parse words from KRC line content; offsets are relative to `line_start`
///
/// `None` when a marker's time does not fit in a timestamp.
fn parse_words(content: &str, line_start: u64) -> Option<Vec<LyricWord>> {
    WORD.captures_iter(content)
        .map(|caps| {
            let offset: u64 = caps[1].parse().ok()?;
            let duration: u64 = caps[2].parse().ok()?;
            let start = line_start.checked_add(offset)?;
            let end = start.checked_add(duration)?;
            Some(LyricWord::new(Some(start), Some(end), &caps[3]))
        })
        .collect()
}

/// Parse a single KRC line
fn parse_line(line: &str) -> Option<LyricLine> {
    let caps = LYRIC_LINE.captures(line)?;
    let start = parse_line_start(&caps[1])?;
    let duration: u64 = caps[2].parse().ok()?;
    let end = start.checked_add(duration)?;
    let content = &caps[3];

    let mut words = parse_words(content, start)?;
    if words.is_empty() {
        if !content.is_empty() {
            words.push(LyricWord::new(Some(start), Some(end), content));
        }
        return Some(LyricLine::new(Some(start), Some(end), words));
    }

    // Line bounds must enclose every word
    let first = words.iter().filter_map(|w| w.start).min().unwrap_or(start);
    let last = words.iter().filter_map(|w| w.end).max().unwrap_or(end);
    Some(LyricLine::new(
        Some(start.min(first)),
        Some(end.max(last)),
        words,
    ))
}

fn decode_side_channel(value: &str) -> Result<SideChannel> {
    let json = general_purpose::STANDARD
        .decode(value.trim())
        .context("side-channel is not base64")?;
    serde_json::from_slice(&json).context("side-channel is not valid JSON")
}

/// Pair each romanized syllable with the timing of the original word
fn build_romanization(
    original: &LyricsData,
    rows: &[Vec<String>],
) -> Result<(LyricsData, LineIndexMap)> {
    let mut lines = Vec::new();
    let mut map = LineIndexMap::new();
    let mut skipped = 0;

    for (index, line) in original.lines.iter().enumerate() {
        if !line.has_content() {
            skipped += 1;
            continue;
        }
        let row = rows
            .get(index - skipped)
            .ok_or_else(|| anyhow!("no romanization row for line {}", index))?;

        let words = row
            .iter()
            .enumerate()
            .map(|(k, text)| {
                let source = line
                    .words
                    .get(k)
                    .ok_or_else(|| anyhow!("romanization word {} out of range on line {}", k, index))?;
                Ok(LyricWord::new(source.start, source.end, text.as_str()))
            })
            .collect::<Result<Vec<_>>>()?;

        map.insert(index, lines.len());
        lines.push(LyricLine::new(line.start, line.end, words));
    }

    Ok((LyricsData::new(lines), map))
}

/// The first string of row `i` spans original line `i`
fn build_translation(
    original: &LyricsData,
    rows: &[Vec<String>],
) -> Result<(LyricsData, LineIndexMap)> {
    let mut lines = Vec::with_capacity(rows.len());
    let mut map = LineIndexMap::new();

    for (index, row) in rows.iter().enumerate() {
        let line = original
            .lines
            .get(index)
            .ok_or_else(|| anyhow!("translation row {} has no original line", index))?;
        let text = row.first().map(String::as_str).unwrap_or_default();
        map.insert(index, index);
        lines.push(LyricLine::new(
            line.start,
            line.end,
            vec![LyricWord::new(line.start, line.end, text)],
        ));
    }

    Ok((LyricsData::new(lines), map))
}

/// Attach side-channel tracks; failures only drop the affected track
fn apply_side_channel(parsed: &mut ParsedLyrics, value: &str) {
    let side = match decode_side_channel(value) {
        Ok(side) => side,
        Err(e) => {
            tracing::debug!("Ignoring KRC side-channel: {:#}", e);
            return;
        }
    };

    for entry in side.content {
        let (kind, built) = match entry.kind {
            SIDE_ROMANIZATION => (
                TrackKind::Romanization,
                build_romanization(parsed.original(), &entry.lyric_content),
            ),
            SIDE_TRANSLATION => (
                TrackKind::Translation,
                build_translation(parsed.original(), &entry.lyric_content),
            ),
            other => {
                tracing::debug!("Unknown KRC side-channel type {}", other);
                continue;
            }
        };
        if parsed.tracks.contains(kind) {
            continue;
        }

        match built {
            Ok((track, map)) if track.lines.iter().any(LyricLine::has_content) => {
                parsed.tracks.insert(kind, track);
                parsed.alignment.insert(kind, map);
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("Dropping KRC {} track: {:#}", kind, e),
        }
    }
}

/// Parse decrypted KRC text
pub fn parse_krc(src: &str) -> ParsedLyrics {
    let acc = src.lines().fold(KrcAccumulator::default(), KrcAccumulator::feed);

    let mut parsed = ParsedLyrics::from_original(LyricsData::new(acc.lines));
    parsed.tags = acc.tags;

    if let Some(value) = parsed.tags.get(LANGUAGE_TAG).cloned() {
        if !value.is_empty() {
            apply_side_channel(&mut parsed, &value);
        }
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn side_channel(json: &str) -> String {
        general_purpose::STANDARD.encode(json)
    }

    #[test]
    fn test_parse_line() {
        let line = parse_line("[1000,1000]<0,500,0>Hello<500,500,0>World").unwrap();
        assert_eq!(line.start, Some(1000));
        assert_eq!(line.end, Some(2000));
        assert_eq!(line.words.len(), 2);
        assert_eq!(line.words[1].start, Some(1500));
        assert_eq!(line.words[1].end, Some(2000));
        assert_eq!(line.text(), "HelloWorld");
    }

    #[test]
    fn test_clock_start_widened_by_words() {
        let parsed = parse_krc("[ar:X]\n[00:01,500]<0,500,0>Hi<500,500,0>There");
        assert_eq!(parsed.tags.get("ar").map(String::as_str), Some("X"));
        let orig = parsed.original();
        assert_eq!(orig.len(), 1);
        let line = &orig.lines[0];
        assert_eq!((line.start, line.end), (Some(1000), Some(2000)));
        assert_eq!(
            line.words,
            vec![
                LyricWord::new(Some(1000), Some(1500), "Hi"),
                LyricWord::new(Some(1500), Some(2000), "There"),
            ]
        );
        assert!(!parsed.tracks.contains(TrackKind::Translation));
        assert!(!parsed.tracks.contains(TrackKind::Romanization));
    }

    #[test]
    fn test_line_without_markers() {
        let line = parse_line("[5000,2000]whole line").unwrap();
        assert_eq!(
            line.words,
            vec![LyricWord::new(Some(5000), Some(7000), "whole line")]
        );
        let blank = parse_line("[7000,1000]").unwrap();
        assert!(blank.words.is_empty());
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let parsed = parse_krc("garbage\n[abc,1]x\n[100,100]<0,100,0>ok\n<0,1,0>");
        assert_eq!(parsed.original().len(), 1);
        assert_eq!(parsed.original().lines[0].text(), "ok");
    }

    #[test]
    fn test_overflowing_times_skipped() {
        assert!(parse_line("[18446744073709551615,1]x").is_none());
        assert!(parse_line("[1,18446744073709551615]x").is_none());

        assert!(parse_line("[1000,1000]<18446744073709551615,1,0>x").is_none());
        assert!(parse_line("[1000,1000]<0,500,0>a<18446744073709551615,1,0>b").is_none());

        let parsed = parse_krc("[18446744073709551615,1]x\n[100,100]<0,100,0>ok");
        assert_eq!(parsed.original().len(), 1);
        assert_eq!(parsed.original().lines[0].text(), "ok");
    }

    #[test]
    fn test_empty_translation_rows_omitted() {
        let json = r#"{"content":[{"type":1,"lyricContent":[[""],[" "]]}]}"#;
        let src = format!(
            "[language:{}]\n[0,1000]<0,1000,0>Hello\n[1000,1000]<0,1000,0>World",
            side_channel(json)
        );
        let parsed = parse_krc(&src);
        assert!(!parsed.tracks.contains(TrackKind::Translation));
        assert!(!parsed.alignment.contains_key(&TrackKind::Translation));
    }

    #[test]
    fn test_translation_side_channel() {
        let json = r#"{"content":[{"language":0,"type":1,"lyricContent":[["你好"],[""],["世界"]]}]}"#;
        let src = format!(
            "[language:{}]\n[0,1000]<0,1000,0>Hello\n[1000,500]\n[1500,1000]<0,1000,0>World",
            side_channel(json)
        );
        let parsed = parse_krc(&src);
        let ts = parsed.tracks.get(TrackKind::Translation).unwrap();
        assert_eq!(ts.len(), 3);
        assert_eq!(ts.lines[2].text(), "世界");
        assert_eq!(ts.lines[2].words[0].start, Some(1500));
        assert_eq!(ts.lines[2].words[0].end, Some(2500));
        assert_eq!(parsed.alignment[&TrackKind::Translation].get(&2), Some(&2));
    }

    #[test]
    fn test_romanization_skips_blank_lines() {
        let json = r#"{"content":[{"type":0,"lyricContent":[["ni ","hao"],["shi ","jie"]]}]}"#;
        let src = format!(
            "[language:{}]\n[0,1000]<0,500,0>你<500,500,0>好\n[1000,500]\n[1500,1000]<0,500,0>世<500,500,0>界",
            side_channel(json)
        );
        let parsed = parse_krc(&src);
        let roma = parsed.tracks.get(TrackKind::Romanization).unwrap();
        assert_eq!(roma.len(), 2);
        assert_eq!(roma.lines[1].words[1].text, "jie");
        assert_eq!(roma.lines[1].words[1].start, Some(2000));
        let map = &parsed.alignment[&TrackKind::Romanization];
        assert_eq!(map.get(&0), Some(&0));
        assert_eq!(map.get(&1), None);
        assert_eq!(map.get(&2), Some(&1));
    }

    #[test]
    fn test_romanization_out_of_range_dropped() {
        let json = r#"{"content":[{"type":0,"lyricContent":[["a","b","c"]]},{"type":1,"lyricContent":[["x"]]}]}"#;
        let src = format!(
            "[language:{}]\n[0,1000]<0,500,0>A<500,500,0>B",
            side_channel(json)
        );
        let parsed = parse_krc(&src);
        assert!(!parsed.tracks.contains(TrackKind::Romanization));
        assert!(parsed.tracks.contains(TrackKind::Translation));
        assert_eq!(parsed.original().len(), 1);
    }

    #[test]
    fn test_bad_side_channel_ignored() {
        let parsed = parse_krc("[language:!!notbase64]\n[0,1000]<0,1000,0>x");
        assert_eq!(parsed.original().len(), 1);
        assert_eq!(parsed.tracks.kinds().count(), 1);

        let not_json = side_channel("{broken");
        let parsed = parse_krc(&format!("[language:{not_json}]\n[0,1000]<0,1000,0>x"));
        assert_eq!(parsed.tracks.kinds().count(), 1);
    }
}
