//! Standard LRC format parser
//!
//! Supports the common [mm:ss.xx]text format with line-level synchronization.
//! Lines sharing a timestamp with an earlier line are treated as its translation,
//! the way most players export bilingual LRC.

use super::types::{
    LineIndexMap, LyricLine, LyricWord, LyricsData, ParsedLyrics, TagMap, TrackKind,
};

/// Parse `mm:ss`, `mm:ss.x`, `mm:ss.xx`, `mm:ss.xxx` or `mm:ss:xx` into milliseconds
pub(crate) fn parse_clock(src: &str) -> Option<u64> {
    let parts: Vec<&str> = src.split([':', '.']).collect();

    let (min, sec, ms): (u64, u64, u64) = match parts.len() {
        // mm:ss format
        2 => (parts[0].parse().ok()?, parts[1].parse().ok()?, 0),
        3 => {
            // mm:ss.xx or mm:ss:xx format
            let ms_str = parts[2];
            let ms: u64 = ms_str.parse().ok()?;

            // Handle different precision: xx (centiseconds) vs xxx (milliseconds)
            let ms = match ms_str.len() {
                1 => ms * 100,
                2 => ms * 10,
                3 => ms,
                _ => return None,
            };
            (parts[0].parse().ok()?, parts[1].parse().ok()?, ms)
        }
        _ => return None,
    };

    // Out-of-range fields are a parse miss, not a wrapped time
    let time_ms = min
        .checked_mul(60_000)?
        .checked_add(sec.checked_mul(1000)?)?
        .checked_add(ms)?;

    Some(time_ms)
}

/// Parse timestamp from LRC format: [mm:ss.xx] or [mm:ss:xx]
fn parse_time(src: &str) -> Option<(usize, u64)> {
    if !src.starts_with('[') {
        return None;
    }

    let end_bracket = src.find(']')?;
    let time_str = &src[1..end_bracket];

    // Skip metadata tags like [ar:Artist], [ti:Title]
    if time_str.chars().next()?.is_alphabetic() {
        return None;
    }

    Some((end_bracket + 1, parse_clock(time_str)?))
}

/// Parse a metadata tag line like [ar:Artist]
fn parse_tag(line: &str) -> Option<(String, String)> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    let (key, value) = inner.split_once(':')?;
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

/// Parse a single LRC line, which may have multiple timestamps
fn parse_line(line: &str) -> Vec<(u64, String)> {
    let mut timestamps = Vec::new();
    let mut pos = 0;

    // Extract all timestamps at the beginning
    while pos < line.len() {
        if let Some((consumed, time)) = parse_time(&line[pos..]) {
            timestamps.push(time);
            pos += consumed;
        } else {
            break;
        }
    }

    // Get the text after all timestamps
    let text = line[pos..].trim().to_string();

    timestamps
        .into_iter()
        .map(|start_time| (start_time, text.clone()))
        .collect()
}

fn timed_line(start: u64, end: Option<u64>, text: String) -> LyricLine {
    let words = if text.is_empty() {
        Vec::new()
    } else {
        vec![LyricWord::new(Some(start), end, text)]
    };
    LyricLine::new(Some(start), end, words)
}

/// Parse LRC content into an original track plus an optional translation track
pub fn parse_lrc(src: &str) -> ParsedLyrics {
    let mut tags = TagMap::new();
    let mut entries: Vec<(u64, String)> = Vec::new();

    for line in src.lines() {
        let line = line.trim_start_matches('\u{FEFF}').trim();
        let parsed = parse_line(line);
        if parsed.is_empty() {
            if let Some((key, value)) = parse_tag(line) {
                tags.insert(key, value);
            }
            continue;
        }
        entries.extend(parsed);
    }

    // Stable sort keeps file order among equal timestamps
    entries.sort_by_key(|(start, _)| *start);

    let mut original: Vec<(u64, String)> = Vec::with_capacity(entries.len());
    let mut translated: Vec<(usize, u64, String)> = Vec::new();
    for (start, text) in entries {
        match original.last() {
            Some((prev, _)) if *prev == start && !text.is_empty() => {
                let index = original.len() - 1;
                if translated.last().is_none_or(|(i, _, _)| *i != index) {
                    translated.push((index, start, text));
                }
            }
            _ => original.push((start, text)),
        }
    }

    // End of a line is the next line's start; the last one stays open
    let ends: Vec<Option<u64>> = (0..original.len())
        .map(|i| original.get(i + 1).map(|(next, _)| *next))
        .collect();

    let mut parsed = ParsedLyrics {
        tags,
        ..Default::default()
    };

    if !translated.is_empty() {
        let mut map = LineIndexMap::new();
        let lines = translated
            .into_iter()
            .enumerate()
            .map(|(j, (index, start, text))| {
                map.insert(index, j);
                timed_line(start, ends[index], text)
            })
            .collect();
        parsed
            .tracks
            .insert(TrackKind::Translation, LyricsData::new(lines));
        parsed.alignment.insert(TrackKind::Translation, map);
    }

    let lines = original
        .into_iter()
        .zip(ends)
        .map(|((start, text), end)| timed_line(start, end, text))
        .collect();
    parsed.tracks.insert(TrackKind::Original, LyricsData::new(lines));

    parsed
}
