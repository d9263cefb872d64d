//! LRC export

use std::fmt::Write;

use super::timestamp::LrcTimestamp;
use super::{ExportOptions, LrcFormat, Precision};
use crate::features::lyrics::align::{AlignedLine, align_line};
use crate::features::lyrics::parser::{LyricLine, ParsedLyrics};

/// Tags copied into the LRC header, in output order
const HEADER_KEYS: &[&str] = &["ti", "ar", "al", "by", "offset"];

/// Identifies the writer in the header
const TOOL_TAG: &str = "[re:lyrictag]";

/// Fallback distance past the last line for its trailing fragment
const TRAILING_FALLBACK_MS: u64 = 10;

fn stamp(ms: u64, precision: Precision) -> LrcTimestamp {
    LrcTimestamp::from_millis(ms, precision)
}

/// Words of one line after the leading timestamp
fn render_words(
    result: &mut String,
    line: &LyricLine,
    end: Option<u64>,
    options: &ExportOptions,
) {
    let words = &line.words;
    match options.format {
        LrcFormat::LineTimed => result.push_str(&line.text()),
        LrcFormat::WordTimed => {
            for (k, word) in words.iter().enumerate() {
                result.push_str(&word.text);
                let word_end = word
                    .end
                    .or_else(|| words.get(k + 1).and_then(|w| w.start))
                    .or(end);
                if let Some(t) = word_end {
                    write!(result, "[{}]", stamp(t, options.precision)).unwrap();
                }
            }
        }
        LrcFormat::Enhanced => {
            let mut cursor = line.effective_start();
            for word in words {
                if let Some(t) = word.start.or(cursor) {
                    write!(result, "<{}>", stamp(t, options.precision)).unwrap();
                }
                result.push_str(&word.text);
                cursor = word.end.or(cursor);
            }
            if let Some(t) = words.last().and_then(|w| w.end).or(end) {
                write!(result, "<{}>", stamp(t, options.precision)).unwrap();
            }
        }
    }
}

/// `[T]text[T]` placed one unit before the next line starts
fn render_trailing(
    result: &mut String,
    aligned: &AlignedLine<'_>,
    at: Option<u64>,
    options: &ExportOptions,
) {
    let text = aligned.line.text();
    let Some(at) = at else {
        result.push_str(&text);
        return;
    };
    let t = stamp(at, options.precision).decremented();
    match options.format {
        LrcFormat::Enhanced => write!(result, "<{t}>{text}<{t}>").unwrap(),
        LrcFormat::LineTimed | LrcFormat::WordTimed => {
            write!(result, "[{t}]{text}[{t}]").unwrap()
        }
    }
}

/// Convert parsed lyrics to LRC
pub fn to_lrc(parsed: &ParsedLyrics, options: &ExportOptions) -> String {
    let original = parsed.original();
    let capacity: usize = original
        .lines
        .iter()
        .map(|x| x.words.iter().map(|y| y.text.len()).sum::<usize>() + 16)
        .sum::<usize>()
        * options.order.len().max(1);
    let mut result = String::with_capacity(capacity + 128);

    for key in HEADER_KEYS {
        if let Some(value) = parsed.tags.get(*key) {
            let value = value.trim();
            if !value.is_empty() {
                writeln!(result, "[{key}:{value}]").unwrap();
            }
        }
    }
    result.push_str(TOOL_TAG);
    result.push_str("\n\n");

    for (index, line) in original.lines.iter().enumerate() {
        let start = line.effective_start();
        let end = line.effective_end();
        let next_start = original
            .lines
            .get(index + 1)
            .and_then(LyricLine::effective_start);

        let aligned = align_line(
            &parsed.tracks,
            &options.order,
            &parsed.alignment,
            index,
            options.trailing_reference,
        );

        if aligned.is_empty() {
            // Blank line: a bare timestamp clears the previous lyric
            if let Some(t) = start {
                writeln!(result, "[{}]", stamp(t, options.precision)).unwrap();
            }
            continue;
        }

        for item in &aligned {
            if item.trailing {
                let at = next_start
                    .or_else(|| end.map(|e| e.saturating_add(TRAILING_FALLBACK_MS)))
                    .or_else(|| start.map(|s| s.saturating_add(TRAILING_FALLBACK_MS)));
                render_trailing(&mut result, item, at, options);
            } else {
                if let Some(t) = start {
                    write!(result, "[{}]", stamp(t, options.precision)).unwrap();
                }
                render_words(&mut result, item.line, end, options);
            }
            result.push('\n');
        }

        if options.close_gaps && options.format == LrcFormat::LineTimed {
            if let Some(e) = end {
                if next_start != Some(e) {
                    writeln!(result, "[{}]", stamp(e, options.precision)).unwrap();
                }
            }
        }
    }

    result.trim_matches(['\n', '\r']).to_string()
}
