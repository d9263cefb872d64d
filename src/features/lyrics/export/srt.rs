//! SRT export

use std::fmt::Write;

use super::ExportOptions;
use super::timestamp::format_srt_time;
use crate::features::lyrics::align::align_line;
use crate::features::lyrics::parser::{MultiLyricsData, ParsedLyrics, TrackKind};

/// Convert parsed lyrics to SubRip cues
///
/// Open-ended lines are closed by the next line's start, or by
/// `options.total_duration` for the last one. Lines still missing a bound are
/// dropped.
pub fn to_srt(parsed: &ParsedLyrics, options: &ExportOptions) -> String {
    let filled = parsed
        .original()
        .with_filled_end_times(options.total_duration);

    let mut tracks = MultiLyricsData::with_original(filled.clone());
    for kind in parsed.tracks.kinds() {
        if kind != TrackKind::Original {
            if let Some(track) = parsed.tracks.get(kind) {
                tracks.insert(kind, track.clone());
            }
        }
    }

    let mut result = String::new();
    let mut cue = 0usize;

    for (index, line) in filled.lines.iter().enumerate() {
        if !line.has_content() {
            continue;
        }
        let (Some(start), Some(end)) = (line.start, line.end) else {
            tracing::debug!("Skipping SRT line {index} without complete timing");
            continue;
        };

        let texts: Vec<String> = align_line(&tracks, &options.order, &parsed.alignment, index, false)
            .iter()
            .map(|aligned| aligned.line.text().trim().to_string())
            .filter(|text| !text.is_empty())
            .collect();
        if texts.is_empty() {
            continue;
        }

        cue += 1;
        writeln!(result, "{cue}").unwrap();
        writeln!(
            result,
            "{} --> {}",
            format_srt_time(start),
            format_srt_time(end)
        )
        .unwrap();
        for text in texts {
            result.push_str(&text);
            result.push('\n');
        }
        result.push('\n');
    }

    result
}
