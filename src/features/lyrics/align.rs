//! Multi-language line alignment
//!
//! For one original line, resolves the matching line of every requested track.
//! Tracks with fewer lines than the original (translations usually drop blank
//! lines) go through the alignment map built by the parser.

use super::parser::{AlignmentMap, LyricLine, MultiLyricsData, TrackKind};

/// One output line for an original line index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedLine<'a> {
    pub kind: TrackKind,
    pub line: &'a LyricLine,
    /// Single-word reference line rendered with a closing timestamp
    pub trailing: bool,
}

/// Resolve the line of `kind` that corresponds to original line `index`
pub fn resolve_line<'a>(
    tracks: &'a MultiLyricsData,
    alignment: &AlignmentMap,
    kind: TrackKind,
    index: usize,
) -> Option<&'a LyricLine> {
    let track = tracks.get(kind)?;
    let own_index = match (kind, alignment.get(&kind)) {
        (TrackKind::Original, _) | (_, None) => index,
        (_, Some(map)) => *map.get(&index)?,
    };
    track.lines.get(own_index)
}

/// Lines to emit for original line `index`, in `order`
///
/// Tracks without a resolvable, non-empty line are skipped. With
/// `trailing_reference` set, a single-word line from the last track in `order`
/// is flagged as a trailing fragment.
pub fn align_line<'a>(
    tracks: &'a MultiLyricsData,
    order: &[TrackKind],
    alignment: &AlignmentMap,
    index: usize,
    trailing_reference: bool,
) -> Vec<AlignedLine<'a>> {
    let last = order.last().copied();

    order
        .iter()
        .filter_map(|&kind| {
            let line = resolve_line(tracks, alignment, kind, index)?;
            if !line.has_content() {
                return None;
            }
            let trailing = trailing_reference && Some(kind) == last && line.words.len() == 1;
            Some(AlignedLine {
                kind,
                line,
                trailing,
            })
        })
        .collect()
}
