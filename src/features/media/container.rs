//! Container-native tag fallback
//!
//! Reads the fields a general tag library most often misses on legacy files
//! (year, genre, composer, track number) straight from the container: FLAC
//! `VORBIS_COMMENT` blocks, RIFF `LIST`/`INFO` chunks and ID3v2 text frames.
//! Every string goes through encoding recovery, since these chunks are where
//! GBK and Big5 text usually hides.

use std::path::Path;

use anyhow::{Context, Result};

use super::id3::read_text_frames;
use crate::features::encoding::{decode_string, normalize_string, trim_nul};

const FLAC_VORBIS_COMMENT: u8 = 4;

/// Container recognised from the first bytes of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Flac,
    Wave,
    /// MPEG audio behind an ID3v2 tag
    Id3,
    Ogg,
    Mp4,
    Aiff,
    Unknown,
}

impl ContainerKind {
    pub fn sniff(header: &[u8]) -> Self {
        match header {
            [b'f', b'L', b'a', b'C', ..] => ContainerKind::Flac,
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => ContainerKind::Wave,
            [b'I', b'D', b'3', ..] => ContainerKind::Id3,
            [b'O', b'g', b'g', b'S', ..] => ContainerKind::Ogg,
            [_, _, _, _, b'f', b't', b'y', b'p', ..] => ContainerKind::Mp4,
            [b'F', b'O', b'R', b'M', ..] => ContainerKind::Aiff,
            _ => ContainerKind::Unknown,
        }
    }
}

/// Fields recovered from container chunks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerTags {
    pub year: Option<i64>,
    pub genre: Option<String>,
    pub composer: Option<String>,
    pub track_number: Option<i64>,
}

impl ContainerTags {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn set(&mut self, field: Field, value: &str) {
        let value = normalize_string(&trim_nul(value));
        if value.is_empty() {
            return;
        }
        match field {
            Field::Year => {
                if self.year.is_none() {
                    self.year = parse_year(&value);
                }
            }
            Field::Genre => {
                self.genre.get_or_insert(value);
            }
            Field::Composer => {
                self.composer.get_or_insert(value);
            }
            Field::Track => {
                if self.track_number.is_none() {
                    self.track_number = parse_track(&value);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Year,
    Genre,
    Composer,
    Track,
}

/// Leading four digits of a date such as `2001` or `2001-05-17`
fn parse_year(value: &str) -> Option<i64> {
    let digits: String = value.chars().take_while(char::is_ascii_digit).collect();
    if digits.len() >= 4 {
        digits[..4].parse().ok()
    } else {
        None
    }
}

/// `3` or `3/12`
fn parse_track(value: &str) -> Option<i64> {
    value.split('/').next()?.trim().parse().ok().filter(|n| *n > 0)
}

fn u32_le(bytes: &[u8], at: usize) -> Option<usize> {
    let raw = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize)
}

/// Fill `tags` from a `VORBIS_COMMENT` block body
fn read_vorbis_comments(tags: &mut ContainerTags, data: &[u8]) {
    let Some(vendor_len) = u32_le(data, 0) else {
        return;
    };
    let mut idx = 4 + vendor_len;
    let Some(count) = u32_le(data, idx) else {
        return;
    };
    idx += 4;

    for _ in 0..count {
        let Some(len) = u32_le(data, idx) else {
            break;
        };
        idx += 4;
        let Some(comment) = data.get(idx..idx + len) else {
            break;
        };
        idx += len;

        let comment = decode_string(comment);
        let Some((key, value)) = comment.split_once('=') else {
            continue;
        };
        let field = match key.to_ascii_uppercase().as_str() {
            "DATE" | "YEAR" => Field::Year,
            "GENRE" => Field::Genre,
            "COMPOSER" => Field::Composer,
            "TRACKNUMBER" => Field::Track,
            _ => continue,
        };
        tags.set(field, value);
    }
}

fn read_flac(bytes: &[u8]) -> ContainerTags {
    let mut tags = ContainerTags::default();
    let mut offset = 4;

    while let Some(header) = bytes.get(offset..offset + 4) {
        let is_last = header[0] & 0x80 != 0;
        let block_type = header[0] & 0x7F;
        let len = u32::from_be_bytes([0, header[1], header[2], header[3]]) as usize;
        offset += 4;

        let Some(body) = bytes.get(offset..offset + len) else {
            tracing::debug!("FLAC block {} overruns file", block_type);
            break;
        };
        if block_type == FLAC_VORBIS_COMMENT {
            read_vorbis_comments(&mut tags, body);
        }
        offset += len;
        if is_last {
            break;
        }
    }
    tags
}

/// Fill `tags` from the sub-chunks of a `LIST`/`INFO` chunk
fn read_riff_info(tags: &mut ContainerTags, data: &[u8]) {
    let mut offset = 0;
    while let Some(id) = data.get(offset..offset + 4) {
        let Some(len) = u32_le(data, offset + 4) else {
            break;
        };
        let start = offset + 8;
        let Some(value) = data.get(start..start + len) else {
            break;
        };

        let field = match id {
            b"ICRD" => Some(Field::Year),
            b"IGNR" => Some(Field::Genre),
            b"IMUS" => Some(Field::Composer),
            b"ITRK" | b"IPRT" => Some(Field::Track),
            _ => None,
        };
        if let Some(field) = field {
            tags.set(field, &decode_string(value));
        }
        // Chunks are word-aligned
        offset = start + len + (len & 1);
    }
}

fn read_wave(bytes: &[u8]) -> ContainerTags {
    let mut tags = ContainerTags::default();
    let mut offset = 12;

    while let Some(id) = bytes.get(offset..offset + 4) {
        let Some(len) = u32_le(bytes, offset + 4) else {
            break;
        };
        let start = offset + 8;
        let body = bytes.get(start..(start + len).min(bytes.len())).unwrap_or_default();
        if id == b"LIST" && body.starts_with(b"INFO") {
            read_riff_info(&mut tags, &body[4..]);
        }
        offset = start + len + (len & 1);
    }
    tags
}

fn read_id3(bytes: &[u8]) -> ContainerTags {
    let mut tags = ContainerTags::default();
    let frames = match read_text_frames(bytes) {
        Ok(frames) => frames,
        Err(e) => {
            tracing::debug!("Skipping ID3 text frames: {}", e);
            return tags;
        }
    };

    for (id, field) in [
        ("TDRC", Field::Year),
        ("TYER", Field::Year),
        ("TCON", Field::Genre),
        ("TCOM", Field::Composer),
        ("TRCK", Field::Track),
    ] {
        if let Some(value) = frames.get(id) {
            tags.set(field, value);
        }
    }
    tags
}

/// Read container tags from a whole file's bytes
///
/// Ogg, MP4 and AIFF are recognised but yield nothing; the tag library
/// already covers them.
pub fn read_container_tags(bytes: &[u8]) -> ContainerTags {
    match ContainerKind::sniff(bytes) {
        ContainerKind::Flac => read_flac(bytes),
        ContainerKind::Wave => read_wave(bytes),
        ContainerKind::Id3 => read_id3(bytes),
        ContainerKind::Ogg | ContainerKind::Mp4 | ContainerKind::Aiff | ContainerKind::Unknown => {
            ContainerTags::default()
        }
    }
}

/// Read container tags from the file at `path`
pub fn read_container_tags_from_path(path: &Path) -> Result<ContainerTags> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(read_container_tags(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vorbis_block(comments: &[&[u8]], last: bool) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&3u32.to_le_bytes());
        body.extend_from_slice(b"lib");
        body.extend_from_slice(&(comments.len() as u32).to_le_bytes());
        for c in comments {
            body.extend_from_slice(&(c.len() as u32).to_le_bytes());
            body.extend_from_slice(c);
        }
        let mut block = vec![if last { 0x80 | 4 } else { 4 }];
        block.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        block.extend(body);
        block
    }

    #[test]
    fn test_sniff() {
        assert_eq!(ContainerKind::sniff(b"fLaC\0\0"), ContainerKind::Flac);
        assert_eq!(ContainerKind::sniff(b"RIFF\0\0\0\0WAVEfmt "), ContainerKind::Wave);
        assert_eq!(ContainerKind::sniff(b"RIFF\0\0\0\0AVI "), ContainerKind::Unknown);
        assert_eq!(ContainerKind::sniff(b"ID3\x04"), ContainerKind::Id3);
        assert_eq!(ContainerKind::sniff(b"OggS"), ContainerKind::Ogg);
        assert_eq!(ContainerKind::sniff(b"\0\0\0\x20ftypM4A "), ContainerKind::Mp4);
        assert_eq!(ContainerKind::sniff(b"FORM\0\0\0\0AIFF"), ContainerKind::Aiff);
    }

    #[test]
    fn test_flac_vorbis_comments() {
        let mut file = b"fLaC".to_vec();
        // STREAMINFO placeholder
        file.extend_from_slice(&[0, 0, 0, 2, 0xAA, 0xBB]);
        let mut genre = b"GENRE=".to_vec();
        genre.extend_from_slice(&[0xC1, 0xF7, 0xD0, 0xD0]); // 流行 in GBK
        file.extend(vorbis_block(
            &[b"DATE=2003-07-01", &genre, b"composer=Someone", b"TRACKNUMBER=4/10"],
            true,
        ));

        let tags = read_container_tags(&file);
        assert_eq!(tags.year, Some(2003));
        assert_eq!(tags.genre.as_deref(), Some("流行"));
        assert_eq!(tags.composer.as_deref(), Some("Someone"));
        assert_eq!(tags.track_number, Some(4));
    }

    fn wave_with_info(chunks: &[(&[u8], &[u8])]) -> Vec<u8> {
        let mut info = b"INFO".to_vec();
        for (id, value) in chunks {
            info.extend_from_slice(id);
            info.extend_from_slice(&(value.len() as u32).to_le_bytes());
            info.extend_from_slice(value);
            if value.len() % 2 == 1 {
                info.push(0);
            }
        }
        let mut file = b"RIFF\0\0\0\0WAVE".to_vec();
        file.extend_from_slice(b"fmt ");
        file.extend_from_slice(&2u32.to_le_bytes());
        file.extend_from_slice(&[1, 0]);
        file.extend_from_slice(b"LIST");
        file.extend_from_slice(&(info.len() as u32).to_le_bytes());
        file.extend(info);
        file
    }

    #[test]
    fn test_riff_info() {
        let chunks: [(&[u8], &[u8]); 3] = [
            (b"ICRD", b"1999\0"),
            (b"IGNR", b"Rock\0"),
            (b"ITRK", b"7\0"),
        ];
        let file = wave_with_info(&chunks);
        let tags = read_container_tags(&file);
        assert_eq!(tags.year, Some(1999));
        assert_eq!(tags.genre.as_deref(), Some("Rock"));
        assert_eq!(tags.track_number, Some(7));
        assert_eq!(tags.composer, None);
    }

    #[test]
    fn test_riff_info_even_length_values() {
        let chunks: [(&[u8], &[u8]); 2] = [(b"IGNR", b"Pop\0"), (b"IMUS", b"Bach\0\0")];
        let file = wave_with_info(&chunks);
        let tags = read_container_tags(&file);
        assert_eq!(tags.genre.as_deref(), Some("Pop"));
        assert_eq!(tags.composer.as_deref(), Some("Bach"));
    }

    #[test]
    fn test_recognised_but_empty() {
        assert!(read_container_tags(b"OggS\0\x02").is_empty());
        assert!(read_container_tags(b"garbage").is_empty());
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_year("2001-05-17"), Some(2001));
        assert_eq!(parse_year("99"), None);
        assert_eq!(parse_track("03/12"), Some(3));
        assert_eq!(parse_track("0"), None);
    }
}
