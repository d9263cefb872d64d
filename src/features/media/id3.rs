//! ID3v2 tag reading and lyrics splicing
//!
//! Only the parts needed for lyrics: the tag header, the frame list of
//! v2.2/v2.3/v2.4, the `USLT`/`ULT` lyrics frame and plain text frames. Every
//! other frame is carried through a splice byte-for-byte.

use std::collections::BTreeMap;
use std::fmt;

use crate::features::encoding::{
    ScoreProfile, decode_bytes, decode_latin1_or_cjk, decode_utf16_bom, trim_nul,
};

const HEADER_LEN: usize = 10;
const MAX_SYNCHSAFE: u32 = 0x0FFF_FFFF;

const FLAG_UNSYNCHRONISATION: u8 = 0x80;
const FLAG_EXTENDED_HEADER: u8 = 0x40;
const FLAG_FOOTER: u8 = 0x10;

/// v2.3 frame format flags: compression, encryption, grouping identity
const V23_FRAME_ENCODED: u8 = 0x80 | 0x40 | 0x20;
/// v2.4 frame format flags: grouping, compression, encryption,
/// unsynchronisation, data length indicator
const V24_FRAME_ENCODED: u8 = 0x40 | 0x08 | 0x04 | 0x02 | 0x01;

/// Language code used when the caller passes something unusable
const UNKNOWN_LANGUAGE: &[u8; 3] = b"XXX";

/// Tag I/O failure
#[derive(Debug)]
pub enum TagError {
    Io(std::io::Error),
    /// Structure does not follow the ID3v2 layout
    Malformed(String),
    /// Valid but uses a feature this engine does not rewrite
    Unsupported(String),
    /// Written lyrics could not be read back
    Verify(String),
}

impl fmt::Display for TagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagError::Io(e) => write!(f, "IO error: {}", e),
            TagError::Malformed(e) => write!(f, "Malformed tag: {}", e),
            TagError::Unsupported(e) => write!(f, "Unsupported tag: {}", e),
            TagError::Verify(e) => write!(f, "Verification failed: {}", e),
        }
    }
}

impl std::error::Error for TagError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TagError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TagError {
    fn from(e: std::io::Error) -> Self {
        TagError::Io(e)
    }
}

/// Decode a 28-bit synchsafe integer (7 bits per byte)
pub fn decode_synchsafe(bytes: [u8; 4]) -> Option<u32> {
    if bytes.iter().any(|b| b & 0x80 != 0) {
        return None;
    }
    Some(bytes.iter().fold(0u32, |acc, &b| (acc << 7) | b as u32))
}

/// Encode `value` as a synchsafe integer; `None` above 2^28 - 1
pub fn encode_synchsafe(value: u32) -> Option<[u8; 4]> {
    if value > MAX_SYNCHSAFE {
        return None;
    }
    Some([
        ((value >> 21) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ])
}

/// Major version, which fixes the frame header layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagVersion {
    /// 3-byte id, 3-byte big-endian size, no flags
    V22,
    /// 4-byte id, 4-byte big-endian size, 2 flag bytes
    V23,
    /// 4-byte id, synchsafe size, 2 flag bytes
    V24,
}

impl TagVersion {
    pub fn from_major(major: u8) -> Option<Self> {
        match major {
            2 => Some(TagVersion::V22),
            3 => Some(TagVersion::V23),
            4 => Some(TagVersion::V24),
            _ => None,
        }
    }

    pub fn major(&self) -> u8 {
        match self {
            TagVersion::V22 => 2,
            TagVersion::V23 => 3,
            TagVersion::V24 => 4,
        }
    }

    fn id_len(&self) -> usize {
        match self {
            TagVersion::V22 => 3,
            TagVersion::V23 | TagVersion::V24 => 4,
        }
    }

    fn frame_header_len(&self) -> usize {
        match self {
            TagVersion::V22 => 6,
            TagVersion::V23 | TagVersion::V24 => 10,
        }
    }

    /// Frame id of unsynchronised lyrics
    pub fn lyrics_id(&self) -> &'static str {
        match self {
            TagVersion::V22 => "ULT",
            TagVersion::V23 | TagVersion::V24 => "USLT",
        }
    }

    fn decode_frame_size(&self, bytes: &[u8]) -> Option<u32> {
        match self {
            TagVersion::V22 => Some(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]])),
            TagVersion::V23 => Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            TagVersion::V24 => decode_synchsafe([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }

    fn encode_frame_size(&self, size: usize) -> Result<Vec<u8>, TagError> {
        let too_large = || TagError::Malformed(format!("frame of {size} bytes is too large"));
        let size = u32::try_from(size).map_err(|_| too_large())?;
        match self {
            TagVersion::V22 => {
                if size > 0x00FF_FFFF {
                    return Err(too_large());
                }
                Ok(size.to_be_bytes()[1..].to_vec())
            }
            TagVersion::V23 => Ok(size.to_be_bytes().to_vec()),
            TagVersion::V24 => encode_synchsafe(size).map(|b| b.to_vec()).ok_or_else(too_large),
        }
    }
}

/// One frame, payload kept opaque
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id3Frame {
    pub id: String,
    /// Status and format flags; always zero for v2.2
    pub flags: [u8; 2],
    pub data: Vec<u8>,
}

impl Id3Frame {
    /// Whether `data` starts directly with the frame content
    pub fn is_plain(&self, version: TagVersion) -> bool {
        let format = self.flags[1];
        match version {
            TagVersion::V22 => true,
            TagVersion::V23 => format & V23_FRAME_ENCODED == 0,
            TagVersion::V24 => format & V24_FRAME_ENCODED == 0,
        }
    }
}

/// A parsed ID3v2 tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id3Tag {
    pub version: TagVersion,
    pub revision: u8,
    pub flags: u8,
    pub frames: Vec<Id3Frame>,
}

impl Id3Tag {
    pub fn new(version: TagVersion) -> Self {
        Self {
            version,
            revision: 0,
            flags: 0,
            frames: Vec::new(),
        }
    }

    /// Parse the tag at the start of `bytes`
    ///
    /// Returns the tag and its full length (header, body and footer), or
    /// `None` when `bytes` does not start with an ID3v2 tag.
    pub fn parse(bytes: &[u8]) -> Result<Option<(Self, usize)>, TagError> {
        if bytes.len() < HEADER_LEN || &bytes[..3] != b"ID3" {
            return Ok(None);
        }

        let version = TagVersion::from_major(bytes[3])
            .ok_or_else(|| TagError::Unsupported(format!("ID3v2.{}", bytes[3])))?;
        let revision = bytes[4];
        let flags = bytes[5];
        let size = decode_synchsafe([bytes[6], bytes[7], bytes[8], bytes[9]])
            .ok_or_else(|| TagError::Malformed("tag size is not synchsafe".into()))?
            as usize;

        if flags & FLAG_UNSYNCHRONISATION != 0 {
            return Err(TagError::Unsupported("tag-level unsynchronisation".into()));
        }
        if version == TagVersion::V22 && flags & 0x40 != 0 {
            return Err(TagError::Unsupported("ID3v2.2 compression".into()));
        }

        let body_end = HEADER_LEN + size;
        if bytes.len() < body_end {
            return Err(TagError::Malformed(format!(
                "tag declares {} bytes but only {} are present",
                size,
                bytes.len() - HEADER_LEN
            )));
        }
        let has_footer = version == TagVersion::V24 && flags & FLAG_FOOTER != 0;
        let total = body_end + if has_footer { HEADER_LEN } else { 0 };
        if bytes.len() < total {
            return Err(TagError::Malformed("missing tag footer".into()));
        }

        let mut offset = HEADER_LEN;
        if version != TagVersion::V22 && flags & FLAG_EXTENDED_HEADER != 0 {
            offset += extended_header_len(version, &bytes[HEADER_LEN..body_end])?;
        }

        let frames = parse_frames(version, &bytes[offset..body_end])?;
        tracing::debug!(
            "Parsed ID3v2.{}.{} tag: {} bytes, {} frames",
            version.major(),
            revision,
            total,
            frames.len()
        );

        Ok(Some((
            Self {
                version,
                revision,
                flags,
                frames,
            },
            total,
        )))
    }

    /// Serialize the tag without padding
    ///
    /// The extended header is not written back (its CRC would no longer
    /// match), so its flag is cleared.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TagError> {
        let mut body = Vec::new();
        for frame in &self.frames {
            let id = frame.id.as_bytes();
            if id.len() != self.version.id_len() {
                return Err(TagError::Malformed(format!(
                    "frame id {:?} does not fit ID3v2.{}",
                    frame.id,
                    self.version.major()
                )));
            }
            body.extend_from_slice(id);
            body.extend(self.version.encode_frame_size(frame.data.len())?);
            if self.version != TagVersion::V22 {
                body.extend_from_slice(&frame.flags);
            }
            body.extend_from_slice(&frame.data);
        }

        let size = u32::try_from(body.len())
            .ok()
            .and_then(encode_synchsafe)
            .ok_or_else(|| TagError::Malformed("tag body is too large".into()))?;
        let flags = self.flags & !(FLAG_EXTENDED_HEADER | FLAG_UNSYNCHRONISATION);
        let has_footer = self.version == TagVersion::V24 && flags & FLAG_FOOTER != 0;

        let mut out = Vec::with_capacity(body.len() + HEADER_LEN * 2);
        out.extend_from_slice(b"ID3");
        out.extend_from_slice(&[self.version.major(), self.revision, flags]);
        out.extend_from_slice(&size);
        out.extend(body);
        if has_footer {
            out.extend_from_slice(b"3DI");
            out.extend_from_slice(&[self.version.major(), self.revision, flags]);
            out.extend_from_slice(&size);
        }
        Ok(out)
    }

    pub fn frame(&self, id: &str) -> Option<&Id3Frame> {
        self.frames.iter().find(|f| f.id == id)
    }

    /// Frames whose payload can be read as-is; encoded ones are logged and skipped
    fn plain_frames(&self) -> impl Iterator<Item = &Id3Frame> {
        self.frames.iter().filter(|frame| {
            let plain = frame.is_plain(self.version);
            if !plain {
                tracing::debug!(
                    "Skipping {} frame with format flags {:#04x}",
                    frame.id,
                    frame.flags[1]
                );
            }
            plain
        })
    }
}

fn extended_header_len(version: TagVersion, body: &[u8]) -> Result<usize, TagError> {
    if body.len() < 4 {
        return Err(TagError::Malformed("truncated extended header".into()));
    }
    let raw = [body[0], body[1], body[2], body[3]];
    let len = match version {
        // v2.3 size excludes its own four bytes
        TagVersion::V23 => u32::from_be_bytes(raw) as usize + 4,
        TagVersion::V24 => decode_synchsafe(raw)
            .ok_or_else(|| TagError::Malformed("extended header size is not synchsafe".into()))?
            as usize,
        TagVersion::V22 => 0,
    };
    if len > body.len() {
        return Err(TagError::Malformed("extended header overruns tag".into()));
    }
    Ok(len)
}

fn parse_frames(version: TagVersion, body: &[u8]) -> Result<Vec<Id3Frame>, TagError> {
    let id_len = version.id_len();
    let header_len = version.frame_header_len();
    let mut frames = Vec::new();
    let mut offset = 0;

    while offset + header_len <= body.len() {
        let header = &body[offset..offset + header_len];
        // Padding
        if header[0] == 0 {
            break;
        }
        let id = &header[..id_len];
        if !id.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
            tracing::warn!("Stopping at invalid frame id {:?} at offset {}", id, offset);
            break;
        }
        let size = version
            .decode_frame_size(&header[id_len..])
            .ok_or_else(|| TagError::Malformed("frame size is not synchsafe".into()))?
            as usize;
        let flags = match version {
            TagVersion::V22 => [0, 0],
            TagVersion::V23 | TagVersion::V24 => [header[8], header[9]],
        };

        let start = offset + header_len;
        let end = start + size;
        if end > body.len() {
            return Err(TagError::Malformed(format!(
                "frame {} overruns tag",
                String::from_utf8_lossy(id)
            )));
        }

        frames.push(Id3Frame {
            id: String::from_utf8_lossy(id).into_owned(),
            flags,
            data: body[start..end].to_vec(),
        });
        offset = end;
    }

    Ok(frames)
}

fn language_code(lang: &str) -> [u8; 3] {
    let bytes = lang.trim().as_bytes();
    if bytes.len() == 3 && bytes.iter().all(u8::is_ascii_alphabetic) {
        [
            bytes[0].to_ascii_lowercase(),
            bytes[1].to_ascii_lowercase(),
            bytes[2].to_ascii_lowercase(),
        ]
    } else {
        *UNKNOWN_LANGUAGE
    }
}

/// Build an unsynchronised lyrics frame with an empty description
///
/// v2.4 frames carry UTF-8 (encoding byte 3); v2.2/v2.3 have no UTF-8 and get
/// UTF-16 with a BOM (encoding byte 1).
pub fn build_lyrics_frame(version: TagVersion, lyrics: &str, lang: &str) -> Id3Frame {
    let mut data = Vec::with_capacity(lyrics.len() * 2 + 8);
    match version {
        TagVersion::V24 => {
            data.push(3);
            data.extend_from_slice(&language_code(lang));
            data.push(0);
            data.extend_from_slice(lyrics.as_bytes());
        }
        TagVersion::V22 | TagVersion::V23 => {
            data.push(1);
            data.extend_from_slice(&language_code(lang));
            // Empty description: BOM + terminator
            data.extend_from_slice(&[0xFF, 0xFE, 0, 0]);
            data.extend_from_slice(&[0xFF, 0xFE]);
            data.extend(lyrics.encode_utf16().flat_map(u16::to_le_bytes));
        }
    }

    Id3Frame {
        id: version.lyrics_id().to_string(),
        flags: [0, 0],
        data,
    }
}

/// Replace the lyrics frame of the tag at the start of `file`
///
/// Every other frame and the audio after the tag are kept. Without a tag, a
/// new ID3v2.4.0 tag is put in front of the untouched audio.
pub fn splice_lyrics(file: &[u8], lyrics: &str, lang: &str) -> Result<Vec<u8>, TagError> {
    let (mut tag, tag_len) = match Id3Tag::parse(file)? {
        Some(found) => found,
        None => (Id3Tag::new(TagVersion::V24), 0),
    };

    let lyrics_id = tag.version.lyrics_id();
    let before = tag.frames.len();
    tag.frames.retain(|f| f.id != lyrics_id);
    if tag.frames.len() != before {
        tracing::debug!("Replacing {} existing lyrics frame(s)", before - tag.frames.len());
    }
    tag.frames.push(build_lyrics_frame(tag.version, lyrics, lang));

    let mut out = tag.to_bytes()?;
    out.extend_from_slice(&file[tag_len..]);
    Ok(out)
}

/// Find the end of a NUL-terminated field; UTF-16 terminators are two aligned zero bytes
fn terminator(bytes: &[u8], wide: bool) -> Option<(usize, usize)> {
    if wide {
        (0..bytes.len().saturating_sub(1))
            .step_by(2)
            .find(|&i| bytes[i] == 0 && bytes[i + 1] == 0)
            .map(|i| (i, 2))
    } else {
        bytes.iter().position(|&b| b == 0).map(|i| (i, 1))
    }
}

/// Decode text by the frame's encoding byte
fn decode_text(encoding: u8, bytes: &[u8]) -> String {
    let text = match encoding {
        0 => decode_latin1_or_cjk(bytes),
        // no BOM reads as big-endian, which is what encoding 2 means
        1 | 2 => decode_utf16_bom(bytes),
        3 => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => decode_bytes(bytes, ScoreProfile::LyricFile),
        },
        _ => decode_bytes(bytes, ScoreProfile::LyricFile),
    };
    trim_nul(&text).into_owned()
}

/// Text of an unsynchronised lyrics frame payload
pub fn decode_lyrics_frame(data: &[u8]) -> Option<String> {
    let (&encoding, rest) = data.split_first()?;
    // language
    let rest = rest.get(3..)?;
    let wide = matches!(encoding, 1 | 2);
    let text = match terminator(rest, wide) {
        Some((pos, len)) => &rest[pos + len..],
        None => &[],
    };
    Some(decode_text(encoding, text))
}

/// Lyrics from the tag at the start of `file`, if any
pub fn read_lyrics_frame(file: &[u8]) -> Result<Option<String>, TagError> {
    let Some((tag, _)) = Id3Tag::parse(file)? else {
        return Ok(None);
    };
    let lyrics_id = tag.version.lyrics_id();
    Ok(tag
        .plain_frames()
        .filter(|frame| frame.id == lyrics_id)
        .filter_map(|frame| decode_lyrics_frame(&frame.data))
        .find(|text| !text.trim().is_empty()))
}

/// v2.2 text frame ids mapped onto their v2.3/v2.4 names
fn canonical_id(id: &str) -> &str {
    match id {
        "TT2" => "TIT2",
        "TP1" => "TPE1",
        "TAL" => "TALB",
        "TYE" => "TYER",
        "TCO" => "TCON",
        "TCM" => "TCOM",
        "TRK" => "TRCK",
        other => other,
    }
}

/// All `T***` text frames of the tag at the start of `file`, keyed by v2.3/v2.4 id
///
/// Multi-valued v2.4 frames keep their first value.
pub fn read_text_frames(file: &[u8]) -> Result<BTreeMap<String, String>, TagError> {
    let Some((tag, _)) = Id3Tag::parse(file)? else {
        return Ok(BTreeMap::new());
    };

    let mut frames = BTreeMap::new();
    for frame in tag.plain_frames() {
        if !frame.id.starts_with('T') || frame.id == "TXXX" || frame.id == "TXX" {
            continue;
        }
        let Some((&encoding, text)) = frame.data.split_first() else {
            continue;
        };
        let decoded = decode_text(encoding, text);
        let value = decoded.split('\0').next().unwrap_or_default().trim();
        if !value.is_empty() {
            frames
                .entry(canonical_id(&frame.id).to_string())
                .or_insert_with(|| value.to_string());
        }
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal MPEG frame header followed by silence
    const FAKE_AUDIO: &[u8] = &[0xFF, 0xFB, 0x90, 0x64, 0, 0, 0, 0, 0, 0, 0, 0];

    fn v23_text_frame(id: &str, text: &str) -> Vec<u8> {
        let mut data = vec![0];
        data.extend_from_slice(text.as_bytes());
        let mut frame = id.as_bytes().to_vec();
        frame.extend_from_slice(&(data.len() as u32).to_be_bytes());
        frame.extend_from_slice(&[0, 0]);
        frame.extend(data);
        frame
    }

    fn v23_frame(id: &str, flags: [u8; 2], data: &[u8]) -> Vec<u8> {
        let mut frame = id.as_bytes().to_vec();
        frame.extend_from_slice(&(data.len() as u32).to_be_bytes());
        frame.extend_from_slice(&flags);
        frame.extend_from_slice(data);
        frame
    }

    fn v23_tag(frames: &[Vec<u8>], padding: usize) -> Vec<u8> {
        let body: Vec<u8> = frames
            .iter()
            .flatten()
            .copied()
            .chain(std::iter::repeat_n(0, padding))
            .collect();
        let mut tag = b"ID3\x03\x00\x00".to_vec();
        tag.extend_from_slice(&encode_synchsafe(body.len() as u32).unwrap());
        tag.extend(body);
        tag
    }

    #[test]
    fn test_synchsafe() {
        assert_eq!(encode_synchsafe(0x7F), Some([0, 0, 0, 0x7F]));
        assert_eq!(encode_synchsafe(0x80), Some([0, 0, 1, 0]));
        assert_eq!(decode_synchsafe([0, 0, 0x02, 0x01]), Some(257));
        assert_eq!(decode_synchsafe([0, 0, 0x80, 0]), None);
        assert_eq!(encode_synchsafe(MAX_SYNCHSAFE + 1), None);
        let n = 123_456_789 & MAX_SYNCHSAFE;
        assert_eq!(decode_synchsafe(encode_synchsafe(n).unwrap()), Some(n));
    }

    #[test]
    fn test_untagged_round_trip() {
        let spliced = splice_lyrics(FAKE_AUDIO, "[00:01.00]温柔", "chi").unwrap();
        assert_eq!(&spliced[..5], b"ID3\x04\x00");
        assert!(spliced.ends_with(FAKE_AUDIO));
        assert_eq!(
            read_lyrics_frame(&spliced).unwrap().as_deref(),
            Some("[00:01.00]温柔")
        );

        let (tag, len) = Id3Tag::parse(&spliced).unwrap().unwrap();
        assert_eq!(len, spliced.len() - FAKE_AUDIO.len());
        let frame = tag.frame("USLT").unwrap();
        assert_eq!(&frame.data[..5], b"\x03chi\x00");
    }

    #[test]
    fn test_splice_preserves_frames_and_version() {
        let mut file = v23_tag(
            &[
                v23_text_frame("TIT2", "Song"),
                v23_text_frame("TYER", "2001"),
            ],
            64,
        );
        file.extend_from_slice(FAKE_AUDIO);

        let once = splice_lyrics(&file, "first", "eng").unwrap();
        let twice = splice_lyrics(&once, "second", "eng").unwrap();

        let (tag, _) = Id3Tag::parse(&twice).unwrap().unwrap();
        assert_eq!(tag.version, TagVersion::V23);
        let ids: Vec<&str> = tag.frames.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["TIT2", "TYER", "USLT"]);
        assert_eq!(read_lyrics_frame(&twice).unwrap().as_deref(), Some("second"));
        assert!(twice.ends_with(FAKE_AUDIO));

        let text = read_text_frames(&twice).unwrap();
        assert_eq!(text["TIT2"], "Song");
        assert_eq!(text["TYER"], "2001");
    }

    #[test]
    fn test_v22_frames() {
        let mut body = b"TT2\x00\x00\x05\x00Song".to_vec();
        body.extend_from_slice(b"TYE\x00\x00\x05\x001999");
        let mut file = b"ID3\x02\x00\x00".to_vec();
        file.extend_from_slice(&encode_synchsafe(body.len() as u32).unwrap());
        file.extend(body);

        let text = read_text_frames(&file).unwrap();
        assert_eq!(text["TIT2"], "Song");
        assert_eq!(text["TYER"], "1999");

        let spliced = splice_lyrics(&file, "la la", "eng").unwrap();
        let (tag, _) = Id3Tag::parse(&spliced).unwrap().unwrap();
        assert_eq!(tag.version, TagVersion::V22);
        assert!(tag.frame("ULT").is_some());
        assert_eq!(read_lyrics_frame(&spliced).unwrap().as_deref(), Some("la la"));
    }

    #[test]
    fn test_encoded_frames_skipped() {
        let compressed = v23_frame("USLT", [0, 0x80], &[0x78, 0x9C, 0x01, 0x02, 0x03, 0x04]);
        let mut plain = vec![0];
        plain.extend_from_slice(b"eng\0plain words");
        let lyrics = v23_frame("USLT", [0, 0], &plain);
        let encrypted = v23_frame("TIT2", [0, 0x40], &[0x05, 0xAA, 0xBB]);
        let title = v23_text_frame("TPE1", "Singer");

        let mut file = v23_tag(&[compressed.clone(), lyrics, encrypted, title], 0);
        file.extend_from_slice(FAKE_AUDIO);

        assert_eq!(read_lyrics_frame(&file).unwrap().as_deref(), Some("plain words"));
        let texts = read_text_frames(&file).unwrap();
        assert!(!texts.contains_key("TIT2"));
        assert_eq!(texts["TPE1"], "Singer");

        let mut only_compressed = v23_tag(&[compressed], 0);
        only_compressed.extend_from_slice(FAKE_AUDIO);
        assert_eq!(read_lyrics_frame(&only_compressed).unwrap(), None);
    }

    #[test]
    fn test_frame_format_flags() {
        let frame = |format| Id3Frame {
            id: "USLT".into(),
            flags: [0, format],
            data: Vec::new(),
        };
        assert!(frame(0).is_plain(TagVersion::V24));
        assert!(!frame(0x01).is_plain(TagVersion::V24));
        assert!(!frame(0x08).is_plain(TagVersion::V24));
        assert!(!frame(0x80).is_plain(TagVersion::V23));
        // v2.3 has no data length indicator bit
        assert!(frame(0x01).is_plain(TagVersion::V23));
    }

    #[test]
    fn test_unsynchronised_tag_unsupported() {
        let mut file = b"ID3\x03\x00\x80\x00\x00\x00\x00".to_vec();
        file.extend_from_slice(FAKE_AUDIO);
        assert!(matches!(
            splice_lyrics(&file, "x", "eng"),
            Err(TagError::Unsupported(_))
        ));
    }

    #[test]
    fn test_truncated_tag_malformed() {
        let file = b"ID3\x03\x00\x00\x00\x00\x01\x00TIT2";
        assert!(matches!(
            Id3Tag::parse(file),
            Err(TagError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_latin1_labelled_gbk() {
        // encoding 0, "eng", empty description, GBK bytes of 温柔
        let data = [0, b'e', b'n', b'g', 0, 0xCE, 0xC2, 0xC8, 0xE1];
        assert_eq!(decode_lyrics_frame(&data).as_deref(), Some("温柔"));
    }

    #[test]
    fn test_decode_utf16_with_description() {
        let mut data = vec![1, b'e', b'n', b'g'];
        data.extend_from_slice(&[0xFF, 0xFE, b'd', 0, 0, 0]);
        data.extend_from_slice(&[0xFF, 0xFE]);
        data.extend("歌词".encode_utf16().flat_map(u16::to_le_bytes));
        data.extend_from_slice(&[0, 0]);
        assert_eq!(decode_lyrics_frame(&data).as_deref(), Some("歌词"));
    }

    #[test]
    fn test_language_code() {
        assert_eq!(&language_code("ENG"), b"eng");
        assert_eq!(&language_code("english"), b"XXX");
    }
}
