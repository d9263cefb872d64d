//! Encoding detection and conversion for lyrics and tag text
//!
//! Lyrics files and old MP3 tags (especially Chinese songs from the 2000s)
//! are often stored in GBK, Big5 or UTF-16 without any marker saying so.
//! Every candidate encoding is decoded and scored by one heuristic, and the
//! best-looking text wins. Decoding never fails: the worst case is a lossy
//! UTF-8 conversion.

use std::borrow::Cow;

use encoding_rs::{BIG5, GB18030, GBK, UTF_16BE, UTF_16LE};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LRC_TIMESTAMP: Regex = Regex::new(r"\[\d{1,3}:\d{2}[.:]\d{2,3}\]").unwrap();
}

/// Glyphs that almost only show up when CJK bytes were decoded with the wrong table.
///
/// The first group is Latin-1 rendering of GBK lead bytes, the second group is
/// GBK rendering of UTF-8 sequences (`锟斤拷` is UTF-8 U+FFFD read as GBK).
const GARBLED_GLYPHS: &[char] = &[
    'Ã', 'Â', 'Å', 'Æ', 'È', 'Ê', 'Ë', 'Ì', 'Î', 'Ï', 'Ð', 'Ò', 'Õ', '×', 'Ø', 'Ù', 'Û', 'Ý',
    'Þ', '¤', '¦', '¨', 'ª', '¬', '¯', '±', '²', '³', 'µ', '¶', '¸', '¹', 'º', '¼', '½', '¾',
    '锟', '斤', '拷', '烫', '屯', '鈥', '銆', '锛', '涓', '鐨', '浣', '犲', '鏄', '鍦', '浠', '璇',
    '鎴',
];

/// Text encodings the engine knows how to try
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    Utf8,
    Gb18030,
    Gbk,
    Gb2312,
    Utf16Le,
    Utf16Be,
    /// UTF-16 with byte order taken from the BOM (big-endian without one)
    Utf16Bom,
    Latin1,
    Big5,
}

impl TextEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Gb18030 => "GB18030",
            TextEncoding::Gbk => "GBK",
            TextEncoding::Gb2312 => "GB2312",
            TextEncoding::Utf16Le => "UTF-16LE",
            TextEncoding::Utf16Be => "UTF-16BE",
            TextEncoding::Utf16Bom => "UTF-16",
            TextEncoding::Latin1 => "ISO-8859-1",
            TextEncoding::Big5 => "Big5",
        }
    }

    /// Decode `bytes`, or `None` when this encoding cannot apply at all
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        let text = match self {
            TextEncoding::Utf8 => {
                let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
                String::from_utf8_lossy(bytes).into_owned()
            }
            TextEncoding::Gb18030 => decode_with(GB18030, bytes),
            TextEncoding::Gbk => decode_with(GBK, bytes),
            TextEncoding::Gb2312 => {
                if !is_gb2312_range(bytes) {
                    return None;
                }
                decode_with(GBK, bytes)
            }
            TextEncoding::Utf16Le => decode_with(UTF_16LE, bytes),
            TextEncoding::Utf16Be => decode_with(UTF_16BE, bytes),
            TextEncoding::Utf16Bom => decode_utf16_bom(bytes),
            TextEncoding::Latin1 => encoding_rs::mem::decode_latin1(bytes).into_owned(),
            TextEncoding::Big5 => decode_with(BIG5, bytes),
        };
        Some(strip_bom(text))
    }

    fn is_utf16(&self) -> bool {
        matches!(
            self,
            TextEncoding::Utf16Le | TextEncoding::Utf16Be | TextEncoding::Utf16Bom
        )
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Heuristic weights shared by every call site
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    /// Subtracted per U+FFFD
    pub replacement_penalty: f32,
    /// Subtracted per control character or NUL
    pub control_penalty: f32,
    /// Subtracted per known mis-decoded glyph
    pub garbled_penalty: f32,
    /// Multiplied by the printable-character ratio
    pub printable_weight: f32,
    /// Added once when any CJK ideograph is present
    pub cjk_bonus: f32,
    /// Added once when `[mm:ss.xx]` timestamps are present
    pub lrc_bonus: f32,
}

/// Base score every decode starts from before the printable bonus
const BASE_SCORE: f32 = 60.0;
/// Lowest score of a lossless UTF-8 decode; lossy decodes stay below it
const CLEAN_UTF8_FLOOR: u8 = 50;

/// Which flavour of the heuristic a caller wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreProfile {
    /// Tag text: heavier penalties, only a perfect score short-circuits
    Strict,
    /// General byte buffers
    #[default]
    Lenient,
    /// Whole lyrics files: adds Big5 and rewards LRC timestamps
    LyricFile,
}

impl ScoreProfile {
    pub fn weights(&self) -> ScoreWeights {
        match self {
            ScoreProfile::Strict => ScoreWeights {
                replacement_penalty: 20.0,
                control_penalty: 10.0,
                garbled_penalty: 20.0,
                printable_weight: 30.0,
                cjk_bonus: 10.0,
                lrc_bonus: 0.0,
            },
            ScoreProfile::Lenient => ScoreWeights {
                replacement_penalty: 10.0,
                control_penalty: 5.0,
                garbled_penalty: 15.0,
                printable_weight: 30.0,
                cjk_bonus: 10.0,
                lrc_bonus: 0.0,
            },
            ScoreProfile::LyricFile => ScoreWeights {
                replacement_penalty: 10.0,
                control_penalty: 5.0,
                garbled_penalty: 15.0,
                printable_weight: 25.0,
                cjk_bonus: 10.0,
                lrc_bonus: 5.0,
            },
        }
    }

    /// Score at which the candidate loop stops early
    pub fn short_circuit(&self) -> u8 {
        match self {
            ScoreProfile::Strict => 100,
            ScoreProfile::Lenient | ScoreProfile::LyricFile => 95,
        }
    }

    /// Candidates in priority order
    pub fn candidates(&self) -> &'static [TextEncoding] {
        use TextEncoding::*;
        match self {
            ScoreProfile::Strict | ScoreProfile::Lenient => &[
                Utf8, Gb18030, Gbk, Gb2312, Utf16Le, Utf16Be, Utf16Bom, Latin1,
            ],
            ScoreProfile::LyricFile => &[
                Utf8, Gb18030, Gbk, Gb2312, Utf16Le, Utf16Be, Utf16Bom, Latin1, Big5,
            ],
        }
    }
}

/// Outcome of [`detect`]
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub text: String,
    pub encoding: TextEncoding,
    /// Confidence in `[0, 100]`
    pub score: u8,
}

/// Try every candidate for `profile` and keep the best-scoring text
pub fn detect(bytes: &[u8], profile: ScoreProfile) -> Detection {
    // NUL terminators belong to the container, not the text; UTF-16 keeps
    // the full buffer so its code units stay aligned
    let trimmed = trim_nul_bytes(bytes);
    if trimmed.is_empty() {
        return Detection {
            text: String::new(),
            encoding: TextEncoding::Utf8,
            score: 0,
        };
    }

    let weights = profile.weights();
    let utf16 = utf16_hint(bytes);
    let mut clean_utf8 = false;
    let mut best: Option<Detection> = None;

    for &encoding in profile.candidates() {
        let input = if encoding.is_utf16() {
            // A BOM-less guess never beats text that is already clean UTF-8
            let allowed = match utf16 {
                Some(TextEncoding::Utf16Bom) => true,
                Some(order) => order == encoding && !clean_utf8,
                None => false,
            };
            if !allowed {
                continue;
            }
            bytes
        } else {
            trimmed
        };
        let Some(text) = encoding.decode(input) else {
            continue;
        };
        let text = if text.ends_with('\0') {
            text.trim_end_matches('\0').to_string()
        } else {
            text
        };
        if encoding == TextEncoding::Utf8 {
            clean_utf8 = !text.contains(['\u{FFFD}', '\0']);
        }
        let score = score_decoded(encoding, &text, &weights);

        if best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(Detection {
                text,
                encoding,
                score,
            });
        }
        if score >= profile.short_circuit() {
            break;
        }
    }

    let detection = best.unwrap_or_else(|| Detection {
        text: String::from_utf8_lossy(trimmed).into_owned(),
        encoding: TextEncoding::Utf8,
        score: 0,
    });
    tracing::trace!(
        "Detected {} (score {}) for {} bytes",
        detection.encoding,
        detection.score,
        bytes.len()
    );
    detection
}

/// Best-effort text for `bytes`
pub fn decode_bytes(bytes: &[u8], profile: ScoreProfile) -> String {
    detect(bytes, profile).text
}

/// Decode tag or file-name bytes with the general profile
pub fn decode_string(bytes: &[u8]) -> String {
    decode_bytes(bytes, ScoreProfile::Lenient)
}

/// Score of a single candidate against `bytes`, 0 when it does not apply
pub fn score_candidate(encoding: TextEncoding, bytes: &[u8], profile: ScoreProfile) -> u8 {
    match encoding.decode(bytes) {
        Some(text) => score_decoded(encoding, &text, &profile.weights()),
        None => 0,
    }
}

/// Decode bytes an ID3 frame labels as Latin-1 (encoding byte 0)
///
/// Plenty of taggers wrote GBK into such frames. The Latin-1 reading is kept
/// when it contains no garbled glyphs and less than 30% non-ASCII characters;
/// otherwise a CJK decode scoring at least 90 replaces it.
pub fn decode_latin1_or_cjk(bytes: &[u8]) -> String {
    let latin1 = encoding_rs::mem::decode_latin1(bytes).into_owned();
    let total = latin1.chars().count();
    if total == 0 {
        return latin1;
    }
    let non_ascii = latin1.chars().filter(|c| !c.is_ascii()).count();
    let garbled = latin1.chars().any(|c| GARBLED_GLYPHS.contains(&c));

    if !garbled && (non_ascii as f32) / (total as f32) < 0.3 {
        return latin1;
    }

    let weights = ScoreProfile::Lenient.weights();
    let best = [
        TextEncoding::Gb18030,
        TextEncoding::Gbk,
        TextEncoding::Gb2312,
        TextEncoding::Big5,
    ]
    .into_iter()
    .filter_map(|encoding| {
        let text = encoding.decode(bytes)?;
        let score = score_decoded(encoding, &text, &weights);
        Some((score, text))
    })
    .fold(None::<(u8, String)>, |best, candidate| match best {
        Some(b) if b.0 >= candidate.0 => Some(b),
        _ => Some(candidate),
    });

    match best {
        Some((score, text)) if score >= 90 => text,
        _ => latin1,
    }
}

/// UTF-16 using the BOM when present, big-endian otherwise
pub fn decode_utf16_bom(bytes: &[u8]) -> String {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => decode_with(UTF_16LE, rest),
        [0xFE, 0xFF, rest @ ..] => decode_with(UTF_16BE, rest),
        _ => decode_with(UTF_16BE, bytes),
    }
}

/// Score decoded text with `weights`, clamped to `[0, 100]`
pub fn score_text(text: &str, weights: &ScoreWeights) -> u8 {
    let total = text.chars().count();
    if total == 0 {
        return 0;
    }

    let mut replacement = 0usize;
    let mut control = 0usize;
    let mut garbled = 0usize;
    let mut printable = 0usize;
    let mut has_cjk = false;

    for c in text.chars() {
        if c == '\u{FFFD}' {
            replacement += 1;
        } else if c.is_control() && !matches!(c, '\n' | '\r' | '\t') {
            control += 1;
        } else if GARBLED_GLYPHS.contains(&c) {
            garbled += 1;
        }
        if is_printable(c) {
            printable += 1;
        }
        has_cjk |= is_cjk_ideograph(c);
    }

    let mut score = BASE_SCORE + weights.printable_weight * (printable as f32 / total as f32);
    if has_cjk {
        score += weights.cjk_bonus;
    }
    if weights.lrc_bonus > 0.0 && LRC_TIMESTAMP.is_match(text) {
        score += weights.lrc_bonus;
    }
    score -= weights.replacement_penalty * replacement as f32;
    score -= weights.control_penalty * control as f32;
    score -= weights.garbled_penalty * garbled as f32;

    score.clamp(0.0, 100.0).round() as u8
}

/// Lossless UTF-8 never ranks below a decode that needed substitutions
fn score_decoded(encoding: TextEncoding, text: &str, weights: &ScoreWeights) -> u8 {
    let score = score_text(text, weights);
    if text.contains('\u{FFFD}') {
        score.min(CLEAN_UTF8_FLOOR - 1)
    } else if encoding == TextEncoding::Utf8 {
        score.max(CLEAN_UTF8_FLOOR)
    } else {
        score
    }
}

fn decode_with(encoding: &'static encoding_rs::Encoding, bytes: &[u8]) -> String {
    let (text, _had_errors) = encoding.decode_without_bom_handling(bytes);
    text.into_owned()
}

fn strip_bom(text: String) -> String {
    match text.strip_prefix('\u{FEFF}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

/// Every double-byte pair must sit in the GB2312 lead/trail ranges
fn is_gb2312_range(bytes: &[u8]) -> bool {
    let mut iter = bytes.iter();
    while let Some(&b) = iter.next() {
        if b < 0x80 {
            continue;
        }
        match iter.next() {
            Some(&trail) if (0xA1..=0xF7).contains(&b) && (0xA1..=0xFE).contains(&trail) => {}
            _ => return false,
        }
    }
    true
}

fn has_utf16_bom(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0xFF, 0xFE]) || bytes.starts_with(&[0xFE, 0xFF])
}

fn trim_nul_bytes(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &bytes[..end]
}

/// UTF-16 layout worth trying for `bytes`, if any
///
/// A BOM allows every UTF-16 candidate. Without one, at least two code units
/// are required and every NUL must sit on the same byte parity, which also
/// fixes the byte order: ASCII leaves its NUL high byte second in little-endian.
fn utf16_hint(bytes: &[u8]) -> Option<TextEncoding> {
    if bytes.len() < 2 || bytes.len() % 2 != 0 {
        return None;
    }
    if has_utf16_bom(bytes) {
        return Some(TextEncoding::Utf16Bom);
    }
    if bytes.len() < 4 {
        return None;
    }

    let mut zeros = bytes.iter().enumerate().filter(|&(_, &b)| b == 0).map(|(i, _)| i % 2);
    let parity = zeros.next()?;
    let mut count = 1;
    for p in zeros {
        if p != parity {
            return None;
        }
        count += 1;
    }
    if count * 5 < bytes.len() {
        return None;
    }
    Some(if parity == 1 {
        TextEncoding::Utf16Le
    } else {
        TextEncoding::Utf16Be
    })
}

fn is_printable(c: char) -> bool {
    c.is_alphanumeric()
        || c.is_whitespace()
        || matches!(
            c,
            '!' | '"'
                | '#'
                | '\''
                | '('
                | ')'
                | ','
                | '-'
                | '.'
                | '/'
                | ':'
                | ';'
                | '?'
                | '['
                | ']'
                | '<'
                | '>'
                | '&'
                | '*'
                | '_'
                | '~'
                | '…'
                | '、'
                | '。'
                | '「'
                | '」'
                | '《'
                | '》'
        )
        || is_cjk(c)
        // Full-width forms
        || ('\u{FF00}'..='\u{FFEF}').contains(&c)
        // CJK symbols and punctuation
        || ('\u{3000}'..='\u{303F}').contains(&c)
}

fn is_cjk_ideograph(c: char) -> bool {
    // CJK Unified Ideographs and Extension A
    ('\u{4E00}'..='\u{9FFF}').contains(&c) || ('\u{3400}'..='\u{4DBF}').contains(&c)
}

fn is_cjk(c: char) -> bool {
    is_cjk_ideograph(c) ||
    // Hiragana
    ('\u{3040}'..='\u{309F}').contains(&c) ||
    // Katakana
    ('\u{30A0}'..='\u{30FF}').contains(&c) ||
    // Hangul
    ('\u{AC00}'..='\u{D7AF}').contains(&c)
}

/// Try to detect if a string contains CJK characters
pub fn contains_cjk(s: &str) -> bool {
    s.chars().any(is_cjk)
}

/// Normalize whitespace and trim a string
pub fn normalize_string(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove trailing NUL padding that tag writers leave behind
pub fn trim_nul(s: &str) -> Cow<'_, str> {
    if s.ends_with('\0') {
        Cow::Owned(s.trim_end_matches('\0').to_string())
    } else {
        Cow::Borrowed(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // "温柔" in GBK
    const WENROU_GBK: &[u8] = &[0xCE, 0xC2, 0xC8, 0xE1];

    #[test]
    fn test_utf8_passthrough() {
        let input = "Hello World 你好世界";
        assert_eq!(decode_string(input.as_bytes()), input);
        let detection = detect(input.as_bytes(), ScoreProfile::Lenient);
        assert_eq!(detection.encoding, TextEncoding::Utf8);
    }

    #[test]
    fn test_gbk_decode() {
        // "周杰伦" in GBK encoding
        let gbk_bytes: &[u8] = &[0xD6, 0xDC, 0xBD, 0xDC, 0xC2, 0xD7];
        let decoded = decode_string(gbk_bytes);
        assert_eq!(decoded, "周杰伦");
    }

    #[test]
    fn test_misread_latin1_rejected() {
        for profile in [
            ScoreProfile::Strict,
            ScoreProfile::Lenient,
            ScoreProfile::LyricFile,
        ] {
            assert!(score_candidate(TextEncoding::Latin1, WENROU_GBK, profile) < 50);
            assert!(score_candidate(TextEncoding::Gbk, WENROU_GBK, profile) >= 90);
        }
        assert_eq!(decode_string(WENROU_GBK), "温柔");
    }

    #[test]
    fn test_latin1_or_cjk() {
        assert_eq!(decode_latin1_or_cjk(WENROU_GBK), "温柔");
        assert_eq!(decode_latin1_or_cjk(&[b'C', b'a', b'f', 0xE9]), "Café");
        assert_eq!(decode_latin1_or_cjk(b"plain ascii"), "plain ascii");
    }

    #[test]
    fn test_clean_utf8_outranks_lossy() {
        for sample in ["Hello", "\u{1}\u{2}\u{3}", "温柔 [00:01.00]", "ÎÂÈ", "Pop\0", "温柔\0"] {
            let bytes = sample.as_bytes();
            let utf8 = score_candidate(TextEncoding::Utf8, bytes, ScoreProfile::Lenient);
            for &encoding in ScoreProfile::LyricFile.candidates() {
                let Some(text) = encoding.decode(bytes) else {
                    continue;
                };
                if text.contains('\u{FFFD}') {
                    let other = score_candidate(encoding, bytes, ScoreProfile::Lenient);
                    assert!(utf8 >= other, "{sample:?}: {encoding} scored {other} > {utf8}");
                }
            }
        }
    }

    #[test]
    fn test_utf16_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "歌词 lyrics".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_string(&bytes), "歌词 lyrics");
        assert_eq!(decode_utf16_bom(&bytes), "歌词 lyrics");
    }

    #[test]
    fn test_ascii_never_read_as_utf16() {
        // "Hello!" as UTF-16LE would be three CJK ideographs
        let detection = detect(b"Hello!", ScoreProfile::Lenient);
        assert_eq!(detection.encoding, TextEncoding::Utf8);
        assert_eq!(detection.text, "Hello!");
    }

    #[test]
    fn test_nul_terminated_ascii() {
        for profile in [
            ScoreProfile::Strict,
            ScoreProfile::Lenient,
            ScoreProfile::LyricFile,
        ] {
            let detection = detect(b"Pop\0", profile);
            assert_eq!(detection.encoding, TextEncoding::Utf8);
            assert_eq!(detection.text, "Pop");

            let detection = detect(b"7\0", profile);
            assert_eq!(detection.encoding, TextEncoding::Utf8);
            assert_eq!(detection.text, "7");
        }
        assert_eq!(decode_string(b"2001\0\0"), "2001");
        assert_eq!(decode_string(b"\0\0"), "");
    }

    #[test]
    fn test_bomless_utf16_ascii() {
        let le: Vec<u8> = "Pop".encode_utf16().flat_map(u16::to_le_bytes).collect();
        let detection = detect(&le, ScoreProfile::Lenient);
        assert_eq!(detection.text, "Pop");
        assert_eq!(detection.encoding, TextEncoding::Utf16Le);

        let be: Vec<u8> = "Rock".encode_utf16().flat_map(u16::to_be_bytes).collect();
        assert_eq!(decode_string(&be), "Rock");
    }

    #[test]
    fn test_utf16_hint() {
        assert_eq!(utf16_hint(b"7\0"), None);
        assert_eq!(utf16_hint(b"A\0\0B"), None);
        assert_eq!(utf16_hint(b"Hello!"), None);
        assert_eq!(utf16_hint(b"A\0B\0"), Some(TextEncoding::Utf16Le));
        assert_eq!(utf16_hint(b"\0A\0B"), Some(TextEncoding::Utf16Be));
        assert_eq!(utf16_hint(&[0xFF, 0xFE]), Some(TextEncoding::Utf16Bom));
    }

    #[test]
    fn test_big5_lyric_file() {
        // "歌詞" in Big5
        let big5: &[u8] = &[0xBA, 0x71, 0xB5, 0xFC];
        assert!(score_candidate(TextEncoding::Big5, big5, ScoreProfile::LyricFile) >= 90);
    }

    #[test]
    fn test_gb2312_range_check() {
        assert!(is_gb2312_range(WENROU_GBK));
        assert!(!is_gb2312_range(&[0x81, 0x40]));
        assert_eq!(TextEncoding::Gb2312.decode(&[0x81, 0x40]), None);
    }

    #[test]
    fn test_empty_input() {
        let detection = detect(&[], ScoreProfile::Strict);
        assert_eq!(detection.text, "");
        assert_eq!(detection.score, 0);
    }

    #[test]
    fn test_contains_cjk() {
        assert!(contains_cjk("周杰伦"));
        assert!(contains_cjk("こんにちは"));
        assert!(contains_cjk("안녕하세요"));
        assert!(!contains_cjk("Hello World"));
    }

    #[test]
    fn test_trim_nul() {
        assert_eq!(trim_nul("abc\0\0"), "abc");
        assert_eq!(trim_nul("abc"), "abc");
    }
}
