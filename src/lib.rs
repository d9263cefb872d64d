//! lyrictag - lyrics decoding, conversion and tag embedding
//!
//! Ingests vendor lyrics payloads (encrypted KRC, LRC, plain text) into a
//! multi-track model, converts them to LRC/SRT, and reads or writes them in
//! audio files (ID3v2 `USLT` frames) or `.lrc` sidecar files, recovering text
//! of unknown encoding on every path.

pub mod features;
