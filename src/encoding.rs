//! Best-effort text decoding for uploaded supplier files.
//!
//! Supplier exports arrive as UTF-8 or as one of the two legacy 8-bit
//! charsets still common in German merchandise tooling. The resolver tries
//! each candidate in order and accepts the first decode that produces no
//! replacement characters; if every candidate degrades, the last one wins
//! so the caller always gets text back.

use encoding_rs::{Encoding, ISO_8859_15, UTF_8, WINDOWS_1252};

const CANDIDATES: [&Encoding; 3] = [UTF_8, WINDOWS_1252, ISO_8859_15];

#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub encoding_name: &'static str,
    /// True when no candidate decoded cleanly and the last one was accepted.
    pub degraded: bool,
}

/// Pure function of the byte buffer; never fails.
pub fn resolve_encoding(bytes: &[u8]) -> DecodedText {
    let mut last: Option<DecodedText> = None;

    for encoding in CANDIDATES {
        let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
        let decoded = DecodedText {
            text: text.into_owned(),
            encoding_name: encoding.name(),
            degraded: had_errors,
        };
        if !had_errors {
            return decoded;
        }
        last = Some(decoded);
    }

    // All candidates produced replacement markers; degrade gracefully.
    last.expect("candidate list is non-empty")
}
