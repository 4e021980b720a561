//! # PyON Literal Decoding
//!
//! Purpose: Turn the daemon's reply payloads into typed values.
//!
//! Structured replies are wrapped as
//!
//! ```text
//! PyON <version> [<kind>]\n
//! <body>\n
//! ---
//! ```
//!
//! where `<body>` is JSON except for the Python tokens `None`, `True` and
//! `False`, and `\xHH` escapes inside strings.
//!
//! ## Design Principles
//! 1. **Envelope First**: A payload without the tag or the `---` footer is
//!    rejected outright; nothing is partially parsed.
//! 2. **Quote-Aware Rewrite**: Python tokens are rewritten only outside
//!    string literals and only as whole words, so `"NoneSuch"` or
//!    `"True story"` survive untouched.
//! 3. **Serde at the Core**: After rewriting, `serde_json` does the real work
//!    and decides the target shape.
//! 4. **Passthrough Escapes**: The escaped-string decoder never fails on an
//!    unknown escape; it copies it verbatim.

use serde::de::DeserializeOwned;

use crate::error::{ClientError, ClientResult};

/// Tag opening every literal payload.
pub const LITERAL_TAG: &[u8] = b"PyON";

/// Footer closing every literal payload.
pub const LITERAL_FOOTER: &[u8] = b"\n---";

/// Footer closing a `log-update` payload.
pub const LOG_UPDATE_FOOTER: &[u8] = b"\n---\n\n";

// (python token, json replacement)
const TOKEN_REWRITES: [(&[u8], &[u8]); 3] = [
    (b"None", b"\"\""),
    (b"True", b"true"),
    (b"False", b"false"),
];

/// Decodes a literal payload into `T`.
///
/// `None` decodes as an empty string; numbers follow serde rules, so an
/// `f64` target accepts `1` while an integer target rejects `1.5`.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> ClientResult<T> {
    let body = literal_body(payload)?;
    let rewritten = rewrite_literals(body);
    Ok(serde_json::from_slice(&rewritten)?)
}

/// Returns the body between the header line and the footer.
pub fn literal_body(payload: &[u8]) -> ClientResult<&[u8]> {
    if !payload.starts_with(LITERAL_TAG) || !payload.ends_with(LITERAL_FOOTER) {
        return Err(ClientError::Format(format!(
            "invalid PyON envelope: {:?}",
            preview(payload)
        )));
    }
    body_after_header(payload, payload.len() - LITERAL_FOOTER.len())
}

/// Rewrites `None`, `True` and `False` outside string literals.
///
/// Inside strings, `\xHH` escapes are rewritten to `\u00HH` so the body is
/// valid JSON. Everything else is copied unchanged.
pub fn rewrite_literals(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 8);
    let mut in_string = false;
    let mut idx = 0;

    'scan: while idx < body.len() {
        let byte = body[idx];

        if in_string {
            match byte {
                b'\\' if body.get(idx + 1) == Some(&b'x') && hex_pair(body, idx + 2).is_some() => {
                    out.extend_from_slice(b"\\u00");
                    out.extend_from_slice(&body[idx + 2..idx + 4]);
                    idx += 4;
                }
                b'\\' => {
                    let end = (idx + 2).min(body.len());
                    out.extend_from_slice(&body[idx..end]);
                    idx = end;
                }
                b'"' => {
                    in_string = false;
                    out.push(byte);
                    idx += 1;
                }
                _ => {
                    out.push(byte);
                    idx += 1;
                }
            }
            continue;
        }

        if byte == b'"' {
            in_string = true;
        } else if idx == 0 || !is_ident_byte(body[idx - 1]) {
            for (token, replacement) in TOKEN_REWRITES {
                let end = idx + token.len();
                if body[idx..].starts_with(token)
                    && body.get(end).map_or(true, |&next| !is_ident_byte(next))
                {
                    out.extend_from_slice(replacement);
                    idx = end;
                    continue 'scan;
                }
            }
        }

        out.push(byte);
        idx += 1;
    }
    out
}

/// Decodes a quoted, backslash-escaped string.
///
/// Recognized escapes are `\n`, `\r`, `\"`, `\\` and `\xHH`; `\xHH` yields
/// the code point `U+00HH`. Any other backslash sequence is kept as-is.
pub fn decode_escaped_string(payload: &[u8]) -> ClientResult<String> {
    if payload.len() < 2 || payload[0] != b'"' || payload[payload.len() - 1] != b'"' {
        return Err(ClientError::Format(format!(
            "invalid escaped string: {:?}",
            preview(payload)
        )));
    }

    let body = &payload[1..payload.len() - 1];
    let mut out = Vec::with_capacity(body.len());
    let mut idx = 0;
    while idx < body.len() {
        if body[idx] != b'\\' {
            out.push(body[idx]);
            idx += 1;
            continue;
        }

        match body.get(idx + 1) {
            Some(b'n') => out.push(b'\n'),
            Some(b'r') => out.push(b'\r'),
            Some(b'"') => out.push(b'"'),
            Some(b'\\') => out.push(b'\\'),
            Some(b'x') => match hex_pair(body, idx + 2) {
                Some(value) => {
                    let mut utf8 = [0u8; 4];
                    out.extend_from_slice(char::from(value).encode_utf8(&mut utf8).as_bytes());
                    idx += 4;
                    continue;
                }
                None => out.extend_from_slice(b"\\x"),
            },
            Some(&other) => out.extend_from_slice(&[b'\\', other]),
            None => {
                out.push(b'\\');
                break;
            }
        }
        idx += 2;
    }

    Ok(String::from_utf8(out)
        .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned()))
}

/// Decodes a `log-update` payload into the log text it carries.
///
/// The body of a log update is one large escaped string rather than
/// structured data, and the footer carries two extra newlines. The header
/// line (`PyON 1 log-update`) is dropped without inspection.
pub fn decode_log_update(payload: &[u8]) -> ClientResult<String> {
    if !payload.ends_with(LOG_UPDATE_FOOTER) {
        return Err(ClientError::Format(format!(
            "invalid log-update envelope: {:?}",
            preview(payload)
        )));
    }
    let body = body_after_header(payload, payload.len() - LOG_UPDATE_FOOTER.len())?;
    decode_escaped_string(body)
}

fn body_after_header(payload: &[u8], footer_start: usize) -> ClientResult<&[u8]> {
    let start = payload
        .iter()
        .position(|&b| b == b'\n')
        .map(|idx| idx + 1)
        .filter(|&start| start < footer_start)
        .ok_or_else(|| ClientError::Format("empty PyON body".to_string()))?;
    Ok(&payload[start..footer_start])
}

fn hex_pair(bytes: &[u8], at: usize) -> Option<u8> {
    let pair = bytes.get(at..at + 2)?;
    if !pair.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    u8::from_str_radix(std::str::from_utf8(pair).ok()?, 16).ok()
}

fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn preview(payload: &[u8]) -> String {
    const MAX: usize = 64;
    let end = payload.len().min(MAX);
    let mut text = String::from_utf8_lossy(&payload[..end]).into_owned();
    if payload.len() > MAX {
        text.push_str("...");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::Value;
    use std::collections::HashMap;

    #[test]
    fn rejects_bad_envelopes() {
        for payload in ["", "PyON\n\n---", "PyON\n---", "PyON 1\n1", "1\n---", "PYON 1\n1\n---"] {
            let err = decode::<Value>(payload.as_bytes()).unwrap_err();
            assert!(err.is_format(), "{:?} gave {:?}", payload, err);
        }
    }

    #[test]
    fn decodes_numbers_as_requested() {
        assert_eq!(decode::<f64>(b"PyON 1 ppd\n1\n---").unwrap(), 1.0);
        assert_eq!(decode::<u32>(b"PyON 1 num-slots\n2\n---").unwrap(), 2);
        assert!(decode::<u32>(b"PyON 1\n2.5\n---").is_err());
        let value = decode::<Value>(b"PyON\n1\n---").unwrap();
        assert_eq!(value.as_f64(), Some(1.0));
    }

    #[test]
    fn rewrites_python_tokens() {
        assert_eq!(decode::<String>(b"PyON\nNone\n---").unwrap(), "");
        assert!(decode::<bool>(b"PyON\nTrue\n---").unwrap());
        assert!(!decode::<bool>(b"PyON\nFalse\n---").unwrap());
    }

    #[test]
    fn leaves_tokens_inside_strings_alone() {
        let payload = b"PyON 1 slots\n{\"status\": \"True story\", \"reason\": None, \"idle\": False, \"id\": \"None\"}\n---";
        let value: HashMap<String, Value> = decode(payload).unwrap();
        assert_eq!(value["status"], "True story");
        assert_eq!(value["reason"], "");
        assert_eq!(value["idle"], false);
        assert_eq!(value["id"], "None");
    }

    #[test]
    fn leaves_partial_words_alone() {
        assert_eq!(rewrite_literals(b"[Nonesuch, xTrue, True]"), b"[Nonesuch, xTrue, true]".to_vec());
        assert_eq!(rewrite_literals(b"{\"a\\\"None\": None}"), b"{\"a\\\"None\": \"\"}".to_vec());
    }

    #[test]
    fn converts_hex_escapes_inside_strings() {
        let text: String = decode(b"PyON 1\n\"a\\x41\\x00\"\n---").unwrap();
        assert_eq!(text, "aA\u{0}");
    }

    #[test]
    fn decodes_into_structs() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Slot {
            id: String,
            idle: bool,
        }
        let slots: Vec<Slot> =
            decode(b"PyON 1 slots\n[{\"id\": \"00\", \"idle\": True}]\n---").unwrap();
        assert_eq!(slots, vec![Slot { id: "00".to_string(), idle: true }]);

        let err = decode::<Vec<Slot>>(b"PyON 1 slots\n{\"id\": 1}\n---").unwrap_err();
        assert!(matches!(err, ClientError::Json(_)));
    }

    #[test]
    fn decodes_escaped_strings() {
        let cases: [(&str, &str); 5] = [
            (r#""""#, ""),
            (r#""\n\"\\\x01""#, "\n\"\\\x01"),
            (r#""a\x01a""#, "a\x01a"),
            (r#""\xe9t\xe9""#, "\u{e9}t\u{e9}"),
            (r#""line\r\nnext""#, "line\r\nnext"),
        ];
        for (input, expected) in cases {
            assert_eq!(decode_escaped_string(input.as_bytes()).unwrap(), expected, "{}", input);
        }
    }

    #[test]
    fn passes_unknown_escapes_through() {
        assert_eq!(decode_escaped_string(br#""\t\q""#).unwrap(), r"\t\q");
        assert_eq!(decode_escaped_string(br#""\xZZ""#).unwrap(), r"\xZZ");
        assert_eq!(decode_escaped_string(br#""\x4""#).unwrap(), r"\x4");
        assert_eq!(decode_escaped_string(br#""end\""#).unwrap(), "end\\");
    }

    #[test]
    fn rejects_unquoted_strings() {
        for payload in ["", "\"", "abc", "\"abc", "abc\""] {
            assert!(decode_escaped_string(payload.as_bytes()).is_err(), "{:?}", payload);
        }
    }

    #[test]
    fn decodes_log_update() {
        let payload = b"PyON 1 log-update\n\"12:00:00:WU00:FS00:Started\\n12:00:01:Done\\x21\"\n---\n\n";
        assert_eq!(
            decode_log_update(payload).unwrap(),
            "12:00:00:WU00:FS00:Started\n12:00:01:Done!"
        );
        assert!(decode_log_update(b"PyON 1 log-update\n\"x\"\n---").is_err());
        assert!(decode_log_update(b"PyON 1 log-update\n---\n\n").is_err());
    }

    fn escape(source: &str) -> String {
        let mut out = String::from("\"");
        for ch in source.chars() {
            match ch {
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                c if (c as u32) < 0x20 || ('\u{80}'..='\u{ff}').contains(&c) => {
                    out.push_str(&format!("\\x{:02x}", c as u32));
                }
                c => out.push(c),
            }
        }
        out.push('"');
        out
    }

    proptest::proptest! {
        #[test]
        fn escaped_strings_round_trip(source in "\\PC*") {
            let decoded = decode_escaped_string(escape(&source).as_bytes()).unwrap();
            proptest::prop_assert_eq!(decoded, source);
        }
    }
}
