//! Decoding raw input bytes into text for the XML parser.
//!
//! A byte-order-mark wins; otherwise the `encoding` pseudo-attribute of the XML
//! declaration is honoured; otherwise the bytes must be UTF-8.

use crate::error::SourceError;
use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use regex::bytes::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// The declaration must sit at the very start of the document, so only a
/// short prefix is inspected.
const DECLARATION_PREFIX: usize = 1024;

static DECLARED_ENCODING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*<\?xml[^>]*?\bencoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#)
        .expect("valid regex")
});

fn declared_encoding(bytes: &[u8]) -> Result<Option<&'static Encoding>, SourceError> {
    let prefix = &bytes[..bytes.len().min(DECLARATION_PREFIX)];
    let Some(label) = DECLARED_ENCODING
        .captures(prefix)
        .and_then(|c| c.get(1))
        .map(|m| m.as_bytes())
    else {
        return Ok(None);
    };
    let encoding = Encoding::for_label(label)
        .ok_or_else(|| SourceError::UnknownEncoding(String::from_utf8_lossy(label).into_owned()))?;
    // A declaration readable as ASCII cannot be UTF-16 without a BOM.
    if encoding == UTF_16LE || encoding == UTF_16BE {
        return Ok(None);
    }
    Ok(Some(encoding))
}

/// Decodes one XML document. The returned text never starts with a BOM, and
/// any byte sequence invalid in the chosen encoding is an error.
pub fn decode_xml(bytes: &[u8]) -> Result<String, SourceError> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None => (declared_encoding(bytes)?.unwrap_or(UTF_8), bytes),
    };

    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(Cow::into_owned)
        .ok_or(SourceError::Decode {
            encoding: encoding.name(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::SHIFT_JIS;

    #[test]
    fn plain_utf8_passes_through() {
        let text = decode_xml("<a>Čau</a>".as_bytes()).unwrap();
        assert_eq!(text, "<a>Čau</a>");
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let text = decode_xml(b"\xEF\xBB\xBF<a>x</a>").unwrap();
        assert_eq!(text, "<a>x</a>");
    }

    #[test]
    fn utf16_with_bom_is_decoded() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<a>路線</a>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_xml(&bytes).unwrap(), "<a>路線</a>");
    }

    #[test]
    fn utf16_declaration_without_bom_is_ignored() {
        let source = r#"<?xml version="1.0" encoding="UTF-16"?><a>x</a>"#;
        assert_eq!(decode_xml(source.as_bytes()).unwrap(), source);
    }

    #[test]
    fn declared_shift_jis_is_honoured() {
        let source = r#"<?xml version="1.0" encoding="Shift_JIS"?><a>座標系</a>"#;
        let (bytes, _, had_errors) = SHIFT_JIS.encode(source);
        assert!(!had_errors);
        let text = decode_xml(&bytes).unwrap();
        assert!(text.ends_with("<a>座標系</a>"));
    }

    #[test]
    fn unknown_declared_encoding_is_an_error() {
        let bytes = br#"<?xml version="1.0" encoding="x-made-up"?><a/>"#;
        assert!(matches!(
            decode_xml(bytes),
            Err(SourceError::UnknownEncoding(label)) if label == "x-made-up"
        ));
    }

    #[test]
    fn invalid_bytes_under_a_declared_encoding_are_an_error() {
        let bytes = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?><Document><Placemark><name>A\xFF\xFE</name></Placemark></Document>";
        assert!(matches!(
            decode_xml(bytes),
            Err(SourceError::Decode { encoding: "UTF-8" })
        ));

        let mut shift_jis = br#"<?xml version="1.0" encoding="Shift_JIS"?><a>"#.to_vec();
        shift_jis.extend_from_slice(b"\x81\x20</a>");
        assert!(matches!(
            decode_xml(&shift_jis),
            Err(SourceError::Decode { encoding: "Shift_JIS" })
        ));
    }

    #[test]
    fn invalid_bytes_after_a_bom_are_an_error() {
        assert!(matches!(
            decode_xml(b"\xEF\xBB\xBF<a>\xC3</a>"),
            Err(SourceError::Decode { .. })
        ));
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        assert!(matches!(
            decode_xml(b"<a>\xFF\xFE\xFD</a>"),
            Err(SourceError::Decode { .. })
        ));
    }
}
