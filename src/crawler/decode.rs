//! Character set decoding of fetched documents
//!
//! The encoding is chosen in this order:
//! 1. Byte order mark
//! 2. `charset` parameter of the Content-Type header
//! 3. Statistical detection over the whole payload

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use std::borrow::Cow;

/// A document decoded to UTF-8 text
#[derive(Debug)]
pub struct Decoded<'a> {
    pub text: Cow<'a, str>,
    /// Encoding the bytes were read with
    pub encoding: &'static Encoding,
    /// Malformed sequences were replaced with U+FFFD
    pub had_errors: bool,
}

/// Decodes raw document bytes
///
/// `content_type` may be empty when the response carried no header.
pub fn decode_document<'a>(bytes: &'a [u8], content_type: &str) -> Decoded<'a> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return decode_with(&bytes[bom_len..], encoding);
    }

    if let Some(encoding) = charset_param(content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_with(bytes, encoding);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

/// Value of the `charset` parameter of a Content-Type header
pub fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']))
            .filter(|value| !value.is_empty())
    })
}

fn decode_with<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Decoded<'a> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    Decoded {
        text,
        encoding,
        had_errors,
    }
}
