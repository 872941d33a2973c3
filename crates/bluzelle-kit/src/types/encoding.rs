//! Key and value encoding shared by the transaction and query paths.
//!
//! Keys end up inside REST path segments, so both paths must encode them the
//! same way or a create/read pair will disagree on the stored key.

use std::borrow::Cow;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters left alone by `encodeURI`, minus `#` and `?` which are always
/// escaped.
const SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a key or value so it is safe inside a URL path segment.
///
/// `?` is written as `%3f` to stay byte-compatible with keys written by the
/// JavaScript client.
///
/// ```
/// use bluzelle_kit::encode_safe;
///
/// assert_eq!(encode_safe("a b#c?"), "a%20b%23c%3f");
/// ```
pub fn encode_safe(input: &str) -> String {
    // A literal '%' is itself escaped, so "%3F" can only come from '?'.
    utf8_percent_encode(input, SAFE)
        .to_string()
        .replace("%3F", "%3f")
}

/// Reverse [`encode_safe`]. Input that is not valid percent-encoded UTF-8 is
/// returned unchanged.
pub fn decode_safe(input: &str) -> Cow<'_, str> {
    match percent_decode_str(input).decode_utf8() {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(input),
    }
}
