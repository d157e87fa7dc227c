//! Encoding and decoding of text runs and attribute bytes.

use std::borrow::Cow;

use mdtag_config::Charset;

use crate::error::RenderError;

/// Decode `bytes` with `charset`.
///
/// Borrows when the bytes are already valid UTF-8 text for the charset.
pub fn decode(charset: Charset, bytes: &[u8]) -> Result<Cow<'_, str>, RenderError> {
    match charset {
        Charset::Utf8 => utf8(charset, bytes),
        Charset::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
            Some(offset) => Err(RenderError::Encoding { charset, offset }),
            None => utf8(charset, bytes),
        },
        Charset::Latin1 if bytes.is_ascii() => utf8(charset, bytes),
        Charset::Latin1 => Ok(Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())),
    }
}

/// Encode `text` into `charset`.
///
/// Engines parse UTF-8 source, so every byte they report goes through this
/// first; [`decode`] then recovers the same text.
///
/// # Errors
///
/// Returns [`RenderError::Encoding`] at the first character `charset`
/// cannot represent.
pub fn encode(charset: Charset, text: &str) -> Result<Cow<'_, [u8]>, RenderError> {
    match charset {
        Charset::Utf8 => Ok(Cow::Borrowed(text.as_bytes())),
        _ if text.is_ascii() => Ok(Cow::Borrowed(text.as_bytes())),
        Charset::Ascii => Err(unencodable(charset, text, 0x7F)),
        Charset::Latin1 => text
            .chars()
            .map(|c| u8::try_from(c).ok())
            .collect::<Option<Vec<u8>>>()
            .map(Cow::Owned)
            .ok_or_else(|| unencodable(charset, text, 0xFF)),
    }
}

/// Error pointing at the first character of `text` above `max`.
fn unencodable(charset: Charset, text: &str, max: u32) -> RenderError {
    let offset = text
        .char_indices()
        .find(|&(_, c)| u32::from(c) > max)
        .map_or(text.len(), |(offset, _)| offset);
    RenderError::Encoding { charset, offset }
}

fn utf8(charset: Charset, bytes: &[u8]) -> Result<Cow<'_, str>, RenderError> {
    std::str::from_utf8(bytes)
        .map(Cow::Borrowed)
        .map_err(|e| RenderError::Encoding {
            charset,
            offset: e.valid_up_to(),
        })
}
