//! Inline image payloads (`data:image/<format>;base64,<data>`).

const PREFIX: &str = "data:image/";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("missing ';' after the image format")]
    MissingFormatDelimiter,
    #[error("missing ',' before the payload")]
    MissingPayloadDelimiter,
    #[error("empty image format")]
    EmptyFormat,
    #[error("invalid image format {0:?}")]
    InvalidFormat(String),
    #[error("unsupported payload encoding {0:?}, expected base64")]
    UnsupportedEncoding(String),
    #[error("empty payload")]
    EmptyPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineImage<'a> {
    /// Image subtype, e.g. `png` or `svg+xml`. Also used as the file extension.
    pub format: &'a str,
    pub encoded_data: &'a str,
}

/// Whether `src` carries an inline image. The prefix is matched ASCII case-insensitively.
pub fn is_inline(src: &str) -> bool {
    src.get(..PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(PREFIX))
}

impl<'a> InlineImage<'a> {
    /// Returns `Ok(None)` when `src` is not an inline image at all.
    pub fn parse(src: &'a str) -> Result<Option<Self>, FormatError> {
        if !is_inline(src) {
            return Ok(None);
        }
        let rest = &src[PREFIX.len()..];
        let (header, encoded_data) = rest
            .split_once(',')
            .ok_or(FormatError::MissingPayloadDelimiter)?;
        let (format, params) = header
            .split_once(';')
            .ok_or(FormatError::MissingFormatDelimiter)?;
        if format.is_empty() {
            return Err(FormatError::EmptyFormat);
        }
        if !is_mime_subtype(format) {
            return Err(FormatError::InvalidFormat(format.to_owned()));
        }
        // `;charset=...` and friends may precede the encoding marker, which must come last
        let encoding = params.rsplit_once(';').map_or(params, |(_, last)| last);
        if !encoding.eq_ignore_ascii_case("base64") {
            return Err(FormatError::UnsupportedEncoding(encoding.to_owned()));
        }
        if encoded_data.trim().is_empty() {
            return Err(FormatError::EmptyPayload);
        }
        Ok(Some(Self {
            format,
            encoded_data,
        }))
    }
}

fn is_mime_subtype(format: &str) -> bool {
    let restricted_name = format
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-.+_".contains(c));
    restricted_name
        && format!("image/{format}")
            .parse::<mime::Mime>()
            .is_ok_and(|mime| mime.type_() == mime::IMAGE)
}
