//! Href encoding for file references inside description documents.
//!
//! Encoding is an explicit per-invocation choice threaded through parse and
//! build options; there is no process-wide toggle.

use std::borrow::Cow;

/// How `href` attributes are encoded on write and interpreted on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HrefEncoding {
    /// Percent-encode every path segment, leaving `/` separators literal.
    /// Decoding additionally accepts `+` for space, which older tooling
    /// emitted.
    #[default]
    Percent,
    /// Hrefs are taken and written verbatim.
    Raw,
}

impl HrefEncoding {
    /// Encode a zone-relative path for embedding in an `href` attribute.
    pub fn encode(&self, path: &str) -> String {
        match self {
            HrefEncoding::Raw => path.to_string(),
            HrefEncoding::Percent => path
                .split('/')
                .map(|segment| urlencoding::encode(segment).into_owned())
                .collect::<Vec<_>>()
                .join("/"),
        }
    }

    /// Decode an `href` attribute into a zone-relative path. Malformed
    /// percent sequences leave the value untouched rather than failing the
    /// whole parse.
    pub fn decode<'a>(&self, href: &'a str) -> Cow<'a, str> {
        match self {
            HrefEncoding::Raw => Cow::Borrowed(href),
            HrefEncoding::Percent => {
                let spaced: Cow<'a, str> = if href.contains('+') {
                    Cow::Owned(href.replace('+', "%20"))
                } else {
                    Cow::Borrowed(href)
                };
                match urlencoding::decode(&spaced) {
                    Ok(decoded) => Cow::Owned(decoded.into_owned()),
                    Err(_) => Cow::Borrowed(href),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_round_trip_preserves_separators() {
        let enc = HrefEncoding::Percent;
        let path = "data/sub folder/informe anual.pdf";
        let encoded = enc.encode(path);
        assert_eq!(encoded, "data/sub%20folder/informe%20anual.pdf");
        assert_eq!(enc.decode(&encoded), path);
    }

    #[test]
    fn test_decode_accepts_plus_for_space() {
        let enc = HrefEncoding::Percent;
        assert_eq!(enc.decode("data/a+b.txt"), "data/a b.txt");
        // a literal plus sign survives as an escape
        assert_eq!(enc.decode("data/a%2Bb.txt"), "data/a+b.txt");
    }

    #[test]
    fn test_malformed_escape_left_verbatim() {
        let enc = HrefEncoding::Percent;
        assert_eq!(enc.decode("data/bad%zz.txt"), "data/bad%zz.txt");
    }

    #[test]
    fn test_raw_is_identity() {
        let enc = HrefEncoding::Raw;
        assert_eq!(enc.encode("a b/c"), "a b/c");
        assert_eq!(enc.decode("a%20b"), "a%20b");
    }
}
