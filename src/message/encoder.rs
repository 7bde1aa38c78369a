//! Content transfer encoding of MIME bodies

use std::fmt::{self, Display, Formatter};

use crate::base64;

/// Encoding of a MIME part body on the wire
///
/// https://tools.ietf.org/html/rfc2045#section-6
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentTransferEncoding {
    SevenBit,
    QuotedPrintable,
    Base64,
}

impl Display for ContentTransferEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContentTransferEncoding::SevenBit => "7bit",
            ContentTransferEncoding::QuotedPrintable => "quoted-printable",
            ContentTransferEncoding::Base64 => "base64",
        })
    }
}

/// Longest line the SMTP wire accepts, terminator excluded
const MAX_LINE_LEN: usize = 998;

/// Picks the lightest encoding that can carry `content` unharmed.
pub(crate) fn choose(content: &[u8]) -> ContentTransferEncoding {
    if is_seven_bit(content) {
        ContentTransferEncoding::SevenBit
    } else if std::str::from_utf8(content).is_ok() {
        ContentTransferEncoding::QuotedPrintable
    } else {
        ContentTransferEncoding::Base64
    }
}

fn is_seven_bit(content: &[u8]) -> bool {
    let mut line_len = 0;
    let mut prev = 0u8;
    for &b in content {
        match b {
            0 | 128.. => return false,
            b'\n' if prev != b'\r' => return false,
            b'\n' => line_len = 0,
            b'\r' => {}
            _ => {
                if prev == b'\r' {
                    return false;
                }
                line_len += 1;
                if line_len > MAX_LINE_LEN {
                    return false;
                }
            }
        }
        prev = b;
    }
    prev != b'\r'
}

pub(crate) fn encode(content: &[u8], encoding: ContentTransferEncoding) -> Vec<u8> {
    match encoding {
        ContentTransferEncoding::SevenBit => content.to_vec(),
        ContentTransferEncoding::QuotedPrintable => quoted_printable::encode(content),
        ContentTransferEncoding::Base64 => base64::encode_wrapped(content),
    }
}

/// Wraps header text in an RFC 2047 UTF-8 B-encoded word when it cannot
/// travel as-is. Subjects and display names go through here.
///
/// https://tools.ietf.org/html/rfc2047
pub(crate) fn encoded_word(text: &str) -> String {
    if text.bytes().all(is_header_safe) {
        text.into()
    } else {
        format!("=?utf-8?b?{}?=", base64::encode(text))
    }
}

// printable US-ASCII plus the whitespace a header value may carry
fn is_header_safe(byte: u8) -> bool {
    matches!(byte, b'\t' | b' '..=b'~')
}

#[cfg(test)]
mod test {
    use super::{choose, encode, encoded_word, ContentTransferEncoding};

    #[test]
    fn ascii_is_seven_bit() {
        assert_eq!(
            choose(b"plain old text\r\n"),
            ContentTransferEncoding::SevenBit
        );
    }

    #[test]
    fn utf8_is_quoted_printable() {
        assert_eq!(
            choose("tschüß".as_bytes()),
            ContentTransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn binary_is_base64() {
        assert_eq!(choose(&[0xff, 0x00, 0x80]), ContentTransferEncoding::Base64);
    }

    #[test]
    fn bare_line_feed_is_not_seven_bit() {
        assert_eq!(
            choose(b"bare\nfeed"),
            ContentTransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn overlong_line_is_not_seven_bit() {
        let long = vec![b'x'; 1200];
        assert_ne!(choose(&long), ContentTransferEncoding::SevenBit);
    }

    #[test]
    fn quoted_printable_escapes() {
        let out = encode("föö".as_bytes(), ContentTransferEncoding::QuotedPrintable);
        assert_eq!(out, b"f=C3=B6=C3=B6".to_vec());
    }

    #[test]
    fn ascii_header_text_travels_bare() {
        assert_eq!(&encoded_word("Kayo. ?"), "Kayo. ?");
    }

    #[test]
    fn utf8_header_text_becomes_an_encoded_word() {
        assert_eq!(
            &encoded_word("Привет, мир!"),
            "=?utf-8?b?0J/RgNC40LLQtdGCLCDQvNC40YAh?="
        );
    }

    #[test]
    fn control_characters_force_encoding() {
        assert_eq!(&encoded_word("bell\x07"), "=?utf-8?b?YmVsbAc=?=");
    }
}
