use ::base64::{
    engine::{general_purpose::STANDARD, Engine},
    DecodeError,
};

/// Line width used when wrapping base64 encoded MIME bodies.
pub(crate) const MIME_LINE_WIDTH: usize = 76;

pub(crate) fn encode<T: AsRef<[u8]>>(input: T) -> String {
    STANDARD.encode(input)
}

#[allow(dead_code)]
pub(crate) fn decode<T: AsRef<[u8]>>(input: T) -> Result<Vec<u8>, DecodeError> {
    STANDARD.decode(input)
}

/// Encodes `input` and wraps the output with CRLF every
/// [`MIME_LINE_WIDTH`] characters, as required inside MIME bodies.
pub(crate) fn encode_wrapped<T: AsRef<[u8]>>(input: T) -> Vec<u8> {
    let encoded = STANDARD.encode(input);
    let mut out = Vec::with_capacity(encoded.len() + (encoded.len() / MIME_LINE_WIDTH + 1) * 2);
    let mut chunks = encoded.as_bytes().chunks(MIME_LINE_WIDTH).peekable();
    while let Some(chunk) = chunks.next() {
        out.extend_from_slice(chunk);
        if chunks.peek().is_some() {
            out.extend_from_slice(b"\r\n");
        }
    }
    out
}
