use std::fmt::{self, Display, Formatter};

use mime::Mime;

use crate::message::{
    encoder::{self, ContentTransferEncoding},
    EmailFormat,
};

/// Ordered set of MIME headers, rendered in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Headers(Vec::new())
    }

    /// Appends a header, keeping any previous one with the same name.
    pub fn add<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.0.push((name.into(), value.into()));
    }
}

impl Display for Headers {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.0 {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

/// MIME part variants
#[derive(Debug, Clone)]
pub enum Part {
    /// Single part with content
    Single(SinglePart),

    /// Multiple parts of content
    Multi(MultiPart),
}

impl EmailFormat for Part {
    fn format(&self, out: &mut Vec<u8>) {
        match self {
            Part::Single(part) => part.format(out),
            Part::Multi(part) => part.format(out),
        }
    }
}

/// Creates builder for single part
#[derive(Debug, Clone, Default)]
pub struct SinglePartBuilder {
    headers: Headers,
    encoding: Option<ContentTransferEncoding>,
}

impl SinglePartBuilder {
    pub fn new() -> Self {
        Self {
            headers: Headers::new(),
            encoding: None,
        }
    }

    /// Set a raw header of the singlepart
    pub fn header<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Set the Content-Type header of the singlepart
    pub fn content_type(mut self, content_type: &Mime) -> Self {
        self.headers.add("Content-Type", content_type.to_string());
        self
    }

    /// Force the transfer encoding instead of inspecting the content
    pub fn encoding(mut self, encoding: ContentTransferEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Build singlepart using body
    pub fn body<T: AsRef<[u8]>>(mut self, body: T) -> SinglePart {
        let encoding = self
            .encoding
            .unwrap_or_else(|| encoder::choose(body.as_ref()));
        self.headers
            .add("Content-Transfer-Encoding", encoding.to_string());
        SinglePart {
            headers: self.headers,
            body: encoder::encode(body.as_ref(), encoding),
        }
    }
}

/// Single part
///
/// The body is stored already transfer-encoded.
#[derive(Debug, Clone)]
pub struct SinglePart {
    headers: Headers,
    body: Vec<u8>,
}

impl SinglePart {
    /// Creates a default builder for singlepart
    pub fn builder() -> SinglePartBuilder {
        SinglePartBuilder::new()
    }

    /// Get message content formatted for SMTP
    pub fn formatted(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.format(&mut out);
        out
    }
}

impl EmailFormat for SinglePart {
    fn format(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.headers.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out.extend_from_slice(b"\r\n");
    }
}

/// The kind of multipart
#[derive(Debug, Clone, Copy)]
pub enum MultiPartKind {
    /// Mixed kind to combine unrelated content parts
    ///
    /// For example this kind can be used to mix an email message and
    /// attachments.
    Mixed,

    /// Alternative kind to join several variants of same email contents.
    ///
    /// That kind is recommended to use for joining plain (text) and rich
    /// (HTML) messages into a single email.
    Alternative,
}

impl MultiPartKind {
    fn subtype(self) -> &'static str {
        match self {
            MultiPartKind::Mixed => "mixed",
            MultiPartKind::Alternative => "alternative",
        }
    }
}

/// Create a random MIME boundary: 16 random bytes in hex, prefixed.
pub(crate) fn make_boundary() -> String {
    let mut boundary = String::with_capacity(34);
    boundary.push_str("=_");
    for _ in 0..16 {
        use std::fmt::Write;
        write!(boundary, "{:02x}", fastrand::u8(..)).expect("write to string");
    }
    boundary
}

/// Multipart builder
#[derive(Debug, Clone)]
pub struct MultiPartBuilder {
    kind: MultiPartKind,
    boundary: Option<String>,
}

impl MultiPartBuilder {
    /// Set custom boundary
    pub fn boundary<S: Into<String>>(mut self, boundary: S) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Creates multipart without parts
    pub fn build(self) -> MultiPart {
        MultiPart {
            kind: self.kind,
            boundary: self.boundary.unwrap_or_else(make_boundary),
            parts: Vec::new(),
        }
    }

    /// Creates multipart using singlepart
    pub fn singlepart(self, part: SinglePart) -> MultiPart {
        self.build().singlepart(part)
    }

    /// Creates multipart using multipart
    pub fn multipart(self, part: MultiPart) -> MultiPart {
        self.build().multipart(part)
    }
}

/// Multipart variant with parts
#[derive(Debug, Clone)]
pub struct MultiPart {
    kind: MultiPartKind,
    boundary: String,
    parts: Vec<Part>,
}

impl MultiPart {
    /// Creates mixed multipart builder
    pub fn mixed() -> MultiPartBuilder {
        MultiPartBuilder {
            kind: MultiPartKind::Mixed,
            boundary: None,
        }
    }

    /// Creates alternative multipart builder
    pub fn alternative() -> MultiPartBuilder {
        MultiPartBuilder {
            kind: MultiPartKind::Alternative,
            boundary: None,
        }
    }

    /// Add single part to multipart
    pub fn singlepart(mut self, part: SinglePart) -> Self {
        self.parts.push(Part::Single(part));
        self
    }

    /// Add multi part to multipart
    pub fn multipart(mut self, part: MultiPart) -> Self {
        self.parts.push(Part::Multi(part));
        self
    }

    /// Get the boundary of multipart contents
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The `Content-Type` header value announcing this multipart
    pub fn content_type(&self) -> String {
        format!(
            "multipart/{}; boundary=\"{}\"",
            self.kind.subtype(),
            self.boundary
        )
    }

    /// Get message content formatted for SMTP
    pub fn formatted(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.format(&mut out);
        out
    }
}

impl EmailFormat for MultiPart {
    fn format(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(format!("Content-Type: {}\r\n", self.content_type()).as_bytes());
        out.extend_from_slice(b"\r\n");

        for part in &self.parts {
            out.extend_from_slice(b"--");
            out.extend_from_slice(self.boundary.as_bytes());
            out.extend_from_slice(b"\r\n");
            part.format(out);
        }

        out.extend_from_slice(b"--");
        out.extend_from_slice(self.boundary.as_bytes());
        out.extend_from_slice(b"--\r\n");
    }
}
