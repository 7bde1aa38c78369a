//! What to send: sender, recipients, subject, bodies and attachments

use std::{fmt, io};

use mime::Mime;

use crate::{
    address::Address,
    error::{self, Error},
    message::Mailbox,
};

/// Produces the bytes of an attachment on demand.
///
/// Reading from the filesystem, an object store or any other backend is the
/// caller's business; the mailer only pulls the bytes when the message is
/// rendered, immediately before delivery.
pub trait ContentSource: Send + Sync {
    fn read_bytes(&self) -> io::Result<Vec<u8>>;
}

impl ContentSource for Vec<u8> {
    fn read_bytes(&self) -> io::Result<Vec<u8>> {
        Ok(self.clone())
    }
}

impl<F> ContentSource for F
where
    F: Fn() -> io::Result<Vec<u8>> + Send + Sync,
{
    fn read_bytes(&self) -> io::Result<Vec<u8>> {
        self()
    }
}

/// A file attached to a message
pub struct Attachment {
    filename: String,
    content_type: Mime,
    source: Box<dyn ContentSource>,
}

impl Attachment {
    /// Creates an attachment with the given file name and content type.
    ///
    /// ```
    /// # use mxpost::Attachment;
    /// let attachment = Attachment::new(
    ///     "notes.txt",
    ///     "text/plain".parse().unwrap(),
    ///     b"some notes".to_vec(),
    /// );
    /// ```
    pub fn new<S: Into<String>>(
        filename: S,
        content_type: Mime,
        source: impl ContentSource + 'static,
    ) -> Self {
        Attachment {
            filename: filename.into(),
            content_type,
            source: Box::new(source),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &Mime {
        &self.content_type
    }

    /// Pulls the attachment bytes from the source
    pub(crate) fn bytes(&self) -> Result<Vec<u8>, Error> {
        self.source
            .read_bytes()
            .map_err(|e| error::attachment(format!("{}: {e}", self.filename)))
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Everything needed to send one message
///
/// Built with [`Envelope::builder`]:
///
/// ```
/// # use mxpost::Envelope;
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let envelope = Envelope::builder()
///     .from("Orders <orders@shop.example>".parse()?)
///     .to("customer@example.com".parse()?)
///     .subject("Your order")
///     .text_body("It shipped.")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Envelope {
    from: Mailbox,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    subject: String,
    text: String,
    html: Option<String>,
    attachments: Vec<Attachment>,
}

impl Envelope {
    pub fn builder() -> EnvelopeBuilder {
        EnvelopeBuilder::new()
    }

    pub fn from(&self) -> &Mailbox {
        &self.from
    }

    pub fn to(&self) -> &[Mailbox] {
        &self.to
    }

    pub fn cc(&self) -> &[Mailbox] {
        &self.cc
    }

    pub fn bcc(&self) -> &[Mailbox] {
        &self.bcc
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// All recipient addresses, in to, cc, bcc order
    pub(crate) fn recipient_addresses(&self) -> impl Iterator<Item = &Address> {
        self.to
            .iter()
            .chain(self.cc.iter())
            .chain(self.bcc.iter())
            .map(|mbox| &mbox.email)
    }
}

/// Builder for [`Envelope`]
#[derive(Debug, Default)]
pub struct EnvelopeBuilder {
    from: Option<Mailbox>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    subject: String,
    text: String,
    html: Option<String>,
    attachments: Vec<Attachment>,
}

impl EnvelopeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sender mailbox
    pub fn from(mut self, mbox: Mailbox) -> Self {
        self.from = Some(mbox);
        self
    }

    /// Add a primary recipient
    pub fn to(mut self, mbox: Mailbox) -> Self {
        self.to.push(mbox);
        self
    }

    /// Add a carbon-copy recipient
    pub fn cc(mut self, mbox: Mailbox) -> Self {
        self.cc.push(mbox);
        self
    }

    /// Add a blind-carbon-copy recipient
    ///
    /// Bcc recipients receive the message but are never named in its
    /// headers.
    pub fn bcc(mut self, mbox: Mailbox) -> Self {
        self.bcc.push(mbox);
        self
    }

    pub fn subject<S: Into<String>>(mut self, subject: S) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn text_body<S: Into<String>>(mut self, text: S) -> Self {
        self.text = text.into();
        self
    }

    pub fn html_body<S: Into<String>>(mut self, html: S) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Builds the envelope, which fails without a sender or without at
    /// least one primary recipient.
    pub fn build(self) -> Result<Envelope, Error> {
        let from = self
            .from
            .ok_or_else(|| error::client("an envelope needs a sender"))?;
        if self.to.is_empty() {
            return Err(error::client("an envelope needs at least one recipient"));
        }
        Ok(Envelope {
            from,
            to: self.to,
            cc: self.cc,
            bcc: self.bcc,
            subject: self.subject,
            text: self.text,
            html: self.html,
            attachments: self.attachments,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn build_minimal() {
        let envelope = Envelope::builder()
            .from("a@x.example".parse().unwrap())
            .to("b@y.example".parse().unwrap())
            .subject("hi")
            .text_body("hello")
            .build()
            .unwrap();
        assert_eq!(envelope.from().email.to_string(), "a@x.example");
        assert_eq!(envelope.to().len(), 1);
        assert!(envelope.html().is_none());
    }

    #[test]
    fn build_requires_sender_and_recipient() {
        assert!(Envelope::builder()
            .to("b@y.example".parse().unwrap())
            .build()
            .is_err());
        assert!(Envelope::builder()
            .from("a@x.example".parse().unwrap())
            .build()
            .is_err());
    }

    #[test]
    fn recipient_addresses_in_order() {
        let envelope = Envelope::builder()
            .from("a@x.example".parse().unwrap())
            .to("to@x.example".parse().unwrap())
            .cc("cc@x.example".parse().unwrap())
            .bcc("bcc@x.example".parse().unwrap())
            .build()
            .unwrap();
        let order: Vec<String> = envelope
            .recipient_addresses()
            .map(ToString::to_string)
            .collect();
        assert_eq!(order, ["to@x.example", "cc@x.example", "bcc@x.example"]);
    }

    #[test]
    fn attachment_source_failure_surfaces() {
        let attachment = Attachment::new(
            "gone.bin",
            "application/octet-stream".parse().unwrap(),
            || -> std::io::Result<Vec<u8>> {
                Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
            },
        );
        assert!(attachment.bytes().is_err());
    }
}
