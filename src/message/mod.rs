//! Assembly of RFC 5322 / MIME documents

pub use self::{
    encoder::ContentTransferEncoding,
    mailbox::Mailbox,
    mimebody::{Headers, MultiPart, Part, SinglePart},
};

pub use mime;

mod encoder;
mod mailbox;
mod mimebody;

use std::{
    fmt::Write as _,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{envelope::Envelope, error::Error};

pub trait EmailFormat {
    fn format(&self, out: &mut Vec<u8>);
}

/// Renders an [`Envelope`] into the bytes that go on the wire after `DATA`.
///
/// Every rendering draws fresh random boundaries and a fresh `Message-ID`;
/// the setters exist so tests (and callers that track message ids) can pin
/// them down.
///
/// Blind-carbon recipients deliberately never appear in the rendered
/// headers; they are carried in the SMTP envelope only.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    message_id: Option<String>,
    boundaries: Option<(String, String)>,
    date: Option<SystemTime>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the `Message-ID` instead of generating one
    pub fn message_id<S: Into<String>>(mut self, id: S) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Pin the mixed and alternative multipart boundaries
    pub fn boundaries<S: Into<String>>(mut self, mixed: S, alternative: S) -> Self {
        self.boundaries = Some((mixed.into(), alternative.into()));
        self
    }

    /// Pin the `Date` header
    pub fn date(mut self, date: SystemTime) -> Self {
        self.date = Some(date);
        self
    }

    /// Produces the complete message: headers, blank line, MIME body.
    pub fn render(&self, envelope: &Envelope) -> Result<Vec<u8>, Error> {
        let mut headers = Headers::new();

        headers.add(
            "Date",
            httpdate::fmt_http_date(self.date.unwrap_or_else(SystemTime::now)),
        );
        headers.add("From", encode_mailbox(envelope.from()));
        headers.add("To", encode_mailbox_list(envelope.to()));
        if !envelope.cc().is_empty() {
            headers.add("Cc", encode_mailbox_list(envelope.cc()));
        }
        headers.add("Subject", encoder::encoded_word(envelope.subject()));
        headers.add("MIME-Version", "1.0");
        headers.add(
            "Message-ID",
            self.message_id
                .clone()
                .unwrap_or_else(|| make_message_id(envelope.from().email.domain())),
        );

        let body = self.build_body(envelope)?;

        let mut out = Vec::new();
        out.extend_from_slice(headers.to_string().as_bytes());
        body.format(&mut out);
        Ok(out)
    }

    fn build_body(&self, envelope: &Envelope) -> Result<Part, Error> {
        let (mixed_boundary, alternative_boundary) = match &self.boundaries {
            Some((mixed, alternative)) => (mixed.clone(), alternative.clone()),
            None => {
                let mixed = mimebody::make_boundary();
                let mut alternative = mimebody::make_boundary();
                while alternative == mixed {
                    alternative = mimebody::make_boundary();
                }
                (mixed, alternative)
            }
        };

        let text = SinglePart::builder()
            .content_type(&"text/plain; charset=utf-8".parse().expect("static mime"))
            .body(envelope.text());

        let content = match envelope.html() {
            Some(html) => Part::Multi(
                MultiPart::alternative()
                    .boundary(alternative_boundary)
                    .singlepart(text)
                    .singlepart(
                        SinglePart::builder()
                            .content_type(
                                &"text/html; charset=utf-8".parse().expect("static mime"),
                            )
                            .body(html),
                    ),
            ),
            None => Part::Single(text),
        };

        if envelope.attachments().is_empty() {
            return Ok(content);
        }

        let mut mixed = MultiPart::mixed().boundary(mixed_boundary).build();
        mixed = match content {
            Part::Single(part) => mixed.singlepart(part),
            Part::Multi(part) => mixed.multipart(part),
        };
        for attachment in envelope.attachments() {
            let bytes = attachment.bytes()?;
            mixed = mixed.singlepart(
                SinglePart::builder()
                    .header(
                        "Content-Type",
                        format!(
                            "{}; name=\"{}\"",
                            attachment.content_type(),
                            attachment.filename()
                        ),
                    )
                    .header(
                        "Content-Disposition",
                        format!("attachment; filename=\"{}\"", attachment.filename()),
                    )
                    .encoding(ContentTransferEncoding::Base64)
                    .body(bytes),
            );
        }
        Ok(Part::Multi(mixed))
    }
}

fn encode_mailbox(mbox: &Mailbox) -> String {
    mbox.recode_name(encoder::encoded_word).to_string()
}

fn encode_mailbox_list(mboxes: &[Mailbox]) -> String {
    mboxes
        .iter()
        .map(encode_mailbox)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `<hex(16 random bytes).<millis>@<sender-domain>>`
fn make_message_id(domain: &str) -> String {
    let mut hex = String::with_capacity(32);
    for _ in 0..16 {
        write!(hex, "{:02x}", fastrand::u8(..)).expect("write to string");
    }
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("<{hex}.{millis}@{domain}>")
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::envelope::{Attachment, Envelope, EnvelopeBuilder};

    fn base_envelope() -> EnvelopeBuilder {
        Envelope::builder()
            .from("Кай <kayo@example.com>".parse().unwrap())
            .to("Pony O.P. <pony@domain.tld>".parse().unwrap())
            .subject("Happy?")
            .text_body("Happy new year!")
    }

    fn pinned_builder() -> MessageBuilder {
        MessageBuilder::new()
            .message_id("<feedfacefeedfacefeedfacefeedface.0@example.com>")
            .boundaries(
                "=_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                "=_bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
            )
            .date(SystemTime::UNIX_EPOCH)
    }

    #[test]
    fn plain_text_message() {
        let envelope = base_envelope().build().unwrap();
        let rendered = pinned_builder().render(&envelope).unwrap();

        assert_eq!(
            String::from_utf8(rendered).unwrap(),
            concat!(
                "Date: Thu, 01 Jan 1970 00:00:00 GMT\r\n",
                "From: =?utf-8?b?0JrQsNC5?= <kayo@example.com>\r\n",
                "To: Pony O.P. <pony@domain.tld>\r\n",
                "Subject: Happy?\r\n",
                "MIME-Version: 1.0\r\n",
                "Message-ID: <feedfacefeedfacefeedfacefeedface.0@example.com>\r\n",
                "Content-Type: text/plain; charset=utf-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "Happy new year!\r\n",
            )
        );
    }

    #[test]
    fn html_message_is_alternative() {
        let envelope = base_envelope()
            .html_body("<p>Happy new year!</p>")
            .build()
            .unwrap();
        let rendered = pinned_builder().render(&envelope).unwrap();
        let rendered = String::from_utf8(rendered).unwrap();

        assert!(rendered.contains(
            "Content-Type: multipart/alternative; boundary=\"=_bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb\"\r\n"
        ));
        assert!(!rendered.contains("multipart/mixed"));
        let text_at = rendered.find("text/plain").unwrap();
        let html_at = rendered.find("text/html").unwrap();
        assert!(text_at < html_at);
    }

    #[test]
    fn attachments_nest_under_mixed() {
        let envelope = base_envelope()
            .html_body("<p>Happy new year!</p>")
            .attachment(Attachment::new(
                "fireworks.gif",
                "image/gif".parse().unwrap(),
                b"GIF89a".to_vec(),
            ))
            .build()
            .unwrap();
        let rendered = pinned_builder().render(&envelope).unwrap();
        let rendered = String::from_utf8(rendered).unwrap();

        assert!(rendered.contains(
            "Content-Type: multipart/mixed; boundary=\"=_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\"\r\n"
        ));
        assert!(rendered.contains(
            "Content-Type: multipart/alternative; boundary=\"=_bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb\"\r\n"
        ));
        assert!(rendered.contains("Content-Type: image/gif; name=\"fireworks.gif\"\r\n"));
        assert!(
            rendered.contains("Content-Disposition: attachment; filename=\"fireworks.gif\"\r\n")
        );
        assert!(rendered.contains("Content-Transfer-Encoding: base64\r\n"));
        // base64("GIF89a")
        assert!(rendered.contains("\r\n\r\nR0lGODlh\r\n"));
    }

    #[test]
    fn bcc_never_appears_in_headers() {
        let envelope = base_envelope()
            .cc("cc@domain.tld".parse().unwrap())
            .bcc("secret@hidden.tld".parse().unwrap())
            .build()
            .unwrap();
        let rendered = String::from_utf8(pinned_builder().render(&envelope).unwrap()).unwrap();

        assert!(rendered.contains("Cc: cc@domain.tld\r\n"));
        assert!(!rendered.contains("Bcc"));
        assert!(!rendered.contains("secret@hidden.tld"));
    }

    #[test]
    fn attachment_read_failure_aborts_render() {
        let envelope = base_envelope()
            .attachment(Attachment::new(
                "gone.bin",
                "application/octet-stream".parse().unwrap(),
                || -> std::io::Result<Vec<u8>> {
                    Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
                },
            ))
            .build()
            .unwrap();
        assert!(matches!(
            MessageBuilder::new().render(&envelope),
            Err(Error::Attachment(_))
        ));
    }

    #[test]
    fn generated_message_id_shape() {
        let id = make_message_id("example.com");
        assert!(id.starts_with('<'));
        assert!(id.ends_with("@example.com>"));
        let local = &id[1..id.find('@').unwrap()];
        let (hex, millis) = local.split_once('.').unwrap();
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(millis.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn fresh_boundaries_differ() {
        let envelope = base_envelope()
            .html_body("<p>x</p>")
            .attachment(Attachment::new(
                "a.txt",
                "text/plain".parse().unwrap(),
                b"a".to_vec(),
            ))
            .build()
            .unwrap();
        let rendered =
            String::from_utf8(MessageBuilder::new().render(&envelope).unwrap()).unwrap();

        let mixed = rendered
            .split("multipart/mixed; boundary=\"")
            .nth(1)
            .and_then(|s| s.split('"').next())
            .unwrap();
        let alternative = rendered
            .split("multipart/alternative; boundary=\"")
            .nth(1)
            .and_then(|s| s.split('"').next())
            .unwrap();
        assert_ne!(mixed, alternative);
    }
}
