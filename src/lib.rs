//! # mxpost
//!
//! Delivers outbound email directly to the recipients' mail exchanges,
//! without an intermediate relay. A send resolves the MX records of every
//! recipient domain, groups recipients by exchange, renders one RFC 5322 /
//! MIME document per group, optionally signs it with DKIM
//! ([RFC 6376](https://datatracker.ietf.org/doc/html/rfc6376)) and runs one
//! SMTP session per exchange with a mandatory STARTTLS upgrade.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mxpost::{Attachment, DkimConfig, Envelope, Mailer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pem = std::fs::read_to_string("dkim.pem")?;
//!
//! let mailer = Mailer::builder()
//!     .dkim(DkimConfig::new("shop.example", "mail2024", &pem)?)
//!     .build()?;
//!
//! let envelope = Envelope::builder()
//!     .from("Orders <orders@shop.example>".parse()?)
//!     .to("customer@example.com".parse()?)
//!     .bcc("archive@shop.example".parse()?)
//!     .subject("Your order shipped")
//!     .text_body("It is on its way.")
//!     .html_body("<p>It is on its way.</p>")
//!     .attachment(Attachment::new(
//!         "invoice.pdf",
//!         "application/pdf".parse()?,
//!         std::fs::read("invoice.pdf")?,
//!     ))
//!     .build()?;
//!
//! mailer.send(&envelope)?;
//! # Ok(())
//! # }
//! ```
//!
//! There is no queueing and no retry: a failure of any session fails the
//! send, and the caller decides what to do next.

#![forbid(unsafe_code)]

pub mod address;
mod base64;
pub mod dkim;
mod envelope;
mod error;
pub mod mailer;
pub mod message;
pub mod mx;
pub mod smtp;

pub use crate::{
    address::Address,
    dkim::{DkimConfig, DEFAULT_SIGNED_HEADERS},
    envelope::{Attachment, ContentSource, Envelope, EnvelopeBuilder},
    error::Error,
    mailer::{Mailer, MailerBuilder},
    message::{Mailbox, MessageBuilder},
};
