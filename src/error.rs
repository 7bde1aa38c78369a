//! Error type for message building, signing and delivery

use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    io,
};

use crate::{address::AddressError, smtp::response::Code};

/// All the ways a send can fail.
///
/// Every variant carries enough context to produce a useful diagnostic;
/// none of them is retried automatically.
#[derive(Debug)]
pub enum Error {
    /// DNS error, empty MX set or lookup timeout
    MxResolution(String),
    /// TCP connect failure or connect timeout
    Connect(String),
    /// The remote did not advertise STARTTLS
    TlsRequired(String),
    /// TLS negotiation failed
    TlsHandshake(String),
    /// Read timeout during an active session
    Timeout(String),
    /// Permanent SMTP error, 5xx reply code
    ///
    /// [RFC 5321, section 4.2.1](https://tools.ietf.org/html/rfc5321#section-4.2.1)
    SmtpPermanent(Code, String),
    /// Transient SMTP error, 4xx reply code
    ///
    /// [RFC 5321, section 4.2.1](https://tools.ietf.org/html/rfc5321#section-4.2.1)
    SmtpTransient(Code, String),
    /// Private key parse failure or signing failure
    DkimSign(String),
    /// Attachment bytes could not be produced
    Attachment(String),
    /// Invalid mailbox
    Address(AddressError),
    /// Protocol violation or unparseable response
    Client(String),
    /// I/O error on the session socket
    Io(io::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::MxResolution(msg) => write!(f, "MX resolution failed: {msg}"),
            Error::Connect(msg) => write!(f, "connection failed: {msg}"),
            Error::TlsRequired(host) => {
                write!(f, "{host} does not advertise STARTTLS")
            }
            Error::TlsHandshake(msg) => write!(f, "TLS handshake failed: {msg}"),
            Error::Timeout(msg) => write!(f, "timed out: {msg}"),
            Error::SmtpPermanent(code, msg) => {
                write!(f, "permanent SMTP error: {code} {msg}")
            }
            Error::SmtpTransient(code, msg) => {
                write!(f, "transient SMTP error: {code} {msg}")
            }
            Error::DkimSign(msg) => write!(f, "DKIM signing failed: {msg}"),
            Error::Attachment(msg) => write!(f, "attachment unavailable: {msg}"),
            Error::Address(e) => write!(f, "invalid address: {e}"),
            Error::Client(msg) => write!(f, "client error: {msg}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Address(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AddressError> for Error {
    fn from(err: AddressError) -> Self {
        Error::Address(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                Error::Timeout(err.to_string())
            }
            _ => Error::Io(err),
        }
    }
}

pub(crate) fn connect<E: Display>(err: E) -> Error {
    Error::Connect(err.to_string())
}

pub(crate) fn tls<E: Display>(err: E) -> Error {
    Error::TlsHandshake(err.to_string())
}

pub(crate) fn client<E: Display>(err: E) -> Error {
    Error::Client(err.to_string())
}

pub(crate) fn dkim<E: Display>(err: E) -> Error {
    Error::DkimSign(err.to_string())
}

pub(crate) fn attachment<E: Display>(err: E) -> Error {
    Error::Attachment(err.to_string())
}

pub(crate) fn mx<E: Display>(err: E) -> Error {
    Error::MxResolution(err.to_string())
}
