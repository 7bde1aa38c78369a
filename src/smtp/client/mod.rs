//! SMTP client

pub use self::{
    connection::SmtpConnection, mock::MockStream, net::NetworkStream, tls::TlsParameters,
};

mod connection;
mod mock;
mod net;
mod tls;

/// Where a delivery session stands in the SMTP conversation.
///
/// One session serves exactly one exchange and is never reused; commands
/// are only valid from the state that precedes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// TCP established, greeting not yet read
    Connected,
    /// EHLO acknowledged on the plaintext connection
    GreetedPlain,
    /// STARTTLS accepted, handshake pending
    AwaitingTls,
    /// TLS handshake done, EHLO pending
    TlsConnected,
    /// EHLO acknowledged over TLS
    GreetedTls,
    /// MAIL FROM / RCPT TO / DATA in flight
    SendingEnvelope,
    /// 354 received, payload going out
    SendingData,
    /// Conversation over, QUIT due
    Closing,
    /// Socket gone
    Closed,
}

/// The codec used for transparency
///
/// Doubles any `.` that starts a line of the payload so the terminating
/// `CRLF.CRLF` stays unambiguous (RFC 5321 section 4.5.2). The codec
/// starts in line-start state: a leading `.` on the very first line is
/// stuffed too.
#[derive(Clone, Copy, Debug)]
pub struct ClientCodec {
    escape_count: u8,
}

impl Default for ClientCodec {
    fn default() -> Self {
        ClientCodec::new()
    }
}

impl ClientCodec {
    /// Creates a new client codec
    pub fn new() -> Self {
        // the start of the payload counts as a line start
        ClientCodec { escape_count: 2 }
    }

    /// Adds transparency; an empty frame emits the end-of-message
    /// terminator matching the bytes already encoded.
    pub(crate) fn encode(&mut self, frame: &[u8], buf: &mut Vec<u8>) {
        match frame.len() {
            0 => {
                match self.escape_count {
                    0 => buf.extend_from_slice(b"\r\n.\r\n"),
                    1 => buf.extend_from_slice(b"\n.\r\n"),
                    2 => buf.extend_from_slice(b".\r\n"),
                    _ => unreachable!(),
                }
                self.escape_count = 0;
            }
            _ => {
                let mut start = 0;
                for (idx, byte) in frame.iter().enumerate() {
                    match self.escape_count {
                        0 => self.escape_count = u8::from(*byte == b'\r'),
                        1 => self.escape_count = if *byte == b'\n' { 2 } else { 0 },
                        2 => self.escape_count = if *byte == b'.' { 3 } else { 0 },
                        _ => unreachable!(),
                    }
                    if self.escape_count == 3 {
                        self.escape_count = 0;
                        buf.extend_from_slice(&frame[start..idx]);
                        buf.extend_from_slice(b".");
                        start = idx;
                    }
                }
                buf.extend_from_slice(&frame[start..]);
            }
        }
    }
}

/// Returns the string replacing all the CRLF with "\<CRLF\>"
///
/// Used for debug displays
pub(crate) fn escape_crlf(string: &str) -> String {
    string.replace("\r\n", "<CRLF>")
}
