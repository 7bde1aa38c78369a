use std::{
    fmt::Display,
    io::{self, BufRead, BufReader, Write},
    net::{Shutdown, ToSocketAddrs},
    time::Duration,
};

use super::{escape_crlf, ClientCodec, NetworkStream, SessionState, TlsParameters};
use crate::{
    address::Address,
    error::{self, Error},
    smtp::{
        commands::{Data, Ehlo, Mail, Quit, Rcpt, Starttls},
        extension::{Extension, MailBodyParameter, MailParameter, ServerInfo},
        response::{parse_response, Response},
    },
};

/// One SMTP delivery session to one exchange
///
/// The connection tracks its [`SessionState`] and refuses commands issued
/// out of sequence; it is consumed by the STARTTLS upgrade and never
/// reused across messages.
#[derive(Debug)]
pub struct SmtpConnection {
    /// TCP stream between client and server
    stream: BufReader<NetworkStream>,
    /// Information about the server
    server_info: ServerInfo,
    state: SessionState,
}

impl SmtpConnection {
    /// Get information about the server
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Connects to the server, reads the greeting and sends `EHLO`.
    ///
    /// `hello_name` is the exchange hostname, used both as the EHLO
    /// argument and later as the TLS server name.
    pub fn connect<A: ToSocketAddrs>(
        server: A,
        hello_name: &str,
        connect_timeout: Option<Duration>,
        read_timeout: Option<Duration>,
    ) -> Result<SmtpConnection, Error> {
        let stream = NetworkStream::connect(server, connect_timeout)?;
        let stream = BufReader::new(stream);
        let mut conn = SmtpConnection {
            stream,
            server_info: ServerInfo::default(),
            state: SessionState::Connected,
        };
        conn.set_timeout(read_timeout)?;
        conn.handshake(hello_name)?;

        tracing::debug!(server = %conn.server_info, "connected");
        Ok(conn)
    }

    /// Reads the `220` greeting and introduces the client
    fn handshake(&mut self, hello_name: &str) -> Result<(), Error> {
        self.expect_state(SessionState::Connected)?;
        let greeting = self.read_response()?;
        if !greeting.has_code(220) {
            return Err(error::client(format!(
                "unexpected greeting: {} {}",
                greeting.code(),
                greeting.flat_message()
            )));
        }
        self.ehlo(hello_name)
    }

    /// Whether the plaintext connection may be upgraded
    pub fn can_starttls(&self) -> bool {
        self.state == SessionState::GreetedPlain
            && self.server_info.supports_feature(Extension::StartTls)
    }

    /// Upgrades the session to TLS and re-introduces the client.
    ///
    /// A remote that does not advertise STARTTLS fails the session: mail
    /// is never delivered in the clear.
    pub fn starttls(
        mut self,
        tls_parameters: &TlsParameters,
        hello_name: &str,
    ) -> Result<Self, Error> {
        self.expect_state(SessionState::GreetedPlain)?;
        if !self.server_info.supports_feature(Extension::StartTls) {
            self.abort();
            return Err(Error::TlsRequired(hello_name.to_string()));
        }

        let response = self.command(Starttls)?;
        if !response.has_code(220) {
            self.abort();
            return Err(error::client(format!(
                "unexpected STARTTLS response: {}",
                response.code()
            )));
        }
        self.state = SessionState::AwaitingTls;

        let mut stream = self.stream.into_inner();
        if let Err(err) = stream.upgrade_tls(tls_parameters) {
            let _ = stream.shutdown(Shutdown::Both);
            return Err(err);
        }
        self.stream = BufReader::new(stream);
        self.state = SessionState::TlsConnected;
        tracing::debug!("connection encrypted");

        // Send EHLO again: the capability list may differ under TLS
        self.ehlo(hello_name)?;
        Ok(self)
    }

    /// Send EHLO and update server info
    fn ehlo(&mut self, hello_name: &str) -> Result<(), Error> {
        let ehlo_response = self.command(Ehlo::new(hello_name))?;
        self.server_info = ServerInfo::from_response(&ehlo_response)?;
        self.state = match self.state {
            SessionState::Connected => SessionState::GreetedPlain,
            SessionState::TlsConnected => SessionState::GreetedTls,
            other => other,
        };
        Ok(())
    }

    /// Runs the mail transaction: envelope, `DATA`, payload, terminator.
    ///
    /// `recipients` must already carry every destination for this
    /// exchange, blind-carbon recipients included; the payload headers are
    /// none of this function's business.
    pub fn send(
        &mut self,
        from: &Address,
        recipients: &[Address],
        email: &[u8],
    ) -> Result<Response, Error> {
        self.expect_state(SessionState::GreetedTls)?;
        self.state = SessionState::SendingEnvelope;

        // Internationalization handling
        //
        // * 8BITMIME: https://tools.ietf.org/html/rfc6152
        // * SMTPUTF8: https://tools.ietf.org/html/rfc6531
        let mut mail_options = vec![];

        if !from.is_ascii() || recipients.iter().any(|r| !r.is_ascii()) {
            if !self.server_info.supports_feature(Extension::SmtpUtfEight) {
                // don't try to send non-ascii addresses (per RFC)
                return Err(error::client(
                    "envelope contains non-ascii chars but server does not support SMTPUTF8",
                ));
            }
            mail_options.push(MailParameter::SmtpUtfEight);
        }

        if !email.is_ascii() {
            if !self.server_info.supports_feature(Extension::EightBitMime) {
                return Err(error::client(
                    "message contains non-ascii chars but server does not support 8BITMIME",
                ));
            }
            mail_options.push(MailParameter::Body(MailBodyParameter::EightBitMime));
        }

        self.command(Mail::new(Some(from.clone()), mail_options))?;

        for recipient in recipients {
            self.command(Rcpt::new(recipient.clone()))?;
        }

        let response = self.command(Data)?;
        if !response.has_code(354) {
            return Err(error::client(format!(
                "unexpected DATA response: {}",
                response.code()
            )));
        }
        self.state = SessionState::SendingData;

        // Message content
        let response = self.message(email)?;
        self.state = SessionState::Closing;
        tracing::debug!(ack = %response.flat_message(), "message accepted");
        Ok(response)
    }

    /// Sends the message content with dot-stuffing and the terminator
    fn message(&mut self, message: &[u8]) -> Result<Response, Error> {
        let mut codec = ClientCodec::new();
        let mut out_buf = Vec::with_capacity(message.len() + 5);
        codec.encode(message, &mut out_buf);
        codec.encode(&[], &mut out_buf);
        self.write(out_buf.as_slice())?;

        self.read_response()
    }

    /// Says goodbye; the session is unusable afterwards.
    pub fn quit(&mut self) -> Result<Response, Error> {
        let result = self.command(Quit);
        self.state = SessionState::Closed;
        let _ = self.stream.get_ref().shutdown(Shutdown::Both);
        result
    }

    /// Tears the session down without the pleasantries
    pub fn abort(&mut self) {
        if self.state != SessionState::Closed {
            let _ = self.stream.get_ref().shutdown(Shutdown::Both);
            self.state = SessionState::Closed;
        }
    }

    /// Set timeout
    pub fn set_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        self.stream.get_mut().set_read_timeout(duration)?;
        self.stream.get_mut().set_write_timeout(duration)
    }

    /// Sends an SMTP command
    pub fn command<C: Display>(&mut self, command: C) -> Result<Response, Error> {
        self.write(command.to_string().as_bytes())?;
        self.read_response()
    }

    /// Writes a string to the server
    fn write(&mut self, string: &[u8]) -> Result<(), Error> {
        self.stream.get_mut().write_all(string)?;
        self.stream.get_mut().flush()?;

        tracing::trace!(
            ">> {}",
            escape_crlf(&String::from_utf8_lossy(string))
        );
        Ok(())
    }

    /// Gets the SMTP response.
    ///
    /// Reads line by line until the parser sees the final `xxx ` line of a
    /// potentially multi-line reply; a reply that never completes is a
    /// protocol error.
    pub fn read_response(&mut self) -> Result<Response, Error> {
        let mut buffer = String::with_capacity(100);

        while self.stream.read_line(&mut buffer)? > 0 {
            tracing::trace!("<< {}", escape_crlf(&buffer));
            match parse_response(&buffer) {
                Ok((_remaining, response)) => {
                    return if response.is_positive() {
                        Ok(response)
                    } else {
                        Err(response.into_error())
                    };
                }
                Err(nom::Err::Incomplete(_)) => { /* read more */ }
                Err(nom::Err::Failure(e)) => {
                    return Err(error::client(e.to_string()));
                }
                Err(nom::Err::Error(e)) => {
                    return Err(error::client(e.to_string()));
                }
            }
        }

        Err(error::client("incomplete response"))
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), Error> {
        if self.state == expected {
            Ok(())
        } else {
            Err(error::client(format!(
                "command out of sequence: expected {expected:?}, session is {:?}",
                self.state
            )))
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::BufReader;

    use super::*;
    use crate::smtp::client::MockStream;

    fn scripted(responses: &str) -> (SmtpConnection, MockStream) {
        let mock = MockStream::with_vec(responses.as_bytes().to_vec());
        let conn = SmtpConnection {
            stream: BufReader::new(NetworkStream::mock(mock.clone())),
            server_info: ServerInfo::default(),
            state: SessionState::Connected,
        };
        (conn, mock)
    }

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[test]
    fn full_session_transcript() {
        let (mut conn, mut wire) = scripted(concat!(
            "220 mx.ex1.com ESMTP\r\n",
            "250-mx.ex1.com\r\n250-STARTTLS\r\n250 8BITMIME\r\n",
            "220 2.0.0 Ready to start TLS\r\n",
            "250-mx.ex1.com\r\n250 8BITMIME\r\n",
            "250 2.1.0 Ok\r\n",
            "250 2.1.5 Ok\r\n",
            "250 2.1.5 Ok\r\n",
            "250 2.1.5 Ok\r\n",
            "354 End data with <CR><LF>.<CR><LF>\r\n",
            "250 2.0.0 Ok: queued\r\n",
            "221 2.0.0 Bye\r\n",
        ));

        conn.handshake("mx.ex1.com").unwrap();
        assert!(conn.can_starttls());
        let tls = TlsParameters::new("mx.ex1.com").unwrap();
        let mut conn = conn.starttls(&tls, "mx.ex1.com").unwrap();

        let message = b"Subject: hi\r\n\r\nbody\r\n";
        conn.send(
            &addr("joe@origin.example"),
            &[addr("a@ex1.com"), addr("b@ex1.com"), addr("c@ex1.com")],
            message,
        )
        .unwrap();
        conn.quit().unwrap();

        assert_eq!(
            String::from_utf8(wire.take_vec()).unwrap(),
            concat!(
                "EHLO mx.ex1.com\r\n",
                "STARTTLS\r\n",
                "EHLO mx.ex1.com\r\n",
                "MAIL FROM:<joe@origin.example>\r\n",
                "RCPT TO:<a@ex1.com>\r\n",
                "RCPT TO:<b@ex1.com>\r\n",
                "RCPT TO:<c@ex1.com>\r\n",
                "DATA\r\n",
                "Subject: hi\r\n\r\nbody\r\n.\r\n",
                "QUIT\r\n",
            )
        );
    }

    #[test]
    fn missing_starttls_aborts_before_data() {
        let (mut conn, mut wire) = scripted(concat!(
            "220 mx.ex1.com ESMTP\r\n",
            "250-mx.ex1.com\r\n250 8BITMIME\r\n",
        ));

        conn.handshake("mx.ex1.com").unwrap();
        assert!(!conn.can_starttls());
        let tls = TlsParameters::new("mx.ex1.com").unwrap();
        let err = conn.starttls(&tls, "mx.ex1.com").unwrap_err();
        assert!(matches!(err, Error::TlsRequired(host) if host == "mx.ex1.com"));

        let written = String::from_utf8(wire.take_vec()).unwrap();
        assert!(!written.contains("DATA"));
        assert!(!written.contains("STARTTLS"));
    }

    #[test]
    fn dot_stuffing_on_the_wire() {
        let (mut conn, mut wire) = scripted(concat!(
            "220 mx.ex1.com ESMTP\r\n",
            "250-mx.ex1.com\r\n250-STARTTLS\r\n250 8BITMIME\r\n",
            "220 go ahead\r\n",
            "250 mx.ex1.com\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 go\r\n",
            "250 2.0.0 Ok\r\n",
        ));

        conn.handshake("mx.ex1.com").unwrap();
        let tls = TlsParameters::new("mx.ex1.com").unwrap();
        let mut conn = conn.starttls(&tls, "mx.ex1.com").unwrap();

        let message = b"Subject: dots\r\n\r\n.\r\n..x\r\nsafe\r\n";
        conn.send(&addr("a@x.example"), &[addr("b@y.example")], message)
            .unwrap();

        let written = String::from_utf8(wire.take_vec()).unwrap();
        let payload = written.split("DATA\r\n").nth(1).unwrap();
        assert_eq!(payload, "Subject: dots\r\n\r\n..\r\n...x\r\nsafe\r\n.\r\n");
    }

    #[test]
    fn transient_and_permanent_errors_are_classified() {
        let (mut conn, _) = scripted("421 4.3.2 busy, go away\r\n");
        assert!(matches!(
            conn.read_response(),
            Err(Error::SmtpTransient(_, _))
        ));

        let (mut conn, _) = scripted("554 5.7.1 rejected\r\n");
        assert!(matches!(
            conn.read_response(),
            Err(Error::SmtpPermanent(_, _))
        ));
    }

    #[test]
    fn multi_line_response_is_buffered() {
        let (mut conn, _) = scripted("250-first\r\n250-second\r\n250 last\r\n");
        let response = conn.read_response().unwrap();
        assert_eq!(
            response.message().collect::<Vec<_>>(),
            ["first", "second", "last"]
        );
    }

    #[test]
    fn send_refuses_out_of_sequence() {
        let (mut conn, _) = scripted("220 mx greeting\r\n");
        // still CONNECTED, EHLO never happened
        let err = conn
            .send(&addr("a@x.example"), &[addr("b@y.example")], b"x")
            .unwrap_err();
        assert!(matches!(err, Error::Client(_)));
    }

    #[test]
    fn truncated_response_is_a_client_error() {
        let (mut conn, _) = scripted("250-never finished\r\n");
        assert!(matches!(conn.read_response(), Err(Error::Client(_))));
    }
}
