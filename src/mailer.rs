//! Sending a message straight to the exchanges of its recipients

use std::time::Duration;

use crate::{
    dkim::{self, DkimConfig},
    envelope::Envelope,
    error::Error,
    message::MessageBuilder,
    mx::{self, DnsResolver, RecipientGroup, Resolve, DEFAULT_MX_TIMEOUT},
    smtp::{
        client::{SmtpConnection, TlsParameters},
        DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, SMTP_PORT,
    },
};

/// Delivers envelopes without a relay: resolve, connect, upgrade, send.
///
/// ```no_run
/// # use mxpost::{Envelope, Mailer};
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let mailer = Mailer::builder().build()?;
/// let envelope = Envelope::builder()
///     .from("orders@shop.example".parse()?)
///     .to("customer@example.com".parse()?)
///     .subject("Your order")
///     .text_body("It shipped.")
///     .build()?;
/// mailer.send(&envelope)?;
/// # Ok(())
/// # }
/// ```
pub struct Mailer {
    port: u16,
    connect_timeout: Duration,
    read_timeout: Duration,
    dkim: Option<DkimConfig>,
    resolver: Box<dyn Resolve>,
}

impl Mailer {
    /// Creates a builder with the default ports and timeouts
    pub fn builder() -> MailerBuilder {
        MailerBuilder::new()
    }

    /// Sends one envelope to every recipient group, sequentially.
    ///
    /// The first failing group fails the whole send; remaining groups are
    /// not attempted. There is no retry here: queueing policy belongs to
    /// the caller.
    pub fn send(&self, envelope: &Envelope) -> Result<(), Error> {
        let groups = mx::group_by_exchange(envelope, self.resolver.as_ref())?;
        for group in &groups {
            self.deliver(envelope, group)?;
        }
        Ok(())
    }

    /// One session: build, sign, deliver to a single exchange.
    fn deliver(&self, envelope: &Envelope, group: &RecipientGroup) -> Result<(), Error> {
        let message = MessageBuilder::new().render(envelope)?;
        let message = match &self.dkim {
            Some(config) => dkim::sign_message(&message, config)?,
            None => message,
        };

        tracing::debug!(
            exchange = %group.exchange,
            recipients = group.recipients.len(),
            bytes = message.len(),
            "delivering"
        );

        let conn = SmtpConnection::connect(
            (group.exchange.as_str(), self.port),
            &group.exchange,
            Some(self.connect_timeout),
            Some(self.read_timeout),
        )?;
        let tls_parameters = TlsParameters::new(group.exchange.clone())?;
        let mut conn = conn.starttls(&tls_parameters, &group.exchange)?;

        match conn.send(&envelope.from().email, &group.recipients, &message) {
            Ok(_) => {
                // the message is accepted at this point; a grumpy QUIT
                // exchange must not fail the send
                if let Err(err) = conn.quit() {
                    tracing::debug!(%err, "quit failed after acceptance");
                }
                Ok(())
            }
            Err(err) => {
                conn.abort();
                Err(err)
            }
        }
    }
}

/// Builder for [`Mailer`]
pub struct MailerBuilder {
    port: u16,
    connect_timeout: Duration,
    read_timeout: Duration,
    mx_timeout: Duration,
    dkim: Option<DkimConfig>,
    resolver: Option<Box<dyn Resolve>>,
}

impl Default for MailerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MailerBuilder {
    pub fn new() -> Self {
        MailerBuilder {
            port: SMTP_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            mx_timeout: DEFAULT_MX_TIMEOUT,
            dkim: None,
            resolver: None,
        }
    }

    /// SMTP port on the exchanges, 25 unless testing
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Deadline for each TCP connect
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Deadline for each server response
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Deadline for each MX lookup
    pub fn mx_timeout(mut self, timeout: Duration) -> Self {
        self.mx_timeout = timeout;
        self
    }

    /// Sign outgoing messages with this DKIM configuration
    pub fn dkim(mut self, config: DkimConfig) -> Self {
        self.dkim = Some(config);
        self
    }

    /// Replace the system DNS resolver, mostly for tests
    pub fn resolver(mut self, resolver: impl Resolve + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Builds the mailer; fails if the system resolver configuration
    /// cannot be read.
    pub fn build(self) -> Result<Mailer, Error> {
        let resolver = match self.resolver {
            Some(resolver) => resolver,
            None => Box::new(DnsResolver::new(self.mx_timeout)?),
        };
        Ok(Mailer {
            port: self.port,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            dkim: self.dkim,
            resolver,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mx::MxRecord;

    struct StaticResolver {
        exchange: &'static str,
    }

    impl Resolve for StaticResolver {
        fn resolve_mx(&self, _domain: &str) -> Result<Vec<MxRecord>, Error> {
            Ok(vec![MxRecord {
                preference: 10,
                exchange: self.exchange.to_string(),
            }])
        }
    }

    struct FailingResolver;

    impl Resolve for FailingResolver {
        fn resolve_mx(&self, domain: &str) -> Result<Vec<MxRecord>, Error> {
            Err(crate::error::mx(format!("no answer for {domain}")))
        }
    }

    fn envelope() -> Envelope {
        Envelope::builder()
            .from("sender@origin.example".parse().unwrap())
            .to("rcpt@dest.example".parse().unwrap())
            .subject("x")
            .text_body("y")
            .build()
            .unwrap()
    }

    #[test]
    fn resolution_failure_fails_the_send() {
        let mailer = Mailer::builder()
            .resolver(FailingResolver)
            .build()
            .unwrap();
        assert!(matches!(
            mailer.send(&envelope()),
            Err(Error::MxResolution(_))
        ));
    }

    #[test]
    fn unreachable_exchange_is_a_connect_error() {
        // nothing listens on the discard port of the loopback
        let mailer = Mailer::builder()
            .resolver(StaticResolver {
                exchange: "127.0.0.1",
            })
            .port(9)
            .connect_timeout(Duration::from_millis(500))
            .build()
            .unwrap();
        assert!(matches!(mailer.send(&envelope()), Err(Error::Connect(_))));
    }
}
