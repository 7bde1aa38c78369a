//! TLS parameters for the STARTTLS upgrade

use native_tls::TlsConnector;

use crate::error::{self, Error};

/// How to negotiate TLS once the remote has accepted `STARTTLS`.
///
/// Certificate validation uses the platform defaults; the domain doubles
/// as the SNI name and the name the certificate is checked against.
#[derive(Debug)]
pub struct TlsParameters {
    pub(crate) connector: TlsConnector,
    domain: String,
}

impl TlsParameters {
    /// Creates parameters verifying against `domain`, normally the MX
    /// hostname the connection was opened to.
    pub fn new<S: Into<String>>(domain: S) -> Result<Self, Error> {
        let connector = TlsConnector::new().map_err(error::tls)?;
        Ok(TlsParameters {
            connector,
            domain: domain.into(),
        })
    }

    /// The name sent as SNI and verified against the certificate
    pub fn domain(&self) -> &str {
        &self.domain
    }
}
