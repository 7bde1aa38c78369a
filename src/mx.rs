//! MX resolution and grouping of recipients by destination exchange

use std::time::Duration;

use hickory_resolver::{system_conf, Resolver};

use crate::{
    address::Address,
    envelope::Envelope,
    error::{self, Error},
};

/// Default deadline for one MX lookup
pub const DEFAULT_MX_TIMEOUT: Duration = Duration::from_secs(10);

/// One MX record: a preference and the exchange host.
///
/// Lower preference is higher priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

/// Source of MX answers.
///
/// The production implementation is [`DnsResolver`]; tests substitute a
/// map-backed fake.
pub trait Resolve: Send + Sync {
    fn resolve_mx(&self, domain: &str) -> Result<Vec<MxRecord>, Error>;
}

/// MX resolution through the system DNS configuration
pub struct DnsResolver {
    inner: Resolver,
}

impl DnsResolver {
    /// Reads `/etc/resolv.conf` (or the platform equivalent) and applies
    /// `timeout` to every lookup.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let (config, mut opts) = system_conf::read_system_conf().map_err(error::mx)?;
        opts.timeout = timeout;
        let inner = Resolver::new(config, opts).map_err(error::mx)?;
        Ok(DnsResolver { inner })
    }
}

impl Resolve for DnsResolver {
    fn resolve_mx(&self, domain: &str) -> Result<Vec<MxRecord>, Error> {
        let lookup = self.inner.mx_lookup(domain).map_err(error::mx)?;
        Ok(lookup
            .iter()
            .map(|mx| MxRecord {
                preference: mx.preference(),
                exchange: mx.exchange().to_utf8().trim_end_matches('.').to_string(),
            })
            .collect())
    }
}

/// A destination exchange and the recipients routed to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientGroup {
    pub exchange: String,
    pub recipients: Vec<Address>,
}

/// Groups every recipient of `envelope` (to, cc and bcc alike) by the
/// top-preference exchange of their domain.
///
/// Recipients keep their to, cc, bcc order inside a group; duplicate
/// addresses collapse to one. Group order follows the first appearance of
/// each domain.
pub fn group_by_exchange(
    envelope: &Envelope,
    resolver: &dyn Resolve,
) -> Result<Vec<RecipientGroup>, Error> {
    let mut domains: Vec<(&str, Vec<Address>)> = Vec::new();
    for address in envelope.recipient_addresses() {
        let domain = address.domain();
        let idx = match domains.iter().position(|(d, _)| *d == domain) {
            Some(idx) => idx,
            None => {
                domains.push((domain, Vec::new()));
                domains.len() - 1
            }
        };
        let recipients = &mut domains[idx].1;
        if !recipients.contains(address) {
            recipients.push(address.clone());
        }
    }

    let mut groups = Vec::with_capacity(domains.len());
    for (domain, recipients) in domains {
        let mut records = resolver.resolve_mx(domain)?;
        if records.is_empty() {
            return Err(error::mx(format!("no MX records for {domain}")));
        }
        records.sort_by_key(|record| record.preference);
        let best = records.swap_remove(0);
        tracing::debug!(domain, exchange = %best.exchange, "resolved exchange");
        groups.push(RecipientGroup {
            exchange: best.exchange,
            recipients,
        });
    }
    Ok(groups)
}
