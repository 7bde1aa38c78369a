//! DKIM signing of outgoing messages
//!
//! Implements relaxed/relaxed canonicalization and RSA-SHA256 signatures
//! per [RFC 6376](https://datatracker.ietf.org/doc/html/rfc6376). The
//! produced `DKIM-Signature` header verifies against the public key
//! published in the `<selector>._domainkey.<domain>` TXT record.

use rsa::{pkcs1::DecodeRsaPrivateKey, pkcs8::DecodePrivateKey, Pkcs1v15Sign, RsaPrivateKey};
use sha2::{Digest, Sha256};

use crate::{
    base64,
    error::{self, Error},
};

pub(crate) mod canonicalization;
mod fold;

use self::canonicalization::{relaxed_body, relaxed_header_line, relaxed_headers};

/// Header fields signed when no explicit list is configured.
///
/// Message-ID, Date, Return-Path and Bounces-To are deliberately absent:
/// they are routinely rewritten in transit and would invalidate the
/// signature.
pub const DEFAULT_SIGNED_HEADERS: &str = "From:Sender:Reply-To:Subject:To:Cc:\
MIME-Version:Content-Type:Content-Transfer-Encoding:Content-ID:\
Content-Description:Resent-Date:Resent-From:Resent-Sender:Resent-To:\
Resent-Cc:Resent-Message-ID:In-Reply-To:References:List-Id:List-Help:\
List-Unsubscribe:List-Subscribe:List-Post:List-Owner:List-Archive";

/// Visible octets on the `b=` line before the first continuation
const SIGNATURE_FIRST_LINE: usize = 73;
/// Maximum visible octets per signature continuation segment
const SIGNATURE_SEGMENT: usize = 75;

/// Configuration applied when signing a message
///
/// ```no_run
/// # use mxpost::DkimConfig;
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let pem = std::fs::read_to_string("dkim.pem")?;
/// let dkim = DkimConfig::new("shop.example", "mail2024", &pem)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DkimConfig {
    domain: String,
    selector: String,
    private_key: RsaPrivateKey,
    headers: String,
}

impl DkimConfig {
    /// Creates a signing configuration from a PEM encoded RSA private key
    /// (PKCS#1 or PKCS#8), signing the [`DEFAULT_SIGNED_HEADERS`].
    pub fn new<D, S>(domain: D, selector: S, private_key_pem: &str) -> Result<Self, Error>
    where
        D: Into<String>,
        S: Into<String>,
    {
        let private_key = RsaPrivateKey::from_pkcs1_pem(private_key_pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(private_key_pem))
            .map_err(|e| error::dkim(format!("cannot parse private key: {e}")))?;
        Ok(DkimConfig {
            domain: domain.into(),
            selector: selector.into(),
            private_key,
            headers: DEFAULT_SIGNED_HEADERS.into(),
        })
    }

    /// Replaces the colon-separated list of header names to sign
    pub fn signed_headers<H: Into<String>>(mut self, headers: H) -> Self {
        self.headers = headers.into();
        self
    }
}

impl std::fmt::Debug for DkimConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DkimConfig")
            .field("domain", &self.domain)
            .field("selector", &self.selector)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Signs `message` and returns it with the `DKIM-Signature` header
/// prepended.
pub fn sign_message(message: &[u8], config: &DkimConfig) -> Result<Vec<u8>, Error> {
    let header = sign(message, config)?;
    let mut out = Vec::with_capacity(header.len() + 2 + message.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(message);
    Ok(out)
}

/// Computes the `DKIM-Signature` header for a complete RFC 822 message
/// (headers, blank line, body). The returned string carries no trailing
/// CRLF.
pub fn sign(message: &[u8], config: &DkimConfig) -> Result<String, Error> {
    let (unsigned_header, to_be_signed) = signature_base(message, config)?;

    let digest = Sha256::digest(to_be_signed.as_bytes());
    let signature = config
        .private_key
        .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|e| error::dkim(format!("signing failed: {e}")))?;

    tracing::debug!(
        domain = %config.domain,
        selector = %config.selector,
        "message signed"
    );

    Ok(append_signature(
        unsigned_header,
        &base64::encode(signature),
    ))
}

/// Builds the header with an empty `b=` tag and the exact byte string to
/// be signed.
fn signature_base(message: &[u8], config: &DkimConfig) -> Result<(String, String), Error> {
    let (headers, body) = split_message(message);
    let headers = std::str::from_utf8(headers)
        .map_err(|_| error::dkim("message headers are not valid UTF-8"))?;

    let body_hash = base64::encode(Sha256::digest(relaxed_body(body)));
    let (canonical_headers, kept_names) = relaxed_headers(headers, &config.headers);

    let domain = if config.domain.is_ascii() {
        config.domain.clone()
    } else {
        idna::domain_to_ascii(&config.domain)
            .map_err(|e| error::dkim(format!("signing domain is not IDNA-encodable: {e}")))?
    };

    let tags = format!(
        "v=1; a=rsa-sha256; c=relaxed/relaxed; d={domain}; q=dns/txt; s={selector}; \
bh={body_hash}; h={kept_names}",
        selector = config.selector,
    );
    // The terminating semicolon takes part in the fold so the last tag
    // line cannot overflow the width by one octet.
    let mut unsigned_header = fold::fold(&format!("DKIM-Signature: {tags};"), fold::LINE_WIDTH);
    unsigned_header.push_str("\r\n b=");

    // The header being built participates in its own signature, with the
    // b= value still empty and no trailing CRLF.
    let (name, value) = relaxed_header_line(&unsigned_header);
    let to_be_signed = format!("{canonical_headers}{name}:{value}");

    Ok((unsigned_header, to_be_signed))
}

/// Splits a message at the first blank line into (headers, body).
fn split_message(message: &[u8]) -> (&[u8], &[u8]) {
    let mut i = 0;
    while i + 3 < message.len() {
        if &message[i..i + 4] == b"\r\n\r\n" {
            return (&message[..i + 2], &message[i + 4..]);
        }
        i += 1;
    }
    (message, b"")
}

/// Folds the base64 signature onto the `b=` line: the first line is filled
/// to [`SIGNATURE_FIRST_LINE`] visible octets, continuations take at most
/// [`SIGNATURE_SEGMENT`] octets after the leading space.
fn append_signature(mut header: String, signature: &str) -> String {
    let last_line_len = header
        .rfind("\r\n")
        .map(|i| header.len() - i - 2)
        .unwrap_or(header.len());

    let mut rest = signature;
    let first = SIGNATURE_FIRST_LINE
        .saturating_sub(last_line_len)
        .min(rest.len());
    header.push_str(&rest[..first]);
    rest = &rest[first..];

    while !rest.is_empty() {
        let take = SIGNATURE_SEGMENT.min(rest.len());
        header.push_str("\r\n ");
        header.push_str(&rest[..take]);
        rest = &rest[take..];
    }

    header.trim_end().to_string()
}
