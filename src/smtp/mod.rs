//! The SMTP delivery engine
//!
//! One [`client::SmtpConnection`] serves one recipient group: it drives
//! the greeting, `EHLO`, the mandatory STARTTLS upgrade, the envelope and
//! the `DATA` payload, then quits. Sessions are never pooled or reused.

use std::time::Duration;

pub mod client;
pub mod commands;
pub mod extension;
pub mod response;

/// Default smtp port
pub const SMTP_PORT: u16 = 25;

/// Default deadline for the TCP connect
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default deadline for each server response
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);
