//! Server name indication policy
//!
//! Decides which server identity the handshake announces for a target host.

use std::net::IpAddr;

use crate::config::QuicConfiguration;

/// Server name to announce for `host`.
///
/// Literal IPv4/IPv6 addresses (bracketed or carrying a zone index) yield
/// `None`; anything else is announced as-is.
#[must_use]
pub fn server_name_for_host(host: &str) -> Option<String> {
    if is_ip_literal(host) {
        None
    } else {
        Some(host.to_string())
    }
}

/// Fill in `configuration.server_name` from `host` when the caller left it unset.
///
/// Returns `true` if the configuration was modified.
pub fn apply_server_name(configuration: &mut QuicConfiguration, host: &str) -> bool {
    if configuration.server_name.is_some() {
        return false;
    }

    match server_name_for_host(host) {
        Some(server_name) => {
            tracing::trace!(
                target: "quic_connect::tls",
                server_name = %server_name,
                "Derived server name from host"
            );
            configuration.server_name = Some(server_name);
            true
        }
        None => false,
    }
}

pub(crate) fn is_ip_literal(host: &str) -> bool {
    let literal = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    // fe80::1%eth0
    let literal = literal.split_once('%').map_or(literal, |(addr, _zone)| addr);
    literal.parse::<IpAddr>().is_ok()
}
