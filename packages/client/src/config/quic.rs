//! QUIC connection configuration
//!
//! Protocol parameters handed to the connection object, plus the client
//! identity fields the connect path fills in.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::validation::{ConfigDefaults, ConfigResult, ConfigValidator, ConfigurationError, Validator};
use crate::tls::SessionTicket;

/// Congestion control algorithm used by the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionControl {
    Reno,
    #[default]
    Cubic,
}

/// Configuration for one QUIC connection.
///
/// `server_name` is left unset by default; the connect path derives it from
/// the target host only when it is still `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuicConfiguration {
    pub is_client: bool,
    pub server_name: Option<String>,
    pub alpn_protocols: Vec<String>,
    pub max_idle_timeout: Duration,
    pub max_udp_payload_size: u16,
    pub initial_max_data: u64,
    pub initial_max_stream_data_bidi_local: u64,
    pub initial_max_stream_data_bidi_remote: u64,
    pub initial_max_stream_data_uni: u64,
    pub initial_max_streams_bidi: u64,
    pub initial_max_streams_uni: u64,
    pub congestion_control: CongestionControl,
    pub verify_peer: bool,
    pub ca_file: Option<PathBuf>,
    /// Resumption ticket from an earlier connection
    #[serde(skip)]
    pub session_ticket: Option<SessionTicket>,
    pub enable_early_data: bool,
}

impl Default for QuicConfiguration {
    fn default() -> Self {
        Self {
            is_client: true,
            server_name: None,
            alpn_protocols: vec![ConfigDefaults::DEFAULT_ALPN.to_string()],
            max_idle_timeout: ConfigDefaults::DEFAULT_IDLE_TIMEOUT,
            max_udp_payload_size: ConfigDefaults::DEFAULT_MAX_UDP_PAYLOAD_SIZE,
            initial_max_data: 10_485_760,                  // 10MB
            initial_max_stream_data_bidi_local: 1_048_576,  // 1MB
            initial_max_stream_data_bidi_remote: 1_048_576, // 1MB
            initial_max_stream_data_uni: 1_048_576,         // 1MB
            initial_max_streams_bidi: 100,
            initial_max_streams_uni: 100,
            congestion_control: CongestionControl::Cubic,
            verify_peer: true,
            ca_file: None,
            session_ticket: None,
            enable_early_data: false,
        }
    }
}

impl QuicConfiguration {
    /// Client-mode configuration with default protocol parameters
    #[must_use]
    pub fn client() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    /// Replace the ALPN protocol list offered during the handshake
    #[must_use]
    pub fn with_alpn_protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alpn_protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Set QUIC connection maximum idle timeout
    ///
    /// # Examples
    /// ```no_run
    /// use std::time::Duration;
    /// use quic_connect_client::config::QuicConfiguration;
    ///
    /// let config = QuicConfiguration::client()
    ///     .with_max_idle_timeout(Duration::from_secs(60));
    /// assert_eq!(config.max_idle_timeout, Duration::from_secs(60));
    /// ```
    #[must_use]
    pub fn with_max_idle_timeout(mut self, timeout: Duration) -> Self {
        self.max_idle_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_udp_payload_size(mut self, size: u16) -> Self {
        self.max_udp_payload_size = size;
        self
    }

    /// Set the connection-wide flow control limit
    #[must_use]
    pub fn with_initial_max_data(mut self, max_data: u64) -> Self {
        self.initial_max_data = max_data;
        self
    }

    #[must_use]
    pub fn with_congestion_control(mut self, algorithm: CongestionControl) -> Self {
        self.congestion_control = algorithm;
        self
    }

    /// Disable to accept any server certificate. Only meant for local testing.
    #[must_use]
    pub fn with_verify_peer(mut self, verify: bool) -> Self {
        self.verify_peer = verify;
        self
    }

    #[must_use]
    pub fn with_ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(path.into());
        self
    }

    /// Attempt session resumption with a ticket captured from an earlier connection
    #[must_use]
    pub fn with_session_ticket(mut self, ticket: SessionTicket) -> Self {
        self.session_ticket = Some(ticket);
        self
    }

    #[must_use]
    pub fn with_early_data(mut self, enabled: bool) -> Self {
        self.enable_early_data = enabled;
        self
    }
}

impl Validator for QuicConfiguration {
    fn validate(&self) -> ConfigResult<()> {
        if !self.is_client {
            return Err(ConfigurationError::Conflict(
                "server-mode configuration cannot be used to connect".to_string(),
            ));
        }

        ConfigValidator::validate_timeout(self.max_idle_timeout, "max_idle_timeout")?;
        ConfigValidator::validate_range(
            self.max_udp_payload_size,
            ConfigDefaults::MIN_UDP_PAYLOAD_SIZE,
            ConfigDefaults::MAX_UDP_PAYLOAD_SIZE,
            "max_udp_payload_size",
        )?;

        if self.alpn_protocols.is_empty() {
            return Err(ConfigurationError::InvalidParameter(
                "alpn_protocols cannot be empty".to_string(),
            ));
        }
        for protocol in &self.alpn_protocols {
            ConfigValidator::validate_range(protocol.len(), 1, 255, "ALPN protocol length")?;
        }

        if self.server_name.as_deref() == Some("") {
            return Err(ConfigurationError::InvalidParameter(
                "server_name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_client_without_server_name() {
        let config = QuicConfiguration::default();
        assert!(config.is_client);
        assert!(config.server_name.is_none());
        assert_eq!(config.alpn_protocols, vec!["h3".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn server_mode_rejected() {
        let config = QuicConfiguration {
            is_client: false,
            ..QuicConfiguration::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::Conflict(_))
        ));
    }

    #[test]
    fn payload_size_bounds() {
        let config = QuicConfiguration::client().with_max_udp_payload_size(1000);
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_alpn_rejected() {
        let config = QuicConfiguration::client().with_alpn_protocols(Vec::<String>::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_partial_json_over_defaults() {
        let json = r#"{ "server_name": "example.test", "alpn_protocols": ["hq-interop"], "congestion_control": "reno" }"#;
        let config: QuicConfiguration =
            serde_json::from_str(json).expect("partial configuration should deserialize");

        assert_eq!(config.server_name.as_deref(), Some("example.test"));
        assert_eq!(config.alpn_protocols, vec!["hq-interop".to_string()]);
        assert_eq!(config.congestion_control, CongestionControl::Reno);
        assert!(config.is_client);
        assert_eq!(config.max_idle_timeout, Duration::from_secs(30));
    }
}
