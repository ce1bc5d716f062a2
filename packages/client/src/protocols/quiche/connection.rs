//! `QuicConnection` backed by quiche

use std::collections::VecDeque;
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;
use ring::rand::{SecureRandom, SystemRandom};

use crate::config::{CongestionControl, QuicConfiguration};
use crate::error::{self, ConnectionClosed, Result};
use crate::protocols::connection::{QuicConnection, QuicEvent};
use crate::tls::{SessionTicket, SessionTicketHandler};

/// Length of the locally chosen source connection ID
const SCID_LEN: usize = 16;

/// Read buffer for a single stream_recv call
const STREAM_READ_CHUNK: usize = 16 * 1024;

/// quiche connection state machine.
///
/// The underlying `quiche::Connection` needs both endpoint addresses, so it
/// is created lazily when the adapter calls `connect`.
pub struct QuicheConnection {
    configuration: QuicConfiguration,
    config: quiche::Config,
    session_ticket_handler: Option<SessionTicketHandler>,
    inner: Option<quiche::Connection>,
    events: VecDeque<QuicEvent>,
    send_buffer: Vec<u8>,
    handshake_reported: bool,
    terminated: bool,
    last_session: Option<Vec<u8>>,
}

impl fmt::Debug for QuicheConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuicheConnection")
            .field("server_name", &self.configuration.server_name)
            .field("started", &self.inner.is_some())
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

/// Translate the connection configuration into quiche's.
fn build_quiche_config(configuration: &QuicConfiguration) -> Result<quiche::Config> {
    let mut config = quiche::Config::new(quiche::PROTOCOL_VERSION).map_err(error::configuration)?;

    let alpn: Vec<&[u8]> = configuration
        .alpn_protocols
        .iter()
        .map(String::as_bytes)
        .collect();
    config
        .set_application_protos(&alpn)
        .map_err(error::configuration)?;

    config.set_max_idle_timeout(
        u64::try_from(configuration.max_idle_timeout.as_millis()).unwrap_or(u64::MAX),
    );
    config.set_max_recv_udp_payload_size(usize::from(configuration.max_udp_payload_size));
    config.set_max_send_udp_payload_size(usize::from(configuration.max_udp_payload_size));
    config.set_initial_max_data(configuration.initial_max_data);
    config.set_initial_max_stream_data_bidi_local(configuration.initial_max_stream_data_bidi_local);
    config.set_initial_max_stream_data_bidi_remote(configuration.initial_max_stream_data_bidi_remote);
    config.set_initial_max_stream_data_uni(configuration.initial_max_stream_data_uni);
    config.set_initial_max_streams_bidi(configuration.initial_max_streams_bidi);
    config.set_initial_max_streams_uni(configuration.initial_max_streams_uni);
    config.set_disable_active_migration(true);

    match configuration.congestion_control {
        CongestionControl::Cubic => config.set_cc_algorithm(quiche::CongestionControlAlgorithm::CUBIC),
        CongestionControl::Reno => config.set_cc_algorithm(quiche::CongestionControlAlgorithm::Reno),
    }

    config.verify_peer(configuration.verify_peer);
    if let Some(ca_file) = &configuration.ca_file {
        let path = ca_file.to_str().ok_or_else(|| {
            error::configuration(format!("CA file path is not valid UTF-8: {}", ca_file.display()))
        })?;
        config
            .load_verify_locations_from_file(path)
            .map_err(error::configuration)?;
    }

    if configuration.enable_early_data {
        config.enable_early_data();
    }

    Ok(config)
}

fn generate_scid() -> Result<quiche::ConnectionId<'static>> {
    let mut scid = [0u8; SCID_LEN];
    SystemRandom::new()
        .fill(&mut scid)
        .map_err(|_| error::connection("failed to generate connection ID"))?;
    Ok(quiche::ConnectionId::from_vec(scid.to_vec()))
}

impl QuicheConnection {
    fn push_terminated(&mut self, error_code: u64, reason: String) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.events
            .push_back(QuicEvent::ConnectionTerminated { error_code, reason });
    }

    /// Collect handshake progress, stream data and close state.
    fn poll_state(&mut self) {
        let Some(conn) = self.inner.as_mut() else {
            return;
        };

        if !self.handshake_reported && conn.is_established() {
            self.handshake_reported = true;
            let alpn = conn.application_proto();
            let alpn_protocol = (!alpn.is_empty()).then(|| String::from_utf8_lossy(alpn).into_owned());
            self.events.push_back(QuicEvent::HandshakeCompleted {
                alpn_protocol,
                session_resumed: conn.is_resumed(),
            });
        }

        if let Some(session) = conn.session() {
            if self.last_session.as_deref() != Some(session) {
                let session = session.to_vec();
                self.last_session = Some(session.clone());
                if let Some(handler) = &self.session_ticket_handler {
                    handler(SessionTicket::from(session));
                }
            }
        }

        let readable: Vec<u64> = conn.readable().collect();
        for stream_id in readable {
            let mut buffer = vec![0; STREAM_READ_CHUNK];
            loop {
                match conn.stream_recv(stream_id, &mut buffer) {
                    Ok((read, fin)) => {
                        self.events.push_back(QuicEvent::StreamDataReceived {
                            stream_id,
                            data: Bytes::copy_from_slice(&buffer[..read]),
                            end_stream: fin,
                        });
                        if fin {
                            break;
                        }
                    }
                    Err(quiche::Error::Done) => break,
                    Err(e) => {
                        tracing::debug!(
                            target: "quic_connect::quiche",
                            stream_id,
                            error = %e,
                            "Stream read failed"
                        );
                        break;
                    }
                }
            }
        }

        if conn.is_closed() {
            let (error_code, reason) = conn
                .peer_error()
                .or_else(|| conn.local_error())
                .map(|e| (e.error_code, String::from_utf8_lossy(&e.reason).into_owned()))
                .unwrap_or_else(|| {
                    if conn.is_timed_out() {
                        (0, "idle timeout".to_string())
                    } else {
                        (0, String::new())
                    }
                });
            self.push_terminated(error_code, reason);
        }
    }
}

impl QuicConnection for QuicheConnection {
    fn new(
        configuration: QuicConfiguration,
        session_ticket_handler: Option<SessionTicketHandler>,
    ) -> Result<Self> {
        let config = build_quiche_config(&configuration)?;
        let send_buffer = vec![0; usize::from(configuration.max_udp_payload_size)];

        Ok(Self {
            configuration,
            config,
            session_ticket_handler,
            inner: None,
            events: VecDeque::new(),
            send_buffer,
            handshake_reported: false,
            terminated: false,
            last_session: None,
        })
    }

    fn configuration(&self) -> &QuicConfiguration {
        &self.configuration
    }

    fn connect(&mut self, peer: SocketAddr, local: SocketAddr, _now: Instant) -> Result<()> {
        if self.inner.is_some() {
            return Err(error::connection("connect called twice").with_address(peer));
        }
        if self.terminated {
            return Err(error::connection(ConnectionClosed).with_address(peer));
        }

        let scid = generate_scid()?;
        let mut conn = quiche::connect(
            self.configuration.server_name.as_deref(),
            &scid,
            local,
            peer,
            &mut self.config,
        )
        .map_err(|e| error::handshake(e).with_address(peer))?;

        if let Some(ticket) = &self.configuration.session_ticket {
            if let Err(e) = conn.set_session(ticket.as_bytes()) {
                tracing::warn!(
                    target: "quic_connect::quiche",
                    error = %e,
                    "Ignoring unusable session ticket"
                );
            }
        }

        tracing::debug!(
            target: "quic_connect::quiche",
            peer = %peer,
            local = %local,
            scid = ?scid,
            "QUIC connection initiated"
        );
        self.inner = Some(conn);
        Ok(())
    }

    fn receive_datagram(&mut self, data: &mut [u8], from: SocketAddr, to: SocketAddr, _now: Instant) {
        let Some(conn) = self.inner.as_mut() else {
            return;
        };

        if let Err(e) = conn.recv(data, quiche::RecvInfo { from, to }) {
            tracing::trace!(
                target: "quic_connect::quiche",
                from = %from,
                error = %e,
                "Dropping undecodable datagram"
            );
        }
        self.poll_state();
    }

    fn datagrams_to_send(&mut self, _now: Instant) -> Vec<(Vec<u8>, SocketAddr)> {
        let mut datagrams = Vec::new();
        let Some(conn) = self.inner.as_mut() else {
            return datagrams;
        };

        loop {
            match conn.send(&mut self.send_buffer) {
                Ok((written, info)) => datagrams.push((self.send_buffer[..written].to_vec(), info.to)),
                Err(quiche::Error::Done) => break,
                Err(e) => {
                    tracing::debug!(
                        target: "quic_connect::quiche",
                        error = %e,
                        "Packet generation failed"
                    );
                    break;
                }
            }
        }

        self.poll_state();
        datagrams
    }

    fn timeout(&self) -> Option<Instant> {
        self.inner.as_ref().and_then(quiche::Connection::timeout_instant)
    }

    fn handle_timer(&mut self, _now: Instant) {
        if let Some(conn) = self.inner.as_mut() {
            conn.on_timeout();
        }
        self.poll_state();
    }

    fn next_event(&mut self) -> Option<QuicEvent> {
        self.events.pop_front()
    }

    fn send_stream_data(&mut self, stream_id: u64, data: &[u8], end_stream: bool) -> Result<()> {
        let conn = self
            .inner
            .as_mut()
            .ok_or_else(|| error::connection("connection not started"))?;

        let written = conn
            .stream_send(stream_id, data, end_stream)
            .map_err(error::connection)?;
        if written < data.len() {
            return Err(error::connection(format!(
                "stream {stream_id} accepted {written} of {} bytes",
                data.len()
            )));
        }
        Ok(())
    }

    fn close(&mut self, error_code: u64, reason: &str) {
        match self.inner.as_mut() {
            Some(conn) => {
                match conn.close(true, error_code, reason.as_bytes()) {
                    Ok(()) | Err(quiche::Error::Done) => {}
                    Err(e) => tracing::debug!(
                        target: "quic_connect::quiche",
                        error = %e,
                        "Close failed"
                    ),
                }
                self.poll_state();
            }
            // never started: nothing to tell the peer
            None => self.push_terminated(error_code, reason.to_string()),
        }
    }

    fn is_closed(&self) -> bool {
        self.terminated
    }
}
