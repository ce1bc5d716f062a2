//! Default protocol adapter
//!
//! Drives a `QuicConnection` from transport events: inbound datagrams, timer
//! expirations and commands from the session. Outbound datagrams are flushed
//! after every step, events are dispatched outside the connection lock.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::Instant;

use bytes::Bytes;
use futures::future::BoxFuture;
use hashbrown::HashMap;
use tokio::sync::{Notify, mpsc, watch};

use super::adapter::{AdapterFactory, ProtocolAdapter};
use super::connection::{QuicConnection, QuicEvent};
use super::stream::{StreamHandler, StreamReader, StreamSink, StreamWriter};
use crate::connect::TransportHandle;
use crate::error::{self, ConnectionClosed, ConnectionTerminated, Result};

/// Error code sent with a locally initiated close
const NO_ERROR: u64 = 0;

/// Adapter used when the caller does not supply a factory.
pub struct StandardAdapter<C: QuicConnection> {
    shared: Arc<Shared<C>>,
}

struct Shared<C> {
    connection: Mutex<C>,
    transport: OnceLock<TransportHandle>,
    stream_handler: Option<StreamHandler>,
    /// `None` marks a stream whose reader is gone or that the peer finished
    streams: Mutex<HashMap<u64, Option<mpsc::UnboundedSender<Bytes>>>>,
    connected: watch::Sender<Option<Result<()>>>,
    closed: watch::Sender<bool>,
    timer: Notify,
    closing: AtomicBool,
    this: Weak<Shared<C>>,
}

impl<C: QuicConnection> StandardAdapter<C> {
    pub fn new(connection: C, stream_handler: Option<StreamHandler>) -> Self {
        let shared = Arc::new_cyclic(|this| Shared {
            connection: Mutex::new(connection),
            transport: OnceLock::new(),
            stream_handler,
            streams: Mutex::new(HashMap::new()),
            connected: watch::Sender::new(None),
            closed: watch::Sender::new(false),
            timer: Notify::new(),
            closing: AtomicBool::new(false),
            this: this.clone(),
        });

        Self { shared }
    }

    /// Run `f` against the underlying connection object.
    pub fn with_connection<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.shared.connection())
    }

    /// Open a client-initiated stream writer on `stream_id`.
    ///
    /// Data the peer sends back on the stream goes to the stream handler;
    /// use [`StandardAdapter::open_stream`] to read it directly.
    #[must_use]
    pub fn stream_writer(&self, stream_id: u64) -> StreamWriter {
        StreamWriter::new(stream_id, Arc::clone(&self.shared) as Arc<dyn StreamSink>)
    }

    /// Open a client-initiated stream and take both of its ends.
    ///
    /// The reader yields `None` right away if the connection is already closed.
    #[must_use]
    pub fn open_stream(&self, stream_id: u64) -> (StreamReader, StreamWriter) {
        let (sender, receiver) = mpsc::unbounded_channel();
        {
            let mut streams = self.shared.streams();
            if !*self.shared.closed.borrow() {
                streams.insert(stream_id, Some(sender));
            }
        }
        (StreamReader::new(stream_id, receiver), self.stream_writer(stream_id))
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(*self.shared.connected.borrow(), Some(Ok(())))
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.shared.closed.borrow()
    }
}

impl<C: QuicConnection> Shared<C> {
    fn connection(&self) -> MutexGuard<'_, C> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn streams(&self) -> MutexGuard<'_, HashMap<u64, Option<mpsc::UnboundedSender<Bytes>>>> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drain events and outbound datagrams, then dispatch both.
    fn process(&self) {
        let (events, datagrams) = {
            let mut connection = self.connection();
            let mut events = Vec::new();
            while let Some(event) = connection.next_event() {
                events.push(event);
            }
            let datagrams = connection.datagrams_to_send(Instant::now());
            (events, datagrams)
        };

        for event in events {
            self.handle_event(event);
        }

        if let Some(transport) = self.transport.get() {
            for (datagram, addr) in &datagrams {
                transport.send_to(datagram, *addr);
            }
        }

        self.timer.notify_one();
    }

    fn handle_event(&self, event: QuicEvent) {
        match event {
            QuicEvent::HandshakeCompleted {
                alpn_protocol,
                session_resumed,
            } => {
                tracing::debug!(
                    target: "quic_connect::protocols",
                    alpn = ?alpn_protocol,
                    session_resumed,
                    "Handshake completed"
                );
                self.connected.send_if_modified(|state| {
                    if state.is_none() {
                        *state = Some(Ok(()));
                        true
                    } else {
                        false
                    }
                });
            }
            QuicEvent::StreamDataReceived {
                stream_id,
                data,
                end_stream,
            } => self.deliver_stream_data(stream_id, data, end_stream),
            QuicEvent::ConnectionTerminated { error_code, reason } => {
                tracing::debug!(
                    target: "quic_connect::protocols",
                    error_code,
                    reason = %reason,
                    "Connection terminated"
                );
                let terminated = ConnectionTerminated { error_code, reason };
                self.connected.send_if_modified(|state| {
                    if state.is_none() {
                        *state = Some(Err(error::handshake(terminated)));
                        true
                    } else {
                        false
                    }
                });
                self.closed.send_replace(true);
                self.streams().clear();
            }
        }
    }

    fn deliver_stream_data(&self, stream_id: u64, data: Bytes, end_stream: bool) {
        let mut streams = self.streams();

        if !streams.contains_key(&stream_id) {
            let (Some(handler), Some(this)) = (&self.stream_handler, self.this.upgrade()) else {
                tracing::trace!(
                    target: "quic_connect::protocols",
                    stream_id,
                    "Dropping data for stream without handler"
                );
                streams.insert(stream_id, None);
                return;
            };
            let (sender, receiver) = mpsc::unbounded_channel();
            streams.insert(stream_id, Some(sender));
            let reader = StreamReader::new(stream_id, receiver);
            let writer = StreamWriter::new(stream_id, this as Arc<dyn StreamSink>);
            let handler = Arc::clone(handler);
            drop(streams);
            handler(reader, writer);
            streams = self.streams();
        }

        let Some(entry) = streams.get_mut(&stream_id) else {
            return;
        };
        let Some(sender) = entry.as_ref() else {
            tracing::trace!(
                target: "quic_connect::protocols",
                stream_id,
                "Dropping data for finished stream"
            );
            return;
        };

        if (!data.is_empty() && sender.send(data).is_err()) || end_stream {
            *entry = None;
        }
    }

    fn mark_closed(&self) {
        self.connected.send_if_modified(|state| {
            if state.is_none() {
                *state = Some(Err(error::handshake(ConnectionClosed)));
                true
            } else {
                false
            }
        });
        self.closed.send_replace(true);
        self.streams().clear();
        self.timer.notify_one();
    }
}

impl<C: QuicConnection> StreamSink for Shared<C> {
    fn send_stream_data(&self, stream_id: u64, data: &[u8], end_stream: bool) -> Result<()> {
        self.connection()
            .send_stream_data(stream_id, data, end_stream)?;
        self.process();
        Ok(())
    }
}

/// Fires `handle_timer` whenever the connection's deadline passes.
///
/// Exits once the connection is closed.
async fn run_timer<C: QuicConnection>(shared: Weak<Shared<C>>) {
    loop {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        if *shared.closed.borrow() {
            break;
        }

        let notified = shared.timer.notified();
        let deadline = shared.connection().timeout();

        match deadline {
            Some(deadline) => {
                tokio::select! {
                    () = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {
                        shared.connection().handle_timer(Instant::now());
                        shared.process();
                    }
                    () = notified => {}
                }
            }
            None => notified.await,
        }
    }

    tracing::trace!(target: "quic_connect::protocols", "Timer task finished");
}

impl<C: QuicConnection> ProtocolAdapter for StandardAdapter<C> {
    fn connection_made(&self, transport: TransportHandle) {
        if self.shared.transport.set(transport).is_err() {
            tracing::warn!(
                target: "quic_connect::protocols",
                "Adapter attached to a second transport, ignoring"
            );
        }
    }

    fn datagram_received(&self, data: &mut [u8], from: SocketAddr) {
        let Some(transport) = self.shared.transport.get() else {
            return;
        };
        let local = transport.local_addr();

        self.shared
            .connection()
            .receive_datagram(data, from, local, Instant::now());
        self.shared.process();
    }

    fn connection_lost(&self) {
        if !self.is_closed() {
            tracing::debug!(
                target: "quic_connect::protocols",
                "Transport lost before the connection closed"
            );
        }
        self.shared.mark_closed();
    }

    fn connect(&self, addr: SocketAddr) -> Result<()> {
        let transport = self
            .shared
            .transport
            .get()
            .ok_or_else(|| error::connection("adapter is not attached to a transport"))?;

        self.shared
            .connection()
            .connect(addr, transport.local_addr(), Instant::now())
            .map_err(|e| e.with_address(addr))?;
        self.shared.process();

        transport
            .runtime()
            .spawn(run_timer(Arc::downgrade(&self.shared)));
        Ok(())
    }

    fn wait_connected(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut receiver = self.shared.connected.subscribe();
            let outcome = receiver
                .wait_for(Option::is_some)
                .await
                .map(|state| (*state).clone());

            match outcome {
                Ok(Some(result)) => result,
                _ => Err(error::handshake(ConnectionClosed)),
            }
        })
    }

    fn close(&self) {
        if self.shared.closing.swap(true, Ordering::AcqRel) {
            return;
        }

        self.shared.connection().close(NO_ERROR, "");
        self.shared.process();
    }

    fn wait_closed(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let mut receiver = self.shared.closed.subscribe();
            // the sender lives as long as `self`
            let _ = receiver.wait_for(|closed| *closed).await;
        })
    }
}

/// Factory producing a `StandardAdapter` for any connection type.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAdapterFactory;

impl<C: QuicConnection> AdapterFactory<C> for StandardAdapterFactory {
    type Adapter = StandardAdapter<C>;

    fn create(&self, connection: C, stream_handler: Option<StreamHandler>) -> StandardAdapter<C> {
        StandardAdapter::new(connection, stream_handler)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;
    use crate::config::QuicConfiguration;
    use crate::tls::SessionTicketHandler;

    /// State machine that completes the handshake on the first inbound datagram.
    struct Scripted {
        configuration: QuicConfiguration,
        events: VecDeque<QuicEvent>,
        outbound: Vec<(Vec<u8>, SocketAddr)>,
        peer: Option<SocketAddr>,
        closed: bool,
        written: Vec<(u64, Vec<u8>, bool)>,
    }

    impl QuicConnection for Scripted {
        fn new(
            configuration: QuicConfiguration,
            _session_ticket_handler: Option<SessionTicketHandler>,
        ) -> Result<Self> {
            Ok(Self {
                configuration,
                events: VecDeque::new(),
                outbound: Vec::new(),
                peer: None,
                closed: false,
                written: Vec::new(),
            })
        }

        fn configuration(&self) -> &QuicConfiguration {
            &self.configuration
        }

        fn connect(&mut self, peer: SocketAddr, _local: SocketAddr, _now: Instant) -> Result<()> {
            self.peer = Some(peer);
            self.outbound.push((b"initial".to_vec(), peer));
            Ok(())
        }

        fn receive_datagram(&mut self, data: &mut [u8], _from: SocketAddr, _to: SocketAddr, _now: Instant) {
            match &*data {
                b"accept" => self.events.push_back(QuicEvent::HandshakeCompleted {
                    alpn_protocol: Some("h3".to_string()),
                    session_resumed: false,
                }),
                b"refuse" => {
                    self.closed = true;
                    self.events.push_back(QuicEvent::ConnectionTerminated {
                        error_code: 0x128,
                        reason: "refused".to_string(),
                    });
                }
                other => self.events.push_back(QuicEvent::StreamDataReceived {
                    stream_id: 1,
                    data: Bytes::copy_from_slice(other),
                    end_stream: true,
                }),
            }
        }

        fn datagrams_to_send(&mut self, _now: Instant) -> Vec<(Vec<u8>, SocketAddr)> {
            std::mem::take(&mut self.outbound)
        }

        fn timeout(&self) -> Option<Instant> {
            None
        }

        fn handle_timer(&mut self, _now: Instant) {}

        fn next_event(&mut self) -> Option<QuicEvent> {
            self.events.pop_front()
        }

        fn send_stream_data(&mut self, stream_id: u64, data: &[u8], end_stream: bool) -> Result<()> {
            self.written.push((stream_id, data.to_vec(), end_stream));
            Ok(())
        }

        fn close(&mut self, error_code: u64, reason: &str) {
            if !self.closed {
                self.closed = true;
                self.events.push_back(QuicEvent::ConnectionTerminated {
                    error_code,
                    reason: reason.to_string(),
                });
            }
        }

        fn is_closed(&self) -> bool {
            self.closed
        }
    }

    fn adapter(handler: Option<StreamHandler>) -> StandardAdapter<Scripted> {
        let connection = Scripted::new(QuicConfiguration::client(), None)
            .expect("scripted connection should build");
        StandardAdapter::new(connection, handler)
    }

    fn peer() -> SocketAddr {
        "[::ffff:203.0.113.5]:4433".parse().expect("valid address")
    }

    #[tokio::test]
    async fn connect_without_transport_is_rejected() {
        let adapter = adapter(None);
        let err = adapter.connect(peer()).expect_err("no transport attached");
        assert_eq!(err.kind(), crate::error::Kind::Connection);
    }

    #[tokio::test]
    async fn handshake_completion_resolves_wait_connected() {
        let adapter = adapter(None);
        adapter.datagram_received(&mut b"accept".to_vec(), peer());
        // no transport attached: datagrams are ignored entirely
        assert!(!adapter.is_connected());

        adapter.shared.handle_event(QuicEvent::HandshakeCompleted {
            alpn_protocol: None,
            session_resumed: false,
        });
        adapter
            .wait_connected()
            .await
            .expect("handshake completed");
        assert!(adapter.is_connected());
    }

    #[tokio::test]
    async fn termination_before_handshake_fails_wait_connected() {
        let adapter = adapter(None);
        adapter.shared.handle_event(QuicEvent::ConnectionTerminated {
            error_code: 0x128,
            reason: "bad certificate".to_string(),
        });

        let err = adapter.wait_connected().await.expect_err("handshake failed");
        assert!(err.is_handshake());
        tokio::time::timeout(Duration::from_secs(1), adapter.wait_closed())
            .await
            .expect("closed signal set");
    }

    #[tokio::test]
    async fn close_is_idempotent_and_signals_closed() {
        let adapter = adapter(None);
        adapter.close();
        adapter.close();

        tokio::time::timeout(Duration::from_secs(1), adapter.wait_closed())
            .await
            .expect("closed signal set");
        assert!(adapter.with_connection(|c| c.is_closed()));
    }

    #[tokio::test]
    async fn connection_lost_fails_pending_handshake() {
        let adapter = adapter(None);
        adapter.connection_lost();

        let err = adapter.wait_connected().await.expect_err("transport gone");
        assert!(err.is_handshake());
        assert!(adapter.is_closed());
    }

    #[tokio::test]
    async fn new_peer_stream_invokes_handler_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (reader_tx, mut reader_rx) = mpsc::unbounded_channel();
        let handler: StreamHandler = {
            let calls = Arc::clone(&calls);
            Arc::new(move |reader: StreamReader, writer: StreamWriter| {
                calls.fetch_add(1, Ordering::SeqCst);
                let _ = reader_tx.send((reader, writer));
            })
        };
        let adapter = adapter(Some(handler));

        adapter.shared.handle_event(QuicEvent::StreamDataReceived {
            stream_id: 3,
            data: Bytes::from_static(b"hello "),
            end_stream: false,
        });
        adapter.shared.handle_event(QuicEvent::StreamDataReceived {
            stream_id: 3,
            data: Bytes::from_static(b"world"),
            end_stream: true,
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let (mut reader, writer) = reader_rx.recv().await.expect("handler received stream");
        assert_eq!(reader.stream_id(), 3);
        assert_eq!(reader.read().await.as_deref(), Some(&b"hello "[..]));
        assert_eq!(reader.read().await.as_deref(), Some(&b"world"[..]));
        assert_eq!(reader.read().await, None);

        writer.finish(b"bye").expect("write accepted");
        adapter.with_connection(|c| {
            assert_eq!(c.written, vec![(3, b"bye".to_vec(), true)]);
        });
    }

    #[tokio::test]
    async fn data_after_reader_dropped_does_not_reopen_stream() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler: StreamHandler = {
            let calls = Arc::clone(&calls);
            Arc::new(move |reader: StreamReader, _writer: StreamWriter| {
                calls.fetch_add(1, Ordering::SeqCst);
                drop(reader);
            })
        };
        let adapter = adapter(Some(handler));

        for chunk in [&b"first"[..], b"second", b"third"] {
            adapter.shared.handle_event(QuicEvent::StreamDataReceived {
                stream_id: 7,
                data: Bytes::copy_from_slice(chunk),
                end_stream: false,
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // a finished stream stays finished as well
        adapter.shared.handle_event(QuicEvent::StreamDataReceived {
            stream_id: 11,
            data: Bytes::from_static(b"done"),
            end_stream: true,
        });
        adapter.shared.handle_event(QuicEvent::StreamDataReceived {
            stream_id: 11,
            data: Bytes::from_static(b"late"),
            end_stream: false,
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn open_stream_receives_replies_without_handler() {
        let adapter = adapter(None);
        let (mut reader, writer) = adapter.open_stream(0);

        writer.finish(b"request").expect("write accepted");
        adapter.shared.handle_event(QuicEvent::StreamDataReceived {
            stream_id: 0,
            data: Bytes::from_static(b"response"),
            end_stream: true,
        });

        assert_eq!(reader.read().await.as_deref(), Some(&b"response"[..]));
        assert_eq!(reader.read().await, None);
        adapter.with_connection(|c| {
            assert_eq!(c.written, vec![(0, b"request".to_vec(), true)]);
        });
    }

    #[tokio::test]
    async fn open_stream_after_close_yields_nothing() {
        let adapter = adapter(None);
        adapter.close();

        let (mut reader, _writer) = adapter.open_stream(4);
        let read = tokio::time::timeout(Duration::from_secs(1), reader.read())
            .await
            .expect("reader does not hang");
        assert_eq!(read, None);
    }
}
