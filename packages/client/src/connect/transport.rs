//! Datagram endpoint binding a UDP socket to a protocol adapter
//!
//! A receive pump task reads datagrams and hands them to the adapter. The
//! adapter sends through a `TransportHandle`, which never keeps the socket
//! alive on its own.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};

use socket2::{SockAddr, SockRef};
use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{self, Result};
use crate::protocols::ProtocolAdapter;

/// Largest datagram the pump accepts
const RECV_BUFFER_SIZE: usize = 65535;

/// Send side of the transport, handed to the adapter.
#[derive(Clone)]
pub struct TransportHandle {
    socket: Weak<UdpSocket>,
    local_addr: SocketAddr,
    runtime: Handle,
}

impl TransportHandle {
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runtime the transport runs on; adapters spawn their timers here.
    #[must_use]
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Send one datagram without waiting.
    ///
    /// A freshly registered socket has no write readiness cached yet, so a
    /// `WouldBlock` from tokio is retried as a direct non-blocking send.
    /// Datagrams the kernel refuses as well are dropped; QUIC loss recovery
    /// takes care of them.
    pub fn send_to(&self, datagram: &[u8], addr: SocketAddr) {
        let Some(socket) = self.socket.upgrade() else {
            tracing::trace!(
                target: "quic_connect::transport",
                "Transport closed, dropping outbound datagram"
            );
            return;
        };

        let sent = match socket.try_send_to(datagram, addr) {
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                SockRef::from(&*socket).send_to(datagram, &SockAddr::from(addr))
            }
            other => other,
        };

        match sent {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                tracing::trace!(
                    target: "quic_connect::transport",
                    peer = %addr,
                    "Socket buffer full, dropping datagram"
                );
            }
            Err(e) => {
                log::debug!("datagram send to {addr} failed: {e}");
            }
        }
    }
}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportHandle")
            .field("local_addr", &self.local_addr)
            .field("open", &(self.socket.strong_count() > 0))
            .finish()
    }
}

/// Owns the socket and the receive pump for one connection.
pub struct DatagramTransport {
    socket: Option<Arc<UdpSocket>>,
    adapter: Arc<dyn ProtocolAdapter>,
    shutdown: Option<oneshot::Sender<()>>,
    pump: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
}

impl fmt::Debug for DatagramTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatagramTransport")
            .field("local_addr", &self.local_addr)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Bind `socket` to a new adapter built by `adapter`.
///
/// The adapter receives `connection_made` before the pump starts, so no
/// datagram can reach it earlier.
///
/// # Errors
///
/// Returns a bind error if the socket cannot be registered with the runtime.
pub fn create_datagram_endpoint<A, F>(
    runtime: &Handle,
    socket: std::net::UdpSocket,
    adapter: F,
) -> Result<(DatagramTransport, Arc<A>)>
where
    A: ProtocolAdapter,
    F: FnOnce() -> A,
{
    let socket = {
        let _guard = runtime.enter();
        UdpSocket::from_std(socket).map_err(error::bind)?
    };
    let local_addr = socket.local_addr().map_err(error::bind)?;
    let socket = Arc::new(socket);
    let adapter = Arc::new(adapter());

    adapter.connection_made(TransportHandle {
        socket: Arc::downgrade(&socket),
        local_addr,
        runtime: runtime.clone(),
    });

    let (shutdown, shutdown_rx) = oneshot::channel();
    let pump = runtime.spawn(receive_pump(
        Arc::clone(&socket),
        Arc::clone(&adapter) as Arc<dyn ProtocolAdapter>,
        shutdown_rx,
    ));

    tracing::debug!(
        target: "quic_connect::transport",
        local = %local_addr,
        "Datagram endpoint created"
    );

    let transport = DatagramTransport {
        socket: Some(socket),
        adapter: Arc::clone(&adapter) as Arc<dyn ProtocolAdapter>,
        shutdown: Some(shutdown),
        pump: Some(pump),
        local_addr,
    };
    Ok((transport, adapter))
}

async fn receive_pump(
    socket: Arc<UdpSocket>,
    adapter: Arc<dyn ProtocolAdapter>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut buffer = vec![0u8; RECV_BUFFER_SIZE];

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            received = socket.recv_from(&mut buffer) => match received {
                Ok((len, from)) => adapter.datagram_received(&mut buffer[..len], from),
                Err(e) if is_transient(&e) => {
                    // ICMP unreachable and friends surface here on some platforms
                    tracing::trace!(
                        target: "quic_connect::transport",
                        error = %e,
                        "Ignoring transient receive error"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        target: "quic_connect::transport",
                        error = %e,
                        "Receive failed, stopping datagram pump"
                    );
                    break;
                }
            },
        }
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

impl DatagramTransport {
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    /// Stop the pump, notify the adapter and release the socket.
    ///
    /// Only the first call does any work.
    ///
    /// # Errors
    ///
    /// Returns a teardown error if the pump task panicked.
    pub async fn close(&mut self) -> Result<()> {
        let Some(socket) = self.socket.take() else {
            return Ok(());
        };

        if let Some(shutdown) = self.shutdown.take() {
            // pump may already have exited on a fatal receive error
            let _ = shutdown.send(());
        }

        let joined = match self.pump.take() {
            Some(pump) => pump.await,
            None => Ok(()),
        };

        self.adapter.connection_lost();
        drop(socket);

        tracing::debug!(
            target: "quic_connect::transport",
            local = %self.local_addr,
            "Datagram endpoint closed"
        );

        joined.map_err(error::teardown)
    }
}

impl Drop for DatagramTransport {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use futures::future::BoxFuture;
    use tokio::sync::mpsc;

    use super::*;

    struct Echo {
        transport: Mutex<Option<TransportHandle>>,
        received: mpsc::UnboundedSender<(Vec<u8>, SocketAddr)>,
        lost: mpsc::UnboundedSender<()>,
    }

    impl ProtocolAdapter for Echo {
        fn connection_made(&self, transport: TransportHandle) {
            *self.transport.lock().expect("lock") = Some(transport);
        }

        fn datagram_received(&self, data: &mut [u8], from: SocketAddr) {
            let _ = self.received.send((data.to_vec(), from));
            if let Some(transport) = &*self.transport.lock().expect("lock") {
                transport.send_to(data, from);
            }
        }

        fn connection_lost(&self) {
            let _ = self.lost.send(());
        }

        fn connect(&self, _addr: SocketAddr) -> Result<()> {
            Ok(())
        }

        fn wait_connected(&self) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Ok(()) })
        }

        fn close(&self) {}

        fn wait_closed(&self) -> BoxFuture<'_, ()> {
            Box::pin(async {})
        }
    }

    #[tokio::test]
    async fn pump_delivers_datagrams_and_close_reports_loss() {
        let (received_tx, mut received_rx) = mpsc::unbounded_channel();
        let (lost_tx, mut lost_rx) = mpsc::unbounded_channel();
        let socket = std::net::UdpSocket::bind("127.0.0.1:0").expect("bind loopback");
        socket.set_nonblocking(true).expect("nonblocking");

        let (mut transport, adapter) = create_datagram_endpoint(&Handle::current(), socket, || Echo {
            transport: Mutex::new(None),
            received: received_tx,
            lost: lost_tx,
        })
        .expect("endpoint created");
        assert!(adapter.transport.lock().expect("lock").is_some());

        let peer = UdpSocket::bind("127.0.0.1:0").await.expect("bind peer");
        peer.send_to(b"ping", transport.local_addr())
            .await
            .expect("send ping");

        let (data, from) = tokio::time::timeout(Duration::from_secs(5), received_rx.recv())
            .await
            .expect("datagram delivered in time")
            .expect("channel open");
        assert_eq!(data, b"ping");
        assert_eq!(from, peer.local_addr().expect("peer address"));

        let mut echo = [0u8; 16];
        let (len, _) = tokio::time::timeout(Duration::from_secs(5), peer.recv_from(&mut echo))
            .await
            .expect("echo in time")
            .expect("echo received");
        assert_eq!(&echo[..len], b"ping");

        transport.close().await.expect("clean close");
        assert!(transport.is_closed());
        assert!(lost_rx.recv().await.is_some());

        // second close is a no-op
        transport.close().await.expect("idempotent close");
        assert!(lost_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn first_send_after_registration_reaches_peer() {
        let (received_tx, _received_rx) = mpsc::unbounded_channel();
        let (lost_tx, _lost_rx) = mpsc::unbounded_channel();
        let peer = UdpSocket::bind("127.0.0.1:0").await.expect("bind peer");
        let socket = std::net::UdpSocket::bind("127.0.0.1:0").expect("bind loopback");
        socket.set_nonblocking(true).expect("nonblocking");

        let (mut transport, adapter) = create_datagram_endpoint(&Handle::current(), socket, || Echo {
            transport: Mutex::new(None),
            received: received_tx,
            lost: lost_tx,
        })
        .expect("endpoint created");

        // no await between registration and the send: the reactor has not run yet
        let handle = adapter
            .transport
            .lock()
            .expect("lock")
            .clone()
            .expect("handle attached");
        handle.send_to(b"initial", peer.local_addr().expect("peer address"));

        let mut buffer = [0u8; 16];
        let (len, from) = tokio::time::timeout(Duration::from_secs(5), peer.recv_from(&mut buffer))
            .await
            .expect("first datagram not dropped")
            .expect("datagram received");
        assert_eq!(&buffer[..len], b"initial");
        assert_eq!(from, transport.local_addr());

        transport.close().await.expect("clean close");
    }

    #[tokio::test]
    async fn handle_outliving_transport_drops_sends() {
        let (received_tx, _received_rx) = mpsc::unbounded_channel();
        let (lost_tx, _lost_rx) = mpsc::unbounded_channel();
        let socket = std::net::UdpSocket::bind("127.0.0.1:0").expect("bind loopback");
        socket.set_nonblocking(true).expect("nonblocking");

        let (mut transport, adapter) = create_datagram_endpoint(&Handle::current(), socket, || Echo {
            transport: Mutex::new(None),
            received: received_tx,
            lost: lost_tx,
        })
        .expect("endpoint created");
        transport.close().await.expect("clean close");

        let handle = adapter
            .transport
            .lock()
            .expect("lock")
            .clone()
            .expect("handle attached");
        handle.send_to(b"late", "127.0.0.1:9".parse().expect("valid address"));
    }
}
