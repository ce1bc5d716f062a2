//! Stream handles passed to the caller's stream handler

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;

/// Callback invoked when the peer opens a new stream
pub type StreamHandler = Arc<dyn Fn(StreamReader, StreamWriter) + Send + Sync + 'static>;

/// Write side of a stream, implemented by the adapter owning the connection.
pub(crate) trait StreamSink: Send + Sync + 'static {
    fn send_stream_data(&self, stream_id: u64, data: &[u8], end_stream: bool) -> Result<()>;
}

/// Receives the data the peer sends on one stream.
pub struct StreamReader {
    stream_id: u64,
    receiver: mpsc::UnboundedReceiver<Bytes>,
}

impl StreamReader {
    pub(crate) fn new(stream_id: u64, receiver: mpsc::UnboundedReceiver<Bytes>) -> Self {
        Self {
            stream_id,
            receiver,
        }
    }

    #[must_use]
    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    /// Next chunk of stream data, or `None` once the peer finished the stream
    /// or the connection closed.
    pub async fn read(&mut self) -> Option<Bytes> {
        self.receiver.recv().await
    }
}

impl fmt::Debug for StreamReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamReader")
            .field("stream_id", &self.stream_id)
            .finish_non_exhaustive()
    }
}

/// Sends data on one stream.
#[derive(Clone)]
pub struct StreamWriter {
    stream_id: u64,
    sink: Arc<dyn StreamSink>,
}

impl StreamWriter {
    pub(crate) fn new(stream_id: u64, sink: Arc<dyn StreamSink>) -> Self {
        Self { stream_id, sink }
    }

    #[must_use]
    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    /// Queue `data` on the stream.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the stream is closed or flow control
    /// does not admit the whole buffer.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        self.sink.send_stream_data(self.stream_id, data, false)
    }

    /// Queue `data` and mark the end of the stream.
    ///
    /// # Errors
    ///
    /// Same conditions as [`StreamWriter::write`].
    pub fn finish(&self, data: &[u8]) -> Result<()> {
        self.sink.send_stream_data(self.stream_id, data, true)
    }
}

impl fmt::Debug for StreamWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamWriter")
            .field("stream_id", &self.stream_id)
            .finish_non_exhaustive()
    }
}
