//! In-process transport: the executor runs in the same process, behind the
//! same trait the socket transport implements.
//!
//! Used by tests and by embedders that host both sides in one runtime.
//! Availability is a toggle so the fallback path can be exercised without
//! tearing anything down, and channel closes are counted so cancellation can
//! be asserted on.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use courier_client::{StreamChannel, Transport};
use courier_core::{ClientMessage, FetchReply, StreamEvent, TransportError};

use crate::FetchExecutor;

#[derive(Clone)]
pub struct MemoryTransport {
    executor: Arc<FetchExecutor>,
    available: Arc<AtomicBool>,
    disconnects: Arc<AtomicUsize>,
}

impl MemoryTransport {
    pub fn new(executor: FetchExecutor) -> Self {
        Self {
            executor: Arc::new(executor),
            available: Arc::new(AtomicBool::new(true)),
            disconnects: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Toggle reachability of the executor side.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stream channels closed before their sequence finished.
    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl Transport for MemoryTransport {
    type Channel = MemoryChannel;

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn send(&self, message: ClientMessage) -> Result<FetchReply, TransportError> {
        if !self.is_available() {
            return Err(TransportError::Unavailable);
        }
        match message {
            ClientMessage::FetchUrl { url, options } => {
                Ok(self.executor.handle_fetch(&url, &options).await)
            }
            ClientMessage::StartFetch { .. } => Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "start_fetch requires a stream channel",
            ))),
        }
    }

    async fn open_channel(&self, _name: &str) -> Result<MemoryChannel, TransportError> {
        if !self.is_available() {
            return Err(TransportError::Unavailable);
        }
        Ok(MemoryChannel {
            executor: self.executor.clone(),
            events: None,
            task: None,
            disconnects: self.disconnects.clone(),
            closed: false,
        })
    }
}

pub struct MemoryChannel {
    executor: Arc<FetchExecutor>,
    events: Option<mpsc::Receiver<StreamEvent>>,
    task: Option<JoinHandle<()>>,
    disconnects: Arc<AtomicUsize>,
    closed: bool,
}

impl StreamChannel for MemoryChannel {
    async fn send(&mut self, message: ClientMessage) -> Result<(), TransportError> {
        match message {
            ClientMessage::StartFetch { url, options } => {
                let (tx, rx) = mpsc::channel(32);
                let executor = self.executor.clone();
                self.events = Some(rx);
                self.task = Some(tokio::spawn(async move {
                    executor.handle_stream(&url, &options, tx).await;
                }));
                Ok(())
            }
            ClientMessage::FetchUrl { .. } => Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "fetch_url is not a stream message",
            ))),
        }
    }

    async fn recv(&mut self) -> Option<StreamEvent> {
        self.events.as_mut()?.recv().await
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.events = None;
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
