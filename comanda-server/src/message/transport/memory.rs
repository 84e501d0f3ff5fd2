//! In-process transport, used by tests to drive a push channel without TCP

use std::sync::Arc;

use async_trait::async_trait;
use shared::message::PushMessage;
use tokio::sync::{Mutex, mpsc};

use super::Transport;
use crate::utils::AppError;

/// In-process memory transport
///
/// `pair()` returns two connected ends; a write on one side is a read on the
/// other. Closing either end disconnects both directions, mirroring a TCP
/// shutdown.
#[derive(Debug)]
pub struct MemoryTransport {
    tx: Mutex<Option<mpsc::UnboundedSender<PushMessage>>>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<PushMessage>>>,
}

impl MemoryTransport {
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Mutex::new(Some(a_tx)),
                rx: Arc::new(Mutex::new(b_rx)),
            },
            Self {
                tx: Mutex::new(Some(b_tx)),
                rx: Arc::new(Mutex::new(a_rx)),
            },
        )
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_message(&self) -> Result<PushMessage, AppError> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(AppError::ClientDisconnected)
    }

    async fn write_message(&self, msg: &PushMessage) -> Result<(), AppError> {
        let tx = self.tx.lock().await;
        match tx.as_ref() {
            Some(tx) => tx
                .send(msg.clone())
                .map_err(|_| AppError::ClientDisconnected),
            None => Err(AppError::ClientDisconnected),
        }
    }

    async fn close(&self) -> Result<(), AppError> {
        // Dropping the sender wakes the peer's pending read with EOF
        self.tx.lock().await.take();
        Ok(())
    }
}
