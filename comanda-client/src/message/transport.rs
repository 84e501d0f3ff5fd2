//! Client-side transports
//!
//! TCP for real connections, memory for tests. The frame format comes from
//! `shared::message::codec`, the same code the server reads and writes with.

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, mpsc};

use shared::message::{PushMessage, codec};

use crate::error::MessageError;

#[derive(Debug, Clone)]
pub enum ClientTransport {
    Tcp(TcpTransport),
    Memory(MemoryTransport),
}

impl ClientTransport {
    pub async fn read_message(&self) -> Result<PushMessage, MessageError> {
        match self {
            ClientTransport::Tcp(t) => t.read_message().await,
            ClientTransport::Memory(t) => t.read_message().await,
        }
    }

    pub async fn write_message(&self, msg: &PushMessage) -> Result<(), MessageError> {
        match self {
            ClientTransport::Tcp(t) => t.write_message(msg).await,
            ClientTransport::Memory(t) => t.write_message(msg).await,
        }
    }

    pub async fn close(&self) -> Result<(), MessageError> {
        match self {
            ClientTransport::Tcp(t) => t.close().await,
            ClientTransport::Memory(t) => t.close().await,
        }
    }
}

/// TCP transport with split halves so a pending read never blocks a write
#[derive(Debug, Clone)]
pub struct TcpTransport {
    reader: Arc<Mutex<OwnedReadHalf>>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

impl TcpTransport {
    pub async fn connect(addr: &str) -> Result<Self, MessageError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| MessageError::Connection(format!("TCP connect failed: {}", e)))?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: Arc::new(Mutex::new(reader)),
            writer: Arc::new(Mutex::new(writer)),
        })
    }

    pub async fn read_message(&self) -> Result<PushMessage, MessageError> {
        let mut reader = self.reader.lock().await;
        codec::read_message(&mut *reader)
            .await
            .map_err(MessageError::from)
    }

    pub async fn write_message(&self, msg: &PushMessage) -> Result<(), MessageError> {
        let mut writer = self.writer.lock().await;
        codec::write_message(&mut *writer, msg)
            .await
            .map_err(MessageError::from)
    }

    pub async fn close(&self) -> Result<(), MessageError> {
        use tokio::io::AsyncWriteExt;
        let mut writer = self.writer.lock().await;
        writer
            .shutdown()
            .await
            .map_err(|e| MessageError::Connection(format!("TCP close failed: {}", e)))?;
        Ok(())
    }
}

/// In-process transport for tests
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<PushMessage>>>>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<PushMessage>>>,
}

impl MemoryTransport {
    /// Two connected ends; writes on one side are reads on the other
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(a_tx))),
                rx: Arc::new(Mutex::new(b_rx)),
            },
            Self {
                tx: Arc::new(Mutex::new(Some(b_tx))),
                rx: Arc::new(Mutex::new(a_rx)),
            },
        )
    }

    pub async fn read_message(&self) -> Result<PushMessage, MessageError> {
        let mut rx = self.rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| MessageError::Connection("Disconnected".to_string()))
    }

    pub async fn write_message(&self, msg: &PushMessage) -> Result<(), MessageError> {
        let tx = self.tx.lock().await;
        match tx.as_ref() {
            Some(tx) => tx
                .send(msg.clone())
                .map_err(|_| MessageError::Connection("Disconnected".to_string())),
            None => Err(MessageError::Closed),
        }
    }

    pub async fn close(&self) -> Result<(), MessageError> {
        self.tx.lock().await.take();
        Ok(())
    }
}
