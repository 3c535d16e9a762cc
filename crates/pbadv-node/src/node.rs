//! Single-task driver for one bearer.
//!
//! Inbound frames, transport completions, timer deadlines and the shutdown
//! signal are serialized through one `tokio::select!` loop, so the bearer
//! never needs a lock. Time is read from tokio's clock so paused-time tests
//! drive the bearer's timers too.

use std::sync::Arc;
use std::time::Instant;

use pbadv_interfaces::{AdvPort, ChannelTransport, Completion};
use pbadv_protocol::{MeshCrypto, PbAdvBearer, ProvCrypto};
use tokio::sync::{mpsc, watch};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::session::{Session, SessionReport};

/// Cloneable handle that stops a running [`Node`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

pub struct Node<C: ProvCrypto = MeshCrypto> {
    bearer: PbAdvBearer<ChannelTransport, C>,
    session: Session,
    inbound: mpsc::Receiver<Vec<u8>>,
    completions: mpsc::UnboundedReceiver<Completion>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Node<MeshCrypto> {
    pub fn new(config: &NodeConfig, port: AdvPort) -> Result<Self, NodeError> {
        Self::with_crypto(config, port, MeshCrypto::new())
    }
}

impl<C: ProvCrypto> Node<C> {
    pub fn with_crypto(config: &NodeConfig, port: AdvPort, crypto: C) -> Result<Self, NodeError> {
        let bearer_config = config.bearer.to_bearer_config()?;
        let session = Session::from_config(config)?;
        let bearer = PbAdvBearer::new(bearer_config, port.transport, crypto)?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            bearer,
            session,
            inbound: port.inbound,
            completions: port.completions,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        })
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    pub fn bearer(&self) -> &PbAdvBearer<ChannelTransport, C> {
        &self.bearer
    }

    /// Run the session to completion and return what happened.
    pub async fn run(&mut self) -> Result<SessionReport, NodeError> {
        self.session.start(&mut self.bearer, now())?;
        tracing::info!(role = ?self.session.role(), "node running");

        loop {
            self.drain_events();
            if self.session.is_finished() {
                return Ok(self.session.report().clone());
            }

            let deadline = self
                .bearer
                .next_deadline()
                .map(tokio::time::Instant::from_std);

            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    tracing::info!("shutdown signal received");
                    return Err(NodeError::Stopped);
                }

                completion = self.completions.recv() => {
                    let Some(Completion { token, result }) = completion else {
                        return Err(NodeError::TransportClosed);
                    };
                    self.bearer.on_transmit_complete(token, result);
                }

                frame = self.inbound.recv() => {
                    let Some(frame) = frame else {
                        return Err(NodeError::TransportClosed);
                    };
                    self.bearer.handle_frame(now(), &frame);
                }

                _ = sleep_until(deadline) => {
                    self.bearer.handle_timeouts(now());
                }
            }
        }
    }

    fn drain_events(&mut self) {
        while let Some(event) = self.bearer.poll_event() {
            self.session.on_event(event, &mut self.bearer, now());
        }
    }
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
