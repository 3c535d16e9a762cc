//! UDP stand-in for an advertising radio.
//!
//! Each advertising event is one datagram sent to the configured target, so
//! two nodes on a LAN (or loopback) can run a provisioning session without
//! Bluetooth hardware. Datagrams longer than an advertising PDU are dropped
//! on receipt.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pbadv_core::constants::ADV_PDU_MAX;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use crate::error::InterfaceError;
use crate::port::{
    AdvPort, ChannelTransport, DEFAULT_ADV_INTERVAL, DEFAULT_POOL_SIZE, INBOUND_QUEUE, Radio,
    run_advertiser,
};
use crate::shutdown::ShutdownToken;

const RECV_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct UdpAdvConfig {
    pub bind_addr: SocketAddr,
    pub target_addr: SocketAddr,
    /// Enable `SO_BROADCAST` for a broadcast target.
    pub broadcast: bool,
    pub interval: Duration,
    pub pool_size: usize,
}

impl UdpAdvConfig {
    pub fn unicast(bind_addr: SocketAddr, target_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            target_addr,
            broadcast: false,
            interval: DEFAULT_ADV_INTERVAL,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

/// Running UDP advertiser; owns the socket tasks.
#[derive(Debug)]
pub struct UdpAdvertiser {
    local_addr: SocketAddr,
    shutdown: ShutdownToken,
}

impl UdpAdvertiser {
    /// Bind the socket and spawn the advertise and receive tasks.
    pub async fn start(config: UdpAdvConfig) -> Result<(Self, AdvPort), InterfaceError> {
        if config.pool_size == 0 {
            return Err(InterfaceError::Configuration(
                "pool_size must be at least 1".into(),
            ));
        }

        let socket = UdpSocket::bind(config.bind_addr).await?;
        if config.broadcast {
            socket.set_broadcast(true)?;
        }
        let local_addr = socket.local_addr()?;
        let socket = Arc::new(socket);

        let (transport, frames) = ChannelTransport::new(config.pool_size);
        let (inbound_tx, inbound) = mpsc::channel(INBOUND_QUEUE);
        let (completion_tx, completions) = mpsc::unbounded_channel();
        let shutdown = ShutdownToken::new();

        let radio = UdpRadio {
            socket: Arc::clone(&socket),
            target: config.target_addr,
        };
        shutdown
            .add_task(tokio::spawn(run_advertiser(
                radio,
                frames,
                completion_tx,
                config.interval,
                shutdown.subscribe(),
            )))
            .await;
        shutdown
            .add_task(tokio::spawn(read_loop(
                socket,
                inbound_tx,
                shutdown.subscribe(),
            )))
            .await;

        info!(%local_addr, target = %config.target_addr, "udp advertiser started");
        let port = AdvPort {
            transport,
            inbound,
            completions,
        };
        Ok((
            Self {
                local_addr,
                shutdown,
            },
            port,
        ))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn stop(&self) {
        self.shutdown.signal_stop();
        self.shutdown.join_all().await;
        debug!(local_addr = %self.local_addr, "udp advertiser stopped");
    }
}

struct UdpRadio {
    socket: Arc<UdpSocket>,
    target: SocketAddr,
}

impl Radio for UdpRadio {
    async fn broadcast(&mut self, frame: &[u8]) -> Result<(), InterfaceError> {
        let sent = self.socket.send_to(frame, self.target).await?;
        if sent != frame.len() {
            return Err(InterfaceError::TransmitFailed(format!(
                "sent {} of {} bytes",
                sent,
                frame.len()
            )));
        }
        Ok(())
    }
}

async fn read_loop(
    socket: Arc<UdpSocket>,
    inbound: mpsc::Sender<Vec<u8>>,
    mut stop: watch::Receiver<bool>,
) {
    let mut buf = [0u8; RECV_BUFFER];

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buf) => match result {
                Ok((len, src)) if len > ADV_PDU_MAX => {
                    debug!(%src, len, "dropping oversized datagram");
                }
                Ok((len, src)) => {
                    trace!(%src, frame = ?&buf[..len], "datagram received");
                    if inbound.try_send(buf[..len].to_vec()).is_err() {
                        warn!(%src, "inbound queue full or closed, frame lost");
                    }
                }
                Err(err) => {
                    warn!(error = %err, "udp recv error");
                    if *stop.borrow() {
                        break;
                    }
                }
            },
            _ = stop.changed() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbadv_protocol::AdvTransport;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn advertises_repeats_to_target() {
        let peer = UdpSocket::bind(loopback()).await.unwrap();
        let mut config = UdpAdvConfig::unicast(loopback(), peer.local_addr().unwrap());
        config.interval = Duration::from_millis(1);
        let (advertiser, mut port) = UdpAdvertiser::start(config).await.unwrap();

        let frame = hex::decode("deadbeef000b02").unwrap();
        let token = port.transport.transmit(&frame, 1).unwrap();

        let mut buf = [0u8; RECV_BUFFER];
        for _ in 0..2 {
            let (len, _) = tokio::time::timeout(Duration::from_secs(2), peer.recv_from(&mut buf))
                .await
                .expect("timed out waiting for datagram")
                .unwrap();
            assert_eq!(&buf[..len], frame.as_slice());
        }

        let completion = tokio::time::timeout(Duration::from_secs(2), port.completions.recv())
            .await
            .expect("timed out waiting for completion")
            .unwrap();
        assert_eq!(completion.token, token);
        assert_eq!(completion.result, Ok(()));

        advertiser.stop().await;
    }

    #[tokio::test]
    async fn receives_frames_and_drops_oversized() {
        let peer = UdpSocket::bind(loopback()).await.unwrap();
        let config = UdpAdvConfig::unicast(loopback(), peer.local_addr().unwrap());
        let (advertiser, mut port) = UdpAdvertiser::start(config).await.unwrap();

        peer.send_to(&[0xAA; 40], advertiser.local_addr())
            .await
            .unwrap();
        peer.send_to(&[0xBB; 7], advertiser.local_addr())
            .await
            .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), port.inbound.recv())
            .await
            .expect("timed out waiting for frame")
            .unwrap();
        assert_eq!(received, vec![0xBB; 7]);

        advertiser.stop().await;
    }

    #[tokio::test]
    async fn empty_pool_is_rejected() {
        let mut config = UdpAdvConfig::unicast(loopback(), loopback());
        config.pool_size = 0;
        let result = UdpAdvertiser::start(config).await;
        assert!(matches!(result, Err(InterfaceError::Configuration(_))));
    }

    #[tokio::test]
    async fn stop_disables_transport() {
        let config = UdpAdvConfig::unicast(loopback(), loopback());
        let (advertiser, mut port) = UdpAdvertiser::start(config).await.unwrap();
        assert!(port.transport.enable().is_ok());

        advertiser.stop().await;
        assert!(port.transport.enable().is_err());
    }
}
