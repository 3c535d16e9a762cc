//! In-memory broadcast medium.
//!
//! Every station attached to a [`MemoryMedium`] hears every frame the other
//! stations advertise, minus whatever the installed drop filter rejects.
//! Frames never loop back to their sender. Used to run two bearers against
//! each other under tokio's paused clock.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace, warn};

use crate::error::InterfaceError;
use crate::port::{AdvPort, ChannelTransport, INBOUND_QUEUE, Radio, run_advertiser};
use crate::shutdown::ShutdownToken;

/// One frame about to reach one station.
#[derive(Debug, Clone, Copy)]
pub struct Delivery<'a> {
    pub from: usize,
    pub to: usize,
    pub frame: &'a [u8],
}

type DropFilter = Box<dyn FnMut(&Delivery<'_>) -> bool + Send>;

struct Bus {
    stations: Vec<mpsc::Sender<Vec<u8>>>,
    keep: Option<DropFilter>,
}

#[derive(Clone)]
pub struct MemoryMedium {
    bus: Arc<Mutex<Bus>>,
    interval: Duration,
    shutdown: Arc<ShutdownToken>,
}

impl MemoryMedium {
    /// `interval` spaces the repeats of a frame.
    pub fn new(interval: Duration) -> Self {
        Self {
            bus: Arc::new(Mutex::new(Bus {
                stations: Vec::new(),
                keep: None,
            })),
            interval,
            shutdown: Arc::new(ShutdownToken::new()),
        }
    }

    /// Add a station with `pool_size` frame buffers and spawn its advertiser.
    pub async fn attach(&self, pool_size: usize) -> AdvPort {
        let (inbound_tx, inbound) = mpsc::channel(INBOUND_QUEUE);
        let index = {
            let mut bus = self.bus.lock().await;
            bus.stations.push(inbound_tx);
            bus.stations.len() - 1
        };

        let (transport, frames) = ChannelTransport::new(pool_size);
        let (completion_tx, completions) = mpsc::unbounded_channel();
        let radio = MemoryRadio {
            bus: Arc::clone(&self.bus),
            index,
        };
        let handle = tokio::spawn(run_advertiser(
            radio,
            frames,
            completion_tx,
            self.interval,
            self.shutdown.subscribe(),
        ));
        self.shutdown.add_task(handle).await;
        debug!(station = index, pool_size, "station attached");

        AdvPort {
            transport,
            inbound,
            completions,
        }
    }

    /// Install a filter deciding per delivery whether the frame arrives.
    pub async fn set_filter(&self, keep: impl FnMut(&Delivery<'_>) -> bool + Send + 'static) {
        self.bus.lock().await.keep = Some(Box::new(keep));
    }

    pub async fn clear_filter(&self) {
        self.bus.lock().await.keep = None;
    }

    /// Stop every advertiser and wait for them to finish.
    pub async fn shutdown(&self) {
        self.shutdown.signal_stop();
        self.shutdown.join_all().await;
    }
}

impl std::fmt::Debug for MemoryMedium {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMedium")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

struct MemoryRadio {
    bus: Arc<Mutex<Bus>>,
    index: usize,
}

impl Radio for MemoryRadio {
    async fn broadcast(&mut self, frame: &[u8]) -> Result<(), InterfaceError> {
        let mut bus = self.bus.lock().await;
        let Bus { stations, keep } = &mut *bus;

        for (to, station) in stations.iter().enumerate() {
            if to == self.index {
                continue;
            }
            let delivery = Delivery {
                from: self.index,
                to,
                frame,
            };
            if let Some(keep) = keep.as_mut()
                && !keep(&delivery)
            {
                trace!(from = self.index, to, "frame dropped by filter");
                continue;
            }
            match station.try_send(frame.to_vec()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(from = self.index, to, "station inbound queue full, frame lost");
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
        Ok(())
    }
}
