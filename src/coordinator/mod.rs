//! Poll, cache and fan-out coordinator.
//!
//! One [`Coordinator`] exists per configured device. It owns the latest
//! status, runs the periodic BLE poll, and pushes every new snapshot to all
//! live subscribers without ever waiting on them.
//!
//! Polls are serialized per device: the periodic loop and on-demand refreshes
//! share one session lock, so at most one BLE session is open at a time.

pub mod cache;
pub mod health;
pub mod subscribers;

pub use cache::StatusCache;
pub use health::PollHealth;
pub use subscribers::{Mailbox, Payload, SubscriberRegistry, Subscription};

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::ble::DeviceReader;
use crate::config::{validate_interval, DeviceConfig};
use crate::data::{DeviceType, StatusSnapshot};
use crate::error::Result;

/// Options that may change while the coordinator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Time between polls.
    pub interval: Duration,
    /// Kind of device, cosmetic.
    pub device_type: DeviceType,
}

/// State shared between the coordinator handle and its poll task.
struct Shared {
    address: String,
    options: RwLock<PollOptions>,
    reader: Arc<dyn DeviceReader>,
    cache: StatusCache,
    subscribers: Arc<SubscriberRegistry>,
    health: RwLock<PollHealth>,
    /// Held for the duration of one BLE session.
    session: Mutex<()>,
}

impl Shared {
    async fn refresh(&self) -> Result<Arc<StatusSnapshot>> {
        let _session = self.session.lock().await;

        match self.reader.read(&self.address).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.cache.set(snapshot.clone());
                self.health.write().record_success();

                let delivered = self.subscribers.publish(Arc::new(snapshot.to_payload()));
                debug!(
                    "Polled {}: {:?} (delivered to {} subscribers)",
                    self.address, snapshot, delivered
                );

                Ok(snapshot)
            }
            Err(e) => {
                warn!("Failed to poll {}: {}", self.address, e);
                self.health.write().record_failure(&e);
                Err(e)
            }
        }
    }
}

/// Handle to a running poll loop.
struct PollTask {
    handle: JoinHandle<()>,
    running: Arc<AtomicBool>,
    stop: Arc<Notify>,
}

impl PollTask {
    /// Spawn a loop whose first tick fires one `interval` from now.
    fn spawn(shared: Arc<Shared>, interval: Duration) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let stop = Arc::new(Notify::new());

        let handle = tokio::spawn(Self::run(shared, interval, running.clone(), stop.clone()));

        Self {
            handle,
            running,
            stop,
        }
    }

    async fn run(shared: Arc<Shared>, interval: Duration, running: Arc<AtomicBool>, stop: Arc<Notify>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!("Poll loop for {} started ({:?})", shared.address, interval);

        loop {
            tokio::select! {
                _ = stop.notified() => break,
                _ = ticker.tick() => {}
            }

            if !running.load(Ordering::SeqCst) {
                break;
            }

            // Failures are recorded in health; the next tick retries.
            let _ = shared.refresh().await;
        }

        debug!("Poll loop for {} ended", shared.address);
    }

    /// Signal the loop without waiting for it.
    fn signal_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop.notify_one();
    }

    /// Stop the loop. An in-flight poll finishes; no further tick fires.
    async fn stop(self) {
        self.signal_stop();
        let _ = self.handle.await;
    }
}

/// Coordinates polling, caching and fan-out for one device.
pub struct Coordinator {
    shared: Arc<Shared>,
    poll_task: Mutex<Option<PollTask>>,
    /// Set by `shutdown`; no on-demand polls after that.
    stopped: AtomicBool,
}

impl Coordinator {
    /// Validate `config`, run the first poll and start the poll loop.
    ///
    /// The first poll is awaited; if it fails the failure is recorded in
    /// [`health`](Self::health) and startup still succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] for a missing address or an interval
    /// outside 5..=300 seconds. The reader is not called in that case.
    pub async fn start(config: DeviceConfig, reader: Arc<dyn DeviceReader>) -> Result<Self> {
        config.validate()?;

        let options = PollOptions {
            interval: config.poll_interval(),
            device_type: config.device_type,
        };
        let shared = Arc::new(Shared {
            address: config.address.trim().to_string(),
            options: RwLock::new(options),
            reader,
            cache: StatusCache::new(),
            subscribers: Arc::new(SubscriberRegistry::new()),
            health: RwLock::new(PollHealth::default()),
            session: Mutex::new(()),
        });

        info!(
            "Starting {} coordinator for {} (every {:?})",
            options.device_type.model_name(),
            shared.address,
            options.interval
        );

        if let Err(e) = shared.refresh().await {
            warn!("First poll of {} failed, continuing: {}", shared.address, e);
        }

        let task = PollTask::spawn(shared.clone(), options.interval);

        Ok(Self {
            shared,
            poll_task: Mutex::new(Some(task)),
            stopped: AtomicBool::new(false),
        })
    }

    /// Address of the polled device.
    pub fn address(&self) -> &str {
        &self.shared.address
    }

    /// Current poll options.
    pub fn options(&self) -> PollOptions {
        *self.shared.options.read()
    }

    /// The latest snapshot, or `None` before the first successful poll.
    pub fn latest(&self) -> Option<Arc<StatusSnapshot>> {
        self.shared.cache.get()
    }

    /// The latest snapshot; polls immediately if none is cached yet and the
    /// coordinator has not been shut down.
    pub async fn latest_or_refresh(&self) -> Option<Arc<StatusSnapshot>> {
        if let Some(snapshot) = self.latest() {
            return Some(snapshot);
        }
        if self.stopped.load(Ordering::SeqCst) {
            return None;
        }

        if let Err(e) = self.refresh().await {
            debug!("On-demand poll of {} failed: {}", self.shared.address, e);
        }
        self.latest()
    }

    /// Poll the device now, outside the regular schedule.
    ///
    /// On success the cache is updated and subscribers notified, exactly as
    /// for a scheduled poll. On failure the cache is left untouched.
    pub async fn refresh(&self) -> Result<Arc<StatusSnapshot>> {
        self.shared.refresh().await
    }

    /// Outcome history of the poll loop.
    pub fn health(&self) -> PollHealth {
        self.shared.health.read().clone()
    }

    /// Register a live subscriber. The subscription only sees snapshots
    /// published from now on and unregisters itself when dropped.
    pub fn subscribe(&self) -> Subscription {
        self.shared.subscribers.subscribe_guarded()
    }

    /// Explicitly unregister a mailbox. Idempotent.
    pub fn unsubscribe(&self, mailbox: &Mailbox) {
        self.shared.subscribers.unsubscribe(mailbox);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }

    /// Whether the poll loop is active.
    pub async fn is_polling(&self) -> bool {
        self.poll_task.lock().await.is_some()
    }

    /// Change the poll interval and device type.
    ///
    /// The running loop is stopped (an in-flight poll may finish) and a new
    /// one started with the new interval. After [`shutdown`](Self::shutdown)
    /// only the stored options change.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the interval is out of range; the
    /// running loop is left untouched.
    pub async fn reconfigure(&self, scan_interval: u64, device_type: DeviceType) -> Result<()> {
        let interval = validate_interval(scan_interval)?;

        let mut poll_task = self.poll_task.lock().await;
        let was_running = match poll_task.take() {
            Some(task) => {
                task.stop().await;
                true
            }
            None => false,
        };

        *self.shared.options.write() = PollOptions {
            interval,
            device_type,
        };

        info!(
            "Reconfigured {}: every {:?}, {}",
            self.shared.address, interval, device_type
        );

        if was_running {
            *poll_task = Some(PollTask::spawn(self.shared.clone(), interval));
        }

        Ok(())
    }

    /// Stop polling and release every subscriber.
    ///
    /// Waiting consumers are woken and see their stream end. Later
    /// subscriptions are closed from the start.
    pub async fn shutdown(&self) {
        info!("Shutting down coordinator for {}", self.shared.address);
        self.stopped.store(true, Ordering::SeqCst);

        if let Some(task) = self.poll_task.lock().await.take() {
            task.stop().await;
        }

        self.shared.subscribers.close_all();
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if let Some(task) = self.poll_task.get_mut().take() {
            task.signal_stop();
        }
        self.shared.subscribers.close_all();
    }
}
