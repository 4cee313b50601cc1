// ── Polling coordinator ──
//
// Single owner of a device's current known state. Every exchange with the
// appliance (scheduled poll, manual refresh, action, out-of-band publish)
// runs under one update lock; readers load the published snapshot through
// an atomic pointer and never wait on the network.

use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ventaly_api::{ApiVersion, DialectDefinition, Payload};

use crate::action::ControlAction;
use crate::config::CoordinatorConfig;
use crate::device::Device;
use crate::error::CoreError;
use crate::model::{DeviceInfo, DeviceSnapshot};

/// Bookkeeping published alongside every snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateState {
    /// Bumped once per published snapshot.
    pub version: u64,
    pub last_update_success: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Polls one device on a fixed interval and publishes its snapshots.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Call
/// [`first_refresh()`](Self::first_refresh) once during setup, then
/// [`start()`](Self::start) to begin background polling.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    /// Update lock. At most one exchange with the appliance at a time.
    device: Mutex<Device>,
    snapshot: ArcSwap<DeviceSnapshot>,
    state: watch::Sender<UpdateState>,
    refresh_requested: Arc<Notify>,
    cancel: CancellationToken,
    /// Child token for the current polling run; replaced on restart.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    polling: AtomicBool,
}

impl Coordinator {
    pub fn new(device: Device, config: CoordinatorConfig) -> Self {
        let (state, _) = watch::channel(UpdateState::default());
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                device: Mutex::new(device),
                snapshot: ArcSwap::from_pointee(DeviceSnapshot::empty()),
                state,
                refresh_requested: Arc::new(Notify::new()),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
                polling: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// The last published snapshot. The empty sentinel until the first
    /// successful poll.
    pub fn data(&self) -> Arc<DeviceSnapshot> {
        self.inner.snapshot.load_full()
    }

    /// Subscribe to update bookkeeping. Changes on every publish and every
    /// failed poll.
    pub fn state(&self) -> watch::Receiver<UpdateState> {
        self.inner.state.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.inner.polling.load(Ordering::Acquire)
    }

    pub async fn api_version(&self) -> Option<ApiVersion> {
        self.inner.device.lock().await.api_version()
    }

    /// Summary of the device for display, once it has been initialized.
    pub async fn device_info(&self) -> Option<DeviceInfo> {
        let device = self.inner.device.lock().await;
        let identity = device.identity()?;
        Some(DeviceInfo::new(identity, &self.data()))
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// The eager poll run during setup. Fails unless it leaves real data
    /// published.
    pub async fn first_refresh(&self) -> Result<(), CoreError> {
        self.refresh().await?;
        if self.data().is_empty() {
            return Err(CoreError::UpdateFailed {
                message: "device returned no data".into(),
            });
        }
        Ok(())
    }

    /// Poll the device once. Returns whether a new snapshot was published.
    ///
    /// An empty reply keeps the previous snapshot. A failed poll keeps it
    /// too and surfaces as [`CoreError::UpdateFailed`].
    pub async fn refresh(&self) -> Result<bool, CoreError> {
        let device = self.inner.device.lock().await;
        let result = with_deadline(self.inner.config.poll_timeout, device.status()).await;

        match result {
            Ok(snapshot) if snapshot.is_empty() => {
                debug!(host = device.host(), "poll returned no data, keeping previous snapshot");
                Ok(false)
            }
            Ok(snapshot) => {
                self.publish(snapshot);
                Ok(true)
            }
            Err(e) => {
                if e.is_unreachable() {
                    debug!(host = device.host(), error = %e, "device unreachable, keeping last known data");
                } else {
                    debug!(host = device.host(), error = %e, "poll failed");
                }
                self.inner.state.send_modify(|state| {
                    state.last_update_success = false;
                    state.last_error = Some(e.to_string());
                });
                Err(CoreError::update_failed(&e))
            }
        }
    }

    /// Ask for an out-of-band poll soon. Wakes the polling task when one is
    /// running, otherwise polls inline.
    pub async fn request_refresh(&self) {
        if self.is_polling() {
            self.inner.refresh_requested.notify_one();
            return;
        }
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "requested refresh failed");
        }
    }

    /// Publish a snapshot obtained out of band. Serialized with polling;
    /// the empty sentinel is ignored.
    pub async fn set_updated_data(&self, snapshot: DeviceSnapshot) {
        let _device = self.inner.device.lock().await;
        if snapshot.is_empty() {
            debug!("ignoring empty out-of-band snapshot");
            return;
        }
        self.publish(snapshot);
    }

    /// Re-run dialect detection and init, publishing the init snapshot.
    pub async fn redetect(
        &self,
        version: Option<ApiVersion>,
    ) -> Result<&'static DialectDefinition, CoreError> {
        let mut device = self.inner.device.lock().await;
        let dialect = device.detect_api(version).await?;
        let snapshot = device.init().await?;
        self.publish(snapshot);
        Ok(dialect)
    }

    // ── Actions ──────────────────────────────────────────────────────

    /// Send a pre-rendered action body, then refresh after the grace delay.
    pub async fn action(&self, body: &Payload) -> Result<DeviceSnapshot, CoreError> {
        let reply = {
            let device = self.inner.device.lock().await;
            with_deadline(self.inner.config.poll_timeout, device.action(body)).await?
        };
        self.after_action().await;
        Ok(reply)
    }

    /// Render `action` for the active dialect and send it. V3 bodies echo
    /// the state held in the current snapshot.
    pub async fn control(&self, action: &ControlAction) -> Result<DeviceSnapshot, CoreError> {
        if action.is_empty() {
            return Err(CoreError::Unsupported {
                operation: "control".into(),
                reason: "no fields set".into(),
            });
        }

        let reply = {
            let device = self.inner.device.lock().await;
            let version = device.api_version().ok_or_else(|| CoreError::NotConfigured {
                message: format!("no API dialect selected for {}", device.host()),
            })?;
            let current = self.data();
            let echoed = (!current.is_empty()).then_some(&current.action);
            let body = action.render(version, echoed);

            debug!(host = device.host(), %version, ?body, "sending control action");
            with_deadline(self.inner.config.poll_timeout, device.action(&body)).await?
        };
        self.after_action().await;
        Ok(reply)
    }

    async fn after_action(&self) {
        tokio::time::sleep(self.inner.config.action_grace).await;
        self.request_refresh().await;
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the background polling task. No-op when already running.
    pub async fn start(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            debug!("polling already running");
            return;
        }

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();
        self.inner.polling.store(true, Ordering::Release);

        let interval = self.inner.config.update_interval;
        handles.push(tokio::spawn(poll_task(
            Arc::downgrade(&self.inner),
            Arc::clone(&self.inner.refresh_requested),
            interval,
            child,
        )));
        info!(interval_secs = interval.as_secs(), "polling started");
    }

    /// Stop background polling and wait for the task to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        self.inner.polling.store(false, Ordering::Release);
        debug!("polling stopped");
    }

    // ── Helpers ──────────────────────────────────────────────────────

    /// Swap in `snapshot` and bump the state version. Callers hold the
    /// update lock.
    fn publish(&self, snapshot: DeviceSnapshot) {
        let updated = snapshot.fetched_at.unwrap_or_else(Utc::now);
        self.inner.snapshot.store(Arc::new(snapshot));
        self.inner.state.send_modify(|state| {
            state.version += 1;
            state.last_update_success = true;
            state.last_updated = Some(updated);
            state.last_error = None;
        });
    }
}

async fn with_deadline<T>(
    budget: Duration,
    fut: impl Future<Output = Result<T, CoreError>>,
) -> Result<T, CoreError> {
    tokio::time::timeout(budget, fut)
        .await
        .map_err(|_| CoreError::Timeout {
            timeout_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
        })?
}

impl Drop for CoordinatorInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background task ──────────────────────────────────────────────────

/// Polls until cancelled or until every `Coordinator` handle is gone. Only
/// a weak reference is held between polls.
async fn poll_task(
    inner: Weak<CoordinatorInner>,
    refresh_requested: Arc<Notify>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = refresh_requested.notified() => {
                if !refresh_if_alive(&inner, "requested").await {
                    break;
                }
                interval.reset();
            }
            _ = interval.tick() => {
                if !refresh_if_alive(&inner, "periodic").await {
                    break;
                }
            }
        }
    }
    debug!("poll task finished");
}

/// Returns false once the coordinator has been dropped.
async fn refresh_if_alive(inner: &Weak<CoordinatorInner>, trigger: &'static str) -> bool {
    let Some(inner) = inner.upgrade() else {
        return false;
    };
    if let Err(e) = (Coordinator { inner }).refresh().await {
        warn!(error = %e, trigger, "refresh failed");
    }
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;

    fn unconfigured() -> Coordinator {
        let device = Device::new(DeviceConfig::new("10.0.0.2")).unwrap();
        Coordinator::new(device, CoordinatorConfig::default())
    }

    #[tokio::test]
    async fn starts_with_empty_snapshot() {
        let coordinator = unconfigured();
        assert!(coordinator.data().is_empty());
        assert_eq!(*coordinator.state().borrow(), UpdateState::default());
    }

    #[tokio::test]
    async fn failed_poll_is_reported_as_update_failed() {
        let coordinator = unconfigured();

        let err = coordinator.refresh().await.unwrap_err();

        assert!(matches!(err, CoreError::UpdateFailed { .. }));
        let state = coordinator.state().borrow().clone();
        assert!(!state.last_update_success);
        assert!(state.last_error.is_some());
        assert_eq!(state.version, 0);
    }

    #[tokio::test]
    async fn empty_out_of_band_snapshot_is_ignored() {
        let coordinator = unconfigured();
        coordinator.set_updated_data(DeviceSnapshot::empty()).await;
        assert_eq!(coordinator.state().borrow().version, 0);
    }

    #[tokio::test]
    async fn empty_control_action_is_rejected() {
        let coordinator = unconfigured();
        let err = coordinator.control(&ControlAction::default()).await.unwrap_err();
        assert!(matches!(err, CoreError::Unsupported { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_polling() {
        let coordinator = Coordinator::new(
            Device::new(DeviceConfig::new("10.0.0.2")).unwrap(),
            CoordinatorConfig::with_interval(Duration::from_secs(5)),
        );

        coordinator.start().await;
        assert!(coordinator.is_polling());
        coordinator.shutdown().await;
        assert!(!coordinator.is_polling());
    }
}
