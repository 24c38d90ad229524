use std::sync::Arc;

use futures_util::StreamExt;
use log::{debug, error, info};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::device::NameFilter;
use crate::core::bluetooth::error::BleError;
use crate::core::bluetooth::radio::{BleRadio, ScanStream};
use crate::core::bluetooth::types::{PeripheralDescriptor, ScanEvent, SessionEvent, SessionState};

struct ScanTask {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct DeviceScanner {
    radio: Arc<dyn BleRadio>,
    state: Arc<watch::Sender<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
    filter: NameFilter,
    task: Mutex<Option<ScanTask>>,
}

impl DeviceScanner {
    pub fn new(
        radio: Arc<dyn BleRadio>,
        state: Arc<watch::Sender<SessionState>>,
        events: broadcast::Sender<SessionEvent>,
        filter: NameFilter,
    ) -> Self {
        Self {
            radio,
            state,
            events,
            filter,
            task: Mutex::new(None),
        }
    }

    /// Starts a fresh scan. The device list is empty and the scanning flag set
    /// by the time this returns, before any advertisement is processed.
    pub async fn start_scan(&self) {
        let mut task = self.task.lock().await;
        if let Some(previous) = task.take() {
            info!("Restarting scan, cancelling the previous scan task.");
            previous.cancel_token.cancel();
            let _ = previous.handle.await;
        }

        self.state.send_modify(|state| {
            state.scanning = true;
            state.devices.clear();
        });
        let _ = self.events.send(SessionEvent::ScanStart);

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(Self::internal_scan_task(
            self.radio.clone(),
            self.state.clone(),
            self.events.clone(),
            self.filter.clone(),
            cancel_token.clone(),
        ));
        *task = Some(ScanTask { cancel_token, handle });
        info!("Device scan task started.");
    }

    async fn internal_scan_task(
        radio: Arc<dyn BleRadio>,
        state: Arc<watch::Sender<SessionState>>,
        events: broadcast::Sender<SessionEvent>,
        filter: NameFilter,
        cancel_token: CancellationToken,
    ) {
        info!("Starting bluetooth scan");
        let mut scan_stream: ScanStream = tokio::select! {
            result = radio.start_scan() => match result {
                Ok(stream) => stream,
                Err(e) => {
                    Self::fail_scan(&state, &events, BleError::Scan(e));
                    return;
                }
            },
            _ = cancel_token.cancelled() => return,
        };

        loop {
            tokio::select! {
                event = scan_stream.next() => match event {
                    Some(ScanEvent::Discovered(device)) => {
                        debug!("Found device - {:?}", device);
                        if filter.accepts(&device) {
                            Self::record_device(&state, &events, device);
                        }
                    }
                    Some(ScanEvent::Failed(e)) => {
                        Self::fail_scan(&state, &events, BleError::Scan(e));
                        break;
                    }
                    None => {
                        info!("Bluetooth scan stream has ended.");
                        state.send_if_modified(|state| std::mem::replace(&mut state.scanning, false));
                        let _ = events.send(SessionEvent::ScanComplete);
                        break;
                    }
                },
                _ = cancel_token.cancelled() => break,
            }
        }
    }

    /// Appends the device unless its id is already listed. The check runs
    /// against the current state inside the update, not a captured copy.
    fn record_device(
        state: &watch::Sender<SessionState>,
        events: &broadcast::Sender<SessionEvent>,
        device: PeripheralDescriptor,
    ) {
        let added = state.send_if_modified(|state| {
            if state.find_device(&device.id).is_some() {
                return false;
            }
            state.devices.push(device.clone());
            true
        });
        if added {
            info!(
                "Found RC car device: ID: {}, Name: {:?}, Address: {:?}, RSSI: {:?}",
                device.id,
                device.effective_name(),
                device.address,
                device.rssi
            );
            let _ = events.send(SessionEvent::DeviceFound(device));
        }
    }

    fn fail_scan(state: &watch::Sender<SessionState>, events: &broadcast::Sender<SessionEvent>, e: BleError) {
        error!("Scan error: {}", e);
        state.send_if_modified(|state| std::mem::replace(&mut state.scanning, false));
        let _ = events.send(SessionEvent::ScanFailed(e.to_string()));
    }

    /// Stops scanning and clears the scanning flag. Calling it while idle does nothing harmful.
    pub async fn stop_scan(&self) {
        info!("Stopping Bluetooth scan.");
        let task = self.task.lock().await.take();

        if let Some(task) = task {
            task.cancel_token.cancel();
            info!("Waiting for scan task to finish...");
            if let Err(e) = task.handle.await {
                if e.is_cancelled() {
                    info!("Scan task was cancelled successfully.");
                } else {
                    error!("Scan task finished with an unexpected join error: {:?}", e);
                }
            }
        } else {
            debug!("No active scan task handle found to wait for.");
        }

        if let Err(e) = self.radio.stop_scan().await {
            error!("Failed to stop the radio scan: {}", e);
        }

        let was_scanning = self
            .state
            .send_if_modified(|state| std::mem::replace(&mut state.scanning, false));
        if was_scanning {
            let _ = self.events.send(SessionEvent::StopScanComplete);
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.state.borrow().scanning
    }
}
