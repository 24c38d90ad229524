//! Platform radio backed by bluest

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bluest::{Adapter, Characteristic, Device, Uuid};
use futures_util::StreamExt;
use log::{debug, info, warn};
use tokio::sync::{mpsc, OnceCell};
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::error::RadioError;
use crate::core::bluetooth::radio::{BleRadio, PeripheralLink, ScanStream};
use crate::core::bluetooth::types::{PeripheralDescriptor, PeripheralId, ScanEvent};

/// The process-wide adapter, opened on first use
pub struct BluestRadio {
    adapter: OnceCell<Adapter>,
    devices: Arc<Mutex<HashMap<PeripheralId, Device>>>,
    scan_cancel_token: Mutex<Option<CancellationToken>>,
}

impl BluestRadio {
    pub fn new() -> Self {
        Self {
            adapter: OnceCell::new(),
            devices: Arc::new(Mutex::new(HashMap::new())),
            scan_cancel_token: Mutex::new(None),
        }
    }

    async fn adapter(&self) -> Result<&Adapter, RadioError> {
        self.adapter
            .get_or_try_init(|| async {
                let adapter = Adapter::default().await.ok_or(RadioError::NoAdapter)?;
                adapter.wait_available().await?;
                info!("Bluetooth adapter is available.");
                Ok::<_, RadioError>(adapter)
            })
            .await
    }

    fn known_device(&self, id: &PeripheralId) -> Result<Device, RadioError> {
        self.devices
            .lock()
            .map_err(|_| RadioError::Platform("device registry poisoned".to_string()))?
            .get(id)
            .cloned()
            .ok_or_else(|| RadioError::DeviceNotFound(id.to_string()))
    }

    fn cancel_running_scan(&self) {
        if let Ok(mut token) = self.scan_cancel_token.lock() {
            if let Some(token) = token.take() {
                token.cancel();
            }
        }
    }
}

impl Default for BluestRadio {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BleRadio for BluestRadio {
    async fn start_scan(&self) -> Result<ScanStream, RadioError> {
        let adapter = self.adapter().await?.clone();
        self.cancel_running_scan();

        let cancel_token = CancellationToken::new();
        if let Ok(mut slot) = self.scan_cancel_token.lock() {
            *slot = Some(cancel_token.clone());
        }

        let devices = self.devices.clone();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut scan_stream = match adapter.scan(&[]).await {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = tx.send(ScanEvent::Failed(e.into()));
                    return;
                }
            };

            loop {
                tokio::select! {
                    result = scan_stream.next() => match result {
                        Some(discovered) => {
                            let device = discovered.device;
                            let id = PeripheralId(device.id().to_string());
                            let descriptor = PeripheralDescriptor::new(
                                id.0.clone(),
                                device.name().ok(),
                                discovered.adv_data.local_name,
                                discovered.rssi,
                            );
                            if let Ok(mut devices) = devices.lock() {
                                devices.insert(id, device);
                            }
                            if tx.send(ScanEvent::Discovered(descriptor)).is_err() {
                                break;
                            }
                        }
                        None => {
                            info!("Bluetooth scan stream has ended.");
                            break;
                        }
                    },
                    _ = cancel_token.cancelled() => break,
                    _ = tx.closed() => break,
                }
            }
            debug!("Radio scan forwarder stopped");
        });

        Ok(futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
        .boxed())
    }

    async fn stop_scan(&self) -> Result<(), RadioError> {
        self.cancel_running_scan();
        Ok(())
    }

    async fn connect(&self, id: &PeripheralId) -> Result<Arc<dyn PeripheralLink>, RadioError> {
        let adapter = self.adapter().await?;
        let device = self.known_device(id)?;

        if !device.is_connected().await {
            adapter.connect_device(&device).await?;
        }
        Ok(Arc::new(BluestLink {
            id: id.clone(),
            device,
            characteristics: tokio::sync::RwLock::new(HashMap::new()),
        }))
    }

    async fn disconnect(&self, id: &PeripheralId) -> Result<(), RadioError> {
        let adapter = self.adapter().await?;
        let device = self.known_device(id)?;
        if device.is_connected().await {
            adapter.disconnect_device(&device).await?;
            info!("Successfully disconnected");
        } else {
            info!("Device {} not connected", id);
        }
        Ok(())
    }

    async fn shutdown(&self) {
        self.cancel_running_scan();
        if let Ok(mut devices) = self.devices.lock() {
            devices.clear();
        }
    }
}

struct BluestLink {
    id: PeripheralId,
    device: Device,
    characteristics: tokio::sync::RwLock<HashMap<(Uuid, Uuid), Characteristic>>,
}

#[async_trait::async_trait]
impl PeripheralLink for BluestLink {
    fn id(&self) -> &PeripheralId {
        &self.id
    }

    async fn discover_services(&self) -> Result<(), RadioError> {
        let mut discovered = HashMap::new();
        for service in self.device.discover_services().await? {
            debug!("Available service: {}", service.uuid());
            for characteristic in service.discover_characteristics().await? {
                debug!("  characteristic: {}", characteristic.uuid());
                discovered.insert((service.uuid(), characteristic.uuid()), characteristic);
            }
        }
        info!("Discovered {} characteristics on {}", discovered.len(), self.id);
        *self.characteristics.write().await = discovered;
        Ok(())
    }

    async fn write_with_response(&self, service: Uuid, characteristic: Uuid, value: &[u8]) -> Result<(), RadioError> {
        let target = {
            let characteristics = self.characteristics.read().await;
            if !characteristics.keys().any(|(service_uuid, _)| *service_uuid == service) {
                warn!("Service {} was not discovered on {}", service, self.id);
                return Err(RadioError::ServiceNotFound {
                    device_id: self.id.to_string(),
                    service_uuid: service,
                });
            }
            characteristics.get(&(service, characteristic)).cloned()
        };

        let target = target.ok_or_else(|| RadioError::CharacteristicNotFound {
            device_id: self.id.to_string(),
            characteristic_uuid: characteristic,
        })?;
        target.write(value).await?;
        Ok(())
    }
}
