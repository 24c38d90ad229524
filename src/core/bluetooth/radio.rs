//! The seam between the session and a platform BLE stack.

use std::sync::Arc;

use futures_util::stream::BoxStream;
use uuid::Uuid;

use crate::core::bluetooth::error::RadioError;
use crate::core::bluetooth::types::{PeripheralId, ScanEvent};

/// Advertisement events for one scan session. The scan ends when the stream is dropped.
pub type ScanStream = BoxStream<'static, ScanEvent>;

/// A platform BLE radio
#[async_trait::async_trait]
pub trait BleRadio: Send + Sync {
    /// Start receiving advertisements, without any radio-level service filter
    async fn start_scan(&self) -> Result<ScanStream, RadioError>;

    /// Halt the radio scan. Must be a no-op when nothing is scanning.
    async fn stop_scan(&self) -> Result<(), RadioError>;

    /// Open a link to a previously discovered peripheral
    async fn connect(&self, id: &PeripheralId) -> Result<Arc<dyn PeripheralLink>, RadioError>;

    /// Cancel the link to a peripheral
    async fn disconnect(&self, id: &PeripheralId) -> Result<(), RadioError>;

    /// Release the radio at the end of the session
    async fn shutdown(&self) {}
}

/// An open link to one peripheral
#[async_trait::async_trait]
pub trait PeripheralLink: Send + Sync {
    fn id(&self) -> &PeripheralId;

    /// Discover all services and their characteristics
    async fn discover_services(&self) -> Result<(), RadioError>;

    /// Write with response to a discovered characteristic
    async fn write_with_response(&self, service: Uuid, characteristic: Uuid, value: &[u8]) -> Result<(), RadioError>;
}
