//! Runtime permission negotiation
//! Resolves the platform permissions BLE scanning needs before it may start.

use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::core::bluetooth::constants::ANDROID_SPLIT_PERMISSIONS_API_LEVEL;
use crate::core::bluetooth::error::{BleError, Result};

/// Permissions the remote may ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    BluetoothScan,
    BluetoothConnect,
    AccessFineLocation,
}

impl Permission {
    /// Android manifest name of the permission
    pub fn android_name(&self) -> &'static str {
        match self {
            Self::BluetoothScan => "android.permission.BLUETOOTH_SCAN",
            Self::BluetoothConnect => "android.permission.BLUETOOTH_CONNECT",
            Self::AccessFineLocation => "android.permission.ACCESS_FINE_LOCATION",
        }
    }

    /// Text shown alongside the OS prompt
    pub fn rationale(&self) -> Rationale {
        match self {
            Self::BluetoothScan => Rationale {
                title: "Bluetooth Scan Permission",
                message: "Bluetooth Low Energy requires Scan permission",
                button_positive: "OK",
            },
            Self::BluetoothConnect => Rationale {
                title: "Bluetooth Connect Permission",
                message: "Bluetooth Low Energy requires Connect permission",
                button_positive: "OK",
            },
            Self::AccessFineLocation => Rationale {
                title: "Location Permission",
                message: "Bluetooth Low Energy requires Location",
                button_positive: "OK",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rationale {
    pub title: &'static str,
    pub message: &'static str,
    pub button_positive: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    Granted,
    Denied,
    NeverAskAgain,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Platform the negotiator runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Android with its runtime permission model. `None` when the API level is unknown.
    Android { api_level: Option<u32> },
    /// Any platform without runtime permission prompts
    Unrestricted,
}

impl Platform {
    /// Permissions that must all be granted before scanning
    pub fn required_permissions(&self) -> Vec<Permission> {
        match self {
            Self::Unrestricted => Vec::new(),
            Self::Android { api_level } => {
                if api_level.is_some_and(|level| level >= ANDROID_SPLIT_PERMISSIONS_API_LEVEL) {
                    vec![
                        Permission::BluetoothScan,
                        Permission::BluetoothConnect,
                        Permission::AccessFineLocation,
                    ]
                } else {
                    vec![Permission::AccessFineLocation]
                }
            }
        }
    }
}

/// Shows OS permission dialogs. Any caching of answers is the OS's business.
#[async_trait::async_trait]
pub trait PermissionPrompter: Send + Sync {
    fn platform(&self) -> Platform;

    async fn request(&self, permission: Permission, rationale: Rationale) -> PermissionStatus;
}

/// Prompter for hosts where BLE needs no runtime grant
#[derive(Debug, Default, Clone)]
pub struct HostPermissions;

#[async_trait::async_trait]
impl PermissionPrompter for HostPermissions {
    fn platform(&self) -> Platform {
        Platform::Unrestricted
    }

    async fn request(&self, _permission: Permission, _rationale: Rationale) -> PermissionStatus {
        PermissionStatus::Granted
    }
}

#[derive(Clone)]
pub struct PermissionNegotiator {
    prompter: Arc<dyn PermissionPrompter>,
}

impl PermissionNegotiator {
    pub fn new(prompter: Arc<dyn PermissionPrompter>) -> Self {
        Self { prompter }
    }

    /// Prompts for every required permission, in order, without retrying.
    /// Fails with the permissions that were not granted.
    pub async fn negotiate(&self) -> Result<()> {
        let platform = self.prompter.platform();
        let required = platform.required_permissions();
        if required.is_empty() {
            return Ok(());
        }

        info!("Requesting permissions for {:?}: {:?}", platform, required);
        let mut denied = Vec::new();
        for permission in required {
            let status = self.prompter.request(permission, permission.rationale()).await;
            if !status.is_granted() {
                warn!("Permission {} was not granted: {:?}", permission.android_name(), status);
                denied.push(permission);
            }
        }

        if denied.is_empty() {
            Ok(())
        } else {
            Err(BleError::PermissionDenied(denied))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct ScriptedPrompter {
        platform: Platform,
        answers: HashMap<Permission, PermissionStatus>,
        asked: Mutex<Vec<Permission>>,
    }

    impl ScriptedPrompter {
        fn new(platform: Platform, answers: &[(Permission, PermissionStatus)]) -> Arc<Self> {
            Arc::new(Self {
                platform,
                answers: answers.iter().copied().collect(),
                asked: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl PermissionPrompter for ScriptedPrompter {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn request(&self, permission: Permission, _rationale: Rationale) -> PermissionStatus {
            self.asked.lock().unwrap().push(permission);
            self.answers.get(&permission).copied().unwrap_or(PermissionStatus::Denied)
        }
    }

    #[tokio::test]
    async fn unrestricted_platform_never_prompts() {
        let negotiator = PermissionNegotiator::new(Arc::new(HostPermissions));
        assert!(negotiator.negotiate().await.is_ok());
    }

    #[tokio::test]
    async fn legacy_android_asks_only_for_location() {
        let prompter = ScriptedPrompter::new(
            Platform::Android { api_level: Some(30) },
            &[(Permission::AccessFineLocation, PermissionStatus::Denied)],
        );
        let negotiator = PermissionNegotiator::new(prompter.clone());

        assert!(negotiator.negotiate().await.is_err());
        assert_eq!(*prompter.asked.lock().unwrap(), vec![Permission::AccessFineLocation]);
    }

    #[tokio::test]
    async fn unknown_api_level_uses_legacy_permissions() {
        let prompter = ScriptedPrompter::new(
            Platform::Android { api_level: None },
            &[(Permission::AccessFineLocation, PermissionStatus::Granted)],
        );
        assert!(PermissionNegotiator::new(prompter.clone()).negotiate().await.is_ok());
        assert_eq!(prompter.asked.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn partial_grant_prompts_all_and_reports_denied() {
        let prompter = ScriptedPrompter::new(
            Platform::Android { api_level: Some(33) },
            &[
                (Permission::BluetoothScan, PermissionStatus::Granted),
                (Permission::BluetoothConnect, PermissionStatus::NeverAskAgain),
                (Permission::AccessFineLocation, PermissionStatus::Granted),
            ],
        );
        let negotiator = PermissionNegotiator::new(prompter.clone());

        match negotiator.negotiate().await {
            Err(BleError::PermissionDenied(denied)) => {
                assert_eq!(denied, vec![Permission::BluetoothConnect])
            }
            other => panic!("expected PermissionDenied, got {:?}", other),
        }
        assert_eq!(
            *prompter.asked.lock().unwrap(),
            vec![
                Permission::BluetoothScan,
                Permission::BluetoothConnect,
                Permission::AccessFineLocation
            ]
        );
    }
}
