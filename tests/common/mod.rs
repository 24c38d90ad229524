//! In-memory radio and permission prompts for driving a session without hardware.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use esp32_rc_remote_lib::config::RemoteConfig;
use esp32_rc_remote_lib::core::bluetooth::{
    BleRadio, Permission, PermissionPrompter, PermissionStatus, PeripheralDescriptor, PeripheralId, PeripheralLink,
    Platform, RadioError, Rationale, ScanEvent, ScanStream, SessionState,
};
use esp32_rc_remote_lib::RemoteSession;
use futures_util::stream::{self, StreamExt};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

pub const WAIT: Duration = Duration::from_secs(2);

pub type Write = (Uuid, Uuid, Vec<u8>);

#[derive(Default)]
struct Shared {
    writes: Mutex<Vec<Write>>,
    fail_discovery: AtomicBool,
    fail_write: AtomicBool,
}

/// Scripted radio. Advertisements are pushed by the test into the running scan.
pub struct FakeRadio {
    shared: Arc<Shared>,
    scan: Mutex<Option<mpsc::UnboundedSender<ScanEvent>>>,
    scan_starts: watch::Sender<usize>,
    stop_scans: AtomicUsize,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    fail_connect: AtomicBool,
    hang_connect: AtomicBool,
    fail_disconnect: AtomicBool,
}

impl FakeRadio {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            shared: Arc::default(),
            scan: Mutex::new(None),
            scan_starts: watch::Sender::new(0),
            stop_scans: AtomicUsize::new(0),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            fail_connect: AtomicBool::new(false),
            hang_connect: AtomicBool::new(false),
            fail_disconnect: AtomicBool::new(false),
        })
    }

    /// Waits until the radio has been asked to scan `count` times in total
    pub async fn wait_for_scan(&self, count: usize) {
        let mut starts = self.scan_starts.subscribe();
        tokio::time::timeout(WAIT, starts.wait_for(|starts| *starts >= count))
            .await
            .expect("radio scan was not started in time")
            .expect("scan counter closed");
    }

    pub fn advertise(&self, device: PeripheralDescriptor) {
        self.push(ScanEvent::Discovered(device));
    }

    pub fn fail_scan(&self, error: RadioError) {
        self.push(ScanEvent::Failed(error));
    }

    /// Ends the current scan stream as the platform does when a scan times out
    pub fn end_scan(&self) {
        self.scan.lock().unwrap().take();
    }

    fn push(&self, event: ScanEvent) {
        let scan = self.scan.lock().unwrap();
        let sender = scan.as_ref().expect("no scan is running");
        sender.send(event).expect("scan stream was dropped");
    }

    pub fn scan_starts(&self) -> usize {
        *self.scan_starts.borrow()
    }

    pub fn stop_scans(&self) -> usize {
        self.stop_scans.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<Write> {
        self.shared.writes.lock().unwrap().clone()
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn set_hang_connect(&self, hang: bool) {
        self.hang_connect.store(hang, Ordering::SeqCst);
    }

    pub fn set_fail_discovery(&self, fail: bool) {
        self.shared.fail_discovery.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_disconnect(&self, fail: bool) {
        self.fail_disconnect.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_write(&self, fail: bool) {
        self.shared.fail_write.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl BleRadio for FakeRadio {
    async fn start_scan(&self) -> Result<ScanStream, RadioError> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.scan.lock().unwrap() = Some(tx);
        self.scan_starts.send_modify(|starts| *starts += 1);

        Ok(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|event| (event, rx)) }).boxed())
    }

    async fn stop_scan(&self) -> Result<(), RadioError> {
        self.stop_scans.fetch_add(1, Ordering::SeqCst);
        self.scan.lock().unwrap().take();
        Ok(())
    }

    async fn connect(&self, id: &PeripheralId) -> Result<Arc<dyn PeripheralLink>, RadioError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.hang_connect.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(RadioError::Platform("connection refused".to_string()));
        }
        Ok(Arc::new(FakeLink {
            id: id.clone(),
            shared: self.shared.clone(),
        }))
    }

    async fn disconnect(&self, _id: &PeripheralId) -> Result<(), RadioError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(RadioError::Platform("link busy".to_string()));
        }
        Ok(())
    }
}

pub struct FakeLink {
    id: PeripheralId,
    shared: Arc<Shared>,
}

#[async_trait::async_trait]
impl PeripheralLink for FakeLink {
    fn id(&self) -> &PeripheralId {
        &self.id
    }

    async fn discover_services(&self) -> Result<(), RadioError> {
        if self.shared.fail_discovery.load(Ordering::SeqCst) {
            return Err(RadioError::Platform("GATT discovery failed".to_string()));
        }
        Ok(())
    }

    async fn write_with_response(&self, service: Uuid, characteristic: Uuid, value: &[u8]) -> Result<(), RadioError> {
        if self.shared.fail_write.load(Ordering::SeqCst) {
            return Err(RadioError::Platform("write not acknowledged".to_string()));
        }
        self.shared
            .writes
            .lock()
            .unwrap()
            .push((service, characteristic, value.to_vec()));
        Ok(())
    }
}

/// Answers permission prompts from a fixed table and records what was asked
pub struct ScriptedPrompter {
    platform: Platform,
    answers: HashMap<Permission, PermissionStatus>,
    asked: Mutex<Vec<Permission>>,
}

impl ScriptedPrompter {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            answers: HashMap::new(),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Every permission not answered here is granted
    pub fn answer(mut self, permission: Permission, status: PermissionStatus) -> Self {
        self.answers.insert(permission, status);
        self
    }

    pub fn asked(&self) -> Vec<Permission> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PermissionPrompter for ScriptedPrompter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn request(&self, permission: Permission, _rationale: Rationale) -> PermissionStatus {
        self.asked.lock().unwrap().push(permission);
        self.answers
            .get(&permission)
            .copied()
            .unwrap_or(PermissionStatus::Granted)
    }
}

pub fn car(id: &str) -> PeripheralDescriptor {
    PeripheralDescriptor::new(id, Some("MyESP32Car".to_string()), None, Some(-58))
}

pub fn session_with(radio: &Arc<FakeRadio>, prompter: Arc<dyn PermissionPrompter>, config: RemoteConfig) -> RemoteSession {
    RemoteSession::new(radio.clone(), prompter, &config)
}

pub fn session(radio: &Arc<FakeRadio>) -> RemoteSession {
    session_with(
        radio,
        Arc::new(ScriptedPrompter::new(Platform::Unrestricted)),
        RemoteConfig::default(),
    )
}

/// Waits for the session state to satisfy `predicate` and returns that state
pub async fn wait_for_state(
    state: &mut watch::Receiver<SessionState>,
    predicate: impl FnMut(&SessionState) -> bool,
) -> SessionState {
    tokio::time::timeout(WAIT, state.wait_for(predicate))
        .await
        .expect("session state did not change in time")
        .expect("session was dropped")
        .clone()
}

pub fn ids(state: &SessionState) -> Vec<&str> {
    state.devices.iter().map(|device| device.id.0.as_str()).collect()
}

/// Scans and connects to a single advertised car
pub async fn connected_session(radio: &Arc<FakeRadio>, id: &str) -> RemoteSession {
    let session = session(radio);
    let mut state = session.subscribe();
    session.start_scan().await;
    radio.wait_for_scan(1).await;
    radio.advertise(car(id));
    wait_for_state(&mut state, |state| !state.devices.is_empty()).await;
    session.connect_by_id(id).await.expect("connect to the fake car");
    session
}
