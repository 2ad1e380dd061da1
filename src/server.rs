use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::events::EventListener;
use crate::inventory::parse_inventory;
use crate::models::{CameraRecord, RecordingMode};
use crate::store::{DeviceStore, MergeSummary};
use crate::transport::Transport;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Client for one SecuritySpy server
pub struct SecuritySpyServer {
    transport: Transport,
    store: Arc<DeviceStore>,
    listener: Mutex<Option<EventListener>>,
    idle_timeout: Option<Duration>,
    chunk_size: usize,
}

impl SecuritySpyServer {
    /// Creates a client without contacting the server.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        Ok(SecuritySpyServer {
            transport: Transport::new(config)?,
            store: Arc::new(DeviceStore::new()),
            listener: Mutex::new(None),
            idle_timeout: config.event_idle_timeout(),
            chunk_size: config.event_chunk_size,
        })
    }

    /// Creates a client, loads the camera list and starts the event
    /// listener.
    pub async fn connect(config: &ServerConfig) -> Result<Self> {
        let server = Self::new(config)?;
        server.refresh_inventory().await?;
        server.start_event_listener().await;
        Ok(server)
    }

    pub async fn refresh_inventory(&self) -> Result<MergeSummary> {
        let raw = self.transport.fetch_inventory_xml().await?;
        let cameras = parse_inventory(&raw)?;

        let transport = &self.transport;
        let summary = self.store.merge_inventory(&cameras, |id| {
            (transport.rtsp_url(id), transport.snapshot_url(id))
        });
        debug!(
            "[Inventory] {} camera(s): {} added, {} updated",
            cameras.len(),
            summary.added,
            summary.updated
        );
        Ok(summary)
    }

    /// Same as [`refresh_inventory`](Self::refresh_inventory).
    pub async fn update(&self) -> Result<MergeSummary> {
        self.refresh_inventory().await
    }

    pub fn devices(&self) -> HashMap<String, CameraRecord> {
        self.store.snapshot()
    }

    pub fn list_devices(&self) -> Vec<CameraRecord> {
        let mut devices: Vec<CameraRecord> = self.store.snapshot().into_values().collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }

    pub fn device(&self, camera_id: &str) -> Option<CameraRecord> {
        self.store.get(camera_id)
    }

    pub async fn get_snapshot_image(&self, camera_id: &str) -> Result<Vec<u8>> {
        self.transport.fetch_snapshot(camera_id).await
    }

    /// Changes the recording mode on the server, then in the local store.
    pub async fn set_recording(&self, camera_id: &str, mode: RecordingMode) -> Result<bool> {
        if !self.store.contains(camera_id) {
            return Err(Error::UnknownCamera(camera_id.to_string()));
        }

        self.transport.set_recording_mode(camera_id, mode).await?;
        self.store.set_recording_mode(camera_id, mode)?;
        info!("[Recording] Camera {} set to {}", camera_id, mode);
        Ok(true)
    }

    /// Accepts `never`, `motion` or `always`. Any other value is treated
    /// as `never`.
    pub async fn set_camera_recording(&self, camera_id: &str, mode: &str) -> Result<bool> {
        let mode = mode.parse::<RecordingMode>().unwrap_or_else(|e: Error| {
            warn!("[Recording] {}, using never", e);
            RecordingMode::Never
        });
        self.set_recording(camera_id, mode).await
    }

    pub async fn enable_motion_detection(&self, camera_id: &str) -> Result<bool> {
        self.set_recording(camera_id, RecordingMode::Motion).await
    }

    pub async fn disable_motion_detection(&self, camera_id: &str) -> Result<bool> {
        self.set_recording(camera_id, RecordingMode::Never).await
    }

    /// Starts the event listener unless one is already running.
    pub async fn start_event_listener(&self) {
        let mut slot = self.listener.lock().await;
        if let Some(listener) = slot.as_ref() {
            if listener.is_running() {
                debug!("[Events] Listener already running");
                return;
            }
        }

        // Reap a listener that died on its own before replacing it.
        if let Some(dead) = slot.take() {
            if let Err(e) = dead.stop().await {
                info!("[Events] Previous listener ended: {}", e);
            }
        }

        *slot = Some(EventListener::spawn(
            self.transport.clone(),
            self.store.clone(),
            self.idle_timeout,
            self.chunk_size,
        ));
    }

    /// Stops the event listener and waits until its task has exited.
    pub async fn stop_event_listener(&self) {
        let listener = self.listener.lock().await.take();
        if let Some(listener) = listener {
            if let Err(e) = listener.stop().await {
                info!("[Events] Listener had already ended: {}", e);
            }
        }
    }

    pub async fn is_event_listener_running(&self) -> bool {
        self.listener
            .lock()
            .await
            .as_ref()
            .map_or(false, EventListener::is_running)
    }
}
