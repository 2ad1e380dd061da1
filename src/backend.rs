use crate::error::Result;
use crate::models::{CameraRecord, RecordingMode};
use crate::server::SecuritySpyServer;
use async_trait::async_trait;
use std::collections::HashMap;

/// Read/command surface consumed by host integrations.
/// Camera entities poll `devices` and call back into the rest.
#[async_trait]
pub trait NvrBackend: Send + Sync {
    /// Brand shown next to each camera
    fn brand(&self) -> &str;

    /// Current camera records keyed by camera number
    fn devices(&self) -> HashMap<String, CameraRecord>;

    /// Re-read the camera list from the server
    async fn update(&self) -> Result<()>;

    async fn get_snapshot_image(&self, camera_id: &str) -> Result<Vec<u8>>;

    async fn set_camera_recording(&self, camera_id: &str, mode: RecordingMode) -> Result<bool>;

    async fn start_event_listener(&self);

    async fn stop_event_listener(&self);
}

#[async_trait]
impl NvrBackend for SecuritySpyServer {
    fn brand(&self) -> &str {
        "Ben Software"
    }

    fn devices(&self) -> HashMap<String, CameraRecord> {
        SecuritySpyServer::devices(self)
    }

    async fn update(&self) -> Result<()> {
        self.refresh_inventory().await.map(|_| ())
    }

    async fn get_snapshot_image(&self, camera_id: &str) -> Result<Vec<u8>> {
        SecuritySpyServer::get_snapshot_image(self, camera_id).await
    }

    async fn set_camera_recording(&self, camera_id: &str, mode: RecordingMode) -> Result<bool> {
        self.set_recording(camera_id, mode).await
    }

    async fn start_event_listener(&self) {
        SecuritySpyServer::start_event_listener(self).await
    }

    async fn stop_event_listener(&self) {
        SecuritySpyServer::stop_event_listener(self).await
    }
}
