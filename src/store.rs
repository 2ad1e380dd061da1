use crate::error::{Error, Result};
use crate::events::{CameraEvent, EventKind};
use crate::inventory::InventoryCamera;
use crate::models::{CameraRecord, RecordingMode};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Outcome of one inventory merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub added: usize,
    pub updated: usize,
}

/// Camera records shared by inventory polling and the event listener.
///
/// Every operation takes the lock once, so a reader never sees a record
/// half way through a merge or an event.
#[derive(Debug, Default)]
pub struct DeviceStore {
    cameras: RwLock<HashMap<String, CameraRecord>>,
}

impl DeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts unseen cameras and refreshes the inventory-owned fields of
    /// known ones. `links` yields the RTSP and still image URIs of a new
    /// camera.
    pub fn merge_inventory<F>(&self, cameras: &[InventoryCamera], links: F) -> MergeSummary
    where
        F: Fn(&str) -> (String, String),
    {
        let mut summary = MergeSummary::default();
        let mut map = self.write();

        for camera in cameras {
            match map.get_mut(&camera.id) {
                Some(record) => {
                    record.online = camera.online;
                    record.recording_mode = camera.recording_mode();
                    record.schedule = camera.schedule;
                    summary.updated += 1;
                }
                None => {
                    let (rtsp_video, still_image) = links(&camera.id);
                    map.insert(
                        camera.id.clone(),
                        CameraRecord {
                            id: camera.id.clone(),
                            name: camera.name.clone(),
                            model: camera.model.clone(),
                            online: camera.online,
                            recording_mode: camera.recording_mode(),
                            schedule: camera.schedule,
                            rtsp_video,
                            still_image,
                            motion_sensitivity: camera.motion_sensitivity,
                            image_width: camera.image_width,
                            image_height: camera.image_height,
                            motion_last_trigger: None,
                            motion_on: false,
                            motion_trigger_type: None,
                        },
                    );
                    summary.added += 1;
                }
            }
        }

        summary
    }

    /// Applies a decoded stream event. Returns whether the record changed.
    pub fn apply_event(&self, event: &CameraEvent) -> Result<bool> {
        let mut map = self.write();
        let record = map
            .get_mut(&event.camera_id)
            .ok_or_else(|| Error::UnknownCamera(event.camera_id.clone()))?;

        match &event.kind {
            EventKind::MotionTriggered(trigger) => {
                record.motion_on = true;
                record.motion_last_trigger = Some(event.timestamp.clone());
                record.motion_trigger_type = Some(*trigger);
                Ok(true)
            }
            EventKind::FileWritten => {
                let changed = record.motion_on;
                record.motion_on = false;
                Ok(changed)
            }
            EventKind::Other(_) => Ok(false),
        }
    }

    pub fn set_recording_mode(&self, camera_id: &str, mode: RecordingMode) -> Result<()> {
        let mut map = self.write();
        let record = map
            .get_mut(camera_id)
            .ok_or_else(|| Error::UnknownCamera(camera_id.to_string()))?;
        record.recording_mode = mode;
        Ok(())
    }

    pub fn get(&self, camera_id: &str) -> Option<CameraRecord> {
        self.read().get(camera_id).cloned()
    }

    pub fn contains(&self, camera_id: &str) -> bool {
        self.read().contains_key(camera_id)
    }

    pub fn snapshot(&self) -> HashMap<String, CameraRecord> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Poisoning is ignored: mutations above are plain field assignments.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CameraRecord>> {
        self.cameras.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CameraRecord>> {
        self.cameras.write().unwrap_or_else(PoisonError::into_inner)
    }
}
