use crate::error::Error;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Arming state of a camera as exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingMode {
    Never,
    Motion,
    Always,
}

impl RecordingMode {
    /// Continuous arming takes precedence over motion arming.
    pub fn from_schedule(schedule: &ScheduleFlags) -> Self {
        if schedule.continuous {
            RecordingMode::Always
        } else if schedule.motion {
            RecordingMode::Motion
        } else {
            RecordingMode::Never
        }
    }

    /// `schedule` and `mode` query parameters of `++setSchedule`.
    pub fn wire_params(&self) -> (u8, &'static str) {
        match self {
            RecordingMode::Motion => (1, "M"),
            RecordingMode::Always => (1, "C"),
            RecordingMode::Never => (0, "M"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingMode::Never => "never",
            RecordingMode::Motion => "motion",
            RecordingMode::Always => "always",
        }
    }
}

impl fmt::Display for RecordingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never" => Ok(RecordingMode::Never),
            "motion" => Ok(RecordingMode::Motion),
            "always" => Ok(RecordingMode::Always),
            other => Err(Error::InvalidModeArgument(other.to_string())),
        }
    }
}

/// What caused a motion event, decoded from the event bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerType {
    #[serde(rename = "Video motion detection")]
    VideoMotion,
    #[serde(rename = "Audio detection")]
    Audio,
    #[serde(rename = "AppleScript")]
    AppleScript,
    #[serde(rename = "Camera event")]
    CameraEvent,
    #[serde(rename = "Web server event")]
    WebServerEvent,
    #[serde(rename = "Triggered by another camera")]
    OtherCamera,
    #[serde(rename = "Manual trigger")]
    Manual,
    #[serde(rename = "Human")]
    Human,
    #[serde(rename = "Vehicle")]
    Vehicle,
}

const TRIGGER_TABLE: [(u32, TriggerType); 9] = [
    (1, TriggerType::VideoMotion),
    (2, TriggerType::Audio),
    (4, TriggerType::AppleScript),
    (8, TriggerType::CameraEvent),
    (16, TriggerType::WebServerEvent),
    (32, TriggerType::OtherCamera),
    (64, TriggerType::Manual),
    (128, TriggerType::Human),
    (256, TriggerType::Vehicle),
];

impl TriggerType {
    /// First exact match in table order. Combined bitmasks such as 129 do
    /// not match any entry.
    pub fn from_code(code: u32) -> Option<Self> {
        TRIGGER_TABLE
            .iter()
            .find(|(value, _)| *value == code)
            .map(|(_, trigger)| *trigger)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TriggerType::VideoMotion => "Video motion detection",
            TriggerType::Audio => "Audio detection",
            TriggerType::AppleScript => "AppleScript",
            TriggerType::CameraEvent => "Camera event",
            TriggerType::WebServerEvent => "Web server event",
            TriggerType::OtherCamera => "Triggered by another camera",
            TriggerType::Manual => "Manual trigger",
            TriggerType::Human => "Human",
            TriggerType::Vehicle => "Vehicle",
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw arming flags of the continuous, motion and action schedules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleFlags {
    pub continuous: bool,
    pub motion: bool,
    pub action: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraRecord {
    pub id: String,
    pub name: String,
    pub model: String,
    pub online: bool,
    pub recording_mode: RecordingMode,
    pub schedule: ScheduleFlags,
    pub rtsp_video: String,
    pub still_image: String,
    pub motion_sensitivity: Option<u32>,
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
    // Owned by the event listener
    pub motion_last_trigger: Option<String>,
    pub motion_on: bool,
    pub motion_trigger_type: Option<TriggerType>,
}

impl CameraRecord {
    pub fn is_recording(&self) -> bool {
        self.online && self.recording_mode != RecordingMode::Never
    }

    /// Last trigger time when the token is a `YYYYMMDDhhmmss` stamp.
    pub fn motion_last_trigger_at(&self) -> Option<NaiveDateTime> {
        let token = self.motion_last_trigger.as_deref()?;
        NaiveDateTime::parse_from_str(token, "%Y%m%d%H%M%S").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(continuous: bool, motion: bool) -> ScheduleFlags {
        ScheduleFlags {
            continuous,
            motion,
            action: false,
        }
    }

    #[test]
    fn recording_mode_derivation_prefers_continuous() {
        assert_eq!(RecordingMode::from_schedule(&flags(true, true)), RecordingMode::Always);
        assert_eq!(RecordingMode::from_schedule(&flags(true, false)), RecordingMode::Always);
        assert_eq!(RecordingMode::from_schedule(&flags(false, true)), RecordingMode::Motion);
        assert_eq!(RecordingMode::from_schedule(&flags(false, false)), RecordingMode::Never);
    }

    #[test]
    fn wire_params_follow_mode_table() {
        assert_eq!(RecordingMode::Always.wire_params(), (1, "C"));
        assert_eq!(RecordingMode::Motion.wire_params(), (1, "M"));
        assert_eq!(RecordingMode::Never.wire_params(), (0, "M"));
    }

    #[test]
    fn unknown_mode_string_is_rejected_by_from_str() {
        assert_eq!("motion".parse::<RecordingMode>().unwrap(), RecordingMode::Motion);
        assert!(matches!(
            "sometimes".parse::<RecordingMode>(),
            Err(Error::InvalidModeArgument(ref s)) if s == "sometimes"
        ));
    }

    #[test]
    fn trigger_codes_use_exact_match_only() {
        assert_eq!(TriggerType::from_code(128), Some(TriggerType::Human));
        assert_eq!(TriggerType::from_code(256), Some(TriggerType::Vehicle));
        assert_eq!(TriggerType::from_code(1).map(|t| t.label()), Some("Video motion detection"));
        assert_eq!(TriggerType::from_code(129), None);
        assert_eq!(TriggerType::from_code(0), None);
    }

    #[test]
    fn trigger_type_serializes_as_label() {
        let json = serde_json::to_string(&TriggerType::OtherCamera).unwrap();
        assert_eq!(json, "\"Triggered by another camera\"");
    }

    #[test]
    fn last_trigger_timestamp_parsing() {
        let mut record = CameraRecord {
            id: "1".to_string(),
            name: "Porch".to_string(),
            model: "Axis".to_string(),
            online: true,
            recording_mode: RecordingMode::Motion,
            schedule: flags(false, true),
            rtsp_video: String::new(),
            still_image: String::new(),
            motion_sensitivity: None,
            image_width: None,
            image_height: None,
            motion_last_trigger: Some("20210504123456".to_string()),
            motion_on: true,
            motion_trigger_type: None,
        };
        let at = record.motion_last_trigger_at().unwrap();
        assert_eq!(at.format("%Y-%m-%d %H:%M:%S").to_string(), "2021-05-04 12:34:56");
        assert!(record.is_recording());

        record.motion_last_trigger = Some("1620000000000".to_string());
        assert!(record.motion_last_trigger_at().is_none());

        record.online = false;
        assert!(!record.is_recording());
    }
}
