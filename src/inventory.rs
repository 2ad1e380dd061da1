use crate::error::{Error, Result};
use crate::models::{RecordingMode, ScheduleFlags};
use log::warn;
use roxmltree::{Document, Node};

/// One `cameralist/camera` entry of a `++systemInfo` response
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryCamera {
    pub id: String,
    pub name: String,
    pub model: String,
    pub online: bool,
    pub schedule: ScheduleFlags,
    pub motion_sensitivity: Option<u32>,
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
}

impl InventoryCamera {
    pub fn recording_mode(&self) -> RecordingMode {
        RecordingMode::from_schedule(&self.schedule)
    }
}

pub fn parse_inventory(raw: &[u8]) -> Result<Vec<InventoryCamera>> {
    let xml = std::str::from_utf8(raw).map_err(|e| Error::Parse(format!("Inventory is not UTF-8: {}", e)))?;
    let doc = Document::parse(xml)?;

    let cameras = doc
        .root_element()
        .children()
        .filter(|n| n.has_tag_name("cameralist"))
        .flat_map(|list| list.children().filter(|n| n.has_tag_name("camera")))
        .filter_map(parse_camera)
        .collect();

    Ok(cameras)
}

fn parse_camera(node: Node) -> Option<InventoryCamera> {
    let id = match child_text(node, "number") {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            warn!("Skipping camera entry without a number");
            return None;
        }
    };

    Some(InventoryCamera {
        name: child_text(node, "name").unwrap_or_default().to_string(),
        model: child_text(node, "devicename").unwrap_or_default().to_string(),
        online: child_text(node, "connected") == Some("yes"),
        schedule: ScheduleFlags {
            continuous: is_armed(node, "mode_c"),
            motion: is_armed(node, "mode-m"),
            action: is_armed(node, "mode-a"),
        },
        motion_sensitivity: child_number(node, "mdsensitivity"),
        image_width: child_number(node, "width"),
        image_height: child_number(node, "height"),
        id,
    })
}

fn child_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    node.children()
        .find(|n| n.has_tag_name(tag))
        .map(|n| n.text().unwrap_or("").trim())
}

fn child_number(node: Node, tag: &str) -> Option<u32> {
    child_text(node, tag).and_then(|s| s.parse().ok())
}

fn is_armed(node: Node, tag: &str) -> bool {
    child_text(node, tag) == Some("armed")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSTEM_INFO: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<system>
  <server><name>Office NVR</name></server>
  <cameralist>
    <camera>
      <number>0</number>
      <connected>yes</connected>
      <width>1920</width>
      <height>1080</height>
      <mode-c>ignored</mode-c>
      <mode_c>armed</mode_c>
      <mode-m>armed</mode-m>
      <mode-a>disarmed</mode-a>
      <name>Driveway</name>
      <devicename>Axis M3106</devicename>
      <mdsensitivity>50</mdsensitivity>
    </camera>
    <camera>
      <number>3</number>
      <connected>no</connected>
      <mode_c>disarmed</mode_c>
      <mode-m>armed</mode-m>
      <mode-a>armed</mode-a>
      <name>Garden</name>
      <devicename>Hikvision</devicename>
    </camera>
    <camera>
      <name>Broken entry</name>
    </camera>
  </cameralist>
</system>"#;

    #[test]
    fn parses_camera_entries() {
        let cameras = parse_inventory(SYSTEM_INFO.as_bytes()).unwrap();
        assert_eq!(cameras.len(), 2);

        let driveway = &cameras[0];
        assert_eq!(driveway.id, "0");
        assert_eq!(driveway.name, "Driveway");
        assert_eq!(driveway.model, "Axis M3106");
        assert!(driveway.online);
        assert_eq!(driveway.image_width, Some(1920));
        assert_eq!(driveway.image_height, Some(1080));
        assert_eq!(driveway.motion_sensitivity, Some(50));
        assert_eq!(driveway.recording_mode(), RecordingMode::Always);

        let garden = &cameras[1];
        assert_eq!(garden.id, "3");
        assert!(!garden.online);
        assert!(garden.schedule.action);
        assert_eq!(garden.image_width, None);
        assert_eq!(garden.recording_mode(), RecordingMode::Motion);
    }

    #[test]
    fn missing_flags_mean_never() {
        let xml = "<system><cameralist><camera><number>1</number></camera></cameralist></system>";
        let cameras = parse_inventory(xml.as_bytes()).unwrap();
        assert_eq!(cameras[0].recording_mode(), RecordingMode::Never);
        assert!(!cameras[0].online);
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let result = parse_inventory(b"<system><cameralist><camera>");
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn document_without_cameralist_is_empty() {
        assert!(parse_inventory(b"<system/>").unwrap().is_empty());
    }
}
