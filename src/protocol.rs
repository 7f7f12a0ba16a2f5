/// JSON message protocol between the sniffer and the operator console.
///
/// All messages are newline-delimited JSON (NDJSON).
/// Uses `heapless` types for no_std/no-alloc operation.
use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::classifier::{Address, FrameType};

/// Maximum length for MAC address strings ("aa:bb:cc:dd:ee:ff")
pub type MacString = String<18>;

/// Messages sent from the device to the operator
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum DeviceMessage<'a> {
    /// One processed frame
    #[serde(rename = "frame")]
    Frame {
        /// Sender address
        mac: &'a MacString,
        /// Frame class: "mgmt", "data", "misc", "unknown"
        frame: &'static str,
        /// Length from capture metadata
        len: u16,
        ch: u8,
        /// Whether a target address was set
        filtered: bool,
        /// Whether this frame is the target
        matched: bool,
    },
    /// Capture state change
    #[serde(rename = "state")]
    State {
        /// "idle", "listening", "stopped"
        state: &'static str,
        ch: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<&'a MacString>,
    },
    /// Current channel, reply to a switch or query
    #[serde(rename = "channel")]
    Channel { ch: u8 },
    /// Device status report
    #[serde(rename = "status")]
    Status {
        state: &'static str,
        ch: u8,
        /// Frames processed since the last start
        frames: u32,
        /// Target matches since the last start
        matches: u32,
        /// Board identifier
        board: &'static str,
        /// Firmware version
        version: &'static str,
    },
    /// Command failure
    #[serde(rename = "error")]
    Error {
        cmd: &'static str,
        error: &'static str,
    },
}

/// Commands sent from the operator to the device.
///
/// Deserialized via [`RawCommand`] in `comm::parse_command()` because
/// `serde_json_core` does not support internally tagged enums (`deserialize_any`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostCommand {
    /// Start capturing, optionally hunting a target
    Start {
        target: Option<Address>,
        frame: Option<FrameType>,
        report_misses: bool,
    },
    /// Stop capturing
    Stop,
    /// Retune; range is checked by the radio controller
    SwitchChannel { channel: i64 },
    /// Request current channel
    GetChannel,
    /// Request current status
    GetStatus,
}

impl HostCommand {
    /// Command name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            HostCommand::Start { .. } => "start",
            HostCommand::Stop => "stop",
            HostCommand::SwitchChannel { .. } => "channel",
            HostCommand::GetChannel => "get_channel",
            HostCommand::GetStatus => "status",
        }
    }
}

/// Wire format for host commands — flat struct that `serde_json_core` can
/// deserialize without `deserialize_any`. Converted to [`HostCommand`] in
/// `comm::parse_command()`.
#[derive(Deserialize)]
pub(crate) struct RawCommand {
    pub cmd: String<16>,
    #[serde(default)]
    pub mac: Option<String<24>>,
    #[serde(default)]
    pub frame: Option<String<16>>,
    #[serde(default)]
    pub ch: Option<i64>,
    #[serde(default)]
    pub misses: Option<bool>,
}

/// Firmware version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum size of a serialized JSON message
pub const MAX_MSG_LEN: usize = 256;

/// Buffer type for serialized JSON messages
pub type MsgBuffer = Vec<u8, MAX_MSG_LEN>;

#[cfg(test)]
mod tests {
    use super::*;

    fn to_json(msg: &DeviceMessage) -> std::string::String {
        let mut buf = [0u8; MAX_MSG_LEN];
        let len = serde_json_core::to_slice(msg, &mut buf).unwrap();
        core::str::from_utf8(&buf[..len]).unwrap().to_string()
    }

    #[test]
    fn serialize_frame_message() {
        let mac = MacString::try_from("aa:bb:cc:dd:ee:ff").unwrap();
        let json = to_json(&DeviceMessage::Frame {
            mac: &mac,
            frame: "data",
            len: 312,
            ch: 6,
            filtered: true,
            matched: false,
        });
        assert!(json.contains(r#""type":"frame""#));
        assert!(json.contains(r#""mac":"aa:bb:cc:dd:ee:ff""#));
        assert!(json.contains(r#""frame":"data""#));
        assert!(json.contains(r#""len":312"#));
        assert!(json.contains(r#""ch":6"#));
        assert!(json.contains(r#""filtered":true"#));
        assert!(json.contains(r#""matched":false"#));
    }

    #[test]
    fn serialize_state_without_target_omits_field() {
        let json = to_json(&DeviceMessage::State {
            state: "listening",
            ch: 11,
            target: None,
        });
        assert!(json.contains(r#""type":"state""#));
        assert!(json.contains(r#""state":"listening""#));
        assert!(!json.contains("target"));
    }

    #[test]
    fn serialize_state_with_target() {
        let mac = MacString::try_from("11:22:33:44:55:66").unwrap();
        let json = to_json(&DeviceMessage::State {
            state: "listening",
            ch: 1,
            target: Some(&mac),
        });
        assert!(json.contains(r#""target":"11:22:33:44:55:66""#));
    }

    #[test]
    fn serialize_status_message() {
        let json = to_json(&DeviceMessage::Status {
            state: "stopped",
            ch: 4,
            frames: 120,
            matches: 1,
            board: "test_board",
            version: "0.1.0",
        });
        assert!(json.contains(r#""type":"status""#));
        assert!(json.contains(r#""frames":120"#));
        assert!(json.contains(r#""board":"test_board""#));
    }

    #[test]
    fn serialize_error_message() {
        let json = to_json(&DeviceMessage::Error {
            cmd: "stop",
            error: "not_running",
        });
        assert_eq!(json, r#"{"type":"error","cmd":"stop","error":"not_running"}"#);
    }

    #[test]
    fn command_names() {
        assert_eq!(HostCommand::Stop.name(), "stop");
        assert_eq!(HostCommand::SwitchChannel { channel: 3 }.name(), "channel");
    }

    #[test]
    fn version_is_semver() {
        let parts: heapless::Vec<&str, 4> = VERSION.split('.').collect();
        assert_eq!(
            parts.len(),
            3,
            "VERSION should be semver (major.minor.patch)"
        );
        for part in &parts {
            assert!(part.parse::<u32>().is_ok(), "'{part}' is not a number");
        }
    }
}
