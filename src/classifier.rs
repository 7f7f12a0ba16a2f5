/// Link-layer frame classification.
///
/// Pulls the sender address (Address 2) out of the fixed 802.11 MAC header and
/// maps the capture boundary's packet class onto a [`FrameType`]. The frame
/// control bits are never re-parsed: the radio driver already told us what
/// kind of frame this is.
///
/// Safe to call from the frame-delivery context (no allocation, no blocking).
use core::fmt;

use crate::protocol::MacString;

/// Offset of the sender address: 2 (frame ctrl) + 2 (duration) + 6 (addr1).
pub const SENDER_OFFSET: usize = 10;

/// Minimum header bytes needed to read the sender address.
pub const MIN_HEADER_LEN: usize = SENDER_OFFSET + 6;

/// Packet class tags as delivered by the ESP-IDF promiscuous callback.
pub mod capture_tag {
    pub const MGMT: u32 = 0;
    pub const CTRL: u32 = 1;
    pub const DATA: u32 = 2;
    pub const MISC: u32 = 3;
}

/// A 6-byte hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address(pub [u8; 6]);

impl Address {
    pub const ZERO: Address = Address([0; 6]);

    /// Parse colon-separated hex ("aa:bb:cc:dd:ee:ff"), either case.
    pub fn parse(text: &str) -> Option<Self> {
        let mut bytes = [0u8; 6];
        let mut parts = text.trim().split(':');
        for byte in bytes.iter_mut() {
            let part = parts.next()?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            *byte = u8::from_str_radix(part, 16).ok()?;
        }
        if parts.next().is_some() {
            return None;
        }
        Some(Address(bytes))
    }

    /// Canonical lower-case text form for the wire.
    pub fn to_mac_string(&self) -> MacString {
        use core::fmt::Write;
        let mut s = MacString::new();
        let _ = write!(s, "{}", self);
        s
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// Frame class as reported by the capture boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Management,
    Data,
    Misc,
    Unknown,
}

impl FrameType {
    /// Map the driver's packet class tag. Control frames and anything the
    /// driver adds later land in `Unknown`.
    pub fn from_capture_tag(tag: u32) -> Self {
        match tag {
            capture_tag::MGMT => FrameType::Management,
            capture_tag::DATA => FrameType::Data,
            capture_tag::MISC => FrameType::Misc,
            _ => FrameType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FrameType::Management => "mgmt",
            FrameType::Data => "data",
            FrameType::Misc => "misc",
            FrameType::Unknown => "unknown",
        }
    }

    /// Parse operator text (case-insensitive).
    pub fn parse(text: &str) -> Option<Self> {
        let t = text.trim();
        if t.eq_ignore_ascii_case("mgmt") || t.eq_ignore_ascii_case("management") {
            Some(FrameType::Management)
        } else if t.eq_ignore_ascii_case("data") {
            Some(FrameType::Data)
        } else if t.eq_ignore_ascii_case("misc") {
            Some(FrameType::Misc)
        } else if t.eq_ignore_ascii_case("unknown") {
            Some(FrameType::Unknown)
        } else {
            None
        }
    }
}

/// One frame as handed over by the radio boundary. Borrowed for the length
/// of a single classify/filter/report cycle.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Raw 802.11 header + payload bytes
    pub data: &'a [u8],
    /// Length from the capture metadata
    pub len: u16,
    /// Channel the frame was received on
    pub channel: u8,
    /// Driver packet class (see [`capture_tag`])
    pub tag: u32,
}

/// Output of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub sender: Address,
    pub frame_type: FrameType,
    pub len: u16,
}

/// Classify a captured frame.
///
/// Truncated frames do not fail: they come back as `Unknown` with a zero
/// address so the cycle can still report them.
pub fn classify(frame: &Frame<'_>) -> Classified {
    let sender = frame
        .data
        .get(SENDER_OFFSET..MIN_HEADER_LEN)
        .and_then(|s| <[u8; 6]>::try_from(s).ok());

    match sender {
        Some(mac) => Classified {
            sender: Address(mac),
            frame_type: FrameType::from_capture_tag(frame.tag),
            len: frame.len,
        },
        None => Classified {
            sender: Address::ZERO,
            frame_type: FrameType::Unknown,
            len: frame.len,
        },
    }
}
