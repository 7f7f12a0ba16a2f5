/// Communication layer: NDJSON serialization, command parsing and dispatch.
///
/// The device streams frame reports as newline-delimited JSON over the
/// serial console and takes operator commands on the same line.

use embedded_hal::delay::DelayNs;

use crate::classifier::{Address, FrameType};
use crate::error::{Error, Result};
use crate::filter::FilterConfig;
use crate::protocol::{DeviceMessage, HostCommand, MsgBuffer, RawCommand, MAX_MSG_LEN};
use crate::radio::Radio;
use crate::reporter::{Indicator, ReportSink};
use crate::session::CaptureSession;

/// Serial baud rate
pub const SERIAL_BAUD: u32 = 115200;

// ── Serialization helpers ──────────────────────────────────────────────

/// Serialize a DeviceMessage to a newline-terminated JSON line.
/// Returns None if the message does not fit in a [`MsgBuffer`].
pub fn serialize_message(msg: &DeviceMessage) -> Option<MsgBuffer> {
    let mut buf = MsgBuffer::new();
    buf.resize_default(MAX_MSG_LEN).ok()?;
    let len = serde_json_core::to_slice(msg, &mut buf).ok()?;
    // Need one byte for the NDJSON delimiter
    if len >= MAX_MSG_LEN {
        return None;
    }
    buf[len] = b'\n';
    buf.truncate(len + 1);
    Some(buf)
}

/// Deserialize a HostCommand from a JSON line.
pub fn parse_command(data: &[u8]) -> Result<HostCommand> {
    let trimmed = trim_whitespace(data);
    if trimmed.is_empty() {
        return Err(Error::InvalidCommand);
    }
    let (raw, _) = serde_json_core::from_slice::<RawCommand>(trimmed)
        .map_err(|_| Error::InvalidCommand)?;

    match raw.cmd.as_str() {
        "start" => {
            let target = match raw.mac {
                Some(ref text) => Some(Address::parse(text).ok_or(Error::InvalidTarget)?),
                None => None,
            };
            let frame = match raw.frame {
                Some(ref text) => Some(FrameType::parse(text).ok_or(Error::InvalidTarget)?),
                None => None,
            };
            Ok(HostCommand::Start {
                target,
                frame,
                report_misses: raw.misses.unwrap_or(true),
            })
        }
        "stop" => Ok(HostCommand::Stop),
        "channel" | "switchchannel" => raw
            .ch
            .map(|channel| HostCommand::SwitchChannel { channel })
            .ok_or(Error::InvalidCommand),
        "get_channel" => Ok(HostCommand::GetChannel),
        "status" => Ok(HostCommand::GetStatus),
        _ => Err(Error::InvalidCommand),
    }
}

/// Apply an operator command to the session. Replies and failures are
/// emitted through the session's reporter.
pub fn handle_command<R, D, S, I>(
    cmd: &HostCommand,
    session: &mut CaptureSession<R, D, S, I>,
) -> Result<()>
where
    R: Radio,
    D: DelayNs,
    S: ReportSink,
    I: Indicator,
{
    log::info!("Command: {}", cmd.name());

    let result = match *cmd {
        HostCommand::Start {
            target,
            frame,
            report_misses,
        } => session.start_with(FilterConfig {
            report_misses,
            ..FilterConfig::new(target, frame)
        }),
        HostCommand::Stop => session.stop(),
        HostCommand::SwitchChannel { channel } => u8::try_from(channel)
            .map_err(|_| Error::InvalidChannel)
            .and_then(|ch| session.switch_channel(ch))
            .map(|()| session.announce_channel()),
        HostCommand::GetChannel => {
            session.announce_channel();
            Ok(())
        }
        HostCommand::GetStatus => {
            session.announce_status();
            Ok(())
        }
    };

    if let Err(e) = result {
        log::warn!("Command {} failed: {}", cmd.name(), e);
        session.emit(&DeviceMessage::Error {
            cmd: cmd.name(),
            error: e.code(),
        });
    }
    result
}

// ── Serial NDJSON reader ───────────────────────────────────────────────

/// Serial NDJSON reader state machine.
/// Accumulates bytes until a line ending, then yields the line. A line that
/// overruns the buffer is dropped in full, up to its terminating newline.
pub struct LineReader {
    buf: [u8; MAX_MSG_LEN],
    pos: usize,
    overflowed: bool,
}

impl LineReader {
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_MSG_LEN],
            pos: 0,
            overflowed: false,
        }
    }

    /// Feed a byte into the reader. Returns a complete line (without newline)
    /// when one is detected.
    pub fn feed(&mut self, byte: u8) -> Option<&[u8]> {
        match byte {
            b'\n' | b'\r' => {
                let len = core::mem::take(&mut self.pos);
                if core::mem::take(&mut self.overflowed) {
                    log::warn!("Discarded overlong command line");
                    return None;
                }
                (len > 0).then(|| &self.buf[..len])
            }
            _ if self.overflowed => None,
            _ if self.pos < self.buf.len() => {
                self.buf[self.pos] = byte;
                self.pos += 1;
                None
            }
            _ => {
                self.overflowed = true;
                None
            }
        }
    }
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}

fn trim_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let end = data
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &data[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDelay, MockLed, MockRadio, VecSink};
    use crate::radio::{RadioConfig, RadioController};
    use crate::reporter::Reporter;
    use crate::session::CaptureState;

    type Session = CaptureSession<MockRadio, MockDelay, VecSink, MockLed>;

    fn session() -> Session {
        CaptureSession::new(
            RadioController::new(MockRadio::new(), MockDelay::default(), RadioConfig::new()),
            Reporter::new(VecSink::default(), MockLed::default()),
        )
    }

    // ── parse_command ───────────────────────────────────────────────

    #[test]
    fn parse_plain_start() {
        assert_eq!(
            parse_command(br#"{"cmd":"start"}"#),
            Ok(HostCommand::Start {
                target: None,
                frame: None,
                report_misses: true
            })
        );
    }

    #[test]
    fn parse_start_with_target() {
        let cmd =
            parse_command(br#"{"cmd":"start","mac":"11:22:33:44:55:66","frame":"data","misses":false}"#)
                .unwrap();
        assert_eq!(
            cmd,
            HostCommand::Start {
                target: Some(Address([0x11, 0x22, 0x33, 0x44, 0x55, 0x66])),
                frame: Some(FrameType::Data),
                report_misses: false
            }
        );
    }

    #[test]
    fn parse_start_with_bad_target() {
        assert_eq!(
            parse_command(br#"{"cmd":"start","mac":"not-a-mac"}"#),
            Err(Error::InvalidTarget)
        );
        assert_eq!(
            parse_command(br#"{"cmd":"start","frame":"beacon"}"#),
            Err(Error::InvalidTarget)
        );
    }

    #[test]
    fn parse_other_commands() {
        assert_eq!(parse_command(br#"{"cmd":"stop"}"#), Ok(HostCommand::Stop));
        assert_eq!(
            parse_command(br#"{"cmd":"channel","ch":11}"#),
            Ok(HostCommand::SwitchChannel { channel: 11 })
        );
        assert_eq!(
            parse_command(br#"{"cmd":"channel","ch":-1}"#),
            Ok(HostCommand::SwitchChannel { channel: -1 })
        );
        assert_eq!(
            parse_command(br#"{"cmd":"channel","ch":70000}"#),
            Ok(HostCommand::SwitchChannel { channel: 70000 })
        );
        assert_eq!(
            parse_command(br#"{"cmd":"get_channel"}"#),
            Ok(HostCommand::GetChannel)
        );
        assert_eq!(
            parse_command(b"  {\"cmd\":\"status\"}\r\n"),
            Ok(HostCommand::GetStatus)
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_command(b""), Err(Error::InvalidCommand));
        assert_eq!(parse_command(b"   \n"), Err(Error::InvalidCommand));
        assert_eq!(parse_command(b"start"), Err(Error::InvalidCommand));
        assert_eq!(parse_command(br#"{"cmd":"reboot"}"#), Err(Error::InvalidCommand));
        assert_eq!(parse_command(br#"{"cmd":"channel"}"#), Err(Error::InvalidCommand));
    }

    // ── handle_command ──────────────────────────────────────────────

    #[test]
    fn start_and_stop_through_commands() {
        let mut s = session();
        handle_command(&parse_command(br#"{"cmd":"start"}"#).unwrap(), &mut s).unwrap();
        assert_eq!(s.state(), CaptureState::Listening);
        handle_command(&HostCommand::Stop, &mut s).unwrap();
        assert_eq!(s.state(), CaptureState::Stopped);
        assert_eq!(s.reporter().sink().of_type("state").len(), 2);
    }

    #[test]
    fn failed_command_emits_error_line() {
        let mut s = session();
        assert_eq!(handle_command(&HostCommand::Stop, &mut s), Err(Error::NotRunning));
        let errors = s.reporter().sink().of_type("error");
        assert_eq!(errors, [r#"{"type":"error","cmd":"stop","error":"not_running"}"#]);
    }

    #[test]
    fn switch_channel_replies_with_channel() {
        let mut s = session();
        handle_command(&HostCommand::SwitchChannel { channel: 9 }, &mut s).unwrap();
        assert_eq!(s.reporter().sink().of_type("channel"), [r#"{"type":"channel","ch":9}"#]);
    }

    #[test]
    fn negative_or_huge_channel_is_invalid() {
        let mut s = session();
        for channel in [-1i64, 0, 14, 300, 70000, i64::MAX] {
            assert_eq!(
                handle_command(&HostCommand::SwitchChannel { channel }, &mut s),
                Err(Error::InvalidChannel)
            );
        }
        assert_eq!(s.reporter().sink().of_type("error").len(), 6);
        assert!(s.reporter().sink().of_type("channel").is_empty());
    }

    #[test]
    fn out_of_range_channel_line_is_an_invalid_channel() {
        let mut s = session();
        let cmd = parse_command(br#"{"cmd":"channel","ch":70000}"#).unwrap();
        assert_eq!(handle_command(&cmd, &mut s), Err(Error::InvalidChannel));
        assert_eq!(
            s.reporter().sink().of_type("error"),
            [r#"{"type":"error","cmd":"channel","error":"invalid_channel"}"#]
        );
    }

    #[test]
    fn status_reply() {
        let mut s = session();
        handle_command(&HostCommand::GetStatus, &mut s).unwrap();
        let status = s.reporter().sink().of_type("status");
        assert_eq!(status.len(), 1);
        assert!(status[0].contains(r#""state":"idle""#));
        assert!(status[0].contains(r#""frames":0"#));
    }

    // ── serialize_message ───────────────────────────────────────────

    #[test]
    fn serialized_line_ends_with_newline() {
        let buf = serialize_message(&DeviceMessage::Channel { ch: 3 }).unwrap();
        assert_eq!(&buf[..], b"{\"type\":\"channel\",\"ch\":3}\n");
    }

    // ── LineReader ──────────────────────────────────────────────────

    fn feed_all(reader: &mut LineReader, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        for &b in bytes {
            if let Some(line) = reader.feed(b) {
                out.push(line.to_vec());
            }
        }
        out
    }

    #[test]
    fn line_reader_splits_lines() {
        let mut r = LineReader::new();
        let lines = feed_all(&mut r, b"{\"cmd\":\"stop\"}\r\n\n{\"cmd\":\"status\"}\n");
        assert_eq!(lines, [b"{\"cmd\":\"stop\"}".to_vec(), b"{\"cmd\":\"status\"}".to_vec()]);
    }

    #[test]
    fn line_reader_drops_overlong_line_entirely() {
        let mut r = LineReader::new();
        let mut input = vec![b'x'; MAX_MSG_LEN + 10];
        input.push(b'\n');
        input.extend_from_slice(b"ok\n");
        let lines = feed_all(&mut r, &input);
        assert_eq!(lines, [b"ok".to_vec()]);
    }
}
