/// Per-frame reporting and the discovery indicator.
///
/// Every processed frame becomes one NDJSON `frame` record handed to a
/// [`ReportSink`]. The indicator (an LED on the boards we support) strobes
/// once per frame while listening to everything, and latches on when a
/// hunted target is found.
use crate::classifier::Address;
use crate::classifier::FrameType;
use crate::comm;
use crate::protocol::DeviceMessage;

/// Binary discovery/liveness signal.
pub trait Indicator {
    fn on(&mut self);

    fn off(&mut self);

    fn strobe(&mut self) {
        self.on();
        self.off();
    }
}

/// Destination for serialized NDJSON lines.
///
/// Called from the frame-delivery path: implementations must not block.
/// Buffer internally or drop when full.
pub trait ReportSink {
    fn emit(&mut self, line: &[u8]);
}

/// Everything the report record needs about one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub sender: Address,
    pub frame_type: FrameType,
    pub len: u16,
    pub channel: u8,
    pub filtered: bool,
    pub matched: bool,
}

pub struct Reporter<S: ReportSink, I: Indicator> {
    sink: S,
    indicator: I,
}

impl<S: ReportSink, I: Indicator> Reporter<S, I> {
    pub fn new(sink: S, indicator: I) -> Self {
        Self { sink, indicator }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    /// Emit the record for one frame and drive the indicator.
    pub fn report(&mut self, report: &FrameReport) {
        let mac = report.sender.to_mac_string();
        self.emit(&DeviceMessage::Frame {
            mac: &mac,
            frame: report.frame_type.as_str(),
            len: report.len,
            ch: report.channel,
            filtered: report.filtered,
            matched: report.matched,
        });

        if !report.filtered {
            self.indicator.strobe();
        } else if report.matched {
            log::info!("Target {} found on channel {}", mac, report.channel);
            self.indicator.on();
        }
    }

    /// Clear the indicator; used when a new capture is armed.
    pub fn reset_indicator(&mut self) {
        self.indicator.off();
    }

    /// Serialize any device message to the sink.
    pub fn emit(&mut self, msg: &DeviceMessage<'_>) {
        match comm::serialize_message(msg) {
            Some(buf) => self.sink.emit(&buf),
            None => log::warn!("Dropped oversized message"),
        }
    }
}
