//! Host-side stand-ins for the radio driver, LED and output sink.

use embedded_hal::delay::DelayNs;

use crate::radio::Radio;
use crate::reporter::{Indicator, ReportSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioCall {
    SetChannel(u8),
    SetPromiscuous(bool),
    RegisterCallback,
    UnregisterCallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverError;

#[derive(Debug)]
pub struct MockRadio {
    pub channel: u8,
    pub promiscuous: bool,
    pub callback: bool,
    pub random: u32,
    pub calls: Vec<RadioCall>,
    pub fail_channel: bool,
    /// Fail `set_promiscuous` when asked for this value
    pub fail_promiscuous_on: Option<bool>,
    pub fail_register: bool,
    pub fail_unregister: bool,
}

impl MockRadio {
    pub fn new() -> Self {
        Self {
            channel: 1,
            promiscuous: false,
            callback: false,
            random: 0,
            calls: Vec::new(),
            fail_channel: false,
            fail_promiscuous_on: None,
            fail_register: false,
            fail_unregister: false,
        }
    }
}

impl Radio for MockRadio {
    type Error = DriverError;

    fn set_channel(&mut self, channel: u8) -> Result<(), DriverError> {
        if self.fail_channel {
            return Err(DriverError);
        }
        self.calls.push(RadioCall::SetChannel(channel));
        self.channel = channel;
        Ok(())
    }

    fn set_promiscuous(&mut self, enabled: bool) -> Result<(), DriverError> {
        if self.fail_promiscuous_on == Some(enabled) {
            return Err(DriverError);
        }
        self.calls.push(RadioCall::SetPromiscuous(enabled));
        self.promiscuous = enabled;
        Ok(())
    }

    fn register_frame_callback(&mut self) -> Result<(), DriverError> {
        if self.fail_register {
            return Err(DriverError);
        }
        self.calls.push(RadioCall::RegisterCallback);
        self.callback = true;
        Ok(())
    }

    fn unregister_frame_callback(&mut self) -> Result<(), DriverError> {
        if self.fail_unregister {
            return Err(DriverError);
        }
        self.calls.push(RadioCall::UnregisterCallback);
        self.callback = false;
        Ok(())
    }

    fn channel(&self) -> u8 {
        self.channel
    }

    fn random(&mut self) -> u32 {
        self.random
    }
}

#[derive(Debug, Default)]
pub struct MockDelay {
    pub total_ms: u32,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ms += ns / 1_000_000;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ms += ms;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedEvent {
    On,
    Off,
}

#[derive(Debug, Default)]
pub struct MockLed {
    pub lit: bool,
    pub events: Vec<LedEvent>,
}

impl MockLed {
    /// Number of on→off pulses seen.
    pub fn strobes(&self) -> usize {
        self.events
            .windows(2)
            .filter(|w| w[0] == LedEvent::On && w[1] == LedEvent::Off)
            .count()
    }
}

impl Indicator for MockLed {
    fn on(&mut self) {
        self.lit = true;
        self.events.push(LedEvent::On);
    }

    fn off(&mut self) {
        self.lit = false;
        self.events.push(LedEvent::Off);
    }
}

/// Collects emitted NDJSON lines.
#[derive(Debug, Default)]
pub struct VecSink {
    pub lines: Vec<String>,
}

impl VecSink {
    /// Lines whose `"type"` tag equals `kind`.
    pub fn of_type(&self, kind: &str) -> Vec<&str> {
        let tag = format!(r#""type":"{kind}""#);
        self.lines
            .iter()
            .filter(|l| l.contains(&tag))
            .map(|l| l.as_str())
            .collect()
    }
}

impl ReportSink for VecSink {
    fn emit(&mut self, line: &[u8]) {
        self.lines
            .push(String::from_utf8_lossy(line).trim_end().to_string());
    }
}
