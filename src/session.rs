/// Capture session state machine.
///
/// Owns the radio controller, the reporter and the active filter. Operator
/// commands and frame delivery both go through `&mut self`, so whoever shares
/// a session across threads wraps it in one lock; a frame that loses the race
/// against a stop sees `Stopped` and is dropped.
///
/// ```text
///   Idle ──start──▶ Listening ──stop / target match──▶ Stopped
///                       ▲                                 │
///                       └──────────────start──────────────┘
/// ```
use embedded_hal::delay::DelayNs;

use crate::board;
use crate::classifier::{classify, Address, FrameType, Frame};
use crate::error::{Error, Result};
use crate::filter::{FilterConfig, Verdict};
use crate::protocol::{DeviceMessage, VERSION};
use crate::radio::{Radio, RadioController};
use crate::reporter::{FrameReport, Indicator, ReportSink, Reporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Listening,
    Stopped,
}

impl CaptureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Listening => "listening",
            CaptureState::Stopped => "stopped",
        }
    }
}

/// What happened to a delivered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Session was not listening
    Ignored,
    /// Filtered out without a report
    Dropped,
    /// Reported, still listening
    Reported,
    /// Target found, session stopped
    Matched,
}

/// Counters since the last `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    /// Frames that passed the filter and were reported
    pub frames: u32,
    pub matches: u32,
}

pub struct CaptureSession<R, D, S, I>
where
    R: Radio,
    D: DelayNs,
    S: ReportSink,
    I: Indicator,
{
    radio: RadioController<R, D>,
    reporter: Reporter<S, I>,
    filter: FilterConfig,
    state: CaptureState,
    stats: SessionStats,
    generation: u32,
}

impl<R, D, S, I> CaptureSession<R, D, S, I>
where
    R: Radio,
    D: DelayNs,
    S: ReportSink,
    I: Indicator,
{
    pub fn new(radio: RadioController<R, D>, reporter: Reporter<S, I>) -> Self {
        Self {
            radio,
            reporter,
            filter: FilterConfig::default(),
            state: CaptureState::Idle,
            stats: SessionStats::default(),
            generation: 0,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Bumped by every successful `start`. Lets a queued delivery path tell
    /// frames of the current capture from leftovers of an earlier one.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    pub fn radio(&self) -> &RadioController<R, D> {
        &self.radio
    }

    pub fn reporter(&self) -> &Reporter<S, I> {
        &self.reporter
    }

    /// Start capturing, optionally hunting `target`.
    pub fn start(&mut self, target: Option<Address>, frame_type: Option<FrameType>) -> Result<()> {
        self.start_with(FilterConfig::new(target, frame_type))
    }

    /// Start capturing with a full filter configuration.
    ///
    /// On a driver failure nothing stays half-enabled and the state is left
    /// as it was.
    pub fn start_with(&mut self, filter: FilterConfig) -> Result<()> {
        if self.state == CaptureState::Listening {
            return Err(Error::AlreadyRunning);
        }

        self.radio.ensure_channel()?;
        self.radio.enable_promiscuous(true)?;
        if let Err(e) = self.radio.register_frame_callback() {
            if let Err(undo) = self.radio.enable_promiscuous(false) {
                log::warn!("Could not roll back promiscuous mode: {}", undo);
            }
            return Err(e);
        }

        self.filter = filter;
        self.stats = SessionStats::default();
        self.generation = self.generation.wrapping_add(1);
        self.reporter.reset_indicator();
        self.state = CaptureState::Listening;

        match self.filter.address.target() {
            Some(target) => log::info!(
                "Sniffer listening on channel {} for {}",
                self.radio.channel(),
                target
            ),
            None => log::info!("Sniffer listening on channel {}", self.radio.channel()),
        }
        self.announce_state();
        Ok(())
    }

    /// Handle one delivered frame: classify, filter, report, and stop on a
    /// target match.
    pub fn on_frame(&mut self, frame: &Frame<'_>) -> Disposition {
        if self.state != CaptureState::Listening {
            return Disposition::Ignored;
        }

        let c = classify(frame);
        let verdict = self.filter.evaluate(&c.sender, c.frame_type);
        if verdict == Verdict::Skip {
            return Disposition::Dropped;
        }
        self.stats.frames = self.stats.frames.wrapping_add(1);

        let matched = verdict == Verdict::Match;
        let channel = if frame.channel == 0 {
            self.radio.channel()
        } else {
            frame.channel
        };
        self.reporter.report(&FrameReport {
            sender: c.sender,
            frame_type: c.frame_type,
            len: c.len,
            channel,
            filtered: self.filter.is_filtered(),
            matched,
        });
        log::debug!("{} frame from {} ({} bytes)", c.frame_type.as_str(), c.sender, c.len);

        if !matched {
            return Disposition::Reported;
        }

        self.stats.matches = self.stats.matches.wrapping_add(1);
        log::info!("Stopping sniffer");
        if let Err(e) = self.shutdown() {
            log::warn!("Stop after match incomplete: {}", e);
        }
        Disposition::Matched
    }

    /// Like [`on_frame`](Self::on_frame) for a frame that was queued under
    /// `generation`. Frames captured before the latest `start` are ignored.
    pub fn on_queued_frame(&mut self, generation: u32, frame: &Frame<'_>) -> Disposition {
        if generation != self.generation {
            log::debug!("Discarding frame from capture {}", generation);
            return Disposition::Ignored;
        }
        self.on_frame(frame)
    }

    /// Stop capturing.
    pub fn stop(&mut self) -> Result<()> {
        if self.state != CaptureState::Listening {
            return Err(Error::NotRunning);
        }
        log::info!("Sniffer stopped by operator");
        self.shutdown()
    }

    /// Retune the radio. Allowed in every state; never changes the capture state.
    pub fn switch_channel(&mut self, channel: u8) -> Result<()> {
        self.radio.set_channel(channel)
    }

    pub fn current_channel(&self) -> u8 {
        self.radio.channel()
    }

    /// Emit a message through the session's reporter.
    pub fn emit(&mut self, msg: &DeviceMessage<'_>) {
        self.reporter.emit(msg);
    }

    pub fn announce_channel(&mut self) {
        let ch = self.radio.channel();
        self.emit(&DeviceMessage::Channel { ch });
    }

    pub fn announce_status(&mut self) {
        let msg = DeviceMessage::Status {
            state: self.state.as_str(),
            ch: self.radio.channel(),
            frames: self.stats.frames,
            matches: self.stats.matches,
            board: board::BOARD_NAME,
            version: VERSION,
        };
        self.emit(&msg);
    }

    fn announce_state(&mut self) {
        let target = self.filter.address.target().map(Address::to_mac_string);
        let msg = DeviceMessage::State {
            state: self.state.as_str(),
            ch: self.radio.channel(),
            target: target.as_ref(),
        };
        self.reporter.emit(&msg);
    }

    /// Commit `Stopped` and tear down the driver hook. The state flips first
    /// so the session never processes another frame, even if teardown fails.
    fn shutdown(&mut self) -> Result<()> {
        self.state = CaptureState::Stopped;
        let unregistered = self.radio.unregister_frame_callback();
        let disabled = self.radio.enable_promiscuous(false);
        self.announce_state();
        unregistered.and(disabled)
    }
}
