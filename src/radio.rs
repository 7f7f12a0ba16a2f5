/// Radio channel and promiscuous-mode control.
///
/// [`RadioController`] is the only owner of channel state. It talks to the
/// driver through the [`Radio`] trait so the same logic runs against the
/// ESP-IDF driver on the device and against mocks on the host.
use embedded_hal::delay::DelayNs;

use crate::error::{Error, HwOp, Result};

/// Lowest channel in the 2.4 GHz band plan we capture on.
pub const MIN_CHANNEL: u8 = 1;
/// Highest channel (13, country code allowing the full EU/US+ band).
pub const MAX_CHANNEL: u8 = 13;
/// Number of selectable channels.
pub const CHANNEL_COUNT: u8 = MAX_CHANNEL - MIN_CHANNEL + 1;

/// Default time to let the RF front end settle after a retune.
pub const DEFAULT_SETTLE_MS: u32 = 50;

/// Hardware capability consumed by the controller.
///
/// Implemented by the firmware over the WiFi driver. Every call must return
/// promptly; none of them are made from the frame-delivery context.
pub trait Radio {
    type Error: core::fmt::Debug;

    fn set_channel(&mut self, channel: u8) -> core::result::Result<(), Self::Error>;

    fn set_promiscuous(&mut self, enabled: bool) -> core::result::Result<(), Self::Error>;

    /// Install the driver's frame-delivery hook.
    fn register_frame_callback(&mut self) -> core::result::Result<(), Self::Error>;

    /// Remove the frame-delivery hook. No frame is delivered after this returns.
    fn unregister_frame_callback(&mut self) -> core::result::Result<(), Self::Error>;

    /// Channel the driver is currently tuned to.
    fn channel(&self) -> u8;

    /// Hardware random number. On ESP32 parts the RNG is fed by RF noise,
    /// so the radio is the natural owner.
    fn random(&mut self) -> u32;
}

/// Runtime radio configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioConfig {
    /// Settle interval between retune and re-enabling capture
    pub settle_ms: u32,
}

impl RadioConfig {
    pub const fn new() -> Self {
        Self {
            settle_ms: DEFAULT_SETTLE_MS,
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_valid_channel(channel: u8) -> bool {
    (MIN_CHANNEL..=MAX_CHANNEL).contains(&channel)
}

/// Map a 32-bit random value uniformly onto 1..=13 (multiply-shift, no modulo bias
/// beyond 2^-32).
pub fn pick_channel(random: u32) -> u8 {
    let idx = ((random as u64 * CHANNEL_COUNT as u64) >> 32) as u8;
    MIN_CHANNEL + idx
}

pub struct RadioController<R: Radio, D: DelayNs> {
    radio: R,
    delay: D,
    config: RadioConfig,
    channel: u8,
    promiscuous: bool,
    callback_registered: bool,
    /// Set once the operator picks a channel; suppresses the random pick
    operator_channel: bool,
}

impl<R: Radio, D: DelayNs> RadioController<R, D> {
    pub fn new(radio: R, delay: D, config: RadioConfig) -> Self {
        let reported = radio.channel();
        let channel = if is_valid_channel(reported) {
            reported
        } else {
            MIN_CHANNEL
        };
        Self {
            radio,
            delay,
            config,
            channel,
            promiscuous: false,
            callback_registered: false,
            operator_channel: false,
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn is_promiscuous(&self) -> bool {
        self.promiscuous
    }

    pub fn is_callback_registered(&self) -> bool {
        self.callback_registered
    }

    pub fn hardware(&self) -> &R {
        &self.radio
    }

    pub fn hardware_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Retune to `channel`.
    ///
    /// While capturing, capture is paused around the retune so no frame is
    /// delivered mid-switch. On a driver failure the controller keeps
    /// whatever the last successful step left behind.
    pub fn set_channel(&mut self, channel: u8) -> Result<()> {
        if !is_valid_channel(channel) {
            return Err(Error::InvalidChannel);
        }

        self.retune(channel)?;
        self.operator_channel = true;
        log::info!("Switched to channel {}", channel);
        Ok(())
    }

    /// Make sure a channel is selected before capture starts. Picks one at
    /// random unless the operator already chose.
    ///
    /// Capture is paused around the retune if promiscuous mode is still on
    /// (a failed stop can leave it on).
    pub fn ensure_channel(&mut self) -> Result<u8> {
        if !self.operator_channel {
            let channel = pick_channel(self.radio.random());
            self.retune(channel)?;
            log::info!("Randomly selected channel {}", channel);
        }
        Ok(self.channel)
    }

    /// Idempotent promiscuous toggle.
    pub fn enable_promiscuous(&mut self, enabled: bool) -> Result<()> {
        if self.promiscuous == enabled {
            return Ok(());
        }
        self.write_promiscuous(enabled)
    }

    /// Install the frame hook. At most one is ever installed.
    pub fn register_frame_callback(&mut self) -> Result<()> {
        if self.callback_registered {
            return Ok(());
        }
        self.radio
            .register_frame_callback()
            .map_err(|e| hw_failure(HwOp::RegisterCallback, e))?;
        self.callback_registered = true;
        Ok(())
    }

    pub fn unregister_frame_callback(&mut self) -> Result<()> {
        if !self.callback_registered {
            return Ok(());
        }
        self.radio
            .unregister_frame_callback()
            .map_err(|e| hw_failure(HwOp::UnregisterCallback, e))?;
        self.callback_registered = false;
        Ok(())
    }

    fn retune(&mut self, channel: u8) -> Result<()> {
        if !self.promiscuous {
            return self.write_channel(channel);
        }
        self.write_promiscuous(false)?;
        self.write_channel(channel)?;
        self.delay.delay_ms(self.config.settle_ms);
        self.write_promiscuous(true)
    }

    fn write_channel(&mut self, channel: u8) -> Result<()> {
        self.radio
            .set_channel(channel)
            .map_err(|e| hw_failure(HwOp::SetChannel, e))?;
        self.channel = channel;
        Ok(())
    }

    fn write_promiscuous(&mut self, enabled: bool) -> Result<()> {
        self.radio
            .set_promiscuous(enabled)
            .map_err(|e| hw_failure(HwOp::SetPromiscuous, e))?;
        self.promiscuous = enabled;
        Ok(())
    }
}

fn hw_failure<E: core::fmt::Debug>(op: HwOp, err: E) -> Error {
    log::warn!("Radio driver error during {}: {:?}", op.as_str(), err);
    Error::HardwareFailure(op)
}
