//! Indicator LED on a plain GPIO.
//!
//! Polarity comes from the board module; some boards sink the LED current.

use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_svc::sys::EspError;

use airsniff::board;
use airsniff::reporter::Indicator;

pub struct Led {
    pin: PinDriver<'static, AnyOutputPin, Output>,
}

impl Led {
    pub fn new() -> Result<Self, EspError> {
        // Safety: the board module reserves LED_PIN for the indicator and
        // nothing else in the firmware claims it.
        let pin = unsafe { AnyOutputPin::new(board::LED_PIN as i32) };
        let mut led = Self {
            pin: PinDriver::output(pin)?,
        };
        led.off();
        log::info!("Indicator LED on GPIO{}", board::LED_PIN);
        Ok(led)
    }

    fn drive(&mut self, lit: bool) {
        let high = lit != board::LED_ACTIVE_LOW;
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(e) = result {
            log::warn!("LED write failed: {:?}", e);
        }
    }
}

impl Indicator for Led {
    fn on(&mut self) {
        self.drive(true);
    }

    fn off(&mut self) {
        self.drive(false);
    }
}
