/// Hardware abstraction for supported boards.
///
/// Each board module defines the indicator LED wiring, selected at compile
/// time via feature flags.

#[cfg(feature = "board-xiao")]
mod hw {
    pub const LED_PIN: u8 = 21; // User LED (orange)
    pub const LED_ACTIVE_LOW: bool = true;
    pub const BOARD_NAME: &str = "xiao_esp32s3";
}

#[cfg(feature = "board-m5stickc")]
mod hw {
    pub const LED_PIN: u8 = 19; // Red IR/status LED
    pub const LED_ACTIVE_LOW: bool = false;
    pub const BOARD_NAME: &str = "m5stickc_plus2";
}

#[cfg(feature = "board-c6")]
mod hw {
    pub const LED_PIN: u8 = 7;
    pub const LED_ACTIVE_LOW: bool = false;
    pub const BOARD_NAME: &str = "esp32c6_devkit";
}

#[cfg(not(any(feature = "board-xiao", feature = "board-m5stickc", feature = "board-c6")))]
mod hw {
    pub const LED_PIN: u8 = 7;
    pub const LED_ACTIVE_LOW: bool = false;
    pub const BOARD_NAME: &str = "unknown";
}

pub use hw::*;
