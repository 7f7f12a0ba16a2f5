/// Target filtering for a capture session.
///
/// A session either listens to everything (no target) or hunts for one
/// sender address. The filter is fixed when `start` builds it and is not
/// touched again until the next `start`.
use crate::classifier::{Address, FrameType};

/// Exact-match filter over sender addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddressFilter {
    target: Option<Address>,
}

impl AddressFilter {
    pub const fn new(target: Option<Address>) -> Self {
        Self { target }
    }

    pub fn target(&self) -> Option<&Address> {
        self.target.as_ref()
    }

    /// True for every address when no target is set; otherwise exact
    /// byte equality with the target.
    pub fn matches(&self, addr: &Address) -> bool {
        match self.target {
            None => true,
            Some(ref target) => target == addr,
        }
    }
}

/// Capture filter configuration, built by `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    pub address: AddressFilter,
    /// Optional frame class restriction
    pub frame_type: Option<FrameType>,
    /// Whether non-matching frames are reported while hunting a target
    pub report_misses: bool,
}

impl FilterConfig {
    pub const fn new(target: Option<Address>, frame_type: Option<FrameType>) -> Self {
        Self {
            address: AddressFilter::new(target),
            frame_type,
            report_misses: true,
        }
    }

    /// Filtered mode means a target address is set.
    pub fn is_filtered(&self) -> bool {
        self.address.target().is_some()
    }

    fn type_matches(&self, frame_type: FrameType) -> bool {
        self.frame_type.map_or(true, |t| t == frame_type)
    }

    /// Evaluate one classified frame.
    pub fn evaluate(&self, sender: &Address, frame_type: FrameType) -> Verdict {
        if !self.is_filtered() {
            return if self.type_matches(frame_type) {
                Verdict::Unfiltered
            } else {
                Verdict::Skip
            };
        }

        if self.address.matches(sender) && self.type_matches(frame_type) {
            Verdict::Match
        } else if self.report_misses {
            Verdict::Miss
        } else {
            Verdict::Skip
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// What the session should do with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No target configured: report and keep listening
    Unfiltered,
    /// Target configured, this is not it: report the miss
    Miss,
    /// Target found: report and stop
    Match,
    /// Drop without reporting
    Skip,
}
