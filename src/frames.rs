use std::time::Duration;

use crate::error::{Result, SpinnerError};

/// Spinner animation glyphs paired with the interval they are meant to be
/// shown at.
///
/// ```rust,ignore
/// let frames = Frames::dots();
/// let mut cycle = frames.cycle();
/// assert_eq!(cycle.next(), Some("⠋"));
///
/// // Custom frames:
/// let moon = Frames::custom(&["🌑", "🌒", "🌓", "🌔", "🌕"], Duration::from_millis(120))?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frames {
    frames: &'static [&'static str],
    interval: Duration,
}

impl Frames {
    /// Braille dot spinner (the most common choice).
    pub fn dots() -> Self {
        Self {
            frames: &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"],
            interval: Duration::from_millis(80),
        }
    }

    /// Classic line spinner.
    pub fn line() -> Self {
        Self {
            frames: &["|", "/", "-", "\\"],
            interval: Duration::from_millis(130),
        }
    }

    /// Arrow spinner.
    pub fn arrow() -> Self {
        Self {
            frames: &["←", "↖", "↑", "↗", "→", "↘", "↓", "↙"],
            interval: Duration::from_millis(100),
        }
    }

    /// Custom frames.
    pub fn custom(frames: &'static [&'static str], interval: Duration) -> Result<Self> {
        if frames.is_empty() {
            return Err(SpinnerError::NoFrames);
        }
        if interval.is_zero() {
            return Err(SpinnerError::ZeroInterval);
        }
        Ok(Self { frames, interval })
    }

    pub fn frames(&self) -> &'static [&'static str] {
        self.frames
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// An endless iterator over the glyphs. Every call starts over from the
    /// first glyph.
    pub fn cycle(&self) -> impl Iterator<Item = &'static str> + use<> {
        self.frames.iter().copied().cycle()
    }
}

impl Default for Frames {
    fn default() -> Self {
        Self::dots()
    }
}
