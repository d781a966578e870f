use std::time::Duration;

use crate::error::{Result, SpinnerError};
use crate::frames::Frames;
use crate::render::LineOptions;
use crate::style::{Color, Theme};

/// Session-wide settings, fixed when the [`Spinner`](crate::Spinner) is
/// created.
///
/// ```rust,ignore
/// let options = SpinnerOptions::default()
///     .spin_interval(Duration::from_millis(100))
///     .color(Color(0x00, 0x7b, 0xff))
///     .line(LineOptions::default().show_datetime(false));
/// let spinner = Spinner::with_options(options)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinnerOptions {
    pub frames: Frames,
    /// Overrides the frame source's own interval.
    pub spin_interval: Option<Duration>,
    /// Pause before each line is written.
    pub write_interval: Duration,
    pub base_indent: usize,
    /// Print a blank row before each top-level group.
    pub separate: bool,
    pub theme: Theme,
    /// Defaults for lines written without explicit options.
    pub line: LineOptions,
}

impl Default for SpinnerOptions {
    fn default() -> Self {
        Self {
            frames: Frames::default(),
            spin_interval: None,
            write_interval: Duration::ZERO,
            base_indent: 0,
            separate: false,
            theme: Theme::default(),
            line: LineOptions::default(),
        }
    }
}

impl SpinnerOptions {
    pub fn frames(mut self, frames: Frames) -> Self {
        self.frames = frames;
        self
    }

    pub fn spin_interval(mut self, d: Duration) -> Self {
        self.spin_interval = Some(d);
        self
    }

    pub fn write_interval(mut self, d: Duration) -> Self {
        self.write_interval = d;
        self
    }

    pub fn base_indent(mut self, indent: usize) -> Self {
        self.base_indent = indent;
        self
    }

    pub fn separate(mut self, yes: bool) -> Self {
        self.separate = yes;
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Color of the animation glyph while a header has no state.
    pub fn color(mut self, color: Color) -> Self {
        self.theme = self.theme.with_spinner_color(color);
        self
    }

    pub fn line(mut self, line: LineOptions) -> Self {
        self.line = line;
        self
    }

    /// Time between animation frames.
    pub fn interval(&self) -> Duration {
        self.spin_interval.unwrap_or(self.frames.interval())
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval().is_zero() {
            return Err(SpinnerError::ZeroInterval);
        }
        self.line.validate()
    }
}
