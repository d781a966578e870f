//! Pure render models for header and line rows.
//!
//! Nothing here touches the terminal or shared state: an item is built,
//! formatted to a string and dropped.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::{DateTime, Local};
use regex::Regex;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::error::{Result, SpinnerError};
use crate::state::SpinnerState;
use crate::style::{Coloring, Format, Theme};

/// Spaces per indentation level.
pub const INDENT: usize = 2;

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static ANSI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("ansi pattern is valid")
});

/// Display width of `text` once escape sequences are removed.
pub fn visible_width(text: &str) -> usize {
    ANSI.replace_all(text, "").width()
}

/// Cuts `text` down to `columns` display cells. Escape sequences are kept,
/// and styling is reset after a cut so it cannot leak into the next row.
pub fn truncate_to_width(text: &str, columns: usize) -> Cow<'_, str> {
    if visible_width(text) <= columns {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut used = 0;
    let mut last = 0;
    'outer: for escape in ANSI.find_iter(text).map(Some).chain([None]) {
        let end = escape.map_or(text.len(), |m| m.start());
        for c in text[last..end].chars() {
            let width = c.width().unwrap_or(0);
            if used + width > columns {
                break 'outer;
            }
            used += width;
            out.push(c);
        }
        if let Some(m) = escape {
            out.push_str(m.as_str());
            last = m.end();
        }
    }
    if ANSI.is_match(text) {
        out.push_str("\x1b[0m");
    }
    Cow::Owned(out)
}

/// Optional label written before a line's text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Label {
    #[default]
    Off,
    /// The line state's label, e.g. `Warning: ...`. Unset lines get none.
    State,
    Text(String),
}

impl From<bool> for Label {
    fn from(state: bool) -> Self {
        if state { Self::State } else { Self::Off }
    }
}

impl From<&str> for Label {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Per-line rendering options.
///
/// ```rust,ignore
/// let options = LineOptions::default()
///     .label(true)
///     .color_label(true)
///     .show_datetime(false);
/// node.write_with("retrying", SpinnerState::Warning, &options)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOptions {
    pub show_icon: bool,
    pub show_datetime: bool,
    pub label: Label,
    pub color_icon: Coloring,
    pub color_bullet: Coloring,
    pub color_label: Coloring,
    /// Shown for lines without an icon. `None` drops the bullet entirely.
    pub bullet: Option<String>,
    /// Pushes the line one extra level in.
    pub indent: bool,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            show_icon: true,
            show_datetime: true,
            label: Label::Off,
            color_icon: Coloring::ByState,
            color_bullet: Coloring::Shaded,
            color_label: Coloring::Shaded,
            bullet: Some(">".to_string()),
            indent: false,
        }
    }
}

impl LineOptions {
    pub fn show_icon(mut self, yes: bool) -> Self {
        self.show_icon = yes;
        self
    }

    pub fn show_datetime(mut self, yes: bool) -> Self {
        self.show_datetime = yes;
        self
    }

    pub fn label(mut self, label: impl Into<Label>) -> Self {
        self.label = label.into();
        self
    }

    pub fn color_icon(mut self, coloring: impl Into<Coloring>) -> Self {
        self.color_icon = coloring.into();
        self
    }

    pub fn color_bullet(mut self, coloring: impl Into<Coloring>) -> Self {
        self.color_bullet = coloring.into();
        self
    }

    pub fn color_label(mut self, coloring: impl Into<Coloring>) -> Self {
        self.color_label = coloring.into();
        self
    }

    pub fn bullet(mut self, bullet: Option<&str>) -> Self {
        self.bullet = bullet.map(str::to_string);
        self
    }

    pub fn indent(mut self, yes: bool) -> Self {
        self.indent = yes;
        self
    }

    /// Rejects bullets that are not exactly one character.
    pub fn validate(&self) -> Result<()> {
        match &self.bullet {
            Some(bullet) if bullet.chars().count() != 1 => {
                Err(SpinnerError::InvalidBullet(bullet.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// A line written beneath a node's header.
///
/// Lines are indented one level deeper than their node's header:
///
/// ```text
/// ✔ Preparing
///   > First message
///   ✘ Something happened
/// ```
#[derive(Debug, Clone)]
pub struct LineItem<'a> {
    pub text: &'a str,
    pub state: SpinnerState,
    pub depth: usize,
    pub options: &'a LineOptions,
    pub at: DateTime<Local>,
}

impl<'a> LineItem<'a> {
    pub fn new(
        text: &'a str, state: SpinnerState, depth: usize, options: &'a LineOptions,
    ) -> Self {
        Self {
            text,
            state,
            depth,
            options,
            at: Local::now(),
        }
    }

    /// Renders the line; `columns` is the terminal width used to right-align
    /// the timestamp.
    pub fn format(&self, theme: &Theme, columns: usize, base_indent: usize) -> String {
        let level = self.level();
        let indentation = " ".repeat((level + 1 + base_indent) * INDENT);

        let text = theme.shade(level, 1).paint(self.text);
        let body = match self.label_text() {
            Some(label) => {
                let shade = theme.shade(level, 1);
                let label = self.colored(self.options.color_label, shade, theme, label);
                format!("{label}: {text}")
            }
            None => text,
        };
        let message = match self.bullet(theme, level) {
            Some(bullet) => format!("{indentation}{bullet} {body}"),
            None => format!("{indentation}{body}"),
        };

        if !self.options.show_datetime {
            return message;
        }
        let stamp = theme
            .faded
            .wrapped("[", &self.at.format(DATE_FORMAT).to_string(), "]");
        let used = 5 + visible_width(&stamp) + visible_width(&message);
        let padding = columns.saturating_sub(used).max(1);
        format!("{message}{}{stamp}", " ".repeat(padding))
    }

    fn level(&self) -> usize {
        self.depth + usize::from(self.options.indent)
    }

    fn label_text(&self) -> Option<&str> {
        match &self.options.label {
            Label::Off => None,
            Label::State if self.state.is_set() => Some(self.state.label()),
            Label::State => None,
            Label::Text(text) => Some(text.as_str()),
        }
    }

    fn bullet(&self, theme: &Theme, level: usize) -> Option<String> {
        if self.options.show_icon && self.state.is_set() {
            let icon = self.state.format(theme).icon();
            return Some(self.colored(self.options.color_icon, theme.shade(level, 4), theme, icon));
        }
        let bullet = self.options.bullet.as_deref()?;
        let coloring = match self.state.is_set() {
            true => self.options.color_bullet,
            false => Coloring::Shaded,
        };
        Some(self.colored(coloring, theme.shade(level, 3), theme, bullet))
    }

    fn colored(&self, coloring: Coloring, shade: Format, theme: &Theme, text: &str) -> String {
        match coloring {
            Coloring::Fixed(color) => Format::color(color).paint(text),
            Coloring::ByState if self.state.is_set() => self.state.format(theme).paint(text),
            _ => shade.paint(text),
        }
    }
}

/// What sits in front of a header's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Designator {
    /// An animation glyph; the node is still running.
    Frame(&'static str),
    /// The state icon; the node is done.
    Icon,
}

/// The animated top row of a node.
#[derive(Debug, Clone)]
pub struct HeaderItem<'a> {
    pub text: &'a str,
    pub state: SpinnerState,
    pub depth: usize,
    pub designator: Designator,
}

impl<'a> HeaderItem<'a> {
    pub fn format(&self, theme: &Theme, base_indent: usize) -> String {
        let indentation = " ".repeat((self.depth + base_indent) * INDENT);
        let format = self.state.format(theme);
        let designator = match self.designator {
            Designator::Frame(glyph) if self.state.is_set() => format.paint(glyph),
            Designator::Frame(glyph) => theme.spinner.paint(glyph),
            Designator::Icon => format.paint(format.icon()),
        };
        format!("{indentation}{designator} {}", format.paint(self.text))
    }
}
