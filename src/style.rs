//! Colors, icons and depth shading.
//!
//! All decoration goes through [`Format::paint`], which renders via
//! `owo-colors`. A [`Theme`] is an immutable palette; [`Theme::plain`] turns
//! every format into a no-op, which is what tests and non-color sinks use.

use owo_colors::Style;

/// A 24-bit foreground color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    /// Parses `#rrggbb`.
    pub fn hex(value: &str) -> Option<Self> {
        let digits = value.strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// A color + icon pair. The icon is only used by state formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Format {
    color: Option<Color>,
    bold: bool,
    icon: &'static str,
}

impl Format {
    pub const PLAIN: Self = Self {
        color: None,
        bold: false,
        icon: "",
    };

    pub const fn color(color: Color) -> Self {
        Self {
            color: Some(color),
            bold: false,
            icon: "",
        }
    }

    pub const fn with_icon(mut self, icon: &'static str) -> Self {
        self.icon = icon;
        self
    }

    pub const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Drops the color, keeping the icon.
    pub const fn uncolored(mut self) -> Self {
        self.color = None;
        self.bold = false;
        self
    }

    pub fn icon(&self) -> &'static str {
        self.icon
    }

    pub fn is_plain(&self) -> bool {
        self.color.is_none() && !self.bold
    }

    /// Decorates `text`. Plain formats return the text untouched.
    pub fn paint(&self, text: &str) -> String {
        if self.is_plain() {
            return text.to_string();
        }
        let mut style = Style::new();
        if let Some(Color(r, g, b)) = self.color {
            style = style.truecolor(r, g, b);
        }
        if self.bold {
            style = style.bold();
        }
        style.style(text).to_string()
    }

    /// Decorates `text` wrapped in `left`/`right`, e.g. `[` and `]`.
    pub fn wrapped(&self, left: &str, text: &str, right: &str) -> String {
        self.paint(&format!("{left}{text}{right}"))
    }
}

/// How an optional line element (icon, bullet, label) is colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Coloring {
    /// Shaded by depth, ignoring the line state.
    #[default]
    Shaded,
    /// Colored with the line state's color.
    ByState,
    /// Always this color.
    Fixed(Color),
}

impl From<bool> for Coloring {
    fn from(by_state: bool) -> Self {
        if by_state { Self::ByState } else { Self::Shaded }
    }
}

impl From<Color> for Coloring {
    fn from(color: Color) -> Self {
        Self::Fixed(color)
    }
}

const CHECK: &str = "✔";
const CROSS: &str = "✘";

/// Immutable palette handed to the render models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub spinner: Format,
    pub notset: Format,
    pub ok: Format,
    pub warning: Format,
    pub fail: Format,
    /// Used for line timestamps.
    pub faded: Format,
    /// Ordered darkest to lightest.
    pub shades: Vec<Color>,
}

impl Theme {
    /// No colors at all; icons are kept.
    pub fn plain() -> Self {
        Self {
            spinner: Format::PLAIN,
            notset: Format::PLAIN,
            ok: Format::PLAIN.with_icon(CHECK),
            warning: Format::PLAIN.with_icon(CROSS),
            fail: Format::PLAIN.with_icon(CROSS),
            faded: Format::PLAIN,
            shades: Vec::new(),
        }
    }

    pub fn with_spinner_color(mut self, color: Color) -> Self {
        self.spinner = Format::color(color);
        self
    }

    /// Picks a shade for an indentation `level`, skipping the `dark_limit`
    /// darkest shades and the lightest one. Levels past the end reuse the
    /// lightest usable shade.
    pub fn shade(&self, level: usize, dark_limit: usize) -> Format {
        let usable = self.shades.len().saturating_sub(1);
        if dark_limit >= usable {
            return Format::PLAIN;
        }
        let shades = &self.shades[dark_limit..usable];
        Format::color(shades[level.min(shades.len() - 1)])
    }
}

impl Default for Theme {
    fn default() -> Self {
        let gray = Color(0x69, 0x69, 0x69);
        Self {
            spinner: Format::color(Color(0x00, 0x7b, 0xff)),
            notset: Format::color(gray),
            ok: Format::color(Color(0x28, 0xa7, 0x45)).with_icon(CHECK),
            warning: Format::color(Color(0xcd, 0xad, 0x00)).with_icon(CROSS),
            fail: Format::color(Color(0xdc, 0x35, 0x45)).with_icon(CROSS),
            faded: Format::color(Color(0xa8, 0xa8, 0xa8)),
            shades: vec![
                Color(0x00, 0x00, 0x00),
                Color(0x15, 0x15, 0x15),
                Color(0x2a, 0x2a, 0x2a),
                Color(0x3f, 0x3f, 0x3f),
                Color(0x54, 0x54, 0x54),
                gray,
                Color(0xa8, 0xa8, 0xa8),
                Color(0xdb, 0xdb, 0xdb),
                Color(0xd7, 0xd7, 0xd7),
            ],
        }
    }
}
