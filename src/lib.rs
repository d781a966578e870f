#![doc = include_str!("../README.md")]

pub(crate) mod cursor;
pub(crate) mod error;
pub(crate) mod frames;
#[cfg(feature = "layer")]
pub(crate) mod layer;
pub(crate) mod node;
pub(crate) mod options;
pub(crate) mod render;
pub(crate) mod session;
pub(crate) mod spinner;
pub(crate) mod state;
pub(crate) mod style;

#[cfg(test)]
mod test;

/// Re-exports of all public types and traits.
pub mod prelude {
    pub use crate::cursor::{Cursor, Viewport};
    pub use crate::error::{Result, SpinnerError};
    pub use crate::frames::Frames;
    #[cfg(feature = "layer")]
    pub use crate::layer::SpinnerLayer;
    pub use crate::node::NodeId;
    pub use crate::options::SpinnerOptions;
    pub use crate::render::{
        DATE_FORMAT, Designator, HeaderItem, INDENT, Label, LineItem, LineOptions, visible_width,
    };
    pub use crate::spinner::{Spinner, SpinnerNode};
    pub use crate::state::SpinnerState;
    pub use crate::style::{Color, Coloring, Format, Theme};
}

pub use crate::prelude::*;
