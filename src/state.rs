use crate::style::{Format, Theme};

/// Severity of a node or line.
///
/// States are totally ordered by [`level`](SpinnerState::level). A node only
/// ever moves to a strictly more severe state, see [`SpinnerState::escalate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpinnerState {
    #[default]
    NotSet,
    Ok,
    Warning,
    Fail,
}

impl SpinnerState {
    /// Severity, `0` for [`NotSet`](SpinnerState::NotSet) up to `3` for
    /// [`Fail`](SpinnerState::Fail).
    pub fn level(self) -> u8 {
        match self {
            Self::NotSet => 0,
            Self::Ok => 1,
            Self::Warning => 2,
            Self::Fail => 3,
        }
    }

    /// Human readable label shown when line labels are enabled.
    pub fn label(self) -> &'static str {
        match self {
            Self::NotSet => "Not Set",
            Self::Ok => "Ok",
            Self::Warning => "Warning",
            Self::Fail => "Failed",
        }
    }

    pub fn is_set(self) -> bool {
        self != Self::NotSet
    }

    /// Resolves the color and icon used for this state.
    pub fn format(self, theme: &Theme) -> &Format {
        match self {
            Self::NotSet => &theme.notset,
            Self::Ok => &theme.ok,
            Self::Warning => &theme.warning,
            Self::Fail => &theme.fail,
        }
    }

    /// Returns `(candidate, true)` when `candidate` is strictly more severe
    /// than `self`, otherwise `(self, false)`.
    pub fn escalate(self, candidate: SpinnerState) -> (SpinnerState, bool) {
        if candidate.level() > self.level() {
            (candidate, true)
        } else {
            (self, false)
        }
    }
}

impl std::fmt::Display for SpinnerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
