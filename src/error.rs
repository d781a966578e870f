/// Errors surfaced by spinner operations.
#[derive(Debug, thiserror::Error)]
pub enum SpinnerError {
    /// The node has already been finalized with [`done`](crate::SpinnerNode::done).
    #[error("spinner node \"{text}\" is already done")]
    Finalized { text: String },

    /// Line bullets must be exactly one character wide.
    #[error("bullet {0:?} must be a single character")]
    InvalidBullet(String),

    /// A frame source needs at least one glyph to animate.
    #[error("frame source has no frames")]
    NoFrames,

    /// Animation intervals must be non-zero.
    #[error("spin interval must be greater than zero")]
    ZeroInterval,

    #[error("terminal output failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = SpinnerError> = std::result::Result<T, E>;
