use std::sync::Weak;

use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::Layer;

use crate::session::Session;
use crate::{Spinner, SpinnerState};

/// A `tracing` [`Layer`] that writes events into the spinner output.
///
/// Each event becomes a line under the most recently opened node that is
/// still running. `WARN` events escalate that node to a warning and `ERROR`
/// events to a failure. Events outside any running node are printed as bare
/// rows, so row accounting stays intact.
///
/// The layer does not keep the spinner alive. Once the last [`Spinner`]
/// handle is dropped the cursor is restored and later events are ignored,
/// even if the subscriber lives for the rest of the process.
///
/// ```rust,ignore
/// let spinner = Spinner::new();
/// tracing_subscriber::registry().with(spinner.layer()).init();
///
/// spinner.group("Syncing", |_| {
///     tracing::info!("3 files changed");
///     tracing::warn!("1 conflict");
///     Ok::<_, SpinnerError>(())
/// })?;
/// ```
#[derive(Debug, Clone)]
pub struct SpinnerLayer {
    session: Weak<Session>,
}

impl SpinnerLayer {
    pub fn new(spinner: &Spinner) -> Self {
        Self {
            session: spinner.downgrade(),
        }
    }
}

impl Spinner {
    /// Creates a [`SpinnerLayer`] writing into this spinner.
    pub fn layer(&self) -> SpinnerLayer {
        SpinnerLayer::new(self)
    }
}

impl<S: Subscriber> Layer<S> for SpinnerLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        // Our own diagnostics are emitted from inside spinner operations.
        if event.metadata().target().starts_with(env!("CARGO_CRATE_NAME")) {
            return;
        }
        let Some(session) = self.session.upgrade() else {
            return;
        };

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let state = match *event.metadata().level() {
            Level::ERROR => SpinnerState::Fail,
            Level::WARN => SpinnerState::Warning,
            _ => SpinnerState::NotSet,
        };
        // Nowhere left to report a broken terminal.
        let _ = session.log(&visitor.finish(), state);
    }
}

/// Collects the `message` field followed by any other fields as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        let mut out = self.message;
        for field in self.fields {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&field);
        }
        out
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            name => self.fields.push(format!("{name}={value}")),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            name => self.fields.push(format!("{name}={value:?}")),
        }
    }
}
