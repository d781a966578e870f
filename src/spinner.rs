use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::cursor::Cursor;
use crate::error::{Result, SpinnerError};
use crate::node::NodeId;
use crate::options::SpinnerOptions;
use crate::render::LineOptions;
use crate::session::Session;
use crate::state::SpinnerState;

/// Entry point: owns the terminal session and opens top-level groups.
///
/// Handles are cheap to clone and share one session. Dropping the last
/// handle shows the cursor again if a group hid it.
///
/// ```rust,ignore
/// let spinner = Spinner::new();
/// spinner.group("Preparing", |group| {
///     group.write("fetching index")?;
///     group.child("Unpacking", |child| {
///         child.write("3 files")?;
///         child.warning(Some("skipped a symlink"))
///     })
/// })?;
/// ```
///
/// ```text
/// ✘ Preparing
///   > fetching index
///   ✘ Unpacking
///     > 3 files
///     ✘ skipped a symlink
/// ```
#[derive(Clone)]
pub struct Spinner {
    session: Arc<Session>,
}

impl Spinner {
    /// Spinner on stdout with default options.
    pub fn new() -> Self {
        Self {
            session: Arc::new(Session::new(Cursor::stdout(), SpinnerOptions::default())),
        }
    }

    /// Spinner on stdout.
    pub fn with_options(options: SpinnerOptions) -> Result<Self> {
        Self::with_cursor(Cursor::stdout(), options)
    }

    /// Spinner drawing through `cursor`, e.g. one wrapping stderr or an
    /// in-memory buffer.
    pub fn with_cursor(cursor: Cursor, options: SpinnerOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            session: Arc::new(Session::new(cursor, options)),
        })
    }

    pub fn options(&self) -> &SpinnerOptions {
        &self.session.options
    }

    /// Opens a top-level group for the duration of `body`.
    ///
    /// The group is finalized on every exit path. If `body` fails, its error
    /// message is written as a failed line first; if it panics, the panic
    /// message is, and the panic resumes after cleanup.
    pub fn group<T, E, F>(&self, text: &str, body: F) -> Result<T, E>
    where
        F: FnOnce(&SpinnerNode) -> Result<T, E>,
        E: From<SpinnerError> + Display,
    {
        scoped(&self.session, NodeId::ROOT, text, false, body)
    }

    /// Opens a group next to the leaf that was opened last, picking up where
    /// earlier output left off.
    pub fn reenter<T, E, F>(&self, text: &str, body: F) -> Result<T, E>
    where
        F: FnOnce(&SpinnerNode) -> Result<T, E>,
        E: From<SpinnerError> + Display,
    {
        let parent = self.session.reentry_parent(NodeId::ROOT);
        scoped(&self.session, parent, text, true, body)
    }

    /// Top-level groups opened so far.
    pub fn groups(&self) -> Vec<SpinnerNode> {
        SpinnerNode::root(&self.session).children()
    }

    #[cfg(feature = "layer")]
    pub(crate) fn downgrade(&self) -> std::sync::Weak<Session> {
        Arc::downgrade(&self.session)
    }
}

impl Default for Spinner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Spinner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spinner")
            .field("options", &self.session.options)
            .finish_non_exhaustive()
    }
}

/// One animated block: a header row and the lines and child nodes below it.
///
/// Nodes are handed out by [`Spinner::group`], [`SpinnerNode::child`] and
/// the `reenter` methods. A node can be cloned and written to from other
/// threads while its scope is running.
#[derive(Clone)]
pub struct SpinnerNode {
    id: NodeId,
    session: Arc<Session>,
}

impl SpinnerNode {
    fn root(session: &Arc<Session>) -> Self {
        Self {
            id: NodeId::ROOT,
            session: Arc::clone(session),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Writes a plain line beneath the header.
    pub fn write(&self, text: &str) -> Result<()> {
        self.session.write(self.id, text, SpinnerState::NotSet, None)
    }

    /// Writes a line carrying `state`, escalating the node.
    pub fn write_state(&self, text: &str, state: SpinnerState) -> Result<()> {
        self.session.write(self.id, text, state, None)
    }

    /// Writes a line with its own rendering options.
    pub fn write_with(&self, text: &str, state: SpinnerState, options: &LineOptions) -> Result<()> {
        self.session.write(self.id, text, state, Some(options))
    }

    /// Writes a warning line, or only escalates the node when `text` is
    /// `None` or empty.
    pub fn warning(&self, text: Option<&str>) -> Result<()> {
        self.mark(SpinnerState::Warning, text)
    }

    /// Writes a failure line, or only escalates the node when `text` is
    /// `None` or empty.
    pub fn fail(&self, text: Option<&str>) -> Result<()> {
        self.mark(SpinnerState::Fail, text)
    }

    /// Alias of [`fail`](Self::fail).
    pub fn error(&self, text: Option<&str>) -> Result<()> {
        self.fail(text)
    }

    fn mark(&self, state: SpinnerState, text: Option<&str>) -> Result<()> {
        match text.filter(|text| !text.is_empty()) {
            Some(text) => self.write_state(text, state),
            None => self.session.escalate(self.id, state),
        }
    }

    /// Finalizes the node, optionally replacing its header text. Later calls
    /// do nothing.
    pub fn done(&self, text: Option<&str>) -> Result<()> {
        self.session.finish(self.id, text)
    }

    /// Opens a child one level deeper for the duration of `body`. See
    /// [`Spinner::group`] for the cleanup guarantees.
    pub fn child<T, E, F>(&self, text: &str, body: F) -> Result<T, E>
    where
        F: FnOnce(&SpinnerNode) -> Result<T, E>,
        E: From<SpinnerError> + Display,
    {
        scoped(&self.session, self.id, text, false, body)
    }

    /// Opens a node next to the leaf below this node that was opened last,
    /// or a plain child when this node has none.
    pub fn reenter<T, E, F>(&self, text: &str, body: F) -> Result<T, E>
    where
        F: FnOnce(&SpinnerNode) -> Result<T, E>,
        E: From<SpinnerError> + Display,
    {
        let parent = self.session.reentry_parent(self.id);
        scoped(&self.session, parent, text, parent != self.id, body)
    }

    pub fn state(&self) -> SpinnerState {
        self.session.lock().tree.node(self.id).state
    }

    /// Rows printed below the header by this node and its descendants,
    /// including every child header.
    pub fn line_count(&self) -> usize {
        self.session.lock().tree.node(self.id).line_count
    }

    pub fn depth(&self) -> usize {
        self.session.lock().tree.node(self.id).depth
    }

    /// Position among its siblings.
    pub fn index(&self) -> usize {
        self.session.lock().tree.node(self.id).index
    }

    pub fn text(&self) -> String {
        self.session.lock().tree.node(self.id).text.clone()
    }

    pub fn is_done(&self) -> bool {
        self.session.lock().tree.node(self.id).done
    }

    pub fn children(&self) -> Vec<SpinnerNode> {
        let shared = self.session.lock();
        shared
            .tree
            .node(self.id)
            .children
            .iter()
            .map(|id| SpinnerNode {
                id: *id,
                session: Arc::clone(&self.session),
            })
            .collect()
    }
}

impl std::fmt::Debug for SpinnerNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = self.session.lock();
        f.debug_struct("SpinnerNode")
            .field("id", &self.id)
            .field("node", shared.tree.node(self.id))
            .finish()
    }
}

fn scoped<T, E, F>(
    session: &Arc<Session>, parent: NodeId, text: &str, reentering: bool, body: F,
) -> Result<T, E>
where
    F: FnOnce(&SpinnerNode) -> Result<T, E>,
    E: From<SpinnerError> + Display,
{
    let id = session.open(parent, text, reentering)?;
    let node = SpinnerNode {
        id,
        session: Arc::clone(session),
    };
    if let Err(error) = session.start(id) {
        node.close_failed(&error.to_string());
        return Err(error.into());
    }

    match panic::catch_unwind(AssertUnwindSafe(|| body(&node))) {
        Ok(Ok(value)) => {
            node.done(None)?;
            Ok(value)
        }
        Ok(Err(error)) => {
            node.close_failed(&error.to_string());
            Err(error)
        }
        Err(payload) => {
            node.close_failed(&panic_message(payload.as_ref()));
            panic::resume_unwind(payload)
        }
    }
}

impl SpinnerNode {
    /// Records `message` as a failed line and finalizes, also when the body
    /// already called `done`. The caller's own error wins over anything that
    /// goes wrong here.
    fn close_failed(&self, message: &str) {
        let result = self
            .session
            .fail_scope(self.id, message)
            .and_then(|_| self.done(None));
        if let Err(error) = result {
            tracing::debug!(id = ?self.id, %error, "failed to close spinner node");
            let _ = self.done(None);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked".to_string()
    }
}
