//! Shared terminal state for one [`Spinner`](crate::Spinner) and all of its
//! nodes.
//!
//! Every cursor movement and write happens under a single session-wide lock,
//! together with the node tree it is accounting for. The cursor always rests
//! on the row below the last printed row (the *bottom*). Header repaints move
//! up by the distance between the bottom and the header row, overwrite it and
//! move back down; line appends print at the bottom.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use crate::cursor::Cursor;
use crate::error::{Result, SpinnerError};
use crate::node::{Animation, NodeId, NodeRegistry};
use crate::options::SpinnerOptions;
use crate::render::{Designator, HeaderItem, LineItem, LineOptions};
use crate::state::SpinnerState;

pub(crate) struct Session {
    shared: Mutex<Shared>,
    pub(crate) options: SpinnerOptions,
}

pub(crate) struct Shared {
    pub(crate) tree: NodeRegistry,
    cursor: Cursor,
    /// Rows printed so far; the cursor sits on row `bottom`.
    bottom: usize,
    cursor_hidden: bool,
}

impl Session {
    /// `options` are expected to be validated already.
    pub(crate) fn new(cursor: Cursor, options: SpinnerOptions) -> Self {
        Self {
            shared: Mutex::new(Shared {
                tree: NodeRegistry::new(),
                cursor,
                bottom: 0,
                cursor_hidden: false,
            }),
            options,
        }
    }

    /// Nothing that holds the lock panics while output is half written, so a
    /// poisoned lock still guards a consistent tree.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a node under `parent`. Only a reentered node may be attached
    /// to a parent that is already done.
    pub(crate) fn open(&self, parent: NodeId, text: &str, reentering: bool) -> Result<NodeId> {
        let mut shared = self.lock();
        let p_node = shared.tree.node(parent);
        if p_node.done && !reentering {
            return Err(SpinnerError::Finalized {
                text: p_node.text.clone(),
            });
        }
        if parent.is_root() && self.options.separate {
            shared.cursor.newline()?;
            shared.bottom += 1;
        }
        let id = shared.tree.insert(parent, text.to_string());
        drop(shared);

        tracing::debug!(?id, ?parent, text, "spinner node opened");
        Ok(id)
    }

    /// Paints the first header row and starts the animation thread.
    pub(crate) fn start(self: &Arc<Self>, id: NodeId) -> Result<()> {
        let mut shared = self.lock();
        let node = shared.tree.node_mut(id);
        if node.started {
            return Ok(());
        }
        node.started = true;
        node.frame = self.options.frames.frames()[0];

        if !shared.cursor_hidden && shared.cursor.is_interactive() {
            shared.cursor.hide()?;
            shared.cursor_hidden = true;
        }
        shared.paint_header(id, &self.options)?;
        shared.cursor.flush()?;

        let (stop, signal) = mpsc::channel();
        let session = Arc::clone(self);
        let handle = thread::Builder::new()
            .name("spinner".to_string())
            .spawn(move || session.animate(id, signal))?;
        shared.tree.node_mut(id).animation = Some(Animation { stop, handle });
        Ok(())
    }

    /// Animation loop. Waiting on the stop channel doubles as the frame timer,
    /// so a stop request is seen within one interval.
    fn animate(&self, id: NodeId, signal: mpsc::Receiver<()>) {
        tracing::trace!(?id, "animation started");
        let interval = self.options.interval();
        // The first glyph was painted by `start`.
        let mut frames = self.options.frames.cycle().skip(1);

        loop {
            match signal.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
            let Some(glyph) = frames.next() else { break };

            let result = {
                let mut shared = self.lock();
                let node = shared.tree.node_mut(id);
                if node.done {
                    break;
                }
                if glyph == node.frame {
                    continue;
                }
                node.frame = glyph;
                shared
                    .paint_header(id, &self.options)
                    .and_then(|_| shared.cursor.flush())
            };
            // Dropped frames are not worth failing the caller over.
            if let Err(error) = result {
                tracing::debug!(?id, %error, "failed to repaint spinner header");
            }
        }
        tracing::trace!(?id, "animation stopped");
    }

    /// Appends a line to `id`, escalating its state.
    pub(crate) fn write(
        &self, id: NodeId, text: &str, state: SpinnerState, options: Option<&LineOptions>,
    ) -> Result<()> {
        let options = options.unwrap_or(&self.options.line);
        options.validate()?;
        if !self.options.write_interval.is_zero() {
            thread::sleep(self.options.write_interval);
        }

        let mut shared = self.lock();
        shared.ensure_open(id)?;
        shared.append_line(id, text, state, options, &self.options)?;
        shared.cursor.flush()?;
        Ok(())
    }

    /// Escalates `id` without printing a line.
    pub(crate) fn escalate(&self, id: NodeId, state: SpinnerState) -> Result<()> {
        let mut shared = self.lock();
        shared.ensure_open(id)?;
        if shared.tree.node_mut(id).escalate(state) {
            shared.paint_header(id, &self.options)?;
            shared.cursor.flush()?;
        }
        Ok(())
    }

    /// Finalizes `id`: OK unless something worse was recorded, optional new
    /// text, animation joined, icon painted, state bubbled up. Only the first
    /// call has any effect.
    pub(crate) fn finish(&self, id: NodeId, text: Option<&str>) -> Result<()> {
        let animation = {
            let mut shared = self.lock();
            let node = shared.tree.node_mut(id);
            if node.done {
                return Ok(());
            }
            node.done = true;
            node.escalate(SpinnerState::Ok);
            node.set_text(text);
            node.animation.take()
        };

        // Never join while holding the lock: the thread may be waiting on it.
        if let Some(Animation { stop, handle }) = animation {
            let _ = stop.send(());
            if handle.join().is_err() {
                tracing::debug!(?id, "animation thread panicked");
            }
        }

        let state = {
            let mut shared = self.lock();
            shared.paint_header(id, &self.options)?;
            shared.bubble(id, &self.options)?;
            shared.cursor.flush()?;
            shared.tree.node(id).state
        };
        tracing::debug!(?id, %state, "spinner node done");
        Ok(())
    }

    /// Records the error a scope closed with as a FAIL line on `id`. Unlike
    /// [`write`](Self::write) this also lands on a node the body already
    /// finished, in which case the failure is bubbled right away.
    pub(crate) fn fail_scope(&self, id: NodeId, message: &str) -> Result<()> {
        let mut shared = self.lock();
        shared.append_line(id, message, SpinnerState::Fail, &self.options.line, &self.options)?;
        if shared.tree.node(id).done {
            shared.bubble(id, &self.options)?;
        }
        shared.cursor.flush()?;
        Ok(())
    }

    /// Writes `text` into the most recently opened running node, or as a
    /// bare row when nothing is running.
    #[cfg(feature = "layer")]
    pub(crate) fn log(&self, text: &str, state: SpinnerState) -> Result<()> {
        let mut shared = self.lock();
        match shared.tree.latest_open() {
            Some(id) => shared.append_line(id, text, state, &self.options.line, &self.options)?,
            None => {
                shared.cursor.write_line(text)?;
                shared.bottom += 1;
            }
        }
        shared.cursor.flush()?;
        Ok(())
    }

    /// Where a reentered node should be attached when resuming below `from`.
    pub(crate) fn reentry_parent(&self, from: NodeId) -> NodeId {
        let shared = self.lock();
        shared
            .tree
            .latest_leaf(from)
            .and_then(|leaf| shared.tree.node(leaf).parent)
            .unwrap_or(from)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let shared = self.shared.get_mut().unwrap_or_else(PoisonError::into_inner);
        if shared.cursor_hidden {
            let _ = shared.cursor.show().and_then(|_| shared.cursor.flush());
        }
    }
}

impl Shared {
    fn ensure_open(&self, id: NodeId) -> Result<()> {
        let node = self.tree.node(id);
        match node.done {
            true => Err(SpinnerError::Finalized {
                text: node.text.clone(),
            }),
            false => Ok(()),
        }
    }

    fn append_line(
        &mut self, id: NodeId, text: &str, state: SpinnerState, line: &LineOptions,
        options: &SpinnerOptions,
    ) -> Result<()> {
        let node = self.tree.node_mut(id);
        let changed = node.escalate(state);
        let formatted = LineItem::new(text, state, node.depth, line).format(
            &options.theme,
            self.cursor.columns(),
            options.base_indent,
        );

        self.cursor.write_line(&formatted)?;
        self.bottom += 1;
        self.tree.count_row(id);

        if changed {
            self.paint_header(id, options)?;
        }
        Ok(())
    }

    /// Draws the header of `id`: a new row on the first paint, an in-place
    /// overwrite afterwards. Headers scrolled out of view are left alone.
    fn paint_header(&mut self, id: NodeId, options: &SpinnerOptions) -> std::io::Result<()> {
        let node = self.tree.node(id);
        let designator = match node.done {
            true => Designator::Icon,
            false => Designator::Frame(node.frame),
        };
        let header = HeaderItem {
            text: &node.text,
            state: node.state,
            depth: node.depth,
            designator,
        }
        .format(&options.theme, options.base_indent);
        let (header_row, parent) = (node.header_row, node.parent);

        match header_row {
            None => {
                self.cursor.write_line(&header)?;
                self.tree.node_mut(id).header_row = Some(self.bottom);
                self.bottom += 1;
                if let Some(parent) = parent {
                    self.tree.count_row(parent);
                }
            }
            Some(row) => {
                let up = self.bottom - row;
                if self.cursor.rows().is_some_and(|rows| up >= rows) {
                    return Ok(());
                }
                self.cursor.move_up(up)?;
                self.cursor.overwrite_line(&header)?;
                self.cursor.carriage_return()?;
                self.cursor.move_down(up)?;
            }
        }
        Ok(())
    }

    /// Escalates ancestors with the final state of `id`. Finished ancestors
    /// are repainted and passed through; an open ancestor bubbles on its own
    /// once it finishes.
    fn bubble(&mut self, id: NodeId, options: &SpinnerOptions) -> std::io::Result<()> {
        let state = self.tree.node(id).state;
        if state.level() <= SpinnerState::Ok.level() {
            return Ok(());
        }
        let mut current = id;
        while let Some(parent) = self.tree.node(current).parent.filter(|p| !p.is_root()) {
            let p_node = self.tree.node_mut(parent);
            let finished = p_node.done;
            if !p_node.escalate(state) {
                break;
            }
            self.paint_header(parent, options)?;
            if !finished {
                break;
            }
            current = parent;
        }
        Ok(())
    }
}
