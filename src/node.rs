use std::sync::mpsc;
use std::thread::JoinHandle;

use indexmap::{IndexMap, IndexSet};

use crate::state::SpinnerState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// A reserved ID for the virtual root that owns top-level groups.
    pub const ROOT: Self = Self(0);

    /// Check if this ID refers to the root.
    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

/// Handle on a running animation thread. Dropping `stop` also stops it.
pub(crate) struct Animation {
    pub(crate) stop: mpsc::Sender<()>,
    pub(crate) handle: JoinHandle<()>,
}

pub(crate) struct Node {
    pub(crate) depth: usize,
    pub(crate) index: usize,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: IndexSet<NodeId>,
    pub(crate) text: String,
    pub(crate) frame: &'static str,
    pub(crate) state: SpinnerState,
    /// Rows printed below the header that belong to this node's subtree.
    pub(crate) line_count: usize,
    /// Ordinal of the header row among all rows the session printed.
    pub(crate) header_row: Option<usize>,
    pub(crate) started: bool,
    pub(crate) done: bool,
    pub(crate) animation: Option<Animation>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("depth", &self.depth)
            .field("index", &self.index)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("text", &self.text)
            .field("state", &self.state)
            .field("line_count", &self.line_count)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl Node {
    fn new(depth: usize, index: usize, parent: Option<NodeId>, text: String) -> Self {
        Self {
            depth,
            index,
            parent,
            text,
            children: IndexSet::new(),
            frame: "",
            state: SpinnerState::NotSet,
            line_count: 0,
            header_row: None,
            started: false,
            done: false,
            animation: None,
        }
    }

    /// Moves to `state` if it is more severe; returns whether it changed.
    pub(crate) fn escalate(&mut self, state: SpinnerState) -> bool {
        let (state, changed) = self.state.escalate(state);
        self.state = state;
        changed
    }

    /// Replaces the header text; returns whether it changed.
    pub(crate) fn set_text(&mut self, text: Option<&str>) -> bool {
        match text {
            Some(text) if text != self.text => {
                self.text = text.to_string();
                true
            }
            _ => false,
        }
    }
}

/// Append-only tree of nodes. Ids are handed out in creation order and are
/// never reused or removed.
#[derive(Debug)]
pub(crate) struct NodeRegistry {
    nodes: IndexMap<NodeId, Node>,
    next: usize,
}

impl NodeRegistry {
    pub(crate) fn new() -> Self {
        let mut nodes = IndexMap::new();
        nodes.insert(NodeId::ROOT, Node::new(0, 0, None, String::new()));
        Self { nodes, next: 1 }
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[&id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[&id]
    }

    /// Appends a child under `parent`. Children of the root are top-level
    /// groups at depth 0.
    pub(crate) fn insert(&mut self, parent: NodeId, text: String) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;

        let p_node = self.node_mut(parent);
        let depth = match parent.is_root() {
            true => 0,
            false => p_node.depth + 1,
        };
        let index = p_node.children.len();
        p_node.children.insert(id);

        self.nodes.insert(id, Node::new(depth, index, Some(parent), text));
        id
    }

    /// Counts one more row printed inside `id`'s subtree, for `id` and every
    /// ancestor below the root.
    pub(crate) fn count_row(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(id) = current.filter(|id| !id.is_root()) {
            let node = self.node_mut(id);
            node.line_count += 1;
            current = node.parent;
        }
    }

    /// The leaf below `from` that was opened last, ranked by depth, then
    /// sibling index, then creation order.
    pub(crate) fn latest_leaf(&self, from: NodeId) -> Option<NodeId> {
        let mut best: Option<(usize, usize, NodeId)> = None;
        let mut stack: Vec<NodeId> = self.node(from).children.iter().copied().collect();
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.children.is_empty() {
                let key = (node.depth, node.index, id);
                if best.is_none_or(|best| key > best) {
                    best = Some(key);
                }
            } else {
                stack.extend(node.children.iter().copied());
            }
        }
        best.map(|(_, _, id)| id)
    }

    /// The most recently created node that is still running.
    pub(crate) fn latest_open(&self) -> Option<NodeId> {
        self.nodes
            .iter()
            .rev()
            .find(|(id, node)| !id.is_root() && node.started && !node.done)
            .map(|(id, _)| *id)
    }
}
