use std::collections::HashMap;
use std::fmt;

/// Index of a node inside a [`Trie`] arena.
pub type NodeId = usize;

/// Id of the root node, always present.
pub const ROOT: NodeId = 0;

/// Represents a vertex of the model tree.
///
/// A `Node` corresponds to one root-to-node token path and stores how many
/// times that exact path was observed while training.
///
/// ## Invariants
/// - The root has an empty token and no parent
/// - Every other node is owned by exactly one parent, through `children`
/// - `parent` is a lookup link only, used to rebuild paths upward
#[derive(Clone, Debug)]
pub struct Node {
	/// Token represented by this node (empty for the root).
	token: String,
	/// Number of observations of the path ending here.
	count: usize,
	/// Children indexed by their token.
	children: HashMap<String, NodeId>,
	/// Parent id (`None` for the root).
	parent: Option<NodeId>,
	/// Created only from wrap-around padding, never offered as a continuation.
	hidden: bool,
}

impl Node {
	fn new(token: &str, parent: Option<NodeId>) -> Self {
		Self {
			token: token.to_owned(),
			count: 0,
			children: HashMap::new(),
			parent,
			hidden: false,
		}
	}

	pub fn token(&self) -> &str {
		&self.token
	}

	pub fn count(&self) -> usize {
		self.count
	}

	pub fn parent(&self) -> Option<NodeId> {
		self.parent
	}

	pub fn is_hidden(&self) -> bool {
		self.hidden
	}

	pub fn is_root(&self) -> bool {
		self.parent.is_none()
	}
}

/// Arena-backed prefix tree of observed token windows.
///
/// Nodes are never removed, so a `NodeId` stays valid for the lifetime of
/// the trie.
#[derive(Clone, Debug)]
pub struct Trie {
	nodes: Vec<Node>,
}

impl Default for Trie {
	fn default() -> Self {
		Self::new()
	}
}

impl Trie {
	/// Creates a trie holding only the root.
	pub fn new() -> Self {
		Self { nodes: vec![Node::new("", None)] }
	}

	pub fn node(&self, id: NodeId) -> &Node {
		&self.nodes[id]
	}

	pub fn token(&self, id: NodeId) -> &str {
		&self.nodes[id].token
	}

	/// Number of nodes, root included.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes[ROOT].children.is_empty()
	}

	/// Returns the child of `parent` for `token`, if any.
	pub fn child(&self, parent: NodeId, token: &str) -> Option<NodeId> {
		self.nodes[parent].children.get(token).copied()
	}

	/// Records an occurrence of `token` below `parent`.
	///
	/// - If the child already exists, its count is increased
	/// - Otherwise, a new child is created with a count of 1
	///
	/// A node reached through a real (non padded) window becomes visible, a
	/// node created by padding starts hidden.
	pub fn add_child(&mut self, parent: NodeId, token: &str, hidden: bool) -> NodeId {
		let id = match self.child(parent, token) {
			Some(id) => {
				if !hidden {
					self.nodes[id].hidden = false;
				}
				id
			}
			None => {
				let id = self.nodes.len();
				let mut node = Node::new(token, Some(parent));
				node.hidden = hidden;
				self.nodes.push(node);
				self.nodes[parent].children.insert(token.to_owned(), id);
				id
			}
		};
		self.nodes[id].count += 1;
		id
	}

	/// Overrides the count of a node (used when rebuilding a stored trie).
	pub(crate) fn set_count(&mut self, id: NodeId, count: usize) {
		self.nodes[id].count = count;
	}

	/// Children of a node sorted by token, hidden ones included.
	pub fn children(&self, id: NodeId) -> Vec<NodeId> {
		let mut children: Vec<NodeId> = self.nodes[id].children.values().copied().collect();
		children.sort_by(|a, b| self.nodes[*a].token.cmp(&self.nodes[*b].token));
		children
	}

	/// Children of a node that can be offered as continuations.
	pub fn visible_children(&self, id: NodeId) -> Vec<NodeId> {
		let mut children = self.children(id);
		children.retain(|child| !self.nodes[*child].hidden);
		children
	}

	/// Sum of the counts of the visible children of a node.
	pub fn child_count(&self, id: NodeId) -> usize {
		self.nodes[id]
			.children
			.values()
			.map(|child| &self.nodes[*child])
			.filter(|child| !child.hidden)
			.map(|child| child.count)
			.sum()
	}

	/// Follows `path` from the root, token by token.
	///
	/// Returns `None` as soon as a token is missing. An empty path resolves
	/// to the root.
	pub fn path_to<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
		let mut node = ROOT;
		for token in path {
			node = self.child(node, token.as_ref())?;
		}
		Some(node)
	}

	/// Rebuilds the token path from the root down to `id`.
	pub fn path_of(&self, id: NodeId) -> Vec<&str> {
		let mut path = Vec::new();
		let mut current = id;
		while let Some(parent) = self.nodes[current].parent {
			path.push(self.nodes[current].token.as_str());
			current = parent;
		}
		path.reverse();
		path
	}

	/// Depth of a node (the root is at depth 0).
	pub fn depth(&self, id: NodeId) -> usize {
		let mut depth = 0;
		let mut current = id;
		while let Some(parent) = self.nodes[current].parent {
			depth += 1;
			current = parent;
		}
		depth
	}

	fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, indent: usize) -> fmt::Result {
		let total = self.child_count(id);
		for child in self.children(id) {
			let node = &self.nodes[child];
			let probability = if total > 0 && !node.hidden {
				node.count as f64 / total as f64
			} else {
				0.0
			};
			writeln!(
				f,
				"{}'{}'{} [{},p={:.3}]",
				"  ".repeat(indent),
				node.token,
				if node.hidden { "*" } else { "" },
				node.count,
				probability
			)?;
			self.fmt_node(f, child, indent + 1)?;
		}
		Ok(())
	}
}

impl fmt::Display for Trie {
	/// Indented dump of the tree, hidden nodes flagged with `*`.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "ROOT")?;
		self.fmt_node(f, ROOT, 1)
	}
}
