//! The node tree.
//!
//! The tree mirrors a directory on disk:
//!
//! ```text
//! ~/.config/jumpline/hosts/
//! ├── .base.yaml          # applies to every node
//! ├── bastion.yaml        # leaf: host "bastion"
//! └── dc/
//!     ├── .base.yaml      # applies to everything under dc/
//!     ├── db1.yaml        # leaf: id "dc.db1", host "db1"
//!     └── web/
//!         └── web1.yml    # leaf: id "dc.web.web1"
//! ```
//!
//! Files are leaves with a host, directories are grouping nodes whose
//! reserved `.base.yaml` is inherited by their descendants. Hidden entries
//! are skipped. Nodes live in an arena and refer to each other by
//! [`NodeId`]; profiles are parsed and resolved lazily, once per node.

use crate::error::{ConfigError, JumplineError, Result};
use crate::profile::{LocalProfile, LoginProfile};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Reserved override file of a directory node.
pub const NODE_CONF: &str = ".base.yaml";

/// Index of a node inside its [`ConfigTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// One file or directory of the tree.
#[derive(Debug)]
pub struct ConfigNode {
    id: String,
    name: String,
    path: PathBuf,
    is_dir: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: OnceLock<std::result::Result<LocalProfile, ConfigError>>,
    profile: OnceLock<std::result::Result<LoginProfile, ConfigError>>,
}

impl ConfigNode {
    fn new(id: String, name: String, path: PathBuf, is_dir: bool, parent: Option<NodeId>) -> Self {
        Self {
            id,
            name,
            path,
            is_dir,
            parent,
            children: Vec::new(),
            local: OnceLock::new(),
            profile: OnceLock::new(),
        }
    }

    /// Dot-joined path of names from the root. Empty for the root.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// File name without `.yaml`/`.yml`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Only file nodes name a host.
    pub fn has_host(&self) -> bool {
        !self.is_dir
    }

    /// The YAML file holding this node's own settings.
    pub fn config_file(&self) -> PathBuf {
        if self.is_dir {
            self.path.join(NODE_CONF)
        } else {
            self.path.clone()
        }
    }
}

/// All nodes discovered under a root directory.
#[derive(Debug)]
pub struct ConfigTree {
    root: PathBuf,
    nodes: Vec<ConfigNode>,
    by_id: BTreeMap<String, NodeId>,
    by_name: HashMap<String, Vec<NodeId>>,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

fn node_name(file_name: &str) -> &str {
    file_name
        .strip_suffix(".yaml")
        .or_else(|| file_name.strip_suffix(".yml"))
        .unwrap_or(file_name)
}

impl ConfigTree {
    /// Walk `root` and build the tree. A missing root gives a tree holding
    /// only the root node.
    pub fn build(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut tree = Self {
            nodes: vec![ConfigNode::new(String::new(), String::new(), root.clone(), true, None)],
            root,
            by_id: BTreeMap::new(),
            by_name: HashMap::new(),
        };
        if !tree.root.is_dir() {
            warn!(root = %tree.root.display(), "node root is not a directory");
            return tree;
        }

        let mut walker = WalkDir::new(&tree.root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e));
        // stack[d] is the directory node at depth d on the current path.
        let mut stack = vec![tree.root_id()];
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            stack.truncate(entry.depth());
            let Some(&parent) = stack.last() else {
                continue;
            };
            let is_dir = entry.file_type().is_dir();
            let file_name = entry.file_name().to_string_lossy();
            match tree.insert(parent, node_name(&file_name), entry.path(), is_dir) {
                Some(id) if is_dir => stack.push(id),
                Some(_) => {}
                None if is_dir => walker.skip_current_dir(),
                None => {}
            }
        }
        debug!(root = %tree.root.display(), nodes = tree.by_id.len(), "built node tree");
        tree
    }

    /// Rebuild from the same root, dropping every cached profile. For
    /// long-lived callers; the CLI builds a fresh tree per run.
    pub fn reload(&mut self) {
        *self = Self::build(self.root.clone());
    }

    fn insert(&mut self, parent: NodeId, name: &str, path: &Path, is_dir: bool) -> Option<NodeId> {
        let parent_id = &self.nodes[parent.0].id;
        let id = if parent_id.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", parent_id, name)
        };
        if let Some(existing) = self.by_id.get(&id) {
            warn!(
                id = %id,
                kept = %self.nodes[existing.0].path.display(),
                skipped = %path.display(),
                "duplicate node id"
            );
            return None;
        }

        let node_id = NodeId(self.nodes.len());
        self.nodes.push(ConfigNode::new(id.clone(), name.to_string(), path.to_path_buf(), is_dir, Some(parent)));
        self.nodes[parent.0].children.push(node_id);
        self.by_id.insert(id, node_id);
        self.by_name.entry(name.to_string()).or_default().push(node_id);
        Some(node_id)
    }

    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &ConfigNode {
        &self.nodes[id.0]
    }

    /// Number of nodes, not counting the root.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Look a node up by identifier. The empty identifier is the root.
    pub fn get(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return Some(self.root_id());
        }
        self.by_id.get(id).copied()
    }

    /// Every node with this name, in walk order.
    pub fn by_name(&self, name: &str) -> &[NodeId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// `id` itself followed by its parents up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |n| self.nodes[n.0].parent)
    }

    /// All descendants of `id`, breadth first.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut queue: VecDeque<NodeId> = self.node(id).children.iter().copied().collect();
        while let Some(next) = queue.pop_front() {
            found.push(next);
            queue.extend(self.node(next).children.iter().copied());
        }
        found
    }

    /// Identifiers containing `text`, sorted. Empty text matches nothing.
    pub fn search(&self, text: &str) -> Vec<&str> {
        if text.is_empty() {
            return Vec::new();
        }
        self.by_id.keys().filter(|id| id.contains(text)).map(String::as_str).collect()
    }

    /// Identifiers starting with `prefix`, sorted. Empty prefix matches nothing.
    pub fn list(&self, prefix: &str) -> Vec<&str> {
        if prefix.is_empty() {
            return Vec::new();
        }
        self.by_id
            .keys()
            .filter(|id| id.starts_with(prefix))
            .map(String::as_str)
            .collect()
    }

    /// What the node's own file declares, parsed on first use.
    pub fn local(&self, id: NodeId) -> std::result::Result<&LocalProfile, ConfigError> {
        let node = self.node(id);
        node.local
            .get_or_init(|| LocalProfile::load(&node.config_file()))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// The node's resolved profile, computed on first use.
    ///
    /// # Errors
    ///
    /// [`JumplineError::Config`] if the node's file or any ancestor's file is
    /// malformed.
    pub fn profile(&self, id: NodeId) -> Result<&LoginProfile> {
        self.node(id)
            .profile
            .get_or_init(|| self.resolve_profile(id))
            .as_ref()
            .map_err(|e| JumplineError::Config(e.clone()))
    }

    fn resolve_profile(&self, id: NodeId) -> std::result::Result<LoginProfile, ConfigError> {
        let locals = self
            .ancestors(id)
            .map(|a| self.local(a))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let node = self.node(id);
        let host = node
            .has_host()
            .then(|| locals[0].host.clone().unwrap_or_else(|| node.name.clone()));
        Ok(LoginProfile::resolve(&locals, host))
    }

    /// Draw the subtree rooted at `id`.
    pub fn render(&self, id: NodeId) -> String {
        let node = self.node(id);
        let mut out = if node.id.is_empty() {
            format!("{}\n", self.root.display())
        } else {
            format!("{}\n", node.id)
        };
        self.render_children(id, "", &mut out);
        out
    }

    fn render_children(&self, id: NodeId, prefix: &str, out: &mut String) {
        let children = &self.node(id).children;
        for (i, &child) in children.iter().enumerate() {
            let last = i + 1 == children.len();
            out.push_str(prefix);
            out.push_str(if last { "└── " } else { "├── " });
            out.push_str(&self.node(child).name);
            out.push('\n');
            let nested = format!("{}{}", prefix, if last { "    " } else { "│   " });
            self.render_children(child, &nested, out);
        }
    }
}
