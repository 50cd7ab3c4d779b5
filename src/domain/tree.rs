use crate::{
    domain::{
        identity::{IdGenerator, Identity},
        level::Level,
        sequence,
    },
    error::{Result, TrellisError},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, warn};

/// Nested tree document, the shape trees are exported, imported and fetched in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: Identity,
    pub label: String,
    pub level: Level,
    /// `None` when children were never materialized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
    #[serde(default)]
    pub is_expanded: bool,
    #[serde(default)]
    pub is_loading: bool,
    /// Hint that the node may have children not yet fetched
    #[serde(default)]
    pub has_children: bool,
}

impl TreeNode {
    /// Creates a collapsed node; only non-terminal levels may have children
    pub fn new(id: Identity, label: String, level: Level) -> Self {
        Self {
            id,
            label,
            level,
            children: None,
            is_expanded: false,
            is_loading: false,
            has_children: !level.is_terminal(),
        }
    }

    pub fn with_children(mut self, children: Vec<TreeNode>) -> Self {
        self.children = Some(children);
        self
    }

    /// Number of nodes in this document, itself included
    pub fn count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(TreeNode::count)
            .sum::<usize>()
    }
}

/// Payload of a single node, stored in the arena separately from its adjacency
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub id: Identity,
    pub label: String,
    pub level: Level,
    pub is_expanded: bool,
    pub is_loading: bool,
    pub has_children: bool,
}

/// Partial update merged into a node by [`Tree::update_node`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUpdate {
    pub label: Option<String>,
    pub is_expanded: Option<bool>,
    pub is_loading: Option<bool>,
    pub has_children: Option<bool>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn expanded(mut self, expanded: bool) -> Self {
        self.is_expanded = Some(expanded);
        self
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.is_loading = Some(loading);
        self
    }

    pub fn has_children(mut self, has_children: bool) -> Self {
        self.has_children = Some(has_children);
        self
    }

    fn apply_to(&self, node: &mut NodeData) {
        if let Some(label) = &self.label {
            node.label = label.clone();
        }
        if let Some(expanded) = self.is_expanded {
            node.is_expanded = expanded;
        }
        if let Some(loading) = self.is_loading {
            node.is_loading = loading;
        }
        if let Some(has_children) = self.has_children {
            node.has_children = has_children;
        }
    }
}

/// Immutable tree snapshot backed by an identity-keyed arena.
///
/// Payloads live behind `Arc`s and the maps are copy-on-write, so deriving a
/// new snapshot copies the adjacency maps and only the payloads that change.
/// Every snapshot stays valid after later edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TreeNode", into = "TreeNode")]
pub struct Tree {
    root: Identity,
    nodes: Arc<HashMap<Identity, Arc<NodeData>>>,
    /// Absent entry means the node's children were never materialized
    children: Arc<HashMap<Identity, Vec<Identity>>>,
    parents: Arc<HashMap<Identity, Identity>>,
}

impl Tree {
    /// Creates a tree holding only a collapsed, unfetched level-A root
    pub fn with_root(id: Identity, label: String) -> Self {
        let data = NodeData {
            id: id.clone(),
            label,
            level: Level::A,
            is_expanded: false,
            is_loading: false,
            has_children: true,
        };
        Self {
            nodes: Arc::new(HashMap::from([(id.clone(), Arc::new(data))])),
            children: Arc::new(HashMap::from([(id.clone(), Vec::new())])),
            parents: Arc::default(),
            root: id,
        }
    }

    /// Builds a tree from a nested document, rejecting duplicate identities
    pub fn from_document(document: TreeNode) -> Result<Self> {
        let mut tree = Self::empty(document.id.clone());
        tree.insert_subtree(None, document)?;
        Ok(tree)
    }

    fn empty(root: Identity) -> Self {
        Self {
            root,
            nodes: Arc::default(),
            children: Arc::default(),
            parents: Arc::default(),
        }
    }

    pub fn to_document(&self) -> TreeNode {
        self.build_document(self.root.as_str())
    }

    /// Nested document of the subtree rooted at `id`
    pub fn subtree(&self, id: &str) -> Option<TreeNode> {
        self.nodes
            .contains_key(id)
            .then(|| self.build_document(id))
    }

    fn build_document(&self, id: &str) -> TreeNode {
        let data = &self.nodes[id];
        TreeNode {
            id: data.id.clone(),
            label: data.label.clone(),
            level: data.level,
            children: self.children.get(id).map(|kids| {
                kids.iter()
                    .map(|kid| self.build_document(kid.as_str()))
                    .collect()
            }),
            is_expanded: data.is_expanded,
            is_loading: data.is_loading,
            has_children: data.has_children,
        }
    }

    pub fn root_id(&self) -> &Identity {
        &self.root
    }

    pub fn root_node(&self) -> &NodeData {
        &self.nodes[self.root.as_str()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn find_node_by_id(&self, id: &str) -> Option<&NodeData> {
        self.nodes.get(id).map(Arc::as_ref)
    }

    /// Direct parent of `id`; `None` for the root and for unknown ids
    pub fn find_parent_node(&self, id: &str) -> Option<&NodeData> {
        self.parents
            .get(id)
            .and_then(|parent| self.find_node_by_id(parent.as_str()))
    }

    /// Materialized children of `id`, `None` when never materialized or unknown
    pub fn children_of(&self, id: &str) -> Option<&[Identity]> {
        self.children.get(id).map(Vec::as_slice)
    }

    /// Position of `id` among its siblings
    pub fn index_in_parent(&self, id: &str) -> Option<usize> {
        let parent = self.parents.get(id)?;
        self.children
            .get(parent.as_str())?
            .iter()
            .position(|kid| kid == id)
    }

    /// True when `id` is `subtree_root` itself or one of its descendants.
    ///
    /// Walks the ancestor chain from `id` up to the root.
    pub fn is_within_subtree(&self, subtree_root: &str, id: &str) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == subtree_root {
                return true;
            }
            current = self.parents.get(cur).map(Identity::as_str);
        }
        false
    }

    /// True when expanding `id` has to fetch its children first
    pub fn needs_fetch(&self, id: &str) -> bool {
        self.find_node_by_id(id).is_some_and(|node| {
            node.has_children && self.children.get(id).map_or(true, Vec::is_empty)
        })
    }

    /// Nodes in depth-first pre-order, root first
    pub fn depth_first(&self) -> Vec<&NodeData> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root.as_str()];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.find_node_by_id(id) {
                out.push(node);
            }
            if let Some(kids) = self.children.get(id) {
                stack.extend(kids.iter().rev().map(Identity::as_str));
            }
        }
        out
    }

    /// Builds (but does not insert) a fresh child for `parent_id`, one level below it
    pub fn make_child(&self, parent_id: &str, label: &str) -> Result<TreeNode> {
        let parent = self
            .find_node_by_id(parent_id)
            .ok_or_else(|| TrellisError::NodeNotFound(parent_id.to_string()))?;
        let level = parent
            .level
            .next()
            .ok_or_else(|| TrellisError::TerminalLevel(parent_id.to_string()))?;

        Ok(TreeNode::new(
            IdGenerator::new().child_id(&parent.id),
            label.to_string(),
            level,
        ))
    }

    /// Merges `update` into the node; unknown ids are a no-op
    #[must_use]
    pub fn update_node(&self, id: &str, update: &NodeUpdate) -> Tree {
        let mut next = self.clone();
        next.patch(id, |node| update.apply_to(node));
        next
    }

    /// Replaces the label; unchanged labels and unknown ids are a no-op
    #[must_use]
    pub fn rename_node(&self, id: &str, label: &str) -> Tree {
        match self.find_node_by_id(id) {
            Some(node) if node.label != label => self.update_node(id, &NodeUpdate::new().label(label)),
            _ => self.clone(),
        }
    }

    /// Appends `node` (and any children it carries) to the parent and expands the parent.
    ///
    /// Unknown parents and documents whose ids already exist leave the tree unchanged.
    #[must_use]
    pub fn add_child_node(&self, parent_id: &str, node: TreeNode) -> Tree {
        if !self.contains(parent_id) {
            return self.clone();
        }

        let parent = Identity::from(parent_id);
        let mut next = self.clone();
        Arc::make_mut(&mut next.children)
            .entry(parent.clone())
            .or_default()
            .push(node.id.clone());

        if let Err(err) = next.insert_subtree(Some(&parent), node) {
            warn!(%err, parent = parent_id, "child not added");
            return self.clone();
        }
        next.patch(parent_id, |n| n.is_expanded = true);
        next
    }

    /// Removes the node and its whole subtree. The root is never removed.
    #[must_use]
    pub fn remove_node(&self, target_id: &str) -> Tree {
        if target_id == self.root.as_str() || !self.contains(target_id) {
            return self.clone();
        }

        let mut next = self.clone();
        next.detach(target_id);
        next.drop_subtree(target_id);
        next
    }

    /// Relocates the subtree rooted at `source_id` under `target_parent_id` at
    /// `target_index`, counted among the target's children after the source was
    /// detached. Past-the-end indices append. The target parent is expanded.
    ///
    /// Returns the tree unchanged when either node is unknown, when the source is
    /// the root, or when the target lies inside the source's own subtree.
    #[must_use]
    pub fn move_node(&self, source_id: &str, target_parent_id: &str, target_index: usize) -> Tree {
        if !self.contains(source_id) || !self.contains(target_parent_id) {
            return self.clone();
        }
        if source_id == self.root.as_str() {
            return self.clone();
        }
        if self.is_within_subtree(source_id, target_parent_id) {
            warn!(
                source = source_id,
                target = target_parent_id,
                "refusing to move node into its own subtree"
            );
            return self.clone();
        }

        let source = Identity::from(source_id);
        let target = Identity::from(target_parent_id);
        let mut next = self.clone();
        next.detach(source_id);

        let siblings = Arc::make_mut(&mut next.children)
            .entry(target.clone())
            .or_default();
        sequence::insert_clamped(siblings, target_index, source.clone());
        Arc::make_mut(&mut next.parents).insert(source, target);

        next.patch(target_parent_id, |n| n.is_expanded = true);
        next
    }

    /// Appends freshly materialized children after any the node already has.
    ///
    /// Fetched nodes whose id is already taken (by an earlier fetch whose
    /// results were moved elsewhere, or within the batch itself) are given fresh
    /// ids under their new parent. Unknown ids are a no-op.
    #[must_use]
    pub fn merge_children(&self, id: &str, children: Vec<TreeNode>) -> Tree {
        if !self.contains(id) {
            return self.clone();
        }

        let parent = Identity::from(id);
        let ids = IdGenerator::new();
        let mut next = self.clone();
        Arc::make_mut(&mut next.children).entry(parent.clone()).or_default();
        for child in children {
            next.insert_fresh(&ids, &parent, child);
        }
        next
    }

    /// Clears every `is_loading` flag
    #[must_use]
    pub fn clear_loading_flags(&self) -> Tree {
        let loading: Vec<Identity> = self
            .nodes
            .values()
            .filter(|node| node.is_loading)
            .map(|node| node.id.clone())
            .collect();

        let mut next = self.clone();
        for id in loading {
            next.patch(id.as_str(), |node| node.is_loading = false);
        }
        next
    }

    fn patch(&mut self, id: &str, f: impl FnOnce(&mut NodeData)) {
        if let Some(node) = Arc::make_mut(&mut self.nodes).get_mut(id) {
            f(Arc::make_mut(node));
        }
    }

    fn insert_subtree(&mut self, parent: Option<&Identity>, document: TreeNode) -> Result<()> {
        let TreeNode {
            id,
            label,
            level,
            children,
            is_expanded,
            is_loading,
            has_children,
        } = document;

        if self.nodes.contains_key(id.as_str()) {
            return Err(TrellisError::DuplicateId(id.to_string()));
        }

        Arc::make_mut(&mut self.nodes).insert(
            id.clone(),
            Arc::new(NodeData {
                id: id.clone(),
                label,
                level,
                is_expanded,
                is_loading,
                has_children,
            }),
        );
        if let Some(parent) = parent {
            Arc::make_mut(&mut self.parents).insert(id.clone(), parent.clone());
        }
        if let Some(children) = children {
            let ids = children.iter().map(|child| child.id.clone()).collect();
            Arc::make_mut(&mut self.children).insert(id.clone(), ids);
            for child in children {
                self.insert_subtree(Some(&id), child)?;
            }
        }
        Ok(())
    }

    /// Appends `document` under `parent`, renaming any node whose id is taken
    fn insert_fresh(&mut self, ids: &IdGenerator, parent: &Identity, document: TreeNode) {
        let TreeNode {
            id,
            label,
            level,
            children,
            is_expanded,
            is_loading,
            has_children,
        } = document;

        let id = if self.nodes.contains_key(id.as_str()) {
            let fresh = ids.child_id(parent);
            debug!(taken = %id, %fresh, "renaming fetched node");
            fresh
        } else {
            id
        };

        Arc::make_mut(&mut self.nodes).insert(
            id.clone(),
            Arc::new(NodeData {
                id: id.clone(),
                label,
                level,
                is_expanded,
                is_loading,
                has_children,
            }),
        );
        Arc::make_mut(&mut self.parents).insert(id.clone(), parent.clone());
        Arc::make_mut(&mut self.children)
            .entry(parent.clone())
            .or_default()
            .push(id.clone());

        if let Some(children) = children {
            Arc::make_mut(&mut self.children).entry(id.clone()).or_default();
            for child in children {
                self.insert_fresh(ids, &id, child);
            }
        }
    }

    /// Unlinks `id` from its parent's children
    fn detach(&mut self, id: &str) -> Option<usize> {
        let parent = Arc::make_mut(&mut self.parents).remove(id)?;
        let siblings = Arc::make_mut(&mut self.children).get_mut(parent.as_str())?;
        sequence::remove_where(siblings, |kid| kid == id).map(|(index, _)| index)
    }

    fn subtree_ids(&self, id: &str) -> Vec<Identity> {
        let mut out = Vec::new();
        let mut stack = vec![Identity::from(id)];
        while let Some(current) = stack.pop() {
            if let Some(kids) = self.children.get(current.as_str()) {
                stack.extend(kids.iter().cloned());
            }
            out.push(current);
        }
        out
    }

    fn drop_subtree(&mut self, id: &str) {
        let doomed = self.subtree_ids(id);
        let nodes = Arc::make_mut(&mut self.nodes);
        let children = Arc::make_mut(&mut self.children);
        let parents = Arc::make_mut(&mut self.parents);
        for id in &doomed {
            nodes.remove(id.as_str());
            children.remove(id.as_str());
            parents.remove(id.as_str());
        }
    }
}

impl TryFrom<TreeNode> for Tree {
    type Error = TrellisError;

    fn try_from(document: TreeNode) -> Result<Self> {
        Tree::from_document(document)
    }
}

impl From<Tree> for TreeNode {
    fn from(tree: Tree) -> Self {
        tree.to_document()
    }
}
