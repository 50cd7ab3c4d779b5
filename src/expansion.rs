//! Lazy child materialization.
//!
//! Expanding a node whose children were never fetched marks it loading right
//! away and hands back a [`PendingFetch`]. The caller drives that future however
//! it likes (inline, `tokio::spawn`, joined with others) and feeds the resulting
//! [`FetchCompletion`] back into the coordinator, which applies it to whatever
//! snapshot is current by then.

use crate::{
    domain::{Identity, Level, NodeUpdate, Tree, TreeNode},
    error::TrellisError,
};
use async_trait::async_trait;
use rand::Rng;
use std::{collections::HashSet, sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Asynchronous source of a node's children
#[async_trait]
pub trait ChildFetcher: Send + Sync {
    /// Produces the ordered children of `node_id`, which sits at `level`
    async fn fetch_children(&self, node_id: &Identity, level: Level) -> anyhow::Result<Vec<TreeNode>>;
}

/// Fetcher that fabricates 2–4 children after a fixed delay
#[derive(Debug, Clone)]
pub struct MockChildFetcher {
    delay: Duration,
}

impl MockChildFetcher {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Children named `<parent>-<i>` one level below `level`; none below the terminal level
    pub fn generate(parent_id: &Identity, level: Level) -> Vec<TreeNode> {
        let Some(next) = level.next() else {
            return Vec::new();
        };
        let count = rand::rng().random_range(2..=4);

        (0..count)
            .map(|i| {
                TreeNode::new(
                    Identity::new(format!("{}-{}", parent_id, i)),
                    next.label(),
                    next,
                )
            })
            .collect()
    }
}

impl Default for MockChildFetcher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

#[async_trait]
impl ChildFetcher for MockChildFetcher {
    async fn fetch_children(&self, node_id: &Identity, level: Level) -> anyhow::Result<Vec<TreeNode>> {
        tokio::time::sleep(self.delay).await;
        Ok(Self::generate(node_id, level))
    }
}

/// A fetch that has been started for one node but not yet run
pub struct PendingFetch {
    node_id: Identity,
    level: Level,
    epoch: u64,
    fetcher: Arc<dyn ChildFetcher>,
    timeout: Duration,
}

impl PendingFetch {
    pub fn node_id(&self) -> &Identity {
        &self.node_id
    }

    /// Runs the fetch under the configured timeout; expiry counts as a failure
    pub async fn run(self) -> FetchCompletion {
        let fetch = self.fetcher.fetch_children(&self.node_id, self.level);
        let result = match tokio::time::timeout(self.timeout, fetch).await {
            Ok(Ok(children)) => Ok(children),
            Ok(Err(err)) => Err(TrellisError::FetchFailed {
                node_id: self.node_id.to_string(),
                reason: format!("{:#}", err),
            }),
            Err(_) => Err(TrellisError::FetchTimeout(self.node_id.to_string())),
        };

        FetchCompletion {
            node_id: self.node_id,
            epoch: self.epoch,
            result,
        }
    }
}

/// Result of a finished fetch, waiting to be applied
#[derive(Debug)]
pub struct FetchCompletion {
    node_id: Identity,
    epoch: u64,
    result: crate::error::Result<Vec<TreeNode>>,
}

impl FetchCompletion {
    pub fn node_id(&self) -> &Identity {
        &self.node_id
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// What a toggle request turned into
pub enum Toggle {
    /// Expanded or collapsed without fetching
    Toggled(Tree),
    /// The node is now loading; run the fetch and hand its completion back
    Loading { tree: Tree, fetch: PendingFetch },
    /// Unknown node, or a fetch for it is already in flight
    Ignored,
}

/// What applying a fetch completion produced
#[derive(Debug)]
pub enum Applied {
    /// Children materialized, node expanded and no longer loading
    Expanded(Tree),
    /// Node reverted to not loading and stays collapsed
    Failed { tree: Tree, error: TrellisError },
    /// The node vanished or the tree was replaced while the fetch was out
    Discarded,
}

/// Tracks in-flight child fetches so each node has at most one at a time
pub struct ExpansionCoordinator {
    fetcher: Arc<dyn ChildFetcher>,
    timeout: Duration,
    in_flight: HashSet<Identity>,
    epoch: u64,
}

impl ExpansionCoordinator {
    pub fn new(fetcher: Arc<dyn ChildFetcher>, timeout: Duration) -> Self {
        Self {
            fetcher,
            timeout,
            in_flight: HashSet::new(),
            epoch: 0,
        }
    }

    pub fn is_in_flight(&self, node_id: &str) -> bool {
        self.in_flight.contains(node_id)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Toggles the node's expansion, starting a fetch when its children were never loaded
    pub fn toggle(&mut self, tree: &Tree, node_id: &str) -> Toggle {
        let Some(node) = tree.find_node_by_id(node_id) else {
            return Toggle::Ignored;
        };

        if node.is_loading || self.is_in_flight(node_id) {
            debug!(node = node_id, "toggle ignored while children are loading");
            return Toggle::Ignored;
        }

        if node.is_expanded {
            return Toggle::Toggled(tree.update_node(node_id, &NodeUpdate::new().expanded(false)));
        }

        if !tree.needs_fetch(node_id) {
            return Toggle::Toggled(tree.update_node(node_id, &NodeUpdate::new().expanded(true)));
        }

        debug!(node = node_id, level = %node.level, "fetching children");
        let fetch = PendingFetch {
            node_id: node.id.clone(),
            level: node.level,
            epoch: self.epoch,
            fetcher: Arc::clone(&self.fetcher),
            timeout: self.timeout,
        };
        self.in_flight.insert(node.id.clone());

        Toggle::Loading {
            tree: tree.update_node(node_id, &NodeUpdate::new().loading(true)),
            fetch,
        }
    }

    /// Applies a finished fetch to the current snapshot
    pub fn complete(&mut self, tree: &Tree, completion: FetchCompletion) -> Applied {
        let FetchCompletion {
            node_id,
            epoch,
            result,
        } = completion;

        if epoch != self.epoch || !self.in_flight.remove(node_id.as_str()) {
            debug!(node = %node_id, "discarding fetch result from a replaced tree");
            return Applied::Discarded;
        }
        if !tree.contains(node_id.as_str()) {
            warn!(node = %node_id, "discarding children of a node removed while loading");
            return Applied::Discarded;
        }

        let not_loading = NodeUpdate::new().loading(false);
        match result {
            Ok(children) => {
                let next = tree
                    .merge_children(node_id.as_str(), children)
                    .update_node(node_id.as_str(), &not_loading.expanded(true));
                Applied::Expanded(next)
            }
            Err(error) => {
                warn!(node = %node_id, %error, "failed to load children");
                Applied::Failed {
                    tree: tree.update_node(node_id.as_str(), &not_loading),
                    error,
                }
            }
        }
    }

    /// Gives up on a fetch that will never be run, e.g. because its task was
    /// aborted. The node stops loading and a late completion is discarded.
    pub fn abandon(&mut self, tree: &Tree, node_id: &str) -> Tree {
        if !self.in_flight.remove(node_id) {
            return tree.clone();
        }
        debug!(node = node_id, "fetch abandoned");
        tree.update_node(node_id, &NodeUpdate::new().loading(false))
    }

    /// Forgets every in-flight fetch; their completions will be discarded
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.in_flight.clear();
    }
}
