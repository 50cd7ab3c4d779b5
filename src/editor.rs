//! Editors hold the current snapshot, enforce the editing rules the pure
//! models leave to their callers, and notify listeners of every accepted change.

use crate::{
    config::{BoardConfig, TreeConfig},
    domain::{Board, Column, Tree},
    drag::{BoardDrag, ItemBounds, TreeDrag},
    error::{Result, TrellisError},
    expansion::{Applied, ChildFetcher, ExpansionCoordinator, FetchCompletion, PendingFetch, Toggle},
    intent::{BoardIntent, TreeIntent},
    interchange,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Callback invoked with each new snapshot
pub type ChangeListener<T> = Box<dyn FnMut(&T) + Send>;

fn non_blank(title: &str) -> Result<&str> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TrellisError::BlankTitle);
    }
    Ok(trimmed)
}

/// Board editing session
pub struct BoardEditor {
    config: BoardConfig,
    board: Board,
    listeners: Vec<ChangeListener<Board>>,
}

impl BoardEditor {
    pub fn new(config: BoardConfig) -> Self {
        let board = config.initial_board();
        Self::with_board(config, board)
    }

    pub fn with_board(config: BoardConfig, board: Board) -> Self {
        Self {
            config,
            board,
            listeners: Vec::new(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Board) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Validates and applies an intent, returning the resulting snapshot.
    ///
    /// Titles are trimmed. Blank titles, unknown ids, out-of-range source
    /// indices and deleting a protected column are rejected without touching
    /// the current snapshot.
    pub fn apply(&mut self, intent: BoardIntent) -> Result<&Board> {
        let next = match &intent {
            BoardIntent::AddCard { column_id, title } => {
                let title = non_blank(title)?;
                self.require_column(column_id.as_str())?;
                self.board.add_card(column_id.as_str(), title)
            }
            BoardIntent::DeleteCard { card_id } => {
                self.require_card(card_id.as_str())?;
                self.board.delete_card(card_id.as_str())
            }
            BoardIntent::RenameCard { card_id, title } => {
                let title = non_blank(title)?;
                self.require_card(card_id.as_str())?;
                self.board.rename_card(card_id.as_str(), title)
            }
            BoardIntent::MoveCard {
                source_column_id,
                dest_column_id,
                source_index,
                dest_index,
            } => {
                let source = self.require_column(source_column_id.as_str())?;
                if *source_index >= source.cards.len() {
                    return Err(TrellisError::IndexOutOfRange {
                        container: source_column_id.to_string(),
                        index: *source_index,
                    });
                }
                self.require_column(dest_column_id.as_str())?;
                self.board.move_card(
                    source_column_id.as_str(),
                    dest_column_id.as_str(),
                    *source_index,
                    *dest_index,
                )
            }
            BoardIntent::AddColumn { title } => {
                let title = non_blank(title)?;
                self.board
                    .add_column(title, Some(self.config.new_column_color.as_str()))
            }
            BoardIntent::DeleteColumn { column_id } => {
                if self.config.is_protected(column_id.as_str()) {
                    warn!(column = %column_id, "refusing to delete protected column");
                    return Err(TrellisError::ProtectedColumn(column_id.to_string()));
                }
                self.require_column(column_id.as_str())?;
                self.board.delete_column(column_id.as_str())
            }
        };

        debug!(?intent, "board intent applied");
        self.commit(next);
        Ok(&self.board)
    }

    /// Returns to the configured initial columns
    pub fn reset(&mut self) {
        let initial = self.config.initial_board();
        self.commit(initial);
    }

    pub fn export_json(&self) -> Result<String> {
        interchange::export_board(&self.board)
    }

    /// Replaces the board wholesale; on error the current board is kept
    pub fn import_json(&mut self, json: &str) -> Result<()> {
        let board = interchange::import_board(json)?;
        info!(columns = board.column_count(), cards = board.total_cards(), "board replaced by import");
        self.commit(board);
        Ok(())
    }

    /// Starts dragging a card
    pub fn pick_up(&self, card_id: &str) -> Option<BoardDrag> {
        BoardDrag::pick_up(&self.board, card_id)
    }

    /// Feeds a hover event through the drag controller; true if the board changed
    pub fn hover(
        &mut self,
        drag: &mut BoardDrag,
        column_id: &str,
        hover_index: usize,
        bounds: ItemBounds,
        pointer_y: Option<f64>,
    ) -> Result<bool> {
        match drag.hover(&self.board, column_id, hover_index, bounds, pointer_y) {
            Some(intent) => self.apply(intent).map(|_| true),
            None => Ok(false),
        }
    }

    /// Feeds a drop on a column's empty area; true if the board changed
    pub fn drop_on_column(
        &mut self,
        drag: &mut BoardDrag,
        column_id: &str,
        already_handled: bool,
    ) -> Result<bool> {
        match drag.drop_on_column(&self.board, column_id, already_handled) {
            Some(intent) => self.apply(intent).map(|_| true),
            None => Ok(false),
        }
    }

    fn require_column(&self, column_id: &str) -> Result<&Column> {
        self.board
            .column(column_id)
            .ok_or_else(|| TrellisError::ColumnNotFound(column_id.to_string()))
    }

    fn require_card(&self, card_id: &str) -> Result<()> {
        self.board
            .card(card_id)
            .map(|_| ())
            .ok_or_else(|| TrellisError::CardNotFound(card_id.to_string()))
    }

    fn commit(&mut self, next: Board) {
        if next == self.board {
            return;
        }
        self.board = next;
        for listener in &mut self.listeners {
            listener(&self.board);
        }
    }
}

/// Tree editing session
pub struct TreeEditor {
    config: TreeConfig,
    tree: Tree,
    coordinator: ExpansionCoordinator,
    listeners: Vec<ChangeListener<Tree>>,
}

impl TreeEditor {
    pub fn new(config: TreeConfig, fetcher: Arc<dyn ChildFetcher>) -> Self {
        let tree = config.initial_tree();
        Self::with_tree(config, tree, fetcher)
    }

    pub fn with_tree(config: TreeConfig, tree: Tree, fetcher: Arc<dyn ChildFetcher>) -> Self {
        let coordinator = ExpansionCoordinator::new(fetcher, config.fetch_timeout());
        Self {
            config,
            tree,
            coordinator,
            listeners: Vec::new(),
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Tree) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Validates and applies an intent.
    ///
    /// A toggle that needs children first returns the fetch to run; hand its
    /// completion to [`TreeEditor::finish_expand`].
    pub fn apply(&mut self, intent: TreeIntent) -> Result<Option<PendingFetch>> {
        let next = match &intent {
            TreeIntent::ToggleExpand { node_id } => return self.toggle_expand(node_id.as_str()),
            TreeIntent::AddChild { parent_id, label } => {
                let label = non_blank(label)?;
                let child = self.tree.make_child(parent_id.as_str(), label)?;
                self.tree.add_child_node(parent_id.as_str(), child)
            }
            TreeIntent::RemoveNode { node_id } => {
                if node_id == self.tree.root_id() {
                    warn!("refusing to delete root node");
                    return Err(TrellisError::RootNodeProtected);
                }
                self.require_node(node_id.as_str())?;
                self.tree.remove_node(node_id.as_str())
            }
            TreeIntent::RenameNode { node_id, label } => {
                let label = non_blank(label)?;
                self.require_node(node_id.as_str())?;
                self.tree.rename_node(node_id.as_str(), label)
            }
            TreeIntent::MoveNode {
                source_id,
                target_parent_id,
                target_index,
            } => {
                self.require_node(source_id.as_str())?;
                self.require_node(target_parent_id.as_str())?;
                if source_id == self.tree.root_id() {
                    return Err(TrellisError::RootNodeProtected);
                }
                if self
                    .tree
                    .is_within_subtree(source_id.as_str(), target_parent_id.as_str())
                {
                    return Err(TrellisError::CycleDetected {
                        source_id: source_id.to_string(),
                        target_id: target_parent_id.to_string(),
                    });
                }
                self.tree
                    .move_node(source_id.as_str(), target_parent_id.as_str(), *target_index)
            }
        };

        debug!(?intent, "tree intent applied");
        self.commit(next);
        Ok(None)
    }

    /// Expands or collapses a node. Returns the fetch to run when its children
    /// must be loaded first; the node is already marked loading by then.
    pub fn toggle_expand(&mut self, node_id: &str) -> Result<Option<PendingFetch>> {
        self.require_node(node_id)?;
        match self.coordinator.toggle(&self.tree, node_id) {
            Toggle::Toggled(next) => {
                self.commit(next);
                Ok(None)
            }
            Toggle::Loading { tree, fetch } => {
                self.commit(tree);
                Ok(Some(fetch))
            }
            Toggle::Ignored => Ok(None),
        }
    }

    /// Applies a finished fetch. A failed fetch still updates the tree (the node
    /// stops loading) and then reports the failure.
    pub fn finish_expand(&mut self, completion: FetchCompletion) -> Result<()> {
        match self.coordinator.complete(&self.tree, completion) {
            Applied::Expanded(next) => {
                self.commit(next);
                Ok(())
            }
            Applied::Failed { tree, error } => {
                self.commit(tree);
                Err(error)
            }
            Applied::Discarded => Ok(()),
        }
    }

    /// Toggles a node and, if that starts a fetch, waits for it and applies it
    pub async fn toggle_and_wait(&mut self, node_id: &str) -> Result<()> {
        if let Some(fetch) = self.toggle_expand(node_id)? {
            let completion = fetch.run().await;
            self.finish_expand(completion)?;
        }
        Ok(())
    }

    pub fn is_loading(&self, node_id: &str) -> bool {
        self.coordinator.is_in_flight(node_id)
    }

    /// Drops a fetch that will never be run, so the node stops loading
    pub fn abandon_expand(&mut self, node_id: &str) {
        let next = self.coordinator.abandon(&self.tree, node_id);
        self.commit(next);
    }

    /// Returns to a lone collapsed root; outstanding fetches will be discarded
    pub fn reset(&mut self) {
        self.coordinator.reset();
        let initial = self.config.initial_tree();
        self.commit(initial);
    }

    pub fn export_json(&self) -> Result<String> {
        interchange::export_tree(&self.tree)
    }

    /// Replaces the tree wholesale; on error the current tree is kept.
    /// Outstanding fetches are discarded and imported loading flags cleared.
    pub fn import_json(&mut self, json: &str) -> Result<()> {
        let tree = interchange::import_tree(json)?.clear_loading_flags();
        info!(nodes = tree.node_count(), "tree replaced by import");
        self.coordinator.reset();
        self.commit(tree);
        Ok(())
    }

    /// Starts dragging a node
    pub fn pick_up(&self, node_id: &str) -> Option<TreeDrag> {
        TreeDrag::pick_up(&self.tree, node_id)
    }

    /// Feeds a hover over a sibling through the drag controller; true if the tree changed
    pub fn hover(
        &mut self,
        drag: &mut TreeDrag,
        hover_id: &str,
        bounds: ItemBounds,
        pointer_y: Option<f64>,
    ) -> Result<bool> {
        match drag.hover(&self.tree, hover_id, bounds, pointer_y) {
            Some(intent) => self.apply(intent).map(|_| true),
            None => Ok(false),
        }
    }

    /// Feeds a drop onto a node; true if the tree changed
    pub fn drop_on_node(
        &mut self,
        drag: &mut TreeDrag,
        target_id: &str,
        already_handled: bool,
    ) -> Result<bool> {
        match drag.drop_on_node(&self.tree, target_id, already_handled) {
            Some(intent) => self.apply(intent).map(|_| true),
            None => Ok(false),
        }
    }

    fn require_node(&self, node_id: &str) -> Result<()> {
        if self.tree.contains(node_id) {
            Ok(())
        } else {
            Err(TrellisError::NodeNotFound(node_id.to_string()))
        }
    }

    fn commit(&mut self, next: Tree) {
        if next == self.tree {
            return;
        }
        self.tree = next;
        for listener in &mut self.listeners {
            listener(&self.tree);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Identity, Level, TreeNode},
        expansion::MockChildFetcher,
    };
    use async_trait::async_trait;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    fn board_editor() -> BoardEditor {
        BoardEditor::new(BoardConfig::default())
    }

    fn card_titles(editor: &BoardEditor, column: &str) -> Vec<String> {
        editor
            .board()
            .column(column)
            .unwrap()
            .cards
            .iter()
            .map(|c| c.title.clone())
            .collect()
    }

    #[test]
    fn test_add_card_trims_title() {
        let mut editor = board_editor();
        editor
            .apply(BoardIntent::AddCard {
                column_id: "todo".into(),
                title: "  Write tests  ".to_string(),
            })
            .unwrap();

        assert_eq!(card_titles(&editor, "todo"), vec!["Write tests"]);
    }

    #[test]
    fn test_blank_titles_are_rejected() {
        let mut editor = board_editor();
        let before = editor.board().clone();

        let result = editor.apply(BoardIntent::AddCard {
            column_id: "todo".into(),
            title: "   ".to_string(),
        });
        assert!(matches!(result, Err(TrellisError::BlankTitle)));

        let result = editor.apply(BoardIntent::AddColumn { title: String::new() });
        assert!(matches!(result, Err(TrellisError::BlankTitle)));
        assert_eq!(editor.board(), &before);
    }

    #[test]
    fn test_protected_columns_cannot_be_deleted() {
        let mut editor = board_editor();

        for id in ["todo", "in-progress", "done"] {
            let result = editor.apply(BoardIntent::DeleteColumn { column_id: id.into() });
            assert!(matches!(result, Err(TrellisError::ProtectedColumn(_))));
        }
        assert_eq!(editor.board().column_count(), 3);
    }

    #[test]
    fn test_custom_column_lifecycle() {
        let mut editor = board_editor();
        editor
            .apply(BoardIntent::AddColumn { title: "Review".to_string() })
            .unwrap();

        let column = editor.board().columns()[3].clone();
        assert_eq!(column.color.as_deref(), Some(editor.config().new_column_color.as_str()));

        editor
            .apply(BoardIntent::DeleteColumn { column_id: column.id.clone() })
            .unwrap();
        assert!(editor.board().column(column.id.as_str()).is_none());
    }

    #[test]
    fn test_unknown_ids_are_reported() {
        let mut editor = board_editor();

        assert!(matches!(
            editor.apply(BoardIntent::AddCard { column_id: "unknown-col".into(), title: "T".to_string() }),
            Err(TrellisError::ColumnNotFound(_))
        ));
        assert!(matches!(
            editor.apply(BoardIntent::DeleteCard { card_id: "nope".into() }),
            Err(TrellisError::CardNotFound(_))
        ));
        assert!(matches!(
            editor.apply(BoardIntent::MoveCard {
                source_column_id: "todo".into(),
                dest_column_id: "done".into(),
                source_index: 0,
                dest_index: 0,
            }),
            Err(TrellisError::IndexOutOfRange { index: 0, .. })
        ));
    }

    #[test]
    fn test_listeners_see_accepted_changes_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut editor = board_editor();
        let sink = Arc::clone(&seen);
        editor.subscribe(move |board: &Board| sink.lock().unwrap().push(board.total_cards()));

        editor
            .apply(BoardIntent::AddCard { column_id: "todo".into(), title: "A".to_string() })
            .unwrap();
        let card_id = editor.board().column("todo").unwrap().cards[0].id.clone();

        // Renaming to the same title changes nothing and notifies nobody
        editor
            .apply(BoardIntent::RenameCard { card_id: card_id.clone(), title: "A".to_string() })
            .unwrap();
        let _ = editor.apply(BoardIntent::DeleteColumn { column_id: "todo".into() });

        editor.apply(BoardIntent::DeleteCard { card_id }).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_board_drag_pipeline() {
        let mut editor = board_editor();
        for title in ["A", "B"] {
            editor
                .apply(BoardIntent::AddCard { column_id: "todo".into(), title: title.to_string() })
                .unwrap();
        }
        let card_id = editor.board().column("todo").unwrap().cards[0].id.clone();

        let mut drag = editor.pick_up(card_id.as_str()).unwrap();
        let moved = editor
            .hover(&mut drag, "todo", 1, ItemBounds::new(40.0, 80.0), Some(70.0))
            .unwrap();
        assert!(moved);
        assert_eq!(card_titles(&editor, "todo"), vec!["B", "A"]);

        assert!(editor.drop_on_column(&mut drag, "done", false).unwrap());
        assert_eq!(card_titles(&editor, "done"), vec!["A"]);
        assert_eq!(editor.board().card(card_id.as_str()).unwrap().column_id, "done");
    }

    #[test]
    fn test_reset_and_import() {
        let mut editor = board_editor();
        editor
            .apply(BoardIntent::AddCard { column_id: "done".into(), title: "Old".to_string() })
            .unwrap();
        let exported = editor.export_json().unwrap();

        editor.reset();
        assert_eq!(editor.board().total_cards(), 0);

        assert!(editor.import_json("not json").is_err());
        assert_eq!(editor.board().total_cards(), 0);

        editor.import_json(&exported).unwrap();
        assert_eq!(card_titles(&editor, "done"), vec!["Old"]);
    }

    /// Returns two fixed children and counts calls
    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChildFetcher for CountingFetcher {
        async fn fetch_children(&self, node_id: &Identity, level: Level) -> anyhow::Result<Vec<TreeNode>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(MockChildFetcher::generate(node_id, level).into_iter().take(2).collect())
        }
    }

    struct BrokenFetcher;

    #[async_trait]
    impl ChildFetcher for BrokenFetcher {
        async fn fetch_children(&self, _node_id: &Identity, _level: Level) -> anyhow::Result<Vec<TreeNode>> {
            Err(anyhow::anyhow!("connection reset"))
        }
    }

    fn tree_editor() -> (TreeEditor, Arc<CountingFetcher>) {
        let fetcher = Arc::new(CountingFetcher::default());
        (TreeEditor::new(TreeConfig::default(), fetcher.clone()), fetcher)
    }

    fn root_children(editor: &TreeEditor) -> Vec<Identity> {
        editor.tree().children_of("root").unwrap_or_default().to_vec()
    }

    #[tokio::test]
    async fn test_toggle_marks_loading_then_expands() {
        let (mut editor, fetcher) = tree_editor();

        let fetch = editor
            .apply(TreeIntent::ToggleExpand { node_id: "root".into() })
            .unwrap()
            .unwrap();
        assert!(editor.tree().root_node().is_loading);
        assert!(editor.is_loading("root"));

        // A second toggle while loading starts nothing
        assert!(editor.toggle_expand("root").unwrap().is_none());

        editor.finish_expand(fetch.run().await).unwrap();
        let root = editor.tree().root_node();
        assert!(root.is_expanded);
        assert!(!root.is_loading);
        assert_eq!(root_children(&editor).len(), 2);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_reported_and_recovered() {
        let mut editor = TreeEditor::new(TreeConfig::default(), Arc::new(BrokenFetcher));

        let result = editor.toggle_and_wait("root").await;
        assert!(matches!(result, Err(TrellisError::FetchFailed { .. })));
        assert!(!editor.tree().root_node().is_loading);
        assert!(!editor.tree().root_node().is_expanded);
        assert!(!editor.is_loading("root"));
    }

    #[tokio::test]
    async fn test_late_result_after_delete_is_dropped() {
        let (mut editor, _) = tree_editor();
        editor.toggle_and_wait("root").await.unwrap();
        let child = root_children(&editor)[0].clone();

        let fetch = editor.toggle_expand(child.as_str()).unwrap().unwrap();
        editor
            .apply(TreeIntent::RemoveNode { node_id: child.clone() })
            .unwrap();
        let count = editor.tree().node_count();

        editor.finish_expand(fetch.run().await).unwrap();
        assert!(!editor.tree().contains(child.as_str()));
        assert_eq!(editor.tree().node_count(), count);
    }

    #[tokio::test]
    async fn test_tree_policy_rules() {
        let (mut editor, _) = tree_editor();
        editor.toggle_and_wait("root").await.unwrap();
        let kids = root_children(&editor);

        assert!(matches!(
            editor.apply(TreeIntent::RemoveNode { node_id: "root".into() }),
            Err(TrellisError::RootNodeProtected)
        ));
        assert!(matches!(
            editor.apply(TreeIntent::AddChild { parent_id: "root".into(), label: " ".to_string() }),
            Err(TrellisError::BlankTitle)
        ));
        assert!(matches!(
            editor.apply(TreeIntent::MoveNode {
                source_id: "root".into(),
                target_parent_id: kids[0].clone(),
                target_index: 0,
            }),
            Err(TrellisError::RootNodeProtected)
        ));

        editor
            .apply(TreeIntent::AddChild { parent_id: kids[0].clone(), label: "Grandchild".to_string() })
            .unwrap();
        let grandchild = editor.tree().children_of(kids[0].as_str()).unwrap()[0].clone();
        assert_eq!(editor.tree().find_node_by_id(grandchild.as_str()).unwrap().level, Level::C);
        assert!(editor.tree().find_node_by_id(kids[0].as_str()).unwrap().is_expanded);

        assert!(matches!(
            editor.apply(TreeIntent::MoveNode {
                source_id: kids[0].clone(),
                target_parent_id: grandchild,
                target_index: 0,
            }),
            Err(TrellisError::CycleDetected { .. })
        ));
    }

    #[tokio::test]
    async fn test_rename_and_move_through_editor() {
        let (mut editor, _) = tree_editor();
        editor.toggle_and_wait("root").await.unwrap();
        let kids = root_children(&editor);

        editor
            .apply(TreeIntent::RenameNode { node_id: kids[1].clone(), label: "Second".to_string() })
            .unwrap();
        editor
            .apply(TreeIntent::MoveNode {
                source_id: kids[1].clone(),
                target_parent_id: "root".into(),
                target_index: 0,
            })
            .unwrap();

        assert_eq!(root_children(&editor), vec![kids[1].clone(), kids[0].clone()]);
        assert_eq!(editor.tree().find_node_by_id(kids[1].as_str()).unwrap().label, "Second");
    }

    #[tokio::test]
    async fn test_tree_drag_drop_onto_sibling() {
        let (mut editor, _) = tree_editor();
        editor.toggle_and_wait("root").await.unwrap();
        let kids = root_children(&editor);

        let mut drag = editor.pick_up(kids[1].as_str()).unwrap();
        assert!(editor.drop_on_node(&mut drag, kids[0].as_str(), false).unwrap());

        assert_eq!(root_children(&editor), vec![kids[0].clone()]);
        assert_eq!(
            editor.tree().children_of(kids[0].as_str()).unwrap(),
            &[kids[1].clone()][..]
        );

        // Dropping the parent onto its new child is refused
        let mut drag = editor.pick_up(kids[0].as_str()).unwrap();
        assert!(!editor.drop_on_node(&mut drag, kids[1].as_str(), false).unwrap());
    }

    #[tokio::test]
    async fn test_import_discards_outstanding_fetch() {
        let (mut editor, _) = tree_editor();
        let fetch = editor.toggle_expand("root").unwrap().unwrap();

        let document = r#"{"id": "root", "label": "Imported", "level": "A", "hasChildren": true, "isLoading": true}"#;
        editor.import_json(document).unwrap();
        assert!(!editor.tree().root_node().is_loading);

        editor.finish_expand(fetch.run().await).unwrap();
        assert_eq!(editor.tree().node_count(), 1);
        assert_eq!(editor.tree().root_node().label, "Imported");
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_fetcher_end_to_end() {
        let mut editor = TreeEditor::new(TreeConfig::default(), Arc::new(MockChildFetcher::default()));
        let changes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&changes);
        editor.subscribe(move |_: &Tree| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        editor.toggle_and_wait("root").await.unwrap();

        let kids = root_children(&editor);
        assert!((2..=4).contains(&kids.len()));
        // Loading, then expanded
        assert_eq!(changes.load(Ordering::SeqCst), 2);

        editor.reset();
        assert_eq!(editor.tree().node_count(), 1);
        assert_eq!(editor.tree().root_id(), &editor.config().root_id);
        assert_eq!(changes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_move_into_loading_node_survives_fetch() {
        let (mut editor, _) = tree_editor();
        editor.toggle_and_wait("root").await.unwrap();
        let kids = root_children(&editor);

        let fetch = editor.toggle_expand(kids[0].as_str()).unwrap().unwrap();
        editor
            .apply(TreeIntent::MoveNode {
                source_id: kids[1].clone(),
                target_parent_id: kids[0].clone(),
                target_index: 0,
            })
            .unwrap();
        editor
            .apply(TreeIntent::AddChild { parent_id: kids[0].clone(), label: "Manual".to_string() })
            .unwrap();
        let before = editor.tree().node_count();

        editor.finish_expand(fetch.run().await).unwrap();

        let tree = editor.tree();
        let under = tree.children_of(kids[0].as_str()).unwrap();
        assert_eq!(under.len(), 4);
        assert_eq!(under[0], kids[1]);
        assert_eq!(tree.find_node_by_id(under[1].as_str()).unwrap().label, "Manual");
        assert_eq!(tree.node_count(), before + 2);
        assert!(!tree.find_node_by_id(kids[0].as_str()).unwrap().is_loading);
    }

    #[tokio::test]
    async fn test_abandoned_expand_can_be_retried() {
        let (mut editor, fetcher) = tree_editor();
        let fetch = editor.toggle_expand("root").unwrap().unwrap();
        drop(fetch);

        editor.abandon_expand("root");
        assert!(!editor.is_loading("root"));
        assert!(!editor.tree().root_node().is_loading);

        editor.toggle_and_wait("root").await.unwrap();
        assert_eq!(root_children(&editor).len(), 2);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }
}
