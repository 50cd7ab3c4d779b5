use crate::{
    domain::{Board, Column, Identity, Tree},
    error::Result,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Seed for one of the columns a fresh board starts with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSeed {
    pub id: Identity,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ColumnSeed {
    pub fn new(id: &str, title: &str, color: &str) -> Self {
        Self {
            id: Identity::from(id),
            title: title.to_string(),
            color: Some(color.to_string()),
        }
    }
}

/// Board configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub default_columns: Vec<ColumnSeed>,
    /// Columns that may receive and lose cards but never be removed
    pub protected_columns: Vec<Identity>,
    pub new_column_color: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            default_columns: vec![
                ColumnSeed::new("todo", "To Do", "blue"),
                ColumnSeed::new("in-progress", "In Progress", "orange"),
                ColumnSeed::new("done", "Done", "green"),
            ],
            protected_columns: vec![
                Identity::from("todo"),
                Identity::from("in-progress"),
                Identity::from("done"),
            ],
            new_column_color: "gray".to_string(),
        }
    }
}

impl BoardConfig {
    pub fn is_protected(&self, column_id: &str) -> bool {
        self.protected_columns.iter().any(|id| id == column_id)
    }

    /// Builds the board a reset returns to
    pub fn initial_board(&self) -> Board {
        Board::new(
            self.default_columns
                .iter()
                .map(|seed| {
                    let column = Column::new(seed.id.clone(), seed.title.clone());
                    match &seed.color {
                        Some(color) => column.with_color(color.as_str()),
                        None => column,
                    }
                })
                .collect(),
        )
    }
}

/// Tree configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub root_id: Identity,
    pub root_label: String,
    /// Upper bound on a single child fetch; expiry counts as a fetch failure
    pub fetch_timeout_ms: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            root_id: Identity::from("root"),
            root_label: "Level A".to_string(),
            fetch_timeout_ms: 5_000,
        }
    }
}

impl TreeConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Builds the collapsed, unfetched root a reset returns to
    pub fn initial_tree(&self) -> Tree {
        Tree::with_root(self.root_id.clone(), self.root_label.clone())
    }
}

/// Top-level configuration for both editors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub board: BoardConfig,
    pub tree: TreeConfig,
}

impl EditorConfig {
    /// Parses a (possibly partial) JSON configuration; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Level;

    #[test]
    fn test_default_board_has_three_protected_columns() {
        let config = BoardConfig::default();
        let board = config.initial_board();

        assert_eq!(board.column_count(), 3);
        assert_eq!(board.total_cards(), 0);
        for id in ["todo", "in-progress", "done"] {
            assert!(config.is_protected(id));
            assert!(board.column(id).is_some());
        }
        assert!(!config.is_protected("column-123"));
        assert_eq!(board.column("done").unwrap().color.as_deref(), Some("green"));
    }

    #[test]
    fn test_initial_tree_is_collapsed_root() {
        let tree = TreeConfig::default().initial_tree();
        let root = tree.root_node();

        assert_eq!(root.id, "root");
        assert_eq!(root.level, Level::A);
        assert!(root.has_children);
        assert!(!root.is_expanded);
        assert!(!root.is_loading);
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = EditorConfig::from_json_str(r#"{"tree": {"fetch_timeout_ms": 250}}"#).unwrap();

        assert_eq!(config.tree.fetch_timeout(), Duration::from_millis(250));
        assert_eq!(config.tree.root_id, "root");
        assert_eq!(config.board.default_columns.len(), 3);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(EditorConfig::from_json_str("{not json").is_err());
    }
}
