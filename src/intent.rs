use crate::domain::Identity;
use serde::{Deserialize, Serialize};

/// Discrete edit request against the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BoardIntent {
    AddCard {
        column_id: Identity,
        title: String,
    },
    DeleteCard {
        card_id: Identity,
    },
    RenameCard {
        card_id: Identity,
        title: String,
    },
    MoveCard {
        source_column_id: Identity,
        dest_column_id: Identity,
        source_index: usize,
        dest_index: usize,
    },
    AddColumn {
        title: String,
    },
    DeleteColumn {
        column_id: Identity,
    },
}

/// Discrete edit request against the tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TreeIntent {
    ToggleExpand {
        node_id: Identity,
    },
    AddChild {
        parent_id: Identity,
        label: String,
    },
    RemoveNode {
        node_id: Identity,
    },
    RenameNode {
        node_id: Identity,
        label: String,
    },
    MoveNode {
        source_id: Identity,
        target_parent_id: Identity,
        target_index: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_intent_wire_shape() {
        let intent: BoardIntent = serde_json::from_str(
            r#"{"type": "moveCard", "sourceColumnId": "todo", "destColumnId": "done", "sourceIndex": 0, "destIndex": 0}"#,
        )
        .unwrap();

        assert_eq!(
            intent,
            BoardIntent::MoveCard {
                source_column_id: "todo".into(),
                dest_column_id: "done".into(),
                source_index: 0,
                dest_index: 0,
            }
        );
    }

    #[test]
    fn test_tree_intent_wire_shape() {
        let json = serde_json::to_value(TreeIntent::AddChild {
            parent_id: "root".into(),
            label: "Child".to_string(),
        })
        .unwrap();

        assert_eq!(
            json,
            serde_json::json!({"type": "addChild", "parentId": "root", "label": "Child"})
        );
    }
}
