//! JSON export and import of whole snapshots.
//!
//! Exported documents mirror the data model exactly. Imports must be valid JSON
//! of the right shape and free of duplicate identities; anything else is
//! rejected and the caller keeps its current snapshot.

use crate::{
    domain::{Board, Tree, TreeNode},
    error::{Result, TrellisError},
};
use std::{collections::HashSet, path::Path};
use tokio::fs;
use tracing::info;

pub const BOARD_FILE_NAME: &str = "kanban-board.json";
pub const TREE_FILE_NAME: &str = "tree-data.json";

pub fn export_board(board: &Board) -> Result<String> {
    Ok(serde_json::to_string_pretty(board)?)
}

pub fn import_board(json: &str) -> Result<Board> {
    let value = parse(json)?;
    let board: Board = serde_json::from_value(value)
        .map_err(|err| TrellisError::InvalidImport(format!("not a board: {}", err)))?;

    let mut seen = HashSet::new();
    for card in board.columns().iter().flat_map(|col| col.cards.iter()) {
        if !seen.insert(card.id.as_str()) {
            return Err(TrellisError::InvalidImport(format!(
                "duplicate card id {}",
                card.id
            )));
        }
    }
    Ok(board)
}

pub fn export_tree(tree: &Tree) -> Result<String> {
    Ok(serde_json::to_string_pretty(&tree.to_document())?)
}

pub fn import_tree(json: &str) -> Result<Tree> {
    let value = parse(json)?;
    let document: TreeNode = serde_json::from_value(value)
        .map_err(|err| TrellisError::InvalidImport(format!("not a tree: {}", err)))?;

    Tree::from_document(document).map_err(|err| match err {
        TrellisError::DuplicateId(id) => {
            TrellisError::InvalidImport(format!("duplicate node id {}", id))
        }
        other => other,
    })
}

fn parse(json: &str) -> Result<serde_json::Value> {
    serde_json::from_str(json)
        .map_err(|err| TrellisError::InvalidImport(format!("invalid file format: {}", err)))
}

/// Writes the board as pretty JSON to `path`
pub async fn write_board(path: impl AsRef<Path>, board: &Board) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, export_board(board)?).await?;
    info!(path = %path.display(), cards = board.total_cards(), "board exported");
    Ok(())
}

pub async fn read_board(path: impl AsRef<Path>) -> Result<Board> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).await?;
    let board = import_board(&contents)?;
    info!(path = %path.display(), cards = board.total_cards(), "board imported");
    Ok(board)
}

/// Writes the tree as pretty JSON to `path`
pub async fn write_tree(path: impl AsRef<Path>, tree: &Tree) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, export_tree(tree)?).await?;
    info!(path = %path.display(), nodes = tree.node_count(), "tree exported");
    Ok(())
}

pub async fn read_tree(path: impl AsRef<Path>) -> Result<Tree> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).await?;
    let tree = import_tree(&contents)?;
    info!(path = %path.display(), nodes = tree.node_count(), "tree imported");
    Ok(tree)
}
