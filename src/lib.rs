//! # Trellis Core
//!
//! Structural editing for two kinds of hierarchical data: a kanban board of
//! columns and cards, and a lazily loaded tree of leveled nodes.
//!
//! Both models are immutable snapshots; every edit derives a new one. The
//! editors in [`editor`] layer validation, change notification, drag-and-drop
//! and JSON interchange on top, without any dependency on a specific UI.

pub mod config;
pub mod domain;
pub mod drag;
pub mod editor;
pub mod error;
pub mod expansion;
pub mod intent;
pub mod interchange;

// Re-export commonly used types
pub use config::{BoardConfig, EditorConfig, TreeConfig};
pub use domain::{Board, Card, Column, Identity, Level, Tree, TreeNode};
pub use editor::{BoardEditor, TreeEditor};
pub use error::{Result, TrellisError};
pub use expansion::{ChildFetcher, MockChildFetcher};
pub use intent::{BoardIntent, TreeIntent};
