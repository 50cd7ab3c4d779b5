pub mod board;
pub mod identity;
pub mod level;
pub mod sequence;
pub mod tree;

pub use board::{Board, Card, Column};
pub use identity::{IdGenerator, Identity};
pub use level::Level;
pub use tree::{NodeData, NodeUpdate, Tree, TreeNode};
