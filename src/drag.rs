//! Drag-reorder controller.
//!
//! Turns a continuous drag gesture into discrete move intents. Hover events
//! reorder live: each qualifying crossing emits one intent and the session then
//! tracks the dragged item at its new position.

use crate::{
    domain::{Board, Identity, Tree},
    intent::{BoardIntent, TreeIntent},
};
use tracing::debug;

/// Vertical extent of the hovered item, in the same coordinates as the pointer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemBounds {
    pub top: f64,
    pub bottom: f64,
}

impl ItemBounds {
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }

    /// Offset of the vertical midpoint from the item's top edge
    pub fn middle_offset(&self) -> f64 {
        (self.bottom - self.top) / 2.0
    }
}

/// Where the dragged item sits: a container and an index within it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPosition<C> {
    pub container: C,
    pub index: usize,
}

impl<C> DragPosition<C> {
    pub fn new(container: C, index: usize) -> Self {
        Self { container, index }
    }
}

/// One emitted reorder: the item now at `from` goes to `to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reorder<C> {
    pub item_id: Identity,
    pub from: DragPosition<C>,
    pub to: DragPosition<C>,
}

/// Container-agnostic drag state
#[derive(Debug, Clone)]
pub struct DragSession<C> {
    item_id: Identity,
    origin: DragPosition<C>,
    current: DragPosition<C>,
}

impl<C: Clone + PartialEq> DragSession<C> {
    pub fn begin(item_id: Identity, container: C, index: usize) -> Self {
        let origin = DragPosition::new(container, index);
        Self {
            item_id,
            current: origin.clone(),
            origin,
        }
    }

    pub fn item_id(&self) -> &Identity {
        &self.item_id
    }

    /// Position the item was picked up from
    pub fn origin(&self) -> &DragPosition<C> {
        &self.origin
    }

    /// Position the item has been moved to so far
    pub fn current(&self) -> &DragPosition<C> {
        &self.current
    }

    /// Re-anchors the session after the item moved by other means
    pub fn resync(&mut self, position: DragPosition<C>) {
        self.current = position;
    }

    /// Handles the pointer hovering the item at `hover_index` of `container`.
    ///
    /// Moving down only fires once the pointer passes below the hovered item's
    /// midpoint, moving up only once it passes above, so two adjacent items of
    /// equal height do not swap back and forth.
    pub fn hover(
        &mut self,
        container: C,
        hover_index: usize,
        bounds: ItemBounds,
        pointer_y: Option<f64>,
    ) -> Option<Reorder<C>> {
        let drag_index = self.current.index;
        if drag_index == hover_index && self.current.container == container {
            return None;
        }

        let hover_client_y = pointer_y? - bounds.top;
        let hover_middle = bounds.middle_offset();
        if drag_index < hover_index && hover_client_y < hover_middle {
            return None;
        }
        if drag_index > hover_index && hover_client_y > hover_middle {
            return None;
        }

        Some(self.advance(DragPosition::new(container, hover_index)))
    }

    /// Handles a drop onto a container with no item under the pointer.
    ///
    /// Only empty containers accept such a drop, and only when no nested target
    /// already handled the event.
    pub fn drop_on_empty(
        &mut self,
        container: C,
        container_is_empty: bool,
        already_handled: bool,
    ) -> Option<Reorder<C>> {
        if already_handled || !container_is_empty {
            return None;
        }
        Some(self.advance(DragPosition::new(container, 0)))
    }

    /// Abandons the drag without emitting anything
    pub fn cancel(self) {}

    fn advance(&mut self, to: DragPosition<C>) -> Reorder<C> {
        let from = std::mem::replace(&mut self.current, to.clone());
        Reorder {
            item_id: self.item_id.clone(),
            from,
            to,
        }
    }
}

/// Drags a card between and within board columns
#[derive(Debug, Clone)]
pub struct BoardDrag {
    session: DragSession<Identity>,
}

impl BoardDrag {
    /// Starts dragging `card_id`, or `None` if the board has no such card
    pub fn pick_up(board: &Board, card_id: &str) -> Option<Self> {
        let (column, index) = board.find_card(card_id)?;
        let card = &column.cards[index];
        Some(Self {
            session: DragSession::begin(card.id.clone(), column.id.clone(), index),
        })
    }

    pub fn session(&self) -> &DragSession<Identity> {
        &self.session
    }

    /// Hover over the card at `hover_index` of `column_id`.
    ///
    /// The emitted source index always refers to where the card really is in
    /// `board`; hover targets that do not exist are ignored.
    pub fn hover(
        &mut self,
        board: &Board,
        column_id: &str,
        hover_index: usize,
        bounds: ItemBounds,
        pointer_y: Option<f64>,
    ) -> Option<BoardIntent> {
        let column = board.column(column_id)?;
        if hover_index >= column.cards.len() || !self.sync(board) {
            return None;
        }

        let reorder = self
            .session
            .hover(column.id.clone(), hover_index, bounds, pointer_y)?;
        Some(Self::intent(reorder))
    }

    /// Drop onto a column's empty area
    pub fn drop_on_column(
        &mut self,
        board: &Board,
        column_id: &str,
        already_handled: bool,
    ) -> Option<BoardIntent> {
        let column = board.column(column_id)?;
        if !self.sync(board) {
            return None;
        }

        let reorder =
            self.session
                .drop_on_empty(column.id.clone(), column.cards.is_empty(), already_handled)?;
        Some(Self::intent(reorder))
    }

    pub fn cancel(self) {
        debug!(card = %self.session.item_id(), "card drag cancelled");
        self.session.cancel();
    }

    /// Re-anchors the session to the card's actual position; false if the card is gone
    fn sync(&mut self, board: &Board) -> bool {
        match board.find_card(self.session.item_id().as_str()) {
            Some((column, index)) => {
                let actual = DragPosition::new(column.id.clone(), index);
                if *self.session.current() != actual {
                    self.session.resync(actual);
                }
                true
            }
            None => false,
        }
    }

    fn intent(reorder: Reorder<Identity>) -> BoardIntent {
        BoardIntent::MoveCard {
            source_column_id: reorder.from.container,
            dest_column_id: reorder.to.container,
            source_index: reorder.from.index,
            dest_index: reorder.to.index,
        }
    }
}

/// Drags a node to a new position or parent within the tree
#[derive(Debug, Clone)]
pub struct TreeDrag {
    session: DragSession<Identity>,
}

impl TreeDrag {
    /// Starts dragging `node_id`; the root cannot be dragged
    pub fn pick_up(tree: &Tree, node_id: &str) -> Option<Self> {
        let parent = tree.find_parent_node(node_id)?;
        let index = tree.index_in_parent(node_id)?;
        let node = tree.find_node_by_id(node_id)?;
        Some(Self {
            session: DragSession::begin(node.id.clone(), parent.id.clone(), index),
        })
    }

    pub fn session(&self) -> &DragSession<Identity> {
        &self.session
    }

    /// True when the dragged node may become a child of `target_id`:
    /// the target exists and is neither the node itself nor one of its descendants
    pub fn can_drop_on(&self, tree: &Tree, target_id: &str) -> bool {
        tree.contains(target_id)
            && !tree.is_within_subtree(self.session.item_id().as_str(), target_id)
    }

    /// Drop onto a node: the dragged node becomes its last child
    pub fn drop_on_node(
        &mut self,
        tree: &Tree,
        target_id: &str,
        already_handled: bool,
    ) -> Option<TreeIntent> {
        if already_handled || !self.can_drop_on(tree, target_id) || !self.sync(tree) {
            return None;
        }

        let target_index = tree.children_of(target_id).map_or(0, <[Identity]>::len);
        let target = tree.find_node_by_id(target_id)?.id.clone();
        self.session.resync(DragPosition::new(target.clone(), target_index));

        Some(TreeIntent::MoveNode {
            source_id: self.session.item_id().clone(),
            target_parent_id: target,
            target_index,
        })
    }

    /// Hover over sibling `hover_id`: reorders the dragged node into the hovered
    /// node's slot under the hovered node's parent
    pub fn hover(
        &mut self,
        tree: &Tree,
        hover_id: &str,
        bounds: ItemBounds,
        pointer_y: Option<f64>,
    ) -> Option<TreeIntent> {
        let parent = tree.find_parent_node(hover_id)?.id.clone();
        let hover_index = tree.index_in_parent(hover_id)?;
        if !self.can_drop_on(tree, parent.as_str()) || !self.sync(tree) {
            return None;
        }

        let reorder = self.session.hover(parent, hover_index, bounds, pointer_y)?;
        Some(TreeIntent::MoveNode {
            source_id: reorder.item_id,
            target_parent_id: reorder.to.container,
            target_index: reorder.to.index,
        })
    }

    pub fn cancel(self) {
        debug!(node = %self.session.item_id(), "node drag cancelled");
        self.session.cancel();
    }

    fn sync(&mut self, tree: &Tree) -> bool {
        let id = self.session.item_id().as_str();
        match (tree.find_parent_node(id), tree.index_in_parent(id)) {
            (Some(parent), Some(index)) => {
                let actual = DragPosition::new(parent.id.clone(), index);
                if *self.session.current() != actual {
                    self.session.resync(actual);
                }
                true
            }
            _ => false,
        }
    }
}
