//! Ordered-sequence helpers shared by the board and tree models.
//!
//! Insert positions past the end clamp to an append.

/// Inserts `item` at `index`, appending when `index` is past the end
pub fn insert_clamped<T>(items: &mut Vec<T>, index: usize, item: T) {
    let index = index.min(items.len());
    items.insert(index, item);
}

/// Removes and returns the element at `index`, or `None` when out of range
pub fn remove_at<T>(items: &mut Vec<T>, index: usize) -> Option<T> {
    if index < items.len() {
        Some(items.remove(index))
    } else {
        None
    }
}

/// Removes the first element matching `pred`, returning it with its former position
pub fn remove_where<T>(items: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> Option<(usize, T)> {
    let pos = items.iter().position(pred)?;
    Some((pos, items.remove(pos)))
}
