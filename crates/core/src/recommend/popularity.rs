//! Popularity ranking used when collaborative scores are unavailable.

use std::collections::HashMap;

use crate::domain::item::ItemId;

/// The `top_n` catalog items with the most recorded interactions.
///
/// Ties keep catalog order. Items missing from `counts` count as zero and
/// counts for items outside `catalog` are ignored.
pub fn most_popular(
    catalog: &[ItemId],
    counts: &HashMap<ItemId, u64>,
    top_n: usize,
) -> Vec<(ItemId, u64)> {
    let mut ranked: Vec<(usize, ItemId, u64)> = catalog
        .iter()
        .enumerate()
        .map(|(position, item)| (position, *item, counts.get(item).copied().unwrap_or(0)))
        .collect();

    ranked.sort_by(|(left_pos, _, left), (right_pos, _, right)| {
        right.cmp(left).then(left_pos.cmp(right_pos))
    });

    ranked.into_iter().take(top_n).map(|(_, item, count)| (item, count)).collect()
}
