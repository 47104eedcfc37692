pub mod catalog;
pub mod commerce;
pub mod coupons;
pub mod offers;
pub mod orders;
pub mod payments;
pub mod reports;
pub mod returns;

/// Cuts one 1-based page out of `items`. Returns the page and the total count.
pub fn paginate<T>(items: Vec<T>, page: u64, limit: u64) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let limit = limit.max(1);
    let skip = page.max(1).saturating_sub(1).saturating_mul(limit);
    let items = items
        .into_iter()
        .skip(usize::try_from(skip).unwrap_or(usize::MAX))
        .take(usize::try_from(limit).unwrap_or(usize::MAX))
        .collect();
    (items, total)
}

#[cfg(test)]
mod tests {
    use super::paginate;

    #[test]
    fn pages_are_one_based() {
        let (first, total) = paginate((1..=5).collect::<Vec<_>>(), 1, 2);
        assert_eq!(first, vec![1, 2]);
        assert_eq!(total, 5);
        let (last, _) = paginate((1..=5).collect::<Vec<_>>(), 3, 2);
        assert_eq!(last, vec![5]);
        let (past_end, _) = paginate((1..=5).collect::<Vec<_>>(), 9, 2);
        assert!(past_end.is_empty());
    }
}
