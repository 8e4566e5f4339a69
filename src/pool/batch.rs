/// Contiguous slice of `items` for the 1-based `batch_number`.
///
/// A `batch_size` of zero disables batching and returns every item. A batch
/// past the end is empty; deciding whether that is fatal is up to the caller.
/// Batch number 0 is treated as batch 1.
pub fn partition<T>(items: &[T], batch_size: usize, batch_number: usize) -> &[T] {
    if batch_size == 0 {
        return items;
    }
    let start = batch_number.saturating_sub(1).saturating_mul(batch_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(batch_size).min(items.len());
    &items[start..end]
}

/// Number of non-empty batches `len` items split into.
pub fn batch_count(len: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        1
    } else {
        len.div_ceil(batch_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case::first(10, 1, 0..10)]
    #[case::middle(10, 2, 10..20)]
    #[case::last_partial(10, 3, 20..25)]
    #[case::past_the_end(10, 5, 0..0)]
    #[case::exactly_at_end(5, 6, 0..0)]
    #[case::larger_than_list(100, 1, 0..25)]
    fn slices_of_twenty_five(
        #[case] batch_size: usize,
        #[case] batch_number: usize,
        #[case] expected: std::ops::Range<usize>,
    ) {
        let items = (0..25).collect::<Vec<_>>();
        assert_eq!(partition(&items, batch_size, batch_number), &items[expected]);
    }

    #[test]
    fn zero_batch_number_is_first_batch() {
        let items = [1, 2, 3];
        assert_eq!(partition(&items, 2, 0), &[1, 2]);
    }

    #[test]
    fn empty_list_yields_empty_batches() {
        let items: [u8; 0] = [];
        assert!(partition(&items, 3, 1).is_empty());
        assert_eq!(batch_count(0, 3), 0);
    }

    #[rstest]
    #[case(25, 10, 3)]
    #[case(20, 10, 2)]
    #[case(1, 10, 1)]
    #[case(7, 0, 1)]
    fn counts_batches(#[case] len: usize, #[case] batch_size: usize, #[case] expected: usize) {
        assert_eq!(batch_count(len, batch_size), expected);
    }

    proptest! {
        /// Property: without batching every item is returned unchanged
        #[test]
        fn zero_batch_size_is_identity(
            items in proptest::collection::vec(any::<u16>(), 0..64),
            n in 0usize..100,
        ) {
            prop_assert_eq!(partition(&items, 0, n), items.as_slice());
        }

        /// Property: batches 1..=count tile the input with no gap or overlap
        #[test]
        fn batches_tile_the_input(
            items in proptest::collection::vec(any::<u16>(), 0..64),
            batch_size in 1usize..20,
        ) {
            let count = batch_count(items.len(), batch_size);
            let joined = (1..=count)
                .flat_map(|n| partition(&items, batch_size, n).iter().copied())
                .collect::<Vec<_>>();
            prop_assert_eq!(joined, items.clone());
            for n in 1..=count {
                prop_assert!(!partition(&items, batch_size, n).is_empty());
            }
            prop_assert!(partition(&items, batch_size, count + 1).is_empty());
        }
    }
}
