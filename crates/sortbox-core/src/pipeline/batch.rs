//! Fixed-size batch partitioning.

/// Candidates per classification request.
pub const BATCH_SIZE: usize = 25;

/// Split `items` into consecutive batches of [`BATCH_SIZE`].
///
/// Every batch is full except possibly the last, which holds the remainder.
/// Concatenating the batches reproduces `items` in order; empty input gives
/// no batches.
pub fn create_batches<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    items.chunks(BATCH_SIZE).map(<[T]>::to_vec).collect()
}

/// Number of batches [`create_batches`] would produce for `len` items.
pub fn batch_count(len: usize) -> usize {
    len.div_ceil(BATCH_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("t-{i}")).collect()
    }

    #[test]
    fn two_hundred_items_make_eight_full_batches() {
        let batches = create_batches(&ids(200));
        assert_eq!(batches.len(), 8);
        assert!(batches.iter().all(|b| b.len() == BATCH_SIZE));
    }

    #[test]
    fn uneven_split_keeps_remainder_last() {
        let batches = create_batches(&ids(30));
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 25);
        assert_eq!(batches[1].len(), 5);
    }

    #[test]
    fn empty_input_makes_no_batches() {
        let batches = create_batches::<String>(&[]);
        assert!(batches.is_empty());
    }

    #[test]
    fn single_item_is_one_batch() {
        let batches = create_batches(&ids(1));
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
    }

    #[test]
    fn exactly_batch_size_is_one_batch() {
        assert_eq!(create_batches(&ids(BATCH_SIZE)).len(), 1);
    }

    #[test]
    fn concatenation_reproduces_input() {
        for n in [0, 1, 24, 25, 26, 49, 50, 51, 137] {
            let input = ids(n);
            let batches = create_batches(&input);
            assert_eq!(batches.len(), batch_count(n), "n = {n}");
            assert_eq!(batches.len(), n.div_ceil(BATCH_SIZE));
            let flat: Vec<String> = batches.concat();
            assert_eq!(flat, input, "n = {n}");
            if let Some((last, full)) = batches.split_last() {
                assert!(full.iter().all(|b| b.len() == BATCH_SIZE));
                let expected_last = if n % BATCH_SIZE == 0 { BATCH_SIZE } else { n % BATCH_SIZE };
                assert_eq!(last.len(), expected_last);
            }
        }
    }
}
