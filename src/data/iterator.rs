// ============================================================
// Layer 4: Dataset Iterator
// ============================================================
// Turns one split of the array bundle into a lazy sequence of
// Batches.
//
//   train  shuffled, repeats forever. Every pass visits each row
//          exactly once in a fresh random order, and the pass
//          boundary is invisible to the consumer apart from a
//          possibly short last batch.
//   test   stored order, exactly one pass, then None.
//
// A batch never straddles two passes: with 10 rows and
// batch_size 4 a pass yields batches of 4, 4 and 2.
//
// Reference: rand::seq::SliceRandom (Fisher-Yates shuffle)

use std::sync::Arc;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::bundle::{ArrayBundle, SplitData};
use crate::domain::{batch::Batch, error::DataError, split::Split};

/// Batch size used for both training and evaluation by default.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// How a split is walked. `for_split` gives the standard
/// behaviour; the fields can be overridden for tests or
/// reproducible runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IteratorOptions {
    /// Re-shuffle row order at the start of every pass.
    pub shuffle: bool,
    /// Start a new pass instead of ending after the first.
    pub repeat:  bool,
    /// Seed for the shuffle; `None` draws one from the OS.
    pub seed:    Option<u64>,
}

impl IteratorOptions {
    pub fn for_split(split: Split) -> Self {
        match split {
            Split::Train => Self { shuffle: true, repeat: true, seed: None },
            Split::Test => Self { shuffle: false, repeat: false, seed: None },
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }
}

/// Create the standard iterator over a split named by string.
///
/// Fails with [`DataError::InvalidSplit`] for any name other than
/// "train" or "test", before a single batch is produced.
pub fn make_iterator(
    bundle:     &ArrayBundle,
    split:      &str,
    batch_size: usize,
) -> Result<DatasetIterator, DataError> {
    let split: Split = split.parse()?;
    DatasetIterator::new(
        Arc::clone(bundle.split(split)),
        batch_size,
        IteratorOptions::for_split(split),
    )
}

pub struct DatasetIterator {
    data:       Arc<SplitData>,
    batch_size: usize,
    options:    IteratorOptions,
    /// Row visiting order of the current pass.
    order:      Vec<usize>,
    /// Position of the next row within `order`.
    cursor:     usize,
    passes:     u64,
    rng:        StdRng,
    done:       bool,
}

impl DatasetIterator {
    pub fn new(
        data:       Arc<SplitData>,
        batch_size: usize,
        options:    IteratorOptions,
    ) -> Result<Self, DataError> {
        if batch_size == 0 {
            return Err(DataError::InvalidBatchSize);
        }
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let order = (0..data.len()).collect();
        let mut it = Self {
            data,
            batch_size,
            options,
            order,
            cursor: 0,
            passes: 0,
            rng,
            done: false,
        };
        it.begin_pass();
        Ok(it)
    }

    /// Number of passes started so far (1 after construction).
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Rewind to the start of a fresh pass. Shuffled iterators get
    /// a new order; the RNG is not reseeded.
    pub fn restart(&mut self) {
        self.done   = false;
        self.passes = 0;
        self.order  = (0..self.data.len()).collect();
        self.begin_pass();
    }

    /// Advance past the next `n` batches without copying any rows,
    /// leaving the iterator exactly where `n` calls to `next` would.
    /// Returns how many batches were skipped, which is less than `n`
    /// only for a finite iterator that ran out.
    pub fn skip_batches(&mut self, n: u64) -> u64 {
        let mut skipped = 0;
        while skipped < n && self.has_next() {
            self.cursor = (self.cursor + self.batch_size).min(self.order.len());
            skipped += 1;
        }
        skipped
    }

    /// Start a new pass if the current one is used up. False once
    /// nothing is left to yield.
    fn has_next(&mut self) -> bool {
        if self.done || self.data.is_empty() {
            return false;
        }
        if self.cursor >= self.order.len() {
            if !self.options.repeat {
                self.done = true;
                return false;
            }
            self.begin_pass();
        }
        true
    }

    fn begin_pass(&mut self) {
        if self.options.shuffle {
            self.order.shuffle(&mut self.rng);
        }
        self.cursor  = 0;
        self.passes += 1;
    }

    fn take_batch(&mut self) -> Batch {
        let end  = (self.cursor + self.batch_size).min(self.order.len());
        let rows = &self.order[self.cursor..end];
        let dim  = self.data.embedding_dim();

        let mut features = Vec::with_capacity(rows.len() * dim);
        let mut labels   = Vec::with_capacity(rows.len());
        for &r in rows {
            features.extend_from_slice(self.data.row(r));
            labels.push(self.data.target(r));
        }
        self.cursor = end;
        Batch::from_validated(features, labels, dim)
    }
}

impl Iterator for DatasetIterator {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if !self.has_next() {
            return None;
        }
        Some(self.take_batch())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done || self.data.is_empty() {
            (0, Some(0))
        } else if self.options.repeat {
            (usize::MAX, None)
        } else {
            let remaining = self.order.len() - self.cursor;
            let n = remaining.div_ceil(self.batch_size);
            (n, Some(n))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn xor_bundle() -> ArrayBundle {
        let rows = vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]];
        let train = SplitData::from_rows(&rows, vec![0, 1, 1, 0]).unwrap();
        let test  = SplitData::from_rows(&rows[..3], vec![0, 1, 1]).unwrap();
        ArrayBundle::new(train, test, vec![]).unwrap()
    }

    fn numbered_split(n: usize) -> Arc<SplitData> {
        // row i holds the single feature value i, target i % 3
        let features = (0..n).map(|i| i as f32).collect();
        let targets  = (0..n).map(|i| i % 3).collect();
        Arc::new(SplitData::new(features, targets, 1).unwrap())
    }

    fn row_ids(batch: &Batch) -> Vec<usize> {
        batch.features().iter().map(|&v| v as usize).collect()
    }

    #[test]
    fn test_invalid_split_fails_before_any_batch() {
        let bundle = xor_bundle();
        for name in ["validation", "TRAIN", "", "tests"] {
            match make_iterator(&bundle, name, 2) {
                Err(DataError::InvalidSplit(v)) => assert_eq!(v, name),
                other => panic!("expected InvalidSplit for {name:?}, got {:?}", other.map(|_| ())),
            }
        }
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        assert_eq!(
            make_iterator(&xor_bundle(), "test", 0).err(),
            Some(DataError::InvalidBatchSize)
        );
    }

    #[test]
    fn test_unshuffled_train_pass_yields_stored_batches() {
        let bundle = xor_bundle();
        let opts = IteratorOptions::for_split(Split::Train).with_shuffle(false);
        let mut it = DatasetIterator::new(Arc::clone(bundle.split(Split::Train)), 2, opts).unwrap();

        let b1 = it.next().unwrap();
        assert_eq!(b1.features(), &[0.0, 0.0, 0.0, 1.0]);
        assert_eq!(b1.labels(), &[0, 1]);

        let b2 = it.next().unwrap();
        assert_eq!(b2.features(), &[1.0, 0.0, 1.0, 1.0]);
        assert_eq!(b2.labels(), &[1, 0]);

        // wraps around into a second pass
        assert_eq!(it.next().unwrap(), b1);
        assert_eq!(it.passes(), 2);
    }

    #[test]
    fn test_test_split_ends_after_one_pass_with_short_tail() {
        let bundle = xor_bundle();
        let it = make_iterator(&bundle, "test", 2).unwrap();
        assert_eq!(it.size_hint(), (2, Some(2)));

        let batches: Vec<Batch> = it.collect();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1].len(), 1);
        assert_eq!(batches[1].labels(), &[1]);
    }

    #[test]
    fn test_train_never_exhausts() {
        let bundle = xor_bundle();
        let it = make_iterator(&bundle, "train", 3).unwrap();
        // 4 rows, batch 3: every pass is [3, 1]
        let sizes: Vec<usize> = it.take(1000).map(|b| b.len()).collect();
        assert_eq!(sizes.len(), 1000);
        assert!(sizes.chunks(2).all(|c| c == [3, 1]));
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let data = numbered_split(50);
        let opts = IteratorOptions::for_split(Split::Train).with_seed(7);
        let a: Vec<Batch> = DatasetIterator::new(Arc::clone(&data), 8, opts).unwrap().take(20).collect();
        let b: Vec<Batch> = DatasetIterator::new(data, 8, opts).unwrap().take(20).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_skipping_lands_where_iteration_would() {
        let data = numbered_split(10);
        let opts = IteratorOptions::for_split(Split::Train).with_seed(3);
        let walked: Vec<Batch> = DatasetIterator::new(Arc::clone(&data), 4, opts).unwrap().take(8).collect();

        // 7 batches span three passes of [4, 4, 2]
        let mut it = DatasetIterator::new(data, 4, opts).unwrap();
        assert_eq!(it.skip_batches(7), 7);
        assert_eq!(it.passes(), 3);
        assert_eq!(it.next().unwrap(), walked[7]);
    }

    #[test]
    fn test_skipping_past_a_single_pass_stops_early() {
        let mut it = DatasetIterator::new(numbered_split(5), 2, IteratorOptions::for_split(Split::Test)).unwrap();
        assert_eq!(it.skip_batches(1), 1);
        assert_eq!(row_ids(&it.next().unwrap()), vec![2, 3]);
        assert_eq!(it.skip_batches(10), 1);
        assert!(it.next().is_none());
    }

    #[test]
    fn test_restart_rewinds_test_iterator() {
        let mut it = DatasetIterator::new(numbered_split(5), 2, IteratorOptions::for_split(Split::Test)).unwrap();
        let first: Vec<Batch> = it.by_ref().collect();
        assert!(it.next().is_none());
        it.restart();
        let second: Vec<Batch> = it.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_split_yields_nothing() {
        let empty = Arc::new(SplitData::new(vec![], vec![], 4).unwrap());
        let mut it = DatasetIterator::new(empty, 10, IteratorOptions::for_split(Split::Train)).unwrap();
        assert!(it.next().is_none());
    }

    proptest! {
        #[test]
        fn prop_test_split_is_one_ordered_pass(n in 1usize..200, batch_size in 1usize..40) {
            let it = DatasetIterator::new(numbered_split(n), batch_size, IteratorOptions::for_split(Split::Test)).unwrap();
            let batches: Vec<Batch> = it.collect();

            prop_assert!(batches.iter().all(|b| b.len() <= batch_size && !b.is_empty()));
            let seen: Vec<usize> = batches.iter().flat_map(row_ids).collect();
            prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());
        }

        #[test]
        fn prop_each_train_pass_is_a_permutation(n in 1usize..200, batch_size in 1usize..40, seed in any::<u64>()) {
            let opts = IteratorOptions::for_split(Split::Train).with_seed(seed);
            let mut it = DatasetIterator::new(numbered_split(n), batch_size, opts).unwrap();
            let batches_per_pass = n.div_ceil(batch_size);

            for _ in 0..3 {
                let mut seen: Vec<usize> = (0..batches_per_pass)
                    .flat_map(|_| row_ids(&it.next().unwrap()))
                    .collect();
                seen.sort_unstable();
                prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());
            }
        }

        #[test]
        fn prop_labels_stay_with_their_rows(n in 1usize..100, seed in any::<u64>()) {
            let opts = IteratorOptions::for_split(Split::Train).with_seed(seed);
            let it = DatasetIterator::new(numbered_split(n), 7, opts).unwrap();
            for batch in it.take(30) {
                for (row, &label) in row_ids(&batch).into_iter().zip(batch.labels()) {
                    prop_assert_eq!(label, row % 3);
                }
            }
        }
    }
}
