use crate::dataset::{Batch, Dataset};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use titanic_ml_core::MlResult;

/// Iterates a dataset in mini-batches. Shuffling uses a seeded generator, so
/// the sequence of epochs is reproducible.
pub struct DataLoader<'a, D: Dataset> {
    dataset: &'a D,
    batch_size: usize,
    shuffle: bool,
    rng: StdRng,
    indices: Vec<usize>,
    current: usize,
}

impl<'a, D: Dataset> DataLoader<'a, D> {
    pub fn new(dataset: &'a D, batch_size: usize, shuffle: bool, seed: u64) -> Self {
        let mut loader = DataLoader {
            dataset,
            batch_size: batch_size.max(1),
            shuffle,
            rng: StdRng::seed_from_u64(seed),
            indices: (0..dataset.len()).collect(),
            current: 0,
        };
        loader.reset();
        loader
    }

    /// Start a new epoch (reshuffling if enabled).
    pub fn reset(&mut self) {
        self.current = 0;
        if self.shuffle {
            self.indices.shuffle(&mut self.rng);
        }
    }

    pub fn n_batches(&self) -> usize {
        (self.indices.len() + self.batch_size - 1) / self.batch_size
    }
}

impl<'a, D: Dataset> Iterator for DataLoader<'a, D> {
    type Item = MlResult<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.indices.len() {
            return None;
        }
        let end = (self.current + self.batch_size).min(self.indices.len());
        let batch = self.dataset.batch(&self.indices[self.current..end]);
        self.current = end;
        Some(batch)
    }
}
