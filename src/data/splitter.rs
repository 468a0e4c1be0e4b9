// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Fallback for configs without a dedicated validation file:
// shuffle the training samples and hold out a slice. Takes the
// RNG from the caller so the split follows the run's seed.

use rand::{seq::SliceRandom, Rng};

/// Shuffle `samples` with the given RNG and split into
/// (train, validation), keeping `train_fraction` for training.
pub fn split_train_val<T, R: Rng>(
    mut samples:    Vec<T>,
    train_fraction: f64,
    rng:            &mut R,
) -> (Vec<T>, Vec<T>) {
    samples.shuffle(rng);

    let total = samples.len();
    let split_at = ((total as f64) * train_fraction).round() as usize;
    let split_at = split_at.min(total);

    let val = samples.split_off(split_at);

    tracing::debug!("Dataset split: {} training, {} validation", samples.len(), val.len());

    (samples, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_correct_split_sizes() {
        let mut rng = StdRng::seed_from_u64(0);
        let items: Vec<usize> = (0..100).collect();
        let (train, val) = split_train_val(items, 0.8, &mut rng);
        assert_eq!(train.len(), 80);
        assert_eq!(val.len(), 20);
    }

    #[test]
    fn test_all_items_preserved() {
        let mut rng = StdRng::seed_from_u64(1);
        let items: Vec<usize> = (0..50).collect();
        let (train, val) = split_train_val(items, 0.7, &mut rng);
        assert_eq!(train.len() + val.len(), 50);
    }

    #[test]
    fn test_empty_dataset() {
        let mut rng = StdRng::seed_from_u64(2);
        let items: Vec<usize> = Vec::new();
        let (train, val) = split_train_val(items, 0.8, &mut rng);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }

    #[test]
    fn test_same_seed_same_split() {
        let items: Vec<usize> = (0..30).collect();
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let (train_a, _) = split_train_val(items.clone(), 0.5, &mut rng_a);
        let (train_b, _) = split_train_val(items, 0.5, &mut rng_b);
        assert_eq!(train_a, train_b);
    }
}
