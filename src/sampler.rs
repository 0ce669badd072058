use rand::Rng;
use rand::seq::{SliceRandom, index};

/// Number of items drawn from `len` items: at least one, at most all of them
pub fn sample_size(len: usize, fraction: f64) -> usize {
    if len == 0 {
        return 0;
    }
    let count = (len as f64 * fraction).floor() as usize;
    count.clamp(1, len)
}

/// Draw `sample_size(items.len(), fraction)` items without replacement, in random order
pub fn sample<T: Clone, R: Rng + ?Sized>(items: &[T], fraction: f64, rng: &mut R) -> Vec<T> {
    let amount = sample_size(items.len(), fraction);
    let mut picks = index::sample(rng, items.len(), amount).into_vec();
    picks.shuffle(rng);
    picks.into_iter().map(|i| items[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_sample_size() {
        assert_eq!(sample_size(0, 0.1), 0);
        assert_eq!(sample_size(1, 0.1), 1);
        assert_eq!(sample_size(9, 0.1), 1);
        assert_eq!(sample_size(10, 0.1), 1);
        assert_eq!(sample_size(25, 0.1), 2);
        assert_eq!(sample_size(100, 0.1), 10);
        assert_eq!(sample_size(7, 1.0), 7);
        assert_eq!(sample_size(7, 0.5), 3);
    }

    #[test]
    fn test_sample_is_a_subset_without_repeats() {
        let items: Vec<u32> = (0..200).collect();
        let mut rng = StdRng::seed_from_u64(11);

        for fraction in [0.01, 0.1, 0.33, 0.5, 1.0] {
            let drawn = sample(&items, fraction, &mut rng);
            assert_eq!(drawn.len(), sample_size(items.len(), fraction));

            let unique: HashSet<_> = drawn.iter().collect();
            assert_eq!(unique.len(), drawn.len());
            assert!(drawn.iter().all(|item| items.contains(item)));
        }
    }

    #[test]
    fn test_full_fraction_is_a_permutation() {
        let items: Vec<u32> = (0..50).collect();
        let mut drawn = sample(&items, 1.0, &mut StdRng::seed_from_u64(3));
        drawn.sort();
        assert_eq!(drawn, items);
    }

    #[test]
    fn test_empty_input() {
        let items: Vec<u32> = Vec::new();
        assert!(sample(&items, 0.5, &mut StdRng::seed_from_u64(1)).is_empty());
    }

    #[test]
    fn test_seeded_draws_repeat() {
        let items: Vec<u32> = (0..100).collect();
        let first = sample(&items, 0.2, &mut StdRng::seed_from_u64(99));
        let second = sample(&items, 0.2, &mut StdRng::seed_from_u64(99));
        assert_eq!(first, second);
    }
}
