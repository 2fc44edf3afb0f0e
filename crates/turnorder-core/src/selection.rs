#![forbid(unsafe_code)]

//! Winner resolution and fairness sampling.

use std::num::NonZeroUsize;

use crate::contact::{Contact, ContactId};
use crate::random::RandomSource;

/// Draw one contact uniformly from `contacts`.
///
/// Fewer than two candidates is not a selection; returns `None` without
/// consuming randomness.
pub fn draw_winner<R: RandomSource + ?Sized>(contacts: &[Contact], rng: &mut R) -> Option<ContactId> {
    if contacts.len() < 2 {
        return None;
    }
    let bound = NonZeroUsize::new(contacts.len())?;
    let index = rng.next_index(bound);
    contacts.get(index).map(|c| c.id)
}

/// Empirical distribution of `samples` draws over `candidates` indices.
#[derive(Debug, Clone, PartialEq)]
pub struct FairnessReport {
    pub candidates: usize,
    pub samples: usize,
    pub counts: Vec<usize>,
}

impl FairnessReport {
    /// Observed frequency of each index.
    #[must_use]
    pub fn frequencies(&self) -> Vec<f64> {
        self.counts
            .iter()
            .map(|&c| c as f64 / self.samples.max(1) as f64)
            .collect()
    }

    /// Largest `|frequency - 1/candidates|` across indices.
    #[must_use]
    pub fn max_deviation(&self) -> f64 {
        let expected = 1.0 / self.candidates.max(1) as f64;
        self.frequencies()
            .into_iter()
            .map(|f| (f - expected).abs())
            .fold(0.0, f64::max)
    }

    /// Pearson chi-squared statistic against the uniform distribution.
    #[must_use]
    pub fn chi_squared(&self) -> f64 {
        let expected = self.samples as f64 / self.candidates.max(1) as f64;
        if expected == 0.0 {
            return 0.0;
        }
        self.counts
            .iter()
            .map(|&c| {
                let d = c as f64 - expected;
                d * d / expected
            })
            .sum()
    }

    /// Every index within `tolerance` of `1/candidates`.
    #[must_use]
    pub fn within(&self, tolerance: f64) -> bool {
        self.max_deviation() <= tolerance
    }
}

/// Call the random source `samples` times over `candidates` indices.
///
/// Exposed so hosts and tests can audit the source the engine actually uses.
pub fn sample_distribution<R: RandomSource + ?Sized>(
    rng: &mut R,
    candidates: NonZeroUsize,
    samples: usize,
) -> FairnessReport {
    let mut counts = vec![0usize; candidates.get()];
    for _ in 0..samples {
        let index = rng.next_index(candidates);
        if let Some(slot) = counts.get_mut(index) {
            *slot += 1;
        }
    }
    FairnessReport {
        candidates: candidates.get(),
        samples,
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::Position;
    use crate::random::{ScriptedRandom, SeededRandom};

    fn contacts(ids: &[u32]) -> Vec<Contact> {
        ids.iter()
            .enumerate()
            .map(|(slot, &id)| Contact {
                id: ContactId(id),
                position: Position::default(),
                slot,
            })
            .collect()
    }

    #[test]
    fn fewer_than_two_is_no_selection() {
        let mut rng = ScriptedRandom::new([0]);
        assert_eq!(draw_winner(&contacts(&[]), &mut rng), None);
        assert_eq!(draw_winner(&contacts(&[5]), &mut rng), None);
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn index_maps_to_insertion_order() {
        let mut rng = ScriptedRandom::new([2]);
        assert_eq!(
            draw_winner(&contacts(&[9, 4, 6]), &mut rng),
            Some(ContactId(6))
        );
    }

    #[test]
    fn sampling_counts_everything() {
        let mut rng = SeededRandom::new(11);
        let report = sample_distribution(&mut rng, NonZeroUsize::new(4).unwrap(), 4_000);
        assert_eq!(report.counts.iter().sum::<usize>(), 4_000);
        assert!(report.within(0.05), "{report:?}");
    }

    #[test]
    fn deviation_and_chi_squared_for_skewed_counts() {
        let report = FairnessReport {
            candidates: 2,
            samples: 100,
            counts: vec![70, 30],
        };
        assert!((report.max_deviation() - 0.2).abs() < 1e-9);
        assert!((report.chi_squared() - 16.0).abs() < 1e-9);
        assert!(!report.within(0.1));
    }
}
