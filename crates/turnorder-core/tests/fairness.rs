#![forbid(unsafe_code)]

//! Uniformity checks for winner resolution and turn-order shuffling.
//!
//! Tolerances are loose enough that a correct uniform source fails with
//! negligible probability, and tight enough to catch modulo bias or an
//! off-by-one in the shuffle.

use std::num::NonZeroUsize;
use std::time::Duration;

use turnorder_core::{
    ContactId, MemoryModeStore, PickerConfig, Position, RandomSource, SeededRandom, Session,
    SystemRandom, generate_turn_order, sample_distribution,
};

const SAMPLES: usize = 12_000;
const TOLERANCE: f64 = 0.03;

fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[test]
fn system_random_is_uniform_over_candidates() {
    let mut rng = SystemRandom::new();
    for k in 2..=6 {
        let report = sample_distribution(&mut rng, nz(k), SAMPLES);
        assert_eq!(report.counts.iter().sum::<usize>(), SAMPLES);
        assert!(
            report.within(TOLERANCE),
            "k={k} deviation={} counts={:?}",
            report.max_deviation(),
            report.counts
        );
    }
}

#[test]
fn seeded_random_is_uniform_over_candidates() {
    let mut rng = SeededRandom::new(0x5eed);
    for k in 2..=6 {
        let report = sample_distribution(&mut rng, nz(k), SAMPLES);
        assert!(report.within(TOLERANCE), "k={k} counts={:?}", report.counts);
        // 99.9th percentile of chi-squared with 5 degrees of freedom is 20.5.
        assert!(report.chi_squared() < 20.5, "k={k} chi2={}", report.chi_squared());
    }
}

#[test]
fn session_winner_is_uniform_over_contacts() {
    const K: u32 = 4;
    const ROUNDS: usize = 2_000;
    let mut wins = [0usize; K as usize];
    let mut s = Session::new(
        PickerConfig::default(),
        Box::new(MemoryModeStore::with_value(
            "turnorder.lastMode",
            "contact-pick",
        )),
        SeededRandom::new(17),
    )
    .unwrap();

    for _ in 0..ROUNDS {
        for n in 0..K {
            s.on_contact_start(ContactId(n), Position::new(n as f32, 0.0), None)
                .unwrap();
        }
        s.advance_by(Duration::from_millis(2_000));
        let winner = s.winner().unwrap();
        wins[winner.0 as usize] += 1;
        s.reset();
    }

    let expected = ROUNDS as f64 / K as f64;
    for (index, &count) in wins.iter().enumerate() {
        let deviation = (count as f64 - expected).abs() / ROUNDS as f64;
        assert!(deviation < 0.04, "contact {index} won {count} of {ROUNDS}");
    }
}

#[test]
fn every_position_of_the_shuffle_is_uniform() {
    const N: u32 = 5;
    const ROUNDS: usize = 10_000;
    let mut rng = SeededRandom::new(99);
    // first_place[v] counts how often player v+1 goes first.
    let mut first_place = [0usize; N as usize];
    let mut last_place = [0usize; N as usize];
    for _ in 0..ROUNDS {
        let order = generate_turn_order(N, &mut rng);
        first_place[(order[0] - 1) as usize] += 1;
        last_place[(order[N as usize - 1] - 1) as usize] += 1;
    }
    let expected = 1.0 / N as f64;
    for counts in [first_place, last_place] {
        for &c in &counts {
            let freq = c as f64 / ROUNDS as f64;
            assert!((freq - expected).abs() < TOLERANCE, "{counts:?}");
        }
    }
}

#[test]
fn boxed_source_forwards_draws() {
    let mut rng: Box<dyn RandomSource> = Box::new(SeededRandom::new(3));
    let report = sample_distribution(&mut rng, nz(3), 3_000);
    assert!(report.within(0.05));
    assert!(!rng.is_secure());
}
