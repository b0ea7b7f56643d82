use rand::Rng;
use rand::seq::IndexedRandom;

use crate::types::{Filetime, Kitten};

const DUMMY_NAMES: [&str; 8] = [
    "mk1", "mk2", "mk3", "nabi", "coco", "tom", "luna", "mimi",
];

/// Ten years, in 100ns ticks
const MAX_AGE_TICKS: i64 = 10 * 365 * 24 * 3600 * 10_000_000;

/// Generates `count` random kittens, born within the last ten years.
pub fn dummy_kittens<R>(rng: &mut R, count: usize) -> Vec<Kitten>
where
    R: Rng + ?Sized,
{
    let now = Filetime::now().ticks();

    (0..count)
        .map(|_| {
            let name = DUMMY_NAMES.choose(rng).copied().unwrap_or("mk3");
            Kitten::new(name)
                .with_age(rng.random_range(0..20))
                .with_height(rng.random_range(100..=220))
                .with_birth(now - rng.random_range(0..MAX_AGE_TICKS))
        })
        .collect()
}
