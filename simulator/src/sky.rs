//! Synthetic star fields for exercising the catalog without a survey extract.

use rand::rngs::StdRng;
use rand::{rng, Rng, RngCore, SeedableRng};
use shared::{BucketConfig, Coordinate};

/// Uniformly scattered stars covering the declination span of `config`.
///
/// RA is drawn from `[0, 360)` and Dec from `[min_declination, max_declination)`,
/// so every star is indexable by a catalog built with the same config.
pub fn random_catalog_entries(
    count: usize,
    config: &BucketConfig,
    rng_seed: Option<u64>,
) -> Vec<Coordinate> {
    let rng_seed = rng_seed.unwrap_or_else(|| rng().next_u64());
    let mut rng = StdRng::seed_from_u64(rng_seed);
    let (min_dec, max_dec) = (config.min_declination, config.max_declination());

    (0..count)
        .filter_map(|_| {
            let ra = rng.random_range(0.0..360.0);
            let dec = rng.random_range(min_dec..max_dec);
            Coordinate::new(ra, dec).ok()
        })
        .collect()
}
