use rand::{Rng, RngCore};

/// Cosmetic operations-log lines and their cumulative selection thresholds.
const FLAVOR_LINES: &[(f64, &str)] = &[
    (0.22, "matrix: scanning public signals..."),
    (0.40, "assembler: correlating patterns..."),
    (0.56, "assembler: normalizing noise..."),
    (0.70, "matrix: rerouting green streams..."),
    (0.82, "assembler: stitching identity fragments..."),
    (1.00, "matrix: verifying checksum..."),
];

/// Maps a roll in `[0, 1)` onto the weighted pool.
pub fn flavor_for_roll(roll: f64) -> &'static str {
    FLAVOR_LINES
        .iter()
        .find(|(threshold, _)| roll < *threshold)
        .map(|(_, line)| *line)
        .unwrap_or(FLAVOR_LINES[FLAVOR_LINES.len() - 1].1)
}

/// With probability `chance`, returns one flavor line.
pub fn maybe_flavor(chance: f64, rng: &mut dyn RngCore) -> Option<&'static str> {
    if rng.gen_bool(chance.clamp(0.0, 1.0)) {
        Some(flavor_for_roll(rng.gen()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn rolls_land_in_weighted_buckets() {
        assert_eq!(flavor_for_roll(0.0), "matrix: scanning public signals...");
        assert_eq!(flavor_for_roll(0.21), "matrix: scanning public signals...");
        assert_eq!(flavor_for_roll(0.22), "assembler: correlating patterns...");
        assert_eq!(flavor_for_roll(0.81), "assembler: stitching identity fragments...");
        assert_eq!(flavor_for_roll(0.99), "matrix: verifying checksum...");
    }

    #[test]
    fn chance_bounds_are_respected() {
        let mut rng = StdRng::seed_from_u64(9);
        assert!((0..100).all(|_| maybe_flavor(0.0, &mut rng).is_none()));
        assert!((0..100).all(|_| maybe_flavor(1.0, &mut rng).is_some()));
    }
}
