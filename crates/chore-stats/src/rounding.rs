//! Rounding helpers shared by the percentage and day-count stats.

/// Round to the nearest integer, halves toward positive infinity
/// (`2.5 → 3`, `-1.5 → -1`).
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

/// `round_half_up(100 * part / whole)` in integer arithmetic; 0 when `whole` is 0.
///
/// `part` is clamped to `whole`, so the result is always within `0..=100`.
pub fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = part.min(whole) as u64;
    let whole = whole as u64;
    ((200 * part + whole) / (2 * whole)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.49), 2);
        assert_eq!(round_half_up(-1.5), -1);
        assert_eq!(round_half_up(-1.51), -2);
        assert_eq!(round_half_up(0.0), 0);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 2), 50);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 8), 13); // 12.5 rounds up
        assert_eq!(percent(5, 5), 100);
        assert_eq!(percent(9, 5), 100);
    }

    #[test]
    fn test_percent_bounds() {
        for whole in 0..50 {
            for part in 0..=whole {
                assert!(percent(part, whole) <= 100);
            }
        }
    }
}
