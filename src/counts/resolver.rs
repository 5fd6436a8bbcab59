/// Returns the element of `sorted` closest to `target`.
///
/// `sorted` must be in ascending order. When two timestamps are equally
/// distant from `target`, the earlier one is returned. Returns `None` for an
/// empty slice.
pub fn nearest(sorted: &[i64], target: i64) -> Option<i64> {
    let idx = sorted.partition_point(|t| *t < target);
    let before = idx.checked_sub(1).map(|i| sorted[i]);
    let after = sorted.get(idx).copied();

    match (before, after) {
        (Some(b), Some(a)) => {
            if target - b <= a - target {
                Some(b)
            } else {
                Some(a)
            }
        }
        (Some(b), None) => Some(b),
        (None, a) => a,
    }
}

/// Maps each boundary instant to the nearest available sample timestamp.
///
/// No interpolation: readings arrive when a turnstile reports, not on a
/// fixed schedule. A turnstile with a single sample resolves every boundary
/// to that sample.
pub fn resolve_boundaries(sorted: &[i64], boundaries: &[i64; 5]) -> Option<[i64; 5]> {
    if sorted.is_empty() {
        return None;
    }

    let mut resolved = [0i64; 5];
    for (slot, boundary) in resolved.iter_mut().zip(boundaries) {
        *slot = nearest(sorted, *boundary)?;
    }
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1559534400;
    const H6: i64 = 21600;

    fn boundaries() -> [i64; 5] {
        [T0, T0 + H6, T0 + 2 * H6, T0 + 3 * H6, T0 + 4 * H6]
    }

    #[test]
    fn test_picks_nearest_sample_per_boundary() {
        let samples = [
            T0 - 100,
            T0 + 4000,
            T0 + H6 + 50,
            T0 + 2 * H6 - 10,
            T0 + 3 * H6 + 5,
            T0 + 4 * H6,
        ];

        let resolved = resolve_boundaries(&samples, &boundaries()).unwrap();

        assert_eq!(
            resolved,
            [
                T0 - 100,
                T0 + H6 + 50,
                T0 + 2 * H6 - 10,
                T0 + 3 * H6 + 5,
                T0 + 4 * H6
            ]
        );
    }

    #[test]
    fn test_single_sample_resolves_everywhere() {
        let samples = [T0 + 9000];
        let resolved = resolve_boundaries(&samples, &boundaries()).unwrap();
        assert_eq!(resolved, [T0 + 9000; 5]);
    }

    #[test]
    fn test_empty_samples_resolve_to_none() {
        assert_eq!(resolve_boundaries(&[], &boundaries()), None);
        assert_eq!(nearest(&[], T0), None);
    }

    #[test]
    fn test_tie_prefers_earlier_timestamp() {
        assert_eq!(nearest(&[90, 110], 100), Some(90));
        assert_eq!(nearest(&[90, 109], 100), Some(109));
        assert_eq!(nearest(&[91, 110], 100), Some(91));
    }

    #[test]
    fn test_exact_match_and_edges() {
        let samples = [100, 200, 300];
        assert_eq!(nearest(&samples, 200), Some(200));
        assert_eq!(nearest(&samples, 0), Some(100));
        assert_eq!(nearest(&samples, 1000), Some(300));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let samples = [T0 - 3600, T0 + 3600, T0 + H6, T0 + 3 * H6 - 3600, T0 + 3 * H6 + 3600];
        let first = resolve_boundaries(&samples, &boundaries());
        for _ in 0..10 {
            assert_eq!(resolve_boundaries(&samples, &boundaries()), first);
        }
    }
}
