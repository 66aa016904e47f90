//! Bone weight quantisation.

/// Influences kept per exported vertex
pub const MAX_INFLUENCES: usize = 4;

/// Sum of the weight bytes of every influenced vertex
pub const WEIGHT_TOTAL: i32 = 255;

/// Turn float influences into `(bone, weight byte)` pairs.
///
/// Keeps the [`MAX_INFLUENCES`] strongest influences, normalises them,
/// scales to bytes with a minimum of 1 and moves any rounding excess or
/// deficit onto the largest byte so the total is exactly 255. An empty
/// input stays empty.
pub fn quantize_weights(influences: &[(u8, f32)]) -> Vec<(u8, u8)> {
    quantize_weights_with_limit(influences, MAX_INFLUENCES)
}

pub fn quantize_weights_with_limit(influences: &[(u8, f32)], limit: usize) -> Vec<(u8, u8)> {
    if influences.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut kept = influences.to_vec();
    if kept.len() > limit {
        // ascending, strongest last
        kept.sort_by(|a, b| a.1.total_cmp(&b.1));
        kept.drain(..kept.len() - limit);
    }

    let total: f32 = kept.iter().map(|&(_, weight)| weight).sum();
    let mut bytes: Vec<i32> = kept
        .iter()
        .map(|&(_, weight)| {
            let normalized = if total > 0.0 { weight / total } else { weight };
            ((normalized * WEIGHT_TOTAL as f32).round() as i32).max(1)
        })
        .collect();

    let excess = bytes.iter().sum::<i32>() - WEIGHT_TOTAL;
    if excess != 0 {
        let largest = bytes
            .iter()
            .enumerate()
            .fold(0, |best, (index, &value)| if value > bytes[best] { index } else { best });
        bytes[largest] -= excess;
    }

    kept.iter()
        .zip(bytes)
        .map(|(&(bone, _), byte)| (bone, byte.clamp(0, 255) as u8))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;

    fn total(weights: &[(u8, u8)]) -> u32 {
        weights.iter().map(|&(_, w)| u32::from(w)).sum()
    }

    #[test]
    fn test_single_influence_is_full() {
        assert_eq!(quantize_weights(&[(7, 0.3)]), vec![(7, 255)]);
    }

    #[test]
    fn test_keeps_four_strongest() {
        let weights = quantize_weights(&[(1, 0.05), (2, 0.4), (3, 0.1), (4, 0.2), (5, 0.25)]);
        let bones: Vec<u8> = weights.iter().map(|&(bone, _)| bone).collect();
        assert_eq!(bones, vec![3, 4, 5, 2]);
        assert_eq!(total(&weights), 255);
    }

    #[test_case(&[(0, 0.5), (1, 0.5)], &[(0, 127), (1, 128)] ; "halves")]
    #[test_case(&[(0, 0.25), (1, 0.25), (2, 0.25), (3, 0.25)], &[(0, 63), (1, 64), (2, 64), (3, 64)] ; "quarters")]
    #[test_case(&[(0, 1.0), (1, 0.0)], &[(0, 254), (1, 1)] ; "zero weight becomes one")]
    #[test_case(&[(0, 0.0), (1, 0.0)], &[(0, 254), (1, 1)] ; "all zero")]
    fn test_quantize(input: &[(u8, f32)], expected: &[(u8, u8)]) {
        assert_eq!(quantize_weights(input), expected);
    }

    #[test]
    fn test_empty_stays_empty() {
        assert!(quantize_weights(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn prop_weights_sum_to_255(
            influences in prop::collection::vec((any::<u8>(), 0.0f32..10.0), 1..12)
        ) {
            let weights = quantize_weights(&influences);
            prop_assert_eq!(weights.len(), influences.len().min(MAX_INFLUENCES));
            prop_assert_eq!(total(&weights), 255);
            prop_assert!(weights.iter().all(|&(_, w)| w >= 1));
        }
    }
}
