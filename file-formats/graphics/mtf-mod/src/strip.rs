//! Triangle strip conversion.
//!
//! Mesh index ranges are strips: every window of three indices is a
//! triangle, with the winding flipped on odd positions. Degenerate windows
//! (repeated indices) join separate strips and produce no triangle.

/// Expand a strip into triangles, rebased so the smallest index is 0.
///
/// A strip without any non-degenerate window is returned rebased as is.
pub fn strip_to_triangles(strip: &[u16]) -> Vec<[u16; 3]> {
    let Some(&base) = strip.iter().min() else {
        return Vec::new();
    };

    let triangles: Vec<[u16; 3]> = strip
        .windows(3)
        .enumerate()
        .filter(|(_, window)| window[0] != window[1] && window[0] != window[2] && window[1] != window[2])
        .map(|(position, window)| {
            let [a, b, c] = [window[0] - base, window[1] - base, window[2] - base];
            if position % 2 == 0 { [a, b, c] } else { [c, b, a] }
        })
        .collect();

    if triangles.is_empty() {
        return strip
            .chunks_exact(3)
            .map(|chunk| [chunk[0] - base, chunk[1] - base, chunk[2] - base])
            .collect();
    }
    triangles
}

/// Join triangles into one strip using degenerate bridges.
///
/// Every triangle keeps its winding when expanded with
/// [`strip_to_triangles`].
pub fn triangles_to_strip(triangles: &[[u16; 3]]) -> Vec<u16> {
    let mut strip: Vec<u16> = Vec::with_capacity(triangles.len() * 6);
    for &[a, b, c] in triangles {
        if let Some(&last) = strip.last() {
            strip.extend([last, a, a]);
            if strip.len() % 2 == 0 {
                strip.push(a);
            }
        } else {
            strip.push(a);
        }
        strip.extend([b, c]);
    }
    strip
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_strip_alternates_winding() {
        let triangles = strip_to_triangles(&[10, 11, 12, 13]);
        assert_eq!(triangles, vec![[0, 1, 2], [3, 2, 1]]);
    }

    #[test]
    fn test_degenerate_windows_are_skipped() {
        let triangles = strip_to_triangles(&[0, 1, 2, 2, 3, 3, 4, 5]);
        assert_eq!(triangles, vec![[0, 1, 2], [5, 4, 3]]);
    }

    #[test]
    fn test_empty_strip() {
        assert!(strip_to_triangles(&[]).is_empty());
        assert!(triangles_to_strip(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn prop_triangles_survive_a_strip(
            triangles in prop::collection::vec(
                prop::array::uniform3(0u16..50).prop_filter("non degenerate", |[a, b, c]| a != b && a != c && b != c),
                1..20,
            )
        ) {
            let strip = triangles_to_strip(&triangles);
            let base = *strip.iter().min().unwrap();
            let rebased: Vec<[u16; 3]> = triangles
                .iter()
                .map(|t| [t[0] - base, t[1] - base, t[2] - base])
                .collect();
            prop_assert_eq!(strip_to_triangles(&strip), rebased);
        }
    }
}
