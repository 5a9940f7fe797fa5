//! Target-dimension resolution.
//!
//! A single pure function decides the output size for every converter:
//! both dimensions requested are taken as-is (no ratio enforcement at this
//! stage), a single requested dimension preserves the source aspect ratio,
//! and no request keeps the intrinsic size.

/// Compute the target `(width, height)` from the source intrinsic size and
/// the optionally requested dimensions.
///
/// Aspect-ratio arithmetic runs in `f64` and rounds half-up, so a 100×50
/// source with `width = 75` yields a height of 38, not 37.
pub fn resolve(
    intrinsic: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    let (w0, h0) = intrinsic;
    match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => {
            let h = (h0 as f64 * w as f64 / w0 as f64).round() as u32;
            (w, h.max(1))
        }
        (None, Some(h)) => {
            let w = (w0 as f64 * h as f64 / h0 as f64).round() as u32;
            (w.max(1), h)
        }
        (None, None) => (w0, h0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_given_used_as_is() {
        // No ratio enforcement when the caller pins both dimensions.
        assert_eq!(resolve((100, 50), Some(30), Some(200)), (30, 200));
    }

    #[test]
    fn width_only_preserves_ratio() {
        assert_eq!(resolve((100, 50), Some(200), None), (200, 100));
        assert_eq!(resolve((100, 50), Some(75), None), (75, 38)); // 37.5 rounds up
    }

    #[test]
    fn height_only_preserves_ratio() {
        assert_eq!(resolve((100, 50), None, Some(25)), (50, 25));
        assert_eq!(resolve((300, 200), None, Some(100)), (150, 100));
    }

    #[test]
    fn neither_given_keeps_intrinsic() {
        assert_eq!(resolve((640, 480), None, None), (640, 480));
    }

    #[test]
    fn extreme_downscale_never_hits_zero() {
        assert_eq!(resolve((10_000, 1), Some(1), None), (1, 1));
        assert_eq!(resolve((1, 10_000), None, Some(1)), (1, 1));
    }
}
