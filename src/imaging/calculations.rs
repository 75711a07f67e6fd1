//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Bounds;

/// Scale factor that fits `source` inside `bounds` without upscaling.
///
/// `r = min(max_w / w, max_h / h, 1.0)`. Degenerate (zero) inputs give `1.0`.
pub fn scale_factor(source: (u32, u32), bounds: Bounds) -> f64 {
    let (w, h) = source;
    if w == 0 || h == 0 || bounds.max_width == 0 || bounds.max_height == 0 {
        return 1.0;
    }
    let rw = bounds.max_width as f64 / w as f64;
    let rh = bounds.max_height as f64 / h as f64;
    rw.min(rh).min(1.0)
}

/// Calculate output dimensions for an image bounded by `bounds`.
///
/// Both dimensions come from the single ratio returned by [`scale_factor`], so
/// the aspect ratio is kept. Each side is rounded, at least 1 and never larger
/// than its bound. Images already inside the bounds keep their size.
///
/// # Examples
/// ```
/// # use wardrobe_intake::imaging::{Bounds, calculate_bounded_dimensions};
/// // 4000x2000 landscape into an 800 box → 800x400
/// assert_eq!(calculate_bounded_dimensions((4000, 2000), Bounds::square(800)), (800, 400));
///
/// // Small images are never upscaled
/// assert_eq!(calculate_bounded_dimensions((640, 480), Bounds::square(800)), (640, 480));
/// ```
pub fn calculate_bounded_dimensions(source: (u32, u32), bounds: Bounds) -> (u32, u32) {
    let (w, h) = source;
    let r = scale_factor(source, bounds);
    if r >= 1.0 {
        return (w, h);
    }
    let out_w = ((w as f64 * r).round() as u32).clamp(1, bounds.max_width);
    let out_h = ((h as f64 * r).round() as u32).clamp(1, bounds.max_height);
    (out_w, out_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // calculate_bounded_dimensions tests
    // =========================================================================

    #[test]
    fn landscape_bounded_by_width() {
        assert_eq!(
            calculate_bounded_dimensions((4000, 2000), Bounds::square(800)),
            (800, 400)
        );
    }

    #[test]
    fn portrait_bounded_by_height() {
        // 3024x4032 phone portrait → 600x800
        assert_eq!(
            calculate_bounded_dimensions((3024, 4032), Bounds::square(800)),
            (600, 800)
        );
    }

    #[test]
    fn square_source() {
        assert_eq!(
            calculate_bounded_dimensions((1200, 1200), Bounds::square(800)),
            (800, 800)
        );
    }

    #[test]
    fn in_bound_keeps_size() {
        assert_eq!(
            calculate_bounded_dimensions((800, 600), Bounds::square(800)),
            (800, 600)
        );
        assert_eq!(
            calculate_bounded_dimensions((10, 10), Bounds::square(800)),
            (10, 10)
        );
    }

    #[test]
    fn non_square_bounds_use_tighter_ratio() {
        // 2000x1000 into 1000x300: height ratio 0.3 wins → 600x300
        assert_eq!(
            calculate_bounded_dimensions((2000, 1000), Bounds::new(1000, 300)),
            (600, 300)
        );
    }

    #[test]
    fn extreme_aspect_keeps_at_least_one_pixel() {
        // 10000x4 → ratio 0.08 → 800 x 0.32, rounded up to the 1px minimum
        assert_eq!(
            calculate_bounded_dimensions((10000, 4), Bounds::square(800)),
            (800, 1)
        );
    }

    #[test]
    fn rounding_never_exceeds_bound() {
        let (w, h) = calculate_bounded_dimensions((3001, 1999), Bounds::square(800));
        assert!(w <= 800 && h <= 800);
        assert_eq!(w, 800);
    }

    // =========================================================================
    // scale_factor tests
    // =========================================================================

    #[test]
    fn scale_factor_square_bound_is_bound_over_longer_edge() {
        let r = scale_factor((4032, 3024), Bounds::square(800));
        assert!((r - 800.0 / 4032.0).abs() < 1e-12);
    }

    #[test]
    fn scale_factor_never_above_one() {
        assert_eq!(scale_factor((100, 50), Bounds::square(800)), 1.0);
    }

    #[test]
    fn scale_factor_degenerate_input() {
        assert_eq!(scale_factor((0, 100), Bounds::square(800)), 1.0);
    }
}
