//! Page layout for one image per page
//!
//! Every image is scaled to fit the content box of the page (the page minus
//! its margin on all four sides) while keeping its aspect ratio, then
//! centered on the page. Width-first fit is tried first; when that would
//! overflow vertically the image is fitted to the height instead.
//!
//! All values are in the page unit (millimeters for the built-in sizes).
//! Nothing is rounded here: rounding before centering would push odd-sized
//! images off center.

use crate::types::{Orientation, PaperSize};

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 72.0 / 25.4;

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

/// Intrinsic pixel size of a source image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageDimensions {
    pub width: f32,
    pub height: f32,
}

impl ImageDimensions {
    /// Checked constructor. Returns `None` unless both sides are strictly
    /// positive and finite.
    pub fn new(width: f32, height: f32) -> Option<Self> {
        let valid = |v: f32| v.is_finite() && v > 0.0;
        (valid(width) && valid(height)).then_some(Self { width, height })
    }

    pub fn from_pixels(width: u32, height: u32) -> Option<Self> {
        Self::new(width as f32, height as f32)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }
}

/// Fixed page geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSpec {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
}

impl PageSpec {
    /// A4 portrait with 10mm margins
    pub const A4: PageSpec = PageSpec {
        page_width: 210.0,
        page_height: 297.0,
        margin: 10.0,
    };

    pub fn new(paper: PaperSize, orientation: Orientation, margin_mm: f32) -> Self {
        let (page_width, page_height) = paper.dimensions_with_orientation(orientation);
        Self {
            page_width,
            page_height,
            margin: margin_mm,
        }
    }

    /// Width and height left after subtracting the margin on every side
    pub fn content_box(&self) -> (f32, f32) {
        (
            self.page_width - 2.0 * self.margin,
            self.page_height - 2.0 * self.margin,
        )
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self::A4
    }
}

/// Where an image is drawn, measured from the top-left page corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub width: f32,
    pub height: f32,
    pub x: f32,
    pub y: f32,
}

impl Placement {
    /// Convert to PDF user space: points, origin at the bottom-left corner.
    ///
    /// Returns `(x, y, width, height)`.
    pub fn to_pdf_rect(&self, page: &PageSpec) -> (f32, f32, f32, f32) {
        let bottom = page.page_height - self.y - self.height;
        (
            mm_to_pt(self.x),
            mm_to_pt(bottom),
            mm_to_pt(self.width),
            mm_to_pt(self.height),
        )
    }
}

/// Layout decision for one image in a sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlan {
    pub placement: Placement,
    /// Whether a new page must be appended before drawing.
    /// Only the first image goes on the document's initial page.
    pub start_new_page: bool,
}

/// Compute the scaled, centered placement of one image on a page.
///
/// `image` must have strictly positive, finite dimensions; build it with
/// [`ImageDimensions::new`] to guarantee that.
pub fn compute_placement(image: ImageDimensions, page: &PageSpec, is_first: bool) -> PagePlan {
    debug_assert!(
        image.width.is_finite() && image.width > 0.0,
        "image width must be positive"
    );
    debug_assert!(
        image.height.is_finite() && image.height > 0.0,
        "image height must be positive"
    );

    let (avail_w, avail_h) = page.content_box();

    // Width-first fit
    let mut width = avail_w;
    let mut height = image.height * width / image.width;

    // Height-first fit when the width-first result overflows vertically
    if height > avail_h {
        height = avail_h;
        width = image.width * height / image.height;
    }

    let x = (page.page_width - width) / 2.0;
    let y = (page.page_height - height) / 2.0;

    PagePlan {
        placement: Placement {
            width,
            height,
            x,
            y,
        },
        start_new_page: !is_first,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: f32, height: f32) -> ImageDimensions {
        ImageDimensions::new(width, height).unwrap()
    }

    fn plan_pages(images: &[ImageDimensions], page: &PageSpec) -> Vec<PagePlan> {
        images
            .iter()
            .enumerate()
            .map(|(i, &image)| compute_placement(image, page, i == 0))
            .collect()
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 0.01,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_landscape_image_fits_width() {
        let plan = compute_placement(dims(800.0, 600.0), &PageSpec::A4, true);
        assert_eq!(plan.placement.width, 190.0);
        assert_eq!(plan.placement.height, 142.5);
        assert_eq!(plan.placement.x, 10.0);
        assert_eq!(plan.placement.y, 77.25);
        assert!(!plan.start_new_page);
    }

    #[test]
    fn test_tall_image_falls_back_to_height() {
        let plan = compute_placement(dims(600.0, 2000.0), &PageSpec::A4, true);
        assert_eq!(plan.placement.height, 277.0);
        assert_close(plan.placement.width, 83.1);
        assert_close(plan.placement.x, 63.45);
        assert_eq!(plan.placement.y, 10.0);
    }

    #[test]
    fn test_square_image() {
        let plan = compute_placement(dims(500.0, 500.0), &PageSpec::A4, false);
        assert_eq!(plan.placement.width, 190.0);
        assert_eq!(plan.placement.height, 190.0);
        assert_eq!(plan.placement.x, 10.0);
        assert_eq!(plan.placement.y, 53.5);
        assert!(plan.start_new_page);
    }

    #[test]
    fn test_exact_content_box_ratio_fills_both_axes() {
        // 190:277 matches the A4 content box exactly
        let plan = compute_placement(dims(190.0, 277.0), &PageSpec::A4, true);
        assert_close(plan.placement.width, 190.0);
        assert_close(plan.placement.height, 277.0);
        assert_close(plan.placement.x, 10.0);
        assert_close(plan.placement.y, 10.0);
    }

    #[test]
    fn test_tiny_image_is_scaled_up() {
        let plan = compute_placement(dims(2.0, 1.0), &PageSpec::A4, true);
        assert_eq!(plan.placement.width, 190.0);
        assert_eq!(plan.placement.height, 95.0);
    }

    #[test]
    fn test_landscape_page() {
        let page = PageSpec::new(PaperSize::A4, Orientation::Landscape, 10.0);
        assert_eq!(page.content_box(), (277.0, 190.0));

        // Square image on a landscape page is height-limited
        let plan = compute_placement(dims(100.0, 100.0), &page, true);
        assert_eq!(plan.placement.width, 190.0);
        assert_eq!(plan.placement.height, 190.0);
        assert_eq!(plan.placement.x, 53.5);
        assert_eq!(plan.placement.y, 10.0);
    }

    #[test]
    fn test_plan_pages_breaks_after_first() {
        let images = [dims(800.0, 600.0), dims(600.0, 2000.0), dims(500.0, 500.0)];
        let plans = plan_pages(&images, &PageSpec::A4);
        let breaks: Vec<bool> = plans.iter().map(|p| p.start_new_page).collect();
        assert_eq!(breaks, vec![false, true, true]);
    }

    #[test]
    fn test_dimensions_reject_invalid() {
        assert!(ImageDimensions::new(0.0, 10.0).is_none());
        assert!(ImageDimensions::new(10.0, -1.0).is_none());
        assert!(ImageDimensions::new(f32::NAN, 10.0).is_none());
        assert!(ImageDimensions::new(10.0, f32::INFINITY).is_none());
        assert!(ImageDimensions::from_pixels(0, 0).is_none());
        assert!(ImageDimensions::from_pixels(1, 1).is_some());
    }

    #[test]
    fn test_pdf_rect_flips_y_axis() {
        let placement = Placement {
            width: 100.0,
            height: 50.0,
            x: 10.0,
            y: 20.0,
        };
        let (x, y, w, h) = placement.to_pdf_rect(&PageSpec::A4);
        assert_close(x, mm_to_pt(10.0));
        // 297 - 20 - 50 = 227mm from the bottom edge
        assert_close(y, mm_to_pt(227.0));
        assert_close(w, mm_to_pt(100.0));
        assert_close(h, mm_to_pt(50.0));
    }
}
