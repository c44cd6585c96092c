//! Fixed print geometry for resume captures.
//!
//! CDP's `Page.printToPDF` takes paper and margin sizes in inches; the
//! margins here are expressed in CSS pixels (96 per inch) and converted.

use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;

const CSS_PX_PER_INCH: f64 = 96.0;
const MM_PER_INCH: f64 = 25.4;

/// A4, portrait.
pub const A4_WIDTH_MM: f64 = 210.0;
pub const A4_HEIGHT_MM: f64 = 297.0;

pub const MARGIN_VERTICAL_PX: f64 = 30.0;
pub const MARGIN_HORIZONTAL_PX: f64 = 25.0;

/// Logical viewport applied before capture so layout reflow is independent
/// of the launching environment.
pub const CAPTURE_VIEWPORT: Viewport = Viewport {
    width: 1280,
    height: 800,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Paper size and margins for one capture, all in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub paper_width_in: f64,
    pub paper_height_in: f64,
    pub margins_in: Margins,
    pub print_background: bool,
}

impl PageLayout {
    /// A4 with 30px top/bottom and 25px left/right margins, backgrounds off.
    pub fn a4() -> Self {
        Self {
            paper_width_in: mm_to_inches(A4_WIDTH_MM),
            paper_height_in: mm_to_inches(A4_HEIGHT_MM),
            margins_in: Margins {
                top: px_to_inches(MARGIN_VERTICAL_PX),
                right: px_to_inches(MARGIN_HORIZONTAL_PX),
                bottom: px_to_inches(MARGIN_VERTICAL_PX),
                left: px_to_inches(MARGIN_HORIZONTAL_PX),
            },
            print_background: false,
        }
    }

    pub fn to_print_params(&self) -> PrintToPdfParams {
        PrintToPdfParams {
            landscape: Some(false),
            display_header_footer: Some(false),
            print_background: Some(self.print_background),
            paper_width: Some(self.paper_width_in),
            paper_height: Some(self.paper_height_in),
            margin_top: Some(self.margins_in.top),
            margin_bottom: Some(self.margins_in.bottom),
            margin_left: Some(self.margins_in.left),
            margin_right: Some(self.margins_in.right),
            prefer_css_page_size: Some(false),
            ..Default::default()
        }
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::a4()
    }
}

fn px_to_inches(px: f64) -> f64 {
    px / CSS_PX_PER_INCH
}

fn mm_to_inches(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_a4_paper_size() {
        let layout = PageLayout::a4();
        assert!(approx(layout.paper_width_in, 8.268));
        assert!(approx(layout.paper_height_in, 11.693));
    }

    #[test]
    fn test_margins_converted_from_css_pixels() {
        let margins = PageLayout::a4().margins_in;
        assert!(approx(margins.top, 0.3125));
        assert!(approx(margins.bottom, 0.3125));
        assert!(approx(margins.left, 0.2604));
        assert!(approx(margins.right, 0.2604));
    }

    #[test]
    fn test_print_params_suppress_background() {
        let params = PageLayout::a4().to_print_params();
        assert_eq!(params.print_background, Some(false));
        assert_eq!(params.landscape, Some(false));
        assert_eq!(params.margin_top, Some(0.3125));
        assert!(params.paper_width.is_some());
    }

    #[test]
    fn test_capture_viewport() {
        assert_eq!(CAPTURE_VIEWPORT.width, 1280);
        assert_eq!(CAPTURE_VIEWPORT.height, 800);
    }
}
