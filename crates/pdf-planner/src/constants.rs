//! Shared constants for page planning and output

// =============================================================================
// Output
// =============================================================================

/// Extension of every produced document
pub const OUTPUT_EXTENSION: &str = "pdf";

/// Output stem used when nothing else is configured
pub const DEFAULT_OUTPUT_NAME: &str = "output";

// =============================================================================
// Default Page Dimensions
// =============================================================================

/// Default page width in points (US Letter: 8.5" × 11")
pub const DEFAULT_PAGE_WIDTH_PT: f32 = 612.0;

/// Default page height in points (US Letter)
pub const DEFAULT_PAGE_HEIGHT_PT: f32 = 792.0;

// =============================================================================
// Watermark
// =============================================================================

pub const DEFAULT_WATERMARK_TEXT: &str = "CONFIDENTIAL";

pub const DEFAULT_WATERMARK_FONT_SIZE: f32 = 50.0;

/// Light grey
pub const DEFAULT_WATERMARK_COLOR: (f32, f32, f32) = (0.9, 0.9, 0.9);

pub const DEFAULT_WATERMARK_OPACITY: f32 = 0.5;

/// Counter-clockwise angle of the stamped text
pub const DEFAULT_WATERMARK_ANGLE: f32 = 45.0;

/// Approximate Helvetica glyph width as a fraction of the font size
pub const HELVETICA_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Resource names used for the watermark font and graphics state
pub const WATERMARK_FONT_NAME: &str = "FWm1";
pub const WATERMARK_GSTATE_NAME: &str = "GSWm1";

// =============================================================================
// Images and signatures
// =============================================================================

/// Resource name of the image drawn on each page of an images-to-PDF output
pub const PAGE_IMAGE_NAME: &str = "Im1";

/// Resource name of a stamped signature image
pub const SIGNATURE_IMAGE_NAME: &str = "ImSig1";

/// Default signature placement in points from the lower-left corner
pub const DEFAULT_SIGNATURE_X: f32 = 50.0;
pub const DEFAULT_SIGNATURE_Y: f32 = 50.0;

/// Default drawn size of a signature in points
pub const DEFAULT_SIGNATURE_WIDTH: f32 = 150.0;
pub const DEFAULT_SIGNATURE_HEIGHT: f32 = 75.0;
