use crate::error::{ClipsmithError, Result};

/// Fixed vertical canvas width.
pub const TARGET_WIDTH: u32 = 1080;
/// Fixed vertical canvas height.
pub const TARGET_HEIGHT: u32 = 1920;
/// Gaussian blur applied to the background fill.
pub const DEFAULT_BLUR_SIGMA: f64 = 20.0;

/// Exact (fractional) dimensions of a scaled frame. Rounding to encoder
/// friendly integers happens at the ffmpeg boundary, not here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledSize {
    pub width: f64,
    pub height: f64,
}

/// Layout of one composited frame: a blurred cover-scaled background
/// cropped to the canvas, with the width-fit source centered on top.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameGeometry {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Full source scaled so its width equals the canvas width.
    pub foreground: ScaledSize,
    /// Full source scaled to cover the canvas, before cropping.
    pub background: ScaledSize,
    /// Horizontal center-crop applied to the scaled background.
    pub background_crop: ScaledSize,
    pub blur_sigma: f64,
}

/// Plan geometry for the fixed 1080x1920 canvas.
pub fn plan(source_width: u32, source_height: u32) -> Result<FrameGeometry> {
    plan_for_canvas(source_width, source_height, TARGET_WIDTH, TARGET_HEIGHT)
}

/// Plan geometry for an arbitrary canvas.
///
/// The background uses cover scaling: height-fit for landscape sources
/// (the common case), width-fit when the source is narrower than the
/// canvas ratio, so the crop never exceeds the scaled frame.
pub fn plan_for_canvas(
    source_width: u32,
    source_height: u32,
    canvas_width: u32,
    canvas_height: u32,
) -> Result<FrameGeometry> {
    if source_width == 0 || source_height == 0 {
        return Err(ClipsmithError::InvalidGeometry(format!(
            "source dimensions must be positive, got {source_width}x{source_height}"
        )));
    }
    if canvas_width == 0 || canvas_height == 0 {
        return Err(ClipsmithError::InvalidGeometry(format!(
            "canvas dimensions must be positive, got {canvas_width}x{canvas_height}"
        )));
    }

    let sw = source_width as f64;
    let sh = source_height as f64;
    let cw = canvas_width as f64;
    let ch = canvas_height as f64;

    let foreground = ScaledSize {
        width: cw,
        height: sh * cw / sw,
    };

    let cover = (cw / sw).max(ch / sh);
    let background = ScaledSize {
        width: sw * cover,
        height: sh * cover,
    };
    let background_crop = ScaledSize {
        width: cw,
        height: ch,
    };

    Ok(FrameGeometry {
        canvas_width,
        canvas_height,
        foreground,
        background,
        background_crop,
        blur_sigma: DEFAULT_BLUR_SIGMA,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_full_hd_landscape() {
        let geometry = plan(1920, 1080).unwrap();
        assert_eq!(geometry.canvas_width, 1080);
        assert_eq!(geometry.canvas_height, 1920);
        assert_eq!(geometry.foreground.width, 1080.0);
        assert_eq!(geometry.foreground.height, 607.5);
        // Background height-fits then crops to canvas width.
        assert_eq!(geometry.background.height, 1920.0);
        assert!((geometry.background.width - 3413.333).abs() < 0.001);
        assert_eq!(geometry.background_crop.width, 1080.0);
        assert_eq!(geometry.background_crop.height, 1920.0);
        assert_eq!(geometry.blur_sigma, DEFAULT_BLUR_SIGMA);
    }

    #[test]
    fn test_plan_4k_source_matches_hd_shape() {
        let hd = plan(1920, 1080).unwrap();
        let uhd = plan(3840, 2160).unwrap();
        assert_eq!(hd.foreground, uhd.foreground);
        assert_eq!(hd.background, uhd.background);
    }

    #[test]
    fn test_plan_square_source() {
        let geometry = plan(1000, 1000).unwrap();
        assert_eq!(geometry.foreground.width, 1080.0);
        assert_eq!(geometry.foreground.height, 1080.0);
        // Square needs height-fit cover.
        assert_eq!(geometry.background.height, 1920.0);
        assert_eq!(geometry.background.width, 1920.0);
    }

    #[test]
    fn test_plan_narrow_source_covers_by_width() {
        // Narrower than 9:16, so height-fit would leave the crop hanging
        // off the scaled frame; cover scaling switches to width-fit.
        let geometry = plan(500, 1920).unwrap();
        assert!(geometry.background.width >= 1080.0);
        assert!(geometry.background.height >= 1920.0);
        assert_eq!(geometry.background.width, 1080.0);
    }

    #[test]
    fn test_plan_rejects_zero_dimensions() {
        assert!(matches!(
            plan(0, 1080),
            Err(ClipsmithError::InvalidGeometry(_))
        ));
        assert!(matches!(
            plan(1920, 0),
            Err(ClipsmithError::InvalidGeometry(_))
        ));
        assert!(matches!(
            plan_for_canvas(1920, 1080, 0, 1920),
            Err(ClipsmithError::InvalidGeometry(_))
        ));
    }
}
