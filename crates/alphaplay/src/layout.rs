use crate::config::PackLayout;

/// Aspect ratio used until stream metadata is known.
pub const DEFAULT_ASPECT_RATIO: f32 = 4.0 / 3.0;

/// Display geometry of the video after unpacking the alpha half.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoGeometry {
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f32,
}

impl Default for VideoGeometry {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            aspect_ratio: DEFAULT_ASPECT_RATIO,
        }
    }
}

impl VideoGeometry {
    /// Geometry for a stream of natural size `width` x `height`. When `packed`
    /// is set, the axis carrying the alpha half is halved first.
    pub fn from_natural(width: u32, height: u32, packed: Option<PackLayout>) -> Self {
        let (w, h) = match packed {
            Some(PackLayout::TopBottom) => (width, height / 2),
            Some(PackLayout::SideBySide) => (width / 2, height),
            None => (width, height),
        };
        if w == 0 || h == 0 {
            return Self {
                width: w,
                height: h,
                aspect_ratio: DEFAULT_ASPECT_RATIO,
            };
        }
        Self {
            width: w,
            height: h,
            aspect_ratio: w as f32 / h as f32,
        }
    }

    /// Fit the video into an `avail_w` x `avail_h` box, shrinking whichever
    /// side would otherwise distort the aspect ratio.
    pub fn measure(&self, avail_w: u32, avail_h: u32) -> (u32, u32) {
        if avail_w == 0 || avail_h == 0 {
            return (avail_w, avail_h);
        }
        let box_ratio = avail_w as f64 / avail_h as f64;
        let ratio = f64::from(self.aspect_ratio);
        if box_ratio > ratio {
            (((avail_h as f64) * ratio).round() as u32, avail_h)
        } else {
            (avail_w, ((avail_w as f64) / ratio).round() as u32)
        }
    }

    /// Letterbox scale and offset (in UV units) placing the fitted video
    /// centered inside an `avail_w` x `avail_h` target.
    pub fn letterbox(&self, avail_w: u32, avail_h: u32) -> ([f32; 2], [f32; 2]) {
        if avail_w == 0 || avail_h == 0 {
            return ([1.0, 1.0], [0.0, 0.0]);
        }
        let (w, h) = self.measure(avail_w, avail_h);
        let scale_x = w as f32 / avail_w as f32;
        let scale_y = h as f32 / avail_h as f32;
        (
            [scale_x, scale_y],
            [(1.0 - scale_x) * 0.5, (1.0 - scale_y) * 0.5],
        )
    }
}
