//! Image container and fragment transforms
//!
//! Wraps one decoded capture and derives OCR-ready fragment images from it.
//! Every transform is value-semantic: the source pixels are never mutated,
//! so one capture can be cropped into any number of independent fragments.

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageFormat, RgbaImage};
use imageproc::contrast::{threshold, ThresholdType};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use crate::capture::CapturedFrame;
use crate::vision::fragment::BoundingBox;

/// Source captures taller than this are downscaled before OCR.
/// OCR latency scales with pixel count; below this height the glyphs are
/// small enough that shrinking them would hurt recognition instead.
pub const DOWNSCALE_HEIGHT_THRESHOLD: u32 = 2160;

/// Target width for downscaled fragments
pub const DOWNSCALE_TARGET_WIDTH: u32 = 600;

/// Binarization level applied by the standard fragment pipeline
const BINARIZE_LEVEL: u8 = 128;

/// One decoded capture plus the transforms that derive fragments from it
pub struct ImageContainer {
    image: RgbaImage,
    downscale: bool,
}

impl ImageContainer {
    /// Wrap a captured frame. `downscale` enables the high-resolution
    /// downscale path for grid and daemon fragments.
    pub fn from_frame(frame: &CapturedFrame, downscale: bool) -> anyhow::Result<Self> {
        let image = RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "frame buffer length {} does not match {}x{} RGBA",
                    frame.data.len(),
                    frame.width,
                    frame.height
                )
            })?;
        Ok(Self { image, downscale })
    }

    /// Decode an encoded image (PNG etc.) into a container
    pub fn from_bytes(bytes: &[u8], downscale: bool) -> anyhow::Result<Self> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        Ok(Self { image, downscale })
    }

    /// Source dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Standard fragment pipeline: crop to `bbox`, strip alpha, invert
    /// polarity (the engine expects dark glyphs on light ground), binarize.
    pub fn process(&self, bbox: BoundingBox) -> ProcessedFragment {
        let (img_w, img_h) = self.image.dimensions();
        let x = bbox.x.min(img_w);
        let y = bbox.y.min(img_h);
        let w = bbox.width.min(img_w - x).max(1);
        let h = bbox.height.min(img_h - y).max(1);

        let cropped = imageops::crop_imm(&self.image, x, y, w, h).to_image();
        let mut gray = imageops::grayscale(&cropped);
        imageops::invert(&mut gray);
        let binary = threshold(&gray, BINARIZE_LEVEL, ThresholdType::Binary);
        ProcessedFragment { image: binary }
    }

    /// Grid fragment: standard pipeline plus the high-resolution downscale
    pub fn process_grid_fragment(&self, bbox: BoundingBox) -> ProcessedFragment {
        self.process_downscaled(bbox)
    }

    /// Daemon list fragment: standard pipeline plus the high-resolution downscale
    pub fn process_daemons_fragment(&self, bbox: BoundingBox) -> ProcessedFragment {
        self.process_downscaled(bbox)
    }

    /// Buffer size fragment: standard pipeline plus a horizontal flip.
    /// This fragment's characters are mirrored in the source UI.
    pub fn process_buffer_size_fragment(&self, bbox: BoundingBox) -> ProcessedFragment {
        let processed = self.process(bbox);
        ProcessedFragment {
            image: imageops::flip_horizontal(&processed.image),
        }
    }

    fn process_downscaled(&self, bbox: BoundingBox) -> ProcessedFragment {
        let processed = self.process(bbox);
        if !self.downscale || bbox.inner_height <= DOWNSCALE_HEIGHT_THRESHOLD {
            return processed;
        }
        processed.downscale_to_width(DOWNSCALE_TARGET_WIDTH)
    }
}

/// An OCR-ready fragment image derived from a container.
///
/// Further transforms (`trim`, `threshold_at`, downscale) return new values;
/// materialization (`to_png_buffer`, `to_raw_buffer`, `save`) leaves the
/// value reusable.
#[derive(Debug, Clone)]
pub struct ProcessedFragment {
    image: GrayImage,
}

impl ProcessedFragment {
    /// Dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Resize to the given width, preserving aspect ratio. Never enlarges:
    /// images already at or below the target width are returned unchanged.
    pub fn downscale_to_width(&self, target_width: u32) -> ProcessedFragment {
        let (w, h) = self.image.dimensions();
        if w <= target_width {
            return self.clone();
        }
        let target_height = ((target_width as u64 * h as u64) / w as u64).max(1) as u32;
        debug!(
            "Downscaling fragment {}x{} -> {}x{}",
            w, h, target_width, target_height
        );
        ProcessedFragment {
            image: imageops::resize(&self.image, target_width, target_height, FilterType::Lanczos3),
        }
    }

    /// Flip horizontally (flipping twice restores the original layout)
    pub fn flip_horizontal(&self) -> ProcessedFragment {
        ProcessedFragment {
            image: imageops::flip_horizontal(&self.image),
        }
    }

    /// Strip uniform border padding. The border color is sampled at the
    /// top-left pixel; if the whole image is uniform, it is returned as-is.
    pub fn trim(&self) -> ProcessedFragment {
        let (w, h) = self.image.dimensions();
        let border = self.image.get_pixel(0, 0)[0];

        let mut min_x = w;
        let mut min_y = h;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        for (x, y, pixel) in self.image.enumerate_pixels() {
            if pixel[0] != border {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }

        if min_x > max_x {
            return self.clone();
        }

        ProcessedFragment {
            image: imageops::crop_imm(&self.image, min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
                .to_image(),
        }
    }

    /// Re-binarize at an explicit level (experimental buffer-size mode)
    pub fn threshold_at(&self, level: u8) -> ProcessedFragment {
        ProcessedFragment {
            image: threshold(&self.image, level, ThresholdType::Binary),
        }
    }

    /// Encode as PNG bytes for a recognizer
    pub fn to_png_buffer(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut buffer = Cursor::new(Vec::new());
        self.image.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }

    /// Raw uncompressed luma bytes, row-major
    pub fn to_raw_buffer(&self) -> Vec<u8> {
        self.image.as_raw().clone()
    }

    /// Write the fragment to disk (format inferred from the extension)
    pub fn save(&self, path: &Path) -> Result<(), image::ImageError> {
        self.image.save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::fragment::{FragmentKind, FragmentLayout};

    fn frame_with_gradient(width: u32, height: u32) -> CapturedFrame {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = ((x + y) % 256) as u8;
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        CapturedFrame::new(data, width, height)
    }

    fn bbox(x: u32, y: u32, width: u32, height: u32, inner_height: u32) -> BoundingBox {
        BoundingBox { x, y, width, height, inner_height }
    }

    #[test]
    fn test_process_is_deterministic() {
        let frame = frame_with_gradient(320, 240);
        let container = ImageContainer::from_frame(&frame, true).unwrap();
        let region = bbox(10, 20, 100, 80, 240);

        let first = container.process(region);
        let second = container.process(region);
        assert_eq!(first.to_raw_buffer(), second.to_raw_buffer());
    }

    #[test]
    fn test_process_does_not_touch_source() {
        let frame = frame_with_gradient(64, 64);
        let container = ImageContainer::from_frame(&frame, true).unwrap();
        let region = bbox(0, 0, 64, 64, 64);

        let _ = container.process_buffer_size_fragment(region);
        let after = container.process(region);
        let fresh = ImageContainer::from_frame(&frame, true).unwrap().process(region);
        assert_eq!(after.to_raw_buffer(), fresh.to_raw_buffer());
    }

    #[test]
    fn test_downscale_above_threshold() {
        let frame = frame_with_gradient(1500, 8);
        let container = ImageContainer::from_frame(&frame, true).unwrap();
        // inner_height comes from the layout, not the crop itself
        let region = bbox(0, 0, 1500, 8, DOWNSCALE_HEIGHT_THRESHOLD + 1);

        let processed = container.process_grid_fragment(region);
        assert_eq!(processed.dimensions().0, DOWNSCALE_TARGET_WIDTH);
    }

    #[test]
    fn test_no_downscale_at_or_below_threshold() {
        let frame = frame_with_gradient(1500, 8);
        let container = ImageContainer::from_frame(&frame, true).unwrap();
        let region = bbox(0, 0, 1500, 8, DOWNSCALE_HEIGHT_THRESHOLD);

        let processed = container.process_grid_fragment(region);
        assert_eq!(processed.dimensions(), (1500, 8));
    }

    #[test]
    fn test_no_downscale_when_disabled() {
        let frame = frame_with_gradient(1500, 8);
        let container = ImageContainer::from_frame(&frame, false).unwrap();
        let region = bbox(0, 0, 1500, 8, DOWNSCALE_HEIGHT_THRESHOLD + 1);

        let processed = container.process_daemons_fragment(region);
        assert_eq!(processed.dimensions(), (1500, 8));
    }

    #[test]
    fn test_downscale_never_enlarges() {
        let frame = frame_with_gradient(200, 50);
        let container = ImageContainer::from_frame(&frame, true).unwrap();
        let region = bbox(0, 0, 200, 50, DOWNSCALE_HEIGHT_THRESHOLD + 1);

        let processed = container.process_grid_fragment(region);
        assert_eq!(processed.dimensions(), (200, 50));
    }

    #[test]
    fn test_grid_fragment_from_4k_capture_downscales_to_target() {
        // Dark 8x8 block grid painted into the grid region of a 4096x4096
        // capture, light everywhere else.
        let layout = FragmentLayout::for_resolution(4096, 4096);
        let grid_box = layout.bounding_box(FragmentKind::Grid);
        let frame = frame_with_glyph_grid(4096, 4096, grid_box, 8, 8);

        let container = ImageContainer::from_frame(&frame, true).unwrap();
        let processed = container.process_grid_fragment(grid_box);

        let (width, height) = processed.dimensions();
        assert_eq!(width, DOWNSCALE_TARGET_WIDTH);
        // Aspect ratio preserved: height shrinks by the same factor
        let expected_height = (DOWNSCALE_TARGET_WIDTH as u64 * grid_box.height as u64
            / grid_box.width as u64) as u32;
        assert_eq!(height, expected_height);
        assert!(height <= grid_box.height);

        // The glyph blocks survive the downscale: the output is not uniform
        let raw = processed.to_raw_buffer();
        assert!(raw.iter().any(|&v| v == 0) && raw.iter().any(|&v| v == 255));
    }

    /// Paint `cols` x `rows` dark square blocks, evenly spaced, inside
    /// `region` of an otherwise light frame.
    fn frame_with_glyph_grid(
        frame_width: u32,
        frame_height: u32,
        region: BoundingBox,
        cols: u32,
        rows: u32,
    ) -> CapturedFrame {
        let mut img = image::RgbaImage::from_pixel(
            frame_width,
            frame_height,
            image::Rgba([230, 230, 230, 255]),
        );
        let cell_w = region.width / cols;
        let cell_h = region.height / rows;
        let glyph_w = (cell_w / 2).max(1);
        let glyph_h = (cell_h / 2).max(1);
        for row in 0..rows {
            for col in 0..cols {
                let x0 = region.x + col * cell_w + cell_w / 4;
                let y0 = region.y + row * cell_h + cell_h / 4;
                for y in y0..(y0 + glyph_h) {
                    for x in x0..(x0 + glyph_w) {
                        img.put_pixel(x, y, image::Rgba([20, 20, 20, 255]));
                    }
                }
            }
        }
        CapturedFrame::new(img.into_raw(), frame_width, frame_height)
    }

    #[test]
    fn test_flip_round_trip() {
        let frame = frame_with_gradient(31, 17);
        let container = ImageContainer::from_frame(&frame, true).unwrap();
        let region = bbox(0, 0, 31, 17, 17);

        let plain = container.process(region);
        let flipped = container.process_buffer_size_fragment(region);
        assert_ne!(plain.to_raw_buffer(), flipped.to_raw_buffer());
        assert_eq!(plain.to_raw_buffer(), flipped.flip_horizontal().to_raw_buffer());
    }

    #[test]
    fn test_trim_strips_uniform_border() {
        let mut img = GrayImage::from_pixel(20, 20, image::Luma([255u8]));
        for x in 5..10 {
            for y in 7..12 {
                img.put_pixel(x, y, image::Luma([0u8]));
            }
        }
        let fragment = ProcessedFragment { image: img };
        let trimmed = fragment.trim();
        assert_eq!(trimmed.dimensions(), (5, 5));
    }

    #[test]
    fn test_trim_uniform_image_unchanged() {
        let fragment = ProcessedFragment {
            image: GrayImage::from_pixel(8, 8, image::Luma([255u8])),
        };
        let trimmed = fragment.trim();
        assert_eq!(trimmed.dimensions(), (8, 8));
    }

    #[test]
    fn test_threshold_at_binarizes() {
        let mut img = GrayImage::new(3, 1);
        img.put_pixel(0, 0, image::Luma([10u8]));
        img.put_pixel(1, 0, image::Luma([100u8]));
        img.put_pixel(2, 0, image::Luma([200u8]));
        let fragment = ProcessedFragment { image: img };

        let out = fragment.threshold_at(150).to_raw_buffer();
        assert_eq!(out, vec![0, 0, 255]);
    }

    #[test]
    fn test_png_buffer_round_trip() {
        let frame = frame_with_gradient(40, 30);
        let container = ImageContainer::from_frame(&frame, true).unwrap();
        let processed = container.process(bbox(0, 0, 40, 30, 30));

        let png = processed.to_png_buffer().unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_luma8();
        assert_eq!(decoded.as_raw(), &processed.to_raw_buffer());
    }

    #[test]
    fn test_from_frame_rejects_short_buffer() {
        let frame = CapturedFrame::new(vec![0u8; 10], 100, 100);
        assert!(ImageContainer::from_frame(&frame, true).is_err());
    }
}
