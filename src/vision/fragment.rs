//! Fragment kinds and their screen layout
//!
//! A fragment is one semantically distinct sub-region of the breach screen:
//! the code matrix, the daemon sequence list, or the buffer size indicator.
//! Positions are defined as fractions of a reference layout and scaled to
//! the capture resolution, so the same table serves every display size.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The sub-regions of the breach screen that carry puzzle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    /// The hex code matrix
    Grid,
    /// The daemon sequence list
    Daemons,
    /// The buffer size indicator
    BufferSize,
}

impl FragmentKind {
    /// All fragment kinds, in the order a solve cycle recognizes them
    pub const ALL: [FragmentKind; 3] = [
        FragmentKind::Grid,
        FragmentKind::Daemons,
        FragmentKind::BufferSize,
    ];

    /// Stable name used in log output and debug dump file names
    pub fn name(&self) -> &'static str {
        match self {
            FragmentKind::Grid => "grid",
            FragmentKind::Daemons => "daemons",
            FragmentKind::BufferSize => "buffer_size",
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pixel-space source rectangle for one fragment.
///
/// `inner_height` is the unscaled height of the capture the rectangle was
/// derived from; it drives the downscale decision, not the crop itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Height of the unscaled source capture
    pub inner_height: u32,
}

/// Fractional position of a fragment on the breach screen
#[derive(Debug, Clone, Copy)]
struct RelativeRect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl RelativeRect {
    fn to_bounding_box(self, frame_width: u32, frame_height: u32) -> BoundingBox {
        let x = ((self.x * frame_width as f32) as u32).min(frame_width);
        let y = ((self.y * frame_height as f32) as u32).min(frame_height);
        BoundingBox {
            x,
            y,
            width: ((self.width * frame_width as f32) as u32).min(frame_width - x),
            height: ((self.height * frame_height as f32) as u32).min(frame_height - y),
            inner_height: frame_height,
        }
    }
}

// Fractions measured against the 2560x1440 breach screen layout.
const GRID_RECT: RelativeRect = RelativeRect {
    x: 0.0875,
    y: 0.3083,
    width: 0.3453,
    height: 0.4167,
};
const DAEMONS_RECT: RelativeRect = RelativeRect {
    x: 0.4734,
    y: 0.3083,
    width: 0.1900,
    height: 0.3300,
};
const BUFFER_SIZE_RECT: RelativeRect = RelativeRect {
    x: 0.4734,
    y: 0.1720,
    width: 0.2160,
    height: 0.0550,
};

/// Static per-kind bounding box table for one capture resolution
#[derive(Debug, Clone, Copy)]
pub struct FragmentLayout {
    grid: BoundingBox,
    daemons: BoundingBox,
    buffer_size: BoundingBox,
}

impl FragmentLayout {
    /// Build the layout for a capture of the given dimensions
    pub fn for_resolution(frame_width: u32, frame_height: u32) -> Self {
        Self {
            grid: GRID_RECT.to_bounding_box(frame_width, frame_height),
            daemons: DAEMONS_RECT.to_bounding_box(frame_width, frame_height),
            buffer_size: BUFFER_SIZE_RECT.to_bounding_box(frame_width, frame_height),
        }
    }

    /// Look up the source rectangle for a fragment kind
    pub fn bounding_box(&self, kind: FragmentKind) -> BoundingBox {
        match kind {
            FragmentKind::Grid => self.grid,
            FragmentKind::Daemons => self.daemons,
            FragmentKind::BufferSize => self.buffer_size,
        }
    }
}

/// Axis-aligned box of one recognized word, in processed-image pixel space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

/// Recognition result for one fragment, handed to the solver as-is.
///
/// `raw_data` is exactly the recognizer's output for this one fragment;
/// splitting it into the grid matrix or daemon list is the solver's concern.
#[derive(Debug, Clone)]
pub struct RecognizedFragment {
    pub kind: FragmentKind,
    pub raw_data: String,
    pub boxes: Vec<WordBox>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_scales_with_resolution() {
        let small = FragmentLayout::for_resolution(1920, 1080);
        let large = FragmentLayout::for_resolution(3840, 2160);

        let small_grid = small.bounding_box(FragmentKind::Grid);
        let large_grid = large.bounding_box(FragmentKind::Grid);

        assert_eq!(small_grid.inner_height, 1080);
        assert_eq!(large_grid.inner_height, 2160);
        // Double the resolution, double the crop
        assert_eq!(large_grid.x, small_grid.x * 2);
        assert_eq!(large_grid.width, small_grid.width * 2);
    }

    #[test]
    fn test_bounding_boxes_stay_in_frame() {
        let layout = FragmentLayout::for_resolution(1280, 720);
        for kind in FragmentKind::ALL {
            let bbox = layout.bounding_box(kind);
            assert!(bbox.x + bbox.width <= 1280, "{:?} overflows width", kind);
            assert!(bbox.y + bbox.height <= 720, "{:?} overflows height", kind);
        }
    }

    #[test]
    fn test_fragment_names() {
        assert_eq!(FragmentKind::Grid.name(), "grid");
        assert_eq!(FragmentKind::Daemons.name(), "daemons");
        assert_eq!(FragmentKind::BufferSize.name(), "buffer_size");
    }
}
