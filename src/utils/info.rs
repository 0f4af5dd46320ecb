use crate::decoders::png::{ColorType, FrameControl};
use serde::Serialize;

/// Container-level summary of a PNG/APNG stream, produced without
/// inflating pixel data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApngInfo {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: ColorType,
    pub interlaced: bool,
    pub animated: bool,
    pub frame_count: usize,
    pub declared_frame_count: Option<u32>,
    pub play_count: u32,
    pub default_image_is_frame: bool,
    pub has_transparency: bool,
    pub total_duration_ms: f64,
    pub frames: Vec<FrameControl>,
}
