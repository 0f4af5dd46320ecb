use crate::utils::error::{ApngError, ApngResult};

/// A fully composited canvas-sized RGBA8 frame and the half-open time span
/// `[start_ms, end_ms)` during which it is shown.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pixels: Vec<u8>,
    start_ms: f64,
    end_ms: f64,
}

impl DecodedFrame {
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn start_ms(&self) -> f64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> f64 {
        self.end_ms
    }

    pub fn duration_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }

    pub fn contains(&self, time_ms: f64) -> bool {
        self.start_ms <= time_ms && time_ms < self.end_ms
    }
}

/// The immutable result of decoding and compositing an APNG stream.
///
/// Frames are contiguous and ordered: the first starts at 0, each one starts
/// where the previous ended, and the last ends at `total_duration`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSequence {
    width: u32,
    height: u32,
    frames: Vec<DecodedFrame>,
    total_duration: f64,
    loop_count: u32,
}

impl AnimationSequence {
    /// Builds a sequence from canvas-sized RGBA8 buffers and their display
    /// durations in milliseconds.
    pub fn new(width: u32, height: u32, frames: Vec<(Vec<u8>, f64)>, loop_count: u32) -> ApngResult<Self> {
        if width == 0 || height == 0 {
            return Err(ApngError::InvalidArgument(format!(
                "Invalid canvas dimensions: {}x{}",
                width, height
            )));
        }

        if frames.is_empty() {
            return Err(ApngError::InvalidArgument("An animation needs at least one frame".into()));
        }

        let expected_len = width as usize * height as usize * 4;
        let mut time = 0.0;
        let mut decoded = Vec::with_capacity(frames.len());

        for (index, (pixels, duration)) in frames.into_iter().enumerate() {
            if pixels.len() != expected_len {
                return Err(ApngError::InvalidArgument(format!(
                    "Frame {} has {} bytes, expected {}",
                    index,
                    pixels.len(),
                    expected_len
                )));
            }

            if !duration.is_finite() || duration <= 0.0 {
                return Err(ApngError::InvalidArgument(format!(
                    "Frame {} has a non-positive duration: {}",
                    index, duration
                )));
            }

            decoded.push(DecodedFrame {
                pixels,
                start_ms: time,
                end_ms: time + duration,
            });
            time += duration;
        }

        Ok(Self {
            width,
            height,
            frames: decoded,
            total_duration: time,
            loop_count,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frames(&self) -> &[DecodedFrame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&DecodedFrame> {
        self.frames.get(index)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Number of plays requested by the stream, 0 meaning forever.
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }

    /// Index of the frame whose `[start_ms, end_ms)` span contains `time_ms`.
    pub fn frame_index_at(&self, time_ms: f64) -> Option<usize> {
        let index = self.frames.partition_point(|frame| frame.end_ms <= time_ms);

        match self.frames.get(index) {
            Some(frame) if frame.contains(time_ms) => Some(index),
            _ => None,
        }
    }
}
