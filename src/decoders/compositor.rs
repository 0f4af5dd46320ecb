use crate::decoders::png::{BlendOp, DisposeOp, FrameControl, RawFrame};
use crate::log_debug;
use crate::utils::error::{ApngError, ApngResult};
use crate::utils::image::AnimationSequence;

/// Replays APNG disposal and blend rules over one accumulation canvas.
pub struct FrameCompositor {
    width: u32,
    height: u32,
    canvas: Vec<u8>,
}

impl FrameCompositor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            canvas: vec![0; width as usize * height as usize * 4],
        }
    }

    fn check_bounds(&self, index: usize, frame: &RawFrame) -> ApngResult<()> {
        let control = &frame.control;
        let right = control.x_offset as u64 + control.width as u64;
        let bottom = control.y_offset as u64 + control.height as u64;

        if right > self.width as u64 || bottom > self.height as u64 {
            return Err(ApngError::FrameOutOfBounds {
                frame: index,
                x_offset: control.x_offset,
                y_offset: control.y_offset,
                width: control.width,
                height: control.height,
                canvas_width: self.width,
                canvas_height: self.height,
            });
        }

        let expected = control.width as usize * control.height as usize * 4;
        if frame.image.pixels.len() != expected {
            return Err(ApngError::corrupt(
                "fdAT",
                format!(
                    "frame {} carries {} bytes of pixels, expected {}",
                    index,
                    frame.image.pixels.len(),
                    expected
                ),
            ));
        }

        Ok(())
    }

    /// Byte range of row `y` of `control`'s region within the canvas.
    fn region_row(&self, control: &FrameControl, y: u32) -> std::ops::Range<usize> {
        let start = ((control.y_offset + y) as usize * self.width as usize + control.x_offset as usize) * 4;
        start..start + control.width as usize * 4
    }

    fn clear_region(&mut self, control: &FrameControl) {
        for y in 0..control.height {
            let row = self.region_row(control, y);
            self.canvas[row].fill(0);
        }
    }

    fn dispose(&mut self, control: &FrameControl, dispose_op: DisposeOp, snapshot: Option<Vec<u8>>) {
        match (dispose_op, snapshot) {
            (DisposeOp::None, _) => {}
            (DisposeOp::Background, _) => self.clear_region(control),
            (DisposeOp::Previous, Some(snapshot)) => self.canvas = snapshot,
            (DisposeOp::Previous, None) => self.clear_region(control),
        }
    }

    fn blend(&mut self, frame: &RawFrame) {
        let control = &frame.control;
        let frame_row_bytes = control.width as usize * 4;

        for y in 0..control.height {
            let src_start = y as usize * frame_row_bytes;
            let src = &frame.image.pixels[src_start..src_start + frame_row_bytes];
            let row = self.region_row(control, y);
            let dst = &mut self.canvas[row];

            match control.blend_op {
                BlendOp::Source => dst.copy_from_slice(src),
                BlendOp::Over => {
                    for (dst_pixel, src_pixel) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                        blend_over(dst_pixel, src_pixel);
                    }
                }
            }
        }
    }

    /// Composites `frames` in order and assigns cumulative timings.
    pub fn composite(mut self, frames: Vec<RawFrame>, loop_count: u32) -> ApngResult<AnimationSequence> {
        for (index, frame) in frames.iter().enumerate() {
            self.check_bounds(index, frame)?;
        }

        let mut output = Vec::with_capacity(frames.len());
        let mut previous: Option<(FrameControl, DisposeOp, Option<Vec<u8>>)> = None;

        for (index, frame) in frames.into_iter().enumerate() {
            if let Some((control, dispose_op, snapshot)) = previous.take() {
                self.dispose(&control, dispose_op, snapshot);
            }

            // Restoring "previous" on the first frame means restoring the
            // initial transparent canvas
            let dispose_op = match frame.control.dispose_op {
                DisposeOp::Previous if index == 0 => DisposeOp::Background,
                other => other,
            };

            let snapshot = (dispose_op == DisposeOp::Previous).then(|| self.canvas.clone());

            self.blend(&frame);
            output.push((self.canvas.clone(), frame.delay_ms));

            previous = Some((frame.control, dispose_op, snapshot));
        }

        log_debug!("Composited {} frames on a {}x{} canvas", output.len(), self.width, self.height);

        AnimationSequence::new(self.width, self.height, output, loop_count)
    }
}

/// Non-premultiplied source-over for one RGBA8 pixel.
fn blend_over(dst: &mut [u8], src: &[u8]) {
    let src_a = src[3] as u32;

    if src_a == 255 {
        dst.copy_from_slice(src);
        return;
    }

    if src_a == 0 {
        return;
    }

    let dst_a = dst[3] as u32;
    // Alpha values below are scaled by 255
    let dst_weight = dst_a * (255 - src_a);
    let out_a = src_a * 255 + dst_weight;

    for i in 0..3 {
        let value = (src[i] as u32 * src_a * 255 + dst[i] as u32 * dst_weight + out_a / 2) / out_a;
        dst[i] = value as u8;
    }

    dst[3] = ((out_a + 127) / 255) as u8;
}
