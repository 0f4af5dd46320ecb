use crate::playback::engine::PlaybackEngine;
use crate::utils::error::ApngResult;

/// Where the active frame ends up. Implementations receive a canvas-sized
/// RGBA8 buffer each time the displayed frame changes.
pub trait Surface {
    fn present(&mut self, width: u32, height: u32, pixels: &[u8]);
}

/// An in-memory surface holding the last presented frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub uploads: usize,
}

impl PixelBuffer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Surface for PixelBuffer {
    fn present(&mut self, width: u32, height: u32, pixels: &[u8]) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.extend_from_slice(pixels);
        self.uploads += 1;
    }
}

/// A playback engine bound to the surface it draws on.
#[derive(Debug)]
pub struct AnimatedSprite<S: Surface> {
    engine: PlaybackEngine,
    surface: S,
}

impl<S: Surface> AnimatedSprite<S> {
    pub fn new(engine: PlaybackEngine, surface: S) -> Self {
        Self { engine, surface }
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PlaybackEngine {
        &mut self.engine
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_parts(self) -> (PlaybackEngine, S) {
        (self.engine, self.surface)
    }

    /// Uploads the active frame if it changed since the last render.
    /// Returns whether an upload happened.
    pub fn render(&mut self) -> ApngResult<bool> {
        if !self.engine.is_dirty() {
            return Ok(false);
        }

        let sequence = self.engine.sequence()?;
        let (width, height) = (sequence.width(), sequence.height());

        self.surface.present(width, height, self.engine.current_pixels()?);
        self.engine.mark_clean()?;

        Ok(true)
    }

    pub fn update(&mut self, delta_ms: f64) -> ApngResult<bool> {
        self.engine.update(delta_ms)?;
        self.render()
    }
}
