mod decoders;
mod playback;
mod utils;

pub use decoders::chunk::{Chunk, ChunkReader, ChunkType, PNG_SIGNATURE};
pub use decoders::compositor::FrameCompositor;
pub use decoders::png::{
    AnimationControl, BlendOp, ColorType, DecodeOptions, DisposeOp, FrameControl, ImageHeader, PngDecoder,
    RawAnimation, RawFrame, RawFrameImage,
};
pub use playback::clock::{Clock, EngineId, ManualClock};
pub use playback::engine::{EngineBuilder, PlaybackEngine, PlaybackState};
pub use playback::options::{Callbacks, PlaybackOptions};
pub use playback::surface::{AnimatedSprite, PixelBuffer, Surface};
pub use utils::error::{ApngError, ApngResult};
pub use utils::image::{AnimationSequence, DecodedFrame};
pub use utils::info::ApngInfo;
pub use utils::logger::Logger;

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Decodes and composites a whole APNG (or plain PNG) stream.
pub fn decode(data: &[u8], options: &DecodeOptions) -> ApngResult<AnimationSequence> {
    PngDecoder::new(data, options.clone()).decode()
}

/// Reads the stream structure without inflating any pixel data.
pub fn probe(data: &[u8], options: &DecodeOptions) -> ApngResult<ApngInfo> {
    PngDecoder::new(data, options.clone()).probe()
}

/// An encoded APNG held in memory together with the options used to decode it.
#[derive(Debug, Clone)]
pub struct Apng {
    data: Vec<u8>,
    options: DecodeOptions,
}

impl Apng {
    pub fn open<P: AsRef<Path>>(path: P) -> ApngResult<Self> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        Ok(Apng::new(data))
    }

    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            options: DecodeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    pub fn probe(&self) -> ApngResult<ApngInfo> {
        probe(&self.data, &self.options)
    }

    pub fn decode(&self) -> ApngResult<AnimationSequence> {
        decode(&self.data, &self.options)
    }

    /// Decodes the stream and wraps it in a playback engine.
    pub fn into_engine(self, options: PlaybackOptions) -> ApngResult<PlaybackEngine> {
        let sequence = Arc::new(self.decode()?);
        PlaybackEngine::new(sequence, options)
    }
}
