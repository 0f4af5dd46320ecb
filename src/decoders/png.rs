use crate::decoders::chunk::{ChunkReader, ChunkType};
use crate::decoders::compositor::FrameCompositor;
use crate::decoders::filter::unfilter_scanlines;
use crate::utils::error::{ApngError, ApngResult};
use crate::utils::image::AnimationSequence;
use crate::utils::info::ApngInfo;
use crate::utils::traits::PayloadAccess;
use crate::{log_debug, log_warn};
use flate2::read::ZlibDecoder;
use serde::{Deserialize, Serialize};
use std::io::Read;

const ADAM7_PASSES: [(u32, u32, u32, u32); 7] = [
    // (x start, y start, x step, y step)
    (0, 0, 8, 8),
    (4, 0, 8, 8),
    (0, 4, 4, 8),
    (2, 0, 4, 4),
    (0, 2, 2, 4),
    (1, 0, 2, 2),
    (0, 1, 1, 2),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColorType {
    Grayscale = 0,
    RGB = 2,
    Indexed = 3,
    GrayscaleAlpha = 4,
    RGBA = 6,
}

impl ColorType {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ColorType::Grayscale),
            2 => Some(ColorType::RGB),
            3 => Some(ColorType::Indexed),
            4 => Some(ColorType::GrayscaleAlpha),
            6 => Some(ColorType::RGBA),
            _ => None,
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            ColorType::Grayscale | ColorType::Indexed => 1,
            ColorType::GrayscaleAlpha => 2,
            ColorType::RGB => 3,
            ColorType::RGBA => 4,
        }
    }

    fn supports_bit_depth(&self, bit_depth: u8) -> bool {
        match self {
            ColorType::Grayscale => matches!(bit_depth, 1 | 2 | 4 | 8 | 16),
            ColorType::Indexed => matches!(bit_depth, 1 | 2 | 4 | 8),
            ColorType::RGB | ColorType::GrayscaleAlpha | ColorType::RGBA => matches!(bit_depth, 8 | 16),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageHeader {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: ColorType,
    pub interlaced: bool,
}

impl ImageHeader {
    pub fn parse(data: &[u8]) -> ApngResult<Self> {
        const NAME: &str = "IHDR";

        let width = data.u32_be_at(0, NAME)?;
        let height = data.u32_be_at(4, NAME)?;
        let bit_depth = data.u8_at(8, NAME)?;
        let color_type = data.u8_at(9, NAME)?;
        let compression_method = data.u8_at(10, NAME)?;
        let filter_method = data.u8_at(11, NAME)?;
        let interlace_method = data.u8_at(12, NAME)?;

        if width == 0 || height == 0 {
            return Err(ApngError::corrupt(NAME, format!("invalid dimensions {}x{}", width, height)));
        }

        if (width as usize).checked_mul(height as usize).and_then(|n| n.checked_mul(4)).is_none() {
            return Err(ApngError::UnsupportedFormat(format!("image too large: {}x{}", width, height)));
        }

        let color_type = ColorType::from_u8(color_type)
            .ok_or_else(|| ApngError::UnsupportedFormat(format!("color type {}", color_type)))?;

        if !color_type.supports_bit_depth(bit_depth) {
            return Err(ApngError::UnsupportedFormat(format!(
                "bit depth {} with color type {:?}",
                bit_depth, color_type
            )));
        }

        if compression_method != 0 {
            return Err(ApngError::UnsupportedFormat(format!("compression method {}", compression_method)));
        }

        if filter_method != 0 {
            return Err(ApngError::UnsupportedFormat(format!("filter method {}", filter_method)));
        }

        let interlaced = match interlace_method {
            0 => false,
            1 => true,
            _ => return Err(ApngError::UnsupportedFormat(format!("interlace method {}", interlace_method))),
        };

        Ok(Self {
            width,
            height,
            bit_depth,
            color_type,
            interlaced,
        })
    }

    pub fn bits_per_pixel(&self) -> usize {
        self.bit_depth as usize * self.color_type.channels()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnimationControl {
    pub num_frames: u32,
    pub num_plays: u32,
}

impl AnimationControl {
    pub fn parse(data: &[u8]) -> ApngResult<Self> {
        Ok(Self {
            num_frames: data.u32_be_at(0, "acTL")?,
            num_plays: data.u32_be_at(4, "acTL")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DisposeOp {
    None,
    Background,
    Previous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlendOp {
    Source,
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameControl {
    pub sequence_number: u32,
    pub width: u32,
    pub height: u32,
    pub x_offset: u32,
    pub y_offset: u32,
    pub delay_num: u16,
    pub delay_den: u16,
    pub dispose_op: DisposeOp,
    pub blend_op: BlendOp,
}

impl FrameControl {
    pub fn parse(data: &[u8]) -> ApngResult<Self> {
        const NAME: &str = "fcTL";

        let sequence_number = data.u32_be_at(0, NAME)?;
        let width = data.u32_be_at(4, NAME)?;
        let height = data.u32_be_at(8, NAME)?;
        let x_offset = data.u32_be_at(12, NAME)?;
        let y_offset = data.u32_be_at(16, NAME)?;
        let delay_num = data.u16_be_at(20, NAME)?;
        let delay_den = data.u16_be_at(22, NAME)?;

        let dispose_op = match data.u8_at(24, NAME)? {
            0 => DisposeOp::None,
            1 => DisposeOp::Background,
            2 => DisposeOp::Previous,
            other => return Err(ApngError::corrupt(NAME, format!("invalid dispose_op: {}", other))),
        };

        let blend_op = match data.u8_at(25, NAME)? {
            0 => BlendOp::Source,
            1 => BlendOp::Over,
            other => return Err(ApngError::corrupt(NAME, format!("invalid blend_op: {}", other))),
        };

        if width == 0 || height == 0 {
            return Err(ApngError::corrupt(
                NAME,
                format!("frame {} has invalid size {}x{}", sequence_number, width, height),
            ));
        }

        Ok(Self {
            sequence_number,
            width,
            height,
            x_offset,
            y_offset,
            delay_num,
            delay_den,
            dispose_op,
            blend_op,
        })
    }

    /// A control covering the whole canvas, used for non-animated images.
    pub fn full_canvas(width: u32, height: u32) -> Self {
        Self {
            sequence_number: 0,
            width,
            height,
            x_offset: 0,
            y_offset: 0,
            delay_num: 0,
            delay_den: 0,
            dispose_op: DisposeOp::None,
            blend_op: BlendOp::Source,
        }
    }

    /// Delay in milliseconds as declared by the stream. A zero denominator
    /// yields a flat 100 ms.
    pub fn delay_ms(&self) -> f64 {
        if self.delay_den == 0 {
            100.0
        } else {
            1000.0 * self.delay_num as f64 / self.delay_den as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Reject chunks whose CRC does not match their contents.
    pub verify_crc: bool,
    /// Frame rate used when the stream carries no usable timing.
    pub fallback_fps: f64,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            verify_crc: true,
            fallback_fps: 30.0,
        }
    }
}

impl DecodeOptions {
    pub fn with_crc_check(mut self, verify_crc: bool) -> Self {
        self.verify_crc = verify_crc;
        self
    }

    pub fn with_fallback_fps(mut self, fallback_fps: f64) -> Self {
        self.fallback_fps = fallback_fps;
        self
    }

    pub fn validate(&self) -> ApngResult<()> {
        if !self.fallback_fps.is_finite() || self.fallback_fps <= 0.0 {
            return Err(ApngError::InvalidArgument(format!(
                "fallback_fps must be a positive number, got {}",
                self.fallback_fps
            )));
        }

        Ok(())
    }

    pub fn fallback_duration_ms(&self) -> f64 {
        1000.0 / self.fallback_fps
    }
}

/// De-filtered RGBA8 pixels of one frame at its own declared size.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrameImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// One frame as handed to the compositor: pixels, placement and the
/// display time with zero delays already replaced by the fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub image: RawFrameImage,
    pub control: FrameControl,
    pub delay_ms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawAnimation {
    pub header: ImageHeader,
    pub loop_count: u32,
    pub frames: Vec<RawFrame>,
}

#[derive(Debug, Clone)]
enum TransparencyData {
    Grayscale(u16),
    RGB(u16, u16, u16),
    Palette(Vec<u8>),
}

#[derive(Debug, Clone)]
struct PngFrame {
    fctl_info: FrameControl,
    fdat: Vec<u8>,
}

/// Everything gathered from one pass over the chunks, before inflating.
#[derive(Debug)]
struct PngStream {
    header: ImageHeader,
    palette: Option<Vec<[u8; 3]>>,
    transparency: Option<TransparencyData>,
    actl_info: Option<AnimationControl>,
    frames: Vec<PngFrame>,
    idat_data: Vec<u8>,
    default_image_is_frame: bool,
}

impl PngStream {
    fn is_animated(&self) -> bool {
        self.actl_info.is_some() && !self.frames.is_empty()
    }
}

pub struct PngDecoder<'a> {
    data: &'a [u8],
    options: DecodeOptions,
}

impl<'a> PngDecoder<'a> {
    pub fn new(data: &'a [u8], options: DecodeOptions) -> Self {
        Self { data, options }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Reads the container structure without inflating any image data.
    pub fn probe(&self) -> ApngResult<ApngInfo> {
        self.options.validate()?;
        let stream = self.read_stream()?;
        let fallback = self.options.fallback_duration_ms();

        let frames: Vec<FrameControl> = if stream.is_animated() {
            stream.frames.iter().map(|frame| frame.fctl_info).collect()
        } else {
            Vec::new()
        };

        let total_duration_ms = if frames.is_empty() {
            fallback
        } else {
            frames.iter().map(|control| normalize_delay(control.delay_ms(), fallback)).sum()
        };

        Ok(ApngInfo {
            width: stream.header.width,
            height: stream.header.height,
            bit_depth: stream.header.bit_depth,
            color_type: stream.header.color_type,
            interlaced: stream.header.interlaced,
            animated: stream.is_animated(),
            frame_count: frames.len().max(1),
            declared_frame_count: stream.actl_info.map(|actl| actl.num_frames),
            play_count: stream.actl_info.map_or(0, |actl| actl.num_plays),
            default_image_is_frame: stream.is_animated() && stream.default_image_is_frame,
            has_transparency: stream.transparency.is_some()
                || matches!(stream.header.color_type, ColorType::GrayscaleAlpha | ColorType::RGBA),
            total_duration_ms,
            frames,
        })
    }

    /// Inflates and de-filters every animation frame without compositing.
    pub fn decode_raw(&self) -> ApngResult<RawAnimation> {
        self.options.validate()?;
        let stream = self.read_stream()?;
        let fallback = self.options.fallback_duration_ms();
        let header = stream.header;

        if !stream.is_animated() {
            let pixels = self.decode_frame_pixels(&stream, &stream.idat_data, header.width, header.height, "IDAT")?;
            log_debug!("Decoded static {}x{} image", header.width, header.height);

            return Ok(RawAnimation {
                header,
                loop_count: 0,
                frames: vec![RawFrame {
                    image: RawFrameImage {
                        width: header.width,
                        height: header.height,
                        pixels,
                    },
                    control: FrameControl::full_canvas(header.width, header.height),
                    delay_ms: fallback,
                }],
            });
        }

        let mut frames = Vec::with_capacity(stream.frames.len());

        for (index, frame) in stream.frames.iter().enumerate() {
            let fctl = &frame.fctl_info;

            if frame.fdat.is_empty() {
                return Err(ApngError::corrupt(
                    "fdAT",
                    format!("frame {} (sequence {}) has no image data", index, fctl.sequence_number),
                ));
            }

            let chunk = if index == 0 && stream.default_image_is_frame { "IDAT" } else { "fdAT" };
            let pixels = self.decode_frame_pixels(&stream, &frame.fdat, fctl.width, fctl.height, chunk)?;

            frames.push(RawFrame {
                image: RawFrameImage {
                    width: fctl.width,
                    height: fctl.height,
                    pixels,
                },
                control: *fctl,
                delay_ms: normalize_delay(fctl.delay_ms(), fallback),
            });
        }

        let loop_count = stream.actl_info.map_or(0, |actl| actl.num_plays);
        log_debug!("Decoded {} animation frames, {} plays", frames.len(), loop_count);

        Ok(RawAnimation {
            header,
            loop_count,
            frames,
        })
    }

    pub fn decode(&self) -> ApngResult<AnimationSequence> {
        let raw = self.decode_raw()?;
        let compositor = FrameCompositor::new(raw.header.width, raw.header.height);

        compositor.composite(raw.frames, raw.loop_count)
    }

    fn read_stream(&self) -> ApngResult<PngStream> {
        let mut reader = ChunkReader::new(self.data, self.options.verify_crc)?;

        let header = match reader.next() {
            Some(chunk) => {
                let chunk = chunk?;
                if chunk.chunk_type != ChunkType::IHDR {
                    return Err(ApngError::MissingHeader);
                }
                ImageHeader::parse(chunk.data)?
            }
            None => return Err(ApngError::MissingHeader),
        };

        let mut stream = PngStream {
            header,
            palette: None,
            transparency: None,
            actl_info: None,
            frames: Vec::new(),
            idat_data: Vec::new(),
            default_image_is_frame: false,
        };

        let mut default_frame: Option<usize> = None;
        let mut idat_seen = false;
        let mut ended = false;

        for chunk in reader {
            let chunk = chunk?;

            match chunk.chunk_type {
                ChunkType::IHDR => return Err(ApngError::corrupt("IHDR", "duplicate header chunk")),
                ChunkType::PLTE => stream.palette = Some(read_plte(chunk.data)?),
                ChunkType::TRNS => stream.transparency = read_trns(chunk.data, &stream.header),
                ChunkType::ACTL => {
                    if idat_seen {
                        log_warn!("Ignoring acTL chunk after image data");
                    } else if stream.actl_info.is_some() {
                        log_warn!("Ignoring duplicate acTL chunk");
                    } else {
                        let actl = AnimationControl::parse(chunk.data)?;
                        if actl.num_frames == 0 {
                            log_warn!("acTL chunk with zero frames");
                        }
                        stream.actl_info = Some(actl);
                    }
                }
                ChunkType::FCTL => {
                    stream.frames.push(PngFrame {
                        fctl_info: FrameControl::parse(chunk.data)?,
                        fdat: Vec::new(),
                    });
                }
                ChunkType::IDAT => {
                    if !idat_seen {
                        // The default image is frame 0 only when the fcTL right
                        // before it carries sequence number 0
                        default_frame = match stream.frames.last() {
                            Some(frame) if frame.fctl_info.sequence_number == 0 => Some(stream.frames.len() - 1),
                            Some(frame) => {
                                log_warn!(
                                    "fcTL before IDAT has sequence {}, treating the default image as hidden",
                                    frame.fctl_info.sequence_number
                                );
                                None
                            }
                            None => None,
                        };
                        idat_seen = true;
                    }

                    if let Some(index) = default_frame {
                        stream.frames[index].fdat.extend_from_slice(chunk.data);
                    }

                    stream.idat_data.extend_from_slice(chunk.data);
                }
                ChunkType::FDAT => {
                    let sequence_number = chunk.data.u32_be_at(0, "fdAT")?;
                    let last_index = stream.frames.len().checked_sub(1);

                    match stream.frames.last_mut() {
                        Some(frame) if last_index != default_frame => {
                            if sequence_number <= frame.fctl_info.sequence_number {
                                log_warn!(
                                    "fdAT sequence {} does not follow fcTL sequence {}",
                                    sequence_number,
                                    frame.fctl_info.sequence_number
                                );
                            }
                            frame.fdat.extend_from_slice(&chunk.data[4..]);
                        }
                        _ => log_warn!("fdAT chunk without preceding fcTL chunk"),
                    }
                }
                ChunkType::IEND => {
                    ended = true;
                    break;
                }
                other if other.is_critical() => {
                    return Err(ApngError::corrupt(other.as_str(), "unknown critical chunk"));
                }
                other => log_debug!("Skipping ancillary chunk {}", other),
            }
        }

        if !ended {
            log_warn!("Stream ended without an IEND chunk");
        }

        if stream.idat_data.is_empty() {
            return Err(ApngError::corrupt("IDAT", "no image data"));
        }

        if stream.header.color_type == ColorType::Indexed && stream.palette.is_none() {
            return Err(ApngError::corrupt("PLTE", "indexed image without a palette"));
        }

        stream.default_image_is_frame = default_frame.is_some();

        match stream.actl_info {
            Some(actl) if stream.frames.is_empty() => {
                log_warn!("acTL declares {} frames but no fcTL was found, decoding as static", actl.num_frames);
            }
            Some(actl) => {
                if actl.num_frames as usize != stream.frames.len() {
                    log_warn!("acTL declares {} frames, found {}", actl.num_frames, stream.frames.len());
                }

                if !stream.frames.windows(2).all(|w| w[0].fctl_info.sequence_number < w[1].fctl_info.sequence_number) {
                    log_warn!("fcTL chunks are out of sequence order, reordering");
                    stream.frames.sort_by_key(|frame| frame.fctl_info.sequence_number);
                }
            }
            None if !stream.frames.is_empty() => {
                log_warn!("fcTL chunks without acTL, decoding as static");
            }
            None => {}
        }

        if stream.is_animated() {
            for (index, frame) in stream.frames.iter().enumerate() {
                check_frame_region(index, &frame.fctl_info, &stream.header)?;
            }
        }

        Ok(stream)
    }

    fn decode_frame_pixels(&self, stream: &PngStream, data: &[u8], width: u32, height: u32, chunk: &str) -> ApngResult<Vec<u8>> {
        let mut decompressed = Vec::new();
        ZlibDecoder::new(data)
            .read_to_end(&mut decompressed)
            .map_err(ApngError::InflateFailure)?;

        let bits_per_pixel = stream.header.bits_per_pixel();

        if !stream.header.interlaced {
            let (rows, _) = unfilter_scanlines(&decompressed, width, height, bits_per_pixel, chunk)?;
            return expand_to_rgba8(stream, &rows, width, height);
        }

        let mut output = vec![0u8; width as usize * height as usize * 4];
        let mut offset = 0;

        for (x_start, y_start, x_step, y_step) in ADAM7_PASSES {
            let pass_width = width.saturating_sub(x_start).div_ceil(x_step);
            let pass_height = height.saturating_sub(y_start).div_ceil(y_step);

            if pass_width == 0 || pass_height == 0 {
                continue;
            }

            let (rows, consumed) = unfilter_scanlines(&decompressed[offset..], pass_width, pass_height, bits_per_pixel, chunk)?;
            offset += consumed;

            let pass_pixels = expand_to_rgba8(stream, &rows, pass_width, pass_height)?;

            for py in 0..pass_height {
                for px in 0..pass_width {
                    let x = (x_start + px * x_step) as usize;
                    let y = (y_start + py * y_step) as usize;
                    let src = (py as usize * pass_width as usize + px as usize) * 4;
                    let dst = (y * width as usize + x) * 4;

                    output[dst..dst + 4].copy_from_slice(&pass_pixels[src..src + 4]);
                }
            }
        }

        Ok(output)
    }
}

/// Rejects a frame region that does not fit the canvas before any of its
/// data is inflated.
fn check_frame_region(index: usize, control: &FrameControl, header: &ImageHeader) -> ApngResult<()> {
    let right = control.x_offset as u64 + control.width as u64;
    let bottom = control.y_offset as u64 + control.height as u64;

    if right > header.width as u64 || bottom > header.height as u64 {
        return Err(ApngError::FrameOutOfBounds {
            frame: index,
            x_offset: control.x_offset,
            y_offset: control.y_offset,
            width: control.width,
            height: control.height,
            canvas_width: header.width,
            canvas_height: header.height,
        });
    }

    Ok(())
}

fn normalize_delay(delay_ms: f64, fallback_ms: f64) -> f64 {
    if delay_ms > 0.0 {
        delay_ms
    } else {
        fallback_ms
    }
}

fn read_plte(data: &[u8]) -> ApngResult<Vec<[u8; 3]>> {
    if data.is_empty() || data.len() % 3 != 0 || data.len() > 256 * 3 {
        return Err(ApngError::corrupt("PLTE", format!("invalid palette length {}", data.len())));
    }

    Ok(data.chunks_exact(3).map(|rgb| [rgb[0], rgb[1], rgb[2]]).collect())
}

fn read_trns(data: &[u8], header: &ImageHeader) -> Option<TransparencyData> {
    let sample = |offset: usize| data.u16_be_at(offset, "tRNS");

    let transparency = match header.color_type {
        ColorType::Indexed => Ok(TransparencyData::Palette(data.to_vec())),
        ColorType::Grayscale => sample(0).map(TransparencyData::Grayscale),
        ColorType::RGB => sample(0).and_then(|r| Ok(TransparencyData::RGB(r, sample(2)?, sample(4)?))),
        ColorType::GrayscaleAlpha | ColorType::RGBA => {
            log_warn!("Ignoring tRNS chunk for color type {:?}", header.color_type);
            return None;
        }
    };

    match transparency {
        Ok(transparency) => Some(transparency),
        Err(e) => {
            log_warn!("Ignoring malformed tRNS chunk: {}", e);
            None
        }
    }
}

/// Raw sample `index` of a packed row, at full precision.
fn read_sample(row: &[u8], index: usize, bit_depth: u8) -> u16 {
    match bit_depth {
        16 => u16::from_be_bytes([row[index * 2], row[index * 2 + 1]]),
        8 => row[index] as u16,
        _ => {
            let bit_offset = index * bit_depth as usize;
            let shift = 8 - bit_depth as usize - bit_offset % 8;
            let mask = (1u16 << bit_depth) - 1;
            (row[bit_offset / 8] as u16 >> shift) & mask
        }
    }
}

fn scale_to_u8(value: u16, bit_depth: u8) -> u8 {
    match bit_depth {
        16 => (value >> 8) as u8,
        8 => value as u8,
        _ => (value * 255 / ((1u16 << bit_depth) - 1)) as u8,
    }
}

fn expand_to_rgba8(stream: &PngStream, rows: &[u8], width: u32, height: u32) -> ApngResult<Vec<u8>> {
    let header = &stream.header;
    let bit_depth = header.bit_depth;
    let channels = header.color_type.channels();
    let bytes_per_row = crate::decoders::filter::row_bytes(width, header.bits_per_pixel());
    let mut output = Vec::with_capacity(width as usize * height as usize * 4);

    for row in rows.chunks_exact(bytes_per_row).take(height as usize) {
        for x in 0..width as usize {
            let base = x * channels;
            let sample = |channel: usize| read_sample(row, base + channel, bit_depth);
            let scaled = |channel: usize| scale_to_u8(sample(channel), bit_depth);

            let rgba = match header.color_type {
                ColorType::Grayscale => {
                    let gray = scaled(0);
                    let alpha = match stream.transparency {
                        Some(TransparencyData::Grayscale(key)) if key == sample(0) => 0,
                        _ => 255,
                    };
                    [gray, gray, gray, alpha]
                }
                ColorType::RGB => {
                    let alpha = match stream.transparency {
                        Some(TransparencyData::RGB(r, g, b)) if (r, g, b) == (sample(0), sample(1), sample(2)) => 0,
                        _ => 255,
                    };
                    [scaled(0), scaled(1), scaled(2), alpha]
                }
                ColorType::Indexed => {
                    let index = sample(0) as usize;
                    let palette = stream.palette.as_deref().unwrap_or_default();
                    let color = palette.get(index).ok_or_else(|| {
                        ApngError::corrupt(
                            "PLTE",
                            format!("palette index {} out of range ({} entries)", index, palette.len()),
                        )
                    })?;
                    let alpha = match &stream.transparency {
                        Some(TransparencyData::Palette(alphas)) => alphas.get(index).copied().unwrap_or(255),
                        _ => 255,
                    };
                    [color[0], color[1], color[2], alpha]
                }
                ColorType::GrayscaleAlpha => {
                    let gray = scaled(0);
                    [gray, gray, gray, scaled(1)]
                }
                ColorType::RGBA => [scaled(0), scaled(1), scaled(2), scaled(3)],
            };

            output.extend_from_slice(&rgba);
        }
    }

    Ok(output)
}
