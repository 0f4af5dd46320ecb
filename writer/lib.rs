use flate2::write::ZlibEncoder;
use flate2::{Compression, Crc};
use std::io::{Error, ErrorKind, Write};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

const ADAM7_PASSES: [(usize, usize, usize, usize); 7] = [
    (0, 0, 8, 8),
    (4, 0, 8, 8),
    (0, 4, 4, 8),
    (2, 0, 4, 4),
    (0, 2, 2, 4),
    (1, 0, 2, 2),
    (0, 1, 1, 2),
];

pub struct Writer {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterFilter {
    None = 0,
    Sub = 1,
    Up = 2,
    Average = 3,
    Paeth = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterHeader {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: u8,
    pub interlaced: bool,
}

impl WriterHeader {
    pub fn rgba8(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bit_depth: 8,
            color_type: 6,
            interlaced: false,
        }
    }

    pub fn bits_per_pixel(&self) -> usize {
        let channels = match self.color_type {
            2 => 3,
            4 => 2,
            6 => 4,
            _ => 1,
        };

        channels * self.bit_depth as usize
    }

    fn row_bytes(&self, width: usize) -> usize {
        (width * self.bits_per_pixel()).div_ceil(8)
    }
}

/// One animation frame. `pixels` holds packed samples in the header's
/// format, row by row, without filter bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterImageFrame {
    pub width: u32,
    pub height: u32,
    pub x_offset: u32,
    pub y_offset: u32,
    pub delay_num: u16,
    pub delay_den: u16,
    pub dispose_op: u8,
    pub blend_op: u8,
    pub pixels: Vec<u8>,
}

impl WriterImageFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            x_offset: 0,
            y_offset: 0,
            delay_num: 1,
            delay_den: 10,
            dispose_op: 0,
            blend_op: 0,
            pixels,
        }
    }

    /// A frame filled with a single RGBA8 color.
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = color.repeat(width as usize * height as usize);
        Self::new(width, height, pixels)
    }

    pub fn with_offset(mut self, x_offset: u32, y_offset: u32) -> Self {
        self.x_offset = x_offset;
        self.y_offset = y_offset;
        self
    }

    pub fn with_delay(mut self, delay_num: u16, delay_den: u16) -> Self {
        self.delay_num = delay_num;
        self.delay_den = delay_den;
        self
    }

    pub fn with_dispose(mut self, dispose_op: u8) -> Self {
        self.dispose_op = dispose_op;
        self
    }

    pub fn with_blend(mut self, blend_op: u8) -> Self {
        self.blend_op = blend_op;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriterImage {
    pub header: WriterHeader,
    pub palette: Option<Vec<[u8; 3]>>,
    pub transparency: Option<Vec<u8>>,
    /// Writes `acTL`/`fcTL`/`fdAT`. Without it only the first frame (or the
    /// static image) is stored, as a plain PNG.
    pub animated: bool,
    /// Pixels of a default image that is not part of the animation.
    pub static_image: Option<Vec<u8>>,
    pub frames: Vec<WriterImageFrame>,
    pub num_plays: u32,
    /// Overrides the frame count written to `acTL`.
    pub declared_frames: Option<u32>,
    pub filter: WriterFilter,
    /// Splits image data into chunks of at most this many bytes.
    pub max_chunk_len: Option<usize>,
}

impl WriterImage {
    pub fn new(header: WriterHeader, frames: Vec<WriterImageFrame>) -> Self {
        Self {
            header,
            palette: None,
            transparency: None,
            animated: true,
            static_image: None,
            frames,
            num_plays: 0,
            declared_frames: None,
            filter: WriterFilter::None,
            max_chunk_len: None,
        }
    }

    pub fn still(header: WriterHeader, pixels: Vec<u8>) -> Self {
        let frame = WriterImageFrame::new(header.width, header.height, pixels);
        let mut image = Self::new(header, vec![frame]);
        image.animated = false;
        image
    }
}

impl Writer {
    pub fn encode_apng(image: &WriterImage) -> Result<Vec<u8>, Error> {
        Writer::validate_pixel_count(image)?;

        let header = &image.header;
        let mut out = PNG_SIGNATURE.to_vec();

        let mut ihdr = Vec::with_capacity(13);
        ihdr.extend_from_slice(&header.width.to_be_bytes());
        ihdr.extend_from_slice(&header.height.to_be_bytes());
        ihdr.extend_from_slice(&[header.bit_depth, header.color_type, 0, 0, header.interlaced as u8]);
        Writer::write_chunk(&mut out, b"IHDR", &ihdr);

        if image.animated {
            let num_frames = image.declared_frames.unwrap_or(image.frames.len() as u32);
            let mut actl = num_frames.to_be_bytes().to_vec();
            actl.extend_from_slice(&image.num_plays.to_be_bytes());
            Writer::write_chunk(&mut out, b"acTL", &actl);
        }

        if let Some(palette) = &image.palette {
            let plte: Vec<u8> = palette.iter().flatten().copied().collect();
            Writer::write_chunk(&mut out, b"PLTE", &plte);
        }

        if let Some(trns) = &image.transparency {
            Writer::write_chunk(&mut out, b"tRNS", trns);
        }

        if !image.animated {
            let pixels = match &image.static_image {
                Some(pixels) => pixels,
                None => &image.frames[0].pixels,
            };
            let data = Writer::encode_pixels(header, header.width, header.height, pixels, image.filter)?;
            Writer::write_data(&mut out, image, None, &data);
        } else {
            let mut sequence = 0u32;
            let mut frames = image.frames.iter();

            match &image.static_image {
                Some(pixels) => {
                    let data = Writer::encode_pixels(header, header.width, header.height, pixels, image.filter)?;
                    Writer::write_data(&mut out, image, None, &data);
                }
                None => {
                    if let Some(first) = frames.next() {
                        Writer::write_chunk(&mut out, b"fcTL", &Writer::fctl_payload(sequence, first));
                        sequence += 1;
                        let data = Writer::encode_pixels(header, first.width, first.height, &first.pixels, image.filter)?;
                        Writer::write_data(&mut out, image, None, &data);
                    }
                }
            }

            for frame in frames {
                Writer::write_chunk(&mut out, b"fcTL", &Writer::fctl_payload(sequence, frame));
                sequence += 1;
                let data = Writer::encode_pixels(header, frame.width, frame.height, &frame.pixels, image.filter)?;
                sequence = Writer::write_data(&mut out, image, Some(sequence), &data);
            }
        }

        Writer::write_chunk(&mut out, b"IEND", &[]);

        Ok(out)
    }

    /// Appends a chunk with its length prefix and CRC.
    pub fn write_chunk(out: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(chunk_type);
        out.extend_from_slice(data);
        out.extend_from_slice(&Writer::crc(chunk_type, data).to_be_bytes());
    }

    pub fn crc(chunk_type: &[u8; 4], data: &[u8]) -> u32 {
        let mut crc = Crc::new();
        crc.update(chunk_type);
        crc.update(data);
        crc.sum()
    }

    pub fn compress(raw: &[u8]) -> Result<Vec<u8>, Error> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(raw)?;
        encoder.finish()
    }

    pub fn fctl_payload(sequence: u32, frame: &WriterImageFrame) -> Vec<u8> {
        let mut data = Vec::with_capacity(26);
        data.extend_from_slice(&sequence.to_be_bytes());
        data.extend_from_slice(&frame.width.to_be_bytes());
        data.extend_from_slice(&frame.height.to_be_bytes());
        data.extend_from_slice(&frame.x_offset.to_be_bytes());
        data.extend_from_slice(&frame.y_offset.to_be_bytes());
        data.extend_from_slice(&frame.delay_num.to_be_bytes());
        data.extend_from_slice(&frame.delay_den.to_be_bytes());
        data.push(frame.dispose_op);
        data.push(frame.blend_op);
        data
    }

    /// Filters and compresses one frame, interlacing it when the header asks for it.
    pub fn encode_pixels(
        header: &WriterHeader,
        width: u32,
        height: u32,
        pixels: &[u8],
        filter: WriterFilter,
    ) -> Result<Vec<u8>, Error> {
        let (width, height) = (width as usize, height as usize);
        let bpp = header.bits_per_pixel();

        let raw = if header.interlaced {
            if bpp < 8 {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    "Interlaced fixtures need at least 8 bits per pixel",
                ));
            }

            let pixel_bytes = bpp / 8;
            let mut raw = Vec::new();

            for &(x_start, y_start, x_step, y_step) in &ADAM7_PASSES {
                if x_start >= width || y_start >= height {
                    continue;
                }

                let pass_width = (width - x_start).div_ceil(x_step);
                let pass_height = (height - y_start).div_ceil(y_step);
                let mut pass = Vec::with_capacity(pass_width * pass_height * pixel_bytes);

                for y in 0..pass_height {
                    for x in 0..pass_width {
                        let offset = ((y_start + y * y_step) * width + x_start + x * x_step) * pixel_bytes;
                        pass.extend_from_slice(&pixels[offset..offset + pixel_bytes]);
                    }
                }

                raw.extend(Writer::filter_scanlines(&pass, pass_width * pixel_bytes, pass_height, pixel_bytes, filter));
            }

            raw
        } else {
            let stride = header.row_bytes(width);
            Writer::filter_scanlines(pixels, stride, height, bpp.div_ceil(8), filter)
        };

        Writer::compress(&raw)
    }

    /// Prefixes every row with `filter` and applies the forward transform.
    pub fn filter_scanlines(
        data: &[u8],
        stride: usize,
        height: usize,
        bytes_per_pixel: usize,
        filter: WriterFilter,
    ) -> Vec<u8> {
        let mut out = Vec::with_capacity((stride + 1) * height);
        let zero_row = vec![0u8; stride];

        for y in 0..height {
            let row = &data[y * stride..(y + 1) * stride];
            let prev = if y == 0 { &zero_row[..] } else { &data[(y - 1) * stride..y * stride] };

            out.push(filter as u8);

            for i in 0..stride {
                let left = if i >= bytes_per_pixel { row[i - bytes_per_pixel] } else { 0 };
                let up = prev[i];
                let up_left = if i >= bytes_per_pixel { prev[i - bytes_per_pixel] } else { 0 };

                let predicted = match filter {
                    WriterFilter::None => 0,
                    WriterFilter::Sub => left,
                    WriterFilter::Up => up,
                    WriterFilter::Average => ((left as u16 + up as u16) / 2) as u8,
                    WriterFilter::Paeth => paeth(left, up, up_left),
                };

                out.push(row[i].wrapping_sub(predicted));
            }
        }

        out
    }

    /// Flips a bit in the CRC of the first chunk of `chunk_type`.
    pub fn corrupt_crc(data: &mut [u8], chunk_type: &[u8; 4]) -> bool {
        match Writer::find_chunk(data, chunk_type) {
            Some((offset, length)) => {
                data[offset + 8 + length] ^= 0x01;
                true
            }
            None => false,
        }
    }

    /// Overwrites payload bytes of the first chunk of `chunk_type` starting at
    /// `at` and recomputes its CRC.
    pub fn patch_chunk(data: &mut [u8], chunk_type: &[u8; 4], at: usize, bytes: &[u8]) -> bool {
        let Some((offset, length)) = Writer::find_chunk(data, chunk_type) else {
            return false;
        };
        if at + bytes.len() > length {
            return false;
        }

        let payload = offset + 8;
        data[payload + at..payload + at + bytes.len()].copy_from_slice(bytes);
        let crc = Writer::crc(chunk_type, &data[payload..payload + length]);
        data[payload + length..payload + length + 4].copy_from_slice(&crc.to_be_bytes());
        true
    }

    /// Offset and payload length of the first chunk of `chunk_type`.
    pub fn find_chunk(data: &[u8], chunk_type: &[u8; 4]) -> Option<(usize, usize)> {
        let mut offset = PNG_SIGNATURE.len();

        while offset + 12 <= data.len() {
            let length = u32::from_be_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]]) as usize;

            if &data[offset + 4..offset + 8] == chunk_type {
                return Some((offset, length));
            }

            offset += 12 + length;
        }

        None
    }

    fn write_data(out: &mut Vec<u8>, image: &WriterImage, sequence: Option<u32>, data: &[u8]) -> u32 {
        let max_len = image.max_chunk_len.unwrap_or(data.len()).max(1);
        let mut next_sequence = sequence.unwrap_or(0);

        for part in data.chunks(max_len) {
            match sequence {
                Some(_) => {
                    let mut fdat = next_sequence.to_be_bytes().to_vec();
                    fdat.extend_from_slice(part);
                    Writer::write_chunk(out, b"fdAT", &fdat);
                    next_sequence += 1;
                }
                None => Writer::write_chunk(out, b"IDAT", part),
            }
        }

        next_sequence
    }

    fn validate_pixel_count(image: &WriterImage) -> Result<(), Error> {
        if image.frames.is_empty() && image.static_image.is_none() {
            return Err(Error::new(ErrorKind::InvalidInput, "Image has no frames"));
        }

        let header = &image.header;
        let expected = |width: u32, height: u32| header.row_bytes(width as usize) * height as usize;

        if let Some(pixels) = &image.static_image {
            if pixels.len() != expected(header.width, header.height) {
                return Err(Error::new(ErrorKind::InvalidInput, "Static image pixel count mismatch"));
            }
        }

        for (i, frame) in image.frames.iter().enumerate() {
            if frame.pixels.len() != expected(frame.width, frame.height) {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("Frame {} pixel count mismatch", i),
                ));
            }
        }

        Ok(())
    }
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
