use crate::log_debug;
use crate::utils::error::{ApngError, ApngResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    None = 0,
    Sub = 1,
    Up = 2,
    Average = 3,
    Paeth = 4,
}

impl FilterType {
    fn from_byte(value: u8, chunk: &str) -> ApngResult<Self> {
        match value {
            0 => Ok(FilterType::None),
            1 => Ok(FilterType::Sub),
            2 => Ok(FilterType::Up),
            3 => Ok(FilterType::Average),
            4 => Ok(FilterType::Paeth),
            _ => Err(ApngError::corrupt(chunk, format!("invalid filter type: {}", value))),
        }
    }
}

fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    // a = left, b = above, c = upper left
    let a = a as i16;
    let b = b as i16;
    let c = c as i16;

    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();

    // Tie-breaking order is fixed by the format
    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}

/// Reverses one scanline's filter in place. `prior` is the previous
/// reconstructed scanline of the same pass, or `None` for the first one.
fn unfilter_row(filter: FilterType, current: &mut [u8], prior: Option<&[u8]>, bytes_per_pixel: usize) {
    let above = |i: usize| prior.map_or(0, |row| row[i]);

    match filter {
        FilterType::None => {}
        FilterType::Sub => {
            for i in bytes_per_pixel..current.len() {
                current[i] = current[i].wrapping_add(current[i - bytes_per_pixel]);
            }
        }
        FilterType::Up => {
            if let Some(prior) = prior {
                for (byte, &up) in current.iter_mut().zip(prior) {
                    *byte = byte.wrapping_add(up);
                }
            }
        }
        FilterType::Average => {
            for i in 0..current.len() {
                let left = if i >= bytes_per_pixel { current[i - bytes_per_pixel] as u16 } else { 0 };
                let avg = ((left + above(i) as u16) >> 1) as u8;
                current[i] = current[i].wrapping_add(avg);
            }
        }
        FilterType::Paeth => {
            for i in 0..current.len() {
                let (left, upper_left) = if i >= bytes_per_pixel {
                    (current[i - bytes_per_pixel], above(i - bytes_per_pixel))
                } else {
                    (0, 0)
                };
                current[i] = current[i].wrapping_add(paeth_predictor(left, above(i), upper_left));
            }
        }
    }
}

/// Number of bytes one row of `width` pixels occupies, without the filter byte.
pub(crate) fn row_bytes(width: u32, bits_per_pixel: usize) -> usize {
    (width as usize * bits_per_pixel + 7) / 8
}

/// Reconstructs `height` filtered scanlines of `width` pixels from the start
/// of `data`.
///
/// Returns the packed rows (no filter bytes) and the number of input bytes
/// consumed, so interlaced passes can be decoded back to back.
pub(crate) fn unfilter_scanlines(
    data: &[u8],
    width: u32,
    height: u32,
    bits_per_pixel: usize,
    chunk: &str,
) -> ApngResult<(Vec<u8>, usize)> {
    if width == 0 || height == 0 {
        return Ok((Vec::new(), 0));
    }

    let bytes_per_pixel = ((bits_per_pixel + 7) / 8).max(1);
    let bytes_per_row = row_bytes(width, bits_per_pixel);
    let stride = bytes_per_row + 1;
    let expected = stride.checked_mul(height as usize).ok_or_else(|| {
        ApngError::UnsupportedFormat(format!("scanline data for {}x{} is too large", width, height))
    })?;

    if data.len() < expected {
        return Err(ApngError::corrupt(
            chunk,
            format!(
                "expected {} bytes of scanline data for {}x{}, got {}",
                expected,
                width,
                height,
                data.len()
            ),
        ));
    }

    let mut output = vec![0u8; bytes_per_row * height as usize];

    for (y, scanline) in data[..expected].chunks_exact(stride).enumerate() {
        let filter = FilterType::from_byte(scanline[0], chunk)?;
        let (done, rest) = output.split_at_mut(y * bytes_per_row);
        let prior = if y == 0 { None } else { Some(&done[(y - 1) * bytes_per_row..]) };
        let current = &mut rest[..bytes_per_row];

        current.copy_from_slice(&scanline[1..]);
        unfilter_row(filter, current, prior, bytes_per_pixel);
    }

    log_debug!("Unfiltered {} scanlines of {} bytes", height, bytes_per_row);

    Ok((output, expected))
}
