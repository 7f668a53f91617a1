use crate::{Error, Result};
use std::mem;

/// PNG row filter, stored as the first byte of every predicted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    None,
    Sub,
    Up,
    Avg,
    Paeth,
}

impl TryFrom<u8> for FilterType {
    type Error = Error;

    fn try_from(n: u8) -> Result<FilterType> {
        match n {
            0 => Ok(FilterType::None),
            1 => Ok(FilterType::Sub),
            2 => Ok(FilterType::Up),
            3 => Ok(FilterType::Avg),
            4 => Ok(FilterType::Paeth),
            _ => Err(Error::Decompress(format!("invalid PNG filter type ({})", n))),
        }
    }
}

fn paeth(left: u8, above: u8, upper_left: u8) -> u8 {
    let (a, b, c) = (i16::from(left), i16::from(above), i16::from(upper_left));
    let estimate = a + b - c;
    let (pa, pb, pc) = ((estimate - a).abs(), (estimate - b).abs(), (estimate - c).abs());

    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
}

fn decode_row(filter: FilterType, bpp: usize, previous: &[u8], current: &mut [u8]) {
    let len = current.len();
    let bpp = bpp.min(len);

    match filter {
        FilterType::None => (),
        FilterType::Sub => {
            for i in bpp..len {
                current[i] = current[i].wrapping_add(current[i - bpp]);
            }
        }
        FilterType::Up => {
            for i in 0..len {
                current[i] = current[i].wrapping_add(previous[i]);
            }
        }
        FilterType::Avg => {
            for i in 0..bpp {
                current[i] = current[i].wrapping_add(previous[i] / 2);
            }
            for i in bpp..len {
                let average = (u16::from(current[i - bpp]) + u16::from(previous[i])) / 2;
                current[i] = current[i].wrapping_add(average as u8);
            }
        }
        FilterType::Paeth => {
            for i in 0..bpp {
                current[i] = current[i].wrapping_add(paeth(0, previous[i], 0));
            }
            for i in bpp..len {
                current[i] = current[i].wrapping_add(paeth(current[i - bpp], previous[i], previous[i - bpp]));
            }
        }
    }
}

/// Undo PNG prediction (`/Predictor` 10 to 15). A truncated final row is kept as far as it goes.
pub fn decode_frame(content: &[u8], colors: usize, bits_per_component: usize, columns: usize) -> Result<Vec<u8>> {
    let bytes_per_pixel = (colors * bits_per_component).div_ceil(8).max(1);
    let bytes_per_row = (colors * bits_per_component * columns).div_ceil(8);
    if bytes_per_row == 0 {
        return Err(Error::Decompress("predictor row width is zero".to_string()));
    }

    let mut previous = vec![0_u8; bytes_per_row];
    let mut current = vec![0_u8; bytes_per_row];
    let mut decoded = Vec::with_capacity(content.len());

    for row in content.chunks(bytes_per_row + 1) {
        let filter = FilterType::try_from(row[0])?;
        let data = &row[1..];
        current[..data.len()].copy_from_slice(data);
        current[data.len()..].fill(0);
        decode_row(filter, bytes_per_pixel, &previous, &mut current);
        decoded.extend_from_slice(&current[..data.len()]);
        mem::swap(&mut previous, &mut current);
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn up_filter_accumulates_rows() {
        // Two rows of three bytes, both predicted with "Up".
        let content = [2, 1, 2, 3, 2, 1, 1, 1];
        assert_eq!(decode_frame(&content, 1, 8, 3).unwrap(), vec![1, 2, 3, 2, 3, 4]);
    }

    #[test]
    fn sub_and_paeth_rows() {
        let content = [1, 5, 1, 1, 4, 0, 0, 0];
        // Row 1 (Sub): 5, 6, 7. Row 2 (Paeth) with zero deltas copies the row above.
        assert_eq!(decode_frame(&content, 1, 8, 3).unwrap(), vec![5, 6, 7, 5, 6, 7]);
    }

    #[test]
    fn average_does_not_overflow() {
        let content = [0, 200, 200, 3, 0, 0];
        // First byte averages with a zero left neighbour, the second with 100 and 200.
        assert_eq!(decode_frame(&content, 1, 8, 2).unwrap(), vec![200, 200, 100, 150]);
    }

    #[test]
    fn unknown_filter_byte_is_an_error() {
        assert!(decode_frame(&[9, 0, 0], 1, 8, 2).is_err());
    }
}
