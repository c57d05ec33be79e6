use super::super::{ImageFormat, NativeResult};
use crate::cl;
use half::f16;

fn channel_count(order: u32) -> Option<usize> {
    match order {
        cl::R | cl::A | cl::INTENSITY | cl::LUMINANCE => Some(1),
        cl::RG | cl::RA => Some(2),
        cl::RGB => Some(3),
        cl::RGBA | cl::BGRA | cl::ARGB => Some(4),
        _ => None,
    }
}

/// Indices into an (r, g, b, a) color of the channels stored by `order`, in memory order.
fn channel_indices(order: u32) -> Option<&'static [usize]> {
    Some(match order {
        cl::R | cl::INTENSITY | cl::LUMINANCE => &[0],
        cl::A => &[3],
        cl::RG => &[0, 1],
        cl::RA => &[0, 3],
        cl::RGB => &[0, 1, 2],
        cl::RGBA => &[0, 1, 2, 3],
        cl::BGRA => &[2, 1, 0, 3],
        cl::ARGB => &[3, 0, 1, 2],
        _ => return None,
    })
}

pub(super) fn element_size(format: &ImageFormat) -> Option<usize> {
    let channels = channel_count(format.channel_order)?;
    let size = match format.channel_data_type {
        cl::UNORM_SHORT_565 | cl::UNORM_SHORT_555 => return Some(2),
        cl::UNORM_INT_101010 => return Some(4),
        cl::SNORM_INT8 | cl::UNORM_INT8 | cl::SIGNED_INT8 | cl::UNSIGNED_INT8 => 1,
        cl::SNORM_INT16 | cl::UNORM_INT16 | cl::SIGNED_INT16 | cl::UNSIGNED_INT16 | cl::HALF_FLOAT => 2,
        cl::SIGNED_INT32 | cl::UNSIGNED_INT32 | cl::FLOAT => 4,
        _ => return None,
    };
    Some(channels * size)
}

pub(super) fn supported_formats() -> Vec<ImageFormat> {
    let format = |channel_order, channel_data_type| ImageFormat {
        channel_order,
        channel_data_type,
    };
    let mut formats: Vec<_> = [
        cl::UNORM_INT8,
        cl::UNORM_INT16,
        cl::SIGNED_INT8,
        cl::SIGNED_INT16,
        cl::SIGNED_INT32,
        cl::UNSIGNED_INT8,
        cl::UNSIGNED_INT16,
        cl::UNSIGNED_INT32,
        cl::HALF_FLOAT,
        cl::FLOAT,
    ]
    .into_iter()
    .map(|ty| format(cl::RGBA, ty))
    .collect();
    formats.extend([
        format(cl::BGRA, cl::UNORM_INT8),
        format(cl::R, cl::FLOAT),
        format(cl::R, cl::UNORM_INT8),
        format(cl::R, cl::UNSIGNED_INT8),
        format(cl::R, cl::SIGNED_INT32),
        format(cl::R, cl::UNSIGNED_INT32),
        format(cl::RG, cl::FLOAT),
        format(cl::INTENSITY, cl::FLOAT),
        format(cl::LUMINANCE, cl::FLOAT),
    ]);
    formats
}

/// Encodes a fill color, four 32 bit channel values, as one element of `format`.
///
/// Normalized types are rounded from the float color, integer types saturate.
pub(super) fn encode_fill(format: &ImageFormat, color: &[u8; 16]) -> NativeResult<Vec<u8>> {
    let indices = channel_indices(format.channel_order).ok_or(cl::INVALID_IMAGE_FORMAT_DESCRIPTOR)?;
    let word = |i: usize| [color[4 * i], color[4 * i + 1], color[4 * i + 2], color[4 * i + 3]];
    let float = |i: usize| f32::from_ne_bytes(word(i));
    let int = |i: usize| i32::from_ne_bytes(word(i));
    let uint = |i: usize| u32::from_ne_bytes(word(i));
    let mut bytes = Vec::with_capacity(16);
    for &i in indices {
        match format.channel_data_type {
            cl::FLOAT => bytes.extend(float(i).to_ne_bytes()),
            cl::HALF_FLOAT => bytes.extend(f16::from_f32(float(i)).to_ne_bytes()),
            cl::UNORM_INT8 => bytes.push((float(i).clamp(0., 1.) * 255.).round() as u8),
            cl::UNORM_INT16 => bytes.extend((((float(i).clamp(0., 1.) * 65535.).round()) as u16).to_ne_bytes()),
            cl::SNORM_INT8 => bytes.extend(((float(i).clamp(-1., 1.) * 127.).round() as i8).to_ne_bytes()),
            cl::SNORM_INT16 => bytes.extend(((float(i).clamp(-1., 1.) * 32767.).round() as i16).to_ne_bytes()),
            cl::SIGNED_INT8 => bytes.extend((int(i).clamp(i8::MIN.into(), i8::MAX.into()) as i8).to_ne_bytes()),
            cl::SIGNED_INT16 => bytes.extend((int(i).clamp(i16::MIN.into(), i16::MAX.into()) as i16).to_ne_bytes()),
            cl::SIGNED_INT32 => bytes.extend(int(i).to_ne_bytes()),
            cl::UNSIGNED_INT8 => bytes.push(uint(i).min(u8::MAX.into()) as u8),
            cl::UNSIGNED_INT16 => bytes.extend((uint(i).min(u16::MAX.into()) as u16).to_ne_bytes()),
            cl::UNSIGNED_INT32 => bytes.extend(uint(i).to_ne_bytes()),
            _ => return Err(cl::IMAGE_FORMAT_NOT_SUPPORTED),
        }
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color<T: bytemuck::Pod>(values: [T; 4]) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(bytemuck::cast_slice(&values));
        bytes
    }

    #[test]
    fn element_sizes() {
        let rgba = |ty| ImageFormat {
            channel_order: cl::RGBA,
            channel_data_type: ty,
        };
        assert_eq!(element_size(&rgba(cl::UNORM_INT8)), Some(4));
        assert_eq!(element_size(&rgba(cl::FLOAT)), Some(16));
        assert!(supported_formats().iter().all(|format| element_size(format).is_some()));
    }

    #[test]
    fn fill_colors() {
        let format = |channel_order, channel_data_type| ImageFormat {
            channel_order,
            channel_data_type,
        };
        let bgra = encode_fill(&format(cl::BGRA, cl::UNORM_INT8), &color([1f32, 0.5, 0., 2.])).unwrap();
        assert_eq!(bgra, [0, 128, 255, 255]);
        let clamped = encode_fill(&format(cl::RGBA, cl::SIGNED_INT8), &color([300i32, -300, 7, 0])).unwrap();
        assert_eq!(clamped, [127, 128, 7, 0]);
        let r = encode_fill(&format(cl::R, cl::UNSIGNED_INT32), &color([9u32, 1, 2, 3])).unwrap();
        assert_eq!(r, 9u32.to_ne_bytes());
        let half = encode_fill(&format(cl::RGBA, cl::HALF_FLOAT), &color([1f32, 0., -2., 0.5])).unwrap();
        assert_eq!(&half[..2], &0x3C00u16.to_ne_bytes());
        assert_eq!(
            encode_fill(&format(cl::RGB, cl::UNORM_SHORT_565), &[0; 16]),
            Err(cl::IMAGE_FORMAT_NOT_SUPPORTED)
        );
    }
}
