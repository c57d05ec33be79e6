use super::super::{BufferRect, ImageDesc, ImageFormat, NativeResult};
use crate::cl;

#[derive(Clone, Copy)]
pub(super) struct ImageInfo {
    pub(super) format: ImageFormat,
    pub(super) desc: ImageDesc,
    pub(super) element_size: usize,
    pub(super) dims: [usize; 3],
}

impl ImageInfo {
    pub(super) fn row_pitch(&self) -> usize {
        self.dims[0] * self.element_size
    }
    pub(super) fn slice_pitch(&self) -> usize {
        self.row_pitch() * self.dims[1]
    }
    pub(super) fn check_region(&self, origin: [usize; 3], region: [usize; 3]) -> NativeResult<()> {
        for i in 0..3 {
            if region[i] == 0 || origin[i] + region[i] > self.dims[i] {
                return Err(cl::INVALID_VALUE);
            }
        }
        Ok(())
    }
    /// Calls `f(image_offset, host_offset, len)` for each row of the region.
    pub(super) fn for_each_row(
        &self,
        origin: [usize; 3],
        region: [usize; 3],
        host_row_pitch: usize,
        host_slice_pitch: usize,
        mut f: impl FnMut(usize, usize, usize),
    ) {
        let len = region[0] * self.element_size;
        for z in 0..region[2] {
            for y in 0..region[1] {
                let image_offset = (origin[2] + z) * self.slice_pitch()
                    + (origin[1] + y) * self.row_pitch()
                    + origin[0] * self.element_size;
                let host_offset = z * host_slice_pitch + y * host_row_pitch;
                f(image_offset, host_offset, len);
            }
        }
    }
    /// Host pitches, zero selects the tight pitch.
    pub(super) fn host_pitches(
        &self,
        region: [usize; 3],
        row_pitch: usize,
        slice_pitch: usize,
    ) -> NativeResult<(usize, usize)> {
        let tight_row = region[0] * self.element_size;
        let row_pitch = if row_pitch == 0 { tight_row } else { row_pitch };
        let tight_slice = row_pitch * region[1];
        let slice_pitch = if slice_pitch == 0 { tight_slice } else { slice_pitch };
        if row_pitch < tight_row || slice_pitch < tight_slice {
            return Err(cl::INVALID_VALUE);
        }
        Ok((row_pitch, slice_pitch))
    }
    /// Reads the region into a tightly packed buffer.
    pub(super) fn read_region(&self, data: &[u8], origin: [usize; 3], region: [usize; 3]) -> Vec<u8> {
        let row = region[0] * self.element_size;
        let mut bytes = vec![0u8; row * region[1] * region[2]];
        self.for_each_row(origin, region, row, row * region[1], |image_offset, host_offset, len| {
            bytes[host_offset..host_offset + len].copy_from_slice(&data[image_offset..image_offset + len]);
        });
        bytes
    }
    /// Writes a tightly packed region.
    pub(super) fn write_region(&self, data: &mut [u8], origin: [usize; 3], region: [usize; 3], bytes: &[u8]) {
        let row = region[0] * self.element_size;
        self.for_each_row(origin, region, row, row * region[1], |image_offset, host_offset, len| {
            data[image_offset..image_offset + len].copy_from_slice(&bytes[host_offset..host_offset + len]);
        });
    }
}

/// Whether two boxes of the same size intersect.
pub(super) fn boxes_overlap(a: [usize; 3], b: [usize; 3], region: [usize; 3]) -> bool {
    (0..3).all(|i| a[i] < b[i] + region[i] && b[i] < a[i] + region[i])
}

/// The rectangle with zero pitches replaced by the tight pitches of `region`.
pub(super) fn rect_pitches(rect: BufferRect, region: [usize; 3]) -> NativeResult<BufferRect> {
    if region.iter().any(|x| *x == 0) {
        return Err(cl::INVALID_VALUE);
    }
    let row_pitch = if rect.row_pitch == 0 { region[0] } else { rect.row_pitch };
    let slice_pitch = if rect.slice_pitch == 0 { row_pitch * region[1] } else { rect.slice_pitch };
    if row_pitch < region[0] || slice_pitch < row_pitch * region[1] {
        return Err(cl::INVALID_VALUE);
    }
    Ok(BufferRect {
        origin: rect.origin,
        row_pitch,
        slice_pitch,
    })
}

/// Offset of row `y` of slice `z`.
fn rect_offset(rect: &BufferRect, y: usize, z: usize) -> usize {
    (rect.origin[2] + z) * rect.slice_pitch + (rect.origin[1] + y) * rect.row_pitch + rect.origin[0]
}

/// End of the last byte of the region, the size a buffer needs to hold it.
pub(super) fn rect_extent(rect: &BufferRect, region: [usize; 3]) -> usize {
    rect_offset(rect, region[1] - 1, region[2] - 1) + region[0]
}

/// Calls `f(a_offset, b_offset, len)` for each row of the region.
pub(super) fn for_each_rect_row(
    a: &BufferRect,
    b: &BufferRect,
    region: [usize; 3],
    mut f: impl FnMut(usize, usize, usize),
) {
    for z in 0..region[2] {
        for y in 0..region[1] {
            f(rect_offset(a, y, z), rect_offset(b, y, z), region[0]);
        }
    }
}

/// Whether any rows of two rectangles, offset by `a_base` and `b_base`, share bytes.
pub(super) fn rects_overlap(
    a: &BufferRect,
    a_base: usize,
    b: &BufferRect,
    b_base: usize,
    region: [usize; 3],
) -> bool {
    let rows = |rect: &BufferRect, base: usize| {
        let mut rows = Vec::with_capacity(region[1] * region[2]);
        for_each_rect_row(rect, rect, region, |offset, _, len| rows.push((base + offset, base + offset + len)));
        rows
    };
    let b_rows = rows(b, b_base);
    rows(a, a_base)
        .iter()
        .any(|(start, end)| b_rows.iter().any(|(b_start, b_end)| start < b_end && b_start < end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_geometry() {
        let region = [4, 2, 1];
        let rect = rect_pitches(BufferRect::at([2, 1, 0]).pitches(8, 0), region).unwrap();
        assert_eq!(rect.slice_pitch, 16);
        assert_eq!(rect_extent(&rect, region), 2 + 2 * 8 + 4);
        let host = rect_pitches(BufferRect::default(), region).unwrap();
        let mut rows = Vec::new();
        for_each_rect_row(&rect, &host, region, |a, b, len| rows.push((a, b, len)));
        assert_eq!(rows, [(10, 0, 4), (18, 4, 4)]);
        assert_eq!(rect_pitches(BufferRect::default().pitches(2, 0), region), Err(cl::INVALID_VALUE));
        assert_eq!(rect_pitches(BufferRect::default(), [4, 0, 1]), Err(cl::INVALID_VALUE));
    }

    #[test]
    fn interleaved_rects_do_not_overlap() {
        let region = [4, 2, 1];
        let even = rect_pitches(BufferRect::at([0, 0, 0]).pitches(8, 0), region).unwrap();
        let odd = rect_pitches(BufferRect::at([4, 0, 0]).pitches(8, 0), region).unwrap();
        assert!(!rects_overlap(&even, 0, &odd, 0, region));
        assert!(rects_overlap(&even, 2, &odd, 0, region));
        assert!(boxes_overlap([0, 0, 0], [1, 1, 0], [2, 2, 1]));
        assert!(!boxes_overlap([0, 0, 0], [2, 0, 0], [2, 2, 1]));
    }
}
