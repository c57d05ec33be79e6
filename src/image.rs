/*!
Images.

```
# use clkit::{cl, context::Context, image::Image, queue::Queue, runtime::{ImageDesc, ImageFormat}};
# fn main() -> clkit::result::Result<()> {
# clkit::runtime::install_host().ok();
let context = Context::new_gpu()?;
let queue = Queue::builder(&context).build()?;
let format = ImageFormat {
    channel_order: cl::RGBA,
    channel_data_type: cl::UNORM_INT8,
};
let image = Image::new(&context, cl::MEM_READ_WRITE, format, ImageDesc::image_2d(4, 4))?;
let pixels = [[255u8, 0, 0, 255]; 4];
image.write(&queue, [0, 1, 0], [4, 1, 1], &pixels, None)?;
let mut row = [[0u8; 4]; 4];
image.read(&queue, [0, 1, 0], [4, 1, 1], &mut row, None)?;
assert_eq!(row, pixels);
# Ok(())
# }
```
*/

use crate::{
    buffer::Buffer,
    cl,
    context::Context,
    error::{Error, NativeResultExt},
    event::{with_wait_list, Event, WaitList},
    memobj::{Mapping, MemObj},
    queue::Queue,
    result::Result,
    runtime::{backend, Handle, ImageDesc, ImageFormat, InfoQuery},
};
use bytemuck::Pod;
use std::{
    ffi::c_void,
    fmt::{self, Debug},
    ptr,
};

impl ImageDesc {
    /// A 1D image of `width` pixels.
    pub fn image_1d(width: usize) -> Self {
        Self {
            image_type: cl::MEM_OBJECT_IMAGE1D,
            width,
            ..Self::default()
        }
    }
    /// A 2D image.
    pub fn image_2d(width: usize, height: usize) -> Self {
        Self {
            image_type: cl::MEM_OBJECT_IMAGE2D,
            width,
            height,
            ..Self::default()
        }
    }
    /// A 3D image.
    pub fn image_3d(width: usize, height: usize, depth: usize) -> Self {
        Self {
            image_type: cl::MEM_OBJECT_IMAGE3D,
            width,
            height,
            depth,
            ..Self::default()
        }
    }
    /// The extent in pixels in each dimension, 1 for unused dimensions.
    pub fn extent(&self) -> [usize; 3] {
        match self.image_type {
            cl::MEM_OBJECT_IMAGE1D | cl::MEM_OBJECT_IMAGE1D_BUFFER => [self.width, 1, 1],
            cl::MEM_OBJECT_IMAGE1D_ARRAY => [self.width, self.array_size, 1],
            cl::MEM_OBJECT_IMAGE2D => [self.width, self.height, 1],
            cl::MEM_OBJECT_IMAGE2D_ARRAY => [self.width, self.height, self.array_size],
            _ => [self.width, self.height, self.depth],
        }
    }
}

impl ImageFormat {
    /// The size of a pixel in bytes, `None` for unknown orders or data types.
    pub fn element_size(&self) -> Option<usize> {
        let channels = match self.channel_order {
            cl::R | cl::A | cl::INTENSITY | cl::LUMINANCE => 1,
            cl::RG | cl::RA => 2,
            cl::RGB => 3,
            cl::RGBA | cl::BGRA | cl::ARGB => 4,
            _ => return None,
        };
        let size = match self.channel_data_type {
            cl::UNORM_SHORT_565 | cl::UNORM_SHORT_555 => return Some(2),
            cl::UNORM_INT_101010 => return Some(4),
            cl::SNORM_INT8 | cl::UNORM_INT8 | cl::SIGNED_INT8 | cl::UNSIGNED_INT8 => 1,
            cl::SNORM_INT16
            | cl::UNORM_INT16
            | cl::SIGNED_INT16
            | cl::UNSIGNED_INT16
            | cl::HALF_FLOAT => 2,
            cl::SIGNED_INT32 | cl::UNSIGNED_INT32 | cl::FLOAT => 4,
            _ => return None,
        };
        Some(channels * size)
    }
}

/// An image.
#[derive(Clone, PartialEq, Eq, Hash, derive_more::Deref)]
pub struct Image {
    #[deref]
    mem: MemObj,
}

impl Image {
    /// Creates an image.
    ///
    /// **errors**
    /// - [`Native`](crate::error::ErrorKind::Native): No device of the context supports images
    /// (`cl::INVALID_OPERATION`), the format is not supported or the description is invalid.
    pub fn new(context: &Context, flags: u64, format: ImageFormat, desc: ImageDesc) -> Result<Self> {
        // Safety: no host pointer.
        unsafe { Self::from_host_ptr(context, flags, format, desc, ptr::null_mut()) }
    }
    /// Creates an image initialized with tightly packed `data`.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): `data` is smaller than the
    /// image, `desc` has pitches or `flags` contain `cl::MEM_USE_HOST_PTR`.
    #[track_caller]
    pub fn from_slice<T: Pod>(
        context: &Context,
        flags: u64,
        format: ImageFormat,
        desc: ImageDesc,
        data: &[T],
    ) -> Result<Self> {
        if flags & cl::MEM_USE_HOST_PTR != 0 {
            return Err(Error::invalid_argument(
                "an image created from a slice can not use the host pointer",
            ));
        }
        if desc.row_pitch != 0 || desc.slice_pitch != 0 {
            return Err(Error::invalid_argument(
                "an image created from a slice must be tightly packed",
            ));
        }
        let bytes: &[u8] = bytemuck::cast_slice(data);
        check_len(&format, desc.extent(), bytes.len())?;
        // Safety: the data covers the image and is copied during creation.
        unsafe {
            Self::from_host_ptr(
                context,
                flags | cl::MEM_COPY_HOST_PTR,
                format,
                desc,
                bytes.as_ptr() as *mut c_void,
            )
        }
    }
    /// Creates an image with an explicit host pointer.
    ///
    /// # Safety
    /// See [`Buffer::from_host_ptr`], `host_ptr` must cover the image with the pitches of `desc`.
    pub unsafe fn from_host_ptr(
        context: &Context,
        flags: u64,
        format: ImageFormat,
        desc: ImageDesc,
        host_ptr: *mut c_void,
    ) -> Result<Self> {
        // Safety: guaranteed by the caller.
        let handle =
            unsafe { backend().create_image(context.handle(), flags, &format, &desc, host_ptr) }
                .or_native(format!("create image {format:?} {:?}", desc.extent()))?;
        Ok(Self {
            mem: MemObj::wrap(handle)?,
        })
    }
    /// Wraps `handle`, taking ownership of one native reference.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): The object is a buffer.
    #[track_caller]
    pub fn wrap(handle: Handle) -> Result<Self> {
        Self::try_from(MemObj::wrap(handle)?)
    }
    pub fn into_mem_obj(self) -> MemObj {
        self.mem
    }
    fn image_info<T: Pod>(&self, param: u32) -> Result<T> {
        self.info_of(InfoQuery::Image(self.handle()), param)?
            .scalar()
    }
    pub fn format(&self) -> Result<ImageFormat> {
        self.image_info(cl::IMAGE_FORMAT)
    }
    /// The size of a pixel in bytes.
    pub fn element_size(&self) -> Result<usize> {
        self.image_info(cl::IMAGE_ELEMENT_SIZE)
    }
    pub fn row_pitch(&self) -> Result<usize> {
        self.image_info(cl::IMAGE_ROW_PITCH)
    }
    pub fn slice_pitch(&self) -> Result<usize> {
        self.image_info(cl::IMAGE_SLICE_PITCH)
    }
    pub fn width(&self) -> Result<usize> {
        self.image_info(cl::IMAGE_WIDTH)
    }
    pub fn height(&self) -> Result<usize> {
        self.image_info(cl::IMAGE_HEIGHT)
    }
    pub fn depth(&self) -> Result<usize> {
        self.image_info(cl::IMAGE_DEPTH)
    }
    pub fn array_size(&self) -> Result<usize> {
        self.image_info(cl::IMAGE_ARRAY_SIZE)
    }
    /// Writes the tightly packed `data` to `region` at `origin` and blocks until complete.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): `data` is smaller than the
    /// region.
    #[track_caller]
    pub fn write<T: Pod>(
        &self,
        queue: &Queue,
        origin: [usize; 3],
        region: [usize; 3],
        data: &[T],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        check_len(&self.format()?, region, std::mem::size_of_val(data))?;
        // Safety: data covers the region and the write blocks.
        unsafe { self.enqueue_write(queue, true, origin, region, data, wait_list) }
    }
    /// Enqueues a write of the tightly packed `data` to `region` at `origin`.
    ///
    /// # Safety
    /// `data` must not be moved, dropped or written until the returned event is complete.
    #[track_caller]
    pub unsafe fn write_async<T: Pod>(
        &self,
        queue: &Queue,
        origin: [usize; 3],
        region: [usize; 3],
        data: &[T],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        check_len(&self.format()?, region, std::mem::size_of_val(data))?;
        // Safety: guaranteed by the caller.
        unsafe { self.enqueue_write(queue, false, origin, region, data, wait_list) }
    }
    unsafe fn enqueue_write<T: Pod>(
        &self,
        queue: &Queue,
        blocking: bool,
        origin: [usize; 3],
        region: [usize; 3],
        data: &[T],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        let handle = with_wait_list(wait_list, |wait| {
            // Safety: data covers the region until the command completes, see callers.
            unsafe {
                backend().enqueue_write_image(
                    queue.handle(),
                    self.handle(),
                    blocking,
                    origin,
                    region,
                    0,
                    0,
                    data.as_ptr() as *const c_void,
                    wait,
                )
            }
            .or_native(format!("write {region:?} of {self:?}"))
        })?;
        queue.register(handle)
    }
    /// Reads `region` at `origin` into `data`, tightly packed, and blocks until complete.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): `data` is smaller than the
    /// region.
    #[track_caller]
    pub fn read<T: Pod>(
        &self,
        queue: &Queue,
        origin: [usize; 3],
        region: [usize; 3],
        data: &mut [T],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        check_len(&self.format()?, region, std::mem::size_of_val(data))?;
        // Safety: data covers the region and the read blocks.
        unsafe { self.enqueue_read(queue, true, origin, region, data, wait_list) }
    }
    /// Enqueues a read of `region` at `origin` into `data`, tightly packed.
    ///
    /// # Safety
    /// `data` must not be moved, dropped or accessed until the returned event is complete.
    #[track_caller]
    pub unsafe fn read_async<T: Pod>(
        &self,
        queue: &Queue,
        origin: [usize; 3],
        region: [usize; 3],
        data: &mut [T],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        check_len(&self.format()?, region, std::mem::size_of_val(data))?;
        // Safety: guaranteed by the caller.
        unsafe { self.enqueue_read(queue, false, origin, region, data, wait_list) }
    }
    unsafe fn enqueue_read<T: Pod>(
        &self,
        queue: &Queue,
        blocking: bool,
        origin: [usize; 3],
        region: [usize; 3],
        data: &mut [T],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        let handle = with_wait_list(wait_list, |wait| {
            // Safety: data covers the region until the command completes, see callers.
            unsafe {
                backend().enqueue_read_image(
                    queue.handle(),
                    self.handle(),
                    blocking,
                    origin,
                    region,
                    0,
                    0,
                    data.as_mut_ptr() as *mut c_void,
                    wait,
                )
            }
            .or_native(format!("read {region:?} of {self:?}"))
        })?;
        queue.register(handle)
    }
    /// Maps `region` at `origin` and blocks until the mapping is ready.
    ///
    /// The mapping has the row and slice pitch chosen by the runtime.
    pub fn map(
        &self,
        queue: &Queue,
        map_flags: u64,
        origin: [usize; 3],
        region: [usize; 3],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Mapping> {
        let (event, ptr, row_pitch, slice_pitch) =
            self.enqueue_map(queue, true, map_flags, origin, region, wait_list)?;
        let element_size = self.element_size()?;
        let len = region[2].saturating_sub(1) * slice_pitch
            + region[1].saturating_sub(1) * row_pitch
            + region[0] * element_size;
        // Safety: the map blocked, so ptr is valid for the region with the returned pitches.
        Ok(unsafe {
            Mapping::new(
                self.mem.clone(),
                queue,
                event,
                ptr,
                len,
                (row_pitch, slice_pitch),
            )
        })
    }
    /// Enqueues a map of `region` at `origin`, returning the event, the host pointer, the row
    /// pitch and the slice pitch.
    ///
    /// # Safety
    /// See [`Buffer::map_async`].
    pub unsafe fn map_async(
        &self,
        queue: &Queue,
        map_flags: u64,
        origin: [usize; 3],
        region: [usize; 3],
        wait_list: Option<&mut WaitList>,
    ) -> Result<(Event, *mut c_void, usize, usize)> {
        self.enqueue_map(queue, false, map_flags, origin, region, wait_list)
    }
    fn enqueue_map(
        &self,
        queue: &Queue,
        blocking: bool,
        map_flags: u64,
        origin: [usize; 3],
        region: [usize; 3],
        wait_list: Option<&mut WaitList>,
    ) -> Result<(Event, *mut c_void, usize, usize)> {
        let (handle, ptr, row_pitch, slice_pitch) = with_wait_list(wait_list, |wait| {
            backend()
                .enqueue_map_image(
                    queue.handle(),
                    self.handle(),
                    blocking,
                    map_flags,
                    origin,
                    region,
                    wait,
                )
                .or_native(format!("map {region:?} of {self:?}"))
        })?;
        Ok((queue.register(handle)?, ptr, row_pitch, slice_pitch))
    }
    /// Enqueues a copy of `region` at `origin` to `buffer` at `dst_offset`, tightly packed.
    pub fn copy_to_buffer(
        &self,
        queue: &Queue,
        buffer: &Buffer,
        origin: [usize; 3],
        region: [usize; 3],
        dst_offset: usize,
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        let handle = with_wait_list(wait_list, |wait| {
            backend()
                .enqueue_copy_image_to_buffer(
                    queue.handle(),
                    self.handle(),
                    buffer.handle(),
                    origin,
                    region,
                    dst_offset,
                    wait,
                )
                .or_native(format!("copy {self:?} to {buffer:?}"))
        })?;
        queue.register(handle)
    }
    /// Enqueues a copy of `region` at `src_origin` to `dst` at `dst_origin`.
    ///
    /// **errors**
    /// - [`Native`](crate::error::ErrorKind::Native): The formats differ
    /// (`cl::IMAGE_FORMAT_MISMATCH`), or the regions overlap within one image
    /// (`cl::MEM_COPY_OVERLAP`).
    pub fn copy(
        &self,
        queue: &Queue,
        dst: &Image,
        src_origin: [usize; 3],
        dst_origin: [usize; 3],
        region: [usize; 3],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        let handle = with_wait_list(wait_list, |wait| {
            backend()
                .enqueue_copy_image(
                    queue.handle(),
                    self.handle(),
                    dst.handle(),
                    src_origin,
                    dst_origin,
                    region,
                    wait,
                )
                .or_native(format!("copy {region:?} from {self:?} to {dst:?}"))
        })?;
        queue.register(handle)
    }
    /// Enqueues a fill of `region` at `origin` with `color`, converted to the image format.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): The kind of `color` does
    /// not match the channel data type.
    #[track_caller]
    pub fn fill(
        &self,
        queue: &Queue,
        color: FillColor,
        origin: [usize; 3],
        region: [usize; 3],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        let format = self.format()?;
        if !color.matches(&format) {
            return Err(Error::invalid_argument(format!(
                "{color:?} can not fill an image of {format:?}"
            )));
        }
        let bytes = color.to_bytes();
        let handle = with_wait_list(wait_list, |wait| {
            backend()
                .enqueue_fill_image(queue.handle(), self.handle(), &bytes, origin, region, wait)
                .or_native(format!("fill {region:?} of {self:?}"))
        })?;
        queue.register(handle)
    }
}

/// A color for [`Image::fill`].
///
/// Float colors fill float and normalized formats, the integer colors fill the signed and
/// unsigned integer formats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FillColor {
    Float([f32; 4]),
    Int([i32; 4]),
    Uint([u32; 4]),
}

impl FillColor {
    fn matches(&self, format: &ImageFormat) -> bool {
        match format.channel_data_type {
            cl::SIGNED_INT8 | cl::SIGNED_INT16 | cl::SIGNED_INT32 => matches!(self, Self::Int(_)),
            cl::UNSIGNED_INT8 | cl::UNSIGNED_INT16 | cl::UNSIGNED_INT32 => matches!(self, Self::Uint(_)),
            _ => matches!(self, Self::Float(_)),
        }
    }
    fn to_bytes(self) -> [u8; 16] {
        match self {
            Self::Float(x) => bytemuck::cast(x),
            Self::Int(x) => bytemuck::cast(x),
            Self::Uint(x) => bytemuck::cast(x),
        }
    }
}

#[track_caller]
fn check_len(format: &ImageFormat, region: [usize; 3], len: usize) -> Result<()> {
    let element_size = format
        .element_size()
        .ok_or_else(|| Error::unsupported(format!("unknown image format {format:?}")))?;
    let needed = region.iter().product::<usize>() * element_size;
    if len < needed {
        return Err(Error::invalid_argument(format!(
            "host data of {len} bytes is smaller than the region {region:?} of {needed} bytes"
        )));
    }
    Ok(())
}

impl TryFrom<MemObj> for Image {
    type Error = Error;
    #[track_caller]
    fn try_from(mem: MemObj) -> Result<Self> {
        if mem.is_buffer()? {
            Err(Error::invalid_argument(format!("{mem:?} is not an image")))
        } else {
            Ok(Self { mem })
        }
    }
}

impl From<Image> for MemObj {
    fn from(image: Image) -> Self {
        image.mem
    }
}

impl Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Image({:?})", self.handle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dev_container::DevContainer, wrapper::memcheck};

    const RGBA8: ImageFormat = ImageFormat {
        channel_order: cl::RGBA,
        channel_data_type: cl::UNORM_INT8,
    };

    #[test]
    fn image_info() {
        let _guard = crate::test_lock();
        {
            let context = Context::new_gpu().unwrap();
            let image = Image::new(&context, cl::MEM_READ_ONLY, RGBA8, ImageDesc::image_2d(8, 2)).unwrap();
            assert_eq!(image.format().unwrap(), RGBA8);
            assert_eq!(image.element_size().unwrap(), 4);
            assert_eq!(image.row_pitch().unwrap(), 32);
            assert_eq!(image.slice_pitch().unwrap(), 0);
            assert_eq!((image.width().unwrap(), image.height().unwrap()), (8, 2));
            assert_eq!(image.mem_type().unwrap(), cl::MEM_OBJECT_IMAGE2D);
            assert!(Buffer::try_from(image.clone().into_mem_obj()).is_err());
        }
        assert!(memcheck());
    }

    #[test]
    fn image_errors() {
        let _guard = crate::test_lock();
        let accel = Context::new_accel().unwrap();
        assert!(!accel.device(0).unwrap().image_support().unwrap());
        let error = Image::new(&accel, cl::MEM_READ_WRITE, RGBA8, ImageDesc::image_2d(2, 2)).unwrap_err();
        assert_eq!(error.native_code(), Some(cl::INVALID_OPERATION));
        let context = Context::new_gpu().unwrap();
        let format = ImageFormat {
            channel_order: cl::RGB,
            channel_data_type: cl::UNORM_INT8,
        };
        let error = Image::new(&context, cl::MEM_READ_WRITE, format, ImageDesc::image_2d(2, 2)).unwrap_err();
        assert_eq!(error.native_code(), Some(cl::IMAGE_FORMAT_NOT_SUPPORTED));
        let error = Image::from_slice(&context, 0, RGBA8, ImageDesc::image_2d(2, 2), &[0u8; 15]).unwrap_err();
        assert!(error.kind().is_invalid_argument());
    }

    #[test]
    fn image_transfers() {
        let _guard = crate::test_lock();
        let context = Context::new_gpu().unwrap();
        let queue = Queue::builder(&context).build().unwrap();
        let pixels: Vec<u32> = (0..16).collect();
        let image = Image::from_slice(&context, cl::MEM_READ_WRITE, RGBA8, ImageDesc::image_2d(4, 4), &pixels).unwrap();
        let mut block = [0u32; 4];
        let read = image.read(&queue, [1, 1, 0], [2, 2, 1], &mut block, None).unwrap();
        assert_eq!(read.final_name().unwrap(), "READ_IMAGE");
        assert_eq!(block, [5, 6, 9, 10]);
        let mut small = [0u32; 3];
        assert!(image.read(&queue, [0, 0, 0], [2, 2, 1], &mut small, None).is_err());

        let buffer = Buffer::new(&context, cl::MEM_READ_WRITE, 16).unwrap();
        image.copy_to_buffer(&queue, &buffer, [0, 3, 0], [4, 1, 1], 0, None).unwrap();
        let mut row = [0u32; 4];
        buffer.read(&queue, 0, &mut row, None).unwrap();
        assert_eq!(row, [12, 13, 14, 15]);
        buffer.write(&queue, 0, &[7u32; 4], None).unwrap();
        buffer.copy_to_image(&queue, &image, 0, [0, 0, 0], [4, 1, 1], None).unwrap();
        image.read(&queue, [0, 0, 0], [4, 1, 1], &mut row, None).unwrap();
        assert_eq!(row, [7; 4]);
    }

    #[test]
    fn image_map() {
        let _guard = crate::test_lock();
        let context = Context::new_gpu().unwrap();
        let queue = Queue::builder(&context).build().unwrap();
        let image = Image::new(&context, cl::MEM_READ_WRITE, RGBA8, ImageDesc::image_2d(4, 4)).unwrap();
        {
            let mut mapping = image.map(&queue, cl::MAP_WRITE, [1, 1, 0], [2, 2, 1], None).unwrap();
            assert_eq!(mapping.event().final_name().unwrap(), "MAP_IMAGE");
            assert_eq!(mapping.row_pitch(), 8);
            assert_eq!(mapping.len(), 16);
            mapping.as_bytes_mut().fill(1);
            mapping.unmap(None).unwrap().wait().unwrap();
        }
        let mut pixels = [0u32; 16];
        image.read(&queue, [0, 0, 0], [4, 4, 1], &mut pixels, None).unwrap();
        let set = u32::from_ne_bytes([1; 4]);
        assert_eq!(&pixels[4..8], &[0, set, set, 0]);
    }

    #[test]
    fn image_copy_fill() {
        let _guard = crate::test_lock();
        let context = Context::new_gpu().unwrap();
        let queue = Queue::builder(&context).build().unwrap();
        let a = Image::new(&context, cl::MEM_READ_WRITE, RGBA8, ImageDesc::image_2d(4, 4)).unwrap();
        let b = Image::new(&context, cl::MEM_READ_WRITE, RGBA8, ImageDesc::image_2d(4, 4)).unwrap();
        let fill = a
            .fill(&queue, FillColor::Float([1., 0., 0., 1.]), [0; 3], [4, 4, 1], None)
            .unwrap();
        assert_eq!(fill.final_name().unwrap(), "FILL_IMAGE");
        b.fill(&queue, FillColor::Float([0.; 4]), [0; 3], [4, 4, 1], None).unwrap();
        let copy = a.copy(&queue, &b, [0; 3], [1, 1, 0], [2, 1, 1], None).unwrap();
        assert_eq!(copy.final_name().unwrap(), "COPY_IMAGE");
        let mut row = [[0u8; 4]; 4];
        b.read(&queue, [0, 1, 0], [4, 1, 1], &mut row, None).unwrap();
        assert_eq!(row, [[0; 4], [255, 0, 0, 255], [255, 0, 0, 255], [0; 4]]);
        let error = a.fill(&queue, FillColor::Uint([1; 4]), [0; 3], [1, 1, 1], None).unwrap_err();
        assert!(error.kind().is_invalid_argument());
        let error = a.copy(&queue, &a, [0; 3], [1, 0, 0], [2, 2, 1], None).unwrap_err();
        assert_eq!(error.native_code(), Some(cl::MEM_COPY_OVERLAP));
        let float = ImageFormat {
            channel_order: cl::RGBA,
            channel_data_type: cl::FLOAT,
        };
        let c = Image::new(&context, cl::MEM_READ_WRITE, float, ImageDesc::image_2d(4, 4)).unwrap();
        let error = a.copy(&queue, &c, [0; 3], [0; 3], [1, 1, 1], None).unwrap_err();
        assert_eq!(error.native_code(), Some(cl::IMAGE_FORMAT_MISMATCH));
    }
}
