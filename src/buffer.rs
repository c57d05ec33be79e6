/*!
Buffers.

Offsets and sizes are in bytes. [`write`](Buffer::write) and [`read`](Buffer::read) block until
the transfer is complete, the `_async` variants return immediately and require the host memory to
outlive the returned event.
```
# use clkit::{buffer::Buffer, cl, context::Context, queue::Queue};
# fn main() -> clkit::result::Result<()> {
# clkit::runtime::install_host().ok();
let context = Context::new_any()?;
let queue = Queue::builder(&context).build()?;
let x = Buffer::from_slice(&context, cl::MEM_READ_ONLY, &[1f32, 2., 3., 4.])?;
let y = Buffer::new(&context, cl::MEM_READ_WRITE, x.size()?)?;
x.copy(&queue, &y, 0, 0, 16, None)?;
let mut output = [0f32; 4];
y.read(&queue, 0, &mut output, None)?;
assert_eq!(output, [1., 2., 3., 4.]);
# Ok(())
# }
```
*/

use crate::{
    cl,
    context::Context,
    error::{Error, NativeResultExt},
    event::{with_wait_list, Event, WaitList},
    image::Image,
    memobj::{Mapping, MemObj},
    queue::Queue,
    result::Result,
    runtime::{backend, Handle},
};
pub use crate::runtime::BufferRect;
use bytemuck::Pod;
use std::{
    ffi::c_void,
    fmt::{self, Debug},
    ptr,
};

/// A buffer.
#[derive(Clone, PartialEq, Eq, Hash, derive_more::Deref)]
pub struct Buffer {
    #[deref]
    mem: MemObj,
}

impl Buffer {
    /// Creates a buffer of `size` bytes.
    ///
    /// **errors**
    /// - [`Native`](crate::error::ErrorKind::Native): `size` is 0 or exceeds the maximum
    /// allocation of a device (`cl::INVALID_BUFFER_SIZE`), or `flags` require a host pointer.
    pub fn new(context: &Context, flags: u64, size: usize) -> Result<Self> {
        // Safety: no host pointer.
        unsafe { Self::from_host_ptr(context, flags, size, ptr::null_mut()) }
    }
    /// Creates a buffer initialized with `data`.
    ///
    /// `cl::MEM_COPY_HOST_PTR` is added to `flags`.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): `flags` contain
    /// `cl::MEM_USE_HOST_PTR`, which would outlive the borrow of `data`.
    #[track_caller]
    pub fn from_slice<T: Pod>(context: &Context, flags: u64, data: &[T]) -> Result<Self> {
        if flags & cl::MEM_USE_HOST_PTR != 0 {
            return Err(Error::invalid_argument(
                "a buffer created from a slice can not use the host pointer",
            ));
        }
        let bytes: &[u8] = bytemuck::cast_slice(data);
        // Safety: the data is copied during creation.
        unsafe {
            Self::from_host_ptr(
                context,
                flags | cl::MEM_COPY_HOST_PTR,
                bytes.len(),
                bytes.as_ptr() as *mut c_void,
            )
        }
    }
    /// Creates a buffer with an explicit host pointer.
    ///
    /// # Safety
    /// `host_ptr` must be null unless `flags` contain `cl::MEM_USE_HOST_PTR` or
    /// `cl::MEM_COPY_HOST_PTR`, in which case it must be valid for `size` bytes, for the lifetime
    /// of the buffer with `cl::MEM_USE_HOST_PTR`.
    pub unsafe fn from_host_ptr(
        context: &Context,
        flags: u64,
        size: usize,
        host_ptr: *mut c_void,
    ) -> Result<Self> {
        // Safety: guaranteed by the caller.
        let handle = unsafe { backend().create_buffer(context.handle(), flags, size, host_ptr) }
            .or_native(format!("create buffer of {size} bytes"))?;
        Ok(Self {
            mem: MemObj::wrap(handle)?,
        })
    }
    /// Wraps `handle`, taking ownership of one native reference.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): The object is an image.
    #[track_caller]
    pub fn wrap(handle: Handle) -> Result<Self> {
        Self::try_from(MemObj::wrap(handle)?)
    }
    pub fn into_mem_obj(self) -> MemObj {
        self.mem
    }
    /// Writes `data` at `offset` and blocks until complete.
    pub fn write<T: Pod>(
        &self,
        queue: &Queue,
        offset: usize,
        data: &[T],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        // Safety: the write blocks, so data outlives the command.
        unsafe { self.enqueue_write(queue, true, offset, data, wait_list) }
    }
    /// Enqueues a write of `data` at `offset`.
    ///
    /// # Safety
    /// `data` must not be moved, dropped or written until the returned event is complete.
    pub unsafe fn write_async<T: Pod>(
        &self,
        queue: &Queue,
        offset: usize,
        data: &[T],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        // Safety: guaranteed by the caller.
        unsafe { self.enqueue_write(queue, false, offset, data, wait_list) }
    }
    unsafe fn enqueue_write<T: Pod>(
        &self,
        queue: &Queue,
        blocking: bool,
        offset: usize,
        data: &[T],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let handle = with_wait_list(wait_list, |wait| {
            // Safety: bytes is valid until the command completes, see callers.
            unsafe {
                backend().enqueue_write_buffer(
                    queue.handle(),
                    self.handle(),
                    blocking,
                    offset,
                    bytes.len(),
                    bytes.as_ptr() as *const c_void,
                    wait,
                )
            }
            .or_native(format!("write {} bytes to {self:?}", bytes.len()))
        })?;
        queue.register(handle)
    }
    /// Reads into `data` from `offset` and blocks until complete.
    pub fn read<T: Pod>(
        &self,
        queue: &Queue,
        offset: usize,
        data: &mut [T],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        // Safety: the read blocks, so data outlives the command.
        unsafe { self.enqueue_read(queue, true, offset, data, wait_list) }
    }
    /// Enqueues a read into `data` from `offset`.
    ///
    /// # Safety
    /// `data` must not be moved, dropped or accessed until the returned event is complete.
    pub unsafe fn read_async<T: Pod>(
        &self,
        queue: &Queue,
        offset: usize,
        data: &mut [T],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        // Safety: guaranteed by the caller.
        unsafe { self.enqueue_read(queue, false, offset, data, wait_list) }
    }
    unsafe fn enqueue_read<T: Pod>(
        &self,
        queue: &Queue,
        blocking: bool,
        offset: usize,
        data: &mut [T],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(data);
        let len = bytes.len();
        let handle = with_wait_list(wait_list, |wait| {
            // Safety: bytes is valid until the command completes, see callers.
            unsafe {
                backend().enqueue_read_buffer(
                    queue.handle(),
                    self.handle(),
                    blocking,
                    offset,
                    len,
                    bytes.as_mut_ptr() as *mut c_void,
                    wait,
                )
            }
            .or_native(format!("read {len} bytes from {self:?}"))
        })?;
        queue.register(handle)
    }
    /// Enqueues a copy of `size` bytes to `dst`.
    ///
    /// **errors**
    /// - [`Native`](crate::error::ErrorKind::Native): The regions overlap within one buffer
    /// (`cl::MEM_COPY_OVERLAP`) or are out of bounds.
    pub fn copy(
        &self,
        queue: &Queue,
        dst: &Buffer,
        src_offset: usize,
        dst_offset: usize,
        size: usize,
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        let handle = with_wait_list(wait_list, |wait| {
            backend()
                .enqueue_copy_buffer(
                    queue.handle(),
                    self.handle(),
                    dst.handle(),
                    src_offset,
                    dst_offset,
                    size,
                    wait,
                )
                .or_native(format!("copy {size} bytes from {self:?} to {dst:?}"))
        })?;
        queue.register(handle)
    }
    /// Enqueues a fill of `size` bytes at `offset` with `pattern`.
    ///
    /// The pattern size must be a power of two up to 128 bytes that divides `offset` and `size`.
    pub fn fill<T: Pod>(
        &self,
        queue: &Queue,
        pattern: &[T],
        offset: usize,
        size: usize,
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        let pattern: &[u8] = bytemuck::cast_slice(pattern);
        let handle = with_wait_list(wait_list, |wait| {
            backend()
                .enqueue_fill_buffer(queue.handle(), self.handle(), pattern, offset, size, wait)
                .or_native(format!(
                    "fill {size} bytes of {self:?} with a {} byte pattern",
                    pattern.len()
                ))
        })?;
        queue.register(handle)
    }
    /// Maps `size` bytes at `offset` and blocks until the mapping is ready.
    ///
    /// `map_flags` is a bitfield of `cl::MAP_*`.
    pub fn map(
        &self,
        queue: &Queue,
        map_flags: u64,
        offset: usize,
        size: usize,
        wait_list: Option<&mut WaitList>,
    ) -> Result<Mapping> {
        let (event, ptr) = self.enqueue_map(queue, true, map_flags, offset, size, wait_list)?;
        // Safety: the map blocked, so ptr is valid for size bytes.
        Ok(unsafe { Mapping::new(self.mem.clone(), queue, event, ptr, size, (0, 0)) })
    }
    /// Enqueues a map of `size` bytes at `offset`, returning the event and the host pointer.
    ///
    /// # Safety
    /// The pointer must not be accessed before the event is complete, and must be unmapped with
    /// [`MemObj::unmap`].
    pub unsafe fn map_async(
        &self,
        queue: &Queue,
        map_flags: u64,
        offset: usize,
        size: usize,
        wait_list: Option<&mut WaitList>,
    ) -> Result<(Event, *mut c_void)> {
        self.enqueue_map(queue, false, map_flags, offset, size, wait_list)
    }
    fn enqueue_map(
        &self,
        queue: &Queue,
        blocking: bool,
        map_flags: u64,
        offset: usize,
        size: usize,
        wait_list: Option<&mut WaitList>,
    ) -> Result<(Event, *mut c_void)> {
        let (handle, ptr) = with_wait_list(wait_list, |wait| {
            backend()
                .enqueue_map_buffer(
                    queue.handle(),
                    self.handle(),
                    blocking,
                    map_flags,
                    offset,
                    size,
                    wait,
                )
                .or_native(format!("map {size} bytes of {self:?}"))
        })?;
        Ok((queue.register(handle)?, ptr))
    }
    /// Creates a sub-buffer of `size` bytes at `origin`, sharing the storage of this buffer.
    ///
    /// Access flags not given in `flags` are inherited.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): This is a sub-buffer.
    /// - [`Native`](crate::error::ErrorKind::Native): `origin` is not aligned to the base address
    /// alignment of the devices (`cl::MISALIGNED_SUB_BUFFER_OFFSET`), the region is out of bounds
    /// or `flags` conflict with the flags of this buffer (`cl::INVALID_VALUE`).
    #[track_caller]
    pub fn sub_buffer(&self, flags: u64, origin: usize, size: usize) -> Result<Self> {
        if self.parent()?.is_some() {
            return Err(Error::invalid_argument(format!("{self:?} is a sub-buffer")));
        }
        let handle = backend()
            .create_sub_buffer(self.handle(), flags, origin, size)
            .or_native(format!("create sub-buffer of {size} bytes at {origin} of {self:?}"))?;
        Ok(Self {
            mem: MemObj::wrap(handle)?,
        })
    }
    /// The buffer a sub-buffer was created from.
    pub fn parent(&self) -> Result<Option<Buffer>> {
        self.associated_mem_object()?
            .map(Self::try_from)
            .transpose()
    }
    /// Writes `data` to the `region` of this buffer and blocks until complete.
    ///
    /// The region is in bytes, `buffer_rect` and `host_rect` locate it in the buffer and in
    /// `data`. Zero pitches are tightly packed.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): `data` is too small for
    /// `host_rect`.
    pub fn write_rect<T: Pod>(
        &self,
        queue: &Queue,
        buffer_rect: BufferRect,
        host_rect: BufferRect,
        region: [usize; 3],
        data: &[T],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        check_host_rect(&host_rect, region, bytes.len())?;
        let handle = with_wait_list(wait_list, |wait| {
            // Safety: the write blocks and bytes covers the host rectangle.
            unsafe {
                backend().enqueue_write_buffer_rect(
                    queue.handle(),
                    self.handle(),
                    true,
                    buffer_rect,
                    host_rect,
                    region,
                    bytes.as_ptr() as *const c_void,
                    wait,
                )
            }
            .or_native(format!("write {region:?} to {self:?}"))
        })?;
        queue.register(handle)
    }
    /// Reads the `region` of this buffer into `data` and blocks until complete.
    ///
    /// See [`write_rect`](Self::write_rect).
    pub fn read_rect<T: Pod>(
        &self,
        queue: &Queue,
        buffer_rect: BufferRect,
        host_rect: BufferRect,
        region: [usize; 3],
        data: &mut [T],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(data);
        check_host_rect(&host_rect, region, bytes.len())?;
        let handle = with_wait_list(wait_list, |wait| {
            // Safety: the read blocks and bytes covers the host rectangle.
            unsafe {
                backend().enqueue_read_buffer_rect(
                    queue.handle(),
                    self.handle(),
                    true,
                    buffer_rect,
                    host_rect,
                    region,
                    bytes.as_mut_ptr() as *mut c_void,
                    wait,
                )
            }
            .or_native(format!("read {region:?} from {self:?}"))
        })?;
        queue.register(handle)
    }
    /// Enqueues a copy of the `region` at `src_rect` to `dst_rect` of `dst`.
    ///
    /// **errors**
    /// - [`Native`](crate::error::ErrorKind::Native): The rectangles overlap within one buffer
    /// (`cl::MEM_COPY_OVERLAP`) or are out of bounds.
    pub fn copy_rect(
        &self,
        queue: &Queue,
        dst: &Buffer,
        src_rect: BufferRect,
        dst_rect: BufferRect,
        region: [usize; 3],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        let handle = with_wait_list(wait_list, |wait| {
            backend()
                .enqueue_copy_buffer_rect(
                    queue.handle(),
                    self.handle(),
                    dst.handle(),
                    src_rect,
                    dst_rect,
                    region,
                    wait,
                )
                .or_native(format!("copy {region:?} from {self:?} to {dst:?}"))
        })?;
        queue.register(handle)
    }
    /// Enqueues a copy from `src_offset` to the `region` of `image` at `origin`.
    ///
    /// Rows are read tightly packed.
    pub fn copy_to_image(
        &self,
        queue: &Queue,
        image: &Image,
        src_offset: usize,
        origin: [usize; 3],
        region: [usize; 3],
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        let handle = with_wait_list(wait_list, |wait| {
            backend()
                .enqueue_copy_buffer_to_image(
                    queue.handle(),
                    self.handle(),
                    image.handle(),
                    src_offset,
                    origin,
                    region,
                    wait,
                )
                .or_native(format!("copy {self:?} to {image:?}"))
        })?;
        queue.register(handle)
    }
}

/// Checks that a host slice of `len` bytes holds the rectangle.
#[track_caller]
fn check_host_rect(rect: &BufferRect, region: [usize; 3], len: usize) -> Result<()> {
    if region.contains(&0) {
        return Ok(());
    }
    let row_pitch = if rect.row_pitch == 0 { region[0] } else { rect.row_pitch };
    let slice_pitch = if rect.slice_pitch == 0 { row_pitch * region[1] } else { rect.slice_pitch };
    let [x, y, z] = rect.origin;
    let end = (z + region[2] - 1)
        .checked_mul(slice_pitch)
        .zip((y + region[1] - 1).checked_mul(row_pitch))
        .and_then(|(a, b)| a.checked_add(b)?.checked_add(x + region[0]));
    match end {
        Some(end) if end <= len => Ok(()),
        _ => Err(Error::invalid_argument(format!(
            "a host rectangle of {region:?} at {:?} does not fit in {len} bytes",
            rect.origin
        ))),
    }
}

impl TryFrom<MemObj> for Buffer {
    type Error = Error;
    #[track_caller]
    fn try_from(mem: MemObj) -> Result<Self> {
        if mem.is_buffer()? {
            Ok(Self { mem })
        } else {
            Err(Error::invalid_argument(format!("{mem:?} is not a buffer")))
        }
    }
}

impl From<Buffer> for MemObj {
    fn from(buffer: Buffer) -> Self {
        buffer.mem
    }
}

impl Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Buffer({:?})", self.handle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{wait_list, wrapper::memcheck};

    fn setup() -> (Context, Queue) {
        let context = Context::new_gpu().unwrap();
        let queue = Queue::builder(&context).build().unwrap();
        (context, queue)
    }

    #[test]
    fn write_read() {
        let _guard = crate::test_lock();
        {
            let (context, queue) = setup();
            let buffer = Buffer::new(&context, cl::MEM_READ_WRITE, 16).unwrap();
            let write = buffer.write(&queue, 4, &[1u16, 2, 3, 4], None).unwrap();
            assert_eq!(write.status().unwrap(), cl::COMPLETE);
            assert_eq!(write.final_name().unwrap(), "WRITE_BUFFER");
            let mut output = [0xffu8; 16];
            let read = buffer.read(&queue, 0, &mut output, None).unwrap();
            assert_eq!(read.command_type().unwrap(), cl::COMMAND_READ_BUFFER);
            assert_eq!(output, [0, 0, 0, 0, 1, 0, 2, 0, 3, 0, 4, 0, 0, 0, 0, 0]);
            let mut wrong = [0u8; 8];
            let error = buffer.read(&queue, 12, &mut wrong, None).unwrap_err();
            assert_eq!(error.native_code(), Some(cl::INVALID_VALUE));
            queue.finish().unwrap();
        }
        assert!(memcheck());
    }

    #[test]
    fn async_transfers() {
        let _guard = crate::test_lock();
        let (context, queue) = setup();
        let buffer = Buffer::new(&context, cl::MEM_READ_WRITE, 8).unwrap();
        let input = [5u32, 6];
        let mut output = [0u32; 2];
        let write = unsafe { buffer.write_async(&queue, 0, &input, None) }.unwrap();
        let mut wait = wait_list![&write];
        let read = unsafe { buffer.read_async(&queue, 0, &mut output, Some(&mut wait)) }.unwrap();
        assert!(wait.is_empty());
        read.wait().unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn create_errors() {
        let _guard = crate::test_lock();
        let (context, _) = setup();
        let error = Buffer::new(&context, cl::MEM_READ_WRITE, 0).unwrap_err();
        assert_eq!(error.native_code(), Some(cl::INVALID_BUFFER_SIZE));
        let error = Buffer::new(&context, cl::MEM_COPY_HOST_PTR, 4).unwrap_err();
        assert_eq!(error.native_code(), Some(cl::INVALID_HOST_PTR));
        let error = Buffer::from_slice(&context, cl::MEM_USE_HOST_PTR, &[0u8; 4]).unwrap_err();
        assert!(error.kind().is_invalid_argument());
    }

    #[test]
    fn copy_fill() {
        let _guard = crate::test_lock();
        let (context, queue) = setup();
        let src = Buffer::from_slice(&context, cl::MEM_READ_WRITE, &[1u8, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let dst = Buffer::new(&context, cl::MEM_READ_WRITE, 8).unwrap();
        dst.fill(&queue, &[0xaau8, 0xbb], 0, 8, None).unwrap();
        let copy = src.copy(&queue, &dst, 2, 4, 4, None).unwrap();
        assert_eq!(copy.final_name().unwrap(), "COPY_BUFFER");
        let mut output = [0u8; 8];
        dst.read(&queue, 0, &mut output, None).unwrap();
        assert_eq!(output, [0xaa, 0xbb, 0xaa, 0xbb, 3, 4, 5, 6]);
        let error = src.copy(&queue, &src, 0, 2, 4, None).unwrap_err();
        assert_eq!(error.native_code(), Some(cl::MEM_COPY_OVERLAP));
        let error = dst.fill(&queue, &[0u8; 3], 0, 6, None).unwrap_err();
        assert_eq!(error.native_code(), Some(cl::INVALID_VALUE));
    }

    #[test]
    fn map_async_unmap() {
        let _guard = crate::test_lock();
        let (context, queue) = setup();
        let buffer = Buffer::from_slice(&context, cl::MEM_READ_WRITE, &[1u8, 2, 3, 4]).unwrap();
        let (event, ptr) = unsafe { buffer.map_async(&queue, cl::MAP_READ, 1, 2, None) }.unwrap();
        event.wait().unwrap();
        assert_eq!(event.final_name().unwrap(), "MAP_BUFFER");
        let mapped = unsafe { std::slice::from_raw_parts(ptr as *const u8, 2) };
        assert_eq!(mapped, [2, 3]);
        let unmap = unsafe { buffer.unmap(&queue, ptr, None) }.unwrap();
        unmap.wait().unwrap();
        assert_eq!(unmap.final_name().unwrap(), "UNMAP_MEM_OBJECT");
        assert_eq!(buffer.map_count().unwrap(), 0);
    }

    #[test]
    fn typed_wrap() {
        let _guard = crate::test_lock();
        let (context, _) = setup();
        let buffer = Buffer::new(&context, cl::MEM_READ_WRITE, 4).unwrap();
        let mem = MemObj::from(buffer.clone());
        assert_eq!(Buffer::try_from(mem).unwrap(), buffer);
    }

    #[test]
    fn sub_buffer_shares_storage() {
        let _guard = crate::test_lock();
        {
            let (context, queue) = setup();
            let data: Vec<u32> = (0..128).collect();
            let buffer = Buffer::from_slice(&context, cl::MEM_READ_WRITE, &data).unwrap();
            let sub = buffer.sub_buffer(cl::MEM_READ_ONLY, 256, 128).unwrap();
            assert_eq!(sub.size().unwrap(), 128);
            assert_eq!(sub.offset().unwrap(), 256);
            assert_eq!(sub.parent().unwrap(), Some(buffer.clone()));
            assert_eq!(buffer.parent().unwrap(), None);
            let mut output = [0u32; 4];
            sub.read(&queue, 0, &mut output, None).unwrap();
            assert_eq!(output, [64, 65, 66, 67]);
            buffer.write(&queue, 260, &[7u32], None).unwrap();
            sub.read(&queue, 0, &mut output, None).unwrap();
            assert_eq!(output, [64, 7, 66, 67]);
            let error = buffer.sub_buffer(0, 4, 16).unwrap_err();
            assert_eq!(error.native_code(), Some(cl::MISALIGNED_SUB_BUFFER_OFFSET));
            assert!(sub.sub_buffer(0, 0, 16).unwrap_err().kind().is_invalid_argument());
        }
        assert!(memcheck());
    }

    #[test]
    fn rects() {
        let _guard = crate::test_lock();
        let (context, queue) = setup();
        // a 4x4 matrix of bytes
        let buffer = Buffer::from_slice(&context, cl::MEM_READ_WRITE, &[0u8; 16]).unwrap();
        let center = BufferRect::at([1, 1, 0]).pitches(4, 0);
        let write = buffer
            .write_rect(&queue, center, BufferRect::default(), [2, 2, 1], &[1u8, 2, 3, 4], None)
            .unwrap();
        assert_eq!(write.final_name().unwrap(), "WRITE_BUFFER_RECT");
        let mut column = [0u8; 4];
        let left = BufferRect::at([1, 0, 0]).pitches(4, 0);
        buffer
            .read_rect(&queue, left, BufferRect::default(), [1, 4, 1], &mut column, None)
            .unwrap();
        assert_eq!(column, [0, 1, 3, 0]);
        let dst = Buffer::from_slice(&context, cl::MEM_READ_WRITE, &[0u8; 8]).unwrap();
        buffer
            .copy_rect(&queue, &dst, center, BufferRect::default().pitches(2, 0), [2, 2, 1], None)
            .unwrap();
        let mut output = [0u8; 8];
        dst.read(&queue, 0, &mut output, None).unwrap();
        assert_eq!(output, [1, 2, 3, 4, 0, 0, 0, 0]);
        let mut small = [0u8; 3];
        let error = buffer
            .read_rect(&queue, center, BufferRect::default(), [2, 2, 1], &mut small, None)
            .unwrap_err();
        assert!(error.kind().is_invalid_argument());
        let error = buffer
            .copy_rect(&queue, &buffer, center, BufferRect::default().pitches(4, 0), [2, 2, 1], None)
            .unwrap_err();
        assert_eq!(error.native_code(), Some(cl::MEM_COPY_OVERLAP));
    }
}
