/*!
Memory objects.

[`MemObj`] holds what [buffers](crate::buffer::Buffer) and [images](crate::image::Image) have in
common. Both deref to it.

Mapping a memory object returns a [`Mapping`], a view of the mapped region that is unmapped when
dropped or with [`Mapping::unmap`]:
```
# use clkit::{buffer::Buffer, cl, context::Context, queue::Queue};
# fn main() -> clkit::result::Result<()> {
# clkit::runtime::install_host().ok();
# let context = Context::new_any()?;
# let queue = Queue::builder(&context).build()?;
let buffer = Buffer::from_slice(&context, cl::MEM_READ_WRITE, &[1u8, 2, 3, 4])?;
let mut mapping = buffer.map(&queue, cl::MAP_READ | cl::MAP_WRITE, 0, 4, None)?;
assert_eq!(mapping.event().final_name()?, "MAP_BUFFER");
mapping.as_bytes_mut()[0] = 9;
mapping.unmap(None)?.wait()?;
let mut output = [0u8; 4];
buffer.read(&queue, 0, &mut output, None)?;
assert_eq!(output, [9, 2, 3, 4]);
# Ok(())
# }
```
*/

use crate::{
    cl,
    context::{Context, ContextKind},
    error::NativeResultExt,
    event::{with_wait_list, Event, WaitList},
    queue::Queue,
    result::Result,
    runtime::{backend, InfoQuery},
    wrapper::{impl_kind, impl_wrapper, info_getters, Wrapper},
};
use std::{ffi::c_void, slice};

impl_kind!(MemObjKind, MemObj, MemObj, ());

/// A buffer or an image.
#[derive(Clone, derive_more::Deref)]
pub struct MemObj {
    #[deref]
    wrapper: Wrapper<MemObjKind>,
}

impl_wrapper!(MemObj, MemObjKind);

impl MemObj {
    info_getters! {
        /// One of `cl::MEM_OBJECT_*`.
        pub fn mem_type() -> u32 = info_scalar(cl::MEM_TYPE);
        /// Bitfield of `cl::MEM_*` flags.
        pub fn flags() -> u64 = info_scalar(cl::MEM_FLAGS);
        /// The size in bytes.
        pub fn size() -> usize = info_scalar(cl::MEM_SIZE);
        pub fn offset() -> usize = info_scalar(cl::MEM_OFFSET);
    }
    /// The number of active mappings.
    ///
    /// Not cached.
    pub fn map_count(&self) -> Result<u32> {
        self.query_info(InfoQuery::MemObj(self.handle()), cl::MEM_MAP_COUNT)?
            .scalar()
    }
    pub fn context(&self) -> Result<Context> {
        self.info_wrapper::<ContextKind>(cl::MEM_CONTEXT)
            .map(Context::from)
    }
    /// The object a sub-buffer was created from.
    pub fn associated_mem_object(&self) -> Result<Option<MemObj>> {
        match self.info(cl::MEM_ASSOCIATED_MEMOBJECT)?.handle()? {
            Some(handle) => Ok(Some(MemObj::wrap_retained(handle)?)),
            None => Ok(None),
        }
    }
    /// Returns true for buffers.
    pub fn is_buffer(&self) -> Result<bool> {
        Ok(self.mem_type()? == cl::MEM_OBJECT_BUFFER)
    }
    /// Enqueues an unmap of `ptr`.
    ///
    /// # Safety
    /// `ptr` must have been returned by a map of this object that was not unmapped yet, and must
    /// not be accessed after this call.
    pub unsafe fn unmap(
        &self,
        queue: &Queue,
        ptr: *mut c_void,
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        let handle = with_wait_list(wait_list, |wait| {
            // Safety: the caller guarantees ptr is an active mapping of self.
            unsafe { backend().enqueue_unmap(queue.handle(), self.handle(), ptr, wait) }
                .or_native(format!("unmap {self:?}"))
        })?;
        queue.register(handle)
    }
    /// Enqueues a migration of `mem_objs` to the device of `queue`, or to the host with
    /// `cl::MIGRATE_MEM_OBJECT_HOST`.
    pub fn migrate(
        queue: &Queue,
        mem_objs: &[&MemObj],
        flags: u64,
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        let mems: Vec<_> = mem_objs.iter().map(|mem| mem.handle()).collect();
        let handle = with_wait_list(wait_list, |wait| {
            backend()
                .enqueue_migrate_mem_objects(queue.handle(), &mems, flags, wait)
                .or_native(format!("migrate {} memory objects", mems.len()))
        })?;
        queue.register(handle)
    }
}

/// A mapped region of a memory object.
///
/// The region is unmapped on drop. Dropping does not wait for the unmap, use
/// [`unmap`](Self::unmap) to get its event.
pub struct Mapping {
    mem: MemObj,
    queue: Queue,
    ptr: *mut u8,
    len: usize,
    row_pitch: usize,
    slice_pitch: usize,
    event: Event,
    mapped: bool,
}

impl Mapping {
    /// # Safety
    /// `ptr` must be a completed mapping of `mem` valid for `len` bytes.
    pub(crate) unsafe fn new(
        mem: MemObj,
        queue: &Queue,
        event: Event,
        ptr: *mut c_void,
        len: usize,
        (row_pitch, slice_pitch): (usize, usize),
    ) -> Self {
        Self {
            mem,
            queue: queue.clone(),
            ptr: ptr as *mut u8,
            len,
            row_pitch,
            slice_pitch,
            event,
            mapped: true,
        }
    }
    /// The event of the map command.
    pub fn event(&self) -> &Event {
        &self.event
    }
    pub fn mem_obj(&self) -> &MemObj {
        &self.mem
    }
    /// The length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    /// The row pitch of an image mapping, 0 for buffers.
    pub fn row_pitch(&self) -> usize {
        self.row_pitch
    }
    /// The slice pitch of an image mapping, 0 for buffers and 2D images.
    pub fn slice_pitch(&self) -> usize {
        self.slice_pitch
    }
    pub fn as_ptr(&self) -> *mut c_void {
        self.ptr as *mut c_void
    }
    pub fn as_bytes(&self) -> &[u8] {
        // Safety: the mapping is complete and valid for len bytes until unmapped.
        unsafe { slice::from_raw_parts(self.ptr, self.len) }
    }
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // Safety: the mapping is complete and valid for len bytes until unmapped.
        unsafe { slice::from_raw_parts_mut(self.ptr, self.len) }
    }
    /// Enqueues the unmap.
    pub fn unmap(mut self, wait_list: Option<&mut WaitList>) -> Result<Event> {
        self.mapped = false;
        // Safety: ptr is an active mapping of mem and self is consumed.
        unsafe { self.mem.unmap(&self.queue, self.as_ptr(), wait_list) }
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        if self.mapped {
            // Safety: ptr is an active mapping of mem and is not used after drop.
            if let Err(e) = unsafe { self.mem.unmap(&self.queue, self.as_ptr(), None) } {
                log::warn!("{e}");
            }
        }
    }
}

impl std::fmt::Debug for Mapping {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Mapping")
            .field("mem", &self.mem)
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{buffer::Buffer, wrapper::memcheck};

    #[test]
    fn mem_obj_info() {
        let _guard = crate::test_lock();
        {
            let context = Context::new_gpu().unwrap();
            let buffer = Buffer::new(&context, cl::MEM_READ_ONLY, 32).unwrap();
            assert_eq!(buffer.size().unwrap(), 32);
            assert_eq!(buffer.mem_type().unwrap(), cl::MEM_OBJECT_BUFFER);
            assert!(buffer.is_buffer().unwrap());
            assert_ne!(buffer.flags().unwrap() & cl::MEM_READ_ONLY, 0);
            assert_eq!(buffer.offset().unwrap(), 0);
            assert_eq!(buffer.context().unwrap(), context);
            assert_eq!(buffer.map_count().unwrap(), 0);
        }
        assert!(memcheck());
    }

    #[test]
    fn mapping_unmaps_on_drop() {
        let _guard = crate::test_lock();
        {
            let context = Context::new_gpu().unwrap();
            let queue = Queue::builder(&context).build().unwrap();
            let buffer = Buffer::new(&context, cl::MEM_READ_WRITE, 8).unwrap();
            {
                let mut mapping = buffer.map(&queue, cl::MAP_WRITE, 0, 8, None).unwrap();
                assert_eq!(mapping.len(), 8);
                assert_eq!(buffer.map_count().unwrap(), 1);
                mapping.as_bytes_mut().copy_from_slice(&[3; 8]);
            }
            queue.finish().unwrap();
            assert_eq!(buffer.map_count().unwrap(), 0);
            let mut output = [0u8; 8];
            buffer.read(&queue, 0, &mut output, None).unwrap();
            assert_eq!(output, [3; 8]);
        }
        assert!(memcheck());
    }

    #[test]
    fn migrate() {
        let _guard = crate::test_lock();
        let context = Context::new_gpu().unwrap();
        let queue = Queue::builder(&context).build().unwrap();
        let a = Buffer::new(&context, cl::MEM_READ_WRITE, 8).unwrap();
        let b = Buffer::new(&context, cl::MEM_READ_WRITE, 8).unwrap();
        let event = MemObj::migrate(&queue, &[&*a, &*b], 0, None).unwrap();
        assert_eq!(event.final_name().unwrap(), "MIGRATE_MEM_OBJECTS");
        let error = MemObj::migrate(&queue, &[], 0, None).unwrap_err();
        assert_eq!(error.native_code(), Some(cl::INVALID_VALUE));
    }
}
