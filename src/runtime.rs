/*!
The native boundary.

All wrappers reach the native compute API through the process wide [`Backend`]. The backend is
chosen on first use from [`Config`](crate::config::Config), or installed explicitly with
[`install`] before any wrapper is created.

- [`host::HostRuntime`] implements the API in process. It does not execute kernel code.
- `native::OpenCl` (feature "opencl") loads the system OpenCL library at run time.
*/

use crate::{
    config::{BackendKind, Config},
    error::Error,
    result::Result,
};
use bytemuck::{Pod, Zeroable};
use once_cell::sync::OnceCell;
use std::{
    ffi::c_void,
    fmt::{self, Debug},
    num::NonZeroUsize,
};

#[doc(hidden)]
pub mod host;
#[cfg(feature = "opencl")]
mod native;

/// A native status code.
pub type Status = i32;
/// Result of a native call, the error is the native status code.
pub type NativeResult<T> = std::result::Result<T, Status>;

/// An opaque native object handle.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Handle(NonZeroUsize);

impl Handle {
    /// The handle for `raw`, `None` for null.
    pub fn from_raw(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }
    /// The handle for `ptr`, `None` for null.
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        Self::from_raw(ptr as usize)
    }
    /// The raw value.
    pub fn as_raw(self) -> usize {
        self.0.get()
    }
    /// The raw value as a pointer.
    pub fn as_ptr(self) -> *mut c_void {
        self.as_raw() as *mut c_void
    }
}

impl Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Handle({:#x})", self.as_raw())
    }
}

/// Native object classes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, derive_more::Display)]
pub enum Class {
    Platform,
    Device,
    Context,
    Queue,
    MemObj,
    Sampler,
    Program,
    Kernel,
    Event,
}

/// A native info query function and the object(s) it is applied to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum InfoQuery {
    Platform(Handle),
    Device(Handle),
    Context(Handle),
    Queue(Handle),
    MemObj(Handle),
    Image(Handle),
    Sampler(Handle),
    Program(Handle),
    /// Program build info for a device.
    ProgramBuild(Handle, Handle),
    Kernel(Handle),
    /// Kernel argument info for an argument index.
    KernelArg(Handle, u32),
    /// Kernel work group info, the device may be omitted for single device programs.
    KernelWorkGroup(Handle, Option<Handle>),
    Event(Handle),
    EventProfiling(Handle),
}

impl InfoQuery {
    /// The object the query is applied to.
    pub fn handle(&self) -> Handle {
        use InfoQuery::*;
        match *self {
            Platform(h) | Device(h) | Context(h) | Queue(h) | MemObj(h) | Image(h) | Sampler(h)
            | Program(h) | ProgramBuild(h, _) | Kernel(h) | KernelArg(h, _)
            | KernelWorkGroup(h, _) | Event(h) | EventProfiling(h) => h,
        }
    }
}

/// Image channel order and data type.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct ImageFormat {
    pub channel_order: u32,
    pub channel_data_type: u32,
}

/// Image layout.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(C)]
pub struct ImageDesc {
    pub image_type: u32,
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub array_size: usize,
    pub row_pitch: usize,
    pub slice_pitch: usize,
    pub num_mip_levels: u32,
    pub num_samples: u32,
    pub buffer: Option<Handle>,
}

/// A rectangle of a buffer or host region for rect transfers.
///
/// The x origin is in bytes. Zero pitches are computed from the transfer region.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BufferRect {
    pub origin: [usize; 3],
    pub row_pitch: usize,
    pub slice_pitch: usize,
}

impl BufferRect {
    /// A rectangle at `origin` with pitches computed from the region.
    pub fn at(origin: [usize; 3]) -> Self {
        Self {
            origin,
            ..Self::default()
        }
    }
    /// Sets the row and slice pitches.
    pub fn pitches(self, row_pitch: usize, slice_pitch: usize) -> Self {
        Self {
            row_pitch,
            slice_pitch,
            ..self
        }
    }
}

/// Called with the event and its execution status when the event reaches the status it was
/// registered for.
pub type EventCallback = Box<dyn FnOnce(Handle, i32) + Send>;

/// The native API.
///
/// Methods mirror the native functions; handles are passed and returned without changing
/// reference counts, except that created objects are returned with one reference owned by the
/// caller. Enqueue methods return the produced event.
#[allow(clippy::too_many_arguments)]
pub trait Backend: Send + Sync {
    /// A short name for logging.
    fn name(&self) -> &str;
    fn platform_ids(&self) -> NativeResult<Vec<Handle>>;
    fn device_ids(&self, platform: Handle, device_type: u64) -> NativeResult<Vec<Handle>>;
    /// Writes the value of `param` into `value` if provided, returning its size in bytes.
    fn get_info(&self, query: InfoQuery, param: u32, value: Option<&mut [u8]>) -> NativeResult<usize>;
    fn retain(&self, class: Class, handle: Handle) -> NativeResult<()>;
    fn release(&self, class: Class, handle: Handle) -> NativeResult<()>;
    /// `properties` are (name, value) pairs.
    fn create_context(&self, properties: &[(isize, isize)], devices: &[Handle]) -> NativeResult<Handle>;
    fn supported_image_formats(
        &self,
        context: Handle,
        flags: u64,
        image_type: u32,
    ) -> NativeResult<Vec<ImageFormat>>;
    /// `properties` are zero terminated.
    fn create_sub_devices(&self, device: Handle, properties: &[isize]) -> NativeResult<Vec<Handle>>;
    fn create_queue(&self, context: Handle, device: Handle, properties: u64) -> NativeResult<Handle>;
    fn flush(&self, queue: Handle) -> NativeResult<()>;
    fn finish(&self, queue: Handle) -> NativeResult<()>;
    /// # Safety
    /// `host_ptr` must be valid for `size` bytes when `flags` use it.
    unsafe fn create_buffer(
        &self,
        context: Handle,
        flags: u64,
        size: usize,
        host_ptr: *mut c_void,
    ) -> NativeResult<Handle>;
    /// Creates a buffer over `size` bytes of `buffer` starting at `origin`.
    fn create_sub_buffer(
        &self,
        buffer: Handle,
        flags: u64,
        origin: usize,
        size: usize,
    ) -> NativeResult<Handle>;
    /// # Safety
    /// `host_ptr` must be valid for the image described by `desc` when `flags` use it.
    unsafe fn create_image(
        &self,
        context: Handle,
        flags: u64,
        format: &ImageFormat,
        desc: &ImageDesc,
        host_ptr: *mut c_void,
    ) -> NativeResult<Handle>;
    fn create_sampler(
        &self,
        context: Handle,
        normalized_coords: bool,
        addressing_mode: u32,
        filter_mode: u32,
    ) -> NativeResult<Handle>;
    /// `properties` are zero terminated.
    fn create_sampler_with_properties(&self, context: Handle, properties: &[u64]) -> NativeResult<Handle>;
    fn create_program_with_source(&self, context: Handle, sources: &[&str]) -> NativeResult<Handle>;
    fn create_program_with_binary(
        &self,
        context: Handle,
        devices: &[Handle],
        binaries: &[&[u8]],
    ) -> NativeResult<Handle>;
    /// `kernel_names` is a semicolon separated list.
    fn create_program_with_built_in_kernels(
        &self,
        context: Handle,
        devices: &[Handle],
        kernel_names: &str,
    ) -> NativeResult<Handle>;
    /// Builds for all devices of the program if `devices` is empty.
    fn build_program(&self, program: Handle, devices: &[Handle], options: &str) -> NativeResult<()>;
    /// Compiles for all devices of the program if `devices` is empty. `headers` are source
    /// programs paired with the names they are included by.
    fn compile_program(
        &self,
        program: Handle,
        devices: &[Handle],
        options: &str,
        headers: &[(Handle, &str)],
    ) -> NativeResult<()>;
    /// Links compiled programs into a new program.
    fn link_program(
        &self,
        context: Handle,
        devices: &[Handle],
        options: &str,
        programs: &[Handle],
    ) -> NativeResult<Handle>;
    /// The binaries of the program, in the order of its devices.
    fn program_binaries(&self, program: Handle) -> NativeResult<Vec<Vec<u8>>>;
    fn create_kernel(&self, program: Handle, name: &str) -> NativeResult<Handle>;
    /// # Safety
    /// `value` must be null or valid for `size` bytes.
    unsafe fn set_kernel_arg(
        &self,
        kernel: Handle,
        index: u32,
        size: usize,
        value: *const c_void,
    ) -> NativeResult<()>;
    fn create_user_event(&self, context: Handle) -> NativeResult<Handle>;
    fn set_user_event_status(&self, event: Handle, status: i32) -> NativeResult<()>;
    /// Registers `callback` for when `event` reaches `status`, one of
    /// [`SUBMITTED`](crate::cl::SUBMITTED), [`RUNNING`](crate::cl::RUNNING) or
    /// [`COMPLETE`](crate::cl::COMPLETE). Callbacks also run when the event terminates with an
    /// error.
    fn set_event_callback(&self, event: Handle, status: i32, callback: EventCallback) -> NativeResult<()>;
    /// Blocks until all events complete.
    fn wait_for_events(&self, events: &[Handle]) -> NativeResult<()>;
    /// # Safety
    /// `ptr` must be valid for writes of `size` bytes until the command completes.
    unsafe fn enqueue_read_buffer(
        &self,
        queue: Handle,
        buffer: Handle,
        blocking: bool,
        offset: usize,
        size: usize,
        ptr: *mut c_void,
        wait: &[Handle],
    ) -> NativeResult<Handle>;
    /// # Safety
    /// `ptr` must be valid for reads of `size` bytes until the command completes.
    unsafe fn enqueue_write_buffer(
        &self,
        queue: Handle,
        buffer: Handle,
        blocking: bool,
        offset: usize,
        size: usize,
        ptr: *const c_void,
        wait: &[Handle],
    ) -> NativeResult<Handle>;
    fn enqueue_copy_buffer(
        &self,
        queue: Handle,
        src: Handle,
        dst: Handle,
        src_offset: usize,
        dst_offset: usize,
        size: usize,
        wait: &[Handle],
    ) -> NativeResult<Handle>;
    fn enqueue_fill_buffer(
        &self,
        queue: Handle,
        buffer: Handle,
        pattern: &[u8],
        offset: usize,
        size: usize,
        wait: &[Handle],
    ) -> NativeResult<Handle>;
    /// # Safety
    /// `ptr` must be valid for writes of the host rectangle until the command completes.
    unsafe fn enqueue_read_buffer_rect(
        &self,
        queue: Handle,
        buffer: Handle,
        blocking: bool,
        buffer_rect: BufferRect,
        host_rect: BufferRect,
        region: [usize; 3],
        ptr: *mut c_void,
        wait: &[Handle],
    ) -> NativeResult<Handle>;
    /// # Safety
    /// `ptr` must be valid for reads of the host rectangle until the command completes.
    unsafe fn enqueue_write_buffer_rect(
        &self,
        queue: Handle,
        buffer: Handle,
        blocking: bool,
        buffer_rect: BufferRect,
        host_rect: BufferRect,
        region: [usize; 3],
        ptr: *const c_void,
        wait: &[Handle],
    ) -> NativeResult<Handle>;
    fn enqueue_copy_buffer_rect(
        &self,
        queue: Handle,
        src: Handle,
        dst: Handle,
        src_rect: BufferRect,
        dst_rect: BufferRect,
        region: [usize; 3],
        wait: &[Handle],
    ) -> NativeResult<Handle>;
    /// Returns the event and the mapped pointer.
    fn enqueue_map_buffer(
        &self,
        queue: Handle,
        buffer: Handle,
        blocking: bool,
        map_flags: u64,
        offset: usize,
        size: usize,
        wait: &[Handle],
    ) -> NativeResult<(Handle, *mut c_void)>;
    /// # Safety
    /// `ptr` must have been returned by a map of `mem` that was not unmapped yet.
    unsafe fn enqueue_unmap(
        &self,
        queue: Handle,
        mem: Handle,
        ptr: *mut c_void,
        wait: &[Handle],
    ) -> NativeResult<Handle>;
    /// # Safety
    /// `ptr` must be valid for writes of the region until the command completes.
    unsafe fn enqueue_read_image(
        &self,
        queue: Handle,
        image: Handle,
        blocking: bool,
        origin: [usize; 3],
        region: [usize; 3],
        row_pitch: usize,
        slice_pitch: usize,
        ptr: *mut c_void,
        wait: &[Handle],
    ) -> NativeResult<Handle>;
    /// # Safety
    /// `ptr` must be valid for reads of the region until the command completes.
    unsafe fn enqueue_write_image(
        &self,
        queue: Handle,
        image: Handle,
        blocking: bool,
        origin: [usize; 3],
        region: [usize; 3],
        row_pitch: usize,
        slice_pitch: usize,
        ptr: *const c_void,
        wait: &[Handle],
    ) -> NativeResult<Handle>;
    /// Returns the event, the mapped pointer, the row pitch and the slice pitch.
    fn enqueue_map_image(
        &self,
        queue: Handle,
        image: Handle,
        blocking: bool,
        map_flags: u64,
        origin: [usize; 3],
        region: [usize; 3],
        wait: &[Handle],
    ) -> NativeResult<(Handle, *mut c_void, usize, usize)>;
    fn enqueue_copy_image(
        &self,
        queue: Handle,
        src: Handle,
        dst: Handle,
        src_origin: [usize; 3],
        dst_origin: [usize; 3],
        region: [usize; 3],
        wait: &[Handle],
    ) -> NativeResult<Handle>;
    /// `color` holds four channel values of 32 bits each, float, signed or unsigned depending on
    /// the channel data type of the image.
    fn enqueue_fill_image(
        &self,
        queue: Handle,
        image: Handle,
        color: &[u8; 16],
        origin: [usize; 3],
        region: [usize; 3],
        wait: &[Handle],
    ) -> NativeResult<Handle>;
    fn enqueue_copy_image_to_buffer(
        &self,
        queue: Handle,
        image: Handle,
        buffer: Handle,
        origin: [usize; 3],
        region: [usize; 3],
        dst_offset: usize,
        wait: &[Handle],
    ) -> NativeResult<Handle>;
    fn enqueue_copy_buffer_to_image(
        &self,
        queue: Handle,
        buffer: Handle,
        image: Handle,
        src_offset: usize,
        origin: [usize; 3],
        region: [usize; 3],
        wait: &[Handle],
    ) -> NativeResult<Handle>;
    fn enqueue_migrate_mem_objects(
        &self,
        queue: Handle,
        mems: &[Handle],
        flags: u64,
        wait: &[Handle],
    ) -> NativeResult<Handle>;
    fn enqueue_ndrange_kernel(
        &self,
        queue: Handle,
        kernel: Handle,
        work_dim: u32,
        global_offset: Option<&[usize]>,
        global_size: &[usize],
        local_size: Option<&[usize]>,
        wait: &[Handle],
    ) -> NativeResult<Handle>;
    fn enqueue_marker(&self, queue: Handle, wait: &[Handle]) -> NativeResult<Handle>;
    fn enqueue_barrier(&self, queue: Handle, wait: &[Handle]) -> NativeResult<Handle>;
}

static BACKEND: OnceCell<Box<dyn Backend>> = OnceCell::new();

/// The process wide backend, selected from the environment on first use.
pub fn backend() -> &'static dyn Backend {
    BACKEND
        .get_or_init(|| select(&Config::from_env()))
        .as_ref()
}

/// Installs `backend` as the process wide backend.
///
/// **errors**
/// - [`Unsupported`](crate::error::ErrorKind::Unsupported): a backend is already in use.
pub fn install(backend: Box<dyn Backend>) -> Result<()> {
    let name = backend.name().to_string();
    BACKEND
        .set(backend)
        .map_err(|_| Error::unsupported(format!("unable to install backend {name:?}, a backend is already in use")))?;
    log::info!("installed backend {name:?}");
    Ok(())
}

/// Installs the host runtime, see [`install`].
pub fn install_host() -> Result<()> {
    install(Box::new(host::HostRuntime::new()))
}

fn select(config: &Config) -> Box<dyn Backend> {
    let backend: Box<dyn Backend> = match config.backend {
        BackendKind::Host => Box::new(host::HostRuntime::new()),
        BackendKind::OpenCl | BackendKind::Auto => match load_native(config) {
            Some(native) => native,
            None => {
                if config.backend == BackendKind::OpenCl {
                    log::warn!("OpenCL is unavailable, falling back to the host runtime");
                }
                Box::new(host::HostRuntime::new())
            }
        },
    };
    log::info!("using backend {:?}", backend.name());
    backend
}

#[cfg(feature = "opencl")]
fn load_native(config: &Config) -> Option<Box<dyn Backend>> {
    match native::OpenCl::load(config.opencl_library.as_deref()) {
        Ok(opencl) => match opencl.platform_ids() {
            Ok(platforms) if !platforms.is_empty() => Some(Box::new(opencl)),
            Ok(_) | Err(_) => {
                log::debug!("OpenCL loaded but reported no platforms");
                None
            }
        },
        Err(e) => {
            log::debug!("unable to load OpenCL: {e}");
            None
        }
    }
}

#[cfg(not(feature = "opencl"))]
fn load_native(_config: &Config) -> Option<Box<dyn Backend>> {
    None
}

/// Reads `param` with a size query followed by the payload fetch.
pub(crate) fn query_bytes(query: InfoQuery, param: u32) -> NativeResult<Vec<u8>> {
    let backend = backend();
    let size = backend.get_info(query, param, None)?;
    let mut bytes = vec![0u8; size];
    if size > 0 {
        backend.get_info(query, param, Some(&mut bytes))?;
    }
    Ok(bytes)
}

/// Encodes handles as their native representation.
pub(crate) fn handles_to_bytes(handles: &[Handle]) -> Vec<u8> {
    handles
        .iter()
        .flat_map(|h| h.as_raw().to_ne_bytes())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_raw() {
        assert!(Handle::from_raw(0).is_none());
        let h = Handle::from_raw(0x1234).unwrap();
        assert_eq!(h.as_raw(), 0x1234);
        assert_eq!(Handle::from_ptr(h.as_ptr()), Some(h));
        assert_eq!(format!("{h:?}"), "Handle(0x1234)");
        assert_eq!(std::mem::size_of::<Option<Handle>>(), std::mem::size_of::<usize>());
    }

    #[test]
    fn handles_encode_native() {
        let handles = [Handle::from_raw(1).unwrap(), Handle::from_raw(2).unwrap()];
        let bytes = handles_to_bytes(&handles);
        assert_eq!(bytes.len(), 2 * std::mem::size_of::<usize>());
        assert_eq!(&bytes[..std::mem::size_of::<usize>()], &1usize.to_ne_bytes());
    }
}
