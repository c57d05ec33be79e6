use super::{
    Backend, BufferRect, Class, EventCallback, Handle, ImageDesc, ImageFormat, InfoQuery, NativeResult, Status,
};
use crate::{cl, version::ApiVersion};
use libloading::Library;
use std::{
    ffi::{c_char, c_void, CString},
    path::Path,
    ptr,
};

type Raw = *mut c_void;
type EventNotify = unsafe extern "C" fn(Raw, Status, *mut c_void);

#[repr(C)]
struct BufferRegion {
    origin: usize,
    size: usize,
}

macro_rules! cl_api {
    ($($name:ident($($arg:ty),* $(,)?) -> $ret:ty;)*) => {
        #[allow(non_snake_case)]
        struct Api {
            $($name: Option<unsafe extern "C" fn($($arg),*) -> $ret>,)*
        }

        impl Api {
            /// Resolves the symbols, missing symbols are left unset.
            ///
            /// # Safety
            /// `library` must export the symbols with the declared signatures.
            unsafe fn load(library: &Library) -> Self {
                Self {
                    $(
                        $name: unsafe {
                            library.get::<unsafe extern "C" fn($($arg),*) -> $ret>(
                                concat!(stringify!($name), "\0").as_bytes(),
                            )
                        }
                        .ok()
                        .map(|symbol| *symbol),
                    )*
                }
            }
        }
    };
}

cl_api! {
    clGetPlatformIDs(u32, *mut Raw, *mut u32) -> Status;
    clGetDeviceIDs(Raw, u64, u32, *mut Raw, *mut u32) -> Status;
    clGetPlatformInfo(Raw, u32, usize, *mut c_void, *mut usize) -> Status;
    clGetDeviceInfo(Raw, u32, usize, *mut c_void, *mut usize) -> Status;
    clGetContextInfo(Raw, u32, usize, *mut c_void, *mut usize) -> Status;
    clGetCommandQueueInfo(Raw, u32, usize, *mut c_void, *mut usize) -> Status;
    clGetMemObjectInfo(Raw, u32, usize, *mut c_void, *mut usize) -> Status;
    clGetImageInfo(Raw, u32, usize, *mut c_void, *mut usize) -> Status;
    clGetSamplerInfo(Raw, u32, usize, *mut c_void, *mut usize) -> Status;
    clGetProgramInfo(Raw, u32, usize, *mut c_void, *mut usize) -> Status;
    clGetProgramBuildInfo(Raw, Raw, u32, usize, *mut c_void, *mut usize) -> Status;
    clGetKernelInfo(Raw, u32, usize, *mut c_void, *mut usize) -> Status;
    clGetKernelArgInfo(Raw, u32, u32, usize, *mut c_void, *mut usize) -> Status;
    clGetKernelWorkGroupInfo(Raw, Raw, u32, usize, *mut c_void, *mut usize) -> Status;
    clGetEventInfo(Raw, u32, usize, *mut c_void, *mut usize) -> Status;
    clGetEventProfilingInfo(Raw, u32, usize, *mut c_void, *mut usize) -> Status;
    clRetainDevice(Raw) -> Status;
    clReleaseDevice(Raw) -> Status;
    clRetainContext(Raw) -> Status;
    clReleaseContext(Raw) -> Status;
    clRetainCommandQueue(Raw) -> Status;
    clReleaseCommandQueue(Raw) -> Status;
    clRetainMemObject(Raw) -> Status;
    clReleaseMemObject(Raw) -> Status;
    clRetainSampler(Raw) -> Status;
    clReleaseSampler(Raw) -> Status;
    clRetainProgram(Raw) -> Status;
    clReleaseProgram(Raw) -> Status;
    clRetainKernel(Raw) -> Status;
    clReleaseKernel(Raw) -> Status;
    clRetainEvent(Raw) -> Status;
    clReleaseEvent(Raw) -> Status;
    clCreateContext(*const isize, u32, *const Raw, *mut c_void, *mut c_void, *mut Status) -> Raw;
    clGetSupportedImageFormats(Raw, u64, u32, u32, *mut ImageFormat, *mut u32) -> Status;
    clCreateSubDevices(Raw, *const isize, u32, *mut Raw, *mut u32) -> Status;
    clCreateCommandQueue(Raw, Raw, u64, *mut Status) -> Raw;
    clCreateCommandQueueWithProperties(Raw, Raw, *const u64, *mut Status) -> Raw;
    clFlush(Raw) -> Status;
    clFinish(Raw) -> Status;
    clCreateBuffer(Raw, u64, usize, *mut c_void, *mut Status) -> Raw;
    clCreateSubBuffer(Raw, u64, u32, *const c_void, *mut Status) -> Raw;
    clCreateImage(Raw, u64, *const ImageFormat, *const ImageDesc, *mut c_void, *mut Status) -> Raw;
    clCreateSampler(Raw, u32, u32, u32, *mut Status) -> Raw;
    clCreateSamplerWithProperties(Raw, *const u64, *mut Status) -> Raw;
    clCreateProgramWithSource(Raw, u32, *const *const c_char, *const usize, *mut Status) -> Raw;
    clCreateProgramWithBinary(Raw, u32, *const Raw, *const usize, *const *const u8, *mut Status, *mut Status) -> Raw;
    clCreateProgramWithBuiltInKernels(Raw, u32, *const Raw, *const c_char, *mut Status) -> Raw;
    clBuildProgram(Raw, u32, *const Raw, *const c_char, *mut c_void, *mut c_void) -> Status;
    clCompileProgram(Raw, u32, *const Raw, *const c_char, u32, *const Raw, *const *const c_char, *mut c_void, *mut c_void) -> Status;
    clLinkProgram(Raw, u32, *const Raw, *const c_char, u32, *const Raw, *mut c_void, *mut c_void, *mut Status) -> Raw;
    clCreateKernel(Raw, *const c_char, *mut Status) -> Raw;
    clSetKernelArg(Raw, u32, usize, *const c_void) -> Status;
    clCreateUserEvent(Raw, *mut Status) -> Raw;
    clSetUserEventStatus(Raw, Status) -> Status;
    clSetEventCallback(Raw, Status, Option<EventNotify>, *mut c_void) -> Status;
    clWaitForEvents(u32, *const Raw) -> Status;
    clEnqueueReadBuffer(Raw, Raw, u32, usize, usize, *mut c_void, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueWriteBuffer(Raw, Raw, u32, usize, usize, *const c_void, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueCopyBuffer(Raw, Raw, Raw, usize, usize, usize, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueFillBuffer(Raw, Raw, *const c_void, usize, usize, usize, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueReadBufferRect(Raw, Raw, u32, *const usize, *const usize, *const usize, usize, usize, usize, usize, *mut c_void, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueWriteBufferRect(Raw, Raw, u32, *const usize, *const usize, *const usize, usize, usize, usize, usize, *const c_void, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueCopyBufferRect(Raw, Raw, Raw, *const usize, *const usize, *const usize, usize, usize, usize, usize, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueMapBuffer(Raw, Raw, u32, u64, usize, usize, u32, *const Raw, *mut Raw, *mut Status) -> *mut c_void;
    clEnqueueUnmapMemObject(Raw, Raw, *mut c_void, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueReadImage(Raw, Raw, u32, *const usize, *const usize, usize, usize, *mut c_void, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueWriteImage(Raw, Raw, u32, *const usize, *const usize, usize, usize, *const c_void, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueMapImage(Raw, Raw, u32, u64, *const usize, *const usize, *mut usize, *mut usize, u32, *const Raw, *mut Raw, *mut Status) -> *mut c_void;
    clEnqueueCopyImage(Raw, Raw, Raw, *const usize, *const usize, *const usize, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueFillImage(Raw, Raw, *const c_void, *const usize, *const usize, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueCopyImageToBuffer(Raw, Raw, Raw, *const usize, *const usize, usize, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueCopyBufferToImage(Raw, Raw, Raw, usize, *const usize, *const usize, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueMigrateMemObjects(Raw, u32, *const Raw, u64, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueNDRangeKernel(Raw, Raw, u32, *const usize, *const usize, *const usize, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueMarkerWithWaitList(Raw, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueBarrierWithWaitList(Raw, u32, *const Raw, *mut Raw) -> Status;
    clEnqueueMarker(Raw, *mut Raw) -> Status;
    clEnqueueBarrier(Raw) -> Status;
    clEnqueueWaitForEvents(Raw, u32, *const Raw) -> Status;
}

/// Calls a native function, a missing symbol fails with `CL_INVALID_OPERATION`.
macro_rules! call {
    ($self:ident.$name:ident($($arg:expr),* $(,)?)) => {
        match $self.api.$name {
            // Safety: arguments follow the native signature, pointers are valid for the call.
            Some(f) => unsafe { f($($arg),*) },
            None => {
                log::warn!("{} is not exported by the OpenCL library", stringify!($name));
                return Err(cl::INVALID_OPERATION);
            }
        }
    };
}

fn check(status: Status) -> NativeResult<()> {
    if status == cl::SUCCESS {
        Ok(())
    } else {
        Err(status)
    }
}

fn created(raw: Raw, status: Status) -> NativeResult<Handle> {
    check(status)?;
    Handle::from_ptr(raw).ok_or(cl::INVALID_VALUE)
}

/// Handles share the representation of native pointers.
fn raw_handles(handles: &[Handle]) -> *const Raw {
    if handles.is_empty() {
        ptr::null()
    } else {
        handles.as_ptr() as *const Raw
    }
}

fn from_raw(raw: Vec<Raw>) -> Vec<Handle> {
    raw.into_iter().filter_map(Handle::from_ptr).collect()
}

fn c_string(value: &str) -> NativeResult<CString> {
    CString::new(value).map_err(|_| cl::INVALID_VALUE)
}

fn len_u32(len: usize) -> NativeResult<u32> {
    u32::try_from(len).map_err(|_| cl::INVALID_VALUE)
}

/// The system OpenCL library, loaded at run time.
pub(super) struct OpenCl {
    api: Api,
    _library: Library,
}

impl OpenCl {
    /// Loads the library at `path`, or the platform default.
    pub(super) fn load(path: Option<&Path>) -> Result<Self, libloading::Error> {
        let default = if cfg!(windows) {
            "OpenCL.dll"
        } else if cfg!(target_os = "macos") {
            "/System/Library/Frameworks/OpenCL.framework/OpenCL"
        } else {
            "libOpenCL.so.1"
        };
        let path = path.unwrap_or_else(|| Path::new(default));
        // Safety: loading the OpenCL library runs its initializers, which is expected.
        let library = unsafe { Library::new(path) }?;
        // Safety: the symbols are declared with the signatures of the OpenCL headers.
        let api = unsafe { Api::load(&library) };
        log::debug!("loaded OpenCL from {path:?}");
        Ok(Self {
            api,
            _library: library,
        })
    }
    fn enqueued(&self, status: Status, event: Raw) -> NativeResult<Handle> {
        created(event, status)
    }
    /// The version reported by `device`, `None` if it can not be read.
    fn device_version(&self, device: Raw) -> Option<ApiVersion> {
        let api = self.api.clGetDeviceInfo?;
        let mut bytes = [0u8; 256];
        let mut size = 0;
        // Safety: the buffer is valid for its length.
        let status = unsafe {
            api(
                device,
                cl::DEVICE_VERSION,
                bytes.len(),
                bytes.as_mut_ptr() as *mut c_void,
                &mut size,
            )
        };
        if status != cl::SUCCESS {
            return None;
        }
        version_from_bytes(&bytes[..size.min(bytes.len())])
    }
    fn queue_version(&self, queue: Raw) -> Option<ApiVersion> {
        let api = self.api.clGetCommandQueueInfo?;
        let mut device: Raw = ptr::null_mut();
        // Safety: the output is a single handle.
        let status = unsafe {
            api(
                queue,
                cl::QUEUE_DEVICE,
                std::mem::size_of::<Raw>(),
                &mut device as *mut Raw as *mut c_void,
                ptr::null_mut(),
            )
        };
        if status != cl::SUCCESS || device.is_null() {
            return None;
        }
        self.device_version(device)
    }
    /// Whether `device` is a sub device, only those are reference counted.
    fn counts_references(&self, device: Handle) -> bool {
        let Some(api) = self.api.clGetDeviceInfo else {
            return false;
        };
        let mut parent: Raw = ptr::null_mut();
        // Safety: the output is a single handle.
        let status = unsafe {
            api(
                device.as_ptr(),
                cl::DEVICE_PARENT_DEVICE,
                std::mem::size_of::<Raw>(),
                &mut parent as *mut Raw as *mut c_void,
                ptr::null_mut(),
            )
        };
        sub_device_counted(
            self.api.clRetainDevice.is_some() && self.api.clReleaseDevice.is_some(),
            (status == cl::SUCCESS).then_some(parent as usize),
        )
    }
    /// Waits on `wait`, or on all previous commands if empty, then marks with an event.
    fn legacy_sync(&self, queue: Raw, wait: &[Handle], barrier: bool) -> NativeResult<Handle> {
        match legacy_wait(wait, barrier) {
            LegacyWait::Barrier => check(call!(self.clEnqueueBarrier(queue)))?,
            LegacyWait::Events => check(call!(self.clEnqueueWaitForEvents(
                queue,
                len_u32(wait.len())?,
                raw_handles(wait)
            )))?,
            LegacyWait::None => (),
        }
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueMarker(queue, &mut event));
        self.enqueued(status, event)
    }
    /// Whether the wait list variants are available for `queue`.
    fn has_wait_lists(&self, queue: Raw) -> bool {
        self.api.clEnqueueMarkerWithWaitList.is_some()
            && self.api.clEnqueueBarrierWithWaitList.is_some()
            && self
                .queue_version(queue)
                .map_or(true, |version| version >= ApiVersion::new(1, 2))
    }
}

fn version_from_bytes(bytes: &[u8]) -> Option<ApiVersion> {
    let text = std::str::from_utf8(bytes).ok()?;
    ApiVersion::from_version_string(text.trim_end_matches('\0')).ok()
}

/// Root devices, and devices of libraries without sub devices, are not reference counted.
fn sub_device_counted(exported: bool, parent: Option<usize>) -> bool {
    exported && matches!(parent, Some(parent) if parent != 0)
}

/// The zero terminated property list for queue creation.
fn queue_properties(properties: u64) -> [u64; 3] {
    [u64::from(cl::QUEUE_PROPERTIES), properties, 0]
}

#[derive(Debug, Eq, PartialEq)]
enum LegacyWait {
    Barrier,
    Events,
    None,
}

/// The legacy command that replaces the wait list of a marker or barrier.
fn legacy_wait(wait: &[Handle], barrier: bool) -> LegacyWait {
    if !wait.is_empty() {
        LegacyWait::Events
    } else if barrier {
        LegacyWait::Barrier
    } else {
        LegacyWait::None
    }
}

/// Runs a callback registered with `clSetEventCallback`.
unsafe extern "C" fn event_notify(event: Raw, status: Status, data: *mut c_void) {
    // Safety: data is the boxed callback leaked by set_event_callback, the library calls this once.
    let callback = unsafe { Box::from_raw(data as *mut EventCallback) };
    if let Some(event) = Handle::from_ptr(event) {
        callback(event, status);
    }
}

impl Backend for OpenCl {
    fn name(&self) -> &str {
        "opencl"
    }
    fn platform_ids(&self) -> NativeResult<Vec<Handle>> {
        let mut count = 0;
        check(call!(self.clGetPlatformIDs(0, ptr::null_mut(), &mut count)))?;
        let mut raw = vec![ptr::null_mut(); count as usize];
        check(call!(self.clGetPlatformIDs(count, raw.as_mut_ptr(), ptr::null_mut())))?;
        Ok(from_raw(raw))
    }
    fn device_ids(&self, platform: Handle, device_type: u64) -> NativeResult<Vec<Handle>> {
        let mut count = 0;
        check(call!(self.clGetDeviceIDs(
            platform.as_ptr(),
            device_type,
            0,
            ptr::null_mut(),
            &mut count
        )))?;
        let mut raw = vec![ptr::null_mut(); count as usize];
        check(call!(self.clGetDeviceIDs(
            platform.as_ptr(),
            device_type,
            count,
            raw.as_mut_ptr(),
            ptr::null_mut()
        )))?;
        Ok(from_raw(raw))
    }
    fn get_info(&self, query: InfoQuery, param: u32, value: Option<&mut [u8]>) -> NativeResult<usize> {
        let (len, out) = match value {
            Some(value) => (value.len(), value.as_mut_ptr() as *mut c_void),
            None => (0, ptr::null_mut()),
        };
        let mut size = 0;
        let size_ptr = &mut size as *mut usize;
        let status = match query {
            InfoQuery::Platform(h) => call!(self.clGetPlatformInfo(h.as_ptr(), param, len, out, size_ptr)),
            InfoQuery::Device(h) => call!(self.clGetDeviceInfo(h.as_ptr(), param, len, out, size_ptr)),
            InfoQuery::Context(h) => call!(self.clGetContextInfo(h.as_ptr(), param, len, out, size_ptr)),
            InfoQuery::Queue(h) => call!(self.clGetCommandQueueInfo(h.as_ptr(), param, len, out, size_ptr)),
            InfoQuery::MemObj(h) => call!(self.clGetMemObjectInfo(h.as_ptr(), param, len, out, size_ptr)),
            InfoQuery::Image(h) => call!(self.clGetImageInfo(h.as_ptr(), param, len, out, size_ptr)),
            InfoQuery::Sampler(h) => call!(self.clGetSamplerInfo(h.as_ptr(), param, len, out, size_ptr)),
            InfoQuery::Program(h) => call!(self.clGetProgramInfo(h.as_ptr(), param, len, out, size_ptr)),
            InfoQuery::ProgramBuild(h, device) => {
                call!(self.clGetProgramBuildInfo(h.as_ptr(), device.as_ptr(), param, len, out, size_ptr))
            }
            InfoQuery::Kernel(h) => call!(self.clGetKernelInfo(h.as_ptr(), param, len, out, size_ptr)),
            InfoQuery::KernelArg(h, index) => {
                call!(self.clGetKernelArgInfo(h.as_ptr(), index, param, len, out, size_ptr))
            }
            InfoQuery::KernelWorkGroup(h, device) => {
                let device = device.map_or(ptr::null_mut(), Handle::as_ptr);
                call!(self.clGetKernelWorkGroupInfo(h.as_ptr(), device, param, len, out, size_ptr))
            }
            InfoQuery::Event(h) => call!(self.clGetEventInfo(h.as_ptr(), param, len, out, size_ptr)),
            InfoQuery::EventProfiling(h) => {
                call!(self.clGetEventProfilingInfo(h.as_ptr(), param, len, out, size_ptr))
            }
        };
        check(status)?;
        Ok(size)
    }
    fn retain(&self, class: Class, handle: Handle) -> NativeResult<()> {
        let h = handle.as_ptr();
        check(match class {
            Class::Platform => return Ok(()),
            Class::Device if !self.counts_references(handle) => return Ok(()),
            Class::Device => call!(self.clRetainDevice(h)),
            Class::Context => call!(self.clRetainContext(h)),
            Class::Queue => call!(self.clRetainCommandQueue(h)),
            Class::MemObj => call!(self.clRetainMemObject(h)),
            Class::Sampler => call!(self.clRetainSampler(h)),
            Class::Program => call!(self.clRetainProgram(h)),
            Class::Kernel => call!(self.clRetainKernel(h)),
            Class::Event => call!(self.clRetainEvent(h)),
        })
    }
    fn release(&self, class: Class, handle: Handle) -> NativeResult<()> {
        let h = handle.as_ptr();
        check(match class {
            Class::Platform => return Ok(()),
            Class::Device if !self.counts_references(handle) => return Ok(()),
            Class::Device => call!(self.clReleaseDevice(h)),
            Class::Context => call!(self.clReleaseContext(h)),
            Class::Queue => call!(self.clReleaseCommandQueue(h)),
            Class::MemObj => call!(self.clReleaseMemObject(h)),
            Class::Sampler => call!(self.clReleaseSampler(h)),
            Class::Program => call!(self.clReleaseProgram(h)),
            Class::Kernel => call!(self.clReleaseKernel(h)),
            Class::Event => call!(self.clReleaseEvent(h)),
        })
    }
    fn create_context(&self, properties: &[(isize, isize)], devices: &[Handle]) -> NativeResult<Handle> {
        let mut raw_properties: Vec<isize> = properties.iter().flat_map(|(k, v)| [*k, *v]).collect();
        let properties_ptr = if raw_properties.is_empty() {
            ptr::null()
        } else {
            raw_properties.push(0);
            raw_properties.as_ptr()
        };
        let mut status = 0;
        let raw = call!(self.clCreateContext(
            properties_ptr,
            len_u32(devices.len())?,
            raw_handles(devices),
            ptr::null_mut(),
            ptr::null_mut(),
            &mut status
        ));
        created(raw, status)
    }
    fn supported_image_formats(&self, context: Handle, flags: u64, image_type: u32) -> NativeResult<Vec<ImageFormat>> {
        let mut count = 0;
        check(call!(self.clGetSupportedImageFormats(
            context.as_ptr(),
            flags,
            image_type,
            0,
            ptr::null_mut(),
            &mut count
        )))?;
        let mut formats = vec![ImageFormat::default(); count as usize];
        if count > 0 {
            check(call!(self.clGetSupportedImageFormats(
                context.as_ptr(),
                flags,
                image_type,
                count,
                formats.as_mut_ptr(),
                ptr::null_mut()
            )))?;
        }
        Ok(formats)
    }
    fn create_queue(&self, context: Handle, device: Handle, properties: u64) -> NativeResult<Handle> {
        let mut status = 0;
        let with_properties = self.api.clCreateCommandQueueWithProperties.is_some()
            && self
                .device_version(device.as_ptr())
                .map_or(false, |version| version >= ApiVersion::new(2, 0));
        let raw = if with_properties {
            let properties = queue_properties(properties);
            call!(self.clCreateCommandQueueWithProperties(
                context.as_ptr(),
                device.as_ptr(),
                properties.as_ptr(),
                &mut status
            ))
        } else {
            call!(self.clCreateCommandQueue(context.as_ptr(), device.as_ptr(), properties, &mut status))
        };
        created(raw, status)
    }
    fn flush(&self, queue: Handle) -> NativeResult<()> {
        check(call!(self.clFlush(queue.as_ptr())))
    }
    fn finish(&self, queue: Handle) -> NativeResult<()> {
        check(call!(self.clFinish(queue.as_ptr())))
    }
    unsafe fn create_buffer(&self, context: Handle, flags: u64, size: usize, host_ptr: *mut c_void) -> NativeResult<Handle> {
        let mut status = 0;
        let raw = call!(self.clCreateBuffer(context.as_ptr(), flags, size, host_ptr, &mut status));
        created(raw, status)
    }
    unsafe fn create_image(
        &self,
        context: Handle,
        flags: u64,
        format: &ImageFormat,
        desc: &ImageDesc,
        host_ptr: *mut c_void,
    ) -> NativeResult<Handle> {
        let mut status = 0;
        let raw = call!(self.clCreateImage(
            context.as_ptr(),
            flags,
            format as *const ImageFormat,
            desc as *const ImageDesc,
            host_ptr,
            &mut status
        ));
        created(raw, status)
    }
    fn create_sampler(
        &self,
        context: Handle,
        normalized_coords: bool,
        addressing_mode: u32,
        filter_mode: u32,
    ) -> NativeResult<Handle> {
        let mut status = 0;
        let raw = call!(self.clCreateSampler(
            context.as_ptr(),
            u32::from(normalized_coords),
            addressing_mode,
            filter_mode,
            &mut status
        ));
        created(raw, status)
    }
    fn create_sampler_with_properties(&self, context: Handle, properties: &[u64]) -> NativeResult<Handle> {
        let mut status = 0;
        let raw = call!(self.clCreateSamplerWithProperties(context.as_ptr(), properties.as_ptr(), &mut status));
        created(raw, status)
    }
    fn create_program_with_source(&self, context: Handle, sources: &[&str]) -> NativeResult<Handle> {
        let strings: Vec<*const c_char> = sources.iter().map(|s| s.as_ptr() as *const c_char).collect();
        let lengths: Vec<usize> = sources.iter().map(|s| s.len()).collect();
        let mut status = 0;
        let raw = call!(self.clCreateProgramWithSource(
            context.as_ptr(),
            len_u32(sources.len())?,
            strings.as_ptr(),
            lengths.as_ptr(),
            &mut status
        ));
        created(raw, status)
    }
    fn create_program_with_binary(&self, context: Handle, devices: &[Handle], binaries: &[&[u8]]) -> NativeResult<Handle> {
        let pointers: Vec<*const u8> = binaries.iter().map(|b| b.as_ptr()).collect();
        let lengths: Vec<usize> = binaries.iter().map(|b| b.len()).collect();
        let mut binary_status = vec![0; binaries.len()];
        let mut status = 0;
        let raw = call!(self.clCreateProgramWithBinary(
            context.as_ptr(),
            len_u32(devices.len())?,
            raw_handles(devices),
            lengths.as_ptr(),
            pointers.as_ptr(),
            binary_status.as_mut_ptr(),
            &mut status
        ));
        created(raw, status)
    }
    fn create_program_with_built_in_kernels(&self, context: Handle, devices: &[Handle], kernel_names: &str) -> NativeResult<Handle> {
        let names = c_string(kernel_names)?;
        let mut status = 0;
        let raw = call!(self.clCreateProgramWithBuiltInKernels(
            context.as_ptr(),
            len_u32(devices.len())?,
            raw_handles(devices),
            names.as_ptr(),
            &mut status
        ));
        created(raw, status)
    }
    fn build_program(&self, program: Handle, devices: &[Handle], options: &str) -> NativeResult<()> {
        let options = c_string(options)?;
        check(call!(self.clBuildProgram(
            program.as_ptr(),
            len_u32(devices.len())?,
            raw_handles(devices),
            options.as_ptr(),
            ptr::null_mut(),
            ptr::null_mut()
        )))
    }
    fn program_binaries(&self, program: Handle) -> NativeResult<Vec<Vec<u8>>> {
        let mut size = 0;
        check(call!(self.clGetProgramInfo(
            program.as_ptr(),
            cl::PROGRAM_BINARY_SIZES,
            0,
            ptr::null_mut(),
            &mut size
        )))?;
        let mut sizes = vec![0usize; size / std::mem::size_of::<usize>()];
        check(call!(self.clGetProgramInfo(
            program.as_ptr(),
            cl::PROGRAM_BINARY_SIZES,
            size,
            sizes.as_mut_ptr() as *mut c_void,
            ptr::null_mut()
        )))?;
        let mut binaries: Vec<Vec<u8>> = sizes.iter().map(|size| vec![0u8; *size]).collect();
        let mut pointers: Vec<*mut u8> = binaries.iter_mut().map(|b| b.as_mut_ptr()).collect();
        check(call!(self.clGetProgramInfo(
            program.as_ptr(),
            cl::PROGRAM_BINARIES,
            pointers.len() * std::mem::size_of::<*mut u8>(),
            pointers.as_mut_ptr() as *mut c_void,
            ptr::null_mut()
        )))?;
        Ok(binaries)
    }
    fn create_kernel(&self, program: Handle, name: &str) -> NativeResult<Handle> {
        let name = c_string(name)?;
        let mut status = 0;
        let raw = call!(self.clCreateKernel(program.as_ptr(), name.as_ptr(), &mut status));
        created(raw, status)
    }
    unsafe fn set_kernel_arg(&self, kernel: Handle, index: u32, size: usize, value: *const c_void) -> NativeResult<()> {
        check(call!(self.clSetKernelArg(kernel.as_ptr(), index, size, value)))
    }
    fn create_user_event(&self, context: Handle) -> NativeResult<Handle> {
        let mut status = 0;
        let raw = call!(self.clCreateUserEvent(context.as_ptr(), &mut status));
        created(raw, status)
    }
    fn set_user_event_status(&self, event: Handle, status: i32) -> NativeResult<()> {
        check(call!(self.clSetUserEventStatus(event.as_ptr(), status)))
    }
    fn wait_for_events(&self, events: &[Handle]) -> NativeResult<()> {
        check(call!(self.clWaitForEvents(len_u32(events.len())?, raw_handles(events))))
    }
    unsafe fn enqueue_read_buffer(
        &self,
        queue: Handle,
        buffer: Handle,
        blocking: bool,
        offset: usize,
        size: usize,
        ptr: *mut c_void,
        wait: &[Handle],
    ) -> NativeResult<Handle> {
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueReadBuffer(
            queue.as_ptr(),
            buffer.as_ptr(),
            u32::from(blocking),
            offset,
            size,
            ptr,
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
    unsafe fn enqueue_write_buffer(
        &self,
        queue: Handle,
        buffer: Handle,
        blocking: bool,
        offset: usize,
        size: usize,
        ptr: *const c_void,
        wait: &[Handle],
    ) -> NativeResult<Handle> {
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueWriteBuffer(
            queue.as_ptr(),
            buffer.as_ptr(),
            u32::from(blocking),
            offset,
            size,
            ptr,
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
    fn enqueue_copy_buffer(
        &self,
        queue: Handle,
        src: Handle,
        dst: Handle,
        src_offset: usize,
        dst_offset: usize,
        size: usize,
        wait: &[Handle],
    ) -> NativeResult<Handle> {
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueCopyBuffer(
            queue.as_ptr(),
            src.as_ptr(),
            dst.as_ptr(),
            src_offset,
            dst_offset,
            size,
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
    fn enqueue_fill_buffer(
        &self,
        queue: Handle,
        buffer: Handle,
        pattern: &[u8],
        offset: usize,
        size: usize,
        wait: &[Handle],
    ) -> NativeResult<Handle> {
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueFillBuffer(
            queue.as_ptr(),
            buffer.as_ptr(),
            pattern.as_ptr() as *const c_void,
            pattern.len(),
            offset,
            size,
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
    fn enqueue_map_buffer(
        &self,
        queue: Handle,
        buffer: Handle,
        blocking: bool,
        map_flags: u64,
        offset: usize,
        size: usize,
        wait: &[Handle],
    ) -> NativeResult<(Handle, *mut c_void)> {
        let mut event = ptr::null_mut();
        let mut status = 0;
        let mapped = call!(self.clEnqueueMapBuffer(
            queue.as_ptr(),
            buffer.as_ptr(),
            u32::from(blocking),
            map_flags,
            offset,
            size,
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event,
            &mut status
        ));
        Ok((self.enqueued(status, event)?, mapped))
    }
    unsafe fn enqueue_unmap(&self, queue: Handle, mem: Handle, ptr: *mut c_void, wait: &[Handle]) -> NativeResult<Handle> {
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueUnmapMemObject(
            queue.as_ptr(),
            mem.as_ptr(),
            ptr,
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
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
    ) -> NativeResult<Handle> {
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueReadImage(
            queue.as_ptr(),
            image.as_ptr(),
            u32::from(blocking),
            origin.as_ptr(),
            region.as_ptr(),
            row_pitch,
            slice_pitch,
            ptr,
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
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
    ) -> NativeResult<Handle> {
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueWriteImage(
            queue.as_ptr(),
            image.as_ptr(),
            u32::from(blocking),
            origin.as_ptr(),
            region.as_ptr(),
            row_pitch,
            slice_pitch,
            ptr,
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
    fn enqueue_map_image(
        &self,
        queue: Handle,
        image: Handle,
        blocking: bool,
        map_flags: u64,
        origin: [usize; 3],
        region: [usize; 3],
        wait: &[Handle],
    ) -> NativeResult<(Handle, *mut c_void, usize, usize)> {
        let mut event = ptr::null_mut();
        let mut status = 0;
        let mut row_pitch = 0;
        let mut slice_pitch = 0;
        let mapped = call!(self.clEnqueueMapImage(
            queue.as_ptr(),
            image.as_ptr(),
            u32::from(blocking),
            map_flags,
            origin.as_ptr(),
            region.as_ptr(),
            &mut row_pitch,
            &mut slice_pitch,
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event,
            &mut status
        ));
        Ok((self.enqueued(status, event)?, mapped, row_pitch, slice_pitch))
    }
    fn enqueue_copy_image_to_buffer(
        &self,
        queue: Handle,
        image: Handle,
        buffer: Handle,
        origin: [usize; 3],
        region: [usize; 3],
        dst_offset: usize,
        wait: &[Handle],
    ) -> NativeResult<Handle> {
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueCopyImageToBuffer(
            queue.as_ptr(),
            image.as_ptr(),
            buffer.as_ptr(),
            origin.as_ptr(),
            region.as_ptr(),
            dst_offset,
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
    fn enqueue_copy_buffer_to_image(
        &self,
        queue: Handle,
        buffer: Handle,
        image: Handle,
        src_offset: usize,
        origin: [usize; 3],
        region: [usize; 3],
        wait: &[Handle],
    ) -> NativeResult<Handle> {
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueCopyBufferToImage(
            queue.as_ptr(),
            buffer.as_ptr(),
            image.as_ptr(),
            src_offset,
            origin.as_ptr(),
            region.as_ptr(),
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
    fn enqueue_migrate_mem_objects(&self, queue: Handle, mems: &[Handle], flags: u64, wait: &[Handle]) -> NativeResult<Handle> {
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueMigrateMemObjects(
            queue.as_ptr(),
            len_u32(mems.len())?,
            raw_handles(mems),
            flags,
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
    fn enqueue_ndrange_kernel(
        &self,
        queue: Handle,
        kernel: Handle,
        work_dim: u32,
        global_offset: Option<&[usize]>,
        global_size: &[usize],
        local_size: Option<&[usize]>,
        wait: &[Handle],
    ) -> NativeResult<Handle> {
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueNDRangeKernel(
            queue.as_ptr(),
            kernel.as_ptr(),
            work_dim,
            global_offset.map_or(ptr::null(), <[usize]>::as_ptr),
            global_size.as_ptr(),
            local_size.map_or(ptr::null(), <[usize]>::as_ptr),
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
    fn create_sub_devices(&self, device: Handle, properties: &[isize]) -> NativeResult<Vec<Handle>> {
        let mut count = 0;
        check(call!(self.clCreateSubDevices(
            device.as_ptr(),
            properties.as_ptr(),
            0,
            ptr::null_mut(),
            &mut count
        )))?;
        let mut raw = vec![ptr::null_mut(); count as usize];
        check(call!(self.clCreateSubDevices(
            device.as_ptr(),
            properties.as_ptr(),
            count,
            raw.as_mut_ptr(),
            ptr::null_mut()
        )))?;
        Ok(from_raw(raw))
    }
    fn create_sub_buffer(&self, buffer: Handle, flags: u64, origin: usize, size: usize) -> NativeResult<Handle> {
        let region = BufferRegion { origin, size };
        let mut status = 0;
        let raw = call!(self.clCreateSubBuffer(
            buffer.as_ptr(),
            flags,
            cl::BUFFER_CREATE_TYPE_REGION,
            &region as *const BufferRegion as *const c_void,
            &mut status
        ));
        created(raw, status)
    }
    fn compile_program(
        &self,
        program: Handle,
        devices: &[Handle],
        options: &str,
        headers: &[(Handle, &str)],
    ) -> NativeResult<()> {
        let options = c_string(options)?;
        let header_programs: Vec<Handle> = headers.iter().map(|(program, _)| *program).collect();
        let names = headers
            .iter()
            .map(|(_, name)| c_string(name))
            .collect::<NativeResult<Vec<_>>>()?;
        let name_ptrs: Vec<*const c_char> = names.iter().map(|name| name.as_ptr()).collect();
        check(call!(self.clCompileProgram(
            program.as_ptr(),
            len_u32(devices.len())?,
            raw_handles(devices),
            options.as_ptr(),
            len_u32(headers.len())?,
            raw_handles(&header_programs),
            if name_ptrs.is_empty() { ptr::null() } else { name_ptrs.as_ptr() },
            ptr::null_mut(),
            ptr::null_mut()
        )))
    }
    fn link_program(
        &self,
        context: Handle,
        devices: &[Handle],
        options: &str,
        programs: &[Handle],
    ) -> NativeResult<Handle> {
        let options = c_string(options)?;
        let mut status = 0;
        let raw = call!(self.clLinkProgram(
            context.as_ptr(),
            len_u32(devices.len())?,
            raw_handles(devices),
            options.as_ptr(),
            len_u32(programs.len())?,
            raw_handles(programs),
            ptr::null_mut(),
            ptr::null_mut(),
            &mut status
        ));
        created(raw, status)
    }
    fn set_event_callback(&self, event: Handle, status: i32, callback: EventCallback) -> NativeResult<()> {
        let data = Box::into_raw(Box::new(callback)) as *mut c_void;
        let result = match self.api.clSetEventCallback {
            // Safety: event_notify takes ownership of data when it is called.
            Some(f) => check(unsafe { f(event.as_ptr(), status, Some(event_notify), data) }),
            None => {
                log::warn!("clSetEventCallback is not exported by the OpenCL library");
                Err(cl::INVALID_OPERATION)
            }
        };
        if result.is_err() {
            // Safety: the callback was not registered, data is still owned here.
            drop(unsafe { Box::from_raw(data as *mut EventCallback) });
        }
        result
    }
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
    ) -> NativeResult<Handle> {
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueReadBufferRect(
            queue.as_ptr(),
            buffer.as_ptr(),
            u32::from(blocking),
            buffer_rect.origin.as_ptr(),
            host_rect.origin.as_ptr(),
            region.as_ptr(),
            buffer_rect.row_pitch,
            buffer_rect.slice_pitch,
            host_rect.row_pitch,
            host_rect.slice_pitch,
            ptr,
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
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
    ) -> NativeResult<Handle> {
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueWriteBufferRect(
            queue.as_ptr(),
            buffer.as_ptr(),
            u32::from(blocking),
            buffer_rect.origin.as_ptr(),
            host_rect.origin.as_ptr(),
            region.as_ptr(),
            buffer_rect.row_pitch,
            buffer_rect.slice_pitch,
            host_rect.row_pitch,
            host_rect.slice_pitch,
            ptr,
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
    fn enqueue_copy_buffer_rect(
        &self,
        queue: Handle,
        src: Handle,
        dst: Handle,
        src_rect: BufferRect,
        dst_rect: BufferRect,
        region: [usize; 3],
        wait: &[Handle],
    ) -> NativeResult<Handle> {
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueCopyBufferRect(
            queue.as_ptr(),
            src.as_ptr(),
            dst.as_ptr(),
            src_rect.origin.as_ptr(),
            dst_rect.origin.as_ptr(),
            region.as_ptr(),
            src_rect.row_pitch,
            src_rect.slice_pitch,
            dst_rect.row_pitch,
            dst_rect.slice_pitch,
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
    fn enqueue_copy_image(
        &self,
        queue: Handle,
        src: Handle,
        dst: Handle,
        src_origin: [usize; 3],
        dst_origin: [usize; 3],
        region: [usize; 3],
        wait: &[Handle],
    ) -> NativeResult<Handle> {
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueCopyImage(
            queue.as_ptr(),
            src.as_ptr(),
            dst.as_ptr(),
            src_origin.as_ptr(),
            dst_origin.as_ptr(),
            region.as_ptr(),
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
    fn enqueue_fill_image(
        &self,
        queue: Handle,
        image: Handle,
        color: &[u8; 16],
        origin: [usize; 3],
        region: [usize; 3],
        wait: &[Handle],
    ) -> NativeResult<Handle> {
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueFillImage(
            queue.as_ptr(),
            image.as_ptr(),
            color.as_ptr() as *const c_void,
            origin.as_ptr(),
            region.as_ptr(),
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
    fn enqueue_marker(&self, queue: Handle, wait: &[Handle]) -> NativeResult<Handle> {
        if !self.has_wait_lists(queue.as_ptr()) {
            return self.legacy_sync(queue.as_ptr(), wait, false);
        }
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueMarkerWithWaitList(
            queue.as_ptr(),
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
    fn enqueue_barrier(&self, queue: Handle, wait: &[Handle]) -> NativeResult<Handle> {
        if !self.has_wait_lists(queue.as_ptr()) {
            return self.legacy_sync(queue.as_ptr(), wait, true);
        }
        let mut event = ptr::null_mut();
        let status = call!(self.clEnqueueBarrierWithWaitList(
            queue.as_ptr(),
            len_u32(wait.len())?,
            raw_handles(wait),
            &mut event
        ));
        self.enqueued(status, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_devices_not_counted() {
        assert!(!sub_device_counted(true, Some(0)));
        assert!(!sub_device_counted(true, None));
        assert!(!sub_device_counted(false, Some(0x40)));
        assert!(sub_device_counted(true, Some(0x40)));
    }

    #[test]
    fn queue_property_list() {
        let list = queue_properties(cl::QUEUE_PROFILING_ENABLE);
        assert_eq!(list, [0x1093, cl::QUEUE_PROFILING_ENABLE, 0]);
    }

    #[test]
    fn legacy_commands() {
        let event = Handle::from_raw(8).unwrap();
        assert_eq!(legacy_wait(&[], true), LegacyWait::Barrier);
        assert_eq!(legacy_wait(&[], false), LegacyWait::None);
        assert_eq!(legacy_wait(&[event], true), LegacyWait::Events);
        assert_eq!(legacy_wait(&[event], false), LegacyWait::Events);
    }

    #[test]
    fn device_version_bytes() {
        assert_eq!(version_from_bytes(b"OpenCL 1.1 Mesa\0"), Some(ApiVersion::new(1, 1)));
        assert_eq!(version_from_bytes(b"OpenCL 2.0 \0"), Some(ApiVersion::new(2, 0)));
        assert_eq!(version_from_bytes(b"\xff\0"), None);
    }
}
