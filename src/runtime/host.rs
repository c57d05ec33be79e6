/*!
An in-process implementation of the native API.

The host runtime exposes two platforms:

| platform | version | devices |
|----------|---------|---------|
| 0 | OpenCL 1.2 | GPU (default), CPU |
| 1 | OpenCL 2.0 | CPU (default), accelerator, CPU |

Objects, reference counts, info queries, transfers, mapping, user events, wait lists and
profiling behave like a conforming implementation. Commands run as soon as their dependencies
complete; commands waiting on user events are deferred until the events are set. Kernels are
validated and timed but their code is not executed. Profiling timestamps are simulated per
device, advancing by a cost derived from the size of each command.
*/

mod compiler;
mod format;
mod layout;
mod partition;

use super::{
    Backend, BufferRect, Class, EventCallback, Handle, ImageDesc, ImageFormat, InfoQuery, NativeResult, Status,
};
use crate::cl;
use bytemuck::Pod;
use compiler::{ArgSig, Binary, KernelSig};
use format::{element_size, encode_fill, supported_formats};
use layout::{boxes_overlap, for_each_rect_row, rect_extent, rect_pitches, rects_overlap, ImageInfo};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::{
    collections::HashMap,
    ffi::c_void,
    mem::size_of,
    ptr,
    sync::atomic::{AtomicUsize, Ordering},
    time::Instant,
};

struct DeviceDesc {
    name: &'static str,
    vendor: &'static str,
    device_type: u64,
    compute_units: u32,
    max_work_group_size: usize,
    max_work_item_sizes: [usize; 3],
    clock_frequency: u32,
    global_mem_size: u64,
    local_mem_size: u64,
    max_mem_alloc_size: u64,
    image_support: bool,
    preferred_multiple: usize,
    built_in_kernels: &'static str,
}

struct PlatformDesc {
    name: &'static str,
    vendor: &'static str,
    version: &'static str,
    c_version: &'static str,
    devices: Vec<DeviceDesc>,
}

const MIB: u64 = 1 << 20;

fn catalog() -> Vec<PlatformDesc> {
    vec![
        PlatformDesc {
            name: "clkit host 1.2",
            vendor: "clkit",
            version: "OpenCL 1.2 clkit-host",
            c_version: "OpenCL C 1.2",
            devices: vec![
                DeviceDesc {
                    name: "clkit host GPU",
                    vendor: "clkit",
                    device_type: cl::DEVICE_TYPE_GPU | cl::DEVICE_TYPE_DEFAULT,
                    compute_units: 16,
                    max_work_group_size: 256,
                    max_work_item_sizes: [256, 256, 64],
                    clock_frequency: 1200,
                    global_mem_size: 1024 * MIB,
                    local_mem_size: 48 * 1024,
                    max_mem_alloc_size: 256 * MIB,
                    image_support: true,
                    preferred_multiple: 32,
                    built_in_kernels: "copy_bytes;fill_bytes",
                },
                DeviceDesc {
                    name: "clkit host CPU",
                    vendor: "clkit",
                    device_type: cl::DEVICE_TYPE_CPU,
                    compute_units: 4,
                    max_work_group_size: 1024,
                    max_work_item_sizes: [1024, 1024, 1024],
                    clock_frequency: 2400,
                    global_mem_size: 2048 * MIB,
                    local_mem_size: 32 * 1024,
                    max_mem_alloc_size: 512 * MIB,
                    image_support: true,
                    preferred_multiple: 8,
                    built_in_kernels: "",
                },
            ],
        },
        PlatformDesc {
            name: "clkit host 2.0",
            vendor: "Host Labs",
            version: "OpenCL 2.0 clkit-host",
            c_version: "OpenCL C 2.0",
            devices: vec![
                DeviceDesc {
                    name: "Host Labs CPU",
                    vendor: "Host Labs",
                    device_type: cl::DEVICE_TYPE_CPU | cl::DEVICE_TYPE_DEFAULT,
                    compute_units: 8,
                    max_work_group_size: 1024,
                    max_work_item_sizes: [1024, 1024, 1024],
                    clock_frequency: 3000,
                    global_mem_size: 4096 * MIB,
                    local_mem_size: 32 * 1024,
                    max_mem_alloc_size: 1024 * MIB,
                    image_support: true,
                    preferred_multiple: 8,
                    built_in_kernels: "",
                },
                DeviceDesc {
                    name: "Host Labs Accelerator",
                    vendor: "Host Labs",
                    device_type: cl::DEVICE_TYPE_ACCELERATOR,
                    compute_units: 2,
                    max_work_group_size: 128,
                    max_work_item_sizes: [128, 128, 128],
                    clock_frequency: 800,
                    global_mem_size: 512 * MIB,
                    local_mem_size: 16 * 1024,
                    max_mem_alloc_size: 128 * MIB,
                    image_support: false,
                    preferred_multiple: 16,
                    built_in_kernels: "fill_bytes",
                },
                DeviceDesc {
                    name: "Host Labs CPU (second socket)",
                    vendor: "Host Labs",
                    device_type: cl::DEVICE_TYPE_CPU,
                    compute_units: 8,
                    max_work_group_size: 1024,
                    max_work_item_sizes: [1024, 1024, 1024],
                    clock_frequency: 3000,
                    global_mem_size: 4096 * MIB,
                    local_mem_size: 32 * 1024,
                    max_mem_alloc_size: 1024 * MIB,
                    image_support: true,
                    preferred_multiple: 8,
                    built_in_kernels: "",
                },
            ],
        },
    ]
}

fn built_in_source(name: &str) -> Option<&'static str> {
    match name {
        "copy_bytes" => Some("__kernel void copy_bytes(__global const uchar* src, __global uchar* dst) {}"),
        "fill_bytes" => Some("__kernel void fill_bytes(__global uchar* dst, uchar value) {}"),
        _ => None,
    }
}

const QUEUE_PROPERTIES: u64 = cl::QUEUE_OUT_OF_ORDER_EXEC_MODE_ENABLE | cl::QUEUE_PROFILING_ENABLE;

/// Alignment in bytes of sub-buffer origins.
const BASE_ADDR_ALIGN: usize = 128;

struct SubDeviceObj {
    parent: Handle,
    root: (usize, usize),
    compute_units: u32,
    partition: Vec<isize>,
}

struct ContextObj {
    platform: Handle,
    devices: Vec<Handle>,
    properties: Vec<isize>,
}

struct QueueObj {
    context: Handle,
    device: Handle,
    properties: u64,
    pending: Vec<Handle>,
}

enum MapLayout {
    Linear {
        offset: usize,
    },
    Image {
        origin: [usize; 3],
        region: [usize; 3],
    },
}

struct Mapping {
    staging: Box<[u8]>,
    write: bool,
    layout: MapLayout,
}

impl Mapping {
    fn ptr(&self) -> usize {
        self.staging.as_ptr() as usize
    }
}

/// The range of a parent buffer a sub-buffer covers.
#[derive(Clone, Copy)]
struct SubRegion {
    parent: Handle,
    origin: usize,
    size: usize,
}

/// A buffer or image. Sub-buffers have no data, they resolve to their parent.
struct MemObj {
    context: Handle,
    flags: u64,
    data: Vec<u8>,
    image: Option<ImageInfo>,
    mappings: Vec<Mapping>,
    region: Option<SubRegion>,
}

struct SamplerObj {
    context: Handle,
    normalized_coords: bool,
    addressing_mode: u32,
    filter_mode: u32,
}

struct Build {
    status: i32,
    options: String,
    log: String,
    binary_type: u32,
    kernels: Vec<KernelSig>,
}

impl Build {
    fn is_executable(&self) -> bool {
        self.status == cl::BUILD_SUCCESS && self.binary_type == cl::PROGRAM_BINARY_TYPE_EXECUTABLE
    }
    fn is_linkable(&self) -> bool {
        self.status == cl::BUILD_SUCCESS
            && matches!(
                self.binary_type,
                cl::PROGRAM_BINARY_TYPE_COMPILED_OBJECT | cl::PROGRAM_BINARY_TYPE_LIBRARY
            )
    }
}

impl Default for Build {
    fn default() -> Self {
        Self {
            status: cl::BUILD_NONE,
            options: String::new(),
            log: String::new(),
            binary_type: cl::PROGRAM_BINARY_TYPE_NONE,
            kernels: Vec::new(),
        }
    }
}

struct ProgramObj {
    context: Handle,
    devices: Vec<Handle>,
    source: Option<String>,
    builds: Vec<Build>,
}

#[derive(Clone)]
enum ArgValue {
    Mem(Option<Handle>),
    Sampler(Handle),
    Local(usize),
    Bytes(Vec<u8>),
}

struct KernelObj {
    program: Handle,
    context: Handle,
    sig: KernelSig,
    args: Vec<Option<ArgValue>>,
}

struct EventObj {
    context: Handle,
    queue: Option<Handle>,
    command_type: u32,
    status: i32,
    profiling: bool,
    times: [u64; 4],
    /// Callbacks and the status they wait for.
    callbacks: Vec<(i32, EventCallback)>,
}

enum Obj {
    Platform(usize),
    Device(usize, usize),
    SubDevice(SubDeviceObj),
    Context(ContextObj),
    Queue(QueueObj),
    Mem(MemObj),
    Sampler(SamplerObj),
    Program(ProgramObj),
    Kernel(KernelObj),
    Event(EventObj),
}

impl Obj {
    fn class(&self) -> Class {
        match self {
            Self::Platform(_) => Class::Platform,
            Self::Device(..) | Self::SubDevice(_) => Class::Device,
            Self::Context(_) => Class::Context,
            Self::Queue(_) => Class::Queue,
            Self::Mem(_) => Class::MemObj,
            Self::Sampler(_) => Class::Sampler,
            Self::Program(_) => Class::Program,
            Self::Kernel(_) => Class::Kernel,
            Self::Event(_) => Class::Event,
        }
    }
    /// Objects retained by this object.
    fn parents(&self) -> Vec<Handle> {
        match self {
            Self::Platform(_) | Self::Device(..) => Vec::new(),
            Self::SubDevice(x) => vec![x.parent],
            Self::Context(x) => x.devices.clone(),
            Self::Queue(x) => vec![x.context],
            Self::Mem(x) => std::iter::once(x.context).chain(x.region.map(|r| r.parent)).collect(),
            Self::Sampler(x) => vec![x.context],
            Self::Program(x) => vec![x.context],
            Self::Kernel(x) => vec![x.program],
            Self::Event(x) => std::iter::once(x.context).chain(x.queue).collect(),
        }
    }
}

fn invalid_code(class: Class) -> Status {
    match class {
        Class::Platform => cl::INVALID_PLATFORM,
        Class::Device => cl::INVALID_DEVICE,
        Class::Context => cl::INVALID_CONTEXT,
        Class::Queue => cl::INVALID_COMMAND_QUEUE,
        Class::MemObj => cl::INVALID_MEM_OBJECT,
        Class::Sampler => cl::INVALID_SAMPLER,
        Class::Program => cl::INVALID_PROGRAM,
        Class::Kernel => cl::INVALID_KERNEL,
        Class::Event => cl::INVALID_EVENT,
    }
}

struct Entry {
    refs: u32,
    obj: Obj,
}

type Command = Box<dyn FnOnce(&mut State) -> Status + Send>;

struct Pending {
    event: Handle,
    queue: Handle,
    device: Handle,
    deps: Vec<Handle>,
    uses: Vec<Handle>,
    cost: u64,
    run: Command,
}

#[derive(Clone, Copy)]
struct HostPtr(*mut u8);

// The pointer is only dereferenced while the command runs, callers guarantee it is valid until then.
unsafe impl Send for HostPtr {}

impl HostPtr {
    fn get(self) -> *mut u8 {
        self.0
    }
}

struct State {
    objects: HashMap<Handle, Entry>,
    pending: Vec<Pending>,
    device_clocks: HashMap<Handle, u64>,
    epoch: Instant,
    /// Event callbacks to run once the lock is released.
    fired: Vec<(EventCallback, Handle, i32)>,
}

macro_rules! object_accessors {
    ($($get:ident, $get_mut:ident: $variant:ident($ty:ty) => $code:expr;)*) => {
        impl State {
            $(
                #[allow(dead_code)]
                fn $get(&self, handle: Handle) -> NativeResult<&$ty> {
                    match self.objects.get(&handle).map(|entry| &entry.obj) {
                        Some(Obj::$variant(x)) => Ok(x),
                        _ => Err($code),
                    }
                }
                #[allow(dead_code)]
                fn $get_mut(&mut self, handle: Handle) -> NativeResult<&mut $ty> {
                    match self.objects.get_mut(&handle).map(|entry| &mut entry.obj) {
                        Some(Obj::$variant(x)) => Ok(x),
                        _ => Err($code),
                    }
                }
            )*
        }
    };
}

object_accessors! {
    sub_device, sub_device_mut: SubDevice(SubDeviceObj) => cl::INVALID_DEVICE;
    context, context_mut: Context(ContextObj) => cl::INVALID_CONTEXT;
    queue, queue_mut: Queue(QueueObj) => cl::INVALID_COMMAND_QUEUE;
    mem, mem_mut: Mem(MemObj) => cl::INVALID_MEM_OBJECT;
    sampler, sampler_mut: Sampler(SamplerObj) => cl::INVALID_SAMPLER;
    program, program_mut: Program(ProgramObj) => cl::INVALID_PROGRAM;
    kernel, kernel_mut: Kernel(KernelObj) => cl::INVALID_KERNEL;
    event, event_mut: Event(EventObj) => cl::INVALID_EVENT;
}

impl State {
    fn now(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }
    fn platform_index(&self, handle: Handle) -> NativeResult<usize> {
        match self.objects.get(&handle).map(|entry| &entry.obj) {
            Some(Obj::Platform(index)) => Ok(*index),
            _ => Err(cl::INVALID_PLATFORM),
        }
    }
    fn device_index(&self, handle: Handle) -> NativeResult<(usize, usize)> {
        match self.objects.get(&handle).map(|entry| &entry.obj) {
            Some(Obj::Device(platform, device)) => Ok((*platform, *device)),
            Some(Obj::SubDevice(x)) => Ok(x.root),
            _ => Err(cl::INVALID_DEVICE),
        }
    }
    /// Size of a buffer or sub-buffer.
    fn mem_size(&self, handle: Handle) -> NativeResult<usize> {
        let mem = self.mem(handle)?;
        Ok(mem.region.map_or(mem.data.len(), |region| region.size))
    }
    /// The object holding the data of `handle`.
    fn storage(&self, handle: Handle) -> NativeResult<Handle> {
        Ok(self.mem(handle)?.region.map_or(handle, |region| region.parent))
    }
    /// Checks a range of a buffer and maps it to its storage.
    fn resolve(&self, handle: Handle, offset: usize, len: usize) -> NativeResult<(Handle, usize)> {
        HostRuntime::check_range(self.mem_size(handle)?, offset, len)?;
        let mem = self.mem(handle)?;
        Ok(match mem.region {
            Some(region) => (region.parent, region.origin + offset),
            None => (handle, offset),
        })
    }
    /// Sets the status of an event and queues the callbacks it satisfies.
    fn set_status(&mut self, handle: Handle, status: i32) {
        let fired = match self.event_mut(handle) {
            Ok(event) => {
                event.status = status;
                let (fired, waiting) = std::mem::take(&mut event.callbacks)
                    .into_iter()
                    .partition::<Vec<_>, _>(|(trigger, _)| status <= *trigger);
                event.callbacks = waiting;
                fired
            }
            Err(_) => return,
        };
        for (trigger, callback) in fired {
            let reported = if status < cl::COMPLETE { status } else { trigger };
            self.fired.push((callback, handle, reported));
        }
    }
    fn refs(&self, handle: Handle) -> u32 {
        self.objects.get(&handle).map_or(0, |entry| entry.refs)
    }
    fn retain_raw(&mut self, handle: Handle) {
        if let Some(entry) = self.objects.get_mut(&handle) {
            if !matches!(entry.obj, Obj::Platform(_) | Obj::Device(..)) {
                entry.refs += 1;
            }
        }
    }
    fn release_raw(&mut self, handle: Handle) {
        let mut work = vec![handle];
        while let Some(handle) = work.pop() {
            let entry = match self.objects.get_mut(&handle) {
                Some(entry) => entry,
                None => continue,
            };
            if matches!(entry.obj, Obj::Platform(_) | Obj::Device(..)) {
                continue;
            }
            entry.refs -= 1;
            if entry.refs == 0 {
                if let Some(entry) = self.objects.remove(&handle) {
                    work.extend(entry.obj.parents());
                }
            }
        }
    }
    /// Status of a dependency, released events have completed.
    fn event_status(&self, handle: Handle) -> i32 {
        self.event(handle).map_or(cl::COMPLETE, |event| event.status)
    }
    fn execute(&mut self, event: Handle, device: Handle, cost: u64, run: Command) {
        let status = run(self);
        let now = self.now();
        let clock = self.device_clocks.entry(device).or_insert(0);
        let start = now.max(*clock);
        let end = start + cost.max(1);
        *clock = end;
        if let Ok(event) = self.event_mut(event) {
            event.times[2] = start;
            event.times[3] = end;
        }
        self.set_status(event, if status == cl::SUCCESS { cl::COMPLETE } else { status });
    }
    /// Runs deferred commands whose dependencies are resolved.
    fn progress(&mut self) {
        loop {
            let ready = self.pending.iter().position(|pending| {
                pending
                    .deps
                    .iter()
                    .all(|dep| self.event_status(*dep) <= cl::COMPLETE)
            });
            let index = match ready {
                Some(index) => index,
                None => break,
            };
            let pending = self.pending.remove(index);
            let failed = pending
                .deps
                .iter()
                .any(|dep| self.event_status(*dep) < cl::COMPLETE);
            if failed {
                self.set_status(pending.event, cl::EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST);
            } else {
                self.execute(pending.event, pending.device, pending.cost, pending.run);
            }
            if let Ok(queue) = self.queue_mut(pending.queue) {
                queue.pending.retain(|x| *x != pending.event);
            }
            for handle in pending
                .deps
                .iter()
                .chain(pending.uses.iter())
                .chain([pending.event, pending.queue].iter())
            {
                self.release_raw(*handle);
            }
        }
    }
}

struct Submit {
    queue: Handle,
    command_type: u32,
    wait: Vec<Handle>,
    uses: Vec<Handle>,
    blocking: bool,
    cost: u64,
    run: Command,
}

/// The host runtime.
pub struct HostRuntime {
    catalog: Vec<PlatformDesc>,
    platforms: Vec<Handle>,
    state: Mutex<State>,
    changed: Condvar,
    next_handle: AtomicUsize,
}

impl Default for HostRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn bytes_of<T: Pod>(value: T) -> Vec<u8> {
    bytemuck::bytes_of(&value).to_vec()
}

fn slice_bytes<T: Pod>(values: &[T]) -> Vec<u8> {
    bytemuck::cast_slice(values).to_vec()
}

fn string_bytes(value: &str) -> Vec<u8> {
    let mut bytes = value.as_bytes().to_vec();
    bytes.push(0);
    bytes
}

fn handle_bytes(handle: Option<Handle>) -> Vec<u8> {
    bytes_of(handle.map_or(0, Handle::as_raw))
}

fn cl_bool(value: bool) -> Vec<u8> {
    bytes_of(u32::from(value))
}

/// Nanoseconds charged for moving `bytes`.
fn transfer_cost(bytes: usize) -> u64 {
    (bytes as u64 / 4).max(1)
}

impl HostRuntime {
    /// Creates the runtime.
    pub fn new() -> Self {
        let catalog = catalog();
        let next_handle = AtomicUsize::new(0x1000);
        let mut objects = HashMap::new();
        let mut platforms = Vec::new();
        let alloc = || {
            let raw = next_handle.fetch_add(0x10, Ordering::Relaxed);
            Handle::from_raw(raw)
        };
        for (p, platform) in catalog.iter().enumerate() {
            if let Some(handle) = alloc() {
                objects.insert(
                    handle,
                    Entry {
                        refs: 1,
                        obj: Obj::Platform(p),
                    },
                );
                platforms.push(handle);
            }
            for d in 0..platform.devices.len() {
                if let Some(handle) = alloc() {
                    objects.insert(
                        handle,
                        Entry {
                            refs: 1,
                            obj: Obj::Device(p, d),
                        },
                    );
                }
            }
        }
        Self {
            catalog,
            platforms,
            state: Mutex::new(State {
                objects,
                pending: Vec::new(),
                device_clocks: HashMap::new(),
                epoch: Instant::now(),
                fired: Vec::new(),
            }),
            changed: Condvar::new(),
            next_handle,
        }
    }
    fn device_desc(&self, (platform, device): (usize, usize)) -> &DeviceDesc {
        &self.catalog[platform].devices[device]
    }
    fn platform_devices(&self, state: &State, platform: usize) -> Vec<Handle> {
        let mut devices: Vec<_> = state
            .objects
            .iter()
            .filter_map(|(handle, entry)| match entry.obj {
                Obj::Device(p, d) if p == platform => Some((d, *handle)),
                _ => None,
            })
            .collect();
        devices.sort_unstable();
        devices.into_iter().map(|(_, handle)| handle).collect()
    }
    fn insert(&self, state: &mut State, obj: Obj) -> NativeResult<Handle> {
        let raw = self.next_handle.fetch_add(0x10, Ordering::Relaxed);
        let handle = Handle::from_raw(raw).ok_or(cl::OUT_OF_HOST_MEMORY)?;
        for parent in obj.parents() {
            state.retain_raw(parent);
        }
        state.objects.insert(handle, Entry { refs: 1, obj });
        Ok(handle)
    }
    fn submit(&self, mut state: MutexGuard<State>, submit: Submit) -> NativeResult<Handle> {
        let Submit {
            queue,
            command_type,
            wait,
            uses,
            blocking,
            cost,
            run,
        } = submit;
        let (context, device, properties, queue_pending) = {
            let queue = state.queue(queue)?;
            (queue.context, queue.device, queue.properties, queue.pending.clone())
        };
        for handle in wait.iter() {
            let event = state
                .event(*handle)
                .map_err(|_| cl::INVALID_EVENT_WAIT_LIST)?;
            if event.context != context {
                return Err(cl::INVALID_CONTEXT);
            }
        }
        let in_order = properties & cl::QUEUE_OUT_OF_ORDER_EXEC_MODE_ENABLE == 0;
        let synchronizes = matches!(command_type, cl::COMMAND_MARKER | cl::COMMAND_BARRIER) && wait.is_empty();
        let mut deps = wait;
        if in_order || synchronizes {
            deps.extend(queue_pending);
        }
        let now = state.now();
        let event = self.insert(
            &mut state,
            Obj::Event(EventObj {
                context,
                queue: Some(queue),
                command_type,
                status: cl::QUEUED,
                profiling: properties & cl::QUEUE_PROFILING_ENABLE != 0,
                times: [now, now, 0, 0],
                callbacks: Vec::new(),
            }),
        )?;
        let statuses: Vec<i32> = deps.iter().map(|dep| state.event_status(*dep)).collect();
        if statuses.iter().any(|status| *status < cl::COMPLETE) {
            state.set_status(event, cl::EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST);
        } else if statuses.iter().all(|status| *status == cl::COMPLETE) {
            state.execute(event, device, cost, run);
        } else {
            for handle in deps.iter().chain(uses.iter()).chain([event, queue].iter()) {
                state.retain_raw(*handle);
            }
            state.set_status(event, cl::SUBMITTED);
            state.queue_mut(queue)?.pending.push(event);
            state.pending.push(Pending {
                event,
                queue,
                device,
                deps,
                uses,
                cost,
                run,
            });
        }
        if blocking {
            while state.event_status(event) > cl::COMPLETE {
                self.changed.wait(&mut state);
            }
            if state.event_status(event) < cl::COMPLETE {
                state.release_raw(event);
                self.dispatch(state);
                return Err(cl::EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST);
            }
        }
        self.changed.notify_all();
        self.dispatch(state);
        Ok(event)
    }
    /// Runs fired event callbacks with the lock released.
    ///
    /// Events with registered callbacks hold a reference until their callbacks ran.
    fn dispatch(&self, mut state: MutexGuard<State>) {
        let fired = std::mem::take(&mut state.fired);
        if fired.is_empty() {
            return;
        }
        drop(state);
        let mut events = Vec::with_capacity(fired.len());
        for (callback, event, status) in fired {
            callback(event, status);
            events.push(event);
        }
        let mut state = self.state.lock();
        for event in events {
            state.release_raw(event);
        }
    }
    fn info_bytes(&self, state: &State, query: InfoQuery, param: u32) -> NativeResult<Vec<u8>> {
        match query {
            InfoQuery::Platform(handle) => {
                let platform = &self.catalog[state.platform_index(handle)?];
                Ok(match param {
                    cl::PLATFORM_PROFILE => string_bytes("FULL_PROFILE"),
                    cl::PLATFORM_VERSION => string_bytes(platform.version),
                    cl::PLATFORM_NAME => string_bytes(platform.name),
                    cl::PLATFORM_VENDOR => string_bytes(platform.vendor),
                    cl::PLATFORM_EXTENSIONS => string_bytes(""),
                    _ => return Err(cl::INVALID_VALUE),
                })
            }
            InfoQuery::Device(handle) => {
                let index = state.device_index(handle)?;
                let platform = &self.catalog[index.0];
                let device = self.device_desc(index);
                let sub = state.sub_device(handle).ok();
                let compute_units = sub.map_or(device.compute_units, |sub| sub.compute_units);
                let max_sub_devices = if device.device_type & cl::DEVICE_TYPE_CPU != 0 {
                    compute_units
                } else {
                    0
                };
                Ok(match param {
                    cl::DEVICE_TYPE => bytes_of(device.device_type),
                    cl::DEVICE_VENDOR_ID => bytes_of(0x1000u32 + index.0 as u32),
                    cl::DEVICE_MAX_COMPUTE_UNITS => bytes_of(compute_units),
                    cl::DEVICE_MAX_WORK_ITEM_DIMENSIONS => bytes_of(3u32),
                    cl::DEVICE_MAX_WORK_GROUP_SIZE => bytes_of(device.max_work_group_size),
                    cl::DEVICE_MAX_WORK_ITEM_SIZES => slice_bytes(&device.max_work_item_sizes),
                    cl::DEVICE_MAX_CLOCK_FREQUENCY => bytes_of(device.clock_frequency),
                    cl::DEVICE_ADDRESS_BITS => bytes_of(64u32),
                    cl::DEVICE_MAX_MEM_ALLOC_SIZE => bytes_of(device.max_mem_alloc_size),
                    cl::DEVICE_IMAGE_SUPPORT => cl_bool(device.image_support),
                    cl::DEVICE_GLOBAL_MEM_SIZE => bytes_of(device.global_mem_size),
                    cl::DEVICE_LOCAL_MEM_SIZE => bytes_of(device.local_mem_size),
                    cl::DEVICE_ENDIAN_LITTLE => cl_bool(cfg!(target_endian = "little")),
                    cl::DEVICE_AVAILABLE | cl::DEVICE_COMPILER_AVAILABLE => cl_bool(true),
                    cl::DEVICE_QUEUE_PROPERTIES => bytes_of(QUEUE_PROPERTIES),
                    cl::DEVICE_NAME => string_bytes(device.name),
                    cl::DEVICE_VENDOR => string_bytes(device.vendor),
                    cl::DRIVER_VERSION => string_bytes(env!("CARGO_PKG_VERSION")),
                    cl::DEVICE_PROFILE => string_bytes("FULL_PROFILE"),
                    cl::DEVICE_VERSION => string_bytes(platform.version),
                    cl::DEVICE_EXTENSIONS => string_bytes(""),
                    cl::DEVICE_PLATFORM => handle_bytes(self.platforms.get(index.0).copied()),
                    cl::DEVICE_OPENCL_C_VERSION => string_bytes(platform.c_version),
                    cl::DEVICE_BUILT_IN_KERNELS => string_bytes(device.built_in_kernels),
                    cl::DEVICE_REFERENCE_COUNT => bytes_of(if sub.is_some() { state.refs(handle) } else { 1 }),
                    cl::DEVICE_PARENT_DEVICE => handle_bytes(sub.map(|sub| sub.parent)),
                    cl::DEVICE_PARTITION_MAX_SUB_DEVICES => bytes_of(max_sub_devices),
                    cl::DEVICE_PARTITION_PROPERTIES => {
                        if max_sub_devices > 0 {
                            slice_bytes(&[cl::DEVICE_PARTITION_EQUALLY, cl::DEVICE_PARTITION_BY_COUNTS])
                        } else {
                            bytes_of(0isize)
                        }
                    }
                    cl::DEVICE_PARTITION_AFFINITY_DOMAIN => bytes_of(0u64),
                    cl::DEVICE_PARTITION_TYPE => match sub {
                        Some(sub) => slice_bytes(&sub.partition),
                        None => bytes_of(0isize),
                    },
                    cl::DEVICE_LINKER_AVAILABLE => cl_bool(true),
                    cl::DEVICE_MEM_BASE_ADDR_ALIGN => bytes_of(BASE_ADDR_ALIGN as u32 * 8),
                    cl::DEVICE_MIN_DATA_TYPE_ALIGN_SIZE => bytes_of(BASE_ADDR_ALIGN as u32),
                    cl::DEVICE_SINGLE_FP_CONFIG => {
                        bytes_of(cl::FP_DENORM | cl::FP_INF_NAN | cl::FP_ROUND_TO_NEAREST | cl::FP_FMA)
                    }
                    cl::DEVICE_GLOBAL_MEM_CACHE_TYPE => bytes_of(cl::READ_WRITE_CACHE),
                    cl::DEVICE_GLOBAL_MEM_CACHELINE_SIZE => bytes_of(64u32),
                    cl::DEVICE_LOCAL_MEM_TYPE => bytes_of(cl::LOCAL),
                    cl::DEVICE_EXECUTION_CAPABILITIES => bytes_of(cl::EXEC_KERNEL),
                    cl::DEVICE_MAX_PARAMETER_SIZE => bytes_of(1024usize),
                    cl::DEVICE_PROFILING_TIMER_RESOLUTION => bytes_of(1usize),
                    cl::DEVICE_ERROR_CORRECTION_SUPPORT => cl_bool(false),
                    cl::DEVICE_HOST_UNIFIED_MEMORY => cl_bool(true),
                    cl::DEVICE_MAX_READ_IMAGE_ARGS | cl::DEVICE_MAX_WRITE_IMAGE_ARGS => {
                        bytes_of(if device.image_support { 128u32 } else { 0 })
                    }
                    cl::DEVICE_IMAGE2D_MAX_WIDTH | cl::DEVICE_IMAGE2D_MAX_HEIGHT => bytes_of(8192usize),
                    cl::DEVICE_IMAGE3D_MAX_WIDTH
                    | cl::DEVICE_IMAGE3D_MAX_HEIGHT
                    | cl::DEVICE_IMAGE3D_MAX_DEPTH
                    | cl::DEVICE_IMAGE_MAX_ARRAY_SIZE => bytes_of(2048usize),
                    cl::DEVICE_IMAGE_MAX_BUFFER_SIZE => bytes_of(65536usize),
                    cl::DEVICE_MAX_SAMPLERS => bytes_of(16u32),
                    cl::DEVICE_GLOBAL_MEM_CACHE_SIZE => bytes_of(1u64 << 20),
                    cl::DEVICE_MAX_CONSTANT_BUFFER_SIZE => bytes_of(64u64 << 10),
                    cl::DEVICE_MAX_CONSTANT_ARGS => bytes_of(8u32),
                    cl::DEVICE_PRINTF_BUFFER_SIZE => bytes_of(1usize << 20),
                    cl::DEVICE_PREFERRED_INTEROP_USER_SYNC => cl_bool(true),
                    cl::DEVICE_PREFERRED_VECTOR_WIDTH_CHAR..=cl::DEVICE_PREFERRED_VECTOR_WIDTH_FLOAT => bytes_of(1u32),
                    cl::DEVICE_NATIVE_VECTOR_WIDTH_CHAR..=cl::DEVICE_NATIVE_VECTOR_WIDTH_FLOAT => bytes_of(1u32),
                    _ => return Err(cl::INVALID_VALUE),
                })
            }
            InfoQuery::Context(handle) => {
                let context = state.context(handle)?;
                Ok(match param {
                    cl::CONTEXT_REFERENCE_COUNT => bytes_of(state.refs(handle)),
                    cl::CONTEXT_DEVICES => super::handles_to_bytes(&context.devices),
                    cl::CONTEXT_PROPERTIES => slice_bytes(&context.properties),
                    cl::CONTEXT_NUM_DEVICES => bytes_of(context.devices.len() as u32),
                    _ => return Err(cl::INVALID_VALUE),
                })
            }
            InfoQuery::Queue(handle) => {
                let queue = state.queue(handle)?;
                Ok(match param {
                    cl::QUEUE_CONTEXT => handle_bytes(Some(queue.context)),
                    cl::QUEUE_DEVICE => handle_bytes(Some(queue.device)),
                    cl::QUEUE_REFERENCE_COUNT => bytes_of(state.refs(handle)),
                    cl::QUEUE_PROPERTIES => bytes_of(queue.properties),
                    _ => return Err(cl::INVALID_VALUE),
                })
            }
            InfoQuery::MemObj(handle) => {
                let mem = state.mem(handle)?;
                Ok(match param {
                    cl::MEM_TYPE => bytes_of(mem.image.map_or(cl::MEM_OBJECT_BUFFER, |image| image.desc.image_type)),
                    cl::MEM_FLAGS => bytes_of(mem.flags),
                    cl::MEM_SIZE => bytes_of(state.mem_size(handle)?),
                    cl::MEM_HOST_PTR => handle_bytes(None),
                    cl::MEM_ASSOCIATED_MEMOBJECT => handle_bytes(mem.region.map(|region| region.parent)),
                    cl::MEM_MAP_COUNT => bytes_of(mem.mappings.len() as u32),
                    cl::MEM_REFERENCE_COUNT => bytes_of(state.refs(handle)),
                    cl::MEM_CONTEXT => handle_bytes(Some(mem.context)),
                    cl::MEM_OFFSET => bytes_of(mem.region.map_or(0, |region| region.origin)),
                    _ => return Err(cl::INVALID_VALUE),
                })
            }
            InfoQuery::Image(handle) => {
                let image = state.mem(handle)?.image.ok_or(cl::INVALID_MEM_OBJECT)?;
                let desc = &image.desc;
                Ok(match param {
                    cl::IMAGE_FORMAT => bytes_of(image.format),
                    cl::IMAGE_ELEMENT_SIZE => bytes_of(image.element_size),
                    cl::IMAGE_ROW_PITCH => bytes_of(image.row_pitch()),
                    cl::IMAGE_SLICE_PITCH => bytes_of(match desc.image_type {
                        cl::MEM_OBJECT_IMAGE1D | cl::MEM_OBJECT_IMAGE2D => 0,
                        _ => image.slice_pitch(),
                    }),
                    cl::IMAGE_WIDTH => bytes_of(desc.width),
                    cl::IMAGE_HEIGHT => bytes_of(desc.height),
                    cl::IMAGE_DEPTH => bytes_of(desc.depth),
                    cl::IMAGE_ARRAY_SIZE => bytes_of(desc.array_size),
                    cl::IMAGE_NUM_MIP_LEVELS => bytes_of(desc.num_mip_levels),
                    cl::IMAGE_NUM_SAMPLES => bytes_of(desc.num_samples),
                    _ => return Err(cl::INVALID_VALUE),
                })
            }
            InfoQuery::Sampler(handle) => {
                let sampler = state.sampler(handle)?;
                Ok(match param {
                    cl::SAMPLER_REFERENCE_COUNT => bytes_of(state.refs(handle)),
                    cl::SAMPLER_CONTEXT => handle_bytes(Some(sampler.context)),
                    cl::SAMPLER_NORMALIZED_COORDS => cl_bool(sampler.normalized_coords),
                    cl::SAMPLER_ADDRESSING_MODE => bytes_of(sampler.addressing_mode),
                    cl::SAMPLER_FILTER_MODE => bytes_of(sampler.filter_mode),
                    _ => return Err(cl::INVALID_VALUE),
                })
            }
            InfoQuery::Program(handle) => {
                let program = state.program(handle)?;
                let built = program.builds.iter().find(|build| build.is_executable());
                Ok(match param {
                    cl::PROGRAM_REFERENCE_COUNT => bytes_of(state.refs(handle)),
                    cl::PROGRAM_CONTEXT => handle_bytes(Some(program.context)),
                    cl::PROGRAM_NUM_DEVICES => bytes_of(program.devices.len() as u32),
                    cl::PROGRAM_DEVICES => super::handles_to_bytes(&program.devices),
                    cl::PROGRAM_SOURCE => string_bytes(program.source.as_deref().unwrap_or("")),
                    cl::PROGRAM_BINARY_SIZES => {
                        let sizes = self.binaries(state, program)?;
                        let sizes: Vec<usize> = sizes.iter().map(Vec::len).collect();
                        slice_bytes(&sizes)
                    }
                    cl::PROGRAM_NUM_KERNELS => {
                        bytes_of(built.ok_or(cl::INVALID_PROGRAM_EXECUTABLE)?.kernels.len())
                    }
                    cl::PROGRAM_KERNEL_NAMES => {
                        let built = built.ok_or(cl::INVALID_PROGRAM_EXECUTABLE)?;
                        let names: Vec<&str> = built.kernels.iter().map(|k| k.name.as_str()).collect();
                        string_bytes(&names.join(";"))
                    }
                    _ => return Err(cl::INVALID_VALUE),
                })
            }
            InfoQuery::ProgramBuild(handle, device) => {
                let program = state.program(handle)?;
                let index = program
                    .devices
                    .iter()
                    .position(|x| *x == device)
                    .ok_or(cl::INVALID_DEVICE)?;
                let build = &program.builds[index];
                Ok(match param {
                    cl::PROGRAM_BUILD_STATUS => bytes_of(build.status),
                    cl::PROGRAM_BUILD_OPTIONS => string_bytes(&build.options),
                    cl::PROGRAM_BUILD_LOG => string_bytes(&build.log),
                    cl::PROGRAM_BINARY_TYPE => bytes_of(build.binary_type),
                    _ => return Err(cl::INVALID_VALUE),
                })
            }
            InfoQuery::Kernel(handle) => {
                let kernel = state.kernel(handle)?;
                Ok(match param {
                    cl::KERNEL_FUNCTION_NAME => string_bytes(&kernel.sig.name),
                    cl::KERNEL_NUM_ARGS => bytes_of(kernel.sig.args.len() as u32),
                    cl::KERNEL_REFERENCE_COUNT => bytes_of(state.refs(handle)),
                    cl::KERNEL_CONTEXT => handle_bytes(Some(kernel.context)),
                    cl::KERNEL_PROGRAM => handle_bytes(Some(kernel.program)),
                    cl::KERNEL_ATTRIBUTES => string_bytes(&kernel.sig.attributes),
                    _ => return Err(cl::INVALID_VALUE),
                })
            }
            InfoQuery::KernelArg(handle, index) => {
                let kernel = state.kernel(handle)?;
                let arg = kernel
                    .sig
                    .args
                    .get(index as usize)
                    .ok_or(cl::INVALID_ARG_INDEX)?;
                Ok(match param {
                    cl::KERNEL_ARG_ADDRESS_QUALIFIER => bytes_of(arg.address),
                    cl::KERNEL_ARG_ACCESS_QUALIFIER => bytes_of(arg.access),
                    cl::KERNEL_ARG_TYPE_NAME => string_bytes(&arg.type_name),
                    cl::KERNEL_ARG_TYPE_QUALIFIER => bytes_of(arg.type_qualifier),
                    cl::KERNEL_ARG_NAME => string_bytes(&arg.name),
                    _ => return Err(cl::INVALID_VALUE),
                })
            }
            InfoQuery::KernelWorkGroup(handle, device) => {
                let kernel = state.kernel(handle)?;
                let program = state.program(kernel.program)?;
                let device = match device {
                    Some(device) if program.devices.contains(&device) => device,
                    Some(_) => return Err(cl::INVALID_DEVICE),
                    None if program.devices.len() == 1 => program.devices[0],
                    None => return Err(cl::INVALID_DEVICE),
                };
                let desc = self.device_desc(state.device_index(device)?);
                Ok(match param {
                    cl::KERNEL_WORK_GROUP_SIZE => bytes_of(desc.max_work_group_size),
                    cl::KERNEL_COMPILE_WORK_GROUP_SIZE => slice_bytes(&[0usize; 3]),
                    cl::KERNEL_LOCAL_MEM_SIZE | cl::KERNEL_PRIVATE_MEM_SIZE => bytes_of(0u64),
                    cl::KERNEL_PREFERRED_WORK_GROUP_SIZE_MULTIPLE => bytes_of(desc.preferred_multiple),
                    _ => return Err(cl::INVALID_VALUE),
                })
            }
            InfoQuery::Event(handle) => {
                let event = state.event(handle)?;
                Ok(match param {
                    cl::EVENT_COMMAND_QUEUE => handle_bytes(event.queue),
                    cl::EVENT_COMMAND_TYPE => bytes_of(event.command_type),
                    cl::EVENT_REFERENCE_COUNT => bytes_of(state.refs(handle)),
                    cl::EVENT_COMMAND_EXECUTION_STATUS => bytes_of(event.status),
                    cl::EVENT_CONTEXT => handle_bytes(Some(event.context)),
                    _ => return Err(cl::INVALID_VALUE),
                })
            }
            InfoQuery::EventProfiling(handle) => {
                let event = state.event(handle)?;
                if !event.profiling || event.status != cl::COMPLETE {
                    return Err(cl::PROFILING_INFO_NOT_AVAILABLE);
                }
                let [queued, submit, start, end] = event.times;
                Ok(match param {
                    cl::PROFILING_COMMAND_QUEUED => bytes_of(queued),
                    cl::PROFILING_COMMAND_SUBMIT => bytes_of(submit),
                    cl::PROFILING_COMMAND_START => bytes_of(start),
                    cl::PROFILING_COMMAND_END | cl::PROFILING_COMMAND_COMPLETE => bytes_of(end),
                    _ => return Err(cl::INVALID_VALUE),
                })
            }
        }
    }
    fn binaries(&self, state: &State, program: &ProgramObj) -> NativeResult<Vec<Vec<u8>>> {
        program
            .devices
            .iter()
            .zip(program.builds.iter())
            .map(|(device, build)| {
                if build.status != cl::BUILD_SUCCESS {
                    return Ok(Vec::new());
                }
                let desc = self.device_desc(state.device_index(*device)?);
                Binary {
                    device: desc.name.to_string(),
                    options: build.options.clone(),
                    binary_type: build.binary_type,
                    kernels: build.kernels.clone(),
                }
                .to_bytes()
                .map_err(|_| cl::OUT_OF_HOST_MEMORY)
            })
            .collect()
    }
    fn check_devices(&self, state: &State, context: &ContextObj, devices: &[Handle]) -> NativeResult<()> {
        for device in devices {
            state.device_index(*device)?;
            if !context.devices.contains(device) {
                return Err(cl::INVALID_DEVICE);
            }
        }
        Ok(())
    }
    fn has_kernels(state: &State, program: Handle) -> bool {
        state
            .objects
            .values()
            .any(|entry| matches!(&entry.obj, Obj::Kernel(kernel) if kernel.program == program))
    }
    /// Indices of the builds for `devices`, all builds if empty.
    fn build_targets(program: &ProgramObj, devices: &[Handle]) -> NativeResult<Vec<usize>> {
        for device in devices {
            if !program.devices.contains(device) {
                return Err(cl::INVALID_DEVICE);
            }
        }
        Ok(program
            .devices
            .iter()
            .enumerate()
            .filter(|(_, device)| devices.is_empty() || devices.contains(device))
            .map(|(i, _)| i)
            .collect())
    }
    fn check_range(size: usize, offset: usize, len: usize) -> NativeResult<()> {
        match offset.checked_add(len) {
            Some(end) if len > 0 && end <= size => Ok(()),
            _ => Err(cl::INVALID_VALUE),
        }
    }
    fn same_context(state: &State, queue: Handle, mem: Handle) -> NativeResult<()> {
        if state.queue(queue)?.context != state.mem(mem)?.context {
            return Err(cl::INVALID_CONTEXT);
        }
        Ok(())
    }
}

impl Backend for HostRuntime {
    fn name(&self) -> &str {
        "host"
    }
    fn platform_ids(&self) -> NativeResult<Vec<Handle>> {
        Ok(self.platforms.clone())
    }
    fn device_ids(&self, platform: Handle, device_type: u64) -> NativeResult<Vec<Handle>> {
        let state = self.state.lock();
        let index = state.platform_index(platform)?;
        if device_type == 0 {
            return Err(cl::INVALID_DEVICE_TYPE);
        }
        let devices: Vec<Handle> = self
            .platform_devices(&state, index)
            .into_iter()
            .filter(|device| {
                state
                    .device_index(*device)
                    .map_or(false, |index| self.device_desc(index).device_type & device_type != 0)
            })
            .collect();
        if devices.is_empty() {
            return Err(cl::DEVICE_NOT_FOUND);
        }
        Ok(devices)
    }
    fn get_info(&self, query: InfoQuery, param: u32, value: Option<&mut [u8]>) -> NativeResult<usize> {
        let bytes = {
            let state = self.state.lock();
            self.info_bytes(&state, query, param)?
        };
        if let Some(value) = value {
            if value.len() < bytes.len() {
                return Err(cl::INVALID_VALUE);
            }
            value[..bytes.len()].copy_from_slice(&bytes);
        }
        Ok(bytes.len())
    }
    fn retain(&self, class: Class, handle: Handle) -> NativeResult<()> {
        let mut state = self.state.lock();
        match state.objects.get(&handle) {
            Some(entry) if entry.obj.class() == class => (),
            _ => return Err(invalid_code(class)),
        }
        state.retain_raw(handle);
        Ok(())
    }
    fn release(&self, class: Class, handle: Handle) -> NativeResult<()> {
        let mut state = self.state.lock();
        match state.objects.get(&handle) {
            Some(entry) if entry.obj.class() == class => (),
            _ => return Err(invalid_code(class)),
        }
        state.release_raw(handle);
        Ok(())
    }
    fn create_context(&self, properties: &[(isize, isize)], devices: &[Handle]) -> NativeResult<Handle> {
        let mut state = self.state.lock();
        if devices.is_empty() {
            return Err(cl::INVALID_VALUE);
        }
        let mut platform = None;
        let mut raw_properties = Vec::new();
        for (name, value) in properties.iter().copied() {
            match name {
                cl::CONTEXT_PLATFORM => {
                    let handle = Handle::from_raw(value as usize).ok_or(cl::INVALID_PLATFORM)?;
                    state.platform_index(handle)?;
                    platform = Some(handle);
                }
                _ => return Err(cl::INVALID_PROPERTY),
            }
            raw_properties.extend([name, value]);
        }
        if !raw_properties.is_empty() {
            raw_properties.push(0);
        }
        let mut device_platform = None;
        for device in devices {
            let (p, _) = state.device_index(*device)?;
            match device_platform {
                Some(x) if x != p => return Err(cl::INVALID_DEVICE),
                _ => device_platform = Some(p),
            }
        }
        let device_platform = device_platform
            .and_then(|p| self.platforms.get(p).copied())
            .ok_or(cl::INVALID_DEVICE)?;
        if let Some(platform) = platform {
            if platform != device_platform {
                return Err(cl::INVALID_PLATFORM);
            }
        }
        self.insert(
            &mut state,
            Obj::Context(ContextObj {
                platform: device_platform,
                devices: devices.to_vec(),
                properties: raw_properties,
            }),
        )
    }
    fn supported_image_formats(&self, context: Handle, flags: u64, image_type: u32) -> NativeResult<Vec<ImageFormat>> {
        let state = self.state.lock();
        state.context(context)?;
        let _ = flags;
        match image_type {
            cl::MEM_OBJECT_IMAGE1D
            | cl::MEM_OBJECT_IMAGE1D_ARRAY
            | cl::MEM_OBJECT_IMAGE2D
            | cl::MEM_OBJECT_IMAGE2D_ARRAY
            | cl::MEM_OBJECT_IMAGE3D => Ok(supported_formats()),
            _ => Err(cl::INVALID_VALUE),
        }
    }
    fn create_queue(&self, context: Handle, device: Handle, properties: u64) -> NativeResult<Handle> {
        let mut state = self.state.lock();
        self.check_devices(&state, state.context(context)?, &[device])?;
        if properties & !QUEUE_PROPERTIES != 0 {
            return Err(cl::INVALID_QUEUE_PROPERTIES);
        }
        self.insert(
            &mut state,
            Obj::Queue(QueueObj {
                context,
                device,
                properties,
                pending: Vec::new(),
            }),
        )
    }
    fn flush(&self, queue: Handle) -> NativeResult<()> {
        self.state.lock().queue(queue).map(|_| ())
    }
    fn finish(&self, queue: Handle) -> NativeResult<()> {
        let mut state = self.state.lock();
        while !state.queue(queue)?.pending.is_empty() {
            self.changed.wait(&mut state);
        }
        Ok(())
    }
    unsafe fn create_buffer(&self, context: Handle, flags: u64, size: usize, host_ptr: *mut c_void) -> NativeResult<Handle> {
        let mut state = self.state.lock();
        let context_obj = state.context(context)?;
        let max_alloc = context_obj
            .devices
            .iter()
            .filter_map(|device| state.device_index(*device).ok())
            .map(|index| self.device_desc(index).max_mem_alloc_size)
            .min()
            .unwrap_or(0);
        if size == 0 || size as u64 > max_alloc {
            return Err(cl::INVALID_BUFFER_SIZE);
        }
        let access = flags & (cl::MEM_READ_WRITE | cl::MEM_WRITE_ONLY | cl::MEM_READ_ONLY);
        if access.count_ones() > 1 {
            return Err(cl::INVALID_VALUE);
        }
        let uses_host = flags & (cl::MEM_USE_HOST_PTR | cl::MEM_COPY_HOST_PTR) != 0;
        if uses_host == host_ptr.is_null() {
            return Err(cl::INVALID_HOST_PTR);
        }
        let mut data = vec![0u8; size];
        if uses_host {
            // Safety: the caller guarantees host_ptr is valid for size bytes.
            unsafe { ptr::copy_nonoverlapping(host_ptr as *const u8, data.as_mut_ptr(), size) };
        }
        let flags = if access == 0 { flags | cl::MEM_READ_WRITE } else { flags };
        self.insert(
            &mut state,
            Obj::Mem(MemObj {
                context,
                flags,
                data,
                image: None,
                mappings: Vec::new(),
                region: None,
            }),
        )
    }
    unsafe fn create_image(
        &self,
        context: Handle,
        flags: u64,
        format: &ImageFormat,
        desc: &ImageDesc,
        host_ptr: *mut c_void,
    ) -> NativeResult<Handle> {
        let mut state = self.state.lock();
        let context_obj = state.context(context)?;
        let image_support = context_obj.devices.iter().any(|device| {
            state
                .device_index(*device)
                .map_or(false, |index| self.device_desc(index).image_support)
        });
        if !image_support {
            return Err(cl::INVALID_OPERATION);
        }
        if !supported_formats().contains(format) {
            return Err(cl::IMAGE_FORMAT_NOT_SUPPORTED);
        }
        let element_size = element_size(format).ok_or(cl::INVALID_IMAGE_FORMAT_DESCRIPTOR)?;
        let dims = match desc.image_type {
            cl::MEM_OBJECT_IMAGE1D => [desc.width, 1, 1],
            cl::MEM_OBJECT_IMAGE1D_ARRAY => [desc.width, desc.array_size, 1],
            cl::MEM_OBJECT_IMAGE2D => [desc.width, desc.height, 1],
            cl::MEM_OBJECT_IMAGE2D_ARRAY => [desc.width, desc.height, desc.array_size],
            cl::MEM_OBJECT_IMAGE3D => [desc.width, desc.height, desc.depth],
            _ => return Err(cl::INVALID_IMAGE_DESCRIPTOR),
        };
        if dims.iter().any(|x| *x == 0) || desc.num_mip_levels != 0 || desc.num_samples != 0 {
            return Err(cl::INVALID_IMAGE_SIZE);
        }
        let mut desc = *desc;
        let info = ImageInfo {
            format: *format,
            desc,
            element_size,
            dims,
        };
        let tight_row = info.row_pitch();
        let host_row = if desc.row_pitch == 0 { tight_row } else { desc.row_pitch };
        let host_slice = if desc.slice_pitch == 0 { host_row * dims[1] } else { desc.slice_pitch };
        if host_ptr.is_null() && (desc.row_pitch != 0 || desc.slice_pitch != 0) {
            return Err(cl::INVALID_IMAGE_DESCRIPTOR);
        }
        if host_row < tight_row || host_slice < host_row * dims[1] {
            return Err(cl::INVALID_IMAGE_DESCRIPTOR);
        }
        let uses_host = flags & (cl::MEM_USE_HOST_PTR | cl::MEM_COPY_HOST_PTR) != 0;
        if uses_host == host_ptr.is_null() {
            return Err(cl::INVALID_HOST_PTR);
        }
        let mut data = vec![0u8; info.slice_pitch() * dims[2]];
        if uses_host {
            let src = host_ptr as *const u8;
            info.for_each_row([0; 3], dims, host_row, host_slice, |image_offset, host_offset, len| {
                // Safety: the caller guarantees host_ptr covers the image with the given pitches.
                unsafe { ptr::copy_nonoverlapping(src.add(host_offset), data.as_mut_ptr().add(image_offset), len) };
            });
        }
        desc.row_pitch = 0;
        desc.slice_pitch = 0;
        let access = flags & (cl::MEM_READ_WRITE | cl::MEM_WRITE_ONLY | cl::MEM_READ_ONLY);
        let flags = if access == 0 { flags | cl::MEM_READ_WRITE } else { flags };
        self.insert(
            &mut state,
            Obj::Mem(MemObj {
                context,
                flags,
                data,
                image: Some(ImageInfo { desc, ..info }),
                mappings: Vec::new(),
                region: None,
            }),
        )
    }
    fn create_sampler(
        &self,
        context: Handle,
        normalized_coords: bool,
        addressing_mode: u32,
        filter_mode: u32,
    ) -> NativeResult<Handle> {
        let mut state = self.state.lock();
        state.context(context)?;
        if !(cl::ADDRESS_NONE..=cl::ADDRESS_MIRRORED_REPEAT).contains(&addressing_mode)
            || !matches!(filter_mode, cl::FILTER_NEAREST | cl::FILTER_LINEAR)
        {
            return Err(cl::INVALID_VALUE);
        }
        if !normalized_coords
            && matches!(addressing_mode, cl::ADDRESS_REPEAT | cl::ADDRESS_MIRRORED_REPEAT)
        {
            return Err(cl::INVALID_VALUE);
        }
        self.insert(
            &mut state,
            Obj::Sampler(SamplerObj {
                context,
                normalized_coords,
                addressing_mode,
                filter_mode,
            }),
        )
    }
    fn create_sampler_with_properties(&self, context: Handle, properties: &[u64]) -> NativeResult<Handle> {
        let mut normalized_coords = true;
        let mut addressing_mode = cl::ADDRESS_CLAMP;
        let mut filter_mode = cl::FILTER_NEAREST;
        let mut iter = properties.iter().copied();
        while let Some(name) = iter.next() {
            if name == 0 {
                break;
            }
            let value = iter.next().ok_or(cl::INVALID_VALUE)?;
            match u32::try_from(name).map_err(|_| cl::INVALID_VALUE)? {
                cl::SAMPLER_NORMALIZED_COORDS => normalized_coords = value != 0,
                cl::SAMPLER_ADDRESSING_MODE => addressing_mode = value as u32,
                cl::SAMPLER_FILTER_MODE => filter_mode = value as u32,
                _ => return Err(cl::INVALID_VALUE),
            }
        }
        self.create_sampler(context, normalized_coords, addressing_mode, filter_mode)
    }
    fn create_program_with_source(&self, context: Handle, sources: &[&str]) -> NativeResult<Handle> {
        let mut state = self.state.lock();
        let devices = state.context(context)?.devices.clone();
        if sources.is_empty() {
            return Err(cl::INVALID_VALUE);
        }
        let builds = devices.iter().map(|_| Build::default()).collect();
        self.insert(
            &mut state,
            Obj::Program(ProgramObj {
                context,
                devices,
                source: Some(sources.concat()),
                builds,
            }),
        )
    }
    fn create_program_with_binary(&self, context: Handle, devices: &[Handle], binaries: &[&[u8]]) -> NativeResult<Handle> {
        let mut state = self.state.lock();
        self.check_devices(&state, state.context(context)?, devices)?;
        if devices.is_empty() || devices.len() != binaries.len() {
            return Err(cl::INVALID_VALUE);
        }
        let mut builds = Vec::with_capacity(binaries.len());
        for bytes in binaries {
            let binary = Binary::from_bytes(bytes).ok_or(cl::INVALID_BINARY)?;
            builds.push(Build {
                options: binary.options,
                binary_type: binary.binary_type,
                kernels: binary.kernels,
                ..Build::default()
            });
        }
        self.insert(
            &mut state,
            Obj::Program(ProgramObj {
                context,
                devices: devices.to_vec(),
                source: None,
                builds,
            }),
        )
    }
    fn create_program_with_built_in_kernels(&self, context: Handle, devices: &[Handle], kernel_names: &str) -> NativeResult<Handle> {
        let mut state = self.state.lock();
        self.check_devices(&state, state.context(context)?, devices)?;
        let names: Vec<&str> = kernel_names
            .split(';')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect();
        if devices.is_empty() || names.is_empty() {
            return Err(cl::INVALID_VALUE);
        }
        let mut builds = Vec::with_capacity(devices.len());
        for device in devices {
            let desc = self.device_desc(state.device_index(*device)?);
            let mut kernels = Vec::with_capacity(names.len());
            for name in names.iter() {
                if !desc.built_in_kernels.split(';').any(|x| x == *name) {
                    return Err(cl::INVALID_VALUE);
                }
                let source = built_in_source(name).ok_or(cl::INVALID_VALUE)?;
                kernels.extend(compiler::compile(source).map_err(|_| cl::OUT_OF_RESOURCES)?);
            }
            builds.push(Build {
                status: cl::BUILD_SUCCESS,
                binary_type: cl::PROGRAM_BINARY_TYPE_EXECUTABLE,
                kernels,
                ..Build::default()
            });
        }
        self.insert(
            &mut state,
            Obj::Program(ProgramObj {
                context,
                devices: devices.to_vec(),
                source: None,
                builds,
            }),
        )
    }
    fn build_program(&self, program: Handle, devices: &[Handle], options: &str) -> NativeResult<()> {
        let mut state = self.state.lock();
        let program_obj = state.program(program)?;
        let targets = Self::build_targets(program_obj, devices)?;
        if Self::has_kernels(&state, program) {
            return Err(cl::INVALID_OPERATION);
        }
        if !compiler::check_options(options) {
            return Err(cl::INVALID_BUILD_OPTIONS);
        }
        let source = program_obj.source.clone();
        let program_obj = state.program_mut(program)?;
        let mut failed = false;
        for i in targets {
            let build = &mut program_obj.builds[i];
            build.options = options.to_string();
            match source.as_deref() {
                Some(source) => match compiler::compile(source) {
                    Ok(kernels) => {
                        build.status = cl::BUILD_SUCCESS;
                        build.log.clear();
                        build.binary_type = cl::PROGRAM_BINARY_TYPE_EXECUTABLE;
                        build.kernels = kernels;
                    }
                    Err(log) => {
                        build.status = cl::BUILD_ERROR;
                        build.log = log;
                        build.binary_type = cl::PROGRAM_BINARY_TYPE_NONE;
                        build.kernels.clear();
                        failed = true;
                    }
                },
                None => {
                    build.status = cl::BUILD_SUCCESS;
                    build.log.clear();
                    build.binary_type = cl::PROGRAM_BINARY_TYPE_EXECUTABLE;
                }
            }
        }
        if failed {
            Err(cl::BUILD_PROGRAM_FAILURE)
        } else {
            Ok(())
        }
    }
    fn program_binaries(&self, program: Handle) -> NativeResult<Vec<Vec<u8>>> {
        let state = self.state.lock();
        self.binaries(&state, state.program(program)?)
    }
    fn create_kernel(&self, program: Handle, name: &str) -> NativeResult<Handle> {
        let mut state = self.state.lock();
        let program_obj = state.program(program)?;
        let mut built = program_obj
            .builds
            .iter()
            .filter(|build| build.is_executable())
            .peekable();
        if built.peek().is_none() {
            return Err(cl::INVALID_PROGRAM_EXECUTABLE);
        }
        let sig = built
            .find_map(|build| build.kernels.iter().find(|k| k.name == name))
            .cloned()
            .ok_or(cl::INVALID_KERNEL_NAME)?;
        let context = program_obj.context;
        let args = vec![None; sig.args.len()];
        self.insert(
            &mut state,
            Obj::Kernel(KernelObj {
                program,
                context,
                sig,
                args,
            }),
        )
    }
    unsafe fn set_kernel_arg(&self, kernel: Handle, index: u32, size: usize, value: *const c_void) -> NativeResult<()> {
        let mut state = self.state.lock();
        let kernel_obj = state.kernel(kernel)?;
        let arg: &ArgSig = kernel_obj
            .sig
            .args
            .get(index as usize)
            .ok_or(cl::INVALID_ARG_INDEX)?;
        let arg_value = if arg.address == cl::KERNEL_ARG_ADDRESS_LOCAL {
            if !value.is_null() {
                return Err(cl::INVALID_ARG_VALUE);
            }
            if size == 0 {
                return Err(cl::INVALID_ARG_SIZE);
            }
            ArgValue::Local(size)
        } else if arg.is_pointer() || arg.is_image() || arg.is_sampler() {
            if size != size_of::<usize>() {
                return Err(cl::INVALID_ARG_SIZE);
            }
            let raw = if value.is_null() {
                0
            } else {
                // Safety: value is valid for size bytes which is the size of a handle.
                unsafe { ptr::read_unaligned(value as *const usize) }
            };
            let handle = Handle::from_raw(raw);
            if arg.is_sampler() {
                let handle = handle.ok_or(cl::INVALID_SAMPLER)?;
                state.sampler(handle)?;
                ArgValue::Sampler(handle)
            } else {
                match handle {
                    Some(handle) => {
                        let mem = state.mem(handle).map_err(|_| cl::INVALID_MEM_OBJECT)?;
                        if arg.is_image() != mem.image.is_some() {
                            return Err(cl::INVALID_ARG_VALUE);
                        }
                    }
                    None if arg.is_image() => return Err(cl::INVALID_ARG_VALUE),
                    None => (),
                }
                ArgValue::Mem(handle)
            }
        } else {
            if value.is_null() {
                return Err(cl::INVALID_ARG_VALUE);
            }
            if let Some(expected) = arg.value_size() {
                if expected != size {
                    return Err(cl::INVALID_ARG_SIZE);
                }
            }
            // Safety: value is valid for size bytes.
            let bytes = unsafe { std::slice::from_raw_parts(value as *const u8, size) };
            ArgValue::Bytes(bytes.to_vec())
        };
        state.kernel_mut(kernel)?.args[index as usize] = Some(arg_value);
        Ok(())
    }
    fn create_user_event(&self, context: Handle) -> NativeResult<Handle> {
        let mut state = self.state.lock();
        state.context(context)?;
        let now = state.now();
        self.insert(
            &mut state,
            Obj::Event(EventObj {
                context,
                queue: None,
                command_type: cl::COMMAND_USER,
                status: cl::SUBMITTED,
                profiling: false,
                times: [now, now, 0, 0],
                callbacks: Vec::new(),
            }),
        )
    }
    fn set_user_event_status(&self, event: Handle, status: i32) -> NativeResult<()> {
        let mut state = self.state.lock();
        let event_obj = state.event_mut(event)?;
        if event_obj.command_type != cl::COMMAND_USER {
            return Err(cl::INVALID_EVENT);
        }
        if status > cl::COMPLETE {
            return Err(cl::INVALID_VALUE);
        }
        if event_obj.status != cl::SUBMITTED {
            return Err(cl::INVALID_OPERATION);
        }
        state.set_status(event, status);
        state.progress();
        self.changed.notify_all();
        self.dispatch(state);
        Ok(())
    }
    fn wait_for_events(&self, events: &[Handle]) -> NativeResult<()> {
        let mut state = self.state.lock();
        if events.is_empty() {
            return Err(cl::INVALID_VALUE);
        }
        let context = state.event(events[0])?.context;
        for event in events {
            if state.event(*event)?.context != context {
                return Err(cl::INVALID_CONTEXT);
            }
        }
        loop {
            let statuses: Vec<i32> = events.iter().map(|e| state.event_status(*e)).collect();
            if statuses.iter().any(|status| *status < cl::COMPLETE) {
                return Err(cl::EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST);
            }
            if statuses.iter().all(|status| *status == cl::COMPLETE) {
                return Ok(());
            }
            self.changed.wait(&mut state);
        }
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
        let state = self.state.lock();
        Self::same_context(&state, queue, buffer)?;
        let (storage, at) = state.resolve(buffer, offset, size)?;
        if ptr.is_null() {
            return Err(cl::INVALID_VALUE);
        }
        let dst = HostPtr(ptr as *mut u8);
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_READ_BUFFER,
                wait: wait.to_vec(),
                uses: vec![buffer],
                blocking,
                cost: transfer_cost(size),
                run: Box::new(move |state: &mut State| match state.mem(storage) {
                    Ok(mem) => {
                        // Safety: the caller guarantees dst is valid for size bytes until completion.
                        unsafe { ptr::copy_nonoverlapping(mem.data.as_ptr().add(at), dst.get(), size) };
                        cl::SUCCESS
                    }
                    Err(code) => code,
                }),
            },
        )
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
        let state = self.state.lock();
        Self::same_context(&state, queue, buffer)?;
        let (storage, at) = state.resolve(buffer, offset, size)?;
        if ptr.is_null() {
            return Err(cl::INVALID_VALUE);
        }
        let src = HostPtr(ptr as *mut u8);
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_WRITE_BUFFER,
                wait: wait.to_vec(),
                uses: vec![buffer],
                blocking,
                cost: transfer_cost(size),
                run: Box::new(move |state: &mut State| match state.mem_mut(storage) {
                    Ok(mem) => {
                        // Safety: the caller guarantees src is valid for size bytes until completion.
                        unsafe { ptr::copy_nonoverlapping(src.get() as *const u8, mem.data.as_mut_ptr().add(at), size) };
                        cl::SUCCESS
                    }
                    Err(code) => code,
                }),
            },
        )
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
        let state = self.state.lock();
        Self::same_context(&state, queue, src)?;
        Self::same_context(&state, queue, dst)?;
        let (src_storage, src_at) = state.resolve(src, src_offset, size)?;
        let (dst_storage, dst_at) = state.resolve(dst, dst_offset, size)?;
        if src_storage == dst_storage && src_at < dst_at + size && dst_at < src_at + size {
            return Err(cl::MEM_COPY_OVERLAP);
        }
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_COPY_BUFFER,
                wait: wait.to_vec(),
                uses: vec![src, dst],
                blocking: false,
                cost: transfer_cost(size),
                run: Box::new(move |state: &mut State| {
                    let bytes = match state.mem(src_storage) {
                        Ok(mem) => mem.data[src_at..src_at + size].to_vec(),
                        Err(code) => return code,
                    };
                    match state.mem_mut(dst_storage) {
                        Ok(mem) => {
                            mem.data[dst_at..dst_at + size].copy_from_slice(&bytes);
                            cl::SUCCESS
                        }
                        Err(code) => code,
                    }
                }),
            },
        )
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
        let state = self.state.lock();
        Self::same_context(&state, queue, buffer)?;
        let (storage, at) = state.resolve(buffer, offset, size)?;
        if !matches!(pattern.len(), 1 | 2 | 4 | 8 | 16 | 32 | 64 | 128)
            || offset % pattern.len() != 0
            || size % pattern.len() != 0
        {
            return Err(cl::INVALID_VALUE);
        }
        let pattern = pattern.to_vec();
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_FILL_BUFFER,
                wait: wait.to_vec(),
                uses: vec![buffer],
                blocking: false,
                cost: transfer_cost(size),
                run: Box::new(move |state: &mut State| match state.mem_mut(storage) {
                    Ok(mem) => {
                        for chunk in mem.data[at..at + size].chunks_exact_mut(pattern.len()) {
                            chunk.copy_from_slice(&pattern);
                        }
                        cl::SUCCESS
                    }
                    Err(code) => code,
                }),
            },
        )
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
        let mut state = self.state.lock();
        Self::same_context(&state, queue, buffer)?;
        let (storage, at) = state.resolve(buffer, offset, size)?;
        if map_flags & !(cl::MAP_READ | cl::MAP_WRITE | cl::MAP_WRITE_INVALIDATE_REGION) != 0 {
            return Err(cl::INVALID_VALUE);
        }
        let mapping = Mapping {
            staging: vec![0u8; size].into_boxed_slice(),
            write: map_flags & (cl::MAP_WRITE | cl::MAP_WRITE_INVALIDATE_REGION) != 0,
            layout: MapLayout::Linear { offset: at },
        };
        let mapped = mapping.ptr();
        state.mem_mut(storage)?.mappings.push(mapping);
        let event = self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_MAP_BUFFER,
                wait: wait.to_vec(),
                uses: vec![buffer],
                blocking,
                cost: transfer_cost(size),
                run: Box::new(move |state: &mut State| match state.mem_mut(storage) {
                    Ok(mem) => {
                        let MemObj { data, mappings, .. } = mem;
                        match mappings.iter_mut().find(|m| m.ptr() == mapped) {
                            Some(mapping) => {
                                mapping.staging.copy_from_slice(&data[at..at + size]);
                                cl::SUCCESS
                            }
                            None => cl::MAP_FAILURE,
                        }
                    }
                    Err(code) => code,
                }),
            },
        );
        match event {
            Ok(event) => Ok((event, mapped as *mut c_void)),
            Err(code) => {
                if let Ok(mem) = self.state.lock().mem_mut(storage) {
                    mem.mappings.retain(|m| m.ptr() != mapped);
                }
                Err(code)
            }
        }
    }
    unsafe fn enqueue_unmap(&self, queue: Handle, mem: Handle, ptr: *mut c_void, wait: &[Handle]) -> NativeResult<Handle> {
        let state = self.state.lock();
        Self::same_context(&state, queue, mem)?;
        let mapped = ptr as usize;
        let storage = state.storage(mem)?;
        if !state.mem(storage)?.mappings.iter().any(|m| m.ptr() == mapped) {
            return Err(cl::INVALID_VALUE);
        }
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_UNMAP_MEM_OBJECT,
                wait: wait.to_vec(),
                uses: vec![mem],
                blocking: false,
                cost: 1,
                run: Box::new(move |state: &mut State| {
                    let mem = match state.mem_mut(storage) {
                        Ok(mem) => mem,
                        Err(code) => return code,
                    };
                    let index = match mem.mappings.iter().position(|m| m.ptr() == mapped) {
                        Some(index) => index,
                        None => return cl::INVALID_VALUE,
                    };
                    let mapping = mem.mappings.remove(index);
                    if mapping.write {
                        match mapping.layout {
                            MapLayout::Linear { offset } => {
                                mem.data[offset..offset + mapping.staging.len()].copy_from_slice(&mapping.staging);
                            }
                            MapLayout::Image { origin, region } => {
                                if let Some(image) = mem.image {
                                    let row = region[0] * image.element_size;
                                    let slice = row * region[1];
                                    let data = &mut mem.data;
                                    image.for_each_row(origin, region, row, slice, |image_offset, host_offset, len| {
                                        data[image_offset..image_offset + len]
                                            .copy_from_slice(&mapping.staging[host_offset..host_offset + len]);
                                    });
                                }
                            }
                        }
                    }
                    cl::SUCCESS
                }),
            },
        )
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
        let state = self.state.lock();
        Self::same_context(&state, queue, image)?;
        let info = state.mem(image)?.image.ok_or(cl::INVALID_MEM_OBJECT)?;
        info.check_region(origin, region)?;
        let (row_pitch, slice_pitch) = info.host_pitches(region, row_pitch, slice_pitch)?;
        if ptr.is_null() {
            return Err(cl::INVALID_VALUE);
        }
        let dst = HostPtr(ptr as *mut u8);
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_READ_IMAGE,
                wait: wait.to_vec(),
                uses: vec![image],
                blocking,
                cost: transfer_cost(region.iter().product::<usize>() * info.element_size),
                run: Box::new(move |state: &mut State| match state.mem(image) {
                    Ok(mem) => {
                        let dst = dst.get();
                        info.for_each_row(origin, region, row_pitch, slice_pitch, |image_offset, host_offset, len| {
                            // Safety: the caller guarantees dst covers the region with the given pitches.
                            unsafe { ptr::copy_nonoverlapping(mem.data.as_ptr().add(image_offset), dst.add(host_offset), len) };
                        });
                        cl::SUCCESS
                    }
                    Err(code) => code,
                }),
            },
        )
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
        let state = self.state.lock();
        Self::same_context(&state, queue, image)?;
        let info = state.mem(image)?.image.ok_or(cl::INVALID_MEM_OBJECT)?;
        info.check_region(origin, region)?;
        let (row_pitch, slice_pitch) = info.host_pitches(region, row_pitch, slice_pitch)?;
        if ptr.is_null() {
            return Err(cl::INVALID_VALUE);
        }
        let src = HostPtr(ptr as *mut u8);
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_WRITE_IMAGE,
                wait: wait.to_vec(),
                uses: vec![image],
                blocking,
                cost: transfer_cost(region.iter().product::<usize>() * info.element_size),
                run: Box::new(move |state: &mut State| match state.mem_mut(image) {
                    Ok(mem) => {
                        let src = src.get() as *const u8;
                        let data = &mut mem.data;
                        info.for_each_row(origin, region, row_pitch, slice_pitch, |image_offset, host_offset, len| {
                            // Safety: the caller guarantees src covers the region with the given pitches.
                            unsafe { ptr::copy_nonoverlapping(src.add(host_offset), data.as_mut_ptr().add(image_offset), len) };
                        });
                        cl::SUCCESS
                    }
                    Err(code) => code,
                }),
            },
        )
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
        let mut state = self.state.lock();
        Self::same_context(&state, queue, image)?;
        let info = state.mem(image)?.image.ok_or(cl::INVALID_MEM_OBJECT)?;
        info.check_region(origin, region)?;
        let row_pitch = region[0] * info.element_size;
        let slice_pitch = row_pitch * region[1];
        let mapping = Mapping {
            staging: vec![0u8; slice_pitch * region[2]].into_boxed_slice(),
            write: map_flags & (cl::MAP_WRITE | cl::MAP_WRITE_INVALIDATE_REGION) != 0,
            layout: MapLayout::Image { origin, region },
        };
        let mapped = mapping.ptr();
        state.mem_mut(image)?.mappings.push(mapping);
        let event = self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_MAP_IMAGE,
                wait: wait.to_vec(),
                uses: vec![image],
                blocking,
                cost: transfer_cost(slice_pitch * region[2]),
                run: Box::new(move |state: &mut State| match state.mem_mut(image) {
                    Ok(mem) => {
                        let MemObj { data, mappings, .. } = mem;
                        match mappings.iter_mut().find(|m| m.ptr() == mapped) {
                            Some(mapping) => {
                                let staging = &mut mapping.staging;
                                info.for_each_row(origin, region, row_pitch, slice_pitch, |image_offset, host_offset, len| {
                                    staging[host_offset..host_offset + len]
                                        .copy_from_slice(&data[image_offset..image_offset + len]);
                                });
                                cl::SUCCESS
                            }
                            None => cl::MAP_FAILURE,
                        }
                    }
                    Err(code) => code,
                }),
            },
        );
        match event {
            Ok(event) => Ok((event, mapped as *mut c_void, row_pitch, slice_pitch)),
            Err(code) => {
                if let Ok(mem) = self.state.lock().mem_mut(image) {
                    mem.mappings.retain(|m| m.ptr() != mapped);
                }
                Err(code)
            }
        }
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
        let state = self.state.lock();
        Self::same_context(&state, queue, image)?;
        Self::same_context(&state, queue, buffer)?;
        let info = state.mem(image)?.image.ok_or(cl::INVALID_MEM_OBJECT)?;
        info.check_region(origin, region)?;
        let size = region.iter().product::<usize>() * info.element_size;
        let (storage, dst_offset) = state.resolve(buffer, dst_offset, size)?;
        let row = region[0] * info.element_size;
        let slice = row * region[1];
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_COPY_IMAGE_TO_BUFFER,
                wait: wait.to_vec(),
                uses: vec![image, buffer],
                blocking: false,
                cost: transfer_cost(size),
                run: Box::new(move |state: &mut State| {
                    let mut bytes = vec![0u8; size];
                    match state.mem(image) {
                        Ok(mem) => info.for_each_row(origin, region, row, slice, |image_offset, host_offset, len| {
                            bytes[host_offset..host_offset + len]
                                .copy_from_slice(&mem.data[image_offset..image_offset + len]);
                        }),
                        Err(code) => return code,
                    }
                    match state.mem_mut(storage) {
                        Ok(mem) => {
                            mem.data[dst_offset..dst_offset + size].copy_from_slice(&bytes);
                            cl::SUCCESS
                        }
                        Err(code) => code,
                    }
                }),
            },
        )
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
        let state = self.state.lock();
        Self::same_context(&state, queue, image)?;
        Self::same_context(&state, queue, buffer)?;
        let info = state.mem(image)?.image.ok_or(cl::INVALID_MEM_OBJECT)?;
        info.check_region(origin, region)?;
        let size = region.iter().product::<usize>() * info.element_size;
        let (storage, src_offset) = state.resolve(buffer, src_offset, size)?;
        let row = region[0] * info.element_size;
        let slice = row * region[1];
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_COPY_BUFFER_TO_IMAGE,
                wait: wait.to_vec(),
                uses: vec![buffer, image],
                blocking: false,
                cost: transfer_cost(size),
                run: Box::new(move |state: &mut State| {
                    let bytes = match state.mem(storage) {
                        Ok(mem) => mem.data[src_offset..src_offset + size].to_vec(),
                        Err(code) => return code,
                    };
                    match state.mem_mut(image) {
                        Ok(mem) => {
                            let data = &mut mem.data;
                            info.for_each_row(origin, region, row, slice, |image_offset, host_offset, len| {
                                data[image_offset..image_offset + len]
                                    .copy_from_slice(&bytes[host_offset..host_offset + len]);
                            });
                            cl::SUCCESS
                        }
                        Err(code) => code,
                    }
                }),
            },
        )
    }
    fn enqueue_migrate_mem_objects(&self, queue: Handle, mems: &[Handle], flags: u64, wait: &[Handle]) -> NativeResult<Handle> {
        let state = self.state.lock();
        if mems.is_empty()
            || flags & !(cl::MIGRATE_MEM_OBJECT_HOST | cl::MIGRATE_MEM_OBJECT_CONTENT_UNDEFINED) != 0
        {
            return Err(cl::INVALID_VALUE);
        }
        for mem in mems {
            Self::same_context(&state, queue, *mem)?;
        }
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_MIGRATE_MEM_OBJECTS,
                wait: wait.to_vec(),
                uses: mems.to_vec(),
                blocking: false,
                cost: 1,
                run: Box::new(|_: &mut State| cl::SUCCESS),
            },
        )
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
        let state = self.state.lock();
        let queue_obj = state.queue(queue)?;
        let kernel_obj = state.kernel(kernel)?;
        if queue_obj.context != kernel_obj.context {
            return Err(cl::INVALID_CONTEXT);
        }
        let program = state.program(kernel_obj.program)?;
        let built = program
            .devices
            .iter()
            .zip(program.builds.iter())
            .any(|(device, build)| *device == queue_obj.device && build.is_executable());
        if !built {
            return Err(cl::INVALID_PROGRAM_EXECUTABLE);
        }
        let dims = work_dim as usize;
        if !(1..=3).contains(&dims) {
            return Err(cl::INVALID_WORK_DIMENSION);
        }
        if global_size.len() != dims || global_size.iter().any(|x| *x == 0) {
            return Err(cl::INVALID_GLOBAL_WORK_SIZE);
        }
        if let Some(offset) = global_offset {
            if offset.len() != dims {
                return Err(cl::INVALID_GLOBAL_OFFSET);
            }
        }
        if kernel_obj.args.iter().any(Option::is_none) {
            return Err(cl::INVALID_KERNEL_ARGS);
        }
        let desc = self.device_desc(state.device_index(queue_obj.device)?);
        if let Some(local) = local_size {
            if local.len() != dims {
                return Err(cl::INVALID_WORK_GROUP_SIZE);
            }
            for i in 0..dims {
                if local[i] == 0 || local[i] > desc.max_work_item_sizes[i] {
                    return Err(cl::INVALID_WORK_ITEM_SIZE);
                }
                if global_size[i] % local[i] != 0 {
                    return Err(cl::INVALID_WORK_GROUP_SIZE);
                }
            }
            if local.iter().product::<usize>() > desc.max_work_group_size {
                return Err(cl::INVALID_WORK_GROUP_SIZE);
            }
        }
        let mut uses = vec![kernel];
        for arg in kernel_obj.args.iter().flatten() {
            match arg {
                ArgValue::Mem(Some(handle)) | ArgValue::Sampler(handle) => uses.push(*handle),
                ArgValue::Mem(None) | ArgValue::Local(_) | ArgValue::Bytes(_) => (),
            }
        }
        let items = global_size.iter().product::<usize>() as u64;
        let cost = items / u64::from(desc.compute_units.max(1));
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_NDRANGE_KERNEL,
                wait: wait.to_vec(),
                uses,
                blocking: false,
                cost,
                run: Box::new(|_: &mut State| cl::SUCCESS),
            },
        )
    }
    fn create_sub_devices(&self, device: Handle, properties: &[isize]) -> NativeResult<Vec<Handle>> {
        let mut state = self.state.lock();
        let root = state.device_index(device)?;
        let desc = self.device_desc(root);
        if desc.device_type & cl::DEVICE_TYPE_CPU == 0 {
            return Err(cl::INVALID_VALUE);
        }
        let compute_units = state
            .sub_device(device)
            .map_or(desc.compute_units, |sub| sub.compute_units);
        let split = partition::partition(properties, compute_units)?;
        let mut devices = Vec::with_capacity(split.units.len());
        for compute_units in split.units {
            devices.push(self.insert(
                &mut state,
                Obj::SubDevice(SubDeviceObj {
                    parent: device,
                    root,
                    compute_units,
                    partition: split.properties.clone(),
                }),
            )?);
        }
        Ok(devices)
    }
    fn create_sub_buffer(&self, buffer: Handle, flags: u64, origin: usize, size: usize) -> NativeResult<Handle> {
        let mut state = self.state.lock();
        let parent = state.mem(buffer)?;
        if parent.image.is_some() || parent.region.is_some() {
            return Err(cl::INVALID_MEM_OBJECT);
        }
        if size == 0 {
            return Err(cl::INVALID_BUFFER_SIZE);
        }
        Self::check_range(parent.data.len(), origin, size)?;
        if flags & (cl::MEM_USE_HOST_PTR | cl::MEM_ALLOC_HOST_PTR | cl::MEM_COPY_HOST_PTR) != 0 {
            return Err(cl::INVALID_VALUE);
        }
        let mask = cl::MEM_READ_WRITE | cl::MEM_WRITE_ONLY | cl::MEM_READ_ONLY;
        let access = flags & mask;
        let parent_access = parent.flags & mask;
        let allowed = match parent_access {
            cl::MEM_READ_ONLY => access & (cl::MEM_WRITE_ONLY | cl::MEM_READ_WRITE) == 0,
            cl::MEM_WRITE_ONLY => access & (cl::MEM_READ_ONLY | cl::MEM_READ_WRITE) == 0,
            _ => true,
        };
        if access.count_ones() > 1 || !allowed {
            return Err(cl::INVALID_VALUE);
        }
        if origin % BASE_ADDR_ALIGN != 0 {
            return Err(cl::MISALIGNED_SUB_BUFFER_OFFSET);
        }
        let context = parent.context;
        let flags = if access == 0 { flags | parent_access } else { flags };
        self.insert(
            &mut state,
            Obj::Mem(MemObj {
                context,
                flags,
                data: Vec::new(),
                image: None,
                mappings: Vec::new(),
                region: Some(SubRegion {
                    parent: buffer,
                    origin,
                    size,
                }),
            }),
        )
    }
    fn compile_program(
        &self,
        program: Handle,
        devices: &[Handle],
        options: &str,
        headers: &[(Handle, &str)],
    ) -> NativeResult<()> {
        let mut state = self.state.lock();
        let program_obj = state.program(program)?;
        let targets = Self::build_targets(program_obj, devices)?;
        let source = program_obj.source.clone().ok_or(cl::INVALID_OPERATION)?;
        if Self::has_kernels(&state, program) {
            return Err(cl::INVALID_OPERATION);
        }
        if !compiler::check_options(options) {
            return Err(cl::INVALID_COMPILER_OPTIONS);
        }
        let headers = headers
            .iter()
            .map(|(header, name)| {
                let source = state.program(*header)?.source.clone().ok_or(cl::INVALID_OPERATION)?;
                Ok((name.to_string(), source))
            })
            .collect::<NativeResult<Vec<_>>>()?;
        let compiled = compiler::expand_includes(&source, &headers).and_then(|text| compiler::compile(&text));
        let program_obj = state.program_mut(program)?;
        for i in targets {
            let build = &mut program_obj.builds[i];
            build.options = options.to_string();
            match &compiled {
                Ok(kernels) => {
                    build.status = cl::BUILD_SUCCESS;
                    build.log.clear();
                    build.binary_type = cl::PROGRAM_BINARY_TYPE_COMPILED_OBJECT;
                    build.kernels = kernels.clone();
                }
                Err(log) => {
                    build.status = cl::BUILD_ERROR;
                    build.log = log.clone();
                    build.binary_type = cl::PROGRAM_BINARY_TYPE_NONE;
                    build.kernels.clear();
                }
            }
        }
        compiled.map(|_| ()).map_err(|_| cl::COMPILE_PROGRAM_FAILURE)
    }
    fn link_program(
        &self,
        context: Handle,
        devices: &[Handle],
        options: &str,
        programs: &[Handle],
    ) -> NativeResult<Handle> {
        let mut state = self.state.lock();
        let context_obj = state.context(context)?;
        self.check_devices(&state, context_obj, devices)?;
        let devices = if devices.is_empty() {
            context_obj.devices.clone()
        } else {
            devices.to_vec()
        };
        if programs.is_empty() {
            return Err(cl::INVALID_VALUE);
        }
        if !compiler::check_options(options) {
            return Err(cl::INVALID_LINKER_OPTIONS);
        }
        let binary_type = if options.split_whitespace().any(|option| option == "-create-library") {
            cl::PROGRAM_BINARY_TYPE_LIBRARY
        } else {
            cl::PROGRAM_BINARY_TYPE_EXECUTABLE
        };
        let mut builds = Vec::with_capacity(devices.len());
        for device in devices.iter() {
            let mut kernels = Vec::<KernelSig>::new();
            for program in programs {
                let program_obj = state.program(*program)?;
                if program_obj.context != context {
                    return Err(cl::INVALID_CONTEXT);
                }
                let build = program_obj
                    .devices
                    .iter()
                    .position(|x| x == device)
                    .map(|i| &program_obj.builds[i])
                    .filter(|build| build.is_linkable())
                    .ok_or(cl::INVALID_OPERATION)?;
                for kernel in build.kernels.iter() {
                    if kernels.iter().any(|k| k.name == kernel.name) {
                        log::debug!("link failed, kernel {:?} is defined twice", kernel.name);
                        return Err(cl::LINK_PROGRAM_FAILURE);
                    }
                    kernels.push(kernel.clone());
                }
            }
            builds.push(Build {
                status: cl::BUILD_SUCCESS,
                options: options.to_string(),
                log: String::new(),
                binary_type,
                kernels,
            });
        }
        self.insert(
            &mut state,
            Obj::Program(ProgramObj {
                context,
                devices,
                source: None,
                builds,
            }),
        )
    }
    fn set_event_callback(&self, event: Handle, status: i32, callback: EventCallback) -> NativeResult<()> {
        if !matches!(status, cl::COMPLETE | cl::RUNNING | cl::SUBMITTED) {
            return Err(cl::INVALID_VALUE);
        }
        let mut state = self.state.lock();
        let event_obj = state.event_mut(event)?;
        event_obj.callbacks.push((status, callback));
        let current = event_obj.status;
        state.retain_raw(event);
        state.set_status(event, current);
        self.dispatch(state);
        Ok(())
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
        let state = self.state.lock();
        Self::same_context(&state, queue, buffer)?;
        let buffer_rect = rect_pitches(buffer_rect, region)?;
        let host_rect = rect_pitches(host_rect, region)?;
        let (storage, base) = state.resolve(buffer, 0, rect_extent(&buffer_rect, region))?;
        if ptr.is_null() {
            return Err(cl::INVALID_VALUE);
        }
        let dst = HostPtr(ptr as *mut u8);
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_READ_BUFFER_RECT,
                wait: wait.to_vec(),
                uses: vec![buffer],
                blocking,
                cost: transfer_cost(region.iter().product()),
                run: Box::new(move |state: &mut State| match state.mem(storage) {
                    Ok(mem) => {
                        let dst = dst.get();
                        for_each_rect_row(&buffer_rect, &host_rect, region, |buffer_offset, host_offset, len| {
                            // Safety: the caller guarantees dst covers the host rectangle.
                            unsafe { ptr::copy_nonoverlapping(mem.data.as_ptr().add(base + buffer_offset), dst.add(host_offset), len) };
                        });
                        cl::SUCCESS
                    }
                    Err(code) => code,
                }),
            },
        )
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
        let state = self.state.lock();
        Self::same_context(&state, queue, buffer)?;
        let buffer_rect = rect_pitches(buffer_rect, region)?;
        let host_rect = rect_pitches(host_rect, region)?;
        let (storage, base) = state.resolve(buffer, 0, rect_extent(&buffer_rect, region))?;
        if ptr.is_null() {
            return Err(cl::INVALID_VALUE);
        }
        let src = HostPtr(ptr as *mut u8);
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_WRITE_BUFFER_RECT,
                wait: wait.to_vec(),
                uses: vec![buffer],
                blocking,
                cost: transfer_cost(region.iter().product()),
                run: Box::new(move |state: &mut State| match state.mem_mut(storage) {
                    Ok(mem) => {
                        let src = src.get() as *const u8;
                        let data = mem.data.as_mut_ptr();
                        for_each_rect_row(&buffer_rect, &host_rect, region, |buffer_offset, host_offset, len| {
                            // Safety: the caller guarantees src covers the host rectangle.
                            unsafe { ptr::copy_nonoverlapping(src.add(host_offset), data.add(base + buffer_offset), len) };
                        });
                        cl::SUCCESS
                    }
                    Err(code) => code,
                }),
            },
        )
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
        let state = self.state.lock();
        Self::same_context(&state, queue, src)?;
        Self::same_context(&state, queue, dst)?;
        let src_rect = rect_pitches(src_rect, region)?;
        let dst_rect = rect_pitches(dst_rect, region)?;
        let packed = rect_pitches(BufferRect::default(), region)?;
        let (src_storage, src_base) = state.resolve(src, 0, rect_extent(&src_rect, region))?;
        let (dst_storage, dst_base) = state.resolve(dst, 0, rect_extent(&dst_rect, region))?;
        if src_storage == dst_storage && rects_overlap(&src_rect, src_base, &dst_rect, dst_base, region) {
            return Err(cl::MEM_COPY_OVERLAP);
        }
        let size = region.iter().product::<usize>();
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_COPY_BUFFER_RECT,
                wait: wait.to_vec(),
                uses: vec![src, dst],
                blocking: false,
                cost: transfer_cost(size),
                run: Box::new(move |state: &mut State| {
                    let mut bytes = vec![0u8; size];
                    match state.mem(src_storage) {
                        Ok(mem) => for_each_rect_row(&src_rect, &packed, region, |src_offset, offset, len| {
                            let at = src_base + src_offset;
                            bytes[offset..offset + len].copy_from_slice(&mem.data[at..at + len]);
                        }),
                        Err(code) => return code,
                    }
                    match state.mem_mut(dst_storage) {
                        Ok(mem) => {
                            for_each_rect_row(&dst_rect, &packed, region, |dst_offset, offset, len| {
                                let at = dst_base + dst_offset;
                                mem.data[at..at + len].copy_from_slice(&bytes[offset..offset + len]);
                            });
                            cl::SUCCESS
                        }
                        Err(code) => code,
                    }
                }),
            },
        )
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
        let state = self.state.lock();
        Self::same_context(&state, queue, src)?;
        Self::same_context(&state, queue, dst)?;
        let src_info = state.mem(src)?.image.ok_or(cl::INVALID_MEM_OBJECT)?;
        let dst_info = state.mem(dst)?.image.ok_or(cl::INVALID_MEM_OBJECT)?;
        if src_info.format != dst_info.format {
            return Err(cl::IMAGE_FORMAT_MISMATCH);
        }
        src_info.check_region(src_origin, region)?;
        dst_info.check_region(dst_origin, region)?;
        if src == dst && boxes_overlap(src_origin, dst_origin, region) {
            return Err(cl::MEM_COPY_OVERLAP);
        }
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_COPY_IMAGE,
                wait: wait.to_vec(),
                uses: vec![src, dst],
                blocking: false,
                cost: transfer_cost(region.iter().product::<usize>() * src_info.element_size),
                run: Box::new(move |state: &mut State| {
                    let bytes = match state.mem(src) {
                        Ok(mem) => src_info.read_region(&mem.data, src_origin, region),
                        Err(code) => return code,
                    };
                    match state.mem_mut(dst) {
                        Ok(mem) => {
                            dst_info.write_region(&mut mem.data, dst_origin, region, &bytes);
                            cl::SUCCESS
                        }
                        Err(code) => code,
                    }
                }),
            },
        )
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
        let state = self.state.lock();
        Self::same_context(&state, queue, image)?;
        let info = state.mem(image)?.image.ok_or(cl::INVALID_MEM_OBJECT)?;
        info.check_region(origin, region)?;
        let element = encode_fill(&info.format, color)?;
        let count = region.iter().product::<usize>();
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_FILL_IMAGE,
                wait: wait.to_vec(),
                uses: vec![image],
                blocking: false,
                cost: transfer_cost(count * info.element_size),
                run: Box::new(move |state: &mut State| match state.mem_mut(image) {
                    Ok(mem) => {
                        info.write_region(&mut mem.data, origin, region, &element.repeat(count));
                        cl::SUCCESS
                    }
                    Err(code) => code,
                }),
            },
        )
    }
    fn enqueue_marker(&self, queue: Handle, wait: &[Handle]) -> NativeResult<Handle> {
        let state = self.state.lock();
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_MARKER,
                wait: wait.to_vec(),
                uses: Vec::new(),
                blocking: false,
                cost: 1,
                run: Box::new(|_: &mut State| cl::SUCCESS),
            },
        )
    }
    fn enqueue_barrier(&self, queue: Handle, wait: &[Handle]) -> NativeResult<Handle> {
        let state = self.state.lock();
        self.submit(
            state,
            Submit {
                queue,
                command_type: cl::COMMAND_BARRIER,
                wait: wait.to_vec(),
                uses: Vec::new(),
                blocking: false,
                cost: 1,
                run: Box::new(|_: &mut State| cl::SUCCESS),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info<T: Pod>(runtime: &HostRuntime, query: InfoQuery, param: u32) -> T {
        let size = runtime.get_info(query, param, None).unwrap();
        let mut bytes = vec![0u8; size];
        runtime.get_info(query, param, Some(&mut bytes)).unwrap();
        bytemuck::pod_read_unaligned(&bytes)
    }

    fn setup(runtime: &HostRuntime) -> (Handle, Handle, Handle) {
        let platform = runtime.platform_ids().unwrap()[0];
        let device = runtime.device_ids(platform, cl::DEVICE_TYPE_GPU).unwrap()[0];
        let context = runtime.create_context(&[], &[device]).unwrap();
        let queue = runtime
            .create_queue(context, device, cl::QUEUE_PROFILING_ENABLE)
            .unwrap();
        (device, context, queue)
    }

    #[test]
    fn enumerate() {
        let runtime = HostRuntime::new();
        let platforms = runtime.platform_ids().unwrap();
        assert_eq!(platforms.len(), 2);
        let all = runtime.device_ids(platforms[1], cl::DEVICE_TYPE_ALL).unwrap();
        assert_eq!(all.len(), 3);
        let cpus = runtime.device_ids(platforms[1], cl::DEVICE_TYPE_CPU).unwrap();
        assert_eq!(cpus.len(), 2);
        assert_eq!(
            runtime.device_ids(platforms[0], cl::DEVICE_TYPE_ACCELERATOR),
            Err(cl::DEVICE_NOT_FOUND)
        );
        let platform: usize = info(&runtime, InfoQuery::Device(all[0]), cl::DEVICE_PLATFORM);
        assert_eq!(platform, platforms[1].as_raw());
        assert_eq!(
            runtime.get_info(InfoQuery::Device(all[0]), 0xFFFF, None),
            Err(cl::INVALID_VALUE)
        );
    }

    #[test]
    fn reference_counts_cascade() {
        let runtime = HostRuntime::new();
        let (_, context, queue) = setup(&runtime);
        let refs: u32 = info(&runtime, InfoQuery::Context(context), cl::CONTEXT_REFERENCE_COUNT);
        assert_eq!(refs, 2);
        runtime.release(Class::Context, context).unwrap();
        // the queue keeps the context alive
        let ctx: usize = info(&runtime, InfoQuery::Queue(queue), cl::QUEUE_CONTEXT);
        assert_eq!(ctx, context.as_raw());
        assert_eq!(runtime.release(Class::Context, queue), Err(cl::INVALID_CONTEXT));
        runtime.release(Class::Queue, queue).unwrap();
        assert!(runtime.state.lock().objects.get(&context).is_none());
    }

    #[test]
    fn user_event_defers_commands() {
        let runtime = HostRuntime::new();
        let (_, context, queue) = setup(&runtime);
        let buffer = unsafe { runtime.create_buffer(context, cl::MEM_READ_WRITE, 16, ptr::null_mut()) }.unwrap();
        let user = runtime.create_user_event(context).unwrap();
        let data = [7u8; 16];
        let write = unsafe {
            runtime.enqueue_write_buffer(queue, buffer, false, 0, 16, data.as_ptr() as _, &[user])
        }
        .unwrap();
        let status: i32 = info(&runtime, InfoQuery::Event(write), cl::EVENT_COMMAND_EXECUTION_STATUS);
        assert_eq!(status, cl::SUBMITTED);
        assert_eq!(
            runtime.get_info(InfoQuery::EventProfiling(write), cl::PROFILING_COMMAND_END, None),
            Err(cl::PROFILING_INFO_NOT_AVAILABLE)
        );
        runtime.set_user_event_status(user, cl::COMPLETE).unwrap();
        runtime.wait_for_events(&[write]).unwrap();
        let mut out = [0u8; 16];
        unsafe {
            runtime.enqueue_read_buffer(queue, buffer, true, 0, 16, out.as_mut_ptr() as _, &[])
        }
        .unwrap();
        assert_eq!(out, data);
        let start: u64 = info(&runtime, InfoQuery::EventProfiling(write), cl::PROFILING_COMMAND_START);
        let end: u64 = info(&runtime, InfoQuery::EventProfiling(write), cl::PROFILING_COMMAND_END);
        assert!(end > start);
        assert_eq!(runtime.set_user_event_status(user, cl::COMPLETE), Err(cl::INVALID_OPERATION));
    }

    #[test]
    fn failed_user_event_propagates() {
        let runtime = HostRuntime::new();
        let (_, context, queue) = setup(&runtime);
        let user = runtime.create_user_event(context).unwrap();
        let marker = runtime.enqueue_marker(queue, &[user]).unwrap();
        runtime.set_user_event_status(user, -1).unwrap();
        assert_eq!(
            runtime.wait_for_events(&[marker]),
            Err(cl::EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST)
        );
        runtime.finish(queue).unwrap();
    }

    #[test]
    fn build_and_kernel_args() {
        let runtime = HostRuntime::new();
        let (device, context, queue) = setup(&runtime);
        let program = runtime
            .create_program_with_source(context, &["__kernel void scale(__global float* x, float a) {}"])
            .unwrap();
        assert_eq!(runtime.create_kernel(program, "scale"), Err(cl::INVALID_PROGRAM_EXECUTABLE));
        assert_eq!(runtime.build_program(program, &[], "fast"), Err(cl::INVALID_BUILD_OPTIONS));
        runtime.build_program(program, &[], "-cl-fast-relaxed-math").unwrap();
        let status: i32 = info(&runtime, InfoQuery::ProgramBuild(program, device), cl::PROGRAM_BUILD_STATUS);
        assert_eq!(status, cl::BUILD_SUCCESS);
        assert_eq!(runtime.create_kernel(program, "missing"), Err(cl::INVALID_KERNEL_NAME));
        let kernel = runtime.create_kernel(program, "scale").unwrap();
        assert_eq!(
            runtime.enqueue_ndrange_kernel(queue, kernel, 1, None, &[64], None, &[]),
            Err(cl::INVALID_KERNEL_ARGS)
        );
        let buffer = unsafe { runtime.create_buffer(context, 0, 256, ptr::null_mut()) }.unwrap();
        let a = 2f32;
        unsafe {
            runtime
                .set_kernel_arg(kernel, 0, size_of::<usize>(), &buffer.as_raw() as *const usize as _)
                .unwrap();
            assert_eq!(
                runtime.set_kernel_arg(kernel, 1, 8, &a as *const f32 as _),
                Err(cl::INVALID_ARG_SIZE)
            );
            runtime.set_kernel_arg(kernel, 1, 4, &a as *const f32 as _).unwrap();
        }
        assert_eq!(
            runtime.enqueue_ndrange_kernel(queue, kernel, 1, None, &[64], Some(&[48]), &[]),
            Err(cl::INVALID_WORK_GROUP_SIZE)
        );
        let event = runtime
            .enqueue_ndrange_kernel(queue, kernel, 1, None, &[64], Some(&[32]), &[])
            .unwrap();
        let command: u32 = info(&runtime, InfoQuery::Event(event), cl::EVENT_COMMAND_TYPE);
        assert_eq!(command, cl::COMMAND_NDRANGE_KERNEL);
        assert_eq!(runtime.build_program(program, &[], ""), Err(cl::INVALID_OPERATION));
    }

    #[test]
    fn program_binaries() {
        let runtime = HostRuntime::new();
        let (device, context, _) = setup(&runtime);
        let program = runtime
            .create_program_with_source(context, &["__kernel void k(__global int* x) {}"])
            .unwrap();
        runtime.build_program(program, &[], "").unwrap();
        let binaries = runtime.program_binaries(program).unwrap();
        assert_eq!(binaries.len(), 1);
        let copy = runtime
            .create_program_with_binary(context, &[device], &[binaries[0].as_slice()])
            .unwrap();
        runtime.build_program(copy, &[], "").unwrap();
        runtime.create_kernel(copy, "k").unwrap();
        assert_eq!(
            runtime.create_program_with_binary(context, &[device], &[b"garbage".as_slice()]),
            Err(cl::INVALID_BINARY)
        );
    }

    #[test]
    fn image_round_trip() {
        let runtime = HostRuntime::new();
        let (_, context, queue) = setup(&runtime);
        let format = ImageFormat {
            channel_order: cl::RGBA,
            channel_data_type: cl::UNSIGNED_INT8,
        };
        let desc = ImageDesc {
            image_type: cl::MEM_OBJECT_IMAGE2D,
            width: 4,
            height: 3,
            ..ImageDesc::default()
        };
        let image = unsafe { runtime.create_image(context, 0, &format, &desc, ptr::null_mut()) }.unwrap();
        let pixels: Vec<u8> = (0..48).collect();
        unsafe {
            runtime
                .enqueue_write_image(queue, image, true, [0; 3], [4, 3, 1], 0, 0, pixels.as_ptr() as _, &[])
                .unwrap();
        }
        let mut corner = [0u8; 8];
        unsafe {
            runtime
                .enqueue_read_image(queue, image, true, [2, 2, 0], [2, 1, 1], 0, 0, corner.as_mut_ptr() as _, &[])
                .unwrap();
        }
        assert_eq!(corner.as_slice(), &pixels[40..48]);
        let row_pitch: usize = info(&runtime, InfoQuery::Image(image), cl::IMAGE_ROW_PITCH);
        assert_eq!(row_pitch, 16);
    }

    fn rgba8(runtime: &HostRuntime, context: Handle) -> Handle {
        let format = ImageFormat {
            channel_order: cl::RGBA,
            channel_data_type: cl::UNSIGNED_INT8,
        };
        let desc = ImageDesc {
            image_type: cl::MEM_OBJECT_IMAGE2D,
            width: 4,
            height: 3,
            ..ImageDesc::default()
        };
        unsafe { runtime.create_image(context, 0, &format, &desc, ptr::null_mut()) }.unwrap()
    }

    #[test]
    fn sub_devices() {
        let runtime = HostRuntime::new();
        let platform = runtime.platform_ids().unwrap()[0];
        let cpu = runtime.device_ids(platform, cl::DEVICE_TYPE_CPU).unwrap()[0];
        let gpu = runtime.device_ids(platform, cl::DEVICE_TYPE_GPU).unwrap()[0];
        let equally = [cl::DEVICE_PARTITION_EQUALLY, 2, 0];
        assert_eq!(runtime.create_sub_devices(gpu, &equally), Err(cl::INVALID_VALUE));
        let subs = runtime.create_sub_devices(cpu, &equally).unwrap();
        assert_eq!(subs.len(), 2);
        let units: u32 = info(&runtime, InfoQuery::Device(subs[0]), cl::DEVICE_MAX_COMPUTE_UNITS);
        assert_eq!(units, 2);
        let parent: usize = info(&runtime, InfoQuery::Device(subs[0]), cl::DEVICE_PARENT_DEVICE);
        assert_eq!(parent, cpu.as_raw());
        let nested = runtime.create_sub_devices(subs[0], &[cl::DEVICE_PARTITION_EQUALLY, 1, 0]).unwrap();
        assert_eq!(nested.len(), 2);
        let context = runtime.create_context(&[], &subs[1..]).unwrap();
        runtime.release(Class::Device, subs[1]).unwrap();
        let refs: u32 = info(&runtime, InfoQuery::Device(subs[1]), cl::DEVICE_REFERENCE_COUNT);
        assert_eq!(refs, 1);
        runtime.release(Class::Context, context).unwrap();
        for device in nested.iter().chain(subs.iter().take(1)) {
            runtime.release(Class::Device, *device).unwrap();
        }
        let state = runtime.state.lock();
        assert!(subs.iter().chain(nested.iter()).all(|x| state.objects.get(x).is_none()));
    }

    #[test]
    fn sub_buffers() {
        let runtime = HostRuntime::new();
        let (_, context, queue) = setup(&runtime);
        let data: Vec<u8> = (0..=255).collect();
        let buffer = unsafe { runtime.create_buffer(context, cl::MEM_READ_ONLY, 256, ptr::null_mut()) }.unwrap();
        unsafe { runtime.enqueue_write_buffer(queue, buffer, true, 0, 256, data.as_ptr() as _, &[]) }.unwrap();
        assert_eq!(
            runtime.create_sub_buffer(buffer, 0, 64, 64),
            Err(cl::MISALIGNED_SUB_BUFFER_OFFSET)
        );
        assert_eq!(runtime.create_sub_buffer(buffer, 0, 128, 0), Err(cl::INVALID_BUFFER_SIZE));
        assert_eq!(runtime.create_sub_buffer(buffer, 0, 128, 256), Err(cl::INVALID_VALUE));
        assert_eq!(
            runtime.create_sub_buffer(buffer, cl::MEM_READ_WRITE, 128, 64),
            Err(cl::INVALID_VALUE)
        );
        let sub = runtime.create_sub_buffer(buffer, 0, 128, 64).unwrap();
        assert_eq!(runtime.create_sub_buffer(sub, 0, 0, 16), Err(cl::INVALID_MEM_OBJECT));
        let flags: u64 = info(&runtime, InfoQuery::MemObj(sub), cl::MEM_FLAGS);
        assert_eq!(flags & cl::MEM_READ_ONLY, cl::MEM_READ_ONLY);
        let offset: usize = info(&runtime, InfoQuery::MemObj(sub), cl::MEM_OFFSET);
        assert_eq!(offset, 128);
        runtime.release(Class::MemObj, buffer).unwrap();
        let mut out = [0u8; 16];
        unsafe { runtime.enqueue_read_buffer(queue, sub, true, 8, 16, out.as_mut_ptr() as _, &[]) }.unwrap();
        assert_eq!(out.as_slice(), &data[136..152]);
        assert_eq!(
            unsafe { runtime.enqueue_read_buffer(queue, sub, true, 56, 16, out.as_mut_ptr() as _, &[]) },
            Err(cl::INVALID_VALUE)
        );
        runtime.release(Class::MemObj, sub).unwrap();
        assert!(runtime.state.lock().objects.get(&buffer).is_none());
    }

    #[test]
    fn buffer_rects() {
        let runtime = HostRuntime::new();
        let (_, context, queue) = setup(&runtime);
        let zeros = [0u8; 16];
        let a = unsafe { runtime.create_buffer(context, 0, 16, ptr::null_mut()) }.unwrap();
        let b = unsafe { runtime.create_buffer(context, 0, 16, ptr::null_mut()) }.unwrap();
        for buffer in [a, b] {
            unsafe { runtime.enqueue_write_buffer(queue, buffer, true, 0, 16, zeros.as_ptr() as _, &[]) }.unwrap();
        }
        let region = [2, 2, 1];
        let inner = BufferRect::at([1, 1, 0]).pitches(4, 0);
        let src = [1u8, 2, 3, 4];
        unsafe {
            runtime
                .enqueue_write_buffer_rect(queue, a, true, inner, BufferRect::default(), region, src.as_ptr() as _, &[])
                .unwrap();
        }
        let mut all = [0u8; 16];
        unsafe { runtime.enqueue_read_buffer(queue, a, true, 0, 16, all.as_mut_ptr() as _, &[]) }.unwrap();
        assert_eq!(all, [0, 0, 0, 0, 0, 1, 2, 0, 0, 3, 4, 0, 0, 0, 0, 0]);
        let mut padded = [0u8; 6];
        let host = BufferRect::default().pitches(3, 0);
        unsafe {
            runtime
                .enqueue_read_buffer_rect(queue, a, true, inner, host, region, padded.as_mut_ptr() as _, &[])
                .unwrap();
        }
        assert_eq!(padded, [1, 2, 0, 3, 4, 0]);
        let corner = BufferRect::default().pitches(4, 0);
        assert_eq!(
            runtime.enqueue_copy_buffer_rect(queue, a, a, inner, corner, region, &[]),
            Err(cl::MEM_COPY_OVERLAP)
        );
        let bottom = BufferRect::at([0, 2, 0]).pitches(4, 0);
        let copy = runtime.enqueue_copy_buffer_rect(queue, a, b, inner, bottom, region, &[]).unwrap();
        let command: u32 = info(&runtime, InfoQuery::Event(copy), cl::EVENT_COMMAND_TYPE);
        assert_eq!(command, cl::COMMAND_COPY_BUFFER_RECT);
        unsafe { runtime.enqueue_read_buffer(queue, b, true, 0, 16, all.as_mut_ptr() as _, &[]) }.unwrap();
        assert_eq!(all, [0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 0, 0, 3, 4, 0, 0]);
        assert_eq!(
            runtime.enqueue_copy_buffer_rect(queue, a, b, inner, BufferRect::at([0, 3, 0]).pitches(4, 0), region, &[]),
            Err(cl::INVALID_VALUE)
        );
    }

    #[test]
    fn image_copy_and_fill() {
        let runtime = HostRuntime::new();
        let (_, context, queue) = setup(&runtime);
        let a = rgba8(&runtime, context);
        let b = rgba8(&runtime, context);
        let ones: [u8; 16] = bytemuck::cast([1u32, 2, 3, 4]);
        runtime.enqueue_fill_image(queue, a, &ones, [0; 3], [4, 3, 1], &[]).unwrap();
        runtime.enqueue_fill_image(queue, b, &[0; 16], [0; 3], [4, 3, 1], &[]).unwrap();
        assert_eq!(
            runtime.enqueue_copy_image(queue, a, a, [0; 3], [1, 1, 0], [2, 2, 1], &[]),
            Err(cl::MEM_COPY_OVERLAP)
        );
        runtime.enqueue_copy_image(queue, a, b, [0; 3], [2, 1, 0], [2, 2, 1], &[]).unwrap();
        let mut pixels = [0u8; 48];
        unsafe {
            runtime
                .enqueue_read_image(queue, b, true, [0; 3], [4, 3, 1], 0, 0, pixels.as_mut_ptr() as _, &[])
                .unwrap();
        }
        for (i, pixel) in pixels.chunks(4).enumerate() {
            let (x, y) = (i % 4, i / 4);
            let expected: &[u8] = if x >= 2 && y >= 1 { &[1, 2, 3, 4] } else { &[0; 4] };
            assert_eq!(pixel, expected, "pixel ({x}, {y})");
        }
        let format = ImageFormat {
            channel_order: cl::RGBA,
            channel_data_type: cl::FLOAT,
        };
        let desc = ImageDesc {
            image_type: cl::MEM_OBJECT_IMAGE2D,
            width: 4,
            height: 3,
            ..ImageDesc::default()
        };
        let float = unsafe { runtime.create_image(context, 0, &format, &desc, ptr::null_mut()) }.unwrap();
        assert_eq!(
            runtime.enqueue_copy_image(queue, a, float, [0; 3], [0; 3], [1, 1, 1], &[]),
            Err(cl::IMAGE_FORMAT_MISMATCH)
        );
        assert_eq!(
            runtime.enqueue_fill_image(queue, a, &ones, [3, 0, 0], [2, 1, 1], &[]),
            Err(cl::INVALID_VALUE)
        );
    }

    #[test]
    fn compile_and_link() {
        let runtime = HostRuntime::new();
        let (device, context, _) = setup(&runtime);
        let source = |text: &str| runtime.create_program_with_source(context, &[text]).unwrap();
        let header = source("float twice(float x) { return 2 * x; }");
        let a = source("#include \"util.h\"\n__kernel void a(__global float* x) {}");
        let b = source("__kernel void b() {}");
        assert_eq!(
            runtime.compile_program(a, &[], "", &[]),
            Err(cl::COMPILE_PROGRAM_FAILURE)
        );
        let size = runtime.get_info(InfoQuery::ProgramBuild(a, device), cl::PROGRAM_BUILD_LOG, None).unwrap();
        let mut log = vec![0u8; size];
        runtime
            .get_info(InfoQuery::ProgramBuild(a, device), cl::PROGRAM_BUILD_LOG, Some(&mut log))
            .unwrap();
        let log = String::from_utf8_lossy(&log);
        assert!(log.contains("'util.h' file not found"), "{log}");
        runtime.compile_program(a, &[], "", &[(header, "util.h")]).unwrap();
        runtime.compile_program(b, &[], "", &[]).unwrap();
        let binary_type: u32 = info(&runtime, InfoQuery::ProgramBuild(a, device), cl::PROGRAM_BINARY_TYPE);
        assert_eq!(binary_type, cl::PROGRAM_BINARY_TYPE_COMPILED_OBJECT);
        assert_eq!(runtime.create_kernel(a, "a"), Err(cl::INVALID_PROGRAM_EXECUTABLE));
        assert_eq!(runtime.link_program(context, &[], "", &[a, a]), Err(cl::LINK_PROGRAM_FAILURE));
        assert_eq!(runtime.link_program(context, &[], "", &[header]), Err(cl::INVALID_OPERATION));
        assert_eq!(runtime.link_program(context, &[], "link", &[a]), Err(cl::INVALID_LINKER_OPTIONS));
        let library = runtime.link_program(context, &[], "-create-library", &[a]).unwrap();
        assert_eq!(runtime.create_kernel(library, "a"), Err(cl::INVALID_PROGRAM_EXECUTABLE));
        let linked = runtime.link_program(context, &[], "", &[library, b]).unwrap();
        runtime.create_kernel(linked, "a").unwrap();
        runtime.create_kernel(linked, "b").unwrap();
        let binary_type: u32 = info(&runtime, InfoQuery::ProgramBuild(linked, device), cl::PROGRAM_BINARY_TYPE);
        assert_eq!(binary_type, cl::PROGRAM_BINARY_TYPE_EXECUTABLE);
    }

    #[test]
    fn event_callbacks() {
        use std::sync::mpsc;

        let runtime = HostRuntime::new();
        let (_, context, queue) = setup(&runtime);
        let user = runtime.create_user_event(context).unwrap();
        let marker = runtime.enqueue_marker(queue, &[user]).unwrap();
        let (sender, receiver) = mpsc::channel();
        let callback = |tag: &'static str| -> EventCallback {
            let sender = sender.clone();
            Box::new(move |event, status| {
                sender.send((tag, event, status)).unwrap();
            })
        };
        assert_eq!(
            runtime.set_event_callback(marker, cl::QUEUED, callback("queued")),
            Err(cl::INVALID_VALUE)
        );
        runtime.set_event_callback(marker, cl::SUBMITTED, callback("submitted")).unwrap();
        assert_eq!(receiver.try_recv().unwrap(), ("submitted", marker, cl::SUBMITTED));
        runtime.set_event_callback(marker, cl::COMPLETE, callback("complete")).unwrap();
        runtime.release(Class::Event, marker).unwrap();
        assert!(receiver.try_recv().is_err());
        runtime.set_user_event_status(user, cl::COMPLETE).unwrap();
        runtime.finish(queue).unwrap();
        assert_eq!(receiver.try_recv().unwrap(), ("complete", marker, cl::COMPLETE));
        assert!(runtime.state.lock().objects.get(&marker).is_none());
        let failing = runtime.create_user_event(context).unwrap();
        runtime.set_event_callback(failing, cl::COMPLETE, callback("failed")).unwrap();
        runtime.set_user_event_status(failing, -5).unwrap();
        assert_eq!(receiver.try_recv().unwrap(), ("failed", failing, -5));
    }
}
