/*!
Device info by name.

A sorted table maps device info names to their parameter, a description and how the value is
printed. Names are case insensitive and may keep the "CL_DEVICE_" or "CL_" prefix, so
"cl_device_max_compute_units", "MAX_COMPUTE_UNITS" and "max_compute_units" are the same entry.

```
# use clkit::{dev_container::DevContainer, devquery, platform::Platform};
# fn main() -> clkit::result::Result<()> {
# clkit::runtime::install_host().ok();
let device = Platform::all()?.remove(0).device(0)?;
for entry in devquery::prefix("max_work") {
    println!("{}: {}", entry.description, entry.query(&device)?);
}
# Ok(())
# }
```
*/

use crate::{
    cl,
    device::{device_type_name, Device, Partition},
    error::Error,
    result::Result,
    runtime::InfoQuery,
    wrapper::Info,
};

/// How an info value is printed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Format {
    /// An unsigned integer of 4 or 8 bytes.
    Uint,
    /// Hexadecimal, from the most significant non zero byte.
    Hex,
    /// A size in bytes, with the KiB, MiB or GiB equivalent.
    Bytes,
    /// A `size_t` array, "(a, b, c)".
    SizeVec,
    YesNo,
    String,
    /// A handle.
    Ptr,
    DeviceType,
    FpConfig,
    ExecCapabilities,
    LocalMemType,
    CacheType,
    QueueProperties,
    PartitionProperties,
    PartitionType,
    AffinityDomain,
    SvmCapabilities,
}

/// A named device info parameter.
#[derive(Clone, Copy, Debug)]
pub struct Entry {
    /// Upper case name without the "CL_DEVICE_" prefix.
    pub name: &'static str,
    pub param: u32,
    pub description: &'static str,
    pub format: Format,
    /// Appended to the value, may be empty.
    pub units: &'static str,
}

/// All entries, sorted by name.
pub static ENTRIES: &[Entry] = &[
    Entry {
        name: "ADDRESS_BITS",
        param: cl::DEVICE_ADDRESS_BITS,
        description: "Address space size in bits",
        format: Format::Uint,
        units: "bits",
    },
    Entry {
        name: "AVAILABLE",
        param: cl::DEVICE_AVAILABLE,
        description: "Is device available",
        format: Format::YesNo,
        units: "",
    },
    Entry {
        name: "BOARD_NAME_AMD",
        param: cl::DEVICE_BOARD_NAME_AMD,
        description: "Name of the GPU board and model of the specific device",
        format: Format::String,
        units: "",
    },
    Entry {
        name: "BUILT_IN_KERNELS",
        param: cl::DEVICE_BUILT_IN_KERNELS,
        description: "Device built-in kernels",
        format: Format::String,
        units: "",
    },
    Entry {
        name: "COMPILER_AVAILABLE",
        param: cl::DEVICE_COMPILER_AVAILABLE,
        description: "Is a compiler available for device",
        format: Format::YesNo,
        units: "",
    },
    Entry {
        name: "COMPUTE_CAPABILITY_MAJOR_NV",
        param: cl::DEVICE_COMPUTE_CAPABILITY_MAJOR_NV,
        description: "Major revision number that defines the CUDA compute capability of the device",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "COMPUTE_CAPABILITY_MINOR_NV",
        param: cl::DEVICE_COMPUTE_CAPABILITY_MINOR_NV,
        description: "Minor revision number that defines the CUDA compute capability of the device",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "DOUBLE_FP_CONFIG",
        param: cl::DEVICE_DOUBLE_FP_CONFIG,
        description: "Floating-point device configuration (double)",
        format: Format::FpConfig,
        units: "",
    },
    Entry {
        name: "DRIVER_VERSION",
        param: cl::DRIVER_VERSION,
        description: "Driver version",
        format: Format::String,
        units: "",
    },
    Entry {
        name: "ENDIAN_LITTLE",
        param: cl::DEVICE_ENDIAN_LITTLE,
        description: "Is device little endian",
        format: Format::YesNo,
        units: "",
    },
    Entry {
        name: "ERROR_CORRECTION_SUPPORT",
        param: cl::DEVICE_ERROR_CORRECTION_SUPPORT,
        description: "Error correction support",
        format: Format::YesNo,
        units: "",
    },
    Entry {
        name: "EXECUTION_CAPABILITIES",
        param: cl::DEVICE_EXECUTION_CAPABILITIES,
        description: "Execution capabilities",
        format: Format::ExecCapabilities,
        units: "",
    },
    Entry {
        name: "EXTENSIONS",
        param: cl::DEVICE_EXTENSIONS,
        description: "Extensions",
        format: Format::String,
        units: "",
    },
    Entry {
        name: "GLOBAL_FREE_MEMORY_AMD",
        param: cl::DEVICE_GLOBAL_FREE_MEMORY_AMD,
        description: "Free device memory in KiB",
        format: Format::SizeVec,
        units: "KiB",
    },
    Entry {
        name: "GLOBAL_MEM_CACHELINE_SIZE",
        param: cl::DEVICE_GLOBAL_MEM_CACHELINE_SIZE,
        description: "Global mem. cache line size",
        format: Format::Bytes,
        units: "",
    },
    Entry {
        name: "GLOBAL_MEM_CACHE_SIZE",
        param: cl::DEVICE_GLOBAL_MEM_CACHE_SIZE,
        description: "Global mem. cache size",
        format: Format::Bytes,
        units: "",
    },
    Entry {
        name: "GLOBAL_MEM_CACHE_TYPE",
        param: cl::DEVICE_GLOBAL_MEM_CACHE_TYPE,
        description: "Global mem. cache type",
        format: Format::CacheType,
        units: "",
    },
    Entry {
        name: "GLOBAL_MEM_CHANNELS_AMD",
        param: cl::DEVICE_GLOBAL_MEM_CHANNELS_AMD,
        description: "Global mem. channels",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "GLOBAL_MEM_CHANNEL_BANKS_AMD",
        param: cl::DEVICE_GLOBAL_MEM_CHANNEL_BANKS_AMD,
        description: "Global mem. channel banks",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "GLOBAL_MEM_CHANNEL_BANK_WIDTH_AMD",
        param: cl::DEVICE_GLOBAL_MEM_CHANNEL_BANK_WIDTH_AMD,
        description: "Global mem. channel bank width",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "GLOBAL_MEM_SIZE",
        param: cl::DEVICE_GLOBAL_MEM_SIZE,
        description: "Global mem. size",
        format: Format::Bytes,
        units: "",
    },
    Entry {
        name: "GLOBAL_VARIABLE_PREFERRED_TOTAL_SIZE",
        param: cl::DEVICE_GLOBAL_VARIABLE_PREFERRED_TOTAL_SIZE,
        description: "Preferred total size of global variables",
        format: Format::Bytes,
        units: "",
    },
    Entry {
        name: "GPU_OVERLAP_NV",
        param: cl::DEVICE_GPU_OVERLAP_NV,
        description: "Can device concurrently copy memory and execute a kernel",
        format: Format::YesNo,
        units: "",
    },
    Entry {
        name: "HALF_FP_CONFIG",
        param: cl::DEVICE_HALF_FP_CONFIG,
        description: "Floating-point device configuration (half)",
        format: Format::FpConfig,
        units: "",
    },
    Entry {
        name: "HOST_UNIFIED_MEMORY",
        param: cl::DEVICE_HOST_UNIFIED_MEMORY,
        description: "Host unified memory subsystem",
        format: Format::YesNo,
        units: "",
    },
    Entry {
        name: "IMAGE2D_MAX_HEIGHT",
        param: cl::DEVICE_IMAGE2D_MAX_HEIGHT,
        description: "Max. height of 2D image",
        format: Format::Uint,
        units: "pixels",
    },
    Entry {
        name: "IMAGE2D_MAX_WIDTH",
        param: cl::DEVICE_IMAGE2D_MAX_WIDTH,
        description: "Max. width of 1D/2D image",
        format: Format::Uint,
        units: "pixels",
    },
    Entry {
        name: "IMAGE3D_MAX_DEPTH",
        param: cl::DEVICE_IMAGE3D_MAX_DEPTH,
        description: "Max. depth of 3D image",
        format: Format::Uint,
        units: "pixels",
    },
    Entry {
        name: "IMAGE3D_MAX_HEIGHT",
        param: cl::DEVICE_IMAGE3D_MAX_HEIGHT,
        description: "Max. height of 3D image",
        format: Format::Uint,
        units: "pixels",
    },
    Entry {
        name: "IMAGE3D_MAX_WIDTH",
        param: cl::DEVICE_IMAGE3D_MAX_WIDTH,
        description: "Max. width of 3D image",
        format: Format::Uint,
        units: "pixels",
    },
    Entry {
        name: "IMAGE_BASE_ADDRESS_ALIGNMENT",
        param: cl::DEVICE_IMAGE_BASE_ADDRESS_ALIGNMENT,
        description: "Min. alignment of host buffers backing 2D images",
        format: Format::Uint,
        units: "pixels",
    },
    Entry {
        name: "IMAGE_MAX_ARRAY_SIZE",
        param: cl::DEVICE_IMAGE_MAX_ARRAY_SIZE,
        description: "Max. images in a 1D or 2D image array",
        format: Format::Uint,
        units: "images",
    },
    Entry {
        name: "IMAGE_MAX_BUFFER_SIZE",
        param: cl::DEVICE_IMAGE_MAX_BUFFER_SIZE,
        description: "Max. pixels for 1D image from buffer object",
        format: Format::Uint,
        units: "pixels",
    },
    Entry {
        name: "IMAGE_PITCH_ALIGNMENT",
        param: cl::DEVICE_IMAGE_PITCH_ALIGNMENT,
        description: "Row pitch alignment of 2D images created from buffers",
        format: Format::Uint,
        units: "pixels",
    },
    Entry {
        name: "IMAGE_SUPPORT",
        param: cl::DEVICE_IMAGE_SUPPORT,
        description: "Image support",
        format: Format::YesNo,
        units: "",
    },
    Entry {
        name: "INTEGRATED_MEMORY_NV",
        param: cl::DEVICE_INTEGRATED_MEMORY_NV,
        description: "Is device integrated with the memory subsystem",
        format: Format::YesNo,
        units: "",
    },
    Entry {
        name: "KERNEL_EXEC_TIMEOUT_NV",
        param: cl::DEVICE_KERNEL_EXEC_TIMEOUT_NV,
        description: "Is there a limit for kernels executed on device",
        format: Format::YesNo,
        units: "",
    },
    Entry {
        name: "LINKER_AVAILABLE",
        param: cl::DEVICE_LINKER_AVAILABLE,
        description: "Linker available",
        format: Format::YesNo,
        units: "",
    },
    Entry {
        name: "LOCAL_MEM_BANKS_AMD",
        param: cl::DEVICE_LOCAL_MEM_BANKS_AMD,
        description: "Local mem. banks",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "LOCAL_MEM_SIZE",
        param: cl::DEVICE_LOCAL_MEM_SIZE,
        description: "Local mem. size",
        format: Format::Bytes,
        units: "",
    },
    Entry {
        name: "LOCAL_MEM_SIZE_PER_COMPUTE_UNIT_AMD",
        param: cl::DEVICE_LOCAL_MEM_SIZE_PER_COMPUTE_UNIT_AMD,
        description: "Local mem. size per compute unit",
        format: Format::Bytes,
        units: "",
    },
    Entry {
        name: "LOCAL_MEM_TYPE",
        param: cl::DEVICE_LOCAL_MEM_TYPE,
        description: "Local mem. type",
        format: Format::LocalMemType,
        units: "",
    },
    Entry {
        name: "MAX_CLOCK_FREQUENCY",
        param: cl::DEVICE_MAX_CLOCK_FREQUENCY,
        description: "Max. clock frequency",
        format: Format::Uint,
        units: "MHz",
    },
    Entry {
        name: "MAX_COMPUTE_UNITS",
        param: cl::DEVICE_MAX_COMPUTE_UNITS,
        description: "Number of compute units in device",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "MAX_CONSTANT_ARGS",
        param: cl::DEVICE_MAX_CONSTANT_ARGS,
        description: "Max. number of __constant args in kernel",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "MAX_CONSTANT_BUFFER_SIZE",
        param: cl::DEVICE_MAX_CONSTANT_BUFFER_SIZE,
        description: "Max. size in bytes of a constant buffer allocation",
        format: Format::Bytes,
        units: "",
    },
    Entry {
        name: "MAX_GLOBAL_VARIABLE_SIZE",
        param: cl::DEVICE_MAX_GLOBAL_VARIABLE_SIZE,
        description: "Max. storage for a global variable",
        format: Format::Bytes,
        units: "",
    },
    Entry {
        name: "MAX_MEM_ALLOC_SIZE",
        param: cl::DEVICE_MAX_MEM_ALLOC_SIZE,
        description: "Max. size of memory object allocation in bytes",
        format: Format::Bytes,
        units: "",
    },
    Entry {
        name: "MAX_ON_DEVICE_EVENTS",
        param: cl::DEVICE_MAX_ON_DEVICE_EVENTS,
        description: "Max. events on device queues",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "MAX_ON_DEVICE_QUEUES",
        param: cl::DEVICE_MAX_ON_DEVICE_QUEUES,
        description: "Max. device queues per context",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "MAX_PARAMETER_SIZE",
        param: cl::DEVICE_MAX_PARAMETER_SIZE,
        description: "Max. size in bytes of the arguments of a kernel",
        format: Format::Bytes,
        units: "",
    },
    Entry {
        name: "MAX_PIPE_ARGS",
        param: cl::DEVICE_MAX_PIPE_ARGS,
        description: "Max. pipe objects passed to a kernel",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "MAX_READ_IMAGE_ARGS",
        param: cl::DEVICE_MAX_READ_IMAGE_ARGS,
        description: "Max. number of simultaneous image objects that can be read by a kernel",
        format: Format::Uint,
        units: "images",
    },
    Entry {
        name: "MAX_READ_WRITE_IMAGE_ARGS",
        param: cl::DEVICE_MAX_READ_WRITE_IMAGE_ARGS,
        description: "Max. image objects a kernel can read and write",
        format: Format::Uint,
        units: "images",
    },
    Entry {
        name: "MAX_SAMPLERS",
        param: cl::DEVICE_MAX_SAMPLERS,
        description: "Max. samplers that can be used in kernel",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "MAX_WORK_GROUP_SIZE",
        param: cl::DEVICE_MAX_WORK_GROUP_SIZE,
        description: "Max. work-items in work-group",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "MAX_WORK_ITEM_DIMENSIONS",
        param: cl::DEVICE_MAX_WORK_ITEM_DIMENSIONS,
        description: "Max. work-item dimensions",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "MAX_WORK_ITEM_SIZES",
        param: cl::DEVICE_MAX_WORK_ITEM_SIZES,
        description: "Max. work-items in each dimension of work-group",
        format: Format::SizeVec,
        units: "",
    },
    Entry {
        name: "MAX_WRITE_IMAGE_ARGS",
        param: cl::DEVICE_MAX_WRITE_IMAGE_ARGS,
        description: "Max. number of simultaneous image objects that can be written to by a kernel",
        format: Format::Uint,
        units: "images",
    },
    Entry {
        name: "MEM_BASE_ADDR_ALIGN",
        param: cl::DEVICE_MEM_BASE_ADDR_ALIGN,
        description: "Alignment requirement for the base address of sub-buffers",
        format: Format::Uint,
        units: "bits",
    },
    Entry {
        name: "MIN_DATA_TYPE_ALIGN_SIZE",
        param: cl::DEVICE_MIN_DATA_TYPE_ALIGN_SIZE,
        description: "Smallest alignment for any data type",
        format: Format::Uint,
        units: "bytes",
    },
    Entry {
        name: "NAME",
        param: cl::DEVICE_NAME,
        description: "Name of device",
        format: Format::String,
        units: "",
    },
    Entry {
        name: "NATIVE_VECTOR_WIDTH_CHAR",
        param: cl::DEVICE_NATIVE_VECTOR_WIDTH_CHAR,
        description: "Native ISA char vector width",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "NATIVE_VECTOR_WIDTH_DOUBLE",
        param: cl::DEVICE_NATIVE_VECTOR_WIDTH_DOUBLE,
        description: "Native ISA double vector width",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "NATIVE_VECTOR_WIDTH_FLOAT",
        param: cl::DEVICE_NATIVE_VECTOR_WIDTH_FLOAT,
        description: "Native ISA float vector width",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "NATIVE_VECTOR_WIDTH_HALF",
        param: cl::DEVICE_NATIVE_VECTOR_WIDTH_HALF,
        description: "Native ISA half vector width",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "NATIVE_VECTOR_WIDTH_INT",
        param: cl::DEVICE_NATIVE_VECTOR_WIDTH_INT,
        description: "Native ISA int vector width",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "NATIVE_VECTOR_WIDTH_LONG",
        param: cl::DEVICE_NATIVE_VECTOR_WIDTH_LONG,
        description: "Native ISA long vector width",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "NATIVE_VECTOR_WIDTH_SHORT",
        param: cl::DEVICE_NATIVE_VECTOR_WIDTH_SHORT,
        description: "Native ISA short vector width",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "OPENCL_C_VERSION",
        param: cl::DEVICE_OPENCL_C_VERSION,
        description: "Highest OpenCL C version supported by the compiler",
        format: Format::String,
        units: "",
    },
    Entry {
        name: "PARENT_DEVICE",
        param: cl::DEVICE_PARENT_DEVICE,
        description: "The parent device, if this is a sub-device",
        format: Format::Ptr,
        units: "",
    },
    Entry {
        name: "PARTITION_AFFINITY_DOMAIN",
        param: cl::DEVICE_PARTITION_AFFINITY_DOMAIN,
        description: "Supported affinity domains for partitioning the device",
        format: Format::AffinityDomain,
        units: "",
    },
    Entry {
        name: "PARTITION_MAX_SUB_DEVICES",
        param: cl::DEVICE_PARTITION_MAX_SUB_DEVICES,
        description: "Max. sub-devices that can be created",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "PARTITION_PROPERTIES",
        param: cl::DEVICE_PARTITION_PROPERTIES,
        description: "Partition types supported by the device",
        format: Format::PartitionProperties,
        units: "",
    },
    Entry {
        name: "PARTITION_TYPE",
        param: cl::DEVICE_PARTITION_TYPE,
        description: "Partition the sub-device was created with",
        format: Format::PartitionType,
        units: "",
    },
    Entry {
        name: "PIPE_MAX_ACTIVE_RESERVATIONS",
        param: cl::DEVICE_PIPE_MAX_ACTIVE_RESERVATIONS,
        description: "Max. reservations active for a pipe per work-item",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "PIPE_MAX_PACKET_SIZE",
        param: cl::DEVICE_PIPE_MAX_PACKET_SIZE,
        description: "Max. size of a pipe packet",
        format: Format::Bytes,
        units: "",
    },
    Entry {
        name: "PLATFORM",
        param: cl::DEVICE_PLATFORM,
        description: "The platform associated with device",
        format: Format::Ptr,
        units: "",
    },
    Entry {
        name: "PREFERRED_GLOBAL_ATOMIC_ALIGNMENT",
        param: cl::DEVICE_PREFERRED_GLOBAL_ATOMIC_ALIGNMENT,
        description: "Preferred alignment for global atomics",
        format: Format::Uint,
        units: "bytes",
    },
    Entry {
        name: "PREFERRED_INTEROP_USER_SYNC",
        param: cl::DEVICE_PREFERRED_INTEROP_USER_SYNC,
        description: "Prefer user to be responsible for synchronization in interop",
        format: Format::YesNo,
        units: "",
    },
    Entry {
        name: "PREFERRED_LOCAL_ATOMIC_ALIGNMENT",
        param: cl::DEVICE_PREFERRED_LOCAL_ATOMIC_ALIGNMENT,
        description: "Preferred alignment for local atomics",
        format: Format::Uint,
        units: "bytes",
    },
    Entry {
        name: "PREFERRED_PLATFORM_ATOMIC_ALIGNMENT",
        param: cl::DEVICE_PREFERRED_PLATFORM_ATOMIC_ALIGNMENT,
        description: "Preferred alignment for platform atomics",
        format: Format::Uint,
        units: "bytes",
    },
    Entry {
        name: "PREFERRED_VECTOR_WIDTH_CHAR",
        param: cl::DEVICE_PREFERRED_VECTOR_WIDTH_CHAR,
        description: "Preferred char vector width",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "PREFERRED_VECTOR_WIDTH_DOUBLE",
        param: cl::DEVICE_PREFERRED_VECTOR_WIDTH_DOUBLE,
        description: "Preferred double vector width",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "PREFERRED_VECTOR_WIDTH_FLOAT",
        param: cl::DEVICE_PREFERRED_VECTOR_WIDTH_FLOAT,
        description: "Preferred float vector width",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "PREFERRED_VECTOR_WIDTH_HALF",
        param: cl::DEVICE_PREFERRED_VECTOR_WIDTH_HALF,
        description: "Preferred half vector width",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "PREFERRED_VECTOR_WIDTH_INT",
        param: cl::DEVICE_PREFERRED_VECTOR_WIDTH_INT,
        description: "Preferred int vector width",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "PREFERRED_VECTOR_WIDTH_LONG",
        param: cl::DEVICE_PREFERRED_VECTOR_WIDTH_LONG,
        description: "Preferred long vector width",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "PREFERRED_VECTOR_WIDTH_SHORT",
        param: cl::DEVICE_PREFERRED_VECTOR_WIDTH_SHORT,
        description: "Preferred short vector width",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "PRINTF_BUFFER_SIZE",
        param: cl::DEVICE_PRINTF_BUFFER_SIZE,
        description: "Max. size of the printf buffer",
        format: Format::Bytes,
        units: "",
    },
    Entry {
        name: "PROFILE",
        param: cl::DEVICE_PROFILE,
        description: "Profile name supported by the device",
        format: Format::String,
        units: "",
    },
    Entry {
        name: "PROFILING_TIMER_OFFSET_AMD",
        param: cl::DEVICE_PROFILING_TIMER_OFFSET_AMD,
        description: "Offset between event timestamps and the epoch",
        format: Format::Uint,
        units: "ns",
    },
    Entry {
        name: "PROFILING_TIMER_RESOLUTION",
        param: cl::DEVICE_PROFILING_TIMER_RESOLUTION,
        description: "Resolution of device timer",
        format: Format::Uint,
        units: "ns",
    },
    Entry {
        name: "QUEUE_ON_DEVICE_MAX_SIZE",
        param: cl::DEVICE_QUEUE_ON_DEVICE_MAX_SIZE,
        description: "Max. size of a device queue",
        format: Format::Bytes,
        units: "",
    },
    Entry {
        name: "QUEUE_ON_DEVICE_PREFERRED_SIZE",
        param: cl::DEVICE_QUEUE_ON_DEVICE_PREFERRED_SIZE,
        description: "Preferred size of a device queue",
        format: Format::Bytes,
        units: "",
    },
    Entry {
        name: "QUEUE_ON_DEVICE_PROPERTIES",
        param: cl::DEVICE_QUEUE_ON_DEVICE_PROPERTIES,
        description: "Device queue properties",
        format: Format::QueueProperties,
        units: "",
    },
    Entry {
        name: "QUEUE_PROPERTIES",
        param: cl::DEVICE_QUEUE_PROPERTIES,
        description: "Command-queue properties supported by device",
        format: Format::QueueProperties,
        units: "",
    },
    Entry {
        name: "REFERENCE_COUNT",
        param: cl::DEVICE_REFERENCE_COUNT,
        description: "Device reference count",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "REGISTERS_PER_BLOCK_NV",
        param: cl::DEVICE_REGISTERS_PER_BLOCK_NV,
        description: "Max. 32-bit registers available to a work-group",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "SIMD_INSTRUCTION_WIDTH_AMD",
        param: cl::DEVICE_SIMD_INSTRUCTION_WIDTH_AMD,
        description: "SIMD instruction width",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "SIMD_PER_COMPUTE_UNIT_AMD",
        param: cl::DEVICE_SIMD_PER_COMPUTE_UNIT_AMD,
        description: "SIMD units per compute unit",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "SIMD_WIDTH_AMD",
        param: cl::DEVICE_SIMD_WIDTH_AMD,
        description: "SIMD width",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "SINGLE_FP_CONFIG",
        param: cl::DEVICE_SINGLE_FP_CONFIG,
        description: "Floating-point device configuration (single)",
        format: Format::FpConfig,
        units: "",
    },
    Entry {
        name: "SPIR_VERSIONS",
        param: cl::DEVICE_SPIR_VERSIONS,
        description: "Supported SPIR versions",
        format: Format::String,
        units: "",
    },
    Entry {
        name: "SVM_CAPABILITIES",
        param: cl::DEVICE_SVM_CAPABILITIES,
        description: "Shared virtual memory capabilities",
        format: Format::SvmCapabilities,
        units: "",
    },
    Entry {
        name: "TYPE",
        param: cl::DEVICE_TYPE,
        description: "Type of OpenCL device",
        format: Format::DeviceType,
        units: "",
    },
    Entry {
        name: "VENDOR",
        param: cl::DEVICE_VENDOR,
        description: "Vendor of OpenCL device",
        format: Format::String,
        units: "",
    },
    Entry {
        name: "VENDOR_ID",
        param: cl::DEVICE_VENDOR_ID,
        description: "Unique device vendor identifier",
        format: Format::Hex,
        units: "",
    },
    Entry {
        name: "VERSION",
        param: cl::DEVICE_VERSION,
        description: "OpenCL software driver version",
        format: Format::String,
        units: "",
    },
    Entry {
        name: "WARP_SIZE_NV",
        param: cl::DEVICE_WARP_SIZE_NV,
        description: "Warp size in work-items",
        format: Format::Uint,
        units: "",
    },
    Entry {
        name: "WAVEFRONT_WIDTH_AMD",
        param: cl::DEVICE_WAVEFRONT_WIDTH_AMD,
        description: "Wavefront width",
        format: Format::Uint,
        units: "",
    },
];

/// Normalizes a parameter name to the form stored in the table.
pub fn final_name(name: &str) -> String {
    let name = name.trim().to_uppercase();
    let name = name.strip_prefix("CL_").unwrap_or(&name);
    name.strip_prefix("DEVICE_").unwrap_or(name).to_string()
}

/// The entry named `name`.
pub fn entry(name: &str) -> Option<&'static Entry> {
    let name = final_name(name);
    ENTRIES
        .binary_search_by(|entry| entry.name.cmp(name.as_str()))
        .ok()
        .map(|i| &ENTRIES[i])
}

/// The parameter named `name`.
pub fn param(name: &str) -> Option<u32> {
    entry(name).map(|entry| entry.param)
}

/// The entries whose names start with `prefix`.
pub fn prefix(prefix: &str) -> &'static [Entry] {
    let prefix = final_name(prefix);
    let start = ENTRIES.partition_point(|entry| entry.name < prefix.as_str());
    let len = ENTRIES[start..].partition_point(|entry| entry.name.starts_with(prefix.as_str()));
    &ENTRIES[start..start + len]
}

/// The entries whose names contain `pattern`, ie "cache" or "image".
pub fn matching(pattern: &str) -> impl Iterator<Item = &'static Entry> {
    let pattern = pattern.trim().to_uppercase();
    ENTRIES
        .iter()
        .filter(move |entry| entry.name.contains(pattern.as_str()))
}

/// Queries the parameter named `name` and formats it.
///
/// **errors**
/// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): The name is unknown.
/// - [`Native`](crate::error::ErrorKind::Native): The device does not support the parameter.
pub fn query(device: &Device, name: &str) -> Result<String> {
    entry(name)
        .ok_or_else(|| Error::invalid_argument(format!("unknown device info {name:?}")))?
        .query(device)
}

/// Every entry the device answers, with its formatted value.
pub fn describe(device: &Device) -> Vec<(&'static Entry, String)> {
    ENTRIES
        .iter()
        .filter_map(|entry| match entry.query(device) {
            Ok(value) => Some((entry, value)),
            Err(e) => {
                log::debug!("device info {} skipped: {e}", entry.name);
                None
            }
        })
        .collect()
}

impl Entry {
    /// Queries the value from `device` without caching, so counts are current.
    pub fn query(&self, device: &Device) -> Result<String> {
        let info = device.query_info(InfoQuery::Device(device.handle()), self.param)?;
        self.format(&info)
    }
    /// Formats a value of this parameter, followed by the units.
    pub fn format(&self, info: &Info) -> Result<String> {
        let value = match self.format {
            Format::Uint => unsigned(info)?.to_string(),
            Format::Hex => hex(info.as_bytes()),
            Format::Bytes => bytes(unsigned(info)?),
            Format::SizeVec => {
                let sizes: Vec<String> = info.array::<usize>()?.iter().map(usize::to_string).collect();
                format!("({})", sizes.join(", "))
            }
            Format::YesNo => (if unsigned(info)? != 0 { "Yes" } else { "No" }).to_string(),
            Format::String => info.string(),
            Format::Ptr => format!("{:#x}", info.scalar::<usize>()?),
            Format::DeviceType => device_type_name(unsigned(info)?).to_string(),
            Format::FpConfig => flags(unsigned(info)?, FP_CONFIG),
            Format::ExecCapabilities => flags(
                unsigned(info)?,
                &[(cl::EXEC_KERNEL, "KERNEL"), (cl::EXEC_NATIVE_KERNEL, "NATIVE_KERNEL")],
            ),
            Format::LocalMemType => match info.scalar::<u32>()? {
                cl::LOCAL => "LOCAL".to_string(),
                cl::GLOBAL => "GLOBAL".to_string(),
                cl::NONE => "NONE".to_string(),
                other => format!("UNKNOWN({other:#x})"),
            },
            Format::CacheType => match info.scalar::<u32>()? {
                cl::READ_ONLY_CACHE => "READ_ONLY".to_string(),
                cl::READ_WRITE_CACHE => "READ_WRITE".to_string(),
                cl::NONE => "NONE".to_string(),
                other => format!("UNKNOWN({other:#x})"),
            },
            Format::QueueProperties => flags(
                unsigned(info)?,
                &[
                    (cl::QUEUE_OUT_OF_ORDER_EXEC_MODE_ENABLE, "OUT_OF_ORDER_EXEC_MODE_ENABLE"),
                    (cl::QUEUE_PROFILING_ENABLE, "PROFILING_ENABLE"),
                ],
            ),
            Format::PartitionProperties => {
                let names: Vec<String> = info
                    .array::<isize>()?
                    .iter()
                    .filter(|x| **x != 0)
                    .map(|x| match *x {
                        cl::DEVICE_PARTITION_EQUALLY => "EQUALLY".to_string(),
                        cl::DEVICE_PARTITION_BY_COUNTS => "BY_COUNTS".to_string(),
                        cl::DEVICE_PARTITION_BY_AFFINITY_DOMAIN => "BY_AFFINITY_DOMAIN".to_string(),
                        other => format!("UNKNOWN({other:#x})"),
                    })
                    .collect();
                names.join(" ")
            }
            Format::PartitionType => match Partition::from_list(info.array::<isize>()?)? {
                None => String::new(),
                Some(Partition::Equally(units)) => format!("EQUALLY {units}"),
                Some(Partition::ByCounts(counts)) => {
                    let counts: Vec<String> = counts.iter().map(u32::to_string).collect();
                    format!("BY_COUNTS {}", counts.join(" "))
                }
                Some(Partition::ByAffinityDomain(domain)) => {
                    format!("BY_AFFINITY_DOMAIN {}", flags(domain, AFFINITY_DOMAINS))
                }
            },
            Format::AffinityDomain => flags(unsigned(info)?, AFFINITY_DOMAINS),
            Format::SvmCapabilities => flags(
                unsigned(info)?,
                &[
                    (cl::DEVICE_SVM_COARSE_GRAIN_BUFFER, "COARSE_GRAIN_BUFFER"),
                    (cl::DEVICE_SVM_FINE_GRAIN_BUFFER, "FINE_GRAIN_BUFFER"),
                    (cl::DEVICE_SVM_FINE_GRAIN_SYSTEM, "FINE_GRAIN_SYSTEM"),
                    (cl::DEVICE_SVM_ATOMICS, "ATOMICS"),
                ],
            ),
        };
        Ok(if self.units.is_empty() {
            value
        } else {
            format!("{value} {}", self.units)
        })
    }
}

const FP_CONFIG: &[(u64, &str)] = &[
    (cl::FP_DENORM, "DENORM"),
    (cl::FP_INF_NAN, "INF_NAN"),
    (cl::FP_ROUND_TO_NEAREST, "ROUND_TO_NEAREST"),
    (cl::FP_ROUND_TO_ZERO, "ROUND_TO_ZERO"),
    (cl::FP_ROUND_TO_INF, "ROUND_TO_INF"),
    (cl::FP_FMA, "FMA"),
    (cl::FP_SOFT_FLOAT, "SOFT_FLOAT"),
    (cl::FP_CORRECTLY_ROUNDED_DIVIDE_SQRT, "CORRECTLY_ROUNDED_DIVIDE_SQRT"),
];

const AFFINITY_DOMAINS: &[(u64, &str)] = &[
    (cl::DEVICE_AFFINITY_DOMAIN_NUMA, "NUMA"),
    (cl::DEVICE_AFFINITY_DOMAIN_L4_CACHE, "L4_CACHE"),
    (cl::DEVICE_AFFINITY_DOMAIN_L3_CACHE, "L3_CACHE"),
    (cl::DEVICE_AFFINITY_DOMAIN_L2_CACHE, "L2_CACHE"),
    (cl::DEVICE_AFFINITY_DOMAIN_L1_CACHE, "L1_CACHE"),
    (cl::DEVICE_AFFINITY_DOMAIN_NEXT_PARTITIONABLE, "NEXT_PARTITIONABLE"),
];

/// Reads a `cl_uint`, `cl_ulong` or `size_t` value.
fn unsigned(info: &Info) -> Result<u64> {
    match info.size() {
        4 => info.scalar::<u32>().map(u64::from),
        8 => info.scalar::<u64>(),
        size => Err(Error::invalid_argument(format!(
            "info value of {size} bytes is not an unsigned integer"
        ))),
    }
}

fn hex(bytes: &[u8]) -> String {
    let mut bytes = bytes.to_vec();
    if cfg!(target_endian = "little") {
        bytes.reverse();
    }
    let digits: String = bytes
        .iter()
        .skip_while(|x| **x == 0)
        .map(|x| format!("{x:02x}"))
        .collect();
    if digits.is_empty() {
        "0x0".to_string()
    } else {
        format!("0x{digits}")
    }
}

fn bytes(size: u64) -> String {
    const UNITS: [(&str, u64); 3] = [("GiB", 1 << 30), ("MiB", 1 << 20), ("KiB", 1 << 10)];
    match UNITS.iter().find(|(_, unit)| size >= *unit) {
        Some((name, unit)) => format!("{:.1} {name} ({size} bytes)", size as f64 / *unit as f64),
        None => format!("{size} bytes"),
    }
}

/// Names of the set bits, unknown bits last.
fn flags(value: u64, names: &[(u64, &str)]) -> String {
    let mut words: Vec<String> = names
        .iter()
        .filter(|(bit, _)| value & bit != 0)
        .map(|(_, name)| name.to_string())
        .collect();
    let unknown = names.iter().fold(value, |rest, (bit, _)| rest & !bit);
    if unknown != 0 {
        words.push(format!("UNKNOWN({unknown:#x})"));
    }
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dev_container::DevContainer, platform::Platform, wrapper::memcheck};

    fn info<T: bytemuck::Pod>(value: T) -> Info {
        Info::from_bytes(bytemuck::bytes_of(&value))
    }

    #[test]
    fn table_sorted() {
        assert!(ENTRIES.windows(2).all(|pair| pair[0].name < pair[1].name));
    }

    #[test]
    fn lookups() {
        assert_eq!(final_name(" cl_device_name"), "NAME");
        assert_eq!(final_name("CL_DRIVER_VERSION"), "DRIVER_VERSION");
        assert_eq!(param("cl_device_endian_little"), Some(0x1026));
        assert_eq!(param("Max_Compute_Units"), Some(cl::DEVICE_MAX_COMPUTE_UNITS));
        assert_eq!(param("cl_driver_version"), Some(cl::DRIVER_VERSION));
        assert_eq!(param("max_compute"), None);
        let names: Vec<_> = prefix("max_work").iter().map(|entry| entry.name).collect();
        assert_eq!(
            names,
            ["MAX_WORK_GROUP_SIZE", "MAX_WORK_ITEM_DIMENSIONS", "MAX_WORK_ITEM_SIZES"]
        );
        assert!(prefix("zzz").is_empty());
        assert_eq!(prefix("").len(), ENTRIES.len());
        let caches: Vec<_> = matching("mem_cache").map(|entry| entry.name).collect();
        assert_eq!(
            caches,
            ["GLOBAL_MEM_CACHELINE_SIZE", "GLOBAL_MEM_CACHE_SIZE", "GLOBAL_MEM_CACHE_TYPE"]
        );
    }

    #[test]
    fn formats() {
        let format = |name: &str, info: Info| entry(name).unwrap().format(&info).unwrap();
        assert_eq!(bytes(100), "100 bytes");
        assert_eq!(bytes(2048), "2.0 KiB (2048 bytes)");
        assert_eq!(bytes(3 << 29), "1.5 GiB (1610612736 bytes)");
        assert_eq!(format("local_mem_size", info(2048u64)), "2.0 KiB (2048 bytes)");
        assert_eq!(format("global_mem_cacheline_size", info(64u32)), "64 bytes");
        assert_eq!(format("max_clock_frequency", info(1000u32)), "1000 MHz");
        assert_eq!(format("vendor_id", info(0x1002u32)), "0x1002");
        assert_eq!(format("vendor_id", info(0u32)), "0x0");
        assert_eq!(format("max_work_item_sizes", info([256usize, 256, 64])), "(256, 256, 64)");
        assert_eq!(format("image_support", info(1u32)), "Yes");
        assert_eq!(format("single_fp_config", info(cl::FP_DENORM | cl::FP_FMA | 1 << 20)), "DENORM FMA UNKNOWN(0x100000)");
        assert_eq!(format("local_mem_type", info(cl::GLOBAL)), "GLOBAL");
        assert_eq!(format("partition_type", info(0isize)), "");
        assert_eq!(
            format("partition_type", info([cl::DEVICE_PARTITION_EQUALLY, 2, 0])),
            "EQUALLY 2"
        );
        assert!(entry("max_clock_frequency").unwrap().format(&info(1u8)).is_err());
    }

    #[test]
    fn host_device() {
        let _guard = crate::test_lock();
        let platform = Platform::all().unwrap().remove(0);
        let gpu = platform.device(0).unwrap();
        assert_eq!(query(&gpu, "name").unwrap(), "clkit host GPU");
        assert_eq!(query(&gpu, "CL_DEVICE_TYPE").unwrap(), "GPU");
        assert_eq!(query(&gpu, "vendor_id").unwrap(), "0x1000");
        assert_eq!(query(&gpu, "max_work_item_sizes").unwrap(), "(256, 256, 64)");
        assert!(query(&gpu, "no_such_info").unwrap_err().kind().is_invalid_argument());
        let described = describe(&gpu);
        assert!(described.iter().any(|(entry, value)| entry.name == "NAME" && value == "clkit host GPU"));
        assert!(!described.iter().any(|(entry, _)| entry.name == "WARP_SIZE_NV"));
        drop(described);
        drop(gpu);
        drop(platform);
        assert!(memcheck());
    }
}
