/*!
Numeric constants of the native compute API.

Names follow the native headers with the `CL_` prefix dropped. Status codes are `i32`,
info parameter names are `u32`, bitfields are `u64`.
*/

#![allow(missing_docs)]

// status codes
pub const SUCCESS: i32 = 0;
pub const DEVICE_NOT_FOUND: i32 = -1;
pub const DEVICE_NOT_AVAILABLE: i32 = -2;
pub const COMPILER_NOT_AVAILABLE: i32 = -3;
pub const MEM_OBJECT_ALLOCATION_FAILURE: i32 = -4;
pub const OUT_OF_RESOURCES: i32 = -5;
pub const OUT_OF_HOST_MEMORY: i32 = -6;
pub const PROFILING_INFO_NOT_AVAILABLE: i32 = -7;
pub const MEM_COPY_OVERLAP: i32 = -8;
pub const IMAGE_FORMAT_MISMATCH: i32 = -9;
pub const IMAGE_FORMAT_NOT_SUPPORTED: i32 = -10;
pub const BUILD_PROGRAM_FAILURE: i32 = -11;
pub const MAP_FAILURE: i32 = -12;
pub const MISALIGNED_SUB_BUFFER_OFFSET: i32 = -13;
pub const EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST: i32 = -14;
pub const COMPILE_PROGRAM_FAILURE: i32 = -15;
pub const LINKER_NOT_AVAILABLE: i32 = -16;
pub const LINK_PROGRAM_FAILURE: i32 = -17;
pub const DEVICE_PARTITION_FAILED: i32 = -18;
pub const KERNEL_ARG_INFO_NOT_AVAILABLE: i32 = -19;
pub const INVALID_VALUE: i32 = -30;
pub const INVALID_DEVICE_TYPE: i32 = -31;
pub const INVALID_PLATFORM: i32 = -32;
pub const INVALID_DEVICE: i32 = -33;
pub const INVALID_CONTEXT: i32 = -34;
pub const INVALID_QUEUE_PROPERTIES: i32 = -35;
pub const INVALID_COMMAND_QUEUE: i32 = -36;
pub const INVALID_HOST_PTR: i32 = -37;
pub const INVALID_MEM_OBJECT: i32 = -38;
pub const INVALID_IMAGE_FORMAT_DESCRIPTOR: i32 = -39;
pub const INVALID_IMAGE_SIZE: i32 = -40;
pub const INVALID_SAMPLER: i32 = -41;
pub const INVALID_BINARY: i32 = -42;
pub const INVALID_BUILD_OPTIONS: i32 = -43;
pub const INVALID_PROGRAM: i32 = -44;
pub const INVALID_PROGRAM_EXECUTABLE: i32 = -45;
pub const INVALID_KERNEL_NAME: i32 = -46;
pub const INVALID_KERNEL_DEFINITION: i32 = -47;
pub const INVALID_KERNEL: i32 = -48;
pub const INVALID_ARG_INDEX: i32 = -49;
pub const INVALID_ARG_VALUE: i32 = -50;
pub const INVALID_ARG_SIZE: i32 = -51;
pub const INVALID_KERNEL_ARGS: i32 = -52;
pub const INVALID_WORK_DIMENSION: i32 = -53;
pub const INVALID_WORK_GROUP_SIZE: i32 = -54;
pub const INVALID_WORK_ITEM_SIZE: i32 = -55;
pub const INVALID_GLOBAL_OFFSET: i32 = -56;
pub const INVALID_EVENT_WAIT_LIST: i32 = -57;
pub const INVALID_EVENT: i32 = -58;
pub const INVALID_OPERATION: i32 = -59;
pub const INVALID_GL_OBJECT: i32 = -60;
pub const INVALID_BUFFER_SIZE: i32 = -61;
pub const INVALID_MIP_LEVEL: i32 = -62;
pub const INVALID_GLOBAL_WORK_SIZE: i32 = -63;
pub const INVALID_PROPERTY: i32 = -64;
pub const INVALID_IMAGE_DESCRIPTOR: i32 = -65;
pub const INVALID_COMPILER_OPTIONS: i32 = -66;
pub const INVALID_LINKER_OPTIONS: i32 = -67;
pub const INVALID_DEVICE_PARTITION_COUNT: i32 = -68;
pub const INVALID_PIPE_SIZE: i32 = -69;
pub const INVALID_DEVICE_QUEUE: i32 = -70;

// device types
pub const DEVICE_TYPE_DEFAULT: u64 = 1 << 0;
pub const DEVICE_TYPE_CPU: u64 = 1 << 1;
pub const DEVICE_TYPE_GPU: u64 = 1 << 2;
pub const DEVICE_TYPE_ACCELERATOR: u64 = 1 << 3;
pub const DEVICE_TYPE_CUSTOM: u64 = 1 << 4;
pub const DEVICE_TYPE_ALL: u64 = 0xFFFF_FFFF;

// platform info
pub const PLATFORM_PROFILE: u32 = 0x0900;
pub const PLATFORM_VERSION: u32 = 0x0901;
pub const PLATFORM_NAME: u32 = 0x0902;
pub const PLATFORM_VENDOR: u32 = 0x0903;
pub const PLATFORM_EXTENSIONS: u32 = 0x0904;

// device info
pub const DEVICE_TYPE: u32 = 0x1000;
pub const DEVICE_VENDOR_ID: u32 = 0x1001;
pub const DEVICE_MAX_COMPUTE_UNITS: u32 = 0x1002;
pub const DEVICE_MAX_WORK_ITEM_DIMENSIONS: u32 = 0x1003;
pub const DEVICE_MAX_WORK_GROUP_SIZE: u32 = 0x1004;
pub const DEVICE_MAX_WORK_ITEM_SIZES: u32 = 0x1005;
pub const DEVICE_PREFERRED_VECTOR_WIDTH_CHAR: u32 = 0x1006;
pub const DEVICE_PREFERRED_VECTOR_WIDTH_SHORT: u32 = 0x1007;
pub const DEVICE_PREFERRED_VECTOR_WIDTH_INT: u32 = 0x1008;
pub const DEVICE_PREFERRED_VECTOR_WIDTH_LONG: u32 = 0x1009;
pub const DEVICE_PREFERRED_VECTOR_WIDTH_FLOAT: u32 = 0x100A;
pub const DEVICE_PREFERRED_VECTOR_WIDTH_DOUBLE: u32 = 0x100B;
pub const DEVICE_MAX_CLOCK_FREQUENCY: u32 = 0x100C;
pub const DEVICE_ADDRESS_BITS: u32 = 0x100D;
pub const DEVICE_MAX_READ_IMAGE_ARGS: u32 = 0x100E;
pub const DEVICE_MAX_WRITE_IMAGE_ARGS: u32 = 0x100F;
pub const DEVICE_MAX_MEM_ALLOC_SIZE: u32 = 0x1010;
pub const DEVICE_IMAGE2D_MAX_WIDTH: u32 = 0x1011;
pub const DEVICE_IMAGE2D_MAX_HEIGHT: u32 = 0x1012;
pub const DEVICE_IMAGE3D_MAX_WIDTH: u32 = 0x1013;
pub const DEVICE_IMAGE3D_MAX_HEIGHT: u32 = 0x1014;
pub const DEVICE_IMAGE3D_MAX_DEPTH: u32 = 0x1015;
pub const DEVICE_IMAGE_SUPPORT: u32 = 0x1016;
pub const DEVICE_MAX_PARAMETER_SIZE: u32 = 0x1017;
pub const DEVICE_MAX_SAMPLERS: u32 = 0x1018;
pub const DEVICE_MEM_BASE_ADDR_ALIGN: u32 = 0x1019;
pub const DEVICE_MIN_DATA_TYPE_ALIGN_SIZE: u32 = 0x101A;
pub const DEVICE_SINGLE_FP_CONFIG: u32 = 0x101B;
pub const DEVICE_GLOBAL_MEM_CACHE_TYPE: u32 = 0x101C;
pub const DEVICE_GLOBAL_MEM_CACHELINE_SIZE: u32 = 0x101D;
pub const DEVICE_GLOBAL_MEM_CACHE_SIZE: u32 = 0x101E;
pub const DEVICE_GLOBAL_MEM_SIZE: u32 = 0x101F;
pub const DEVICE_MAX_CONSTANT_BUFFER_SIZE: u32 = 0x1020;
pub const DEVICE_MAX_CONSTANT_ARGS: u32 = 0x1021;
pub const DEVICE_LOCAL_MEM_TYPE: u32 = 0x1022;
pub const DEVICE_LOCAL_MEM_SIZE: u32 = 0x1023;
pub const DEVICE_ERROR_CORRECTION_SUPPORT: u32 = 0x1024;
pub const DEVICE_PROFILING_TIMER_RESOLUTION: u32 = 0x1025;
pub const DEVICE_ENDIAN_LITTLE: u32 = 0x1026;
pub const DEVICE_AVAILABLE: u32 = 0x1027;
pub const DEVICE_COMPILER_AVAILABLE: u32 = 0x1028;
pub const DEVICE_EXECUTION_CAPABILITIES: u32 = 0x1029;
pub const DEVICE_QUEUE_PROPERTIES: u32 = 0x102A;
pub const DEVICE_NAME: u32 = 0x102B;
pub const DEVICE_VENDOR: u32 = 0x102C;
pub const DRIVER_VERSION: u32 = 0x102D;
pub const DEVICE_PROFILE: u32 = 0x102E;
pub const DEVICE_VERSION: u32 = 0x102F;
pub const DEVICE_EXTENSIONS: u32 = 0x1030;
pub const DEVICE_PLATFORM: u32 = 0x1031;
pub const DEVICE_DOUBLE_FP_CONFIG: u32 = 0x1032;
pub const DEVICE_HALF_FP_CONFIG: u32 = 0x1033;
pub const DEVICE_PREFERRED_VECTOR_WIDTH_HALF: u32 = 0x1034;
pub const DEVICE_HOST_UNIFIED_MEMORY: u32 = 0x1035;
pub const DEVICE_NATIVE_VECTOR_WIDTH_CHAR: u32 = 0x1036;
pub const DEVICE_NATIVE_VECTOR_WIDTH_SHORT: u32 = 0x1037;
pub const DEVICE_NATIVE_VECTOR_WIDTH_INT: u32 = 0x1038;
pub const DEVICE_NATIVE_VECTOR_WIDTH_LONG: u32 = 0x1039;
pub const DEVICE_NATIVE_VECTOR_WIDTH_FLOAT: u32 = 0x103A;
pub const DEVICE_NATIVE_VECTOR_WIDTH_DOUBLE: u32 = 0x103B;
pub const DEVICE_NATIVE_VECTOR_WIDTH_HALF: u32 = 0x103C;
pub const DEVICE_OPENCL_C_VERSION: u32 = 0x103D;
pub const DEVICE_LINKER_AVAILABLE: u32 = 0x103E;
pub const DEVICE_BUILT_IN_KERNELS: u32 = 0x103F;
pub const DEVICE_IMAGE_MAX_BUFFER_SIZE: u32 = 0x1040;
pub const DEVICE_IMAGE_MAX_ARRAY_SIZE: u32 = 0x1041;
pub const DEVICE_PARENT_DEVICE: u32 = 0x1042;
pub const DEVICE_PARTITION_MAX_SUB_DEVICES: u32 = 0x1043;
pub const DEVICE_PARTITION_PROPERTIES: u32 = 0x1044;
pub const DEVICE_PARTITION_AFFINITY_DOMAIN: u32 = 0x1045;
pub const DEVICE_PARTITION_TYPE: u32 = 0x1046;
pub const DEVICE_REFERENCE_COUNT: u32 = 0x1047;
pub const DEVICE_PREFERRED_INTEROP_USER_SYNC: u32 = 0x1048;
pub const DEVICE_PRINTF_BUFFER_SIZE: u32 = 0x1049;
pub const DEVICE_IMAGE_PITCH_ALIGNMENT: u32 = 0x104A;
pub const DEVICE_IMAGE_BASE_ADDRESS_ALIGNMENT: u32 = 0x104B;
pub const DEVICE_MAX_READ_WRITE_IMAGE_ARGS: u32 = 0x104C;
pub const DEVICE_MAX_GLOBAL_VARIABLE_SIZE: u32 = 0x104D;
pub const DEVICE_QUEUE_ON_DEVICE_PROPERTIES: u32 = 0x104E;
pub const DEVICE_QUEUE_ON_DEVICE_PREFERRED_SIZE: u32 = 0x104F;
pub const DEVICE_QUEUE_ON_DEVICE_MAX_SIZE: u32 = 0x1050;
pub const DEVICE_MAX_ON_DEVICE_QUEUES: u32 = 0x1051;
pub const DEVICE_MAX_ON_DEVICE_EVENTS: u32 = 0x1052;
pub const DEVICE_SVM_CAPABILITIES: u32 = 0x1053;
pub const DEVICE_GLOBAL_VARIABLE_PREFERRED_TOTAL_SIZE: u32 = 0x1054;
pub const DEVICE_MAX_PIPE_ARGS: u32 = 0x1055;
pub const DEVICE_PIPE_MAX_ACTIVE_RESERVATIONS: u32 = 0x1056;
pub const DEVICE_PIPE_MAX_PACKET_SIZE: u32 = 0x1057;
pub const DEVICE_PREFERRED_PLATFORM_ATOMIC_ALIGNMENT: u32 = 0x1058;
pub const DEVICE_PREFERRED_GLOBAL_ATOMIC_ALIGNMENT: u32 = 0x1059;
pub const DEVICE_PREFERRED_LOCAL_ATOMIC_ALIGNMENT: u32 = 0x105A;
pub const DEVICE_SPIR_VERSIONS: u32 = 0x40E0;

// vendor device info
pub const DEVICE_COMPUTE_CAPABILITY_MAJOR_NV: u32 = 0x4000;
pub const DEVICE_COMPUTE_CAPABILITY_MINOR_NV: u32 = 0x4001;
pub const DEVICE_REGISTERS_PER_BLOCK_NV: u32 = 0x4002;
pub const DEVICE_WARP_SIZE_NV: u32 = 0x4003;
pub const DEVICE_GPU_OVERLAP_NV: u32 = 0x4004;
pub const DEVICE_KERNEL_EXEC_TIMEOUT_NV: u32 = 0x4005;
pub const DEVICE_INTEGRATED_MEMORY_NV: u32 = 0x4006;
pub const DEVICE_PROFILING_TIMER_OFFSET_AMD: u32 = 0x4036;
pub const DEVICE_BOARD_NAME_AMD: u32 = 0x4038;
pub const DEVICE_GLOBAL_FREE_MEMORY_AMD: u32 = 0x4039;
pub const DEVICE_SIMD_PER_COMPUTE_UNIT_AMD: u32 = 0x4040;
pub const DEVICE_SIMD_WIDTH_AMD: u32 = 0x4041;
pub const DEVICE_SIMD_INSTRUCTION_WIDTH_AMD: u32 = 0x4042;
pub const DEVICE_WAVEFRONT_WIDTH_AMD: u32 = 0x4043;
pub const DEVICE_GLOBAL_MEM_CHANNELS_AMD: u32 = 0x4044;
pub const DEVICE_GLOBAL_MEM_CHANNEL_BANKS_AMD: u32 = 0x4045;
pub const DEVICE_GLOBAL_MEM_CHANNEL_BANK_WIDTH_AMD: u32 = 0x4046;
pub const DEVICE_LOCAL_MEM_SIZE_PER_COMPUTE_UNIT_AMD: u32 = 0x4047;
pub const DEVICE_LOCAL_MEM_BANKS_AMD: u32 = 0x4048;

// device fp config
pub const FP_DENORM: u64 = 1 << 0;
pub const FP_INF_NAN: u64 = 1 << 1;
pub const FP_ROUND_TO_NEAREST: u64 = 1 << 2;
pub const FP_ROUND_TO_ZERO: u64 = 1 << 3;
pub const FP_ROUND_TO_INF: u64 = 1 << 4;
pub const FP_FMA: u64 = 1 << 5;
pub const FP_SOFT_FLOAT: u64 = 1 << 6;
pub const FP_CORRECTLY_ROUNDED_DIVIDE_SQRT: u64 = 1 << 7;

// device cache, local memory and execution capabilities
pub const NONE: u32 = 0x0;
pub const READ_ONLY_CACHE: u32 = 0x1;
pub const READ_WRITE_CACHE: u32 = 0x2;
pub const LOCAL: u32 = 0x1;
pub const GLOBAL: u32 = 0x2;
pub const EXEC_KERNEL: u64 = 1 << 0;
pub const EXEC_NATIVE_KERNEL: u64 = 1 << 1;

// device svm capabilities
pub const DEVICE_SVM_COARSE_GRAIN_BUFFER: u64 = 1 << 0;
pub const DEVICE_SVM_FINE_GRAIN_BUFFER: u64 = 1 << 1;
pub const DEVICE_SVM_FINE_GRAIN_SYSTEM: u64 = 1 << 2;
pub const DEVICE_SVM_ATOMICS: u64 = 1 << 3;

// device partition properties
pub const DEVICE_PARTITION_EQUALLY: isize = 0x1086;
pub const DEVICE_PARTITION_BY_COUNTS: isize = 0x1087;
pub const DEVICE_PARTITION_BY_COUNTS_LIST_END: isize = 0x0;
pub const DEVICE_PARTITION_BY_AFFINITY_DOMAIN: isize = 0x1088;

// device affinity domains
pub const DEVICE_AFFINITY_DOMAIN_NUMA: u64 = 1 << 0;
pub const DEVICE_AFFINITY_DOMAIN_L4_CACHE: u64 = 1 << 1;
pub const DEVICE_AFFINITY_DOMAIN_L3_CACHE: u64 = 1 << 2;
pub const DEVICE_AFFINITY_DOMAIN_L2_CACHE: u64 = 1 << 3;
pub const DEVICE_AFFINITY_DOMAIN_L1_CACHE: u64 = 1 << 4;
pub const DEVICE_AFFINITY_DOMAIN_NEXT_PARTITIONABLE: u64 = 1 << 5;

// context info
pub const CONTEXT_REFERENCE_COUNT: u32 = 0x1080;
pub const CONTEXT_DEVICES: u32 = 0x1081;
pub const CONTEXT_PROPERTIES: u32 = 0x1082;
pub const CONTEXT_NUM_DEVICES: u32 = 0x1083;
pub const CONTEXT_PLATFORM: isize = 0x1084;

// queue properties and info
pub const QUEUE_OUT_OF_ORDER_EXEC_MODE_ENABLE: u64 = 1 << 0;
pub const QUEUE_PROFILING_ENABLE: u64 = 1 << 1;
pub const QUEUE_CONTEXT: u32 = 0x1090;
pub const QUEUE_DEVICE: u32 = 0x1091;
pub const QUEUE_REFERENCE_COUNT: u32 = 0x1092;
pub const QUEUE_PROPERTIES: u32 = 0x1093;

// memory flags
pub const MEM_READ_WRITE: u64 = 1 << 0;
pub const MEM_WRITE_ONLY: u64 = 1 << 1;
pub const MEM_READ_ONLY: u64 = 1 << 2;
pub const MEM_USE_HOST_PTR: u64 = 1 << 3;
pub const MEM_ALLOC_HOST_PTR: u64 = 1 << 4;
pub const MEM_COPY_HOST_PTR: u64 = 1 << 5;
pub const MEM_HOST_WRITE_ONLY: u64 = 1 << 7;
pub const MEM_HOST_READ_ONLY: u64 = 1 << 8;
pub const MEM_HOST_NO_ACCESS: u64 = 1 << 9;

pub const MIGRATE_MEM_OBJECT_HOST: u64 = 1 << 0;
pub const MIGRATE_MEM_OBJECT_CONTENT_UNDEFINED: u64 = 1 << 1;

// channel orders
pub const R: u32 = 0x10B0;
pub const A: u32 = 0x10B1;
pub const RG: u32 = 0x10B2;
pub const RA: u32 = 0x10B3;
pub const RGB: u32 = 0x10B4;
pub const RGBA: u32 = 0x10B5;
pub const BGRA: u32 = 0x10B6;
pub const ARGB: u32 = 0x10B7;
pub const INTENSITY: u32 = 0x10B8;
pub const LUMINANCE: u32 = 0x10B9;

// channel types
pub const SNORM_INT8: u32 = 0x10D0;
pub const SNORM_INT16: u32 = 0x10D1;
pub const UNORM_INT8: u32 = 0x10D2;
pub const UNORM_INT16: u32 = 0x10D3;
pub const UNORM_SHORT_565: u32 = 0x10D4;
pub const UNORM_SHORT_555: u32 = 0x10D5;
pub const UNORM_INT_101010: u32 = 0x10D6;
pub const SIGNED_INT8: u32 = 0x10D7;
pub const SIGNED_INT16: u32 = 0x10D8;
pub const SIGNED_INT32: u32 = 0x10D9;
pub const UNSIGNED_INT8: u32 = 0x10DA;
pub const UNSIGNED_INT16: u32 = 0x10DB;
pub const UNSIGNED_INT32: u32 = 0x10DC;
pub const HALF_FLOAT: u32 = 0x10DD;
pub const FLOAT: u32 = 0x10DE;

// memory object types
pub const MEM_OBJECT_BUFFER: u32 = 0x10F0;
pub const MEM_OBJECT_IMAGE2D: u32 = 0x10F1;
pub const MEM_OBJECT_IMAGE3D: u32 = 0x10F2;
pub const MEM_OBJECT_IMAGE2D_ARRAY: u32 = 0x10F3;
pub const MEM_OBJECT_IMAGE1D: u32 = 0x10F4;
pub const MEM_OBJECT_IMAGE1D_ARRAY: u32 = 0x10F5;
pub const MEM_OBJECT_IMAGE1D_BUFFER: u32 = 0x10F6;

pub const BUFFER_CREATE_TYPE_REGION: u32 = 0x1220;

// memory object info
pub const MEM_TYPE: u32 = 0x1100;
pub const MEM_FLAGS: u32 = 0x1101;
pub const MEM_SIZE: u32 = 0x1102;
pub const MEM_HOST_PTR: u32 = 0x1103;
pub const MEM_MAP_COUNT: u32 = 0x1104;
pub const MEM_REFERENCE_COUNT: u32 = 0x1105;
pub const MEM_CONTEXT: u32 = 0x1106;
pub const MEM_ASSOCIATED_MEMOBJECT: u32 = 0x1107;
pub const MEM_OFFSET: u32 = 0x1108;

// image info
pub const IMAGE_FORMAT: u32 = 0x1110;
pub const IMAGE_ELEMENT_SIZE: u32 = 0x1111;
pub const IMAGE_ROW_PITCH: u32 = 0x1112;
pub const IMAGE_SLICE_PITCH: u32 = 0x1113;
pub const IMAGE_WIDTH: u32 = 0x1114;
pub const IMAGE_HEIGHT: u32 = 0x1115;
pub const IMAGE_DEPTH: u32 = 0x1116;
pub const IMAGE_ARRAY_SIZE: u32 = 0x1117;
pub const IMAGE_NUM_MIP_LEVELS: u32 = 0x1119;
pub const IMAGE_NUM_SAMPLES: u32 = 0x111A;

// sampler modes and info
pub const ADDRESS_NONE: u32 = 0x1130;
pub const ADDRESS_CLAMP_TO_EDGE: u32 = 0x1131;
pub const ADDRESS_CLAMP: u32 = 0x1132;
pub const ADDRESS_REPEAT: u32 = 0x1133;
pub const ADDRESS_MIRRORED_REPEAT: u32 = 0x1134;
pub const FILTER_NEAREST: u32 = 0x1140;
pub const FILTER_LINEAR: u32 = 0x1141;
pub const SAMPLER_REFERENCE_COUNT: u32 = 0x1150;
pub const SAMPLER_CONTEXT: u32 = 0x1151;
pub const SAMPLER_NORMALIZED_COORDS: u32 = 0x1152;
pub const SAMPLER_ADDRESSING_MODE: u32 = 0x1153;
pub const SAMPLER_FILTER_MODE: u32 = 0x1154;

// map flags
pub const MAP_READ: u64 = 1 << 0;
pub const MAP_WRITE: u64 = 1 << 1;
pub const MAP_WRITE_INVALIDATE_REGION: u64 = 1 << 2;

// program info
pub const PROGRAM_REFERENCE_COUNT: u32 = 0x1160;
pub const PROGRAM_CONTEXT: u32 = 0x1161;
pub const PROGRAM_NUM_DEVICES: u32 = 0x1162;
pub const PROGRAM_DEVICES: u32 = 0x1163;
pub const PROGRAM_SOURCE: u32 = 0x1164;
pub const PROGRAM_BINARY_SIZES: u32 = 0x1165;
pub const PROGRAM_BINARIES: u32 = 0x1166;
pub const PROGRAM_NUM_KERNELS: u32 = 0x1167;
pub const PROGRAM_KERNEL_NAMES: u32 = 0x1168;

// program build info
pub const PROGRAM_BUILD_STATUS: u32 = 0x1181;
pub const PROGRAM_BUILD_OPTIONS: u32 = 0x1182;
pub const PROGRAM_BUILD_LOG: u32 = 0x1183;
pub const PROGRAM_BINARY_TYPE: u32 = 0x1184;

pub const PROGRAM_BINARY_TYPE_NONE: u32 = 0x0;
pub const PROGRAM_BINARY_TYPE_COMPILED_OBJECT: u32 = 0x1;
pub const PROGRAM_BINARY_TYPE_LIBRARY: u32 = 0x2;
pub const PROGRAM_BINARY_TYPE_EXECUTABLE: u32 = 0x4;

pub const BUILD_SUCCESS: i32 = 0;
pub const BUILD_NONE: i32 = -1;
pub const BUILD_ERROR: i32 = -2;
pub const BUILD_IN_PROGRESS: i32 = -3;

// kernel info
pub const KERNEL_FUNCTION_NAME: u32 = 0x1190;
pub const KERNEL_NUM_ARGS: u32 = 0x1191;
pub const KERNEL_REFERENCE_COUNT: u32 = 0x1192;
pub const KERNEL_CONTEXT: u32 = 0x1193;
pub const KERNEL_PROGRAM: u32 = 0x1194;
pub const KERNEL_ATTRIBUTES: u32 = 0x1195;

// kernel arg info
pub const KERNEL_ARG_ADDRESS_QUALIFIER: u32 = 0x1196;
pub const KERNEL_ARG_ACCESS_QUALIFIER: u32 = 0x1197;
pub const KERNEL_ARG_TYPE_NAME: u32 = 0x1198;
pub const KERNEL_ARG_TYPE_QUALIFIER: u32 = 0x1199;
pub const KERNEL_ARG_NAME: u32 = 0x119A;

pub const KERNEL_ARG_ADDRESS_GLOBAL: u32 = 0x119B;
pub const KERNEL_ARG_ADDRESS_LOCAL: u32 = 0x119C;
pub const KERNEL_ARG_ADDRESS_CONSTANT: u32 = 0x119D;
pub const KERNEL_ARG_ADDRESS_PRIVATE: u32 = 0x119E;

pub const KERNEL_ARG_ACCESS_READ_ONLY: u32 = 0x11A0;
pub const KERNEL_ARG_ACCESS_WRITE_ONLY: u32 = 0x11A1;
pub const KERNEL_ARG_ACCESS_READ_WRITE: u32 = 0x11A2;
pub const KERNEL_ARG_ACCESS_NONE: u32 = 0x11A3;

pub const KERNEL_ARG_TYPE_NONE: u64 = 0;
pub const KERNEL_ARG_TYPE_CONST: u64 = 1 << 0;
pub const KERNEL_ARG_TYPE_RESTRICT: u64 = 1 << 1;
pub const KERNEL_ARG_TYPE_VOLATILE: u64 = 1 << 2;

// kernel work group info
pub const KERNEL_WORK_GROUP_SIZE: u32 = 0x11B0;
pub const KERNEL_COMPILE_WORK_GROUP_SIZE: u32 = 0x11B1;
pub const KERNEL_LOCAL_MEM_SIZE: u32 = 0x11B2;
pub const KERNEL_PREFERRED_WORK_GROUP_SIZE_MULTIPLE: u32 = 0x11B3;
pub const KERNEL_PRIVATE_MEM_SIZE: u32 = 0x11B4;

// event info
pub const EVENT_COMMAND_QUEUE: u32 = 0x11D0;
pub const EVENT_COMMAND_TYPE: u32 = 0x11D1;
pub const EVENT_REFERENCE_COUNT: u32 = 0x11D2;
pub const EVENT_COMMAND_EXECUTION_STATUS: u32 = 0x11D3;
pub const EVENT_CONTEXT: u32 = 0x11D4;

// command types
pub const COMMAND_NDRANGE_KERNEL: u32 = 0x11F0;
pub const COMMAND_TASK: u32 = 0x11F1;
pub const COMMAND_NATIVE_KERNEL: u32 = 0x11F2;
pub const COMMAND_READ_BUFFER: u32 = 0x11F3;
pub const COMMAND_WRITE_BUFFER: u32 = 0x11F4;
pub const COMMAND_COPY_BUFFER: u32 = 0x11F5;
pub const COMMAND_READ_IMAGE: u32 = 0x11F6;
pub const COMMAND_WRITE_IMAGE: u32 = 0x11F7;
pub const COMMAND_COPY_IMAGE: u32 = 0x11F8;
pub const COMMAND_COPY_IMAGE_TO_BUFFER: u32 = 0x11F9;
pub const COMMAND_COPY_BUFFER_TO_IMAGE: u32 = 0x11FA;
pub const COMMAND_MAP_BUFFER: u32 = 0x11FB;
pub const COMMAND_MAP_IMAGE: u32 = 0x11FC;
pub const COMMAND_UNMAP_MEM_OBJECT: u32 = 0x11FD;
pub const COMMAND_MARKER: u32 = 0x11FE;
pub const COMMAND_ACQUIRE_GL_OBJECTS: u32 = 0x11FF;
pub const COMMAND_RELEASE_GL_OBJECTS: u32 = 0x1200;
pub const COMMAND_READ_BUFFER_RECT: u32 = 0x1201;
pub const COMMAND_WRITE_BUFFER_RECT: u32 = 0x1202;
pub const COMMAND_COPY_BUFFER_RECT: u32 = 0x1203;
pub const COMMAND_USER: u32 = 0x1204;
pub const COMMAND_BARRIER: u32 = 0x1205;
pub const COMMAND_MIGRATE_MEM_OBJECTS: u32 = 0x1206;
pub const COMMAND_FILL_BUFFER: u32 = 0x1207;
pub const COMMAND_FILL_IMAGE: u32 = 0x1208;
pub const COMMAND_SVM_FREE: u32 = 0x1209;
pub const COMMAND_SVM_MEMCPY: u32 = 0x120A;
pub const COMMAND_SVM_MEMFILL: u32 = 0x120B;
pub const COMMAND_SVM_MAP: u32 = 0x120C;
pub const COMMAND_SVM_UNMAP: u32 = 0x120D;
pub const COMMAND_SVM_MIGRATE_MEM: u32 = 0x120E;

// execution status
pub const COMPLETE: i32 = 0x0;
pub const RUNNING: i32 = 0x1;
pub const SUBMITTED: i32 = 0x2;
pub const QUEUED: i32 = 0x3;

// profiling info
pub const PROFILING_COMMAND_QUEUED: u32 = 0x1280;
pub const PROFILING_COMMAND_SUBMIT: u32 = 0x1281;
pub const PROFILING_COMMAND_START: u32 = 0x1282;
pub const PROFILING_COMMAND_END: u32 = 0x1283;
pub const PROFILING_COMMAND_COMPLETE: u32 = 0x1284;
