/*!
Kernels.

A [`Kernel`] is obtained from a built [`Program`](crate::program::Program). Arguments are
[`KernelArg`]s, usually created with the [`args!`](crate::args) macro:
```
# use clkit::{args, buffer::Buffer, cl, context::Context, program::Program, queue::Queue};
# fn main() -> clkit::result::Result<()> {
# clkit::runtime::install_host().ok();
let context = Context::new_gpu()?;
let queue = Queue::builder(&context).build()?;
let program = Program::from_source(
    &context,
    "__kernel void scale(__global float* x, float alpha, uint n) {}",
)?;
program.build("")?;
let x = Buffer::from_slice(&context, cl::MEM_READ_WRITE, &[1f32; 100])?;
let kernel = program.kernel("scale")?;
let device = queue.device()?;
let (global, local) = kernel.suggest_worksizes(&device, &[100])?;
let event = kernel.set_args_and_enqueue_ndrange(
    &queue,
    1,
    None,
    &global,
    Some(&local),
    None,
    &args![&x, 2f32, 100u32],
)?;
event.wait()?;
# Ok(())
# }
```
*/

use crate::{
    buffer::Buffer,
    cl,
    context::{Context, ContextKind},
    device::Device,
    error::{Error, NativeResultExt},
    event::{with_wait_list, Event, WaitList},
    image::Image,
    memobj::MemObj,
    program::{Program, ProgramKind},
    queue::Queue,
    result::Result,
    runtime::{backend, Handle, InfoQuery},
    sampler::Sampler,
    wrapper::{impl_kind, impl_wrapper, info_getters, Info, Wrapper},
};
use bytemuck::Pod;
use paste::paste;
use std::{ffi::c_void, mem::size_of, ptr, sync::Arc};

/// A kernel argument.
#[derive(Clone, Debug, Eq, PartialEq, derive_more::IsVariant)]
pub enum KernelArg {
    /// A value passed by copy.
    Scalar(Vec<u8>),
    /// A buffer or image, `None` for a null pointer.
    Mem(Option<Handle>),
    /// Local memory of the given size in bytes.
    Local(usize),
    Sampler(Handle),
}

impl KernelArg {
    /// A value argument with the bytes of `value`.
    pub fn value<T: Pod>(value: T) -> Self {
        Self::Scalar(bytemuck::bytes_of(&value).to_vec())
    }
    /// Local memory for `len` elements of `T`.
    pub fn local<T>(len: usize) -> Self {
        Self::Local(len * size_of::<T>())
    }
    /// A null buffer.
    pub fn null() -> Self {
        Self::Mem(None)
    }
}

macro_rules! impl_scalar_args {
    ($($t:ty => $cl:ident),* $(,)?) => {
        paste! {
            $(
                impl From<$t> for KernelArg {
                    fn from(value: $t) -> Self {
                        Self::value(value)
                    }
                }

                impl KernelArg {
                    #[doc = "A `" $cl "2` argument."]
                    pub fn [<$cl 2>](value: [$t; 2]) -> Self {
                        Self::value(value)
                    }
                    #[doc = "A `" $cl "3` argument, padded to 4 components."]
                    pub fn [<$cl 3>](value: [$t; 3]) -> Self {
                        Self::value([value[0], value[1], value[2], <$t>::default()])
                    }
                    #[doc = "A `" $cl "4` argument."]
                    pub fn [<$cl 4>](value: [$t; 4]) -> Self {
                        Self::value(value)
                    }
                    #[doc = "A `" $cl "8` argument."]
                    pub fn [<$cl 8>](value: [$t; 8]) -> Self {
                        Self::value(value)
                    }
                    #[doc = "A `" $cl "16` argument."]
                    pub fn [<$cl 16>](value: [$t; 16]) -> Self {
                        Self::value(value)
                    }
                }
            )*
        }
    };
}

impl_scalar_args! {
    u8 => uchar,
    i8 => char,
    u16 => ushort,
    i16 => short,
    u32 => uint,
    i32 => int,
    u64 => ulong,
    i64 => long,
    f32 => float,
    f64 => double,
}

impl From<&MemObj> for KernelArg {
    fn from(mem: &MemObj) -> Self {
        Self::Mem(Some(mem.handle()))
    }
}

impl From<&Buffer> for KernelArg {
    fn from(buffer: &Buffer) -> Self {
        Self::Mem(Some(buffer.handle()))
    }
}

impl From<&Image> for KernelArg {
    fn from(image: &Image) -> Self {
        Self::Mem(Some(image.handle()))
    }
}

impl From<&Sampler> for KernelArg {
    fn from(sampler: &Sampler) -> Self {
        Self::Sampler(sampler.handle())
    }
}

/// Creates an array of [`KernelArg`](crate::kernel::KernelArg)s.
///
/// Each argument is converted with `KernelArg::from`.
/// ```
/// # use clkit::{args, kernel::KernelArg};
/// let args = args![1u32, 2f32, KernelArg::local::<f32>(64)];
/// assert_eq!(args[2], KernelArg::Local(256));
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        [$($crate::kernel::KernelArg::from($arg)),*]
    };
}

/// Argument metadata, see [`Kernel::arg_info`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KernelArgInfo {
    /// One of `cl::KERNEL_ARG_ADDRESS_*`.
    pub address_qualifier: u32,
    /// One of `cl::KERNEL_ARG_ACCESS_*`.
    pub access_qualifier: u32,
    pub type_name: String,
    /// Bitfield of `cl::KERNEL_ARG_TYPE_*`.
    pub type_qualifier: u64,
    pub name: String,
}

impl_kind!(KernelKind, Kernel, Kernel, ());

/// A kernel.
#[derive(Clone, derive_more::Deref)]
pub struct Kernel {
    #[deref]
    wrapper: Wrapper<KernelKind>,
}

impl_wrapper!(Kernel, KernelKind);

impl Kernel {
    info_getters! {
        pub fn function_name() -> String = info_string(cl::KERNEL_FUNCTION_NAME);
        pub fn num_args() -> u32 = info_scalar(cl::KERNEL_NUM_ARGS);
        /// The attributes of the declaration, ie `__attribute__((reqd_work_group_size(64,1,1)))`.
        pub fn attributes() -> String = info_string(cl::KERNEL_ATTRIBUTES);
    }
    pub fn context(&self) -> Result<Context> {
        self.info_wrapper::<ContextKind>(cl::KERNEL_CONTEXT)
            .map(Context::from)
    }
    pub fn program(&self) -> Result<Program> {
        self.info_wrapper::<ProgramKind>(cl::KERNEL_PROGRAM)
            .map(Program::from)
    }
    /// Sets the argument at `index`.
    ///
    /// **errors**
    /// - [`Native`](crate::error::ErrorKind::Native): The index, size or value does not match the
    /// parameter (`cl::INVALID_ARG_INDEX`, `cl::INVALID_ARG_SIZE`, `cl::INVALID_ARG_VALUE`).
    pub fn set_arg(&self, index: u32, arg: impl Into<KernelArg>) -> Result<()> {
        self.set_arg_ref(index, &arg.into())
    }
    /// Sets the arguments from index 0.
    pub fn set_args(&self, args: &[KernelArg]) -> Result<()> {
        for (index, arg) in args.iter().enumerate() {
            self.set_arg_ref(index as u32, arg)?;
        }
        Ok(())
    }
    fn set_arg_ref(&self, index: u32, arg: &KernelArg) -> Result<()> {
        let raw: usize;
        let (size, value) = match arg {
            KernelArg::Scalar(bytes) => (bytes.len(), bytes.as_ptr() as *const c_void),
            KernelArg::Mem(handle) => {
                raw = handle.map_or(0, Handle::as_raw);
                (size_of::<usize>(), &raw as *const usize as *const c_void)
            }
            KernelArg::Sampler(handle) => {
                raw = handle.as_raw();
                (size_of::<usize>(), &raw as *const usize as *const c_void)
            }
            KernelArg::Local(size) => (*size, ptr::null()),
        };
        // Safety: value is null or points to size bytes that outlive the call.
        unsafe { backend().set_kernel_arg(self.handle(), index, size, value) }
            .or_native(format!("set argument {index} of {self:?} to {arg:?}"))
    }
    /// Enqueues the kernel on `queue`.
    ///
    /// `global_work_offset`, `global_work_size` and `local_work_size` have `work_dim`
    /// components. Without a local size the implementation picks one.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): A slice does not have
    /// `work_dim` components.
    /// - [`Native`](crate::error::ErrorKind::Native):
    ///     - `cl::INVALID_KERNEL_ARGS`: An argument is not set.
    ///     - `cl::INVALID_WORK_GROUP_SIZE`: The local size does not divide the global size or
    ///     exceeds the device limit.
    ///     - `cl::INVALID_PROGRAM_EXECUTABLE`: The program is not built for the device of `queue`.
    pub fn enqueue_ndrange(
        &self,
        queue: &Queue,
        work_dim: u32,
        global_work_offset: Option<&[usize]>,
        global_work_size: &[usize],
        local_work_size: Option<&[usize]>,
        wait_list: Option<&mut WaitList>,
    ) -> Result<Event> {
        let dims = work_dim as usize;
        let sizes = [
            ("global work offset", global_work_offset),
            ("global work size", Some(global_work_size)),
            ("local work size", local_work_size),
        ];
        for (what, size) in sizes {
            if let Some(size) = size.filter(|size| size.len() != dims) {
                return Err(Error::invalid_argument(format!(
                    "{what} {size:?} does not have {work_dim} components"
                )));
            }
        }
        let handle = with_wait_list(wait_list, |wait| {
            backend()
                .enqueue_ndrange_kernel(
                    queue.handle(),
                    self.handle(),
                    work_dim,
                    global_work_offset,
                    global_work_size,
                    local_work_size,
                    wait,
                )
                .or_native(format!(
                    "enqueue {self:?} over {global_work_size:?} with local size {local_work_size:?}"
                ))
        })?;
        queue.register(handle)
    }
    /// Sets `args` and enqueues the kernel, see [`set_args`](Self::set_args) and
    /// [`enqueue_ndrange`](Self::enqueue_ndrange).
    #[allow(clippy::too_many_arguments)]
    pub fn set_args_and_enqueue_ndrange(
        &self,
        queue: &Queue,
        work_dim: u32,
        global_work_offset: Option<&[usize]>,
        global_work_size: &[usize],
        local_work_size: Option<&[usize]>,
        wait_list: Option<&mut WaitList>,
        args: &[KernelArg],
    ) -> Result<Event> {
        self.set_args(args)?;
        self.enqueue_ndrange(
            queue,
            work_dim,
            global_work_offset,
            global_work_size,
            local_work_size,
            wait_list,
        )
    }
    /// Metadata of the argument at `index`.
    pub fn arg_info(&self, index: u32) -> Result<KernelArgInfo> {
        let query = InfoQuery::KernelArg(self.handle(), index);
        let info = |param| self.info_of(query, param);
        Ok(KernelArgInfo {
            address_qualifier: info(cl::KERNEL_ARG_ADDRESS_QUALIFIER)?.scalar()?,
            access_qualifier: info(cl::KERNEL_ARG_ACCESS_QUALIFIER)?.scalar()?,
            type_name: info(cl::KERNEL_ARG_TYPE_NAME)?.string(),
            type_qualifier: info(cl::KERNEL_ARG_TYPE_QUALIFIER)?.scalar()?,
            name: info(cl::KERNEL_ARG_NAME)?.string(),
        })
    }
    /// The cached work group info `param` for `device`.
    ///
    /// `device` may be `None` if the program has a single device.
    pub fn work_group_info(&self, device: Option<&Device>, param: u32) -> Result<Arc<Info>> {
        self.info_of(
            InfoQuery::KernelWorkGroup(self.handle(), device.map(|device| device.handle())),
            param,
        )
    }
    /// The maximum work group size on `device`.
    pub fn work_group_size(&self, device: &Device) -> Result<usize> {
        self.work_group_info(Some(device), cl::KERNEL_WORK_GROUP_SIZE)?
            .scalar()
    }
    /// The preferred multiple of the work group size on `device`.
    pub fn preferred_work_group_size_multiple(&self, device: &Device) -> Result<usize> {
        self.work_group_info(Some(device), cl::KERNEL_PREFERRED_WORK_GROUP_SIZE_MULTIPLE)?
            .scalar()
    }
    /// The work group size required by the kernel attributes, `[0, 0, 0]` if none.
    pub fn compile_work_group_size(&self, device: &Device) -> Result<[usize; 3]> {
        self.work_group_info(Some(device), cl::KERNEL_COMPILE_WORK_GROUP_SIZE)?
            .scalar()
    }
    pub fn local_mem_size(&self, device: &Device) -> Result<u64> {
        self.work_group_info(Some(device), cl::KERNEL_LOCAL_MEM_SIZE)?
            .scalar()
    }
    pub fn private_mem_size(&self, device: &Device) -> Result<u64> {
        self.work_group_info(Some(device), cl::KERNEL_PRIVATE_MEM_SIZE)?
            .scalar()
    }
    /// Suggests global and local work sizes for `real_worksize` on `device`.
    ///
    /// See [`suggest_worksizes`].
    pub fn suggest_worksizes(
        &self,
        device: &Device,
        real_worksize: &[usize],
    ) -> Result<(Vec<usize>, Vec<usize>)> {
        suggest_worksizes(Some(self), device, real_worksize, None)
    }
}

struct Limits {
    item_sizes: Vec<usize>,
    group_size: usize,
    multiple: usize,
}

#[track_caller]
fn limits(
    kernel: Option<&Kernel>,
    device: &Device,
    real_worksize: &[usize],
    max_local: Option<&[usize]>,
) -> Result<Limits> {
    let dims = real_worksize.len();
    if dims == 0 || real_worksize.contains(&0) {
        return Err(Error::invalid_argument(format!(
            "real work size {real_worksize:?} must have 1 or more non zero components"
        )));
    }
    let device_dims = device.max_work_item_dimensions()? as usize;
    if dims > device_dims {
        return Err(Error::unsupported(format!(
            "{device:?} supports up to {device_dims} dimensions, {dims} were requested"
        )));
    }
    let mut item_sizes = device.max_work_item_sizes()?;
    item_sizes.truncate(dims);
    if let Some(max_local) = max_local {
        for (size, max) in item_sizes.iter_mut().zip(max_local) {
            if *max != 0 {
                *size = (*size).min(*max);
            }
        }
    }
    let (group_size, multiple) = match kernel {
        Some(kernel) => (
            kernel.work_group_size(device)?,
            kernel.preferred_work_group_size_multiple(device)?,
        ),
        None => {
            let group_size = device.max_work_group_size()?;
            (group_size, group_size)
        }
    };
    Ok(Limits {
        item_sizes,
        group_size: group_size.max(1),
        multiple: multiple.max(1),
    })
}

/// Suggests a local work size and a global work size covering `real_worksize`.
///
/// Each local component starts at the preferred work group size multiple of `kernel` (or the
/// maximum work group size of `device` without a kernel), bounded by the device work item sizes
/// and the non zero components of `max_local`. Components larger than the real work size are
/// halved, then the product is halved from the last dimension until it fits the work group
/// limit. The global size is the real size rounded up to a multiple of the local size.
///
/// **errors**
/// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): `real_worksize` is empty or
/// has a zero component.
/// - [`Unsupported`](crate::error::ErrorKind::Unsupported): The device supports fewer dimensions.
#[track_caller]
pub fn suggest_worksizes(
    kernel: Option<&Kernel>,
    device: &Device,
    real_worksize: &[usize],
    max_local: Option<&[usize]>,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let limits = limits(kernel, device, real_worksize, max_local)?;
    let mut local: Vec<usize> = limits
        .item_sizes
        .iter()
        .zip(real_worksize)
        .map(|(max, real)| {
            let mut size = limits.multiple.min(*max).max(1);
            while size > *real {
                size /= 2;
            }
            size.max(1)
        })
        .collect();
    while local.iter().product::<usize>() > limits.group_size {
        let before: usize = local.iter().product();
        for i in (0..local.len()).rev() {
            if local[i] > 1 {
                local[i] /= 2;
            }
            if local.iter().product::<usize>() <= limits.group_size {
                break;
            }
        }
        if local.iter().product::<usize>() == before {
            return Err(Error::internal(format!(
                "unable to find a local work size within the limit of {}",
                limits.group_size
            )));
        }
    }
    let global = real_worksize
        .iter()
        .zip(local.iter())
        .map(|(real, local)| (real + local - 1) / local * local)
        .collect();
    Ok((global, local))
}

/// Suggests a local work size that divides `real_worksize` in every dimension.
///
/// Starts from the local size of [`suggest_worksizes`] and replaces each component that does not
/// divide the real size with its largest divisor within the limits.
#[track_caller]
pub fn suggest_local_divisor(
    kernel: Option<&Kernel>,
    device: &Device,
    real_worksize: &[usize],
    max_local: Option<&[usize]>,
) -> Result<Vec<usize>> {
    let limits = limits(kernel, device, real_worksize, max_local)?;
    let (_, mut local) = suggest_worksizes(kernel, device, real_worksize, max_local)?;
    if local.iter().zip(real_worksize).all(|(local, real)| real % local == 0) {
        return Ok(local);
    }
    let mut group_size = 1;
    for ((local, real), max) in local.iter_mut().zip(real_worksize).zip(&limits.item_sizes) {
        if real % *local != 0 || *local * group_size > limits.group_size {
            let mut best = 1;
            for candidate in 2..=real / 2 {
                if group_size * candidate > limits.group_size || candidate > *max {
                    break;
                }
                if real % candidate == 0 {
                    best = candidate;
                }
            }
            *local = best;
        }
        group_size *= *local;
    }
    Ok(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::Context,
        dev_container::DevContainer,
        runtime::{ImageDesc, ImageFormat},
        sampler::SamplerProperties,
        wrapper::memcheck,
    };

    const SOURCE: &str = r#"
        __kernel void axpy(__global const float* x, __global float* y, float alpha, uint n) {}
        __kernel __attribute__((reqd_work_group_size(64, 1, 1)))
        void tile(__local float* scratch, read_only image2d_t img, sampler_t s, int3 offset) {}
    "#;

    fn program(context: &Context) -> Program {
        let program = Program::from_source(context, SOURCE).unwrap();
        program.build("").unwrap();
        program
    }

    #[test]
    fn kernel_info() {
        let _guard = crate::test_lock();
        {
            let context = Context::new_gpu().unwrap();
            let program = program(&context);
            let kernel = program.kernel("axpy").unwrap();
            assert_eq!(kernel.function_name().unwrap(), "axpy");
            assert_eq!(kernel.num_args().unwrap(), 4);
            assert_eq!(kernel.context().unwrap(), context);
            assert_eq!(kernel.program().unwrap(), program);
            let info = kernel.arg_info(0).unwrap();
            assert_eq!(
                info,
                KernelArgInfo {
                    address_qualifier: cl::KERNEL_ARG_ADDRESS_GLOBAL,
                    access_qualifier: cl::KERNEL_ARG_ACCESS_NONE,
                    type_name: "float*".into(),
                    type_qualifier: cl::KERNEL_ARG_TYPE_CONST,
                    name: "x".into(),
                }
            );
            assert_eq!(kernel.arg_info(2).unwrap().type_name, "float");
            let error = kernel.arg_info(4).unwrap_err();
            assert_eq!(error.native_code(), Some(cl::INVALID_ARG_INDEX));
            let tile = program.kernel("tile").unwrap();
            assert!(tile.attributes().unwrap().contains("reqd_work_group_size"));
            assert_eq!(
                tile.arg_info(1).unwrap().access_qualifier,
                cl::KERNEL_ARG_ACCESS_READ_ONLY
            );
        }
        assert!(memcheck());
    }

    #[test]
    fn work_group_info() {
        let _guard = crate::test_lock();
        let context = Context::new_gpu().unwrap();
        let device = context.device(0).unwrap();
        let kernel = program(&context).kernel("axpy").unwrap();
        assert_eq!(kernel.work_group_size(&device).unwrap(), 256);
        assert_eq!(kernel.preferred_work_group_size_multiple(&device).unwrap(), 32);
        assert_eq!(kernel.compile_work_group_size(&device).unwrap(), [0; 3]);
        assert_eq!(kernel.local_mem_size(&device).unwrap(), 0);
        assert_eq!(kernel.private_mem_size(&device).unwrap(), 0);
        let a = kernel.work_group_info(None, cl::KERNEL_WORK_GROUP_SIZE).unwrap();
        let b = kernel.work_group_info(None, cl::KERNEL_WORK_GROUP_SIZE).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn set_args_and_enqueue() {
        let _guard = crate::test_lock();
        {
            let context = Context::new_gpu().unwrap();
            let queue = Queue::builder(&context).build().unwrap();
            let program = program(&context);
            let kernel = program.kernel("axpy").unwrap();
            let x = Buffer::new(&context, cl::MEM_READ_ONLY, 256).unwrap();
            let y = Buffer::new(&context, cl::MEM_READ_WRITE, 256).unwrap();

            kernel.set_arg(0, &x).unwrap();
            let error = kernel.enqueue_ndrange(&queue, 1, None, &[64], None, None).unwrap_err();
            assert_eq!(error.native_code(), Some(cl::INVALID_KERNEL_ARGS));
            let error = kernel.set_arg(3, 1u64).unwrap_err();
            assert_eq!(error.native_code(), Some(cl::INVALID_ARG_SIZE));

            let event = kernel
                .set_args_and_enqueue_ndrange(
                    &queue,
                    1,
                    None,
                    &[64],
                    Some(&[32]),
                    None,
                    &args![&x, &y, 2f32, 64u32],
                )
                .unwrap();
            event.wait().unwrap();
            assert_eq!(event.command_type().unwrap(), cl::COMMAND_NDRANGE_KERNEL);
            assert_eq!(queue.events(), [event]);

            let error = kernel
                .enqueue_ndrange(&queue, 1, None, &[64], Some(&[48]), None)
                .unwrap_err();
            assert_eq!(error.native_code(), Some(cl::INVALID_WORK_GROUP_SIZE));
            let error = kernel
                .enqueue_ndrange(&queue, 4, None, &[1, 1, 1, 1], None, None)
                .unwrap_err();
            assert_eq!(error.native_code(), Some(cl::INVALID_WORK_DIMENSION));
            let error = kernel
                .enqueue_ndrange(&queue, 2, None, &[64, 64], Some(&[8]), None)
                .unwrap_err();
            assert!(error.kind().is_invalid_argument());
            let error = kernel
                .enqueue_ndrange(&queue, 1, Some(&[0, 0]), &[64], None, None)
                .unwrap_err();
            assert!(error.kind().is_invalid_argument());
            let error = kernel
                .enqueue_ndrange(&queue, 2, None, &[64], None, None)
                .unwrap_err();
            assert!(error.kind().is_invalid_argument());
            let error = program
                .run(&queue, "axpy", &[64, 64], Some(&[8]), &args![&x, &y, 2f32, 64u32])
                .unwrap_err();
            assert!(error.kind().is_invalid_argument());
            assert_eq!(queue.events().len(), 1);
            kernel.set_arg(1, KernelArg::null()).unwrap();
            queue.finish().unwrap();
        }
        assert!(memcheck());
    }

    #[test]
    fn image_sampler_local_args() {
        let _guard = crate::test_lock();
        let context = Context::new_gpu().unwrap();
        let queue = Queue::builder(&context).build().unwrap();
        let kernel = program(&context).kernel("tile").unwrap();
        let image = Image::new(
            &context,
            cl::MEM_READ_ONLY,
            ImageFormat {
                channel_order: cl::RGBA,
                channel_data_type: cl::FLOAT,
            },
            ImageDesc::image_2d(8, 8),
        )
        .unwrap();
        let sampler = Sampler::new(&context, &SamplerProperties::default()).unwrap();
        let buffer = Buffer::new(&context, cl::MEM_READ_ONLY, 16).unwrap();
        let error = kernel.set_arg(1, &buffer).unwrap_err();
        assert_eq!(error.native_code(), Some(cl::INVALID_ARG_VALUE));
        let error = kernel.set_arg(0, 1f32).unwrap_err();
        assert_eq!(error.native_code(), Some(cl::INVALID_ARG_VALUE));
        kernel
            .set_args(&args![
                KernelArg::local::<f32>(64),
                &image,
                &sampler,
                KernelArg::int3([1, 2, 3]),
            ])
            .unwrap();
        kernel
            .enqueue_ndrange(&queue, 2, Some(&[0, 0]), &[8, 8], None, None)
            .unwrap()
            .wait()
            .unwrap();
    }

    #[test]
    fn scalar_args() {
        assert_eq!(KernelArg::from(1u16), KernelArg::Scalar(vec![1, 0]));
        assert_eq!(KernelArg::float2([0.0, 0.0]), KernelArg::Scalar(vec![0; 8]));
        assert_eq!(KernelArg::uchar3([1, 2, 3]), KernelArg::Scalar(vec![1, 2, 3, 0]));
        assert_eq!(KernelArg::local::<u64>(4), KernelArg::Local(32));
        assert!(KernelArg::null().is_mem());
        let args = args![1i32, 2f64];
        assert!(args.iter().all(KernelArg::is_scalar));
    }

    #[test]
    fn suggest() {
        let _guard = crate::test_lock();
        let context = Context::new_gpu().unwrap();
        let device = context.device(0).unwrap();
        let kernel = program(&context).kernel("axpy").unwrap();
        let (global, local) = kernel.suggest_worksizes(&device, &[1000]).unwrap();
        assert_eq!(local, [32]);
        assert_eq!(global, [1024]);
        let (global, local) = kernel.suggest_worksizes(&device, &[5, 100]).unwrap();
        assert_eq!(local, [4, 32]);
        assert_eq!(global, [8, 128]);
        let (global, local) =
            suggest_worksizes(None, &device, &[1000, 1000], Some(&[0, 8])).unwrap();
        assert_eq!(local, [128, 2]);
        assert_eq!(global, [1024, 1000]);
        let (_, local) = suggest_worksizes(None, &device, &[300, 300, 300], None).unwrap();
        assert!(local.iter().product::<usize>() <= 256);
        let local = suggest_local_divisor(Some(&kernel), &device, &[1000], None).unwrap();
        assert_eq!(1000 % local[0], 0);
        assert!(local[0] <= 256);
        assert!(suggest_worksizes(None, &device, &[], None)
            .unwrap_err()
            .kind()
            .is_invalid_argument());
        assert!(suggest_worksizes(None, &device, &[1, 1, 1, 1], None)
            .unwrap_err()
            .kind()
            .is_unsupported());
    }
}
