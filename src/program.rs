/*!
Programs.

A [`Program`] is created from source, from device binaries or from the built-in kernels of its
devices. Building compiles it for some or all of its devices; a failed build returns an error
that carries the build log of every device that failed.

```
# use clkit::{context::Context, program::Program};
# fn main() -> clkit::result::Result<()> {
# clkit::runtime::install_host().ok();
let context = Context::new_gpu()?;
let program = Program::from_source(&context, "__kernel void k(__global int* x) {}")?;
program.build("")?;
assert_eq!(program.kernel_names()?, ["k"]);
let kernel = program.kernel("k")?;
assert_eq!(kernel.num_args()?, 1);
# Ok(())
# }
```

Kernels are cached by the program and released with it. A program can not be built again once
one of its kernels was created.
*/

use crate::{
    cl,
    context::{Context, ContextKind},
    dev_container::{DevContainer, DeviceList},
    device::Device,
    error::{Error, NativeResultExt},
    event::Event,
    kernel::{Kernel, KernelArg},
    queue::Queue,
    result::Result,
    runtime::{backend, InfoQuery},
    wrapper::{impl_kind, impl_wrapper, info_getters, Info, Wrapper},
};
use parking_lot::Mutex;
use std::{collections::HashMap, fmt::Write as _, fs, path::Path};

#[doc(hidden)]
#[derive(Default)]
pub struct ProgramFields {
    // released before the devices
    kernels: Mutex<HashMap<String, Kernel>>,
    devices: DeviceList,
}

impl_kind!(ProgramKind, Program, Program, ProgramFields);

/// A program.
#[derive(Clone, derive_more::Deref)]
pub struct Program {
    #[deref]
    wrapper: Wrapper<ProgramKind>,
}

impl_wrapper!(Program, ProgramKind);

impl Program {
    /// Creates a program for all devices of `context` from `source`.
    pub fn from_source(context: &Context, source: &str) -> Result<Self> {
        Self::from_sources(context, &[source])
    }
    /// Creates a program from the concatenation of `sources`.
    ///
    /// **errors**
    /// - [`Native`](crate::error::ErrorKind::Native): `sources` is empty (`cl::INVALID_VALUE`).
    pub fn from_sources(context: &Context, sources: &[&str]) -> Result<Self> {
        let handle = backend()
            .create_program_with_source(context.handle(), sources)
            .or_native(format!("create program from {} sources", sources.len()))?;
        Self::wrap(handle)
    }
    /// Creates a program from the contents of the files at `paths`.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): A file can not be read.
    #[track_caller]
    pub fn from_source_files<P: AsRef<Path>>(context: &Context, paths: &[P]) -> Result<Self> {
        let sources = paths
            .iter()
            .map(|path| read_file(path.as_ref(), |path| fs::read_to_string(path)))
            .collect::<Result<Vec<_>>>()?;
        let sources: Vec<&str> = sources.iter().map(String::as_str).collect();
        Self::from_sources(context, &sources)
    }
    /// Creates a program from one binary per device.
    ///
    /// The program is not built, [`build`](Self::build) must be called before creating kernels.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): The lengths of `devices`
    /// and `binaries` differ.
    /// - [`Native`](crate::error::ErrorKind::Native): A binary is not valid (`cl::INVALID_BINARY`).
    #[track_caller]
    pub fn from_binaries(context: &Context, devices: &[Device], binaries: &[&[u8]]) -> Result<Self> {
        if devices.len() != binaries.len() {
            return Err(Error::invalid_argument(format!(
                "{} binaries were provided for {} devices",
                binaries.len(),
                devices.len()
            )));
        }
        let handles: Vec<_> = devices.iter().map(|device| device.handle()).collect();
        let handle = backend()
            .create_program_with_binary(context.handle(), &handles, binaries)
            .or_native(format!("create program from {} binaries", binaries.len()))?;
        Self::wrap(handle)
    }
    /// Creates a program for `device` from the binary saved at `path`.
    ///
    /// See [`save_binary`](Self::save_binary).
    #[track_caller]
    pub fn from_binary_file(context: &Context, device: &Device, path: impl AsRef<Path>) -> Result<Self> {
        let binary = read_file(path.as_ref(), |path| fs::read(path))?;
        Self::from_binaries(context, &[device.clone()], &[binary.as_slice()])
    }
    /// Creates a program of the built-in kernels `names` of `devices`.
    ///
    /// The program is ready to use without a build.
    pub fn from_built_in_kernels(context: &Context, devices: &[Device], names: &[&str]) -> Result<Self> {
        let handles: Vec<_> = devices.iter().map(|device| device.handle()).collect();
        let names = names.join(";");
        let handle = backend()
            .create_program_with_built_in_kernels(context.handle(), &handles, &names)
            .or_native(format!("create program of built-in kernels \"{names}\""))?;
        Self::wrap(handle)
    }
    /// Builds the program for all of its devices.
    pub fn build(&self, options: &str) -> Result<()> {
        self.build_for(&[], options)
    }
    /// Builds the program for `devices`, or all of its devices if empty.
    ///
    /// **errors**
    /// - [`Native`](crate::error::ErrorKind::Native):
    ///     - `cl::BUILD_PROGRAM_FAILURE`: Compilation failed, the message contains the build log of
    ///     each device that failed.
    ///     - `cl::INVALID_BUILD_OPTIONS`: The options are not valid.
    ///     - `cl::INVALID_OPERATION`: A kernel of the program was created.
    #[track_caller]
    pub fn build_for(&self, devices: &[Device], options: &str) -> Result<()> {
        let handles: Vec<_> = devices.iter().map(|device| device.handle()).collect();
        match backend().build_program(self.handle(), &handles, options) {
            Ok(()) => {
                log::debug!("built {self:?} with options \"{options}\"");
                Ok(())
            }
            Err(cl::BUILD_PROGRAM_FAILURE) => Err(self.failure(cl::BUILD_PROGRAM_FAILURE, "build", devices)?),
            Err(code) => Err(code).or_native(format!("build {self:?} with options \"{options}\"")),
        }
    }
    /// Compiles the program for all of its devices, see [`compile_for`](Self::compile_for).
    pub fn compile(&self, options: &str, headers: &[(&Program, &str)]) -> Result<()> {
        self.compile_for(&[], options, headers)
    }
    /// Compiles the program for `devices`, or all of its devices if empty, into an object that
    /// can be [linked](Self::link).
    ///
    /// `headers` are source programs paired with the name they are included as.
    ///
    /// **errors**
    /// - [`Native`](crate::error::ErrorKind::Native):
    ///     - `cl::COMPILE_PROGRAM_FAILURE`: Compilation failed, the message contains the log of
    ///     each device that failed.
    ///     - `cl::INVALID_COMPILER_OPTIONS`: The options are not valid.
    ///     - `cl::INVALID_OPERATION`: The program has no source, or a kernel of it was created.
    #[track_caller]
    pub fn compile_for(&self, devices: &[Device], options: &str, headers: &[(&Program, &str)]) -> Result<()> {
        let handles: Vec<_> = devices.iter().map(|device| device.handle()).collect();
        let headers: Vec<_> = headers.iter().map(|(program, name)| (program.handle(), *name)).collect();
        match backend().compile_program(self.handle(), &handles, options, &headers) {
            Ok(()) => {
                log::debug!("compiled {self:?} with options \"{options}\"");
                Ok(())
            }
            Err(cl::COMPILE_PROGRAM_FAILURE) => Err(self.failure(cl::COMPILE_PROGRAM_FAILURE, "compile", devices)?),
            Err(code) => Err(code).or_native(format!("compile {self:?} with options \"{options}\"")),
        }
    }
    /// Links compiled `programs` into a new program for all devices of `context`.
    ///
    /// With the option "-create-library" the result is a library that can be linked again,
    /// otherwise it is an executable.
    ///
    /// **errors**
    /// - [`Native`](crate::error::ErrorKind::Native):
    ///     - `cl::LINK_PROGRAM_FAILURE`: A kernel is defined by more than one program.
    ///     - `cl::INVALID_LINKER_OPTIONS`: The options are not valid.
    ///     - `cl::INVALID_OPERATION`: A program is not compiled for every device.
    pub fn link(context: &Context, programs: &[&Program], options: &str) -> Result<Self> {
        let handles: Vec<_> = programs.iter().map(|program| program.handle()).collect();
        let handle = backend()
            .link_program(context.handle(), &[], options, &handles)
            .or_native(format!("link {programs:?} with options \"{options}\""))?;
        let program = Self::wrap(handle)?;
        log::debug!("linked {programs:?} into {program:?}");
        Ok(program)
    }
    /// An error carrying the logs of the devices whose last build failed.
    fn failure(&self, code: i32, action: &str, devices: &[Device]) -> Result<Error> {
        let targets = if devices.is_empty() {
            self.all_devices()?
        } else {
            devices
        };
        let mut message = format!("unable to {action} {self:?}");
        for device in targets {
            if self.build_status(device)? == cl::BUILD_ERROR {
                let _ = write!(
                    message,
                    "\n{}:\n{}",
                    device.name()?,
                    self.build_log(device)?.trim_end()
                );
            }
        }
        Ok(Error::native(code, message))
    }
    fn build_info(&self, device: &Device, param: u32) -> Result<Info> {
        self.query_info(InfoQuery::ProgramBuild(self.handle(), device.handle()), param)
    }
    /// The build status on `device`, one of `cl::BUILD_*`.
    pub fn build_status(&self, device: &Device) -> Result<i32> {
        self.build_info(device, cl::PROGRAM_BUILD_STATUS)?.scalar()
    }
    /// The options of the last build on `device`.
    pub fn build_options(&self, device: &Device) -> Result<String> {
        Ok(self.build_info(device, cl::PROGRAM_BUILD_OPTIONS)?.string())
    }
    /// The log of the last build on `device`.
    pub fn build_log(&self, device: &Device) -> Result<String> {
        Ok(self.build_info(device, cl::PROGRAM_BUILD_LOG)?.string())
    }
    /// One of `cl::PROGRAM_BINARY_TYPE_*`.
    pub fn binary_type(&self, device: &Device) -> Result<u32> {
        self.build_info(device, cl::PROGRAM_BINARY_TYPE)?.scalar()
    }
    info_getters! {
        pub fn num_devices_info() -> u32 = info_scalar(cl::PROGRAM_NUM_DEVICES);
    }
    /// The source, empty for programs created from binaries.
    pub fn source(&self) -> Result<String> {
        Ok(self
            .query_info(InfoQuery::Program(self.handle()), cl::PROGRAM_SOURCE)?
            .string())
    }
    /// The number of kernels in the built program.
    ///
    /// **errors**
    /// - [`Native`](crate::error::ErrorKind::Native): The program is not built
    /// (`cl::INVALID_PROGRAM_EXECUTABLE`).
    pub fn num_kernels(&self) -> Result<usize> {
        self.query_info(InfoQuery::Program(self.handle()), cl::PROGRAM_NUM_KERNELS)?
            .scalar()
    }
    /// The names of the kernels in the built program.
    pub fn kernel_names(&self) -> Result<Vec<String>> {
        let names = self
            .query_info(InfoQuery::Program(self.handle()), cl::PROGRAM_KERNEL_NAMES)?
            .string();
        Ok(names
            .split(';')
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect())
    }
    pub fn context(&self) -> Result<Context> {
        self.info_wrapper::<ContextKind>(cl::PROGRAM_CONTEXT)
            .map(Context::from)
    }
    /// The kernel `name`.
    ///
    /// The kernel is created on first use and cached, later calls return the same kernel.
    ///
    /// **errors**
    /// - [`Native`](crate::error::ErrorKind::Native):
    ///     - `cl::INVALID_PROGRAM_EXECUTABLE`: The program is not built.
    ///     - `cl::INVALID_KERNEL_NAME`: There is no kernel `name`.
    pub fn kernel(&self, name: &str) -> Result<Kernel> {
        let mut kernels = self.fields().kernels.lock();
        if let Some(kernel) = kernels.get(name) {
            return Ok(kernel.clone());
        }
        let handle = backend()
            .create_kernel(self.handle(), name)
            .or_native(format!("create kernel \"{name}\" of {self:?}"))?;
        let kernel = Kernel::wrap(handle)?;
        kernels.insert(name.to_string(), kernel.clone());
        Ok(kernel)
    }
    /// The binaries of the program, one per device in device order.
    ///
    /// Binaries of devices the program was not built for are empty.
    pub fn all_binaries(&self) -> Result<Vec<Vec<u8>>> {
        backend()
            .program_binaries(self.handle())
            .or_native(format!("get binaries of {self:?}"))
    }
    /// The binary for `device`.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): `device` is not a device
    /// of the program.
    #[track_caller]
    pub fn binary(&self, device: &Device) -> Result<Vec<u8>> {
        let index = self.device_index(device)?;
        let mut binaries = self.all_binaries()?;
        if index >= binaries.len() {
            return Err(Error::internal(format!(
                "{self:?} returned {} binaries for {} devices",
                binaries.len(),
                self.num_devices()?
            )));
        }
        Ok(binaries.swap_remove(index))
    }
    /// Writes the binary for `device` to `path`.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): The file can not be
    /// written.
    #[track_caller]
    pub fn save_binary(&self, device: &Device, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let binary = self.binary(device)?;
        fs::write(path, binary).map_err(|e| {
            Error::invalid_argument(format!("unable to write binary to {}: {e}", path.display()))
        })
    }
    #[track_caller]
    fn device_index(&self, device: &Device) -> Result<usize> {
        self.all_devices()?
            .iter()
            .position(|x| x == device)
            .ok_or_else(|| Error::invalid_argument(format!("{device:?} is not a device of {self:?}")))
    }
    /// Sets `args` on the kernel `name` and enqueues it on `queue` over `global_work_size`.
    ///
    /// The work dimension is the length of `global_work_size`.
    pub fn run(
        &self,
        queue: &Queue,
        name: &str,
        global_work_size: &[usize],
        local_work_size: Option<&[usize]>,
        args: &[KernelArg],
    ) -> Result<Event> {
        self.kernel(name)?.set_args_and_enqueue_ndrange(
            queue,
            global_work_size.len() as u32,
            None,
            global_work_size,
            local_work_size,
            None,
            args,
        )
    }
}

impl DevContainer for Program {
    fn device_list(&self) -> Result<&[Device]> {
        self.fields().devices.get_or_init(
            &self.wrapper,
            (InfoQuery::Program(self.handle()), cl::PROGRAM_DEVICES),
            || {
                self.query_info(InfoQuery::Program(self.handle()), cl::PROGRAM_DEVICES)?
                    .handles()
            },
        )
    }
}

#[track_caller]
fn read_file<T>(path: &Path, read: impl FnOnce(&Path) -> std::io::Result<T>) -> Result<T> {
    read(path).map_err(|e| Error::invalid_argument(format!("unable to read {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{args, buffer::Buffer, wrapper::memcheck};

    const SOURCE: &str = r#"
        __kernel void scale(__global float* x, float alpha, uint n) {
            size_t i = get_global_id(0);
            if (i < n) { x[i] *= alpha; }
        }
        __kernel void zero(__global float* x) {}
    "#;

    #[test]
    fn build_source() {
        let _guard = crate::test_lock();
        {
            let context = Context::new_cpu().unwrap();
            let program = Program::from_source(&context, SOURCE).unwrap();
            assert_eq!(program.num_devices().unwrap(), context.num_devices().unwrap());
            assert_eq!(program.all_devices().unwrap(), context.all_devices().unwrap());
            assert_eq!(program.context().unwrap(), context);
            assert!(program.source().unwrap().contains("scale"));
            let device = program.device(0).unwrap();
            assert_eq!(program.build_status(&device).unwrap(), cl::BUILD_NONE);
            let error = program.kernel("scale").unwrap_err();
            assert_eq!(error.native_code(), Some(cl::INVALID_PROGRAM_EXECUTABLE));
            program.build("-D N=4").unwrap();
            assert_eq!(program.build_status(&device).unwrap(), cl::BUILD_SUCCESS);
            assert_eq!(program.build_options(&device).unwrap(), "-D N=4");
            assert_eq!(
                program.binary_type(&device).unwrap(),
                cl::PROGRAM_BINARY_TYPE_EXECUTABLE
            );
            assert_eq!(program.num_kernels().unwrap(), 2);
            assert_eq!(program.kernel_names().unwrap(), ["scale", "zero"]);
            let kernel = program.kernel("scale").unwrap();
            assert_eq!(program.kernel("scale").unwrap(), kernel);
            assert_eq!(kernel.program().unwrap(), program);
            let error = program.kernel("missing").unwrap_err();
            assert_eq!(error.native_code(), Some(cl::INVALID_KERNEL_NAME));
        }
        assert!(memcheck());
    }

    #[test]
    fn build_failure_log() {
        let _guard = crate::test_lock();
        let context = Context::new_gpu().unwrap();
        let program = Program::from_source(
            &context,
            "__kernel void k() {}\n#error needs double precision\n",
        )
        .unwrap();
        let error = program.build("").unwrap_err();
        assert_eq!(error.native_code(), Some(cl::BUILD_PROGRAM_FAILURE));
        assert!(error.message().contains("clkit host GPU"));
        assert!(error.message().contains("needs double precision"));
        let device = context.device(0).unwrap();
        assert_eq!(program.build_status(&device).unwrap(), cl::BUILD_ERROR);
        assert!(program.build_log(&device).unwrap().contains("<source>:2"));
        let error = program.num_kernels().unwrap_err();
        assert_eq!(error.native_code(), Some(cl::INVALID_PROGRAM_EXECUTABLE));
        let error = program.build("fast").unwrap_err();
        assert_eq!(error.native_code(), Some(cl::INVALID_BUILD_OPTIONS));
    }

    #[test]
    fn no_rebuild_with_kernels() {
        let _guard = crate::test_lock();
        let context = Context::new_gpu().unwrap();
        let program = Program::from_source(&context, SOURCE).unwrap();
        program.build("").unwrap();
        program.build("-cl-fast-relaxed-math").unwrap();
        program.kernel("zero").unwrap();
        let error = program.build("").unwrap_err();
        assert_eq!(error.native_code(), Some(cl::INVALID_OPERATION));
    }

    #[test]
    fn binaries() {
        let _guard = crate::test_lock();
        {
            let context = Context::new_cpu().unwrap();
            let first = context.device(0).unwrap();
            let second = context.device(1).unwrap();
            let program = Program::from_source(&context, SOURCE).unwrap();
            program.build_for(&[second.clone()], "").unwrap();
            assert_eq!(program.build_status(&first).unwrap(), cl::BUILD_NONE);
            let binaries = program.all_binaries().unwrap();
            assert_eq!(binaries.len(), 2);
            assert!(binaries[0].is_empty());
            assert_eq!(program.binary(&second).unwrap(), binaries[1]);

            let path = std::env::temp_dir().join(format!("clkit-binary-{}.bin", std::process::id()));
            program.save_binary(&second, &path).unwrap();
            let loaded = Program::from_binary_file(&context, &second, &path).unwrap();
            std::fs::remove_file(&path).unwrap();
            assert_eq!(loaded.all_devices().unwrap(), [second.clone()]);
            assert_eq!(loaded.build_status(&second).unwrap(), cl::BUILD_NONE);
            loaded.build("").unwrap();
            assert_eq!(loaded.kernel_names().unwrap(), ["scale", "zero"]);
            assert!(loaded.source().unwrap().is_empty());

            let error = Program::from_binaries(&context, &[first.clone()], &[&b"junk"[..]]).unwrap_err();
            assert_eq!(error.native_code(), Some(cl::INVALID_BINARY));
            let error = Program::from_binaries(&context, &[first, second], &[]).unwrap_err();
            assert!(error.kind().is_invalid_argument());
            let error = Program::from_binary_file(&context, &context.device(0).unwrap(), &path)
                .unwrap_err();
            assert!(error.kind().is_invalid_argument());
        }
        assert!(memcheck());
    }

    #[test]
    fn built_in_kernels() {
        let _guard = crate::test_lock();
        {
            let context = Context::new_gpu().unwrap();
            let device = context.device(0).unwrap();
            let program =
                Program::from_built_in_kernels(&context, &[device.clone()], &["fill_bytes"]).unwrap();
            assert_eq!(program.build_status(&device).unwrap(), cl::BUILD_SUCCESS);
            assert_eq!(program.kernel_names().unwrap(), ["fill_bytes"]);
            let queue = Queue::builder(&context).build().unwrap();
            let buffer = Buffer::new(&context, cl::MEM_READ_WRITE, 16).unwrap();
            let event = program
                .run(&queue, "fill_bytes", &[16], None, &args![&buffer, 7u8])
                .unwrap();
            event.wait().unwrap();
            assert_eq!(event.final_name().unwrap(), "NDRANGE_KERNEL");
            let error = Program::from_built_in_kernels(&context, &[device], &["sort"]).unwrap_err();
            assert_eq!(error.native_code(), Some(cl::INVALID_VALUE));
        }
        assert!(memcheck());
    }

    #[test]
    fn source_files() {
        let _guard = crate::test_lock();
        let context = Context::new_gpu().unwrap();
        let path = std::env::temp_dir().join(format!("clkit-source-{}.cl", std::process::id()));
        std::fs::write(&path, SOURCE).unwrap();
        let program = Program::from_source_files(&context, &[&path]).unwrap();
        std::fs::remove_file(&path).unwrap();
        program.build("").unwrap();
        assert_eq!(program.num_kernels().unwrap(), 2);
        let error = Program::from_source_files(&context, &[&path]).unwrap_err();
        assert!(error.kind().is_invalid_argument());
    }

    #[test]
    fn compile_link() {
        let _guard = crate::test_lock();
        {
            let context = Context::new_gpu().unwrap();
            let device = context.device(0).unwrap();
            let header = Program::from_source(&context, "float twice(float x) { return 2 * x; }").unwrap();
            let scale = Program::from_source(
                &context,
                "#include \"twice.h\"\n__kernel void scale(__global float* x) {}",
            )
            .unwrap();
            let error = scale.compile("", &[]).unwrap_err();
            assert_eq!(error.native_code(), Some(cl::COMPILE_PROGRAM_FAILURE));
            assert!(error.message().contains("'twice.h' file not found"));
            scale.compile("-D N=4", &[(&header, "twice.h")]).unwrap();
            assert_eq!(
                scale.binary_type(&device).unwrap(),
                cl::PROGRAM_BINARY_TYPE_COMPILED_OBJECT
            );
            let zero = Program::from_source(&context, "__kernel void zero(__global float* x) {}").unwrap();
            zero.compile("", &[]).unwrap();
            let library = Program::link(&context, &[&zero], "-create-library").unwrap();
            assert_eq!(library.binary_type(&device).unwrap(), cl::PROGRAM_BINARY_TYPE_LIBRARY);
            let program = Program::link(&context, &[&scale, &library], "").unwrap();
            assert_eq!(program.binary_type(&device).unwrap(), cl::PROGRAM_BINARY_TYPE_EXECUTABLE);
            assert_eq!(program.kernel_names().unwrap(), ["scale", "zero"]);
            program.kernel("zero").unwrap();
            let error = Program::link(&context, &[&scale, &scale], "").unwrap_err();
            assert_eq!(error.native_code(), Some(cl::LINK_PROGRAM_FAILURE));
            let error = Program::link(&context, &[&header], "").unwrap_err();
            assert_eq!(error.native_code(), Some(cl::INVALID_OPERATION));
            let error = zero.compile("zero", &[]).unwrap_err();
            assert_eq!(error.native_code(), Some(cl::INVALID_COMPILER_OPTIONS));
        }
        assert!(memcheck());
    }
}
