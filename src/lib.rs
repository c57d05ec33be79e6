/*!
An object oriented wrapper for OpenCL.

Native objects are wrapped in reference counted handles that cache their info queries, and the
wrapper for a native object is unique, so that wrapping the same handle twice yields the same
wrapper. Errors carry a domain, a code and a message.

The runtime backend is the system OpenCL library, loaded at runtime, or a host runtime that
emulates platforms and devices in process. See [`config`] and [`runtime`].

```
# use clkit::{buffer::Buffer, cl, context::Context, program::Program, queue::Queue};
# fn main() -> clkit::result::Result<()> {
# clkit::runtime::install_host().ok();
let context = Context::new_gpu()?;
let queue = Queue::builder(&context).build()?;
let program = Program::from_source(&context, "__kernel void twice(__global uint* x) {
    size_t i = get_global_id(0);
    x[i] = 2 * x[i];
}")?;
program.build("")?;
let buffer = Buffer::from_slice(&context, cl::MEM_READ_WRITE, &[1u32, 2, 3, 4])?;
let event = program.run(&queue, "twice", &[4], None, &clkit::args![&buffer])?;
event.wait()?;
assert_eq!(event.final_name()?, "NDRANGE_KERNEL");
let mut output = [0u32; 4];
buffer.read(&queue, 0, &mut output, None)?;
# Ok(())
# }
```
*/

#![forbid(unsafe_op_in_unsafe_fn)]

pub mod result {
    pub type Result<T, E = crate::error::Error> = std::result::Result<T, E>;
}

pub mod cl;
pub mod config;
pub mod error;
pub mod runtime;
pub mod version;
pub mod wrapper;

pub mod dev_container;
pub mod platform;
pub mod device;
pub mod devquery;
pub mod context;
pub mod queue;
pub mod event;
pub mod memobj;
pub mod buffer;
pub mod image;
pub mod sampler;
pub mod program;
pub mod kernel;
pub mod selector;
pub mod profiler;

pub use wrapper::{memcheck, teardown};

/// Serializes tests that share the process wide backend and wrapper index.
#[cfg(test)]
pub(crate) fn test_lock() -> parking_lot::MutexGuard<'static, ()> {
    static LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());
    let _ = runtime::install_host();
    LOCK.lock()
}
