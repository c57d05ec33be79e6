/*!
Command queues.

A [`Queue`] keeps every event it produced until the events are released with [`Queue::gc`],
[`Queue::finish`] or a completed [`Queue::barrier`], or until the queue is dropped. Events
returned to the caller stay valid independently of the queue.

```
# use clkit::{context::Context, queue::Queue};
# fn main() -> clkit::result::Result<()> {
# clkit::runtime::install_host().ok();
let context = Context::new_any()?;
let queue = Queue::builder(&context).profiling(true).build()?;
let marker = queue.marker(None)?;
assert_eq!(queue.events().len(), 1);
queue.finish()?;
assert!(queue.events().is_empty());
assert_eq!(marker.final_name()?, "MARKER");
# Ok(())
# }
```
*/

use crate::{
    cl,
    context::{Context, ContextKind},
    dev_container::DevContainer,
    device::{Device, DeviceKind},
    error::NativeResultExt,
    event::{with_wait_list, Event, WaitList},
    result::Result,
    runtime::{backend, Handle},
    wrapper::{impl_kind, impl_wrapper, info_getters, Wrapper},
};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashSet;

/// Builders.
pub mod builder {
    use super::*;

    /// Builder for creating a [`Queue`].
    pub struct QueueBuilder<'a> {
        pub(super) context: &'a Context,
        pub(super) device: Option<Device>,
        pub(super) properties: u64,
    }

    impl QueueBuilder<'_> {
        /// The device of the queue, defaults to the first device of the context.
        pub fn device(self, device: &Device) -> Self {
            Self {
                device: Some(device.clone()),
                ..self
            }
        }
        /// Bitfield of `cl::QUEUE_*` properties, defaults to 0.
        pub fn properties(self, properties: u64) -> Self {
            Self { properties, ..self }
        }
        /// Enables profiling.
        pub fn profiling(self, profiling: bool) -> Self {
            self.flag(cl::QUEUE_PROFILING_ENABLE, profiling)
        }
        /// Enables out of order execution.
        pub fn out_of_order(self, out_of_order: bool) -> Self {
            self.flag(cl::QUEUE_OUT_OF_ORDER_EXEC_MODE_ENABLE, out_of_order)
        }
        fn flag(self, flag: u64, enable: bool) -> Self {
            let properties = if enable {
                self.properties | flag
            } else {
                self.properties & !flag
            };
            Self { properties, ..self }
        }
        /// Creates the queue.
        ///
        /// **errors**
        /// - [`OutOfRange`](crate::error::ErrorKind::OutOfRange): The context has no devices.
        /// - [`Native`](crate::error::ErrorKind::Native): The device is not in the context or the
        /// properties are not supported.
        pub fn build(self) -> Result<Queue> {
            let device = match self.device {
                Some(device) => device,
                None => self.context.device(0)?,
            };
            let handle = backend()
                .create_queue(self.context.handle(), device.handle(), self.properties)
                .or_native(format!("create queue on {device:?}"))?;
            let queue = Queue::wrap(handle)?;
            let fields = queue.fields();
            let _ = fields.context.set(self.context.clone());
            let _ = fields.device.set(device);
            Ok(queue)
        }
    }
}
use builder::QueueBuilder;

#[doc(hidden)]
#[derive(Default)]
pub struct QueueFields {
    // released before the context and device
    events: Mutex<ProducedEvents>,
    context: OnceCell<Context>,
    device: OnceCell<Device>,
}

/// Events in production order, each held once.
#[derive(Default)]
struct ProducedEvents {
    order: Vec<Event>,
    handles: HashSet<Handle>,
}

impl ProducedEvents {
    fn insert(&mut self, event: &Event) -> bool {
        let inserted = self.handles.insert(event.handle());
        if inserted {
            self.order.push(event.clone());
        }
        inserted
    }
    fn take(&mut self) -> Vec<Event> {
        self.handles.clear();
        std::mem::take(&mut self.order)
    }
}

impl_kind!(QueueKind, Queue, Queue, QueueFields);

/// A command queue.
#[derive(Clone, derive_more::Deref)]
pub struct Queue {
    #[deref]
    wrapper: Wrapper<QueueKind>,
}

impl_wrapper!(Queue, QueueKind);

impl Queue {
    /// A builder for a queue in `context`.
    pub fn builder(context: &Context) -> QueueBuilder {
        QueueBuilder {
            context,
            device: None,
            properties: 0,
        }
    }
    info_getters! {
        /// Bitfield of `cl::QUEUE_*` properties.
        pub fn properties() -> u64 = info_scalar(cl::QUEUE_PROPERTIES);
    }
    pub fn profiling_enabled(&self) -> Result<bool> {
        Ok(self.properties()? & cl::QUEUE_PROFILING_ENABLE != 0)
    }
    /// The context of the queue.
    pub fn context(&self) -> Result<Context> {
        self.fields()
            .context
            .get_or_try_init(|| {
                self.info_wrapper::<ContextKind>(cl::QUEUE_CONTEXT)
                    .map(Context::from)
            })
            .cloned()
    }
    /// The device of the queue.
    pub fn device(&self) -> Result<Device> {
        self.fields()
            .device
            .get_or_try_init(|| {
                self.info_wrapper::<DeviceKind>(cl::QUEUE_DEVICE)
                    .map(Device::from)
            })
            .cloned()
    }
    /// Registers `event` as produced by the queue.
    ///
    /// The queue holds one reference until the next [`gc`](Self::gc). Returns false if the event
    /// is already registered.
    pub fn produce_event(&self, event: &Event) -> bool {
        self.fields().events.lock().insert(event)
    }
    /// Wraps and registers the event returned by a native enqueue.
    pub(crate) fn register(&self, handle: Handle) -> Result<Event> {
        let event = Event::wrap(handle)?;
        self.produce_event(&event);
        Ok(event)
    }
    /// The registered events, in production order.
    pub fn events(&self) -> Vec<Event> {
        self.fields().events.lock().order.clone()
    }
    /// Releases the registered events.
    pub fn gc(&self) {
        let events = self.fields().events.lock().take();
        log::trace!("{self:?} released {} events", events.len());
    }
    /// Issues the enqueued commands to the device.
    pub fn flush(&self) -> Result<()> {
        backend()
            .flush(self.handle())
            .or_native(format!("flush {self:?}"))
    }
    /// Blocks until all enqueued commands are complete, then releases the registered events.
    pub fn finish(&self) -> Result<()> {
        backend()
            .finish(self.handle())
            .or_native(format!("finish {self:?}"))?;
        self.gc();
        Ok(())
    }
    /// Enqueues a marker, complete when the events of `wait_list` are complete, or when all
    /// previously enqueued commands are complete if it is empty.
    pub fn marker(&self, wait_list: Option<&mut WaitList>) -> Result<Event> {
        let handle = with_wait_list(wait_list, |wait| {
            backend()
                .enqueue_marker(self.handle(), wait)
                .or_native(format!("enqueue marker on {self:?}"))
        })?;
        self.register(handle)
    }
    /// Enqueues a barrier, later commands wait for it.
    ///
    /// If the barrier is already complete, the events registered before it are released.
    pub fn barrier(&self, wait_list: Option<&mut WaitList>) -> Result<Event> {
        let handle = with_wait_list(wait_list, |wait| {
            backend()
                .enqueue_barrier(self.handle(), wait)
                .or_native(format!("enqueue barrier on {self:?}"))
        })?;
        let barrier = Event::wrap(handle)?;
        if barrier.status()? == cl::COMPLETE {
            self.gc();
        }
        self.produce_event(&barrier);
        Ok(barrier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{buffer::Buffer, event::UserEvent, wait_list, wrapper::memcheck};

    #[test]
    fn queue_accounting() {
        let _guard = crate::test_lock();
        {
            let context = Context::new_gpu().unwrap();
            let queue = Queue::builder(&context).build().unwrap();
            assert_eq!(queue.context().unwrap(), context);
            assert_eq!(queue.device().unwrap(), context.device(0).unwrap());
            assert!(!queue.profiling_enabled().unwrap());
            let buffer = Buffer::new(&context, cl::MEM_READ_WRITE, 64).unwrap();
            let event = buffer.fill(&queue, &[1u32], 0, 64, None).unwrap();
            assert_eq!(event.ref_count(), 2);
            let events = queue.events();
            assert_eq!(events, [event.clone()]);
            drop(events);
            queue.finish().unwrap();
            assert!(queue.events().is_empty());
            assert_eq!(event.ref_count(), 1);
            queue.flush().unwrap();
        }
        assert!(memcheck());
    }

    #[test]
    fn events_registered_once() {
        let _guard = crate::test_lock();
        {
            let context = Context::new_gpu().unwrap();
            let queue = Queue::builder(&context).build().unwrap();
            let marker = queue.marker(None).unwrap();
            assert!(!queue.produce_event(&marker));
            assert_eq!(queue.events(), [marker.clone()]);
            assert_eq!(marker.ref_count(), 2);
            let user = UserEvent::new(&context).unwrap();
            assert!(queue.produce_event(&user));
            assert_eq!(queue.events().len(), 2);
            queue.gc();
            assert_eq!(marker.ref_count(), 1);
            assert!(queue.produce_event(&marker));
            assert_eq!(queue.events(), [marker.clone()]);
        }
        assert!(memcheck());
    }

    #[test]
    fn barrier_releases_completed() {
        let _guard = crate::test_lock();
        let context = Context::new_gpu().unwrap();
        let queue = Queue::builder(&context).build().unwrap();
        queue.marker(None).unwrap();
        queue.marker(None).unwrap();
        let barrier = queue.barrier(None).unwrap();
        assert_eq!(queue.events(), [barrier.clone()]);
        assert_eq!(barrier.final_name().unwrap(), "BARRIER");

        let gate = UserEvent::new(&context).unwrap();
        let marker = queue.marker(Some(&mut wait_list![&*gate])).unwrap();
        let pending = queue.barrier(None).unwrap();
        assert_eq!(queue.events().len(), 3);
        gate.complete().unwrap();
        pending.wait().unwrap();
        assert_eq!(marker.status().unwrap(), cl::COMPLETE);
        queue.gc();
        assert!(queue.events().is_empty());
    }

    #[test]
    fn queue_properties() {
        let _guard = crate::test_lock();
        let context = Context::new_cpu().unwrap();
        let device = context.device(1).unwrap();
        let queue = Queue::builder(&context)
            .device(&device)
            .profiling(true)
            .out_of_order(true)
            .build()
            .unwrap();
        assert_eq!(queue.device().unwrap(), device);
        assert_eq!(
            queue.properties().unwrap(),
            cl::QUEUE_PROFILING_ENABLE | cl::QUEUE_OUT_OF_ORDER_EXEC_MODE_ENABLE
        );
        let gpu = Context::new_gpu().unwrap();
        let error = Queue::builder(&context)
            .device(&gpu.device(0).unwrap())
            .build()
            .unwrap_err();
        assert_eq!(error.native_code(), Some(cl::INVALID_DEVICE));
        let error = Queue::builder(&context).properties(1 << 10).build().unwrap_err();
        assert_eq!(error.native_code(), Some(cl::INVALID_QUEUE_PROPERTIES));
    }

    #[test]
    fn wrapped_queue_queries_context() {
        let _guard = crate::test_lock();
        let context = Context::new_gpu().unwrap();
        let queue = Queue::builder(&context).build().unwrap();
        let marker = queue.marker(None).unwrap();
        let again = marker.queue().unwrap().unwrap();
        assert_eq!(again, queue);
        assert_eq!(again.context().unwrap(), context);
    }
}
