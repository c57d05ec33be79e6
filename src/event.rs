/*!
Events and wait lists.

Every enqueue returns an [`Event`] that is also registered with the queue that produced it, see
[`Queue::gc`](crate::queue::Queue::gc). Events can be labeled for profiling:
```
# use clkit::{buffer::Buffer, cl, context::Context, queue::Queue};
# fn main() -> clkit::result::Result<()> {
# clkit::runtime::install_host().ok();
let context = Context::new_any()?;
let queue = Queue::builder(&context).build()?;
let buffer = Buffer::new(&context, cl::MEM_READ_WRITE, 16)?;
let event = buffer.write(&queue, 0, &[1u32; 4], None)?;
assert_eq!(event.final_name()?, "WRITE_BUFFER");
event.set_name("upload");
assert_eq!(event.final_name()?, "upload");
# Ok(())
# }
```

A [`WaitList`] borrows events, so building one never changes reference counts. Operations that
consume a wait list empty it on success:
```
# use clkit::{buffer::Buffer, cl, context::Context, queue::Queue, wait_list};
# fn main() -> clkit::result::Result<()> {
# clkit::runtime::install_host().ok();
# let context = Context::new_any()?;
# let queue = Queue::builder(&context).build()?;
# let buffer = Buffer::new(&context, cl::MEM_READ_WRITE, 16)?;
let input = [1u32; 4];
// Safety: input outlives the wait below.
let write = unsafe { buffer.write_async(&queue, 0, &input, None)? };
let mut wait = wait_list![&write];
let mut output = [0u32; 4];
buffer.read(&queue, 0, &mut output, Some(&mut wait))?;
assert!(wait.is_empty());
assert_eq!(output, input);
# Ok(())
# }
```
*/

use crate::{
    cl,
    context::{Context, ContextKind},
    error::NativeResultExt,
    queue::Queue,
    result::Result,
    runtime::{backend, EventCallback, Handle, InfoQuery},
    wrapper::{impl_kind, impl_wrapper, info_getters, Wrapper},
};
use parking_lot::Mutex;

#[doc(hidden)]
#[derive(Default)]
pub struct EventFields {
    name: Mutex<Option<String>>,
}

impl_kind!(EventKind, Event, Event, EventFields);

/// An event.
#[derive(Clone, derive_more::Deref)]
pub struct Event {
    #[deref]
    wrapper: Wrapper<EventKind>,
}

impl_wrapper!(Event, EventKind);

impl Event {
    info_getters! {
        /// One of `cl::COMMAND_*`.
        pub fn command_type() -> u32 = info_scalar(cl::EVENT_COMMAND_TYPE);
    }
    /// Labels the event.
    pub fn set_name(&self, name: impl Into<String>) {
        *self.fields().name.lock() = Some(name.into());
    }
    /// The label, if set.
    pub fn name(&self) -> Option<String> {
        self.fields().name.lock().clone()
    }
    /// The label if set, otherwise the name of the [command type](Self::command_type).
    ///
    /// Unknown command types are named "UNKNOWN".
    pub fn final_name(&self) -> Result<String> {
        if let Some(name) = self.name() {
            return Ok(name);
        }
        let command_type = self.command_type()?;
        match command_type_name(command_type) {
            Some(name) => Ok(name.to_string()),
            None => {
                log::warn!("unknown command type {command_type:#x} of {self:?}");
                Ok("UNKNOWN".to_string())
            }
        }
    }
    /// The execution status, `cl::COMPLETE`, `cl::RUNNING`, `cl::SUBMITTED`, `cl::QUEUED` or a
    /// negative error code.
    ///
    /// Not cached.
    pub fn status(&self) -> Result<i32> {
        self.query_info(InfoQuery::Event(self.handle()), cl::EVENT_COMMAND_EXECUTION_STATUS)?
            .scalar()
    }
    /// The queue that produced the event, `None` for user events.
    pub fn queue(&self) -> Result<Option<Queue>> {
        self.info(cl::EVENT_COMMAND_QUEUE)?
            .handle()?
            .map(Queue::wrap_retained)
            .transpose()
    }
    pub fn context(&self) -> Result<Context> {
        self.info_wrapper::<ContextKind>(cl::EVENT_CONTEXT)
            .map(Context::from)
    }
    /// A profiling timestamp in nanoseconds, `param` is one of `cl::PROFILING_COMMAND_*`.
    ///
    /// **errors**
    /// - [`Native`](crate::error::ErrorKind::Native): The queue does not have profiling enabled or
    /// the command is not complete (`cl::PROFILING_INFO_NOT_AVAILABLE`).
    pub fn profiling_info(&self, param: u32) -> Result<u64> {
        self.info_of(InfoQuery::EventProfiling(self.handle()), param)?
            .scalar()
    }
    /// The start and end timestamps in nanoseconds.
    pub fn start_end(&self) -> Result<(u64, u64)> {
        Ok((
            self.profiling_info(cl::PROFILING_COMMAND_START)?,
            self.profiling_info(cl::PROFILING_COMMAND_END)?,
        ))
    }
    /// Registers `callback` to run once the event reaches `status`, one of `cl::SUBMITTED`,
    /// `cl::RUNNING` or `cl::COMPLETE`.
    ///
    /// The callback receives the event and the status reached, or a negative error code if the
    /// command failed. It may run on another thread, and runs immediately if the status was already
    /// reached.
    pub fn set_callback(
        &self,
        status: i32,
        callback: impl FnOnce(&Event, i32) + Send + 'static,
    ) -> Result<()> {
        let callback: EventCallback = Box::new(move |handle, status| match Event::wrap_retained(handle) {
            Ok(event) => callback(&event, status),
            Err(error) => log::warn!("dropped callback of event {handle:?}: {error}"),
        });
        backend()
            .set_event_callback(self.handle(), status, callback)
            .or_native(format!("set callback of {self:?} for status {status}"))
    }
    /// Blocks until the event is complete.
    pub fn wait(&self) -> Result<()> {
        backend()
            .wait_for_events(&[self.handle()])
            .or_native(format!("wait for {self:?}"))
    }
}

/// An event whose status is set by the host.
#[derive(Clone, Debug, PartialEq, Eq, Hash, derive_more::Deref)]
pub struct UserEvent {
    #[deref]
    event: Event,
}

impl UserEvent {
    /// Creates a user event in `context`, initially `cl::SUBMITTED`.
    pub fn new(context: &Context) -> Result<Self> {
        let handle = backend()
            .create_user_event(context.handle())
            .or_native("create user event")?;
        Ok(Self {
            event: Event::wrap(handle)?,
        })
    }
    /// Sets the execution status, `cl::COMPLETE` or a negative error code.
    ///
    /// Commands waiting on the event are released.
    pub fn set_status(&self, status: i32) -> Result<()> {
        backend()
            .set_user_event_status(self.handle(), status)
            .or_native(format!("set status of {:?} to {status}", self.event))
    }
    /// Shorthand for `set_status(cl::COMPLETE)`.
    pub fn complete(&self) -> Result<()> {
        self.set_status(cl::COMPLETE)
    }
    pub fn into_event(self) -> Event {
        self.event
    }
}

/// An ordered list of borrowed events.
#[derive(Clone, Default, Debug)]
pub struct WaitList<'a> {
    events: Vec<&'a Event>,
}

impl<'a> WaitList<'a> {
    pub fn new() -> Self {
        Self::default()
    }
    /// Appends `event`.
    pub fn add(&mut self, event: &'a Event) -> &mut Self {
        self.events.push(event);
        self
    }
    /// Appends all `events`.
    pub fn add_array(&mut self, events: impl IntoIterator<Item = &'a Event>) -> &mut Self {
        self.events.extend(events);
        self
    }
    /// Removes all events.
    ///
    /// The events are borrowed, so their reference counts are unchanged.
    pub fn clear(&mut self) {
        self.events.clear();
    }
    pub fn num_events(&self) -> usize {
        self.events.len()
    }
    pub fn len(&self) -> usize {
        self.events.len()
    }
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
    pub fn events(&self) -> &[&'a Event] {
        &self.events
    }
    /// The native handles of the events, in order.
    pub fn raw_handles(&self) -> Vec<Handle> {
        self.events.iter().map(|event| event.handle()).collect()
    }
    /// Blocks until all events are complete, then empties the list.
    ///
    /// Does nothing if the list is empty.
    ///
    /// **errors**
    /// - [`Native`](crate::error::ErrorKind::Native): An event failed
    /// (`cl::EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST`). The list is not emptied.
    pub fn wait(&mut self) -> Result<()> {
        if !self.is_empty() {
            backend()
                .wait_for_events(&self.raw_handles())
                .or_native(format!("wait for {} events", self.len()))?;
        }
        self.clear();
        Ok(())
    }
}

impl<'a> Extend<&'a Event> for WaitList<'a> {
    fn extend<I: IntoIterator<Item = &'a Event>>(&mut self, iter: I) {
        self.events.extend(iter);
    }
}

impl<'a> FromIterator<&'a Event> for WaitList<'a> {
    fn from_iter<I: IntoIterator<Item = &'a Event>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

/// Creates a [`WaitList`](crate::event::WaitList) from event references.
///
/// ```
/// # use clkit::{event::{Event, WaitList}, wait_list};
/// fn second<'a>(a: &'a Event, b: &'a Event) -> WaitList<'a> {
///     wait_list![a, b]
/// }
/// ```
#[macro_export]
macro_rules! wait_list {
    ($($event:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut list = $crate::event::WaitList::new();
        $(
            list.add($event);
        )*
        list
    }};
}

/// Blocks until all events of `list` are complete, then empties it.
///
/// See [`WaitList::wait`].
pub fn wait(list: &mut WaitList) -> Result<()> {
    list.wait()
}

/// Runs an enqueue with the handles of `wait_list`, emptying it on success.
pub(crate) fn with_wait_list<T>(
    wait_list: Option<&mut WaitList>,
    enqueue: impl FnOnce(&[Handle]) -> Result<T>,
) -> Result<T> {
    let handles = wait_list
        .as_ref()
        .map(|list| list.raw_handles())
        .unwrap_or_default();
    let output = enqueue(&handles)?;
    if let Some(list) = wait_list {
        list.clear();
    }
    Ok(output)
}

macro_rules! command_type_names {
    ($($name:ident),* $(,)?) => {
        /// The name of a `cl::COMMAND_*` command type, ie "WRITE_BUFFER".
        pub fn command_type_name(command_type: u32) -> Option<&'static str> {
            match command_type {
                $(cl::$name => Some(&stringify!($name)["COMMAND_".len()..]),)*
                _ => None,
            }
        }
    };
}

command_type_names! {
    COMMAND_NDRANGE_KERNEL,
    COMMAND_TASK,
    COMMAND_NATIVE_KERNEL,
    COMMAND_READ_BUFFER,
    COMMAND_WRITE_BUFFER,
    COMMAND_COPY_BUFFER,
    COMMAND_READ_IMAGE,
    COMMAND_WRITE_IMAGE,
    COMMAND_COPY_IMAGE,
    COMMAND_COPY_IMAGE_TO_BUFFER,
    COMMAND_COPY_BUFFER_TO_IMAGE,
    COMMAND_MAP_BUFFER,
    COMMAND_MAP_IMAGE,
    COMMAND_UNMAP_MEM_OBJECT,
    COMMAND_MARKER,
    COMMAND_ACQUIRE_GL_OBJECTS,
    COMMAND_RELEASE_GL_OBJECTS,
    COMMAND_READ_BUFFER_RECT,
    COMMAND_WRITE_BUFFER_RECT,
    COMMAND_COPY_BUFFER_RECT,
    COMMAND_USER,
    COMMAND_BARRIER,
    COMMAND_MIGRATE_MEM_OBJECTS,
    COMMAND_FILL_BUFFER,
    COMMAND_FILL_IMAGE,
    COMMAND_SVM_FREE,
    COMMAND_SVM_MEMCPY,
    COMMAND_SVM_MEMFILL,
    COMMAND_SVM_MAP,
    COMMAND_SVM_UNMAP,
    COMMAND_SVM_MIGRATE_MEM,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{buffer::Buffer, wrapper::memcheck};

    #[test]
    fn command_type_names() {
        assert_eq!(command_type_name(cl::COMMAND_MAP_BUFFER), Some("MAP_BUFFER"));
        assert_eq!(command_type_name(cl::COMMAND_USER), Some("USER"));
        assert_eq!(command_type_name(cl::COMMAND_SVM_MIGRATE_MEM), Some("SVM_MIGRATE_MEM"));
        assert_eq!(command_type_name(0x1), None);
    }

    #[test]
    fn user_event_gates_commands() {
        let _guard = crate::test_lock();
        {
            let context = Context::new_gpu().unwrap();
            let queue = Queue::builder(&context).build().unwrap();
            let buffer = Buffer::new(&context, cl::MEM_READ_WRITE, 16).unwrap();
            let gate = UserEvent::new(&context).unwrap();
            assert_eq!(gate.status().unwrap(), cl::SUBMITTED);
            assert!(gate.queue().unwrap().is_none());
            assert_eq!(gate.final_name().unwrap(), "USER");
            let input = [7u8; 16];
            let mut wait = wait_list![&*gate];
            let write = unsafe { buffer.write_async(&queue, 0, &input, Some(&mut wait)) }.unwrap();
            assert!(wait.is_empty());
            assert_ne!(write.status().unwrap(), cl::COMPLETE);
            assert_eq!(write.queue().unwrap().unwrap(), queue);
            assert_eq!(write.context().unwrap(), context);
            gate.complete().unwrap();
            let mut wait = wait_list![&write];
            wait.wait().unwrap();
            assert!(wait.is_empty());
            assert_eq!(write.status().unwrap(), cl::COMPLETE);
            let mut output = [0u8; 16];
            buffer.read(&queue, 0, &mut output, None).unwrap();
            assert_eq!(output, input);
        }
        assert!(memcheck());
    }

    #[test]
    fn failed_user_event() {
        let _guard = crate::test_lock();
        let context = Context::new_gpu().unwrap();
        let queue = Queue::builder(&context).build().unwrap();
        let buffer = Buffer::new(&context, cl::MEM_READ_WRITE, 4).unwrap();
        let gate = UserEvent::new(&context).unwrap();
        let input = [1u8; 4];
        let mut wait = wait_list![&*gate];
        let write = unsafe { buffer.write_async(&queue, 0, &input, Some(&mut wait)) }.unwrap();
        gate.set_status(-1).unwrap();
        let error = write.wait().unwrap_err();
        assert_eq!(
            error.native_code(),
            Some(cl::EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST)
        );
        assert!(write.status().unwrap() < 0);
        assert!(gate.complete().is_err());
    }

    #[test]
    fn wait_list_borrows() {
        let _guard = crate::test_lock();
        let context = Context::new_gpu().unwrap();
        let a = UserEvent::new(&context).unwrap();
        let b = UserEvent::new(&context).unwrap();
        let mut list = WaitList::new();
        list.add(&a).add_array([&*b, &*a]);
        assert_eq!(list.num_events(), 3);
        assert_eq!(list.raw_handles(), [a.handle(), b.handle(), a.handle()]);
        assert_eq!(a.ref_count(), 1);
        list.clear();
        assert!(list.is_empty());
        assert!(wait(&mut list).is_ok());
    }

    #[test]
    fn callbacks() {
        let _guard = crate::test_lock();
        {
            let context = Context::new_gpu().unwrap();
            let queue = Queue::builder(&context).build().unwrap();
            let gate = UserEvent::new(&context).unwrap();
            let (sender, receiver) = std::sync::mpsc::channel();
            let submitted = sender.clone();
            gate.set_callback(cl::SUBMITTED, move |event, status| {
                submitted.send((event.handle(), status)).unwrap();
            })
            .unwrap();
            assert_eq!(receiver.try_recv().unwrap(), (gate.handle(), cl::SUBMITTED));
            let buffer = Buffer::new(&context, cl::MEM_READ_WRITE, 4).unwrap();
            let fill = buffer.fill(&queue, &[0u8], 0, 4, Some(&mut wait_list![&*gate])).unwrap();
            fill.set_callback(cl::COMPLETE, move |event, status| {
                sender.send((event.handle(), status)).unwrap();
            })
            .unwrap();
            assert!(receiver.try_recv().is_err());
            gate.complete().unwrap();
            queue.finish().unwrap();
            assert_eq!(receiver.try_recv().unwrap(), (fill.handle(), cl::COMPLETE));
            let error = fill.set_callback(cl::QUEUED, |_, _| ()).unwrap_err();
            assert_eq!(error.native_code(), Some(cl::INVALID_VALUE));
        }
        assert!(memcheck());
    }
}
