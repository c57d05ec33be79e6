/*!
Reference counted wrappers around native handles.

Every native object is represented by at most one [`Wrapper`] per process. Wrapping a handle that
is already wrapped returns the existing wrapper, so identity can be compared with `==` and
per-object state (the info cache, produced events, cached kernels) is shared by all clones.

Cloning a wrapper adds a reference and dropping it removes one. When the last clone is dropped:
- the class specific fields are released,
- the info cache is cleared,
- the handle is removed from the process wide index,
- the native object is released.

Info queries are memoized per object:
```
# use clkit::{cl, platform::Platform};
# fn main() -> clkit::result::Result<()> {
# clkit::runtime::install_host().ok();
let platform = Platform::all()?.remove(0);
let a = platform.info(cl::PLATFORM_NAME)?;
let b = platform.info(cl::PLATFORM_NAME)?;
assert!(std::sync::Arc::ptr_eq(&a, &b));
# Ok(())
# }
```
*/

use crate::{
    error::{native_error_name, Error, NativeResultExt},
    result::Result,
    runtime::{self, backend, Class, Handle, InfoQuery},
};
use bytemuck::Pod;
use dashmap::{mapref::entry::Entry, DashMap};
use once_cell::sync::OnceCell;
use std::{
    any::Any,
    fmt::{self, Debug},
    hash::{Hash, Hasher},
    mem::{self, size_of},
    sync::{Arc, Weak},
};

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// A class of native objects.
///
/// Implemented by the marker types of the concrete wrappers.
pub trait Kind: sealed::Sealed + Send + Sync + Sized + 'static {
    /// The native class, used for retain and release.
    const CLASS: Class;
    /// Additional state owned by the wrapper.
    type Fields: Default + Send + Sync + 'static;
    /// The info query of the object.
    fn info_query(handle: Handle) -> InfoQuery;
    /// Releases the fields, called before the native object is released.
    fn release_fields(fields: &mut Self::Fields) {
        drop(mem::take(fields));
    }
}

type Index = DashMap<Handle, Weak<dyn Any + Send + Sync>>;

fn index() -> &'static Index {
    static INDEX: OnceCell<Index> = OnceCell::new();
    INDEX.get_or_init(Index::default)
}

/// Returns true if no wrapper is alive.
///
/// Live wrappers are logged at debug level.
pub fn memcheck() -> bool {
    let live: Vec<Handle> = index()
        .iter()
        .filter(|entry| entry.value().strong_count() > 0)
        .map(|entry| *entry.key())
        .collect();
    if !live.is_empty() {
        log::debug!("memcheck: {} live wrappers {live:?}", live.len());
    }
    live.is_empty()
}

/// Clears the process wide handle index.
///
/// Wrappers that are still alive keep working, but wrapping their handles again creates new
/// wrappers.
pub fn teardown() {
    index().clear();
}

/// A native info value.
///
/// The bytes are stored with 8 byte alignment, so they can be viewed as arrays of any
/// primitive.
pub struct Info {
    words: Box<[u64]>,
    len: usize,
}

impl Info {
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        let mut words = vec![0u64; (bytes.len() + 7) / 8].into_boxed_slice();
        bytemuck::cast_slice_mut::<u64, u8>(&mut words)[..bytes.len()].copy_from_slice(bytes);
        Self {
            words,
            len: bytes.len(),
        }
    }
    /// The size in bytes.
    pub fn size(&self) -> usize {
        self.len
    }
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.len]
    }
    /// Reads the value as a `T`.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): The size is not the size of `T`.
    #[track_caller]
    pub fn scalar<T: Pod>(&self) -> Result<T> {
        if self.len != size_of::<T>() {
            return Err(Error::invalid_argument(format!(
                "info value of {} bytes read as a {} byte scalar",
                self.len,
                size_of::<T>()
            )));
        }
        Ok(bytemuck::pod_read_unaligned(self.as_bytes()))
    }
    /// Views the value as a slice of `T`.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): The size is not a multiple of the size of `T`.
    #[track_caller]
    pub fn array<T: Pod>(&self) -> Result<&[T]> {
        bytemuck::try_cast_slice(self.as_bytes()).map_err(|e| {
            Error::invalid_argument(format!(
                "info value of {} bytes read as an array of {} byte elements: {e}",
                self.len,
                size_of::<T>()
            ))
        })
    }
    /// Reads the value as a string, without the trailing nul.
    pub fn string(&self) -> String {
        String::from_utf8_lossy(self.as_bytes())
            .trim_end_matches('\0')
            .to_string()
    }
    /// Reads the value as a handle, `None` for null.
    pub fn handle(&self) -> Result<Option<Handle>> {
        self.scalar::<usize>().map(Handle::from_raw)
    }
    /// Reads the value as an array of handles, skipping nulls.
    pub fn handles(&self) -> Result<Vec<Handle>> {
        Ok(self
            .array::<usize>()?
            .iter()
            .copied()
            .filter_map(Handle::from_raw)
            .collect())
    }
}

impl Debug for Info {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Info")
            .field("size", &self.len)
            .field("bytes", &self.as_bytes())
            .finish()
    }
}

#[track_caller]
fn query(query: InfoQuery, param: u32) -> Result<Info> {
    let bytes = runtime::query_bytes(query, param).or_native(format!("query info {param:#x} of {query:?}"))?;
    if bytes.is_empty() {
        return Err(Error::unsupported(format!("info {param:#x} of {query:?} is empty")));
    }
    Ok(Info::from_bytes(&bytes))
}

#[derive(Default)]
pub(crate) struct InfoCache {
    map: DashMap<(InfoQuery, u32), Arc<Info>>,
}

impl InfoCache {
    #[track_caller]
    fn get_or_query(&self, query: InfoQuery, param: u32) -> Result<Arc<Info>> {
        if let Some(info) = self.map.get(&(query, param)) {
            return Ok(info.clone());
        }
        let info = self::query(query, param)?;
        Ok(self
            .map
            .entry((query, param))
            .or_insert_with(|| Arc::new(info))
            .clone())
    }
    pub(crate) fn insert(&self, query: InfoQuery, param: u32, bytes: &[u8]) -> Arc<Info> {
        self.map
            .entry((query, param))
            .or_insert_with(|| Arc::new(Info::from_bytes(bytes)))
            .clone()
    }
    fn clear(&self) {
        self.map.clear();
    }
}

struct Object<K: Kind> {
    handle: Handle,
    info: InfoCache,
    fields: K::Fields,
}

impl<K: Kind> Drop for Object<K> {
    fn drop(&mut self) {
        K::release_fields(&mut self.fields);
        self.info.clear();
        index().remove_if(&self.handle, |_, weak| weak.strong_count() == 0);
        log::trace!("release {} {:?}", K::CLASS, self.handle);
        if let Err(code) = backend().release(K::CLASS, self.handle) {
            log::warn!(
                "unable to release {} {:?}: {}",
                K::CLASS,
                self.handle,
                native_error_name(code)
            );
        }
    }
}

/// The unique wrapper of a native object.
pub struct Wrapper<K: Kind> {
    inner: Arc<Object<K>>,
}

impl<K: Kind> Wrapper<K> {
    /// Wraps `handle`, taking ownership of one native reference.
    ///
    /// If the handle is already wrapped the reference is released and the existing wrapper is
    /// returned.
    #[track_caller]
    pub(crate) fn from_owned(handle: Handle) -> Result<Self> {
        Self::wrap_with(handle, true)
    }
    /// Wraps `handle` without taking ownership of a native reference.
    ///
    /// A new wrapper retains the native object.
    #[track_caller]
    pub(crate) fn from_retained(handle: Handle) -> Result<Self> {
        Self::wrap_with(handle, false)
    }
    #[track_caller]
    fn wrap_with(handle: Handle, owned: bool) -> Result<Self> {
        let existing = match index().entry(handle) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get().upgrade();
                match existing {
                    Some(existing) => existing,
                    None => {
                        let inner = Self::create(handle, owned)?;
                        entry.insert(Arc::downgrade(&inner) as Weak<dyn Any + Send + Sync>);
                        return Ok(Self { inner });
                    }
                }
            }
            Entry::Vacant(entry) => {
                let inner = Self::create(handle, owned)?;
                entry.insert(Arc::downgrade(&inner) as Weak<dyn Any + Send + Sync>);
                return Ok(Self { inner });
            }
        };
        let inner = existing.downcast::<Object<K>>().map_err(|_| {
            Error::internal(format!("{handle:?} is already wrapped as another class than {}", K::CLASS))
        })?;
        if owned {
            backend()
                .release(K::CLASS, handle)
                .or_native(format!("release {} {handle:?}", K::CLASS))?;
        }
        Ok(Self { inner })
    }
    #[track_caller]
    fn create(handle: Handle, owned: bool) -> Result<Arc<Object<K>>> {
        if !owned {
            backend()
                .retain(K::CLASS, handle)
                .or_native(format!("retain {} {handle:?}", K::CLASS))?;
        }
        log::trace!("wrap {} {handle:?}", K::CLASS);
        Ok(Arc::new(Object {
            handle,
            info: InfoCache::default(),
            fields: K::Fields::default(),
        }))
    }
    /// The native handle.
    pub fn handle(&self) -> Handle {
        self.inner.handle
    }
    /// The number of live clones of the wrapper.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
    /// The cached info `param`.
    ///
    /// The first call queries the native object, later calls return the same value.
    ///
    /// **errors**
    /// - [`Native`](crate::error::ErrorKind::Native): The query failed.
    /// - [`Unsupported`](crate::error::ErrorKind::Unsupported): The value is empty.
    #[track_caller]
    pub fn info(&self, param: u32) -> Result<Arc<Info>> {
        self.info_of(K::info_query(self.handle()), param)
    }
    /// Like [`info`](Self::info) for another query of the object, ie build info per device.
    #[track_caller]
    pub fn info_of(&self, query: InfoQuery, param: u32) -> Result<Arc<Info>> {
        self.inner.info.get_or_query(query, param)
    }
    /// Queries `param` without caching, for values that change.
    #[track_caller]
    pub fn query_info(&self, query: InfoQuery, param: u32) -> Result<Info> {
        self::query(query, param)
    }
    #[track_caller]
    pub(crate) fn info_scalar<T: Pod>(&self, param: u32) -> Result<T> {
        self.info(param)?.scalar()
    }
    #[track_caller]
    pub(crate) fn info_bool(&self, param: u32) -> Result<bool> {
        Ok(self.info_scalar::<u32>(param)? != 0)
    }
    #[track_caller]
    pub(crate) fn info_array<T: Pod>(&self, param: u32) -> Result<Vec<T>> {
        Ok(self.info(param)?.array()?.to_vec())
    }
    #[track_caller]
    pub(crate) fn info_string(&self, param: u32) -> Result<String> {
        Ok(self.info(param)?.string())
    }
    /// Wraps the handle stored in info `param`.
    #[track_caller]
    pub(crate) fn info_wrapper<T: Kind>(&self, param: u32) -> Result<Wrapper<T>> {
        match self.info(param)?.handle()? {
            Some(handle) => Wrapper::from_retained(handle),
            None => Err(Error::unsupported(format!(
                "info {param:#x} of {} {:?} is null",
                K::CLASS,
                self.handle()
            ))),
        }
    }
    pub(crate) fn info_cache(&self) -> &InfoCache {
        &self.inner.info
    }
    pub(crate) fn fields(&self) -> &K::Fields {
        &self.inner.fields
    }
}

impl<K: Kind> Clone for Wrapper<K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: Kind> PartialEq for Wrapper<K> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<K: Kind> Eq for Wrapper<K> {}

impl<K: Kind> Hash for Wrapper<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle().hash(state);
    }
}

impl<K: Kind> Debug for Wrapper<K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({:?})", K::CLASS, self.handle())
    }
}

/// Implements info accessors on a wrapper newtype.
///
/// `getter` is one of `info_scalar`, `info_bool`, `info_array`, `info_string`.
macro_rules! info_getters {
    ($($(#[$meta:meta])* $vis:vis fn $name:ident() -> $ty:ty = $getter:ident($param:expr);)*) => {
        $(
            $(#[$meta])*
            #[track_caller]
            $vis fn $name(&self) -> $crate::result::Result<$ty> {
                self.$getter($param)
            }
        )*
    };
}
pub(crate) use info_getters;

/// Declares the `Kind` of a wrapper.
macro_rules! impl_kind {
    ($(#[$meta:meta])* $kind:ident, $class:ident, $query:ident, $fields:ty) => {
        $(#[$meta])*
        pub enum $kind {}

        impl $crate::wrapper::sealed::Sealed for $kind {}

        impl $crate::wrapper::Kind for $kind {
            const CLASS: $crate::runtime::Class = $crate::runtime::Class::$class;
            type Fields = $fields;
            fn info_query(handle: $crate::runtime::Handle) -> $crate::runtime::InfoQuery {
                $crate::runtime::InfoQuery::$query(handle)
            }
        }
    };
}
pub(crate) use impl_kind;

/// Implements the wrap / unwrap surface of a newtype with a `wrapper` field.
macro_rules! impl_wrapper {
    ($ty:ident, $kind:ty) => {
        impl $ty {
            /// Wraps `handle`, taking ownership of one native reference.
            ///
            /// Returns the existing wrapper if the handle is already wrapped.
            #[track_caller]
            pub fn wrap(handle: $crate::runtime::Handle) -> $crate::result::Result<Self> {
                $crate::wrapper::Wrapper::from_owned(handle).map(Self::from)
            }
            #[allow(dead_code)]
            #[track_caller]
            pub(crate) fn wrap_retained(handle: $crate::runtime::Handle) -> $crate::result::Result<Self> {
                $crate::wrapper::Wrapper::from_retained(handle).map(Self::from)
            }
            /// The native handle.
            pub fn unwrap(&self) -> $crate::runtime::Handle {
                self.wrapper.handle()
            }
        }

        impl From<$crate::wrapper::Wrapper<$kind>> for $ty {
            fn from(wrapper: $crate::wrapper::Wrapper<$kind>) -> Self {
                Self { wrapper }
            }
        }

        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.wrapper == other.wrapper
            }
        }

        impl Eq for $ty {}

        impl std::hash::Hash for $ty {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                std::hash::Hash::hash(&self.wrapper, state);
            }
        }

        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                std::fmt::Debug::fmt(&self.wrapper, f)
            }
        }
    };
}
pub(crate) use impl_wrapper;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cl, dev_container::DevContainer, device::Device, memobj::MemObjKind, platform::Platform};

    #[test]
    fn info_values() {
        let info = Info::from_bytes(&[1, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(info.size(), 8);
        assert_eq!(info.scalar::<u64>().unwrap(), 0x2_0000_0001);
        assert_eq!(info.array::<u32>().unwrap(), &[1, 2]);
        assert!(info.scalar::<u32>().unwrap_err().kind().is_invalid_argument());
        assert!(info.array::<[u8; 3]>().is_err());
        let info = Info::from_bytes(b"name\0");
        assert_eq!(info.string(), "name");
    }

    #[test]
    fn identity() {
        let _guard = crate::test_lock();
        {
            let platform = Platform::all().unwrap().remove(0);
            let again = Platform::all().unwrap().remove(0);
            assert_eq!(platform, again);
            assert_eq!(platform.ref_count(), 2);
            drop(again);
            assert_eq!(platform.ref_count(), 1);
            let device = Device::wrap(platform.all_devices().unwrap()[0].handle()).unwrap();
            assert_eq!(&device, &platform.all_devices().unwrap()[0]);
            let a = platform.info(cl::PLATFORM_VENDOR).unwrap();
            let b = platform.info(cl::PLATFORM_VENDOR).unwrap();
            assert!(Arc::ptr_eq(&a, &b));
            assert!(!memcheck());
        }
        assert!(memcheck());
    }

    #[test]
    fn concurrent_wrap() {
        let _guard = crate::test_lock();
        {
            let context = crate::context::Context::new_gpu().unwrap();
            let buffer = crate::buffer::Buffer::new(&context, cl::MEM_READ_WRITE, 64).unwrap();
            let wrapper: &Wrapper<MemObjKind> = &buffer;
            let handle = buffer.handle();
            std::thread::scope(|scope| {
                for _ in 0..8 {
                    scope.spawn(|| {
                        for _ in 0..100 {
                            let mem = Wrapper::<MemObjKind>::from_retained(handle).unwrap();
                            assert!(Arc::ptr_eq(&mem.inner, &wrapper.inner));
                            let size = mem.info(cl::MEM_SIZE).unwrap();
                            assert!(Arc::ptr_eq(&size, &wrapper.info(cl::MEM_SIZE).unwrap()));
                        }
                    });
                }
            });
            assert_eq!(buffer.ref_count(), 1);
            let native_refs = buffer
                .query_info(InfoQuery::MemObj(handle), cl::MEM_REFERENCE_COUNT)
                .unwrap()
                .scalar::<u32>()
                .unwrap();
            assert_eq!(native_refs, 1);
        }
        assert!(memcheck());
        // no wrapper is alive, so threads race to create and drop the first one
        let handle = Platform::all().unwrap()[0].all_devices().unwrap()[0].handle();
        assert!(memcheck());
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        let a = Device::wrap(handle).unwrap();
                        let b = Device::wrap(handle).unwrap();
                        assert_eq!(a, b);
                        assert!(a.ref_count() >= 2);
                        a.name().unwrap();
                    }
                });
            }
        });
        assert!(memcheck());
    }

    #[test]
    fn wrong_class() {
        let _guard = crate::test_lock();
        let platform = Platform::all().unwrap().remove(0);
        let error = Wrapper::<crate::device::DeviceKind>::from_retained(platform.handle()).unwrap_err();
        assert!(error.kind().is_internal());
    }
}
