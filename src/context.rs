/*!
Contexts.

A [`Context`] groups devices of one platform. It is created from an explicit device list, from
a [filter chain](crate::selector::FilterChain) or with one of the shorthands:
```
# use clkit::{context::Context, dev_container::DevContainer, selector::{FilterChain, Vendor}};
# fn main() -> clkit::result::Result<()> {
# clkit::runtime::install_host().ok();
let context = Context::from_filters(FilterChain::new().with_indep(Vendor::new("host labs")))?;
assert!(context.num_devices()? >= 1);
# Ok(())
# }
```
*/

use crate::{
    cl,
    dev_container::{DevContainer, DeviceList},
    device::Device,
    error::{Error, NativeResultExt},
    platform::Platform,
    result::Result,
    runtime::{backend, ImageFormat, InfoQuery},
    selector::{DeviceType, FilterChain, IndepFilter, Menu},
    version::ApiVersion,
    wrapper::{impl_kind, impl_wrapper, info_getters, Wrapper},
};

#[doc(hidden)]
#[derive(Default)]
pub struct ContextFields {
    devices: DeviceList,
}

impl_kind!(ContextKind, Context, Context, ContextFields);

/// A context.
#[derive(Clone, derive_more::Deref)]
pub struct Context {
    #[deref]
    wrapper: Wrapper<ContextKind>,
}

impl_wrapper!(Context, ContextKind);

impl Context {
    /// Creates a context for `devices`.
    ///
    /// The context platform is the platform of the first device.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): `devices` is empty.
    /// - [`Native`](crate::error::ErrorKind::Native): The devices belong to different platforms.
    #[track_caller]
    pub fn from_devices(devices: &[Device]) -> Result<Self> {
        let first = devices
            .first()
            .ok_or_else(|| Error::invalid_argument("unable to create a context without devices"))?;
        let platform = first.platform()?;
        let properties = [(cl::CONTEXT_PLATFORM, platform.handle().as_raw() as isize)];
        let handles: Vec<_> = devices.iter().map(|device| device.handle()).collect();
        let handle = backend()
            .create_context(&properties, &handles)
            .or_native(format!("create context for {} devices", devices.len()))?;
        let context = Self::wrap(handle)?;
        log::debug!("created {context:?} on {platform:?}");
        Ok(context)
    }
    /// Creates a context for the devices selected by `filters`.
    ///
    /// A [`SamePlatform`](crate::selector::SamePlatform) filter is appended unless the chain
    /// already ends with one, so the devices always share a platform.
    ///
    /// **errors**
    /// - [`Unsupported`](crate::error::ErrorKind::Unsupported): No device passed the filters.
    #[track_caller]
    pub fn from_filters(mut filters: FilterChain) -> Result<Self> {
        filters.ensure_same_platform();
        let devices = filters.select()?;
        if devices.is_empty() {
            return Err(Error::unsupported("no device found for the selected filters"));
        }
        Self::from_devices(&devices)
    }
    /// Creates a context for the devices accepted by `filter`.
    #[track_caller]
    pub fn from_indep_filter(filter: impl IndepFilter + 'static) -> Result<Self> {
        Self::from_filters(FilterChain::new().with_indep(filter))
    }
    /// Creates a context for one device picked from a menu on stdin.
    ///
    /// If `index` is a valid device index it is selected without prompting.
    #[track_caller]
    pub fn from_menu(index: Option<usize>) -> Result<Self> {
        let menu = match index {
            Some(index) => Menu::with_index(index),
            None => Menu::new(),
        };
        Self::from_filters(FilterChain::new().with_dep(menu))
    }
    /// Creates a context for the GPUs of one platform.
    #[track_caller]
    pub fn new_gpu() -> Result<Self> {
        Self::from_indep_filter(DeviceType::GPU)
    }
    /// Creates a context for the CPUs of one platform.
    #[track_caller]
    pub fn new_cpu() -> Result<Self> {
        Self::from_indep_filter(DeviceType::CPU)
    }
    /// Creates a context for the accelerators of one platform.
    #[track_caller]
    pub fn new_accel() -> Result<Self> {
        Self::from_indep_filter(DeviceType::ACCELERATOR)
    }
    /// Creates a context for the devices of one platform.
    #[track_caller]
    pub fn new_any() -> Result<Self> {
        Self::from_filters(FilterChain::new())
    }
    info_getters! {
        pub fn num_devices_info() -> u32 = info_scalar(cl::CONTEXT_NUM_DEVICES);
        /// Zero terminated (name, value) pairs the context was created with.
        pub fn properties() -> Vec<isize> = info_array(cl::CONTEXT_PROPERTIES);
    }
    /// The platform of the context, the platform of its first device.
    pub fn platform(&self) -> Result<Platform> {
        self.device(0)?.platform()
    }
    /// The API version of the context platform.
    pub fn api_version(&self) -> Result<ApiVersion> {
        self.platform()?.api_version()
    }
    /// The image formats supported for `flags` and `image_type`, one of `cl::MEM_OBJECT_IMAGE*`.
    pub fn image_formats(&self, flags: u64, image_type: u32) -> Result<Vec<ImageFormat>> {
        backend()
            .supported_image_formats(self.handle(), flags, image_type)
            .or_native(format!("get image formats of {self:?}"))
    }
}

impl DevContainer for Context {
    fn device_list(&self) -> Result<&[Device]> {
        self.fields().devices.get_or_init(
            &self.wrapper,
            (InfoQuery::Context(self.handle()), cl::CONTEXT_DEVICES),
            || {
                self.query_info(InfoQuery::Context(self.handle()), cl::CONTEXT_DEVICES)?
                    .handles()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{selector::SamePlatform, wrapper::memcheck};

    #[test]
    fn context_from_devices() {
        let _guard = crate::test_lock();
        {
            let platform = Platform::all().unwrap().remove(0);
            let devices = platform.all_devices().unwrap();
            let context = Context::from_devices(devices).unwrap();
            assert_eq!(context.all_devices().unwrap(), devices);
            assert_eq!(context.num_devices_info().unwrap(), 2);
            assert_eq!(context.platform().unwrap(), platform);
            assert_eq!(context.api_version().unwrap(), ApiVersion::new(1, 2));
            let properties = context.properties().unwrap();
            assert_eq!(properties[0], cl::CONTEXT_PLATFORM);
            assert_eq!(properties.last(), Some(&0));
            let formats = context
                .image_formats(cl::MEM_READ_WRITE, cl::MEM_OBJECT_IMAGE2D)
                .unwrap();
            assert!(formats.contains(&ImageFormat {
                channel_order: cl::RGBA,
                channel_data_type: cl::UNORM_INT8,
            }));
        }
        assert!(memcheck());
    }

    #[test]
    fn context_errors() {
        let _guard = crate::test_lock();
        assert!(Context::from_devices(&[]).unwrap_err().kind().is_invalid_argument());
        let platforms = Platform::all().unwrap();
        let mixed = [
            platforms[0].device(0).unwrap(),
            platforms[1].device(0).unwrap(),
        ];
        assert!(Context::from_devices(&mixed).unwrap_err().native_code().is_some());
        let none = FilterChain::new().with_indep(DeviceType::ACCELERATOR).with_indep(DeviceType::GPU);
        assert!(Context::from_filters(none).unwrap_err().kind().is_unsupported());
    }

    #[test]
    fn context_shorthands() {
        let _guard = crate::test_lock();
        let gpu = Context::new_gpu().unwrap();
        assert_eq!(gpu.num_devices().unwrap(), 1);
        assert!(gpu.device(0).unwrap().is_type(cl::DEVICE_TYPE_GPU).unwrap());
        let cpu = Context::new_cpu().unwrap();
        let platform = cpu.platform().unwrap();
        assert_eq!(cpu.num_devices().unwrap(), 2);
        for device in cpu.all_devices().unwrap() {
            assert_eq!(device.platform().unwrap(), platform);
        }
        let accel = Context::new_accel().unwrap();
        assert_eq!(accel.device(0).unwrap().name().unwrap(), "Host Labs Accelerator");
        let any = Context::new_any().unwrap();
        assert_eq!(any.num_devices().unwrap(), 3);
        let menu = Context::from_menu(Some(1)).unwrap();
        assert_eq!(menu.num_devices().unwrap(), 1);
        let mut chain = FilterChain::new().with_dep(SamePlatform);
        chain.ensure_same_platform();
        assert_eq!(chain.len(), 1);
    }
}
