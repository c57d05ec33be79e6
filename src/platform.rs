/*!
Platforms.

A platform is an implementation of the compute API, with its own devices. Platforms are
discovered by enumeration:
```
# use clkit::{dev_container::DevContainer, platform::Platform};
# fn main() -> clkit::result::Result<()> {
# clkit::runtime::install_host().ok();
for platform in Platform::all()? {
    println!("{} ({} devices)", platform.name()?, platform.num_devices()?);
}
# Ok(())
# }
```
*/

use crate::{
    cl,
    dev_container::{DevContainer, DeviceList},
    device::Device,
    error::{Error, NativeResultExt},
    result::Result,
    runtime::{backend, InfoQuery},
    version::ApiVersion,
    wrapper::{impl_kind, impl_wrapper, info_getters, Wrapper},
};

// Info key of the cached device ids, not a native parameter.
const PLATFORM_DEVICES: u32 = u32::MAX;

#[doc(hidden)]
#[derive(Default)]
pub struct PlatformFields {
    devices: DeviceList,
}

impl_kind!(PlatformKind, Platform, Platform, PlatformFields);

/// A platform.
#[derive(Clone, derive_more::Deref)]
pub struct Platform {
    #[deref]
    wrapper: Wrapper<PlatformKind>,
}

impl_wrapper!(Platform, PlatformKind);

impl Platform {
    /// All platforms, in native order.
    ///
    /// **errors**
    /// - [`Native`](crate::error::ErrorKind::Native): Enumeration failed.
    pub fn all() -> Result<Vec<Self>> {
        backend()
            .platform_ids()
            .or_native("get platform ids")?
            .into_iter()
            .map(Self::wrap_retained)
            .collect()
    }
    info_getters! {
        pub fn name() -> String = info_string(cl::PLATFORM_NAME);
        pub fn vendor() -> String = info_string(cl::PLATFORM_VENDOR);
        /// The version string, "OpenCL <major>.<minor> <vendor specific>".
        pub fn version() -> String = info_string(cl::PLATFORM_VERSION);
        pub fn profile() -> String = info_string(cl::PLATFORM_PROFILE);
        pub fn extensions() -> String = info_string(cl::PLATFORM_EXTENSIONS);
    }
    /// The parsed [`version`](Self::version).
    ///
    /// **errors**
    /// - [`Unsupported`](crate::error::ErrorKind::Unsupported): The version string is malformed.
    #[track_caller]
    pub fn api_version(&self) -> Result<ApiVersion> {
        let version = self.version()?;
        ApiVersion::from_version_string(&version).map_err(|e| Error::unsupported(e.to_string()))
    }
    /// Returns true if `extension` is listed in [`extensions`](Self::extensions).
    pub fn has_extension(&self, extension: &str) -> Result<bool> {
        Ok(self.extensions()?.split_whitespace().any(|x| x == extension))
    }
    /// The devices of `device_type`, see [`cl::DEVICE_TYPE_ALL`].
    ///
    /// Returns an empty list if there is no such device.
    pub fn devices_of_type(&self, device_type: u64) -> Result<Vec<Device>> {
        match backend().device_ids(self.handle(), device_type) {
            Ok(handles) => handles.into_iter().map(Device::wrap_retained).collect(),
            Err(cl::DEVICE_NOT_FOUND) => Ok(Vec::new()),
            Err(code) => Err(code).or_native(format!("get devices of {self:?}")),
        }
    }
}

impl DevContainer for Platform {
    fn device_list(&self) -> Result<&[Device]> {
        self.fields().devices.get_or_init(
            &self.wrapper,
            (InfoQuery::Platform(self.handle()), PLATFORM_DEVICES),
            || {
                backend()
                    .device_ids(self.handle(), cl::DEVICE_TYPE_ALL)
                    .or_native(format!("get devices of {self:?}"))
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_info() {
        let _guard = crate::test_lock();
        let platforms = Platform::all().unwrap();
        assert_eq!(platforms.len(), 2);
        assert_eq!(platforms[0].api_version().unwrap(), ApiVersion::new(1, 2));
        assert_eq!(platforms[1].api_version().unwrap(), ApiVersion::new(2, 0));
        assert_eq!(platforms[1].vendor().unwrap(), "Host Labs");
        assert_eq!(platforms[0].profile().unwrap(), "FULL_PROFILE");
        assert!(!platforms[0].has_extension("cl_khr_fp64").unwrap());
    }

    #[test]
    fn platform_devices() {
        let _guard = crate::test_lock();
        let platform = Platform::all().unwrap().remove(1);
        assert_eq!(platform.num_devices().unwrap(), 3);
        let first = platform.device(0).unwrap();
        assert_eq!(first.platform().unwrap(), platform);
        assert!(platform.device(3).unwrap_err().kind().is_out_of_range());
        let cached = platform
            .info_of(InfoQuery::Platform(platform.handle()), PLATFORM_DEVICES)
            .unwrap()
            .handles()
            .unwrap();
        assert_eq!(cached[0], first.handle());
        let cpus = platform.devices_of_type(cl::DEVICE_TYPE_CPU).unwrap();
        assert_eq!(cpus.len(), 2);
        assert!(platform
            .devices_of_type(cl::DEVICE_TYPE_GPU)
            .unwrap()
            .is_empty());
    }
}
