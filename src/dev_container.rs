/*!
Objects that contain devices.

Platforms, contexts and programs enumerate their devices on first use. The device list is stable
for the lifetime of the container and released with it.
*/

use crate::{
    device::Device,
    error::Error,
    result::Result,
    runtime::{handles_to_bytes, Handle, InfoQuery},
    wrapper::{Kind, Wrapper},
};
use once_cell::sync::OnceCell;

/// An object that contains devices.
pub trait DevContainer {
    #[doc(hidden)]
    fn device_list(&self) -> Result<&[Device]>;
    /// All devices, in native order.
    fn all_devices(&self) -> Result<&[Device]> {
        self.device_list()
    }
    /// The device at `index`.
    ///
    /// **errors**
    /// - [`OutOfRange`](crate::error::ErrorKind::OutOfRange): `index` is not less than the number of devices.
    #[track_caller]
    fn device(&self, index: usize) -> Result<Device> {
        let devices = self.device_list()?;
        devices.get(index).cloned().ok_or_else(|| {
            Error::out_of_range(format!(
                "device index {index} is out of range, the container has {} devices",
                devices.len()
            ))
        })
    }
    /// The number of devices.
    fn num_devices(&self) -> Result<usize> {
        Ok(self.device_list()?.len())
    }
}

/// The lazily enumerated devices of a container.
#[derive(Default)]
pub(crate) struct DeviceList {
    devices: OnceCell<Vec<Device>>,
}

impl DeviceList {
    /// Enumerates the devices with `enumerate` on first use.
    ///
    /// The raw handles are stored in the info cache of `container` under `key`, so later info
    /// queries of `key` observe the same list.
    pub(crate) fn get_or_init<K: Kind>(
        &self,
        container: &Wrapper<K>,
        key: (InfoQuery, u32),
        enumerate: impl FnOnce() -> Result<Vec<Handle>>,
    ) -> Result<&[Device]> {
        self.devices
            .get_or_try_init(|| {
                let handles = enumerate()?;
                container
                    .info_cache()
                    .insert(key.0, key.1, &handles_to_bytes(&handles));
                handles.into_iter().map(Device::wrap_retained).collect()
            })
            .map(Vec::as_slice)
    }
}
