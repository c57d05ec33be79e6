/*!
Devices.

A [`Device`] belongs to a [`Platform`] and is obtained from a [device container](crate::dev_container),
ie a platform, a [context](crate::context) or a [program](crate::program).

Printing out useful info:
```
# use clkit::{dev_container::DevContainer, platform::Platform};
# fn main() -> clkit::result::Result<()> {
# clkit::runtime::install_host().ok();
let platform = Platform::all()?.remove(0);
let device = platform.device(0)?;
println!(
    "{} {} compute units, max work group size {}",
    device.name()?,
    device.max_compute_units()?,
    device.max_work_group_size()?,
);
# Ok(())
# }
```
*/

use crate::{
    cl,
    error::Error,
    platform::{Platform, PlatformKind},
    result::Result,
    runtime::backend,
    version::ApiVersion,
    error::NativeResultExt,
    wrapper::{impl_kind, impl_wrapper, info_getters, Wrapper},
};

impl_kind!(DeviceKind, Device, Device, ());

/// A device.
#[derive(Clone, derive_more::Deref)]
pub struct Device {
    #[deref]
    wrapper: Wrapper<DeviceKind>,
}

impl_wrapper!(Device, DeviceKind);

impl Device {
    info_getters! {
        pub fn name() -> String = info_string(cl::DEVICE_NAME);
        pub fn vendor() -> String = info_string(cl::DEVICE_VENDOR);
        pub fn vendor_id() -> u32 = info_scalar(cl::DEVICE_VENDOR_ID);
        /// The version string, "OpenCL <major>.<minor> <vendor specific>".
        pub fn version() -> String = info_string(cl::DEVICE_VERSION);
        pub fn driver_version() -> String = info_string(cl::DRIVER_VERSION);
        pub fn profile() -> String = info_string(cl::DEVICE_PROFILE);
        pub fn extensions() -> String = info_string(cl::DEVICE_EXTENSIONS);
        pub fn opencl_c_version() -> String = info_string(cl::DEVICE_OPENCL_C_VERSION);
        /// Bitfield of `cl::DEVICE_TYPE_*`.
        pub fn device_type() -> u64 = info_scalar(cl::DEVICE_TYPE);
        pub fn max_compute_units() -> u32 = info_scalar(cl::DEVICE_MAX_COMPUTE_UNITS);
        pub fn max_work_item_dimensions() -> u32 = info_scalar(cl::DEVICE_MAX_WORK_ITEM_DIMENSIONS);
        pub fn max_work_group_size() -> usize = info_scalar(cl::DEVICE_MAX_WORK_GROUP_SIZE);
        /// The maximum work items per work group in each dimension.
        pub fn max_work_item_sizes() -> Vec<usize> = info_array(cl::DEVICE_MAX_WORK_ITEM_SIZES);
        /// In MHz.
        pub fn max_clock_frequency() -> u32 = info_scalar(cl::DEVICE_MAX_CLOCK_FREQUENCY);
        pub fn address_bits() -> u32 = info_scalar(cl::DEVICE_ADDRESS_BITS);
        pub fn max_mem_alloc_size() -> u64 = info_scalar(cl::DEVICE_MAX_MEM_ALLOC_SIZE);
        pub fn global_mem_size() -> u64 = info_scalar(cl::DEVICE_GLOBAL_MEM_SIZE);
        pub fn local_mem_size() -> u64 = info_scalar(cl::DEVICE_LOCAL_MEM_SIZE);
        pub fn image_support() -> bool = info_bool(cl::DEVICE_IMAGE_SUPPORT);
        pub fn endian_little() -> bool = info_bool(cl::DEVICE_ENDIAN_LITTLE);
        pub fn available() -> bool = info_bool(cl::DEVICE_AVAILABLE);
        pub fn compiler_available() -> bool = info_bool(cl::DEVICE_COMPILER_AVAILABLE);
        /// Supported `cl::QUEUE_*` properties.
        pub fn queue_properties() -> u64 = info_scalar(cl::DEVICE_QUEUE_PROPERTIES);
    }
    /// The platform of the device.
    #[track_caller]
    pub fn platform(&self) -> Result<Platform> {
        self.info_wrapper::<PlatformKind>(cl::DEVICE_PLATFORM)
            .map(Platform::from)
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
    /// The device this sub-device was partitioned from, `None` for root devices.
    pub fn parent_device(&self) -> Result<Option<Device>> {
        self.info(cl::DEVICE_PARENT_DEVICE)?
            .handle()?
            .map(Device::wrap_retained)
            .transpose()
    }
    /// The maximum number of sub-devices, 0 if the device can not be partitioned.
    pub fn partition_max_sub_devices(&self) -> Result<u32> {
        self.info_scalar(cl::DEVICE_PARTITION_MAX_SUB_DEVICES)
    }
    /// The partition this sub-device was created with, `None` for root devices.
    pub fn partition(&self) -> Result<Option<Partition>> {
        let list = self.info(cl::DEVICE_PARTITION_TYPE)?;
        Partition::from_list(list.array::<isize>()?)
    }
    /// Partitions the device into sub-devices.
    ///
    /// **errors**
    /// - [`Native`](crate::error::ErrorKind::Native):
    ///     - `cl::DEVICE_PARTITION_FAILED`: The device can not be split as requested.
    ///     - `cl::INVALID_DEVICE_PARTITION_COUNT`: The counts exceed the compute units.
    ///     - `cl::INVALID_VALUE`: The device does not support the partition.
    pub fn create_sub_devices(&self, partition: &Partition) -> Result<Vec<Device>> {
        let handles = backend()
            .create_sub_devices(self.handle(), &partition.to_list())
            .or_native(format!("partition {self:?} {partition:?}"))?;
        handles.into_iter().map(Device::wrap).collect()
    }
    /// The names of the built-in kernels.
    pub fn built_in_kernels(&self) -> Result<Vec<String>> {
        Ok(self
            .info_string(cl::DEVICE_BUILT_IN_KERNELS)?
            .split(';')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect())
    }
    /// Returns true if the device type intersects `device_type`.
    pub fn is_type(&self, device_type: u64) -> Result<bool> {
        Ok(self.device_type()? & device_type != 0)
    }
    /// A short name of the [device type](Self::device_type), ie "GPU".
    pub fn type_name(&self) -> Result<&'static str> {
        Ok(device_type_name(self.device_type()?))
    }
}

/// How to partition a device into sub-devices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Partition {
    /// As many sub-devices as possible with this many compute units each.
    Equally(u32),
    /// One sub-device per count, with that many compute units.
    ByCounts(Vec<u32>),
    /// Sub-devices sharing one of `cl::DEVICE_AFFINITY_DOMAIN_*`.
    ByAffinityDomain(u64),
}

impl Partition {
    /// The zero terminated property list.
    pub fn to_list(&self) -> Vec<isize> {
        match self {
            Self::Equally(units) => vec![cl::DEVICE_PARTITION_EQUALLY, *units as isize, 0],
            Self::ByCounts(counts) => std::iter::once(cl::DEVICE_PARTITION_BY_COUNTS)
                .chain(counts.iter().map(|x| *x as isize))
                .chain([cl::DEVICE_PARTITION_BY_COUNTS_LIST_END, 0])
                .collect(),
            Self::ByAffinityDomain(domain) => {
                vec![cl::DEVICE_PARTITION_BY_AFFINITY_DOMAIN, *domain as isize, 0]
            }
        }
    }
    /// Parses a property list, `None` if it is empty.
    ///
    /// **errors**
    /// - [`Unsupported`](crate::error::ErrorKind::Unsupported): The list is malformed.
    #[track_caller]
    pub fn from_list(list: &[isize]) -> Result<Option<Self>> {
        let malformed = || Error::unsupported(format!("malformed partition property list {list:?}"));
        let (&name, values) = match list.split_first() {
            None | Some((0, _)) => return Ok(None),
            Some(first) => first,
        };
        let partition = match name {
            cl::DEVICE_PARTITION_EQUALLY => Self::Equally(*values.first().ok_or_else(malformed)? as u32),
            cl::DEVICE_PARTITION_BY_COUNTS => Self::ByCounts(
                values
                    .iter()
                    .take_while(|x| **x != cl::DEVICE_PARTITION_BY_COUNTS_LIST_END)
                    .map(|x| *x as u32)
                    .collect(),
            ),
            cl::DEVICE_PARTITION_BY_AFFINITY_DOMAIN => {
                Self::ByAffinityDomain(*values.first().ok_or_else(malformed)? as u64)
            }
            _ => return Err(malformed()),
        };
        Ok(Some(partition))
    }
}

/// A short name of a device type bitfield.
pub fn device_type_name(device_type: u64) -> &'static str {
    if device_type & cl::DEVICE_TYPE_GPU != 0 {
        "GPU"
    } else if device_type & cl::DEVICE_TYPE_CPU != 0 {
        "CPU"
    } else if device_type & cl::DEVICE_TYPE_ACCELERATOR != 0 {
        "accelerator"
    } else if device_type & cl::DEVICE_TYPE_CUSTOM != 0 {
        "custom"
    } else {
        "unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dev_container::DevContainer, wrapper::memcheck};

    #[test]
    fn device_info() {
        let _guard = crate::test_lock();
        let platform = Platform::all().unwrap().remove(0);
        let gpu = platform.device(0).unwrap();
        assert_eq!(gpu.name().unwrap(), "clkit host GPU");
        assert!(gpu.is_type(cl::DEVICE_TYPE_GPU).unwrap());
        assert!(gpu.is_type(cl::DEVICE_TYPE_DEFAULT).unwrap());
        assert_eq!(gpu.type_name().unwrap(), "GPU");
        assert_eq!(gpu.max_work_item_sizes().unwrap(), vec![256, 256, 64]);
        assert_eq!(gpu.max_work_group_size().unwrap(), 256);
        assert_eq!(gpu.api_version().unwrap(), ApiVersion::new(1, 2));
        assert_eq!(gpu.built_in_kernels().unwrap(), ["copy_bytes", "fill_bytes"]);
        assert!(gpu.image_support().unwrap());
        let cpu = platform.device(1).unwrap();
        assert!(cpu.built_in_kernels().unwrap().is_empty());
        assert_eq!(cpu.platform().unwrap(), platform);
    }

    #[test]
    fn device_type_names() {
        assert_eq!(device_type_name(cl::DEVICE_TYPE_CPU | cl::DEVICE_TYPE_DEFAULT), "CPU");
        assert_eq!(device_type_name(cl::DEVICE_TYPE_ACCELERATOR), "accelerator");
        assert_eq!(device_type_name(0), "unknown");
    }

    #[test]
    fn sub_devices() {
        let _guard = crate::test_lock();
        {
            let platform = Platform::all().unwrap().remove(0);
            let cpu = platform.device(1).unwrap();
            assert_eq!(cpu.parent_device().unwrap(), None);
            assert_eq!(cpu.partition().unwrap(), None);
            assert_eq!(cpu.partition_max_sub_devices().unwrap(), cpu.max_compute_units().unwrap());
            let halves = cpu.create_sub_devices(&Partition::Equally(2)).unwrap();
            assert_eq!(halves.len(), 2);
            for half in halves.iter() {
                assert_eq!(half.max_compute_units().unwrap(), 2);
                assert_eq!(half.parent_device().unwrap(), Some(cpu.clone()));
                assert_eq!(half.partition().unwrap(), Some(Partition::Equally(2)));
                assert_eq!(half.platform().unwrap(), platform);
            }
            let counts = Partition::ByCounts(vec![1, 3]);
            let uneven = cpu.create_sub_devices(&counts).unwrap();
            assert_eq!(uneven[1].max_compute_units().unwrap(), 3);
            assert_eq!(uneven[0].partition().unwrap(), Some(counts));
            let error = cpu.create_sub_devices(&Partition::ByCounts(vec![4, 1])).unwrap_err();
            assert_eq!(error.native_code(), Some(cl::INVALID_DEVICE_PARTITION_COUNT));
            let error = cpu.create_sub_devices(&Partition::Equally(5)).unwrap_err();
            assert_eq!(error.native_code(), Some(cl::DEVICE_PARTITION_FAILED));
            let gpu = platform.device(0).unwrap();
            assert_eq!(gpu.partition_max_sub_devices().unwrap(), 0);
            assert!(gpu.create_sub_devices(&Partition::Equally(1)).is_err());
        }
        assert!(memcheck());
    }

    #[test]
    fn partition_lists() {
        let affinity = Partition::ByAffinityDomain(cl::DEVICE_AFFINITY_DOMAIN_NUMA);
        assert_eq!(Partition::from_list(&affinity.to_list()).unwrap(), Some(affinity));
        assert_eq!(
            Partition::ByCounts(vec![2, 2]).to_list(),
            [cl::DEVICE_PARTITION_BY_COUNTS, 2, 2, cl::DEVICE_PARTITION_BY_COUNTS_LIST_END, 0]
        );
        assert_eq!(Partition::from_list(&[]).unwrap(), None);
        assert!(Partition::from_list(&[1]).is_err());
    }
}
