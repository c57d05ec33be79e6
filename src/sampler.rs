/*!
Samplers.

A sampler is created from [`SamplerProperties`], or from a zero terminated property list
`[name, value, ..., 0]` as used by the native API. Absent properties take their default, unknown
ones are ignored.
```
# use clkit::{cl, context::Context, sampler::Sampler};
# fn main() -> clkit::result::Result<()> {
# clkit::runtime::install_host().ok();
let context = Context::new_any()?;
let sampler = Sampler::from_properties(
    &context,
    &[
        cl::SAMPLER_NORMALIZED_COORDS as u64, 0,
        cl::SAMPLER_ADDRESSING_MODE as u64, cl::ADDRESS_CLAMP_TO_EDGE as u64,
        0,
    ],
)?;
assert!(!sampler.normalized_coords()?);
assert_eq!(sampler.filter_mode()?, cl::FILTER_NEAREST);
# Ok(())
# }
```
*/

use crate::{
    cl,
    context::{Context, ContextKind},
    error::{Error, NativeResultExt},
    result::Result,
    runtime::backend,
    version::ApiVersion,
    wrapper::{impl_kind, impl_wrapper, info_getters, Wrapper},
};

/// Sampler state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SamplerProperties {
    pub normalized_coords: bool,
    /// One of `cl::ADDRESS_*`.
    pub addressing_mode: u32,
    /// One of `cl::FILTER_*`.
    pub filter_mode: u32,
}

impl Default for SamplerProperties {
    fn default() -> Self {
        Self {
            normalized_coords: true,
            addressing_mode: cl::ADDRESS_CLAMP,
            filter_mode: cl::FILTER_NEAREST,
        }
    }
}

impl SamplerProperties {
    /// Parses a zero terminated `[name, value, ..., 0]` list.
    ///
    /// The list may also end without the terminator. Unknown names are skipped with their value.
    ///
    /// **errors**
    /// - [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument): A name has no value.
    #[track_caller]
    pub fn from_list(list: &[u64]) -> Result<Self> {
        let mut properties = Self::default();
        let mut iter = list.iter().copied();
        while let Some(name) = iter.next() {
            if name == 0 {
                break;
            }
            let value = iter.next().ok_or_else(|| {
                Error::invalid_argument(format!("sampler property {name:#x} has no value"))
            })?;
            match u32::try_from(name) {
                Ok(cl::SAMPLER_NORMALIZED_COORDS) => properties.normalized_coords = value != 0,
                Ok(cl::SAMPLER_ADDRESSING_MODE) => properties.addressing_mode = value as u32,
                Ok(cl::SAMPLER_FILTER_MODE) => properties.filter_mode = value as u32,
                _ => log::debug!("ignoring sampler property {name:#x}"),
            }
        }
        Ok(properties)
    }
    /// The zero terminated property list, with every property present.
    pub fn to_list(&self) -> [u64; 7] {
        [
            cl::SAMPLER_NORMALIZED_COORDS.into(),
            self.normalized_coords.into(),
            cl::SAMPLER_ADDRESSING_MODE.into(),
            self.addressing_mode.into(),
            cl::SAMPLER_FILTER_MODE.into(),
            self.filter_mode.into(),
            0,
        ]
    }
}

impl_kind!(SamplerKind, Sampler, Sampler, ());

/// A sampler.
#[derive(Clone, derive_more::Deref)]
pub struct Sampler {
    #[deref]
    wrapper: Wrapper<SamplerKind>,
}

impl_wrapper!(Sampler, SamplerKind);

impl Sampler {
    /// Creates a sampler.
    ///
    /// Platforms of version 2.0 or later are passed the property list, older platforms use the
    /// legacy constructor.
    pub fn new(context: &Context, properties: &SamplerProperties) -> Result<Self> {
        let handle = if context.api_version()? >= ApiVersion::new(2, 0) {
            backend().create_sampler_with_properties(context.handle(), &properties.to_list())
        } else {
            backend().create_sampler(
                context.handle(),
                properties.normalized_coords,
                properties.addressing_mode,
                properties.filter_mode,
            )
        }
        .or_native(format!("create sampler {properties:?}"))?;
        Self::wrap(handle)
    }
    /// Creates a sampler from a zero terminated property list, see [`SamplerProperties::from_list`].
    #[track_caller]
    pub fn from_properties(context: &Context, list: &[u64]) -> Result<Self> {
        Self::new(context, &SamplerProperties::from_list(list)?)
    }
    info_getters! {
        pub fn normalized_coords() -> bool = info_bool(cl::SAMPLER_NORMALIZED_COORDS);
        pub fn addressing_mode() -> u32 = info_scalar(cl::SAMPLER_ADDRESSING_MODE);
        pub fn filter_mode() -> u32 = info_scalar(cl::SAMPLER_FILTER_MODE);
    }
    /// The sampler state read back from the native object.
    pub fn properties(&self) -> Result<SamplerProperties> {
        Ok(SamplerProperties {
            normalized_coords: self.normalized_coords()?,
            addressing_mode: self.addressing_mode()?,
            filter_mode: self.filter_mode()?,
        })
    }
    pub fn context(&self) -> Result<Context> {
        self.info_wrapper::<ContextKind>(cl::SAMPLER_CONTEXT)
            .map(Context::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dev_container::DevContainer, platform::Platform, wrapper::memcheck};

    #[test]
    fn parse_properties() {
        let list = [
            cl::SAMPLER_FILTER_MODE as u64,
            cl::FILTER_LINEAR as u64,
            0x7777,
            1,
            0,
            cl::SAMPLER_NORMALIZED_COORDS as u64,
            0,
        ];
        let properties = SamplerProperties::from_list(&list).unwrap();
        assert_eq!(
            properties,
            SamplerProperties {
                filter_mode: cl::FILTER_LINEAR,
                ..SamplerProperties::default()
            }
        );
        assert_eq!(SamplerProperties::from_list(&properties.to_list()).unwrap(), properties);
        assert_eq!(SamplerProperties::from_list(&[]).unwrap(), SamplerProperties::default());
        let error = SamplerProperties::from_list(&[cl::SAMPLER_FILTER_MODE as u64]).unwrap_err();
        assert!(error.kind().is_invalid_argument());
    }

    #[test]
    fn sampler_per_version() {
        let _guard = crate::test_lock();
        {
            let properties = SamplerProperties {
                normalized_coords: false,
                addressing_mode: cl::ADDRESS_CLAMP_TO_EDGE,
                filter_mode: cl::FILTER_NEAREST,
            };
            for platform in Platform::all().unwrap() {
                let context = Context::from_devices(platform.all_devices().unwrap()).unwrap();
                let sampler = Sampler::new(&context, &properties).unwrap();
                assert_eq!(sampler.properties().unwrap(), properties);
                assert_eq!(sampler.context().unwrap(), context);
            }
        }
        assert!(memcheck());
    }

    #[test]
    fn sampler_errors() {
        let _guard = crate::test_lock();
        let context = Context::new_gpu().unwrap();
        let properties = SamplerProperties {
            normalized_coords: false,
            addressing_mode: cl::ADDRESS_REPEAT,
            ..SamplerProperties::default()
        };
        let error = Sampler::new(&context, &properties).unwrap_err();
        assert_eq!(error.native_code(), Some(cl::INVALID_VALUE));
    }
}
