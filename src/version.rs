use serde::{Deserialize, Serialize};
use std::{borrow::Cow, str::FromStr};

pub mod error {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("ApiVersionFromStrError: expected \"major[.minor]\", found {:?}!", .input)]
    pub struct ApiVersionFromStrError {
        pub(super) input: Cow<'static, str>,
    }
}
use error::*;

/// The version of the compute API implemented by a platform or device.
#[derive(
    Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize, Debug, derive_more::Display,
)]
#[display(fmt = "{}.{}", major, minor)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
    /// Parses a version string as reported by platforms and devices.
    ///
    /// The string has the form `"OpenCL <major>.<minor> <vendor specific>"`.
    /// ```
    /// # use clkit::version::ApiVersion;
    /// let version = ApiVersion::from_version_string("OpenCL 1.2 CUDA 12.0").unwrap();
    /// assert_eq!(version, ApiVersion::new(1, 2));
    /// ```
    pub fn from_version_string(input: &str) -> Result<Self, ApiVersionFromStrError> {
        let mut words = input.split_whitespace();
        match (words.next(), words.next()) {
            (Some("OpenCL"), Some(version)) => version.parse(),
            _ => Err(ApiVersionFromStrError {
                input: input.to_string().into(),
            }),
        }
    }
}

impl FromStr for ApiVersion {
    type Err = ApiVersionFromStrError;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let error = || ApiVersionFromStrError {
            input: input.to_string().into(),
        };
        let mut iter = input.split('.');
        let major = match iter.next() {
            Some(x) => u32::from_str(x).map_err(|_| error())?,
            None => return Err(error()),
        };
        let minor = match iter.next() {
            Some(x) => u32::from_str(x).map_err(|_| error())?,
            None => 0,
        };
        if iter.next().is_some() {
            return Err(error());
        }
        Ok(Self { major, minor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_version_from_str() {
        assert_eq!("2.0".parse::<ApiVersion>().unwrap(), ApiVersion::new(2, 0));
        assert_eq!("3".parse::<ApiVersion>().unwrap(), ApiVersion::new(3, 0));
        assert!("1.2.3".parse::<ApiVersion>().is_err());
        assert!("one".parse::<ApiVersion>().is_err());
        assert!(ApiVersion::new(1, 2) < ApiVersion::new(2, 0));
        assert_eq!(ApiVersion::new(1, 2).to_string(), "1.2");
    }

    #[test]
    fn version_string() {
        assert_eq!(
            ApiVersion::from_version_string("OpenCL 2.0 clkit-host").unwrap(),
            ApiVersion::new(2, 0)
        );
        let error = ApiVersion::from_version_string("CUDA 12.0").unwrap_err();
        assert!(error.to_string().contains("CUDA 12.0"));
    }
}
