/*!
Runtime configuration.

Read once from the environment when the runtime backend is first used.

- `CLKIT_BACKEND`: `auto` (default), `host` or `opencl`.
- `CLKIT_OPENCL_LIB`: path of the OpenCL library to load instead of the system default.
*/

use std::{borrow::Cow, path::PathBuf, str::FromStr};

/// Errors.
pub mod error {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("BackendKindFromStrError: expected \"auto\", \"host\" or \"opencl\", found {:?}!", .input)]
    pub struct BackendKindFromStrError {
        pub(super) input: Cow<'static, str>,
    }
}
use error::*;

/// Environment variable selecting the backend.
pub const BACKEND_VAR: &str = "CLKIT_BACKEND";
/// Environment variable overriding the OpenCL library path.
pub const OPENCL_LIB_VAR: &str = "CLKIT_OPENCL_LIB";

/// Which runtime services the native calls.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, derive_more::Display)]
pub enum BackendKind {
    /// The OpenCL library if it loads and reports a platform, otherwise the host runtime.
    #[default]
    #[display(fmt = "auto")]
    Auto,
    /// The in-process host runtime.
    #[display(fmt = "host")]
    Host,
    /// The OpenCL library.
    #[display(fmt = "opencl")]
    OpenCl,
}

impl FromStr for BackendKind {
    type Err = BackendKindFromStrError;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "host" => Ok(Self::Host),
            "opencl" | "ocl" => Ok(Self::OpenCl),
            _ => Err(BackendKindFromStrError {
                input: input.to_string().into(),
            }),
        }
    }
}

/// Runtime configuration.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// The backend to use.
    pub backend: BackendKind,
    /// Overrides the OpenCL library path.
    pub opencl_library: Option<PathBuf>,
}

impl Config {
    /// Reads the configuration from the environment.
    ///
    /// Invalid values are logged and replaced by their defaults.
    pub fn from_env() -> Self {
        let backend = match std::env::var(BACKEND_VAR) {
            Ok(value) => BackendKind::from_str(&value).unwrap_or_else(|e| {
                log::warn!("{BACKEND_VAR}: {e}");
                BackendKind::default()
            }),
            Err(_) => BackendKind::default(),
        };
        let opencl_library = std::env::var_os(OPENCL_LIB_VAR).map(PathBuf::from);
        Self {
            backend,
            opencl_library,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_from_str() {
        assert_eq!(BackendKind::from_str("host").unwrap(), BackendKind::Host);
        assert_eq!(BackendKind::from_str(" OpenCL ").unwrap(), BackendKind::OpenCl);
        assert_eq!(BackendKind::from_str("").unwrap(), BackendKind::Auto);
        let error = BackendKind::from_str("vulkan").unwrap_err();
        assert!(error.to_string().contains("\"vulkan\""));
    }
}
