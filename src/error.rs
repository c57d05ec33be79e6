/*!
Errors.

Every fallible operation returns [`Result`](crate::result::Result). An [`Error`] carries its
[`ErrorKind`], a message and the source location that raised it. Failures of the native API keep
the native status code verbatim in [`ErrorKind::Native`].

```
# use clkit::error::{native_error_name, Domain, ErrorKind};
assert_eq!(ErrorKind::Native(-11).domain(), Domain::Native);
assert_eq!(native_error_name(-11), "CL_BUILD_PROGRAM_FAILURE");
```
*/

use crate::cl;
use std::{
    fmt::{self, Display},
    panic::Location,
};

/// Which layer reported the failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, derive_more::Display)]
pub enum Domain {
    /// Raised by the wrappers themselves.
    #[display(fmt = "wrapper")]
    Wrapper,
    /// Returned by the native API.
    #[display(fmt = "native")]
    Native,
}

/// Kinds of errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, derive_more::IsVariant)]
pub enum ErrorKind {
    /// An argument was rejected before reaching the native API.
    InvalidArgument,
    /// An index or size is out of range.
    OutOfRange,
    /// The operation is not supported by the platform or the runtime.
    Unsupported,
    /// The native API returned the status code.
    Native(i32),
    /// Broken internal invariant.
    Internal,
}

impl ErrorKind {
    /// The domain of the error.
    pub fn domain(&self) -> Domain {
        if let Self::Native(_) = self {
            Domain::Native
        } else {
            Domain::Wrapper
        }
    }
    /// The integer code.
    ///
    /// The native status code for [`Native`](Self::Native), otherwise a stable positive code.
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidArgument => 1,
            Self::OutOfRange => 2,
            Self::Unsupported => 3,
            Self::Internal => 4,
            Self::Native(code) => *code,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidArgument => f.write_str("invalid argument"),
            Self::OutOfRange => f.write_str("out of range"),
            Self::Unsupported => f.write_str("unsupported"),
            Self::Internal => f.write_str("internal error"),
            Self::Native(code) => write!(f, "native error {code} ({})", native_error_name(*code)),
        }
    }
}

/// An error.
#[derive(Clone, Debug, thiserror::Error)]
#[error("[{}] {kind}: {message} at {location}", .kind.domain())]
pub struct Error {
    kind: ErrorKind,
    message: String,
    location: &'static Location<'static>,
}

impl Error {
    /// Creates an error located at the caller.
    #[track_caller]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: Location::caller(),
        }
    }
    #[track_caller]
    pub(crate) fn native(code: i32, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Native(code), message)
    }
    #[track_caller]
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }
    #[track_caller]
    pub(crate) fn out_of_range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OutOfRange, message)
    }
    #[track_caller]
    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported, message)
    }
    #[track_caller]
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
    /// The kind of error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
    /// The domain of the error.
    pub fn domain(&self) -> Domain {
        self.kind.domain()
    }
    /// The integer code, see [`ErrorKind::code`].
    pub fn code(&self) -> i32 {
        self.kind.code()
    }
    /// The native status code, if the native API failed.
    pub fn native_code(&self) -> Option<i32> {
        if let ErrorKind::Native(code) = self.kind {
            Some(code)
        } else {
            None
        }
    }
    /// The human readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
    /// Where the error was raised.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

/// Converts native status results into [`Error`]s.
pub(crate) trait NativeResultExt<T> {
    fn or_native(self, what: impl Display) -> Result<T, Error>;
}

impl<T> NativeResultExt<T> for Result<T, i32> {
    #[track_caller]
    fn or_native(self, what: impl Display) -> Result<T, Error> {
        match self {
            Ok(x) => Ok(x),
            Err(code) => Err(Error::native(code, format!("unable to {what}"))),
        }
    }
}

macro_rules! native_error_names {
    ($($name:ident),* $(,)?) => {
        /// The symbolic name of a native status code.
        pub fn native_error_name(code: i32) -> &'static str {
            match code {
                $(cl::$name => concat!("CL_", stringify!($name)),)*
                _ => "CL_UNKNOWN_ERROR_CODE",
            }
        }
    };
}

native_error_names! {
    SUCCESS,
    DEVICE_NOT_FOUND,
    DEVICE_NOT_AVAILABLE,
    COMPILER_NOT_AVAILABLE,
    MEM_OBJECT_ALLOCATION_FAILURE,
    OUT_OF_RESOURCES,
    OUT_OF_HOST_MEMORY,
    PROFILING_INFO_NOT_AVAILABLE,
    MEM_COPY_OVERLAP,
    IMAGE_FORMAT_MISMATCH,
    IMAGE_FORMAT_NOT_SUPPORTED,
    BUILD_PROGRAM_FAILURE,
    MAP_FAILURE,
    MISALIGNED_SUB_BUFFER_OFFSET,
    EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST,
    COMPILE_PROGRAM_FAILURE,
    LINKER_NOT_AVAILABLE,
    LINK_PROGRAM_FAILURE,
    DEVICE_PARTITION_FAILED,
    KERNEL_ARG_INFO_NOT_AVAILABLE,
    INVALID_VALUE,
    INVALID_DEVICE_TYPE,
    INVALID_PLATFORM,
    INVALID_DEVICE,
    INVALID_CONTEXT,
    INVALID_QUEUE_PROPERTIES,
    INVALID_COMMAND_QUEUE,
    INVALID_HOST_PTR,
    INVALID_MEM_OBJECT,
    INVALID_IMAGE_FORMAT_DESCRIPTOR,
    INVALID_IMAGE_SIZE,
    INVALID_SAMPLER,
    INVALID_BINARY,
    INVALID_BUILD_OPTIONS,
    INVALID_PROGRAM,
    INVALID_PROGRAM_EXECUTABLE,
    INVALID_KERNEL_NAME,
    INVALID_KERNEL_DEFINITION,
    INVALID_KERNEL,
    INVALID_ARG_INDEX,
    INVALID_ARG_VALUE,
    INVALID_ARG_SIZE,
    INVALID_KERNEL_ARGS,
    INVALID_WORK_DIMENSION,
    INVALID_WORK_GROUP_SIZE,
    INVALID_WORK_ITEM_SIZE,
    INVALID_GLOBAL_OFFSET,
    INVALID_EVENT_WAIT_LIST,
    INVALID_EVENT,
    INVALID_OPERATION,
    INVALID_GL_OBJECT,
    INVALID_BUFFER_SIZE,
    INVALID_MIP_LEVEL,
    INVALID_GLOBAL_WORK_SIZE,
    INVALID_PROPERTY,
    INVALID_IMAGE_DESCRIPTOR,
    INVALID_COMPILER_OPTIONS,
    INVALID_LINKER_OPTIONS,
    INVALID_DEVICE_PARTITION_COUNT,
    INVALID_PIPE_SIZE,
    INVALID_DEVICE_QUEUE,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_error_display() {
        let error: Result<(), _> = Err(cl::BUILD_PROGRAM_FAILURE).or_native("build program");
        let error = error.unwrap_err();
        assert_eq!(error.domain(), Domain::Native);
        assert_eq!(error.code(), -11);
        assert_eq!(error.native_code(), Some(-11));
        let message = error.to_string();
        assert!(message.starts_with("[native] native error -11 (CL_BUILD_PROGRAM_FAILURE): unable to build program at "));
        assert!(message.contains("error.rs"));
    }

    #[test]
    fn wrapper_errors() {
        let error = Error::out_of_range("device index 3 is out of range 0..2");
        assert!(error.kind().is_out_of_range());
        assert_eq!(error.domain(), Domain::Wrapper);
        assert_eq!(error.native_code(), None);
        assert_eq!(error.location().file(), file!());
    }

    #[test]
    fn unknown_code() {
        assert_eq!(native_error_name(-1000), "CL_UNKNOWN_ERROR_CODE");
        assert_eq!(native_error_name(0), "CL_SUCCESS");
        assert_eq!(native_error_name(-70), "CL_INVALID_DEVICE_QUEUE");
    }
}
