//! Error types for d3dcrs operations

use std::fmt;
use thiserror::Error;

/// HRESULT error codes from the compiler entry points
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HResult(pub i32);

impl HResult {
    /// Success
    pub const S_OK: HResult = HResult(d3dcompiler::S_OK);
    /// Generic failure
    pub const E_FAIL: HResult = HResult(d3dcompiler::E_FAIL);
    /// Invalid argument
    pub const E_INVALIDARG: HResult = HResult(d3dcompiler::E_INVALIDARG);
    /// Allocation failure
    pub const E_OUTOFMEMORY: HResult = HResult(d3dcompiler::E_OUTOFMEMORY);
    /// Request not supported by the backend
    pub const E_NOTIMPL: HResult = HResult(d3dcompiler::E_NOTIMPL);

    /// Returns true if the result indicates success
    #[inline]
    pub fn is_success(&self) -> bool {
        self.0 >= 0
    }

    /// Returns true if the result indicates an error
    #[inline]
    pub fn is_error(&self) -> bool {
        self.0 < 0
    }

    /// Returns the raw HRESULT value
    #[inline]
    pub fn code(&self) -> i32 {
        self.0
    }
}

impl fmt::Debug for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HResult(0x{:08x})", self.0 as u32)
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0 as u32)
    }
}

impl From<i32> for HResult {
    fn from(hr: i32) -> Self {
        HResult(hr)
    }
}

/// Error type for d3dcrs operations
#[derive(Error, Debug)]
pub enum Error {
    /// Shader compilation failed
    #[error("Compilation failed: {message}")]
    Compilation {
        /// The HRESULT error code
        hresult: HResult,
        /// Error message from the compiler
        message: String,
    },

    /// Create blob failed
    #[error("Create blob failed (HRESULT: {hresult})")]
    CreateBlob {
        /// The HRESULT error code
        hresult: HResult,
    },

    /// Invalid parameter provided
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The process-wide backend could not be loaded
    #[error("Backend unavailable: {0}")]
    Backend(String),

    /// UTF-8 encoding error
    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Result type for d3dcrs operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hresult_display() {
        assert_eq!(HResult::E_FAIL.to_string(), "0x80004005");
        assert_eq!(format!("{:?}", HResult::E_INVALIDARG), "HResult(0x80070057)");
        assert!(HResult::S_OK.is_success());
        assert!(HResult::E_OUTOFMEMORY.is_error());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::Compilation {
            hresult: HResult::E_FAIL,
            message: "shader.hlsl:1:1: E5000: syntax error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Compilation failed: shader.hlsl:1:1: E5000: syntax error"
        );
        assert_eq!(
            Error::CreateBlob {
                hresult: HResult::E_OUTOFMEMORY
            }
            .to_string(),
            "Create blob failed (HRESULT: 0x8007000e)"
        );
    }
}
