//! RAII wrapper for ID3DBlob

use crate::{Error, HResult, Result};
use d3dcompiler::{ID3DBlob, OwnedBlob};
use std::ops::Deref;

/// Owned reference to an `ID3DBlob`
///
/// Provides safe access to blob data and automatic cleanup via Drop.
pub struct Blob {
    inner: OwnedBlob,
}

impl Blob {
    pub(crate) fn from_owned(inner: OwnedBlob) -> Self {
        Blob { inner }
    }

    /// Takes ownership of one reference held by `ptr`.
    ///
    /// # Safety
    /// The pointer must be a valid ID3DBlob pointer or null.
    /// Takes ownership of the reference count (does not AddRef).
    pub unsafe fn from_raw(ptr: *mut ID3DBlob) -> Option<Self> {
        unsafe { OwnedBlob::from_raw(ptr) }.map(Blob::from_owned)
    }

    /// Creates a new zero-filled blob with the specified size.
    pub fn new(size: usize) -> Result<Self> {
        d3dcompiler::create_blob(size)
            .map(Blob::from_owned)
            .map_err(|hr| Error::CreateBlob {
                hresult: HResult(hr),
            })
    }

    /// Creates a blob holding a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        d3dcompiler::blob_from_bytes(bytes)
            .map(Blob::from_owned)
            .map_err(|hr| Error::CreateBlob {
                hresult: HResult(hr),
            })
    }

    /// Returns the blob data as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    /// Returns the blob data as a mutable byte slice.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.inner.as_bytes_mut()
    }

    /// Returns the size of the blob in bytes.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if the blob is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Interprets the blob as a UTF-8 string.
    ///
    /// Useful for compiler messages. Trailing null bytes are trimmed.
    pub fn as_str(&self) -> Result<&str> {
        std::str::from_utf8(trim_nuls(self.as_bytes())).map_err(Into::into)
    }

    /// Converts the blob to a String, trimming trailing nulls.
    ///
    /// Invalid UTF-8 is replaced rather than reported.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(trim_nuls(self.as_bytes())).into_owned()
    }

    /// Returns the raw pointer without touching the reference count.
    pub fn as_ptr(&self) -> *mut ID3DBlob {
        self.inner.as_ptr()
    }

    /// Releases ownership, returning the raw pointer with its reference.
    pub fn into_raw(self) -> *mut ID3DBlob {
        self.inner.into_raw()
    }
}

fn trim_nuls(bytes: &[u8]) -> &[u8] {
    bytes
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| &bytes[..=i])
        .unwrap_or(&[])
}

impl Deref for Blob {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for Blob {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob")
            .field("len", &self.len())
            .field("ptr", &self.as_ptr())
            .finish()
    }
}
