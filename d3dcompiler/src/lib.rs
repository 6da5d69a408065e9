//! d3dcompiler-compatible shader compiler on top of vkd3d-shader
//!
//! This crate exports `D3DCompile`, `D3DCompile2` and `D3DCreateBlob` with
//! the same C signatures as `d3dcompiler_47.dll`, so existing callers can
//! link against it unmodified. Compilation itself is delegated to a
//! [`backend::ShaderBackend`]; the exports use vkd3d-shader, loaded at
//! runtime, unless a table of precompiled shaders was installed with
//! [`backend::FixtureBackend::install`].

#![allow(non_snake_case)]
#![allow(non_camel_case_types)]
#![allow(clippy::missing_safety_doc)]

pub mod backend;
pub mod blob;
pub mod compile;
pub mod result;

use d3dcompiler_proc::com_interface;
use log::{trace, warn};
use std::ffi::{c_char, c_void};
use std::fmt;
use thiserror::Error;

pub use blob::{BlobAllocator, HeapAllocator, OwnedBlob, RefCount, blob_from_bytes, create_blob};
pub use compile::{CompileOutput, CompileRequest, Outputs, compile2, compile2_with};
pub use result::hresult_from_backend;

#[derive(Error, Debug)]
pub enum D3DCompilerError {
    #[error("Failed to load backend: {0}")]
    LoadError(String),
    #[error("Function not found: {0}")]
    FunctionNotFound(String),
    #[error("Backend support was not compiled in")]
    Unsupported,
}

pub type Result<T> = std::result::Result<T, D3DCompilerError>;

// D3D Compiler types
pub type HRESULT = i32;
pub type UINT = u32;
pub type ULONG = u32;
pub type SIZE_T = usize;
pub type LPCSTR = *const c_char;
pub type LPCVOID = *const c_void;

pub const S_OK: HRESULT = 0;
pub const E_FAIL: HRESULT = 0x80004005u32 as i32;
pub const E_NOTIMPL: HRESULT = 0x80004001u32 as i32;
pub const E_OUTOFMEMORY: HRESULT = 0x8007000Eu32 as i32;
pub const E_INVALIDARG: HRESULT = 0x80070057u32 as i32;

/// Keep debug information in the output (`D3DCOMPILE_DEBUG`)
pub const D3DCOMPILE_DEBUG: UINT = 0x1;

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct GUID {
    pub Data1: u32,
    pub Data2: u16,
    pub Data3: u16,
    pub Data4: [u8; 8],
}

pub type REFIID = *const GUID;

impl fmt::Display for GUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uuid = uuid::Uuid::from_fields(self.Data1, self.Data2, self.Data3, &self.Data4);
        write!(f, "{{{}}}", uuid.hyphenated())
    }
}

impl fmt::Debug for GUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GUID({self})")
    }
}

com_interface! {
    /// `ID3DBlob` / `ID3D10Blob`: a reference-counted byte buffer
    interface ID3DBlob(ID3DBlobVtbl) => BlobInterface {
        fn QueryInterface(riid: REFIID, ppv: *mut *mut c_void) -> HRESULT => query_interface;
        fn AddRef() -> ULONG => add_ref;
        fn Release() -> ULONG => release;
        fn GetBufferPointer() -> *mut c_void => buffer_pointer;
        fn GetBufferSize() -> SIZE_T => buffer_size;
    }
}

pub type ID3D10Blob = ID3DBlob;

// D3D_SHADER_MACRO
#[repr(C)]
pub struct D3D_SHADER_MACRO {
    pub Name: LPCSTR,
    pub Definition: LPCSTR,
}

/// Include handler interface. Accepted for signature compatibility; include
/// resolution is left to the backend.
#[repr(C)]
pub struct ID3DInclude {
    pub vtable: *const ID3DIncludeVtbl,
}

#[repr(C)]
pub struct ID3DIncludeVtbl {
    pub Open: unsafe extern "C" fn(
        *mut ID3DInclude,
        u32,
        LPCSTR,
        LPCVOID,
        *mut LPCVOID,
        *mut UINT,
    ) -> HRESULT,
    pub Close: unsafe extern "C" fn(*mut ID3DInclude, LPCVOID) -> HRESULT,
}

fn with_default_backend(
    request: &CompileRequest<'_>,
    outputs: Outputs,
) -> std::result::Result<CompileOutput, HRESULT> {
    if let Some(fixtures) = backend::FixtureBackend::installed() {
        return Ok(compile2(fixtures, request, outputs));
    }
    with_library_backend(request, outputs)
}

#[cfg(feature = "vkd3d")]
fn with_library_backend(
    request: &CompileRequest<'_>,
    outputs: Outputs,
) -> std::result::Result<CompileOutput, HRESULT> {
    match backend::Vkd3dShader::global() {
        Ok(backend) => Ok(compile2(backend, request, outputs)),
        Err(err) => {
            warn!("{err}");
            Err(E_FAIL)
        }
    }
}

#[cfg(not(feature = "vkd3d"))]
fn with_library_backend(
    _request: &CompileRequest<'_>,
    _outputs: Outputs,
) -> std::result::Result<CompileOutput, HRESULT> {
    warn!("{}", D3DCompilerError::Unsupported);
    Err(E_FAIL)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn D3DCreateBlob(Size: SIZE_T, ppBlob: *mut *mut ID3DBlob) -> HRESULT {
    trace!("D3DCreateBlob(size {Size}, blob {ppBlob:?})");
    unsafe { blob::create_blob_into(Size, ppBlob) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn D3DCompile2(
    pSrcData: LPCVOID,
    SrcDataSize: SIZE_T,
    pSourceName: LPCSTR,
    pDefines: *const D3D_SHADER_MACRO,
    pInclude: *mut ID3DInclude,
    pEntrypoint: LPCSTR,
    pTarget: LPCSTR,
    Flags1: UINT,
    Flags2: UINT,
    SecondaryDataFlags: UINT,
    pSecondaryData: LPCVOID,
    SecondaryDataSize: SIZE_T,
    ppCode: *mut *mut ID3DBlob,
    ppErrorMsgs: *mut *mut ID3DBlob,
) -> HRESULT {
    trace!(
        "D3DCompile2(data {pSrcData:?}, size {SrcDataSize}, defines {pDefines:?}, \
         include {pInclude:?}, flags {Flags1:#x}, effect flags {Flags2:#x}, \
         secondary flags {SecondaryDataFlags:#x}, secondary data {pSecondaryData:?}, \
         secondary size {SecondaryDataSize}, code {ppCode:?}, errors {ppErrorMsgs:?})"
    );

    unsafe {
        if !ppErrorMsgs.is_null() {
            *ppErrorMsgs = std::ptr::null_mut();
        }

        let request = match CompileRequest::from_raw(
            pSrcData,
            SrcDataSize,
            pSourceName,
            pDefines,
            pEntrypoint,
            pTarget,
            Flags1,
            Flags2,
            SecondaryDataFlags,
            pSecondaryData,
            SecondaryDataSize,
        ) {
            Ok(request) => request,
            Err(hr) => return hr,
        };
        trace!(
            "D3DCompile2 name {:?}, entry point {:?}, profile {:?}",
            request.source_name, request.entry_point, request.profile
        );

        let outputs = Outputs {
            shader: !ppCode.is_null(),
            messages: !ppErrorMsgs.is_null(),
        };
        match with_default_backend(&request, outputs) {
            Ok(output) => output.store(ppCode, ppErrorMsgs),
            Err(hr) => hr,
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn D3DCompile(
    pSrcData: LPCVOID,
    SrcDataSize: SIZE_T,
    pSourceName: LPCSTR,
    pDefines: *const D3D_SHADER_MACRO,
    pInclude: *mut ID3DInclude,
    pEntrypoint: LPCSTR,
    pTarget: LPCSTR,
    Flags1: UINT,
    Flags2: UINT,
    ppCode: *mut *mut ID3DBlob,
    ppErrorMsgs: *mut *mut ID3DBlob,
) -> HRESULT {
    trace!("D3DCompile(data {pSrcData:?}, size {SrcDataSize}, flags {Flags1:#x}, {Flags2:#x})");
    unsafe {
        D3DCompile2(
            pSrcData,
            SrcDataSize,
            pSourceName,
            pDefines,
            pInclude,
            pEntrypoint,
            pTarget,
            Flags1,
            Flags2,
            0,
            std::ptr::null(),
            0,
            ppCode,
            ppErrorMsgs,
        )
    }
}
