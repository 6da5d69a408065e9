//! vkd3d-shader backend, bound at runtime
//!
//! The shared library is opened with `dlopen` the first time a compile is
//! requested. Lookup order:
//!
//! 1. `$D3DCOMPILER_VKD3D_PATH`, if set (no fallback when it fails)
//! 2. the library next to the current executable
//! 3. the platform library names through the dynamic loader search path

#![allow(non_camel_case_types)]

use super::{
    BackendOutput, CompileInfo, CompileOptionName, LogLevel, ShaderBackend, SourceType,
    TargetType,
};
use crate::{D3DCompilerError, Result};
use log::debug;
use std::ffi::{CStr, c_char, c_int, c_uint, c_void};
use std::path::PathBuf;
use std::ptr::{self, NonNull};
use std::sync::OnceLock;

/// Environment variable overriding the library location
pub const LIBRARY_PATH_ENV: &str = "D3DCOMPILER_VKD3D_PATH";

#[cfg(target_os = "macos")]
static LIBRARY_NAMES: &[&str] = &["libvkd3d-shader.1.dylib", "libvkd3d-shader.dylib"];
#[cfg(not(target_os = "macos"))]
static LIBRARY_NAMES: &[&str] = &["libvkd3d-shader.so.1", "libvkd3d-shader.so"];

// vkd3d_shader.h enumerations
const STRUCTURE_TYPE_COMPILE_INFO: c_uint = 0;
const STRUCTURE_TYPE_HLSL_SOURCE_INFO: c_uint = 6;
const STRUCTURE_TYPE_PREPROCESS_INFO: c_uint = 7;

const SOURCE_HLSL: c_uint = 2;

const TARGET_D3D_BYTECODE: c_uint = 4;
const TARGET_DXBC_TPF: c_uint = 5;

const COMPILE_OPTION_STRIP_DEBUG: c_uint = 1;
const COMPILE_OPTION_API_VERSION: c_uint = 4;

#[repr(C)]
struct vkd3d_shader_code {
    code: *const c_void,
    size: usize,
}

#[repr(C)]
struct vkd3d_shader_compile_option {
    name: c_uint,
    value: c_uint,
}

#[repr(C)]
struct vkd3d_shader_compile_info {
    type_: c_uint,
    next: *const c_void,
    source: vkd3d_shader_code,
    source_type: c_uint,
    target_type: c_uint,
    options: *const vkd3d_shader_compile_option,
    option_count: c_uint,
    log_level: c_uint,
    source_name: *const c_char,
}

#[repr(C)]
struct vkd3d_shader_macro {
    name: *const c_char,
    value: *const c_char,
}

type PFN_vkd3d_shader_open_include = unsafe extern "C" fn(
    filename: *const c_char,
    local: bool,
    parent_data: *const c_char,
    context: *mut c_void,
    out: *mut vkd3d_shader_code,
) -> c_int;

type PFN_vkd3d_shader_close_include =
    unsafe extern "C" fn(code: *const vkd3d_shader_code, context: *mut c_void);

#[repr(C)]
struct vkd3d_shader_preprocess_info {
    type_: c_uint,
    next: *const c_void,
    macros: *const vkd3d_shader_macro,
    macro_count: c_uint,
    pfn_open_include: Option<PFN_vkd3d_shader_open_include>,
    pfn_close_include: Option<PFN_vkd3d_shader_close_include>,
    include_context: *mut c_void,
}

#[repr(C)]
struct vkd3d_shader_hlsl_source_info {
    type_: c_uint,
    next: *const c_void,
    entry_point: *const c_char,
    secondary_code: vkd3d_shader_code,
    profile: *const c_char,
}

type PFN_vkd3d_shader_compile = unsafe extern "C" fn(
    compile_info: *const vkd3d_shader_compile_info,
    out: *mut vkd3d_shader_code,
    messages: *mut *mut c_char,
) -> c_int;
type PFN_vkd3d_shader_free_messages = unsafe extern "C" fn(messages: *mut c_char);
type PFN_vkd3d_shader_free_shader_code = unsafe extern "C" fn(code: *mut vkd3d_shader_code);

/// Bytecode allocated by vkd3d-shader
pub struct Vkd3dCode(vkd3d_shader_code);

impl AsRef<[u8]> for Vkd3dCode {
    fn as_ref(&self) -> &[u8] {
        if self.0.code.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.0.code.cast(), self.0.size) }
    }
}

/// NUL-terminated diagnostic text allocated by vkd3d-shader
pub struct Vkd3dMessages(NonNull<c_char>);

impl AsRef<[u8]> for Vkd3dMessages {
    fn as_ref(&self) -> &[u8] {
        unsafe { CStr::from_ptr(self.0.as_ptr()).to_bytes() }
    }
}

/// Loaded vkd3d-shader library
pub struct Vkd3dShader {
    _handle: NonNull<c_void>,
    path: PathBuf,
    compile: PFN_vkd3d_shader_compile,
    free_messages: PFN_vkd3d_shader_free_messages,
    free_shader_code: PFN_vkd3d_shader_free_shader_code,
}

// The handle is never closed and vkd3d-shader's compile entry point is
// reentrant.
unsafe impl Send for Vkd3dShader {}
unsafe impl Sync for Vkd3dShader {}

static STATE: OnceLock<Result<Vkd3dShader>> = OnceLock::new();

impl Vkd3dShader {
    /// Returns the process-wide backend, loading it on first use.
    ///
    /// A failed load is remembered; later calls return the same error.
    pub fn global() -> std::result::Result<&'static Vkd3dShader, &'static D3DCompilerError> {
        STATE.get_or_init(Self::load).as_ref()
    }

    /// Loads the library from the first candidate location that opens.
    pub fn load() -> Result<Self> {
        let candidates = library_candidates();
        for candidate in &candidates {
            if let Some(handle) = open_library(candidate) {
                debug!("[vkd3d] opened {}", candidate.display());
                return unsafe { Self::bind(handle, candidate.clone()) };
            }
            debug!("[vkd3d] could not open {}", candidate.display());
        }
        Err(D3DCompilerError::LoadError(format!(
            "vkd3d-shader not found (tried {})",
            candidates
                .iter()
                .map(|c| c.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }

    /// Path the library was loaded from
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    unsafe fn bind(handle: NonNull<c_void>, path: PathBuf) -> Result<Self> {
        let get_fn = |name: &CStr| -> Result<*mut c_void> {
            let symbol = unsafe { find_symbol(handle, name) };
            if symbol.is_null() {
                Err(D3DCompilerError::FunctionNotFound(
                    name.to_string_lossy().into_owned(),
                ))
            } else {
                Ok(symbol)
            }
        };

        unsafe {
            Ok(Vkd3dShader {
                _handle: handle,
                path,
                compile: std::mem::transmute::<*mut c_void, PFN_vkd3d_shader_compile>(get_fn(
                    c"vkd3d_shader_compile",
                )?),
                free_messages: std::mem::transmute::<*mut c_void, PFN_vkd3d_shader_free_messages>(
                    get_fn(c"vkd3d_shader_free_messages")?,
                ),
                free_shader_code: std::mem::transmute::<
                    *mut c_void,
                    PFN_vkd3d_shader_free_shader_code,
                >(get_fn(c"vkd3d_shader_free_shader_code")?),
            })
        }
    }
}

fn library_candidates() -> Vec<PathBuf> {
    if let Some(path) = std::env::var_os(LIBRARY_PATH_ENV) {
        return vec![PathBuf::from(path)];
    }

    let mut candidates = Vec::new();
    if let Ok(exe) = std::env::current_exe() {
        candidates.extend(
            LIBRARY_NAMES
                .iter()
                .map(|name| exe.with_file_name(name))
                .filter(|path| path.exists()),
        );
    }
    candidates.extend(LIBRARY_NAMES.iter().map(PathBuf::from));
    candidates
}

#[cfg(unix)]
fn open_library(path: &std::path::Path) -> Option<NonNull<c_void>> {
    use std::os::unix::ffi::OsStrExt;

    let path = std::ffi::CString::new(path.as_os_str().as_bytes()).ok()?;
    NonNull::new(unsafe { libc::dlopen(path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) })
}

#[cfg(not(unix))]
fn open_library(_path: &std::path::Path) -> Option<NonNull<c_void>> {
    None
}

#[cfg(unix)]
unsafe fn find_symbol(handle: NonNull<c_void>, name: &CStr) -> *mut c_void {
    unsafe { libc::dlsym(handle.as_ptr(), name.as_ptr()) }
}

#[cfg(not(unix))]
unsafe fn find_symbol(_handle: NonNull<c_void>, _name: &CStr) -> *mut c_void {
    ptr::null_mut()
}

fn target_type_raw(target: TargetType) -> c_uint {
    match target {
        TargetType::DxbcTpf => TARGET_DXBC_TPF,
        TargetType::D3dBytecode => TARGET_D3D_BYTECODE,
    }
}

fn option_name_raw(name: CompileOptionName) -> c_uint {
    match name {
        CompileOptionName::StripDebug => COMPILE_OPTION_STRIP_DEBUG,
        CompileOptionName::ApiVersion => COMPILE_OPTION_API_VERSION,
    }
}

fn log_level_raw(level: LogLevel) -> c_uint {
    match level {
        LogLevel::None => 0,
        LogLevel::Error => 1,
        LogLevel::Warning => 2,
        LogLevel::Info => 3,
    }
}

fn code_raw(bytes: Option<&[u8]>) -> vkd3d_shader_code {
    match bytes {
        Some(bytes) => vkd3d_shader_code {
            code: bytes.as_ptr().cast(),
            size: bytes.len(),
        },
        None => vkd3d_shader_code {
            code: ptr::null(),
            size: 0,
        },
    }
}

impl ShaderBackend for Vkd3dShader {
    type Code = Vkd3dCode;
    type Messages = Vkd3dMessages;

    fn compile(&self, info: &CompileInfo<'_>) -> BackendOutput<Vkd3dCode, Vkd3dMessages> {
        let SourceType::Hlsl = info.source_type;

        let options: Vec<vkd3d_shader_compile_option> = info
            .options
            .iter()
            .map(|o| vkd3d_shader_compile_option {
                name: option_name_raw(o.name),
                value: o.value,
            })
            .collect();

        let macros: Vec<vkd3d_shader_macro> = info
            .preprocess
            .macros
            .iter()
            .map(|m| vkd3d_shader_macro {
                name: m.name.as_ptr(),
                value: m.value.map_or(ptr::null(), CStr::as_ptr),
            })
            .collect();

        let hlsl_info = vkd3d_shader_hlsl_source_info {
            type_: STRUCTURE_TYPE_HLSL_SOURCE_INFO,
            next: ptr::null(),
            entry_point: info.hlsl.entry_point.map_or(ptr::null(), CStr::as_ptr),
            secondary_code: code_raw(info.hlsl.secondary_code),
            profile: info.hlsl.profile.as_ptr(),
        };

        let preprocess_info = vkd3d_shader_preprocess_info {
            type_: STRUCTURE_TYPE_PREPROCESS_INFO,
            next: (&raw const hlsl_info).cast(),
            macros: if macros.is_empty() {
                ptr::null()
            } else {
                macros.as_ptr()
            },
            macro_count: macros.len() as c_uint,
            pfn_open_include: None,
            pfn_close_include: None,
            include_context: ptr::null_mut(),
        };

        let compile_info = vkd3d_shader_compile_info {
            type_: STRUCTURE_TYPE_COMPILE_INFO,
            next: (&raw const preprocess_info).cast(),
            source: code_raw(Some(info.source)),
            source_type: SOURCE_HLSL,
            target_type: target_type_raw(info.target_type),
            options: options.as_ptr(),
            option_count: options.len() as c_uint,
            log_level: log_level_raw(info.log_level),
            source_name: info.source_name.map_or(ptr::null(), CStr::as_ptr),
        };

        let mut code = vkd3d_shader_code {
            code: ptr::null(),
            size: 0,
        };
        let mut messages: *mut c_char = ptr::null_mut();

        let result = unsafe { (self.compile)(&compile_info, &mut code, &mut messages) };

        BackendOutput {
            result,
            code: (!code.code.is_null()).then_some(Vkd3dCode(code)),
            messages: NonNull::new(messages).map(Vkd3dMessages),
        }
    }

    fn free_shader_code(&self, mut code: Vkd3dCode) {
        unsafe { (self.free_shader_code)(&mut code.0) }
    }

    fn free_messages(&self, messages: Vkd3dMessages) {
        unsafe { (self.free_messages)(messages.0.as_ptr()) }
    }
}
