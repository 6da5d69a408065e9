//! Request translation for `D3DCompile2`
//!
//! Turns the caller's arguments into a backend [`CompileInfo`], runs the
//! backend once, and copies whatever it produced into blobs. Backend-owned
//! buffers are handed back to the backend on every path out of
//! [`compile2_with`], including allocation failures.

use crate::backend::{
    API_VERSION_1_3, CompileInfo, CompileOption, CompileOptionName, HlslSourceInfo, LogLevel,
    Macro, PreprocessInfo, ShaderBackend, SourceType, TargetType, result_code,
};
use crate::blob::{BlobAllocator, HeapAllocator, OwnedBlob};
use crate::result::hresult_from_backend;
use crate::{D3D_SHADER_MACRO, D3DCOMPILE_DEBUG, E_INVALIDARG, HRESULT, ID3DBlob, LPCSTR};
use log::warn;
use std::ffi::{CStr, c_void};

/// Profile prefixes compiled to legacy D3D bytecode, in match priority order.
pub const LEGACY_BYTECODE_PROFILES: [&str; 14] = [
    "fx_2_", "ps.1.", "ps.2.", "ps.3.", "ps_1_", "ps_2_", "ps_3_", "vs.1.", "vs.2.", "vs.3.",
    "vs_1_", "vs_2_", "vs_3_", "tx_1_",
];

/// Returns the first legacy prefix `profile` starts with.
///
/// Byte comparison, case-sensitive.
pub fn legacy_profile_prefix(profile: &[u8]) -> Option<&'static str> {
    LEGACY_BYTECODE_PROFILES
        .iter()
        .copied()
        .find(|prefix| profile.starts_with(prefix.as_bytes()))
}

pub fn target_type_for_profile(profile: &[u8]) -> TargetType {
    match legacy_profile_prefix(profile) {
        Some(_) => TargetType::D3dBytecode,
        None => TargetType::DxbcTpf,
    }
}

/// Reads a `D3D_SHADER_MACRO` array up to its null-name sentinel.
///
/// # Safety
/// `macros` must be null or point to a sentinel-terminated array whose
/// strings outlive `'a`.
pub unsafe fn collect_macros<'a>(macros: *const D3D_SHADER_MACRO) -> Vec<Macro<'a>> {
    let mut collected = Vec::new();
    if macros.is_null() {
        return collected;
    }
    let mut cursor = macros;
    unsafe {
        while !(*cursor).Name.is_null() {
            collected.push(Macro {
                name: CStr::from_ptr((*cursor).Name),
                value: (!(*cursor).Definition.is_null()).then(|| CStr::from_ptr((*cursor).Definition)),
            });
            cursor = cursor.add(1);
        }
    }
    collected
}

unsafe fn bytes_from_raw<'a>(data: *const c_void, len: usize) -> Option<&'a [u8]> {
    match (data.is_null(), len) {
        (true, 0) => Some(&[]),
        (true, _) => None,
        (false, _) => Some(unsafe { std::slice::from_raw_parts(data.cast(), len) }),
    }
}

unsafe fn cstr_from_raw<'a>(s: LPCSTR) -> Option<&'a CStr> {
    (!s.is_null()).then(|| unsafe { CStr::from_ptr(s) })
}

/// Caller arguments of one `D3DCompile2` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest<'a> {
    pub source: &'a [u8],
    pub source_name: Option<&'a CStr>,
    pub macros: Vec<Macro<'a>>,
    pub entry_point: Option<&'a CStr>,
    pub profile: &'a CStr,
    /// D3DCOMPILE_* bits; only `D3DCOMPILE_DEBUG` is honoured
    pub flags: u32,
    pub effect_flags: u32,
    pub secondary_flags: u32,
    pub secondary_data: Option<&'a [u8]>,
}

impl<'a> CompileRequest<'a> {
    pub fn new(source: &'a [u8], profile: &'a CStr) -> Self {
        CompileRequest {
            source,
            source_name: None,
            macros: Vec::new(),
            entry_point: None,
            profile,
            flags: 0,
            effect_flags: 0,
            secondary_flags: 0,
            secondary_data: None,
        }
    }

    /// Builds a request from `D3DCompile2` arguments.
    ///
    /// Fails with `E_INVALIDARG` when the profile is null or the source is
    /// null with a nonzero size.
    ///
    /// # Safety
    /// Every non-null pointer must be valid for `'a`; strings must be
    /// NUL-terminated and `macros` sentinel-terminated.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn from_raw(
        data: *const c_void,
        data_size: usize,
        source_name: LPCSTR,
        macros: *const D3D_SHADER_MACRO,
        entry_point: LPCSTR,
        profile: LPCSTR,
        flags: u32,
        effect_flags: u32,
        secondary_flags: u32,
        secondary_data: *const c_void,
        secondary_data_size: usize,
    ) -> Result<Self, HRESULT> {
        unsafe {
            let source = bytes_from_raw(data, data_size).ok_or(E_INVALIDARG)?;
            let profile = cstr_from_raw(profile).ok_or(E_INVALIDARG)?;
            let secondary_data = if secondary_data.is_null() {
                None
            } else {
                bytes_from_raw(secondary_data, secondary_data_size)
            };
            Ok(CompileRequest {
                source,
                source_name: cstr_from_raw(source_name),
                macros: collect_macros(macros),
                entry_point: cstr_from_raw(entry_point),
                profile,
                flags,
                effect_flags,
                secondary_flags,
                secondary_data,
            })
        }
    }

    pub fn target_type(&self) -> TargetType {
        target_type_for_profile(self.profile.to_bytes())
    }

    /// Debug info is kept only when `D3DCOMPILE_DEBUG` is set.
    pub fn strips_debug_info(&self) -> bool {
        self.flags & D3DCOMPILE_DEBUG == 0
    }

    /// Backend configuration for this request.
    pub fn compile_info(&self) -> CompileInfo<'a> {
        let mut options = vec![CompileOption::new(
            CompileOptionName::ApiVersion,
            API_VERSION_1_3,
        )];
        if self.strips_debug_info() {
            options.push(CompileOption::new(CompileOptionName::StripDebug, 1));
        }

        CompileInfo {
            source: self.source,
            source_name: self.source_name,
            source_type: SourceType::Hlsl,
            target_type: self.target_type(),
            options,
            log_level: LogLevel::Info,
            preprocess: PreprocessInfo {
                macros: self.macros.clone(),
            },
            hlsl: HlslSourceInfo {
                profile: self.profile,
                entry_point: self.entry_point,
                secondary_code: self.secondary_data,
            },
        }
    }

    fn report_ignored_flags(&self) {
        if self.flags & !D3DCOMPILE_DEBUG != 0 {
            warn!("Ignoring flags {:#x}.", self.flags);
        }
        if self.effect_flags != 0 {
            warn!("Ignoring effect flags {:#x}.", self.effect_flags);
        }
        if self.secondary_flags != 0 {
            warn!("Ignoring secondary flags {:#x}.", self.secondary_flags);
        }
    }
}

/// Which outputs the caller supplied slots for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Outputs {
    pub shader: bool,
    pub messages: bool,
}

impl Outputs {
    pub const ALL: Outputs = Outputs {
        shader: true,
        messages: true,
    };
}

/// Result of one compile: the caller-facing status and any produced blobs
#[derive(Debug)]
pub struct CompileOutput {
    pub hresult: HRESULT,
    pub shader: Option<OwnedBlob>,
    pub messages: Option<OwnedBlob>,
}

impl CompileOutput {
    fn failed(hresult: HRESULT, messages: Option<OwnedBlob>) -> Self {
        CompileOutput {
            hresult,
            shader: None,
            messages,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.hresult >= 0
    }

    /// Moves the blobs into caller slots and returns the status.
    ///
    /// Null slots are skipped; a blob without a slot is released.
    ///
    /// # Safety
    /// Non-null slots must be valid for a pointer write.
    pub unsafe fn store(self, code: *mut *mut ID3DBlob, messages: *mut *mut ID3DBlob) -> HRESULT {
        unsafe {
            if let Some(blob) = self.shader {
                if !code.is_null() {
                    *code = blob.into_raw();
                }
            }
            if let Some(blob) = self.messages {
                if !messages.is_null() {
                    *messages = blob.into_raw();
                }
            }
        }
        self.hresult
    }
}

/// Backend-owned outputs, returned to the backend on drop
struct BackendResources<'b, B: ShaderBackend> {
    backend: &'b B,
    code: Option<B::Code>,
    messages: Option<B::Messages>,
}

impl<B: ShaderBackend> Drop for BackendResources<'_, B> {
    fn drop(&mut self) {
        if let Some(messages) = self.messages.take() {
            self.backend.free_messages(messages);
        }
        if let Some(code) = self.code.take() {
            self.backend.free_shader_code(code);
        }
    }
}

/// Compiles `request` with heap-allocated output blobs.
pub fn compile2<B: ShaderBackend>(
    backend: &B,
    request: &CompileRequest<'_>,
    outputs: Outputs,
) -> CompileOutput {
    compile2_with(backend, &HeapAllocator, request, outputs)
}

/// Compiles `request`, allocating output blobs through `allocator`.
pub fn compile2_with<B: ShaderBackend, A: BlobAllocator>(
    backend: &B,
    allocator: &A,
    request: &CompileRequest<'_>,
    outputs: Outputs,
) -> CompileOutput {
    request.report_ignored_flags();

    let info = request.compile_info();
    let output = backend.compile(&info);
    let result = output.result;
    let resources = BackendResources {
        backend,
        code: output.code,
        messages: output.messages,
    };

    // Diagnostics are surfaced whether or not compilation succeeded
    let mut messages = None;
    if let (Some(text), true) = (resources.messages.as_ref(), outputs.messages) {
        match allocator.allocate(text.as_ref()) {
            Ok(blob) => messages = Some(blob),
            Err(hr) => return CompileOutput::failed(hr, None),
        }
    }

    let mut shader = None;
    if result == result_code::OK {
        // A missing shader slot is what D3DCreateBlob rejects
        if !outputs.shader {
            return CompileOutput::failed(E_INVALIDARG, messages);
        }
        let bytecode = resources.code.as_ref().map_or(&[][..], |c| c.as_ref());
        match allocator.allocate(bytecode) {
            Ok(blob) => shader = Some(blob),
            Err(hr) => return CompileOutput::failed(hr, messages),
        }
    }

    drop(resources);
    CompileOutput {
        hresult: hresult_from_backend(result),
        shader,
        messages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::ptr;

    #[test]
    fn test_legacy_profiles() {
        for profile in [
            "vs_3_0", "vs.3.0", "vs_2_0", "vs_2_a", "vs_1_1", "ps_2_b", "ps.1.4", "ps_3_sw",
            "fx_2_0", "tx_1_0",
        ] {
            assert_eq!(
                target_type_for_profile(profile.as_bytes()),
                TargetType::D3dBytecode,
                "{profile}"
            );
        }
    }

    #[test]
    fn test_structured_profiles() {
        for profile in [
            "vs_4_0", "ps_5_0", "cs_5_0", "ps_4_0_level_9_3", "fx_4_0", "lib_6_3", "VS_3_0",
            "vs_3", "", "v",
        ] {
            assert_eq!(
                target_type_for_profile(profile.as_bytes()),
                TargetType::DxbcTpf,
                "{profile}"
            );
        }
    }

    #[test]
    fn test_prefix_priority_order() {
        assert_eq!(legacy_profile_prefix(b"fx_2_0"), Some("fx_2_"));
        assert_eq!(legacy_profile_prefix(b"ps.2.0"), Some("ps.2."));
        assert_eq!(legacy_profile_prefix(b"tx_1_0"), Some("tx_1_"));
        assert_eq!(LEGACY_BYTECODE_PROFILES[0], "fx_2_");
        assert_eq!(LEGACY_BYTECODE_PROFILES[13], "tx_1_");
    }

    #[test]
    fn test_debug_flag_keeps_debug_info() {
        let mut request = CompileRequest::new(b"", c"ps_5_0");
        request.flags = D3DCOMPILE_DEBUG;
        let info = request.compile_info();
        assert_eq!(info.option(CompileOptionName::StripDebug), None);
        assert_eq!(info.option(CompileOptionName::ApiVersion), Some(API_VERSION_1_3));
    }

    #[test]
    fn test_missing_debug_flag_strips_debug_info() {
        let mut request = CompileRequest::new(b"", c"ps_5_0");
        request.flags = 1 << 15;
        let info = request.compile_info();
        assert_eq!(
            info.options,
            vec![
                CompileOption::new(CompileOptionName::ApiVersion, API_VERSION_1_3),
                CompileOption::new(CompileOptionName::StripDebug, 1),
            ]
        );
    }

    #[test]
    fn test_collect_macros_stops_at_sentinel() {
        let defines = [
            D3D_SHADER_MACRO {
                Name: c"FOO".as_ptr(),
                Definition: c"1".as_ptr(),
            },
            D3D_SHADER_MACRO {
                Name: ptr::null(),
                Definition: ptr::null(),
            },
            D3D_SHADER_MACRO {
                Name: c"UNREACHED".as_ptr(),
                Definition: ptr::null(),
            },
        ];
        let macros = unsafe { collect_macros(defines.as_ptr()) };
        assert_eq!(
            macros,
            vec![Macro {
                name: c"FOO",
                value: Some(c"1"),
            }]
        );
    }

    #[test]
    fn test_collect_macros_null_value_and_null_list() {
        let defines = [
            D3D_SHADER_MACRO {
                Name: c"FLAG".as_ptr(),
                Definition: ptr::null(),
            },
            D3D_SHADER_MACRO {
                Name: ptr::null(),
                Definition: ptr::null(),
            },
        ];
        let macros = unsafe { collect_macros(defines.as_ptr()) };
        assert_eq!(macros.len(), 1);
        assert_eq!(macros[0].value, None);
        assert!(unsafe { collect_macros(ptr::null()) }.is_empty());
    }

    #[test]
    fn test_from_raw_rejects_missing_profile() {
        let err = unsafe {
            CompileRequest::from_raw(
                ptr::null(),
                0,
                ptr::null(),
                ptr::null(),
                ptr::null(),
                ptr::null(),
                0,
                0,
                0,
                ptr::null(),
                0,
            )
        };
        assert_eq!(err.unwrap_err(), E_INVALIDARG);
    }

    #[test]
    fn test_from_raw_rejects_null_source_with_size() {
        let err = unsafe {
            CompileRequest::from_raw(
                ptr::null(),
                12,
                ptr::null(),
                ptr::null(),
                ptr::null(),
                c"vs_5_0".as_ptr(),
                0,
                0,
                0,
                ptr::null(),
                0,
            )
        };
        assert_eq!(err.unwrap_err(), E_INVALIDARG);
    }

    #[test]
    fn test_from_raw_fills_hlsl_info() {
        let source = b"float4 main() : SV_TARGET { return 0; }";
        let secondary = [1u8, 2, 3];
        let request = unsafe {
            CompileRequest::from_raw(
                source.as_ptr().cast(),
                source.len(),
                c"shader.hlsl".as_ptr(),
                ptr::null(),
                c"main".as_ptr(),
                c"ps_3_0".as_ptr(),
                D3DCOMPILE_DEBUG,
                0,
                0,
                secondary.as_ptr().cast(),
                secondary.len(),
            )
        }
        .unwrap();

        let info = request.compile_info();
        assert_eq!(info.source, &source[..]);
        assert_eq!(info.source_name, Some(c"shader.hlsl"));
        assert_eq!(info.target_type, TargetType::D3dBytecode);
        assert_eq!(info.hlsl.entry_point, Some(c"main"));
        assert_eq!(info.hlsl.profile, c"ps_3_0");
        assert_eq!(info.hlsl.secondary_code, Some(&secondary[..]));
        assert!(info.preprocess.macros.is_empty());
    }

    #[test]
    fn test_ignored_flags_do_not_change_configuration() {
        let plain = CompileRequest::new(b"x", c"vs_5_0");
        let mut noisy = plain.clone();
        noisy.flags = 0xfffe;
        noisy.effect_flags = 3;
        noisy.secondary_flags = 1;
        assert_eq!(plain.compile_info(), noisy.compile_info());
    }
}
