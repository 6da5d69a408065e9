//! Contract with the shader compiler backend
//!
//! The backend is treated as a black box: it receives one [`CompileInfo`]
//! per call and hands back a result code plus optional bytecode and
//! diagnostic text. Both outputs stay owned by the backend until they are
//! returned through [`ShaderBackend::free_shader_code`] and
//! [`ShaderBackend::free_messages`].

use std::ffi::CStr;

pub mod fixture;
#[cfg(feature = "vkd3d")]
pub mod vkd3d;

pub use fixture::FixtureBackend;
#[cfg(feature = "vkd3d")]
pub use vkd3d::Vkd3dShader;

/// Backend result codes (vkd3d-shader numbering)
pub mod result_code {
    pub const OK: i32 = 0;
    pub const ERROR: i32 = -1;
    pub const OUT_OF_MEMORY: i32 = -2;
    pub const INVALID_ARGUMENT: i32 = -3;
    pub const INVALID_SHADER: i32 = -4;
    pub const NOT_IMPLEMENTED: i32 = -5;
}

/// API version advertised to the backend with every request
pub const API_VERSION_1_3: u32 = 3;

/// Source language of a compile request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    Hlsl,
}

/// Binary representation the backend should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    /// DXBC container with tokenized program format (SM4+)
    DxbcTpf,
    /// Legacy D3D9-era bytecode (SM1-3, fx_2, tx_1)
    D3dBytecode,
}

/// Named backend compile option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileOptionName {
    /// Remove debug metadata from the output
    StripDebug,
    /// Behave as the given backend API version
    ApiVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompileOption {
    pub name: CompileOptionName,
    pub value: u32,
}

impl CompileOption {
    pub const fn new(name: CompileOptionName, value: u32) -> Self {
        CompileOption { name, value }
    }
}

/// Verbosity of the diagnostics the backend should emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    None,
    Error,
    Warning,
    Info,
}

/// A preprocessor definition passed through to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Macro<'a> {
    pub name: &'a CStr,
    pub value: Option<&'a CStr>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessInfo<'a> {
    pub macros: Vec<Macro<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlslSourceInfo<'a> {
    pub profile: &'a CStr,
    pub entry_point: Option<&'a CStr>,
    /// Secondary shader for effect-style linking
    pub secondary_code: Option<&'a [u8]>,
}

/// Everything the backend needs for a single compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileInfo<'a> {
    pub source: &'a [u8],
    pub source_name: Option<&'a CStr>,
    pub source_type: SourceType,
    pub target_type: TargetType,
    pub options: Vec<CompileOption>,
    pub log_level: LogLevel,
    pub preprocess: PreprocessInfo<'a>,
    pub hlsl: HlslSourceInfo<'a>,
}

impl CompileInfo<'_> {
    /// Returns the value of `name` if the option is present.
    pub fn option(&self, name: CompileOptionName) -> Option<u32> {
        self.options.iter().find(|o| o.name == name).map(|o| o.value)
    }
}

/// Raw outcome of one backend call
#[derive(Debug)]
pub struct BackendOutput<C, M> {
    pub result: i32,
    pub code: Option<C>,
    pub messages: Option<M>,
}

/// A shader compiler the request translator can drive.
///
/// `compile` must be callable from several threads at once; no state may be
/// shared between calls other than what the backend synchronizes itself.
pub trait ShaderBackend {
    /// Backend-owned bytecode buffer
    type Code: AsRef<[u8]>;
    /// Backend-owned diagnostic text, without its terminator
    type Messages: AsRef<[u8]>;

    fn compile(&self, info: &CompileInfo<'_>) -> BackendOutput<Self::Code, Self::Messages>;

    fn free_shader_code(&self, code: Self::Code);

    fn free_messages(&self, messages: Self::Messages);
}

impl<B: ShaderBackend + ?Sized> ShaderBackend for &B {
    type Code = B::Code;
    type Messages = B::Messages;

    fn compile(&self, info: &CompileInfo<'_>) -> BackendOutput<Self::Code, Self::Messages> {
        (**self).compile(info)
    }

    fn free_shader_code(&self, code: Self::Code) {
        (**self).free_shader_code(code)
    }

    fn free_messages(&self, messages: Self::Messages) {
        (**self).free_messages(messages)
    }
}
