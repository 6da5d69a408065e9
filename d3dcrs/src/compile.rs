//! Shader compilation API

use crate::{Blob, CompileFlags, Error, HResult, Result, ShaderTarget};
use d3dcompiler::backend::{Macro, ShaderBackend};
use d3dcompiler::{CompileOutput, CompileRequest, Outputs};
use std::ffi::CString;

/// A preprocessor macro definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Define {
    pub(crate) name: String,
    pub(crate) value: String,
}

impl Define {
    /// Creates a new preprocessor define
    ///
    /// # Example
    /// ```
    /// use d3dcrs::Define;
    /// let define = Define::new("DEBUG", "1");
    /// ```
    pub fn new(name: &str, value: &str) -> Self {
        Define {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// Creates a define with an empty value
    pub fn flag(name: &str) -> Self {
        Self::new(name, "")
    }
}

fn c_string(what: &str, s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| Error::InvalidParameter(format!("{what} contains a null byte")))
}

/// Result of a successful shader compilation
#[derive(Debug)]
pub struct CompileResult {
    /// The compiled shader bytecode
    pub bytecode: Blob,
    /// Any warning messages from the compiler (if present)
    pub warnings: Option<String>,
}

/// Builder for shader compilation with fluent API
///
/// # Example
/// ```no_run
/// use d3dcrs::{CompileBuilder, CompileFlags, ShaderTarget};
///
/// let source = "float4 main() : COLOR { return float4(1,0,0,1); }";
///
/// let result = CompileBuilder::new(source, "main", ShaderTarget::PS_3_0)
///     .source_name("my_shader.hlsl")
///     .define("DEBUG", "1")
///     .flags(CompileFlags::DEBUG)
///     .compile()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct CompileBuilder<'a> {
    source: &'a [u8],
    source_name: Option<String>,
    entry_point: String,
    target: ShaderTarget,
    defines: Vec<Define>,
    flags1: CompileFlags,
    effect_flags: u32,
    secondary_data: Option<&'a [u8]>,
}

impl<'a> CompileBuilder<'a> {
    /// Creates a new compile builder with the required parameters.
    ///
    /// # Arguments
    /// * `source` - The HLSL source code
    /// * `entry_point` - The name of the entry point function (e.g., "main")
    /// * `target` - The shader target (e.g., `ShaderTarget::PS_5_0`)
    pub fn new(source: &'a str, entry_point: &str, target: ShaderTarget) -> Self {
        Self::from_bytes(source.as_bytes(), entry_point, target)
    }

    /// Creates a compile builder from raw bytes.
    pub fn from_bytes(source: &'a [u8], entry_point: &str, target: ShaderTarget) -> Self {
        CompileBuilder {
            source,
            source_name: None,
            entry_point: entry_point.to_string(),
            target,
            defines: Vec::new(),
            flags1: CompileFlags::empty(),
            effect_flags: 0,
            secondary_data: None,
        }
    }

    /// Sets the source file name (used in error messages).
    pub fn source_name(mut self, name: &str) -> Self {
        self.source_name = Some(name.to_string());
        self
    }

    /// Adds a preprocessor define.
    pub fn define(mut self, name: &str, value: &str) -> Self {
        self.defines.push(Define::new(name, value));
        self
    }

    /// Adds a preprocessor define flag (empty value).
    pub fn define_flag(mut self, name: &str) -> Self {
        self.defines.push(Define::flag(name));
        self
    }

    /// Adds multiple preprocessor defines from an iterator.
    pub fn defines<I>(mut self, defines: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, value) in defines {
            self.defines.push(Define::new(name, value));
        }
        self
    }

    /// Adds a pre-built Define.
    pub fn with_define(mut self, define: Define) -> Self {
        self.defines.push(define);
        self
    }

    /// Sets compilation flags (replaces any existing flags).
    pub fn flags(mut self, flags: CompileFlags) -> Self {
        self.flags1 = flags;
        self
    }

    /// Adds compilation flags (bitwise OR with existing).
    pub fn with_flags(mut self, flags: CompileFlags) -> Self {
        self.flags1 |= flags;
        self
    }

    /// Keeps debug information (D3DCOMPILE_DEBUG).
    pub fn debug(self) -> Self {
        self.with_flags(CompileFlags::DEBUG)
    }

    /// Sets the optimization level (0-3).
    pub fn optimization_level(mut self, level: u32) -> Self {
        self.flags1 = self.flags1.with_optimization_level(level);
        self
    }

    /// Sets effect flags (the Flags2 parameter).
    pub fn effect_flags(mut self, flags: u32) -> Self {
        self.effect_flags = flags;
        self
    }

    /// Sets secondary data for effect-style linking.
    pub fn secondary_data(mut self, data: &'a [u8]) -> Self {
        self.secondary_data = Some(data);
        self
    }

    /// Compiles the shader with the process-wide backend.
    ///
    /// Returns the compiled bytecode and any warning messages.
    pub fn compile(self) -> Result<CompileResult> {
        #[cfg(feature = "vkd3d")]
        {
            let backend = d3dcompiler::backend::Vkd3dShader::global()
                .map_err(|err| Error::Backend(err.to_string()))?;
            self.compile_with(backend)
        }
        #[cfg(not(feature = "vkd3d"))]
        {
            Err(Error::Backend(
                d3dcompiler::D3DCompilerError::Unsupported.to_string(),
            ))
        }
    }

    /// Compiles the shader with `backend`.
    pub fn compile_with<B: ShaderBackend>(self, backend: &B) -> Result<CompileResult> {
        let source_name = self
            .source_name
            .as_deref()
            .map(|name| c_string("Source name", name))
            .transpose()?;
        let entry_point = c_string("Entry point", &self.entry_point)?;
        let profile = self.target.as_cstring()?;
        let defines = self
            .defines
            .iter()
            .map(|d| -> Result<(CString, CString)> {
                Ok((
                    c_string("Define name", &d.name)?,
                    c_string("Define value", &d.value)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut request = CompileRequest::new(self.source, &profile);
        request.source_name = source_name.as_deref();
        request.entry_point = Some(&entry_point);
        request.macros = defines
            .iter()
            .map(|(name, value)| Macro {
                name,
                value: Some(value),
            })
            .collect();
        request.flags = self.flags1.bits();
        request.effect_flags = self.effect_flags;
        request.secondary_data = self.secondary_data;

        let output = d3dcompiler::compile2(backend, &request, Outputs::ALL);
        into_result(output)
    }
}

fn into_result(output: CompileOutput) -> Result<CompileResult> {
    let CompileOutput {
        hresult,
        shader,
        messages,
    } = output;
    let messages = messages
        .map(|blob| Blob::from_owned(blob).to_string_lossy())
        .filter(|s| !s.is_empty());

    if hresult < 0 {
        let message = messages
            .unwrap_or_else(|| format!("Unknown error (HRESULT: 0x{:08x})", hresult as u32));
        return Err(Error::Compilation {
            hresult: HResult(hresult),
            message,
        });
    }

    let bytecode = shader.map(Blob::from_owned).ok_or_else(|| Error::Compilation {
        hresult: HResult(hresult),
        message: "No bytecode returned from compiler".to_string(),
    })?;

    Ok(CompileResult {
        bytecode,
        warnings: messages,
    })
}

/// Convenience function for simple shader compilation.
///
/// # Example
/// ```no_run
/// use d3dcrs::{compile, ShaderTarget};
///
/// let source = "float4 main() : SV_TARGET { return float4(1,0,0,1); }";
/// let bytecode = compile(source, "main", ShaderTarget::PS_5_0).unwrap();
/// ```
pub fn compile(source: &str, entry_point: &str, target: ShaderTarget) -> Result<Blob> {
    CompileBuilder::new(source, entry_point, target)
        .compile()
        .map(|r| r.bytecode)
}
