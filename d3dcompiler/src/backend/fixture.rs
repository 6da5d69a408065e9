//! Table-driven backend serving precompiled bytecode
//!
//! Useful where no compiler library is available but the set of shaders is
//! known ahead of time: each source text maps to the bytecode it compiles to.
//! A table installed with [`FixtureBackend::install`] serves the exported
//! `D3DCompile`/`D3DCompile2` in place of the library backend.

use super::{BackendOutput, CompileInfo, ShaderBackend, result_code};
use log::debug;
use std::collections::HashMap;
use std::sync::OnceLock;

static INSTALLED: OnceLock<FixtureBackend> = OnceLock::new();

#[derive(Debug, Clone, Default)]
pub struct FixtureBackend {
    fixtures: HashMap<Vec<u8>, Vec<u8>>,
}

impl FixtureBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `bytecode` as the compiled form of `source`.
    pub fn with_fixture(mut self, source: impl Into<Vec<u8>>, bytecode: impl Into<Vec<u8>>) -> Self {
        self.insert(source, bytecode);
        self
    }

    pub fn insert(&mut self, source: impl Into<Vec<u8>>, bytecode: impl Into<Vec<u8>>) {
        let mut source = source.into();
        trim_terminator(&mut source);
        self.fixtures.insert(source, bytecode.into());
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    /// Routes the exported entry points to this table for the rest of the
    /// process. Hands the table back if one is already installed.
    pub fn install(self) -> Result<(), FixtureBackend> {
        let count = self.len();
        INSTALLED.set(self)?;
        debug!("Installed {count} precompiled shaders");
        Ok(())
    }

    pub fn installed() -> Option<&'static FixtureBackend> {
        INSTALLED.get()
    }
}

// Callers may or may not count the NUL in the source length
fn trim_terminator(source: &mut Vec<u8>) {
    if source.last() == Some(&0) {
        source.pop();
    }
}

impl ShaderBackend for FixtureBackend {
    type Code = Vec<u8>;
    type Messages = String;

    fn compile(&self, info: &CompileInfo<'_>) -> BackendOutput<Vec<u8>, String> {
        let source = info.source.strip_suffix(b"\0").unwrap_or(info.source);
        match self.fixtures.get(source) {
            Some(bytecode) => BackendOutput {
                result: result_code::OK,
                code: Some(bytecode.clone()),
                messages: None,
            },
            None => {
                let name = info
                    .source_name
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "<anonymous>".to_string());
                BackendOutput {
                    result: result_code::ERROR,
                    code: None,
                    messages: Some(format!("{name}: no precompiled shader matches this source.\n")),
                }
            }
        }
    }

    fn free_shader_code(&self, code: Vec<u8>) {
        drop(code);
    }

    fn free_messages(&self, messages: String) {
        drop(messages);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{HlslSourceInfo, LogLevel, PreprocessInfo, SourceType, TargetType};

    fn info(source: &[u8]) -> CompileInfo<'_> {
        CompileInfo {
            source,
            source_name: Some(c"sprite.hlsl"),
            source_type: SourceType::Hlsl,
            target_type: TargetType::DxbcTpf,
            options: Vec::new(),
            log_level: LogLevel::Info,
            preprocess: PreprocessInfo::default(),
            hlsl: HlslSourceInfo {
                profile: c"vs_4_0",
                entry_point: Some(c"main"),
                secondary_code: None,
            },
        }
    }

    #[test]
    fn test_known_source_returns_bytecode() {
        let backend = FixtureBackend::new().with_fixture("float4 main();", b"DXBC\x01\x02".to_vec());
        let output = backend.compile(&info(b"float4 main();"));
        assert_eq!(output.result, result_code::OK);
        assert_eq!(output.code.as_deref(), Some(&b"DXBC\x01\x02"[..]));
        assert!(output.messages.is_none());
    }

    #[test]
    fn test_terminator_is_ignored_on_both_sides() {
        let backend = FixtureBackend::new().with_fixture(b"void f();\0".to_vec(), vec![7u8]);
        assert_eq!(backend.compile(&info(b"void f();")).result, result_code::OK);
        assert_eq!(backend.compile(&info(b"void f();\0")).result, result_code::OK);
    }

    #[test]
    fn test_unknown_source_reports_error() {
        let backend = FixtureBackend::new();
        let output = backend.compile(&info(b"garbage"));
        assert_eq!(output.result, result_code::ERROR);
        assert!(output.code.is_none());
        let messages = output.messages.unwrap();
        assert!(messages.starts_with("sprite.hlsl:"), "{messages}");
    }
}
