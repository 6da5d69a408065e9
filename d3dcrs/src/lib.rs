//! Safe, ergonomic Rust API for the d3dcompiler shim
//!
//! This crate wraps the `d3dcompiler` crate with Rust idioms: Result types,
//! RAII blob handles, bitflags and a compile builder. Compilation runs either
//! against the process-wide vkd3d-shader backend or any
//! [`ShaderBackend`] supplied by the caller.
//!
//! # Example
//!
//! ```no_run
//! use d3dcrs::{compile, ShaderTarget};
//!
//! let source = r#"
//!     float4 main(float4 pos : POSITION) : POSITION {
//!         return pos;
//!     }
//! "#;
//!
//! // Compile a legacy vertex shader
//! let bytecode = compile(source, "main", ShaderTarget::VS_2_0).unwrap();
//! println!("{} bytes", bytecode.len());
//! ```

mod blob;
mod compile;
mod error;
mod flags;
mod target;

pub use blob::Blob;
pub use compile::{CompileBuilder, CompileResult, Define, compile};
pub use d3dcompiler::backend::{FixtureBackend, ShaderBackend};
pub use error::{Error, HResult, Result};
pub use flags::CompileFlags;
pub use target::{ShaderModel, ShaderTarget, ShaderType};
