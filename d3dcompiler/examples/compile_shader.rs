//! Example: Compile an HLSL shader through the C entry point
//!
//! Run with: cargo run --example compile_shader
//!
//! Needs libvkd3d-shader on the library path, or its location in
//! D3DCOMPILER_VKD3D_PATH.

use d3dcompiler::*;
use std::ptr;

const SHADER_SOURCE: &str = r#"
// Vertex shader that forwards position and colour
struct VS_OUTPUT {
    float4 pos : POSITION;
    float4 color : COLOR0;
};

VS_OUTPUT main(float4 pos : POSITION, float4 color : COLOR0) {
    VS_OUTPUT output;
    output.pos = pos;
    output.color = color;
    return output;
}
"#;

unsafe fn blob_bytes<'a>(blob: *mut ID3DBlob) -> &'a [u8] {
    unsafe {
        let vtable = &*(*blob).vtable;
        let ptr = (vtable.GetBufferPointer)(blob);
        let size = (vtable.GetBufferSize)(blob);
        std::slice::from_raw_parts(ptr as *const u8, size)
    }
}

fn main() {
    println!("D3D Shader Compiler Example");
    println!("===========================\n");

    for (i, line) in SHADER_SOURCE.lines().enumerate() {
        println!("{:3}: {}", i + 1, line);
    }
    println!();

    unsafe {
        let mut code: *mut ID3DBlob = ptr::null_mut();
        let mut errors: *mut ID3DBlob = ptr::null_mut();

        println!("Compiling shader (entry point main, target vs_2_0)...");
        let result = D3DCompile(
            SHADER_SOURCE.as_ptr() as *const _,
            SHADER_SOURCE.len(),
            c"example.hlsl".as_ptr(),
            ptr::null(),
            ptr::null_mut(),
            c"main".as_ptr(),
            c"vs_2_0".as_ptr(),
            0, // Flags1
            0, // Flags2
            &mut code,
            &mut errors,
        );

        if !errors.is_null() {
            let messages = String::from_utf8_lossy(blob_bytes(errors)).into_owned();
            if !messages.is_empty() {
                eprintln!("Compiler messages:\n{messages}");
            }
            ((*(*errors).vtable).Release)(errors);
        }

        if result != S_OK {
            eprintln!("Compilation FAILED (HRESULT: 0x{:08x})", result as u32);
            std::process::exit(1);
        }

        let bytecode = blob_bytes(code);
        println!("Compilation SUCCEEDED: {} bytes", bytecode.len());

        println!("\nBytecode header (first 64 bytes):");
        for (i, chunk) in bytecode.chunks(16).take(4).enumerate() {
            print!("{:04x}: ", i * 16);
            for byte in chunk {
                print!("{:02x} ", byte);
            }
            println!();
        }

        ((*(*code).vtable).Release)(code);
    }

    println!("\nDone!");
}
