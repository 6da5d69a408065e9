//! Exported entry points served from an installed table of precompiled
//! shaders. Lives in its own test binary because the table is process-wide.

use d3dcompiler::backend::FixtureBackend;
use d3dcompiler::*;
use pretty_assertions::assert_eq;
use std::ptr;
use std::sync::Once;

const SPRITE_VS: &[u8] = b"float4 main(float4 pos : POSITION) : SV_POSITION { return pos; }\0";
const SPRITE_VS_BYTECODE: &[u8] = &[68, 88, 66, 67, 149, 149, 106, 146, 237, 224, 100, 10];

static INSTALL: Once = Once::new();

fn install_fixtures() {
    INSTALL.call_once(|| {
        FixtureBackend::new()
            .with_fixture(SPRITE_VS, SPRITE_VS_BYTECODE)
            .install()
            .unwrap();
    });
}

unsafe fn take_blob(blob: *mut ID3DBlob) -> Vec<u8> {
    let blob = unsafe { OwnedBlob::from_raw(blob) }.unwrap();
    blob.as_bytes().to_vec()
}

unsafe fn compile(source: &[u8], name: &std::ffi::CStr) -> (HRESULT, *mut ID3DBlob, *mut ID3DBlob) {
    let mut code: *mut ID3DBlob = ptr::null_mut();
    let mut errors: *mut ID3DBlob = ptr::null_mut();
    let hr = unsafe {
        D3DCompile(
            source.as_ptr() as *const _,
            source.len(),
            name.as_ptr(),
            ptr::null(),
            ptr::null_mut(),
            c"main".as_ptr(),
            c"vs_4_0".as_ptr(),
            0,
            0,
            &mut code,
            &mut errors,
        )
    };
    (hr, code, errors)
}

#[test]
fn test_known_source_served_through_exports() {
    install_fixtures();
    unsafe {
        let (hr, code, errors) = compile(SPRITE_VS, c"sprite.hlsl");
        assert_eq!(hr, S_OK);
        assert!(errors.is_null());
        assert_eq!(take_blob(code), SPRITE_VS_BYTECODE);
    }
}

#[test]
fn test_unknown_source_fails_through_exports() {
    install_fixtures();
    unsafe {
        let (hr, code, errors) = compile(b"float4 main() : COLOR { return 0; }", c"other.hlsl");
        assert_eq!(hr, E_FAIL);
        assert!(code.is_null());
        let message = String::from_utf8(take_blob(errors)).unwrap();
        assert!(message.starts_with("other.hlsl:"), "got: {message}");
    }
}

#[test]
fn test_second_install_is_refused() {
    install_fixtures();
    let rejected = FixtureBackend::new().with_fixture("x", vec![1u8]).install();
    assert_eq!(rejected.unwrap_err().len(), 1);
    assert_eq!(FixtureBackend::installed().map(FixtureBackend::len), Some(1));
}
