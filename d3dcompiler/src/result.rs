//! Backend result code to HRESULT translation

use crate::backend::result_code;
use crate::{E_FAIL, E_INVALIDARG, E_NOTIMPL, E_OUTOFMEMORY, HRESULT, S_OK};
use log::warn;

/// Maps a backend result code onto the HRESULT callers expect.
///
/// Total over `i32`: codes without a dedicated mapping become `E_FAIL`.
pub fn hresult_from_backend(result: i32) -> HRESULT {
    match result {
        result_code::OK => S_OK,
        result_code::INVALID_SHADER => {
            warn!("Invalid shader bytecode.");
            E_FAIL
        }
        result_code::ERROR => E_FAIL,
        result_code::OUT_OF_MEMORY => E_OUTOFMEMORY,
        result_code::INVALID_ARGUMENT => E_INVALIDARG,
        result_code::NOT_IMPLEMENTED => E_NOTIMPL,
        other => {
            warn!("Unhandled backend result {other}.");
            E_FAIL
        }
    }
}
