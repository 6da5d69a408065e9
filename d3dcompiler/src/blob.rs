//! Heap-backed `ID3DBlob` implementation
//!
//! A blob is a fixed-size byte buffer behind the `ID3DBlob` vtable. It owns
//! its data region for its whole lifetime and frees both the region and
//! itself on the release that takes the reference count to zero.

use crate::{
    BlobInterface, E_INVALIDARG, E_OUTOFMEMORY, HRESULT, ID3DBlob, ID3DBlobVtbl, REFIID, S_OK,
    SIZE_T, ULONG,
};
use log::trace;
use std::alloc::{Layout, alloc, alloc_zeroed, dealloc};
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};

/// COM-style reference count shared by every blob implementation.
///
/// Starts at 1. `release` returns the remaining count; the caller that sees
/// 0 is the one that must free the object.
#[derive(Debug)]
pub struct RefCount(AtomicU32);

impl RefCount {
    pub const fn new() -> Self {
        RefCount(AtomicU32::new(1))
    }

    /// Increments and returns the new count.
    pub fn acquire(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrements and returns the remaining count.
    pub fn release(&self) -> u32 {
        let previous = self.0.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "released a blob with no outstanding references");
        previous - 1
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for RefCount {
    fn default() -> Self {
        Self::new()
    }
}

#[repr(C)]
struct BlobObject {
    vtable: *const ID3DBlobVtbl,
    refcount: RefCount,
    data: NonNull<u8>,
    size: usize,
}

static BLOB_VTABLE: ID3DBlobVtbl = ID3DBlobVtbl::new::<BlobObject>();

fn allocate_data(size: usize) -> Option<NonNull<u8>> {
    if size == 0 {
        return Some(NonNull::dangling());
    }
    let layout = Layout::array::<u8>(size).ok()?;
    NonNull::new(unsafe { alloc_zeroed(layout) })
}

impl Drop for BlobObject {
    fn drop(&mut self) {
        if self.size == 0 {
            return;
        }
        // Same layout the data was allocated with
        if let Ok(layout) = Layout::array::<u8>(self.size) {
            unsafe { dealloc(self.data.as_ptr(), layout) }
        }
    }
}

unsafe impl BlobInterface for BlobObject {
    unsafe fn query_interface(
        this: NonNull<Self>,
        riid: REFIID,
        _ppv: *mut *mut c_void,
    ) -> HRESULT {
        // Compatibility shim: existing callers expect S_OK here and never
        // use the (unset) out pointer. No interface negotiation happens.
        if !riid.is_null() {
            trace!("[BLOB] QueryInterface({:?}, {})", this, unsafe { &*riid });
        }
        S_OK
    }

    unsafe fn add_ref(this: NonNull<Self>) -> ULONG {
        unsafe { this.as_ref() }.refcount.acquire()
    }

    unsafe fn release(this: NonNull<Self>) -> ULONG {
        let remaining = unsafe { this.as_ref() }.refcount.release();
        if remaining == 0 {
            drop(unsafe { Box::from_raw(this.as_ptr()) });
        }
        remaining
    }

    unsafe fn buffer_pointer(this: NonNull<Self>) -> *mut c_void {
        unsafe { this.as_ref() }.data.as_ptr().cast()
    }

    unsafe fn buffer_size(this: NonNull<Self>) -> SIZE_T {
        unsafe { this.as_ref() }.size
    }
}

/// Allocates a zero-filled blob of `size` bytes with a reference count of 1.
///
/// Fails with `E_OUTOFMEMORY` if either the object or its data region cannot
/// be allocated; nothing is leaked in that case.
pub fn create_blob(size: usize) -> Result<OwnedBlob, HRESULT> {
    let object_layout = Layout::new::<BlobObject>();
    let object = unsafe { alloc(object_layout) }.cast::<BlobObject>();
    let Some(object) = NonNull::new(object) else {
        return Err(E_OUTOFMEMORY);
    };

    let Some(data) = allocate_data(size) else {
        unsafe { dealloc(object.as_ptr().cast(), object_layout) };
        return Err(E_OUTOFMEMORY);
    };

    unsafe {
        object.as_ptr().write(BlobObject {
            vtable: &BLOB_VTABLE,
            refcount: RefCount::new(),
            data,
            size,
        });
    }
    Ok(OwnedBlob(object.cast()))
}

/// Creates a blob holding a copy of `bytes`.
pub fn blob_from_bytes(bytes: &[u8]) -> Result<OwnedBlob, HRESULT> {
    let mut blob = create_blob(bytes.len())?;
    blob.as_bytes_mut().copy_from_slice(bytes);
    Ok(blob)
}

/// `D3DCreateBlob` semantics over a raw output slot.
///
/// # Safety
/// `out` must be null or valid for a pointer write.
pub unsafe fn create_blob_into(size: usize, out: *mut *mut ID3DBlob) -> HRESULT {
    if out.is_null() {
        return E_INVALIDARG;
    }
    match create_blob(size) {
        Ok(blob) => {
            unsafe { *out = blob.into_raw() };
            S_OK
        }
        Err(hr) => hr,
    }
}

/// Strategy for turning backend output into blobs.
///
/// The orchestrator allocates every output blob through this trait so the
/// failure paths can be exercised.
pub trait BlobAllocator {
    fn allocate(&self, bytes: &[u8]) -> Result<OwnedBlob, HRESULT>;
}

/// Allocates from the process heap
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

impl BlobAllocator for HeapAllocator {
    fn allocate(&self, bytes: &[u8]) -> Result<OwnedBlob, HRESULT> {
        blob_from_bytes(bytes)
    }
}

/// An owned reference to any `ID3DBlob`.
///
/// Dropping releases the reference. Not `Clone`: a handle may hand out
/// `&mut [u8]`, so a second reference is only available through
/// [`OwnedBlob::share`].
pub struct OwnedBlob(NonNull<ID3DBlob>);

impl OwnedBlob {
    /// Creates a zero-filled blob of `size` bytes.
    pub fn new(size: usize) -> Result<Self, HRESULT> {
        create_blob(size)
    }

    /// Takes ownership of one reference held by `ptr`.
    ///
    /// # Safety
    /// `ptr` must be null or a live `ID3DBlob` whose reference the caller
    /// gives up.
    pub unsafe fn from_raw(ptr: *mut ID3DBlob) -> Option<Self> {
        NonNull::new(ptr).map(OwnedBlob)
    }

    /// Hands the reference to the caller without releasing it.
    pub fn into_raw(self) -> *mut ID3DBlob {
        let ptr = self.0.as_ptr();
        std::mem::forget(self);
        ptr
    }

    /// Adds a reference and returns a second handle to the same buffer.
    ///
    /// # Safety
    /// Neither handle may call [`OwnedBlob::as_bytes_mut`] while the other
    /// is alive.
    pub unsafe fn share(&self) -> Self {
        unsafe {
            let vtable = &*(*self.0.as_ptr()).vtable;
            (vtable.AddRef)(self.0.as_ptr());
        }
        OwnedBlob(self.0)
    }

    pub fn as_ptr(&self) -> *mut ID3DBlob {
        self.0.as_ptr()
    }

    pub fn len(&self) -> usize {
        unsafe {
            let vtable = &*(*self.0.as_ptr()).vtable;
            (vtable.GetBufferSize)(self.0.as_ptr())
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe {
            let vtable = &*(*self.0.as_ptr()).vtable;
            let ptr = (vtable.GetBufferPointer)(self.0.as_ptr());
            let size = (vtable.GetBufferSize)(self.0.as_ptr());
            if size == 0 {
                return &[];
            }
            std::slice::from_raw_parts(ptr as *const u8, size)
        }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe {
            let vtable = &*(*self.0.as_ptr()).vtable;
            let ptr = (vtable.GetBufferPointer)(self.0.as_ptr());
            let size = (vtable.GetBufferSize)(self.0.as_ptr());
            if size == 0 {
                return &mut [];
            }
            std::slice::from_raw_parts_mut(ptr as *mut u8, size)
        }
    }
}

impl Drop for OwnedBlob {
    fn drop(&mut self) {
        unsafe {
            let vtable = &*(*self.0.as_ptr()).vtable;
            (vtable.Release)(self.0.as_ptr());
        }
    }
}

impl std::fmt::Debug for OwnedBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedBlob")
            .field("len", &self.len())
            .field("ptr", &self.0)
            .finish()
    }
}

// Reference counting is atomic, the data region is never reallocated and
// mutation needs `&mut` on the only safe handle
unsafe impl Send for OwnedBlob {}
unsafe impl Sync for OwnedBlob {}
