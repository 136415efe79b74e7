//! Native-allocated output buffers.
//!
//! `ceph_mds_command` hands back heap buffers allocated inside libcephfs
//! through `char **` / `size_t *` out-parameter pairs. [`NativeBuffer`] takes
//! ownership of one such pair: the bytes can be copied out with
//! [`NativeBuffer::to_vec`], and dropping the guard releases the allocation
//! with `ceph_buffer_free`. The guard is created right after the native call
//! returns, so the release happens on every exit path.

use std::ffi::c_char;
use std::ptr;

use crate::ffi::NativeApi;

/// An owned libcephfs output buffer, released on drop.
pub struct NativeBuffer<'a, A: NativeApi + ?Sized> {
    api: &'a A,
    ptr: *mut c_char,
    len: usize,
}

impl<'a, A: NativeApi + ?Sized> NativeBuffer<'a, A> {
    /// Takes ownership of a buffer written by the native library.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a buffer of at least `len` bytes allocated by
    /// `api`'s library, not owned by anything else.
    pub unsafe fn from_raw(api: &'a A, ptr: *mut c_char, len: usize) -> Self {
        Self { api, ptr, len }
    }

    /// Length reported by the native library.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copies exactly the reported number of bytes into an owned vector.
    ///
    /// A null pointer with a non-zero length is treated as empty.
    pub fn to_vec(&self) -> Vec<u8> {
        if self.ptr.is_null() {
            if self.len != 0 {
                tracing::warn!(len = self.len, "native buffer is null but reports a length");
            }
            return Vec::new();
        }
        // SAFETY: guaranteed by `from_raw`.
        unsafe { std::slice::from_raw_parts(self.ptr.cast::<u8>(), self.len) }.to_vec()
    }

    /// Copies the bytes out and releases the buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.to_vec()
    }
}

impl<A: NativeApi + ?Sized> Drop for NativeBuffer<'_, A> {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        let buf = std::mem::replace(&mut self.ptr, ptr::null_mut());
        tracing::trace!(len = self.len, "releasing native buffer");
        // SAFETY: `buf` came from `api`'s library and is released exactly once.
        unsafe { self.api.buffer_free(buf) };
    }
}
