//! RAII wrappers for native handles.
//!
//! Each wrapper owns its handle exclusively and closes it exactly once in
//! `Drop`, so every exit path of an operation releases what it acquired,
//! including early `?` returns.

use crate::error::{Error, Result};
use tracing::debug;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::Security::SC_HANDLE;
use windows::Win32::System::Services::CloseServiceHandle;

/// An owned kernel object handle (processes), closed with `CloseHandle`.
#[derive(Debug)]
pub struct OwnedHandle {
    handle: HANDLE,
}

impl OwnedHandle {
    /// Takes ownership of a raw `HANDLE`.
    ///
    /// Returns an error if the handle is null or `INVALID_HANDLE_VALUE`.
    #[inline]
    pub fn new(handle: HANDLE) -> Result<Self> {
        if handle.is_invalid() || handle.0.is_null() {
            return Err(Error::invalid_handle("Cannot own an invalid process handle"));
        }
        Ok(Self { handle })
    }

    /// Returns the raw `HANDLE`.
    #[inline]
    pub fn as_raw(&self) -> HANDLE {
        self.handle
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        // SAFETY: the handle was validated in `new` and is owned exclusively.
        unsafe {
            let _ = CloseHandle(self.handle);
        }
    }
}

/// What a service control handle refers to; used in log output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScKind {
    /// The service control manager database.
    Manager,
    /// A single service.
    Service,
}

/// An owned service control handle, closed with `CloseServiceHandle`.
#[derive(Debug)]
pub struct ScHandle {
    handle: SC_HANDLE,
    kind: ScKind,
}

impl ScHandle {
    /// Takes ownership of a raw `SC_HANDLE`.
    ///
    /// Returns an error if the handle is null.
    pub fn new(handle: SC_HANDLE, kind: ScKind) -> Result<Self> {
        if handle.is_invalid() {
            return Err(Error::invalid_handle("Cannot own a null service handle"));
        }
        debug!(?kind, "opened service control handle");
        Ok(Self { handle, kind })
    }

    /// Returns the raw `SC_HANDLE`.
    #[inline]
    pub fn as_raw(&self) -> SC_HANDLE {
        self.handle
    }

    /// Returns what this handle refers to.
    #[inline]
    pub fn kind(&self) -> ScKind {
        self.kind
    }
}

impl Drop for ScHandle {
    fn drop(&mut self) {
        // SAFETY: the handle is non-null (checked in `new`) and owned
        // exclusively, so this is the only close.
        if let Err(e) = unsafe { CloseServiceHandle(self.handle) } {
            debug!(kind = ?self.kind, error = %e, "CloseServiceHandle failed");
        } else {
            debug!(kind = ?self.kind, "closed service control handle");
        }
    }
}
