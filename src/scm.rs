//! Service control manager handles.
//!
//! Opens the local service control manager and individual services,
//! translating null-handle results into [`Error::OpenManager`] and
//! [`Error::OpenService`]. Both handle types close themselves on drop, so a
//! manager opened before a failed service open is still released.

use crate::error::{describe, Error, Result};
use crate::handle::{ScHandle, ScKind};
use crate::string::WideString;
use tracing::debug;
use windows::core::PCWSTR;
use windows::Win32::Security::SC_HANDLE;
use windows::Win32::System::Services::{
    OpenSCManagerW, OpenServiceW, SC_MANAGER_ALL_ACCESS, SC_MANAGER_CONNECT,
    SERVICE_CHANGE_CONFIG, SERVICE_PAUSE_CONTINUE, SERVICE_QUERY_CONFIG, SERVICE_QUERY_STATUS,
    SERVICE_START, SERVICE_STOP,
};

/// Service access rights requested by [`ScManager::open_service`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceAccess(pub u32);

impl ServiceAccess {
    /// Read the persisted configuration.
    pub const QUERY_CONFIG: Self = Self(SERVICE_QUERY_CONFIG);

    /// Change the persisted configuration.
    pub const CHANGE_CONFIG: Self = Self(SERVICE_CHANGE_CONFIG);

    /// Query the current status.
    pub const QUERY_STATUS: Self = Self(SERVICE_QUERY_STATUS);

    /// Start the service.
    pub const START: Self = Self(SERVICE_START);

    /// Stop the service.
    pub const STOP: Self = Self(SERVICE_STOP);

    /// Pause or continue the service.
    pub const PAUSE_CONTINUE: Self = Self(SERVICE_PAUSE_CONTINUE);

    /// Combines two access masks.
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// An open handle to the local service control manager.
pub struct ScManager {
    handle: ScHandle,
}

impl ScManager {
    /// Opens the service control manager with full access.
    ///
    /// Required for configuration changes.
    pub fn open_full() -> Result<Self> {
        Self::open(SC_MANAGER_ALL_ACCESS)
    }

    /// Opens the service control manager with connect access only.
    ///
    /// Sufficient for opening services to query or control them.
    pub fn connect() -> Result<Self> {
        Self::open(SC_MANAGER_CONNECT)
    }

    fn open(access: u32) -> Result<Self> {
        // SAFETY: null machine and database names select the local active
        // database; the returned handle is owned by the ScHandle below.
        let raw = unsafe { OpenSCManagerW(PCWSTR::null(), PCWSTR::null(), access) }.map_err(
            |e| {
                let (code, message) = describe(&e);
                Error::OpenManager { code, message }
            },
        )?;
        let handle = ScHandle::new(raw, ScKind::Manager)?;
        debug!(access = format_args!("{access:#x}"), "opened service control manager");
        Ok(Self { handle })
    }

    /// Opens a service by short name, requesting exactly `access`.
    pub fn open_service(&self, name: &str, access: ServiceAccess) -> Result<ServiceHandle> {
        let name_wide = WideString::new(name);
        // SAFETY: the manager handle is open for the lifetime of `self`, and
        // name_wide is a valid null-terminated string.
        let raw = unsafe { OpenServiceW(self.handle.as_raw(), name_wide.as_pcwstr(), access.0) }
            .map_err(|e| {
                let (code, message) = describe(&e);
                Error::OpenService {
                    service: name.to_string(),
                    code,
                    message,
                }
            })?;
        let handle = ScHandle::new(raw, ScKind::Service)?;
        debug!(service = name, access = format_args!("{:#x}", access.0), "opened service");
        Ok(ServiceHandle {
            handle,
            name: name.to_string(),
        })
    }
}

/// An open handle to one service.
pub struct ServiceHandle {
    handle: ScHandle,
    name: String,
}

impl ServiceHandle {
    /// Returns the raw `SC_HANDLE`.
    #[inline]
    pub fn as_raw(&self) -> SC_HANDLE {
        self.handle.as_raw()
    }

    /// Returns the service short name this handle was opened with.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}
