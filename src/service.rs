//! Windows service control.
//!
//! Query, start, stop and pause services, and change their persisted start
//! mode. Every operation opens fresh handles through [`crate::scm`] and
//! releases them before returning; nothing is cached between calls.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> winctl::error::Result<()> {
//! use winctl::service::{self, StartMode, ServiceStatus};
//!
//! service::set_startup_type("Spooler", StartMode::Manual)?;
//! if service::status("Spooler")? == ServiceStatus::Stopped {
//!     service::start("Spooler", &[])?;
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Observed state of a service.
///
/// Reported states without a dedicated variant (continue-pending,
/// pause-pending, or codes this crate does not know) map to
/// [`ServiceStatus::Changing`] instead of failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceStatus {
    /// The service is running.
    Running,
    /// The service is not running.
    Stopped,
    /// The service is paused.
    Paused,
    /// The service is stopping.
    Stopping,
    /// The service is starting.
    Starting,
    /// Any other state; carries the raw state code.
    Changing(u32),
}

impl ServiceStatus {
    /// Maps a raw `SERVICE_STATUS::dwCurrentState` code.
    pub fn from_raw(state: u32) -> Self {
        match state {
            1 => ServiceStatus::Stopped,
            2 => ServiceStatus::Starting,
            3 => ServiceStatus::Stopping,
            4 => ServiceStatus::Running,
            7 => ServiceStatus::Paused,
            other => ServiceStatus::Changing(other),
        }
    }

    /// Returns the lower-case label for this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Running => "running",
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::Paused => "paused",
            ServiceStatus::Stopping => "stopping",
            ServiceStatus::Starting => "starting",
            ServiceStatus::Changing(_) => "status changing",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted start policy of a service.
///
/// Discriminants are the platform start-type codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum StartMode {
    /// Started by the boot loader (drivers only).
    Boot = 0,
    /// Started during kernel initialization (drivers only).
    System = 1,
    /// Started automatically at system startup.
    Automatic = 2,
    /// Started on demand.
    Manual = 3,
    /// Cannot be started.
    Disabled = 4,
}

impl StartMode {
    /// Returns the platform start-type code.
    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Returns the name accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            StartMode::Boot => "boot",
            StartMode::System => "system",
            StartMode::Automatic => "auto",
            StartMode::Manual => "manual",
            StartMode::Disabled => "disabled",
        }
    }
}

impl TryFrom<u32> for StartMode {
    type Error = Error;

    fn try_from(code: u32) -> Result<Self> {
        match code {
            0 => Ok(StartMode::Boot),
            1 => Ok(StartMode::System),
            2 => Ok(StartMode::Automatic),
            3 => Ok(StartMode::Manual),
            4 => Ok(StartMode::Disabled),
            other => Err(Error::invalid_input(format!("unknown start mode code {other}"))),
        }
    }
}

impl FromStr for StartMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "boot" => Ok(StartMode::Boot),
            "system" => Ok(StartMode::System),
            "auto" | "automatic" => Ok(StartMode::Automatic),
            "manual" | "demand" => Ok(StartMode::Manual),
            "disabled" => Ok(StartMode::Disabled),
            _ => Err(Error::invalid_input(format!("unknown start mode '{s}'"))),
        }
    }
}

impl fmt::Display for StartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(windows)]
pub use native::{pause, set_startup_type, start, startup_type, status, stop};

#[cfg(windows)]
mod native {
    use super::{ServiceStatus, StartMode};
    use crate::error::{Error, Result, ResultExt};
    use crate::scm::{ScManager, ServiceAccess, ServiceHandle};
    use crate::string::WideString;
    use tracing::{debug, info};
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::ERROR_INSUFFICIENT_BUFFER;
    use windows::Win32::System::Services::{
        ChangeServiceConfigW, ControlService, QueryServiceConfigW, QueryServiceStatus,
        StartServiceW, ENUM_SERVICE_TYPE, QUERY_SERVICE_CONFIGW, SERVICE_CONTROL_PAUSE,
        SERVICE_CONTROL_STOP, SERVICE_ERROR, SERVICE_NO_CHANGE, SERVICE_START_TYPE,
        SERVICE_STATUS,
    };

    fn open(name: &str, access: ServiceAccess) -> Result<ServiceHandle> {
        ScManager::connect()?.open_service(name, access)
    }

    /// Returns the current state of a service.
    pub fn status(name: &str) -> Result<ServiceStatus> {
        let service = open(name, ServiceAccess::QUERY_STATUS)?;
        let mut raw = SERVICE_STATUS::default();
        // SAFETY: the service handle is open with QUERY_STATUS access and raw
        // is a valid output buffer.
        unsafe { QueryServiceStatus(service.as_raw(), &mut raw) }.to_result()?;
        let state = ServiceStatus::from_raw(raw.dwCurrentState.0);
        debug!(service = name, %state, "queried service status");
        Ok(state)
    }

    /// Requests that a service start, forwarding `args` to its entry point.
    ///
    /// Returns once the service control manager accepts the request; the
    /// service may still be starting.
    pub fn start(name: &str, args: &[&str]) -> Result<()> {
        let service = open(name, ServiceAccess::START)?;
        let wide: Vec<WideString> = args.iter().map(|a| WideString::new(a)).collect();
        let vectors: Vec<PCWSTR> = wide.iter().map(WideString::as_pcwstr).collect();
        let vectors = if vectors.is_empty() {
            None
        } else {
            Some(vectors.as_slice())
        };
        // SAFETY: the handle has START access; every PCWSTR points into
        // `wide`, which outlives the call.
        unsafe { StartServiceW(service.as_raw(), vectors) }.or_mutation(name)?;
        info!(service = name, args = args.len(), "start requested");
        Ok(())
    }

    /// Sends the stop control to a service.
    pub fn stop(name: &str) -> Result<()> {
        control(name, ServiceAccess::STOP, SERVICE_CONTROL_STOP)?;
        info!(service = name, "stop requested");
        Ok(())
    }

    /// Sends the pause control to a service.
    pub fn pause(name: &str) -> Result<()> {
        control(name, ServiceAccess::PAUSE_CONTINUE, SERVICE_CONTROL_PAUSE)?;
        info!(service = name, "pause requested");
        Ok(())
    }

    fn control(name: &str, access: ServiceAccess, code: u32) -> Result<()> {
        let service = open(name, access)?;
        let mut raw = SERVICE_STATUS::default();
        // SAFETY: the handle carries the access right for `code` and raw is a
        // valid output buffer.
        unsafe { ControlService(service.as_raw(), code, &mut raw) }.or_mutation(name)
    }

    /// Changes the persisted start mode of a service.
    ///
    /// Only the start type is written; every other configuration field is
    /// passed as "no change".
    ///
    /// # Errors
    ///
    /// Fails with [`Error::OpenManager`] or [`Error::OpenService`] before any
    /// change is attempted when a handle cannot be opened, and with
    /// [`Error::Mutation`] when the configuration call is rejected. Handles
    /// are closed in all cases.
    pub fn set_startup_type(name: &str, mode: StartMode) -> Result<()> {
        let manager = ScManager::open_full()?;
        let service = manager.open_service(
            name,
            ServiceAccess::QUERY_CONFIG.with(ServiceAccess::CHANGE_CONFIG),
        )?;

        // SAFETY: the handle has CHANGE_CONFIG access. Null string pointers
        // and SERVICE_NO_CHANGE leave the corresponding fields untouched.
        unsafe {
            ChangeServiceConfigW(
                service.as_raw(),
                ENUM_SERVICE_TYPE(SERVICE_NO_CHANGE),
                SERVICE_START_TYPE(mode.code()),
                SERVICE_ERROR(SERVICE_NO_CHANGE),
                PCWSTR::null(),
                PCWSTR::null(),
                None,
                PCWSTR::null(),
                PCWSTR::null(),
                PCWSTR::null(),
                PCWSTR::null(),
            )
        }
        .or_mutation(name)?;

        info!(service = name, %mode, "changed service start mode");
        Ok(())
    }

    /// Checks the outcome of a zero-length size query.
    ///
    /// Only `ERROR_INSUFFICIENT_BUFFER` with a non-zero size lets the real
    /// read proceed; any other failure is returned as is.
    pub(super) fn size_query(result: windows::core::Result<()>, needed: u32) -> Result<()> {
        match result {
            Err(e) if e.code() == ERROR_INSUFFICIENT_BUFFER.to_hresult() && needed > 0 => Ok(()),
            Err(e) => Err(e.into()),
            Ok(()) => Err(Error::invalid_data(
                "service configuration query succeeded without a buffer",
            )),
        }
    }

    /// Reads the persisted start mode of a service.
    pub fn startup_type(name: &str) -> Result<StartMode> {
        let service = open(name, ServiceAccess::QUERY_CONFIG)?;

        let mut needed = 0u32;
        // SAFETY: a null buffer with size 0 only reports the required size.
        let sizing = unsafe { QueryServiceConfigW(service.as_raw(), None, 0, &mut needed) };
        size_query(sizing, needed)?;

        // u64 storage keeps the buffer aligned for QUERY_SERVICE_CONFIGW.
        let words = (needed as usize).div_ceil(std::mem::size_of::<u64>());
        let mut buffer = vec![0u64; words];
        let config = buffer.as_mut_ptr().cast::<QUERY_SERVICE_CONFIGW>();

        // SAFETY: buffer holds at least `needed` bytes and is suitably
        // aligned; the strings it receives point back into the buffer.
        unsafe { QueryServiceConfigW(service.as_raw(), Some(config), needed, &mut needed) }
            .to_result()?;

        // SAFETY: the call succeeded, so the struct at the head of the
        // buffer is initialized.
        let code = unsafe { (*config).dwStartType.0 };
        StartMode::try_from(code).map_err(|_| {
            Error::invalid_data(format!("service '{name}' reports start type {code}"))
        })
    }
}
