//! Launching external programs.
//!
//! [`Launcher`] starts a program with optional arguments, working
//! directory, hidden window and elevation, and can either wait for it to exit
//! or return immediately. Launches go through the shell by default, so
//! installers, scripts and documents open with their associated handler;
//! [`Launcher::direct`] starts an executable image without the shell.
//! Capturing the program's output is not supported.

use crate::error::{Error, Result};
use std::borrow::Cow;

/// Result of a launch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Launched {
    /// Process ID, or 0 if the shell did not report a process.
    pub pid: u32,
    /// Exit code, present only when the launch waited for exit.
    pub exit_code: Option<u32>,
}

/// Builder for launching a program.
#[derive(Clone, Debug)]
pub struct Launcher {
    program: String,
    args: Vec<String>,
    raw_args: Option<String>,
    current_dir: Option<String>,
    hidden: bool,
    elevated: bool,
    direct: bool,
    wait: bool,
}

impl Launcher {
    /// Creates a launcher for the specified program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            raw_args: None,
            current_dir: None,
            hidden: false,
            elevated: false,
            direct: false,
            wait: false,
        }
    }

    /// Adds an argument, quoted as needed.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds multiple arguments, each quoted as needed.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends a pre-formatted argument string verbatim, after any quoted arguments.
    pub fn raw_args(mut self, args: impl Into<String>) -> Self {
        self.raw_args = Some(args.into());
        self
    }

    /// Sets the working directory for the program.
    pub fn current_dir(mut self, dir: impl Into<String>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Starts the program without a visible window.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Starts the program elevated through the `runas` shell verb.
    pub fn elevated(mut self) -> Self {
        self.elevated = true;
        self
    }

    /// Starts the executable image with `CreateProcessW` instead of the shell.
    ///
    /// The program must be an executable; file associations are not
    /// consulted. Cannot be combined with [`Launcher::elevated`].
    pub fn direct(mut self) -> Self {
        self.direct = true;
        self
    }

    /// Blocks until the program exits and reports its exit code.
    pub fn wait(mut self) -> Self {
        self.wait = true;
        self
    }

    /// Returns the argument string passed after the program name.
    fn parameters(&self) -> String {
        let mut params = String::new();
        for arg in &self.args {
            if !params.is_empty() {
                params.push(' ');
            }
            params.push_str(&quote_arg(arg));
        }
        if let Some(raw) = &self.raw_args {
            if !params.is_empty() {
                params.push(' ');
            }
            params.push_str(raw);
        }
        params
    }

    /// Returns the full command line, program first.
    fn command_line(&self) -> String {
        let params = self.parameters();
        let program = quote_arg(&self.program);
        if params.is_empty() {
            program.into_owned()
        } else {
            format!("{program} {params}")
        }
    }

    /// Rejects option combinations that cannot be honoured.
    fn validate(&self) -> Result<()> {
        if self.program.is_empty() {
            return Err(Error::invalid_input("program name is empty"));
        }
        if self.direct && self.elevated {
            return Err(Error::invalid_input(format!(
                "'{}': elevation needs the shell and cannot be combined with a direct launch",
                self.program
            )));
        }
        Ok(())
    }

    /// Launches the program.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty program or a direct
    /// elevated launch, before anything is started. Otherwise returns an
    /// error if the program cannot be started (not found, no associated
    /// handler, or the elevation prompt was declined) or if waiting for it
    /// fails.
    #[cfg(windows)]
    pub fn launch(self) -> Result<Launched> {
        self.validate()?;
        if self.direct {
            native::create_process(&self)
        } else {
            native::shell_execute(&self)
        }
    }
}

/// Quotes a command-line argument using the MSVCRT parsing rules.
///
/// Returns `Cow::Borrowed` when no quoting is needed.
pub fn quote_arg(arg: &str) -> Cow<'_, str> {
    let needs_quoting = arg.is_empty() || arg.bytes().any(|b| matches!(b, b' ' | b'\t' | b'"'));
    if !needs_quoting {
        return Cow::Borrowed(arg);
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    let mut backslashes = 0usize;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                // Backslashes before a quote are doubled, plus one for the quote.
                quoted.extend(std::iter::repeat('\\').take(backslashes * 2 + 1));
                quoted.push('"');
                backslashes = 0;
            }
            _ => {
                quoted.extend(std::iter::repeat('\\').take(backslashes));
                quoted.push(c);
                backslashes = 0;
            }
        }
    }
    // Trailing backslashes precede the closing quote.
    quoted.extend(std::iter::repeat('\\').take(backslashes * 2));
    quoted.push('"');
    Cow::Owned(quoted)
}

#[cfg(windows)]
mod native {
    use super::{Launched, Launcher};
    use crate::error::{Result, ResultExt};
    use crate::handle::OwnedHandle;
    use crate::string::{to_wide, WideString};
    use tracing::info;
    use windows::core::{PCWSTR, PWSTR};
    use windows::Win32::Foundation::{CloseHandle, WAIT_OBJECT_0};
    use windows::Win32::System::Threading::{
        CreateProcessW, GetExitCodeProcess, GetProcessId, WaitForSingleObject, CREATE_NO_WINDOW,
        INFINITE, PROCESS_CREATION_FLAGS, PROCESS_INFORMATION, STARTF_USESHOWWINDOW,
        STARTUPINFOW,
    };
    use windows::Win32::UI::Shell::{
        ShellExecuteExW, SEE_MASK_FLAG_NO_UI, SEE_MASK_NOCLOSEPROCESS, SHELLEXECUTEINFOW,
    };
    use windows::Win32::UI::WindowsAndMessaging::{SW_HIDE, SW_SHOWNORMAL};

    pub(super) fn create_process(launcher: &Launcher) -> Result<Launched> {
        let mut command_line = to_wide(&launcher.command_line());
        let dir = launcher.current_dir.as_deref().map(WideString::new);

        let mut startup_info = STARTUPINFOW {
            cb: std::mem::size_of::<STARTUPINFOW>() as u32,
            ..Default::default()
        };
        let mut flags = PROCESS_CREATION_FLAGS(0);
        if launcher.hidden {
            flags = CREATE_NO_WINDOW;
            startup_info.dwFlags = STARTF_USESHOWWINDOW;
            startup_info.wShowWindow = SW_HIDE.0 as u16;
        }

        let mut process_info = PROCESS_INFORMATION::default();

        // SAFETY: command_line is a mutable null-terminated buffer (the call
        // may write to it), dir is null or a valid string, and both info
        // structs are valid for the duration of the call.
        unsafe {
            CreateProcessW(
                PCWSTR::null(),
                PWSTR(command_line.as_mut_ptr()),
                None,
                None,
                false,
                flags,
                None,
                dir.as_ref().map_or(PCWSTR::null(), WideString::as_pcwstr),
                &startup_info,
                &mut process_info,
            )
        }
        .to_result()?;

        // SAFETY: the thread handle was returned by CreateProcessW and is not
        // needed.
        unsafe {
            let _ = CloseHandle(process_info.hThread);
        }

        let process = OwnedHandle::new(process_info.hProcess)?;
        info!(program = %launcher.program, pid = process_info.dwProcessId, "launched program");
        finish(launcher, &process, process_info.dwProcessId)
    }

    pub(super) fn shell_execute(launcher: &Launcher) -> Result<Launched> {
        let verb = launcher.elevated.then(|| WideString::new("runas"));
        let file = WideString::new(&launcher.program);
        let params = WideString::new(&launcher.parameters());
        let dir = launcher.current_dir.as_deref().map(WideString::new);

        let mut exec_info = SHELLEXECUTEINFOW {
            cbSize: std::mem::size_of::<SHELLEXECUTEINFOW>() as u32,
            fMask: SEE_MASK_NOCLOSEPROCESS | SEE_MASK_FLAG_NO_UI,
            lpVerb: verb.as_ref().map_or(PCWSTR::null(), WideString::as_pcwstr),
            lpFile: file.as_pcwstr(),
            lpParameters: params.as_pcwstr(),
            lpDirectory: dir.as_ref().map_or(PCWSTR::null(), WideString::as_pcwstr),
            nShow: if launcher.hidden { SW_HIDE.0 } else { SW_SHOWNORMAL.0 },
            ..Default::default()
        };

        // SAFETY: every string pointer in `exec_info` refers to a WideString that
        // lives until the end of this function.
        unsafe { ShellExecuteExW(&mut exec_info) }.to_result()?;

        if exec_info.hProcess.is_invalid() {
            // The shell handed the request to an existing process.
            info!(program = %launcher.program, "launched program through the shell");
            return Ok(Launched {
                pid: 0,
                exit_code: None,
            });
        }
        let process = OwnedHandle::new(exec_info.hProcess)?;
        // SAFETY: the process handle is open and owned above.
        let pid = unsafe { GetProcessId(process.as_raw()) };
        info!(program = %launcher.program, pid, elevated = launcher.elevated, "launched program through the shell");
        finish(launcher, &process, pid)
    }

    fn finish(launcher: &Launcher, process: &OwnedHandle, pid: u32) -> Result<Launched> {
        if !launcher.wait {
            return Ok(Launched {
                pid,
                exit_code: None,
            });
        }

        // SAFETY: the process handle is open for the duration of the wait.
        let result = unsafe { WaitForSingleObject(process.as_raw(), INFINITE) };
        if result != WAIT_OBJECT_0 {
            return Err(crate::error::last_error());
        }

        let mut exit_code = 0u32;
        // SAFETY: the handle has query access and exit_code is a valid output.
        unsafe { GetExitCodeProcess(process.as_raw(), &mut exit_code) }.to_result()?;
        info!(program = %launcher.program, pid, exit_code, "program exited");
        Ok(Launched {
            pid,
            exit_code: Some(exit_code),
        })
    }
}
