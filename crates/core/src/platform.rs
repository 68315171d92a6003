//! Platform detection
//!
//! Provides OS information and the shell used to run prerequisite check
//! commands on that OS:
//! - Windows → `"windows"`, checks run through `powershell -NoProfile -Command`
//! - macOS → `"darwin"`, Linux → `"linux"`, checks run through `sh -c`
//!
//! Platform info is cached on first access.

use std::sync::LazyLock;

/// Current platform information (cached)
///
/// # Example
/// ```
/// use keepstate_core::platform::CURRENT_PLATFORM;
///
/// let (shell, _args) = CURRENT_PLATFORM.shell();
/// assert!(!shell.is_empty());
/// ```
pub static CURRENT_PLATFORM: LazyLock<Platform> = LazyLock::new(Platform::detect);

/// Platform information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// OS: "darwin" (macOS), "linux", "windows", "unknown"
    pub os: &'static str,
    /// CPU architecture: "x86_64", "aarch64", etc.
    pub arch: &'static str,
}

impl Platform {
    pub fn detect() -> Self {
        Self {
            os: Self::detect_os(),
            arch: std::env::consts::ARCH,
        }
    }

    /// Whether this is a Windows host
    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    /// Shell program and leading arguments for running a command line
    pub fn shell(&self) -> (&'static str, &'static [&'static str]) {
        if self.is_windows() {
            ("powershell", &["-NoProfile", "-NonInteractive", "-Command"])
        } else {
            ("sh", &["-c"])
        }
    }

    const fn detect_os() -> &'static str {
        #[cfg(target_os = "macos")]
        {
            "darwin"
        }

        #[cfg(target_os = "linux")]
        {
            "linux"
        }

        #[cfg(target_os = "windows")]
        {
            "windows"
        }

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            "unknown"
        }
    }
}
