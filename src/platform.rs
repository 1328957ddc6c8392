//! Host platform detection.
//!
//! Maps the kernel name and machine hardware name (as `uname -s` / `uname -m`
//! report them) to a normalized [`SystemProfile`]. Unrecognised values become
//! `Unknown`; detection never fails.

use std::fmt;

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    Macos,
    Windows,
    Unknown,
}

impl Os {
    /// Case-insensitive prefix match on a kernel name.
    pub fn from_kernel_name(kernel: &str) -> Self {
        let kernel = kernel.trim().to_ascii_lowercase();
        if kernel.starts_with("linux") {
            Self::Linux
        } else if kernel.starts_with("darwin") {
            Self::Macos
        } else if ["cygwin", "mingw", "msys", "windows"]
            .iter()
            .any(|p| kernel.starts_with(p))
        {
            Self::Windows
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Windows => "windows",
            Self::Unknown => "unknown",
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86_64,
    X86,
    Aarch64,
    Arm,
    Unknown,
}

impl Arch {
    /// Exact or prefix match on a machine hardware name.
    pub fn from_machine_name(machine: &str) -> Self {
        match machine.trim() {
            "x86_64" | "amd64" => Self::X86_64,
            "i386" | "i686" => Self::X86,
            "arm64" | "aarch64" => Self::Aarch64,
            m if m.starts_with("armv7") => Self::Arm,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::X86 => "x86",
            Self::Aarch64 => "aarch64",
            Self::Arm => "arm",
            Self::Unknown => "unknown",
        }
    }

    /// Whether pre-built release artifacts are published for this arch.
    /// Only the two x86 variants have them.
    pub fn has_prebuilt(self) -> bool {
        matches!(self, Self::X86_64 | Self::X86)
    }
}

/// Normalized host identity, detected once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemProfile {
    pub os: Os,
    pub arch: Arch,
}

impl SystemProfile {
    /// Build a profile from raw `uname` strings.
    pub fn from_uname(kernel: &str, machine: &str) -> Self {
        Self {
            os: Os::from_kernel_name(kernel),
            arch: Arch::from_machine_name(machine),
        }
    }

    /// Detect the running host.
    pub fn detect() -> Self {
        let (kernel, machine) = host_identity();
        Self::from_uname(&kernel, &machine)
    }
}

impl fmt::Display for SystemProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

/// Kernel and machine names from `uname(2)`, falling back to the
/// compile-time target when the call fails.
#[cfg(unix)]
fn host_identity() -> (String, String) {
    use std::ffi::CStr;

    // SAFETY: utsname is plain old data; uname fills it with NUL-terminated
    // strings on success and we only read it in that case.
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } != 0 {
        return compile_time_identity();
    }
    let field = |raw: &[libc::c_char]| {
        // SAFETY: uname NUL-terminates every field within its buffer.
        unsafe { CStr::from_ptr(raw.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    };
    (field(&uts.sysname[..]), field(&uts.machine[..]))
}

#[cfg(not(unix))]
fn host_identity() -> (String, String) {
    compile_time_identity()
}

fn compile_time_identity() -> (String, String) {
    let kernel = match std::env::consts::OS {
        "macos" => "Darwin",
        other => other,
    };
    let machine = match std::env::consts::ARCH {
        "x86" => "i686",
        "arm" => "armv7l",
        other => other,
    };
    (kernel.to_string(), machine.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_mapping_table() {
        let cases = [
            ("Linux", Os::Linux),
            ("linux-gnu", Os::Linux),
            ("Darwin", Os::Macos),
            ("CYGWIN_NT-10.0", Os::Windows),
            ("MINGW64_NT-10.0-19045", Os::Windows),
            ("MSYS_NT-10.0", Os::Windows),
            ("FreeBSD", Os::Unknown),
            ("", Os::Unknown),
        ];
        for (kernel, expected) in cases {
            assert_eq!(Os::from_kernel_name(kernel), expected, "kernel {kernel:?}");
        }
    }

    #[test]
    fn test_arch_mapping_table() {
        let cases = [
            ("x86_64", Arch::X86_64),
            ("i386", Arch::X86),
            ("i686", Arch::X86),
            ("arm64", Arch::Aarch64),
            ("aarch64", Arch::Aarch64),
            ("armv7l", Arch::Arm),
            ("armv7", Arch::Arm),
            ("armv6l", Arch::Unknown),
            ("riscv64", Arch::Unknown),
            ("", Arch::Unknown),
        ];
        for (machine, expected) in cases {
            assert_eq!(
                Arch::from_machine_name(machine),
                expected,
                "machine {machine:?}"
            );
        }
    }

    #[test]
    fn test_unmapped_fields_degrade_independently() {
        let p = SystemProfile::from_uname("Plan9", "x86_64");
        assert_eq!(p.os, Os::Unknown);
        assert_eq!(p.arch, Arch::X86_64);

        let p = SystemProfile::from_uname("Linux", "s390x");
        assert_eq!(p.os, Os::Linux);
        assert_eq!(p.arch, Arch::Unknown);
    }

    #[test]
    fn test_only_x86_has_prebuilt() {
        assert!(Arch::X86_64.has_prebuilt());
        assert!(Arch::X86.has_prebuilt());
        assert!(!Arch::Aarch64.has_prebuilt());
        assert!(!Arch::Arm.has_prebuilt());
        assert!(!Arch::Unknown.has_prebuilt());
    }

    #[test]
    fn test_display() {
        let p = SystemProfile::from_uname("Darwin", "arm64");
        assert_eq!(p.to_string(), "macos-aarch64");
    }

    #[test]
    fn test_detect_matches_compile_target() {
        let p = SystemProfile::detect();
        #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
        assert_eq!(p, SystemProfile { os: Os::Linux, arch: Arch::X86_64 });
        #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
        assert_eq!(p, SystemProfile { os: Os::Macos, arch: Arch::Aarch64 });
        let _ = p;
    }
}
