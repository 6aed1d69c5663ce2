//! # Serialized Time-Stamp Counter Samples
//!
//! Bracket a measured region with [`rdtsc_begin`] and [`rdtsc_end`]:
//!
//! ```text
//! begin: mfence; cpuid; rdtscp; mfence    (earlier work retired first)
//! end:   mfence; rdtscp; cpuid; mfence    (later work cannot start early)
//! ```
//!
//! ```rust
//! # #[cfg(target_arch = "x86_64")] {
//! let start = step_registers::rdtsc_begin();
//! let end = step_registers::rdtsc_end();
//! assert!(end >= start);
//! # }
//! ```

/// Sample the TSC at the start of a measured region.
#[inline(always)]
#[allow(clippy::inline_always)]
#[must_use]
pub fn rdtsc_begin() -> u64 {
    let lo: u32;
    let hi: u32;
    // SAFETY: fences, CPUID and RDTSCP touch only the registers declared
    // below; RBX is saved and restored around CPUID.
    unsafe {
        core::arch::asm!(
            "mfence",
            "push rbx",
            "xor eax, eax",
            "cpuid",
            "pop rbx",
            "rdtscp",
            "mfence",
            lateout("eax") lo,
            lateout("edx") hi,
            lateout("ecx") _,
        );
    }
    (u64::from(hi) << 32) | u64::from(lo)
}

/// Sample the TSC at the end of a measured region.
#[inline(always)]
#[allow(clippy::inline_always)]
#[must_use]
pub fn rdtsc_end() -> u64 {
    let lo: u32;
    let hi: u32;
    // SAFETY: as for `rdtsc_begin`; the sample is moved out of EAX/EDX
    // before CPUID overwrites them.
    unsafe {
        core::arch::asm!(
            "mfence",
            "rdtscp",
            "mov {lo:e}, eax",
            "mov {hi:e}, edx",
            "push rbx",
            "xor eax, eax",
            "cpuid",
            "pop rbx",
            "mfence",
            lo = out(reg) lo,
            hi = out(reg) hi,
            out("eax") _,
            out("ecx") _,
            out("edx") _,
        );
    }
    (u64::from(hi) << 32) | u64::from(lo)
}
