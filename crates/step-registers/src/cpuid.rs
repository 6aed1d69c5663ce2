/// Leaf reporting the highest supported extended leaf in `EAX`.
const LEAF_MAX_EXTENDED: u32 = 0x8000_0000;

/// Execute CPUID with the given leaf and subleaf.
///
/// CPUID is unprivileged and always present on x86-64.
#[inline(always)]
#[allow(unused_assignments, clippy::inline_always)]
#[must_use]
pub fn cpuid(leaf: u32, subleaf: u32) -> CpuidResult {
    let (mut eax, mut ebx, mut ecx, mut edx) = (leaf, 0u32, subleaf, 0u32);
    // SAFETY: CPUID only writes the four registers bound below; RBX is
    // saved and restored around it.
    unsafe {
        core::arch::asm!(
            "push rbx",
            "cpuid",
            "mov {ebx_out:e}, ebx",
            "pop rbx",
            ebx_out = lateout(reg) ebx,
            inlateout("eax") eax,
            inlateout("ecx") ecx,
            lateout("edx") edx,
            options(nomem, preserves_flags),
        );
    }
    CpuidResult { eax, ebx, ecx, edx }
}

/// Highest extended leaf (`0x8000_xxxx`) this CPU answers.
#[must_use]
pub fn max_extended_leaf() -> u32 {
    cpuid(LEAF_MAX_EXTENDED, 0).eax
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(C)]
pub struct CpuidResult {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_leaf_is_readable() {
        let r = cpuid(0, 0);
        assert!(r.eax >= 1, "max basic leaf");
        assert_ne!(r.ebx, 0);
    }

    #[test]
    fn extended_range_starts_above_base() {
        assert!(max_extended_leaf() >= LEAF_MAX_EXTENDED);
    }
}
