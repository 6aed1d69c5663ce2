//! # Remapped Windows
//!
//! A [`RemappedWindow`] is one page of this process' address space backed by
//! one page of physical memory. The requested physical address keeps its
//! low 12 bits: [`address`](RemappedWindow::address) points at the exact
//! byte, [`page_address`](RemappedWindow::page_address) at the page start.
//!
//! Nothing is read through the window on creation. Pages may be MMIO, where
//! a read has side effects or faults, so every accessor is `unsafe`.

use std::ptr::NonNull;

use step_vmem::{PageEntryBits, PhysicalAddress};

use crate::StepError;

/// Granularity of a window.
pub const PAGE_SIZE: usize = 4096;

/// How writes through a window propagate.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RemapMode {
    /// Writes reach physical memory and are visible to every other mapping.
    Shared,
    /// Copy-on-write: the first write gives this window a private copy.
    Private,
}

impl RemapMode {
    pub(crate) const fn mmap_flags(self) -> libc::c_int {
        match self {
            Self::Shared => libc::MAP_SHARED,
            Self::Private => libc::MAP_PRIVATE,
        }
    }
}

/// One physical page mapped into this process. Unmapped on drop.
#[derive(Debug)]
pub struct RemappedWindow {
    page: NonNull<u8>,
    physical: PhysicalAddress,
    mode: RemapMode,
}

// SAFETY: the window owns its mapping exclusively; the pointer is never
// shared except through `&self`/`&mut self` accessors.
unsafe impl Send for RemappedWindow {}

impl RemappedWindow {
    /// # Safety
    /// `page` must be the start of a live `PAGE_SIZE` mapping owned by the
    /// returned window.
    pub(crate) const unsafe fn from_raw(
        page: NonNull<u8>,
        physical: PhysicalAddress,
        mode: RemapMode,
    ) -> Self {
        Self {
            page,
            physical,
            mode,
        }
    }

    /// Physical address this window was requested for.
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        self.physical
    }

    #[must_use]
    pub const fn mode(&self) -> RemapMode {
        self.mode
    }

    /// Byte offset of [`physical_address`](Self::physical_address) within
    /// the page.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn offset(&self) -> usize {
        (self.physical.as_u64() & (PAGE_SIZE as u64 - 1)) as usize
    }

    /// Start of the mapped page.
    #[must_use]
    pub const fn page_address(&self) -> *mut u8 {
        self.page.as_ptr()
    }

    /// The mapped byte: `page_address | (physical_address & 0xFFF)`.
    #[must_use]
    pub fn address(&self) -> *mut u8 {
        self.page.as_ptr().wrapping_add(self.offset())
    }

    /// Keep the mapping for the rest of the process and return the address
    /// of the mapped byte.
    #[must_use]
    pub fn leak(self) -> *mut u8 {
        let address = self.address();
        log::warn!(
            "leaking window {:p} onto {}",
            self.page.as_ptr(),
            self.physical
        );
        std::mem::forget(self);
        address
    }

    /// The whole page.
    ///
    /// # Safety
    /// The backing physical page must be readable without side effects and
    /// must not change while the slice is alive.
    #[must_use]
    pub const unsafe fn page(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.page.as_ptr(), PAGE_SIZE) }
    }

    /// The whole page, writable.
    ///
    /// # Safety
    /// As for [`page`](Self::page); writes to a shared window change
    /// physical memory.
    #[must_use]
    pub const unsafe fn page_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.page.as_ptr(), PAGE_SIZE) }
    }

    fn u64_slot(&self, offset: usize) -> Result<*mut u64, StepError> {
        let len = size_of::<u64>();
        if offset % len != 0 || offset.checked_add(len).is_none_or(|end| end > PAGE_SIZE) {
            return Err(StepError::WindowBounds { offset, len });
        }
        Ok(self.page.as_ptr().wrapping_add(offset).cast())
    }

    /// Volatile 8-byte read at `offset` from the page start.
    ///
    /// # Errors
    /// [`StepError::WindowBounds`] unless `offset` is 8-byte aligned and
    /// the read stays inside the page.
    ///
    /// # Safety
    /// The backing physical location must be readable.
    pub unsafe fn read_u64(&self, offset: usize) -> Result<u64, StepError> {
        let slot = self.u64_slot(offset)?;
        Ok(unsafe { slot.read_volatile() })
    }

    /// Volatile 8-byte write at `offset` from the page start.
    ///
    /// # Errors
    /// [`StepError::WindowBounds`] unless `offset` is 8-byte aligned and
    /// the write stays inside the page.
    ///
    /// # Safety
    /// The backing physical location must be writable.
    pub unsafe fn write_u64(&mut self, offset: usize, value: u64) -> Result<(), StepError> {
        let slot = self.u64_slot(offset)?;
        unsafe { slot.write_volatile(value) };
        Ok(())
    }

    /// Read the paging-structure entry this window points at.
    ///
    /// # Errors
    /// [`StepError::WindowBounds`] if the window was not opened on an
    /// 8-byte aligned entry address.
    ///
    /// # Safety
    /// As for [`read_u64`](Self::read_u64).
    pub unsafe fn read_entry(&self) -> Result<PageEntryBits, StepError> {
        let raw = unsafe { self.read_u64(self.offset()) }?;
        Ok(PageEntryBits::from_bits(raw))
    }

    /// Overwrite the paging-structure entry this window points at.
    ///
    /// # Errors
    /// As for [`read_entry`](Self::read_entry).
    ///
    /// # Safety
    /// The window must be shared and point at a live entry; the CPU may
    /// keep using a stale translation until the TLB is flushed.
    pub unsafe fn write_entry(&mut self, entry: PageEntryBits) -> Result<(), StepError> {
        let offset = self.offset();
        unsafe { self.write_u64(offset, entry.into_bits()) }
    }
}

impl Drop for RemappedWindow {
    fn drop(&mut self) {
        // SAFETY: `page` is the start of a PAGE_SIZE mapping this window owns.
        let rc = unsafe { libc::munmap(self.page.as_ptr().cast(), PAGE_SIZE) };
        if rc == 0 {
            log::debug!("unmapped window onto {}", self.physical);
        } else {
            log::warn!(
                "munmap of window onto {} failed: {}",
                self.physical,
                std::io::Error::last_os_error()
            );
        }
    }
}
