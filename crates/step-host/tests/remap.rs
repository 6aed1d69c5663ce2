use std::fs;
use std::os::unix::fs::FileExt;

use step_host::{PAGE_SIZE, PhysicalMemory, RemapMode, StepError};
use step_vmem::PhysicalAddress;
use tempfile::NamedTempFile;

/// A four-page stand-in for the physical memory device; every u64 slot
/// holds its own byte address.
fn fake_memory() -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    let bytes: Vec<u8> = (0..4 * PAGE_SIZE as u64)
        .step_by(8)
        .flat_map(u64::to_ne_bytes)
        .collect();
    fs::write(file.path(), bytes).unwrap();
    file
}

fn read_backing(file: &NamedTempFile, at: u64) -> u64 {
    let mut buf = [0u8; 8];
    file.as_file().read_exact_at(&mut buf, at).unwrap();
    u64::from_ne_bytes(buf)
}

#[test]
fn window_keeps_the_low_twelve_bits() {
    let backing = fake_memory();
    let mem = PhysicalMemory::open(backing.path(), false).unwrap();

    let window = mem.remap_shared(PhysicalAddress::new(0x2123)).unwrap();
    assert_eq!(window.offset(), 0x123);
    assert_eq!(window.page_address().addr() % PAGE_SIZE, 0);
    assert_eq!(window.address().addr(), window.page_address().addr() | 0x123);
    assert_eq!(window.physical_address().as_u64(), 0x2123);
    assert_eq!(window.mode(), RemapMode::Shared);

    // The page start corresponds to physical 0x2000.
    assert_eq!(unsafe { window.read_u64(0) }.unwrap(), 0x2000);
    assert_eq!(unsafe { window.read_u64(0x120) }.unwrap(), 0x2120);
    assert_eq!(unsafe { window.page() }.len(), PAGE_SIZE);
}

#[test]
fn shared_writes_reach_memory_and_other_windows() {
    let backing = fake_memory();
    let mem = PhysicalMemory::open(backing.path(), false).unwrap();

    let mut a = mem.remap(PhysicalAddress::new(0x1000), RemapMode::Shared).unwrap();
    let b = mem.remap(PhysicalAddress::new(0x1FF8), RemapMode::Shared).unwrap();

    unsafe { a.write_u64(0xFF8, 0xDEAD_BEEF) }.unwrap();
    assert_eq!(unsafe { b.read_u64(0xFF8) }.unwrap(), 0xDEAD_BEEF);
    assert_eq!(unsafe { b.read_entry() }.unwrap().into_bits(), 0xDEAD_BEEF);

    drop(a);
    drop(b);
    assert_eq!(read_backing(&backing, 0x1FF8), 0xDEAD_BEEF);
}

#[test]
fn private_writes_stay_private() {
    let backing = fake_memory();
    let mem = PhysicalMemory::open(backing.path(), false).unwrap();

    let mut private = mem.remap_private(PhysicalAddress::new(0x3008)).unwrap();
    let shared = mem.remap_shared(PhysicalAddress::new(0x3008)).unwrap();

    unsafe { private.page_mut()[8..16].copy_from_slice(&7u64.to_ne_bytes()) };
    assert_eq!(unsafe { private.read_u64(8) }.unwrap(), 7);
    assert_eq!(unsafe { shared.read_u64(8) }.unwrap(), 0x3008);

    drop(private);
    assert_eq!(read_backing(&backing, 0x3008), 0x3008);
}

#[test]
fn accessors_reject_out_of_page_and_misaligned_offsets() {
    let backing = fake_memory();
    let mem = PhysicalMemory::open(backing.path(), false).unwrap();
    let mut window = mem.remap_shared(PhysicalAddress::new(0)).unwrap();

    for offset in [PAGE_SIZE, PAGE_SIZE - 4, 3, usize::MAX] {
        assert!(matches!(
            unsafe { window.read_u64(offset) },
            Err(StepError::WindowBounds { len: 8, .. })
        ));
        assert!(unsafe { window.write_u64(offset, 0) }.is_err());
    }
    assert_eq!(unsafe { window.read_u64(PAGE_SIZE - 8) }.unwrap(), 0xFF8);
}

#[test]
fn leaked_window_stays_mapped() {
    let backing = fake_memory();
    let mem = PhysicalMemory::open(backing.path(), false).unwrap();
    let window = mem.remap_shared(PhysicalAddress::new(0x1010)).unwrap();

    let address = window.leak();
    let value = unsafe { address.cast::<u64>().read_volatile() };
    assert_eq!(value, 0x1010);
}

#[test]
fn second_open_of_the_same_device_is_refused() {
    let backing = fake_memory();
    let first = PhysicalMemory::open(backing.path(), false).unwrap();
    assert!(matches!(
        PhysicalMemory::open(backing.path(), false),
        Err(StepError::AlreadyOpen { .. })
    ));
    drop(first);
    assert!(PhysicalMemory::open(backing.path(), false).is_ok());
}

#[test]
fn missing_device_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let err = PhysicalMemory::open(dir.path().join("mem"), false).unwrap_err();
    assert!(matches!(err, StepError::ResourceUnavailable { .. }), "{err:?}");
}
