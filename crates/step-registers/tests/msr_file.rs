use std::fs;
use std::io;

use step_registers::{Msr, MsrError, MsrFile};

fn fake_cpus(cpus: u32, len: u64) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for cpu in 0..cpus {
        let core = dir.path().join(cpu.to_string());
        fs::create_dir(&core).unwrap();
        fs::File::create(core.join("msr")).unwrap().set_len(len).unwrap();
    }
    dir
}

#[test]
fn write_then_read_on_the_same_core() {
    let dir = fake_cpus(2, 0x1000);
    let msrs = MsrFile::with_root(dir.path());

    msrs.write(1, Msr::IA32_MISC_ENABLE, 0x0085_0089).unwrap();
    assert_eq!(msrs.read(1, Msr::IA32_MISC_ENABLE).unwrap(), 0x0085_0089);

    // Other cores and neighbouring registers are untouched.
    assert_eq!(msrs.read(0, Msr::IA32_MISC_ENABLE).unwrap(), 0);
    assert_eq!(msrs.read(1, Msr(0x1A8)).unwrap(), 0);
}

#[test]
fn value_lands_at_the_register_offset() {
    let dir = fake_cpus(1, 0x1000);
    let msrs = MsrFile::with_root(dir.path());
    msrs.write(0, Msr::IA32_APIC_BASE, 0xFEE0_0900).unwrap();

    let bytes = fs::read(msrs.path(0)).unwrap();
    let at = usize::try_from(Msr::IA32_APIC_BASE.raw()).unwrap();
    assert_eq!(&bytes[at..at + 8], &0xFEE0_0900u64.to_ne_bytes());
}

#[test]
fn missing_core_reports_module_missing() {
    let dir = fake_cpus(1, 0x100);
    let msrs = MsrFile::with_root(dir.path());
    let err = msrs.read(7, Msr::IA32_TIME_STAMP_COUNTER).unwrap_err();
    assert!(matches!(err, MsrError::ModuleMissing { .. }), "{err:?}");
}

#[test]
fn short_read_reports_access_error() {
    let dir = fake_cpus(1, 0x10);
    let msrs = MsrFile::with_root(dir.path());
    let err = msrs.read(0, Msr::IA32_TSC_DEADLINE).unwrap_err();
    match err {
        MsrError::Access { cpu, msr, op, source } => {
            assert_eq!(cpu, 0);
            assert_eq!(msr, Msr::IA32_TSC_DEADLINE);
            assert_eq!(op, "read");
            assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
        }
        other => panic!("unexpected {other:?}"),
    }
}
