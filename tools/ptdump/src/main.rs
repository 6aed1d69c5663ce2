mod args;

use clap::Parser;
use log::LevelFilter;
use step_host::{OrAbort, PAGE_SIZE, StderrLogger, StepConfig, StepContext};
use step_vmem::{MappingDump, VirtualAddress};

use crate::args::Args;

fn main() {
    let env_config = StepConfig::from_env();
    let level = env_config.as_ref().map_or(LevelFilter::Info, |c| c.log_level);
    StderrLogger::new(level).init().or_abort();

    let args = Args::parse();

    let mut config = env_config.or_abort();
    if let Some(path) = &args.driver {
        config.set_driver_path(path);
    }
    if let Some(path) = &args.memory {
        config.set_memory_path(path);
    }

    // Touched so the page is present when the driver walks it.
    let mut scratch = vec![0u8; PAGE_SIZE].into_boxed_slice();
    scratch.fill(0xA5);
    let address = args
        .address
        .unwrap_or_else(|| VirtualAddress::from_ptr(scratch.as_ptr()));

    let ctx = StepContext::open(&config).or_abort();
    let mapping = ctx.resolve(address).or_abort();
    print!("{}", MappingDump(&mapping));

    if let Some(level) = args.level {
        let window = ctx.remap_table_at(address, level, args.mode()).or_abort();
        let slot = window.offset() & !7;
        // SAFETY: the page was just resolved as part of this process' walk;
        // an aligned 8-byte read stays inside it.
        let value = unsafe { window.read_u64(slot) }.or_abort();
        println!(
            "{level} @ {} ({:?}): 0x{value:016X}",
            window.physical_address(),
            window.mode()
        );
    }

    drop(scratch);
}
