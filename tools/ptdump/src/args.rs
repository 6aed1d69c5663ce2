use std::path::PathBuf;

use clap::Parser;
use step_host::RemapMode;
use step_vmem::{PagingLevel, VirtualAddress};

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
#[error("{0:?} is not an address")]
pub struct AddressError(String);

#[derive(Parser, Debug)]
#[command(
    name = "ptdump",
    about = "Print the page-table walk of an address in this process.",
    long_about = "Print the page-table walk of an address in this process. Without ADDRESS a \
                  freshly allocated heap page is inspected. With --level the physical page \
                  holding that level is remapped and the 64-bit value found there is printed."
)]
pub struct Args {
    /// Remap this level (pgd, pud, pmd, pte or page) and print its value
    #[arg(long, value_name = "LEVEL")]
    pub level: Option<PagingLevel>,

    /// Map the window copy-on-write instead of shared
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub private: bool,

    /// Page-table driver device, overriding the environment
    #[arg(long, value_name = "PATH")]
    pub driver: Option<PathBuf>,

    /// Physical memory device, overriding the environment
    #[arg(long = "mem", value_name = "PATH")]
    pub memory: Option<PathBuf>,

    /// Virtual address, hex with 0x prefix or decimal
    #[arg(value_parser = parse_address)]
    pub address: Option<VirtualAddress>,
}

impl Args {
    pub const fn mode(&self) -> RemapMode {
        if self.private {
            RemapMode::Private
        } else {
            RemapMode::Shared
        }
    }
}

fn parse_address(text: &str) -> Result<VirtualAddress, AddressError> {
    let digits = text.replace('_', "");
    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => digits.parse(),
    };
    value
        .map(VirtualAddress::new)
        .map_err(|_| AddressError(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("ptdump").chain(args.iter().copied()))
    }

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn empty_means_own_heap_page() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.level, None);
        assert_eq!(args.address, None);
        assert_eq!(args.driver, None);
        assert_eq!(args.memory, None);
        assert_eq!(args.mode(), RemapMode::Shared);
    }

    #[test]
    fn all_options() {
        let args = parse(&[
            "--level", "PTE", "--private", "--driver", "/tmp/d", "--mem", "/tmp/m", "0x7fff_1000",
        ])
        .unwrap();
        assert_eq!(args.level, Some(PagingLevel::Pte));
        assert_eq!(args.mode(), RemapMode::Private);
        assert_eq!(args.driver, Some(PathBuf::from("/tmp/d")));
        assert_eq!(args.memory, Some(PathBuf::from("/tmp/m")));
        assert_eq!(args.address, Some(VirtualAddress::new(0x7FFF_1000)));
    }

    #[test]
    fn decimal_address() {
        assert_eq!(
            parse(&["4096"]).unwrap().address,
            Some(VirtualAddress::new(4096))
        );
    }

    #[test]
    fn address_parser_rejects_garbage() {
        assert_eq!(parse_address("0x1_000"), Ok(VirtualAddress::new(0x1000)));
        assert_eq!(parse_address("0xzz"), Err(AddressError("0xzz".into())));
    }

    #[test]
    fn rejects_bad_input() {
        let kind = |args: &[&str]| parse(args).unwrap_err().kind();
        assert_eq!(kind(&["--level"]), ErrorKind::InvalidValue);
        assert_eq!(kind(&["--level", "p4d"]), ErrorKind::ValueValidation);
        assert_eq!(kind(&["0xzz"]), ErrorKind::ValueValidation);
        assert_eq!(kind(&["--verbose"]), ErrorKind::UnknownArgument);
        assert!(parse(&["1", "2"]).is_err());
    }
}
