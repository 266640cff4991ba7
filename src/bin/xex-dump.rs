//! Dumps information about an XEX stored in its headers.

extern crate env_logger;
extern crate xex;

#[allow(unused_imports)]
#[macro_use]
extern crate structopt;

use structopt::StructOpt;
use xex::directory::{self, EntryData};
use xex::{PrimaryHeader, Xex};

use std::error::Error;
use std::fs::read;
use std::path::PathBuf;

#[derive(Debug, StructOpt)]
#[structopt(name = "xex-dump", about = "Dump info from XEX headers to stdout.")]
struct Opts {
    /// Path to the XEX file.
    #[structopt(parse(from_os_str))]
    xex: PathBuf,
    /// Only decode the primary header and the header directory.
    #[structopt(long = "headers-only")]
    headers_only: bool,
    /// List the directory entries with their known names and data locations.
    #[structopt(long = "directory")]
    directory: bool,
}

fn print_directory(entries: &[xex::DirectoryEntry]) {
    println!("{} directory entries:", entries.len());
    for entry in entries {
        let name = match entry.known_key() {
            Some(key) => format!("{:?}", key),
            None => "<unknown key>".to_string(),
        };
        let location = match entry.data() {
            EntryData::Inline(value) => format!("value {:#010X}", value),
            EntryData::Sized { offset, len } => format!("{:#X} Bytes at {:#X}", len, offset),
            EntryData::Prefixed { offset } => format!("size-prefixed data at {:#X}", offset),
        };
        println!("  {:#010X} {:<28} {}", entry.key, name, location);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let opts = Opts::from_args();

    let data = read(&opts.xex)?;
    if opts.headers_only {
        let header = PrimaryHeader::parse(&data)?;
        let entries = directory::parse_table(
            &data,
            header.fixed_size(),
            header.directory_entry_count(),
            header.size_of_headers(),
        )?;
        println!("{:#?}", header);
        if opts.directory {
            print_directory(&entries);
        }
        return Ok(());
    }

    let xex = Xex::parse(&data)?;
    println!("{:#?}", xex);
    if opts.directory {
        print_directory(xex.directory_entries());
    }
    Ok(())
}
