//! Classify the memory accesses of a TIR module.
//!
//! Prints one block per instrumentable function listing every read and write
//! descriptor, the same text the file tests check against.

use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use memaccess::access::AccessRole;
use memaccess::core::DataLayout;
use memaccess::pass::{run_with_options, AccessPrinter, DriverOptions};
use memaccess::test_ir::{TestIR, TestIRAdaptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Role {
    Read,
    Write,
    Both,
}

#[derive(Parser)]
#[command(name = "memaccess")]
#[command(about = "Print the memory access descriptors of a TIR module")]
struct Args {
    /// Input file (use - for stdin)
    #[arg(default_value = "-")]
    input: String,

    /// Override the module's target data layout
    #[arg(long, value_name = "STR")]
    datalayout: Option<String>,

    /// Which descriptors to print
    #[arg(long, value_enum, default_value_t = Role::Both)]
    role: Role,

    /// Only classify the function with this name
    #[arg(long, value_name = "NAME")]
    function: Option<String>,

    /// Include functions named with the NOINSTRUMENT_ prefix
    #[arg(long)]
    all: bool,

    /// Print the parsed module before the descriptors
    #[arg(long)]
    print_ir: bool,

    /// Print access statistics after the descriptors
    #[arg(long)]
    stats: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let source = if args.input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(&args.input).map_err(|e| format!("{}: {}", args.input, e))?
    };

    let mut ir = TestIR::parse(&source).map_err(|e| format!("{}:{}", args.input, e))?;
    if let Some(layout) = &args.datalayout {
        ir.data_layout = DataLayout::parse(layout)?;
    }

    if args.print_ir {
        print!("{}", ir);
    }

    let adaptor = TestIRAdaptor::new(&ir);
    let mut printer = match args.role {
        Role::Read => AccessPrinter::with_role(AccessRole::Read),
        Role::Write => AccessPrinter::with_role(AccessRole::Write),
        Role::Both => AccessPrinter::new(),
    };
    let options = DriverOptions {
        include_no_instrument: args.all,
        only_function: args.function.clone(),
    };
    let report = run_with_options(&adaptor, &mut printer, &options);

    if let Some(name) = &args.function {
        if report.functions_visited == 0 {
            return Err(format!("no instrumentable function named '{}'", name).into());
        }
    }

    print!("{}", printer.output());
    if args.stats {
        println!("{}", printer.stats());
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("memaccess: {}", e);
            ExitCode::FAILURE
        }
    }
}
