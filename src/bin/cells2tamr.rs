use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use tamr::bricking::BrickingConfig;
use tamr::import::import_cells;
use tamr::source::CellInputs;

const USAGE: &str = "Usage: cells2tamr <cells>.cells <field>.scalars [<field>.scalars ...] -o <output>.tamr";

#[derive(Debug, Parser)]
#[clap(version, about = "Convert a cell list and its scalar fields into a tamr model")]
struct Opts {
    /// One .cells file and one or more .scalars files
    inputs: Vec<PathBuf>,

    /// Path of the model to write
    #[clap(short = 'o', long)]
    output: PathBuf,

    /// Block sizes to try, in order
    #[clap(long, value_delimiter = ',', default_values = &["4", "2"])]
    block_sizes: Vec<i32>,

    #[clap(short, long)]
    verbose: bool,
}

fn usage(error: &str) -> ! {
    println!("Error: {}\n", error);
    println!("{}", USAGE);
    process::exit(1)
}

fn main() {
    let opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) if !e.use_stderr() => {
            print!("{}", e);
            process::exit(0)
        }
        Err(e) => {
            println!("{}", e);
            process::exit(1)
        }
    };

    let level = if opts.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("cells2tamr: cannot install logger: {}", e);
    }

    let inputs = match CellInputs::classify(&opts.inputs) {
        Ok(inputs) => inputs,
        Err(e) => usage(&e.to_string()),
    };
    let config = BrickingConfig { candidate_sizes: opts.block_sizes };

    let result = import_cells(&inputs, &config).and_then(|model| {
        info!("done reading, saving to {}", opts.output.display());
        model.save(&opts.output)
    });

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1)
    }
}
