use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use tamr::import::{import_block_file, FieldSelector};
use tamr::levels::ScalarTransform;

#[derive(Debug, Parser)]
#[clap(version, about = "Convert one field of a block-structured dataset into a tamr model")]
struct Opts {
    /// Block dataset to read
    input: PathBuf,

    /// Path of the model to write
    #[clap(short = 'o', long)]
    output: PathBuf,

    /// Field to convert, by index or by name
    #[clap(short, long, default_value = "0")]
    field: FieldSelector,

    /// Store values as they are, instead of their natural logarithm
    #[clap(long)]
    linear: bool,

    #[clap(short, long)]
    verbose: bool,
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
        eprintln!("blocks2tamr: cannot install logger: {}", e);
    }

    let transform = if opts.linear { ScalarTransform::Identity } else { ScalarTransform::Log };

    let result = import_block_file(&opts.input, &opts.field, transform).and_then(|model| {
        info!("done reading, saving to {}", opts.output.display());
        model.save(&opts.output)
    });

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1)
    }
}
