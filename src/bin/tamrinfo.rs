use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::{error, warn, LevelFilter};
use simple_logger::SimpleLogger;
use tamr::report::summary;
use tamr::Model;

#[derive(Debug, Parser)]
#[clap(version, about = "Print a summary of a tamr model")]
struct Opts {
    /// Model to inspect
    input: PathBuf,

    /// Also write the whole model as CBOR to this path
    #[clap(long)]
    cbor: Option<PathBuf>,
}

fn dump_cbor(model: &Model, path: &Path) -> tamr::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    ciborium::ser::into_writer(model, &mut out)
        .map_err(|e| tamr::Error::MalformedInput(format!("cannot encode model: {:?}", e)))
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

    if let Err(e) = SimpleLogger::new().with_level(LevelFilter::Warn).init() {
        eprintln!("tamrinfo: cannot install logger: {}", e);
    }

    let model = match Model::load(&opts.input) {
        Ok(model) => model,
        Err(e) => {
            error!("{}", e);
            process::exit(1)
        }
    };
    print!("{}", summary(&model));

    if let Err(e) = model.validate() {
        warn!("{}", e);
    }
    if let Some(path) = &opts.cbor {
        if let Err(e) = dump_cbor(&model, path) {
            error!("{}", e);
            process::exit(1)
        }
    }
}
