#![forbid(unsafe_code)]
use std::path::PathBuf;
use std::{env, ffi, fs, io, process};

use huffstream::{Configuration, HuffError};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> CodingResult {
    init_logging();
    CodingResult::catch_panic(|| {
        let flags = Flags::from_args(env::args_os()).unwrap_or_else(|ParamError| explain());
        run_coding(flags)
    })
}

fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        .with_writer(io::stderr)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set up logging: {}", err);
    }
}

fn run_coding(flags: Flags) -> Result<(), CodingError> {
    let operation = flags.operation.unwrap_or_else(explain);
    let config = Configuration::new();

    // The target is only created once the source could be opened.
    let source = fs::File::open(&flags.source).map_err(CodingError::Open)?;
    let target = fs::File::create(&flags.target).map_err(CodingError::Open)?;

    let input = io::BufReader::with_capacity(config.chunk_size(), source);
    let output = io::BufWriter::with_capacity(config.chunk_size(), target);

    match operation {
        Operation::Encode => {
            let mut encoder = config.build_encoder();
            encoder.into_stream(output).encode_all(input).status?;
        }
        Operation::Decode => {
            let mut decoder = config.build_decoder();
            let status = decoder.into_stream(output).decode_all(input).status;
            if let Err(err) = status {
                let _ = fs::remove_file(&flags.target);
                return Err(CodingError::from_decode(err));
            }
        }
    }

    Ok(())
}

struct Flags {
    source: PathBuf,
    target: PathBuf,
    operation: Option<Operation>,
}

struct ParamError;

#[derive(Debug)]
enum Operation {
    Encode,
    Decode,
}

#[derive(Debug)]
enum CodingError {
    Open(io::Error),
    Corrupted(HuffError),
    Io(io::Error),
}

fn explain<T>() -> T {
    println!(
        "Usage: huff <-e|-d> <source> <target>\n\
        Arguments:\n\
        -e\t operation encode\n\
        -d\t operation decode\n\
        <source>\tfile to read\n\
        <target>\tfile to write"
    );
    process::exit(1);
}

fn command() -> clap::Command<'static> {
    clap::Command::new("huff")
        .author("The image-rs Developers")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compress and decompress files with a static Huffman code")
        .arg(
            clap::Arg::new("decode")
                .short('d')
                .long("decode")
                .takes_value(false),
        )
        .arg(
            clap::Arg::new("encode")
                .short('e')
                .long("encode")
                .takes_value(false),
        )
        .group(
            clap::ArgGroup::new("operation")
                .args(&["decode", "encode"])
                .multiple(false)
                .required(true),
        )
        .arg(
            clap::Arg::new("source")
                .required(true)
                .value_parser(clap::builder::ValueParser::path_buf()),
        )
        .arg(
            clap::Arg::new("target")
                .required(true)
                .value_parser(clap::builder::ValueParser::path_buf()),
        )
}

impl Flags {
    fn from_args(mut args: impl Iterator<Item = ffi::OsString>) -> Result<Self, ParamError> {
        let matches = match command().try_get_matches_from(args.by_ref()) {
            Ok(matches) => matches,
            // Help and version are printed by clap itself.
            Err(err) if is_informational(&err) => err.exit(),
            Err(_) => return Err(ParamError),
        };

        let operation = if matches.contains_id("decode") {
            Some(Operation::Decode)
        } else if matches.contains_id("encode") {
            Some(Operation::Encode)
        } else {
            None
        };

        let source = matches.get_one::<PathBuf>("source").ok_or(ParamError)?;
        let target = matches.get_one::<PathBuf>("target").ok_or(ParamError)?;

        Ok(Flags {
            source: source.clone(),
            target: target.clone(),
            operation,
        })
    }
}

fn is_informational(err: &clap::Error) -> bool {
    matches!(
        err.kind(),
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
    )
}

impl CodingError {
    fn from_decode(err: io::Error) -> Self {
        let corrupted = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<HuffError>())
            .copied();

        match corrupted {
            Some(err) => CodingError::Corrupted(err),
            None => CodingError::Io(err),
        }
    }
}

impl From<io::Error> for CodingError {
    fn from(err: io::Error) -> Self {
        CodingError::Io(err)
    }
}

enum CodingResult {
    Ok,
    Err(CodingError),
    Panic,
}

impl CodingResult {
    fn catch_panic(op: fn() -> Result<(), CodingError>) -> Self {
        std::panic::catch_unwind(|| match op() {
            Ok(()) => CodingResult::Ok,
            Err(err) => CodingResult::Err(err),
        })
        .unwrap_or(CodingResult::Panic)
    }
}

impl std::process::Termination for CodingResult {
    fn report(self) -> std::process::ExitCode {
        match self {
            CodingResult::Ok => std::process::ExitCode::SUCCESS,
            CodingResult::Err(CodingError::Open(err)) => {
                eprintln!("File opening error: {}", err);
                std::process::ExitCode::FAILURE
            }
            CodingResult::Err(CodingError::Corrupted(err)) => {
                tracing::debug!(error = %err, "decoding failed");
                eprintln!("File corrupted");
                std::process::ExitCode::FAILURE
            }
            CodingResult::Err(CodingError::Io(err)) => {
                eprintln!("{}", err);
                std::process::ExitCode::FAILURE
            }
            CodingResult::Panic => {
                eprintln!(
                    "The process failed irrecoverably! This should never happen and is a bug."
                );
                std::process::ExitCode::from(128)
            }
        }
    }
}
