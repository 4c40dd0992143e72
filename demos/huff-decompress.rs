//! Decompresses the input from stdin and writes the result to stdout.

use std::io::{self, BufWriter};

fn main() {
    match (|| -> io::Result<()> {
        let mut decoder = huffstream::decode::Decoder::new();
        let stdin = io::stdin();
        let stdin = stdin.lock();
        let stdout = io::stdout();
        let stdout = BufWriter::new(stdout.lock());
        decoder.into_stream(stdout).decode_all(stdin).status?;
        Ok(())
    })() {
        Ok(()) => (),
        Err(err) => eprintln!("{}", err),
    }
}
