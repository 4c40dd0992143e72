//! Compresses the input from stdin and writes the result to stdout.
//!
//! The frequencies are counted before anything is packed, so stdin is read into memory first.

use std::io::{self, BufWriter, Read, Write};

fn main() {
    match (|| -> io::Result<()> {
        let mut data = vec![];
        io::stdin().lock().read_to_end(&mut data)?;

        let mut compressed = vec![];
        let mut encoder = huffstream::encode::Encoder::new();
        encoder.into_vec(&mut compressed).encode_all(&data).status?;

        let stdout = io::stdout();
        let mut stdout = BufWriter::new(stdout.lock());
        stdout.write_all(&compressed)?;
        stdout.flush()
    })() {
        Ok(()) => (),
        Err(err) => eprintln!("{}", err),
    }
}
