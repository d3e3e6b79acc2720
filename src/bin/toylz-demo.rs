use std::{
    env,
    error::Error,
    ffi::OsString,
    fs::File,
    io::{BufWriter, Write},
};

use toylz_rs::*;

#[cfg(feature = "std")]
fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<OsString> = env::args_os().collect();

    if args.len() < 4 {
        println!(
            "Usage: {} c[0-9]|d input output",
            args[0].to_string_lossy()
        );
        return Ok(());
    }

    let mode = args[1].to_string_lossy();
    let inp_fn = &args[2];
    let outp_fn = &args[3];

    let inp = std::fs::read(inp_fn)?;
    let outp = if let Some(level) = mode.strip_prefix('c') {
        let level = if level.is_empty() {
            CompressionLevel::default()
        } else {
            CompressionLevel::new(level.parse()?)?
        };
        let mut cmp = Compressor::with_level(level)?;
        cmp.compress_to_vec(&inp)?
    } else if mode == "d" {
        decompress_to_vec(&inp, None)?
    } else {
        println!("Invalid mode {}", mode);
        return Ok(());
    };

    let mut outp_f = BufWriter::new(File::create(outp_fn)?);
    outp_f.write_all(&outp)?;
    outp_f.flush()?;

    Ok(())
}

#[cfg(not(feature = "std"))]
fn main() {
    println!("Demo requires std feature");
}
