//! `df2-dump`: replay a DF2 file and print its tree as JSON.
//! Built with the `cli` feature: `cargo run -p df2 --features cli --bin df2-dump`.
//!
//! Usage:
//!   df2-dump <file> [--trace]
//!
//! `--trace` echoes every received command to stderr. Set `RUST_LOG=df2=trace`
//! for the library's own command log.

use std::fs::File;
use std::io::BufReader;

use df2::cli::dump;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let trace = args.iter().any(|a| a == "--trace");
    let Some(path) = args.iter().find(|a| !a.starts_with("--")) else {
        eprintln!("usage: df2-dump <file> [--trace]");
        std::process::exit(2);
    };

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{path}: {e}");
            std::process::exit(1);
        }
    };
    match dump(BufReader::new(file), trace) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("{path}: {e}");
            std::process::exit(1);
        }
    }
}
