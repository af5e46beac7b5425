//! `df2-paths`: print path-resolution examples.
//!
//! Usage:
//!   df2-paths
//!   df2-paths rel <current> <target>
//!   df2-paths full <current> <path>

use df2::cli::{paths, CliError};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match paths(&args) {
        Ok(out) => print!("{out}"),
        Err(e @ CliError::Usage(_)) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
