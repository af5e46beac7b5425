//! Logic behind the command-line tools:
//! - `df2-paths`: path-resolution examples, or one relative/full path
//! - `df2-dump`: replay a DF2 file and print its tree as JSON

use std::io::Read;

use df2_path::{relative_to, resolve_absolute, PathError};

use crate::error::Df2Error;
use crate::stream::Df2Stream;

#[derive(Debug)]
pub enum CliError {
    Usage(String),
    Path(PathError),
    Df2(Df2Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(e) => write!(f, "usage: {e}"),
            CliError::Path(e) => write!(f, "{e}"),
            CliError::Df2(e) => write!(f, "{e}"),
            CliError::Json(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<PathError> for CliError {
    fn from(e: PathError) -> Self {
        CliError::Path(e)
    }
}

impl From<Df2Error> for CliError {
    fn from(e: Df2Error) -> Self {
        CliError::Df2(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

// ── df2-paths ─────────────────────────────────────────────────────────────

/// `(current group, destination)` pairs shown by `df2-paths` with no
/// arguments.
pub const RELATIVE_EXAMPLES: &[(&str, &str)] = &[
    ("/RootData/Tables/Table0/DataStorage/", "/RootData/Tables/Table0/DataStorage/LongData"),
    ("/RootData/Tables/", "/RootData/Tables/Table0/DataStorage/LongData"),
    ("/RootData/Tables/Table0/DataStorage/", "/RootData/Tables/Table0/DataLength"),
    ("/RootData/Tables/Table0/DataStorage/", "/RootData/NumTables"),
    ("/RootData/Tables/Table0/DataStorage/", "/SomeOtherData/IntData"),
];

pub const FULL_EXAMPLES: &[(&str, &str)] = &[
    ("/RootData/Tables/Table0/DataStorage/", "LongData"),
    ("/RootData/Tables/", "Table0/DataStorage/LongData"),
    ("/RootData/Tables/Table0/DataStorage/", "../DataLength"),
    ("/RootData/Tables/Table0/DataStorage/", "../../../NumTables"),
    ("/RootData/Tables/Table0/DataStorage/", "../../../../SomeOtherData/IntData"),
];

const PATHS_USAGE: &str = "df2-paths [rel <current> <target> | full <current> <path>]";

pub fn describe_relative(current: &str, target: &str) -> Result<String, CliError> {
    let relative = relative_to(target, current)?;
    Ok(format!(
        "Current Path: {current}\nDestination Path: {target}\nRelative Path: {relative}\n"
    ))
}

pub fn describe_full(current: &str, path: &str) -> Result<String, CliError> {
    let full = resolve_absolute(path, current)?;
    Ok(format!(
        "Current Path: {current}\nDestination Path: {path}\nFull Path: {full}\n"
    ))
}

/// Output of `df2-paths` with no arguments.
pub fn path_examples() -> Result<String, CliError> {
    let mut out = String::new();
    for (current, target) in RELATIVE_EXAMPLES {
        out.push_str(&describe_relative(current, target)?);
        out.push('\n');
    }
    out.push_str("-=-=-=-=-=-\n\n");
    for (current, path) in FULL_EXAMPLES {
        out.push_str(&describe_full(current, path)?);
        out.push('\n');
    }
    Ok(out)
}

/// Runs `df2-paths` with the arguments after the program name.
pub fn paths(args: &[String]) -> Result<String, CliError> {
    match args {
        [] => path_examples(),
        [mode, current, target] if mode == "rel" => describe_relative(current, target),
        [mode, current, path] if mode == "full" => describe_full(current, path),
        _ => Err(CliError::Usage(PATHS_USAGE.to_string())),
    }
}

// ── df2-dump ──────────────────────────────────────────────────────────────

/// Replays a DF2 stream and renders the resulting tree as pretty JSON.
///
/// With `trace`, every received command is echoed to stderr.
pub fn dump<R: Read>(source: R, trace: bool) -> Result<String, CliError> {
    let mut stream = Df2Stream::reader(source)?;
    if trace {
        stream.on_command(|event| eprintln!("READ> {}", event.record));
    }
    stream.process_until_end()?;
    Ok(serde_json::to_string_pretty(&stream.to_json())?)
}
