//! Print the OpenAPI document as JSON, to stdout or to a file.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use socialgraph::doc::ApiDoc;
use utoipa::OpenApi;

/// `openapi-dump` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "openapi-dump",
    about = "Render the social graph OpenAPI document",
    version
)]
struct CliArgs {
    /// Write the document to this path instead of stdout.
    #[arg(long = "output", short = 'o', value_name = "path")]
    output: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let json = ApiDoc::openapi()
        .to_pretty_json()
        .map_err(|err| io::Error::other(format!("serialise OpenAPI document: {err}")))?;
    match args.output {
        Some(path) => fs::write(&path, format!("{json}\n")).map_err(|err| {
            io::Error::new(err.kind(), format!("write {}: {err}", path.display()))
        }),
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}")
        }
    }
}
