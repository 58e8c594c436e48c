//! kauma: a cryptographic laboratory engine that executes a batch of
//! named primitive and attack operations read from a request document.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

mod block;
mod cipher;
mod crack;
mod dispatcher;
mod error;
mod factor;
mod field;
mod gcm;
mod poly;

/// Run the kauma batch request document through the core operations.
#[derive(Parser, Debug)]
#[command(name = "kauma", about = "Cryptographic laboratory engine")]
struct Cli {
    /// Path to the JSON request document.
    request: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let raw = fs::read_to_string(&cli.request)
        .with_context(|| format!("failed to read request document {:?}", cli.request))?;
    let request: dispatcher::RequestDocument =
        serde_json::from_str(&raw).with_context(|| "failed to parse request document as JSON")?;

    let response = dispatcher::run(&request);
    println!("{}", serde_json::to_string(&response)?);

    Ok(())
}
