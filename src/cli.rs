use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::{
    files::{self, Format, SourceError},
    trade::Trade,
};

/// Read and convert files of trade events
#[derive(Parser, Debug)]
#[command(name = "trade-files")]
#[command(version, about = "Read trade events from CSV, JSON Lines or bincode files")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every trade in a file, or in every matching file of a directory
    Read {
        /// File or directory to read
        path: PathBuf,

        /// csv, json or bincode (inferred from the extension when omitted)
        #[arg(long, value_parser = parse_format)]
        format: Option<Format>,

        /// Reject CSV columns that name no trade field
        #[arg(long)]
        strict: bool,
    },

    /// Rewrite the trades of one file in another format
    Convert {
        input: PathBuf,
        output: PathBuf,

        /// Input format (inferred from the extension when omitted)
        #[arg(long, value_parser = parse_format)]
        from: Option<Format>,

        /// Output format (inferred from the extension when omitted)
        #[arg(long, value_parser = parse_format)]
        to: Option<Format>,

        /// Reject CSV columns that name no trade field
        #[arg(long)]
        strict: bool,
    },
}

fn parse_format(s: &str) -> Result<Format, String> {
    s.parse().map_err(|e: SourceError| e.to_string())
}

fn resolve_format(path: &Path, explicit: Option<Format>) -> anyhow::Result<Format> {
    match explicit.or_else(|| Format::from_path(path)) {
        Some(f) => Ok(f),
        None => bail!(
            "cannot infer the format of `{}`; pass it explicitly",
            path.display()
        ),
    }
}

fn load(path: &Path, format: Option<Format>, strict: bool) -> anyhow::Result<Vec<Trade>> {
    let trades = if path.is_dir() {
        let Some(format) = format else {
            bail!("reading directory `{}` requires --format", path.display());
        };
        files::read_dir(path, format, strict)
    } else {
        files::read_trades(path, resolve_format(path, format)?, strict)
    };
    trades.with_context(|| format!("failed to read trades from `{}`", path.display()))
}

/// Writes one trade per line, stopping quietly if the reader hangs up.
fn print_trades<W: Write>(mut out: W, trades: &[Trade]) -> io::Result<()> {
    for t in trades {
        match writeln!(out, "{t}") {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
            other => other?,
        }
    }
    match out.flush() {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

fn handle_read(path: PathBuf, format: Option<Format>, strict: bool) -> anyhow::Result<()> {
    let trades = load(&path, format, strict)?;
    print_trades(io::stdout().lock(), &trades).context("failed to write trades to stdout")?;
    info!(count = trades.len(), path = %path.display(), "trades read");
    Ok(())
}

fn handle_convert(
    input: PathBuf,
    output: PathBuf,
    from: Option<Format>,
    to: Option<Format>,
    strict: bool,
) -> anyhow::Result<()> {
    let trades = load(&input, from, strict)?;
    let to = resolve_format(&output, to)?;
    files::write_trades(&output, to, &trades)
        .with_context(|| format!("failed to write trades to `{}`", output.display()))?;
    info!(
        count = trades.len(),
        input = %input.display(),
        output = %output.display(),
        %to,
        "trades converted"
    );
    Ok(())
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Read {
                path,
                format,
                strict,
            } => handle_read(path, format, strict),
            Commands::Convert {
                input,
                output,
                from,
                to,
                strict,
            } => handle_convert(input, output, from, to, strict),
        }
    }
}

pub fn run_cli() -> anyhow::Result<()> {
    Cli::parse().run()
}
