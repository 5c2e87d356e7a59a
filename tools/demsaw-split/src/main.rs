//! demsaw-split - split a demo into one file per gamestate segment
//!
//! ```bash
//! demsaw-split path/to/match.dm_68
//! ```
//!
//! Exit codes: 0 success, 1 insufficient arguments, 2 missing input
//! file, 666 parse failure.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use demsaw_core::{split_demo_file, Context, MessageSeverity, ParseArg};

/// Split a demo recording into one file per gamestate segment
#[derive(Parser)]
#[command(name = "demsaw-split")]
#[command(version)]
struct Cli {
    /// The recording to split
    demo_path: PathBuf,
}

fn run(cli: &Cli) -> anyhow::Result<u32> {
    let message_callback = |severity: MessageSeverity, text: &str| match severity {
        MessageSeverity::Info => println!("{text}"),
        _ => eprintln!("{text}"),
    };
    let arg = ParseArg {
        message_callback: Some(&message_callback),
        ..ParseArg::default()
    };

    let mut context = Context::new();
    split_demo_file(&mut context, &arg, &cli.demo_path)
        .with_context(|| format!("failed to split {}", cli.demo_path.display()))
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            // Covers missing arguments as well as --help/--version.
            let _ = error.print();
            return match error.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::SUCCESS
                }
                _ => ExitCode::from(1),
            };
        }
    };

    if !cli.demo_path.is_file() {
        eprintln!("no such file: {}", cli.demo_path.display());
        return ExitCode::from(2);
    }

    match run(&cli) {
        Ok(0) => {
            println!("single gamestate segment, nothing to split");
            ExitCode::SUCCESS
        }
        Ok(count) => {
            println!("wrote {count} files");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("{error:#}");
            // The documented failure status; the OS truncates it to a
            // byte on Unix, same as the historical tool.
            std::process::exit(666);
        }
    }
}
