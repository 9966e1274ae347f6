use clap::{Parser, Subcommand, ValueEnum};
use pom_sync::serialize::Style;
use pom_sync::sync::{PomSync, PomSyncOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
  name = "pom-sync",
  about = "Merge and update Maven POM files without losing their formatting",
  version,
  author
)]
struct Cli {
  #[command(subcommand)]
  command: Command,

  /// Indentation width for newly created files
  #[arg(long, global = true, default_value_t = 2)]
  indent_width: usize,

  /// Line ending for newly created files
  #[arg(long, global = true, value_enum, default_value_t = LineEnding::Lf)]
  line_ending: LineEnding,

  /// Verbose output (-v for verbose, -vv for very verbose)
  #[arg(short, long, global = true, action = clap::ArgAction::Count)]
  verbose: u8,
}

#[derive(Subcommand)]
enum Command {
  /// Merge SOURCE into TARGET, rewriting TARGET in place
  Merge { target: PathBuf, source: PathBuf },
  /// Set the project name and description
  UpdateMetadata {
    pom: PathBuf,
    name: String,
    description: String,
  },
  /// Rewrite a POM with its properties in sorted order
  Normalize { pom: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum LineEnding {
  Lf,
  Crlf,
}

impl LineEnding {
  fn as_str(self) -> &'static str {
    match self {
      LineEnding::Lf => "\n",
      LineEnding::Crlf => "\r\n",
    }
  }
}

fn setup_tracing(verbose: u8) {
  use tracing_subscriber::fmt;
  use tracing_subscriber::prelude::*;

  let log_level = match verbose {
    1 => "debug",
    2 => "trace",
    _ => "info",
  };

  tracing_subscriber::registry()
    .with(fmt::layer())
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
    ))
    .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  let cli = Cli::parse();

  setup_tracing(cli.verbose);

  let style = Style::new(cli.indent_width, cli.line_ending.as_str());

  match cli.command {
    Command::Merge { target, source } => {
      let options = PomSyncOptions {
        target_file: target,
        source_file: source,
        style,
      };
      PomSync::sync_with_options(options)?;
    }
    Command::UpdateMetadata {
      pom,
      name,
      description,
    } => {
      let mut project = PomSync::read_model_or_new(&pom)?;
      project.name = Some(name);
      project.description = Some(description);
      PomSync::write_model_with(&project, &pom, &style)?;
    }
    Command::Normalize { pom } => {
      let project = PomSync::read_model(&pom)?;
      PomSync::write_model(&project)?;
    }
  }

  Ok(())
}
