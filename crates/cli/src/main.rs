mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use matrixbuild_lib::config::CliOverrides;
use matrixbuild_lib::consts::DEFAULT_CONFIG_FILE;

use crate::cmd::RunArgs;
use crate::output::{OutputFormat, print_error};

/// mbuild - build and test every project across a compiler × platform matrix
#[derive(Parser)]
#[command(name = "mbuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Path to the JSON configuration file
  #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
  config: PathBuf,

  /// Comma separated platforms (e.g. Win32,Win64)
  #[arg(long, value_delimiter = ',')]
  platforms: Option<Vec<String>>,

  /// Comma separated compiler ids; runs them even if inactive
  #[arg(long, value_delimiter = ',')]
  compilers: Option<Vec<String>>,

  /// Comma separated dependency versions for matrix tests (e.g. 3.0,3.3)
  #[arg(long = "dep-versions", alias = "openssl-versions", value_delimiter = ',')]
  dep_versions: Option<Vec<String>>,

  /// Build profile (e.g. Debug, Release)
  #[arg(long = "build-config", alias = "profile")]
  build_config: Option<String>,

  /// Comma separated tags; only projects carrying one of them run
  #[arg(long, value_delimiter = ',')]
  tags: Vec<String>,

  /// Remove the build output after a fully successful run
  #[arg(long, overrides_with = "no_clean")]
  clean: bool,

  /// Keep the build output even after a successful run
  #[arg(long, overrides_with = "clean")]
  no_clean: bool,

  /// Enable verbose output
  #[arg(short, long)]
  verbose: bool,

  /// Output format for the final report
  #[arg(short, long, value_enum, default_value_t)]
  output: OutputFormat,
}

/// Trim entries and drop empty ones, so `"3.0, 3.3,"` means `[3.0, 3.3]`.
fn tidy(list: Vec<String>) -> Vec<String> {
  list
    .into_iter()
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
    .collect()
}

impl Cli {
  fn overrides(&self) -> CliOverrides {
    let clean = match (self.clean, self.no_clean) {
      (true, _) => Some(true),
      (_, true) => Some(false),
      _ => None,
    };
    CliOverrides {
      platforms: self.platforms.clone().map(tidy),
      compilers: self.compilers.clone().map(tidy),
      profile: self.build_config.clone(),
      dependency_versions: self.dep_versions.clone().map(tidy),
      clean,
    }
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  // RUST_LOG wins; otherwise info, or debug with --verbose
  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let args = RunArgs {
    config: cli.config.clone(),
    overrides: cli.overrides(),
    tags: tidy(cli.tags.clone()),
    output: cli.output,
  };

  match cmd::cmd_run(args) {
    Ok(true) => ExitCode::SUCCESS,
    Ok(false) => ExitCode::FAILURE,
    Err(e) => {
      print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}
