use clap::{Parser, Subcommand};
use routexml_tools::{ConvertOptions, run_convert};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors, and hide the progress bar
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert route XML files into a summary CSV and an optional detail TSV
    Convert {
        /// Input files or wildcard patterns (e.g. "*.xml"), zip archives included
        #[arg(value_name = "INPUT")]
        inputs: Vec<String>,

        /// Summary CSV output path (UTF-8 with BOM)
        #[arg(short = 'o', long = "output-csv", value_name = "CSV")]
        output: PathBuf,

        /// Detail TSV output path, one row per via point
        #[arg(long = "detail-tsv", value_name = "TSV")]
        detail_tsv: Option<PathBuf>,

        /// Directory to scan for input files
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// File name pattern used with --dir
        #[arg(long, default_value = "*.xml")]
        pattern: String,

        /// Scan --dir recursively
        #[arg(long)]
        recursive: bool,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Convert {
            inputs,
            output,
            detail_tsv,
            dir,
            pattern,
            recursive,
        } => {
            let options = ConvertOptions {
                inputs,
                dir,
                pattern,
                recursive,
                output,
                detail_output: detail_tsv,
                progress: !cli.quiet,
            };
            if let Err(e) = run_convert(&options) {
                log::error!("{e:#}");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
