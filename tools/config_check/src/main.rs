use std::path::PathBuf;

use clap::Parser;
use config_check::{CheckError, findings_yaml, load_product, summary_lines};
use typed_config::{Record, DEFAULT_SOURCE_FILE};

#[derive(Parser, Debug)]
#[command(author, version, about = "Load and print the product config", long_about = None)]
struct Cli {
    /// Path to the YAML configuration file (defaults to ./config.yml)
    path: Option<PathBuf>,

    /// Use PATH as given instead of resolving it against the working directory
    #[arg(long)]
    absolute: bool,

    /// Print the loaded configuration back as YAML
    #[arg(long)]
    dump: bool,

    /// Print validation findings as a YAML report on stdout
    #[arg(long)]
    yaml_report: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let shown = cli
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| DEFAULT_SOURCE_FILE.to_string());

    let config = match load_product(cli.path.as_deref(), cli.absolute) {
        Ok(config) => config,
        Err(err) if !err.findings().is_empty() => {
            if cli.yaml_report {
                match findings_yaml(&shown, err.findings()) {
                    Ok(report) => print!("{report}"),
                    Err(render) => eprintln!("{render}"),
                }
            } else {
                eprintln!("Validation failed: {shown}");
                for finding in err.findings() {
                    eprintln!("- {finding}");
                }
            }
            std::process::exit(2);
        }
        Err(CheckError::Load(err)) if err.is_document_error() => {
            eprintln!("Invalid config {shown}: {err}");
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("Failed to load {shown}: {err}");
            std::process::exit(1);
        }
    };

    let lines = match summary_lines(&config) {
        Ok(lines) => lines,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    for line in lines {
        println!("{line}");
    }

    if cli.dump {
        match config.to_yaml_string() {
            Ok(yaml) => print!("{yaml}"),
            Err(err) => {
                eprintln!("Failed to dump {shown}: {err}");
                std::process::exit(1);
            }
        }
    }
}
