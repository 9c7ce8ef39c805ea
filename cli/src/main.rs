use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lightproto_compiler::{compile_file, write_ir, CompileError, EmitOptions};

/// Compile a `.proto` schema into Rust declarations and reflection tables.
#[derive(Parser, Debug)]
#[command(name = "lightprotoc", version, about, long_about = None)]
struct Cli {
    /// Input `.proto` schema file
    input: PathBuf,

    /// Output `.rs` file
    output: PathBuf,

    /// Crate path of the reflection runtime referenced by the generated code
    #[arg(long, default_value = "lightproto")]
    runtime: String,

    /// Also write the parsed schema as JSON to this file
    #[arg(long, value_name = "FILE")]
    emit_ir: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<(), CompileError> {
    let options = EmitOptions::default().with_runtime(cli.runtime.clone());
    let unit = compile_file(&cli.input, &cli.output, &options)?;

    if let Some(ir_path) = &cli.emit_ir {
        write_ir(&unit, ir_path)?;
        tracing::info!(path = %ir_path.display(), "wrote IR dump");
    }

    println!(
        "Generated {} with messages: {} and enums: {}",
        cli.output.display(),
        unit.message_names().join(", "),
        unit.enum_names().join(", ")
    );
    Ok(())
}
