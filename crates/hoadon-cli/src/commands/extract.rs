//! Extract command - run the field rules over already recognized text.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use hoadon_core::ReceiptExtractor;

use super::output::{OutputFormat, format_result};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Text file, one receipt line per line (default: stdin)
    input: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

pub async fn run(args: ExtractArgs) -> anyhow::Result<()> {
    let text = match &args.input {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Input file not found: {}", path.display());
            }
            info!("Reading text from {}", path.display());
            fs::read_to_string(path)?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    // Trailing newline from files and pipes is not part of the receipt
    let text = text.trim_end_matches(['\n', '\r']);
    let fields = ReceiptExtractor::new().extract(text);
    let output = format_result(&fields, None, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    Ok(())
}
