//! vcad-acis - inspect and convert ACIS files
//!
//! Reads SAT (text) and SAB (binary) files, prints their structure and
//! writes them back in either encoding.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use vcad_kernel_acis::debug::GraphWalker;
use vcad_kernel_acis::{export_sab_with, export_sat_with, load, AcisData, ExportOptions};

#[derive(Parser)]
#[command(name = "vcad-acis")]
#[command(about = "Inspect and convert ACIS SAT/SAB files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the header and entity counts of an ACIS file
    Info {
        /// Input file (.sat or .sab)
        file: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Convert between SAT and SAB
    Convert {
        /// Input file (.sat or .sab)
        input: PathBuf,
        /// Output file (format determined by extension: .sat, .sab)
        output: PathBuf,
        /// ACIS version of the output, 700 or later
        #[arg(short, long)]
        version: Option<i32>,
        /// TOML file with export options
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print every entity reachable from the bodies of an ACIS file
    Dump {
        /// Input file (.sat or .sab)
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Info { file, json } => show_info(&file, json)?,
        Commands::Convert {
            input,
            output,
            version,
            config,
        } => convert(&input, &output, version, config.as_deref())?,
        Commands::Dump { file } => dump(&file)?,
    }
    Ok(())
}

/// `RUST_LOG` directives when set and valid, otherwise warnings only.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

fn is_sab(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("sab"))
}

fn read_acis(path: &Path) -> Result<AcisData> {
    let data = if is_sab(path) {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        load(&bytes)
    } else {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        load(&text)
    };
    let data = data.with_context(|| format!("loading {}", path.display()))?;
    info!(
        path = %path.display(),
        version = data.header.version,
        entities = data.graph.len(),
        "loaded ACIS file"
    );
    Ok(data)
}

fn show_info(file: &Path, json: bool) -> Result<()> {
    let data = read_acis(file)?;
    let walker = GraphWalker::new(&data.graph);
    let counts = walker.type_counts();

    if json {
        let types: serde_json::Map<String, serde_json::Value> = counts
            .into_iter()
            .map(|(name, count)| (name, count.into()))
            .collect();
        let value = serde_json::json!({
            "header": data.header,
            "bodies": data.bodies.len(),
            "entities": data.graph.len(),
            "types": types,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let header = &data.header;
    println!("ACIS file: {}", file.display());
    println!("  Version: {} ({})", header.version, header.acis_version);
    println!("  Product: {}", header.product_id);
    println!("  Created: {}", header.date_string());
    println!("  Units: {} mm", header.units_in_mm);
    println!("  Bodies: {}", data.bodies.len());
    println!("  Entities: {}", data.graph.len());
    if !counts.is_empty() {
        println!("\nEntity types:");
        for (name, count) in counts {
            println!("  {name}: {count}");
        }
    }
    if walker.has_unsupported() {
        println!("\nContains entities without a typed layout; export will fail.");
    }
    Ok(())
}

fn convert(
    input: &Path,
    output: &Path,
    version: Option<i32>,
    config: Option<&Path>,
) -> Result<()> {
    let mut options = match config {
        Some(path) => {
            let text =
                fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            ExportOptions::from_toml(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => ExportOptions::default(),
    };
    if let Some(version) = version {
        options.version = version;
    }

    let data = read_acis(input)?;
    if is_sab(output) {
        let bytes = export_sab_with(&data.graph, &data.bodies, &options)?;
        fs::write(output, bytes)?;
    } else {
        let mut text = export_sat_with(&data.graph, &data.bodies, &options)?.join("\n");
        text.push('\n');
        fs::write(output, text)?;
    }
    println!(
        "Converted {} to {} (ACIS {})",
        input.display(),
        output.display(),
        options.version
    );
    Ok(())
}

fn dump(file: &Path) -> Result<()> {
    let data = read_acis(file)?;
    let walker = GraphWalker::new(&data.graph);
    for (i, &body) in data.bodies.iter().enumerate() {
        println!("Body {}", i + 1);
        for id in walker.walk(body) {
            println!("  {}", walker.label(id));
            for line in walker.entity_lines(id, 4) {
                println!("{line}");
            }
        }
        let faces = walker.filter_type(body, "face");
        if let Some(&first) = faces.first() {
            println!("\n  Face links:");
            for line in walker.face_link_structure(first, 4) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_follows_rust_log() {
        assert!(log_filter(Some("debug".into()))
            .to_string()
            .eq_ignore_ascii_case("debug"));
        assert!(log_filter(Some("vcad_kernel_acis=trace".into()))
            .to_string()
            .contains("vcad_kernel_acis"));
        assert!(log_filter(None).to_string().eq_ignore_ascii_case("warn"));
    }

    #[test]
    fn test_sab_detected_by_extension() {
        assert!(is_sab(Path::new("part.sab")));
        assert!(is_sab(Path::new("PART.SAB")));
        assert!(!is_sab(Path::new("part.sat")));
        assert!(!is_sab(Path::new("part")));
    }
}
