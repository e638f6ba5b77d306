use std::fs;
use std::io::{self, BufWriter, IsTerminal, Read, Write};
use std::path::PathBuf;

use clap::Parser;
use miette::IntoDiagnostic;

use ooo_viewer::detect::OdfKind;
use ooo_viewer::translation::t;
use ooo_viewer::viewer::StatusKind;
use ooo_viewer::{Config, MimePart, OooViewer, Viewer};

#[derive(Parser, Debug)]
#[command(name = "ooo-viewer")]
#[command(version, about = "Render OpenDocument attachments as HTML")]
struct Args {
    /// Input file path (reads from stdin if not provided)
    file: Option<PathBuf>,

    /// MIME id of the part being rendered
    #[arg(long, default_value = "1")]
    mime_id: String,

    /// MIME type of the part (detected from the file when omitted)
    #[arg(long)]
    mime_type: Option<String>,

    /// Directory in which per-document scratch directories are created
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// Only rename tags instead of running the bundled stylesheet
    #[arg(long)]
    fallback: bool,

    /// Print the whole render result as JSON
    #[cfg(feature = "json")]
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn read_input(file: Option<&PathBuf>) -> miette::Result<(Vec<u8>, Option<String>)> {
    match file {
        Some(path) => {
            let input = fs::read(path).into_diagnostic()?;
            let filename = path.file_name().map(|n| n.to_string_lossy().into_owned());
            Ok((input, filename))
        }
        None => {
            if io::stdin().is_terminal() {
                return Err(miette::miette!(
                    "No input file specified and stdin is a terminal.\nUsage: ooo-viewer <FILE> or pipe a document to stdin"
                ));
            }
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf).into_diagnostic()?;
            Ok((buf, None))
        }
    }
}

fn main() -> miette::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let (input, filename) = read_input(args.file.as_ref())?;

    let kind = OdfKind::detect(filename.as_deref(), &input);
    match kind {
        Some(kind) => log::debug!("detected {kind}"),
        None => log::warn!("{}", t("This file does not look like an OpenDocument file.")),
    }
    let mime_type = args
        .mime_type
        .clone()
        .or_else(|| kind.map(|k| k.mime_type().to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let mut config = if args.fallback {
        Config::fallback()
    } else {
        Config::default()
    };
    if let Some(dir) = &args.temp_dir {
        config = config.with_temp_dir(dir);
    }

    let viewer = OooViewer::new(config);
    let part = MimePart::new(args.mime_id.clone(), mime_type, input);
    let output = viewer.render(&part).map_err(|e| miette::miette!("{e}"))?;

    let Some(rendered) = output.get(part.mime_id()) else {
        return Err(miette::miette!(
            "{}",
            t("No renderable content was found in this document.")
        ));
    };

    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());

    #[cfg(feature = "json")]
    if args.json {
        serde_json::to_writer_pretty(&mut writer, &output).into_diagnostic()?;
        writeln!(writer).into_diagnostic()?;
        writer.flush().into_diagnostic()?;
        return Ok(());
    }

    for status in &rendered.status {
        let label = match status.kind {
            StatusKind::Warning => t("Warning"),
        };
        eprintln!("{label}: {}", status.text);
    }
    write!(writer, "{}", rendered.data).into_diagnostic()?;
    writer.flush().into_diagnostic()?;

    Ok(())
}
