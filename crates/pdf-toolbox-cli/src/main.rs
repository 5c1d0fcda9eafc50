//! PDF Toolbox CLI - merge, compress and annotate PDF documents.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pdf_toolbox_core::pdf::overlay::{add_signature, add_text};
use pdf_toolbox_core::{
    AppConfig, CompressOptions, CompressionMode, Error, ImageElement, MergeOptions, Position, SignatureDate,
    compress_document, merge_documents,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

/// Exit status when no input PDFs were found
const EXIT_NO_INPUT: u8 = 2;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeOption {
    Lossless,
    Optimize,
    Downscale,
}

impl From<ModeOption> for CompressionMode {
    fn from(opt: ModeOption) -> Self {
        match opt {
            ModeOption::Lossless => Self::Lossless,
            ModeOption::Optimize => Self::Optimize,
            ModeOption::Downscale => Self::Downscale,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pdf-toolbox")]
#[command(author, version, about = "Merge, compress and annotate PDF documents", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge PDF files (directories expand to the PDFs they contain)
    Merge {
        /// PDF files or directories to merge, in order (default: current directory)
        files: Vec<PathBuf>,

        /// Output filename
        #[arg(short, long, default_value = "merged.pdf")]
        output: PathBuf,

        /// Search directories recursively
        #[arg(short, long)]
        recursive: bool,

        /// Target page size: largest, smallest, first, preserve, A4, Letter or
        /// WIDTHxHEIGHT with pt, mm or in units (e.g. 8.5inx11in, 210mmx297mm, 612x792)
        #[arg(long)]
        page_size: Option<String>,

        /// Per-file size directive, once per input in order (preserve, global or a size)
        #[arg(long = "file-resize")]
        file_resize: Vec<String>,
    },

    /// Compress a PDF file
    Compress {
        input: PathBuf,

        #[arg(short, long, default_value = "compressed.pdf")]
        output: PathBuf,

        #[arg(short, long, value_enum, default_value = "lossless")]
        mode: ModeOption,

        /// Drop document info and XMP metadata
        #[arg(long)]
        remove_metadata: bool,

        /// Request linearized output
        #[arg(long)]
        linearize: bool,

        /// Largest image side kept by downscale mode
        #[arg(long)]
        max_px: Option<u32>,

        /// JPEG quality used by downscale mode (1-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        jpeg_quality: Option<u8>,
    },

    /// Draw text or a signature image on one page
    Annotate {
        input: PathBuf,

        #[arg(short, long, default_value = "annotated.pdf")]
        output: PathBuf,

        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Distance from the left edge in points
        #[arg(long, default_value_t = 50.0)]
        x: f32,

        /// Distance from the top edge in points
        #[arg(long, default_value_t = 50.0)]
        y: f32,

        /// Text to draw
        #[arg(long, conflicts_with = "image", required_unless_present = "image")]
        text: Option<String>,

        #[arg(long, default_value_t = 12.0)]
        font_size: f32,

        /// Signature image to draw
        #[arg(long)]
        image: Option<PathBuf>,

        #[arg(long, default_value_t = 100.0)]
        width: f32,

        #[arg(long, default_value_t = 50.0)]
        height: f32,

        /// Date to print under the signature (YYYY-MM-DD)
        #[arg(long, requires = "image")]
        date: Option<String>,

        /// Print today's date under the signature
        #[arg(long, requires = "image", conflicts_with = "date")]
        stamp_date: bool,
    },
}

fn main() -> ExitCode {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = if let Some(config_path) = &cli.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    match cli.command {
        Command::Merge {
            files,
            output,
            recursive,
            page_size,
            file_resize,
        } => {
            let inputs = gather_files(&files, recursive)?;
            if inputs.is_empty() {
                #[allow(clippy::print_stderr)]
                {
                    eprintln!("No PDF files found.");
                }
                return Ok(ExitCode::from(EXIT_NO_INPUT));
            }

            let options = MergeOptions {
                page_size: Some(page_size.unwrap_or_else(|| config.merge.default_page_size.clone())),
                file_resize: (!file_resize.is_empty()).then_some(file_resize),
            };
            merge(&inputs, &output, &options)?;
        }
        Command::Compress {
            input,
            output,
            mode,
            remove_metadata,
            linearize,
            max_px,
            jpeg_quality,
        } => {
            let mut options = CompressOptions::from_config(mode.into(), &config.compress);
            options.remove_metadata = remove_metadata;
            options.linearize = linearize;
            if let Some(max_px) = max_px {
                options.max_dimension_px = max_px;
            }
            if let Some(quality) = jpeg_quality {
                options.jpeg_quality = quality;
            }

            let (name, bytes) = read_document(&input)?;
            let result = compress_document(&name, &bytes, &options)?;
            write_output(&output, &result.bytes)?;

            #[allow(clippy::print_stdout)]
            {
                println!(
                    "Compressed {} into {} ({} -> {} bytes)",
                    name,
                    output.display(),
                    result.report.input_bytes,
                    result.report.output_bytes
                );
            }
        }
        Command::Annotate {
            input,
            output,
            page,
            x,
            y,
            text,
            font_size,
            image,
            width,
            height,
            date,
            stamp_date,
        } => {
            let (name, bytes) = read_document(&input)?;
            let position = Position { x, y };

            let result = if let Some(image) = image {
                let data = std::fs::read(&image)
                    .with_context(|| format!("Failed to read image: {}", image.display()))?;
                let date = match (date, stamp_date) {
                    (Some(date), _) => Some(SignatureDate::parse(&date)?),
                    (None, true) => Some(SignatureDate::Today),
                    (None, false) => None,
                };
                add_signature(
                    &name,
                    &bytes,
                    page,
                    position,
                    ImageElement {
                        data,
                        width,
                        height,
                        date,
                    },
                )?
            } else {
                add_text(&name, &bytes, page, position, text.as_deref().unwrap_or_default(), font_size)?
            };
            write_output(&output, &result)?;

            #[allow(clippy::print_stdout)]
            {
                println!("Annotated page {} of {} into {}", page, name, output.display());
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Merge every input and write the result; nothing is written on failure.
fn merge(inputs: &[PathBuf], output: &Path, options: &MergeOptions) -> Result<()> {
    let documents = inputs.iter().map(|p| read_document(p)).collect::<Result<Vec<_>>>()?;
    info!("Merging {} files", documents.len());

    let result = merge_documents(&documents, options)?;
    write_output(output, &result.bytes)?;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "Merged {} file(s) into {} ({} pages)",
            result.report.files,
            output.display(),
            result.report.pages
        );
    }
    Ok(())
}

fn read_document(path: &Path) -> Result<(String, Vec<u8>)> {
    let name = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|e| Error::DocumentRead {
        file: name.clone(),
        reason: e.to_string(),
    })?;
    Ok((name, bytes))
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write output: {}", path.display()))
}

/// Expand the command-line inputs into an ordered list of PDF files.
///
/// Directories contribute their `*.pdf` files (`**/*.pdf` when recursive)
/// sorted by path. Quoted glob patterns expand to their sorted matches;
/// other files are kept as given. With no inputs the current directory is
/// searched.
fn gather_files(items: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    if items.is_empty() {
        return pdfs_in(Path::new("."), recursive);
    }

    let mut files = Vec::new();
    for item in items {
        let text = item.to_string_lossy();
        if item.is_dir() {
            files.extend(pdfs_in(item, recursive)?);
        } else if text.contains(['*', '?', '[']) {
            let mut matched: Vec<PathBuf> = glob::glob(&text)
                .with_context(|| format!("Invalid glob pattern: {text}"))?
                .filter_map(std::result::Result::ok)
                .collect();
            if matched.is_empty() {
                anyhow::bail!("No files matched pattern: {text}");
            }
            matched.sort();
            files.extend(matched);
        } else {
            files.push(item.clone());
        }
    }
    Ok(files)
}

fn pdfs_in(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let suffix = if recursive { "**/*.pdf" } else { "*.pdf" };
    let pattern = format!("{}/{}", glob::Pattern::escape(&dir.to_string_lossy()), suffix);
    debug!("Searching {}", pattern);

    let mut found: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("Invalid search pattern: {pattern}"))?
        .filter_map(std::result::Result::ok)
        .filter(|p| p.is_file())
        .collect();
    found.sort();
    Ok(found)
}
