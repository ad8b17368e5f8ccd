//! reslice CLI - resume export tool

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use reslice::{
    detect_kind_from_path, Artifact, CaptureOptions, DocumentOptions, ExportConfig, Exporter,
    ImageEncoding, LiveDom, Margins, MarkupFlavor, Orientation, OutputMode, PageFormat,
    ResumeDocument,
};

#[derive(Parser)]
#[command(name = "reslice")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Export a rendered resume to paginated PDF, image, or markup", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a layout snapshot as a paginated PDF
    Pdf {
        #[command(flatten)]
        capture: CaptureArgs,

        /// Page format (see `reslice formats`)
        #[arg(long, value_name = "NAME")]
        format: Option<String>,

        /// Page orientation
        #[arg(long, value_enum)]
        orientation: Option<OrientationArg>,

        /// Margin on every side, in millimeters
        #[arg(long, value_name = "MM")]
        margin: Option<f64>,

        /// Embed the page image as PNG instead of JPEG
        #[arg(long)]
        png: bool,

        /// JPEG quality (0.0-1.0)
        #[arg(long, value_name = "Q")]
        quality: Option<f32>,

        /// Do not add clickable link annotations
        #[arg(long)]
        no_links: bool,

        /// Document title
        #[arg(long)]
        title: Option<String>,
    },

    /// Export a layout snapshot as a single image
    #[command(alias = "img")]
    Image {
        #[command(flatten)]
        capture: CaptureArgs,

        /// Encode as PNG instead of JPEG
        #[arg(long)]
        png: bool,

        /// JPEG quality (0.0-1.0)
        #[arg(long, value_name = "Q")]
        quality: Option<f32>,
    },

    /// Render resume data as HTML or Word markup
    Markup {
        /// Resume data (JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Markup flavor
        #[arg(long, value_enum, default_value = "html")]
        flavor: FlavorArg,

        /// Output directory (stdout if not specified)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Name used for the output file
        #[arg(long)]
        name: Option<String>,
    },

    /// List supported page formats
    Formats,

    /// Show what kind of artifact a file is
    Inspect {
        /// Exported file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

/// Arguments shared by every capture-based export.
#[derive(Args)]
struct CaptureArgs {
    /// Layout snapshot (JSON)
    #[arg(long, value_name = "FILE")]
    layout: PathBuf,

    /// Id of the element to capture
    #[arg(long, value_name = "ID", default_value = "resume-preview")]
    element: String,

    /// Export preferences (JSON); flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Capture scale (>= 1)
    #[arg(long)]
    scale: Option<f32>,

    /// Background color (CSS)
    #[arg(long, value_name = "COLOR")]
    background: Option<String>,

    /// Allow cross-origin images without CORS approval
    #[arg(long)]
    allow_taint: bool,

    /// Image load timeout in milliseconds
    #[arg(long, value_name = "MS")]
    image_timeout: Option<u64>,

    /// Name used for the output file
    #[arg(long)]
    name: Option<String>,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output: PathBuf,
}

impl CaptureArgs {
    fn base_config(&self) -> Result<ExportConfig, Box<dyn std::error::Error>> {
        Ok(match &self.config {
            Some(path) => ExportConfig::load(path)?,
            None => ExportConfig::default(),
        })
    }

    fn apply(&self, mut capture: CaptureOptions) -> CaptureOptions {
        if let Some(scale) = self.scale {
            capture = capture.with_scale(scale);
        }
        if let Some(ref color) = self.background {
            capture = capture.with_background(color.clone());
        }
        if self.allow_taint {
            capture = capture.with_tainted_canvas(true);
        }
        if let Some(ms) = self.image_timeout {
            capture = capture.with_image_timeout(Duration::from_millis(ms));
        }
        capture
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OrientationArg {
    /// Height is the long edge
    Portrait,
    /// Width is the long edge
    Landscape,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Orientation::Portrait,
            OrientationArg::Landscape => Orientation::Landscape,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FlavorArg {
    /// Standalone HTML page
    Html,
    /// Word-compatible document
    Word,
}

impl From<FlavorArg> for MarkupFlavor {
    fn from(arg: FlavorArg) -> Self {
        match arg {
            FlavorArg::Html => MarkupFlavor::Html,
            FlavorArg::Word => MarkupFlavor::Word,
        }
    }
}

fn encoding(png: bool, quality: Option<f32>, fallback: ImageEncoding) -> ImageEncoding {
    match (png, quality) {
        (true, _) => ImageEncoding::Png,
        (false, Some(q)) => ImageEncoding::jpeg(q),
        (false, None) => fallback,
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Pdf {
            capture,
            format,
            orientation,
            margin,
            png,
            quality,
            no_links,
            title,
        }) => cmd_pdf(
            &capture,
            format.as_deref(),
            orientation,
            margin,
            png,
            quality,
            no_links,
            title,
        ),
        Some(Commands::Image {
            capture,
            png,
            quality,
        }) => cmd_image(&capture, png, quality),
        Some(Commands::Markup {
            input,
            flavor,
            output,
            name,
        }) => cmd_markup(&input, flavor, output.as_deref(), name),
        Some(Commands::Formats) => {
            cmd_formats();
            Ok(())
        }
        Some(Commands::Inspect { input }) => cmd_inspect(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            println!("{}", "Usage: reslice <COMMAND>".yellow());
            println!("       reslice --help for more information");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_pdf(
    args: &CaptureArgs,
    format: Option<&str>,
    orientation: Option<OrientationArg>,
    margin: Option<f64>,
    png: bool,
    quality: Option<f32>,
    no_links: bool,
    title: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let base = args.base_config()?;
    let mut options = match base.mode {
        OutputMode::PaginatedDocument(options) => options,
        OutputMode::SingleImage(_) => DocumentOptions::default(),
    };

    if let Some(name) = format {
        options = options.with_page_format(name);
    }
    if let Some(o) = orientation {
        options = options.with_orientation(o.into());
    }
    if let Some(mm) = margin {
        options = options.with_margins(Margins::uniform(mm));
    }
    let embedded = encoding(png, quality, options.image_encoding);
    let links = options.links_enabled && !no_links;
    options = options.with_image_encoding(embedded).with_links(links);
    if let Some(title) = title {
        options = options.with_title(title);
    }

    let config = ExportConfig::document(options).with_capture(args.apply(base.capture));
    let artifact = run_export(args, &config)?;

    let stats = &artifact.stats;
    println!("{}: {}", "Pages".bold(), stats.page_count);
    println!(
        "{}: {} placed, {} dropped, {} rejected",
        "Links".bold(),
        stats.links_placed,
        stats.links_dropped,
        stats.links_rejected
    );

    Ok(())
}

fn cmd_image(
    args: &CaptureArgs,
    png: bool,
    quality: Option<f32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let base = args.base_config()?;
    let fallback = match base.mode {
        OutputMode::SingleImage(options) => options.encoding,
        OutputMode::PaginatedDocument(_) => ImageEncoding::default(),
    };

    let config = ExportConfig::image(encoding(png, quality, fallback))
        .with_capture(args.apply(base.capture));
    run_export(args, &config)?;

    Ok(())
}

fn run_export(
    args: &CaptureArgs,
    config: &ExportConfig,
) -> Result<Artifact, Box<dyn std::error::Error>> {
    let mut dom = LiveDom::load(&args.layout)?;

    let mut exporter = Exporter::new();
    if let Some(ref name) = args.name {
        exporter = exporter.with_resume_name(name.clone());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(format!("Capturing #{}...", args.element));

    let artifact = match exporter.export(&mut dom, &args.element, config) {
        Ok(artifact) => artifact,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    spinner.set_message("Saving...");
    let path = artifact.save_in(&args.output)?;
    spinner.finish_and_clear();

    println!(
        "{} {} ({} bytes)",
        "Saved to".green(),
        path.display(),
        artifact.len()
    );
    println!(
        "{}: {}x{} px",
        "Capture".bold(),
        artifact.stats.pixel_width,
        artifact.stats.pixel_height
    );

    Ok(artifact)
}

fn cmd_markup(
    input: &Path,
    flavor: FlavorArg,
    output: Option<&Path>,
    name: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let resume = ResumeDocument::load(input)?;

    let mut exporter = Exporter::new();
    if let Some(name) = name {
        exporter = exporter.with_resume_name(name);
    }
    let artifact = exporter.export_markup(&resume, flavor.into())?;

    if let Some(dir) = output {
        let path = artifact.save_in(dir)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", String::from_utf8_lossy(&artifact.bytes));
    }

    Ok(())
}

fn cmd_formats() {
    println!("{}", "Page Formats".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    for format in PageFormat::all() {
        let marker = if format.name == PageFormat::DEFAULT.name {
            " (default)".dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            "{} {:>6.1} x {:>6.1} mm{}",
            format!("{:<10}", format.name).bold(),
            format.width_mm,
            format.height_mm,
            marker
        );
    }
}

fn cmd_inspect(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let kind = detect_kind_from_path(input)?;
    let size = fs::metadata(input)?.len();

    println!("{}", "Artifact Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Kind".bold(), kind);
    println!("{}: .{}", "Extension".bold(), kind.extension());
    println!("{}: {} bytes", "Size".bold(), size);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "reslice".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Resume capture-and-paginate export tool");
    println!();
    println!("License: MIT");
}
