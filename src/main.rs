use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use fluxion::api::Dataset;
use fluxion::csv_reader;
use fluxion::kind::ChartKind;
use fluxion::palette::DEFAULT_PALETTE;
use fluxion::preview::PreviewPager;
use fluxion::runtime::{self, ChartRequest};
use fluxion::selection::{Role, RoleAssignment};
use fluxion::upload;
use fluxion::{OutputFormat, RenderOptions};
use log::{debug, info};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "fluxion")]
#[command(about = "Build bar, line, pie and scatter charts from dataset previews", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a chart and write it to stdout
    Render(RenderArgs),
    /// Print the dataset summary and preview table
    Preview {
        #[command(flatten)]
        input: InputArgs,
        /// Number of preview pages to show (5 rows each)
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Check a file against the upload limits
    Check {
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Dataset file: upload response JSON, dataset JSON, or CSV; stdin when omitted
    #[arg(long, short)]
    input: Option<PathBuf>,
    /// Read the input as CSV instead of JSON
    #[arg(long)]
    csv: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Output {
    Png,
    Svg,
    Pdf,
    /// Prepared series, colors and styling as JSON
    Json,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Chart type: bar, line, pie or scatter
    #[arg(long, short, default_value = "bar")]
    kind: String,
    /// X-axis column (bar, line, scatter)
    #[arg(long, short)]
    x: Option<String>,
    /// Y-axis column (bar, line, scatter)
    #[arg(long, short)]
    y: Option<String>,
    /// Value column (pie)
    #[arg(long)]
    value: Option<String>,
    /// Label column (pie)
    #[arg(long)]
    label: Option<String>,
    /// Color palette: default, blue, purple or rainbow
    #[arg(long, short, default_value = DEFAULT_PALETTE)]
    palette: String,
    #[arg(long, short)]
    title: Option<String>,
    /// Output format; defaults to the options file, then png
    #[arg(long, short, value_enum)]
    format: Option<Output>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    /// JSON file with render options (width, height, type)
    #[arg(long)]
    options: Option<PathBuf>,
    /// Write the chart to a file instead of stdout; a .png, .svg or .pdf extension picks the format
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Render(args) => run_render(args),
        Commands::Preview { input, pages } => run_preview(&input, pages),
        Commands::Check { path } => run_check(&path),
    }
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => {
            fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))
        }
        None => {
            let mut bytes = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut bytes)
                .context("Failed to read stdin")?;
            Ok(bytes)
        }
    }
}

fn load_dataset(input: &InputArgs) -> Result<Dataset> {
    let bytes = read_input(input.input.as_deref())?;
    let name = input
        .input
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stdin".to_string());

    if input.csv {
        let csv = csv_reader::read_csv(bytes.as_slice()).context("Failed to read CSV input")?;
        Ok(Dataset::from_csv(&name, Some(bytes.len() as u64), &csv))
    } else {
        let text = String::from_utf8(bytes).context("Input is not valid UTF-8")?;
        Dataset::from_json_str(&text)
    }
}

fn run_render(args: RenderArgs) -> Result<()> {
    let dataset = load_dataset(&args.input)?;
    let kind: ChartKind = args.kind.parse()?;

    let mut selection = RoleAssignment::new();
    let columns = [
        (Role::X, &args.x),
        (Role::Y, &args.y),
        (Role::Value, &args.value),
        (Role::Label, &args.label),
    ];
    for (role, column) in columns {
        if let Some(column) = column {
            selection.set(role, column.as_str());
        }
    }

    let request = ChartRequest {
        kind,
        selection,
        palette: args.palette,
        title: args.title,
    };

    let mut options = match &args.options {
        Some(path) => RenderOptions::from_file(path)?,
        None => RenderOptions::default(),
    };
    if let Some(width) = args.width {
        options.width = width;
    }
    if let Some(height) = args.height {
        options.height = height;
    }
    debug!("render options: {:?}", options);

    let format = args.format.or_else(|| {
        let ext = args.output.as_ref()?.extension()?.to_str()?;
        OutputFormat::from_extension(ext).map(|f| match f {
            OutputFormat::Png => Output::Png,
            OutputFormat::Svg => Output::Svg,
            OutputFormat::Pdf => Output::Pdf,
        })
    });

    let bytes = match format {
        Some(Output::Json) => {
            let chart = runtime::prepare_chart(&dataset, &request)?;
            let mut json =
                serde_json::to_vec_pretty(&chart).context("Failed to encode chart JSON")?;
            json.push(b'\n');
            json
        }
        Some(Output::Png) => render_as(dataset, &request, options, OutputFormat::Png)?,
        Some(Output::Svg) => render_as(dataset, &request, options, OutputFormat::Svg)?,
        Some(Output::Pdf) => render_as(dataset, &request, options, OutputFormat::Pdf)?,
        None => runtime::render_chart(dataset, &request, &options)
            .context("Failed to render chart")?,
    };

    if let Some(path) = &args.output {
        fs::write(path, &bytes)
            .with_context(|| format!("Failed to write chart to '{}'", path.display()))?;
        info!("wrote {}", path.display());
        return Ok(());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(&bytes)
        .context("Failed to write chart to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}

fn render_as(
    dataset: Dataset,
    request: &ChartRequest,
    mut options: RenderOptions,
    format: OutputFormat,
) -> Result<Vec<u8>> {
    options.format = format;
    runtime::render_chart(dataset, request, &options).context("Failed to render chart")
}

fn run_preview(input: &InputArgs, pages: usize) -> Result<()> {
    let dataset = load_dataset(input)?;
    let preview = &dataset.preview;

    let mut pager = PreviewPager::new(preview);
    for _ in 1..pages {
        pager.show_more();
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let name = if dataset.filename.is_empty() {
        "Dataset"
    } else {
        dataset.filename.as_str()
    };
    writeln!(out, "{}", name)?;
    write!(out, "{} rows, {} columns", dataset.rows, dataset.columns)?;
    if let Some(size) = dataset.file_size {
        write!(out, ", {}", upload::format_bytes(size))?;
    }
    writeln!(out)?;
    writeln!(out)?;

    if preview.columns().is_empty() {
        writeln!(out, "No columns found in data")?;
        return Ok(());
    }
    writeln!(out, "{}", preview.columns().join("\t"))?;
    if preview.is_empty() {
        writeln!(out, "No data to preview")?;
    }
    for row in pager.visible_cells(preview) {
        writeln!(out, "{}", row.join("\t"))?;
    }
    if pager.has_more() {
        writeln!(out, "... {} more preview rows", preview.len() - pager.shown())?;
    }

    Ok(())
}

fn run_check(path: &Path) -> Result<()> {
    let metadata =
        fs::metadata(path).with_context(|| format!("Cannot access '{}'", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    upload::check_upload(&name, metadata.len())?;
    println!(
        "{} ({}) is ready to upload",
        name,
        upload::format_bytes(metadata.len())
    );
    Ok(())
}
