//! xlsxllm CLI - extract an Excel range as JSON, Markdown, CSV or plain text

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use xlsxllm::{
    formula_stats, DateFormat, ExportFormat, FormulaMode, LineEnding, PipelineBuilder,
    WorkbookDecoder, XlsxLlmError,
};

#[derive(Parser)]
#[command(name = "xlsxllm")]
#[command(
    author,
    version,
    about = "Extract a cell range from an Excel workbook in LLM-friendly formats"
)]
struct Cli {
    /// Input workbook (.xlsx)
    input: PathBuf,

    /// Sheet name (default: first sheet)
    #[arg(short, long)]
    sheet: Option<String>,

    /// Range expression such as A1:D10, A:C or 1:5 (default: the sheet's used range)
    #[arg(short, long)]
    range: Option<String>,

    /// Output format: json, markdown, csv or text
    #[arg(short, long, default_value = "json")]
    format: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// List the sheet names and exit
    #[arg(long)]
    list_sheets: bool,

    /// Print the analysis summary instead of a rendering
    #[arg(long)]
    analysis: bool,

    /// Print function usage and referenced cells of the formulas in the range
    #[arg(long, conflicts_with = "analysis")]
    formula_stats: bool,

    /// Output formula text instead of cached values
    #[arg(long)]
    formulas: bool,

    /// Terminate CSV records with CRLF
    #[arg(long)]
    crlf: bool,

    /// Write JSON on a single line
    #[arg(long)]
    compact: bool,

    /// chrono pattern for date cells (default: ISO 8601)
    #[arg(long, value_name = "PATTERN")]
    date_format: Option<String>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "xlsxllm=debug"
    } else {
        "xlsxllm=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(io::stderr)
        .init();

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let format: ExportFormat = staged(cli.format.parse())?;

    let mut builder = PipelineBuilder::new()
        .with_pretty_json(!cli.compact)
        .with_line_ending(if cli.crlf {
            LineEnding::Crlf
        } else {
            LineEnding::Lf
        });
    if cli.formulas {
        builder = builder.with_formula_mode(FormulaMode::Formula);
    }
    if let Some(pattern) = &cli.date_format {
        builder = builder.with_date_format(DateFormat::Custom(pattern.clone()));
    }
    let pipeline = staged(builder.build())?;

    let input = File::open(&cli.input)
        .with_context(|| format!("Failed to open '{}'", cli.input.display()))?;
    let workbook = staged(pipeline.open(input))
        .with_context(|| format!("Failed to read '{}'", cli.input.display()))?;

    if cli.list_sheets {
        let names = pipeline.list_sheets(&workbook);
        return emit(cli, &(names.join("\n") + "\n"));
    }

    let sheet = match &cli.sheet {
        Some(sheet) => sheet.clone(),
        None => workbook
            .sheet_names()
            .into_iter()
            .next()
            .context("Workbook has no sheets")?,
    };
    let range = match &cli.range {
        Some(range) => range.clone(),
        None => workbook
            .used_range(&sheet)
            .map(|bound| bound.to_string())
            .unwrap_or_else(|| "A1".to_string()),
    };

    let result = staged(pipeline.process(&workbook, &sheet, &range))?;

    if cli.formula_stats {
        let stats = staged(formula_stats(result.formulas()))?;
        return emit(cli, &stats.render());
    }

    let bundle = staged(pipeline.render(&result))?;

    if cli.analysis {
        return emit(cli, bundle.analysis());
    }

    let artifact = pipeline.export(&bundle, format);
    emit(cli, &artifact.content)
}

/// ライブラリのエラーに失敗した処理段階を付与
fn staged<T>(result: std::result::Result<T, XlsxLlmError>) -> Result<T> {
    result.map_err(|e| {
        let stage = e.stage();
        anyhow::Error::new(e).context(format!("{} stage failed", stage))
    })
}

fn emit(cli: &Cli, content: &str) -> Result<()> {
    match &cli.output {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Failed to write '{}'", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            if !content.is_empty() && !content.ends_with('\n') {
                writeln!(stdout)?;
            }
            stdout.flush()?;
            Ok(())
        }
    }
}
