//! xlsxllm - Extract Excel ranges into LLM-friendly text
//!
//! This crate reads a rectangular cell range from an Excel workbook (XLSX) and
//! renders it as JSON, a Markdown table, CSV and tab-separated plain text, together
//! with a short analysis summary and the formulas found in the range.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::fs::File;
//! use xlsxllm::{ExportFormat, PipelineBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = PipelineBuilder::new().build()?;
//!
//!     // Decode the workbook once, then extract as many ranges as needed
//!     let workbook = pipeline.open(File::open("sales.xlsx")?)?;
//!     let result = pipeline.process(&workbook, "Sheet1", "A1:D20")?;
//!
//!     // Render all formats at once and pick one for export
//!     let bundle = pipeline.render(&result)?;
//!     let artifact = pipeline.export(&bundle, ExportFormat::Tabular);
//!     std::fs::write(artifact.file_name("sales"), artifact.content)?;
//!
//!     println!("{}", bundle.analysis());
//!     Ok(())
//! }
//! ```
//!
//! # Synthetic Workbooks
//!
//! Extraction and rendering only depend on the [`WorkbookDecoder`] trait, so data
//! that is already in memory can go through the same pipeline:
//!
//! ```rust
//! use xlsxllm::{CellValue, InMemoryWorkbook};
//!
//! # fn main() -> Result<(), xlsxllm::XlsxLlmError> {
//! let mut workbook = InMemoryWorkbook::new().with_sheet("Sheet1");
//! workbook.set_value("Sheet1", "A1", CellValue::Number(10.0))?;
//! workbook.set_formula("Sheet1", "B1", "=A1*2", CellValue::Number(20.0))?;
//! workbook.set_value("Sheet1", "A2", CellValue::String("x".to_string()))?;
//!
//! let result = xlsxllm::process(&workbook, "Sheet1", "A1:B2")?;
//! assert_eq!(result.grid().rows(), &[vec!["10", "20"], vec!["x", ""]]);
//! assert_eq!(result.formulas().get("B1"), Some("=A1*2"));
//!
//! let bundle = xlsxllm::render(&result)?;
//! assert_eq!(bundle.delimited(), "10,20\nx,\n");
//! # Ok(())
//! # }
//! ```
//!
//! # Range Expressions
//!
//! `A1`, `A1:C3`, `A:C` (whole columns) and `1:3` (whole rows) are accepted, with
//! optional `$` markers. Whole-column and whole-row forms are bounded by the sheet's
//! used range. An end cell before the start cell is an error, never swapped.

mod api;
mod builder;
mod decoder;
mod error;
mod export;
mod extract;
mod format;
mod formatter;
mod output;
mod range;
mod security;
mod types;

// 公開API
pub use api::{DateFormat, ExportFormat, FormulaMode, LineEnding};
pub use builder::{Pipeline, PipelineBuilder, DEFAULT_MAX_CELLS};
pub use decoder::{CalamineWorkbook, InMemoryWorkbook, WorkbookDecoder};
pub use error::XlsxLlmError;
pub use export::{export, export_named, ExportArtifact};
pub use output::{formula_stats, FormulaStats};
pub use range::{resolve_range, RangeExpression};
pub use types::{
    CellAddress, CellValue, DecodedCell, ExtractionResult, FormulaMap, Grid, RangeBound,
    RenderedOutput, MAX_COLUMNS, MAX_ROWS,
};

/// ワークブック内のシート名を順序どおりに返す
pub fn list_sheets<D: WorkbookDecoder + ?Sized>(decoder: &D) -> Vec<String> {
    decoder.sheet_names()
}

/// デフォルト設定でシートの範囲を抽出する
///
/// 設定を変更する場合は[`PipelineBuilder`]を使用してください。
pub fn process<D: WorkbookDecoder + ?Sized>(
    decoder: &D,
    sheet: &str,
    range: &str,
) -> Result<ExtractionResult, XlsxLlmError> {
    Pipeline::default().process(decoder, sheet, range)
}

/// デフォルト設定で4つの表現と分析サマリーを生成する
pub fn render(result: &ExtractionResult) -> Result<RenderedOutput, XlsxLlmError> {
    Pipeline::default().render(result)
}
