//! Analysis Summary Module
//!
//! 抽出結果の概要（シート名、範囲、行列数、ヘッダー、数式一覧）を
//! 固定テンプレートのテキストとして生成します。統計的な分析は行いません。

use crate::types::ExtractionResult;

const TITLE: &str = "Excel Data Analysis";

const NOTES: &[&str] = &[
    "- Values are shown as displayed in Excel (cached results for formula cells).",
    "- Row 1 of the range is treated as the header row in the Markdown table.",
    "- Empty cells are kept as empty strings so every row has the same number of columns.",
    "- Formulas are listed separately by cell address.",
];

/// 分析サマリーを生成
pub(crate) fn summarize(result: &ExtractionResult) -> String {
    let grid = result.grid();
    let mut lines = vec![
        TITLE.to_string(),
        "=".repeat(TITLE.len()),
        String::new(),
        format!("Sheet: {}", result.sheet_name()),
        format!("Range: {}", result.range_expression()),
        format!("Rows: {}", grid.row_count()),
        format!("Columns: {}", grid.column_count()),
    ];

    if let Some(header) = grid.header() {
        lines.push(String::new());
        lines.push(format!("Headers: {}", header.join(", ")));
    }

    if !result.formulas().is_empty() {
        lines.push(String::new());
        lines.push("Formulas:".to_string());
        for (address, formula) in result.formulas().iter() {
            lines.push(format!("- {}: {}", address, formula));
        }
    }

    if !result.merged_ranges().is_empty() {
        lines.push(String::new());
        lines.push("Merged cells:".to_string());
        for region in result.merged_ranges() {
            lines.push(format!("- {}", region));
        }
    }

    lines.push(String::new());
    lines.push("Notes:".to_string());
    lines.extend(NOTES.iter().map(|note| note.to_string()));

    lines.join("\n")
}
