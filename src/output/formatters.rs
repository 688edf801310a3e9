//! Output Formatters Implementation
//!
//! 各出力フォーマットの実装を提供するモジュール。

use csv::{QuoteStyle, Terminator, WriterBuilder};

use super::RenderOptions;
use crate::api::LineEnding;
use crate::error::XlsxLlmError;
use crate::types::ExtractionResult;

/// JSON形式のフォーマッター
///
/// グリッドを行の配列（各行は文字列の配列）として出力します。
pub(crate) struct RecordFormatter;

impl RecordFormatter {
    pub fn render(
        &self,
        result: &ExtractionResult,
        options: &RenderOptions,
    ) -> Result<String, XlsxLlmError> {
        let serialized = if options.pretty_json {
            serde_json::to_string_pretty(result.grid())
        } else {
            serde_json::to_string(result.grid())
        };
        serialized.map_err(|e| XlsxLlmError::Render(format!("JSON serialization error: {}", e)))
    }
}

/// Markdown形式のフォーマッター
///
/// 1行目をヘッダーとして扱います。セル内の`\`は`\\`、`|`は`\|`に
/// エスケープし、改行は`<br>`に置換します。
pub(crate) struct TabularFormatter;

impl TabularFormatter {
    pub fn render(&self, result: &ExtractionResult) -> Result<String, XlsxLlmError> {
        let grid = result.grid();
        let Some(header) = grid.header() else {
            return Ok(String::new());
        };

        let mut lines = Vec::with_capacity(grid.row_count() + 1);
        lines.push(table_row(header));
        lines.push(table_row(&vec!["---".to_string(); header.len()]));
        for row in &grid.rows()[1..] {
            if row.len() != header.len() {
                return Err(XlsxLlmError::Render(format!(
                    "table row has {} cells, header has {}",
                    row.len(),
                    header.len()
                )));
            }
            lines.push(table_row(row));
        }

        Ok(lines.join("\n"))
    }
}

fn table_row(cells: &[String]) -> String {
    let escaped: Vec<String> = cells.iter().map(|cell| escape_markdown(cell)).collect();
    format!("| {} |", escaped.join(" | "))
}

/// Markdownテーブルのセル文字列をエスケープ
fn escape_markdown(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace(['\n', '\r'], "<br>")
}

/// CSV形式のフォーマッター
///
/// 区切り文字、ダブルクォート、改行を含むフィールドのみをクォートします。
pub(crate) struct DelimitedFormatter;

impl DelimitedFormatter {
    pub fn render(
        &self,
        result: &ExtractionResult,
        options: &RenderOptions,
    ) -> Result<String, XlsxLlmError> {
        let terminator = match options.line_ending {
            LineEnding::Lf => Terminator::Any(b'\n'),
            LineEnding::Crlf => Terminator::CRLF,
        };
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .terminator(terminator)
            .from_writer(Vec::new());

        for row in result.grid().rows() {
            writer
                .write_record(row)
                .map_err(|e| XlsxLlmError::Render(format!("CSV write error: {}", e)))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| XlsxLlmError::Render(format!("CSV flush error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| XlsxLlmError::Render(format!("CSV output is not UTF-8: {}", e)))
    }
}

/// プレーンテキスト形式のフォーマッター
///
/// セルをタブ、行を改行で連結します。エスケープは行いません。
pub(crate) struct PlainFormatter;

impl PlainFormatter {
    pub fn render(&self, result: &ExtractionResult) -> Result<String, XlsxLlmError> {
        Ok(result
            .grid()
            .rows()
            .iter()
            .map(|row| row.join("\t"))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// Markdownテーブルを行の配列に戻す（区切り行は除く）
#[cfg(test)]
pub(crate) fn parse_tabular(table: &str) -> Vec<Vec<String>> {
    table
        .lines()
        .enumerate()
        .filter(|(i, _)| *i != 1)
        .map(|(_, line)| {
            let mut cells = Vec::new();
            let mut current = String::new();
            let mut chars = line.chars();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(next) = chars.next() {
                            current.push(next);
                        }
                    }
                    '|' => cells.push(std::mem::take(&mut current)),
                    _ => current.push(c),
                }
            }
            cells.push(current);
            // 先頭の"|"の前と末尾の"|"の後の空要素を除く
            let inner = &cells[1..cells.len() - 1];
            inner
                .iter()
                .map(|cell| {
                    let cell = cell.strip_prefix(' ').unwrap_or(cell);
                    cell.strip_suffix(' ').unwrap_or(cell).to_string()
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ConversionConfig;
    use crate::decoder::InMemoryWorkbook;
    use crate::extract::GridExtractor;
    use crate::range::resolve_range;
    use crate::types::CellValue;

    fn scenario_a() -> ExtractionResult {
        let mut workbook = InMemoryWorkbook::new().with_sheet("Sheet1");
        workbook
            .set_value("Sheet1", "A1", CellValue::Number(10.0))
            .unwrap();
        workbook
            .set_formula("Sheet1", "B1", "=A1*2", CellValue::Number(20.0))
            .unwrap();
        workbook
            .set_value("Sheet1", "A2", CellValue::String("x".to_string()))
            .unwrap();
        extract(&workbook, "A1:B2")
    }

    fn extract(workbook: &InMemoryWorkbook, expression: &str) -> ExtractionResult {
        let bound = resolve_range(expression, None).unwrap();
        GridExtractor::new(&ConversionConfig::default(), false)
            .extract(workbook, "Sheet1", bound, expression)
            .unwrap()
    }

    fn single_column(values: &[&str]) -> ExtractionResult {
        let mut workbook = InMemoryWorkbook::new().with_sheet("Sheet1");
        for (i, value) in values.iter().enumerate() {
            workbook
                .set_value(
                    "Sheet1",
                    &format!("A{}", i + 1),
                    CellValue::String(value.to_string()),
                )
                .unwrap();
        }
        extract(&workbook, &format!("A1:A{}", values.len()))
    }

    #[test]
    fn test_record_pretty_and_compact() {
        let result = scenario_a();

        let pretty = RecordFormatter
            .render(&result, &RenderOptions::default())
            .unwrap();
        assert_eq!(
            pretty,
            "[\n  [\n    \"10\",\n    \"20\"\n  ],\n  [\n    \"x\",\n    \"\"\n  ]\n]"
        );

        let compact = RecordFormatter
            .render(
                &result,
                &RenderOptions {
                    pretty_json: false,
                    ..RenderOptions::default()
                },
            )
            .unwrap();
        assert_eq!(compact, r#"[["10","20"],["x",""]]"#);
    }

    #[test]
    fn test_tabular() {
        let tabular = TabularFormatter.render(&scenario_a()).unwrap();
        assert_eq!(tabular, "| 10 | 20 |\n| --- | --- |\n| x |  |");
    }

    #[test]
    fn test_tabular_escapes_separators_and_line_breaks() {
        let result = single_column(&["head", "a|b", "back\\slash", "two\nlines", "crlf\r\nend"]);
        let tabular = TabularFormatter.render(&result).unwrap();
        let lines: Vec<&str> = tabular.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[2], "| a\\|b |");
        assert_eq!(lines[3], "| back\\\\slash |");
        assert_eq!(lines[4], "| two<br>lines |");
        assert_eq!(lines[5], "| crlf<br>end |");

        let parsed = parse_tabular(&tabular);
        assert_eq!(parsed[1], vec!["a|b"]);
        assert_eq!(parsed[2], vec!["back\\slash"]);
    }

    #[test]
    fn test_tabular_header_only() {
        let result = single_column(&["only"]);
        assert_eq!(
            TabularFormatter.render(&result).unwrap(),
            "| only |\n| --- |"
        );
    }

    #[test]
    fn test_delimited_quotes_commas() {
        let result = single_column(&["a,b", "say \"hi\"", "plain"]);
        let csv_text = DelimitedFormatter
            .render(&result, &RenderOptions::default())
            .unwrap();
        assert_eq!(csv_text, "\"a,b\"\n\"say \"\"hi\"\"\"\nplain\n");

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(csv_text.as_bytes());
        let first = reader.records().next().unwrap().unwrap();
        assert_eq!(&first[0], "a,b");
    }

    #[test]
    fn test_delimited_crlf() {
        let options = RenderOptions {
            line_ending: LineEnding::Crlf,
            ..RenderOptions::default()
        };
        let csv_text = DelimitedFormatter.render(&scenario_a(), &options).unwrap();
        assert_eq!(csv_text, "10,20\r\nx,\r\n");
    }

    #[test]
    fn test_plain() {
        let plain = PlainFormatter.render(&scenario_a()).unwrap();
        assert_eq!(plain, "10\t20\nx\t");
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("plain"), "plain");
        assert_eq!(escape_markdown("a|b|c"), "a\\|b\\|c");
        assert_eq!(escape_markdown("\\|"), "\\\\\\|");
        assert_eq!(escape_markdown("a\rb"), "a<br>b");
    }
}
