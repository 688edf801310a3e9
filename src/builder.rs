//! Builder Module
//!
//! Fluent Builder APIを提供し、`Pipeline`インスタンスを段階的に構築する。

use std::io::{Read, Write};

use chrono::format::{Item, StrftimeItems};
use tracing::{debug, info};

use crate::api::{DateFormat, ExportFormat, FormulaMode, LineEnding};
use crate::decoder::{CalamineWorkbook, WorkbookDecoder};
use crate::error::XlsxLlmError;
use crate::export::{self, ExportArtifact};
use crate::extract::GridExtractor;
use crate::output::{self, OutputFormatter, RenderOptions};
use crate::range::RangeExpression;
use crate::security::SecurityConfig;
use crate::types::{ExtractionResult, RangeBound, RenderedOutput};

/// 1回の抽出で扱うセル数の上限（デフォルト）
pub const DEFAULT_MAX_CELLS: usize = 1_000_000;

/// 変換処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ConversionConfig {
    /// 日付形式
    pub date_format: DateFormat,

    /// 数式出力モード
    pub formula_mode: FormulaMode,

    /// CSVの行区切り
    pub line_ending: LineEnding,

    /// JSONを整形して出力するか
    pub pretty_json: bool,

    /// 1回の抽出で扱うセル数の上限
    pub max_cells: usize,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            date_format: DateFormat::Iso8601,
            formula_mode: FormulaMode::CachedValue,
            line_ending: LineEnding::Lf,
            pretty_json: true,
            max_cells: DEFAULT_MAX_CELLS,
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `Pipeline`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxllm::{FormulaMode, LineEnding, PipelineBuilder};
///
/// # fn main() -> Result<(), xlsxllm::XlsxLlmError> {
/// let pipeline = PipelineBuilder::new()
///     .with_formula_mode(FormulaMode::Formula)
///     .with_line_ending(LineEnding::Crlf)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PipelineBuilder {
    /// 内部設定（構築中）
    config: ConversionConfig,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 日付形式: ISO 8601 (YYYY-MM-DD)
    /// - 数式モード: キャッシュ値を出力
    /// - CSVの行区切り: LF
    /// - JSON: 整形して出力
    /// - セル数の上限: 1,000,000
    pub fn new() -> Self {
        Self {
            config: ConversionConfig::default(),
        }
    }

    /// 日付の出力形式を指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxllm::{DateFormat, PipelineBuilder};
    ///
    /// let builder = PipelineBuilder::new()
    ///     .with_date_format(DateFormat::Custom("%Y年%m月%d日".to_string()));
    /// ```
    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.config.date_format = format;
        self
    }

    /// 数式セルの出力モードを指定する
    pub fn with_formula_mode(mut self, mode: FormulaMode) -> Self {
        self.config.formula_mode = mode;
        self
    }

    /// CSV出力の行区切りを指定する
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.config.line_ending = line_ending;
        self
    }

    /// JSON出力を整形するかを指定する
    ///
    /// * `true`: インデント2で整形（デフォルト）
    /// * `false`: 1行で出力
    pub fn with_pretty_json(mut self, pretty: bool) -> Self {
        self.config.pretty_json = pretty;
        self
    }

    /// 1回の抽出で扱うセル数の上限を指定する
    ///
    /// 解決後の範囲がこの値を超える場合、`XlsxLlmError::InvalidRange`を返します。
    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.config.max_cells = max_cells;
        self
    }

    /// 設定を検証し、`Pipeline`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Pipeline)`: 設定が有効な場合
    /// * `Err(XlsxLlmError::Config)`: 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * カスタム日付形式が空、または不正な書式指定子を含む
    /// * セル数の上限が0
    pub fn build(self) -> Result<Pipeline, XlsxLlmError> {
        // 1. カスタム日付形式の検証
        if let DateFormat::Custom(ref format_str) = self.config.date_format {
            if format_str.is_empty() {
                return Err(XlsxLlmError::Config(
                    "Invalid date format string: pattern is empty".to_string(),
                ));
            }
            if StrftimeItems::new(format_str).any(|item| matches!(item, Item::Error)) {
                return Err(XlsxLlmError::Config(format!(
                    "Invalid date format string: '{}'",
                    format_str
                )));
            }
        }

        // 2. セル数上限の検証
        if self.config.max_cells == 0 {
            return Err(XlsxLlmError::Config(
                "max_cells must be greater than 0".to_string(),
            ));
        }

        Ok(Pipeline::new(self.config))
    }
}

/// 抽出・レンダリング処理のファサード
///
/// ワークブックの読み込み、範囲の解決、グリッド抽出、レンダリング、エクスポートを
/// まとめて提供します。状態を持たず、同じインスタンスを何度でも使えます。
///
/// # 使用例
///
/// ```rust,no_run
/// use std::fs::File;
/// use xlsxllm::{ExportFormat, PipelineBuilder};
///
/// # fn main() -> Result<(), xlsxllm::XlsxLlmError> {
/// let pipeline = PipelineBuilder::new().build()?;
/// let workbook = pipeline.open(File::open("sales.xlsx")?)?;
/// let result = pipeline.process(&workbook, "Sheet1", "A1:D10")?;
/// let markdown = pipeline.render_format(&result, ExportFormat::Tabular)?;
/// println!("{}", markdown);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// 変換設定
    config: ConversionConfig,

    /// デコード時のセキュリティ制限
    security: SecurityConfig,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(ConversionConfig::default())
    }
}

impl Pipeline {
    pub(crate) fn new(config: ConversionConfig) -> Self {
        Self {
            config,
            security: SecurityConfig::default(),
        }
    }

    /// XLSXファイルを読み込んでデコードする
    ///
    /// 入力はサイズ上限までメモリに読み込んでからデコードします。
    pub fn open<R: Read>(&self, reader: R) -> Result<CalamineWorkbook, XlsxLlmError> {
        CalamineWorkbook::open_with(reader, &self.security)
    }

    /// ワークブック内のシート名を順序どおりに返す
    pub fn list_sheets<D: WorkbookDecoder + ?Sized>(&self, decoder: &D) -> Vec<String> {
        decoder.sheet_names()
    }

    /// シートと範囲式を指定して抽出する
    ///
    /// # 引数
    ///
    /// * `decoder` - デコード済みワークブック
    /// * `sheet` - シート名
    /// * `range` - 範囲式（`A1:D10`、`A:C`、`1:3`、`B2`など）
    ///
    /// # 戻り値
    ///
    /// * `Ok(ExtractionResult)` - 抽出結果
    /// * `Err(XlsxLlmError::InvalidRange)` - 範囲式が不正な場合
    /// * `Err(XlsxLlmError::UnknownSheet)` - シートが存在しない場合
    pub fn process<D: WorkbookDecoder + ?Sized>(
        &self,
        decoder: &D,
        sheet: &str,
        range: &str,
    ) -> Result<ExtractionResult, XlsxLlmError> {
        let expression = RangeExpression::parse(range)?;
        if !decoder.has_sheet(sheet) {
            return Err(XlsxLlmError::UnknownSheet {
                sheet: sheet.to_string(),
                available: decoder.sheet_names(),
            });
        }

        let bound = expression.to_bound(range, decoder.used_range(sheet))?;
        debug!(sheet, range, bound = %bound, "resolved range");

        let result = self.extract(decoder, sheet, bound, range)?;
        info!(
            sheet,
            range,
            rows = result.grid().row_count(),
            columns = result.grid().column_count(),
            formulas = result.formulas().len(),
            "processed range"
        );
        Ok(result)
    }

    /// 解決済みの範囲からグリッドと数式マップを抽出する
    pub fn extract<D: WorkbookDecoder + ?Sized>(
        &self,
        decoder: &D,
        sheet: &str,
        bound: RangeBound,
        expression: &str,
    ) -> Result<ExtractionResult, XlsxLlmError> {
        GridExtractor::new(&self.config, decoder.is_1904()).extract(decoder, sheet, bound, expression)
    }

    /// 4つの表現と分析サマリーをまとめて生成する
    pub fn render(&self, result: &ExtractionResult) -> Result<RenderedOutput, XlsxLlmError> {
        output::render_all(result, &RenderOptions::from(&self.config))
    }

    /// 指定フォーマットの表現のみを生成する
    pub fn render_format(
        &self,
        result: &ExtractionResult,
        format: ExportFormat,
    ) -> Result<String, XlsxLlmError> {
        OutputFormatter::from_format(format).render(result, &RenderOptions::from(&self.config))
    }

    /// レンダリング結果から指定フォーマットの成果物を取り出す
    pub fn export(&self, bundle: &RenderedOutput, format: ExportFormat) -> ExportArtifact {
        export::export(bundle, format)
    }

    /// 読み込みから書き出しまでを一括で実行する
    ///
    /// # 処理フロー
    ///
    /// 1. 入力をメモリに読み込んでデコード
    /// 2. 範囲を解決してグリッドを抽出
    /// 3. 指定フォーマットでレンダリング
    /// 4. 出力先に書き込んでフラッシュ
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use std::fs::File;
    /// use xlsxllm::{ExportFormat, PipelineBuilder};
    ///
    /// # fn main() -> Result<(), xlsxllm::XlsxLlmError> {
    /// let pipeline = PipelineBuilder::new().build()?;
    /// let input = File::open("sales.xlsx")?;
    /// pipeline.convert(input, "Sheet1", "A:C", ExportFormat::Delimited, std::io::stdout())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn convert<R: Read, W: Write>(
        &self,
        input: R,
        sheet: &str,
        range: &str,
        format: ExportFormat,
        mut output: W,
    ) -> Result<(), XlsxLlmError> {
        let workbook = self.open(input)?;
        let result = self.process(&workbook, sheet, range)?;
        let content = self.render_format(&result, format)?;
        output.write_all(content.as_bytes())?;
        output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::InMemoryWorkbook;
    use crate::types::CellValue;

    fn scenario_a() -> InMemoryWorkbook {
        let mut workbook = InMemoryWorkbook::new().with_sheet("Sheet1").with_sheet("Notes");
        workbook
            .set_value("Sheet1", "A1", CellValue::Number(10.0))
            .unwrap();
        workbook
            .set_formula("Sheet1", "B1", "=A1*2", CellValue::Number(20.0))
            .unwrap();
        workbook
            .set_value("Sheet1", "A2", CellValue::String("x".to_string()))
            .unwrap();
        workbook
    }

    #[test]
    fn test_pipeline_builder_new() {
        let builder = PipelineBuilder::new();
        assert_eq!(builder.config.date_format, DateFormat::Iso8601);
        assert_eq!(builder.config.formula_mode, FormulaMode::CachedValue);
        assert_eq!(builder.config.line_ending, LineEnding::Lf);
        assert!(builder.config.pretty_json);
        assert_eq!(builder.config.max_cells, DEFAULT_MAX_CELLS);
    }

    #[test]
    fn test_builder_method_chaining() {
        let builder = PipelineBuilder::new()
            .with_date_format(DateFormat::Custom("%Y/%m/%d".to_string()))
            .with_formula_mode(FormulaMode::Formula)
            .with_line_ending(LineEnding::Crlf)
            .with_pretty_json(false)
            .with_max_cells(10);

        assert!(matches!(
            builder.config.date_format,
            DateFormat::Custom(ref s) if s == "%Y/%m/%d"
        ));
        assert_eq!(builder.config.formula_mode, FormulaMode::Formula);
        assert_eq!(builder.config.line_ending, LineEnding::Crlf);
        assert!(!builder.config.pretty_json);
        assert_eq!(builder.config.max_cells, 10);
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_build_with_invalid_custom_date_format() {
        for pattern in ["", "%Y-%Q"] {
            let result = PipelineBuilder::new()
                .with_date_format(DateFormat::Custom(pattern.to_string()))
                .build();
            match result {
                Err(XlsxLlmError::Config(msg)) => assert!(msg.contains("Invalid date format")),
                other => panic!("Expected Config error for {:?}, got {:?}", pattern, other),
            }
        }
    }

    #[test]
    fn test_build_with_zero_max_cells() {
        match PipelineBuilder::new().with_max_cells(0).build() {
            Err(XlsxLlmError::Config(msg)) => assert!(msg.contains("max_cells")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_process_scenario_a() {
        let pipeline = PipelineBuilder::new().build().unwrap();
        let workbook = scenario_a();

        assert_eq!(pipeline.list_sheets(&workbook), vec!["Sheet1", "Notes"]);

        let result = pipeline.process(&workbook, "Sheet1", "A1:B2").unwrap();
        assert_eq!(result.grid().rows(), &[vec!["10", "20"], vec!["x", ""]]);
        assert_eq!(result.formulas().get("B1"), Some("=A1*2"));
    }

    #[test]
    fn test_process_error_stages() {
        let pipeline = Pipeline::default();
        let workbook = scenario_a();

        let err = pipeline.process(&workbook, "Sheet1", "Z1:A1").unwrap_err();
        assert_eq!(err.stage(), "range");

        let err = pipeline.process(&workbook, "DoesNotExist", "A1").unwrap_err();
        assert_eq!(err.stage(), "sheet");
        assert!(err.to_string().contains("DoesNotExist"));

        // 空のシートでは列全体の範囲を確定できない
        let err = pipeline.process(&workbook, "Notes", "A:A").unwrap_err();
        assert_eq!(err.stage(), "range");
    }

    #[test]
    fn test_render_and_export() {
        let pipeline = PipelineBuilder::new()
            .with_pretty_json(false)
            .build()
            .unwrap();
        let workbook = scenario_a();
        let result = pipeline.process(&workbook, "Sheet1", "A1:B2").unwrap();

        let bundle = pipeline.render(&result).unwrap();
        assert_eq!(bundle.record(), r#"[["10","20"],["x",""]]"#);
        assert_eq!(bundle.delimited(), "10,20\nx,\n");
        assert_eq!(
            pipeline
                .render_format(&result, ExportFormat::Plain)
                .unwrap(),
            bundle.plain()
        );

        let artifact = pipeline.export(&bundle, ExportFormat::Tabular);
        assert_eq!(artifact.content, bundle.tabular());
        assert_eq!(artifact.mime_type, "text/markdown");
    }

    #[test]
    fn test_convert_with_invalid_input() {
        let pipeline = Pipeline::default();
        let mut output = Vec::new();
        let result = pipeline.convert(
            std::io::Cursor::new(Vec::<u8>::new()),
            "Sheet1",
            "A1",
            ExportFormat::Record,
            &mut output,
        );
        assert!(result.is_err());
        assert!(output.is_empty());
    }
}
