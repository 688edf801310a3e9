//! Output Format Module
//!
//! 抽出結果をテキスト表現に変換するレンダラーを提供するモジュール。
//! 4つのレンダラーと分析サマリーは、同じ`ExtractionResult`を入力とする
//! 状態を持たない変換です。

mod analysis;
mod formatters;
mod formula_stats;

pub use formula_stats::{formula_stats, FormulaStats};

use analysis::summarize;
use formatters::{DelimitedFormatter, PlainFormatter, RecordFormatter, TabularFormatter};

use crate::api::{ExportFormat, LineEnding};
use crate::builder::ConversionConfig;
use crate::error::XlsxLlmError;
use crate::types::{ExtractionResult, RenderedOutput};

/// レンダリング時の出力オプション
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RenderOptions {
    /// JSONを整形（インデント2）して出力するか
    pub pretty_json: bool,

    /// CSVの行区切り
    pub line_ending: LineEnding,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pretty_json: true,
            line_ending: LineEnding::Lf,
        }
    }
}

impl From<&ConversionConfig> for RenderOptions {
    fn from(config: &ConversionConfig) -> Self {
        Self {
            pretty_json: config.pretty_json,
            line_ending: config.line_ending,
        }
    }
}

/// 出力フォーマッター
///
/// 各出力フォーマットをenumとして表現し、フォーマットごとの処理に振り分けます。
#[derive(Debug, Clone, Copy)]
pub(crate) enum OutputFormatter {
    Record,
    Tabular,
    Delimited,
    Plain,
}

impl OutputFormatter {
    /// エクスポート形式からフォーマッターを生成
    pub fn from_format(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Record => OutputFormatter::Record,
            ExportFormat::Tabular => OutputFormatter::Tabular,
            ExportFormat::Delimited => OutputFormatter::Delimited,
            ExportFormat::Plain => OutputFormatter::Plain,
        }
    }

    /// 抽出結果を指定されたフォーマットで文字列に変換する
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - レンダリング結果
    /// * `Err(XlsxLlmError::Render)` - グリッドの形状が不正な場合（上流の不具合）
    pub fn render(
        &self,
        result: &ExtractionResult,
        options: &RenderOptions,
    ) -> Result<String, XlsxLlmError> {
        match self {
            OutputFormatter::Record => RecordFormatter.render(result, options),
            OutputFormatter::Tabular => TabularFormatter.render(result),
            OutputFormatter::Delimited => DelimitedFormatter.render(result, options),
            OutputFormatter::Plain => PlainFormatter.render(result),
        }
    }
}

/// 4つの表現と分析サマリーをまとめて生成
pub(crate) fn render_all(
    result: &ExtractionResult,
    options: &RenderOptions,
) -> Result<RenderedOutput, XlsxLlmError> {
    Ok(RenderedOutput {
        record: OutputFormatter::Record.render(result, options)?,
        tabular: OutputFormatter::Tabular.render(result, options)?,
        delimited: OutputFormatter::Delimited.render(result, options)?,
        plain: OutputFormatter::Plain.render(result, options)?,
        analysis: summarize(result),
    })
}
