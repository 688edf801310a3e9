//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use std::fmt;
use std::str::FromStr;

use crate::error::XlsxLlmError;

/// エクスポート形式
///
/// 抽出結果をどのテキスト表現で出力するかを指定します。
/// 分析サマリーはエクスポート形式ではなく、常にバンドルに含まれます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// JSON形式（行の配列、各行はセル値の配列）
    ///
    /// # 出力例
    ///
    /// ```json
    /// [
    ///   ["10", "20"],
    ///   ["x", ""]
    /// ]
    /// ```
    Record,

    /// Markdownテーブル形式
    ///
    /// 行0をヘッダーとして扱います。セル内の`|`は`\|`にエスケープされます。
    ///
    /// # 出力例
    ///
    /// ```markdown
    /// | 10 | 20 |
    /// | --- | --- |
    /// | x |  |
    /// ```
    Tabular,

    /// CSV形式（RFC 4180準拠のクォート）
    Delimited,

    /// タブ区切りのプレーンテキスト（エスケープなし）
    Plain,
}

impl ExportFormat {
    /// すべてのエクスポート形式
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Record,
        ExportFormat::Tabular,
        ExportFormat::Delimited,
        ExportFormat::Plain,
    ];

    /// 出力ファイルの拡張子
    pub fn file_extension(&self) -> &'static str {
        match self {
            ExportFormat::Record => "json",
            ExportFormat::Tabular => "md",
            ExportFormat::Delimited => "csv",
            ExportFormat::Plain => "txt",
        }
    }

    /// 出力のMIMEタイプ
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Record => "application/json",
            ExportFormat::Tabular => "text/markdown",
            ExportFormat::Delimited => "text/csv",
            ExportFormat::Plain => "text/plain",
        }
    }

    /// 形式の正式名
    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::Record => "json",
            ExportFormat::Tabular => "markdown",
            ExportFormat::Delimited => "csv",
            ExportFormat::Plain => "text",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = XlsxLlmError;

    /// 形式名を解析（大文字小文字は問わない）
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use xlsxllm::ExportFormat;
    ///
    /// assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Tabular);
    /// assert!("yaml".parse::<ExportFormat>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "record" => Ok(ExportFormat::Record),
            "markdown" | "md" | "tabular" => Ok(ExportFormat::Tabular),
            "csv" | "delimited" => Ok(ExportFormat::Delimited),
            "text" | "txt" | "plain" => Ok(ExportFormat::Plain),
            _ => Err(XlsxLlmError::UnknownFormat(s.to_string())),
        }
    }
}

/// 日付の出力形式
///
/// Excelの日付セルをテキストに変換する際の出力形式を指定します。
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DateFormat {
    /// ISO 8601形式（YYYY-MM-DD）
    ///
    /// 時刻部分を持つシリアル値の場合は`YYYY-MM-DD HH:MM:SS`になります。
    ///
    /// 例: `2025-11-20`、`2025-11-20 14:30:00`
    Iso8601,

    /// カスタム形式（chrono互換フォーマット文字列）
    ///
    /// # フォーマット指定子（主要なもの）
    ///
    /// - `%Y`: 4桁の年（例: 2025）
    /// - `%m`: 2桁の月（01-12）
    /// - `%d`: 2桁の日（01-31）
    /// - `%H`: 24時間形式の時（00-23）
    /// - `%M`: 分（00-59）
    /// - `%S`: 秒（00-59）
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxllm::{DateFormat, PipelineBuilder};
    ///
    /// # fn main() -> Result<(), xlsxllm::XlsxLlmError> {
    /// let pipeline = PipelineBuilder::new()
    ///     .with_date_format(DateFormat::Custom("%Y年%m月%d日".to_string()))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    Custom(String),
}

/// 数式セルの出力モード
///
/// グリッドに数式セルのどの値を入れるかを指定します。
/// どちらのモードでも数式マップには数式文字列が記録されます。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FormulaMode {
    /// キャッシュされた結果値を出力（デフォルト）
    ///
    /// 例: `=A1*2` → `20`
    CachedValue,

    /// 数式文字列を出力
    ///
    /// 例: `=A1*2` → `=A1*2`
    Formula,
}

/// CSV出力の行区切り
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    /// `\n`（デフォルト）
    Lf,

    /// `\r\n`（RFC 4180）
    Crlf,
}

impl LineEnding {
    /// 区切り文字列（`"\n"`または`"\r\n"`）
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_format_aliases() {
        let cases = [
            ("json", ExportFormat::Record),
            ("record", ExportFormat::Record),
            ("Markdown", ExportFormat::Tabular),
            ("md", ExportFormat::Tabular),
            ("tabular", ExportFormat::Tabular),
            ("CSV", ExportFormat::Delimited),
            ("delimited", ExportFormat::Delimited),
            ("text", ExportFormat::Plain),
            ("txt", ExportFormat::Plain),
            (" plain ", ExportFormat::Plain),
        ];

        for (name, expected) in cases {
            assert_eq!(name.parse::<ExportFormat>().unwrap(), expected, "{}", name);
        }
    }

    #[test]
    fn test_unknown_export_format() {
        match "html".parse::<ExportFormat>() {
            Err(XlsxLlmError::UnknownFormat(name)) => assert_eq!(name, "html"),
            other => panic!("Expected UnknownFormat, got {:?}", other),
        }
        assert!("".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_export_format_artifact_mapping() {
        assert_eq!(ExportFormat::Record.file_extension(), "json");
        assert_eq!(ExportFormat::Record.mime_type(), "application/json");
        assert_eq!(ExportFormat::Tabular.file_extension(), "md");
        assert_eq!(ExportFormat::Tabular.mime_type(), "text/markdown");
        assert_eq!(ExportFormat::Delimited.file_extension(), "csv");
        assert_eq!(ExportFormat::Delimited.mime_type(), "text/csv");
        assert_eq!(ExportFormat::Plain.file_extension(), "txt");
        assert_eq!(ExportFormat::Plain.mime_type(), "text/plain");
    }

    #[test]
    fn test_export_format_display_round_trips() {
        for format in ExportFormat::ALL {
            assert_eq!(format.to_string().parse::<ExportFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_line_ending() {
        assert_eq!(LineEnding::Lf.as_str(), "\n");
        assert_eq!(LineEnding::Crlf.as_str(), "\r\n");
    }
}
