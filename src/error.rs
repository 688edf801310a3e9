//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。
//! 各エラーメッセージは失敗した処理段階（デコード、範囲解析、シート選択など）を明示します。

use thiserror::Error;

/// xlsxllmクレート全体で使用するエラー型
///
/// ワークブックのデコード、範囲の解決、グリッド抽出、レンダリング、エクスポートの
/// 各段階で発生するエラーを統一的に扱います。呼び出し側が「範囲を直すべきか」
/// 「シート選択を直すべきか」「入力ファイルを直すべきか」を判断できるよう、
/// 段階ごとに異なるバリアントを持ちます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxllm::{InMemoryWorkbook, XlsxLlmError};
///
/// let workbook = InMemoryWorkbook::new().with_sheet("Sheet1");
/// match xlsxllm::process(&workbook, "Sheet1", "Z1:A1") {
///     Err(XlsxLlmError::InvalidRange { expression, reason }) => {
///         println!("範囲 '{}' が不正です: {}", expression, reason);
///     }
///     _ => {}
/// }
/// ```
#[derive(Error, Debug)]
pub enum XlsxLlmError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ワークブックのデコードに失敗したエラー
    ///
    /// calamineがバイト列を解析できなかった場合に発生します。
    /// 壊れたファイル、サポート外の形式（XLSX以外）などが原因です。
    /// calamineのエラーは変更せずにそのまま伝播します。
    #[error("Failed to decode workbook: {0}")]
    Decode(#[from] calamine::Error),

    /// ZIPアーカイブの解析エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// XLSXメタデータ（styles.xml, workbook.xmlなど）の解析エラー
    #[error("Failed to read workbook metadata: {0}")]
    Metadata(String),

    /// UTF-8文字列の変換エラー
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// 数値の解析エラー
    #[error("Number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// 範囲式が解析できない、または表現可能な範囲外を参照しているエラー
    ///
    /// # 例
    ///
    /// ```rust
    /// use xlsxllm::XlsxLlmError;
    ///
    /// let error = XlsxLlmError::InvalidRange {
    ///     expression: "Z1:A1".to_string(),
    ///     reason: "end column precedes start column".to_string(),
    /// };
    /// assert_eq!(
    ///     error.to_string(),
    ///     "Invalid range 'Z1:A1': end column precedes start column"
    /// );
    /// ```
    #[error("Invalid range '{expression}': {reason}")]
    InvalidRange {
        /// 入力された範囲式
        expression: String,
        /// 不正と判定した理由
        reason: String,
    },

    /// 指定されたシートがワークブックに存在しないエラー
    #[error("Sheet '{sheet}' not found in workbook (available: {})", .available.join(", "))]
    UnknownSheet {
        /// 要求されたシート名
        sheet: String,
        /// ワークブックに存在するシート名
        available: Vec<String>,
    },

    /// グリッド走査中の内部不整合
    ///
    /// 検証済みの入力からは発生しないはずのエラーです。
    /// 発生した場合はプログラムの不具合として扱います。
    #[error("Grid extraction failed: {0}")]
    Extraction(String),

    /// レンダリング中の内部不整合（不正な形状のグリッドなど）
    #[error("Rendering failed: {0}")]
    Render(String),

    /// サポートされていないエクスポート形式が指定されたエラー
    #[error("Unknown export format '{0}' (expected one of: json, markdown, csv, text)")]
    UnknownFormat(String),

    /// 設定の検証に失敗したエラー
    ///
    /// `PipelineBuilder::build()`時に設定を検証し、無効な設定が検出された場合に発生します。
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb攻撃、パストラバーサル攻撃、ファイルサイズ制限などの
    /// セキュリティ制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

impl XlsxLlmError {
    /// エラーが発生した処理段階の短いラベルを返す
    ///
    /// CLIのエラー表示などで、どの段階が失敗したかを示すために使用します。
    pub fn stage(&self) -> &'static str {
        match self {
            XlsxLlmError::Io(_) => "io",
            XlsxLlmError::Decode(_)
            | XlsxLlmError::Zip(_)
            | XlsxLlmError::Metadata(_)
            | XlsxLlmError::Utf8(_)
            | XlsxLlmError::ParseInt(_) => "decode",
            XlsxLlmError::InvalidRange { .. } => "range",
            XlsxLlmError::UnknownSheet { .. } => "sheet",
            XlsxLlmError::Extraction(_) => "extract",
            XlsxLlmError::Render(_) => "render",
            XlsxLlmError::UnknownFormat(_) => "export",
            XlsxLlmError::Config(_) => "config",
            XlsxLlmError::SecurityViolation(_) => "security",
        }
    }

    /// 範囲エラーを生成するヘルパー
    pub(crate) fn invalid_range(expression: &str, reason: impl Into<String>) -> Self {
        XlsxLlmError::InvalidRange {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}
