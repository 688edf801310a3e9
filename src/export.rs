//! Export Module
//!
//! レンダリング結果から1つの表現を選び、ファイル拡張子とMIMEタイプを付与します。
//! I/Oは行いません。書き出しは呼び出し側の責務です。

use crate::api::ExportFormat;
use crate::error::XlsxLlmError;
use crate::types::RenderedOutput;

/// エクスポート成果物
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// 出力内容
    pub content: String,

    /// ファイル拡張子（ドットなし）
    pub file_extension: &'static str,

    /// MIMEタイプ
    pub mime_type: &'static str,
}

impl ExportArtifact {
    /// ダウンロード用のファイル名（`{stem}_output.{ext}`）
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use xlsxllm::ExportArtifact;
    ///
    /// let artifact = ExportArtifact {
    ///     content: String::new(),
    ///     file_extension: "md",
    ///     mime_type: "text/markdown",
    /// };
    /// assert_eq!(artifact.file_name("sales"), "sales_output.md");
    /// ```
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}_output.{}", stem, self.file_extension)
    }
}

/// 指定フォーマットの表現を成果物として取り出す
pub fn export(bundle: &RenderedOutput, format: ExportFormat) -> ExportArtifact {
    ExportArtifact {
        content: bundle.get(format).to_string(),
        file_extension: format.file_extension(),
        mime_type: format.mime_type(),
    }
}

/// フォーマット名（`json`、`markdown`、`csv`、`text`など）で成果物を取り出す
///
/// # 戻り値
///
/// * `Err(XlsxLlmError::UnknownFormat)` - 認識できないフォーマット名の場合
pub fn export_named(bundle: &RenderedOutput, format: &str) -> Result<ExportArtifact, XlsxLlmError> {
    let format: ExportFormat = format.parse()?;
    Ok(export(bundle, format))
}
