//! Security Module
//!
//! 入力ファイルとZIPアーカイブに対するセキュリティ制限を実装するモジュール。
//! ZIP bomb攻撃、パストラバーサル攻撃、巨大ファイルの読み込みへの対策を提供します。

use std::io::{Read, Seek};

use tracing::debug;
use zip::ZipArchive;

use crate::error::XlsxLlmError;

/// セキュリティ設定
///
/// デコード時のリソース制限を定義します。
#[derive(Debug, Clone)]
pub(crate) struct SecurityConfig {
    /// 展開後の最大サイズ（バイト）
    /// デフォルト: 1GB (1_073_741_824 bytes)
    pub max_decompressed_size: u64,
    /// ZIPアーカイブ内の最大エントリ数
    /// デフォルト: 10000
    pub max_file_count: usize,
    /// 単一エントリの最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_file_size: u64,
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 2GB (2_147_483_648 bytes)
    pub max_input_file_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824, // 1GB
            max_file_count: 10_000,
            max_file_size: 104_857_600,         // 100MB
            max_input_file_size: 2_147_483_648, // 2GB
        }
    }
}

impl SecurityConfig {
    /// 読み込んだ入力サイズを検証
    pub fn check_input_size(&self, bytes_read: u64) -> Result<(), XlsxLlmError> {
        if bytes_read > self.max_input_file_size {
            return Err(XlsxLlmError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                bytes_read, self.max_input_file_size
            )));
        }
        Ok(())
    }

    /// 入力を上限+1バイトまで読み込む
    ///
    /// 上限を超える入力は、全体をメモリに確保する前に`SecurityViolation`で拒否します。
    pub fn read_bounded<R: Read>(&self, reader: R) -> Result<Vec<u8>, XlsxLlmError> {
        let mut buffer = Vec::new();
        let bytes_read = reader
            .take(self.max_input_file_size.saturating_add(1))
            .read_to_end(&mut buffer)?;
        self.check_input_size(bytes_read as u64)?;
        Ok(buffer)
    }

    /// ZIPアーカイブの中央ディレクトリを検査
    ///
    /// エントリ数、各エントリのパスと展開後サイズ、展開後サイズの合計を検証します。
    /// エントリの展開は行いません（ヘッダーに記録されたサイズのみを使用）。
    pub fn inspect_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
    ) -> Result<(), XlsxLlmError> {
        if archive.len() > self.max_file_count {
            return Err(XlsxLlmError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                archive.len(),
                self.max_file_count
            )));
        }

        let mut total_decompressed_size = 0u64;
        for i in 0..archive.len() {
            let entry = archive
                .by_index_raw(i)
                .map_err(|e| XlsxLlmError::Zip(e.to_string()))?;

            let entry_name = entry.name();
            validate_zip_path(entry_name).map_err(|e| {
                XlsxLlmError::SecurityViolation(format!("Invalid ZIP path: {}", e))
            })?;

            let entry_size = entry.size();
            if entry_size > self.max_file_size {
                return Err(XlsxLlmError::SecurityViolation(format!(
                    "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                    entry_name, entry_size, self.max_file_size
                )));
            }

            total_decompressed_size = total_decompressed_size
                .checked_add(entry_size)
                .ok_or_else(|| {
                    XlsxLlmError::SecurityViolation(
                        "Total decompressed size calculation overflow".to_string(),
                    )
                })?;

            if total_decompressed_size > self.max_decompressed_size {
                return Err(XlsxLlmError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                    total_decompressed_size, self.max_decompressed_size
                )));
            }
        }

        debug!(
            entries = archive.len(),
            decompressed_bytes = total_decompressed_size,
            "ZIP archive passed security checks"
        );
        Ok(())
    }
}

/// ZIPエントリパスの検証
///
/// パストラバーサル攻撃を防ぐため、エントリパスを検証します。
///
/// # 引数
///
/// * `path` - 検証するエントリパス
///
/// # 戻り値
///
/// * `Ok(())` - パスが安全な場合
/// * `Err(String)` - パスが危険な場合（`..`、絶対パス、ドライブレターを含む）
pub(crate) fn validate_zip_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Empty path is not allowed".to_string());
    }

    if path.starts_with('/') {
        return Err(format!("Absolute path is not allowed: {}", path));
    }

    // `C:`などのドライブレター
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return Err(format!("Absolute path is not allowed: {}", path));
    }

    if path.contains('\\') {
        return Err(format!("Backslash in path is not allowed: {}", path));
    }

    if path.split('/').any(|segment| segment == "..") {
        return Err(format!("Path traversal detected: {}", path));
    }

    Ok(())
}
