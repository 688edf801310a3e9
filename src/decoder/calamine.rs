//! Calamine Workbook Module
//!
//! calamineを使用したXLSXワークブックのデコード。
//! セル値と数式はcalamineから、表示書式と1904年エポックはXMLメタデータから取得します。

use std::collections::HashMap;
use std::io::{Cursor, Read};

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::decoder::styles::WorkbookStyles;
use crate::decoder::WorkbookDecoder;
use crate::error::XlsxLlmError;
use crate::security::SecurityConfig;
use crate::types::{CellAddress, CellValue, DecodedCell, RangeBound};

/// 1シート分のデコード済みデータ
#[derive(Debug, Clone)]
struct SheetData {
    values: Range<Data>,
    formulas: Range<String>,
    used_range: Option<RangeBound>,
    merged: Vec<RangeBound>,
}

/// calamineでデコードしたXLSXワークブック
///
/// 読み込み時にすべてのシートの値と数式をメモリに展開します。
/// 以降のセル参照は読み取り専用で、ファイルI/Oは発生しません。
///
/// # 使用例
///
/// ```rust,no_run
/// use std::fs::File;
/// use xlsxllm::{CalamineWorkbook, WorkbookDecoder};
///
/// # fn main() -> Result<(), xlsxllm::XlsxLlmError> {
/// let workbook = CalamineWorkbook::open(File::open("report.xlsx")?)?;
/// for name in workbook.sheet_names() {
///     println!("{}", name);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CalamineWorkbook {
    sheet_names: Vec<String>,
    sheets: HashMap<String, SheetData>,
    styles: Option<WorkbookStyles>,
}

impl CalamineWorkbook {
    /// リーダーからワークブックを読み込む
    ///
    /// # 引数
    ///
    /// * `reader` - XLSXファイルのバイト列を読み込むリーダー
    ///
    /// # 戻り値
    ///
    /// * `Ok(CalamineWorkbook)` - デコードに成功した場合
    /// * `Err(XlsxLlmError::Decode)` - バイト列がXLSXとして解釈できない場合
    /// * `Err(XlsxLlmError::SecurityViolation)` - サイズ制限やパス検証に違反した場合
    pub fn open<R: Read>(reader: R) -> Result<Self, XlsxLlmError> {
        Self::open_with(reader, &SecurityConfig::default())
    }

    /// セキュリティ設定を指定してリーダーから読み込む
    pub(crate) fn open_with<R: Read>(
        reader: R,
        security: &SecurityConfig,
    ) -> Result<Self, XlsxLlmError> {
        let buffer = security.read_bounded(reader)?;
        let len = buffer.len() as u64;
        Self::from_bytes_with(buffer, len, security)
    }

    /// バイト列からワークブックを読み込む
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, XlsxLlmError> {
        let len = bytes.len() as u64;
        Self::from_bytes_with(bytes, len, &SecurityConfig::default())
    }

    pub(crate) fn from_bytes_with(
        buffer: Vec<u8>,
        bytes_read: u64,
        security: &SecurityConfig,
    ) -> Result<Self, XlsxLlmError> {
        security.check_input_size(bytes_read)?;
        debug!(bytes = bytes_read, "read workbook bytes");

        // ZIPとして開けない入力はcalamineにエラーを報告させる
        let mut archive = match ZipArchive::new(Cursor::new(buffer.as_slice())) {
            Ok(mut archive) => {
                security.inspect_archive(&mut archive)?;
                Some(archive)
            }
            Err(e) => {
                debug!(error = %e, "input is not a ZIP container");
                None
            }
        };

        let sheets = open_workbook_auto_from_rs(Cursor::new(buffer.as_slice()))?;
        let mut workbook = match sheets {
            Sheets::Xlsx(workbook) => workbook,
            _ => {
                return Err(XlsxLlmError::Decode(calamine::Error::Msg(
                    "Only XLSX workbooks are supported",
                )))
            }
        };

        // 結合セル情報が読めなくても値の抽出は続行する
        let has_merged_regions = match workbook.load_merged_regions() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to read merged regions, continuing without them");
                false
            }
        };

        let sheet_names = workbook.sheet_names().to_vec();
        let mut sheets = HashMap::with_capacity(sheet_names.len());
        for name in &sheet_names {
            let values = workbook
                .worksheet_range(name)
                .map_err(|e| XlsxLlmError::Decode(e.into()))?;
            let formulas = match workbook.worksheet_formula(name) {
                Ok(formulas) => formulas,
                Err(e) => {
                    warn!(sheet = %name, error = %e, "failed to read formulas, continuing without them");
                    Range::empty()
                }
            };
            let merged = match workbook.worksheet_merge_cells(name) {
                Some(Ok(regions)) if has_merged_regions => regions
                    .iter()
                    .map(|dims| RangeBound {
                        start: CellAddress::new(dims.start.0, dims.start.1),
                        end: CellAddress::new(dims.end.0, dims.end.1),
                    })
                    .collect(),
                _ => Vec::new(),
            };
            let used_range = used_range_of(&values, &formulas);
            debug!(sheet = %name, used_range = ?used_range.map(|b| b.to_string()), "loaded sheet");
            sheets.insert(
                name.clone(),
                SheetData {
                    values,
                    formulas,
                    used_range,
                    merged,
                },
            );
        }

        // 書式情報が読めなくても値の抽出は続行する
        let styles = match archive.as_mut().map(WorkbookStyles::parse) {
            Some(Ok(styles)) => Some(styles),
            Some(Err(e)) => {
                warn!(error = %e, "failed to read workbook metadata, falling back to raw values");
                None
            }
            None => None,
        };

        info!(sheets = sheet_names.len(), "decoded workbook");

        Ok(Self {
            sheet_names,
            sheets,
            styles,
        })
    }
}

/// 値範囲と数式範囲を合わせた使用範囲
fn used_range_of(values: &Range<Data>, formulas: &Range<String>) -> Option<RangeBound> {
    let bound_of = |start: Option<(u32, u32)>, end: Option<(u32, u32)>| match (start, end) {
        (Some(start), Some(end)) => Some(RangeBound {
            start: CellAddress::new(start.0, start.1),
            end: CellAddress::new(end.0, end.1),
        }),
        _ => None,
    };

    let values = if values.is_empty() {
        None
    } else {
        bound_of(values.start(), values.end())
    };
    let formulas = if formulas.is_empty() {
        None
    } else {
        bound_of(formulas.start(), formulas.end())
    };

    match (values, formulas) {
        (Some(v), Some(f)) => Some(v.union(&f)),
        (v, f) => v.or(f),
    }
}

/// calamineのセル値を変換
fn convert_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::Empty => CellValue::Empty,
    }
}

impl WorkbookDecoder for CalamineWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheet_names.clone()
    }

    fn cell(&self, sheet: &str, address: CellAddress) -> Option<DecodedCell> {
        let data = self.sheets.get(sheet)?;
        let position = (address.row, address.col);

        let value = data
            .values
            .get_value(position)
            .map(convert_value)
            .unwrap_or(CellValue::Empty);
        let formula = data
            .formulas
            .get_value(position)
            .filter(|f| !f.trim().is_empty())
            .cloned();

        if value.is_empty() && formula.is_none() {
            return None;
        }

        let number_format = self
            .styles
            .as_ref()
            .and_then(|styles| styles.format_for(sheet, address.row, address.col))
            .map(|code| code.to_string());

        Some(DecodedCell {
            value,
            formula,
            number_format,
        })
    }

    fn used_range(&self, sheet: &str) -> Option<RangeBound> {
        self.sheets.get(sheet)?.used_range
    }

    fn is_1904(&self) -> bool {
        self.styles.as_ref().map(|s| s.is_1904()).unwrap_or(false)
    }

    fn merged_regions(&self, sheet: &str) -> Vec<RangeBound> {
        self.sheets
            .get(sheet)
            .map(|data| data.merged.clone())
            .unwrap_or_default()
    }
}
