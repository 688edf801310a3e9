//! Formatter Module
//!
//! デコード済みセルを表示文字列に変換するモジュール。
//! 数値書式、日付、論理値、エラー値、数式モードを扱います。

use std::fmt::Write as _;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::api::{DateFormat, FormulaMode};
use crate::builder::ConversionConfig;
use crate::error::XlsxLlmError;
use crate::format::{general_number, is_date_format, FormatParser};
use crate::types::{CellValue, DecodedCell};

/// セルフォーマッター
///
/// セル値のフォーマット処理のファサードとして機能します。
/// 1回の抽出処理の間、同じ設定で使い回されます。
#[derive(Debug)]
pub(crate) struct CellFormatter {
    /// 日付フォーマッター
    date_formatter: DateFormatter,

    /// 数値フォーマッター
    number_formatter: NumberFormatter,

    /// 数式モード
    formula_mode: FormulaMode,
}

impl CellFormatter {
    /// 新しいCellFormatterインスタンスを生成
    ///
    /// # 引数
    ///
    /// * `config` - 変換設定
    /// * `is_1904` - ワークブックが1904年エポックを使用するかどうか
    pub fn new(config: &ConversionConfig, is_1904: bool) -> Self {
        Self {
            date_formatter: DateFormatter {
                date_format: config.date_format.clone(),
                is_1904,
            },
            number_formatter: NumberFormatter,
            formula_mode: config.formula_mode,
        }
    }

    /// セルを表示文字列に変換
    ///
    /// 書式の適用に失敗した場合は、書式なしの値にフォールバックします。
    /// 文字列はそのまま返し、エスケープは各レンダラーが行います。
    pub fn format_cell(&self, cell: &DecodedCell) -> String {
        // 1. 数式モードの処理
        if self.formula_mode == FormulaMode::Formula {
            if let Some(formula) = cell.normalized_formula() {
                return formula;
            }
        }

        // 2. 値の種類に応じてフォーマット
        match &cell.value {
            CellValue::Number(n) => match cell.number_format.as_deref() {
                Some(code) if is_date_format(code) => self.format_date_or_raw(*n),
                code => self.number_formatter.format(*n, code),
            },
            CellValue::DateTime(serial) => self.format_date_or_raw(*serial),
            CellValue::String(s) => s.clone(),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Error(e) => e.clone(),
            CellValue::Empty => String::new(),
        }
    }

    fn format_date_or_raw(&self, serial: f64) -> String {
        match self.date_formatter.format(serial) {
            Ok(formatted) => formatted,
            Err(e) => {
                debug!(serial, error = %e, "date conversion failed, using raw serial");
                general_number(serial)
            }
        }
    }
}

/// 日付フォーマッター
///
/// Excelのシリアル日付値を文字列に変換します。
#[derive(Debug)]
pub(crate) struct DateFormatter {
    date_format: DateFormat,
    is_1904: bool,
}

impl DateFormatter {
    /// 日付値をフォーマット
    ///
    /// # 引数
    ///
    /// * `serial_value` - Excelのシリアル日付値
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - フォーマット済み日付文字列
    /// * `Err(XlsxLlmError)` - シリアル値が日付として表現できない場合
    ///
    /// # エポックシステム
    ///
    /// - 1900年システム（デフォルト）
    ///   - シリアル値1 = 1900年1月1日
    ///   - シリアル値60 = 1900年2月29日（実在しない日、Excelのうるう年バグ）
    ///   - シリアル値61以降は1899年12月30日起算
    /// - 1904年システム: 1904年1月1日起算
    ///   - シリアル値0 = 1904年1月1日
    pub fn format(&self, serial_value: f64) -> Result<String, XlsxLlmError> {
        let datetime = self.to_datetime(serial_value)?;
        let has_time = datetime.time() != NaiveTime::MIN;

        let pattern = match &self.date_format {
            DateFormat::Iso8601 if !self.is_1904 && serial_value.trunc() == 0.0 => "%H:%M:%S",
            DateFormat::Iso8601 if has_time => "%Y-%m-%d %H:%M:%S",
            DateFormat::Iso8601 => "%Y-%m-%d",
            DateFormat::Custom(pattern) => pattern.as_str(),
        };

        let mut formatted = String::new();
        write!(formatted, "{}", datetime.format(pattern)).map_err(|_| {
            XlsxLlmError::Config(format!("Invalid date format pattern: {}", pattern))
        })?;
        Ok(formatted)
    }

    /// シリアル値を日時に変換（秒単位に丸める）
    fn to_datetime(&self, serial_value: f64) -> Result<NaiveDateTime, XlsxLlmError> {
        let overflow = || {
            XlsxLlmError::Extraction(format!(
                "Date calculation overflow: serial_value={}, is_1904={}",
                serial_value, self.is_1904
            ))
        };
        if !serial_value.is_finite() || serial_value < 0.0 || serial_value > 2_958_466.0 {
            return Err(overflow());
        }

        let epoch = match (self.is_1904, serial_value < 61.0) {
            (true, _) => NaiveDate::from_ymd_opt(1904, 1, 1),
            (false, true) => NaiveDate::from_ymd_opt(1899, 12, 31),
            (false, false) => NaiveDate::from_ymd_opt(1899, 12, 30),
        }
        .ok_or_else(overflow)?;

        let total_seconds = (serial_value * 86_400.0).round() as i64;
        epoch
            .and_time(NaiveTime::MIN)
            .checked_add_signed(Duration::seconds(total_seconds))
            .ok_or_else(overflow)
    }
}

/// 数値フォーマッター
///
/// Number Format Stringを解析して数値を文字列に変換します。
/// 書式がない、または適用できない場合は最短の往復可能な表現を返します。
#[derive(Debug)]
pub(crate) struct NumberFormatter;

impl NumberFormatter {
    pub fn format(&self, value: f64, format_string: Option<&str>) -> String {
        let Some(format_str) = format_string else {
            return general_number(value);
        };

        match FormatParser::parse(format_str).and_then(|parser| parser.format_number(value)) {
            Ok(formatted) => formatted,
            Err(e) => {
                debug!(error = %e, "number format not applied");
                general_number(value)
            }
        }
    }
}
