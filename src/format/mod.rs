//! Format Module
//!
//! Excel Number Format Stringの構文解析と適用を提供します。

mod parser;
mod sections;
mod tokens;

pub(crate) use parser::{general_number, FormatParser};

/// 表示書式が日付・時刻書式かどうかを判定
///
/// 解析できない書式は日付として扱いません。
pub(crate) fn is_date_format(format_string: &str) -> bool {
    FormatParser::parse(format_string)
        .map(|parser| parser.is_datetime())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_date_format() {
        assert!(is_date_format("yyyy-mm-dd"));
        assert!(is_date_format("[$-411]ge.m.d"));
        assert!(!is_date_format("#,##0.00"));
        assert!(!is_date_format("\"unterminated"));
    }
}
