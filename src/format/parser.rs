//! FormatParser Module
//!
//! Excel Number Format Stringの構文解析と適用を提供します。

use std::iter::Peekable;
use std::str::Chars;

use crate::error::XlsxLlmError;

use super::sections::{FormatSection, SectionKind};
use super::tokens::{DigitKind, FormatToken};

/// Number Format Stringパーサー
///
/// Excel Number Format Stringを解析し、数値をフォーマットします。
#[derive(Debug, Clone)]
pub(crate) struct FormatParser {
    /// 元のフォーマット文字列
    format_string: String,

    /// パースされたセクション
    sections: Vec<FormatSection>,
}

/// カンマの役割
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommaRole {
    /// 千の位区切り
    Grouping,
    /// 1000での除算
    Scaling,
    /// 文字としてのカンマ
    Literal,
}

impl FormatParser {
    /// フォーマット文字列をパース
    ///
    /// # 引数
    ///
    /// * `format_string` - Excel Number Format String
    ///
    /// # 戻り値
    ///
    /// * `Ok(Self)` - パース成功
    /// * `Err(XlsxLlmError)` - 引用符や角括弧が閉じられていない場合
    pub fn parse(format_string: &str) -> Result<Self, XlsxLlmError> {
        // 1. セクション分割
        let section_strs = Self::split_sections(format_string);

        // 2. 各セクションのパース（5つ目以降は無視）
        let mut sections = Vec::new();
        for (idx, section_str) in section_strs.iter().enumerate() {
            let Some(kind) = SectionKind::from_index(idx) else {
                break;
            };
            sections.push(Self::parse_section(format_string, section_str, kind)?);
        }

        if sections.is_empty() {
            sections.push(FormatSection::new(SectionKind::Positive));
        }

        Ok(Self {
            format_string: format_string.to_string(),
            sections,
        })
    }

    /// 日付・時刻書式かどうか（最初のセクションで判定）
    pub fn is_datetime(&self) -> bool {
        self.sections.first().is_some_and(|s| s.is_datetime())
    }

    /// セクションに分割
    ///
    /// ';'で分割します。引用符、角括弧、エスケープされた文字の中の';'は区切りとして扱いません。
    fn split_sections(format_string: &str) -> Vec<String> {
        let mut sections = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut in_brackets = false;
        let mut chars = format_string.chars();

        while let Some(ch) = chars.next() {
            match ch {
                '"' if !in_brackets => in_quotes = !in_quotes,
                '[' if !in_quotes => in_brackets = true,
                ']' if !in_quotes => in_brackets = false,
                '\\' if !in_quotes && !in_brackets => {
                    current.push(ch);
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                    continue;
                }
                ';' if !in_quotes && !in_brackets => {
                    sections.push(std::mem::take(&mut current));
                    continue;
                }
                _ => {}
            }
            current.push(ch);
        }

        sections.push(current);
        sections
    }

    /// セクションをトークン列に変換
    fn parse_section(
        format_string: &str,
        section_str: &str,
        kind: SectionKind,
    ) -> Result<FormatSection, XlsxLlmError> {
        let mut section = FormatSection::new(kind);
        let mut chars = section_str.chars().peekable();

        while let Some(ch) = chars.next() {
            let token = match ch {
                '"' => {
                    let mut literal = String::new();
                    loop {
                        match chars.next() {
                            Some('"') => break,
                            Some(c) => literal.push(c),
                            None => return Err(unsupported(format_string, "unterminated quote")),
                        }
                    }
                    FormatToken::Literal(literal)
                }
                '\\' => match chars.next() {
                    Some(c) => FormatToken::Literal(c.to_string()),
                    None => continue,
                },
                // 空白幅指定と繰り返し文字は出力しない
                '_' | '*' => {
                    chars.next();
                    continue;
                }
                '[' => {
                    let mut content = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some(c) => content.push(c),
                            None => {
                                return Err(unsupported(format_string, "unterminated bracket"))
                            }
                        }
                    }
                    match Self::bracket_token(&content) {
                        Some(token) => token,
                        None => continue,
                    }
                }
                '@' => FormatToken::TextPlaceholder,
                '0' => FormatToken::Digit(DigitKind::Zero),
                '#' => FormatToken::Digit(DigitKind::Hash),
                '?' => FormatToken::Digit(DigitKind::Question),
                '.' => FormatToken::DecimalPoint,
                ',' => FormatToken::ThousandSeparator,
                '%' => FormatToken::Percent,
                'E' | 'e' if matches!(chars.peek(), Some('+') | Some('-')) => {
                    chars.next();
                    FormatToken::Exponent
                }
                '/' if matches!(section.tokens.last(), Some(FormatToken::Digit(_))) => {
                    FormatToken::Fraction
                }
                'y' | 'Y' => {
                    Self::skip_run(&mut chars, 'y');
                    FormatToken::Year
                }
                'd' | 'D' => {
                    Self::skip_run(&mut chars, 'd');
                    FormatToken::Day
                }
                'h' | 'H' => {
                    Self::skip_run(&mut chars, 'h');
                    FormatToken::Hour
                }
                's' | 'S' => {
                    Self::skip_run(&mut chars, 's');
                    FormatToken::Second
                }
                'm' | 'M' => {
                    Self::skip_run(&mut chars, 'm');
                    // 時の直後、または':'や秒が続く場合は分
                    let after_hour = section
                        .tokens
                        .iter()
                        .rev()
                        .find(|t| t.is_datetime())
                        .is_some_and(|t| matches!(t, FormatToken::Hour));
                    let before_time = chars
                        .peek()
                        .is_some_and(|&c| c == ':' || c == 's' || c == 'S');
                    if after_hour || before_time {
                        FormatToken::Minute
                    } else {
                        FormatToken::Month
                    }
                }
                'A' | 'a' if Self::consume_keyword(&mut chars, "m/pm") => FormatToken::AmPm,
                'A' | 'a' if Self::consume_keyword(&mut chars, "/p") => FormatToken::AmPm,
                'G' | 'g' if Self::consume_keyword(&mut chars, "eneral") => FormatToken::General,
                _ => FormatToken::Literal(ch.to_string()),
            };
            section.tokens.push(token);
        }

        Ok(section)
    }

    /// 角括弧内の内容をトークンに変換
    fn bracket_token(content: &str) -> Option<FormatToken> {
        let lower = content.to_ascii_lowercase();
        let first = lower.chars().next()?;

        if matches!(first, 'h' | 'm' | 's') && lower.chars().all(|c| c == first) {
            return Some(FormatToken::Elapsed);
        }
        if matches!(first, '<' | '>' | '=') {
            return Some(FormatToken::Condition);
        }
        if let Some(currency) = content.strip_prefix('$') {
            // [$€-407] -> "€"、[$-411] -> 出力なし
            let symbol = currency.split('-').next().unwrap_or("");
            if symbol.is_empty() {
                return None;
            }
            return Some(FormatToken::Literal(symbol.to_string()));
        }
        Some(FormatToken::Color)
    }

    /// 同じ文字（大文字小文字を区別しない）の連続を読み飛ばす
    fn skip_run(chars: &mut Peekable<Chars<'_>>, target: char) {
        while chars
            .peek()
            .is_some_and(|c| c.eq_ignore_ascii_case(&target))
        {
            chars.next();
        }
    }

    /// キーワード（大文字小文字を区別しない）が続く場合に読み進める
    fn consume_keyword(chars: &mut Peekable<Chars<'_>>, keyword: &str) -> bool {
        let lookahead = chars.clone();
        let matched = lookahead
            .take(keyword.len())
            .map(|c| c.to_ascii_lowercase())
            .eq(keyword.chars());
        if matched {
            for _ in 0..keyword.len() {
                chars.next();
            }
        }
        matched
    }

    /// 数値をフォーマット
    ///
    /// # 引数
    ///
    /// * `value` - フォーマットする数値
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - フォーマット済み文字列
    /// * `Err(XlsxLlmError)` - 日付書式、指数・分数書式などこのエンジンが扱わない書式の場合
    pub fn format_number(&self, value: f64) -> Result<String, XlsxLlmError> {
        if !value.is_finite() {
            return Err(unsupported(&self.format_string, "non-finite value"));
        }

        // 1. セクションの選択
        let (section, show_minus) = self.select_section(value);

        // 2. セクションの種類に応じてフォーマット
        if section.is_datetime() {
            return Err(unsupported(&self.format_string, "date/time format"));
        }
        if section
            .tokens
            .iter()
            .any(|t| matches!(t, FormatToken::Exponent | FormatToken::Fraction))
        {
            return Err(unsupported(&self.format_string, "scientific or fraction format"));
        }

        let body = if section.is_general() {
            Self::format_literals(section, &general_number(value.abs()))
        } else if section.tokens.iter().any(|t| matches!(t, FormatToken::Digit(_))) {
            Self::format_numeric(value.abs(), section)
        } else {
            Self::format_literals(section, &general_number(value.abs()))
        };

        if show_minus {
            Ok(format!("-{}", body))
        } else {
            Ok(body)
        }
    }

    /// 値の符号に応じてセクションを選択
    ///
    /// 条件（`[>100]`など）は考慮しません。
    /// 戻り値の`bool`は、出力に負符号を付ける必要があるかどうかです。
    fn select_section(&self, value: f64) -> (&FormatSection, bool) {
        let numeric: Vec<&FormatSection> = self
            .sections
            .iter()
            .filter(|s| s.kind != SectionKind::Text)
            .collect();
        let first = numeric.first().copied().unwrap_or(&self.sections[0]);

        if value < 0.0 {
            match numeric.get(1) {
                Some(negative) => (*negative, false),
                None => (first, true),
            }
        } else if value == 0.0 {
            (numeric.get(2).copied().unwrap_or(first), false)
        } else {
            (first, false)
        }
    }

    /// 数字プレースホルダーを含まないセクション（リテラル、`General`、`@`）
    fn format_literals(section: &FormatSection, number: &str) -> String {
        let mut result = String::new();
        for token in &section.tokens {
            match token {
                FormatToken::Literal(s) => result.push_str(s),
                FormatToken::General | FormatToken::TextPlaceholder => result.push_str(number),
                _ => {}
            }
        }
        result
    }

    /// カンマトークンの役割を位置ごとに決定
    fn comma_roles(section: &FormatSection) -> Vec<Option<CommaRole>> {
        let tokens = &section.tokens;
        let decimal_index = tokens
            .iter()
            .position(|t| matches!(t, FormatToken::DecimalPoint))
            .unwrap_or(tokens.len());

        tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                if !matches!(token, FormatToken::ThousandSeparator) {
                    return None;
                }
                let digit_before = tokens[..i]
                    .iter()
                    .any(|t| matches!(t, FormatToken::Digit(_)));
                let integer_digit_after = i < decimal_index
                    && tokens[i + 1..decimal_index]
                        .iter()
                        .any(|t| matches!(t, FormatToken::Digit(_)));
                Some(match (digit_before, integer_digit_after) {
                    (true, true) => CommaRole::Grouping,
                    (true, false) => CommaRole::Scaling,
                    _ => CommaRole::Literal,
                })
            })
            .collect()
    }

    /// 数字プレースホルダーを持つセクションをフォーマット
    fn format_numeric(value: f64, section: &FormatSection) -> String {
        let roles = Self::comma_roles(section);
        let grouping = roles.contains(&Some(CommaRole::Grouping));
        let scaling = roles
            .iter()
            .filter(|r| **r == Some(CommaRole::Scaling))
            .count();

        // 整数部・小数部のプレースホルダー
        let mut integer_kinds = Vec::new();
        let mut decimal_kinds = Vec::new();
        let mut seen_decimal = false;
        for token in &section.tokens {
            match token {
                FormatToken::DecimalPoint => seen_decimal = true,
                FormatToken::Digit(kind) if seen_decimal => decimal_kinds.push(*kind),
                FormatToken::Digit(kind) => integer_kinds.push(*kind),
                _ => {}
            }
        }

        // パーセントは100倍、末尾のカンマは1000で除算
        let scaled = value * 100f64.powi(section.percent_count() as i32)
            / 1000f64.powi(scaling as i32);

        // 小数部の桁数で四捨五入（0.5は0から遠い方向へ丸める）
        let factor = 10f64.powi(decimal_kinds.len() as i32);
        let half_away = (scaled * factor).round() / factor;
        let scaled = if half_away.is_finite() { half_away } else { scaled };
        let rounded = format!("{:.*}", decimal_kinds.len(), scaled);
        let (int_str, frac_str) = match rounded.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (rounded.as_str(), ""),
        };
        let int_digits: Vec<char> = if int_str == "0" {
            Vec::new()
        } else {
            int_str.chars().collect()
        };

        // 整数部: 右詰めで各プレースホルダーに割り当て、溢れた桁は先頭に付ける
        let mut integer_slots = vec![String::new(); integer_kinds.len()];
        for (j, kind) in integer_kinds.iter().rev().enumerate() {
            let slot = integer_kinds.len() - 1 - j;
            if j < int_digits.len() {
                integer_slots[slot].push(int_digits[int_digits.len() - 1 - j]);
            } else if let Some(pad) = kind.padding() {
                integer_slots[slot].push(pad);
            }
        }
        let overflow: String = if int_digits.len() > integer_kinds.len() {
            int_digits[..int_digits.len() - integer_kinds.len()]
                .iter()
                .collect()
        } else {
            String::new()
        };
        if let Some(first) = integer_slots.first_mut() {
            first.insert_str(0, &overflow);
        }
        if grouping {
            group_thousands(&mut integer_slots);
        }

        // 小数部: 末尾の不要なゼロは`#`なら削除、`?`なら空白
        let mut decimal_slots: Vec<String> = frac_str.chars().map(|c| c.to_string()).collect();
        for (slot, kind) in decimal_slots.iter_mut().zip(&decimal_kinds).rev() {
            if slot.as_str() != "0" || *kind == DigitKind::Zero {
                break;
            }
            *slot = match kind.padding() {
                Some(pad) => pad.to_string(),
                None => String::new(),
            };
        }

        // トークンを順に処理して結果を構築
        let mut result = String::new();
        let mut integer_iter = integer_slots.iter();
        let mut decimal_iter = decimal_slots.iter();
        let mut seen_decimal = false;
        for (token, role) in section.tokens.iter().zip(&roles) {
            match token {
                FormatToken::Digit(_) if seen_decimal => {
                    if let Some(slot) = decimal_iter.next() {
                        result.push_str(slot);
                    }
                }
                FormatToken::Digit(_) => {
                    if let Some(slot) = integer_iter.next() {
                        result.push_str(slot);
                    }
                }
                FormatToken::DecimalPoint if !seen_decimal => {
                    seen_decimal = true;
                    if integer_kinds.is_empty() {
                        result.push_str(&overflow);
                    }
                    result.push('.');
                }
                FormatToken::DecimalPoint => result.push('.'),
                FormatToken::ThousandSeparator => {
                    if *role == Some(CommaRole::Literal) {
                        result.push(',');
                    }
                }
                FormatToken::Percent => result.push('%'),
                FormatToken::Literal(s) => result.push_str(s),
                _ => {}
            }
        }

        result
    }
}

/// 整数部の桁に3桁ごとのカンマを挿入（プレースホルダーをまたいで数える）
fn group_thousands(slots: &mut [String]) {
    let mut digits_seen = 0;
    for slot in slots.iter_mut().rev() {
        let mut reversed = Vec::new();
        for ch in slot.chars().rev() {
            if ch.is_ascii_digit() {
                if digits_seen > 0 && digits_seen % 3 == 0 {
                    reversed.push(',');
                }
                digits_seen += 1;
            }
            reversed.push(ch);
        }
        *slot = reversed.into_iter().rev().collect();
    }
}

/// 書式なしの数値表現（最短の往復可能な表現）
pub(crate) fn general_number(value: f64) -> String {
    if value == 0.0 {
        // -0.0を"0"として出力
        "0".to_string()
    } else {
        value.to_string()
    }
}

fn unsupported(format_string: &str, reason: &str) -> XlsxLlmError {
    XlsxLlmError::Extraction(format!(
        "number format '{}' not applied: {}",
        format_string, reason
    ))
}
