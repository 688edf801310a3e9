//! FormatSection Module
//!
//! Excel Number Format Stringのセクション定義を提供します。

use super::tokens::FormatToken;

/// セクションの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SectionKind {
    /// 正数
    Positive,
    /// 負数
    Negative,
    /// ゼロ
    Zero,
    /// テキスト
    Text,
}

impl SectionKind {
    /// セクション位置（0始まり）から種類を決定
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(SectionKind::Positive),
            1 => Some(SectionKind::Negative),
            2 => Some(SectionKind::Zero),
            3 => Some(SectionKind::Text),
            _ => None,
        }
    }
}

/// フォーマットのセクション（正数、負数、ゼロ、テキスト）
///
/// Excel Number Format Stringは最大4つのセクションに分割されます:
/// 1. 正数
/// 2. 負数
/// 3. ゼロ
/// 4. テキスト
#[derive(Debug, Clone)]
pub(crate) struct FormatSection {
    /// セクションの種類
    pub kind: SectionKind,

    /// フォーマットトークン
    pub tokens: Vec<FormatToken>,
}

impl FormatSection {
    /// 新しいセクションを生成
    pub fn new(kind: SectionKind) -> Self {
        Self {
            kind,
            tokens: Vec::new(),
        }
    }

    /// セクションが日付・時刻書式かどうかを判定
    pub fn is_datetime(&self) -> bool {
        self.tokens.iter().any(|t| t.is_datetime())
    }

    /// セクションが`General`を含むかどうか
    pub fn is_general(&self) -> bool {
        self.tokens.iter().any(|t| matches!(t, FormatToken::General))
    }

    /// パーセント記号の数（1つにつき値を100倍）
    pub fn percent_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|t| matches!(t, FormatToken::Percent))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::tokens::DigitKind;

    #[test]
    fn test_section_new() {
        let section = FormatSection::new(SectionKind::Positive);
        assert_eq!(section.kind, SectionKind::Positive);
        assert!(section.tokens.is_empty());
    }

    #[test]
    fn test_from_index() {
        assert_eq!(SectionKind::from_index(0), Some(SectionKind::Positive));
        assert_eq!(SectionKind::from_index(3), Some(SectionKind::Text));
        assert_eq!(SectionKind::from_index(4), None);
    }

    #[test]
    fn test_is_datetime() {
        let mut section = FormatSection::new(SectionKind::Positive);
        section.tokens.push(FormatToken::Year);
        section.tokens.push(FormatToken::Literal("-".to_string()));
        section.tokens.push(FormatToken::Month);
        assert!(section.is_datetime());

        let mut numeric = FormatSection::new(SectionKind::Positive);
        numeric.tokens.push(FormatToken::Digit(DigitKind::Zero));
        assert!(!numeric.is_datetime());
    }

    #[test]
    fn test_percent_count() {
        let mut section = FormatSection::new(SectionKind::Positive);
        section.tokens.push(FormatToken::Digit(DigitKind::Zero));
        section.tokens.push(FormatToken::Percent);
        section.tokens.push(FormatToken::Percent);
        assert_eq!(section.percent_count(), 2);
    }
}
