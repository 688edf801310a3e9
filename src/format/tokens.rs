//! FormatToken Module
//!
//! Excel Number Format Stringのトークン定義を提供します。

/// 数字プレースホルダーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DigitKind {
    /// `0`: 桁がない場合は0で埋める
    Zero,
    /// `#`: 桁がない場合は何も出力しない
    Hash,
    /// `?`: 桁がない場合は空白で埋める
    Question,
}

impl DigitKind {
    /// 桁がない位置に出力する文字
    pub fn padding(&self) -> Option<char> {
        match self {
            DigitKind::Zero => Some('0'),
            DigitKind::Hash => None,
            DigitKind::Question => Some(' '),
        }
    }
}

/// フォーマットトークン
///
/// Excel Number Format Stringを解析した際に生成されるトークンです。
/// 日付・時刻トークンは書式の判定にのみ使用し、日付の出力は`DateFormatter`が行います。
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FormatToken {
    /// 年（`y`）
    Year,

    /// 月（`m`、日付文脈）
    Month,

    /// 日（`d`）
    Day,

    /// 時（`h`）
    Hour,

    /// 分（`m`、時刻文脈）
    Minute,

    /// 秒（`s`）
    Second,

    /// 午前/午後（`AM/PM`、`A/P`）
    AmPm,

    /// 経過時間（`[h]`、`[mm]`、`[ss]`）
    Elapsed,

    /// 数字プレースホルダー（`0`、`#`、`?`）
    Digit(DigitKind),

    /// 小数点
    DecimalPoint,

    /// 千の位区切り（または末尾の場合は1000での除算）
    ThousandSeparator,

    /// パーセント記号
    Percent,

    /// 指数表記（`E+`、`E-`）
    Exponent,

    /// 分数（`/`）
    Fraction,

    /// リテラル文字列（例: "$", "-", " "）
    Literal(String),

    /// 色指定（例: "[Red]"）。出力時は無視されます
    Color,

    /// 条件（例: "[>100]"）。セクション選択では無視されます
    Condition,

    /// テキストプレースホルダー（`@`）
    TextPlaceholder,

    /// `General`
    General,
}

impl FormatToken {
    /// トークンが日付・時刻関連かどうかを判定
    pub fn is_datetime(&self) -> bool {
        matches!(
            self,
            FormatToken::Year
                | FormatToken::Month
                | FormatToken::Day
                | FormatToken::Hour
                | FormatToken::Minute
                | FormatToken::Second
                | FormatToken::AmPm
                | FormatToken::Elapsed
        )
    }
}
