//! Range Resolution Module
//!
//! A1形式の範囲式（`A1`、`A1:D10`、`A:C`、`1:3`）を解析し、
//! 矩形の`RangeBound`に正規化するモジュール。

use crate::error::XlsxLlmError;
use crate::types::{CellAddress, RangeBound, MAX_COLUMNS, MAX_ROWS};

/// 解析済みの範囲式
///
/// 列全体・行全体の形式はシートの使用範囲が与えられるまで
/// 有限の`RangeBound`になりません。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeExpression {
    /// 単一セルまたはセル範囲（`A1`、`A1:C3`）
    Cells(RangeBound),

    /// 列全体（`A:C`）、0始まりの列インデックス
    Columns { start: u32, end: u32 },

    /// 行全体（`1:3`）、0始まりの行インデックス
    Rows { start: u32, end: u32 },
}

/// 範囲式の片側の参照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reference {
    Cell(CellAddress),
    Column(u32),
    Row(u32),
}

impl RangeExpression {
    /// 範囲式を解析
    ///
    /// 列文字は大文字小文字を区別せず、`$`（絶対参照記号）と前後の空白は無視されます。
    /// 開始が終了より後ろにある範囲は入れ替えずにエラーとします。
    ///
    /// # 引数
    ///
    /// * `expression` - 範囲式（例: `"A1:D10"`、`"a:a"`、`"$B$2"`）
    ///
    /// # 戻り値
    ///
    /// * `Ok(RangeExpression)` - 解析に成功した場合
    /// * `Err(XlsxLlmError::InvalidRange)` - 構文が不正、または表現可能な範囲を超える場合
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use xlsxllm::RangeExpression;
    ///
    /// let upper = RangeExpression::parse("A1:B2").unwrap();
    /// let lower = RangeExpression::parse(" $a$1 : b2 ").unwrap();
    /// assert_eq!(upper, lower);
    ///
    /// assert!(RangeExpression::parse("Z1:A1").is_err());
    /// ```
    pub fn parse(expression: &str) -> Result<Self, XlsxLlmError> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(XlsxLlmError::invalid_range(
                expression,
                "range expression is empty",
            ));
        }
        if trimmed.contains(',') {
            return Err(XlsxLlmError::invalid_range(
                expression,
                "multiple ranges are not supported",
            ));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        match parts.as_slice() {
            [single] => match parse_reference(expression, single)? {
                Reference::Cell(address) => Ok(RangeExpression::Cells(RangeBound {
                    start: address,
                    end: address,
                })),
                Reference::Column(_) => Err(XlsxLlmError::invalid_range(
                    expression,
                    "a whole-column range needs both ends (e.g. A:A)",
                )),
                Reference::Row(_) => Err(XlsxLlmError::invalid_range(
                    expression,
                    "a whole-row range needs both ends (e.g. 1:1)",
                )),
            },
            [first, second] => {
                let start = parse_reference(expression, first)?;
                let end = parse_reference(expression, second)?;
                Self::from_pair(expression, start, end)
            }
            _ => Err(XlsxLlmError::invalid_range(
                expression,
                "expected at most one ':' separator",
            )),
        }
    }

    fn from_pair(expression: &str, start: Reference, end: Reference) -> Result<Self, XlsxLlmError> {
        match (start, end) {
            (Reference::Cell(start), Reference::Cell(end)) => {
                check_order(expression, start.row, end.row, "row")?;
                check_order(expression, start.col, end.col, "column")?;
                Ok(RangeExpression::Cells(RangeBound { start, end }))
            }
            (Reference::Column(start), Reference::Column(end)) => {
                check_order(expression, start, end, "column")?;
                Ok(RangeExpression::Columns { start, end })
            }
            (Reference::Row(start), Reference::Row(end)) => {
                check_order(expression, start, end, "row")?;
                Ok(RangeExpression::Rows { start, end })
            }
            _ => Err(XlsxLlmError::invalid_range(
                expression,
                "both ends must be the same kind of reference (cell, column or row)",
            )),
        }
    }

    /// 有限の`RangeBound`に解決
    ///
    /// 列全体の形式は使用範囲の行で、行全体の形式は使用範囲の列で制限されます。
    /// セル範囲は制限されません（使用範囲外のセルは空文字列になります）。
    ///
    /// # 引数
    ///
    /// * `expression` - エラーメッセージに使用する元の範囲式
    /// * `used_range` - シートの使用範囲（空シートの場合は`None`）
    pub fn to_bound(
        &self,
        expression: &str,
        used_range: Option<RangeBound>,
    ) -> Result<RangeBound, XlsxLlmError> {
        match *self {
            RangeExpression::Cells(bound) => Ok(bound),
            RangeExpression::Columns { start, end } => {
                let used = used_range.ok_or_else(|| {
                    XlsxLlmError::invalid_range(
                        expression,
                        "sheet has no used range to bound a whole-column range",
                    )
                })?;
                Ok(RangeBound {
                    start: CellAddress::new(used.start.row, start),
                    end: CellAddress::new(used.end.row, end),
                })
            }
            RangeExpression::Rows { start, end } => {
                let used = used_range.ok_or_else(|| {
                    XlsxLlmError::invalid_range(
                        expression,
                        "sheet has no used range to bound a whole-row range",
                    )
                })?;
                Ok(RangeBound {
                    start: CellAddress::new(start, used.start.col),
                    end: CellAddress::new(end, used.end.col),
                })
            }
        }
    }

    /// 使用範囲なしで有限範囲になるかどうか
    pub fn is_bounded(&self) -> bool {
        matches!(self, RangeExpression::Cells(_))
    }
}

/// 範囲式を解析し、使用範囲で制限した`RangeBound`を返す
///
/// # 使用例
///
/// ```rust
/// use xlsxllm::{resolve_range, CellAddress, RangeBound};
///
/// let used = RangeBound::new(CellAddress::new(0, 0), CellAddress::new(4, 2)).unwrap();
/// let bound = resolve_range("A:A", Some(used)).unwrap();
/// assert_eq!(bound.to_string(), "A1:A5");
/// ```
pub fn resolve_range(
    expression: &str,
    used_range: Option<RangeBound>,
) -> Result<RangeBound, XlsxLlmError> {
    RangeExpression::parse(expression)?.to_bound(expression, used_range)
}

fn check_order(expression: &str, start: u32, end: u32, axis: &str) -> Result<(), XlsxLlmError> {
    if start > end {
        return Err(XlsxLlmError::invalid_range(
            expression,
            format!("end {} precedes start {}", axis, axis),
        ));
    }
    Ok(())
}

/// 範囲式の片側（`$A$1`、`B`、`12`など）を解析
fn parse_reference(expression: &str, part: &str) -> Result<Reference, XlsxLlmError> {
    let part = part.trim();
    let rest = part.strip_prefix('$').unwrap_or(part);

    let letters_len = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    let (letters, rest) = rest.split_at(letters_len);
    // 列と行の間の`$`は、後ろに行番号が続く場合のみ取り除く
    let digits = match rest.strip_prefix('$') {
        Some(row) if !letters.is_empty() && !row.is_empty() => row,
        _ => rest,
    };

    if letters.is_empty() && digits.is_empty() {
        return Err(XlsxLlmError::invalid_range(
            expression,
            format!("'{}' is not a cell, column or row reference", part),
        ));
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(XlsxLlmError::invalid_range(
            expression,
            format!("'{}' is not a cell, column or row reference", part),
        ));
    }

    let column = if letters.is_empty() {
        None
    } else {
        Some(parse_column(expression, letters)?)
    };
    let row = if digits.is_empty() {
        None
    } else {
        Some(parse_row(expression, digits)?)
    };

    match (column, row) {
        (Some(col), Some(row)) => Ok(Reference::Cell(CellAddress::new(row, col))),
        (Some(col), None) => Ok(Reference::Column(col)),
        (None, Some(row)) => Ok(Reference::Row(row)),
        (None, None) => Err(XlsxLlmError::invalid_range(
            expression,
            format!("'{}' is not a cell, column or row reference", part),
        )),
    }
}

/// 列文字を0始まりのインデックスに変換（A=0, Z=25, AA=26, ...）
fn parse_column(expression: &str, letters: &str) -> Result<u32, XlsxLlmError> {
    let out_of_bounds = || {
        XlsxLlmError::invalid_range(
            expression,
            format!("column '{}' is beyond XFD", letters.to_ascii_uppercase()),
        )
    };
    if letters.len() > 3 {
        return Err(out_of_bounds());
    }

    let number = letters
        .bytes()
        .map(|b| (b.to_ascii_uppercase() - b'A') as u32 + 1)
        .fold(0u32, |acc, digit| acc * 26 + digit);
    if number > MAX_COLUMNS {
        return Err(out_of_bounds());
    }
    Ok(number - 1)
}

/// 1始まりの行番号を0始まりのインデックスに変換
fn parse_row(expression: &str, digits: &str) -> Result<u32, XlsxLlmError> {
    let out_of_bounds = || {
        XlsxLlmError::invalid_range(
            expression,
            format!("row {} is beyond {}", digits, MAX_ROWS),
        )
    };
    if digits.len() > 7 {
        return Err(out_of_bounds());
    }

    let number: u32 = digits.parse().map_err(|_| out_of_bounds())?;
    if number == 0 {
        return Err(XlsxLlmError::invalid_range(
            expression,
            "row numbers start at 1",
        ));
    }
    if number > MAX_ROWS {
        return Err(out_of_bounds());
    }
    Ok(number - 1)
}
