//! Formula Statistics Module
//!
//! 数式マップを走査し、使用されている関数の出現回数と、
//! 参照されているセルの一覧を集計するモジュール。

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::Serialize;

use crate::error::XlsxLlmError;
use crate::types::{CellAddress, FormulaMap};

const TITLE: &str = "Formula Analysis";

/// 新しい関数に付与される名前空間の接頭辞
const FUNCTION_PREFIXES: &[&str] = &["_XLFN.", "_XLWS."];

/// 数式マップの集計結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormulaStats {
    formula_count: usize,
    functions: BTreeMap<String, usize>,
    references: BTreeSet<CellAddress>,
}

impl FormulaStats {
    /// 集計対象の数式の数
    pub fn formula_count(&self) -> usize {
        self.formula_count
    }

    /// 関数名 -> 出現回数
    pub fn functions(&self) -> &BTreeMap<String, usize> {
        &self.functions
    }

    /// 出現回数の多い順（同数の場合は関数名順）
    pub fn functions_by_count(&self) -> Vec<(&str, usize)> {
        let mut functions: Vec<(&str, usize)> = self
            .functions
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        functions.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        functions
    }

    /// 参照されているセル（重複なし、行優先順）
    pub fn references(&self) -> &BTreeSet<CellAddress> {
        &self.references
    }

    pub fn unique_reference_count(&self) -> usize {
        self.references.len()
    }

    /// テキスト形式のレポート
    pub fn render(&self) -> String {
        let mut lines = vec![
            TITLE.to_string(),
            "=".repeat(TITLE.len()),
            String::new(),
            format!("Formulas: {}", self.formula_count),
            String::new(),
        ];

        if self.functions.is_empty() {
            lines.push("Functions used: none".to_string());
        } else {
            lines.push("Functions used:".to_string());
            for (name, count) in self.functions_by_count() {
                lines.push(format!("- {}: {}", name, count));
            }
        }

        lines.push(String::new());
        lines.push(format!(
            "Unique cells referenced: {}",
            self.unique_reference_count()
        ));

        lines.join("\n")
    }
}

fn compile(pattern: &str) -> Result<Regex, XlsxLlmError> {
    Regex::new(pattern).map_err(|e| XlsxLlmError::Render(format!("Regex error: {}", e)))
}

/// 数式マップを集計
///
/// 文字列リテラル内のテキストは関数にもセル参照にも数えません。
/// セル参照は`$`記号と大文字小文字を区別せず、シート名による修飾も区別しません。
/// 範囲`A1:B3`は両端の2セルとして数えます。
///
/// # 使用例
///
/// ```rust
/// use xlsxllm::{formula_stats, CellValue, InMemoryWorkbook};
///
/// # fn main() -> Result<(), xlsxllm::XlsxLlmError> {
/// let mut workbook = InMemoryWorkbook::new().with_sheet("Sheet1");
/// workbook.set_formula("Sheet1", "B1", "=SUM(A1:A3)", CellValue::Number(6.0))?;
/// workbook.set_formula("Sheet1", "B2", "=IF(B1>5,SUM(A1,A2),0)", CellValue::Number(3.0))?;
///
/// let result = xlsxllm::process(&workbook, "Sheet1", "B1:B2")?;
/// let stats = formula_stats(result.formulas())?;
/// assert_eq!(stats.functions_by_count(), vec![("SUM", 2), ("IF", 1)]);
/// assert_eq!(stats.unique_reference_count(), 4);
/// # Ok(())
/// # }
/// ```
pub fn formula_stats(formulas: &FormulaMap) -> Result<FormulaStats, XlsxLlmError> {
    let string_literal = compile(r#""(?:[^"]|"")*""#)?;
    let function = compile(r"([A-Za-z_][A-Za-z0-9_.]*)\s*\(")?;
    let reference = compile(r"(?:^|[^A-Za-z0-9_.$])(\$?[A-Za-z]{1,3}\$?[0-9]+)")?;

    let mut stats = FormulaStats::default();
    for (_, formula) in formulas.iter() {
        stats.formula_count += 1;
        let code = string_literal.replace_all(formula, "\"\"");

        for caps in function.captures_iter(&code) {
            let upper = caps[1].to_ascii_uppercase();
            let name = FUNCTION_PREFIXES
                .iter()
                .fold(upper.as_str(), |name, prefix| {
                    name.strip_prefix(prefix).unwrap_or(name)
                });
            *stats.functions.entry(name.to_string()).or_insert(0) += 1;
        }

        for caps in reference.captures_iter(&code) {
            let Some(m) = caps.get(1) else { continue };
            // `LOG10(`のような関数名や、`A1B`のような名前の一部は参照ではない
            let followed_by_name = code[m.end()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '(' || c == '.');
            if followed_by_name {
                continue;
            }
            if let Ok(address) = CellAddress::parse(m.as_str()) {
                stats.references.insert(address);
            }
        }
    }

    Ok(stats)
}
