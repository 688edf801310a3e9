//! In-Memory Workbook Module
//!
//! コード上で構築する合成ワークブック。
//! 単体テストや、既に表形式データを保持している呼び出し側で使用します。

use std::collections::BTreeMap;

use crate::decoder::WorkbookDecoder;
use crate::error::XlsxLlmError;
use crate::range::resolve_range;
use crate::types::{CellAddress, CellValue, DecodedCell, RangeBound};

/// メモリ上のワークブック
///
/// # 使用例
///
/// ```rust
/// use xlsxllm::{CellValue, InMemoryWorkbook};
///
/// # fn main() -> Result<(), xlsxllm::XlsxLlmError> {
/// let mut workbook = InMemoryWorkbook::new().with_sheet("Sheet1");
/// workbook.set_value("Sheet1", "A1", CellValue::Number(10.0))?;
/// workbook.set_formula("Sheet1", "B1", "=A1*2", CellValue::Number(20.0))?;
///
/// let result = xlsxllm::process(&workbook, "Sheet1", "A1:B1")?;
/// assert_eq!(result.grid().rows(), &[vec!["10".to_string(), "20".to_string()]]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkbook {
    sheets: Vec<(String, BTreeMap<CellAddress, DecodedCell>)>,
    merged: BTreeMap<String, Vec<RangeBound>>,
    is_1904: bool,
}

impl InMemoryWorkbook {
    /// 空のワークブックを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// シートを末尾に追加（同名のシートが既にある場合は何もしない）
    pub fn with_sheet(mut self, name: impl Into<String>) -> Self {
        self.add_sheet(name);
        self
    }

    /// 1904年エポックを設定
    pub fn with_1904_dates(mut self, is_1904: bool) -> Self {
        self.is_1904 = is_1904;
        self
    }

    /// シートを末尾に追加
    pub fn add_sheet(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.sheets.iter().any(|(existing, _)| *existing == name) {
            self.sheets.push((name, BTreeMap::new()));
        }
    }

    /// セルの値を設定（`CellValue::Empty`の場合はセルを削除）
    ///
    /// # 引数
    ///
    /// * `sheet` - シート名
    /// * `address` - A1形式のセルアドレス（例: `"B2"`）
    /// * `value` - セルの値
    pub fn set_value(
        &mut self,
        sheet: &str,
        address: &str,
        value: CellValue,
    ) -> Result<(), XlsxLlmError> {
        let address = CellAddress::parse(address)?;
        let cells = self.sheet_mut(sheet)?;
        if value.is_empty() {
            if let Some(cell) = cells.get_mut(&address) {
                cell.value = CellValue::Empty;
                if cell.formula.is_none() {
                    cells.remove(&address);
                }
            }
            return Ok(());
        }
        cells
            .entry(address)
            .or_insert_with(|| DecodedCell::new(CellValue::Empty))
            .value = value;
        Ok(())
    }

    /// 数式とキャッシュされた計算結果を設定
    pub fn set_formula(
        &mut self,
        sheet: &str,
        address: &str,
        formula: &str,
        cached: CellValue,
    ) -> Result<(), XlsxLlmError> {
        let address = CellAddress::parse(address)?;
        let cell = self
            .sheet_mut(sheet)?
            .entry(address)
            .or_insert_with(|| DecodedCell::new(CellValue::Empty));
        cell.value = cached;
        cell.formula = Some(formula.to_string());
        Ok(())
    }

    /// セルの表示書式（Number Format String）を設定
    pub fn set_number_format(
        &mut self,
        sheet: &str,
        address: &str,
        format: &str,
    ) -> Result<(), XlsxLlmError> {
        let address = CellAddress::parse(address)?;
        let cell = self
            .sheet_mut(sheet)?
            .entry(address)
            .or_insert_with(|| DecodedCell::new(CellValue::Empty));
        cell.number_format = Some(format.to_string());
        Ok(())
    }

    /// 行データをまとめて書き込む（左上セルを起点に、空文字列はスキップ）
    pub fn set_rows<S: AsRef<str>>(
        &mut self,
        sheet: &str,
        origin: &str,
        rows: &[Vec<S>],
    ) -> Result<(), XlsxLlmError> {
        let origin = CellAddress::parse(origin)?;
        let cells = self.sheet_mut(sheet)?;
        for (r, row) in rows.iter().enumerate() {
            for (c, text) in row.iter().enumerate() {
                let text = text.as_ref();
                if text.is_empty() {
                    continue;
                }
                let address = CellAddress::new(origin.row + r as u32, origin.col + c as u32);
                cells.insert(address, DecodedCell::new(CellValue::String(text.to_string())));
            }
        }
        Ok(())
    }

    /// セル範囲を結合セルとして登録（例: `"A1:C1"`）
    ///
    /// 列全体・行全体の指定はできません。
    pub fn merge_cells(&mut self, sheet: &str, range: &str) -> Result<(), XlsxLlmError> {
        let bound = resolve_range(range, None)?;
        self.sheet_mut(sheet)?;
        self.merged.entry(sheet.to_string()).or_default().push(bound);
        Ok(())
    }

    fn sheet_mut(
        &mut self,
        sheet: &str,
    ) -> Result<&mut BTreeMap<CellAddress, DecodedCell>, XlsxLlmError> {
        let available: Vec<String> = self.sheets.iter().map(|(name, _)| name.clone()).collect();
        self.sheets
            .iter_mut()
            .find(|(name, _)| name == sheet)
            .map(|(_, cells)| cells)
            .ok_or_else(|| XlsxLlmError::UnknownSheet {
                sheet: sheet.to_string(),
                available,
            })
    }

    fn sheet(&self, sheet: &str) -> Option<&BTreeMap<CellAddress, DecodedCell>> {
        self.sheets
            .iter()
            .find(|(name, _)| name == sheet)
            .map(|(_, cells)| cells)
    }
}

impl WorkbookDecoder for InMemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn cell(&self, sheet: &str, address: CellAddress) -> Option<DecodedCell> {
        self.sheet(sheet)?.get(&address).cloned()
    }

    fn used_range(&self, sheet: &str) -> Option<RangeBound> {
        // 書式のみのセルは使用範囲に含めない
        self.sheet(sheet)?
            .iter()
            .filter(|(_, cell)| !cell.value.is_empty() || cell.formula.is_some())
            .map(|(address, _)| RangeBound {
                start: *address,
                end: *address,
            })
            .reduce(|acc, bound| acc.union(&bound))
    }

    fn is_1904(&self) -> bool {
        self.is_1904
    }

    fn merged_regions(&self, sheet: &str) -> Vec<RangeBound> {
        self.merged.get(sheet).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_order_is_preserved() {
        let workbook = InMemoryWorkbook::new()
            .with_sheet("Zeta")
            .with_sheet("Alpha")
            .with_sheet("Zeta");
        assert_eq!(workbook.sheet_names(), vec!["Zeta", "Alpha"]);
        assert!(workbook.has_sheet("Alpha"));
        assert!(!workbook.has_sheet("alpha"));
    }

    #[test]
    fn test_set_value_on_unknown_sheet() {
        let mut workbook = InMemoryWorkbook::new().with_sheet("Sheet1");
        match workbook.set_value("Other", "A1", CellValue::Number(1.0)) {
            Err(XlsxLlmError::UnknownSheet { sheet, available }) => {
                assert_eq!(sheet, "Other");
                assert_eq!(available, vec!["Sheet1"]);
            }
            other => panic!("Expected UnknownSheet, got {:?}", other),
        }
    }

    #[test]
    fn test_cell_lookup() {
        let mut workbook = InMemoryWorkbook::new().with_sheet("Sheet1");
        workbook
            .set_formula("Sheet1", "B1", "=A1*2", CellValue::Number(20.0))
            .unwrap();
        workbook.set_number_format("Sheet1", "B1", "0.00").unwrap();

        let cell = workbook.cell("Sheet1", CellAddress::new(0, 1)).unwrap();
        assert_eq!(cell.value, CellValue::Number(20.0));
        assert_eq!(cell.formula.as_deref(), Some("=A1*2"));
        assert_eq!(cell.number_format.as_deref(), Some("0.00"));

        assert!(workbook.cell("Sheet1", CellAddress::new(0, 0)).is_none());
        assert!(workbook.cell("Missing", CellAddress::new(0, 1)).is_none());
    }

    #[test]
    fn test_used_range_is_minimal_rectangle() {
        let mut workbook = InMemoryWorkbook::new().with_sheet("Sheet1");
        assert_eq!(workbook.used_range("Sheet1"), None);

        workbook.set_value("Sheet1", "C2", CellValue::Number(1.0)).unwrap();
        workbook
            .set_value("Sheet1", "B5", CellValue::String("x".to_string()))
            .unwrap();
        workbook.set_number_format("Sheet1", "Z99", "0.00").unwrap();

        assert_eq!(workbook.used_range("Sheet1").unwrap().to_string(), "B2:C5");
    }

    #[test]
    fn test_setting_empty_value_removes_plain_cell() {
        let mut workbook = InMemoryWorkbook::new().with_sheet("Sheet1");
        workbook.set_value("Sheet1", "A1", CellValue::Number(1.0)).unwrap();
        workbook.set_value("Sheet1", "A1", CellValue::Empty).unwrap();
        assert!(workbook.cell("Sheet1", CellAddress::new(0, 0)).is_none());
        assert_eq!(workbook.used_range("Sheet1"), None);
    }

    #[test]
    fn test_merge_cells() {
        let mut workbook = InMemoryWorkbook::new().with_sheet("Sheet1");
        assert!(workbook.merged_regions("Sheet1").is_empty());

        workbook.merge_cells("Sheet1", "A1:C1").unwrap();
        workbook.merge_cells("Sheet1", "$b$3:b4").unwrap();
        let regions: Vec<String> = workbook
            .merged_regions("Sheet1")
            .iter()
            .map(|r| r.to_string())
            .collect();
        assert_eq!(regions, vec!["A1:C1", "B3:B4"]);

        assert!(workbook.merge_cells("Sheet1", "A:A").is_err());
        assert!(matches!(
            workbook.merge_cells("Other", "A1:B1"),
            Err(XlsxLlmError::UnknownSheet { .. })
        ));
        assert!(workbook.merged_regions("Other").is_empty());
    }

    #[test]
    fn test_set_rows() {
        let mut workbook = InMemoryWorkbook::new().with_sheet("Data");
        workbook
            .set_rows("Data", "B2", &[vec!["h1", "h2"], vec!["", "v"]])
            .unwrap();
        assert_eq!(workbook.used_range("Data").unwrap().to_string(), "B2:C3");
        assert!(workbook.cell("Data", CellAddress::new(2, 1)).is_none());
        assert_eq!(
            workbook.cell("Data", CellAddress::new(2, 2)).unwrap().value,
            CellValue::String("v".to_string())
        );
    }
}
