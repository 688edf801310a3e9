//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。
//! 座標、範囲、グリッド、数式マップ、抽出結果、レンダリング結果を扱います。

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::api::ExportFormat;
use crate::error::XlsxLlmError;

/// Excelの最大行数（1,048,576行）
pub const MAX_ROWS: u32 = 1_048_576;

/// Excelの最大列数（16,384列 = XFD）
pub const MAX_COLUMNS: u32 = 16_384;

/// セルの値を表す列挙型
///
/// デコーダーが返す、書式適用前の型付きの値です。
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// 数値（f64）
    Number(f64),

    /// 文字列
    String(String),

    /// 論理値
    Bool(bool),

    /// エラー値（例: #DIV/0!）
    Error(String),

    /// 日付・時刻（Excelシリアル値）
    DateTime(f64),

    /// 空セル
    Empty,
}

impl CellValue {
    /// 値が空かどうかを判定
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

/// デコーダーから取得した1セル分のデータ
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCell {
    /// セルの値（数式セルの場合はキャッシュされた計算結果）
    pub value: CellValue,

    /// 数式文字列（数式セルの場合）
    pub formula: Option<String>,

    /// 表示書式（Number Format String、宣言されている場合）
    pub number_format: Option<String>,
}

impl DecodedCell {
    /// 値のみを持つセルを生成
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            formula: None,
            number_format: None,
        }
    }

    /// 数式を設定する
    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    /// 表示書式を設定する
    pub fn with_number_format(mut self, format: impl Into<String>) -> Self {
        self.number_format = Some(format.into());
        self
    }

    /// 正規化された数式を取得
    ///
    /// 空の数式は数式として扱いません。先頭に`=`がない場合は付与します
    /// （calamineは`=`なしの数式文字列を返すため）。
    pub fn normalized_formula(&self) -> Option<String> {
        let formula = self.formula.as_deref()?.trim();
        if formula.is_empty() || formula == "=" {
            return None;
        }
        if formula.starts_with('=') {
            Some(formula.to_string())
        } else {
            Some(format!("={}", formula))
        }
    }
}

/// セル座標（0始まり）
///
/// 外部表現はA1記法（列文字 + 1始まりの行番号）です。
/// 行優先の順序（row, col）で比較されます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1形式の文字列に変換（例: (0, 0) -> "A1"）
    pub fn to_a1(&self) -> String {
        format!("{}{}", column_letters(self.col), self.row + 1)
    }

    /// A1形式の単一セル参照を解析（`$`記号、大文字小文字は問わない）
    ///
    /// # 戻り値
    ///
    /// * `Ok(CellAddress)` - 解析に成功した場合
    /// * `Err(XlsxLlmError::InvalidRange)` - 単一セル参照として解釈できない場合
    pub fn parse(reference: &str) -> Result<Self, XlsxLlmError> {
        match crate::range::RangeExpression::parse(reference)? {
            crate::range::RangeExpression::Cells(bound) if bound.start == bound.end => {
                Ok(bound.start)
            }
            _ => Err(XlsxLlmError::invalid_range(
                reference,
                "expected a single cell reference",
            )),
        }
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row + 1)
    }
}

impl Serialize for CellAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 列インデックスを列文字に変換（0 -> "A", 25 -> "Z", 26 -> "AA"）
///
/// 全単射的な26進数（bijective base-26）です。
pub(crate) fn column_letters(mut col: u32) -> String {
    let mut result = String::new();
    loop {
        let remainder = col % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    result
}

/// 矩形のセル範囲（両端を含む）
///
/// 不変条件: `start.row <= end.row` かつ `start.col <= end.col`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RangeBound {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl RangeBound {
    /// 新しい範囲を生成
    ///
    /// 開始と終了が逆転している範囲は生成できません。
    pub fn new(start: CellAddress, end: CellAddress) -> Result<Self, XlsxLlmError> {
        let bound = Self { start, end };
        if start.row > end.row {
            return Err(XlsxLlmError::invalid_range(
                &bound.to_string(),
                "end row precedes start row",
            ));
        }
        if start.col > end.col {
            return Err(XlsxLlmError::invalid_range(
                &bound.to_string(),
                "end column precedes start column",
            ));
        }
        Ok(bound)
    }

    /// 指定された座標が範囲内にあるかを判定
    pub fn contains(&self, address: CellAddress) -> bool {
        address.row >= self.start.row
            && address.row <= self.end.row
            && address.col >= self.start.col
            && address.col <= self.end.col
    }

    /// 行数
    pub fn row_count(&self) -> usize {
        (self.end.row - self.start.row) as usize + 1
    }

    /// 列数
    pub fn column_count(&self) -> usize {
        (self.end.col - self.start.col) as usize + 1
    }

    /// 範囲に含まれるセル数
    pub fn cell_count(&self) -> u64 {
        self.row_count() as u64 * self.column_count() as u64
    }

    /// 2つの範囲が1セル以上重なるかを判定
    pub fn intersects(&self, other: &RangeBound) -> bool {
        self.start.row <= other.end.row
            && other.start.row <= self.end.row
            && self.start.col <= other.end.col
            && other.start.col <= self.end.col
    }

    /// 2つの範囲を包含する最小の範囲
    pub fn union(&self, other: &RangeBound) -> RangeBound {
        RangeBound {
            start: CellAddress::new(
                self.start.row.min(other.start.row),
                self.start.col.min(other.start.col),
            ),
            end: CellAddress::new(
                self.end.row.max(other.end.row),
                self.end.col.max(other.end.col),
            ),
        }
    }
}

impl fmt::Display for RangeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

/// セル表示値の2次元グリッド（行 × 列）
///
/// 不変条件: すべての行が同じ列数を持ちます。空セルは空文字列として保持され、
/// 省略されることはありません。行0は慣例としてヘッダー行として扱われます。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// 行データからグリッドを構築し、形状を検証する
    pub(crate) fn from_rows(rows: Vec<Vec<String>>, width: usize) -> Result<Self, XlsxLlmError> {
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(XlsxLlmError::Extraction(format!(
                "row {} has {} cells, expected {}",
                index,
                row.len(),
                width
            )));
        }
        Ok(Self { rows })
    }

    /// すべての行
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// 行数
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 列数（行0の長さ、グリッドが空の場合は0）
    pub fn column_count(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    /// ヘッダー行（行0）
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(|r| r.as_slice())
    }

    /// 指定位置の値（グリッド内の相対座標）
    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(|s| s.as_str())
    }

    /// グリッドが空かどうか
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// セル座標から数式文字列へのマッピング
///
/// 数式を持つセルのみを含みます。キーは行優先の順序で列挙されます。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormulaMap {
    entries: BTreeMap<CellAddress, String>,
}

impl FormulaMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, address: CellAddress, formula: String) {
        self.entries.insert(address, formula);
    }

    /// A1形式のアドレスで数式を取得
    pub fn get(&self, address: &str) -> Option<&str> {
        let address = CellAddress::parse(address).ok()?;
        self.entries.get(&address).map(|s| s.as_str())
    }

    /// 座標で数式を取得
    pub fn get_at(&self, address: CellAddress) -> Option<&str> {
        self.entries.get(&address).map(|s| s.as_str())
    }

    /// 行優先の順序で（座標, 数式）を列挙
    pub fn iter(&self) -> impl Iterator<Item = (&CellAddress, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// 座標の一覧
    pub fn addresses(&self) -> impl Iterator<Item = &CellAddress> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 1回の抽出処理の結果
///
/// グリッドと数式マップは必ず同じ範囲から同時に生成されます。
/// 生成後は変更されず、再処理の際は新しいインスタンスで置き換えられます。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    sheet_name: String,
    range_expression: String,
    bound: RangeBound,
    grid: Grid,
    formulas: FormulaMap,
    merged_ranges: Vec<RangeBound>,
}

impl ExtractionResult {
    pub(crate) fn new(
        sheet_name: String,
        range_expression: String,
        bound: RangeBound,
        grid: Grid,
        formulas: FormulaMap,
    ) -> Self {
        Self {
            sheet_name,
            range_expression,
            bound,
            grid,
            formulas,
            merged_ranges: Vec::new(),
        }
    }

    pub(crate) fn with_merged_ranges(mut self, merged_ranges: Vec<RangeBound>) -> Self {
        self.merged_ranges = merged_ranges;
        self
    }

    /// シート名
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// 入力された範囲式（解決前の文字列）
    pub fn range_expression(&self) -> &str {
        &self.range_expression
    }

    /// 解決済みの範囲
    pub fn bound(&self) -> RangeBound {
        self.bound
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn formulas(&self) -> &FormulaMap {
        &self.formulas
    }

    /// 抽出範囲と重なる結合セル範囲（左上セルの順）
    ///
    /// 結合範囲は抽出範囲の外にはみ出していても、そのままの形で保持されます。
    pub fn merged_ranges(&self) -> &[RangeBound] {
        &self.merged_ranges
    }
}

/// 1つの抽出結果から生成された5つのテキスト表現
///
/// 常にまとめて生成され、生成後は変更されません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    pub(crate) record: String,
    pub(crate) tabular: String,
    pub(crate) delimited: String,
    pub(crate) plain: String,
    pub(crate) analysis: String,
}

impl RenderedOutput {
    /// JSON（ネストした配列）表現
    pub fn record(&self) -> &str {
        &self.record
    }

    /// Markdownテーブル表現
    pub fn tabular(&self) -> &str {
        &self.tabular
    }

    /// CSV表現
    pub fn delimited(&self) -> &str {
        &self.delimited
    }

    /// タブ区切りのプレーンテキスト表現
    pub fn plain(&self) -> &str {
        &self.plain
    }

    /// 分析サマリー
    pub fn analysis(&self) -> &str {
        &self.analysis
    }

    /// 指定フォーマットの表現を取得
    pub fn get(&self, format: ExportFormat) -> &str {
        match format {
            ExportFormat::Record => &self.record,
            ExportFormat::Tabular => &self.tabular,
            ExportFormat::Delimited => &self.delimited,
            ExportFormat::Plain => &self.plain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_address_to_a1() {
        assert_eq!(CellAddress::new(0, 0).to_a1(), "A1");
        assert_eq!(CellAddress::new(0, 25).to_a1(), "Z1");
        assert_eq!(CellAddress::new(0, 26).to_a1(), "AA1");
        assert_eq!(CellAddress::new(99, 701).to_a1(), "ZZ100");
        assert_eq!(CellAddress::new(0, 702).to_a1(), "AAA1");
        assert_eq!(CellAddress::new(1_048_575, 16_383).to_a1(), "XFD1048576");
    }

    #[test]
    fn test_cell_address_display_matches_to_a1() {
        let address = CellAddress::new(4, 27);
        assert_eq!(address.to_string(), address.to_a1());
        assert_eq!(address.to_string(), "AB5");
    }

    #[test]
    fn test_cell_address_parse() {
        assert_eq!(CellAddress::parse("B1").unwrap(), CellAddress::new(0, 1));
        assert_eq!(CellAddress::parse("$c$3").unwrap(), CellAddress::new(2, 2));
        assert!(CellAddress::parse("A1:B2").is_err());
        assert!(CellAddress::parse("A:A").is_err());
    }

    #[test]
    fn test_cell_address_row_major_ordering() {
        let mut addresses = vec![
            CellAddress::new(1, 0),
            CellAddress::new(0, 2),
            CellAddress::new(0, 1),
        ];
        addresses.sort();
        assert_eq!(
            addresses,
            vec![
                CellAddress::new(0, 1),
                CellAddress::new(0, 2),
                CellAddress::new(1, 0)
            ]
        );
    }

    #[test]
    fn test_range_bound_rejects_reversed_coordinates() {
        let result = RangeBound::new(CellAddress::new(0, 25), CellAddress::new(0, 0));
        match result {
            Err(XlsxLlmError::InvalidRange { reason, .. }) => {
                assert!(reason.contains("column"));
            }
            other => panic!("Expected InvalidRange, got {:?}", other),
        }

        assert!(RangeBound::new(CellAddress::new(5, 0), CellAddress::new(1, 0)).is_err());
    }

    #[test]
    fn test_range_bound_size_and_contains() {
        let bound = RangeBound::new(CellAddress::new(0, 0), CellAddress::new(10, 5)).unwrap();
        assert_eq!(bound.row_count(), 11);
        assert_eq!(bound.column_count(), 6);
        assert_eq!(bound.cell_count(), 66);

        assert!(bound.contains(CellAddress::new(0, 0)));
        assert!(bound.contains(CellAddress::new(10, 5)));
        assert!(!bound.contains(CellAddress::new(11, 5)));
        assert!(!bound.contains(CellAddress::new(5, 6)));
    }

    #[test]
    fn test_range_bound_display() {
        let single = RangeBound::new(CellAddress::new(1, 1), CellAddress::new(1, 1)).unwrap();
        assert_eq!(single.to_string(), "B2");

        let bound = RangeBound::new(CellAddress::new(0, 0), CellAddress::new(4, 0)).unwrap();
        assert_eq!(bound.to_string(), "A1:A5");
    }

    #[test]
    fn test_range_bound_union() {
        let a = RangeBound::new(CellAddress::new(2, 1), CellAddress::new(4, 1)).unwrap();
        let b = RangeBound::new(CellAddress::new(0, 3), CellAddress::new(1, 3)).unwrap();
        let union = a.union(&b);
        assert_eq!(union.to_string(), "B1:D5");
    }

    #[test]
    fn test_grid_from_rows_rejects_ragged_rows() {
        let rows = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["c".to_string()],
        ];
        match Grid::from_rows(rows, 2) {
            Err(XlsxLlmError::Extraction(msg)) => assert!(msg.contains("row 1")),
            other => panic!("Expected Extraction error, got {:?}", other),
        }
    }

    #[test]
    fn test_grid_accessors() {
        let grid = Grid::from_rows(
            vec![
                vec!["h1".to_string(), "h2".to_string()],
                vec!["1".to_string(), String::new()],
            ],
            2,
        )
        .unwrap();

        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.column_count(), 2);
        assert_eq!(grid.header().unwrap(), &["h1".to_string(), "h2".to_string()]);
        assert_eq!(grid.get(1, 1), Some(""));
        assert_eq!(grid.get(2, 0), None);

        let empty = Grid::default();
        assert!(empty.is_empty());
        assert_eq!(empty.column_count(), 0);
        assert!(empty.header().is_none());
    }

    #[test]
    fn test_formula_map_lookup_by_a1() {
        let mut formulas = FormulaMap::new();
        formulas.insert(CellAddress::new(0, 1), "=A1*2".to_string());

        assert_eq!(formulas.get("B1"), Some("=A1*2"));
        assert_eq!(formulas.get("b1"), Some("=A1*2"));
        assert_eq!(formulas.get("A1"), None);
        assert_eq!(formulas.len(), 1);
    }

    #[test]
    fn test_formula_map_serializes_with_a1_keys() {
        let mut formulas = FormulaMap::new();
        formulas.insert(CellAddress::new(0, 1), "=A1*2".to_string());
        let json = serde_json::to_string(&formulas).unwrap();
        assert_eq!(json, r#"{"B1":"=A1*2"}"#);
    }

    #[test]
    fn test_normalized_formula() {
        let cell = DecodedCell::new(CellValue::Number(20.0)).with_formula("A1*2");
        assert_eq!(cell.normalized_formula(), Some("=A1*2".to_string()));

        let cell = DecodedCell::new(CellValue::Number(20.0)).with_formula("=A1*2");
        assert_eq!(cell.normalized_formula(), Some("=A1*2".to_string()));

        let cell = DecodedCell::new(CellValue::Empty).with_formula("");
        assert_eq!(cell.normalized_formula(), None);

        let cell = DecodedCell::new(CellValue::Empty);
        assert_eq!(cell.normalized_formula(), None);
    }

    #[test]
    fn test_cell_value_is_empty() {
        assert!(CellValue::Empty.is_empty());
        assert!(!CellValue::Number(42.0).is_empty());
        assert!(!CellValue::String(String::new()).is_empty());
    }

    // プロパティベーステスト: A1記法の形式検証
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_a1_round_trip(row in 0u32..MAX_ROWS, col in 0u32..MAX_COLUMNS) {
                let address = CellAddress::new(row, col);
                let a1 = address.to_a1();
                prop_assert_eq!(CellAddress::parse(&a1).unwrap(), address);
                prop_assert_eq!(CellAddress::parse(&a1.to_lowercase()).unwrap(), address);
            }
        }
    }
}
