//! Grid Extraction Module
//!
//! 解決済みの範囲を行優先で走査し、表示値のグリッドと数式マップを生成するモジュール。

use tracing::debug;

use crate::builder::ConversionConfig;
use crate::decoder::WorkbookDecoder;
use crate::error::XlsxLlmError;
use crate::formatter::CellFormatter;
use crate::types::{CellAddress, ExtractionResult, FormulaMap, Grid, RangeBound};

/// グリッド抽出器
///
/// 1回の抽出ごとに生成され、ワークブックを変更しません。
#[derive(Debug)]
pub(crate) struct GridExtractor {
    formatter: CellFormatter,
    max_cells: usize,
}

impl GridExtractor {
    pub fn new(config: &ConversionConfig, is_1904: bool) -> Self {
        Self {
            formatter: CellFormatter::new(config, is_1904),
            max_cells: config.max_cells,
        }
    }

    /// 範囲内のセルを抽出
    ///
    /// # 引数
    ///
    /// * `decoder` - デコード済みワークブック
    /// * `sheet` - シート名
    /// * `bound` - 解決済みの範囲
    /// * `expression` - 元の範囲式（結果に記録される）
    ///
    /// # 戻り値
    ///
    /// * `Ok(ExtractionResult)` - グリッドと数式マップ
    /// * `Err(XlsxLlmError::UnknownSheet)` - シートが存在しない場合
    /// * `Err(XlsxLlmError::InvalidRange)` - 範囲がセル数の上限を超える場合
    ///
    /// 失敗した場合、部分的な結果は返しません。
    pub fn extract<D: WorkbookDecoder + ?Sized>(
        &self,
        decoder: &D,
        sheet: &str,
        bound: RangeBound,
        expression: &str,
    ) -> Result<ExtractionResult, XlsxLlmError> {
        if !decoder.has_sheet(sheet) {
            return Err(XlsxLlmError::UnknownSheet {
                sheet: sheet.to_string(),
                available: decoder.sheet_names(),
            });
        }

        if bound.cell_count() > self.max_cells as u64 {
            return Err(XlsxLlmError::invalid_range(
                expression,
                format!(
                    "range {} covers {} cells, more than the limit of {}",
                    bound,
                    bound.cell_count(),
                    self.max_cells
                ),
            ));
        }

        let width = bound.column_count();
        let mut rows = Vec::with_capacity(bound.row_count());
        let mut formulas = FormulaMap::new();

        for row in bound.start.row..=bound.end.row {
            let mut values = Vec::with_capacity(width);
            for col in bound.start.col..=bound.end.col {
                let address = CellAddress::new(row, col);
                match decoder.cell(sheet, address) {
                    Some(cell) => {
                        if let Some(formula) = cell.normalized_formula() {
                            formulas.insert(address, formula);
                        }
                        values.push(self.formatter.format_cell(&cell));
                    }
                    None => values.push(String::new()),
                }
            }
            rows.push(values);
        }

        let grid = Grid::from_rows(rows, width)?;

        let mut merged_ranges: Vec<RangeBound> = decoder
            .merged_regions(sheet)
            .into_iter()
            .filter(|region| region.intersects(&bound))
            .collect();
        merged_ranges.sort_by_key(|region| (region.start, region.end));
        merged_ranges.dedup();

        debug!(
            sheet,
            bound = %bound,
            rows = grid.row_count(),
            columns = grid.column_count(),
            formulas = formulas.len(),
            merged = merged_ranges.len(),
            "extracted grid"
        );

        Ok(ExtractionResult::new(
            sheet.to_string(),
            expression.to_string(),
            bound,
            grid,
            formulas,
        )
        .with_merged_ranges(merged_ranges))
    }
}
