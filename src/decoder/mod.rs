//! Decoder Module
//!
//! ワークブックのデコード機能（シート一覧、セル参照、使用範囲）を抽象化するモジュール。
//! 抽出・レンダリング処理はこのトレイトのみに依存し、具体的なファイル形式を知りません。

mod calamine;
mod memory;
mod styles;

pub use self::calamine::CalamineWorkbook;
pub use self::memory::InMemoryWorkbook;

use crate::types::{CellAddress, DecodedCell, RangeBound};

/// デコード済みワークブックへの読み取り専用アクセス
///
/// 本番環境では[`CalamineWorkbook`]、テストや既に表形式データを持つ呼び出し側では
/// [`InMemoryWorkbook`]を使用します。
pub trait WorkbookDecoder {
    /// ワークブック内の順序どおりのシート名
    fn sheet_names(&self) -> Vec<String>;

    /// 指定セルのデータ（値、数式、表示書式）
    ///
    /// シートが存在しない場合、またはセルにデータがない場合は`None`を返します。
    fn cell(&self, sheet: &str, address: CellAddress) -> Option<DecodedCell>;

    /// シートの使用範囲（空でないセルをすべて含む最小の矩形）
    ///
    /// 空のシート、または存在しないシートの場合は`None`を返します。
    fn used_range(&self, sheet: &str) -> Option<RangeBound>;

    /// 1904年エポックを使用するかどうか
    fn is_1904(&self) -> bool {
        false
    }

    /// シート内の結合セル範囲
    ///
    /// 結合情報を持たないデコーダーでは空を返します。
    fn merged_regions(&self, _sheet: &str) -> Vec<RangeBound> {
        Vec::new()
    }

    /// シートが存在するかどうか
    fn has_sheet(&self, sheet: &str) -> bool {
        self.sheet_names().iter().any(|name| name == sheet)
    }
}

impl<T: WorkbookDecoder + ?Sized> WorkbookDecoder for &T {
    fn sheet_names(&self) -> Vec<String> {
        (**self).sheet_names()
    }

    fn cell(&self, sheet: &str, address: CellAddress) -> Option<DecodedCell> {
        (**self).cell(sheet, address)
    }

    fn used_range(&self, sheet: &str) -> Option<RangeBound> {
        (**self).used_range(sheet)
    }

    fn is_1904(&self) -> bool {
        (**self).is_1904()
    }

    fn merged_regions(&self, sheet: &str) -> Vec<RangeBound> {
        (**self).merged_regions(sheet)
    }

    fn has_sheet(&self, sheet: &str) -> bool {
        (**self).has_sheet(sheet)
    }
}
