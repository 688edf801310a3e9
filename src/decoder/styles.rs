//! XML Metadata Parser Module
//!
//! XLSX内部のXMLファイルから、calamineで取得できない情報を抽出するモジュール。
//! セルごとのNumber Format Stringと1904年エポック判定を提供します。

use std::collections::HashMap;
use std::io::{Read, Seek};

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;
use zip::ZipArchive;

use crate::error::XlsxLlmError;

/// XLSXスタイルメタデータ
///
/// `xl/styles.xml`、`xl/workbook.xml`、`xl/_rels/workbook.xml.rels`、
/// 各ワークシートXMLを解析し、セル座標からNumber Format Stringを引けるようにします。
#[derive(Debug, Clone, Default)]
pub(crate) struct WorkbookStyles {
    /// numFmtId -> formatCode のマッピング（カスタム書式のみ）
    num_formats: HashMap<u32, String>,
    /// styleId（cellXfsのインデックス）-> numFmtId
    cell_xfs: Vec<u32>,
    /// シート名 -> (行, 列) -> styleId
    cell_styles: HashMap<String, HashMap<(u32, u32), u32>>,
    /// 1904年エポックを使用するかどうか
    is_1904: bool,
}

impl WorkbookStyles {
    /// XLSXアーカイブからスタイルメタデータを解析
    ///
    /// アーカイブのセキュリティ検査は呼び出し側で完了している前提です。
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookStyles)` - 解析に成功した場合（存在しないパートは空として扱う）
    /// * `Err(XlsxLlmError)` - XMLが壊れている場合
    pub fn parse<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Self, XlsxLlmError> {
        let (num_formats, cell_xfs) = match read_part(archive, "xl/styles.xml")? {
            Some(xml) => parse_styles(&xml)?,
            None => (HashMap::new(), Vec::new()),
        };

        let (is_1904, sheet_rels) = match read_part(archive, "xl/workbook.xml")? {
            Some(xml) => parse_workbook(&xml)?,
            None => (false, Vec::new()),
        };

        let rel_targets = match read_part(archive, "xl/_rels/workbook.xml.rels")? {
            Some(xml) => parse_relationships(&xml)?,
            None => HashMap::new(),
        };

        let mut cell_styles = HashMap::new();
        for (sheet_name, rel_id) in sheet_rels {
            let Some(target) = rel_targets.get(&rel_id) else {
                debug!(sheet = %sheet_name, rel_id = %rel_id, "sheet has no relationship target");
                continue;
            };
            let part = resolve_part_path(target);
            if let Some(xml) = read_part(archive, &part)? {
                let styles = parse_worksheet_styles(&xml)?;
                if !styles.is_empty() {
                    cell_styles.insert(sheet_name, styles);
                }
            }
        }

        debug!(
            custom_formats = num_formats.len(),
            cell_xfs = cell_xfs.len(),
            styled_sheets = cell_styles.len(),
            is_1904,
            "parsed workbook style metadata"
        );

        Ok(Self {
            num_formats,
            cell_xfs,
            cell_styles,
            is_1904,
        })
    }

    /// styleIdからNumber Format Stringを取得
    ///
    /// # 戻り値
    ///
    /// * `Some(&str)` - フォーマット文字列が見つかった場合
    /// * `None` - スタイルIDが範囲外、またはフォーマットが見つからない場合
    pub fn get_format_string(&self, style_id: u32) -> Option<&str> {
        let num_fmt_id = *self.cell_xfs.get(style_id as usize)?;
        // カスタム書式はビルトインIDを上書きできる
        self.num_formats
            .get(&num_fmt_id)
            .map(|s| s.as_str())
            .or_else(|| get_builtin_format(num_fmt_id))
    }

    /// セルの表示書式を取得（`General`は書式なしとして扱う）
    pub fn format_for(&self, sheet: &str, row: u32, col: u32) -> Option<&str> {
        let style_id = *self.cell_styles.get(sheet)?.get(&(row, col))?;
        self.get_format_string(style_id)
            .filter(|code| !code.eq_ignore_ascii_case("General"))
    }

    pub fn is_1904(&self) -> bool {
        self.is_1904
    }
}

/// アーカイブ内のパートを読み込む（存在しない場合は`None`）
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, XlsxLlmError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(XlsxLlmError::Zip(e.to_string())),
    };
    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    Ok(Some(content))
}

/// リレーションシップのターゲットをアーカイブ内パスに変換
///
/// `worksheets/sheet1.xml` -> `xl/worksheets/sheet1.xml`、
/// `/xl/worksheets/sheet1.xml` -> `xl/worksheets/sheet1.xml`
fn resolve_part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn xml_error(e: impl std::fmt::Display) -> XlsxLlmError {
    XlsxLlmError::Metadata(format!("XML parse error: {}", e))
}

/// 要素の属性をローカル名 -> 値のマップとして取得
fn attributes(e: &BytesStart<'_>) -> Result<HashMap<Vec<u8>, String>, XlsxLlmError> {
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| XlsxLlmError::Metadata(format!("XML attribute error: {}", e)))?;
        let raw = std::str::from_utf8(&attr.value)?;
        let value = unescape(raw).map_err(xml_error)?.into_owned();
        map.insert(attr.key.local_name().as_ref().to_vec(), value);
    }
    Ok(map)
}

/// xl/styles.xml の解析
///
/// `<numFmts>` と `<cellXfs>` を解析します。`<cellStyleXfs>`内の`<xf>`は対象外です。
fn parse_styles(xml: &[u8]) -> Result<(HashMap<u32, String>, Vec<u32>), XlsxLlmError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut num_formats = HashMap::new();
    let mut cell_xfs = Vec::new();
    let mut in_num_fmts = false;
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"numFmts" => in_num_fmts = true,
                b"cellXfs" => in_cell_xfs = true,
                b"numFmt" if in_num_fmts => {
                    // <numFmt numFmtId="165" formatCode="0.000"/>
                    let attrs = attributes(&e)?;
                    if let (Some(id), Some(code)) =
                        (attrs.get(b"numFmtId".as_slice()), attrs.get(b"formatCode".as_slice()))
                    {
                        num_formats.insert(id.trim().parse::<u32>()?, code.clone());
                    }
                }
                b"xf" if in_cell_xfs => {
                    // <xf numFmtId="165" fontId="0" fillId="0" borderId="0"/>
                    let attrs = attributes(&e)?;
                    let num_fmt_id = match attrs.get(b"numFmtId".as_slice()) {
                        Some(id) => id.trim().parse::<u32>()?,
                        None => 0,
                    };
                    cell_xfs.push(num_fmt_id);
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"numFmts" => in_num_fmts = false,
                b"cellXfs" => in_cell_xfs = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok((num_formats, cell_xfs))
}

/// xl/workbook.xml の解析
///
/// `<workbookPr date1904="1"/>`と、シート名 -> リレーションシップIDの一覧を取得します。
fn parse_workbook(xml: &[u8]) -> Result<(bool, Vec<(String, String)>), XlsxLlmError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut is_1904 = false;
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"workbookPr" => {
                    let attrs = attributes(&e)?;
                    if let Some(value) = attrs.get(b"date1904".as_slice()) {
                        is_1904 = value == "1" || value.eq_ignore_ascii_case("true");
                    }
                }
                b"sheet" => {
                    // <sheet name="Data" sheetId="1" r:id="rId1"/>
                    let attrs = attributes(&e)?;
                    if let (Some(name), Some(rel_id)) =
                        (attrs.get(b"name".as_slice()), attrs.get(b"id".as_slice()))
                    {
                        sheets.push((name.clone(), rel_id.clone()));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok((is_1904, sheets))
}

/// xl/_rels/workbook.xml.rels の解析（リレーションシップID -> ターゲット）
fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, XlsxLlmError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut targets = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let attrs = attributes(&e)?;
                if let (Some(id), Some(target)) =
                    (attrs.get(b"Id".as_slice()), attrs.get(b"Target".as_slice()))
                {
                    targets.insert(id.clone(), target.clone());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(targets)
}

/// ワークシートXMLから各セルのスタイルIDを取得
///
/// `<c r="B2" s="3">`の`s`属性を収集します。`s`がない（または0の）セルは記録しません。
/// `r`属性が省略されたセルは、同じ行の直前のセルの次の列として扱います。
fn parse_worksheet_styles(xml: &[u8]) -> Result<HashMap<(u32, u32), u32>, XlsxLlmError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut styles = HashMap::new();
    let mut last_row: Option<u32> = None;
    let mut next_col: u32 = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => {
                    let attrs = attributes(&e)?;
                    let row = match attrs.get(b"r".as_slice()) {
                        // Excelの行番号は1始まりなので、0始まりに変換
                        Some(r) => r.trim().parse::<u32>()?.saturating_sub(1),
                        None => last_row.map_or(0, |row| row + 1),
                    };
                    last_row = Some(row);
                    next_col = 0;
                }
                b"c" => {
                    let attrs = attributes(&e)?;
                    let (row, col) = match attrs.get(b"r".as_slice()).and_then(|r| parse_cell_ref(r)) {
                        Some(position) => position,
                        None => (last_row.unwrap_or(0), next_col),
                    };
                    next_col = col + 1;

                    if let Some(s) = attrs.get(b"s".as_slice()) {
                        let style_id = s.trim().parse::<u32>()?;
                        if style_id != 0 {
                            styles.insert((row, col), style_id);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(styles)
}

/// セル参照文字列を座標に変換（例: "A1" -> (0, 0)）
fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    // 列を数値に変換（A=0, B=1, ..., Z=25, AA=26, ...）
    let col = letters
        .bytes()
        .try_fold(0u32, |acc, b| {
            acc.checked_mul(26)?
                .checked_add((b.to_ascii_uppercase() - b'A') as u32 + 1)
        })?
        .checked_sub(1)?;

    // 行を数値に変換（1始まりなので0始まりに変換）
    let row = digits.parse::<u32>().ok()?.checked_sub(1)?;

    Some((row, col))
}

/// ビルトイン書式ID（0-163）のマッピング
///
/// Excelの標準書式IDとフォーマット文字列の対応表です。
fn get_builtin_format(id: u32) -> Option<&'static str> {
    match id {
        0 => Some("General"),
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        5 => Some("$#,##0_);($#,##0)"),
        6 => Some("$#,##0_);[Red]($#,##0)"),
        7 => Some("$#,##0.00_);($#,##0.00)"),
        8 => Some("$#,##0.00_);[Red]($#,##0.00)"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        11 => Some("0.00E+00"),
        12 => Some("# ?/?"),
        13 => Some("# ??/??"),
        14 => Some("mm-dd-yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        37 => Some("#,##0_);(#,##0)"),
        38 => Some("#,##0_);[Red](#,##0)"),
        39 => Some("#,##0.00_);(#,##0.00)"),
        40 => Some("#,##0.00_);[Red](#,##0.00)"),
        41 => Some("_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)"),
        42 => Some("_($* #,##0_);_($* (#,##0);_($* \"-\"_);_(@_)"),
        43 => Some("_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)"),
        44 => Some("_($* #,##0.00_);_($* (#,##0.00);_($* \"-\"??_);_(@_)"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mm:ss.0"),
        48 => Some("##0.0E+0"),
        49 => Some("@"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="2">
    <numFmt numFmtId="164" formatCode="0.000"/>
    <numFmt numFmtId="165" formatCode="&quot;$&quot;#,##0.00"/>
  </numFmts>
  <cellStyleXfs count="1"><xf numFmtId="99"/></cellStyleXfs>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0"/>
    <xf numFmtId="164" fontId="0" applyNumberFormat="1"/>
    <xf numFmtId="14" fontId="0" applyNumberFormat="1"><alignment horizontal="left"/></xf>
    <xf numFmtId="165"/>
  </cellXfs>
</styleSheet>"#;

    #[test]
    fn test_get_builtin_format() {
        assert_eq!(get_builtin_format(0), Some("General"));
        assert_eq!(get_builtin_format(1), Some("0"));
        assert_eq!(get_builtin_format(14), Some("mm-dd-yy"));
        assert_eq!(get_builtin_format(49), Some("@"));
        assert_eq!(get_builtin_format(50), None);
        assert_eq!(get_builtin_format(164), None);
    }

    #[test]
    fn test_parse_styles_handles_self_closing_elements() {
        let (num_formats, cell_xfs) = parse_styles(STYLES_XML.as_bytes()).unwrap();
        assert_eq!(num_formats.get(&164).map(|s| s.as_str()), Some("0.000"));
        assert_eq!(num_formats.get(&165).map(|s| s.as_str()), Some("\"$\"#,##0.00"));
        assert_eq!(cell_xfs, vec![0, 164, 14, 165]);
    }

    #[test]
    fn test_get_format_string() {
        let (num_formats, cell_xfs) = parse_styles(STYLES_XML.as_bytes()).unwrap();
        let styles = WorkbookStyles {
            num_formats,
            cell_xfs,
            ..WorkbookStyles::default()
        };
        assert_eq!(styles.get_format_string(0), Some("General"));
        assert_eq!(styles.get_format_string(1), Some("0.000"));
        assert_eq!(styles.get_format_string(2), Some("mm-dd-yy"));
        assert_eq!(styles.get_format_string(4), None);
    }

    #[test]
    fn test_parse_workbook() {
        let xml = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <workbookPr date1904="1"/>
  <sheets>
    <sheet name="Data" sheetId="1" r:id="rId1"/>
    <sheet name="A &amp; B" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;
        let (is_1904, sheets) = parse_workbook(xml.as_bytes()).unwrap();
        assert!(is_1904);
        assert_eq!(
            sheets,
            vec![
                ("Data".to_string(), "rId1".to_string()),
                ("A & B".to_string(), "rId2".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_workbook_without_date1904() {
        let xml = r#"<workbook><workbookPr defaultThemeVersion="124226"></workbookPr></workbook>"#;
        let (is_1904, sheets) = parse_workbook(xml.as_bytes()).unwrap();
        assert!(!is_1904);
        assert!(sheets.is_empty());
    }

    #[test]
    fn test_parse_relationships_and_paths() {
        let xml = r#"<Relationships>
  <Relationship Id="rId1" Type="worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="worksheet" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;
        let targets = parse_relationships(xml.as_bytes()).unwrap();
        assert_eq!(resolve_part_path(&targets["rId1"]), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_part_path(&targets["rId2"]), "xl/worksheets/sheet2.xml");
    }

    #[test]
    fn test_parse_worksheet_styles() {
        let xml = r#"<worksheet><sheetData>
  <row r="1"><c r="A1" s="1"><v>1</v></c><c r="B1"><v>2</v></c></row>
  <row r="3"><c s="2"/><c r="C3" s="3" t="s"><v>0</v></c><c s="1"/></row>
</sheetData></worksheet>"#;
        let styles = parse_worksheet_styles(xml.as_bytes()).unwrap();
        assert_eq!(styles.get(&(0, 0)), Some(&1));
        assert_eq!(styles.get(&(0, 1)), None);
        assert_eq!(styles.get(&(2, 0)), Some(&2));
        assert_eq!(styles.get(&(2, 2)), Some(&3));
        assert_eq!(styles.get(&(2, 3)), Some(&1));
    }

    #[test]
    fn test_parse_worksheet_styles_without_row_numbers() {
        let xml = r#"<worksheet><sheetData>
  <row><c s="3"><v>1</v></c></row>
  <row><c/><c s="4"/></row>
  <row r="5"><c s="5"/></row>
  <row><c s="6"/></row>
</sheetData></worksheet>"#;
        let styles = parse_worksheet_styles(xml.as_bytes()).unwrap();
        assert_eq!(styles.get(&(0, 0)), Some(&3));
        assert_eq!(styles.get(&(1, 1)), Some(&4));
        assert_eq!(styles.get(&(4, 0)), Some(&5));
        assert_eq!(styles.get(&(5, 0)), Some(&6));
        assert_eq!(styles.len(), 4);
    }

    #[test]
    fn test_attribute_with_invalid_utf8_is_utf8_error() {
        let xml = b"<styleSheet><numFmts><numFmt numFmtId=\"164\" formatCode=\"\xff\"/></numFmts></styleSheet>";
        match parse_styles(xml) {
            Err(XlsxLlmError::Utf8(_)) => {}
            other => panic!("Expected Utf8 error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("AA10"), Some((9, 26)));
        assert_eq!(parse_cell_ref("XFD1048576"), Some((1_048_575, 16_383)));
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("1"), None);
        assert_eq!(parse_cell_ref("A"), None);
    }

    #[test]
    fn test_malformed_xml_is_metadata_error() {
        match parse_styles(b"<styleSheet><numFmts></cellXfs>") {
            Err(XlsxLlmError::Metadata(_)) => {}
            other => panic!("Expected Metadata error, got {:?}", other),
        }
    }
}
