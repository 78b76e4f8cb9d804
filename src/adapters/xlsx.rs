//! 精簡的 .xlsx 讀取器：只讀第一個工作表，輸出字串格。
//!
//! 空白列保留原本的位置，讓 `skip_rows` 與試算表軟體看到的列號一致。

use crate::utils::error::{MapError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;

pub const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

// 試算表本身的上限 (XFD 欄, 1048576 列)
const MAX_COLUMNS: usize = 16_384;
const MAX_ROWS: usize = 1_048_576;

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

pub fn looks_like_xlsx(data: &[u8]) -> bool {
    data.starts_with(ZIP_MAGIC)
}

/// 讀取活頁簿第一個工作表的所有列
pub fn read_first_sheet(data: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let shared_strings = match read_entry(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let sheet_path = first_sheet_path(&mut archive)?;
    tracing::debug!("Reading worksheet {}", sheet_path);
    let sheet = read_entry(&mut archive, &sheet_path)?.ok_or_else(|| {
        MapError::data_format(format!("workbook has no worksheet at {}", sheet_path))
    })?;

    parse_sheet(&sheet, &shared_strings)
}

fn read_entry(archive: &mut Archive<'_>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)?;
    Ok(Some(buf))
}

/// workbook.xml 的第一個 <sheet> 透過 relationships 找到實際路徑
fn first_sheet_path(archive: &mut Archive<'_>) -> Result<String> {
    const FALLBACK: &str = "xl/worksheets/sheet1.xml";

    let (Some(workbook), Some(rels)) = (
        read_entry(archive, "xl/workbook.xml")?,
        read_entry(archive, "xl/_rels/workbook.xml.rels")?,
    ) else {
        return Ok(FALLBACK.to_string());
    };

    let Some(rel_id) = first_sheet_rel_id(&workbook)? else {
        return Ok(FALLBACK.to_string());
    };

    let targets = parse_relationships(&rels)?;
    Ok(match targets.get(&rel_id) {
        Some(target) if target.starts_with('/') => target.trim_start_matches('/').to_string(),
        Some(target) => format!("xl/{}", target),
        None => FALLBACK.to_string(),
    })
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        // 忽略命名空間前綴，例如 r:id
        let key = attr.key.as_ref();
        let local = key.rsplit(|&b| b == b':').next().unwrap_or(key);
        if local == name {
            let value = std::str::from_utf8(&attr.value)
                .map_err(|e| MapError::data_format(format!("invalid UTF-8 in attribute: {}", e)))?;
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}

fn first_sheet_rel_id(xml: &[u8]) -> Result<Option<String>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                return attribute(&e, b"id");
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut targets = HashMap::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attribute(&e, b"Id")?, attribute(&e, b"Target")?) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(targets)
}

fn push_entity(out: &mut String, name: &str) -> Result<()> {
    let resolved = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        other => {
            return Err(MapError::data_format(format!("unknown XML entity &{};", other)));
        }
    };
    out.push(resolved);
    Ok(())
}

fn push_reference(out: &mut String, reference: &quick_xml::events::BytesRef<'_>) -> Result<()> {
    if let Some(ch) = reference.resolve_char_ref()? {
        out.push(ch);
        return Ok(());
    }
    let name = reference.decode().map_err(quick_xml::Error::from)?;
    push_entity(out, &name)
}

fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_item = false;
    let mut in_text = false;
    // 注音 (<rPh>) 內的文字不屬於儲存格內容
    let mut in_phonetic = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = true;
                    current.clear();
                }
                b"rPh" => in_phonetic = true,
                b"t" if in_item && !in_phonetic => in_text = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = false;
                    strings.push(std::mem::take(&mut current));
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(e) if in_text => {
                current.push_str(&e.decode().map_err(quick_xml::Error::from)?);
            }
            Event::CData(e) if in_text => {
                current.push_str(&String::from_utf8_lossy(&e));
            }
            Event::GeneralRef(e) if in_text => push_reference(&mut current, &e)?,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// "AB12" → 欄位索引 27 (0-based)
fn column_index(cell_ref: &str) -> Option<usize> {
    let letters: String = cell_ref
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for c in letters.chars() {
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    (index <= MAX_COLUMNS).then(|| index - 1)
}

/// 依 r 屬性補上中間被省略的空白列
fn pad_rows(rows: &mut Vec<Vec<String>>, element: &BytesStart<'_>) -> Result<()> {
    let Some(number) = attribute(element, b"r")?.and_then(|r| r.parse::<usize>().ok()) else {
        return Ok(());
    };
    if number > MAX_ROWS {
        return Err(MapError::data_format(format!(
            "row number {} exceeds the worksheet limit of {}",
            number, MAX_ROWS
        )));
    }
    while rows.len() + 1 < number {
        rows.push(Vec::new());
    }
    Ok(())
}

#[derive(Debug, Default)]
struct CellState {
    column: usize,
    kind: Option<String>,
    value: String,
}

fn parse_sheet(xml: &[u8], shared_strings: &[String]) -> Result<Vec<Vec<String>>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut current_row: Option<Vec<String>> = None;
    let mut cell: Option<CellState> = None;
    let mut in_value = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    // r 屬性為 1-based 列號
                    pad_rows(&mut rows, &e)?;
                    current_row = Some(Vec::new());
                }
                b"c" => cell = Some(start_cell(&e, current_row.as_deref())?),
                b"v" | b"t" if cell.is_some() => in_value = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => {
                    pad_rows(&mut rows, &e)?;
                    rows.push(Vec::new());
                }
                b"c" => {
                    let state = start_cell(&e, current_row.as_deref())?;
                    if let Some(row) = current_row.as_mut() {
                        place_cell(row, state.column, String::new());
                    }
                }
                _ => {}
            },
            Event::Text(e) if in_value => {
                if let Some(state) = cell.as_mut() {
                    state
                        .value
                        .push_str(&e.decode().map_err(quick_xml::Error::from)?);
                }
            }
            Event::GeneralRef(e) if in_value => {
                if let Some(state) = cell.as_mut() {
                    push_reference(&mut state.value, &e)?;
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let (Some(state), Some(row)) = (cell.take(), current_row.as_mut()) {
                        let column = state.column;
                        let text = resolve_cell(state, shared_strings)?;
                        place_cell(row, column, text);
                    }
                }
                b"row" => {
                    if let Some(row) = current_row.take() {
                        rows.push(row);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(rows)
}

fn start_cell(element: &BytesStart<'_>, row: Option<&[String]>) -> Result<CellState> {
    let column = match attribute(element, b"r")? {
        Some(cell_ref) => column_index(&cell_ref).ok_or_else(|| {
            MapError::data_format(format!("invalid cell reference '{}'", cell_ref))
        })?,
        None => row.map_or(0, <[String]>::len),
    };
    Ok(CellState {
        column,
        kind: attribute(element, b"t")?,
        value: String::new(),
    })
}

fn place_cell(row: &mut Vec<String>, column: usize, text: String) {
    if row.len() <= column {
        row.resize(column + 1, String::new());
    }
    row[column] = text;
}

fn resolve_cell(state: CellState, shared_strings: &[String]) -> Result<String> {
    match state.kind.as_deref() {
        Some("s") => {
            let index: usize = state.value.trim().parse().map_err(|_| {
                MapError::data_format(format!("invalid shared string index '{}'", state.value))
            })?;
            shared_strings.get(index).cloned().ok_or_else(|| {
                MapError::data_format(format!("shared string index {} out of range", index))
            })
        }
        Some("b") => Ok(if state.value.trim() == "1" { "TRUE" } else { "FALSE" }.to_string()),
        _ => Ok(state.value),
    }
}
