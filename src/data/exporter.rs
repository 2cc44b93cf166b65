//! XLSX Export Module
//! Writes a row table as a single-sheet Excel workbook.
//!
//! Uses direct ZIP/XML generation: the workbook is five OOXML parts with
//! inline strings, so no shared-string table is needed.

use super::{column_cells, CellValue};
use chrono::NaiveDate;
use polars::prelude::{DataFrame, PolarsError, PolarsResult};
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Invalid sheet name '{0}': use 1-31 characters without []:*?/\\")]
    InvalidSheetName(String),
    #[error("Date {0} is before 1900-01-01 and has no Excel serial number")]
    DateOutOfRange(NaiveDate),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Style index of date cells in `cellXfs` (built-in number format 14).
const DATE_STYLE: usize = 1;
const MAX_SHEET_NAME: usize = 31;

/// Excel workbook writer.
pub struct XlsxExporter;

impl XlsxExporter {
    /// Serialize `df` into `.xlsx` bytes with one sheet named `sheet_name`.
    pub fn export_to_bytes(df: &DataFrame, sheet_name: &str) -> Result<Vec<u8>, ExportError> {
        Self::validate_sheet_name(sheet_name)?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(Self::content_types_xml().as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(Self::rels_xml().as_bytes())?;

        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(Self::workbook_xml(sheet_name).as_bytes())?;

        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(Self::workbook_rels_xml().as_bytes())?;

        zip.start_file("xl/styles.xml", options)?;
        zip.write_all(Self::styles_xml().as_bytes())?;

        zip.start_file("xl/worksheets/sheet1.xml", options)?;
        zip.write_all(Self::sheet_xml(df)?.as_bytes())?;

        let bytes = zip.finish()?.into_inner();
        info!(
            rows = df.height(),
            columns = df.width(),
            bytes = bytes.len(),
            sheet = sheet_name,
            "workbook exported"
        );
        Ok(bytes)
    }

    /// Serialize and write to `path`.
    pub fn export_to_file(df: &DataFrame, sheet_name: &str, path: &Path) -> Result<(), ExportError> {
        let bytes = Self::export_to_bytes(df, sheet_name)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    fn validate_sheet_name(name: &str) -> Result<(), ExportError> {
        let length = name.chars().count();
        let forbidden = ['[', ']', ':', '*', '?', '/', '\\'];
        if length == 0 || length > MAX_SHEET_NAME || name.contains(forbidden) {
            return Err(ExportError::InvalidSheetName(name.to_string()));
        }
        Ok(())
    }

    fn content_types_xml() -> String {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
</Types>"#
            .to_string()
    }

    fn rels_xml() -> String {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#
            .to_string()
    }

    fn workbook_xml(sheet_name: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#,
            escape_xml(sheet_name)
        )
    }

    fn workbook_rels_xml() -> String {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#
            .to_string()
    }

    fn styles_xml() -> String {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs>
<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>"#
            .to_string()
    }

    fn sheet_xml(df: &DataFrame) -> Result<String, ExportError> {
        let columns = df
            .get_columns()
            .iter()
            .map(column_cells)
            .collect::<PolarsResult<Vec<_>>>()?;

        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );

        xml.push_str(r#"<row r="1">"#);
        for (col_idx, name) in df.get_column_names().iter().enumerate() {
            push_text_cell(&mut xml, &cell_ref(col_idx, 1), name.as_str());
        }
        xml.push_str("</row>");

        for row_idx in 0..df.height() {
            let row_num = row_idx + 2;
            xml.push_str(&format!(r#"<row r="{row_num}">"#));
            for (col_idx, cells) in columns.iter().enumerate() {
                let reference = cell_ref(col_idx, row_num);
                match &cells[row_idx] {
                    CellValue::Empty => {}
                    CellValue::Number(v) if !v.is_finite() => {}
                    CellValue::Number(v) => {
                        xml.push_str(&format!(r#"<c r="{reference}"><v>{v}</v></c>"#));
                    }
                    CellValue::Text(s) => push_text_cell(&mut xml, &reference, s),
                    CellValue::Date(d) => {
                        let serial = excel_serial(*d).ok_or(ExportError::DateOutOfRange(*d))?;
                        xml.push_str(&format!(
                            r#"<c r="{reference}" s="{DATE_STYLE}"><v>{serial}</v></c>"#
                        ));
                    }
                }
            }
            xml.push_str("</row>");
        }

        xml.push_str("</sheetData></worksheet>");
        Ok(xml)
    }
}

fn push_text_cell(xml: &mut String, reference: &str, text: &str) {
    xml.push_str(&format!(
        r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
        escape_xml(text)
    ));
}

/// `A1`-style reference for a zero-based column and one-based row.
fn cell_ref(col_idx: usize, row: usize) -> String {
    let mut letters = Vec::new();
    let mut n = col_idx + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect::<String>() + &row.to_string()
}

/// Serial number in the 1900 date system, or `None` before 1900-01-01.
///
/// Serial 60 is the fictitious 1900-02-29, so dates before March 1900
/// count from 1899-12-31 and later ones from 1899-12-30.
fn excel_serial(date: NaiveDate) -> Option<i64> {
    let first = NaiveDate::from_ymd_opt(1900, 1, 1)?;
    let march = NaiveDate::from_ymd_opt(1900, 3, 1)?;
    if date < first {
        return None;
    }
    let base = if date < march {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    Some((date - base).num_days())
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}
