//! Raw payload decoding: workbook JSON exports, CSV tables, and CYOA
//! project files. Decoding either yields the complete group list or a
//! [`DecodeError`]; nothing partial escapes.

use clap::ValueEnum;
use encoding_rs::{Encoding, UTF_8};
use itertools::Itertools;
use log::debug;
use serde_json::Value as JsonValue;

use crate::{
    cyoa,
    data::Record,
    error::DecodeError,
    io_utils,
    normalize::{Group, RawTable, cyoa_groups, normalize_tables},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum InputFormat {
    /// JSON workbook export: `[{sheetName, data}]` or `{sheets: [{name, data}]}`
    Workbook,
    /// A single delimited table
    Csv,
    /// Nested CYOA project document (`rows` → `objects` → `addons`)
    Cyoa,
}

#[derive(Debug, Clone)]
pub struct DecodeOptions {
    pub format: InputFormat,
    /// Table name used for CSV input.
    pub table_name: String,
    pub delimiter: u8,
    pub encoding: &'static Encoding,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            format: InputFormat::Workbook,
            table_name: "Sheet1".to_string(),
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            encoding: UTF_8,
        }
    }
}

pub fn decode_groups(bytes: &[u8], options: &DecodeOptions) -> Result<Vec<Group>, DecodeError> {
    let groups = match options.format {
        InputFormat::Workbook => normalize_tables(decode_workbook(bytes, options.encoding)?),
        InputFormat::Csv => normalize_tables(decode_csv(bytes, options)?),
        InputFormat::Cyoa => cyoa_groups(&decode_cyoa(bytes, options.encoding)?),
    };
    if let Some(duplicate) = groups
        .iter()
        .map(|group| group.name.as_str())
        .duplicates()
        .next()
    {
        return Err(DecodeError::Shape(format!(
            "group name '{duplicate}' appears more than once"
        )));
    }
    debug!(
        "Decoded {} group(s) from {:?} payload",
        groups.len(),
        options.format
    );
    Ok(groups)
}

pub fn decode_workbook(
    bytes: &[u8],
    encoding: &'static Encoding,
) -> Result<Vec<RawTable>, DecodeError> {
    let text = io_utils::decode_bytes(bytes, encoding)?;
    let root: JsonValue = serde_json::from_str(&text)?;
    let (sheets, name_key) = match root {
        JsonValue::Array(sheets) => (sheets, "sheetName"),
        JsonValue::Object(mut object) => match object.remove("sheets") {
            Some(JsonValue::Array(sheets)) => (sheets, "name"),
            _ => {
                return Err(DecodeError::Shape(
                    "workbook object must contain a 'sheets' array".to_string(),
                ));
            }
        },
        _ => {
            return Err(DecodeError::Shape(
                "workbook must be an array of sheets".to_string(),
            ));
        }
    };

    sheets
        .into_iter()
        .enumerate()
        .map(|(idx, sheet)| {
            let JsonValue::Object(mut sheet) = sheet else {
                return Err(DecodeError::Shape(format!("sheet {idx} is not an object")));
            };
            let name = match sheet.remove(name_key) {
                Some(JsonValue::String(name)) => name,
                _ => {
                    return Err(DecodeError::Shape(format!(
                        "sheet {idx} is missing a '{name_key}' string"
                    )));
                }
            };
            let rows = match sheet.remove("data") {
                Some(JsonValue::Array(rows)) => rows,
                None | Some(JsonValue::Null) => Vec::new(),
                Some(_) => {
                    return Err(DecodeError::Shape(format!(
                        "sheet '{name}' data must be an array"
                    )));
                }
            };
            let records = rows
                .into_iter()
                .map(|row| match row {
                    JsonValue::Object(object) => Record::from_json_object(object),
                    _ => Err(DecodeError::Shape(format!(
                        "sheet '{name}' contains a row that is not an object"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RawTable { name, records })
        })
        .collect()
}

/// Empty cells are omitted from the record rather than stored as blanks.
pub fn decode_csv(bytes: &[u8], options: &DecodeOptions) -> Result<Vec<RawTable>, DecodeError> {
    let text = io_utils::decode_bytes(bytes, options.encoding)?;
    let mut reader = io_utils::open_csv_reader(text.as_bytes(), options.delimiter);
    let headers = reader.headers()?.clone();
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record = headers
            .iter()
            .zip(row.iter())
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(header, cell)| (header.to_string(), cell.to_string()))
            .collect::<Record>();
        if !record.is_empty() {
            records.push(record);
        }
    }
    Ok(vec![RawTable {
        name: options.table_name.clone(),
        records,
    }])
}

pub fn decode_cyoa(
    bytes: &[u8],
    encoding: &'static Encoding,
) -> Result<cyoa::Document, DecodeError> {
    let text = io_utils::decode_bytes(bytes, encoding)?;
    let raw: cyoa::RawDocument = serde_json::from_str(&text)?;
    Ok(cyoa::simplify(raw))
}
