//! Converts decoded tables and CYOA trees into uniform [`Group`]s.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    cyoa::{Document, Object},
    data::{ID_FIELD, Record, Value, generate_id},
};

static CHAPTER_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Chapter [0-9]+:?$").expect("valid chapter regex"));
static CHAPTER_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Chapter ([0-9]+)").expect("valid chapter regex"));

/// One decoded source table, before ids and descriptors are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub name: String,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupKind {
    Sheet,
    CyoaRow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: String,
    pub name: String,
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Source name; the selection key. Never edited.
    pub name: String,
    /// Display override set by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub kind: GroupKind,
    pub fields: Vec<FieldDescriptor>,
    pub records: Vec<Record>,
}

impl Group {
    pub fn display_name(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        match self.kind {
            GroupKind::Sheet => strip_chapter_prefix(&self.name),
            GroupKind::CyoaRow => self.name.trim().to_string(),
        }
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}

/// Drops the first `Chapter N:` that is followed by more text; a bare
/// chapter heading is returned unchanged.
pub fn strip_chapter_prefix(name: &str) -> String {
    if CHAPTER_ONLY.is_match(name) {
        return name.to_string();
    }
    match chapter_prefix_span(name) {
        Some((start, end)) => format!("{}{}", &name[..start], &name[end..])
            .trim()
            .to_string(),
        None => name.trim().to_string(),
    }
}

/// Span of `Chapter <digits>[:]<spaces>` that ends right before a
/// non-space character. Shorter digit runs and a skipped colon are tried
/// when the longest form is not followed by text.
fn chapter_prefix_span(name: &str) -> Option<(usize, usize)> {
    for captures in CHAPTER_NUMBER.captures_iter(name) {
        let (Some(whole), Some(digits)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        for digit_end in (digits.start() + 1..=digits.end()).rev() {
            let with_colon = name[digit_end..]
                .starts_with(':')
                .then_some(digit_end + 1);
            for after in with_colon.into_iter().chain([digit_end]) {
                let spaces = name[after..]
                    .chars()
                    .take_while(|c| c.is_whitespace())
                    .map(char::len_utf8)
                    .sum::<usize>();
                if after + spaces < name.len() {
                    return Some((whole.start(), after + spaces));
                }
            }
        }
    }
    None
}

/// One group per table. Descriptors come from the first record's keys, so an
/// empty table yields only the identifier descriptor.
pub fn normalize_tables(tables: Vec<RawTable>) -> Vec<Group> {
    tables
        .into_iter()
        .map(|table| {
            let records = table
                .records
                .into_iter()
                .map(|record| {
                    let mut with_id = record;
                    with_id.insert(ID_FIELD, generate_id());
                    with_id
                })
                .collect::<Vec<_>>();
            let group = Group {
                fields: describe_fields(records.first()),
                name: table.name,
                label: None,
                kind: GroupKind::Sheet,
                records,
            };
            debug!(
                "Normalized sheet '{}' with {} record(s) and {} field(s)",
                group.name,
                group.records.len(),
                group.fields.len()
            );
            group
        })
        .collect()
}

/// One group per CYOA row, one record per object. Object ids are reused as
/// record identifiers.
pub fn cyoa_groups(document: &Document) -> Vec<Group> {
    document
        .rows
        .iter()
        .map(|row| {
            let records = row.objects.iter().map(object_record).collect::<Vec<_>>();
            Group {
                name: row.id.clone(),
                label: Some(row.title.trim().to_string()),
                kind: GroupKind::CyoaRow,
                fields: describe_fields(records.first()),
                records,
            }
        })
        .collect()
}

fn describe_fields(first: Option<&Record>) -> Vec<FieldDescriptor> {
    let mut fields = first
        .map(|record| {
            record
                .keys()
                .filter(|key| *key != ID_FIELD)
                .enumerate()
                .map(|(order, name)| FieldDescriptor {
                    id: generate_id(),
                    name: name.to_string(),
                    order,
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    fields.push(FieldDescriptor {
        id: ID_FIELD.to_string(),
        name: ID_FIELD.to_string(),
        order: fields.len(),
    });
    fields
}

fn object_record(object: &Object) -> Record {
    let mut record = Record::new();
    record.insert(ID_FIELD, object.id.clone());
    record.insert("title", object.title.clone());
    let media = &object.media;
    if let Some(text) = &media.text {
        record.insert("text", text.clone());
    }
    if let Some(image) = &media.image {
        record.insert("image", image.clone());
    }
    if let Some(is_url) = media.image_is_url {
        record.insert("imageIsURL", Value::String(is_url.to_string()));
    }
    if let Some(link) = &media.image_link {
        record.insert("imageLink", link.clone());
    }
    if !object.addons.is_empty() {
        let titles = object
            .addons
            .iter()
            .map(|addon| addon.title.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        record.insert("addons", titles);
    }
    record
}
