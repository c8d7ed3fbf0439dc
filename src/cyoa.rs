//! Nested CYOA documents: rows hold objects, objects hold addons.
//!
//! The raw (`Raw*`) types accept whatever an exported project file carries;
//! [`simplify`] turns them into the fully-populated tree the roller works
//! on. Declared ids are trusted verbatim, missing ones are generated.

use serde::{Deserialize, Serialize};

use crate::data::generate_id;

pub const UNTITLED_ROW: &str = "Untitled Row";
pub const UNTITLED_OBJECT: &str = "Untitled Object";
pub const UNTITLED_ADDON: &str = "Untitled Addon";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub rows: Option<Vec<RawRow>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRow {
    pub id: Option<String>,
    pub title: Option<String>,
    pub title_text: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
    #[serde(rename = "imageIsURL")]
    pub image_is_url: Option<bool>,
    pub image_link: Option<String>,
    pub objects: Option<Vec<RawObject>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObject {
    pub id: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
    #[serde(rename = "imageIsURL")]
    pub image_is_url: Option<bool>,
    pub image_link: Option<String>,
    pub addons: Option<Vec<RawAddon>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAddon {
    pub id: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
    #[serde(rename = "imageIsURL")]
    pub image_is_url: Option<bool>,
    pub image_link: Option<String>,
}

/// Presentation fields shared by rows, objects, and addons.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(rename = "imageIsURL", skip_serializing_if = "Option::is_none")]
    pub image_is_url: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub media: Media,
    pub objects: Vec<Object>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub media: Media,
    pub addons: Vec<Addon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Addon {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub media: Media,
}

pub fn simplify(raw: RawDocument) -> Document {
    let rows = raw
        .rows
        .unwrap_or_default()
        .into_iter()
        .map(simplify_row)
        .collect();
    Document { rows }
}

fn simplify_row(row: RawRow) -> Row {
    let title = non_empty(row.title)
        .or_else(|| non_empty(row.title_text))
        .unwrap_or_else(|| UNTITLED_ROW.to_string());
    Row {
        id: id_or_generate(row.id),
        title,
        media: Media {
            text: row.text,
            image: row.image,
            image_is_url: row.image_is_url,
            image_link: row.image_link,
        },
        objects: row
            .objects
            .unwrap_or_default()
            .into_iter()
            .map(simplify_object)
            .collect(),
    }
}

fn simplify_object(object: RawObject) -> Object {
    Object {
        id: id_or_generate(object.id),
        title: non_empty(object.title).unwrap_or_else(|| UNTITLED_OBJECT.to_string()),
        media: Media {
            text: object.text,
            image: object.image,
            image_is_url: object.image_is_url,
            image_link: object.image_link,
        },
        addons: object
            .addons
            .unwrap_or_default()
            .into_iter()
            .map(simplify_addon)
            .collect(),
    }
}

fn simplify_addon(addon: RawAddon) -> Addon {
    Addon {
        id: id_or_generate(addon.id),
        title: non_empty(addon.title).unwrap_or_else(|| UNTITLED_ADDON.to_string()),
        media: Media {
            text: addon.text,
            image: addon.image,
            image_is_url: addon.image_is_url,
            image_link: addon.image_link,
        },
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn id_or_generate(id: Option<String>) -> String {
    non_empty(id).unwrap_or_else(generate_id)
}
