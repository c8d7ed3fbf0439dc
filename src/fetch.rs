//! Remote document retrieval. One request, no retry, no timeout.

use log::{debug, info};
use reqwest::blocking::Client;

use crate::{decode::InputFormat, error::FetchError};

/// A published document that can be loaded by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredefinedDocument {
    pub name: &'static str,
    pub url: &'static str,
    pub description: &'static str,
    pub format: InputFormat,
}

pub const PREDEFINED_DOCUMENTS: &[PredefinedDocument] = &[PredefinedDocument {
    name: "Lt. Ouroumov's Worm CYOA V17",
    url: "https://raw.githubusercontent.com/ltouroumov/worm-cyoa-v6-fork/refs/heads/master/project-v17.json",
    description: "Form of the Interactive Worm CYOA V6 by Fae Witch.",
    format: InputFormat::Cyoa,
}];

/// Case-insensitive lookup by name, or by position starting at 1.
pub fn find_predefined(key: &str) -> Option<&'static PredefinedDocument> {
    let key = key.trim();
    if let Ok(position) = key.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|idx| PREDEFINED_DOCUMENTS.get(idx));
    }
    PREDEFINED_DOCUMENTS
        .iter()
        .find(|doc| doc.name.eq_ignore_ascii_case(key))
}

pub fn fetch_bytes(url: &str) -> Result<Vec<u8>, FetchError> {
    let request_error = |source| FetchError::Request {
        url: url.to_string(),
        source,
    };
    info!("Fetching {url}");
    let client = Client::builder()
        .timeout(None)
        .build()
        .map_err(request_error)?;
    let response = client.get(url).send().map_err(request_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = response.bytes().map_err(request_error)?;
    debug!("Fetched {} byte(s) from {url}", body.len());
    Ok(body.to_vec())
}
