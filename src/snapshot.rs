//! Portable session documents.
//!
//! A snapshot carries the source groups, the selection, the mapping with its
//! change log, kept items, and saved filters. Importing rebuilds the pool by
//! replaying the change log against the source records instead of reusing
//! the live mapping path.

use std::{
    collections::HashSet,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    collection::KeptCollection,
    error::SnapshotError,
    filter::FilterSpec,
    mapping::FieldMapping,
    normalize::Group,
    sampler::RollResult,
    state::AppState,
};

pub const SNAPSHOT_VERSION: u32 = 1;

fn current_version() -> u32 {
    SNAPSHOT_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub selected_groups: Vec<String>,
    #[serde(default)]
    pub mapping: FieldMapping,
    #[serde(default)]
    pub kept_items: KeptCollection,
    pub source_groups: Vec<Group>,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
}

impl Snapshot {
    pub fn export(state: &AppState) -> Self {
        info!(
            "Exporting snapshot with {} group(s) and {} kept item(s)",
            state.groups.len(),
            state.kept.len()
        );
        Self {
            version: SNAPSHOT_VERSION,
            selected_groups: state.selected.clone(),
            mapping: state.mapping.clone(),
            kept_items: state.kept.clone(),
            source_groups: state.groups.clone(),
            filters: state.filters.clone(),
        }
    }

    /// Rebuilds a working state. Nothing is returned unless the whole
    /// document checks out.
    pub fn import(&self) -> Result<AppState, SnapshotError> {
        self.validate()?;
        let mapping = self.mapping.sorted();
        let selected: HashSet<&str> = self.selected_groups.iter().map(String::as_str).collect();

        let mut pool = Vec::new();
        for group in self
            .source_groups
            .iter()
            .filter(|group| selected.contains(group.name.as_str()))
        {
            let display = group.display_name();
            for record in &group.records {
                let replayed = mapping.replay_changes(record);
                pool.push(RollResult::new(mapping.reorder(replayed), display.clone()));
            }
        }
        debug!(
            "Replayed {} change(s) over {} pooled record(s)",
            mapping.changes.len(),
            pool.len()
        );
        info!(
            "Imported snapshot: {} group(s), {} selected, {} kept",
            self.source_groups.len(),
            self.selected_groups.len(),
            self.kept_items.len()
        );

        Ok(AppState {
            groups: self.source_groups.clone(),
            selected: self.selected_groups.clone(),
            mapping,
            kept: self.kept_items.clone(),
            filters: self.filters.clone(),
            pool,
        })
    }

    fn validate(&self) -> Result<(), SnapshotError> {
        if self.version > SNAPSHOT_VERSION {
            return Err(SnapshotError::Invalid(format!(
                "unsupported version {} (newest known is {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        let mut names = HashSet::new();
        for group in &self.source_groups {
            if !names.insert(group.name.as_str()) {
                return Err(SnapshotError::Invalid(format!(
                    "duplicate group '{}'",
                    group.name
                )));
            }
        }
        if let Some(missing) = self
            .selected_groups
            .iter()
            .find(|name| !names.contains(name.as_str()))
        {
            return Err(SnapshotError::Invalid(format!(
                "selected group '{missing}' is not among the source groups"
            )));
        }
        if self.mapping.rules.iter().any(|rule| rule.from.is_empty()) {
            return Err(SnapshotError::Invalid(
                "mapping rule with an empty source field".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        debug!("Snapshot written to {path:?}");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
