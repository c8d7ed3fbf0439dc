//! Field rename/reorder/hide overlay.
//!
//! Source records are never touched; [`FieldMapping::apply`] and
//! [`FieldMapping::replay_changes`] build new records. Two merge rules live
//! side by side here and are kept deliberately distinct:
//!
//! - `set_mapping` is last-write-wins per source field.
//! - `apply` is first-write-wins when two sources land on one target.

use std::cmp::Reverse;

use chrono::Utc;
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::{ID_FIELD, Record, generate_id};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    pub from: String,
    pub to: String,
    pub order: usize,
}

/// One rename event in the change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub id: String,
    pub from: String,
    pub to: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(default)]
    pub rules: Vec<MappingRule>,
    #[serde(default = "default_hidden")]
    pub hidden: Vec<String>,
    #[serde(default)]
    pub changes: Vec<FieldChange>,
}

fn default_hidden() -> Vec<String> {
    vec![ID_FIELD.to_string()]
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            hidden: default_hidden(),
            changes: Vec::new(),
        }
    }
}

impl FieldMapping {
    pub fn rule(&self, source: &str) -> Option<&MappingRule> {
        self.rules.iter().find(|rule| rule.from == source)
    }

    /// Display name for `source`, falling back to the source name itself.
    pub fn target<'a>(&'a self, source: &'a str) -> &'a str {
        self.rule(source).map(|rule| rule.to.as_str()).unwrap_or(source)
    }

    /// Maps `source` to `target` at `order`. An empty target maps the field to
    /// itself. The change log keeps one entry per renamed source.
    pub fn set_mapping(&self, source: &str, target: &str, order: usize) -> Self {
        let target = if target.is_empty() { source } else { target };
        let mut next = self.clone();
        let rule = MappingRule {
            from: source.to_string(),
            to: target.to_string(),
            order,
        };
        match next.rules.iter_mut().find(|r| r.from == source) {
            Some(existing) => *existing = rule,
            None => next.rules.push(rule),
        }

        next.changes
            .retain(|change| change.from != source || change.to == target);
        let already_logged = next
            .changes
            .iter()
            .any(|change| change.from == source && change.to == target);
        if source != target && !already_logged {
            let timestamp = next.next_timestamp();
            debug!("Logging rename '{source}' -> '{target}' at {timestamp}");
            next.changes.push(FieldChange {
                id: generate_id(),
                from: source.to_string(),
                to: target.to_string(),
                timestamp,
            });
        }
        next
    }

    /// Wall-clock milliseconds, bumped past the newest logged change so replay
    /// order never depends on clock resolution.
    fn next_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        match self.changes.iter().map(|c| c.timestamp).max() {
            Some(latest) if latest >= now => latest + 1,
            _ => now,
        }
    }

    pub fn set_hidden(&self, field: &str, hidden: bool) -> Self {
        let mut next = self.clone();
        next.hidden.retain(|name| name != field);
        if hidden {
            next.hidden.push(field.to_string());
        }
        next
    }

    /// True when `name` is hidden directly or is the target of a hidden source.
    pub fn is_hidden(&self, name: &str) -> bool {
        self.hidden.iter().any(|h| h == name)
            || self
                .rules
                .iter()
                .any(|rule| rule.to == name && self.hidden.iter().any(|h| *h == rule.from))
    }

    pub fn sorted_rules(&self) -> Vec<&MappingRule> {
        self.rules.iter().sorted_by_key(|rule| rule.order).collect()
    }

    /// Copy with rules in ascending declared order.
    pub fn sorted(&self) -> Self {
        Self {
            rules: self.sorted_rules().into_iter().cloned().collect(),
            hidden: self.hidden.clone(),
            changes: self.changes.clone(),
        }
    }

    /// Renames every field. Unmapped fields and the identifier pass through;
    /// when two sources share a target the earlier field keeps it.
    pub fn apply(&self, record: &Record) -> Record {
        let mut mapped = Record::new();
        for (key, value) in record.iter() {
            let target = if key == ID_FIELD { key } else { self.target(key) };
            if !mapped.contains_key(target) {
                mapped.insert(target, value.clone());
            }
        }
        mapped
    }

    /// Mapped targets first by declared order, remaining fields after them in
    /// their current order.
    pub fn reorder(&self, record: Record) -> Record {
        let mut ordered = Record::new();
        for rule in self.sorted_rules() {
            if ordered.contains_key(&rule.to) {
                continue;
            }
            if let Some(value) = record.get(&rule.to) {
                ordered.insert(rule.to.clone(), value.clone());
            }
        }
        for (key, value) in record {
            if !ordered.contains_key(&key) {
                ordered.insert(key, value);
            }
        }
        ordered
    }

    /// Display field list for the given source fields.
    pub fn ordered_fields(&self, source_fields: &[String]) -> Vec<String> {
        let mapped = self
            .sorted_rules()
            .into_iter()
            .filter(|rule| source_fields.contains(&rule.from))
            .map(|rule| rule.to.clone());
        let unmapped = source_fields
            .iter()
            .filter(|field| self.rule(field).is_none())
            .cloned();
        mapped.chain(unmapped).unique().collect()
    }

    /// Reapplies the change log to a source record. Per target the newest
    /// change whose source field is present wins. Values are always read
    /// from `record` itself, so chained and swapped renames see the original
    /// values. The identifier stays put, as in [`FieldMapping::apply`].
    pub fn replay_changes(&self, record: &Record) -> Record {
        let winners = self
            .changes
            .iter()
            .map(|c| c.to.as_str())
            .unique()
            .filter_map(|target| {
                self.changes
                    .iter()
                    .filter(|change| change.to == target && change.from != ID_FIELD)
                    .sorted_by_key(|change| Reverse(change.timestamp))
                    .find(|change| record.contains_key(&change.from))
            })
            .collect::<Vec<_>>();
        debug!("Replaying {} winning change(s)", winners.len());

        let winner_for = |key: &str| winners.iter().find(|change| change.to == key);
        let mut replayed = Record::new();
        for (key, value) in record.iter() {
            match winner_for(key) {
                Some(change) => {
                    if let Some(source) = record.get(&change.from) {
                        replayed.insert(key, source.clone());
                    }
                }
                None if winners.iter().any(|change| change.from == key) => {}
                None => replayed.insert(key, value.clone()),
            }
        }
        for change in &winners {
            if !replayed.contains_key(&change.to) {
                if let Some(source) = record.get(&change.from) {
                    replayed.insert(change.to.clone(), source.clone());
                }
            }
        }
        replayed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    #[test]
    fn set_mapping_is_last_write_wins() {
        let mapping = FieldMapping::default()
            .set_mapping("Cost", "Price", 1)
            .set_mapping("Cost", "Points", 2);
        assert_eq!(mapping.rules.len(), 1);
        assert_eq!(mapping.target("Cost"), "Points");
        assert_eq!(mapping.changes.len(), 1);
        assert_eq!(mapping.changes[0].to, "Points");
    }

    #[test]
    fn set_mapping_keeps_timestamp_of_unchanged_rename() {
        let first = FieldMapping::default().set_mapping("Cost", "Price", 1);
        let again = first.set_mapping("Cost", "Price", 3);
        assert_eq!(first.changes, again.changes);
        assert_eq!(again.rule("Cost").unwrap().order, 3);
        let reset = again.set_mapping("Cost", "", 3);
        assert!(reset.changes.is_empty());
        assert_eq!(reset.target("Cost"), "Cost");
    }

    #[test]
    fn timestamps_strictly_increase() {
        let mapping = FieldMapping::default()
            .set_mapping("A", "X", 0)
            .set_mapping("B", "X", 1)
            .set_mapping("C", "Y", 2);
        let stamps = mapping.changes.iter().map(|c| c.timestamp).collect::<Vec<_>>();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn apply_is_first_write_wins_on_collision() {
        let mapping = FieldMapping::default()
            .set_mapping("Cost", "Price", 0)
            .set_mapping("Points", "Price", 1);
        let mapped = mapping.apply(&record(&[("Cost", "10"), ("Points", "20"), ("Name", "x")]));
        assert_eq!(mapped.get("Price"), Some(&Value::from("10")));
        assert_eq!(mapped.keys().collect::<Vec<_>>(), vec!["Price", "Name"]);
    }

    #[test]
    fn apply_never_renames_identifier() {
        let mapping = FieldMapping::default().set_mapping(ID_FIELD, "Key", 0);
        let mapped = mapping.apply(&record(&[(ID_FIELD, "abc")]));
        assert_eq!(mapped.id(), Some("abc"));
    }

    #[test]
    fn ordered_fields_puts_unmapped_fields_last() {
        let mapping = FieldMapping::default()
            .set_mapping("B", "Beta", 0)
            .set_mapping("A", "Alpha", 1);
        let sources = vec!["A".to_string(), "C".to_string(), "B".to_string()];
        assert_eq!(mapping.ordered_fields(&sources), vec!["Beta", "Alpha", "C"]);
    }

    #[test]
    fn replay_prefers_latest_change_with_present_source() {
        let mapping = FieldMapping::default()
            .set_mapping("Cost", "Price", 0)
            .set_mapping("Points", "Price", 1);
        let both = mapping.replay_changes(&record(&[("Cost", "10"), ("Points", "20")]));
        assert_eq!(both.get("Price"), Some(&Value::from("20")));
        assert!(both.contains_key("Cost"));
        assert!(!both.contains_key("Points"));

        let only_cost = mapping.replay_changes(&record(&[("Cost", "10")]));
        assert_eq!(only_cost.get("Price"), Some(&Value::from("10")));
        assert!(!only_cost.contains_key("Cost"));
    }

    #[test]
    fn replay_reads_original_values_for_swaps_and_chains() {
        let swap = FieldMapping::default()
            .set_mapping("A", "B", 0)
            .set_mapping("B", "A", 1);
        let original = record(&[("A", "a"), ("B", "b")]);
        let replayed = swap.replay_changes(&original);
        assert_eq!(replayed.get("A"), Some(&Value::from("b")));
        assert_eq!(replayed.get("B"), Some(&Value::from("a")));
        assert_eq!(swap.reorder(replayed), swap.reorder(swap.apply(&original)));

        let chain = FieldMapping::default()
            .set_mapping("A", "B", 0)
            .set_mapping("B", "C", 1);
        let replayed = chain.replay_changes(&original);
        assert_eq!(replayed.keys().collect::<Vec<_>>(), vec!["B", "C"]);
        assert_eq!(replayed.get("C"), Some(&Value::from("b")));
    }

    #[test]
    fn reorder_follows_declared_order() {
        let mapping = FieldMapping::default()
            .set_mapping("Name", "Name", 1)
            .set_mapping("Cost", "Price", 0);
        let reordered = mapping.reorder(record(&[("Extra", "e"), ("Name", "n"), ("Price", "p")]));
        assert_eq!(reordered.keys().collect::<Vec<_>>(), vec!["Price", "Name", "Extra"]);
    }

    #[test]
    fn hidden_follows_renamed_targets() {
        let mapping = FieldMapping::default()
            .set_mapping("Cost", "Price", 0)
            .set_hidden("Cost", true);
        assert!(mapping.is_hidden("Price"));
        assert!(mapping.is_hidden(ID_FIELD));
        assert!(!mapping.set_hidden("Cost", false).is_hidden("Price"));
    }
}
