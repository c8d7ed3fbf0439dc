use serde::{Deserialize, Serialize};

use crate::{mapping::FieldMapping, sampler::RollResult};

/// Roll results the user chose to keep, in the order they were kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeptCollection {
    items: Vec<RollResult>,
}

impl KeptCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<RollResult>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[RollResult] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Membership by record id; records without one compare by value.
    pub fn contains(&self, result: &RollResult) -> bool {
        match result.id() {
            Some(id) => self.items.iter().any(|kept| kept.id() == Some(id)),
            None => self
                .items
                .iter()
                .any(|kept| kept.id().is_none() && kept == result),
        }
    }

    pub fn find(&self, id: &str) -> Option<&RollResult> {
        self.items.iter().find(|kept| kept.id() == Some(id))
    }

    /// The no-match result and results already kept are ignored.
    pub fn keep(&self, result: RollResult) -> Self {
        let mut next = self.clone();
        if !result.is_no_match() && !self.contains(&result) {
            next.items.push(result);
        }
        next
    }

    pub fn remove(&self, id: &str) -> Self {
        Self {
            items: self
                .items
                .iter()
                .filter(|kept| kept.id() != Some(id))
                .cloned()
                .collect(),
        }
    }
}

/// Short label for a kept item: the first visible `name`-like field, then
/// the first visible `cost`/`price`-like field in parentheses.
pub fn summary_label(result: &RollResult, mapping: &FieldMapping) -> String {
    let visible = |key: &&str| !mapping.is_hidden(key);
    let record = &result.record;
    let name = record
        .keys()
        .filter(visible)
        .find(|key| key.to_lowercase().contains("name"))
        .and_then(|key| record.get(key));
    let cost = record
        .keys()
        .filter(visible)
        .find(|key| {
            let lowered = key.to_lowercase();
            lowered.contains("cost") || lowered.contains("price")
        })
        .and_then(|key| record.get(key));

    let mut label = match name {
        Some(value) => value.as_display(),
        None => format!("Item from {}", result.group),
    };
    if let Some(cost) = cost {
        label.push_str(&format!(" ({})", cost.as_display()));
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ID_FIELD, Record};

    fn result(id: &str, name: &str) -> RollResult {
        let record: Record = [(ID_FIELD, id), ("Name", name), ("Cost", "50 CP")]
            .into_iter()
            .collect();
        RollResult::new(record, "Perks")
    }

    #[test]
    fn keep_ignores_duplicates_and_sentinel() {
        let kept = KeptCollection::new()
            .keep(result("a", "Flight"))
            .keep(result("a", "Flight (renamed)"))
            .keep(RollResult::no_match())
            .keep(result("b", "Speed"));
        assert_eq!(kept.len(), 2);
        assert!(kept.contains(&result("a", "anything")));
    }

    #[test]
    fn remove_filters_by_id() {
        let kept = KeptCollection::new()
            .keep(result("a", "Flight"))
            .keep(result("b", "Speed"));
        let after = kept.remove("a");
        assert_eq!(after.len(), 1);
        assert_eq!(after.items()[0].id(), Some("b"));
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn records_without_ids_compare_by_value() {
        let plain: Record = [("Name", "Flight")].into_iter().collect();
        let kept = KeptCollection::new().keep(RollResult::new(plain.clone(), "Perks"));
        assert!(kept.contains(&RollResult::new(plain, "Perks")));
    }

    #[test]
    fn summary_label_uses_visible_name_and_cost() {
        let mapping = FieldMapping::default();
        assert_eq!(summary_label(&result("a", "Flight"), &mapping), "Flight (50 CP)");
        let hidden = mapping.set_hidden("Name", true);
        assert_eq!(
            summary_label(&result("a", "Flight"), &hidden),
            "Item from Perks (50 CP)"
        );
    }
}
