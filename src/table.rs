//! Plain-text grids for terminal listings.

use std::fmt::Write as _;

use itertools::Itertools;

use crate::{
    collection::summary_label,
    normalize::GroupKind,
    sampler::RollResult,
    state::AppState,
};

/// Cells longer than this are cut and end in `...`.
const MAX_CELL_WIDTH: usize = 48;

pub fn render_grid(headers: &[&str], rows: &[Vec<String>]) -> String {
    let cells = rows
        .iter()
        .map(|row| row.iter().map(|cell| clean_cell(cell)).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let header_cells = headers.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", join_padded(&header_cells, &widths));
    let rule = widths.iter().map(|w| "-".repeat((*w).max(3))).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", join_padded(&rule, &widths));
    for row in &cells {
        let _ = writeln!(output, "{}", join_padded(row, &widths));
    }
    output
}

fn join_padded(cells: &[String], widths: &[usize]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn clean_cell(value: &str) -> String {
    let flat = value
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
        .collect::<String>();
    if flat.chars().count() > MAX_CELL_WIDTH {
        let cut = flat.chars().take(MAX_CELL_WIDTH - 3).collect::<String>();
        format!("{cut}...")
    } else {
        flat
    }
}

/// Every loaded group with its selection mark.
pub fn group_listing(state: &AppState) -> String {
    let rows = state
        .groups()
        .iter()
        .map(|group| {
            vec![
                if state.is_selected(&group.name) { "[x]" } else { "[ ]" }.to_string(),
                group.name.clone(),
                group.display_name(),
                match group.kind {
                    GroupKind::Sheet => "sheet",
                    GroupKind::CyoaRow => "cyoa-row",
                }
                .to_string(),
                group.records.len().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    render_grid(&["Sel", "Group", "Display", "Kind", "Records"], &rows)
}

/// Source fields of the selected groups with their mapped name and flags.
pub fn field_listing(state: &AppState) -> String {
    let mapping = state.mapping();
    let rows = state
        .source_fields()
        .iter()
        .map(|field| {
            let order = mapping
                .rule(field)
                .map(|rule| rule.order.to_string())
                .unwrap_or_default();
            let hidden = if mapping.is_hidden(field) { "yes" } else { "" };
            vec![
                field.clone(),
                mapping.target(field).to_string(),
                order,
                hidden.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    render_grid(&["Field", "Shown as", "Order", "Hidden"], &rows)
}

pub fn kept_listing(state: &AppState) -> String {
    let rows = state
        .kept()
        .items()
        .iter()
        .map(|item| {
            vec![
                item.id().unwrap_or("-").to_string(),
                item.group.clone(),
                summary_label(item, state.mapping()),
            ]
        })
        .collect::<Vec<_>>();
    render_grid(&["Id", "Group", "Item"], &rows)
}

/// One row per result, columns in display order followed by any other key
/// the results carry, hidden fields left out.
pub fn roll_listing(state: &AppState, results: &[RollResult]) -> String {
    if let [only] = results
        && only.is_no_match()
    {
        return format!("{}\n", only.record.get("error").map(|v| v.as_display()).unwrap_or_default());
    }
    let mapping = state.mapping();
    let extra = results
        .iter()
        .flat_map(|result| result.record.keys())
        .map(str::to_string);
    let columns = state
        .ordered_fields()
        .into_iter()
        .chain(extra)
        .filter(|field| !mapping.is_hidden(field))
        .unique()
        .collect::<Vec<_>>();
    let mut headers = vec!["Group"];
    headers.extend(columns.iter().map(String::as_str));
    let rows = results
        .iter()
        .map(|result| {
            let mut row = vec![result.group.clone()];
            row.extend(columns.iter().map(|field| {
                result
                    .record
                    .get(field)
                    .map(|value| value.as_display())
                    .unwrap_or_default()
            }));
            row
        })
        .collect::<Vec<_>>();
    render_grid(&headers, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{DecodeOptions, InputFormat, decode_groups};

    #[test]
    fn grid_aligns_and_trims_trailing_space() {
        let rendered = render_grid(
            &["Name", "Cost"],
            &[
                vec!["Flight".into(), "50".into()],
                vec!["Speed\nboost".into(), "".into()],
            ],
        );
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Name         Cost");
        assert_eq!(lines[1], "-----------  ----");
        assert_eq!(lines[2], "Flight       50");
        assert_eq!(lines[3], "Speed boost");
    }

    #[test]
    fn long_cells_are_cut() {
        let long = "x".repeat(80);
        let rendered = render_grid(&["A"], &[vec![long]]);
        let last = rendered.lines().last().unwrap();
        assert_eq!(last.chars().count(), MAX_CELL_WIDTH);
        assert!(last.ends_with("..."));
    }

    #[test]
    fn roll_listing_shows_keys_absent_from_the_first_record() {
        let options = DecodeOptions {
            format: InputFormat::Csv,
            table_name: "perks".into(),
            ..DecodeOptions::default()
        };
        let csv = "Name,Cost,Note\nFlight,50 CP,\nSpeed,,fast\n";
        let state = AppState::from_groups(decode_groups(csv.as_bytes(), &options).unwrap()).toggle_all();
        let text = roll_listing(&state, state.pool());
        let lines = text.lines().collect::<Vec<_>>();
        assert!(lines[0].contains("Note"));
        assert!(!lines[0].contains("_id"));
        assert!(lines[3].ends_with("fast"));
    }

    #[test]
    fn roll_listing_reports_no_match() {
        let state = AppState::default();
        let text = roll_listing(&state, &[RollResult::no_match()]);
        assert_eq!(text, "No items found matching your filters.\n");
    }
}
