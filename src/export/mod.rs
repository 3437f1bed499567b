use std::collections::HashMap;

use thiserror::Error;

use crate::records::RecordSet;
use crate::state::AppState;

/// Which part of the selection the export covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportScope {
    /// Every group, in group-list order.
    AllGroups,
    /// Only the active group's section.
    ActiveGroup,
}

impl ExportScope {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "all" | "all-groups" => Some(Self::AllGroups),
            "active" | "active-group" => Some(Self::ActiveGroup),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no records are selected")]
    NothingSelected,

    #[error("failed to copy to clipboard: {message}")]
    Clipboard { message: String },
}

/// Render the grouped export text: one `--- {group} ---` section per
/// non-empty group in group-list order, with deduplicated
/// `"{name} - {address}"` lines. Selected ids without a membership entry
/// fall back to the active group (state written before tagging existed).
pub fn build_text(
    state: &AppState,
    records: &RecordSet,
    scope: ExportScope,
) -> Result<String, ExportError> {
    if state.selection.is_empty() {
        return Err(ExportError::NothingSelected);
    }

    let mut by_group: HashMap<&str, Vec<String>> = HashMap::new();
    for &id in state.selection.iter() {
        let record = match records.find_by_id(id) {
            Some(record) => record,
            None => continue,
        };
        let line = format!("{} - {}", record.name, record.address);
        for group in state.tags_for(id) {
            if scope == ExportScope::ActiveGroup && group != state.active_group {
                continue;
            }
            let group = match state.groups.iter().find(|g| **g == group) {
                Some(group) => group.as_str(),
                None => continue,
            };
            let lines = by_group.entry(group).or_default();
            if !lines.contains(&line) {
                lines.push(line.clone());
            }
        }
    }

    let mut out = String::new();
    for group in state.groups.iter() {
        if let Some(lines) = by_group.get(group.as_str()) {
            out.push_str(&format!("\n--- {} ---\n", group));
            out.push_str(&lines.join("\n"));
            out.push('\n');
        }
    }
    Ok(out.trim().to_string())
}

/// Hand the export text to the system clipboard.
pub fn copy_to_clipboard(text: &str) -> Result<(), ExportError> {
    let mut clipboard = arboard::Clipboard::new().map_err(|e| ExportError::Clipboard {
        message: e.to_string(),
    })?;
    clipboard
        .set_text(text.to_string())
        .map_err(|e| ExportError::Clipboard {
            message: e.to_string(),
        })
}
