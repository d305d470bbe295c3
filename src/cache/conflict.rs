//! Output conflict detection: one output file claimed by several assets.

use rustc_hash::FxHashMap;

use super::AssetRecord;
use crate::log;
use crate::utils::plural_s;

/// An output claimed by more than one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConflict {
    pub output: String,
    /// Resource names of the claiming assets, sorted.
    pub claimants: Vec<String>,
}

/// Find outputs with more than one claimant. Removed records are ignored.
pub fn detect_conflicts<'a, I>(records: I) -> Vec<OutputConflict>
where
    I: IntoIterator<Item = &'a AssetRecord>,
{
    let mut claims: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    for record in records.into_iter().filter(|r| !r.removed) {
        for output in &record.outputs {
            claims
                .entry(output.as_str())
                .or_default()
                .push(record.resource_name.as_str());
        }
    }

    let mut conflicts: Vec<OutputConflict> = claims
        .into_iter()
        .filter(|(_, claimants)| claimants.len() > 1)
        .map(|(output, claimants)| {
            let mut claimants: Vec<String> = claimants.into_iter().map(str::to_string).collect();
            claimants.sort();
            OutputConflict {
                output: output.to_string(),
                claimants,
            }
        })
        .collect();
    conflicts.sort_by(|a, b| a.output.cmp(&b.output));
    conflicts
}

/// Print conflicts using the standard log format.
///
/// ```text
/// [conflict] shared outputs (1 output, 2 assets)
///   atlas/ui.png
///     - ui/a.png
///     - ui/b.png
/// ```
pub fn print_conflicts(conflicts: &[OutputConflict]) {
    if conflicts.is_empty() {
        return;
    }

    let total: usize = conflicts.iter().map(|c| c.claimants.len()).sum();
    log!("conflict"; "shared outputs ({} output{}, {} asset{})",
        conflicts.len(), plural_s(conflicts.len()),
        total, plural_s(total));
    for conflict in conflicts {
        eprintln!("{}", format_conflict(conflict));
    }
}

fn format_conflict(conflict: &OutputConflict) -> String {
    let mut lines = vec![format!("  {}", conflict.output)];
    for claimant in &conflict.claimants {
        lines.push(format!("    - {claimant}"));
    }
    lines.join("\n")
}
