//! Page Operation Planner
//!
//! Tracks the planned output page sequence (source page + rotation), the
//! selection set over that sequence and the split range specs, and compiles
//! them into [`TransformJob`]s. Pure state: no I/O happens here.
//!
//! Every operation validates before it mutates, so a failed call leaves the
//! planner exactly as it was.

use crate::job::{CompileMode, EntryJob, RangeJob, compile_range_job};
use crate::types::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
enum PlannerState {
    #[default]
    Unloaded,
    Loaded(LoadedPlan),
}

#[derive(Debug, Clone)]
struct LoadedPlan {
    page_count: usize,
    entries: Vec<PageEntry>,
    /// Positions into `entries`
    selection: BTreeSet<usize>,
    ranges: Vec<RangeSpec>,
}

impl LoadedPlan {
    fn check_position(&self, position: usize) -> Result<()> {
        if position >= self.entries.len() {
            return Err(PlannerError::OutOfRange {
                index: position,
                len: self.entries.len(),
            });
        }
        Ok(())
    }

    fn check_range_slot(&self, slot: usize) -> Result<()> {
        if slot >= self.ranges.len() {
            return Err(PlannerError::OutOfRange {
                index: slot,
                len: self.ranges.len(),
            });
        }
        Ok(())
    }

    /// Structural mutations invalidate every selected position.
    fn structural_change(&mut self) {
        self.selection.clear();
    }
}

/// Snapshot of an entry sequence that can be stored and re-applied
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PagePlan {
    pub page_count: usize,
    pub entries: Vec<PageEntry>,
}

impl PagePlan {
    /// Load a plan from a JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| PlannerError::Config(format!("Failed to parse page plan: {}", e)))
    }

    /// Save the plan to a JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PlannerError::Config(format!("Failed to serialize page plan: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PagePlanner {
    state: PlannerState,
}

impl PagePlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh plan for a document with `page_count` pages.
    ///
    /// Replaces any previous plan, selection and range specs.
    pub fn initialize(&mut self, page_count: usize) -> Result<()> {
        if page_count == 0 {
            return Err(PlannerError::InvalidInput(
                "Page count must be positive".to_string(),
            ));
        }

        self.state = PlannerState::Loaded(LoadedPlan {
            page_count,
            entries: (0..page_count).map(PageEntry::new).collect(),
            selection: BTreeSet::new(),
            ranges: Vec::new(),
        });
        log::debug!("Planner initialized with {} pages", page_count);
        Ok(())
    }

    /// Back to the Unloaded state
    pub fn reset(&mut self) {
        self.state = PlannerState::Unloaded;
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, PlannerState::Loaded(_))
    }

    fn loaded(&self) -> Result<&LoadedPlan> {
        match &self.state {
            PlannerState::Loaded(plan) => Ok(plan),
            PlannerState::Unloaded => Err(PlannerError::Unloaded),
        }
    }

    fn loaded_mut(&mut self) -> Result<&mut LoadedPlan> {
        match &mut self.state {
            PlannerState::Loaded(plan) => Ok(plan),
            PlannerState::Unloaded => Err(PlannerError::Unloaded),
        }
    }

    pub fn page_count(&self) -> Result<usize> {
        Ok(self.loaded()?.page_count)
    }

    pub fn entries(&self) -> Result<&[PageEntry]> {
        Ok(&self.loaded()?.entries)
    }

    /// Selected positions in ascending order
    pub fn selection(&self) -> Result<Vec<usize>> {
        Ok(self.loaded()?.selection.iter().copied().collect())
    }

    pub fn is_selected(&self, position: usize) -> Result<bool> {
        Ok(self.loaded()?.selection.contains(&position))
    }

    pub fn ranges(&self) -> Result<&[RangeSpec]> {
        Ok(&self.loaded()?.ranges)
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    pub fn toggle_select(&mut self, position: usize) -> Result<()> {
        let plan = self.loaded_mut()?;
        plan.check_position(position)?;

        if !plan.selection.remove(&position) {
            plan.selection.insert(position);
        }
        Ok(())
    }

    pub fn select_all(&mut self) -> Result<()> {
        let plan = self.loaded_mut()?;
        plan.selection = (0..plan.entries.len()).collect();
        Ok(())
    }

    pub fn clear_selection(&mut self) -> Result<()> {
        self.loaded_mut()?.selection.clear();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Entry sequence
    // -------------------------------------------------------------------------

    pub fn rotate_entry(&mut self, position: usize, delta_degrees: i64) -> Result<()> {
        let plan = self.loaded_mut()?;
        plan.check_position(position)?;

        let entry = &mut plan.entries[position];
        entry.rotation = entry.rotation.rotated_by(delta_degrees)?;
        Ok(())
    }

    /// Rotate every entry by the same delta
    pub fn rotate_all(&mut self, delta_degrees: i64) -> Result<()> {
        let plan = self.loaded_mut()?;
        Rotation::from_degrees(delta_degrees)?;

        for entry in &mut plan.entries {
            entry.rotation = entry.rotation.rotated_by(delta_degrees)?;
        }
        Ok(())
    }

    pub fn remove_entry(&mut self, position: usize) -> Result<PageEntry> {
        let plan = self.loaded_mut()?;
        plan.check_position(position)?;

        let removed = plan.entries.remove(position);
        plan.structural_change();
        Ok(removed)
    }

    /// Move the entry at `from` so that it ends up at `to`
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let plan = self.loaded_mut()?;
        plan.check_position(from)?;
        plan.check_position(to)?;

        if from == to {
            return Ok(());
        }

        let entry = plan.entries.remove(from);
        plan.entries.insert(to, entry);
        plan.structural_change();
        Ok(())
    }

    /// Insert a copy of the entry right after it
    pub fn duplicate_entry(&mut self, position: usize) -> Result<()> {
        let plan = self.loaded_mut()?;
        plan.check_position(position)?;

        let entry = plan.entries[position];
        plan.entries.insert(position + 1, entry);
        plan.structural_change();
        Ok(())
    }

    /// Replace the entry sequence with a stored plan
    pub fn load_plan(&mut self, page_plan: &PagePlan) -> Result<()> {
        let plan = self.loaded_mut()?;

        if page_plan.page_count != plan.page_count {
            return Err(PlannerError::InvalidInput(format!(
                "Plan was made for {} pages but the document has {}",
                page_plan.page_count, plan.page_count
            )));
        }
        if let Some(bad) = page_plan
            .entries
            .iter()
            .find(|entry| entry.source_index >= plan.page_count)
        {
            return Err(PlannerError::OutOfRange {
                index: bad.source_index,
                len: plan.page_count,
            });
        }

        plan.entries = page_plan.entries.clone();
        plan.structural_change();
        Ok(())
    }

    pub fn snapshot(&self) -> Result<PagePlan> {
        let plan = self.loaded()?;
        Ok(PagePlan {
            page_count: plan.page_count,
            entries: plan.entries.clone(),
        })
    }

    // -------------------------------------------------------------------------
    // Range specs
    // -------------------------------------------------------------------------

    pub fn add_range(&mut self, spec: RangeSpec) -> Result<()> {
        let plan = self.loaded_mut()?;
        spec.validate()?;
        plan.ranges.push(spec);
        Ok(())
    }

    pub fn update_range(&mut self, slot: usize, spec: RangeSpec) -> Result<()> {
        let plan = self.loaded_mut()?;
        plan.check_range_slot(slot)?;
        spec.validate()?;
        plan.ranges[slot] = spec;
        Ok(())
    }

    pub fn remove_range(&mut self, slot: usize) -> Result<RangeSpec> {
        let plan = self.loaded_mut()?;
        plan.check_range_slot(slot)?;
        Ok(plan.ranges.remove(slot))
    }

    pub fn set_ranges(&mut self, specs: Vec<RangeSpec>) -> Result<()> {
        let plan = self.loaded_mut()?;
        specs.iter().try_for_each(RangeSpec::validate)?;
        plan.ranges = specs;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Compilation
    // -------------------------------------------------------------------------

    pub fn compile_entry_job(&self, mode: CompileMode) -> Result<EntryJob> {
        let plan = self.loaded()?;

        if mode == CompileMode::KeepSelected && plan.selection.is_empty() {
            return Err(PlannerError::EmptySelection);
        }

        let keep_selected = mode == CompileMode::KeepSelected;
        let entries = plan
            .entries
            .iter()
            .enumerate()
            .filter(|(position, _)| plan.selection.contains(position) == keep_selected)
            .map(|(_, entry)| *entry)
            .collect::<Vec<_>>();

        log::debug!(
            "Compiled entry job ({:?}): {} of {} entries",
            mode,
            entries.len(),
            plan.entries.len()
        );
        Ok(EntryJob::new(entries))
    }

    /// The whole current sequence, selection ignored
    pub fn compile_plan(&self) -> Result<EntryJob> {
        Ok(EntryJob::new(self.loaded()?.entries.clone()))
    }

    /// Compile the stored range specs against the loaded page count
    pub fn compile_ranges(&self, merge_ranges: bool) -> Result<RangeJob> {
        let plan = self.loaded()?;
        compile_range_job(&plan.ranges, merge_ranges, plan.page_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unloaded_rejects_everything_but_initialize() {
        let mut planner = PagePlanner::new();
        assert!(matches!(planner.toggle_select(0), Err(PlannerError::Unloaded)));
        assert!(matches!(planner.entries(), Err(PlannerError::Unloaded)));
        assert!(matches!(
            planner.compile_entry_job(CompileMode::DropSelected),
            Err(PlannerError::Unloaded)
        ));
        assert!(planner.initialize(2).is_ok());
        assert!(planner.is_loaded());
    }

    #[test]
    fn test_rotate_all_rejects_before_mutating() {
        let mut planner = PagePlanner::new();
        planner.initialize(3).unwrap();
        planner.rotate_entry(1, 90).unwrap();

        assert!(planner.rotate_all(45).is_err());
        let rotations: Vec<i32> = planner
            .entries()
            .unwrap()
            .iter()
            .map(|e| e.rotation.degrees())
            .collect();
        assert_eq!(rotations, vec![0, 90, 0]);
    }
}
