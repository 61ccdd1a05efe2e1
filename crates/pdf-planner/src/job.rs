//! Transform jobs - the immutable instructions handed to the apply-transform step

use crate::options::{SignatureOptions, WatermarkOptions};
use crate::types::*;

/// Which entries `compile_entry_job` keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompileMode {
    /// Only entries in the selection set ("extract pages")
    KeepSelected,
    /// Every entry not in the selection set ("remove pages")
    DropSelected,
}

/// Ordered list of pages making up one output document
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntryJob {
    entries: Vec<PageEntry>,
}

impl EntryJob {
    pub fn new(entries: Vec<PageEntry>) -> Self {
        Self { entries }
    }

    /// Expand zero-based ranges into unrotated entries, in order.
    pub fn from_ranges(ranges: &[PageRange]) -> Self {
        let entries = ranges
            .iter()
            .flat_map(|range| range.indices())
            .map(PageEntry::new)
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[PageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Zero-based ranges plus the merge flag of the split workflow
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeJob {
    ranges: Vec<PageRange>,
    merge_ranges: bool,
}

impl RangeJob {
    pub fn ranges(&self) -> &[PageRange] {
        &self.ranges
    }

    pub fn merge_ranges(&self) -> bool {
        self.merge_ranges
    }

    /// Number of documents this job produces
    pub fn output_count(&self) -> usize {
        if self.merge_ranges { 1 } else { self.ranges.len() }
    }

    /// Ranges grouped by output document, input order preserved
    pub fn output_groups(&self) -> Vec<Vec<PageRange>> {
        if self.merge_ranges {
            vec![self.ranges.clone()]
        } else {
            self.ranges.iter().map(|range| vec![*range]).collect()
        }
    }
}

/// Finalized instruction set for one run
#[derive(Debug, Clone, PartialEq)]
pub enum TransformJob {
    /// Organize / rotate / extract / remove family
    Pages(EntryJob),
    /// Split family
    Ranges(RangeJob),
    /// Concatenate every loaded source in order
    Merge,
    /// Stamp text over every page of the first source
    Watermark(WatermarkOptions),
    /// Build a new document from encoded images; takes no source
    Images(Vec<Vec<u8>>),
    /// Draw a signature image on one page of the first source
    Sign(SignatureOptions),
}

impl TransformJob {
    /// Number of source documents the job consumes (`None` means one or more)
    pub fn expected_sources(&self) -> Option<usize> {
        match self {
            TransformJob::Merge => None,
            TransformJob::Images(_) => Some(0),
            _ => Some(1),
        }
    }
}

/// Validate, clamp and convert 1-based range specs into a [`RangeJob`].
///
/// `to` is clamped to `page_count`; the caller's specs are never modified.
pub fn compile_range_job(
    ranges: &[RangeSpec],
    merge_ranges: bool,
    page_count: usize,
) -> Result<RangeJob> {
    if page_count == 0 {
        return Err(PlannerError::InvalidInput(
            "Page count must be positive".to_string(),
        ));
    }

    let mut compiled = Vec::with_capacity(ranges.len());
    for spec in ranges {
        spec.validate()?;
        if spec.from > page_count {
            return Err(PlannerError::InvalidInput(format!(
                "Range {} starts beyond the last page ({})",
                spec, page_count
            )));
        }

        let to = spec.to.min(page_count);
        if to < spec.from {
            continue;
        }
        compiled.push(PageRange {
            start: spec.from - 1,
            end: to - 1,
        });
    }

    if compiled.is_empty() {
        return Err(PlannerError::InvalidInput(
            "No page ranges to extract".to_string(),
        ));
    }

    log::debug!(
        "Compiled {} range(s) against {} pages (merge: {})",
        compiled.len(),
        page_count,
        merge_ranges
    );

    Ok(RangeJob {
        ranges: compiled,
        merge_ranges,
    })
}
