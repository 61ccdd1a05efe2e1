//! Supported tools as a closed set
//!
//! Each variant carries its own parameters and knows how to turn the
//! planner state into a [`TransformJob`].

use crate::job::{CompileMode, TransformJob, compile_range_job};
use crate::options::{SignatureOptions, WatermarkOptions};
use crate::planner::PagePlanner;
use crate::types::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Concatenate several documents
    Merge,
    /// Cut the document into page ranges
    Split {
        ranges: Vec<RangeSpec>,
        merge_ranges: bool,
    },
    /// Drop the selected entries
    RemovePages,
    /// Keep only the selected entries
    ExtractPages,
    /// Emit the entry sequence as arranged
    Organize,
    /// Emit the entry sequence with its rotations
    Rotate,
    Watermark(WatermarkOptions),
    /// Turn PNG / JPEG images into a PDF, one page each
    ImagesToPdf { images: Vec<Vec<u8>> },
    /// Stamp a signature image on one page
    Sign(SignatureOptions),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Merge => "Merge PDF",
            Operation::Split { .. } => "Split PDF",
            Operation::RemovePages => "Remove pages",
            Operation::ExtractPages => "Extract pages",
            Operation::Organize => "Organize PDF",
            Operation::Rotate => "Rotate PDF",
            Operation::Watermark(_) => "Add watermark",
            Operation::ImagesToPdf { .. } => "JPG to PDF",
            Operation::Sign(_) => "Sign PDF",
        }
    }

    /// Output file stem used when the user has not chosen one
    pub fn default_output_name(&self) -> &'static str {
        match self {
            Operation::Merge => "merged",
            Operation::Split { .. } => "split",
            Operation::RemovePages => "removed",
            Operation::ExtractPages => "extracted",
            Operation::Organize => "organized",
            Operation::Rotate => "rotated",
            Operation::Watermark(_) => "watermarked",
            Operation::ImagesToPdf { .. } => "images",
            Operation::Sign(_) => "signed",
        }
    }

    /// Whether the tool needs the "pro" entitlement
    pub fn is_premium(&self) -> bool {
        match self {
            Operation::Merge | Operation::Split { .. } | Operation::ImagesToPdf { .. } => false,
            Operation::RemovePages
            | Operation::ExtractPages
            | Operation::Organize
            | Operation::Rotate
            | Operation::Watermark(_)
            | Operation::Sign(_) => true,
        }
    }

    /// Whether the tool works from a loaded page plan
    pub fn uses_page_plan(&self) -> bool {
        !matches!(
            self,
            Operation::Merge | Operation::Watermark(_) | Operation::ImagesToPdf { .. }
        )
    }

    /// Reduce the planner state into the job for this tool
    pub fn compile(&self, planner: &PagePlanner) -> Result<TransformJob> {
        let job = match self {
            Operation::Merge => TransformJob::Merge,
            Operation::Watermark(options) => {
                options.validate()?;
                TransformJob::Watermark(options.clone())
            }
            Operation::ImagesToPdf { images } => {
                if images.is_empty() {
                    return Err(PlannerError::InvalidInput(
                        "No images to convert".to_string(),
                    ));
                }
                TransformJob::Images(images.clone())
            }
            Operation::Sign(options) => {
                options.validate()?;
                let page_count = planner.page_count()?;
                if options.page >= page_count {
                    return Err(PlannerError::OutOfRange {
                        index: options.page,
                        len: page_count,
                    });
                }
                TransformJob::Sign(options.clone())
            }
            Operation::Split {
                ranges,
                merge_ranges,
            } => TransformJob::Ranges(compile_range_job(
                ranges,
                *merge_ranges,
                planner.page_count()?,
            )?),
            Operation::RemovePages => {
                if planner.selection()?.is_empty() {
                    return Err(PlannerError::EmptySelection);
                }
                let job = planner.compile_entry_job(CompileMode::DropSelected)?;
                if job.is_empty() {
                    return Err(PlannerError::InvalidInput(
                        "Cannot remove every page".to_string(),
                    ));
                }
                TransformJob::Pages(job)
            }
            Operation::ExtractPages => {
                TransformJob::Pages(planner.compile_entry_job(CompileMode::KeepSelected)?)
            }
            Operation::Organize | Operation::Rotate => {
                let job = planner.compile_plan()?;
                if job.is_empty() {
                    return Err(PlannerError::InvalidInput(
                        "The page plan is empty".to_string(),
                    ));
                }
                TransformJob::Pages(job)
            }
        };
        Ok(job)
    }
}
