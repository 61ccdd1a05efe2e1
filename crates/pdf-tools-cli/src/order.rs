//! Parsing for `--order`, e.g. `3,1@90,2`

use anyhow::{Context, Result, bail};
use pdf_planner::{PageEntry, PagePlan, Rotation};

/// Parse a comma separated list of 1-based source pages, each optionally
/// followed by `@degrees`, into a plan for a document of `page_count` pages.
pub fn parse_order(input: &str, page_count: usize) -> Result<PagePlan> {
    let mut entries = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (page, degrees) = match part.split_once('@') {
            Some((page, degrees)) => (page.trim(), Some(degrees.trim())),
            None => (part, None),
        };

        let page: usize = page
            .parse()
            .with_context(|| format!("Invalid page number in order: {:?}", part))?;
        if page == 0 {
            bail!("Page numbers start at 1: {:?}", part);
        }

        let rotation = match degrees {
            Some(degrees) => {
                let degrees: i64 = degrees
                    .parse()
                    .with_context(|| format!("Invalid rotation in order: {:?}", part))?;
                Rotation::from_degrees(degrees)?
            }
            None => Rotation::None,
        };
        entries.push(PageEntry::rotated(page - 1, rotation));
    }

    if entries.is_empty() {
        bail!("Page order is empty");
    }
    Ok(PagePlan {
        page_count,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order_with_rotations() {
        let plan = parse_order("3, 1@90,2@-90", 3).unwrap();
        assert_eq!(plan.page_count, 3);
        assert_eq!(
            plan.entries,
            vec![
                PageEntry::new(2),
                PageEntry::rotated(0, Rotation::Clockwise90),
                PageEntry::rotated(1, Rotation::Clockwise270),
            ]
        );
    }

    #[test]
    fn test_parse_order_allows_duplicates() {
        let plan = parse_order("1,1@180", 1).unwrap();
        assert_eq!(plan.entries.len(), 2);
    }

    #[test]
    fn test_parse_order_rejects_bad_input() {
        assert!(parse_order("", 3).is_err());
        assert!(parse_order("0", 3).is_err());
        assert!(parse_order("a,2", 3).is_err());
        assert!(parse_order("1@45", 3).is_err());
        assert!(parse_order("1@x", 3).is_err());
    }
}
