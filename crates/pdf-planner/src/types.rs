use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Index {index} is out of range (sequence has {len} entries)")]
    OutOfRange { index: usize, len: usize },
    #[error("No pages selected")]
    EmptySelection,
    #[error("A transform is already in progress")]
    AlreadyInProgress,
    #[error("Transform failed: {0}")]
    TransformFailure(String),
    #[error("No document loaded")]
    Unloaded,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl From<lopdf::Error> for PlannerError {
    fn from(err: lopdf::Error) -> Self {
        PlannerError::TransformFailure(err.to_string())
    }
}

impl From<image::ImageError> for PlannerError {
    fn from(err: image::ImageError) -> Self {
        PlannerError::TransformFailure(format!("Unreadable image: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;

/// Quarter-turn rotation applied to a page, clockwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    Clockwise270,
}

impl Rotation {
    pub fn degrees(self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Clockwise180 => 180,
            Rotation::Clockwise270 => 270,
        }
    }

    /// Build a rotation from any multiple of 90, normalising into `0..360`.
    pub fn from_degrees(degrees: i64) -> Result<Self> {
        if degrees % 90 != 0 {
            return Err(PlannerError::InvalidInput(format!(
                "Rotation must be a multiple of 90 degrees, got {}",
                degrees
            )));
        }
        Ok(match degrees.rem_euclid(360) {
            0 => Rotation::None,
            90 => Rotation::Clockwise90,
            180 => Rotation::Clockwise180,
            _ => Rotation::Clockwise270,
        })
    }

    /// Compose with a delta in degrees (may be negative).
    pub fn rotated_by(self, delta_degrees: i64) -> Result<Self> {
        let delta = Rotation::from_degrees(delta_degrees)?;
        Rotation::from_degrees(i64::from(self.degrees()) + i64::from(delta.degrees()))
    }
}

/// One page of the planned output: which source page, and how it is turned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageEntry {
    /// Zero-based page index in the loaded source document
    pub source_index: usize,
    pub rotation: Rotation,
}

impl PageEntry {
    pub fn new(source_index: usize) -> Self {
        Self {
            source_index,
            rotation: Rotation::None,
        }
    }

    pub fn rotated(source_index: usize, rotation: Rotation) -> Self {
        Self {
            source_index,
            rotation,
        }
    }
}

/// 1-based inclusive page interval against the original document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeSpec {
    pub from: usize,
    pub to: usize,
}

impl RangeSpec {
    pub fn new(from: usize, to: usize) -> Result<Self> {
        let spec = Self { from, to };
        spec.validate()?;
        Ok(spec)
    }

    pub fn single(page: usize) -> Result<Self> {
        Self::new(page, page)
    }

    pub fn validate(&self) -> Result<()> {
        if self.from == 0 {
            return Err(PlannerError::InvalidInput(
                "Page numbers start at 1".to_string(),
            ));
        }
        if self.from > self.to {
            return Err(PlannerError::InvalidInput(format!(
                "Range start {} is after end {}",
                self.from, self.to
            )));
        }
        Ok(())
    }

    /// Parse a list such as `"1-3, 5, 8-10"`, keeping input order.
    pub fn parse_list(input: &str) -> Result<Vec<RangeSpec>> {
        input
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for RangeSpec {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self> {
        let parse_page = |text: &str| {
            text.trim()
                .parse::<usize>()
                .map_err(|_| PlannerError::InvalidInput(format!("Invalid page number: {}", text)))
        };

        match s.split_once('-') {
            Some((from, to)) => RangeSpec::new(parse_page(from)?, parse_page(to)?),
            None => RangeSpec::single(parse_page(s)?),
        }
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}-{}", self.from, self.to)
        }
    }
}

/// Zero-based inclusive index range, produced from a [`RangeSpec`] at compile time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    pub fn page_count(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> {
        self.start..=self.end
    }
}

/// Basic facts about a loaded source document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub size_bytes: u64,
}
