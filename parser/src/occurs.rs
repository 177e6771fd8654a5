use std::fmt;

use roxmltree::Node;

use super::{error::SchemaError, values::actual_value};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MaxOccurs {
    Unbounded,
    Count(u64),
}

impl MaxOccurs {
    /// Whether `count` occurrences are permitted by this upper bound.
    pub fn admits(&self, count: u64) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Count(max) => count <= *max,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }
}

impl fmt::Display for MaxOccurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("unbounded"),
            Self::Count(count) => write!(f, "{count}"),
        }
    }
}

/// The occurrence range of a particle, `{min occurs}` and `{max occurs}` (§3.9.1)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub min: u64,
    pub max: MaxOccurs,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::EXACTLY_ONE
    }
}

impl Bounds {
    pub const EXACTLY_ONE: Self = Self {
        min: 1,
        max: MaxOccurs::Count(1),
    };

    /// Reads the bounds of an `<element>`, `<choice>`, `<sequence>` or `<group>` particle.
    pub fn resolve(particle: Node) -> Result<Self, SchemaError> {
        // {min occurs}
        //   The ·actual value· of the minOccurs [attribute], if present, otherwise 1.
        let min = particle
            .attribute("minOccurs")
            .map(|min_occurs| actual_value::<u64>(min_occurs, particle))
            .transpose()?
            .unwrap_or(1);

        // {max occurs}
        //   unbounded, if the maxOccurs [attribute] equals unbounded, otherwise the ·actual
        //   value· of the maxOccurs [attribute], if present, otherwise 1.
        let max = particle
            .attribute("maxOccurs")
            .map(|max_occurs| {
                if max_occurs.trim() == "unbounded" {
                    Ok(MaxOccurs::Unbounded)
                } else {
                    actual_value::<u64>(max_occurs, particle).map(MaxOccurs::Count)
                }
            })
            .transpose()?
            .unwrap_or(MaxOccurs::Count(1));

        if let MaxOccurs::Count(max) = max {
            if max < min {
                return Err(SchemaError::InvalidBounds { min, max });
            }
        }

        Ok(Self { min, max })
    }

    /// More than one occurrence is permitted.
    pub fn is_repeatable(&self) -> bool {
        !matches!(self.max, MaxOccurs::Count(0 | 1))
    }
}

/// Effective occurrence bounds of `particle`.
pub fn resolve(particle: Node) -> Result<Bounds, SchemaError> {
    Bounds::resolve(particle)
}
