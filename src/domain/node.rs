//! Domain entities: traced points of a reconstruction

use std::fmt;

use glam::DVec3;

/// Identifier of a traced point (`n` column of an SWC file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NodeId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Neurite compartment a point belongs to.
///
/// Codes follow the SWC convention; everything outside 1..=4 (including the
/// "undefined" code 0) is kept verbatim as `Custom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructureType {
    Soma,
    Axon,
    BasalDendrite,
    ApicalDendrite,
    Custom(i32),
}

impl StructureType {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Soma,
            2 => Self::Axon,
            3 => Self::BasalDendrite,
            4 => Self::ApicalDendrite,
            other => Self::Custom(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Soma => 1,
            Self::Axon => 2,
            Self::BasalDendrite => 3,
            Self::ApicalDendrite => 4,
            Self::Custom(code) => *code,
        }
    }
}

impl fmt::Display for StructureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Soma => write!(f, "soma"),
            Self::Axon => write!(f, "axon"),
            Self::BasalDendrite => write!(f, "basal"),
            Self::ApicalDendrite => write!(f, "apical"),
            Self::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

/// A single traced point.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: StructureType,
    pub position: DVec3,
    pub radius: f64,
    /// `None` marks the root (written as `-1`).
    pub parent: Option<NodeId>,
}

impl Node {
    pub fn new(
        id: impl Into<NodeId>,
        kind: StructureType,
        position: DVec3,
        radius: f64,
        parent: Option<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            position,
            radius,
            parent,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({:.3}, {:.3}, {:.3}) r={:.3}",
            self.id, self.kind, self.position.x, self.position.y, self.position.z, self.radius
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_swc_codes_when_converting_then_roundtrips_known_and_custom() {
        for code in [0, 1, 2, 3, 4, 7, -3] {
            assert_eq!(StructureType::from_code(code).code(), code);
        }
        assert_eq!(StructureType::from_code(3), StructureType::BasalDendrite);
        assert_eq!(StructureType::from_code(0), StructureType::Custom(0));
    }
}
