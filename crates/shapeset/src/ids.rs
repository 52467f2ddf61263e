//! Identifier value types for shapes, mesh fragments, and borders.
//!
//! A mesh fragment separates exactly two shapes and is named by the ordered
//! pair of their ids (`"3-7"`). A border is the curve where three or more
//! fragments meet; it is identified globally by a positive integer id and
//! canonically by the sorted, underscore-joined names of the participating
//! fragments (`"1-2_1-3_2-3"`).

use std::fmt;
use std::str::FromStr;

use crate::error::ShapeSetError;

/// A labeled 3D region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShapeId(pub u32);

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ShapeId {
    type Err = ShapeSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>()
            .map(ShapeId)
            .map_err(|_| ShapeSetError::parse("shape id", s))
    }
}

/// Identifies a mesh fragment by the pair of shapes it separates.
///
/// The pair is canonical: the smaller shape id always comes first. The first
/// component is the fragment's *front* shape, the side its normals face.
/// Ordering between mesh ids is lexicographic on the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeshId {
    a: ShapeId,
    b: ShapeId,
}

impl MeshId {
    /// Create a mesh id, swapping the components into canonical order if
    /// necessary.
    pub fn new(a: ShapeId, b: ShapeId) -> Self {
        if a <= b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }

    /// The front shape (first component).
    #[inline]
    pub fn front(&self) -> ShapeId {
        self.a
    }

    /// The back shape (second component).
    #[inline]
    pub fn back(&self) -> ShapeId {
        self.b
    }

    /// Both shapes as a pair.
    #[inline]
    pub fn shapes(&self) -> (ShapeId, ShapeId) {
        (self.a, self.b)
    }

    /// Whether this fragment touches the given shape.
    #[inline]
    pub fn touches(&self, shape: ShapeId) -> bool {
        self.a == shape || self.b == shape
    }
}

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.a, self.b)
    }
}

impl FromStr for MeshId {
    type Err = ShapeSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, '-');
        let (Some(first), Some(second)) = (parts.next(), parts.next()) else {
            return Err(ShapeSetError::parse("mesh id", s));
        };
        let a = first
            .parse::<u32>()
            .map_err(|_| ShapeSetError::parse("mesh id", s))?;
        let b = second
            .parse::<u32>()
            .map_err(|_| ShapeSetError::parse("mesh id", s))?;
        Ok(MeshId::new(ShapeId(a), ShapeId(b)))
    }
}

/// A positive border identifier. Zero is reserved and never allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BorderId(u32);

impl BorderId {
    /// Create a border id. Returns `None` for the reserved value zero.
    pub fn new(id: u32) -> Option<Self> {
        (id != 0).then_some(Self(id))
    }

    /// The raw integer value.
    #[inline]
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for BorderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BorderId {
    type Err = ShapeSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .parse::<u32>()
            .map_err(|_| ShapeSetError::parse("border id", s))?;
        BorderId::new(id).ok_or_else(|| ShapeSetError::parse("border id", "zero is reserved"))
    }
}

/// Canonical description of a border: the participating mesh ids sorted by
/// precedence and joined with underscores.
///
/// Two borders with equal descriptions never co-exist; the description is the
/// stable identity a border keeps across re-indexing runs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BorderDescription {
    serial: String,
    mesh_ids: Vec<MeshId>,
}

impl BorderDescription {
    /// Build the canonical description for a set of mesh ids.
    /// Duplicates are dropped.
    pub fn from_mesh_ids(mesh_ids: impl IntoIterator<Item = MeshId>) -> Self {
        let mut ids: Vec<MeshId> = mesh_ids.into_iter().collect();
        ids.sort();
        ids.dedup();
        let serial = ids
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join("_");
        Self {
            serial,
            mesh_ids: ids,
        }
    }

    /// The canonical string form.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.serial
    }

    /// The participating mesh ids, in canonical order.
    #[inline]
    pub fn mesh_ids(&self) -> &[MeshId] {
        &self.mesh_ids
    }
}

impl fmt::Display for BorderDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serial)
    }
}

impl FromStr for BorderDescription {
    type Err = ShapeSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Decompose and recompose to guarantee canonical form.
        let mesh_ids = s
            .split('_')
            .map(MeshId::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BorderDescription::from_mesh_ids(mesh_ids))
    }
}
