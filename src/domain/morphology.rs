use std::collections::HashMap;
use std::fmt;

use generational_arena::{Arena, Index};
use nalgebra::Point3;

use crate::domain::error::{DomainError, DomainResult};

/// A 3-D sample coordinate.
pub type Point = Point3<f64>;

/// Neurite type of a section, using the SWC structure identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionType {
    Soma,
    Axon,
    BasalDendrite,
    ApicalDendrite,
    Custom(i32),
}

impl SectionType {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => SectionType::Soma,
            2 => SectionType::Axon,
            3 => SectionType::BasalDendrite,
            4 => SectionType::ApicalDendrite,
            other => SectionType::Custom(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            SectionType::Soma => 1,
            SectionType::Axon => 2,
            SectionType::BasalDendrite => 3,
            SectionType::ApicalDendrite => 4,
            SectionType::Custom(code) => code,
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionType::Soma => write!(f, "soma"),
            SectionType::Axon => write!(f, "axon"),
            SectionType::BasalDendrite => write!(f, "basal_dendrite"),
            SectionType::ApicalDendrite => write!(f, "apical_dendrite"),
            SectionType::Custom(code) => write!(f, "custom({})", code),
        }
    }
}

/// Soma samples. Carried through unravelling untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Soma {
    pub points: Vec<Point>,
    pub radii: Vec<f64>,
}

impl Soma {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One unbranched polyline of the neurite tree.
///
/// A non-root section's first point coincides with its parent's last point.
#[derive(Debug, Clone)]
pub struct Section {
    section_type: SectionType,
    points: Vec<Point>,
    radii: Vec<f64>,
    parent: Option<Index>,
    children: Vec<Index>,
}

impl Section {
    pub fn section_type(&self) -> SectionType {
        self.section_type
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn radii(&self) -> &[f64] {
        &self.radii
    }

    /// Index of the parent section, `None` for root sections.
    pub fn parent(&self) -> Option<Index> {
        self.parent
    }

    pub fn children(&self) -> &[Index] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Arena-based section tree of a neuron reconstruction.
///
/// Sections are addressed by generational indices that stay valid across
/// `clone()`, so an index into an input morphology addresses the same section
/// in any structural copy of it. Topology is fixed once built; only point
/// coordinates can be replaced afterwards.
#[derive(Debug, Clone, Default)]
pub struct Morphology {
    arena: Arena<Section>,
    roots: Vec<Index>,
    soma: Soma,
}

impl Morphology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_soma(soma: Soma) -> Self {
        Self {
            soma,
            ..Self::default()
        }
    }

    pub fn soma(&self) -> &Soma {
        &self.soma
    }

    pub fn append_root_section(
        &mut self,
        section_type: SectionType,
        points: Vec<Point>,
        radii: Vec<f64>,
    ) -> DomainResult<Index> {
        let idx = self.insert(section_type, points, radii, None)?;
        self.roots.push(idx);
        Ok(idx)
    }

    pub fn append_section(
        &mut self,
        parent: Index,
        section_type: SectionType,
        points: Vec<Point>,
        radii: Vec<f64>,
    ) -> DomainResult<Index> {
        if !self.arena.contains(parent) {
            return Err(DomainError::SectionNotFound);
        }
        let idx = self.insert(section_type, points, radii, Some(parent))?;
        if let Some(parent) = self.arena.get_mut(parent) {
            parent.children.push(idx);
        }
        Ok(idx)
    }

    fn insert(
        &mut self,
        section_type: SectionType,
        points: Vec<Point>,
        radii: Vec<f64>,
        parent: Option<Index>,
    ) -> DomainResult<Index> {
        if points.len() != radii.len() {
            return Err(DomainError::RadiusCountMismatch {
                points: points.len(),
                radii: radii.len(),
            });
        }
        Ok(self.arena.insert(Section {
            section_type,
            points,
            radii,
            parent,
            children: Vec::new(),
        }))
    }

    pub fn section(&self, idx: Index) -> Option<&Section> {
        self.arena.get(idx)
    }

    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    pub fn section_count(&self) -> usize {
        self.arena.len()
    }

    /// Total number of section points, branch-point duplicates included.
    pub fn point_count(&self) -> usize {
        self.arena.iter().map(|(_, s)| s.points.len()).sum()
    }

    /// Replace the points of one section, keeping its point count.
    pub fn set_points(&mut self, idx: Index, points: Vec<Point>) -> DomainResult<()> {
        let expected = self
            .section(idx)
            .ok_or(DomainError::SectionNotFound)?
            .points
            .len();
        if expected != points.len() {
            // Pre-order walk, only paid on failure
            return Err(DomainError::PointCountMismatch {
                section: self.position(idx).unwrap_or_default(),
                expected,
                actual: points.len(),
            });
        }
        if let Some(section) = self.arena.get_mut(idx) {
            section.points = points;
        }
        Ok(())
    }

    /// Pre-order position of a section, the identifier used in error messages.
    pub fn position(&self, idx: Index) -> Option<usize> {
        self.iter().position(|(i, _)| i == idx)
    }

    /// Depth-first pre-order traversal over all root trees.
    ///
    /// Every section is yielded after its parent.
    pub fn iter(&self) -> PreOrderIter<'_> {
        PreOrderIter::new(self)
    }

    /// Number of sections on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        // Parents come first in pre-order, so their depth is always known
        let mut depths: HashMap<Index, usize> = HashMap::with_capacity(self.arena.len());
        let mut deepest = 0;
        for (idx, section) in self.iter() {
            let depth = section
                .parent
                .and_then(|parent| depths.get(&parent))
                .map_or(1, |d| d + 1);
            deepest = deepest.max(depth);
            depths.insert(idx, depth);
        }
        deepest
    }

    /// Sections without children.
    pub fn leaf_sections(&self) -> Vec<Index> {
        self.iter()
            .filter(|(_, section)| section.children.is_empty())
            .map(|(idx, _)| idx)
            .collect()
    }
}

pub struct PreOrderIter<'a> {
    morphology: &'a Morphology,
    stack: Vec<Index>,
}

impl<'a> PreOrderIter<'a> {
    fn new(morphology: &'a Morphology) -> Self {
        // Reversed so that the first root is visited first
        let stack = morphology.roots.iter().rev().copied().collect();
        Self { morphology, stack }
    }
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = (Index, &'a Section);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(section) = self.morphology.section(current) {
                for &child in section.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current, section));
            }
        }
        None
    }
}
