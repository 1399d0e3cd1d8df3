//! Chamber geometry used by segment-based outlier cleaning.

use std::collections::HashMap;

use nalgebra::{Isometry3, Point3};

use crate::identifier::Identifier;

/// Geometry of one MDT chamber.
#[derive(Debug, Clone, PartialEq)]
pub struct MdtChamberGeometry {
    /// Global frame to chamber (station) frame. The chamber frame has the
    /// tubes along x; drift circles live in its (y, z) plane.
    pub global_to_local: Isometry3<f64>,
    /// Chamber centre in global coordinates.
    pub center: Point3<f64>,
    /// Inner tube radius in mm.
    pub inner_tube_radius: f64,
}

impl MdtChamberGeometry {
    pub fn new(
        global_to_local: Isometry3<f64>,
        center: Point3<f64>,
        inner_tube_radius: f64,
    ) -> Self {
        Self {
            global_to_local,
            center,
            inner_tube_radius,
        }
    }
}

/// Lookup of chamber geometry by chamber identifier.
pub trait ChamberGeometry: Send + Sync {
    fn mdt_chamber(&self, chamber: Identifier) -> Option<&MdtChamberGeometry>;
}

/// In-memory [`ChamberGeometry`] keyed by chamber identifier.
#[derive(Debug, Clone, Default)]
pub struct ChamberRegistry {
    chambers: HashMap<Identifier, MdtChamberGeometry>,
}

impl ChamberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chamber: Identifier, geometry: MdtChamberGeometry) {
        self.chambers.insert(chamber, geometry);
    }

    pub fn len(&self) -> usize {
        self.chambers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chambers.is_empty()
    }
}

impl ChamberGeometry for ChamberRegistry {
    fn mdt_chamber(&self, chamber: Identifier) -> Option<&MdtChamberGeometry> {
        self.chambers.get(&chamber)
    }
}
