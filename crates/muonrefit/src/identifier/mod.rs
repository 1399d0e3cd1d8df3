//! Packed detector-element identifiers and the muon id-helper interface.
//!
//! An [`Identifier`] is an opaque 64-bit value. Only the [`IdHelper`]
//! implementations interpret its fields; everything else in the crate treats
//! identifiers as ordered, hashable keys.

mod helper;
mod index;

pub use helper::{IdHelper, MuonIdHelper};
pub use index::{ChamberIndex, PhiIndex, StationIndex, StationName, Technology};

use serde::{Deserialize, Serialize};

// ── Bit layout ─────────────────────────────────────────────────────────────

const SUBSYSTEM_SHIFT: u32 = 60;
const STATION_SHIFT: u32 = 52;
const ETA_SHIFT: u32 = 44;
const PHI_SHIFT: u32 = 36;
const MULTILAYER_SHIFT: u32 = 32;
const LAYER_SHIFT: u32 = 28;
const MEASURES_PHI_BIT: u64 = 1 << 27;
const CHANNEL_MASK: u64 = (1 << 27) - 1;
const CHAMBER_MASK: u64 = !((1u64 << PHI_SHIFT) - 1);
const ETA_OFFSET: i32 = 128;

pub(crate) const SUBSYSTEM_INVALID: u8 = 0;
pub(crate) const SUBSYSTEM_INNER: u8 = 1;

/// Opaque, totally ordered detector-element identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(u64);

impl Identifier {
    /// The invalid identifier (subsystem code zero).
    pub const INVALID: Self = Self(0);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self.subsystem_code() != SUBSYSTEM_INVALID
    }

    /// Identifier of a non-muon (inner detector) element.
    pub fn inner_detector(channel: u32) -> Self {
        Self(((SUBSYSTEM_INNER as u64) << SUBSYSTEM_SHIFT) | (channel as u64 & CHANNEL_MASK))
    }

    /// MDT tube. `multilayer`, `layer` and `tube` are 1-based.
    pub fn mdt(
        station: StationName,
        eta: i32,
        phi: u32,
        multilayer: u32,
        layer: u32,
        tube: u32,
    ) -> Self {
        Self::pack(Technology::Mdt, station, eta, phi, multilayer, layer, false, tube)
    }

    /// CSC strip.
    #[allow(clippy::too_many_arguments)]
    pub fn csc(
        station: StationName,
        eta: i32,
        phi: u32,
        chamber_layer: u32,
        layer: u32,
        measures_phi: bool,
        strip: u32,
    ) -> Self {
        Self::pack(Technology::Csc, station, eta, phi, chamber_layer, layer, measures_phi, strip)
    }

    /// RPC strip. `doublet_r` selects the inner (1) or outer (2) doublet.
    #[allow(clippy::too_many_arguments)]
    pub fn rpc(
        station: StationName,
        eta: i32,
        phi: u32,
        doublet_r: u32,
        gas_gap: u32,
        measures_phi: bool,
        strip: u32,
    ) -> Self {
        Self::pack(Technology::Rpc, station, eta, phi, doublet_r, gas_gap, measures_phi, strip)
    }

    /// TGC channel (wire group or strip).
    pub fn tgc(
        station: StationName,
        eta: i32,
        phi: u32,
        gas_gap: u32,
        measures_phi: bool,
        channel: u32,
    ) -> Self {
        Self::pack(Technology::Tgc, station, eta, phi, 1, gas_gap, measures_phi, channel)
    }

    /// Micromegas strip.
    pub fn mm(
        station: StationName,
        eta: i32,
        phi: u32,
        multilayer: u32,
        layer: u32,
        strip: u32,
    ) -> Self {
        Self::pack(Technology::Mm, station, eta, phi, multilayer, layer, false, strip)
    }

    /// sTGC channel.
    #[allow(clippy::too_many_arguments)]
    pub fn stgc(
        station: StationName,
        eta: i32,
        phi: u32,
        multilayer: u32,
        layer: u32,
        measures_phi: bool,
        channel: u32,
    ) -> Self {
        Self::pack(Technology::Stgc, station, eta, phi, multilayer, layer, measures_phi, channel)
    }

    #[allow(clippy::too_many_arguments)]
    fn pack(
        technology: Technology,
        station: StationName,
        eta: i32,
        phi: u32,
        multilayer: u32,
        layer: u32,
        measures_phi: bool,
        channel: u32,
    ) -> Self {
        let eta_field = (eta + ETA_OFFSET).clamp(0, 0xff) as u64;
        let mut raw = (technology.code() as u64) << SUBSYSTEM_SHIFT
            | (station.code() as u64) << STATION_SHIFT
            | eta_field << ETA_SHIFT
            | ((phi & 0xff) as u64) << PHI_SHIFT
            | ((multilayer & 0xf) as u64) << MULTILAYER_SHIFT
            | ((layer & 0xf) as u64) << LAYER_SHIFT
            | (channel as u64 & CHANNEL_MASK);
        if measures_phi {
            raw |= MEASURES_PHI_BIT;
        }
        Self(raw)
    }

    // ── Field access (interpreted by the id helpers) ───────────────────────

    pub(crate) fn subsystem_code(self) -> u8 {
        (self.0 >> SUBSYSTEM_SHIFT) as u8
    }

    pub(crate) fn station_code(self) -> u8 {
        (self.0 >> STATION_SHIFT) as u8
    }

    pub(crate) fn eta_field(self) -> i32 {
        ((self.0 >> ETA_SHIFT) & 0xff) as i32 - ETA_OFFSET
    }

    pub(crate) fn phi_field(self) -> u32 {
        ((self.0 >> PHI_SHIFT) & 0xff) as u32
    }

    pub(crate) fn multilayer_field(self) -> u32 {
        ((self.0 >> MULTILAYER_SHIFT) & 0xf) as u32
    }

    pub(crate) fn layer_field(self) -> u32 {
        ((self.0 >> LAYER_SHIFT) & 0xf) as u32
    }

    pub(crate) fn measures_phi_bit(self) -> bool {
        self.0 & MEASURES_PHI_BIT != 0
    }

    pub(crate) fn channel_field(self) -> u32 {
        (self.0 & CHANNEL_MASK) as u32
    }

    /// Identifier with every field below the station level cleared.
    pub(crate) fn chamber_bits(self) -> Self {
        Self(self.0 & CHAMBER_MASK)
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_survive_packing() {
        let id = Identifier::mdt(StationName::Bil, -3, 5, 2, 4, 17);
        assert_eq!(id.subsystem_code(), Technology::Mdt.code());
        assert_eq!(id.station_code(), StationName::Bil.code());
        assert_eq!(id.eta_field(), -3);
        assert_eq!(id.phi_field(), 5);
        assert_eq!(id.multilayer_field(), 2);
        assert_eq!(id.layer_field(), 4);
        assert_eq!(id.channel_field(), 17);
        assert!(!id.measures_phi_bit());
    }

    #[test]
    fn chamber_bits_drop_tube_fields() {
        let a = Identifier::mdt(StationName::Bml, 2, 3, 1, 1, 1);
        let b = Identifier::mdt(StationName::Bml, 2, 3, 2, 3, 40);
        let c = Identifier::mdt(StationName::Bml, 3, 3, 1, 1, 1);
        assert_eq!(a.chamber_bits(), b.chamber_bits());
        assert_ne!(a.chamber_bits(), c.chamber_bits());
    }

    #[test]
    fn invalid_and_inner_detector_ids() {
        assert!(!Identifier::INVALID.is_valid());
        let id = Identifier::inner_detector(42);
        assert!(id.is_valid());
        assert_eq!(id.subsystem_code(), SUBSYSTEM_INNER);
    }

    #[test]
    fn serializes_as_plain_integer() {
        let id = Identifier::from_raw(12345);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "12345");
        let back: Identifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
