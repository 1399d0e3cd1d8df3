use super::index::{ChamberIndex, PhiIndex, StationIndex, StationName, Technology};
use super::Identifier;

/// Interpretation of muon identifiers.
///
/// The refit stages never decode identifier bits themselves; all station,
/// sector and technology queries go through this trait so that alternative
/// numbering schemes can be plugged in.
pub trait IdHelper: Send + Sync {
    /// True for any muon-spectrometer identifier, including technologies the
    /// helper does not recognize.
    fn is_muon(&self, id: Identifier) -> bool;
    fn technology(&self, id: Identifier) -> Option<Technology>;
    fn station_name(&self, id: Identifier) -> Option<StationName>;
    fn station_eta(&self, id: Identifier) -> i32;
    fn station_phi(&self, id: Identifier) -> i32;
    /// Sector number, 1..=16.
    fn sector(&self, id: Identifier) -> i32;
    fn measures_phi(&self, id: Identifier) -> bool;
    fn multilayer(&self, id: Identifier) -> u32;
    fn layer(&self, id: Identifier) -> u32;
    fn channel(&self, id: Identifier) -> u32;
    /// Identifier of the chamber containing `id`.
    fn chamber_id(&self, id: Identifier) -> Identifier;
    fn phi_index(&self, id: Identifier) -> Option<PhiIndex>;

    fn station_index(&self, id: Identifier) -> Option<StationIndex> {
        self.station_name(id).map(StationName::station_index)
    }

    fn chamber_index(&self, id: Identifier) -> Option<ChamberIndex> {
        self.station_name(id).map(StationName::chamber_index)
    }

    fn is_endcap(&self, id: Identifier) -> bool {
        self.station_name(id)
            .is_some_and(|name| !name.as_str().starts_with('B'))
    }

    fn is_small_chamber(&self, id: Identifier) -> bool {
        self.station_name(id).is_some_and(StationName::is_small)
    }

    fn is_bme(&self, id: Identifier) -> bool {
        self.station_name(id) == Some(StationName::Bme)
    }

    fn is_mdt(&self, id: Identifier) -> bool {
        self.technology(id) == Some(Technology::Mdt)
    }

    fn is_csc(&self, id: Identifier) -> bool {
        self.technology(id) == Some(Technology::Csc)
    }

    fn is_trigger(&self, id: Identifier) -> bool {
        self.technology(id).is_some_and(Technology::is_trigger)
    }

    /// Human readable form used in log messages.
    fn describe(&self, id: Identifier) -> String {
        match (self.technology(id), self.station_name(id)) {
            (Some(tech), Some(name)) => format!(
                "{:?} {} eta {} phi {} ml {} l {} ch {}{}",
                tech,
                name,
                self.station_eta(id),
                self.station_phi(id),
                self.multilayer(id),
                self.layer(id),
                self.channel(id),
                if self.measures_phi(id) { " phi" } else { "" }
            ),
            _ => format!("{}", id),
        }
    }
}

/// Reference helper for the packed identifier layout of [`Identifier`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MuonIdHelper;

impl IdHelper for MuonIdHelper {
    fn is_muon(&self, id: Identifier) -> bool {
        id.subsystem_code() >= Technology::Mdt.code()
    }

    fn technology(&self, id: Identifier) -> Option<Technology> {
        Technology::from_code(id.subsystem_code())
    }

    fn station_name(&self, id: Identifier) -> Option<StationName> {
        if !self.is_muon(id) {
            return None;
        }
        StationName::from_code(id.station_code())
    }

    fn station_eta(&self, id: Identifier) -> i32 {
        id.eta_field()
    }

    fn station_phi(&self, id: Identifier) -> i32 {
        id.phi_field() as i32
    }

    fn sector(&self, id: Identifier) -> i32 {
        let phi = self.station_phi(id);
        match self.station_name(id) {
            Some(name) if name.is_tgc() => {
                let n_phi = if name.is_tgc_forward() { 24 } else { 48 };
                (phi - 1).rem_euclid(n_phi) * 16 / n_phi + 1
            }
            Some(name) if name.is_small() => 2 * phi,
            _ => 2 * phi - 1,
        }
    }

    fn measures_phi(&self, id: Identifier) -> bool {
        id.measures_phi_bit()
    }

    fn multilayer(&self, id: Identifier) -> u32 {
        id.multilayer_field()
    }

    fn layer(&self, id: Identifier) -> u32 {
        id.layer_field()
    }

    fn channel(&self, id: Identifier) -> u32 {
        id.channel_field()
    }

    fn chamber_id(&self, id: Identifier) -> Identifier {
        id.chamber_bits()
    }

    fn phi_index(&self, id: Identifier) -> Option<PhiIndex> {
        let name = self.station_name(id)?;
        match self.technology(id)? {
            Technology::Rpc => match (name.station_index(), id.multilayer_field()) {
                (StationIndex::BI, _) => Some(PhiIndex::BI),
                (StationIndex::BM, 1) => Some(PhiIndex::BM1),
                (StationIndex::BM, _) => Some(PhiIndex::BM2),
                (StationIndex::BO, 1) => Some(PhiIndex::BO1),
                (StationIndex::BO, _) => Some(PhiIndex::BO2),
                _ => None,
            },
            Technology::Tgc => match name {
                StationName::T1f | StationName::T1e => Some(PhiIndex::T1),
                StationName::T2f | StationName::T2e => Some(PhiIndex::T2),
                StationName::T3f | StationName::T3e => Some(PhiIndex::T3),
                _ => Some(PhiIndex::T4),
            },
            Technology::Csc => Some(PhiIndex::Csc),
            Technology::Stgc => Some(PhiIndex::Stgc),
            Technology::Mdt | Technology::Mm => None,
        }
    }
}
