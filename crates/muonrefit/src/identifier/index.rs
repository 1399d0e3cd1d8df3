use serde::{Deserialize, Serialize};

/// Muon detector technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Technology {
    Mdt,
    Csc,
    Rpc,
    Tgc,
    Mm,
    Stgc,
}

impl Technology {
    pub(crate) const fn code(self) -> u8 {
        match self {
            Self::Mdt => 2,
            Self::Csc => 3,
            Self::Rpc => 4,
            Self::Tgc => 5,
            Self::Mm => 6,
            Self::Stgc => 7,
        }
    }

    pub(crate) fn from_code(code: u8) -> Option<Self> {
        match code {
            2 => Some(Self::Mdt),
            3 => Some(Self::Csc),
            4 => Some(Self::Rpc),
            5 => Some(Self::Tgc),
            6 => Some(Self::Mm),
            7 => Some(Self::Stgc),
            _ => None,
        }
    }

    /// RPC and TGC.
    pub fn is_trigger(self) -> bool {
        matches!(self, Self::Rpc | Self::Tgc)
    }
}

/// Station layer: inner/middle/outer/extended, barrel or endcap.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StationIndex {
    BI,
    BM,
    BO,
    BE,
    EI,
    EM,
    EO,
    EE,
}

impl StationIndex {
    pub fn is_barrel(self) -> bool {
        matches!(self, Self::BI | Self::BM | Self::BO)
    }

    /// Endcap layers, counting the barrel-extension layer `BE` with the endcap.
    pub fn is_endcap(self) -> bool {
        matches!(self, Self::EI | Self::EM | Self::EO | Self::EE | Self::BE)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::BI => "BI",
            Self::BM => "BM",
            Self::BO => "BO",
            Self::BE => "BE",
            Self::EI => "EI",
            Self::EM => "EM",
            Self::EO => "EO",
            Self::EE => "EE",
        }
    }
}

/// Chamber layer, distinguishing large and small sectors.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChamberIndex {
    BIS,
    BIL,
    BMS,
    BML,
    BOS,
    BOL,
    BEE,
    EIS,
    EIL,
    EMS,
    EML,
    EOS,
    EOL,
    EES,
    EEL,
    CSS,
    CSL,
}

impl ChamberIndex {
    pub fn station_index(self) -> StationIndex {
        match self {
            Self::BIS | Self::BIL => StationIndex::BI,
            Self::BMS | Self::BML => StationIndex::BM,
            Self::BOS | Self::BOL => StationIndex::BO,
            Self::BEE => StationIndex::BE,
            Self::EIS | Self::EIL | Self::CSS | Self::CSL => StationIndex::EI,
            Self::EMS | Self::EML => StationIndex::EM,
            Self::EOS | Self::EOL => StationIndex::EO,
            Self::EES | Self::EEL => StationIndex::EE,
        }
    }
}

/// Trigger (phi-measuring) layer.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhiIndex {
    BI,
    BM1,
    BM2,
    BO1,
    BO2,
    T1,
    T2,
    T3,
    T4,
    Csc,
    Stgc,
}

/// Station names known to [`super::MuonIdHelper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum StationName {
    Bil = 1,
    Bis,
    Bim,
    Bir,
    Bml,
    Bms,
    Bmf,
    Bme,
    Bol,
    Bos,
    Bof,
    Bog,
    Bee,
    Eil,
    Eis,
    Eml,
    Ems,
    Eol,
    Eos,
    Eel,
    Ees,
    Css,
    Csl,
    T1f,
    T1e,
    T2f,
    T2e,
    T3f,
    T3e,
    T4f,
    T4e,
    Mms,
    Mml,
    Sts,
    Stl,
}

impl StationName {
    pub const ALL: [StationName; 35] = [
        Self::Bil,
        Self::Bis,
        Self::Bim,
        Self::Bir,
        Self::Bml,
        Self::Bms,
        Self::Bmf,
        Self::Bme,
        Self::Bol,
        Self::Bos,
        Self::Bof,
        Self::Bog,
        Self::Bee,
        Self::Eil,
        Self::Eis,
        Self::Eml,
        Self::Ems,
        Self::Eol,
        Self::Eos,
        Self::Eel,
        Self::Ees,
        Self::Css,
        Self::Csl,
        Self::T1f,
        Self::T1e,
        Self::T2f,
        Self::T2e,
        Self::T3f,
        Self::T3e,
        Self::T4f,
        Self::T4e,
        Self::Mms,
        Self::Mml,
        Self::Sts,
        Self::Stl,
    ];

    pub(crate) const fn code(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bil => "BIL",
            Self::Bis => "BIS",
            Self::Bim => "BIM",
            Self::Bir => "BIR",
            Self::Bml => "BML",
            Self::Bms => "BMS",
            Self::Bmf => "BMF",
            Self::Bme => "BME",
            Self::Bol => "BOL",
            Self::Bos => "BOS",
            Self::Bof => "BOF",
            Self::Bog => "BOG",
            Self::Bee => "BEE",
            Self::Eil => "EIL",
            Self::Eis => "EIS",
            Self::Eml => "EML",
            Self::Ems => "EMS",
            Self::Eol => "EOL",
            Self::Eos => "EOS",
            Self::Eel => "EEL",
            Self::Ees => "EES",
            Self::Css => "CSS",
            Self::Csl => "CSL",
            Self::T1f => "T1F",
            Self::T1e => "T1E",
            Self::T2f => "T2F",
            Self::T2e => "T2E",
            Self::T3f => "T3F",
            Self::T3e => "T3E",
            Self::T4f => "T4F",
            Self::T4e => "T4E",
            Self::Mms => "MMS",
            Self::Mml => "MML",
            Self::Sts => "STS",
            Self::Stl => "STL",
        }
    }

    /// Chamber layer. TGC and NSW stations fold into the endcap layers they
    /// sit in front of.
    pub fn chamber_index(self) -> ChamberIndex {
        match self {
            Self::Bil | Self::Bim | Self::Bir => ChamberIndex::BIL,
            Self::Bis => ChamberIndex::BIS,
            Self::Bml | Self::Bme => ChamberIndex::BML,
            Self::Bms | Self::Bmf => ChamberIndex::BMS,
            Self::Bol => ChamberIndex::BOL,
            Self::Bos | Self::Bof | Self::Bog => ChamberIndex::BOS,
            Self::Bee => ChamberIndex::BEE,
            Self::Eil | Self::Mml | Self::Stl => ChamberIndex::EIL,
            Self::Eis | Self::Mms | Self::Sts => ChamberIndex::EIS,
            Self::Eml => ChamberIndex::EML,
            Self::Ems => ChamberIndex::EMS,
            Self::Eol => ChamberIndex::EOL,
            Self::Eos => ChamberIndex::EOS,
            Self::Eel => ChamberIndex::EEL,
            Self::Ees => ChamberIndex::EES,
            Self::Css => ChamberIndex::CSS,
            Self::Csl => ChamberIndex::CSL,
            Self::T4f | Self::T4e => ChamberIndex::EIL,
            Self::T1f | Self::T1e | Self::T2f | Self::T2e | Self::T3f | Self::T3e => {
                ChamberIndex::EML
            }
        }
    }

    pub fn station_index(self) -> StationIndex {
        self.chamber_index().station_index()
    }

    /// Small-sector chamber (even sector number).
    pub fn is_small(self) -> bool {
        match self {
            Self::T1f | Self::T1e | Self::T2f | Self::T2e | Self::T3f | Self::T3e => false,
            Self::T4f | Self::T4e => false,
            Self::Bee => true,
            other => {
                other.as_str().ends_with('S') || matches!(other, Self::Bmf | Self::Bof | Self::Bog)
            }
        }
    }

    pub fn is_tgc(self) -> bool {
        matches!(
            self,
            Self::T1f
                | Self::T1e
                | Self::T2f
                | Self::T2e
                | Self::T3f
                | Self::T3e
                | Self::T4f
                | Self::T4e
        )
    }

    /// TGC forward chambers (24 per wheel instead of 48).
    pub(crate) fn is_tgc_forward(self) -> bool {
        matches!(self, Self::T1f | Self::T2f | Self::T3f | Self::T4f)
    }
}

impl std::fmt::Display for StationName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
