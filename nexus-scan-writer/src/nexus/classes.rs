//! This module defines the [NexusBaseClass] enum which encapsulates the textual "NX_class" hdf5 attribute.
use serde::Deserialize;

/// Encapsulates the textual "NX_class" hdf5 attribute, which appears in each group, indicating its purpose.
/// Only the base classes the scan-file writer places, links or is handed by devices are listed.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, Deserialize,
)]
#[serde(try_from = "String")]
pub enum NexusBaseClass {
    #[strum(to_string = "NXroot")]
    Root,
    #[strum(to_string = "NXentry")]
    Entry,
    #[strum(to_string = "NXinstrument")]
    Instrument,
    #[strum(to_string = "NXsample")]
    Sample,
    #[strum(to_string = "NXdata")]
    Data,
    #[strum(to_string = "NXdetector")]
    Detector,
    #[strum(to_string = "NXmonitor")]
    Monitor,
    #[strum(to_string = "NXpositioner")]
    Positioner,
    #[strum(to_string = "NXcollection")]
    Collection,
    #[strum(to_string = "NXsource")]
    Source,
    #[strum(to_string = "NXslit")]
    Slit,
    #[strum(to_string = "NXmirror")]
    Mirror,
    #[strum(to_string = "NXbeam")]
    Beam,
    #[strum(to_string = "NXenvironment")]
    Environment,
    #[strum(to_string = "NXuser")]
    User,
    #[strum(to_string = "NXnote")]
    Note,
    #[strum(to_string = "NXlog")]
    Log,
    #[strum(to_string = "NXparameters")]
    Parameters,
    #[strum(to_string = "NXprocess")]
    Process,
}

impl TryFrom<String> for NexusBaseClass {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl NexusBaseClass {
    /// The default group of an entry in which a device of this class is placed.
    /// Returns one of [Self::Instrument], [Self::Sample] or [Self::Entry].
    pub fn default_parent(&self) -> NexusBaseClass {
        match self {
            Self::Detector
            | Self::Monitor
            | Self::Positioner
            | Self::Source
            | Self::Slit
            | Self::Mirror
            | Self::Beam => Self::Instrument,
            Self::Environment => Self::Sample,
            _ => Self::Entry,
        }
    }
}
