use crate::{
    builder::providers::ProviderKey,
    device::NexusObjectProvider,
    error::{NexusScanError, NexusScanResult},
    nexus::ScanRole,
};
use std::rc::Rc;
use tracing::warn;

/// Roles in which a device can provide the signal of an NXdata group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PrimaryDeviceRole {
    Detector,
    MonitorPerPoint,
    Scannable,
}

impl TryFrom<ScanRole> for PrimaryDeviceRole {
    type Error = ScanRole;

    fn try_from(role: ScanRole) -> Result<Self, Self::Error> {
        match role {
            ScanRole::Detector => Ok(Self::Detector),
            ScanRole::MonitorPerPoint => Ok(Self::MonitorPerPoint),
            ScanRole::Scannable => Ok(Self::Scannable),
            ScanRole::MonitorPerScan => Err(role),
        }
    }
}

/// A field of the primary device, and the name of its link in an NXdata group.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DataGroupField {
    pub(crate) field_name: String,
    pub(crate) name_in_nxdata: String,
}

/// One NXdata group to build for a primary device.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DataGroupPlan {
    /// Name of the group, before it is made unique within the entry.
    pub(crate) name: String,
    pub(crate) signal: DataGroupField,
    pub(crate) auxiliary_signals: Vec<DataGroupField>,
}

/// A device providing the `@signal` of one or more NXdata groups.
#[derive(Debug)]
pub(crate) struct PrimaryDataDevice {
    key: ProviderKey,
    role: PrimaryDeviceRole,
    provider: Rc<NexusObjectProvider>,
    signal_field_name: String,
}

impl PrimaryDataDevice {
    /// # Error Modes
    /// - Emits [NexusScanError::InvalidPrimaryRole] if the role cannot provide a signal.
    /// - Emits [NexusScanError::NoPrimaryDevice] if the provider has no primary field.
    pub(crate) fn new(key: ProviderKey, provider: Rc<NexusObjectProvider>) -> NexusScanResult<Self> {
        let role = PrimaryDeviceRole::try_from(key.role).map_err(|role| {
            NexusScanError::InvalidPrimaryRole {
                device: provider.name().to_owned(),
                role,
            }
        })?;
        let signal_field_name = match role {
            PrimaryDeviceRole::Scannable => provider.default_axis_data_field_name(),
            PrimaryDeviceRole::Detector | PrimaryDeviceRole::MonitorPerPoint => {
                provider.primary_data_field_name()
            }
        }
        .ok_or(NexusScanError::NoPrimaryDevice)?
        .to_owned();
        Ok(Self {
            key,
            role,
            provider,
            signal_field_name,
        })
    }

    pub(crate) fn key(&self) -> ProviderKey {
        self.key
    }

    pub(crate) fn provider(&self) -> &Rc<NexusObjectProvider> {
        &self.provider
    }

    fn is_main_field(&self, field_name: &str) -> bool {
        self.provider.primary_data_field_name() == Some(field_name)
            || self.provider.default_axis_data_field_name() == Some(field_name)
    }

    /// Name of the field's link in NXdata groups. Monitors and scannables are named
    /// after the device, detectors only if the provider asks for it.
    fn name_in_nxdata(&self, field_name: &str) -> String {
        match self.role {
            PrimaryDeviceRole::Detector => self.provider.data_field_name_in_nxdata(field_name),
            PrimaryDeviceRole::MonitorPerPoint | PrimaryDeviceRole::Scannable => {
                if self.is_main_field(field_name) {
                    self.provider.name().to_owned()
                } else {
                    self.provider.device_based_field_name(field_name)
                }
            }
        }
    }

    fn field(&self, field_name: &str) -> DataGroupField {
        DataGroupField {
            field_name: field_name.to_owned(),
            name_in_nxdata: self.name_in_nxdata(field_name),
        }
    }

    /// Name of the group whose signal is `field_name`: the device name for its main
    /// field, `<device>_<field>` otherwise.
    fn group_name(&self, field_name: &str) -> String {
        if field_name == self.signal_field_name {
            self.provider.name().to_owned()
        } else {
            self.provider.device_based_field_name(field_name)
        }
    }

    /// The groups this device is the signal of: a main group, one per additional
    /// primary field and one per auxiliary data group. A scannable only has a main group.
    pub(crate) fn group_plans(&self) -> Vec<DataGroupPlan> {
        let main = DataGroupPlan {
            name: self.group_name(&self.signal_field_name),
            signal: self.field(&self.signal_field_name),
            auxiliary_signals: Vec::new(),
        };
        match self.role {
            PrimaryDeviceRole::Scannable => vec![main],
            PrimaryDeviceRole::Detector | PrimaryDeviceRole::MonitorPerPoint => {
                let additional = self
                    .provider
                    .additional_primary_field_names()
                    .iter()
                    .map(|field_name| DataGroupPlan {
                        name: self.group_name(field_name),
                        signal: self.field(field_name),
                        auxiliary_signals: Vec::new(),
                    });
                let auxiliary = self
                    .provider
                    .auxiliary_data_groups()
                    .iter()
                    .filter_map(|group| {
                        let Some(signal) = group.signal_field_name() else {
                            warn!(
                                "Auxiliary data group {} of {} has no fields",
                                group.name(),
                                self.provider.name()
                            );
                            return None;
                        };
                        Some(DataGroupPlan {
                            name: group.name().to_owned(),
                            signal: self.field(signal),
                            auxiliary_signals: group
                                .auxiliary_signal_field_names()
                                .iter()
                                .map(|field_name| self.field(field_name))
                                .collect(),
                        })
                    });
                std::iter::once(main)
                    .chain(additional)
                    .chain(auxiliary)
                    .collect()
            }
        }
    }
}
