//! Devices and clocks with predictable behaviour, for use in tests.
use crate::{
    builder::Clock,
    device::{
        AuxiliaryDataGroup, CustomEntryModification, DeviceError, DeviceResult, NexusDevice,
        NexusObjectProvider, NexusScanInfo, ScanDevice,
    },
    nexus::{NexusBaseClass, NexusDateTime, ScanRole},
    tree::{LazyField, NexusDataType, NexusField, NexusGroupNode, NexusValue},
};
use std::{cell::RefCell, collections::VecDeque, path::PathBuf, rc::Rc};

/// Provides a group with one per-point float field for each of its data fields.
#[derive(Clone, Debug)]
pub(crate) struct TestDevice {
    name: String,
    base_class: NexusBaseClass,
    primary_field: Option<String>,
    additional_fields: Vec<String>,
    auxiliary_groups: Vec<(String, Vec<String>)>,
    data_shape: Vec<usize>,
    role: Option<ScanRole>,
    use_device_name_in_nxdata: Option<bool>,
    external_files: Vec<PathBuf>,
    entry_field: Option<(String, NexusValue)>,
    failing: bool,
}

impl TestDevice {
    fn new(name: &str, base_class: NexusBaseClass, primary_field: Option<&str>) -> Self {
        Self {
            name: name.to_owned(),
            base_class,
            primary_field: primary_field.map(ToOwned::to_owned),
            additional_fields: Vec::new(),
            auxiliary_groups: Vec::new(),
            data_shape: Vec::new(),
            role: None,
            use_device_name_in_nxdata: None,
            external_files: Vec::new(),
            entry_field: None,
            failing: false,
        }
    }

    pub(crate) fn detector(name: &str, field: &str) -> Self {
        Self::new(name, NexusBaseClass::Detector, Some(field))
    }

    pub(crate) fn positioner(name: &str) -> Self {
        Self::new(name, NexusBaseClass::Positioner, Some("value"))
    }

    pub(crate) fn monitor(name: &str, field: &str) -> Self {
        Self::new(name, NexusBaseClass::Monitor, Some(field))
    }

    pub(crate) fn collection(name: &str) -> Self {
        Self::new(name, NexusBaseClass::Collection, None)
    }

    /// A device which cannot give its provider.
    pub(crate) fn failing(name: &str) -> Self {
        Self {
            failing: true,
            ..Self::new(name, NexusBaseClass::Detector, Some("data"))
        }
    }

    pub(crate) fn with_role(mut self, role: ScanRole) -> Self {
        self.role = Some(role);
        self
    }

    pub(crate) fn with_device_name_in_nxdata(mut self, use_device_name: bool) -> Self {
        self.use_device_name_in_nxdata = Some(use_device_name);
        self
    }

    pub(crate) fn with_external_file(mut self, path: &str) -> Self {
        self.external_files.push(PathBuf::from(path));
        self
    }

    pub(crate) fn with_data_shape(mut self, data_shape: &[usize]) -> Self {
        self.data_shape = data_shape.to_vec();
        self
    }

    pub(crate) fn with_additional_primary_field(mut self, field: &str) -> Self {
        self.additional_fields.push(field.to_owned());
        self
    }

    pub(crate) fn with_auxiliary_group(mut self, name: &str, fields: &[&str]) -> Self {
        self.auxiliary_groups.push((
            name.to_owned(),
            fields.iter().map(|field| field.to_string()).collect(),
        ));
        self
    }

    /// Keeps the group's field, but does not mark it as primary.
    pub(crate) fn without_primary(mut self) -> Self {
        self.primary_field = None;
        self
    }

    /// Adds a field to the entry once the device's group is written.
    pub(crate) fn with_entry_field<V: Into<NexusValue>>(mut self, name: &str, value: V) -> Self {
        self.entry_field = Some((name.to_owned(), value.into()));
        self
    }

    fn field_names(&self) -> Vec<&str> {
        let primary = match self.base_class {
            NexusBaseClass::Collection => None,
            _ => Some(self.primary_field.as_deref().unwrap_or("data")),
        };
        primary
            .into_iter()
            .chain(self.additional_fields.iter().map(String::as_str))
            .chain(
                self.auxiliary_groups
                    .iter()
                    .flat_map(|(_, fields)| fields.iter().map(String::as_str)),
            )
            .collect()
    }
}

impl NexusDevice for TestDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn nexus_provider(&self, info: &NexusScanInfo) -> DeviceResult<NexusObjectProvider> {
        if self.failing {
            return Err(DeviceError::NotConfigured {
                device: self.name.clone(),
                reason: "not connected".to_owned(),
            });
        }
        let mut group = NexusGroupNode::new(self.base_class);
        for field_name in self.field_names() {
            if !group.contains(field_name) {
                group.add_field(
                    field_name,
                    NexusField::lazy(LazyField::per_point(
                        NexusDataType::Float,
                        info.rank(),
                        &self.data_shape,
                    )),
                )?;
            }
        }
        if self.base_class == NexusBaseClass::Collection {
            group.add_field("description", NexusField::constant(self.name.as_str()))?;
        }

        let mut provider = NexusObjectProvider::new(&self.name, group);
        if let Some(primary) = &self.primary_field {
            provider = provider.with_primary_data_field(primary);
        }
        for field in &self.additional_fields {
            provider = provider.with_additional_primary_field(field);
        }
        for (name, fields) in &self.auxiliary_groups {
            provider = provider.with_auxiliary_data_group(AuxiliaryDataGroup::new(name, fields));
        }
        if let Some(role) = self.role {
            provider = provider.with_role(role);
        }
        if let Some(use_device_name) = self.use_device_name_in_nxdata {
            provider = provider.with_use_device_name_in_nxdata(use_device_name);
        }
        for path in &self.external_files {
            provider = provider.with_external_file_path(path.clone());
        }
        Ok(provider)
    }

    fn custom_entry_modification(&self) -> Option<&dyn CustomEntryModification> {
        self.entry_field.as_ref().map(|_| self as &dyn CustomEntryModification)
    }
}

impl CustomEntryModification for TestDevice {
    fn modify_entry(&self, entry: &mut NexusGroupNode) -> DeviceResult<()> {
        if let Some((name, value)) = &self.entry_field {
            entry.add_field(name, NexusField::constant(value.clone()))?;
        }
        Ok(())
    }
}

impl From<TestDevice> for ScanDevice {
    fn from(device: TestDevice) -> Self {
        ScanDevice::Single(Rc::new(device))
    }
}

/// Gives the times it was created with, in order, and then the last of them forever.
pub(crate) struct SequenceClock {
    times: RefCell<VecDeque<NexusDateTime>>,
}

impl SequenceClock {
    pub(crate) fn new<I: IntoIterator<Item = NexusDateTime>>(times: I) -> Self {
        Self {
            times: RefCell::new(times.into_iter().collect()),
        }
    }
}

impl Clock for SequenceClock {
    fn now(&self) -> NexusDateTime {
        let mut times = self.times.borrow_mut();
        match times.len() {
            0 => NexusDateTime::default(),
            1 => times.front().copied().unwrap_or_default(),
            _ => times.pop_front().unwrap_or_default(),
        }
    }
}
