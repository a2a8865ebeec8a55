//! A scan described in JSON, from which the binary builds its [ScanModel].
use crate::{
    device::{
        AuxiliaryDataGroup, CustomEntryModification, DeviceResult, NexusDevice,
        NexusObjectProvider, NexusScanInfo, ScanDevice, ScanMetadataWriter,
    },
    error::NexusScanResult,
    model::{MapMetadataProvider, ScanModel},
    nexus::{NexusBaseClass, ScanRole},
    tree::{LazyField, NexusDataType, NexusField, NexusGroupNode, NexusValue},
};
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path, rc::Rc};

/// A field of a configured device. Fields with a value are written when the file is
/// created, the others are reserved for one value per scan point.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ConfiguredField {
    pub name: String,
    #[serde(rename = "type", default = "default_data_type")]
    pub data_type: NexusDataType,
    /// Shape of the value at each scan point.
    #[serde(default)]
    pub shape: Vec<usize>,
    #[serde(default)]
    pub value: Option<NexusValue>,
    #[serde(default)]
    pub attributes: BTreeMap<String, NexusValue>,
}

fn default_data_type() -> NexusDataType {
    NexusDataType::Float
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ConfiguredAuxiliaryGroup {
    pub name: String,
    pub fields: Vec<String>,
}

/// A device whose group is fully described by configuration.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ConfiguredDevice {
    pub name: String,
    pub role: ScanRole,
    pub base_class: NexusBaseClass,
    #[serde(default)]
    pub category: Option<NexusBaseClass>,
    #[serde(default)]
    pub fields: Vec<ConfiguredField>,
    #[serde(default)]
    pub primary_field: Option<String>,
    #[serde(default)]
    pub additional_primary_fields: Vec<String>,
    #[serde(default)]
    pub auxiliary_groups: Vec<ConfiguredAuxiliaryGroup>,
    #[serde(default)]
    pub axis_fields: Vec<String>,
    #[serde(default)]
    pub default_axis_field: Option<String>,
    #[serde(default)]
    pub use_device_name_in_nxdata: Option<bool>,
    #[serde(default)]
    pub external_files: Vec<String>,
    /// Constant fields added to the entry once the device's group is written.
    #[serde(default)]
    pub entry_fields: BTreeMap<String, NexusValue>,
}

impl NexusDevice for ConfiguredDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn nexus_provider(&self, info: &NexusScanInfo) -> DeviceResult<NexusObjectProvider> {
        let mut group = NexusGroupNode::new(self.base_class);
        for field in &self.fields {
            let mut nexus_field = match &field.value {
                Some(value) => NexusField::constant(value.clone()),
                None => NexusField::lazy(LazyField::per_point(
                    field.data_type,
                    info.rank(),
                    &field.shape,
                )),
            };
            for (name, value) in &field.attributes {
                nexus_field = nexus_field.with_attribute(name, value.clone());
            }
            group.add_field(&field.name, nexus_field)?;
        }

        let mut provider = NexusObjectProvider::new(&self.name, group);
        if let Some(category) = self.category {
            provider = provider.with_category(category);
        }
        if let Some(primary_field) = &self.primary_field {
            provider = provider.with_primary_data_field(primary_field);
        }
        for field in &self.additional_primary_fields {
            provider = provider.with_additional_primary_field(field);
        }
        for group in &self.auxiliary_groups {
            provider =
                provider.with_auxiliary_data_group(AuxiliaryDataGroup::new(&group.name, &group.fields));
        }
        for field in &self.axis_fields {
            provider = provider.with_axis_data_field(field);
        }
        if let Some(field) = &self.default_axis_field {
            provider = provider.with_default_axis_data_field(field);
        }
        if let Some(use_device_name) = self.use_device_name_in_nxdata {
            provider = provider.with_use_device_name_in_nxdata(use_device_name);
        }
        for path in &self.external_files {
            provider = provider.with_external_file_path(path);
        }
        Ok(provider)
    }

    fn custom_entry_modification(&self) -> Option<&dyn CustomEntryModification> {
        (!self.entry_fields.is_empty()).then_some(self as &dyn CustomEntryModification)
    }
}

impl CustomEntryModification for ConfiguredDevice {
    fn modify_entry(&self, entry: &mut NexusGroupNode) -> DeviceResult<()> {
        for (name, value) in &self.entry_fields {
            entry.add_field(name, NexusField::constant(value.clone()))?;
        }
        Ok(())
    }
}

/// Constant fields written to one group of the entry before any device.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ConfiguredMetadata {
    #[serde(default = "default_category")]
    pub category: NexusBaseClass,
    pub fields: BTreeMap<String, NexusValue>,
}

fn default_category() -> NexusBaseClass {
    NexusBaseClass::Entry
}

fn default_metadata_writer() -> bool {
    true
}

/// Everything needed to assemble the file of one scan.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ScanDescription {
    pub file_path: String,
    #[serde(default)]
    pub entry_name: Option<String>,
    #[serde(default)]
    pub scan_shape: Vec<usize>,
    #[serde(default)]
    pub dimension_names: Vec<Vec<String>>,
    #[serde(default)]
    pub scan_command: Option<String>,
    pub devices: Vec<ConfiguredDevice>,
    #[serde(default)]
    pub metadata: Vec<ConfiguredMetadata>,
    #[serde(default)]
    pub templates: Vec<String>,
    /// Adds a [ScanMetadataWriter] to the scan.
    #[serde(default = "default_metadata_writer")]
    pub metadata_writer: bool,
}

impl ScanDescription {
    pub fn load(path: &Path) -> NexusScanResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Builds the model, with the devices in the order they were described.
    pub fn into_model(self) -> ScanModel {
        let mut model = ScanModel::new(&self.file_path)
            .with_dimension_names(self.dimension_names)
            .with_scan_shape(self.scan_shape);
        if let Some(entry_name) = &self.entry_name {
            model = model.with_entry_name(entry_name);
        }
        if let Some(scan_command) = &self.scan_command {
            model = model.with_scan_command(scan_command);
        }
        for metadata in self.metadata {
            let provider = metadata
                .fields
                .into_iter()
                .fold(MapMetadataProvider::new(metadata.category), |provider, (name, value)| {
                    provider.with(&name, value)
                });
            model = model.with_metadata_provider(Box::new(provider));
        }
        for device in self.devices {
            model = model.with_device(device.role, ScanDevice::Single(Rc::new(device)));
        }
        for template in &self.templates {
            model = model.with_template_file(template);
        }
        if self.metadata_writer {
            model = model.with_metadata_writer(ScanDevice::Single(Rc::new(
                ScanMetadataWriter::default(),
            )));
        }
        model
    }
}
