use crate::{
    nexus::{NexusBaseClass, ScanRole},
    tree::NexusGroupNode,
};
use std::path::PathBuf;

/// A named group of fields which, as a whole, gets its own NXdata group.
/// The first field is the signal, the rest are auxiliary signals.
#[derive(Clone, Debug, PartialEq)]
pub struct AuxiliaryDataGroup {
    name: String,
    field_names: Vec<String>,
}

impl AuxiliaryDataGroup {
    pub fn new<S: ToString>(name: &str, field_names: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.to_owned(),
            field_names: field_names.into_iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn signal_field_name(&self) -> Option<&str> {
        self.field_names.first().map(String::as_str)
    }

    pub fn auxiliary_signal_field_names(&self) -> &[String] {
        self.field_names.get(1..).unwrap_or_default()
    }
}

/// One device's contribution to a scan file: the group to add to the entry,
/// and how its fields take part in NXdata groups.
#[derive(Clone, Debug)]
pub struct NexusObjectProvider {
    name: String,
    category: Option<NexusBaseClass>,
    nexus_object: NexusGroupNode,
    primary_data_field_name: Option<String>,
    additional_primary_field_names: Vec<String>,
    auxiliary_data_groups: Vec<AuxiliaryDataGroup>,
    axis_data_field_names: Vec<String>,
    default_axis_data_field_name: Option<String>,
    role: Option<ScanRole>,
    use_device_name_in_nxdata: Option<bool>,
    external_file_paths: Vec<PathBuf>,
}

impl NexusObjectProvider {
    /// Creates a provider for the given group. The base class of the provider is
    /// the class of the group.
    pub fn new(name: &str, nexus_object: NexusGroupNode) -> Self {
        Self {
            name: name.to_owned(),
            category: None,
            nexus_object,
            primary_data_field_name: None,
            additional_primary_field_names: Vec::new(),
            auxiliary_data_groups: Vec::new(),
            axis_data_field_names: Vec::new(),
            default_axis_data_field_name: None,
            role: None,
            use_device_name_in_nxdata: None,
            external_file_paths: Vec::new(),
        }
    }

    /// Places the group under the entry's group of this class, instead of the
    /// default for the base class.
    pub fn with_category(mut self, category: NexusBaseClass) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_primary_data_field(mut self, field_name: &str) -> Self {
        self.primary_data_field_name = Some(field_name.to_owned());
        self
    }

    pub fn with_additional_primary_field(mut self, field_name: &str) -> Self {
        self.additional_primary_field_names.push(field_name.to_owned());
        self
    }

    pub fn with_auxiliary_data_group(mut self, group: AuxiliaryDataGroup) -> Self {
        self.auxiliary_data_groups.push(group);
        self
    }

    pub fn with_axis_data_field(mut self, field_name: &str) -> Self {
        self.axis_data_field_names.push(field_name.to_owned());
        self
    }

    pub fn with_default_axis_data_field(mut self, field_name: &str) -> Self {
        self.default_axis_data_field_name = Some(field_name.to_owned());
        self
    }

    /// States the role of the device, overriding the role of the list it was given in.
    pub fn with_role(mut self, role: ScanRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_use_device_name_in_nxdata(mut self, use_device_name: bool) -> Self {
        self.use_device_name_in_nxdata = Some(use_device_name);
        self
    }

    pub fn with_external_file_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.external_file_paths.push(path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_class(&self) -> NexusBaseClass {
        self.nexus_object.nx_class()
    }

    pub fn category(&self) -> Option<NexusBaseClass> {
        self.category
    }

    pub fn nexus_object(&self) -> &NexusGroupNode {
        &self.nexus_object
    }

    /// `None` if the device cannot be the primary device of an NXdata group.
    pub fn primary_data_field_name(&self) -> Option<&str> {
        self.primary_data_field_name.as_deref()
    }

    pub fn additional_primary_field_names(&self) -> &[String] {
        &self.additional_primary_field_names
    }

    pub fn auxiliary_data_groups(&self) -> &[AuxiliaryDataGroup] {
        &self.auxiliary_data_groups
    }

    /// Fields linked into NXdata groups when the device is an axis.
    /// Defaults to the primary field.
    pub fn axis_data_field_names(&self) -> Vec<&str> {
        if self.axis_data_field_names.is_empty() {
            self.primary_data_field_name().into_iter().collect()
        } else {
            self.axis_data_field_names
                .iter()
                .map(String::as_str)
                .collect()
        }
    }

    /// Defaults to the primary field.
    pub fn default_axis_data_field_name(&self) -> Option<&str> {
        self.default_axis_data_field_name
            .as_deref()
            .or(self.primary_data_field_name())
    }

    pub fn role(&self) -> Option<ScanRole> {
        self.role
    }

    /// Positioners and monitors are named after the device in NXdata groups by default.
    pub fn use_device_name_in_nxdata(&self) -> bool {
        self.use_device_name_in_nxdata.unwrap_or(matches!(
            self.base_class(),
            NexusBaseClass::Positioner | NexusBaseClass::Monitor
        ))
    }

    pub fn external_file_paths(&self) -> &[PathBuf] {
        &self.external_file_paths
    }

    /// Name of `field_name` when linked into an NXdata group. When the device name
    /// is used, the main field takes the device name and other fields are prefixed by it.
    pub fn data_field_name_in_nxdata(&self, field_name: &str) -> String {
        if !self.use_device_name_in_nxdata() {
            return field_name.to_owned();
        }
        let is_main_field = self.default_axis_data_field_name() == Some(field_name)
            || self.primary_data_field_name() == Some(field_name);
        if is_main_field {
            self.name.clone()
        } else {
            self.device_based_field_name(field_name)
        }
    }

    /// `<device>_<field>`
    pub fn device_based_field_name(&self, field_name: &str) -> String {
        format!("{}_{field_name}", self.name)
    }
}
