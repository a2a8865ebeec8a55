//! The description of one scan, from which its scan file is assembled.
use crate::{
    device::{MultipleNexusDevice, NexusScanInfo, ScanDevice},
    nexus::{NexusBaseClass, ScanRole},
    template::NexusTemplate,
    tree::NexusValue,
};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};

/// Scan-level metadata, written as constant fields before any device is added.
pub trait NexusMetadataProvider {
    /// The group of the entry the metadata belongs in: [NexusBaseClass::Instrument],
    /// [NexusBaseClass::Sample], or [NexusBaseClass::Entry] for the entry itself.
    fn category(&self) -> NexusBaseClass;

    /// Names and values of the fields to write, in order.
    fn nexus_metadata(&self) -> Vec<(String, NexusValue)>;
}

/// Metadata held as an ordered list of name/value pairs.
#[derive(Clone, Debug)]
pub struct MapMetadataProvider {
    category: NexusBaseClass,
    metadata: Vec<(String, NexusValue)>,
}

impl MapMetadataProvider {
    pub fn new(category: NexusBaseClass) -> Self {
        Self {
            category,
            metadata: Vec::new(),
        }
    }

    pub fn with<V: Into<NexusValue>>(mut self, name: &str, value: V) -> Self {
        self.metadata.push((name.to_owned(), value.into()));
        self
    }
}

impl NexusMetadataProvider for MapMetadataProvider {
    fn category(&self) -> NexusBaseClass {
        self.category
    }

    fn nexus_metadata(&self) -> Vec<(String, NexusValue)> {
        self.metadata.clone()
    }
}

/// Describes one scan. Built once, before the scan file is created,
/// and only read afterwards.
pub struct ScanModel {
    file_path: PathBuf,
    entry_name: String,
    devices: HashMap<ScanRole, Vec<ScanDevice>>,
    multiple_device: Option<Rc<dyn MultipleNexusDevice>>,
    dimension_names_by_index: Vec<Vec<String>>,
    scan_shape: Vec<usize>,
    scan_command: Option<String>,
    metadata_providers: Vec<Box<dyn NexusMetadataProvider>>,
    template_file_paths: Vec<PathBuf>,
    templates: Vec<Box<dyn NexusTemplate>>,
    metadata_writer: Option<ScanDevice>,
}

impl ScanModel {
    pub const DEFAULT_ENTRY_NAME: &'static str = "entry";

    pub fn new<P: Into<PathBuf>>(file_path: P) -> Self {
        Self {
            file_path: file_path.into(),
            entry_name: Self::DEFAULT_ENTRY_NAME.to_owned(),
            devices: HashMap::new(),
            multiple_device: None,
            dimension_names_by_index: Vec::new(),
            scan_shape: Vec::new(),
            scan_command: None,
            metadata_providers: Vec::new(),
            template_file_paths: Vec::new(),
            templates: Vec::new(),
            metadata_writer: None,
        }
    }

    pub fn with_file_path<P: Into<PathBuf>>(mut self, file_path: P) -> Self {
        self.file_path = file_path.into();
        self
    }

    pub fn with_entry_name(mut self, entry_name: &str) -> Self {
        self.entry_name = entry_name.to_owned();
        self
    }

    /// Appends a device to the list of the given role.
    pub fn with_device(mut self, role: ScanRole, device: ScanDevice) -> Self {
        self.devices.entry(role).or_default().push(device);
        self
    }

    /// Sets the bundle whose providers take their roles from their base classes.
    pub fn with_multiple_device(mut self, device: Rc<dyn MultipleNexusDevice>) -> Self {
        self.multiple_device = Some(device);
        self
    }

    /// Sets the names of the scannables moved along each scan dimension, in dimension order.
    pub fn with_dimension_names(mut self, dimension_names_by_index: Vec<Vec<String>>) -> Self {
        self.dimension_names_by_index = dimension_names_by_index;
        self
    }

    pub fn with_scan_shape(mut self, scan_shape: Vec<usize>) -> Self {
        self.scan_shape = scan_shape;
        self
    }

    pub fn with_scan_command(mut self, scan_command: &str) -> Self {
        self.scan_command = Some(scan_command.to_owned());
        self
    }

    pub fn with_metadata_provider(mut self, provider: Box<dyn NexusMetadataProvider>) -> Self {
        self.metadata_providers.push(provider);
        self
    }

    pub fn with_template_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.template_file_paths.push(path.into());
        self
    }

    pub fn with_template(mut self, template: Box<dyn NexusTemplate>) -> Self {
        self.templates.push(template);
        self
    }

    pub fn with_metadata_writer(mut self, device: ScanDevice) -> Self {
        self.metadata_writer = Some(device);
        self
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    pub fn devices(&self, role: ScanRole) -> &[ScanDevice] {
        self.devices
            .get(&role)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn multiple_device(&self) -> Option<&Rc<dyn MultipleNexusDevice>> {
        self.multiple_device.as_ref()
    }

    pub fn dimension_names_by_index(&self) -> &[Vec<String>] {
        &self.dimension_names_by_index
    }

    pub fn scan_shape(&self) -> &[usize] {
        &self.scan_shape
    }

    pub fn scan_command(&self) -> Option<&str> {
        self.scan_command.as_deref()
    }

    pub fn metadata_providers(&self) -> &[Box<dyn NexusMetadataProvider>] {
        &self.metadata_providers
    }

    pub fn template_file_paths(&self) -> &[PathBuf] {
        &self.template_file_paths
    }

    pub fn templates(&self) -> &[Box<dyn NexusTemplate>] {
        &self.templates
    }

    pub fn metadata_writer(&self) -> Option<&ScanDevice> {
        self.metadata_writer.as_ref()
    }

    /// The information handed to every device of the scan.
    pub fn nexus_scan_info(&self) -> NexusScanInfo {
        let device_names = ScanRole::ENTRY_ORDER
            .iter()
            .map(|role| {
                let names = self
                    .devices(*role)
                    .iter()
                    .map(|device| device.name().to_owned())
                    .collect();
                (*role, names)
            })
            .collect();
        NexusScanInfo::new(
            self.scan_shape.clone(),
            self.dimension_names_by_index.clone(),
            device_names,
            self.scan_command.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestDevice;

    #[test]
    fn scan_info_lists_device_names_by_role() {
        let model = ScanModel::new("scan.nxs")
            .with_device(ScanRole::Detector, TestDevice::detector("det1", "data").into())
            .with_device(ScanRole::Scannable, TestDevice::positioner("x").into())
            .with_device(ScanRole::Scannable, TestDevice::positioner("y").into())
            .with_scan_shape(vec![2, 3]);

        let info = model.nexus_scan_info();
        assert_eq!(info.device_names(ScanRole::Detector), ["det1".to_owned()]);
        assert_eq!(
            info.device_names(ScanRole::Scannable),
            ["x".to_owned(), "y".to_owned()]
        );
        assert!(info.device_names(ScanRole::MonitorPerScan).is_empty());
        assert_eq!(info.rank(), 2);
    }

    #[test]
    fn map_metadata_keeps_order() {
        let provider = MapMetadataProvider::new(NexusBaseClass::Sample)
            .with("name", "silicon")
            .with("temperature", 295.0);
        let names: Vec<_> = provider
            .nexus_metadata()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["name", "temperature"]);
        assert_eq!(provider.category(), NexusBaseClass::Sample);
    }
}
