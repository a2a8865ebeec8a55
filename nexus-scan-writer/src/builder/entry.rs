//! Builds the NXentry group: default groups, metadata and every device's group.
use crate::{
    device::{CustomEntryModification, NexusObjectProvider},
    error::{NexusScanError, NexusScanResult},
    model::NexusMetadataProvider,
    nexus::{NexusBaseClass, labels},
    tree::{NexusField, NexusGroupNode, NexusTree, NexusTreeResult, join_path},
};
use tracing::debug;

mod groups {
    pub(super) const INSTRUMENT: &str = "instrument";
    pub(super) const SAMPLE: &str = "sample";
}

mod root_labels {
    pub(super) const FILE_NAME: &str = "file_name";
    pub(super) const FILE_TIME: &str = "file_time";
}

pub(crate) struct NexusEntryBuilder {
    entry_name: String,
    entry: NexusGroupNode,
}

impl NexusEntryBuilder {
    pub(crate) fn new(entry_name: &str) -> Self {
        Self {
            entry_name: entry_name.to_owned(),
            entry: NexusGroupNode::new(NexusBaseClass::Entry),
        }
    }

    pub(crate) fn entry(&self) -> &NexusGroupNode {
        &self.entry
    }

    pub(crate) fn entry_mut(&mut self) -> &mut NexusGroupNode {
        &mut self.entry
    }

    pub(crate) fn entry_path(&self) -> String {
        join_path("/", &self.entry_name)
    }

    /// Name of the entry's child in which groups of the given category are placed.
    fn parent_name(category: NexusBaseClass) -> Option<&'static str> {
        match category {
            NexusBaseClass::Instrument => Some(groups::INSTRUMENT),
            NexusBaseClass::Sample => Some(groups::SAMPLE),
            _ => None,
        }
    }

    fn parent_mut(&mut self, category: NexusBaseClass) -> NexusTreeResult<&mut NexusGroupNode> {
        match Self::parent_name(category) {
            Some(name) => self.entry.get_or_add_group(name, category),
            None => Ok(&mut self.entry),
        }
    }

    fn placement(provider: &NexusObjectProvider) -> NexusBaseClass {
        provider
            .category()
            .unwrap_or_else(|| provider.base_class().default_parent())
    }

    /// Absolute path of the provider's group once it is added to the entry.
    pub(crate) fn node_path(&self, provider: &NexusObjectProvider) -> String {
        let entry_path = self.entry_path();
        let parent_path = match Self::parent_name(Self::placement(provider)) {
            Some(name) => join_path(&entry_path, name),
            None => entry_path,
        };
        join_path(&parent_path, provider.name())
    }

    /// Creates the `instrument` and `sample` groups.
    pub(crate) fn add_default_groups(&mut self) -> NexusTreeResult<()> {
        self.entry
            .get_or_add_group(groups::INSTRUMENT, NexusBaseClass::Instrument)?;
        self.entry
            .get_or_add_group(groups::SAMPLE, NexusBaseClass::Sample)?;
        Ok(())
    }

    /// Writes each metadata field into the group of the provider's category.
    pub(crate) fn add_metadata(
        &mut self,
        provider: &dyn NexusMetadataProvider,
    ) -> NexusScanResult<()> {
        let parent = self.parent_mut(provider.category())?;
        for (name, value) in provider.nexus_metadata() {
            parent.add_field(&name, NexusField::constant(value))?;
        }
        Ok(())
    }

    /// Adds the provider's group to the entry, under `instrument`, `sample` or the
    /// entry itself according to its category, or else its base class.
    /// # Error Modes
    /// - Emits [NexusScanError::AddDevice] if the parent already has a child of that name.
    pub(crate) fn add_provider(&mut self, provider: &NexusObjectProvider) -> NexusScanResult<()> {
        let to_error = |source| NexusScanError::AddDevice {
            device: provider.name().to_owned(),
            source,
        };
        self.parent_mut(Self::placement(provider))
            .map_err(to_error)?
            .add_group(provider.name(), provider.nexus_object().clone())
            .map_err(to_error)?;
        debug!("Added {} at {}", provider.name(), self.node_path(provider));
        Ok(())
    }

    /// # Error Modes
    /// - Emits [NexusScanError::CustomModification] if the modification fails.
    pub(crate) fn modify_entry(
        &mut self,
        device_name: &str,
        modification: &dyn CustomEntryModification,
    ) -> NexusScanResult<()> {
        modification
            .modify_entry(&mut self.entry)
            .map_err(|source| NexusScanError::CustomModification {
                device: device_name.to_owned(),
                source,
            })
    }

    /// Places the entry in a new tree, as the tree's default entry.
    pub(crate) fn into_tree(self, file_name: &str, file_time: &str) -> NexusTreeResult<NexusTree> {
        let mut tree = NexusTree::new();
        let root = tree.root_mut();
        root.set_attribute(root_labels::FILE_NAME, file_name);
        root.set_attribute(root_labels::FILE_TIME, file_time);
        root.set_attribute(labels::DEFAULT, self.entry_name.as_str());
        root.add_group(&self.entry_name, self.entry)?;
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        device::{DeviceResult, NexusDevice, NexusScanInfo},
        model::MapMetadataProvider,
        test_utils::TestDevice,
        tree::{NexusTreeError, NexusValue},
    };

    fn provider(device: TestDevice) -> NexusObjectProvider {
        device.nexus_provider(&NexusScanInfo::default()).unwrap()
    }

    #[test]
    fn providers_placed_by_base_class() {
        let mut builder = NexusEntryBuilder::new("entry");
        builder.add_default_groups().unwrap();
        let detector = provider(TestDevice::detector("det1", "data"));
        let collection = provider(TestDevice::collection("notes"));
        builder.add_provider(&detector).unwrap();
        builder.add_provider(&collection).unwrap();

        assert_eq!(builder.node_path(&detector), "/entry/instrument/det1");
        assert_eq!(builder.node_path(&collection), "/entry/notes");
        assert!(builder.entry().group("instrument").unwrap().contains("det1"));
        assert!(builder.entry().contains("notes"));
    }

    #[test]
    fn category_overrides_base_class() {
        let mut builder = NexusEntryBuilder::new("entry");
        let stage = provider(TestDevice::positioner("stage_x")).with_category(NexusBaseClass::Sample);
        builder.add_provider(&stage).unwrap();
        assert_eq!(builder.node_path(&stage), "/entry/sample/stage_x");
        assert!(builder.entry().group("sample").unwrap().contains("stage_x"));
    }

    #[test]
    fn duplicate_device_name_fails() {
        let mut builder = NexusEntryBuilder::new("entry");
        builder
            .add_provider(&provider(TestDevice::detector("det1", "data")))
            .unwrap();
        let result = builder.add_provider(&provider(TestDevice::detector("det1", "image")));
        assert!(matches!(
            result,
            Err(NexusScanError::AddDevice { device, source: NexusTreeError::DuplicateNode { .. } })
                if device == "det1"
        ));
    }

    #[test]
    fn metadata_placed_by_category() {
        let mut builder = NexusEntryBuilder::new("entry");
        builder.add_default_groups().unwrap();
        builder
            .add_metadata(&MapMetadataProvider::new(NexusBaseClass::Sample).with("name", "silicon"))
            .unwrap();
        builder
            .add_metadata(&MapMetadataProvider::new(NexusBaseClass::Entry).with("title", "a scan"))
            .unwrap();
        let sample = builder.entry().group("sample").unwrap();
        assert_eq!(
            sample.field("name").unwrap().value(),
            Some(&NexusValue::Str("silicon".to_owned()))
        );
        assert!(builder.entry().contains("title"));
    }

    struct Failing;

    impl CustomEntryModification for Failing {
        fn modify_entry(&self, _: &mut NexusGroupNode) -> DeviceResult<()> {
            Err(crate::device::DeviceError::Other("no".to_owned()))
        }
    }

    #[test]
    fn failing_modification_names_the_device() {
        let mut builder = NexusEntryBuilder::new("entry");
        let result = builder.modify_entry("det1", &Failing);
        assert!(matches!(
            result,
            Err(NexusScanError::CustomModification { device, .. }) if device == "det1"
        ));
    }

    #[test]
    fn tree_defaults_to_entry() {
        let builder = NexusEntryBuilder::new("scan");
        let tree = builder.into_tree("scan.nxs", "2024-03-01T10:15:30.250+00:00").unwrap();
        assert_eq!(
            tree.root().attribute("default").and_then(NexusValue::as_str),
            Some("scan")
        );
        assert_eq!(
            tree.root().attribute("file_name").and_then(NexusValue::as_str),
            Some("scan.nxs")
        );
        assert!(tree.group("/scan").is_some());
    }
}
