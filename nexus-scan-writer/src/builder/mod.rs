//! Assembles the in-memory NeXus tree of a scan from its [ScanModel].
mod data;
mod entry;
pub(crate) mod providers;
mod timestamps;

pub use data::{DefaultDataGroupSelector, FirstDataGroupSelector};
pub use timestamps::{Clock, ScanTimestamps, SystemClock, format_timestamp};

use crate::{
    device::DeviceDecorator,
    error::{NexusScanError, NexusScanResult},
    model::ScanModel,
    nexus::ScanRole,
    tree::NexusTree,
};
use data::NexusDataBuilder;
use entry::NexusEntryBuilder;
use providers::{ProviderSet, extract_providers};
use std::rc::Rc;
use tracing::{debug, info};

/// The products of building a scan: its tree, the timestamps still to be ended,
/// and the providers the tree was built from.
pub(crate) struct BuiltScan {
    pub(crate) tree: NexusTree,
    pub(crate) timestamps: ScanTimestamps,
    pub(crate) providers: ProviderSet,
}

pub(crate) struct NexusScanFileBuilder<'a> {
    model: &'a ScanModel,
    decorator: &'a dyn DeviceDecorator,
    selector: &'a dyn DefaultDataGroupSelector,
    clock: Rc<dyn Clock>,
}

impl<'a> NexusScanFileBuilder<'a> {
    pub(crate) fn new(
        model: &'a ScanModel,
        decorator: &'a dyn DeviceDecorator,
        selector: &'a dyn DefaultDataGroupSelector,
        clock: Rc<dyn Clock>,
    ) -> Self {
        Self {
            model,
            decorator,
            selector,
            clock,
        }
    }

    /// Applies the custom entry modification of every device of the role which has one.
    fn modify_entry(
        entry: &mut NexusEntryBuilder,
        providers: &ProviderSet,
        role: ScanRole,
    ) -> NexusScanResult<()> {
        for device in providers.devices(role) {
            if let Some(modification) = device.custom_entry_modification() {
                entry.modify_entry(device.name(), modification)?;
            }
        }
        Ok(())
    }

    /// Adds the metadata writer's group to the entry, then applies its modification.
    fn add_metadata_writer(&self, entry: &mut NexusEntryBuilder) -> NexusScanResult<()> {
        let Some(writer) = self.model.metadata_writer() else {
            return Ok(());
        };
        let info = self.model.nexus_scan_info();
        for provider in writer.nexus_providers(&info).map_err(|source| {
            NexusScanError::MetadataWriter {
                device: writer.name().to_owned(),
                source,
            }
        })? {
            entry.add_provider(&provider)?;
        }
        if let Some(modification) = writer.custom_entry_modification() {
            entry.modify_entry(writer.name(), modification)?;
        }
        Ok(())
    }

    /// Builds the tree in the following order: default groups, metadata, start time,
    /// each role's device groups followed by their entry modifications, the bundle's
    /// modification, the metadata writer and finally the NXdata groups.
    /// # Error Modes
    /// Any error aborts the build. See [extract_providers] and [NexusDataBuilder::build].
    #[tracing::instrument(skip_all, level = "debug", fields(file = %self.model.file_path().display()), err(level = "warn"))]
    pub(crate) fn build(&self) -> NexusScanResult<BuiltScan> {
        let info = self.model.nexus_scan_info();
        let providers = extract_providers(self.model, &info, self.decorator)?;

        let mut entry = NexusEntryBuilder::new(self.model.entry_name());
        entry.add_default_groups()?;
        for metadata in self.model.metadata_providers() {
            entry.add_metadata(metadata.as_ref())?;
        }

        let mut timestamps = ScanTimestamps::new(self.clock.clone());
        let entry_path = entry.entry_path();
        timestamps.start(entry.entry_mut(), &entry_path)?;

        for role in ScanRole::ENTRY_ORDER {
            for provider in providers.get(role) {
                entry.add_provider(provider)?;
            }
            Self::modify_entry(&mut entry, &providers, role)?;
        }
        if let Some(bundle) = providers.multiple_device() {
            if let Some(modification) = bundle.custom_entry_modification() {
                entry.modify_entry(bundle.name(), modification)?;
            }
        }
        self.add_metadata_writer(&mut entry)?;

        let data_groups = NexusDataBuilder::new(
            &providers,
            self.model.dimension_names_by_index(),
            info.rank(),
            self.selector,
        )
        .build(&mut entry)?;
        debug!("Built NXdata groups {data_groups:?}");

        let file_time = timestamps
            .start_time()
            .map(|start| format_timestamp(&start))
            .unwrap_or_default();
        let tree = entry.into_tree(&self.model.file_path().display().to_string(), &file_time)?;
        info!("Built NeXus tree of {}", self.model.file_path().display());
        Ok(BuiltScan {
            tree,
            timestamps,
            providers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        device::{
            CustomEntryModification, DeviceError, DeviceResult, IdentityDecorator,
            MultipleNexusDevice, NexusDevice, NexusObjectProvider, NexusScanInfo, ScanDevice,
            ScanMetadataWriter,
        },
        model::MapMetadataProvider,
        nexus::{NexusBaseClass, NexusDateTime},
        test_utils::{SequenceClock, TestDevice},
        tree::{NexusField, NexusGroupNode, NexusValue},
    };
    use chrono::DateTime;

    fn scan_start() -> NexusDateTime {
        DateTime::parse_from_rfc3339("2024-03-01T10:15:30.250+00:00")
            .unwrap()
            .to_utc()
    }

    fn build(model: &ScanModel) -> NexusScanResult<BuiltScan> {
        NexusScanFileBuilder::new(
            model,
            &IdentityDecorator,
            &FirstDataGroupSelector,
            Rc::new(SequenceClock::new([scan_start()])),
        )
        .build()
    }

    fn model() -> ScanModel {
        ScanModel::new("/tmp/scan.nxs")
            .with_device(ScanRole::Detector, TestDevice::detector("det1", "data").into())
            .with_device(ScanRole::Scannable, TestDevice::positioner("x").into())
            .with_dimension_names(vec![vec!["x".to_owned()]])
            .with_scan_shape(vec![3])
    }

    fn child_names(group: &NexusGroupNode) -> Vec<&str> {
        group.children().map(|(name, _)| name).collect()
    }

    #[test]
    fn entry_layout() {
        let model = model()
            .with_metadata_provider(Box::new(
                MapMetadataProvider::new(NexusBaseClass::Entry).with("title", "grid"),
            ))
            .with_metadata_provider(Box::new(
                MapMetadataProvider::new(NexusBaseClass::Instrument).with("name", "i99"),
            ))
            .with_metadata_writer(ScanDevice::Single(Rc::new(ScanMetadataWriter::default())));
        let built = build(&model).unwrap();

        let root = built.tree.root();
        assert_eq!(
            root.attribute("default").and_then(NexusValue::as_str),
            Some("entry")
        );
        assert_eq!(
            root.attribute("file_name").and_then(NexusValue::as_str),
            Some("/tmp/scan.nxs")
        );
        assert_eq!(
            root.attribute("file_time").and_then(NexusValue::as_str),
            Some("2024-03-01T10:15:30.250+00:00")
        );

        let entry = built.tree.group("/entry").unwrap();
        assert_eq!(
            child_names(entry),
            vec![
                "instrument",
                "sample",
                "title",
                "start_time",
                "end_time",
                "duration",
                "scan_metadata",
                "program_name",
                "det1",
            ]
        );
        assert_eq!(
            child_names(built.tree.group("/entry/instrument").unwrap()),
            vec!["name", "det1", "x"]
        );
        assert_eq!(
            entry.attribute("default").and_then(NexusValue::as_str),
            Some("det1")
        );
        assert_eq!(built.timestamps.start_time(), Some(scan_start()));
        assert_eq!(built.providers.get(ScanRole::Detector).len(), 1);
    }

    #[test]
    fn device_modifications_follow_their_role() {
        let model = model().with_device(
            ScanRole::MonitorPerScan,
            TestDevice::monitor("ring", "current")
                .with_entry_field("ring_mode", "top-up")
                .into(),
        );
        let built = build(&model).unwrap();
        let entry = built.tree.group("/entry").unwrap();
        assert_eq!(
            entry
                .field("ring_mode")
                .and_then(NexusField::value)
                .and_then(NexusValue::as_str),
            Some("top-up")
        );
    }

    struct Bundle;

    impl MultipleNexusDevice for Bundle {
        fn name(&self) -> &str {
            "bundle"
        }

        fn nexus_providers(&self, info: &NexusScanInfo) -> DeviceResult<Vec<NexusObjectProvider>> {
            Ok(vec![
                TestDevice::detector("bundle_det", "data").nexus_provider(info)?,
            ])
        }

        fn custom_entry_modification(&self) -> Option<&dyn CustomEntryModification> {
            Some(self)
        }
    }

    impl CustomEntryModification for Bundle {
        fn modify_entry(&self, entry: &mut NexusGroupNode) -> DeviceResult<()> {
            // Sees every device's group, as it runs after all roles.
            let detectors = entry
                .group("instrument")
                .map(|instrument| instrument.group_names_of_class(NexusBaseClass::Detector))
                .unwrap_or_default();
            entry.add_field("bundle_detectors", NexusField::constant(detectors))?;
            Ok(())
        }
    }

    #[test]
    fn bundle_modification_runs_after_every_role() {
        let model = model().with_multiple_device(Rc::new(Bundle));
        let built = build(&model).unwrap();
        let detectors = built
            .tree
            .group("/entry")
            .unwrap()
            .field("bundle_detectors")
            .and_then(NexusField::value)
            .cloned();
        assert_eq!(
            detectors,
            Some(NexusValue::from(vec!["det1".to_owned(), "bundle_det".to_owned()]))
        );
        assert!(built.tree.group("/entry/bundle_det").is_some());
    }

    #[test]
    fn failing_metadata_writer_aborts() {
        let model = model().with_metadata_writer(TestDevice::failing("meta").into());
        assert!(matches!(
            build(&model),
            Err(NexusScanError::MetadataWriter { device, source: DeviceError::NotConfigured { .. } })
                if device == "meta"
        ));
    }

    #[test]
    fn scan_without_data_devices_fails() {
        let model = ScanModel::new("/tmp/scan.nxs").with_device(
            ScanRole::MonitorPerScan,
            TestDevice::monitor("ring", "current").into(),
        );
        assert!(matches!(build(&model), Err(NexusScanError::NoDevices)));
    }

    #[test]
    fn colliding_device_names_fail() {
        let model = model().with_device(ScanRole::Detector, TestDevice::detector("det1", "image").into());
        assert!(matches!(
            build(&model),
            Err(NexusScanError::AddDevice { device, .. }) if device == "det1"
        ));
    }
}
