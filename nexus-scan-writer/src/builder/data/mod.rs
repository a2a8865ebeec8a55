//! Plans and builds the NXdata groups of the entry: which devices provide the
//! signals, which provide the axes, and the attributes tying them together.
mod axis;
mod primary;
mod selector;

pub(crate) use axis::AxisDataDevice;
pub(crate) use primary::{DataGroupPlan, PrimaryDataDevice};
pub use selector::{DefaultDataGroupSelector, FirstDataGroupSelector};

use super::{
    entry::NexusEntryBuilder,
    providers::{ProviderKey, ProviderSet},
};
use crate::{
    device::NexusObjectProvider,
    error::{NexusScanError, NexusScanResult},
    nexus::{NexusBaseClass, ScanRole, labels},
    tree::{NexusGroupNode, NexusValue, join_path},
};
use std::{
    cell::OnceCell,
    collections::{BTreeSet, HashMap},
    rc::Rc,
};
use itertools::Itertools;
use tracing::debug;

/// Suffix appended to an NXdata group name until it no longer collides with
/// a child of the entry.
const COLLISION_SUFFIX: &str = "_data";

/// Roles which can take part in NXdata groups at all.
const DATA_ROLES: [ScanRole; 3] = [
    ScanRole::Detector,
    ScanRole::Scannable,
    ScanRole::MonitorPerPoint,
];

/// Returns `name`, suffixed as often as needed to be unique among the entry's children.
fn unique_group_name(entry: &NexusGroupNode, name: &str) -> String {
    let mut unique = name.to_owned();
    while entry.contains(&unique) {
        unique.push_str(COLLISION_SUFFIX);
    }
    unique
}

/// Maps each scannable name to the dimension it is the default axis of. A name is
/// the default axis of a dimension iff it is first in that dimension's names and
/// appears in no other dimension. Other names map to `None`.
fn default_axis_map(dimension_names_by_index: &[Vec<String>]) -> HashMap<String, Option<usize>> {
    let mut dimensions_by_name = HashMap::<&str, BTreeSet<usize>>::new();
    for (index, names) in dimension_names_by_index.iter().enumerate() {
        for name in names {
            dimensions_by_name.entry(name).or_default().insert(index);
        }
    }
    dimensions_by_name
        .into_iter()
        .map(|(name, dimensions)| {
            let default = dimensions.into_iter().exactly_one().ok().filter(|index| {
                dimension_names_by_index
                    .get(*index)
                    .and_then(|names| names.first())
                    .is_some_and(|first| first == name)
            });
            (name.to_owned(), default)
        })
        .collect()
}

fn has_primary_field((_, provider): &(ProviderKey, &Rc<NexusObjectProvider>)) -> bool {
    provider.primary_data_field_name().is_some()
}

/// Builds the NXdata groups of one scan. Axis devices and the default axis map are
/// computed once and reused for every group.
pub(crate) struct NexusDataBuilder<'a> {
    providers: &'a ProviderSet,
    dimension_names_by_index: &'a [Vec<String>],
    scan_rank: usize,
    selector: &'a dyn DefaultDataGroupSelector,
    axis_devices: HashMap<ProviderKey, Rc<AxisDataDevice>>,
    default_axis_map: OnceCell<HashMap<String, Option<usize>>>,
}

impl<'a> NexusDataBuilder<'a> {
    pub(crate) fn new(
        providers: &'a ProviderSet,
        dimension_names_by_index: &'a [Vec<String>],
        scan_rank: usize,
        selector: &'a dyn DefaultDataGroupSelector,
    ) -> Self {
        Self {
            providers,
            dimension_names_by_index,
            scan_rank,
            selector,
            axis_devices: HashMap::new(),
            default_axis_map: OnceCell::new(),
        }
    }

    fn default_axis_map(&self) -> &HashMap<String, Option<usize>> {
        self.default_axis_map
            .get_or_init(|| default_axis_map(self.dimension_names_by_index))
    }

    /// Finds the first dimension whose names include `name`.
    /// # Return
    /// The dimension, and whether `name` is the default axis of it.
    /// `(None, false)` if `name` is not a scan axis.
    pub(crate) fn get_scan_index(&self, name: &str) -> (Option<usize>, bool) {
        let Some((index, names)) = self
            .dimension_names_by_index
            .iter()
            .enumerate()
            .find(|(_, names)| names.iter().any(|n| n == name))
        else {
            return (None, false);
        };
        let is_first = names.first().is_some_and(|first| first == name);
        let is_default = self.default_axis_map().get(name) == Some(&Some(index));
        (Some(index), is_first && is_default)
    }

    /// Returns the axis device of the provider, creating it on first request.
    pub(crate) fn axis_device(
        &mut self,
        key: ProviderKey,
        provider: &Rc<NexusObjectProvider>,
    ) -> Rc<AxisDataDevice> {
        if let Some(device) = self.axis_devices.get(&key) {
            return device.clone();
        }
        let (dimension_index, is_default_axis) = self.get_scan_index(provider.name());
        let device = Rc::new(AxisDataDevice::new(
            provider.clone(),
            dimension_index,
            is_default_axis,
        ));
        self.axis_devices.insert(key, device.clone());
        device
    }

    /// Every detector with a primary field if there is one, otherwise the first
    /// per-point monitor, or else scannable, with a primary field.
    /// # Error Modes
    /// - Emits [NexusScanError::NoPrimaryDevice] if no device has a primary field.
    fn primary_devices(&self) -> NexusScanResult<Vec<PrimaryDataDevice>> {
        let detectors = self
            .providers
            .keyed(ScanRole::Detector)
            .filter(has_primary_field)
            .map(|(key, provider)| PrimaryDataDevice::new(key, provider.clone()))
            .collect::<NexusScanResult<Vec<_>>>()?;
        if !detectors.is_empty() {
            return Ok(detectors);
        }

        [ScanRole::MonitorPerPoint, ScanRole::Scannable]
            .into_iter()
            .find_map(|role| self.providers.keyed(role).find(has_primary_field))
            .map(|(key, provider)| {
                PrimaryDataDevice::new(key, provider.clone()).map(|device| vec![device])
            })
            .unwrap_or(Err(NexusScanError::NoPrimaryDevice))
    }

    /// Axis devices of groups whose signal is `primary`: every per-point monitor other
    /// than the primary itself, then every scannable.
    fn axis_devices_for(&mut self, primary: &PrimaryDataDevice) -> Vec<Rc<AxisDataDevice>> {
        let providers = self.providers;
        let monitors = providers
            .keyed(ScanRole::MonitorPerPoint)
            .filter(|(key, _)| *key != primary.key());
        let scannables = providers.keyed(ScanRole::Scannable);
        monitors
            .chain(scannables)
            .map(|(key, provider)| self.axis_device(key, provider))
            .collect()
    }

    fn build_group(
        &mut self,
        entry: &mut NexusEntryBuilder,
        primary: &PrimaryDataDevice,
        plan: &DataGroupPlan,
        group_name: &str,
    ) -> NexusScanResult<()> {
        let device_path = entry.node_path(primary.provider());
        let mut group = NexusGroupNode::new(NexusBaseClass::Data);

        group.add_link(
            &plan.signal.name_in_nxdata,
            &join_path(&device_path, &plan.signal.field_name),
        )?;
        group.set_attribute(labels::SIGNAL, plan.signal.name_in_nxdata.as_str());

        for auxiliary in &plan.auxiliary_signals {
            if !group.contains(&auxiliary.name_in_nxdata) {
                group.add_link(
                    &auxiliary.name_in_nxdata,
                    &join_path(&device_path, &auxiliary.field_name),
                )?;
            }
        }
        if !plan.auxiliary_signals.is_empty() {
            let names = plan
                .auxiliary_signals
                .iter()
                .map(|auxiliary| auxiliary.name_in_nxdata.clone())
                .collect::<Vec<_>>();
            group.set_attribute(labels::AUXILIARY_SIGNALS, names);
        }

        let mut axes = vec![labels::NO_AXIS.to_owned(); self.scan_rank];
        for axis in self.axis_devices_for(primary) {
            let axis_path = entry.node_path(axis.provider());
            axis.add_to_data_group(&mut group, &axis_path, self.scan_rank, &mut axes)?;
        }
        if self.scan_rank > 0 {
            group.set_attribute(labels::AXES, axes);
        }

        entry.entry_mut().add_group(group_name, group)?;
        debug!("Added NXdata group {group_name} with signal {}", plan.signal.name_in_nxdata);
        Ok(())
    }

    /// Adds the NXdata groups to the entry and sets the entry's default group.
    /// Groups added before an error are left in the entry.
    /// # Return
    /// Names of the NXdata groups added, in order.
    /// # Error Modes
    /// - Emits [NexusScanError::NoDevices] if there is no detector, per-point monitor or
    ///   scannable.
    /// - Emits [NexusScanError::NoPrimaryDevice] if none of them has a primary field.
    /// - Emits [NexusScanError::DataGroup] if a group cannot be built.
    #[tracing::instrument(skip_all, level = "debug", err(level = "warn"))]
    pub(crate) fn build(mut self, entry: &mut NexusEntryBuilder) -> NexusScanResult<Vec<String>> {
        if !self.providers.has_any(&DATA_ROLES) {
            return Err(NexusScanError::NoDevices);
        }

        let mut group_names = Vec::new();
        for primary in self.primary_devices()? {
            for plan in primary.group_plans() {
                let group_name = unique_group_name(entry.entry(), &plan.name);
                self.build_group(entry, &primary, &plan, &group_name)
                    .map_err(|source| NexusScanError::DataGroup {
                        group: group_name.clone(),
                        source: Box::new(source),
                    })?;
                group_names.push(group_name);
            }
        }

        let data_groups = entry.entry().group_names_of_class(NexusBaseClass::Data);
        if let Some(default) = self.selector.select(&data_groups) {
            entry
                .entry_mut()
                .set_attribute(labels::DEFAULT, NexusValue::Str(default));
        }
        Ok(group_names)
    }
}
