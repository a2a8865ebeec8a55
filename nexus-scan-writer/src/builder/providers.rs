//! Turns the devices of a [ScanModel] into providers, indexed by scan role.
use crate::{
    device::{DeviceDecorator, NexusObjectProvider, NexusScanInfo, ScanDevice},
    error::{NexusScanError, NexusScanResult},
    model::ScanModel,
    nexus::ScanRole,
};
use metrics::counter;
use nexus_scan_common::metrics::{
    failures::{FailureKind, get_label},
    names::FAILURES,
};
use std::{collections::HashMap, path::PathBuf, rc::Rc};
use tracing::{debug, warn};

/// Identifies a provider by its role and its position in that role's list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ProviderKey {
    pub(crate) role: ScanRole,
    pub(crate) index: usize,
}

/// Providers of every device of the scan, by role, in the order they were given.
#[derive(Default)]
pub(crate) struct ProviderSet {
    providers: HashMap<ScanRole, Vec<Rc<NexusObjectProvider>>>,
    devices: HashMap<ScanRole, Vec<ScanDevice>>,
    multiple_device: Option<ScanDevice>,
}

impl ProviderSet {
    fn push(&mut self, role: ScanRole, provider: NexusObjectProvider) {
        self.providers
            .entry(role)
            .or_default()
            .push(Rc::new(provider));
    }

    pub(crate) fn get(&self, role: ScanRole) -> &[Rc<NexusObjectProvider>] {
        self.providers
            .get(&role)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Providers of the given role with their keys, in order.
    pub(crate) fn keyed(
        &self,
        role: ScanRole,
    ) -> impl Iterator<Item = (ProviderKey, &Rc<NexusObjectProvider>)> {
        self.get(role)
            .iter()
            .enumerate()
            .map(move |(index, provider)| (ProviderKey { role, index }, provider))
    }

    pub(crate) fn has_any(&self, roles: &[ScanRole]) -> bool {
        roles.iter().any(|role| !self.get(*role).is_empty())
    }

    /// The decorated devices given in the list of the role, in order.
    pub(crate) fn devices(&self, role: ScanRole) -> &[ScanDevice] {
        self.devices
            .get(&role)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(crate) fn multiple_device(&self) -> Option<&ScanDevice> {
        self.multiple_device.as_ref()
    }

    /// Every external file written by any provider, across all roles.
    pub(crate) fn external_file_paths(&self) -> Vec<PathBuf> {
        ScanRole::ENTRY_ORDER
            .iter()
            .flat_map(|role| self.get(*role))
            .flat_map(|provider| provider.external_file_paths().iter().cloned())
            .collect()
    }
}

/// Decorates every device of the model and collects their providers.
/// # Error Modes
/// - Emits [NexusScanError::DeviceProvider] if a device, other than a per-scan monitor,
///   fails to give its providers. Failing per-scan monitors are logged and skipped.
/// - Emits [NexusScanError::MultipleDeviceProvider] if the model's multiple device fails.
/// - Emits [NexusScanError::UnmappedBaseClass] if a provider of the model's multiple
///   device has a base class with no scan role.
#[tracing::instrument(skip_all, level = "debug", err(level = "warn"))]
pub(crate) fn extract_providers(
    model: &ScanModel,
    info: &NexusScanInfo,
    decorator: &dyn DeviceDecorator,
) -> NexusScanResult<ProviderSet> {
    let mut set = ProviderSet::default();

    for role in ScanRole::ENTRY_ORDER {
        for device in model.devices(role) {
            let device = decorator.decorate(device.clone());
            let providers = match device.nexus_providers(info) {
                Ok(providers) => providers,
                Err(source) if role == ScanRole::MonitorPerScan => {
                    warn!(
                        "Skipping per-scan monitor {}, cannot get its nexus provider: {source}",
                        device.name()
                    );
                    counter!(FAILURES, &[get_label(FailureKind::DeviceProviderFailed)])
                        .increment(1);
                    continue;
                }
                Err(source) => {
                    return Err(NexusScanError::DeviceProvider {
                        device: device.name().to_owned(),
                        role,
                        source,
                    });
                }
            };
            for provider in providers {
                let provider_role = provider.role().unwrap_or(role);
                debug!("Device {} provides {} as {provider_role}", device.name(), provider.name());
                set.push(provider_role, provider);
            }
            set.devices.entry(role).or_default().push(device);
        }
    }

    if let Some(multiple_device) = model.multiple_device() {
        let device = decorator.decorate(ScanDevice::Multiple(multiple_device.clone()));
        let providers = device.nexus_providers(info).map_err(|source| {
            NexusScanError::MultipleDeviceProvider {
                device: device.name().to_owned(),
                source,
            }
        })?;
        for provider in providers {
            let role = ScanRole::from_base_class(provider.base_class()).ok_or_else(|| {
                NexusScanError::UnmappedBaseClass {
                    device: provider.name().to_owned(),
                    base_class: provider.base_class(),
                }
            })?;
            set.push(role, provider);
        }
        set.multiple_device = Some(device);
    }
    Ok(set)
}
