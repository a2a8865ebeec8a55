use crate::{
    device::NexusObjectProvider,
    nexus::indices_attribute_name,
    tree::{NexusGroupNode, NexusNode, NexusTreeError, NexusTreeResult, NexusValue, join_path},
};
use std::rc::Rc;

/// A device whose fields are linked into NXdata groups as axes, or as values
/// recorded alongside the signal.
#[derive(Debug)]
pub(crate) struct AxisDataDevice {
    provider: Rc<NexusObjectProvider>,
    dimension_index: Option<usize>,
    is_default_axis: bool,
}

impl AxisDataDevice {
    pub(crate) fn new(
        provider: Rc<NexusObjectProvider>,
        dimension_index: Option<usize>,
        is_default_axis: bool,
    ) -> Self {
        Self {
            provider,
            dimension_index,
            is_default_axis,
        }
    }

    pub(crate) fn provider(&self) -> &Rc<NexusObjectProvider> {
        &self.provider
    }

    pub(crate) fn dimension_index(&self) -> Option<usize> {
        self.dimension_index
    }

    pub(crate) fn is_default_axis(&self) -> bool {
        self.is_default_axis
    }

    fn is_default_axis_field(&self, field_name: &str) -> bool {
        self.is_default_axis && self.provider.default_axis_data_field_name() == Some(field_name)
    }

    /// Dimensions of the signal which `field_name` varies along. The default axis field
    /// of a default axis varies along its own dimension only, anything else may vary
    /// along every scan dimension.
    fn indices(&self, field_name: &str, scan_rank: usize) -> Vec<usize> {
        match self.dimension_index {
            Some(index) if self.is_default_axis_field(field_name) => vec![index],
            _ => (0..scan_rank).collect(),
        }
    }

    /// Links the device's axis fields into `group`, sets their `_indices` attributes, and
    /// names the default axis field in `axes` at the device's dimension.
    /// # Parameters
    /// - group: the NXdata group being built.
    /// - device_path: absolute path of the device's group in the tree.
    /// - scan_rank: number of scan dimensions.
    /// - axes: the `@axes` attribute of the group, one entry per scan dimension.
    /// # Error Modes
    /// - Emits [NexusTreeError::DuplicateNode] if the name of an axis field in the group is
    ///   taken by anything but a link to that same field.
    pub(crate) fn add_to_data_group(
        &self,
        group: &mut NexusGroupNode,
        device_path: &str,
        scan_rank: usize,
        axes: &mut [String],
    ) -> NexusTreeResult<()> {
        for field_name in self.provider.axis_data_field_names() {
            let name = self.provider.data_field_name_in_nxdata(field_name);
            let target = join_path(device_path, field_name);
            // A scannable which is also the primary device is already linked.
            match group.child(&name) {
                None => group.add_link(&name, &target)?,
                Some(NexusNode::Link(existing)) if *existing == target => {}
                Some(_) => return Err(NexusTreeError::DuplicateNode { name }),
            }

            if self.is_default_axis_field(field_name) {
                if let Some(axis) = self.dimension_index.and_then(|index| axes.get_mut(index)) {
                    *axis = name.clone();
                }
            }
            let indices = self.indices(field_name, scan_rank);
            if !indices.is_empty() {
                group.set_attribute(&indices_attribute_name(&name), NexusValue::from_indices(indices));
            }
        }
        Ok(())
    }
}
