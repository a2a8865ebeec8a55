use super::{
    LazyField, NexusDataType, NexusField, NexusGroupNode, NexusTreeResult, NexusValue, join_path,
};

/// A field reserved in the tree when the file is built, and written once, later,
/// through [NexusFileInterface::commit].
///
/// [NexusFileInterface::commit]: crate::file::NexusFileInterface::commit
#[derive(Clone, Debug, PartialEq)]
pub struct PendingField {
    path: String,
}

impl PendingField {
    /// Adds a scalar lazy field to `parent` and returns the handle used to commit its value.
    /// # Parameters
    /// - parent: group in which to reserve the field.
    /// - parent_path: absolute path of `parent` in the tree.
    /// - name: name of the field.
    /// - data_type: type of the value that will be committed.
    /// - attributes: attributes written with the field, e.g. units.
    /// # Error Modes
    /// - Propagates [NexusTreeError::DuplicateNode] if the name is taken.
    ///
    /// [NexusTreeError::DuplicateNode]: super::NexusTreeError::DuplicateNode
    pub fn reserve(
        parent: &mut NexusGroupNode,
        parent_path: &str,
        name: &str,
        data_type: NexusDataType,
        attributes: &[(&str, NexusValue)],
    ) -> NexusTreeResult<Self> {
        let field = attributes.iter().fold(
            NexusField::lazy(LazyField::scalar(data_type)),
            |field, (attr, value)| field.with_attribute(attr, value.clone()),
        );
        parent.add_field(name, field)?;
        Ok(Self {
            path: join_path(parent_path, name),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}
