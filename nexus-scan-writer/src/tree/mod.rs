//! In-memory NeXus tree. The scan-file builder assembles the whole tree here
//! before a [NexusFileInterface] persists it.
//!
//! [NexusFileInterface]: crate::file::NexusFileInterface
mod error;
mod node;
mod pending;
mod value;

pub use error::{NexusTreeError, NexusTreeResult};
pub use node::{
    Attributes, FieldData, LazyField, LazyShape, NexusField, NexusGroupNode, NexusNode,
};
pub use pending::PendingField;
pub use value::{NexusDataType, NexusValue};

use crate::nexus::NexusBaseClass;

/// Joins a parent path and a child name into an absolute path.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() || parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

fn path_components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|component| !component.is_empty())
}

/// The root of a NeXus file.
#[derive(Clone, Debug, PartialEq)]
pub struct NexusTree {
    root: NexusGroupNode,
}

impl Default for NexusTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NexusTree {
    pub fn new() -> Self {
        Self {
            root: NexusGroupNode::new(NexusBaseClass::Root),
        }
    }

    pub fn root(&self) -> &NexusGroupNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut NexusGroupNode {
        &mut self.root
    }

    /// Returns the node at the given absolute path, without following links.
    pub fn node(&self, path: &str) -> Option<&NexusNode> {
        let mut components = path_components(path).peekable();
        let mut group = &self.root;
        while let Some(component) = components.next() {
            let node = group.child(component)?;
            if components.peek().is_none() {
                return Some(node);
            }
            group = node.as_group()?;
        }
        None
    }

    /// Returns the node at the given absolute path, following links at any depth.
    /// Link cycles are cut off after a fixed number of hops.
    pub fn resolve(&self, path: &str) -> Option<&NexusNode> {
        const MAX_LINK_HOPS: usize = 16;

        let mut current = self.node(path)?;
        for _ in 0..MAX_LINK_HOPS {
            match current {
                NexusNode::Link(target) => current = self.node(target)?,
                _ => return Some(current),
            }
        }
        None
    }

    pub fn group(&self, path: &str) -> Option<&NexusGroupNode> {
        if path_components(path).next().is_none() {
            return Some(&self.root);
        }
        self.node(path).and_then(NexusNode::as_group)
    }

    /// Returns the group at the given absolute path, mutably.
    /// # Error Modes
    /// - Emits [NexusTreeError::MissingNode] if there is no node at the path.
    /// - Emits [NexusTreeError::NotAGroup] if a node on the path is not a group.
    pub fn group_mut(&mut self, path: &str) -> NexusTreeResult<&mut NexusGroupNode> {
        let mut group = &mut self.root;
        for component in path_components(path) {
            group = match group.child_mut(component) {
                Some(NexusNode::Group(child)) => child,
                Some(_) => {
                    return Err(NexusTreeError::NotAGroup {
                        path: path.to_owned(),
                    });
                }
                None => {
                    return Err(NexusTreeError::MissingNode {
                        path: path.to_owned(),
                    });
                }
            };
        }
        Ok(group)
    }

    /// Returns the field at the given absolute path, mutably.
    pub(crate) fn field_mut(&mut self, path: &str) -> NexusTreeResult<&mut NexusField> {
        let (parent, name) = path.rsplit_once('/').ok_or_else(|| NexusTreeError::MissingNode {
            path: path.to_owned(),
        })?;
        self.group_mut(parent)?
            .field_mut(name)
            .ok_or_else(|| NexusTreeError::MissingNode {
                path: path.to_owned(),
            })
    }

    /// Replaces the lazy field at `field.path()` with a constant value.
    /// This is how in-memory files record a committed [PendingField].
    /// # Error Modes
    /// - Emits [NexusTreeError::NotALazyField] if the field was already written.
    /// - Emits [NexusTreeError::TypeMismatch] if the value does not match the reserved type.
    pub fn commit(&mut self, field: &PendingField, value: NexusValue) -> NexusTreeResult<()> {
        let node = self.field_mut(field.path())?;
        match node.data() {
            FieldData::Lazy(lazy) if lazy.data_type == value.data_type() => {
                node.set_data(FieldData::Constant(value));
                Ok(())
            }
            FieldData::Lazy(lazy) => Err(NexusTreeError::TypeMismatch {
                path: field.path().to_owned(),
                expected: lazy.data_type,
                found: value.data_type(),
            }),
            FieldData::Constant(_) => Err(NexusTreeError::NotALazyField {
                path: field.path().to_owned(),
            }),
        }
    }
}
