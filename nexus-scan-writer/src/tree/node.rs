use super::{NexusDataType, NexusTreeError, NexusTreeResult, NexusValue};
use crate::nexus::NexusBaseClass;

/// Ordered set of named attributes. Setting an existing name replaces its value in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attributes(Vec<(String, NexusValue)>);

impl Attributes {
    pub fn set(&mut self, name: &str, value: NexusValue) {
        match self.0.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((name.to_owned(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&NexusValue> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NexusValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Shape of a field whose contents are written after the file is created.
#[derive(Clone, Debug, PartialEq)]
pub enum LazyShape {
    /// Shape known up front, written once (e.g. `end_time`). An empty shape is a scalar.
    Fixed(Vec<usize>),
    /// Grows along the scan dimensions as points are written; `data_shape` is the
    /// shape of one point.
    Extensible {
        scan_rank: usize,
        data_shape: Vec<usize>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct LazyField {
    pub data_type: NexusDataType,
    pub shape: LazyShape,
}

impl LazyField {
    pub fn scalar(data_type: NexusDataType) -> Self {
        Self {
            data_type,
            shape: LazyShape::Fixed(Vec::new()),
        }
    }

    pub fn per_point(data_type: NexusDataType, scan_rank: usize, data_shape: &[usize]) -> Self {
        Self {
            data_type,
            shape: LazyShape::Extensible {
                scan_rank,
                data_shape: data_shape.to_vec(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldData {
    Constant(NexusValue),
    Lazy(LazyField),
}

#[derive(Clone, Debug, PartialEq)]
pub struct NexusField {
    data: FieldData,
    attributes: Attributes,
}

impl NexusField {
    pub fn constant<V: Into<NexusValue>>(value: V) -> Self {
        Self {
            data: FieldData::Constant(value.into()),
            attributes: Attributes::default(),
        }
    }

    pub fn lazy(lazy: LazyField) -> Self {
        Self {
            data: FieldData::Lazy(lazy),
            attributes: Attributes::default(),
        }
    }

    pub fn with_attribute<V: Into<NexusValue>>(mut self, name: &str, value: V) -> Self {
        self.attributes.set(name, value.into());
        self
    }

    pub fn data(&self) -> &FieldData {
        &self.data
    }

    pub fn value(&self) -> Option<&NexusValue> {
        match &self.data {
            FieldData::Constant(value) => Some(value),
            FieldData::Lazy(_) => None,
        }
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self.data, FieldData::Lazy(_))
    }

    pub(crate) fn set_data(&mut self, data: FieldData) {
        self.data = data;
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&NexusValue> {
        self.attributes.get(name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NexusNode {
    Group(NexusGroupNode),
    Field(NexusField),
    /// Hard link to the node at the given absolute path.
    Link(String),
}

impl NexusNode {
    pub fn as_group(&self) -> Option<&NexusGroupNode> {
        match self {
            Self::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&NexusField> {
        match self {
            Self::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&str> {
        match self {
            Self::Link(target) => Some(target),
            _ => None,
        }
    }
}

/// A NeXus group held in memory. Children keep their insertion order, which is
/// the order in which they are written to file.
#[derive(Clone, Debug, PartialEq)]
pub struct NexusGroupNode {
    nx_class: NexusBaseClass,
    attributes: Attributes,
    children: Vec<(String, NexusNode)>,
}

impl NexusGroupNode {
    pub fn new(nx_class: NexusBaseClass) -> Self {
        Self {
            nx_class,
            attributes: Attributes::default(),
            children: Vec::new(),
        }
    }

    pub fn nx_class(&self) -> NexusBaseClass {
        self.nx_class
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&NexusValue> {
        self.attributes.get(name)
    }

    pub fn set_attribute<V: Into<NexusValue>>(&mut self, name: &str, value: V) {
        self.attributes.set(name, value.into());
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &NexusNode)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    pub fn child(&self, name: &str) -> Option<&NexusNode> {
        self.children
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, node)| node)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut NexusNode> {
        self.children
            .iter_mut()
            .find(|(existing, _)| existing == name)
            .map(|(_, node)| node)
    }

    pub fn group(&self, name: &str) -> Option<&NexusGroupNode> {
        self.child(name).and_then(NexusNode::as_group)
    }

    pub fn group_mut(&mut self, name: &str) -> Option<&mut NexusGroupNode> {
        match self.child_mut(name) {
            Some(NexusNode::Group(group)) => Some(group),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&NexusField> {
        self.child(name).and_then(NexusNode::as_field)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut NexusField> {
        match self.child_mut(name) {
            Some(NexusNode::Field(field)) => Some(field),
            _ => None,
        }
    }

    /// Adds a new child node.
    /// # Error Modes
    /// - Emits [NexusTreeError::DuplicateNode] if a child of that name already exists.
    pub fn add_node(&mut self, name: &str, node: NexusNode) -> NexusTreeResult<&mut NexusNode> {
        if self.contains(name) {
            return Err(NexusTreeError::DuplicateNode {
                name: name.to_owned(),
            });
        }
        self.children.push((name.to_owned(), node));
        self.children
            .last_mut()
            .map(|(_, node)| node)
            .ok_or_else(|| NexusTreeError::MissingNode {
                path: name.to_owned(),
            })
    }

    pub fn add_group(
        &mut self,
        name: &str,
        group: NexusGroupNode,
    ) -> NexusTreeResult<&mut NexusGroupNode> {
        match self.add_node(name, NexusNode::Group(group))? {
            NexusNode::Group(group) => Ok(group),
            _ => Err(NexusTreeError::NotAGroup {
                path: name.to_owned(),
            }),
        }
    }

    pub fn add_field(&mut self, name: &str, field: NexusField) -> NexusTreeResult<()> {
        self.add_node(name, NexusNode::Field(field))?;
        Ok(())
    }

    pub fn add_link(&mut self, name: &str, target: &str) -> NexusTreeResult<()> {
        self.add_node(name, NexusNode::Link(target.to_owned()))?;
        Ok(())
    }

    /// Returns the named subgroup, creating it with the given class if absent.
    /// # Error Modes
    /// - Emits [NexusTreeError::NotAGroup] if a child of that name exists but is not a group.
    pub fn get_or_add_group(
        &mut self,
        name: &str,
        nx_class: NexusBaseClass,
    ) -> NexusTreeResult<&mut NexusGroupNode> {
        if !self.contains(name) {
            return self.add_group(name, NexusGroupNode::new(nx_class));
        }
        self.group_mut(name).ok_or_else(|| NexusTreeError::NotAGroup {
            path: name.to_owned(),
        })
    }

    /// Names of the direct subgroups of the given class, in insertion order.
    pub fn group_names_of_class(&self, nx_class: NexusBaseClass) -> Vec<String> {
        self.children
            .iter()
            .filter(|(_, node)| {
                node.as_group()
                    .is_some_and(|group| group.nx_class == nx_class)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}
