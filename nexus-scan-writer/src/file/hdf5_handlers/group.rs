//! This module implements the [GroupExt] and [HasAttributesExt] traits for
//! the hdf5 [Group] type.
use super::{
    DatasetExt, GroupExt, HasAttributesExt, to_var_len_unicode, to_var_len_unicode_vec,
    write_value_attribute,
    error::{ConvertResult, NexusHDF5Result},
};
use crate::{
    nexus::{NexusBaseClass, labels},
    tree::{LazyField, LazyShape, NexusDataType, NexusValue},
};
use hdf5::{Attribute, Dataset, DatasetBuilderEmpty, Group, H5Type, SimpleExtents, types::VarLenUnicode};
use std::iter;

impl HasAttributesExt for Group {
    fn add_attribute<T: H5Type>(&self, attr: &str) -> NexusHDF5Result<Attribute> {
        self.new_attr::<T>().create(attr).err_group(self)
    }

    /// Creates a new string-typed attribute, with name and contents as specified.
    /// # Error Modes
    /// Appends the hdf5 path to any errors.
    /// - Propagates errors from [Self::add_attribute()].
    /// - Propagates errors from [write_scalar()].
    /// - Propagates [NexusHDF5Error::HDF5String] errors.
    ///
    /// [write_scalar()]: hdf5::Container::write_scalar()
    /// [NexusHDF5Error::HDF5String]: super::NexusHDF5Error::HDF5String
    fn add_constant_string_attribute(&self, attr: &str, value: &str) -> NexusHDF5Result<Attribute> {
        let attr = self.add_attribute::<VarLenUnicode>(attr)?;
        attr.write_scalar(&to_var_len_unicode(value).err_group(self)?)
            .err_group(self)?;
        Ok(attr)
    }

    fn add_value_attribute(&self, attr: &str, value: &NexusValue) -> NexusHDF5Result<Attribute> {
        write_value_attribute(self, attr, value).err_group(self)
    }

    /// Returns the attribute matching the given name.
    /// # Error Modes
    /// Appends the hdf5 path to any errors.
    /// - Propagates errors from [attr()], in particular if the attribute does not exist.
    ///
    /// [attr()]: hdf5::Location::attr()
    #[cfg(test)]
    fn get_attribute(&self, attr: &str) -> NexusHDF5Result<Attribute> {
        self.attr(attr).err_group(self)
    }
}

/// Creates a hdf5 [DatasetBuilderEmpty] object with the element type matching `data_type`.
fn get_dataset_builder(data_type: NexusDataType, parent: &Group) -> DatasetBuilderEmpty {
    match data_type {
        NexusDataType::Int => parent.new_dataset::<i64>(),
        NexusDataType::Float => parent.new_dataset::<f64>(),
        NexusDataType::Str => parent.new_dataset::<VarLenUnicode>(),
    }
}

impl GroupExt for Group {
    /// Create a new subgroup of this group, with name and class as specified.
    /// # Error Modes
    /// Appends the hdf5 path to any errors.
    /// - Propagates errors from [create_group()].
    /// - Propagates errors from [Self::set_nx_class()].
    ///
    /// [create_group()]: hdf5::Group::create_group()
    #[tracing::instrument(skip_all, level = "trace", err(level = "warn"))]
    fn add_new_group(&self, name: &str, class: NexusBaseClass) -> NexusHDF5Result<Group> {
        let group = self.create_group(name).err_group(self)?;
        group.set_nx_class(class)?;
        Ok(group)
    }

    #[tracing::instrument(skip_all, level = "trace", err(level = "warn"))]
    fn set_nx_class(&self, class: NexusBaseClass) -> NexusHDF5Result<()> {
        self.add_constant_string_attribute(labels::NX_CLASS, &class.to_string())?;
        Ok(())
    }

    #[tracing::instrument(skip_all, level = "trace", fields(name = name), err(level = "warn"))]
    fn create_constant_dataset(&self, name: &str, value: &NexusValue) -> NexusHDF5Result<Dataset> {
        let dataset = match value {
            NexusValue::Int(_) | NexusValue::Float(_) | NexusValue::Str(_) => {
                let dataset = get_dataset_builder(value.data_type(), self)
                    .create(name)
                    .err_group(self)?;
                dataset.set_value(value)?;
                dataset
            }
            NexusValue::IntArray(values) => self
                .new_dataset_builder()
                .with_data(values.as_slice())
                .create(name)
                .err_group(self)?,
            NexusValue::FloatArray(values) => self
                .new_dataset_builder()
                .with_data(values.as_slice())
                .create(name)
                .err_group(self)?,
            NexusValue::StrArray(values) => {
                let values = to_var_len_unicode_vec(values).err_group(self)?;
                self.new_dataset_builder()
                    .with_data(values.as_slice())
                    .create(name)
                    .err_group(self)?
            }
        };
        Ok(dataset)
    }

    #[tracing::instrument(skip_all, level = "trace", fields(name = name), err(level = "warn"))]
    fn create_lazy_dataset(&self, name: &str, lazy: &LazyField) -> NexusHDF5Result<Dataset> {
        let builder = get_dataset_builder(lazy.data_type, self);
        match &lazy.shape {
            LazyShape::Fixed(shape) if shape.is_empty() => builder.create(name),
            LazyShape::Fixed(shape) => builder.shape(shape.clone()).create(name),
            LazyShape::Extensible {
                scan_rank: 0,
                data_shape,
            } if data_shape.is_empty() => builder.create(name),
            LazyShape::Extensible {
                scan_rank: 0,
                data_shape,
            } => builder.shape(data_shape.clone()).create(name),
            LazyShape::Extensible {
                scan_rank,
                data_shape,
            } => {
                let initial = iter::repeat_n(0, *scan_rank)
                    .chain(data_shape.iter().copied())
                    .collect::<Vec<_>>();
                let chunk = iter::repeat_n(1, *scan_rank)
                    .chain(data_shape.iter().map(|extent| (*extent).max(1)))
                    .collect::<Vec<_>>();
                builder
                    .shape(SimpleExtents::resizable(initial))
                    .chunk(chunk)
                    .create(name)
            }
        }
        .err_group(self)
    }

    #[tracing::instrument(skip_all, level = "trace", fields(name = name, target = target), err(level = "warn"))]
    fn add_hard_link(&self, name: &str, target: &str) -> NexusHDF5Result<()> {
        self.link_hard(target, name).err_group(self)
    }

    /// Returns the dataset in this group matching the given name.
    /// # Error Modes
    /// Appends the hdf5 path to any errors.
    /// - Propagates errors from [dataset()], in particular if the dataset does not exist.
    ///
    /// [dataset()]: hdf5::Group::dataset()
    #[cfg(test)]
    fn get_dataset(&self, name: &str) -> NexusHDF5Result<Dataset> {
        self.dataset(name).err_group(self)
    }

    /// Returns the subgroup in this group matching the given name.
    /// # Error Modes
    /// Appends the hdf5 path to any errors.
    /// - Propagates errors from [group()], in particular if the subgroup does not exist.
    ///
    /// [group()]: hdf5::Group::group()
    fn get_group(&self, name: &str) -> NexusHDF5Result<Group> {
        self.group(name).err_group(self)
    }
}
