use super::{
    DatasetExt, HasAttributesExt, to_var_len_unicode, to_var_len_unicode_vec,
    write_value_attribute,
    error::{ConvertResult, NexusHDF5Result},
};
use crate::tree::NexusValue;
use hdf5::{Attribute, Dataset, H5Type, types::VarLenUnicode};

impl HasAttributesExt for Dataset {
    fn add_attribute<T: H5Type>(&self, attr: &str) -> NexusHDF5Result<Attribute> {
        self.new_attr::<T>().create(attr).err_dataset(self)
    }

    fn add_constant_string_attribute(&self, attr: &str, value: &str) -> NexusHDF5Result<Attribute> {
        let attr = self.add_attribute::<VarLenUnicode>(attr)?;
        attr.write_scalar(&to_var_len_unicode(value).err_dataset(self)?)
            .err_dataset(self)?;
        Ok(attr)
    }

    fn add_value_attribute(&self, attr: &str, value: &NexusValue) -> NexusHDF5Result<Attribute> {
        write_value_attribute(self, attr, value).err_dataset(self)
    }

    #[cfg(test)]
    fn get_attribute(&self, attr: &str) -> NexusHDF5Result<Attribute> {
        self.attr(attr).err_dataset(self)
    }
}

impl DatasetExt for Dataset {
    fn set_value(&self, value: &NexusValue) -> NexusHDF5Result<()> {
        match value {
            NexusValue::Int(value) => self.write_scalar(value),
            NexusValue::Float(value) => self.write_scalar(value),
            NexusValue::Str(value) => {
                self.write_scalar(&to_var_len_unicode(value).err_dataset(self)?)
            }
            NexusValue::IntArray(values) => self.write_raw(values.as_slice()),
            NexusValue::FloatArray(values) => self.write_raw(values.as_slice()),
            NexusValue::StrArray(values) => {
                self.write_raw(to_var_len_unicode_vec(values).err_dataset(self)?.as_slice())
            }
        }
        .err_dataset(self)
    }

    #[cfg(test)]
    fn get_string(&self) -> NexusHDF5Result<String> {
        let string: VarLenUnicode = self.read_scalar().err_dataset(self)?;
        Ok(string.into())
    }
}
