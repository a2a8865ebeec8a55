//! Defines traits which extend hdf5 types [Group], [Dataset] and [Attribute],
//! so that the in-memory NeXus tree can be written to file conveniently and robustly.
mod dataset;
mod error;
mod group;

use crate::{
    nexus::NexusBaseClass,
    tree::{LazyField, NexusValue},
};
pub(crate) use error::ConvertResult;
pub use error::{NexusHDF5Error, NexusHDF5Result};
use hdf5::{Attribute, Dataset, Group, H5Type, Location, types::VarLenUnicode};

/// This is implemented by hdf5 types [Group] and [Dataset], both can have attributes set
/// and this trait provides a common interface for them both.
pub(crate) trait HasAttributesExt: Sized {
    /// Implementation should create a new attribute, with name as specified.
    /// # Parameters
    ///  - attr: name of the attribute to add
    /// # Error Modes
    /// Implementations should propagate any hdf5 errors and call the approriate `NexusHDF5Result::err_xxx(self)` on any error
    /// to set the error's `hdf5_path` field
    fn add_attribute<T: H5Type>(&self, attr: &str) -> NexusHDF5Result<Attribute>;

    /// Implementation should create a new string-typed attribute, with name and contents as specified.
    /// # Parameters
    ///  - attr: name of the attribute to add
    ///  - value: content of the attribute to add
    /// # Error Modes
    /// Implementations should propagate any hdf5 errors and call `NexusHDF5Result::err_xxx(self)` on any error
    /// to set the error's `hdf5_path` field
    fn add_constant_string_attribute(&self, attr: &str, value: &str) -> NexusHDF5Result<Attribute>;

    /// Implementation should create a new attribute holding the given [NexusValue],
    /// with the hdf5 type and shape matching the value.
    /// # Parameters
    ///  - attr: name of the attribute to add
    ///  - value: content of the attribute to add
    fn add_value_attribute(&self, attr: &str, value: &NexusValue) -> NexusHDF5Result<Attribute>;

    /// Implementation should return the attribute matching the given name.
    #[cfg(test)]
    fn get_attribute(&self, attr: &str) -> NexusHDF5Result<Attribute>;
}

pub(crate) trait GroupExt {
    /// Implementation should create a new subgroup of this group, with name and class as specified.
    /// # Parameters
    ///  - name: name of the group to add.
    ///  - class: NeXus class of the group to add.
    /// # Error Modes
    /// Implementations should propagate any hdf5 errors and set the error's `hdf5_path` field.
    fn add_new_group(&self, name: &str, class: NexusBaseClass) -> NexusHDF5Result<Group>;

    /// Implementation should create an attribute in this group named "NX_class" and contents as specified.
    fn set_nx_class(&self, class: NexusBaseClass) -> NexusHDF5Result<()>;

    /// Implementation should create a dataset whose contents are known, and write them.
    /// Scalar values give scalar datasets, arrays give one-dimensional datasets.
    fn create_constant_dataset(&self, name: &str, value: &NexusValue) -> NexusHDF5Result<Dataset>;

    /// Implementation should create an unpopulated dataset with the type and shape of `lazy`.
    /// Extensible shapes are resizable along their scan dimensions and chunked one point at a time.
    fn create_lazy_dataset(&self, name: &str, lazy: &LazyField) -> NexusHDF5Result<Dataset>;

    /// Implementation should create a hard link in this group, to the object at `target`.
    fn add_hard_link(&self, name: &str, target: &str) -> NexusHDF5Result<()>;

    /// Implementation should return the dataset in this group matching the given name.
    #[cfg(test)]
    fn get_dataset(&self, name: &str) -> NexusHDF5Result<Dataset>;

    /// Implementation should return the subgroup in this group matching the given name.
    fn get_group(&self, name: &str) -> NexusHDF5Result<Group>;
}

/// This trait provides methods to be called on the hdf5 [Dataset] type.
pub(crate) trait DatasetExt {
    /// Implementation should write the value into the dataset, which must already have a
    /// compatible type and shape.
    /// # Error Modes
    /// Implementations should propagate any hdf5 errors and set the error's `hdf5_path` field.
    fn set_value(&self, value: &NexusValue) -> NexusHDF5Result<()>;

    /// Implementation should read a scalar string from the dataset.
    #[cfg(test)]
    fn get_string(&self) -> NexusHDF5Result<String>;
}

/// Converts a string into the variable length unicode type used for all hdf5 strings.
pub(crate) fn to_var_len_unicode(value: &str) -> NexusHDF5Result<VarLenUnicode> {
    Ok(value.parse::<VarLenUnicode>()?)
}

fn to_var_len_unicode_vec(values: &[String]) -> NexusHDF5Result<Vec<VarLenUnicode>> {
    values
        .iter()
        .map(|value| to_var_len_unicode(value))
        .collect()
}

/// Creates an attribute on any hdf5 object and writes the value to it.
/// Errors are not given a path here, callers do this.
fn write_value_attribute(
    location: &Location,
    attr: &str,
    value: &NexusValue,
) -> NexusHDF5Result<Attribute> {
    let attribute = match value {
        NexusValue::Int(value) => {
            let attribute = location.new_attr::<i64>().create(attr)?;
            attribute.write_scalar(value)?;
            attribute
        }
        NexusValue::Float(value) => {
            let attribute = location.new_attr::<f64>().create(attr)?;
            attribute.write_scalar(value)?;
            attribute
        }
        NexusValue::Str(value) => {
            let attribute = location.new_attr::<VarLenUnicode>().create(attr)?;
            attribute.write_scalar(&to_var_len_unicode(value)?)?;
            attribute
        }
        NexusValue::IntArray(values) => {
            let attribute = location.new_attr::<i64>().shape(values.len()).create(attr)?;
            attribute.write_raw(values.as_slice())?;
            attribute
        }
        NexusValue::FloatArray(values) => {
            let attribute = location.new_attr::<f64>().shape(values.len()).create(attr)?;
            attribute.write_raw(values.as_slice())?;
            attribute
        }
        NexusValue::StrArray(values) => {
            let values = to_var_len_unicode_vec(values)?;
            let attribute = location
                .new_attr::<VarLenUnicode>()
                .shape(values.len())
                .create(attr)?;
            attribute.write_raw(values.as_slice())?;
            attribute
        }
    };
    Ok(attribute)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{env::temp_dir, ops::Deref, path::PathBuf};

    use super::*;
    use crate::tree::NexusDataType;
    use hdf5::types::VarLenUnicode;

    // Helper struct to create and tidy-up a temp hdf5 file
    pub(crate) struct OneTempFile(Option<hdf5::File>, PathBuf);
    // Suitably long temp file name, unlikely to clash with anything else
    const TEMP_FILE_PREFIX: &str = "temp_nexus_scan_writer_hdf5_handlers_file";

    impl OneTempFile {
        //  We need a different file for each test, so they can run in parallel
        pub(crate) fn new(test_name: &str) -> Self {
            let mut path = temp_dir();
            path.push(format!("{TEMP_FILE_PREFIX}_{test_name}.nxs"));
            Self(Some(hdf5::File::create(&path).unwrap()), path)
        }
    }

    //  Cleans up the temp directory after our test
    impl Drop for OneTempFile {
        fn drop(&mut self) {
            let file = self.0.take().unwrap();
            file.close().unwrap();
            std::fs::remove_file(&self.1).unwrap();
        }
    }

    //  So we can use our OneTempFile as an hdf5 file
    impl Deref for OneTempFile {
        type Target = hdf5::File;

        fn deref(&self) -> &Self::Target {
            self.0.as_ref().unwrap()
        }
    }

    #[test]
    fn create_nested_group() {
        let file = OneTempFile::new("create_nested_group");
        let group = file
            .add_new_group("entry", NexusBaseClass::Entry)
            .unwrap();
        let subgroup = group
            .add_new_group("instrument", NexusBaseClass::Instrument)
            .unwrap();

        assert_eq!(subgroup.name().as_str(), "/entry/instrument");
        let class: VarLenUnicode = subgroup.attr("NX_class").unwrap().read_scalar().unwrap();
        assert_eq!(class.as_str(), "NXinstrument");
    }

    #[test]
    fn create_constant_string_dataset() {
        let file = OneTempFile::new("create_constant_string_dataset");
        let dataset = file
            .create_constant_dataset("title", &NexusValue::Str("a scan".to_owned()))
            .unwrap();

        assert_eq!(dataset.get_string().unwrap(), "a scan");
    }

    #[test]
    fn create_constant_array_dataset() {
        let file = OneTempFile::new("create_constant_array_dataset");
        let dataset = file
            .create_constant_dataset("shape", &NexusValue::IntArray(vec![3, 4]))
            .unwrap();

        assert_eq!(dataset.shape(), vec![2]);
        assert_eq!(dataset.read_raw::<i64>().unwrap(), vec![3, 4]);
    }

    #[test]
    fn lazy_scalar_dataset_is_set_later() {
        let file = OneTempFile::new("lazy_scalar_dataset_is_set_later");
        let dataset = file
            .create_lazy_dataset("duration", &LazyField::scalar(NexusDataType::Int))
            .unwrap();
        dataset.set_value(&NexusValue::Int(150)).unwrap();

        assert_eq!(file.get_dataset("duration").unwrap().read_scalar::<i64>().unwrap(), 150);
    }

    #[test]
    fn lazy_per_point_dataset_is_resizable() {
        let file = OneTempFile::new("lazy_per_point_dataset_is_resizable");
        let dataset = file
            .create_lazy_dataset("data", &LazyField::per_point(NexusDataType::Float, 2, &[10, 10]))
            .unwrap();

        assert_eq!(dataset.shape(), vec![0, 0, 10, 10]);
        assert!(dataset.is_resizable());
    }

    #[test]
    fn array_attribute_has_one_entry_per_value() {
        let file = OneTempFile::new("array_attribute_has_one_entry_per_value");
        let group = file.add_new_group("data", NexusBaseClass::Data).unwrap();
        group
            .add_value_attribute("axes", &NexusValue::StrArray(vec!["y".to_owned(), "x".to_owned()]))
            .unwrap();

        let axes: Vec<VarLenUnicode> = group.get_attribute("axes").unwrap().read_raw().unwrap();
        assert_eq!(
            axes.iter().map(VarLenUnicode::as_str).collect::<Vec<_>>(),
            vec!["y", "x"]
        );
    }

    #[test]
    fn hard_link_resolves_to_target() {
        let file = OneTempFile::new("hard_link_resolves_to_target");
        let detector = file.add_new_group("det1", NexusBaseClass::Detector).unwrap();
        detector
            .create_constant_dataset("data", &NexusValue::FloatArray(vec![0.5, 1.5]))
            .unwrap();
        let data = file.add_new_group("plot", NexusBaseClass::Data).unwrap();
        data.add_hard_link("data", "/det1/data").unwrap();

        let linked = data.get_dataset("data").unwrap();
        assert_eq!(linked.read_raw::<f64>().unwrap(), vec![0.5, 1.5]);
    }

    #[test]
    fn open_nonexistant_group() {
        let file = OneTempFile::new("open_nonexistant_group");
        let maybe_group = file.get_group("non_existant_group");

        assert!(maybe_group.is_err());

        const EXPECTED_ERR_MSG : &str = "HDF5 Error: H5Gopen2(): unable to synchronously open group: object 'non_existant_group' doesn't exist at /";
        assert_eq!(maybe_group.err().unwrap().to_string(), EXPECTED_ERR_MSG);
    }

    #[test]
    fn open_nonexistant_attribute() {
        let file = OneTempFile::new("open_nonexistant_attribute");
        let maybe_attribute = file.get_attribute("non_existant_attribute");

        assert!(maybe_attribute.is_err());

        const EXPECTED_ERR_MSG : &str = "HDF5 Error: H5Aopen(): unable to synchronously open attribute: can't locate attribute: 'non_existant_attribute' at /";
        assert_eq!(maybe_attribute.err().unwrap().to_string(), EXPECTED_ERR_MSG);
    }
}
