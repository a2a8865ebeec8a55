//! Templates add site-specific content to a scan's tree before it is written.
//!
//! A JSON template is an object whose keys are applied to the root group:
//! - keys ending in `/` are groups, whose class is given by their `NX_class` or
//!   `@NX_class` key. A group which already exists is merged into.
//! - keys beginning with `@` are attributes of the group they appear in.
//! - other keys are constant fields. A field is either a value, or an object with a
//!   `value` key and `@`-prefixed attribute keys.
use crate::{
    nexus::{NexusBaseClass, labels},
    tree::{NexusField, NexusGroupNode, NexusTree, NexusTreeError, NexusValue, join_path},
};
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::debug;

const GROUP_SUFFIX: char = '/';
const ATTRIBUTE_PREFIX: char = '@';
const FIELD_VALUE: &str = "value";

pub type TemplateResult<T> = Result<T, TemplateError>;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Cannot read template {0}: {source}", path.display())]
    IO {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Template {0} is not a JSON object")]
    NotAnObject(String),
    #[error("Group {path} has no NX_class")]
    MissingClass { path: String },
    #[error("Group {path} has unknown NX_class {class}")]
    UnknownClass { path: String, class: String },
    #[error("Value of {path} is not a number, string or array of them")]
    InvalidValue { path: String },
    #[error("Template {template} failed at {path}: {source}")]
    Tree {
        template: String,
        path: String,
        source: NexusTreeError,
    },
}

/// Content applied to the tree after it is built, and before it is written.
pub trait NexusTemplate {
    fn name(&self) -> &str;

    /// Adds the template's content to the tree, in place.
    fn apply(&self, tree: &mut NexusTree) -> TemplateResult<()>;
}

/// Loads the templates named by file path.
pub trait TemplateService {
    fn load(&self, path: &Path) -> TemplateResult<Box<dyn NexusTemplate>>;
}

/// Loads JSON templates.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonTemplateService;

impl TemplateService for JsonTemplateService {
    fn load(&self, path: &Path) -> TemplateResult<Box<dyn NexusTemplate>> {
        Ok(Box::new(JsonTemplate::load(path)?))
    }
}

#[derive(Clone, Debug)]
pub struct JsonTemplate {
    name: String,
    content: Map<String, Value>,
}

impl JsonTemplate {
    pub fn new(name: &str, content: Value) -> TemplateResult<Self> {
        match content {
            Value::Object(content) => Ok(Self {
                name: name.to_owned(),
                content,
            }),
            _ => Err(TemplateError::NotAnObject(name.to_owned())),
        }
    }

    pub fn parse(name: &str, json: &str) -> TemplateResult<Self> {
        Self::new(name, serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> TemplateResult<Self> {
        let json = fs::read_to_string(path).map_err(|source| TemplateError::IO {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&path.display().to_string(), &json)
    }

    fn tree_error(&self, path: &str) -> impl FnOnce(NexusTreeError) -> TemplateError {
        let template = self.name.clone();
        let path = path.to_owned();
        move |source| TemplateError::Tree {
            template,
            path,
            source,
        }
    }

    fn apply_group(
        &self,
        group: &mut NexusGroupNode,
        path: &str,
        content: &Map<String, Value>,
    ) -> TemplateResult<()> {
        for (key, value) in content {
            if let Some(name) = key.strip_suffix(GROUP_SUFFIX) {
                let child_path = join_path(path, name);
                let Value::Object(child_content) = value else {
                    return Err(TemplateError::NotAnObject(child_path));
                };
                let child = match group.contains(name) {
                    true => group.group_mut(name).ok_or_else(|| {
                        self.tree_error(&child_path)(NexusTreeError::NotAGroup {
                            path: child_path.clone(),
                        })
                    })?,
                    false => group
                        .add_group(name, NexusGroupNode::new(group_class(&child_path, child_content)?))
                        .map_err(self.tree_error(&child_path))?,
                };
                self.apply_group(child, &child_path, child_content)?;
            } else if let Some(name) = key.strip_prefix(ATTRIBUTE_PREFIX) {
                if name != labels::NX_CLASS {
                    group.set_attribute(name, to_value(&join_path(path, key), value)?);
                }
            } else if key != labels::NX_CLASS {
                let field_path = join_path(path, key);
                group
                    .add_field(key, to_field(&field_path, value)?)
                    .map_err(self.tree_error(&field_path))?;
            }
        }
        Ok(())
    }
}

impl NexusTemplate for JsonTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip_all, level = "debug", fields(template = %self.name), err(level = "warn"))]
    fn apply(&self, tree: &mut NexusTree) -> TemplateResult<()> {
        self.apply_group(tree.root_mut(), "/", &self.content)?;
        debug!("Applied template {}", self.name);
        Ok(())
    }
}

/// The class of a new group, from its `NX_class` or `@NX_class` key.
fn group_class(path: &str, content: &Map<String, Value>) -> TemplateResult<NexusBaseClass> {
    let class = content
        .get(labels::NX_CLASS)
        .or_else(|| content.get(&format!("{ATTRIBUTE_PREFIX}{}", labels::NX_CLASS)))
        .ok_or_else(|| TemplateError::MissingClass {
            path: path.to_owned(),
        })?;
    let class = class.as_str().unwrap_or_default();
    class.parse().map_err(|_| TemplateError::UnknownClass {
        path: path.to_owned(),
        class: class.to_owned(),
    })
}

fn to_value(path: &str, value: &Value) -> TemplateResult<NexusValue> {
    serde_json::from_value(value.clone()).map_err(|_| TemplateError::InvalidValue {
        path: path.to_owned(),
    })
}

fn to_field(path: &str, value: &Value) -> TemplateResult<NexusField> {
    let Value::Object(content) = value else {
        return Ok(NexusField::constant(to_value(path, value)?));
    };
    let field_value = content
        .get(FIELD_VALUE)
        .ok_or_else(|| TemplateError::InvalidValue {
            path: path.to_owned(),
        })?;
    let mut field = NexusField::constant(to_value(path, field_value)?);
    for (key, value) in content {
        if let Some(name) = key.strip_prefix(ATTRIBUTE_PREFIX) {
            field = field.with_attribute(name, to_value(&format!("{path}{key}"), value)?);
        }
    }
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    /// A template file, removed when dropped.
    struct TempTemplate(PathBuf);

    impl TempTemplate {
        fn new(test_name: &str, json: &str) -> Self {
            let path = temp_dir().join(format!("temp_nexus_scan_writer_template_{test_name}.json"));
            fs::write(&path, json).unwrap();
            Self(path)
        }
    }

    impl Drop for TempTemplate {
        fn drop(&mut self) {
            fs::remove_file(&self.0).unwrap();
        }
    }

    fn tree_with_entry() -> NexusTree {
        let mut tree = NexusTree::new();
        tree.root_mut()
            .add_group("entry", NexusGroupNode::new(NexusBaseClass::Entry))
            .unwrap()
            .add_group("instrument", NexusGroupNode::new(NexusBaseClass::Instrument))
            .unwrap();
        tree
    }

    const TEMPLATE: &str = r#"{
        "entry/": {
            "@default": "data",
            "instrument/": {
                "name": "i99",
                "source/": {
                    "NX_class": "NXsource",
                    "current": { "value": 300.5, "@units": "mA" },
                    "type": "Synchrotron X-ray Source"
                }
            },
            "notes/": {
                "@NX_class": "NXnote",
                "lines": ["aligned", "calibrated"]
            }
        }
    }"#;

    #[test]
    fn merges_into_existing_groups() {
        let mut tree = tree_with_entry();
        JsonTemplate::parse("beamline", TEMPLATE)
            .unwrap()
            .apply(&mut tree)
            .unwrap();

        let entry = tree.group("/entry").unwrap();
        assert_eq!(entry.nx_class(), NexusBaseClass::Entry);
        assert_eq!(
            entry.attribute("default").and_then(NexusValue::as_str),
            Some("data")
        );
        let instrument = tree.group("/entry/instrument").unwrap();
        assert_eq!(instrument.nx_class(), NexusBaseClass::Instrument);
        assert!(instrument.contains("name"));

        let source = tree.group("/entry/instrument/source").unwrap();
        assert_eq!(source.nx_class(), NexusBaseClass::Source);
        let current = source.field("current").unwrap();
        assert_eq!(current.value(), Some(&NexusValue::Float(300.5)));
        assert_eq!(
            current.attribute("units").and_then(NexusValue::as_str),
            Some("mA")
        );

        let notes = tree.group("/entry/notes").unwrap();
        assert_eq!(notes.nx_class(), NexusBaseClass::Note);
        assert!(notes.attribute("NX_class").is_none());
        assert_eq!(
            notes.field("lines").and_then(NexusField::value),
            Some(&NexusValue::StrArray(vec![
                "aligned".to_owned(),
                "calibrated".to_owned()
            ]))
        );
    }

    #[test]
    fn new_group_needs_a_class() {
        let mut tree = tree_with_entry();
        let result = JsonTemplate::parse("bad", r#"{"entry/": {"extra/": {"a": 1}}}"#)
            .unwrap()
            .apply(&mut tree);
        assert!(matches!(
            result,
            Err(TemplateError::MissingClass { path }) if path == "/entry/extra"
        ));
    }

    #[test]
    fn unknown_class_is_rejected() {
        let mut tree = tree_with_entry();
        let result = JsonTemplate::parse("bad", r#"{"entry/": {"extra/": {"NX_class": "NXwidget"}}}"#)
            .unwrap()
            .apply(&mut tree);
        assert!(matches!(
            result,
            Err(TemplateError::UnknownClass { class, .. }) if class == "NXwidget"
        ));
    }

    #[test]
    fn existing_field_is_not_overwritten() {
        let mut tree = tree_with_entry();
        let template = JsonTemplate::parse("twice", r#"{"entry/": {"title": "scan"}}"#).unwrap();
        template.apply(&mut tree).unwrap();
        assert!(matches!(
            template.apply(&mut tree),
            Err(TemplateError::Tree { source: NexusTreeError::DuplicateNode { .. }, .. })
        ));
    }

    #[test]
    fn top_level_must_be_an_object() {
        assert!(matches!(
            JsonTemplate::parse("array", "[1, 2]"),
            Err(TemplateError::NotAnObject(name)) if name == "array"
        ));
    }

    #[test]
    fn service_loads_from_file() {
        let file = TempTemplate::new("service_loads_from_file", r#"{"entry/": {"title": "from file"}}"#);

        let template = JsonTemplateService.load(&file.0).unwrap();
        assert_eq!(template.name(), file.0.display().to_string());
        let mut tree = tree_with_entry();
        template.apply(&mut tree).unwrap();
        assert_eq!(
            tree.group("/entry")
                .and_then(|entry| entry.field("title"))
                .and_then(NexusField::value)
                .and_then(NexusValue::as_str),
            Some("from file")
        );
    }

    #[test]
    fn missing_file_names_the_path() {
        let result = JsonTemplateService.load(Path::new("/nonexistent/template.json"));
        assert!(matches!(
            result,
            Err(TemplateError::IO { path, .. }) if path == Path::new("/nonexistent/template.json")
        ));
    }
}
