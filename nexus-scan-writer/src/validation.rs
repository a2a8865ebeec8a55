//! Optional checks of a finished tree, run before the file is closed.
use crate::{
    nexus::{NexusBaseClass, indices_attribute_name, labels},
    tree::{NexusGroupNode, NexusNode, NexusTree, NexusValue, join_path},
};
use std::env;

/// Environment variables which turn validation on when set to `true` or `1`.
pub const VALIDATION_ENV_VARS: [&str; 2] = ["VALIDATE_NEXUS", "NEXUS_SCAN_WRITER_VALIDATE_NEXUS"];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: &str, message: String) {
        self.errors.push(format!("{path}: {message}"));
    }
}

pub trait NexusValidator {
    fn validate(&self, tree: &NexusTree) -> ValidationReport;
}

/// Checks that links resolve, and that the attributes of NXdata groups and entries
/// name nodes which exist.
#[derive(Clone, Copy, Debug, Default)]
pub struct StructureValidator;

impl StructureValidator {
    fn validate_group(
        tree: &NexusTree,
        group: &NexusGroupNode,
        path: &str,
        report: &mut ValidationReport,
    ) {
        match group.nx_class() {
            NexusBaseClass::Data => Self::validate_data(group, path, report),
            NexusBaseClass::Entry | NexusBaseClass::Root => {
                Self::validate_default(group, path, report)
            }
            _ => {}
        }
        for (name, node) in group.children() {
            let child_path = join_path(path, name);
            match node {
                NexusNode::Group(child) => Self::validate_group(tree, child, &child_path, report),
                NexusNode::Link(target) if tree.resolve(target).is_none() => {
                    report.error(&child_path, format!("link to {target} does not resolve"));
                }
                _ => {}
            }
        }
    }

    fn validate_data(group: &NexusGroupNode, path: &str, report: &mut ValidationReport) {
        match group.attribute(labels::SIGNAL).and_then(NexusValue::as_str) {
            Some(signal) if !group.contains(signal) => {
                report.error(path, format!("signal {signal} does not exist"));
            }
            None => report.error(path, "has no signal attribute".to_owned()),
            _ => {}
        }
        let axes = group
            .attribute(labels::AXES)
            .and_then(NexusValue::as_str_array)
            .unwrap_or_default();
        for axis in axes.iter().filter(|axis| *axis != labels::NO_AXIS) {
            if !group.contains(axis) {
                report.error(path, format!("axis {axis} does not exist"));
            } else if group.attribute(&indices_attribute_name(axis)).is_none() {
                report.error(path, format!("axis {axis} has no indices attribute"));
            }
        }
    }

    /// An entry's default must be one of its NXdata groups, the root's one of its entries.
    fn validate_default(group: &NexusGroupNode, path: &str, report: &mut ValidationReport) {
        let Some(default) = group.attribute(labels::DEFAULT).and_then(NexusValue::as_str) else {
            return;
        };
        let expected = match group.nx_class() {
            NexusBaseClass::Root => NexusBaseClass::Entry,
            _ => NexusBaseClass::Data,
        };
        if group.group(default).map(NexusGroupNode::nx_class) != Some(expected) {
            report.error(path, format!("default {default} is not an {expected} group"));
        }
    }
}

impl NexusValidator for StructureValidator {
    fn validate(&self, tree: &NexusTree) -> ValidationReport {
        let mut report = ValidationReport::default();
        Self::validate_group(tree, tree.root(), "/", &mut report);
        report
    }
}

/// Whether validation is turned on by the process environment.
pub fn validation_enabled() -> bool {
    validation_enabled_from(|key| env::var(key).ok())
}

/// Whether any of [VALIDATION_ENV_VARS] is `true` or `1`, ignoring case, according to `lookup`.
pub fn validation_enabled_from<F: Fn(&str) -> Option<String>>(lookup: F) -> bool {
    VALIDATION_ENV_VARS.iter().any(|key| {
        lookup(key).is_some_and(|value| {
            let value = value.trim();
            value.eq_ignore_ascii_case("true") || value == "1"
        })
    })
}
