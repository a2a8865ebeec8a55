use ::metrics::{describe_counter, describe_gauge, gauge};

pub fn component_info_metric(name: &'static str) {
    static NAME: &str = "nexus_scan_component_info";

    describe_gauge!(NAME, "Basic information about the component");

    let git_rev = option_env!("GIT_VERSION").unwrap_or("unknown");
    gauge!(NAME, "component" => name, "git_version" => git_rev).set(1);
}

/// Registers descriptions for every counter the scan-file writer emits.
pub fn describe_metrics() {
    describe_counter!(
        names::FILES_CREATED,
        "Number of NeXus scan files successfully created"
    );
    describe_counter!(
        names::FILES_CLOSED,
        "Number of NeXus scan files successfully closed"
    );
    describe_counter!(names::FAILURES, "Number of failures, by failure kind");
    describe_counter!(
        names::VALIDATION_ERRORS,
        "Number of structural errors reported by NeXus validation"
    );
}

pub mod names {
    pub const FILES_CREATED: &str = "nexus_scan_files_created";
    pub const FILES_CLOSED: &str = "nexus_scan_files_closed";
    pub const FAILURES: &str = "nexus_scan_failures";
    pub const VALIDATION_ERRORS: &str = "nexus_scan_validation_errors";
}

pub mod failures {
    #[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
    pub enum FailureKind {
        DeviceProviderFailed,
        FileCreationFailed,
        FileCloseFailed,
        FieldCommitFailed,
        ValidationFailed,
    }

    // Label building function
    pub fn get_label(failure_kind: FailureKind) -> (&'static str, &'static str) {
        (
            "failure_kind",
            match failure_kind {
                FailureKind::DeviceProviderFailed => "device_provider_failed",
                FailureKind::FileCreationFailed => "file_creation_failed",
                FailureKind::FileCloseFailed => "file_close_failed",
                FailureKind::FieldCommitFailed => "field_commit_failed",
                FailureKind::ValidationFailed => "validation_failed",
            },
        )
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn labels_are_snake_case() {
            let (key, value) = get_label(FailureKind::FieldCommitFailed);
            assert_eq!(key, "failure_kind");
            assert_eq!(value, "field_commit_failed");
        }
    }
}
