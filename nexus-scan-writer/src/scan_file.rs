//! Drives one scan file from creation to close.
use crate::{
    builder::{
        BuiltScan, Clock, DefaultDataGroupSelector, FirstDataGroupSelector, NexusScanFileBuilder,
        ScanTimestamps, SystemClock, providers::ProviderSet,
    },
    device::{DeviceDecorator, IdentityDecorator},
    error::{LifecycleOperation, NexusScanError, NexusScanResult},
    file::{FileOptions, NexusFileInterface},
    model::ScanModel,
    template::{JsonTemplateService, TemplateService},
    tree::NexusTree,
    validation::{NexusValidator, StructureValidator, validation_enabled},
};
use metrics::counter;
use nexus_scan_common::metrics::{
    failures::{FailureKind, get_label},
    names::{FAILURES, FILES_CLOSED, FILES_CREATED, VALIDATION_ERRORS},
};
use std::{mem, path::PathBuf, rc::Rc};
use tracing::{info, warn};

enum ScanFileState<I> {
    Unopened,
    Open {
        file: I,
        tree: NexusTree,
        timestamps: ScanTimestamps,
        providers: ProviderSet,
    },
    Closed {
        tree: NexusTree,
        providers: ProviderSet,
    },
    /// Creation failed, the scan file cannot be used.
    Failed,
}

/// Builds the tree of a [ScanModel], writes it with `I`, and writes the end of scan
/// timestamps before closing it.
pub struct NexusScanFile<I: NexusFileInterface> {
    model: ScanModel,
    decorator: Box<dyn DeviceDecorator>,
    selector: Box<dyn DefaultDataGroupSelector>,
    validator: Box<dyn NexusValidator>,
    template_service: Box<dyn TemplateService>,
    clock: Rc<dyn Clock>,
    validate: bool,
    state: ScanFileState<I>,
}

impl<I: NexusFileInterface> NexusScanFile<I> {
    /// Validation is turned on by the environment, see [validation_enabled].
    pub fn new(model: ScanModel) -> Self {
        Self {
            model,
            decorator: Box::new(IdentityDecorator),
            selector: Box::new(FirstDataGroupSelector),
            validator: Box::new(StructureValidator),
            template_service: Box::new(JsonTemplateService),
            clock: Rc::new(SystemClock),
            validate: validation_enabled(),
            state: ScanFileState::Unopened,
        }
    }

    pub fn with_decorator(mut self, decorator: Box<dyn DeviceDecorator>) -> Self {
        self.decorator = decorator;
        self
    }

    pub fn with_selector(mut self, selector: Box<dyn DefaultDataGroupSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_validator(mut self, validator: Box<dyn NexusValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_template_service(mut self, template_service: Box<dyn TemplateService>) -> Self {
        self.template_service = template_service;
        self
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn model(&self) -> &ScanModel {
        &self.model
    }

    /// The tree as built, once the file has been created.
    pub fn tree(&self) -> Option<&NexusTree> {
        match &self.state {
            ScanFileState::Open { tree, .. } | ScanFileState::Closed { tree, .. } => Some(tree),
            _ => None,
        }
    }

    /// Every external file written by the scan's devices, once the file has been created.
    pub fn external_file_paths(&self) -> Vec<PathBuf> {
        match &self.state {
            ScanFileState::Open { providers, .. } | ScanFileState::Closed { providers, .. } => {
                providers.external_file_paths()
            }
            _ => Vec::new(),
        }
    }

    /// Builds the tree and applies the template files, then the template objects, of the model.
    fn build_tree(&self) -> NexusScanResult<BuiltScan> {
        let mut built = NexusScanFileBuilder::new(
            &self.model,
            self.decorator.as_ref(),
            self.selector.as_ref(),
            self.clock.clone(),
        )
        .build()?;
        for path in self.model.template_file_paths() {
            self.template_service.load(path)?.apply(&mut built.tree)?;
        }
        for template in self.model.templates() {
            template.apply(&mut built.tree)?;
        }
        Ok(built)
    }

    fn create(&self, options: &FileOptions) -> NexusScanResult<ScanFileState<I>> {
        let BuiltScan {
            tree,
            timestamps,
            providers,
        } = self.build_tree()?;

        let path = self.model.file_path();
        let to_error = |source| NexusScanError::CreateFile {
            path: path.to_owned(),
            source,
        };
        let mut file = I::create(path, &tree, options).map_err(to_error)?;
        file.open_to_write().map_err(to_error)?;
        Ok(ScanFileState::Open {
            file,
            tree,
            timestamps,
            providers,
        })
    }

    /// Builds the tree and creates the file, leaving it open for writing.
    /// # Parameters
    /// - async_write: write the tree to disk off the calling thread.
    /// - use_swmr: switch the file to single-writer multiple-reader mode once written.
    /// # Error Modes
    /// - Emits [NexusScanError::IllegalState] if called more than once.
    /// - Any error building the tree, applying templates or creating the file. The
    ///   scan file is then unusable.
    #[tracing::instrument(skip_all, level = "info", fields(file = %self.model.file_path().display()), err(level = "warn"))]
    pub fn create_nexus_file(&mut self, async_write: bool, use_swmr: bool) -> NexusScanResult<()> {
        if !matches!(self.state, ScanFileState::Unopened) {
            return Err(NexusScanError::IllegalState(
                LifecycleOperation::CreateNexusFile,
            ));
        }
        let options = FileOptions {
            async_write,
            use_swmr,
        };
        match self.create(&options) {
            Ok(state) => {
                self.state = state;
                counter!(FILES_CREATED).increment(1);
                info!("Created {}", self.model.file_path().display());
                Ok(())
            }
            Err(e) => {
                self.state = ScanFileState::Failed;
                counter!(FAILURES, &[get_label(FailureKind::FileCreationFailed)]).increment(1);
                Err(e)
            }
        }
    }

    /// # Error Modes
    /// - Emits [NexusScanError::IllegalState] unless the file is open.
    pub fn flush(&self) -> NexusScanResult<()> {
        match &self.state {
            ScanFileState::Open { file, .. } => Ok(file.flush()?),
            _ => Err(NexusScanError::IllegalState(LifecycleOperation::Flush)),
        }
    }

    /// Logs every error found in the tree. Never fails the scan.
    fn log_validation(&self, tree: &NexusTree) {
        let report = self.validator.validate(tree);
        if report.is_valid() {
            info!("{} is valid", self.model.file_path().display());
            return;
        }
        for error in &report.errors {
            warn!("Validation error in {}: {error}", self.model.file_path().display());
        }
        counter!(VALIDATION_ERRORS).increment(report.errors.len() as u64);
        counter!(FAILURES, &[get_label(FailureKind::ValidationFailed)]).increment(1);
    }

    /// Writes the end time and duration, validates the tree if enabled, and closes the file.
    /// # Error Modes
    /// - Emits [NexusScanError::AlreadyClosed] if the file has been closed already.
    /// - Emits [NexusScanError::IllegalState] if the file was never created.
    /// - Emits [NexusScanError::TimestampsNotStarted] if the end of the scan cannot be
    ///   written. The file is closed first.
    /// - Emits [NexusScanError::HDF5] if the file cannot be closed. The file is
    ///   considered closed regardless.
    #[tracing::instrument(skip_all, level = "info", fields(file = %self.model.file_path().display()), err(level = "warn"))]
    pub fn scan_finished(&mut self) -> NexusScanResult<()> {
        let (mut file, tree, mut timestamps, providers) =
            match mem::replace(&mut self.state, ScanFileState::Failed) {
                ScanFileState::Open {
                    file,
                    tree,
                    timestamps,
                    providers,
                } => (file, tree, timestamps, providers),
                other => {
                    let error = match other {
                        ScanFileState::Closed { .. } => NexusScanError::AlreadyClosed,
                        _ => NexusScanError::IllegalState(LifecycleOperation::ScanFinished),
                    };
                    self.state = other;
                    return Err(error);
                }
            };

        if let Err(e) = timestamps.end(&mut file) {
            if let Err(close_error) = file.close() {
                warn!("Cannot close {}: {close_error}", self.model.file_path().display());
                counter!(FAILURES, &[get_label(FailureKind::FileCloseFailed)]).increment(1);
            }
            self.state = ScanFileState::Closed { tree, providers };
            return Err(e);
        }
        if self.validate {
            self.log_validation(&tree);
        }
        let closed = file.close();
        self.state = ScanFileState::Closed { tree, providers };
        if let Err(e) = closed {
            counter!(FAILURES, &[get_label(FailureKind::FileCloseFailed)]).increment(1);
            return Err(e.into());
        }
        counter!(FILES_CLOSED).increment(1);
        info!("Closed {}", self.model.file_path().display());
        Ok(())
    }
}
