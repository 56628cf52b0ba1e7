pub mod tally;

use crate::classifier::{Classifier, Destination};
use crate::config::Config;
use crate::drive::{FileDirectory, FolderHandle, RemoteFile};
use crate::error::{DriveError, RunError};
use log::{error, info, warn};

pub use tally::{FileOutcome, RunReport, RunTally};

/// Sorts the files of the source folder into their destination folders.
pub struct Mover<D: FileDirectory> {
    directory: D,
    config: Config,
    classifier: Classifier,
    dry_run: bool,
}

impl<D: FileDirectory> Mover<D> {
    pub fn new(directory: D, config: Config) -> Self {
        let classifier = Classifier::with_match_mode(config.classifier.match_mode);
        Self {
            directory,
            config,
            classifier,
            dry_run: false,
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Classify and log only; nothing is resolved or moved.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Only the counters are kept; per-file outcomes are dropped as they are tallied.
    pub fn run(&self) -> Result<RunTally, RunError> {
        self.run_with(|_| {})
    }

    /// Like `run`, but also returns every per-file outcome in enumeration order.
    pub fn run_with_outcomes(&self) -> Result<RunReport, RunError> {
        let mut outcomes = Vec::new();
        let tally = self.run_with(|outcome| outcomes.push(outcome))?;
        Ok(RunReport { tally, outcomes })
    }

    /// Hands each outcome to `on_outcome` as soon as its file is processed.
    pub fn run_with<F>(&self, mut on_outcome: F) -> Result<RunTally, RunError>
    where
        F: FnMut(FileOutcome),
    {
        info!("Starting run{}...", if self.dry_run { " (dry run)" } else { "" });

        let query = self.config.search_query();
        info!("Using query: {}", query);

        let files = match self.directory.search(&query) {
            Ok(files) => files,
            Err(e) => {
                error!("Failed to search Drive files: {}", e);
                return Err(RunError::Search(e));
            }
        };

        let mut tally = RunTally::new();

        for item in files {
            let file = match item {
                Ok(file) => file,
                Err(e) => {
                    error!("Critical error while processing files: {}", e);
                    return Err(RunError::Enumeration(e));
                }
            };

            let outcome = self.process_file(&file);
            tally.record(&outcome);
            on_outcome(outcome);
        }

        tally.finish();

        info!("{}", tally.completion_line());
        if let Some(warning) = tally.failure_warning() {
            warn!("{}", warning);
        }
        info!("{}", tally.summary());

        Ok(tally)
    }

    fn process_file(&self, file: &D::File) -> FileOutcome {
        let file_id = file.id().to_string();

        let name = match file.name() {
            Ok(name) => name,
            Err(e) => {
                error!("Error processing file: {}", e);
                return FileOutcome::Failed {
                    file_id,
                    name: None,
                    error: e,
                };
            }
        };

        info!("Processing file: {}", name);
        let destination = self.classifier.classify(&name);

        if self.dry_run {
            info!("Would move {} file: {}", destination.label(), name);
            return FileOutcome::Skipped {
                file_id,
                name,
                destination,
            };
        }

        info!("Moving {} file: {}", destination.label(), name);

        match self.relocate(file, destination) {
            Ok(folder) => FileOutcome::Moved {
                file_id,
                name,
                destination,
                folder_id: folder.id,
            },
            Err(e) => {
                error!("Failed to move file {}: {}", name, e);
                FileOutcome::Failed {
                    file_id,
                    name: Some(name),
                    error: e,
                }
            }
        }
    }

    // Resolved per file so a lookup failure only affects this file
    fn relocate(&self, file: &D::File, destination: Destination) -> Result<FolderHandle, DriveError> {
        let folder = self.directory.resolve_folder(self.config.folder_for(destination))?;
        self.directory.move_file(file, &folder)?;
        Ok(folder)
    }
}
