use crate::classifier::Destination;
use crate::error::DriveError;
use chrono::{DateTime, Local};

/// Counters for a single run.
#[derive(Debug, Clone)]
pub struct RunTally {
    pub files_moved: usize,
    pub files_skipped: usize,
    pub errors: usize,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
}

impl Default for RunTally {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTally {
    pub fn new() -> Self {
        Self {
            files_moved: 0,
            files_skipped: 0,
            errors: 0,
            started_at: Local::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Moved { .. } => self.files_moved += 1,
            FileOutcome::Skipped { .. } => self.files_skipped += 1,
            FileOutcome::Failed { .. } => self.errors += 1,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Local::now());
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Local::now) - self.started_at
    }

    pub fn completion_line(&self) -> String {
        format!("Completed: {} files moved, {} errors", self.files_moved, self.errors)
    }

    /// Warning text when any file failed.
    pub fn failure_warning(&self) -> Option<String> {
        if self.errors > 0 {
            Some(format!("Warning: {} files failed to process", self.errors))
        } else {
            None
        }
    }

    pub fn summary(&self) -> String {
        let duration = self.duration();
        format!(
            "Run Summary:\n------------\nDuration: {}.{:03}s\nFiles moved: {}\nFiles skipped: {}\nErrors: {}",
            duration.num_seconds(),
            duration.num_milliseconds().rem_euclid(1000),
            self.files_moved,
            self.files_skipped,
            self.errors
        )
    }
}

/// Result of handling one enumerated file.
#[derive(Debug)]
pub enum FileOutcome {
    Moved {
        file_id: String,
        name: String,
        destination: Destination,
        folder_id: String,
    },
    /// Classified but left in place (dry run)
    Skipped {
        file_id: String,
        name: String,
        destination: Destination,
    },
    Failed {
        file_id: String,
        /// `None` when the name itself could not be read
        name: Option<String>,
        error: DriveError,
    },
}

impl FileOutcome {
    pub fn file_id(&self) -> &str {
        match self {
            Self::Moved { file_id, .. } | Self::Skipped { file_id, .. } | Self::Failed { file_id, .. } => file_id,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub tally: RunTally,
    pub outcomes: Vec<FileOutcome>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            tally: RunTally::new(),
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: FileOutcome) {
        self.tally.record(&outcome);
        self.outcomes.push(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcomes() {
        let mut report = RunReport::new();

        report.record(FileOutcome::Moved {
            file_id: "1".to_string(),
            name: "[R] Acme".to_string(),
            destination: Destination::Customer,
            folder_id: "customer".to_string(),
        });
        report.record(FileOutcome::Skipped {
            file_id: "2".to_string(),
            name: "Other".to_string(),
            destination: Destination::Catchall,
        });
        report.record(FileOutcome::Failed {
            file_id: "3".to_string(),
            name: None,
            error: DriveError::Name("3".to_string()),
        });

        assert_eq!(report.tally.files_moved, 1);
        assert_eq!(report.tally.files_skipped, 1);
        assert_eq!(report.tally.errors, 1);
        assert_eq!(report.outcomes.len(), 3);
        assert!(report.outcomes[2].is_failure());
        assert_eq!(report.outcomes[1].file_id(), "2");
    }

    #[test]
    fn test_messages() {
        let mut tally = RunTally::new();
        assert!(tally.failure_warning().is_none());

        tally.files_moved = 3;
        tally.errors = 1;
        tally.finish();

        assert_eq!(tally.completion_line(), "Completed: 3 files moved, 1 errors");
        assert_eq!(tally.failure_warning().as_deref(), Some("Warning: 1 files failed to process"));

        let summary = tally.summary();
        assert!(summary.contains("Files moved: 3"));
        assert!(summary.contains("Errors: 1"));
        assert!(summary.contains("Duration: "));
    }
}
