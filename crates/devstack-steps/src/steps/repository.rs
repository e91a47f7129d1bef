use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use devstack_gateway::{ProcessRequest, ToolGateway};
use devstack_saga::{Step, StepFailure};

use super::{command_failed, run};
use crate::config::RepositoryConfig;

/// Shallow single-branch clone of one repository.
///
/// An existing empty destination is reused; rollback then empties it instead
/// of deleting it.
pub struct CloneRepositoryStep {
    name: String,
    repository: RepositoryConfig,
    timeout: Duration,
    reused_destination: AtomicBool,
}

impl CloneRepositoryStep {
    #[must_use]
    pub fn new(repository: &RepositoryConfig, timeout: Duration) -> Self {
        Self {
            name: format!("clone {}", repository.name),
            repository: repository.clone(),
            timeout,
            reused_destination: AtomicBool::new(false),
        }
    }
}

fn is_non_empty_dir(path: &Path) -> io::Result<bool> {
    match std::fs::read_dir(path) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn clear_dir(path: &Path) -> io::Result<()> {
    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(entry.path())?;
        } else {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

impl Step<dyn ToolGateway> for CloneRepositoryStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_critical(&self) -> bool {
        self.repository.critical
    }

    fn execute(&self, gateway: &dyn ToolGateway) -> Result<String, StepFailure> {
        let destination = &self.repository.destination;
        let occupied = is_non_empty_dir(destination).map_err(StepFailure::from_error)?;
        if occupied || destination.is_file() {
            return Err(StepFailure::new(format!(
                "destination '{}' already exists and is not empty",
                destination.display()
            )));
        }
        self.reused_destination
            .store(destination.is_dir(), Ordering::SeqCst);

        let request = ProcessRequest::new("git")
            .args([
                "clone",
                "--depth",
                "1",
                "--single-branch",
                "--branch",
                self.repository.branch.as_str(),
                self.repository.url.as_str(),
            ])
            .arg(destination.to_string_lossy())
            .timeout(self.timeout);
        let output = run(gateway, &request)?;
        if !output.succeeded() {
            return Err(command_failed(&request, &output));
        }

        Ok(format!(
            "cloned {} ({}) into {}",
            self.repository.url,
            self.repository.branch,
            destination.display()
        ))
    }

    fn has_compensation(&self) -> bool {
        true
    }

    fn compensate(&self, _gateway: &dyn ToolGateway) -> Result<(), StepFailure> {
        let destination = &self.repository.destination;
        let removed = if self.reused_destination.load(Ordering::SeqCst) {
            clear_dir(destination)
        } else {
            match std::fs::remove_dir_all(destination) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other,
            }
        };
        removed.map_err(StepFailure::from_error)
    }

    fn compensation_description(&self) -> String {
        let verb = if self.reused_destination.load(Ordering::SeqCst) {
            "empty"
        } else {
            "remove"
        };
        format!("{verb} {}", self.repository.destination.display())
    }
}
