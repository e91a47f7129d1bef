use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::result::StepFailure;

type CompensateFn<'a, Ctx> = Box<dyn FnOnce(&Ctx) -> Result<(), StepFailure> + 'a>;

/// Status of one compensation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackStatus {
    /// The compensation completed.
    Compensated,
    /// The compensation returned an error or panicked.
    Failed { message: String },
}

/// Record of one compensation attempt made while draining the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackRecord {
    /// Name of the step being undone.
    pub name: String,
    /// Description of what the compensation does.
    pub description: String,
    pub status: RollbackStatus,
    pub duration: Duration,
}

impl RollbackRecord {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == RollbackStatus::Compensated
    }
}

struct Entry<'a, Ctx: ?Sized> {
    name: String,
    description: String,
    compensate: CompensateFn<'a, Ctx>,
}

/// Compensating actions of completed steps, undone newest-first.
///
/// Entries are appended in the order their steps succeeded. A registry is
/// drained at most once per run; after draining it stays empty and ignores
/// further registrations.
pub struct RollbackRegistry<'a, Ctx: ?Sized> {
    entries: Vec<Entry<'a, Ctx>>,
    drained: bool,
}

impl<'a, Ctx: ?Sized> RollbackRegistry<'a, Ctx> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            drained: false,
        }
    }

    /// Append a compensation for a step that just succeeded.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        compensate: F,
    ) where
        F: FnOnce(&Ctx) -> Result<(), StepFailure> + 'a,
    {
        let name = name.into();
        if self.drained {
            warn!(step = %name, "ignoring compensation registered after rollback");
            return;
        }
        debug!(step = %name, "registered compensation");
        self.entries.push(Entry {
            name,
            description: description.into(),
            compensate: Box::new(compensate),
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the registered compensations, oldest first.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    /// Run every registered compensation, most recent first.
    ///
    /// A failing or panicking compensation is recorded and the drain moves on
    /// to the next one. Draining an empty registry does nothing.
    pub fn drain_reverse(&mut self, ctx: &Ctx) -> Vec<RollbackRecord> {
        self.drained = true;
        let mut records = Vec::with_capacity(self.entries.len());

        while let Some(entry) = self.entries.pop() {
            debug!(step = %entry.name, description = %entry.description, "compensating");
            let started = Instant::now();
            let compensate = entry.compensate;
            let status = match panic::catch_unwind(AssertUnwindSafe(move || compensate(ctx))) {
                Ok(Ok(())) => RollbackStatus::Compensated,
                Ok(Err(failure)) => RollbackStatus::Failed {
                    message: failure.into_message(),
                },
                Err(payload) => RollbackStatus::Failed {
                    message: StepFailure::from_panic(payload.as_ref()).into_message(),
                },
            };
            records.push(RollbackRecord {
                name: entry.name,
                description: entry.description,
                status,
                duration: started.elapsed(),
            });
        }

        records
    }
}

impl<Ctx: ?Sized> Default for RollbackRegistry<'_, Ctx> {
    fn default() -> Self {
        Self::new()
    }
}
