//! Enter and exit protocol

use crate::context::{stack, Context, ContextKind, ContextState};
use crate::db::DbScope;
use crate::error::ContextError;
use crate::log::{LogLevel, LogRecord};
use std::fmt;
use std::future::Future;
use tracing::{debug, error, warn};

/// Error types a scope body may fail with
pub trait ScopeFailure: fmt::Display + From<ContextError> {
    /// True when the end user caused the failure
    fn is_user_error(&self) -> bool;
}

impl ScopeFailure for ContextError {
    fn is_user_error(&self) -> bool {
        ContextError::is_user_error(self)
    }
}

impl ScopeFailure for anyhow::Error {
    fn is_user_error(&self) -> bool {
        self.downcast_ref::<ContextError>()
            .map_or(false, ContextError::is_user_error)
    }
}

/// An active scope; exit it with [`ContextGuard::exit`].
///
/// Dropping the guard without exiting still finishes the scope. During a panic an
/// error entry is written; otherwise the scope ended without an outcome (usually an
/// early `?` return) and a warning entry is written.
#[derive(Debug)]
#[must_use = "the context is exited when the guard is dropped"]
pub struct ContextGuard {
    context: Context,
    exited: bool,
}

impl ContextGuard {
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Leave the scope with the outcome of its body.
    ///
    /// A failure is written to the context database before the context is popped and is
    /// always returned unchanged. A stack violation replaces a successful outcome; when
    /// the body already failed it is only logged.
    pub fn exit<T, E: ScopeFailure>(mut self, outcome: Result<T, E>) -> Result<T, E> {
        self.exited = true;
        let failure = outcome.as_ref().err().map(|e| {
            let level = if e.is_user_error() {
                LogLevel::UserError
            } else {
                LogLevel::Error
            };
            (level, e.to_string())
        });

        match (outcome, self.context.finish(failure)) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(exit_error)) => Err(E::from(exit_error)),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(exit_error)) => {
                error!(
                    context_id = %self.context.context_id(),
                    error = %exit_error,
                    "Context exit failed while a scope failure was propagating"
                );
                Err(e)
            }
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if self.exited {
            return;
        }
        let failure = if std::thread::panicking() {
            (
                LogLevel::Error,
                format!("Scope of context '{}' panicked", self.context.context_id()),
            )
        } else {
            warn!(context_id = %self.context.context_id(), "Scope dropped without exit");
            (
                LogLevel::Warning,
                format!(
                    "Scope of context '{}' ended without an exit outcome",
                    self.context.context_id()
                ),
            )
        };
        if let Err(e) = self.context.finish(Some(failure)) {
            error!(
                context_id = %self.context.context_id(),
                error = %e,
                "Context exit on drop failed"
            );
        }
    }
}

impl Context {
    /// Activate this context on the calling logical thread
    pub fn enter(&self) -> Result<ContextGuard, ContextError> {
        {
            let mut state = self.inner.state.lock();
            if *state != ContextState::Unentered {
                return Err(ContextError::Consistency(format!(
                    "Context '{}' cannot be entered because it is {:?}",
                    self.context_id(),
                    *state
                )));
            }
            *state = ContextState::Active;
        }

        if self.kind() == ContextKind::Testing {
            if let Err(e) = self.delete_all_and_drop_db() {
                *self.inner.state.lock() = ContextState::Unentered;
                return Err(e);
            }
        }
        if let Err(e) = stack::push(self.clone()) {
            *self.inner.state.lock() = ContextState::Unentered;
            return Err(e);
        }

        debug!(context_id = %self.context_id(), depth = stack::depth(), "Entered context");
        Ok(ContextGuard {
            context: self.clone(),
            exited: false,
        })
    }

    /// Enter, run `body`, and exit with its outcome
    pub fn run<T, E, F>(&self, body: F) -> Result<T, E>
    where
        E: ScopeFailure,
        F: FnOnce() -> Result<T, E>,
    {
        let guard = self.enter()?;
        let outcome = body();
        guard.exit(outcome)
    }

    /// Async [`Context::run`]. The body must stay on one logical thread, so drive it inside
    /// [`stack::isolated_async`] on a multi-threaded runtime.
    pub async fn run_async<T, E, F>(&self, body: F) -> Result<T, E>
    where
        E: ScopeFailure,
        F: Future<Output = Result<T, E>>,
    {
        let guard = self.enter()?;
        let outcome = body.await;
        guard.exit(outcome)
    }

    // Testing cleanup, then the failure entry, then the pop
    fn finish(&self, failure: Option<(LogLevel, String)>) -> Result<(), ContextError> {
        if self.kind() == ContextKind::Testing {
            if let Err(e) = self.delete_all_and_drop_db() {
                warn!(context_id = %self.context_id(), error = %e, "Failed to drop test database");
            }
        }

        if let Some((level, message)) = failure {
            if let Err(e) = self.write_failure(level, &message) {
                warn!(
                    context_id = %self.context_id(),
                    error = %e,
                    "Failed to persist scope failure entry"
                );
            }
        }

        let popped = stack::pop(self);
        *self.inner.state.lock() = ContextState::Exited;
        popped?;
        debug!(context_id = %self.context_id(), depth = stack::depth(), "Exited context");
        Ok(())
    }

    fn write_failure(&self, level: LogLevel, message: &str) -> Result<(), ContextError> {
        let log = self.log()?;
        log.get_logger(module_path!()).log(level, message);
        match log.create_entry(level, message) {
            LogRecord::Entry(entry) => self.save_one(&entry, &DbScope::new()),
            LogRecord::User(entry) => self.save_one(&entry, &DbScope::new()),
        }
    }
}
