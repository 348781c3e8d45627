//! Context stacks per logical thread
//!
//! Inside [`isolated`] or [`isolated_async`] the stack is task-local and starts empty, so
//! concurrent requests or tests never observe each other's contexts. Outside of an
//! isolation scope each OS thread has its own stack.
//!
//! Spawned tasks do not inherit a stack. Enter a root context in the spawned task, or wrap
//! it in [`isolated_async`] first.

use crate::context::Context;
use crate::error::ContextError;
use std::cell::RefCell;
use std::future::Future;

type Stack = Option<Vec<Context>>;

tokio::task_local! {
    static TASK_STACK: RefCell<Stack>;
}

thread_local! {
    static THREAD_STACK: RefCell<Stack> = const { RefCell::new(None) };
}

fn with_stack<T>(f: impl FnOnce(&mut Stack) -> T) -> Result<T, ContextError> {
    if TASK_STACK.try_with(|_| ()).is_ok() {
        return TASK_STACK
            .try_with(|cell| f(&mut cell.borrow_mut()))
            .map_err(|e| ContextError::Consistency(format!("Task context stack: {}", e)));
    }
    THREAD_STACK
        .try_with(|cell| f(&mut cell.borrow_mut()))
        .map_err(|e| ContextError::Consistency(format!("Thread context stack: {}", e)))
}

/// Push onto the current logical thread's stack, creating it on first use
pub(crate) fn push(context: Context) -> Result<(), ContextError> {
    with_stack(|stack| stack.get_or_insert_with(Vec::new).push(context))
}

/// Pop `context`, which must be the top of the current stack.
///
/// On mismatch the stack is left untouched.
pub(crate) fn pop(context: &Context) -> Result<(), ContextError> {
    with_stack(|stack| {
        let stack = stack.as_mut().ok_or_else(|| {
            ContextError::Consistency(format!(
                "Exiting context '{}' but no context stack exists for this thread",
                context.context_id()
            ))
        })?;
        match stack.last() {
            Some(top) if top.ptr_eq(context) => {
                stack.pop();
                Ok(())
            }
            Some(top) => Err(ContextError::Consistency(format!(
                "Exiting context '{}' but the current context is '{}'",
                context.context_id(),
                top.context_id()
            ))),
            None => Err(ContextError::Consistency(format!(
                "Exiting context '{}' but the context stack is empty",
                context.context_id()
            ))),
        }
    })?
}

/// Top of the current logical thread's stack
pub fn current() -> Result<Context, ContextError> {
    try_current()?.ok_or_else(|| {
        ContextError::Config(
            "No active context. Enter a root context (for example Context::process() \
             or Context::testing()) before calling code that requires one"
                .to_string(),
        )
    })
}

/// Top of the stack, or `None` outside any scope
pub fn try_current() -> Result<Option<Context>, ContextError> {
    with_stack(|stack| stack.as_ref().and_then(|s| s.last().cloned()))
}

/// Number of active contexts on this logical thread
pub fn depth() -> usize {
    with_stack(|stack| stack.as_ref().map_or(0, Vec::len)).unwrap_or(0)
}

/// Tear down the current logical thread's stack
pub fn reset() {
    let _ = with_stack(|stack| stack.take());
}

/// Run `f` with a fresh, empty stack
pub fn isolated<R>(f: impl FnOnce() -> R) -> R {
    TASK_STACK.sync_scope(RefCell::new(None), f)
}

/// Drive `future` with a fresh, empty stack that follows the task across threads
pub async fn isolated_async<F: Future>(future: F) -> F::Output {
    TASK_STACK.scope(RefCell::new(None), future).await
}
