//! Integration tests for per-logical-thread stack isolation

use super::test_utils::memory_root;
use ctxrt::context::stack;
use ctxrt::{Context, ContextError};
use std::sync::{Arc, Barrier};

#[test]
fn test_threads_have_independent_stacks() {
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|i| {
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let name = format!("isolation_thread_{}", i);
                let root = memory_root(&name, "\\");
                let guard = root.enter().unwrap();
                // Both threads hold an active context at the same time
                barrier.wait();
                assert_eq!(Context::current().unwrap().context_id(), name);
                assert_eq!(stack::depth(), 1);
                guard.exit(Ok::<_, ContextError>(())).unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tasks_do_not_share_stacks() {
    let tasks: Vec<_> = (0..8)
        .map(|i| {
            tokio::spawn(stack::isolated_async(async move {
                let name = format!("isolation_task_{}", i);
                let root = memory_root(&name, "\\");
                root.run_async(async {
                    for _ in 0..5 {
                        tokio::task::yield_now().await;
                        assert_eq!(Context::current()?.context_id(), name);
                        assert_eq!(stack::depth(), 1);
                    }
                    Ok::<_, ContextError>(())
                })
                .await
            }))
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }
}

#[test]
fn test_isolation_boundary_hides_outer_scope() {
    let outer = memory_root("isolation_outer", "\\");
    let guard = outer.enter().unwrap();

    let seen_inside = stack::isolated(|| Context::current().is_ok());
    assert!(!seen_inside);
    assert!(Context::current().unwrap().ptr_eq(&outer));

    guard.exit(Ok::<_, ContextError>(())).unwrap();
}

#[test]
fn test_reset_clears_leftover_contexts() {
    stack::isolated(|| {
        let root = memory_root("isolation_reset", "\\");
        let guard = root.enter().unwrap();
        std::mem::forget(guard);
        assert_eq!(stack::depth(), 1);

        stack::reset();
        assert_eq!(stack::depth(), 0);
        assert!(Context::current().is_err());
    });
}
