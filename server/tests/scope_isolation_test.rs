//! Context propagation under concurrency.
//!
//! 100 operations run at once, each with its own scope context, and each
//! only ever observes its own. Nothing is left behind afterwards.

use std::time::Duration;

use futures::future::join_all;
use scopegate_server::scope::{self, ScopeContext};

fn context_for(i: usize) -> ScopeContext {
    match i % 3 {
        0 => ScopeContext::Unit {
            user_id: format!("user-{i}"),
            unit_id: format!("unit-{}", i % 7),
        },
        1 => ScopeContext::SelfOnly {
            user_id: format!("user-{i}"),
        },
        _ => ScopeContext::Global {
            user_id: format!("user-{i}"),
        },
    }
}

/// Read the context repeatedly across suspension points.
async fn operation(i: usize) -> Vec<Option<ScopeContext>> {
    let mut seen = Vec::new();
    for step in 0..5 {
        seen.push(scope::current());
        let jitter = ((i * 7 + step * 13) % 5) as u64;
        tokio::time::sleep(Duration::from_millis(jitter)).await;
        tokio::task::yield_now().await;
    }
    seen.push(scope::current());
    seen
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tasks_are_isolated() {
    let handles: Vec<_> = (0..100)
        .map(|i| {
            tokio::spawn(async move {
                let seen = scope::with_scope(context_for(i), operation(i))
                    .await
                    .expect("no outer scope");
                (i, seen, scope::current())
            })
        })
        .collect();

    for handle in handles {
        let (i, seen, after) = handle.await.expect("task panicked");
        let expected = context_for(i);
        assert!(
            seen.iter().all(|ctx| ctx.as_ref() == Some(&expected)),
            "operation {i} observed a foreign context"
        );
        assert_eq!(after, None, "operation {i} leaked its context");
    }

    assert_eq!(scope::current(), None);
}

#[tokio::test]
async fn test_interleaved_futures_on_one_task_are_isolated() {
    let operations = (0..100).map(|i| async move {
        let seen = scope::with_scope(context_for(i), operation(i))
            .await
            .expect("no outer scope");
        (i, seen)
    });

    for (i, seen) in join_all(operations).await {
        let expected = context_for(i);
        assert!(seen.iter().all(|ctx| ctx.as_ref() == Some(&expected)));
    }

    assert_eq!(scope::current(), None);
    assert!(scope::require_current().is_err());
}

#[tokio::test]
async fn test_cancelled_operations_release_context() {
    let operations = (0..100).map(|i| async move {
        let slow = scope::with_scope(context_for(i), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        tokio::time::timeout(Duration::from_millis(10), slow).await
    });

    let results = join_all(operations).await;
    assert!(results.iter().all(Result::is_err));
    assert_eq!(scope::current(), None);
}

#[tokio::test]
async fn test_spawned_children_inherit_only_through_spawn_scoped() {
    let ctx = context_for(0);
    let (inherited, detached) = scope::with_scope(ctx.clone(), async {
        let inherited = scope::spawn_scoped(async { scope::current() });
        let detached = tokio::spawn(async { scope::current() });
        (inherited.await.unwrap(), detached.await.unwrap())
    })
    .await
    .unwrap();

    assert_eq!(inherited, Some(ctx));
    assert_eq!(detached, None);
}
