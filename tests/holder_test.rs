use item_holder::mock::{Journal, RecordingObserver};
use item_holder::{
    EventKind, Holder, HolderError, HolderState, ItemDefinition, ItemPack, NoopObserver,
    Operation,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn quiet() -> Holder {
    Holder::builder().observer(NoopObserver).build()
}

/// A definition whose builder records its own name and contributes nothing.
fn recorded(journal: &Journal, name: &'static str, need: &[&'static str]) -> ItemDefinition {
    let journal = journal.clone();
    ItemDefinition::new(name, move |_| {
        let journal = journal.clone();
        async move {
            journal.record(name);
            Ok(None)
        }
    })
    .needs(need.iter().copied())
}

#[tokio::test]
async fn test_load_an_item() {
    let holder = quiet();
    let seen = Arc::new(parking_lot::Mutex::new(None));

    let seen_by_item2 = seen.clone();
    holder
        .load([
            ItemDefinition::new("item1", |ctx| async move {
                assert_eq!(ctx.name(), "item1");
                Ok(ItemPack::new("Hello").into())
            }),
            ItemDefinition::new("item2", move |ctx| {
                let seen = seen_by_item2.clone();
                async move {
                    *seen.lock() = ctx.get_as::<&str>("item1").map(|item| *item);
                    Ok(None)
                }
            })
            .need("item1"),
        ])
        .await
        .expect("load failed");

    assert_eq!(*seen.lock(), Some("Hello"));
    assert_eq!(holder.state(), HolderState::Loaded);
    assert_eq!(*holder.get::<&str>("item1").unwrap().unwrap(), "Hello");
}

#[tokio::test]
async fn test_load_items_by_dependant_relations() {
    let journal = Journal::new();
    let holder = quiet();

    holder
        .load([
            recorded(&journal, "d", &["c"]),
            recorded(&journal, "a", &[]),
            recorded(&journal, "c", &["b", "a"]),
            recorded(&journal, "b", &["a"]),
        ])
        .await
        .unwrap();

    assert_eq!(journal.entries(), ["a", "b", "c", "d"]);
}

#[tokio::test]
async fn test_builders_only_see_items_built_before_them() {
    let holder = quiet();
    let views = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let definition = |name: &'static str, need: &[&'static str]| {
        let views = views.clone();
        ItemDefinition::new(name, move |ctx| {
            let views = views.clone();
            async move {
                let mut visible: Vec<String> = ctx.items().names().map(str::to_string).collect();
                visible.sort();
                views.lock().push((name, visible));
                Ok(ItemPack::new(name).into())
            }
        })
        .needs(need.iter().copied())
    };

    holder
        .load([definition("top", &["mid"]), definition("mid", &["base"]), definition("base", &[])])
        .await
        .unwrap();

    let views = views.lock().clone();
    assert_eq!(
        views,
        vec![
            ("base", vec![]),
            ("mid", vec!["base".to_string()]),
            ("top", vec!["base".to_string(), "mid".to_string()]),
        ]
    );
}

#[tokio::test]
async fn test_close_stops_then_destroys_in_reverse() {
    let journal = Journal::new();
    let holder = quiet();

    let j = journal.clone();
    let a = ItemDefinition::new("a", move |_| {
        let j = j.clone();
        async move {
            Ok(ItemPack::empty()
                .with_stop(j.hook("stop a"))
                .with_destroy(j.hook("destroy a"))
                .into())
        }
    });
    let b = ItemDefinition::new("b", |_| async { Ok(None) }).need("a");
    let j = journal.clone();
    let c = ItemDefinition::new("c", move |_| {
        let j = j.clone();
        async move { Ok(ItemPack::empty().with_stop(j.hook("stop c")).into()) }
    })
    .needs(["b", "a"]);
    let j = journal.clone();
    let d = ItemDefinition::new("d", move |_| {
        let j = j.clone();
        async move { Ok(ItemPack::empty().with_destroy(j.hook("destroy d")).into()) }
    })
    .need("c");

    holder.load([a, b, c, d]).await.unwrap();
    assert!(journal.entries().is_empty());

    holder.close().await.unwrap();

    assert_eq!(
        journal.entries(),
        ["stop c", "stop a", "destroy d", "destroy a"]
    );
    assert_eq!(holder.state(), HolderState::Closed);
}

#[tokio::test]
async fn test_cycle_dependencies_are_rejected() {
    let journal = Journal::new();
    let holder = quiet();

    let err = holder
        .load([recorded(&journal, "a", &["b"]), recorded(&journal, "b", &["a"])])
        .await
        .unwrap_err();

    assert!(err.is_cyclic());
    assert!(err.to_string().contains("cyclic dependency"));
    assert!(journal.entries().is_empty(), "no builder may run");
}

#[tokio::test]
async fn test_duplicate_names_are_rejected() {
    let journal = Journal::new();
    let holder = quiet();

    let err = holder
        .load([recorded(&journal, "a", &[]), recorded(&journal, "a", &[])])
        .await
        .unwrap_err();

    assert!(matches!(err, HolderError::DuplicateDefinition(ref name) if name == "a"));
    assert_eq!(err.to_string(), "definition name 'a' is duplicated");
    assert!(journal.entries().is_empty());
}

#[tokio::test]
async fn test_unknown_need_is_rejected_before_building() {
    let journal = Journal::new();
    let holder = quiet();

    let err = holder
        .load([recorded(&journal, "a", &[]), recorded(&journal, "b", &["missing"])])
        .await
        .unwrap_err();

    assert!(matches!(err, HolderError::UnresolvedNeed { ref need, .. } if need == "missing"));
    assert!(journal.entries().is_empty());
}

#[tokio::test]
async fn test_get_item_before_load_fails() {
    let holder = quiet();

    let err = holder.get_item("a").unwrap_err();
    assert!(matches!(
        err,
        HolderError::InvalidState {
            operation: Operation::GetItem,
            actual: HolderState::Init,
            ..
        }
    ));
    assert!(err.to_string().contains("'init'"));
}

#[tokio::test]
async fn test_second_load_fails_with_actual_state() {
    let holder = quiet();
    holder.load(Vec::<ItemDefinition>::new()).await.unwrap();

    let err = holder.load(Vec::<ItemDefinition>::new()).await.unwrap_err();
    assert!(matches!(
        err,
        HolderError::InvalidState {
            operation: Operation::Load,
            actual: HolderState::Loaded,
            ..
        }
    ));
    assert!(err.to_string().contains("'loaded'"));
}

#[tokio::test]
async fn test_close_before_load_fails() {
    let holder = quiet();

    let err = holder.close().await.unwrap_err();
    assert!(matches!(
        err,
        HolderError::InvalidState {
            operation: Operation::Close,
            actual: HolderState::Init,
            ..
        }
    ));
    assert_eq!(holder.state(), HolderState::Init);
}

#[tokio::test]
async fn test_close_twice_and_get_after_close_fail() {
    let holder = quiet();
    holder
        .load([ItemDefinition::new("a", |_| async { Ok(ItemPack::new(1u8).into()) })])
        .await
        .unwrap();
    holder.close().await.unwrap();

    assert!(matches!(
        holder.close().await,
        Err(HolderError::InvalidState { actual: HolderState::Closed, .. })
    ));
    assert!(matches!(
        holder.get_item("a"),
        Err(HolderError::InvalidState { actual: HolderState::Closed, .. })
    ));
}

#[tokio::test]
async fn test_missing_items_read_as_absent() {
    let holder = quiet();
    holder
        .load([
            ItemDefinition::new("value", |_| async { Ok(ItemPack::new(42u32).into()) }),
            ItemDefinition::new("nothing", |_| async { Ok(None) }),
        ])
        .await
        .unwrap();

    assert_eq!(*holder.get::<u32>("value").unwrap().unwrap(), 42);
    assert!(holder.get_item("nothing").unwrap().is_none());
    assert!(holder.get_item("never-defined").unwrap().is_none());
    // wrong type reads as absent too
    assert!(holder.get::<String>("value").unwrap().is_none());
    assert_eq!(holder.items().unwrap().len(), 1);
}

#[tokio::test]
async fn test_items_without_hooks_never_reach_teardown() {
    let observer = RecordingObserver::new();
    let holder = Holder::builder().observer(observer.clone()).build();

    holder
        .load([ItemDefinition::new("plain", |_| async { Ok(ItemPack::new("v").into()) })])
        .await
        .unwrap();
    assert!(holder.get_item("plain").unwrap().is_some());
    holder.close().await.unwrap();

    assert!(observer.names_for(EventKind::StoppingItem).is_empty());
    assert!(observer.names_for(EventKind::DestroyingItem).is_empty());
    assert_eq!(
        observer.kinds(),
        [
            EventKind::LoadingItem,
            EventKind::ItemLoaded,
            EventKind::AllItemsLoaded,
            EventKind::AllItemsStopped,
            EventKind::AllItemsDestroyed,
        ]
    );
}

#[tokio::test]
async fn test_build_failure_keeps_earlier_items_for_close() {
    let journal = Journal::new();
    let holder = quiet();
    let attempts = Arc::new(AtomicUsize::new(0));

    let j = journal.clone();
    let db = ItemDefinition::new("db", move |_| {
        let j = j.clone();
        async move { Ok(ItemPack::new("db").with_destroy(j.hook("destroy db")).into()) }
    });
    let counter = attempts.clone();
    let broken = ItemDefinition::new("broken", move |_| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("connection refused".into())
        }
    })
    .need("db");
    let never = recorded(&journal, "never", &["broken"]);

    let err = holder.load([db, broken, never]).await.unwrap_err();
    assert!(matches!(err, HolderError::BuildFailed { ref name, .. } if name == "broken"));
    assert!(err.to_string().contains("connection refused"));
    assert_eq!(attempts.load(Ordering::SeqCst), 1, "builds are never retried");
    assert!(journal.entries().is_empty(), "load does not tear down on its own");

    holder.close().await.unwrap();
    assert_eq!(journal.entries(), ["destroy db"]);
}

#[tokio::test]
async fn test_stop_failure_aborts_teardown() {
    let journal = Journal::new();
    let holder = quiet();

    let j = journal.clone();
    let first = ItemDefinition::new("first", move |_| {
        let j = j.clone();
        async move {
            Ok(ItemPack::empty()
                .with_stop(j.hook("stop first"))
                .with_destroy(j.hook("destroy first"))
                .into())
        }
    });
    let j = journal.clone();
    let second = ItemDefinition::new("second", move |_| {
        let j = j.clone();
        async move {
            Ok(ItemPack::empty()
                .with_stop(j.failing_hook("stop second", "socket stuck"))
                .into())
        }
    })
    .need("first");

    holder.load([first, second]).await.unwrap();
    let err = holder.close().await.unwrap_err();

    assert!(matches!(err, HolderError::StopFailed { ref name, .. } if name == "second"));
    assert_eq!(journal.entries(), ["stop second"]);
    assert_eq!(holder.state(), HolderState::Closing);
}

#[tokio::test]
async fn test_destroy_failure_aborts_teardown() {
    let journal = Journal::new();
    let holder = quiet();

    let j = journal.clone();
    let first = ItemDefinition::new("first", move |_| {
        let j = j.clone();
        async move { Ok(ItemPack::empty().with_destroy(j.hook("destroy first")).into()) }
    });
    let j = journal.clone();
    let second = ItemDefinition::new("second", move |_| {
        let j = j.clone();
        async move {
            Ok(ItemPack::empty()
                .with_destroy(j.failing_hook("destroy second", "disk gone"))
                .into())
        }
    })
    .need("first");

    holder.load([first, second]).await.unwrap();
    let err = holder.close().await.unwrap_err();

    assert!(matches!(err, HolderError::DestroyFailed { ref name, .. } if name == "second"));
    assert!(std::error::Error::source(&err).is_some());
    assert!(!journal.contains("destroy first"));
}

#[tokio::test]
async fn test_require_reports_missing_dependency() {
    let holder = quiet();

    let err = holder
        .load([
            ItemDefinition::new("base", |_| async { Ok(ItemPack::new(1u64).into()) }),
            ItemDefinition::new("user", |ctx| async move {
                let _: Arc<String> = ctx.require("base")?;
                Ok(None)
            })
            .need("base"),
        ])
        .await
        .unwrap_err();

    let HolderError::BuildFailed { name, source } = err else {
        panic!("expected a build failure");
    };
    assert_eq!(name, "user");
    assert!(source.to_string().contains("'base'"));
}

#[tokio::test]
async fn test_progress_events_carry_names_in_order() {
    let observer = RecordingObserver::new();
    let journal = Journal::new();
    let holder = Holder::builder().observer(observer.clone()).build();

    let j = journal.clone();
    let server = ItemDefinition::new("server", move |_| {
        let j = j.clone();
        async move {
            Ok(ItemPack::empty()
                .with_stop(j.hook("stop"))
                .with_destroy(j.hook("destroy"))
                .into())
        }
    })
    .need("config");
    let config = ItemDefinition::new("config", |_| async { Ok(ItemPack::new(()).into()) });

    holder.load([server, config]).await.unwrap();
    holder.close().await.unwrap();

    assert_eq!(observer.names_for(EventKind::LoadingItem), ["config", "server"]);
    assert_eq!(observer.names_for(EventKind::ItemLoaded), ["config", "server"]);
    assert_eq!(observer.names_for(EventKind::StoppingItem), ["server"]);
    assert_eq!(observer.names_for(EventKind::ItemDestroyed), ["server"]);
    assert_eq!(observer.kinds().last(), Some(&EventKind::AllItemsDestroyed));
}
