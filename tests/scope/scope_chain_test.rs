//! Scope chain lookups, isolation, and snapshots.

use podguard::scope::{ProtectedPodContext, Scope, ScopeSnapshot};
use podguard::selector::ServiceAccountSelector;

#[test]
fn root_scope_resolves_to_empty_context() {
    let scope = Scope::root();
    assert!(scope.get::<ProtectedPodContext>().is_none());
    assert!(ProtectedPodContext::from_scope(&scope).is_empty());
}

#[test]
fn lookup_returns_nearest_binding() {
    let outer = Scope::root().with(ProtectedPodContext::empty().append("outer"));
    let inner = outer.with(ProtectedPodContext::empty().append("inner"));

    let ctx = ProtectedPodContext::from_scope(&inner);
    assert!(ctx.contains("inner"));
    assert!(!ctx.contains("outer"));
}

#[test]
fn lookup_skips_frames_of_other_types() {
    let scope = Scope::root()
        .with(ProtectedPodContext::empty().append("prod"))
        .with(ServiceAccountSelector::from_names(["deployer"]))
        .with(ServiceAccountSelector::from_names(["reader"]));

    assert!(ProtectedPodContext::from_scope(&scope).contains("prod"));
    assert_eq!(
        scope.get::<ServiceAccountSelector>(),
        Some(&ServiceAccountSelector::from_names(["reader"]))
    );
}

#[test]
fn child_bindings_are_invisible_to_parent_and_siblings() {
    let parent = Scope::root().with(ProtectedPodContext::empty().append("shared"));
    let base = ProtectedPodContext::from_scope(&parent);
    let left = parent.with(base.append("left"));
    let right = parent.with(base.append("right"));

    let left_ctx = ProtectedPodContext::from_scope(&left);
    let right_ctx = ProtectedPodContext::from_scope(&right);
    let parent_ctx = ProtectedPodContext::from_scope(&parent);

    assert!(left_ctx.contains("shared") && left_ctx.contains("left"));
    assert!(!left_ctx.contains("right"));
    assert!(!right_ctx.contains("left"));
    assert!(!parent_ctx.contains("left") && !parent_ctx.contains("right"));
}

#[test]
fn snapshot_survives_serialization() {
    let scope = Scope::root()
        .with(ServiceAccountSelector::from_names_in("ci", ["deployer"]))
        .with(ProtectedPodContext::empty().append("prod").append("staging"));

    let snapshot = scope.snapshot();
    let json = serde_json::to_string(&snapshot).expect("serialize snapshot");
    let restored: ScopeSnapshot = serde_json::from_str(&json).expect("deserialize snapshot");
    assert_eq!(restored, snapshot);

    let resumed = Scope::from_snapshot(restored);
    assert_eq!(
        ProtectedPodContext::from_scope(&resumed),
        ProtectedPodContext::from_scope(&scope)
    );
    assert_eq!(
        resumed.get::<ServiceAccountSelector>(),
        scope.get::<ServiceAccountSelector>()
    );
}

#[test]
fn empty_snapshot_restores_root() {
    let resumed = Scope::from_snapshot(ScopeSnapshot::default());
    assert!(resumed.get::<ProtectedPodContext>().is_none());
    assert!(resumed.get::<ServiceAccountSelector>().is_none());
}

#[test]
fn scope_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Scope>();
}
