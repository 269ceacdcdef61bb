//! Update cycle behaviour against scripted collaborators.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use extkeeper_core::{
    ExtensionRecord, ExtensionStatus, OrchestratorOptions, RunStatus, UpdateOrchestrator,
};
use extkeeper_testing::{record, ApplierCall, ScriptedApplier, StaticInventory};
use tempfile::TempDir;

fn orchestrator(
    inventory: Arc<StaticInventory>,
    applier: Arc<ScriptedApplier>,
    options: OrchestratorOptions,
) -> UpdateOrchestrator {
    UpdateOrchestrator::new(options)
        .with_inventory(inventory)
        .with_applier(applier)
}

fn default_orchestrator(
    inventory: Arc<StaticInventory>,
    applier: Arc<ScriptedApplier>,
) -> UpdateOrchestrator {
    orchestrator(inventory, applier, OrchestratorOptions::default())
}

#[tokio::test]
async fn test_no_updates_needed() {
    let root = TempDir::new().unwrap();
    let inventory = Arc::new(StaticInventory::new(vec![
        record("a", ExtensionStatus::UpToDate),
        record("b", ExtensionStatus::Unknown),
        record("c", ExtensionStatus::Error),
    ]));
    let applier = Arc::new(ScriptedApplier::succeeding());

    let summary = default_orchestrator(inventory.clone(), applier.clone())
        .run_update_cycle(root.path())
        .await;

    assert_eq!(summary.status, RunStatus::NoUpdatesNeeded);
    assert_eq!(summary.human_message, "no updates needed");
    assert!(summary.successes.is_empty());
    assert!(summary.failures.is_empty());
    assert!(applier.calls().is_empty());
    assert_eq!(inventory.call_count(), 1);
}

#[tokio::test]
async fn test_empty_inventory() {
    let root = TempDir::new().unwrap();
    let applier = Arc::new(ScriptedApplier::succeeding());

    let summary = default_orchestrator(Arc::new(StaticInventory::new(vec![])), applier.clone())
        .run_update_cycle(root.path())
        .await;

    assert_eq!(summary.status, RunStatus::NoUpdatesNeeded);
    assert!(applier.calls().is_empty());
}

#[tokio::test]
async fn test_all_updates_succeed_in_order() {
    let root = TempDir::new().unwrap();
    let inventory = Arc::new(StaticInventory::new(vec![
        record("zeta", ExtensionStatus::NeedUpdate),
        record("alpha", ExtensionStatus::UpToDate),
        record("mid", ExtensionStatus::NeedUpdate),
        record("beta", ExtensionStatus::NeedUpdate),
    ]));
    let applier = Arc::new(ScriptedApplier::succeeding());

    let summary = default_orchestrator(inventory, applier.clone())
        .run_update_cycle(root.path())
        .await;

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.total_needing_update, 3);
    assert_eq!(summary.successes, vec!["zeta", "mid", "beta"]);
    assert!(summary.failures.is_empty());
    assert_eq!(applier.called_names(), vec!["zeta", "mid", "beta"]);
    assert!(summary.outcomes.iter().all(|o| o.succeeded));
}

#[tokio::test]
async fn test_spec_example_partial_failure() {
    let root = TempDir::new().unwrap();
    let inventory = Arc::new(StaticInventory::new(vec![
        record("A", ExtensionStatus::NeedUpdate),
        record("B", ExtensionStatus::UpToDate),
        record("C", ExtensionStatus::NeedUpdate),
    ]));
    let applier = Arc::new(ScriptedApplier::succeeding().failing_for(["C"]));

    let summary = default_orchestrator(inventory, applier)
        .run_update_cycle(root.path())
        .await;

    assert_eq!(summary.status, RunStatus::PartialFailure);
    assert_eq!(summary.successes, vec!["A"]);
    assert_eq!(summary.failures, vec!["C"]);
    assert!(summary.human_message.contains("2 extensions need update"));
    assert!(summary.human_message.contains("1 failed: C"));
    assert!(summary.human_message.contains("1 succeeded: [A]"));

    let failed = summary.outcomes.iter().find(|o| o.name == "C").unwrap();
    assert!(!failed.succeeded);
    assert!(failed
        .error_detail
        .as_deref()
        .unwrap()
        .contains("scripted failure"));
}

#[tokio::test]
async fn test_failures_do_not_abort_run() {
    let root = TempDir::new().unwrap();
    let names = ["one", "two", "three", "four", "five"];
    let inventory = Arc::new(StaticInventory::new(
        names
            .iter()
            .map(|n| record(n, ExtensionStatus::NeedUpdate))
            .collect(),
    ));
    let applier = Arc::new(ScriptedApplier::succeeding().failing_for(["two", "four"]));

    let summary = default_orchestrator(inventory, applier.clone())
        .run_update_cycle(root.path())
        .await;

    assert_eq!(summary.failures, vec!["two", "four"]);
    assert_eq!(summary.successes, vec!["one", "three", "five"]);
    assert_eq!(applier.called_names(), names.to_vec());
}

#[tokio::test]
async fn test_every_update_failing_still_completes() {
    let root = TempDir::new().unwrap();
    let inventory = Arc::new(StaticInventory::new(vec![
        record("a", ExtensionStatus::NeedUpdate),
        record("b", ExtensionStatus::NeedUpdate),
    ]));
    let applier = Arc::new(ScriptedApplier::succeeding().failing_for(["a", "b"]));

    let summary = default_orchestrator(inventory, applier.clone())
        .run_update_cycle(root.path())
        .await;

    assert_eq!(summary.status, RunStatus::PartialFailure);
    assert!(summary.successes.is_empty());
    assert_eq!(summary.failures, vec!["a", "b"]);
    assert_eq!(applier.calls().len(), 2);
    assert!(summary.human_message.contains("0 succeeded: []"));
}

#[tokio::test]
async fn test_missing_names_are_skipped() {
    let root = TempDir::new().unwrap();
    let inventory = Arc::new(StaticInventory::new(vec![
        ExtensionRecord::unnamed(ExtensionStatus::NeedUpdate),
        record("", ExtensionStatus::NeedUpdate),
        record("after", ExtensionStatus::NeedUpdate),
    ]));
    let applier = Arc::new(ScriptedApplier::succeeding());

    let summary = default_orchestrator(inventory, applier.clone())
        .run_update_cycle(root.path())
        .await;

    assert_eq!(summary.total_needing_update, 3);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.successes, vec!["after"]);
    assert!(summary.failures.is_empty());
    assert_eq!(applier.called_names(), vec!["after"]);
    assert_eq!(
        summary.successes.len() + summary.failures.len() + summary.skipped,
        summary.total_needing_update
    );
    assert!(summary.human_message.contains("2 skipped"));
}

#[tokio::test]
async fn test_missing_install_root() {
    let inventory = Arc::new(StaticInventory::new(vec![record(
        "a",
        ExtensionStatus::NeedUpdate,
    )]));
    let applier = Arc::new(ScriptedApplier::succeeding());
    let missing = Path::new("/definitely/not/a/real/extkeeper/root");

    let summary = default_orchestrator(inventory.clone(), applier.clone())
        .run_update_cycle(missing)
        .await;

    assert_eq!(summary.status, RunStatus::InstallRootNotFound);
    assert!(summary
        .human_message
        .contains("/definitely/not/a/real/extkeeper/root"));
    assert_eq!(inventory.call_count(), 0);
    assert!(applier.calls().is_empty());
}

#[tokio::test]
async fn test_install_root_that_is_a_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("not-a-dir");
    std::fs::write(&file, b"x").unwrap();

    let summary = default_orchestrator(
        Arc::new(StaticInventory::new(vec![])),
        Arc::new(ScriptedApplier::succeeding()),
    )
    .run_update_cycle(&file)
    .await;

    assert_eq!(summary.status, RunStatus::InstallRootNotFound);
}

#[tokio::test]
async fn test_missing_applier_is_dependency_unavailable() {
    let root = TempDir::new().unwrap();
    let inventory = Arc::new(StaticInventory::new(vec![record(
        "a",
        ExtensionStatus::NeedUpdate,
    )]));

    let summary = UpdateOrchestrator::new(OrchestratorOptions::default())
        .with_inventory(inventory.clone())
        .run_update_cycle(root.path())
        .await;

    assert_eq!(summary.status, RunStatus::DependencyUnavailable);
    assert!(summary.human_message.contains("update applier"));
    assert_eq!(inventory.call_count(), 0);
}

#[tokio::test]
async fn test_inventory_error_is_unexpected_failure() {
    let root = TempDir::new().unwrap();
    let applier = Arc::new(ScriptedApplier::succeeding());

    let summary = default_orchestrator(
        Arc::new(StaticInventory::failing("permission denied on root")),
        applier.clone(),
    )
    .run_update_cycle(root.path())
    .await;

    assert_eq!(summary.status, RunStatus::UnexpectedFailure);
    assert!(summary.human_message.starts_with("update cycle aborted"));
    assert!(summary.human_message.contains("permission denied on root"));
    assert!(applier.calls().is_empty());
}

#[tokio::test]
async fn test_applier_panic_is_isolated() {
    let root = TempDir::new().unwrap();
    let inventory = Arc::new(StaticInventory::new(vec![
        record("first", ExtensionStatus::NeedUpdate),
        record("crashy", ExtensionStatus::NeedUpdate),
        record("last", ExtensionStatus::NeedUpdate),
    ]));
    let applier = Arc::new(ScriptedApplier::succeeding().panicking_for(["crashy"]));

    let summary = default_orchestrator(inventory, applier.clone())
        .run_update_cycle(root.path())
        .await;

    assert_eq!(summary.successes, vec!["first", "last"]);
    assert_eq!(summary.failures, vec!["crashy"]);
    let crashed = summary.outcomes.iter().find(|o| o.name == "crashy").unwrap();
    assert!(crashed
        .error_detail
        .as_deref()
        .unwrap()
        .contains("scripted panic for crashy"));
}

#[tokio::test]
async fn test_proxy_passed_through_unchanged() {
    let root = TempDir::new().unwrap();
    let inventory = Arc::new(StaticInventory::new(vec![record(
        "a",
        ExtensionStatus::NeedUpdate,
    )]));
    let applier = Arc::new(ScriptedApplier::succeeding());
    let options = OrchestratorOptions {
        proxy_address: Some("http://mirror.local:7890".to_string()),
        ..OrchestratorOptions::default()
    };

    orchestrator(inventory, applier.clone(), options)
        .run_update_cycle(root.path())
        .await;

    assert_eq!(
        applier.calls(),
        vec![ApplierCall {
            name: "a".to_string(),
            proxy: Some("http://mirror.local:7890".to_string()),
        }]
    );
}

#[tokio::test]
async fn test_no_proxy_means_applier_default() {
    let root = TempDir::new().unwrap();
    let inventory = Arc::new(StaticInventory::new(vec![record(
        "a",
        ExtensionStatus::NeedUpdate,
    )]));
    let applier = Arc::new(ScriptedApplier::succeeding());

    default_orchestrator(inventory, applier.clone())
        .run_update_cycle(root.path())
        .await;

    assert_eq!(applier.calls()[0].proxy, None);
}

#[tokio::test]
async fn test_inventory_receives_install_root() {
    let root = TempDir::new().unwrap();
    let inventory = Arc::new(StaticInventory::new(vec![]));

    default_orchestrator(inventory.clone(), Arc::new(ScriptedApplier::succeeding()))
        .run_update_cycle(root.path())
        .await;

    assert_eq!(inventory.roots(), vec![root.path().to_path_buf()]);
}

#[tokio::test]
async fn test_test_mode_writes_inventory_dump() {
    let root = TempDir::new().unwrap();
    let dump_dir = TempDir::new().unwrap();
    let dump_path = dump_dir.path().join("inventory.md");
    let inventory = Arc::new(StaticInventory::new(vec![record(
        "weather",
        ExtensionStatus::UpToDate,
    )]));
    let options = OrchestratorOptions {
        test_mode: true,
        diagnostics_path: dump_path.clone(),
        ..OrchestratorOptions::default()
    };

    orchestrator(inventory, Arc::new(ScriptedApplier::succeeding()), options)
        .run_update_cycle(root.path())
        .await;

    let dump = std::fs::read_to_string(&dump_path).unwrap();
    assert!(dump.contains("weather"));
}

#[tokio::test]
async fn test_unwritable_dump_does_not_fail_run() {
    let root = TempDir::new().unwrap();
    let blocker = root.path().join("blocker");
    std::fs::write(&blocker, b"file").unwrap();
    let options = OrchestratorOptions {
        test_mode: true,
        // Parent is a regular file, so the dump cannot be created
        diagnostics_path: blocker.join("inventory.md"),
        ..OrchestratorOptions::default()
    };
    let inventory = Arc::new(StaticInventory::new(vec![record(
        "a",
        ExtensionStatus::NeedUpdate,
    )]));

    let summary = orchestrator(inventory, Arc::new(ScriptedApplier::succeeding()), options)
        .run_update_cycle(root.path())
        .await;

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.successes, vec!["a"]);
}

#[tokio::test]
async fn test_updates_run_one_at_a_time() {
    let root = TempDir::new().unwrap();
    let inventory = Arc::new(StaticInventory::new(vec![
        record("a", ExtensionStatus::NeedUpdate),
        record("b", ExtensionStatus::NeedUpdate),
        record("c", ExtensionStatus::NeedUpdate),
    ]));
    let applier = Arc::new(ScriptedApplier::succeeding().with_delay(Duration::from_millis(10)));

    default_orchestrator(inventory, applier.clone())
        .run_update_cycle(root.path())
        .await;

    assert_eq!(applier.max_in_flight(), 1);
}

#[tokio::test]
async fn test_concurrent_cycles_do_not_interleave() {
    let root = TempDir::new().unwrap();
    let inventory = Arc::new(StaticInventory::new(vec![
        record("a", ExtensionStatus::NeedUpdate),
        record("b", ExtensionStatus::NeedUpdate),
    ]));
    let applier = Arc::new(ScriptedApplier::succeeding().with_delay(Duration::from_millis(10)));
    let orchestrator = Arc::new(default_orchestrator(inventory.clone(), applier.clone()));

    let first = {
        let orchestrator = orchestrator.clone();
        let root = root.path().to_path_buf();
        tokio::spawn(async move { orchestrator.run_update_cycle(&root).await })
    };
    let second = {
        let orchestrator = orchestrator.clone();
        let root = root.path().to_path_buf();
        tokio::spawn(async move { orchestrator.run_update_cycle(&root).await })
    };

    let first = first.await.unwrap();
    let second = second.await.unwrap();

    assert_eq!(first.status, RunStatus::Completed);
    assert_eq!(second.status, RunStatus::Completed);
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(inventory.call_count(), 2);
    assert_eq!(applier.max_in_flight(), 1);
    assert_eq!(applier.called_names(), vec!["a", "b", "a", "b"]);
}
