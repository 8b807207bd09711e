//! End-to-end cycles through the library API

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;
use windscan::core::model::{ChangeEvent, ChangeKind, WarningCode};
use windscan::engine::{MemorySink, Orchestrator, TriggerQueue};
use windscan::{Config, Engine, Phase, ScanState, Trigger};

fn config(files: &[&str]) -> Config {
    let mut config = Config::default();
    config.content.files = files.iter().map(|f| f.to_string()).collect();
    config
}

fn build_engine(root: &Path, config: &Config) -> (Engine, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let engine = Engine::from_config(root, config, Box::new(Arc::clone(&sink))).unwrap();
    (engine, sink)
}

fn rule_tokens(state: &ScanState) -> Vec<&str> {
    state.rules().iter().map(|r| r.token.as_str()).collect()
}

const CATALOG: &str = r#"{
    "utilities": [
        {"type": "static", "name": "flex", "declarations": [{"property": "display", "value": "flex"}]},
        {"type": "functional", "name": "p", "properties": ["padding"], "spacing": {}}
    ]
}"#;

#[test]
fn initial_cycle_compiles_known_tokens() {
    let temp = tempdir().unwrap();
    fs::write(
        temp.path().join("index.html"),
        "flex mt-4 hover:text-red-500 unknownxyz",
    )
    .unwrap();
    let (mut engine, sink) = build_engine(temp.path(), &config(&["*.html"]));

    let (state, report) = engine.run_cycle(ScanState::new(), Trigger::Initial);

    assert_eq!(report.phase, Phase::Idle);
    assert!(report.full_scan);
    assert_eq!(report.rule_count, 3);
    assert_eq!(rule_tokens(&state), vec!["mt-4", "flex", "hover:text-red-500"]);
    assert!(report.added_tokens.contains("unknownxyz"));
    assert_eq!(sink.emitted().len(), 1);
    assert_eq!(sink.emitted()[0].added.len(), 3);
}

#[test]
fn edit_produces_rule_delta() {
    let temp = tempdir().unwrap();
    let page = temp.path().join("index.html");
    fs::write(&page, "flex mt-4 hover:text-red-500 unknownxyz").unwrap();
    let (mut engine, sink) = build_engine(temp.path(), &config(&["*.html"]));
    let (state, _) = engine.run_cycle(ScanState::new(), Trigger::Initial);

    fs::write(&page, "flex p-2 hover:text-red-500").unwrap();
    let (state, report) = engine.run_cycle(
        state,
        Trigger::Changes(vec![ChangeEvent::new(&page, ChangeKind::Modified)]),
    );

    assert!(!report.full_scan);
    assert_eq!(report.files_scanned, 1);
    let added: Vec<&str> = report.rule_diff.added.iter().map(|r| r.token.as_str()).collect();
    let removed: Vec<&str> = report.rule_diff.removed.iter().map(|r| r.token.as_str()).collect();
    assert_eq!(added, vec!["p-2"]);
    assert_eq!(removed, vec!["mt-4"]);
    assert_eq!(state.rules().len(), 3);
    assert!(report.changed_paths.contains("index.html"));
    assert_eq!(sink.emitted().len(), 2);
}

#[test]
fn unchanged_input_is_idempotent() {
    let temp = tempdir().unwrap();
    let page = temp.path().join("index.html");
    fs::write(&page, "flex mt-4").unwrap();
    let (mut engine, sink) = build_engine(temp.path(), &config(&["*.html"]));
    let (state, _) = engine.run_cycle(ScanState::new(), Trigger::Initial);
    let rules_before = state.rules().to_vec();

    let (state, report) = engine.run_cycle(
        state,
        Trigger::Changes(vec![ChangeEvent::new(&page, ChangeKind::Modified)]),
    );
    assert!(report.rule_diff.is_empty());
    assert!(report.changed_paths.is_empty());

    let (state, report) = engine.run_cycle(state, Trigger::Initial);
    assert!(report.rule_diff.is_empty());
    assert_eq!(report.files_reused, 1);
    assert_eq!(state.rules(), rules_before.as_slice());
    assert_eq!(sink.emitted().len(), 1, "no emit without a rule change");
}

#[test]
fn oversized_file_warns_and_contributes_nothing() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.html"), "flex").unwrap();
    fs::write(temp.path().join("b.html"), "grid grid grid grid grid").unwrap();
    let mut config = config(&["*.html"]);
    config.scan.max_file_size = 8;
    let (mut engine, _) = build_engine(temp.path(), &config);

    let (state, report) = engine.run_cycle(ScanState::new(), Trigger::Initial);

    assert_eq!(report.phase, Phase::Idle);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].path, "b.html");
    assert_eq!(report.warnings[0].code, WarningCode::Skipped);
    assert_eq!(rule_tokens(&state), vec!["flex"]);
}

#[test]
fn removed_file_drops_its_rules() {
    let temp = tempdir().unwrap();
    let a = temp.path().join("a.html");
    let b = temp.path().join("b.html");
    fs::write(&a, "flex").unwrap();
    fs::write(&b, "flex grid").unwrap();
    let (mut engine, _) = build_engine(temp.path(), &config(&["*.html"]));
    let (state, _) = engine.run_cycle(ScanState::new(), Trigger::Initial);

    fs::remove_file(&b).unwrap();
    let (state, report) = engine.run_cycle(
        state,
        Trigger::Changes(vec![ChangeEvent::new(&b, ChangeKind::Removed)]),
    );

    assert_eq!(report.removed_tokens.into_iter().collect::<Vec<_>>(), vec!["grid"]);
    assert_eq!(rule_tokens(&state), vec!["flex"]);
    assert!(state.cache().get("b.html").is_none());
}

#[test]
fn removal_event_for_existing_file_keeps_its_rules() {
    let temp = tempdir().unwrap();
    let page = temp.path().join("index.html");
    fs::write(&page, "flex mt-4").unwrap();
    let (mut engine, _) = build_engine(temp.path(), &config(&["*.html"]));
    let (state, _) = engine.run_cycle(ScanState::new(), Trigger::Initial);

    // Editors that save by delete + recreate leave a stale removal behind
    let (state, report) = engine.run_cycle(
        state,
        Trigger::Changes(vec![ChangeEvent::new(&page, ChangeKind::Removed)]),
    );

    assert!(report.rule_diff.is_empty());
    assert!(report.removed_tokens.is_empty());
    assert_eq!(rule_tokens(&state), vec!["mt-4", "flex"]);
    assert!(state.cache().get("index.html").is_some());

    let (state, _) = engine.run_cycle(state, Trigger::Changes(Vec::new()));
    assert_eq!(state.rules().len(), 2);
}

#[cfg(target_os = "linux")]
#[test]
fn unreadable_file_warns_and_other_files_still_compile() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.html"), "flex").unwrap();
    // Reading offset 0 of the process's own memory fails with EIO, even as root
    std::os::unix::fs::symlink("/proc/self/mem", temp.path().join("b.html")).unwrap();
    let (mut engine, _) = build_engine(temp.path(), &config(&["*.html"]));

    let (state, report) = engine.run_cycle(ScanState::new(), Trigger::Initial);

    assert_eq!(report.phase, Phase::Idle);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].path, "b.html");
    assert_eq!(report.warnings[0].code, WarningCode::Unreadable);
    assert_eq!(rule_tokens(&state), vec!["flex"]);
    assert!(state.cache().get("b.html").unwrap().tokens.is_empty());
}

#[cfg(target_os = "linux")]
#[test]
fn failed_read_is_retried_without_a_change_event() {
    let temp = tempdir().unwrap();
    let a = temp.path().join("a.html");
    let b = temp.path().join("b.html");
    fs::write(&a, "flex").unwrap();
    std::os::unix::fs::symlink("/proc/self/mem", &b).unwrap();
    let (mut engine, _) = build_engine(temp.path(), &config(&["*.html"]));
    let (state, report) = engine.run_cycle(ScanState::new(), Trigger::Initial);
    assert_eq!(report.warnings.len(), 1);

    // The file becomes readable; no event reports it
    fs::remove_file(&b).unwrap();
    fs::write(&b, "grid").unwrap();
    let (state, report) = engine.run_cycle(
        state,
        Trigger::Changes(vec![ChangeEvent::new(&a, ChangeKind::Modified)]),
    );

    assert!(!report.full_scan);
    assert!(report.warnings.is_empty());
    assert_eq!(rule_tokens(&state), vec!["flex", "grid"]);
    assert!(!state.cache().get("b.html").unwrap().fingerprint.is_empty());
}

#[test]
fn created_file_is_scanned_incrementally() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.html"), "flex").unwrap();
    let (mut engine, _) = build_engine(temp.path(), &config(&["*.html"]));
    let (state, _) = engine.run_cycle(ScanState::new(), Trigger::Initial);

    let b = temp.path().join("b.html");
    fs::write(&b, "p-4").unwrap();
    let notes = temp.path().join("notes.txt");
    fs::write(&notes, "grid").unwrap();
    let (state, report) = engine.run_cycle(
        state,
        Trigger::Changes(vec![
            ChangeEvent::new(&b, ChangeKind::Created),
            ChangeEvent::new(&notes, ChangeKind::Created),
        ]),
    );

    assert!(!report.full_scan);
    assert_eq!(report.files_scanned, 1);
    assert_eq!(rule_tokens(&state), vec!["flex", "p-4"]);
}

#[test]
fn new_directory_falls_back_to_full_scan() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.html"), "flex").unwrap();
    let (mut engine, _) = build_engine(temp.path(), &config(&["**/*.html"]));
    let (state, _) = engine.run_cycle(ScanState::new(), Trigger::Initial);

    let dir = temp.path().join("pages");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("b.html"), "grid").unwrap();
    let (state, report) = engine.run_cycle(
        state,
        Trigger::Changes(vec![ChangeEvent::new(&dir, ChangeKind::Created)]),
    );

    assert!(report.full_scan);
    assert_eq!(rule_tokens(&state), vec!["flex", "grid"]);
}

#[test]
fn catalog_failure_keeps_last_good_rules() {
    let temp = tempdir().unwrap();
    let catalog = temp.path().join("catalog.json");
    fs::write(&catalog, CATALOG).unwrap();
    let page = temp.path().join("index.html");
    fs::write(&page, "flex").unwrap();

    let mut config = config(&["*.html"]);
    config.catalog.path = Some("catalog.json".into());
    let (mut engine, sink) = build_engine(temp.path(), &config);
    let (state, _) = engine.run_cycle(ScanState::new(), Trigger::Initial);
    assert_eq!(rule_tokens(&state), vec!["flex"]);

    fs::write(&catalog, "{ not json").unwrap();
    fs::write(&page, "flex p-2").unwrap();
    let (state, report) = engine.run_cycle(
        state,
        Trigger::Changes(vec![ChangeEvent::new(&page, ChangeKind::Modified)]),
    );

    assert!(report.is_failed());
    assert_eq!(report.phase, Phase::Failed);
    assert_eq!(engine.phase(), Phase::Idle);
    assert!(report.error.as_deref().unwrap().contains("corrupt"));
    assert_eq!(rule_tokens(&state), vec!["flex"]);
    assert_eq!(sink.emitted().len(), 1);

    // The next cycle recovers with the tokens scanned during the failed one
    fs::write(&catalog, CATALOG).unwrap();
    let (state, report) = engine.run_cycle(state, Trigger::Changes(Vec::new()));

    assert_eq!(report.phase, Phase::Idle);
    assert_eq!(engine.phase(), Phase::Idle);
    assert_eq!(rule_tokens(&state), vec!["flex", "p-2"]);
    let added: Vec<&str> = report.rule_diff.added.iter().map(|r| r.token.as_str()).collect();
    assert_eq!(added, vec!["p-2"]);
}

#[test]
fn transform_only_applies_to_its_file_type() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("app.rs"), "<div class:hidden=move>").unwrap();
    fs::write(temp.path().join("page.html"), "<div class:flex>").unwrap();

    let mut config: Config = toml::from_str(
        r#"
[content.transform.rs]
kind = "replace"
pattern = '(?:^|\s)class:'
replacement = " "
"#,
    )
    .unwrap();
    config.content.files = vec!["*.rs".to_string(), "*.html".to_string()];
    let (mut engine, _) = build_engine(temp.path(), &config);

    let (state, _) = engine.run_cycle(ScanState::new(), Trigger::Initial);
    assert_eq!(rule_tokens(&state), vec!["hidden"]);
    assert!(state.cache().tokens_of("page.html").unwrap().contains("class:flex"));
}

#[test]
fn pattern_change_rescans_everything() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.html"), "flex").unwrap();
    fs::write(temp.path().join("b.txt"), "grid").unwrap();
    let (mut engine, _) = build_engine(temp.path(), &config(&["*.html"]));
    let (state, _) = engine.run_cycle(ScanState::new(), Trigger::Initial);

    let (state, report) =
        engine.run_cycle(state, Trigger::PatternsChanged(vec!["*.txt".to_string()]));

    assert!(report.full_scan);
    assert_eq!(engine.content().patterns(), ["*.txt".to_string()]);
    assert_eq!(rule_tokens(&state), vec!["grid"]);
    assert!(state.cache().get("a.html").is_none());
}

#[test]
fn invalid_pattern_change_fails_the_cycle_only() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.html"), "flex").unwrap();
    let (mut engine, _) = build_engine(temp.path(), &config(&["*.html"]));
    let (state, _) = engine.run_cycle(ScanState::new(), Trigger::Initial);

    let (state, report) =
        engine.run_cycle(state, Trigger::PatternsChanged(vec!["[".to_string()]));
    assert!(report.is_failed());
    assert_eq!(rule_tokens(&state), vec!["flex"]);
    assert_eq!(engine.content().patterns(), ["*.html".to_string()]);
}

#[test]
fn orchestrator_coalesces_queued_triggers() {
    let temp = tempdir().unwrap();
    let page = temp.path().join("index.html");
    fs::write(&page, "flex").unwrap();
    let (engine, sink) = build_engine(temp.path(), &config(&["*.html"]));

    let queue = Arc::new(TriggerQueue::new());
    queue.push(Trigger::Initial);
    queue.push(Trigger::Changes(vec![ChangeEvent::new(&page, ChangeKind::Modified)]));
    queue.close();

    let mut reports = Vec::new();
    let state = Orchestrator::new(engine, ScanState::new(), Arc::clone(&queue))
        .run(|_, report| reports.push(report.clone()));

    assert_eq!(reports.len(), 1);
    assert!(reports[0].full_scan);
    assert_eq!(rule_tokens(&state), vec!["flex"]);
    assert_eq!(sink.emitted().len(), 1);
}

#[test]
fn orchestrator_runs_on_its_own_thread() {
    let temp = tempdir().unwrap();
    let page = temp.path().join("index.html");
    fs::write(&page, "flex").unwrap();
    let (engine, _) = build_engine(temp.path(), &config(&["*.html"]));

    let queue = Arc::new(TriggerQueue::new());
    let orchestrator = Orchestrator::new(engine, ScanState::new(), Arc::clone(&queue));
    let handle = orchestrator.spawn(|_, _| {});

    queue.push(Trigger::Initial);
    queue.close();
    let state = handle.join().unwrap();
    assert_eq!(rule_tokens(&state), vec!["flex"]);
}

#[test]
fn persisted_cache_is_reused() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.html"), "flex").unwrap();
    let config = config(&["*.html"]);
    let (mut engine, _) = build_engine(temp.path(), &config);
    let (state, _) = engine.run_cycle(ScanState::new(), Trigger::Initial);

    windscan::cache::store::save_cache(temp.path(), state.cache(), &config.policy_hash()).unwrap();
    let cache = windscan::cache::store::load_cache(temp.path(), &config.policy_hash()).unwrap();

    let (mut engine, _) = build_engine(temp.path(), &config);
    let (state, report) = engine.run_cycle(ScanState::from_cache(cache), Trigger::Initial);
    assert_eq!(report.files_reused, 1);
    assert_eq!(rule_tokens(&state), vec!["flex"]);
}
