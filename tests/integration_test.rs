use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

fn trellis_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_trellis"))
}

fn run_json(dir: &Path, args: &[&str]) -> Value {
    let output = trellis_cmd()
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "command {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn run_ok(dir: &Path, args: &[&str]) {
    let output = trellis_cmd()
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "command {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

#[test]
fn test_init_creates_trellis_directory() {
    let tmp = TempDir::new().unwrap();

    let output = trellis_cmd()
        .current_dir(tmp.path())
        .args(["init"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(tmp.path().join(".trellis").exists());
    assert!(tmp.path().join(".trellis/trellis.db").exists());
}

#[test]
fn test_init_twice_fails() {
    let tmp = TempDir::new().unwrap();

    run_ok(tmp.path(), &["init"]);

    let output = trellis_cmd()
        .current_dir(tmp.path())
        .args(["init"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Already initialized"));
}

#[test]
fn test_add_note_without_init_fails() {
    let tmp = TempDir::new().unwrap();

    let output = trellis_cmd()
        .current_dir(tmp.path())
        .args(["add", "note", "Test"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not a trellis data directory"));
}

#[test]
fn test_full_note_workflow() {
    let tmp = TempDir::new().unwrap();
    run_ok(tmp.path(), &["init"]);

    let note = run_json(
        tmp.path(),
        &[
            "add", "note", "Reading list", "--body", "start with Dune", "--tag", "books", "--json",
        ],
    );
    assert_eq!(note["title"], "Reading list");
    assert_eq!(note["tags"][0], "books");
    let id = id_of(&note);

    let fetched = run_json(tmp.path(), &["get", "note", &id, "--json"]);
    assert_eq!(fetched["body"], "start with Dune");

    let listed = run_json(tmp.path(), &["list", "note", "--json"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    run_ok(tmp.path(), &["delete", "note", &id]);

    let output = trellis_cmd()
        .current_dir(tmp.path())
        .args(["get", "note", &id])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Entity not found"));
}

#[test]
fn test_update_note_autosave_flow() {
    let tmp = TempDir::new().unwrap();
    run_ok(tmp.path(), &["init"]);

    let note = run_json(tmp.path(), &["add", "note", "Draft", "--json"]);
    let id = id_of(&note);

    let updated = run_json(
        tmp.path(),
        &[
            "update", "note", &id, "--body", "first pass", "--starred", "true", "--tag", "writing",
            "--json",
        ],
    );
    assert_eq!(updated["body"], "first pass");
    assert_eq!(updated["starred"], true);
    assert_eq!(updated["tags"][0], "writing");
    assert!(updated["updated_at"].as_str().unwrap() >= note["updated_at"].as_str().unwrap());

    // Clearing the category with "none" is a no-op here but must not error.
    run_ok(tmp.path(), &["update", "note", &id, "--category", "none"]);

    let output = trellis_cmd()
        .current_dir(tmp.path())
        .args(["update", "note", &uuid::Uuid::new_v4().to_string(), "--title", "x"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Entity not found"));
}

#[test]
fn test_update_action_sub_task_check_and_regression() {
    let tmp = TempDir::new().unwrap();
    run_ok(tmp.path(), &["init"]);

    let action = run_json(
        tmp.path(),
        &[
            "add",
            "action",
            "Ship release",
            "--sub-task",
            "tag version",
            "--sub-task",
            "write notes",
            "--json",
        ],
    );
    let id = id_of(&action);
    let subs = action["sub_tasks"].as_array().unwrap();
    assert_eq!(subs.len(), 2);
    let first = subs[0]["id"].as_str().unwrap().to_string();

    let checked = run_json(
        tmp.path(),
        &["update", "action", &id, "--check", &first, "--json"],
    );
    assert_eq!(checked["sub_tasks"][0]["completed"], true);
    assert_eq!(checked["done"], false);

    run_ok(tmp.path(), &["update", "action", &id, "--done", "true"]);

    // Unchecking a sub-task pulls the action back out of done.
    let unchecked = run_json(
        tmp.path(),
        &["update", "action", &id, "--uncheck", &first, "--json"],
    );
    assert_eq!(unchecked["sub_tasks"][0]["completed"], false);
    assert_eq!(unchecked["done"], false);
}

#[test]
fn test_update_milestone_collapse() {
    let tmp = TempDir::new().unwrap();
    run_ok(tmp.path(), &["init"]);

    let path = run_json(tmp.path(), &["add", "path", "Garden", "--json"]);
    let milestone = run_json(
        tmp.path(),
        &["path", "add-milestone", &id_of(&path), "Plant", "--json"],
    );
    let milestone_id = id_of(&milestone);

    let updated = run_json(
        tmp.path(),
        &[
            "update", "milestone", &milestone_id, "--collapsed", "true", "--json",
        ],
    );
    assert_eq!(updated["collapsed"], true);
    assert_eq!(updated["title"], "Plant");
}

#[test]
fn test_link_errors_name_the_missing_side() {
    let tmp = TempDir::new().unwrap();
    run_ok(tmp.path(), &["init"]);

    let path = run_json(tmp.path(), &["add", "path", "A", "--json"]);
    let path_id = id_of(&path);
    let action = run_json(tmp.path(), &["add", "action", "task", "--json"]);
    let action_id = id_of(&action);

    let ghost = uuid::Uuid::new_v4().to_string();

    // Missing action: the error carries the action id.
    let output = trellis_cmd()
        .current_dir(tmp.path())
        .args(["path", "link", &ghost, &path_id])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Entity not found"));
    assert!(stderr.contains(&ghost));

    // Missing path: the error carries the path id, not the action id.
    let output = trellis_cmd()
        .current_dir(tmp.path())
        .args(["path", "link", &action_id, &ghost])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Entity not found"));
    assert!(stderr.contains(&ghost));
    assert!(!stderr.contains(&action_id));

    // Milestone on another path: refused with a message naming both.
    let other = run_json(tmp.path(), &["add", "path", "B", "--json"]);
    let stray = run_json(
        tmp.path(),
        &["path", "add-milestone", &id_of(&other), "M", "--json"],
    );
    let output = trellis_cmd()
        .current_dir(tmp.path())
        .args([
            "path",
            "link",
            &action_id,
            &path_id,
            "--milestone",
            &id_of(&stray),
        ])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not belong to path"));
    assert!(stderr.contains(&id_of(&stray)));
}

#[test]
fn test_q1_goals_scenario() {
    let tmp = TempDir::new().unwrap();
    run_ok(tmp.path(), &["init"]);

    let path = run_json(tmp.path(), &["add", "path", "Q1 Goals", "--json"]);
    let path_id = id_of(&path);

    let kickoff = run_json(
        tmp.path(),
        &["path", "add-milestone", &path_id, "Kickoff", "--json"],
    );
    assert_eq!(kickoff["order"], 1);
    let kickoff_id = id_of(&kickoff);

    let a = run_json(tmp.path(), &["add", "action", "invite team", "--json"]);
    let b = run_json(tmp.path(), &["add", "action", "book room", "--json"]);

    for action in [&a, &b] {
        run_ok(
            tmp.path(),
            &[
                "path",
                "link",
                &id_of(action),
                &path_id,
                "--milestone",
                &kickoff_id,
            ],
        );
    }

    let milestone_actions = run_json(
        tmp.path(),
        &[
            "path",
            "actions",
            &path_id,
            "--milestone",
            &kickoff_id,
            "--json",
        ],
    );
    let orders: Vec<i64> = milestone_actions
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["order"].as_i64().unwrap())
        .collect();
    assert_eq!(orders, vec![1, 2]);

    run_ok(tmp.path(), &["path", "delete-milestone", &kickoff_id]);

    // Both actions now hang directly off the path.
    let path_actions = run_json(tmp.path(), &["path", "actions", &path_id, "--json"]);
    let titles: Vec<&str> = path_actions
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&"invite team"));
    assert!(titles.contains(&"book room"));
    for action in path_actions.as_array().unwrap() {
        assert_eq!(action["parent"]["kind"], "path");
        assert_eq!(action["parent"]["id"].as_str().unwrap(), path_id);
    }

    let fetched_path = run_json(tmp.path(), &["get", "path", &path_id, "--json"]);
    assert!(fetched_path["milestones"].as_array().unwrap().is_empty());
}

#[test]
fn test_category_usage_gates_deletion() {
    let tmp = TempDir::new().unwrap();
    run_ok(tmp.path(), &["init"]);

    let category = run_json(
        tmp.path(),
        &["add", "category", "Work", "--color", "#3355ff", "--json"],
    );
    let category_id = id_of(&category);

    let usage = run_json(tmp.path(), &["category", "usage", &category_id, "--json"]);
    assert_eq!(usage["is_used"], false);
    assert_eq!(usage["total_usage"], 0);

    run_json(
        tmp.path(),
        &[
            "add", "note", "standup", "--category", &category_id, "--json",
        ],
    );

    let usage = run_json(tmp.path(), &["category", "usage", &category_id, "--json"]);
    assert_eq!(usage["is_used"], true);
    assert_eq!(usage["total_usage"], 1);
    assert_eq!(usage["usage"]["notes"], 1);

    // Delete is refused while referenced; the category must still exist.
    run_ok(tmp.path(), &["delete", "category", &category_id]);
    run_ok(tmp.path(), &["get", "category", &category_id]);
}

#[test]
fn test_category_cleanup_reports() {
    let tmp = TempDir::new().unwrap();
    run_ok(tmp.path(), &["init"]);

    run_ok(tmp.path(), &["add", "category", "test scratch"]);
    run_ok(tmp.path(), &["add", "category", "Finances"]);

    let report = run_json(tmp.path(), &["category", "cleanup", "--json"]);
    assert_eq!(report["deleted"].as_array().unwrap().len(), 1);
    assert_eq!(report["deleted"][0], "test scratch");
    assert!(report["errors"].as_array().unwrap().is_empty());

    let listed = run_json(tmp.path(), &["list", "category", "--json"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["title"], "Finances");
}

#[test]
fn test_loop_with_items_round_trips() {
    let tmp = TempDir::new().unwrap();
    run_ok(tmp.path(), &["init"]);

    let lp = run_json(
        tmp.path(),
        &[
            "add",
            "loop",
            "Morning",
            "--frequency",
            "weekdays",
            "--item",
            "Stretch:10",
            "--item",
            "Journal",
            "--json",
        ],
    );
    assert_eq!(lp["frequency"], "weekdays");
    let loop_id = id_of(&lp);

    let fetched = run_json(tmp.path(), &["get", "loop", &loop_id, "--json"]);
    let items = fetched["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "Stretch");
    assert_eq!(items[0]["duration_minutes"], 10);
    assert_eq!(items[1]["order"], 2);
}
