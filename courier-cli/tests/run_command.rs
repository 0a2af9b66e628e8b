use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::SystemTime;

use assert_cmd::prelude::*;
use chrono::{DateTime, Duration, Utc};
use filetime::{set_file_mtime, FileTime};
use predicates::str::contains;
use tempfile::TempDir;
use tiny_http::{Header, Response, Server};

fn courier_cmd(cwd: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("courier"));
    cmd.current_dir(cwd)
        .env_remove("BOT_CREDENTIAL")
        .env_remove("WEBHOOK_URL")
        .env("GIT_CEILING_DIRECTORIES", cwd)
        .env("RUST_LOG", "info");
    cmd
}

fn write_watermark(path: &Path, at: DateTime<Utc>) {
    fs::write(
        path,
        serde_json::json!({ "last_check": at.to_rfc3339() }).to_string(),
    )
    .expect("write watermark");
}

fn read_watermark(path: &Path) -> DateTime<Utc> {
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(path).expect("read state")).expect("json");
    DateTime::parse_from_rfc3339(value["last_check"].as_str().expect("last_check"))
        .expect("rfc3339")
        .with_timezone(&Utc)
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[test]
fn missing_credential_reports_and_exits_cleanly() {
    let cwd = TempDir::new().expect("cwd");
    fs::create_dir_all(cwd.path().join("daily-summaries")).unwrap();

    courier_cmd(cwd.path())
        .env("WEBHOOK_URL", "http://127.0.0.1:9/hook")
        .assert()
        .success()
        .stdout(contains("BOT_CREDENTIAL"));

    assert!(!cwd.path().join("last_check.json").exists());
}

#[test]
fn missing_working_copy_reports_and_exits_cleanly() {
    let cwd = TempDir::new().expect("cwd");

    courier_cmd(cwd.path())
        .args(["run", "--repo", "nowhere"])
        .env("BOT_CREDENTIAL", "bot-key")
        .env("WEBHOOK_URL", "http://127.0.0.1:9/hook")
        .assert()
        .success()
        .stdout(contains("working copy not found"));

    assert!(!cwd.path().join("last_check.json").exists());
}

#[test]
fn credential_can_come_from_dotenv_file() {
    let cwd = TempDir::new().expect("cwd");
    fs::write(
        cwd.path().join(".env"),
        "BOT_CREDENTIAL=from-dotenv\nWEBHOOK_URL=http://127.0.0.1:9/hook\n",
    )
    .unwrap();

    // Both variables resolve, so the next check to fail is the working copy.
    courier_cmd(cwd.path())
        .assert()
        .success()
        .stdout(contains("working copy not found"));
}

// ---------------------------------------------------------------------------
// Sync failure
// ---------------------------------------------------------------------------

#[test]
fn failed_pull_leaves_watermark_untouched() {
    let cwd = TempDir::new().expect("cwd");
    let repo = cwd.path().join("daily-summaries");
    fs::create_dir_all(&repo).unwrap();
    fs::write(repo.join("fresh.md"), "# fresh").unwrap();

    let state = cwd.path().join("last_check.json");
    write_watermark(&state, Utc::now() - Duration::hours(6));
    let before = fs::read_to_string(&state).unwrap();

    // Not a git checkout, so `git pull` fails (or git is missing entirely).
    courier_cmd(cwd.path())
        .env("BOT_CREDENTIAL", "bot-key")
        .env("WEBHOOK_URL", "http://127.0.0.1:9/hook")
        .assert()
        .success()
        .stdout(contains("git pull failed"));

    assert_eq!(fs::read_to_string(&state).unwrap(), before);
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[test]
fn status_without_state_says_never() {
    let cwd = TempDir::new().expect("cwd");
    courier_cmd(cwd.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("never checked"));
}

#[test]
fn status_prints_stored_watermark() {
    let cwd = TempDir::new().expect("cwd");
    let state = cwd.path().join("custom-state.json");
    write_watermark(&state, Utc::now() - Duration::hours(2));

    courier_cmd(cwd.path())
        .args(["status", "--state-file", "custom-state.json"])
        .assert()
        .success()
        .stdout(contains("last check"))
        .stdout(contains("2h ago"));
}

#[test]
fn status_on_corrupt_state_fails_with_context() {
    let cwd = TempDir::new().expect("cwd");
    fs::write(cwd.path().join("last_check.json"), "{{nope").unwrap();

    courier_cmd(cwd.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(contains("last_check.json"));
}

// ---------------------------------------------------------------------------
// End to end against a local git remote and a stub webhook
// ---------------------------------------------------------------------------

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(cwd: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=courier-test",
            "-c",
            "user.email=courier-test@example.com",
            "-c",
            "init.defaultBranch=master",
        ])
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Local bare remote with `a.md` and `b.md` on master, cloned to
/// `<root>/daily-summaries`.
fn clone_fixture(root: &Path) -> PathBuf {
    git(root, &["init", "--bare", "remote.git"]);
    let seed = root.join("seed");
    fs::create_dir_all(&seed).unwrap();
    git(&seed, &["init"]);
    fs::write(seed.join("a.md"), "# a\nalready sent").unwrap();
    fs::write(seed.join("b.md"), "# b\nbrand new").unwrap();
    git(&seed, &["add", "."]);
    git(&seed, &["commit", "-m", "summaries"]);
    git(&seed, &["push", "../remote.git", "HEAD:refs/heads/master"]);
    git(root, &["clone", "remote.git", "daily-summaries"]);
    root.join("daily-summaries")
}

/// Webhook stub answering every POST with `{"retCode":200}`; returns the URL
/// and the captured request bodies.
fn spawn_webhook() -> (String, Arc<Mutex<Vec<String>>>) {
    let server = Server::http("127.0.0.1:0").expect("bind");
    let addr = server.server_addr().to_ip().expect("tcp listener");
    let url = format!("http://{addr}/webhook");
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let captured = bodies.clone();
    thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let mut body = String::new();
            request
                .as_reader()
                .read_to_string(&mut body)
                .expect("read webhook body");
            captured.lock().expect("lock").push(body);

            let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                .expect("header");
            request
                .respond(Response::from_string(r#"{"retCode":200,"retMsg":"ok"}"#).with_header(header))
                .expect("respond");
        }
    });
    (url, bodies)
}

#[test]
fn relays_only_documents_newer_than_watermark() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let root = TempDir::new().expect("root");
    let repo = clone_fixture(root.path());

    let mark = Utc::now() - Duration::hours(3);
    let state = root.path().join("last_check.json");
    write_watermark(&state, mark);
    let older = SystemTime::from(mark - Duration::hours(1));
    let newer = SystemTime::from(mark + Duration::hours(1));
    set_file_mtime(repo.join("a.md"), FileTime::from_system_time(older)).unwrap();
    set_file_mtime(repo.join("b.md"), FileTime::from_system_time(newer)).unwrap();

    let (url, bodies) = spawn_webhook();
    let before = Utc::now();
    courier_cmd(root.path())
        .env("BOT_CREDENTIAL", "bot-key")
        .env("WEBHOOK_URL", &url)
        .assert()
        .success()
        .stdout(contains("1 delivered, 0 failed"));
    let after = Utc::now();

    let bodies = bodies.lock().expect("lock").clone();
    assert_eq!(bodies.len(), 1, "got {bodies:?}");
    let payload: serde_json::Value = serde_json::from_str(&bodies[0]).expect("json");
    assert_eq!(payload["content"], "# b\nbrand new");
    assert_eq!(payload["credential"], "bot-key");
    assert_eq!(payload["groupMode"], 1);

    let saved = read_watermark(&state);
    assert!(saved >= before && saved <= after, "saved {saved}");
}

#[test]
fn nothing_new_sends_nothing_but_advances_watermark() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let root = TempDir::new().expect("root");
    let repo = clone_fixture(root.path());

    let mark = Utc::now() - Duration::minutes(10);
    let state = root.path().join("last_check.json");
    write_watermark(&state, mark);
    let older = FileTime::from_system_time(SystemTime::from(mark - Duration::hours(1)));
    set_file_mtime(repo.join("a.md"), older).unwrap();
    set_file_mtime(repo.join("b.md"), older).unwrap();

    let (url, bodies) = spawn_webhook();
    courier_cmd(root.path())
        .env("BOT_CREDENTIAL", "bot-key")
        .env("WEBHOOK_URL", &url)
        .assert()
        .success()
        .stdout(contains("no new documents"));

    assert!(bodies.lock().expect("lock").is_empty());
    assert!(read_watermark(&state) > mark);
}

#[test]
fn dry_run_lists_without_sending() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let root = TempDir::new().expect("root");
    clone_fixture(root.path());
    let state = root.path().join("last_check.json");
    write_watermark(&state, Utc::now() - Duration::hours(1));
    let before = fs::read_to_string(&state).unwrap();

    let (url, bodies) = spawn_webhook();
    courier_cmd(root.path())
        .args(["run", "--dry-run"])
        .env("BOT_CREDENTIAL", "bot-key")
        .env("WEBHOOK_URL", &url)
        .assert()
        .success()
        .stdout(contains("[dry-run]"))
        .stdout(contains("a.md"))
        .stdout(contains("b.md"));

    assert!(bodies.lock().expect("lock").is_empty());
    assert_eq!(fs::read_to_string(&state).unwrap(), before);
}
