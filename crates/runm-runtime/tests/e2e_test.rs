//! End-to-end tests for the created-state controller.
//!
//! These drive [`InitProcess`] with its host collaborators:
//! 1. A real bundle directory with an OCI `config.json`
//! 2. A one-shot HTTP server standing in for the port broker
//! 3. A shell script standing in for the auxiliary launcher
//! 4. Real signal delivery and reaping

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::await_holding_lock)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use nix::sys::signal::Signal;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;
use runm_common::config::{LauncherLocation, ShimConfig};
use runm_common::types::Status;
use runm_runtime::context::Context;
use runm_runtime::error::RuntimeError;
use runm_runtime::init::InitProcess;
use runm_runtime::record::ProcessRecord;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Serializes writing launcher scripts and forking so no child inherits a
/// script that is still open for writing (ETXTBSY).
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

struct Bundle {
    _dir: tempfile::TempDir,
    bundle: PathBuf,
    rootfs: PathBuf,
    out: PathBuf,
}

fn bundle(marker: bool) -> Bundle {
    let dir = tempfile::tempdir().expect("tempdir");
    let bundle = dir.path().join("bundle");
    let rootfs = bundle.join("rootfs");
    let out = dir.path().join("out");
    std::fs::create_dir_all(&rootfs).expect("mkdir rootfs");
    std::fs::create_dir_all(&out).expect("mkdir out");
    if marker {
        std::fs::create_dir(rootfs.join("model")).expect("mkdir marker");
    }
    let config = serde_json::json!({
        "ociVersion": "1.0.2",
        "root": { "path": "rootfs" },
        "annotations": { "io.kubernetes.cri.sandbox-name": "llm-pod" }
    });
    std::fs::write(bundle.join("config.json"), config.to_string()).expect("write config");
    Bundle {
        _dir: dir,
        bundle,
        rootfs,
        out,
    }
}

/// Writes a launcher that records its arguments and port variable.
fn write_launcher(b: &Bundle, tail: &str) -> PathBuf {
    let path = b.out.join("runm");
    let script = format!(
        "#!/bin/sh\nprintf '%s\\n' \"$@\" > {out}/args.tmp && mv {out}/args.tmp {out}/args\nprintf '%s' \"${{OLLAMA_HOST-unset}}\" > {out}/env.tmp && mv {out}/env.tmp {out}/env\n{tail}\n",
        out = b.out.display()
    );
    std::fs::write(&path, script).expect("write launcher");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

fn wait_for(path: &Path) -> String {
    for _ in 0..200 {
        if let Ok(content) = std::fs::read_to_string(path) {
            return content;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("{} never appeared", path.display());
}

fn reap(pid: u32) -> WaitStatus {
    waitpid(Pid::from_raw(i32::try_from(pid).unwrap()), None).expect("waitpid")
}

fn controller(b: &Bundle, launcher: PathBuf, endpoint: String) -> InitProcess {
    let config = ShimConfig {
        broker_endpoint: endpoint,
        launcher: LauncherLocation::Explicit { path: launcher },
        ..ShimConfig::default()
    };
    InitProcess::new(ProcessRecord::new(&b.rootfs, &b.bundle), config)
}

/// Reads one request, headers and `content-length` body.
async fn read_request(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map_or(0, |v| v.trim().parse::<usize>().unwrap());
            if buf.len() >= end + 4 + len {
                return;
            }
        }
    }
}

async fn broker_once(status_line: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;
    });
    format!("http://{addr}/")
}

async fn dead_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

// ── Auxiliary launch ─────────────────────────────────────────────────

#[tokio::test]
async fn marker_with_assigned_port_launches_service_with_port() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let b = bundle(true);
    let launcher = write_launcher(&b, "exit 0");
    let endpoint = broker_once("200 OK", r#"{"hostPort": 5000}"#).await;
    let mut init = controller(&b, launcher, endpoint);

    init.start(&Context::background()).await.expect("start");

    assert_eq!(init.status(), Status::Running);
    let pid = init.pid().expect("pid recorded");
    assert_eq!(wait_for(&b.out.join("env")), "127.0.0.1:5000");
    assert_eq!(
        wait_for(&b.out.join("args")),
        format!("serve\n--rootfs\n{}\n", b.rootfs.display())
    );
    assert!(matches!(reap(pid), WaitStatus::Exited(_, 0)));
}

#[tokio::test]
async fn marker_with_refusing_broker_launches_without_port() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let b = bundle(true);
    let launcher = write_launcher(&b, "exit 0");
    let endpoint = broker_once("503 Service Unavailable", "").await;
    let mut init = controller(&b, launcher, endpoint);

    init.start(&Context::background()).await.expect("start");

    let pid = init.pid().expect("pid recorded");
    assert_eq!(wait_for(&b.out.join("env")), "unset");
    let _ = reap(pid);
}

#[tokio::test]
async fn marker_with_unreachable_broker_launches_without_port() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let b = bundle(true);
    let launcher = write_launcher(&b, "exit 0");
    let mut init = controller(&b, launcher, dead_endpoint().await);

    init.start(&Context::background()).await.expect("start");

    let pid = init.pid().expect("pid recorded");
    assert_eq!(wait_for(&b.out.join("env")), "unset");
    let _ = reap(pid);
}

#[tokio::test]
async fn no_marker_spawns_nothing() {
    let b = bundle(false);
    let launcher = b.out.join("runm");
    let mut init = controller(&b, launcher, dead_endpoint().await);

    init.start(&Context::background()).await.expect("start");

    assert_eq!(init.status(), Status::Running);
    assert!(init.pid().is_none());
    assert!(!b.out.join("args").exists());
}

#[tokio::test]
async fn missing_launcher_fails_start_without_pid() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let b = bundle(true);
    let launcher = b.out.join("does-not-exist");
    let endpoint = broker_once("200 OK", r#"{"hostPort": 5000}"#).await;
    let mut init = controller(&b, launcher, endpoint);

    let err = init.start(&Context::background()).await.unwrap_err();

    assert!(matches!(err, RuntimeError::Spawn { .. }));
    assert_eq!(init.status(), Status::Running);
    assert!(init.pid().is_none());
}

#[tokio::test]
async fn malformed_broker_reply_fails_start() {
    let b = bundle(true);
    let launcher = b.out.join("runm");
    let endpoint = broker_once("200 OK", "not json").await;
    let mut init = controller(&b, launcher, endpoint);

    let err = init.start(&Context::background()).await.unwrap_err();

    assert!(matches!(err, RuntimeError::ResponseDecode { .. }));
    assert!(init.pid().is_none());
}

// ── Lifecycle after launch ───────────────────────────────────────────

#[tokio::test]
async fn kill_stops_running_service_once() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let b = bundle(true);
    let launcher = write_launcher(&b, "exec sleep 30");
    let endpoint = broker_once("200 OK", r#"{"hostPort": 5001}"#).await;
    let mut init = controller(&b, launcher, endpoint);
    init.start(&Context::background()).await.expect("start");
    let pid = init.pid().expect("pid recorded");
    let _ = wait_for(&b.out.join("env"));

    init.kill(Signal::SIGKILL, false).expect("kill");
    assert_eq!(init.status(), Status::Stopped);
    assert!(matches!(
        reap(pid),
        WaitStatus::Signaled(_, Signal::SIGKILL, _)
    ));

    // Already stopped: no second delivery, so no ESRCH for the reaped pid.
    init.kill(Signal::SIGKILL, false).expect("second kill");

    init.set_exited(137);
    assert_eq!(init.status(), Status::Stopped);
    assert_eq!(init.record().exit().map(|e| e.code), Some(137));

    init.delete().expect("delete");
    assert_eq!(init.status(), Status::Deleted);
}

#[tokio::test]
async fn kill_all_signals_service_process_group() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let b = bundle(true);
    let launcher = write_launcher(&b, "exec sleep 30");
    let endpoint = broker_once("200 OK", r#"{"hostPort": 5002}"#).await;
    let mut init = controller(&b, launcher, endpoint);
    init.start(&Context::background()).await.expect("start");
    let pid = init.pid().expect("pid recorded");
    let _ = wait_for(&b.out.join("env"));

    init.kill(Signal::SIGKILL, true).expect("kill group");
    assert_eq!(init.status(), Status::Stopped);
    assert!(matches!(
        reap(pid),
        WaitStatus::Signaled(_, Signal::SIGKILL, _)
    ));

    init.kill(Signal::SIGKILL, true).expect("second kill");
}
