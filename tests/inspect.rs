//! End-to-end inspection against instance directories on disk

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;

use vmstate::core::settings::{self, SUPERVISOR_PID_FILE, SUPERVISOR_SOCKET};
use vmstate::core::{HostContext, InspectError, Status, Store, StoreError, StoreSettings, VmType};
use vmstate::report::{print_instances_with_home, Format};

const CONFIG: &str = "\
arch: x86_64
cpus: 2
memory: 2GiB
disk: 20GiB
ssh:
  localPort: 60022
message: |
  ssh -p {{.SSHLocalPort}} {{.Name}}
";

struct Fixture {
    home: TempDir,
    store: Store,
}

impl Fixture {
    fn new() -> Self {
        let home = TempDir::new().unwrap();
        let store = Store::new(
            StoreSettings::new(home.path()).with_info_timeout(Duration::from_millis(300)),
            HostContext::new("linux", "x86_64", Some(home.path().to_path_buf())),
        );
        Self { home, store }
    }

    fn instance(&self, name: &str) -> PathBuf {
        let dir = self.home.path().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(settings::CONFIG_FILE), CONFIG).unwrap();
        dir
    }
}

fn write_own_pid(path: &Path) {
    std::fs::write(path, format!("{}\n", std::process::id())).unwrap();
}

/// Answer every connection with `reply`, or hold it open without replying
fn fake_supervisor(socket: &Path, reply: Option<String>) -> tokio::task::JoinHandle<()> {
    let listener = UnixListener::bind(socket).unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let reply = reply.clone();
            tokio::spawn(async move {
                let (reader, mut writer) = stream.split();
                let mut request = String::new();
                let _ = BufReader::new(reader).read_line(&mut request).await;
                match reply {
                    Some(reply) => {
                        let _ = writer.write_all(format!("{}\n", reply).as_bytes()).await;
                    }
                    None => tokio::time::sleep(Duration::from_secs(30)).await,
                }
            });
        }
    })
}

fn info_reply(port: u16) -> Option<String> {
    Some(format!(
        r#"{{"version":1,"status":"ok","payload":{{"sshLocalPort":{}}}}}"#,
        port
    ))
}

#[tokio::test]
async fn running_instance_uses_live_port() {
    let fx = Fixture::new();
    let dir = fx.instance("web");
    write_own_pid(&dir.join(SUPERVISOR_PID_FILE));
    write_own_pid(&dir.join(settings::driver_pid_file(VmType::Qemu)));
    let server = fake_supervisor(&dir.join(SUPERVISOR_SOCKET), info_reply(41022));

    let inst = fx.store.inspect("web").await.unwrap();
    server.abort();

    assert_eq!(inst.status, Status::Running, "{:?}", inst.errors);
    assert!(inst.errors.is_empty());
    assert_eq!(inst.supervisor_pid, std::process::id() as i32);
    assert_eq!(inst.driver_pid, std::process::id() as i32);
    assert_eq!(inst.ssh_local_port, 41022);
    assert_eq!(inst.message, "ssh -p 41022 web\n");
}

#[tokio::test]
async fn silent_supervisor_times_out_once() {
    let fx = Fixture::new();
    let dir = fx.instance("slow");
    let socket = dir.join(SUPERVISOR_SOCKET);
    write_own_pid(&dir.join(SUPERVISOR_PID_FILE));
    write_own_pid(&dir.join(settings::driver_pid_file(VmType::Qemu)));
    let server = fake_supervisor(&socket, None);

    let inst = fx.store.inspect("slow").await.unwrap();
    server.abort();

    assert_eq!(inst.status, Status::Broken);
    assert_eq!(inst.errors.len(), 1, "{:?}", inst.errors);
    assert!(matches!(inst.errors[0], InspectError::SupervisorInfo { .. }));
    assert!(inst.errors[0].to_string().contains(&socket.display().to_string()));
    assert_eq!(inst.ssh_local_port, 60022);
}

#[tokio::test]
async fn supervisor_without_socket_is_broken() {
    let fx = Fixture::new();
    let dir = fx.instance("nosock");
    write_own_pid(&dir.join(SUPERVISOR_PID_FILE));
    write_own_pid(&dir.join(settings::driver_pid_file(VmType::Qemu)));

    let inst = fx.store.inspect("nosock").await.unwrap();

    assert_eq!(inst.status, Status::Broken);
    assert_eq!(inst.errors.len(), 1);
    assert!(matches!(inst.errors[0], InspectError::SupervisorConnect { .. }));
}

#[tokio::test]
async fn supervisor_without_driver_is_broken() {
    let fx = Fixture::new();
    let dir = fx.instance("half");
    write_own_pid(&dir.join(SUPERVISOR_PID_FILE));
    let server = fake_supervisor(&dir.join(SUPERVISOR_SOCKET), info_reply(60022));

    let inst = fx.store.inspect("half").await.unwrap();
    server.abort();

    assert_eq!(inst.status, Status::Broken);
    assert_eq!(inst.driver_pid, 0);
    assert_eq!(inst.errors.len(), 1);
    assert!(matches!(inst.errors[0], InspectError::DriverNotRunning));
}

#[tokio::test]
async fn driver_without_supervisor_names_backend() {
    let fx = Fixture::new();
    let dir = fx.instance("orphan");
    write_own_pid(&dir.join(settings::driver_pid_file(VmType::Qemu)));

    let inst = fx.store.inspect("orphan").await.unwrap();

    assert_eq!(inst.status, Status::Broken);
    assert_eq!(inst.supervisor_pid, 0);
    assert_eq!(inst.errors.len(), 1);
    assert_eq!(
        inst.errors[0].to_string(),
        "qemu driver is running but supervisor is not"
    );
}

#[tokio::test]
async fn every_failure_is_recorded_in_order() {
    let fx = Fixture::new();
    let dir = fx.home.path().join("wreck");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(settings::CONFIG_FILE), "message: \"{{.Nope}}\"\n").unwrap();
    std::fs::write(dir.join(SUPERVISOR_PID_FILE), "garbage").unwrap();
    std::fs::write(dir.join(settings::driver_pid_file(VmType::Qemu)), "junk").unwrap();

    let inst = fx.store.inspect("wreck").await.unwrap();

    assert_eq!(inst.status, Status::Broken);
    assert_eq!(inst.errors.len(), 3, "{:?}", inst.errors);
    assert!(inst.errors[0].to_string().contains(SUPERVISOR_PID_FILE));
    assert!(inst.errors[1].to_string().contains("qemu.pid"));
    assert!(matches!(inst.errors[2], InspectError::MessageRender { .. }));
    assert!(inst.message.is_empty());
}

#[tokio::test]
async fn stale_pid_file_is_removed_and_instance_stopped() {
    let fx = Fixture::new();
    let dir = fx.instance("stale");
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let pid = child.id();
    child.wait().unwrap();
    let pid_file = dir.join(SUPERVISOR_PID_FILE);
    std::fs::write(&pid_file, pid.to_string()).unwrap();

    let inst = fx.store.inspect("stale").await.unwrap();

    assert_eq!(inst.status, Status::Stopped);
    assert!(inst.errors.is_empty());
    assert!(!pid_file.exists());
}

#[tokio::test]
async fn repeated_inspection_is_stable() {
    let fx = Fixture::new();
    fx.instance("idle");

    let first = fx.store.inspect("idle").await.unwrap();
    let second = fx.store.inspect("idle").await.unwrap();

    for inst in [&first, &second] {
        assert_eq!(inst.status, Status::Stopped);
        assert!(inst.errors.is_empty());
        assert_eq!(inst.message, "ssh -p 60022 idle\n");
    }
}

#[tokio::test]
async fn unknown_instance_is_an_error() {
    let fx = Fixture::new();
    let err = fx.store.inspect("nope").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));

    let err = fx.store.inspect("../escape").await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidName(_)));
}

#[tokio::test]
async fn listing_reports_every_instance() {
    let fx = Fixture::new();
    fx.instance("alpha");
    let dir = fx.instance("beta");
    write_own_pid(&dir.join(settings::driver_pid_file(VmType::Qemu)));

    let instances = fx.store.inspect_all().await.unwrap();
    let mut out = Vec::new();
    print_instances_with_home(
        &mut out,
        &instances,
        &Format::parse("{{.Name}} {{.Status}}"),
        None,
    )
    .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "alpha Stopped\nbeta Broken\n");
}
