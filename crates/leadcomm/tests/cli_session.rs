#![cfg(feature = "cli")]

use std::io::{Read, Write};
use std::net::{Ipv4Addr, TcpListener};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use leadcomm::frame::FrameConfig;
use leadcomm::service::Connection;

fn free_port() -> u16 {
    TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .expect("ephemeral bind should work")
        .local_addr()
        .expect("bound listener has an address")
        .port()
}

fn wait_for_connect(port: u16, timeout: Duration) -> Connection {
    let start = Instant::now();
    loop {
        if let Ok(connection) = Connection::connect((Ipv4Addr::LOCALHOST, port), FrameConfig::default()) {
            return connection;
        }
        if start.elapsed() >= timeout {
            panic!("connect timeout");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn wait_for_exit(child: &mut Child, timeout: Duration) -> std::process::ExitStatus {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().expect("child should be waitable") {
            return status;
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            panic!("child did not exit in time");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn leadcomm() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_leadcomm"));
    command.arg("--log-level").arg("error");
    command
}

#[test]
fn serve_prints_messages_and_exits_after_count() {
    let port = free_port();
    let mut child = leadcomm()
        .arg("--format")
        .arg("json")
        .arg("serve")
        .arg(port.to_string())
        .arg("--host")
        .arg("127.0.0.1")
        .arg("--name")
        .arg("cli-test")
        .arg("--count")
        .arg("2")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("serve command should start");

    let client = wait_for_connect(port, Duration::from_secs(5));
    client.send(b"PING").expect("send PING");
    client.send(b"PONG").expect("send PONG");
    client.disconnect().expect("disconnect");

    let status = wait_for_exit(&mut child, Duration::from_secs(5));
    assert!(status.success());

    let mut stdout = String::new();
    child
        .stdout
        .take()
        .expect("stdout is piped")
        .read_to_string(&mut stdout)
        .expect("stdout should be readable");
    let records: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is a JSON record"))
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["payload"], "PING");
    assert_eq!(records[1]["payload"], "PONG");
    assert_eq!(records[0]["source"], "cli-test");
}

#[test]
fn send_writes_frames_then_disconnect_sentinel() {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind");
    let addr = listener.local_addr().expect("addr");

    let mut child = leadcomm()
        .arg("send")
        .arg(addr.to_string())
        .arg("--data")
        .arg("a")
        .arg("--data")
        .arg("b")
        .stdout(Stdio::null())
        .spawn()
        .expect("send command should start");

    let (mut stream, _) = listener.accept().expect("accept");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("timeout");
    let mut wire = Vec::new();
    stream.read_to_end(&mut wire).expect("read until peer closes");
    assert_eq!(wire, b"a;b;disconnect;");

    assert!(wait_for_exit(&mut child, Duration::from_secs(5)).success());
}

#[test]
fn send_wait_prints_the_reply() {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind");
    let addr = listener.local_addr().expect("addr");

    let child = leadcomm()
        .arg("--format")
        .arg("pretty")
        .arg("send")
        .arg(addr.to_string())
        .arg("--data")
        .arg("PING")
        .arg("--wait")
        .arg("--wait-timeout")
        .arg("3s")
        .stdout(Stdio::piped())
        .spawn()
        .expect("send command should start");

    let (mut stream, _) = listener.accept().expect("accept");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("timeout");
    let mut request = [0u8; 5];
    stream.read_exact(&mut request).expect("request frame");
    assert_eq!(&request, b"PING;");
    stream.write_all(b"PONG;").expect("reply");

    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).expect("read until peer closes");
    assert_eq!(rest, b"disconnect;");

    let output = child.wait_with_output().expect("send should finish");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("payload=PONG"), "stdout: {stdout}");
}

#[test]
fn send_wait_times_out_with_124() {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind");
    let addr = listener.local_addr().expect("addr");

    let child = leadcomm()
        .arg("send")
        .arg(addr.to_string())
        .arg("--data")
        .arg("PING")
        .arg("--wait")
        .arg("--wait-timeout")
        .arg("200ms")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("send command should start");

    let (_stream, _) = listener.accept().expect("accept");
    let output = child.wait_with_output().expect("send should finish");
    assert_eq!(output.status.code(), Some(124));
}

#[test]
fn send_to_closed_port_fails() {
    let port = free_port();
    let output = leadcomm()
        .arg("send")
        .arg(format!("127.0.0.1:{port}"))
        .arg("--data")
        .arg("x")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("connect failed"), "stderr: {stderr}");
}

#[test]
fn send_rejects_delimiter_in_data() {
    let output = leadcomm()
        .arg("send")
        .arg("127.0.0.1:1")
        .arg("--data")
        .arg("a;b")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn version_reports_package_version() {
    let output = leadcomm()
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("leadcomm {}", env!("CARGO_PKG_VERSION")));
}
