#![cfg(feature = "cli")]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::Duration;

fn stompsync() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_stompsync"));
    cmd.arg("--log-level").arg("error");
    cmd
}

fn run_with_stdin(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = stompsync()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("stompsync should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(stdin)
        .expect("stdin should accept the capture");
    child.wait_with_output().expect("stompsync should exit")
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect()
}

const CAPTURE: &[u8] = b"CONNECTED\nversion:1.2\nsession:s-9\nheart-beat:0,0\n\n\0\n\n\
    RECEIPT\nreceipt-id:sync-subscribed\n\n\0\
    MESSAGE\ndestination:/topic/sync\ncontent-length:8\n\naGVsbG8=\0";

#[test]
fn decode_prints_frames_as_json() {
    let output = run_with_stdin(&["--format", "json", "decode", "--chunk-size", "1"], CAPTURE);
    assert_eq!(output.status.code(), Some(0), "{output:?}");

    let frames = json_lines(&output);
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0]["command"], "CONNECTED");
    assert_eq!(frames[0]["headers"][1]["value"], "s-9");
    assert_eq!(frames[1]["command"], "RECEIPT");
    assert_eq!(frames[2]["command"], "MESSAGE");
    assert_eq!(frames[2]["body_size"], 8);
    assert_eq!(frames[2]["body"]["data"], "aGVsbG8=");
}

#[test]
fn decode_reads_a_capture_file() {
    let path = std::env::temp_dir().join(format!("stompsync-capture-{}.bin", std::process::id()));
    std::fs::write(&path, CAPTURE).expect("capture should be writable");

    let output = stompsync()
        .args(["--format", "raw", "decode"])
        .arg(&path)
        .output()
        .expect("stompsync should run");
    let _ = std::fs::remove_file(&path);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert_eq!(output.stdout, b"aGVsbG8=\n");
}

#[test]
fn decode_framing_fault_exits_data_invalid() {
    let output = run_with_stdin(
        &["--format", "json", "decode"],
        b"MESSAGE\ncontent-length:3\n\nabcd\0",
    );
    assert_eq!(output.status.code(), Some(60), "{output:?}");
    assert!(String::from_utf8_lossy(&output.stderr).contains("decode failed"));
}

#[test]
fn version_prints_package_version() {
    let output = stompsync()
        .arg("version")
        .output()
        .expect("stompsync should run");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("stompsync {}", env!("CARGO_PKG_VERSION"))
    );
}

fn read_frame(stream: &mut TcpStream) -> String {
    let mut frame = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        stream
            .read_exact(&mut byte)
            .expect("broker should receive a full frame");
        match byte[0] {
            0 => break,
            b'\n' if frame.is_empty() => continue,
            b => frame.push(b),
        }
    }
    String::from_utf8(frame).expect("client frames should be UTF-8")
}

/// Accept one client, complete the handshake, then send `messages`.
fn fake_broker(messages: &'static [u8], hold_open: bool) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
    let addr = listener
        .local_addr()
        .expect("listener should have an address")
        .to_string();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("broker should accept");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("read timeout should be settable");

        let connect = read_frame(&mut stream);
        stream
            .write_all(b"CONNECTED\nversion:1.2\nsession:cli-1\nheart-beat:0,0\n\n\0")
            .expect("broker should send CONNECTED");
        let subscribe = read_frame(&mut stream);
        stream
            .write_all(b"RECEIPT\nreceipt-id:sync-subscribed\n\n\0")
            .expect("broker should send RECEIPT");
        stream
            .write_all(messages)
            .expect("broker should send messages");

        if hold_open {
            let mut rest = Vec::new();
            let _ = stream.read_to_end(&mut rest);
        }
        format!("{connect}\n{subscribe}")
    });
    (addr, handle)
}

#[test]
fn watch_exits_zero_after_count() {
    let (addr, broker) = fake_broker(
        b"MESSAGE\n\ndXNlcnMvNDI=\0MESSAGE\n\nb3JnLzc=\0MESSAGE\n\neHg=\0",
        true,
    );

    let output = stompsync()
        .args(["--format", "json", "watch", &addr, "--count", "2"])
        .env("STOMPSYNC_LOGIN", "cli-user")
        .env("STOMPSYNC_VHOST", "cli-vhost")
        .env("STOMPSYNC_CHANNEL", "/topic/cli")
        .output()
        .expect("stompsync should run");
    assert_eq!(output.status.code(), Some(0), "{output:?}");

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["payload"]["data"], "users/42");
    assert_eq!(lines[1]["payload"]["data"], "org/7");
    assert_eq!(lines[1]["channel"], "/topic/cli");

    let seen = broker.join().expect("broker thread should complete");
    assert!(seen.contains("login:cli-user\n"));
    assert!(seen.contains("host:cli-vhost\n"));
    assert!(seen.contains("destination:/topic/cli\n"));
}

#[test]
fn watch_exits_failure_when_broker_hangs_up() {
    let (addr, broker) = fake_broker(b"MESSAGE\n\neHg=\0", false);

    let output = stompsync()
        .args(["--format", "json", "watch", &addr])
        .args(["--login", "u", "--vhost", "v", "--channel", "/topic/c"])
        .output()
        .expect("stompsync should run");
    assert_eq!(output.status.code(), Some(1), "{output:?}");
    assert_eq!(json_lines(&output).len(), 1);
    broker.join().expect("broker thread should complete");
}

#[test]
fn watch_rejects_bad_duration() {
    let output = stompsync()
        .args(["watch", "127.0.0.1:1", "--login", "u", "--vhost", "v"])
        .args(["--channel", "c", "--grace", "soon"])
        .output()
        .expect("stompsync should run");
    assert_eq!(output.status.code(), Some(64), "{output:?}");
}
