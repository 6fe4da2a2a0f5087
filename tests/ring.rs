//! End-to-end runs of the ring binary.
//!
//! Each test starts a real ring (one coordinator process plus forked nodes),
//! talks to the coordinator over stdin and watches stdout/stderr, which every
//! node shares.

use nix::{
    sys::signal::{kill, Signal},
    unistd::Pid,
};
use std::{
    io::{BufRead, BufReader, Read, Write},
    process::{Child, ChildStdin, Command, ExitStatus, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

const PATIENCE: Duration = Duration::from_secs(10);

struct Ring {
    coordinator: Child,
    stdin: Option<ChildStdin>,
    stdout: Receiver<String>,
    stderr: Receiver<String>,
}

fn lines(stream: impl Read + Send + 'static) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

impl Ring {
    fn start(nodes: u32) -> Self {
        let mut coordinator = Command::new(env!("CARGO_BIN_EXE_token-ring"))
            .args(["--nodes", &nodes.to_string()])
            .args(["--hop-delay-ms", "5", "--poll-interval-ms", "1"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to start the ring");

        let stdin = coordinator.stdin.take();
        let stdout = lines(coordinator.stdout.take().unwrap());
        let stderr = lines(coordinator.stderr.take().unwrap());
        Self {
            coordinator,
            stdin,
            stdout,
            stderr,
        }
    }

    fn type_in(&mut self, text: &str) {
        let stdin = self.stdin.as_mut().unwrap();
        stdin.write_all(text.as_bytes()).unwrap();
        stdin.flush().unwrap();
    }

    /// Waits for a line of `stream` matching every fragment.
    fn expect(stream: &Receiver<String>, fragments: &[&str]) -> String {
        let deadline = Instant::now() + PATIENCE;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match stream.recv_timeout(left) {
                Ok(line) if fragments.iter().all(|f| line.contains(f)) => return line,
                Ok(_) => continue,
                Err(e) => panic!("no line with {fragments:?}: {e:?}"),
            }
        }
    }

    fn wait(&mut self) -> ExitStatus {
        let deadline = Instant::now() + PATIENCE;
        loop {
            if let Some(status) = self.coordinator.try_wait().unwrap() {
                return status;
            }
            assert!(Instant::now() < deadline, "the coordinator did not stop");
            thread::sleep(Duration::from_millis(20));
        }
    }

    /// Waits until no process of the ring holds stdout any more.
    fn wait_for_every_node(&self) {
        let deadline = Instant::now() + PATIENCE;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.stdout.recv_timeout(left) {
                Ok(_) => continue,
                Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => panic!("some nodes are still running"),
            }
        }
    }
}

impl Drop for Ring {
    fn drop(&mut self) {
        let _ = self.coordinator.kill();
        let _ = self.coordinator.wait();
    }
}

fn spawned_pid(line: &str) -> Pid {
    let pid = line
        .split("as pid ")
        .nth(1)
        .and_then(|rest| rest.trim_end_matches('.').parse().ok())
        .unwrap_or_else(|| panic!("no pid in {line:?}"));
    Pid::from_raw(pid)
}

#[test]
fn message_is_delivered_once_and_comes_back() {
    let mut ring = Ring::start(3);
    ring.type_in("2\nhi\n");

    let delivery = Ring::expect(&ring.stdout, &["received \"hi\""]);
    assert!(delivery.contains("node 2"), "{delivery:?}");
    Ring::expect(&ring.stdout, &["reply from ring:", "\"hi\""]);

    ring.type_in("1\nagain\n");
    let delivery = Ring::expect(&ring.stdout, &["received \"again\""]);
    assert!(delivery.contains("node 1"), "{delivery:?}");
    Ring::expect(&ring.stdout, &["reply from ring:", "\"again\""]);
}

#[test]
fn out_of_range_destinations_are_asked_again() {
    let mut ring = Ring::start(2);
    ring.type_in("5\n1\nonly\n");

    Ring::expect(&ring.stdout, &["node 5 is not in 1..=1, try again."]);
    Ring::expect(&ring.stdout, &["received \"only\""]);
}

#[test]
fn ring_keeps_circulating_after_input_ends() {
    let mut ring = Ring::start(3);
    ring.stdin = None;

    thread::sleep(Duration::from_millis(300));
    assert!(ring.coordinator.try_wait().unwrap().is_none());
}

#[test]
fn stopping_the_coordinator_stops_every_node() {
    let mut ring = Ring::start(4);
    Ring::expect(&ring.stderr, &["nodes is up"]);

    ring.coordinator.kill().unwrap();
    ring.wait();
    ring.wait_for_every_node();
}

#[test]
fn losing_a_node_fails_the_coordinator() {
    let mut ring = Ring::start(4);
    let node_1 = spawned_pid(&Ring::expect(&ring.stderr, &["Spawned node 1 as pid"]));
    Ring::expect(&ring.stderr, &["nodes is up"]);

    kill(node_1, Signal::SIGKILL).unwrap();

    let status = ring.wait();
    assert!(!status.success());
    Ring::expect(&ring.stderr, &["peer closed the channel"]);
    ring.wait_for_every_node();
}

#[test]
fn interrupt_stops_the_coordinator_cleanly() {
    let mut ring = Ring::start(3);
    Ring::expect(&ring.stderr, &["nodes is up"]);
    thread::sleep(Duration::from_millis(200));

    kill(Pid::from_raw(ring.coordinator.id() as i32), Signal::SIGINT).unwrap();
    assert!(ring.wait().success());
    ring.wait_for_every_node();
}

#[test]
fn single_node_ring_is_rejected() {
    let output = Command::new(env!("CARGO_BIN_EXE_token-ring"))
        .args(["--nodes", "1"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(!output.status.success());
}
