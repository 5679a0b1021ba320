//! Input loop driven on virtual time.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use rsyslog_exporter_core::{Phase, StatsStore, Timeouts};
use rsyslog_exporter_daemon::input::{extract_json, Exit, InputLoop};
use tokio::io::{AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const GLOBAL: &str = r#"{"name":"global","origin":"dynstats","values":{"msg_per_host.ops_overflow":0}}"#;
const ACTION: &str = r#"{"origin":"core.action","name":"action 1","processed":42}"#;

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

struct Harness {
    store: Arc<StatsStore>,
    tx: DuplexStream,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<(rsyslog_exporter_core::Result<Exit>, Phase)>,
}

fn start(export_after: u64, down_after: u64) -> Harness {
    let store = Arc::new(StatsStore::new());
    let timeouts = Timeouts::new(secs(export_after), secs(down_after)).unwrap();
    let (tx, rx) = tokio::io::duplex(64 * 1024);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let mut pump = InputLoop::new(Arc::clone(&store), timeouts);
    let handle = tokio::spawn(async move {
        let exit = pump
            .run(BufReader::new(rx), async {
                let _ = stop_rx.await;
            })
            .await;
        (exit, pump.tracker().phase())
    });

    Harness {
        store,
        tx,
        stop: Some(stop_tx),
        handle,
    }
}

impl Harness {
    async fn send(&mut self, line: &str) {
        self.tx.write_all(line.as_bytes()).await.unwrap();
        self.tx.write_all(b"\n").await.unwrap();
    }

    async fn stop(mut self) -> (Exit, Phase) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let (exit, phase) = self.handle.await.unwrap();
        (exit.unwrap(), phase)
    }
}

#[test]
fn extract_json_finds_outer_braces() {
    assert_eq!(
        extract_json("2024-05-01T10:00:00 host rsyslogd-pstats: {\"a\":{\"b\":1}} trailer\n"),
        "{\"a\":{\"b\":1}}"
    );
    assert_eq!(extract_json("{}"), "{}");
    assert_eq!(extract_json("no json here\r\n"), "no json here");
    assert_eq!(extract_json("} backwards {"), "} backwards {");
}

#[tokio::test(start_paused = true)]
async fn silence_exports_once_then_marks_down() {
    let mut h = start(5, 180);
    h.send(ACTION).await;

    tokio::time::sleep(secs(1)).await;
    assert!(h.store.is_up());
    assert!(!h.store.is_exported());
    assert!(h.store.snapshot().table.is_empty());

    tokio::time::sleep(secs(5)).await;
    let snap = h.store.snapshot();
    assert!(snap.table.contains_key("rsyslog_core_action_processed"));
    assert_eq!(snap.liveness.last_stats_processed, 1);
    let stamp = snap.liveness.export_timestamp;
    assert!(h.store.is_up());

    tokio::time::sleep(secs(100)).await;
    assert_eq!(h.store.snapshot().liveness.export_timestamp, stamp);
    assert!(h.store.is_up());

    tokio::time::sleep(secs(80)).await;
    assert!(!h.store.is_up());

    let (exit, phase) = h.stop().await;
    assert_eq!(exit, Exit::Interrupted);
    assert_eq!(phase, Phase::Down);
}

#[tokio::test(start_paused = true)]
async fn steady_input_postpones_export() {
    let mut h = start(5, 180);
    for _ in 0..4 {
        h.send(ACTION).await;
        tokio::time::sleep(secs(3)).await;
    }
    assert!(!h.store.is_exported());
    assert_eq!(h.store.snapshot().liveness.stats_count, 4);

    tokio::time::sleep(secs(3)).await;
    assert!(h.store.is_exported());
    assert_eq!(h.store.snapshot().liveness.last_stats_processed, 4);
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn next_cycle_global_rotates_without_silence_export() {
    let mut h = start(5, 180);
    h.send(GLOBAL).await;
    h.send(ACTION).await;
    tokio::time::sleep(secs(2)).await;
    assert!(h.store.snapshot().table.is_empty());

    h.send(GLOBAL).await;
    tokio::time::sleep(secs(1)).await;
    let snap = h.store.snapshot();
    assert!(snap.table.contains_key("rsyslog_core_action_processed"));
    assert_eq!(snap.liveness.last_stats_processed, 2);
    assert_eq!(snap.liveness.stats_count, 1);
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn input_after_down_brings_producer_back() {
    let mut h = start(1, 3);
    h.send(ACTION).await;
    h.send("garbage").await;
    tokio::time::sleep(secs(4)).await;
    assert!(!h.store.is_up());

    h.send(ACTION).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(h.store.is_up());
    assert_eq!(h.store.parser_failures(), 1);

    tokio::time::sleep(secs(2)).await;
    assert!(h.store.is_exported());
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn prefixed_and_blank_lines() {
    let mut h = start(5, 180);
    h.send(&format!("Jan  1 00:00:00 host rsyslogd-pstats: {ACTION}")).await;
    h.send("").await;
    tokio::time::sleep(secs(1)).await;

    assert_eq!(h.store.snapshot().liveness.stats_count, 1);
    assert_eq!(h.store.parser_failures(), 1);
    assert_eq!(
        h.store
            .current()
            .get("rsyslog_core_action_processed")
            .and_then(|m| m.get("action 1"))
            .copied(),
        Some(42.0)
    );
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn eof_ends_loop_and_keeps_trailing_line() {
    let Harness {
        store,
        mut tx,
        stop: _stop,
        handle,
    } = start(5, 180);

    tx.write_all(ACTION.as_bytes()).await.unwrap();
    drop(tx);

    let (exit, phase) = handle.await.unwrap();
    assert_eq!(exit.unwrap(), Exit::Eof);
    assert_eq!(phase, Phase::Active);
    assert_eq!(store.snapshot().liveness.stats_count, 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_idle_wait() {
    let h = start(5, 180);
    tokio::time::sleep(secs(1)).await;
    let (exit, phase) = h.stop().await;
    assert_eq!(exit, Exit::Interrupted);
    assert_eq!(phase, Phase::Down);
}
