//! Wiring for the sync service: one reconciler task keeping the store fresh
//! and one publisher task copying each new snapshot to the sheet as soon as
//! it is swapped in.

use super::config::Settings;
use anyhow::{Context, Result};
use lib_bugsheet::bugs::{AggregateStore, BugTracker, IntervalTicker, Reconciler, Ticker};
use lib_bugsheet::configs::read_api_key;
use lib_bugsheet::sheets::{Publisher, SheetDestination, SmartsheetClient};
use lib_bugsheet::{TeamDirectory, Tracker};
use std::future::Future;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub async fn run(settings: Settings) -> Result<()> {
    let directory = Arc::new(
        TeamDirectory::load(&settings.team_data).context("Failed to load team directory")?,
    );

    let tracker = Tracker::select(
        settings.test_bug_data.as_deref(),
        &settings.bugzilla_endpoint,
        &settings.bugzilla_key,
    )
    .context("Failed to set up bug tracker")?;

    let token = read_api_key(&settings.smartsheet_key).context("Failed to read Smartsheet key")?;
    let destination = SmartsheetClient::new(&settings.smartsheet_endpoint, token)?;
    let publisher = Publisher::new(destination, settings.sheet_id.clone(), settings.targets.clone());

    run_with(tracker, publisher, directory, &settings, shutdown_signal()).await
}

/// Runs the service until `shutdown` resolves or reconciliation fails.
///
/// The initial reconciliation must succeed. With `settings.once` the first
/// snapshot is published and the function returns.
pub async fn run_with<T, D, S>(
    tracker: T,
    publisher: Publisher<D>,
    directory: Arc<TeamDirectory>,
    settings: &Settings,
    shutdown: S,
) -> Result<()>
where
    T: BugTracker + 'static,
    D: SheetDestination + 'static,
    S: Future<Output = ()>,
{
    let reconciler = Reconciler::bootstrap(tracker, settings.query.clone(), directory)
        .await
        .context("Initial bug reconciliation failed")?;
    let store = reconciler.store();

    if settings.once {
        publisher
            .publish(&store)
            .await
            .context("Failed to publish bug counts")?;
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let (err_tx, mut err_rx) = mpsc::unbounded_channel();

    let reconcile_handle = reconciler.spawn(IntervalTicker::new(settings.interval), cancel.clone(), err_tx);
    let publish_handle = tokio::spawn(publish_loop(
        publisher,
        Arc::clone(&store),
        IntervalTicker::new(settings.interval),
        cancel.clone(),
    ));

    let outcome = tokio::select! {
        _ = shutdown => Ok(()),
        Some(err) = err_rx.recv() => Err(err),
    };

    // Stop both loops and wait for them to finish
    cancel.cancel();
    let (reconciled, published) = tokio::join!(reconcile_handle, publish_handle);
    if let Err(e) = reconciled {
        log::error!("Reconciler task failed: {}", e);
    }
    if let Err(e) = published {
        log::error!("Publisher task failed: {}", e);
    }

    outcome.context("Bug reconciliation halted")
}

/// Publishes the current snapshot now and again after every swap, skipping
/// generations that were already published. `retry` re-attempts a failed
/// publish without waiting for the next swap.
pub async fn publish_loop<D, K>(
    publisher: Publisher<D>,
    store: Arc<AggregateStore>,
    mut retry: K,
    cancel: CancellationToken,
) where
    D: SheetDestination,
    K: Ticker,
{
    let mut generations = store.subscribe();
    let mut published: Option<u64> = None;

    loop {
        let snapshot = store.read();
        if published == Some(snapshot.generation()) {
            log::debug!("Generation {} already published", snapshot.generation());
        } else {
            match publisher.publish_snapshot(&snapshot).await {
                Ok(summary) => published = Some(summary.generation),
                Err(e) => log::error!("Failed to publish generation {}: {}", snapshot.generation(), e),
            }
        }
        drop(snapshot);

        let woke = tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            changed = generations.changed() => changed.is_ok(),
            alive = retry.tick() => alive,
        };
        if !woke {
            log::info!("Publisher stopped");
            return;
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => log::info!("Ctrl-C received, initiating shutdown."),
            Err(e) => {
                log::warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    let terminate = async {
        #[cfg(unix)]
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term_signal) => {
                term_signal.recv().await;
                log::info!("SIGTERM received, initiating shutdown.");
            }
            Err(e) => {
                log::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
        #[cfg(not(unix))]
        std::future::pending::<()>().await;
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_bugsheet::bugs::{Bug, BugMap, BugQuery, ChannelTicker, Snapshot};
    use lib_bugsheet::sheets::{Cell, Column, Row, Sheet, SheetError};
    use lib_bugsheet::teams::{OrgData, TeamInfo};
    use lib_bugsheet::FixtureTracker;
    use serde_json::json;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::oneshot;

    const ALL_COLUMN: u64 = 2;

    /// Serves a one-row sheet, recording and signalling every update.
    struct RecordingSheet {
        updates: Arc<Mutex<Vec<Vec<Row>>>>,
        sent: mpsc::UnboundedSender<()>,
    }

    impl SheetDestination for RecordingSheet {
        async fn fetch_sheet(&self, _sheet_id: &str) -> Result<Sheet, SheetError> {
            Ok(Sheet {
                id: 1,
                name: "Bugs".to_string(),
                columns: vec![
                    Column { id: 1, title: "Team Name".to_string() },
                    Column { id: ALL_COLUMN, title: "Bug Count (All)".to_string() },
                    Column { id: 3, title: "Bug Count (Current Release)".to_string() },
                ],
                rows: vec![Row {
                    id: 50,
                    cells: vec![Cell { column_id: 1, value: Some(json!("Etcd")) }],
                }],
            })
        }

        async fn update_rows(&self, _sheet_id: &str, rows: &[Row]) -> Result<(), SheetError> {
            self.updates.lock().unwrap().push(rows.to_vec());
            let _ = self.sent.send(());
            Ok(())
        }
    }

    type Updates = Arc<Mutex<Vec<Vec<Row>>>>;

    fn recording_publisher() -> (Publisher<RecordingSheet>, Updates, mpsc::UnboundedReceiver<()>) {
        let (sent, sent_rx) = mpsc::unbounded_channel();
        let updates = Arc::new(Mutex::new(vec![]));
        let sheet = RecordingSheet { updates: Arc::clone(&updates), sent };
        (Publisher::new(sheet, "1", vec!["4.5.0".to_string()]), updates, sent_rx)
    }

    /// The "Bug Count (All)" value of the `n`th update.
    fn all_count(updates: &Updates, n: usize) -> u64 {
        let updates = updates.lock().unwrap();
        let cell = updates[n][0].cells.iter().find(|c| c.column_id == ALL_COLUMN).unwrap();
        cell.value.as_ref().and_then(|v| v.as_u64()).unwrap()
    }

    fn directory() -> Arc<TeamDirectory> {
        Arc::new(
            TeamDirectory::new(OrgData {
                teams: vec![TeamInfo {
                    name: "Etcd".to_string(),
                    components: vec!["Etcd".to_string()],
                    ..Default::default()
                }],
                ..Default::default()
            })
            .unwrap(),
        )
    }

    fn snapshot(generation: u64, bugs: usize) -> Snapshot {
        let bugs: Vec<Arc<Bug>> = (0..bugs as u64)
            .map(|id| Arc::new(Bug { id, component: vec!["Etcd".to_string()], ..Default::default() }))
            .collect();
        let map: BugMap = lib_bugsheet::classify(&bugs, &directory());
        Snapshot::new(generation, bugs, map)
    }

    fn write_fixture(path: &Path, bugs: u64) {
        let bugs: Vec<_> = (0..bugs)
            .map(|id| json!({"id": id, "severity": "high", "component": ["Etcd"], "target_release": ["4.5.0"]}))
            .collect();
        fs::write(path, json!({ "bugs": bugs }).to_string()).unwrap();
    }

    fn settings(fixture: &Path, once: bool) -> Settings {
        Settings {
            team_data: PathBuf::from("teams.json"),
            bugzilla_endpoint: "https://bugzilla.example.com/".to_string(),
            bugzilla_key: PathBuf::from("bugzillaKey"),
            test_bug_data: Some(fixture.to_path_buf()),
            smartsheet_endpoint: "https://sheets.example.com/".to_string(),
            smartsheet_key: PathBuf::from("smartsheetKey"),
            sheet_id: "1".to_string(),
            interval: Duration::from_millis(50),
            targets: vec!["4.5.0".to_string()],
            log_dir: PathBuf::from("logs"),
            log_level: "info".to_string(),
            once,
            query: BugQuery::all_open_bugs(),
            config_file: None,
        }
    }

    #[tokio::test]
    async fn test_publish_loop_skips_already_published_generations() {
        let (publisher, updates, mut sent_rx) = recording_publisher();
        let store = Arc::new(AggregateStore::new(snapshot(1, 2)));
        let (tick_tx, ticker) = ChannelTicker::new(4);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(publish_loop(publisher, Arc::clone(&store), ticker, cancel.clone()));

        // Initial publish happens without a tick.
        sent_rx.recv().await.unwrap();

        // Unchanged generation: a retry tick sends nothing.
        tick_tx.send(()).await.unwrap();
        store.swap(snapshot(2, 5));
        tokio::time::timeout(Duration::from_secs(5), sent_rx.recv())
            .await
            .unwrap()
            .unwrap();
        tick_tx.send(()).await.unwrap();

        drop(tick_tx);
        handle.await.unwrap();
        assert!(sent_rx.try_recv().is_err());
        assert_eq!(updates.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_publish_loop_publishes_swaps_without_waiting_for_a_tick() {
        let (publisher, updates, mut sent_rx) = recording_publisher();
        let store = Arc::new(AggregateStore::new(snapshot(1, 1)));
        // The retry ticker never fires.
        let (_tick_tx, ticker) = ChannelTicker::new(1);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(publish_loop(publisher, Arc::clone(&store), ticker, cancel.clone()));
        sent_rx.recv().await.unwrap();
        assert_eq!(all_count(&updates, 0), 1);

        for generation in 2..=4u64 {
            store.swap(snapshot(generation, generation as usize));
            tokio::time::timeout(Duration::from_secs(5), sent_rx.recv())
                .await
                .expect("swap was not published promptly")
                .unwrap();
            assert_eq!(all_count(&updates, generation as usize - 1), generation);
        }

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_once_publishes_a_single_time() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = dir.path().join("bugs.json");
        write_fixture(&fixture, 3);
        let (publisher, updates, _sent_rx) = recording_publisher();

        run_with(
            FixtureTracker::new(&fixture),
            publisher,
            directory(),
            &settings(&fixture, true),
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(updates.lock().unwrap().len(), 1);
        assert_eq!(all_count(&updates, 0), 3);
    }

    #[tokio::test]
    async fn test_run_fails_when_initial_reconcile_fails() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = dir.path().join("missing.json");
        let (publisher, updates, _sent_rx) = recording_publisher();

        let err = run_with(
            FixtureTracker::new(&fixture),
            publisher,
            directory(),
            &settings(&fixture, false),
            std::future::pending(),
        )
        .await
        .unwrap_err();

        assert!(format!("{:#}", err).contains("Initial bug reconciliation failed"));
        assert!(updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_returns_error_when_reconciliation_breaks() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = dir.path().join("bugs.json");
        write_fixture(&fixture, 2);
        let (publisher, _updates, mut sent_rx) = recording_publisher();

        let run_settings = settings(&fixture, false);
        let tracker = FixtureTracker::new(&fixture);
        let handle = tokio::spawn(async move {
            run_with(tracker, publisher, directory(), &run_settings, std::future::pending()).await
        });

        // The first publish means startup succeeded.
        sent_rx.recv().await.unwrap();
        fs::write(&fixture, "{ broken").unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("run did not stop after a reconcile error")
            .unwrap();
        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("Bug reconciliation halted"));
    }

    #[tokio::test]
    async fn test_run_stops_cleanly_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = dir.path().join("bugs.json");
        write_fixture(&fixture, 1);
        let (publisher, _updates, mut sent_rx) = recording_publisher();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let run_settings = settings(&fixture, false);
        let tracker = FixtureTracker::new(&fixture);
        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = stop_rx.await;
            };
            run_with(tracker, publisher, directory(), &run_settings, shutdown).await
        });

        sent_rx.recv().await.unwrap();
        stop_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
