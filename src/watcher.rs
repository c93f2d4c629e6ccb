use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::Settings;
use crate::core::events::Event;
use crate::core::ranking::{PageCursor, RankedUser, RankingSource};
use crate::error::FetchError;
use crate::messaging::sink::NotificationSink;
use crate::storage::MemoryCache;

#[derive(Debug, Clone, Copy)]
pub struct WatcherConfig {
    pub total_pages: u32,
    pub retry_delay: Duration,
}

impl WatcherConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            total_pages: settings.total_pages(),
            retry_delay: settings.fetch_retry_delay(),
        }
    }
}

#[derive(Debug)]
enum State {
    Fetching,
    Processing(Vec<RankedUser>),
    Advancing,
    BackingOff(FetchError),
}

/// Walks the ranking page after page, forever, reporting notable pp changes.
///
/// The watcher is the only owner of the page cursor, the cycle flag and the cache. A failed
/// fetch is retried on the same page after a fixed delay, with no retry ceiling.
pub struct Watcher<S, N> {
    source: S,
    sink: N,
    cache: MemoryCache,
    cursor: PageCursor,
    // Set once the cursor wrapped for the first time, comparisons are meaningful from then on.
    cycled_once: bool,
    retry_delay: Duration,
}

impl<S: RankingSource, N: NotificationSink> Watcher<S, N> {
    pub fn new(source: S, sink: N, cache: MemoryCache, config: WatcherConfig) -> Self {
        Self {
            source,
            sink,
            cache,
            cursor: PageCursor::new(config.total_pages),
            cycled_once: false,
            retry_delay: config.retry_delay,
        }
    }

    pub fn page(&self) -> u32 {
        self.cursor.page()
    }

    pub fn has_cycled(&self) -> bool {
        self.cycled_once
    }

    pub fn cache(&self) -> &MemoryCache {
        &self.cache
    }

    /// Runs until `cancel` is triggered. Cancellation is looked at before every fetch and
    /// before every backoff delay, an in-flight request is never aborted.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(
            "Watching {} ranking pages (pp change threshold: {}).",
            self.cursor.total_pages(),
            self.cache.threshold()
        );

        let mut state = State::Fetching;
        loop {
            state = match state {
                State::Fetching => {
                    if cancel.is_cancelled() {
                        break;
                    }
                    match self.source.fetch_page(self.cursor.page()).await {
                        Ok(users) => State::Processing(users),
                        Err(e) => State::BackingOff(e),
                    }
                }
                State::BackingOff(e) => {
                    error!(
                        "Failed to get ranking page {}: {e}. Retrying in {}s.",
                        self.cursor.page(),
                        self.retry_delay.as_secs()
                    );
                    if cancel.is_cancelled() {
                        break;
                    }
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = time::sleep(self.retry_delay) => State::Fetching,
                    }
                }
                State::Processing(users) => {
                    self.process(users).await;
                    State::Advancing
                }
                State::Advancing => {
                    self.advance().await;
                    State::Fetching
                }
            };
        }

        info!("Watcher stopped on ranking page {}.", self.cursor.page());
    }

    async fn process(&mut self, users: Vec<RankedUser>) {
        debug!("Processing {} players of page {}.", users.len(), self.cursor.page());
        for user in users {
            let Some(change) = self.cache.observe(user) else {
                continue;
            };
            debug!(
                "{} changed by {:+.2}pp (#{} -> #{}).",
                change.current.name, change.pp_delta, change.previous.rank, change.current.rank
            );
            // Awaited before the next player, so events keep the ranking order.
            if let Err(e) = self.sink.notify(Event::PerformanceChanged(change)).await {
                error!("Could not deliver pp change. {e}");
            }
        }
    }

    async fn advance(&mut self) {
        let wrapped = self.cursor.advance();
        if wrapped && !self.cycled_once {
            self.cycled_once = true;
            let users = self.cache.len();
            info!("Initial cache population performed ({users} players cached).");
            if let Err(e) = self.sink.notify(Event::CacheWarmed { users }).await {
                error!("Could not deliver cache warm-up signal. {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BotError, BotResult};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    type Script = VecDeque<Result<Vec<RankedUser>, FetchError>>;

    /// Plays back a fixed list of fetch results, then cancels the watcher.
    struct ScriptedSource {
        script: Mutex<Script>,
        calls: Arc<Mutex<Vec<(u32, Instant)>>>,
        cancel: CancellationToken,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Vec<RankedUser>, FetchError>>, cancel: CancellationToken) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Arc::new(Mutex::new(Vec::new())),
                cancel,
            }
        }
    }

    #[async_trait]
    impl RankingSource for ScriptedSource {
        async fn fetch_page(&self, page: u32) -> Result<Vec<RankedUser>, FetchError> {
            self.calls.lock().unwrap().push((page, Instant::now()));
            match self.script.lock().unwrap().pop_front() {
                Some(result) => result,
                None => {
                    self.cancel.cancel();
                    Err(FetchError::Transport("script exhausted".to_string()))
                }
            }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        events: Arc<Mutex<Vec<Event>>>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn notify(&self, event: Event) -> BotResult<()> {
            self.events.lock().unwrap().push(event);
            match self.fail {
                true => Err(BotError::ChannelSend("receiver gone".to_string())),
                false => Ok(()),
            }
        }
    }

    fn user(id: u64, pp: f64) -> RankedUser {
        RankedUser {
            id,
            name: format!("player{id}"),
            avatar_url: String::new(),
            is_online: false,
            pp,
            rank: id as u32,
        }
    }

    fn transport_error() -> Result<Vec<RankedUser>, FetchError> {
        Err(FetchError::Transport("connection reset".to_string()))
    }

    fn config(total_pages: u32) -> WatcherConfig {
        WatcherConfig {
            total_pages,
            retry_delay: Duration::from_secs(10),
        }
    }

    fn pp_changes(events: &[Event]) -> Vec<f64> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::PerformanceChanged(change) => Some(change.pp_delta),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn failing_page_is_retried_after_the_delay_until_it_succeeds() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![
                transport_error(),
                transport_error(),
                transport_error(),
                Ok(vec![user(1, 1000.0), user(2, 900.0)]),
            ],
            cancel.clone(),
        );
        let calls = source.calls.clone();
        let sink = RecordingSink::default();
        let mut watcher = Watcher::new(source, sink.clone(), MemoryCache::default(), config(3));

        watcher.run(cancel).await;

        let calls = calls.lock().unwrap().clone();
        let pages: Vec<u32> = calls.iter().map(|(page, _)| *page).collect();
        // Four attempts on page 1, then the move to page 2 (where the script runs out).
        assert_eq!(pages, vec![1, 1, 1, 1, 2]);
        for pair in calls[..4].windows(2) {
            let waited = pair[1].1 - pair[0].1;
            assert!(waited >= Duration::from_secs(10) && waited < Duration::from_millis(10_001));
        }
        assert_eq!(calls[4].1, calls[3].1);
        assert_eq!(watcher.cache().len(), 2);
        assert_eq!(watcher.page(), 2);
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failures_leave_cursor_and_cache_untouched() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(vec![transport_error(), transport_error()], cancel.clone());
        let calls = source.calls.clone();
        let mut watcher = Watcher::new(
            source,
            RecordingSink::default(),
            MemoryCache::default(),
            config(200),
        );

        watcher.run(cancel).await;

        let pages: Vec<u32> = calls.lock().unwrap().iter().map(|(page, _)| *page).collect();
        assert_eq!(pages, vec![1, 1, 1]);
        assert_eq!(watcher.page(), 1);
        assert!(watcher.cache().is_empty());
        assert!(!watcher.has_cycled());
    }

    #[tokio::test(start_paused = true)]
    async fn pages_cycle_and_the_cache_warms_exactly_once() {
        let cancel = CancellationToken::new();
        let first_cycle = vec![
            Ok(vec![user(1, 300.0)]),
            Ok(vec![user(2, 200.0)]),
            Ok(vec![user(3, 100.0)]),
        ];
        let second_cycle = vec![
            Ok(vec![user(1, 305.0)]),
            Ok(vec![user(2, 200.5)]),
            Ok(vec![user(3, 98.0)]),
        ];
        let third_cycle = vec![Ok(vec![user(1, 305.0)])];
        let script = first_cycle.into_iter().chain(second_cycle).chain(third_cycle).collect();
        let source = ScriptedSource::new(script, cancel.clone());
        let calls = source.calls.clone();
        let sink = RecordingSink::default();
        let mut watcher = Watcher::new(source, sink.clone(), MemoryCache::default(), config(3));

        watcher.run(cancel).await;

        let pages: Vec<u32> = calls.lock().unwrap().iter().map(|(page, _)| *page).collect();
        assert_eq!(pages, vec![1, 2, 3, 1, 2, 3, 1, 2]);
        assert!(watcher.has_cycled());

        let events = sink.events.lock().unwrap().clone();
        assert_eq!(events[0], Event::CacheWarmed { users: 3 });
        assert_eq!(
            events.iter().filter(|e| matches!(e, Event::CacheWarmed { .. })).count(),
            1
        );
        assert_eq!(pp_changes(&events), vec![5.0, -2.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn small_drifts_accumulate_against_the_latest_sighting() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![
                Ok(vec![user(5, 100.0)]),
                Ok(vec![user(5, 100.4)]),
                Ok(vec![user(5, 102.0)]),
            ],
            cancel.clone(),
        );
        let sink = RecordingSink::default();
        let mut watcher = Watcher::new(source, sink.clone(), MemoryCache::default(), config(1));

        watcher.run(cancel).await;

        let events = sink.events.lock().unwrap().clone();
        let changes = pp_changes(&events);
        assert_eq!(changes.len(), 1);
        assert!((changes[0] - 1.6).abs() < 1e-9);
        assert_eq!(watcher.cache().get(5).map(|u| u.pp), Some(102.0));
    }

    #[tokio::test(start_paused = true)]
    async fn events_follow_the_ranking_order_within_a_page() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![
                Ok(vec![user(1, 10.0), user(2, 20.0), user(3, 30.0)]),
                Ok(vec![user(1, 13.0), user(2, 20.2), user(3, 25.0)]),
            ],
            cancel.clone(),
        );
        let sink = RecordingSink::default();
        let mut watcher = Watcher::new(source, sink.clone(), MemoryCache::default(), config(1));

        watcher.run(cancel).await;

        let ids: Vec<u64> = sink
            .events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Event::PerformanceChanged(change) => Some(change.current.id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn sink_failures_do_not_stop_the_watcher() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::new(
            vec![
                Ok(vec![user(1, 10.0), user(2, 20.0)]),
                Ok(vec![user(1, 15.0), user(2, 25.0)]),
                Ok(vec![user(1, 20.0), user(2, 30.0)]),
            ],
            cancel.clone(),
        );
        let calls = source.calls.clone();
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let mut watcher = Watcher::new(source, sink.clone(), MemoryCache::default(), config(1));

        watcher.run(cancel).await;

        assert_eq!(calls.lock().unwrap().len(), 4);
        assert_eq!(pp_changes(&sink.events.lock().unwrap()).len(), 4);
        assert_eq!(watcher.cache().get(2).map(|u| u.pp), Some(30.0));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_backoff_delay() {
        let cancel = CancellationToken::new();
        // Never cancels by itself: the script is long enough to outlast the test.
        let source = ScriptedSource::new((0..100).map(|_| transport_error()).collect(), cancel.clone());
        let calls = source.calls.clone();
        let mut watcher = Watcher::new(
            source,
            RecordingSink::default(),
            MemoryCache::default(),
            config(200),
        );

        let trigger = cancel.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(25)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        watcher.run(cancel).await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(25) && elapsed < Duration::from_millis(25_001));
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_watcher_never_fetches() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let source = ScriptedSource::new(vec![Ok(vec![user(1, 1.0)])], cancel.clone());
        let calls = source.calls.clone();
        let mut watcher = Watcher::new(
            source,
            RecordingSink::default(),
            MemoryCache::default(),
            config(200),
        );

        watcher.run(cancel).await;

        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(watcher.page(), 1);
    }
}
