//! Test doubles shared by the orchestrator tests

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use playlog_cache::InMemoryStateStore;
use playlog_core::domain::{
    AchievementDto, FinishPayload, InstallState, PendingOperation, SnapshotBaseline, StartPayload,
};
use playlog_core::ports::{
    AchievementCounts, AchievementsDiffRequest, AchievementsFullRequest, AckStatus,
    IAchievementProvider, IGameLibrary, IRemoteClient, IStateStore, LibraryDiffRequest,
    LibraryFullRequest, LibraryGame, SyncAck,
};

use super::{Collaborators, OrchestratorSettings, SyncOrchestrator};
use crate::breaker::{BreakerSettings, CircuitBreaker};

pub(crate) fn accepted() -> SyncAck {
    SyncAck {
        success: true,
        status: AckStatus::Queued,
        ..Default::default()
    }
}

// ============================================================================
// Remote
// ============================================================================

/// Every request the mock received, in order
#[derive(Debug, Default)]
pub(crate) struct Recorded {
    pub starts: Vec<StartPayload>,
    pub finishes: Vec<FinishPayload>,
    pub library_full: Vec<LibraryFullRequest>,
    pub library_diff: Vec<LibraryDiffRequest>,
    pub achievements_full: Vec<AchievementsFullRequest>,
    pub achievements_diff: Vec<AchievementsDiffRequest>,
}

/// Scripted remote service. Unscripted calls succeed.
#[derive(Default)]
pub(crate) struct MockRemote {
    fail_starts: AtomicBool,
    fail_syncs: AtomicBool,
    start_responses: Mutex<VecDeque<Option<String>>>,
    sync_acks: Mutex<VecDeque<Option<SyncAck>>>,
    fail_sources: AtomicBool,
    allowed_sources: Mutex<Vec<String>>,
    allowed_sources_calls: AtomicUsize,
    start_calls: AtomicUsize,
    finish_calls: AtomicUsize,
    recorded: Mutex<Recorded>,
}

impl MockRemote {
    pub fn fail_starts(&self, fail: bool) {
        self.fail_starts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_syncs(&self, fail: bool) {
        self.fail_syncs.store(fail, Ordering::SeqCst);
    }

    pub fn push_start(&self, session_id: Option<&str>) {
        self.start_responses
            .lock()
            .unwrap()
            .push_back(session_id.map(str::to_string));
    }

    /// Response of the next library/achievement sync call
    pub fn push_ack(&self, ack: Option<SyncAck>) {
        self.sync_acks.lock().unwrap().push_back(ack);
    }

    pub fn set_allowed_sources(&self, sources: Vec<String>) {
        *self.allowed_sources.lock().unwrap() = sources;
    }

    /// Makes the sources endpoint answer with no usable body
    pub fn fail_sources(&self, fail: bool) {
        self.fail_sources.store(fail, Ordering::SeqCst);
    }

    pub fn allowed_sources_calls(&self) -> usize {
        self.allowed_sources_calls.load(Ordering::SeqCst)
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn finish_calls(&self) -> usize {
        self.finish_calls.load(Ordering::SeqCst)
    }

    pub fn finished_payloads(&self) -> Vec<FinishPayload> {
        self.recorded.lock().unwrap().finishes.clone()
    }

    pub fn recorded<R>(&self, read: impl FnOnce(&Recorded) -> R) -> R {
        read(&self.recorded.lock().unwrap())
    }

    fn next_ack(&self) -> anyhow::Result<Option<SyncAck>> {
        if self.fail_syncs.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }
        Ok(self
            .sync_acks
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Some(accepted())))
    }
}

#[async_trait::async_trait]
impl IRemoteClient for MockRemote {
    async fn start_session(&self, payload: &StartPayload) -> anyhow::Result<Option<String>> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_starts.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }
        self.recorded.lock().unwrap().starts.push(payload.clone());
        Ok(self
            .start_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Some("sess-default".to_string())))
    }

    async fn finish_session(&self, payload: &FinishPayload) -> anyhow::Result<Option<SyncAck>> {
        self.finish_calls.fetch_add(1, Ordering::SeqCst);
        self.recorded.lock().unwrap().finishes.push(payload.clone());
        Ok(Some(accepted()))
    }

    async fn sync_library_full(
        &self,
        request: &LibraryFullRequest,
    ) -> anyhow::Result<Option<SyncAck>> {
        self.recorded.lock().unwrap().library_full.push(request.clone());
        self.next_ack()
    }

    async fn sync_library_diff(
        &self,
        request: &LibraryDiffRequest,
    ) -> anyhow::Result<Option<SyncAck>> {
        self.recorded.lock().unwrap().library_diff.push(request.clone());
        self.next_ack()
    }

    async fn sync_achievements_full(
        &self,
        request: &AchievementsFullRequest,
    ) -> anyhow::Result<Option<SyncAck>> {
        self.recorded
            .lock()
            .unwrap()
            .achievements_full
            .push(request.clone());
        self.next_ack()
    }

    async fn sync_achievements_diff(
        &self,
        request: &AchievementsDiffRequest,
    ) -> anyhow::Result<Option<SyncAck>> {
        self.recorded
            .lock()
            .unwrap()
            .achievements_diff
            .push(request.clone());
        self.next_ack()
    }

    async fn get_allowed_sources(&self) -> anyhow::Result<Option<Vec<String>>> {
        self.allowed_sources_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sources.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(self.allowed_sources.lock().unwrap().clone()))
    }
}

// ============================================================================
// Host
// ============================================================================

pub(crate) fn game(id: &str, plugin_id: &str, playtime_seconds: u64) -> LibraryGame {
    LibraryGame {
        id: id.to_string(),
        external_id: format!("ext-{id}"),
        plugin_id: plugin_id.to_string(),
        name: format!("Game {id}"),
        playtime_seconds,
        ..Default::default()
    }
}

#[derive(Default)]
pub(crate) struct StaticLibrary {
    games: Mutex<Vec<LibraryGame>>,
}

impl StaticLibrary {
    pub fn set_games(&self, games: Vec<LibraryGame>) {
        *self.games.lock().unwrap() = games;
    }

    pub fn update(&self, id: &str, change: impl FnOnce(&mut LibraryGame)) {
        let mut games = self.games.lock().unwrap();
        if let Some(game) = games.iter_mut().find(|g| g.id == id) {
            change(game);
        }
    }
}

#[async_trait::async_trait]
impl IGameLibrary for StaticLibrary {
    async fn games(&self) -> anyhow::Result<Vec<LibraryGame>> {
        Ok(self.games.lock().unwrap().clone())
    }
}

/// Achievement lists keyed by game id
#[derive(Default)]
pub(crate) struct StaticAchievements {
    by_game: Mutex<HashMap<String, Vec<AchievementDto>>>,
}

impl StaticAchievements {
    pub fn set(&self, game_id: &str, achievements: Vec<AchievementDto>) {
        self.by_game
            .lock()
            .unwrap()
            .insert(game_id.to_string(), achievements);
    }
}

#[async_trait::async_trait]
impl IAchievementProvider for StaticAchievements {
    fn name(&self) -> &str {
        "static"
    }

    async fn counts(&self, game: &LibraryGame) -> Option<AchievementCounts> {
        let by_game = self.by_game.lock().unwrap();
        by_game.get(&game.id).map(|list| AchievementCounts {
            unlocked: list.iter().filter(|a| a.is_unlocked).count() as u32,
            total: list.len() as u32,
        })
    }

    async fn achievements(&self, game: &LibraryGame) -> Option<Vec<AchievementDto>> {
        self.by_game.lock().unwrap().get(&game.id).cloned()
    }
}

pub(crate) fn achievement(name: &str, unlocked: bool) -> AchievementDto {
    AchievementDto {
        name: name.to_string(),
        is_unlocked: unlocked,
        ..Default::default()
    }
}

// ============================================================================
// Storage
// ============================================================================

/// In-memory store whose writes can be made to fail
#[derive(Default)]
pub(crate) struct FlakyStore {
    inner: InMemoryStateStore,
    fail_state_saves: AtomicBool,
    fail_queue_saves: AtomicBool,
}

impl FlakyStore {
    pub fn fail_state_saves(&self, fail: bool) {
        self.fail_state_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_queue_saves(&self, fail: bool) {
        self.fail_queue_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl IStateStore for FlakyStore {
    async fn load_install_state(&self) -> anyhow::Result<InstallState> {
        self.inner.load_install_state().await
    }

    async fn save_install_state(&self, state: &InstallState) -> anyhow::Result<()> {
        if self.fail_state_saves.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.save_install_state(state).await
    }

    async fn load_pending_queue(&self) -> anyhow::Result<Vec<PendingOperation>> {
        self.inner.load_pending_queue().await
    }

    async fn save_pending_queue(&self, operations: &[PendingOperation]) -> anyhow::Result<()> {
        if self.fail_queue_saves.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.save_pending_queue(operations).await
    }

    async fn load_baseline(&self) -> anyhow::Result<SnapshotBaseline> {
        self.inner.load_baseline().await
    }

    async fn save_baseline(&self, baseline: &SnapshotBaseline) -> anyhow::Result<()> {
        self.inner.save_baseline(baseline).await
    }
}

// ============================================================================
// Harness
// ============================================================================

pub(crate) struct Harness {
    pub orchestrator: SyncOrchestrator,
    pub remote: Arc<MockRemote>,
    pub store: Arc<FlakyStore>,
    pub library: Arc<StaticLibrary>,
    pub achievements: Arc<StaticAchievements>,
}

/// Orchestrator over two games; the breaker threshold is high enough that
/// it never opens unless a test resets or tightens it
pub(crate) async fn harness() -> Harness {
    harness_with(BreakerSettings {
        failure_threshold: 100,
        open_timeout: Duration::from_secs(60),
        max_jitter: Duration::from_millis(10),
    })
    .await
}

pub(crate) async fn harness_with(breaker: BreakerSettings) -> Harness {
    let remote = Arc::new(MockRemote::default());
    let store = Arc::new(FlakyStore::default());
    let library = Arc::new(StaticLibrary::default());
    library.set_games(vec![game("g1", "steam", 3600), game("g2", "gog", 60)]);
    let achievements = Arc::new(StaticAchievements::default());

    let deps = Collaborators {
        remote: remote.clone(),
        store: store.clone(),
        library: library.clone(),
        achievements: achievements.clone(),
        breaker: Arc::new(CircuitBreaker::new(breaker)),
    };
    let settings = OrchestratorSettings {
        base_delay: Duration::from_millis(100),
        ..Default::default()
    };
    let orchestrator = SyncOrchestrator::load(deps, settings).await.unwrap();

    Harness {
        orchestrator,
        remote,
        store,
        library,
        achievements,
    }
}
