use crate::common::config::SessionConfig;
use crate::common::{OptimizerError, Result};
use crate::core::{Session, SessionSettings, SizeCheck, UploadedImage};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

type SessionHandle = Arc<Mutex<Session>>;

/// Live sessions keyed by id. Each owns its own workspace, so dropping a
/// session from the map deletes its files.
///
/// The map lock only guards lookups; every session has its own lock, so a
/// slow upload in one session never holds up the others.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionHandle>>,
    settings: SessionSettings,
    root: PathBuf,
    keep_artifacts: bool,
    ttl: Duration,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(
        settings: SessionSettings,
        root: PathBuf,
        keep_artifacts: bool,
        config: &SessionConfig,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            settings,
            root,
            keep_artifacts,
            ttl: Duration::seconds(config.ttl_seconds.min(u32::MAX as u64) as i64),
            max_sessions: config.max_sessions,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Starts a session for `image` and runs the upload + size check on a
    /// blocking thread. A failed run is discarded along with its workspace.
    pub async fn create(&self, image: UploadedImage) -> Result<(String, SizeCheck)> {
        let settings = self.settings.clone();
        let root = self.root.clone();
        let keep_artifacts = self.keep_artifacts;
        let (session, check) = run_blocking(move || {
            let mut session = Session::create(settings, &root, keep_artifacts)?;
            let check = session.process(image)?;
            Ok((session, check))
        })
        .await?;
        let id = session.id().to_string();

        let mut evicted = Vec::new();
        {
            let mut sessions = self.sessions.lock().await;
            while sessions.len() >= self.max_sessions {
                match least_recent(&sessions) {
                    Some(oldest) => {
                        tracing::warn!("Session limit reached, evicting {}", oldest);
                        evicted.extend(sessions.remove(&oldest));
                    }
                    None => break,
                }
            }
            sessions.insert(id.clone(), Arc::new(Mutex::new(session)));
        }
        discard(evicted).await;

        Ok((id, check))
    }

    /// Runs `f` against the session while holding only that session's lock.
    /// For quick in-memory work; file I/O goes through `with_session_blocking`.
    pub async fn with_session<T, F>(&self, id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> Result<T>,
    {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        f(&mut *session)
    }

    /// Like `with_session`, but runs `f` on the blocking thread pool.
    pub async fn with_session_blocking<T, F>(&self, id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let handle = self.handle(id).await?;
        let mut session = handle.lock_owned().await;
        run_blocking(move || f(&mut *session)).await
    }

    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(id);
        match removed {
            Some(handle) => {
                discard(vec![handle]).await;
                tracing::info!("Closed session {}", id);
                true
            }
            None => false,
        }
    }

    /// Drops sessions idle for longer than the configured ttl. Sessions
    /// busy with a request are left for the next sweep.
    pub async fn sweep_expired(&self) -> usize {
        let cutoff = Utc::now() - self.ttl;
        let expired: Vec<SessionHandle> = {
            let mut sessions = self.sessions.lock().await;
            let ids: Vec<String> = sessions
                .iter()
                .filter(|(_, handle)| idle_since(handle).is_some_and(|last| last <= cutoff))
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        let count = expired.len();
        discard(expired).await;
        count
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn handle(&self, id: &str) -> Result<SessionHandle> {
        self.sessions
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| OptimizerError::SessionNotFound(id.to_string()))
    }
}

/// Last activity of a session nobody is currently using.
fn idle_since(handle: &SessionHandle) -> Option<DateTime<Utc>> {
    handle.try_lock().ok().map(|session| session.last_active())
}

fn least_recent(sessions: &HashMap<String, SessionHandle>) -> Option<String> {
    sessions
        .iter()
        .filter_map(|(id, handle)| idle_since(handle).map(|last| (id, last)))
        .min_by_key(|(_, last)| *last)
        .map(|(id, _)| id.clone())
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| OptimizerError::Other(anyhow::anyhow!("Session task failed: {}", e)))?
}

/// Workspace deletion is file I/O, so the last handles are dropped off the
/// runtime threads.
async fn discard(sessions: Vec<SessionHandle>) {
    if sessions.is_empty() {
        return;
    }
    if let Err(e) = tokio::task::spawn_blocking(move || drop(sessions)).await {
        tracing::error!("Failed to clean up sessions: {}", e);
    }
}

pub fn spawn_sweeper(registry: Arc<SessionRegistry>, every: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let expired = registry.sweep_expired().await;
            if expired > 0 {
                tracing::info!("Expired {} idle session(s)", expired);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Quality, SessionState};
    use tempfile::TempDir;

    fn registry(root: &TempDir, ttl_seconds: u64, max_sessions: usize) -> SessionRegistry {
        let config = SessionConfig {
            ttl_seconds,
            max_sessions,
            sweep_interval_seconds: 60,
        };
        SessionRegistry::new(SessionSettings::default(), root.path().to_path_buf(), false, &config)
    }

    fn image(name: &str, len: usize) -> UploadedImage {
        UploadedImage::new(name, vec![1u8; len]).unwrap()
    }

    #[tokio::test]
    async fn create_and_select() {
        let root = TempDir::new().unwrap();
        let registry = registry(&root, 60, 8);

        let (id, check) = registry.create(image("big.jpg", 3 * 1024 * 1024)).await.unwrap();
        assert!(matches!(check, SizeCheck::Optimized { variants: 3, .. }));

        let state = registry
            .with_session(&id, |session| {
                session.select(Quality::new(25)?)?;
                Ok(session.state())
            })
            .await
            .unwrap();
        assert_eq!(state, SessionState::Selected);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let root = TempDir::new().unwrap();
        let registry = registry(&root, 60, 8);

        let err = registry.with_session("missing", |_| Ok(())).await.unwrap_err();
        assert!(matches!(err, OptimizerError::SessionNotFound(_)));
        assert!(!registry.remove("missing").await);
    }

    #[tokio::test]
    async fn same_filename_sessions_are_isolated() {
        let root = TempDir::new().unwrap();
        let registry = registry(&root, 60, 8);

        let (first, _) = registry.create(image("cat.jpg", 10)).await.unwrap();
        let (second, _) = registry
            .create(UploadedImage::new("cat.jpg", vec![2u8; 20]).unwrap())
            .await
            .unwrap();
        assert_ne!(first, second);

        let first_path = registry
            .with_session(&first, |s| Ok(s.workspace_path().join("temp_cat.jpg")))
            .await
            .unwrap();
        assert_eq!(std::fs::read(first_path).unwrap(), vec![1u8; 10]);
    }

    #[tokio::test]
    async fn removing_a_session_deletes_its_files() {
        let root = TempDir::new().unwrap();
        let registry = registry(&root, 60, 8);

        let (id, _) = registry.create(image("cat.jpg", 10)).await.unwrap();
        let path = registry
            .with_session(&id, |s| Ok(s.workspace_path().to_path_buf()))
            .await
            .unwrap();
        assert!(path.exists());

        assert!(registry.remove(&id).await);
        assert!(!path.exists());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn evicts_least_recent_when_full() {
        let root = TempDir::new().unwrap();
        let registry = registry(&root, 60, 2);

        let (first, _) = registry.create(image("a.jpg", 10)).await.unwrap();
        let (second, _) = registry.create(image("b.jpg", 10)).await.unwrap();
        registry
            .with_session(&first, |s| {
                s.touch();
                Ok(())
            })
            .await
            .unwrap();
        let (third, _) = registry.create(image("c.jpg", 10)).await.unwrap();

        assert_eq!(registry.len().await, 2);
        assert!(registry.with_session(&first, |_| Ok(())).await.is_ok());
        assert!(registry.with_session(&second, |_| Ok(())).await.is_err());
        assert!(registry.with_session(&third, |_| Ok(())).await.is_ok());
    }

    #[tokio::test]
    async fn sweep_keeps_fresh_sessions() {
        let root = TempDir::new().unwrap();
        let registry = registry(&root, 3600, 8);

        registry.create(image("a.jpg", 10)).await.unwrap();
        assert_eq!(registry.sweep_expired().await, 0);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn sweep_drops_idle_sessions_and_their_files() {
        let root = TempDir::new().unwrap();
        let registry = registry(&root, 0, 8);

        let (id, _) = registry.create(image("a.jpg", 10)).await.unwrap();
        let path = registry
            .with_session(&id, |s| Ok(s.workspace_path().to_path_buf()))
            .await
            .unwrap();
        assert!(path.exists());

        assert_eq!(registry.sweep_expired().await, 1);
        assert_eq!(registry.len().await, 0);
        assert!(!path.exists());
        assert!(matches!(
            registry.with_session(&id, |_| Ok(())).await,
            Err(OptimizerError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn sweep_skips_sessions_in_use() {
        let root = TempDir::new().unwrap();
        let registry = registry(&root, 0, 8);
        let (id, _) = registry.create(image("a.jpg", 10)).await.unwrap();

        let handle = registry.handle(&id).await.unwrap();
        let guard = handle.lock().await;
        assert_eq!(registry.sweep_expired().await, 0);
        drop(guard);
        assert_eq!(registry.sweep_expired().await, 1);
    }

    #[tokio::test]
    async fn sweeper_task_expires_sessions() {
        let root = TempDir::new().unwrap();
        let registry = Arc::new(registry(&root, 0, 8));
        registry.create(image("a.jpg", 10)).await.unwrap();
        registry.create(image("b.jpg", 10)).await.unwrap();

        let sweeper = spawn_sweeper(registry.clone(), std::time::Duration::from_millis(10));
        let drained = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while !registry.is_empty().await {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await;
        sweeper.abort();

        assert!(drained.is_ok());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn busy_session_does_not_block_others() {
        let root = TempDir::new().unwrap();
        let registry = Arc::new(registry(&root, 60, 8));
        let (first, _) = registry.create(image("a.jpg", 10)).await.unwrap();
        let (second, _) = registry.create(image("b.jpg", 10)).await.unwrap();

        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let busy = {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry
                    .with_session_blocking(&first, move |session| {
                        let _ = started_tx.send(());
                        let _ = release_rx.recv();
                        Ok(session.state())
                    })
                    .await
            })
        };
        started_rx.await.unwrap();

        // The first session is parked on a blocking thread holding its lock
        let limit = std::time::Duration::from_secs(5);
        let state = tokio::time::timeout(limit, registry.with_session(&second, |s| Ok(s.state())))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state, SessionState::NoActionNeeded);
        let other = tokio::time::timeout(
            limit,
            registry.with_session_blocking(&second, |s| Ok(s.temp_path())),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(other.is_some());
        assert_eq!(tokio::time::timeout(limit, registry.len()).await.unwrap(), 2);

        release_tx.send(()).unwrap();
        assert_eq!(busy.await.unwrap().unwrap(), SessionState::NoActionNeeded);
    }

    #[tokio::test]
    async fn failed_workspace_leaves_no_session() {
        let root = TempDir::new().unwrap();
        // Root is a file, so the workspace cannot be created
        let blocked = root.path().join("blocked");
        std::fs::write(&blocked, b"file").unwrap();
        let registry = SessionRegistry::new(
            SessionSettings::default(),
            blocked,
            false,
            &SessionConfig::default(),
        );

        assert!(registry.create(image("a.jpg", 10)).await.is_err());
        assert!(registry.is_empty().await);
    }
}
