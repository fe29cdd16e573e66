use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::matcher::MatchPolicy;
use super::provider::SourceLineProvider;
use super::view::{ReconciliationView, ViewSnapshot};
use crate::models::{ReferenceKey, TargetLine};

/// 对账会话存储
///
/// 每个会话对应一个前端视图实例，卸载时删除。拉取在 tokio 上异步执行，
/// 结果经 generation 校验后回写，过期的结果直接丢弃。
///
/// 前端没有卸载就离开时，会话在空闲超过 TTL 后被回收:
/// 访问时发现超时即删除，`spawn_sweeper` 定期清理其余的。
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<Uuid, SessionEntry>>,
    provider: Arc<dyn SourceLineProvider>,
    policy: MatchPolicy,
    ttl: Option<Duration>,
}

/// 默认空闲超时 (30 分钟)
pub const DEFAULT_SESSION_TTL_SECS: i64 = 30 * 60;

struct SessionEntry {
    view: ReconciliationView,
    last_touched: DateTime<Utc>,
}

impl SessionEntry {
    fn is_expired(&self, now: DateTime<Utc>, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| now - self.last_touched > ttl)
    }
}

impl SessionStore {
    pub fn new(provider: Arc<dyn SourceLineProvider>, policy: MatchPolicy) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            provider,
            policy,
            ttl: Some(Duration::seconds(DEFAULT_SESSION_TTL_SECS)),
        }
    }

    /// 设置空闲超时，`None` 表示会话只在显式删除时回收
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// 由发票行创建会话
    pub fn create(&self, targets: Vec<TargetLine>) -> (Uuid, ViewSnapshot) {
        let id = Uuid::new_v4();
        let view = ReconciliationView::new(targets, self.policy.clone());
        let snapshot = view.snapshot();
        self.sessions.insert(
            id,
            SessionEntry {
                view,
                last_touched: Utc::now(),
            },
        );
        tracing::info!("Session {} created with {} target lines", id, snapshot.target_lines.len());
        (id, snapshot)
    }

    pub fn snapshot(&self, id: Uuid) -> Option<ViewSnapshot> {
        self.with_view(id, |view| view.snapshot())
    }

    pub fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            tracing::info!("Session {} discarded", id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// 在会话上执行同步操作 (不得跨 await 持有)
    ///
    /// 成功访问会刷新空闲计时；已超时的会话被删除并视为不存在。
    pub fn with_view<R>(&self, id: Uuid, f: impl FnOnce(&mut ReconciliationView) -> R) -> Option<R> {
        let now = Utc::now();
        {
            let mut entry = self.sessions.get_mut(&id)?;
            if !entry.is_expired(now, self.ttl) {
                entry.last_touched = now;
                return Some(f(&mut entry.view));
            }
        }

        let ttl = self.ttl;
        if self.sessions.remove_if(&id, |_, entry| entry.is_expired(now, ttl)).is_some() {
            tracing::info!("Session {} expired", id);
        }
        None
    }

    /// 删除所有空闲超时的会话，返回删除数量
    pub fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let ttl = self.ttl;
        let mut evicted = 0;
        self.sessions.retain(|_, entry| {
            let expired = entry.is_expired(now, ttl);
            if expired {
                evicted += 1;
            }
            !expired
        });
        evicted
    }

    /// 后台定期清理超时会话
    pub fn spawn_sweeper(&self, every: std::time::Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = store.evict_expired();
                if evicted > 0 {
                    tracing::info!("Evicted {} idle sessions, {} remaining", evicted, store.len());
                }
            }
        })
    }

    /// 选择参考单据并在后台拉取 Source Line
    ///
    /// 返回选择后的快照以及拉取任务句柄 (清除参考单据时没有任务)。
    /// 任务结果为 `true` 表示结果已应用。
    pub fn select_reference(
        &self,
        id: Uuid,
        reference: Option<ReferenceKey>,
    ) -> Option<(ViewSnapshot, Option<JoinHandle<bool>>)> {
        let (ticket, snapshot) = self.with_view(id, |view| {
            let ticket = view.select_reference(reference);
            (ticket, view.snapshot())
        })?;

        let handle = ticket.map(|ticket| {
            let store = self.clone();
            tokio::spawn(async move {
                let result = store
                    .provider
                    .fetch_source_lines(&ticket.reference)
                    .await
                    .map_err(|e| e.to_string());
                if let Err(message) = &result {
                    tracing::warn!(
                        "Session {}: fetching document {} failed: {}",
                        id,
                        ticket.reference.doc_num,
                        message
                    );
                }
                store
                    .with_view(id, |view| view.apply_fetch(ticket.generation, result))
                    .unwrap_or(false)
            })
        });

        Some((snapshot, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceLine;
    use crate::service::provider::ProviderError;
    use async_trait::async_trait;

    /// 按单据号返回固定行，单据号 "slow" 会延迟返回
    struct FixtureProvider;

    #[async_trait]
    impl SourceLineProvider for FixtureProvider {
        async fn fetch_source_lines(&self, reference: &ReferenceKey) -> Result<Vec<SourceLine>, ProviderError> {
            match reference.doc_num.as_str() {
                "slow" => {
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    Ok(vec![SourceLine::new(1, "999")])
                }
                "broken" => Err(ProviderError::Unavailable("backend unavailable".to_string())),
                _ => Ok(vec![SourceLine::new(1, "10")]),
            }
        }
    }

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(FixtureProvider), MatchPolicy::default())
    }

    #[tokio::test]
    async fn fetch_result_is_applied() {
        let store = store();
        let (id, _) = store.create(vec![TargetLine::new("a", "10")]);

        let (snapshot, handle) = store
            .select_reference(id, Some(ReferenceKey::new("4500", "C1")))
            .unwrap();
        assert_eq!(snapshot.status, crate::service::ViewStatus::Loading);
        assert!(handle.unwrap().await.unwrap());

        let snapshot = store.snapshot(id).unwrap();
        assert_eq!(snapshot.mapping.target_for(1), Some("a"));
    }

    #[tokio::test]
    async fn slow_superseded_fetch_does_not_overwrite() {
        let store = store();
        let (id, _) = store.create(vec![TargetLine::new("a", "10")]);

        let (_, slow) = store
            .select_reference(id, Some(ReferenceKey::new("slow", "C1")))
            .unwrap();
        let (_, fast) = store
            .select_reference(id, Some(ReferenceKey::new("4500", "C1")))
            .unwrap();

        assert!(fast.unwrap().await.unwrap());
        assert!(!slow.unwrap().await.unwrap());

        let snapshot = store.snapshot(id).unwrap();
        assert_eq!(snapshot.source_lines[0].line_total.raw(), "10");
        assert_eq!(snapshot.reference.unwrap().doc_num, "4500");
    }

    #[tokio::test]
    async fn failure_message_passes_through() {
        let store = store();
        let (id, _) = store.create(vec![TargetLine::new("a", "10")]);

        let (_, handle) = store
            .select_reference(id, Some(ReferenceKey::new("broken", "C1")))
            .unwrap();
        assert!(handle.unwrap().await.unwrap());

        let snapshot = store.snapshot(id).unwrap();
        assert_eq!(
            snapshot.status,
            crate::service::ViewStatus::Failed {
                message: "backend unavailable".to_string()
            }
        );
    }

    #[tokio::test]
    async fn removed_session_ignores_late_fetch() {
        let store = store();
        let (id, _) = store.create(vec![TargetLine::new("a", "10")]);

        let (_, handle) = store
            .select_reference(id, Some(ReferenceKey::new("slow", "C1")))
            .unwrap();
        assert!(store.remove(id));
        assert!(!handle.unwrap().await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn idle_session_expires_on_access() {
        let store = store().with_ttl(Some(Duration::milliseconds(20)));
        let (id, _) = store.create(vec![TargetLine::new("a", "10")]);
        assert!(store.snapshot(id).is_some());

        tokio::time::sleep(std::time::Duration::from_millis(60)).await;
        assert!(store.snapshot(id).is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn sweep_keeps_recently_touched_sessions() {
        let store = store().with_ttl(Some(Duration::milliseconds(100)));
        let (idle, _) = store.create(vec![TargetLine::new("a", "10")]);
        let (busy, _) = store.create(vec![TargetLine::new("b", "20")]);

        tokio::time::sleep(std::time::Duration::from_millis(70)).await;
        assert!(store.snapshot(busy).is_some());
        tokio::time::sleep(std::time::Duration::from_millis(70)).await;

        assert_eq!(store.evict_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.snapshot(idle).is_none());
        assert!(store.snapshot(busy).is_some());
    }

    #[tokio::test]
    async fn sessions_without_ttl_are_kept() {
        let store = store().with_ttl(None);
        let (id, _) = store.create(vec![TargetLine::new("a", "10")]);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(store.evict_expired(), 0);
        assert!(store.snapshot(id).is_some());
    }

    #[test]
    fn unknown_session_yields_none() {
        let store = store();
        assert!(store.snapshot(Uuid::new_v4()).is_none());
        assert!(store.with_view(Uuid::new_v4(), |v| v.generation()).is_none());
    }
}
