use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::queries;
use crate::models::{ReferenceKey, SourceLine};

/// Source Line 拉取错误
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Unavailable(String),
}

/// Source Line 来源抽象
///
/// 会话只依赖这个 trait，测试里可以换成内存实现。
#[async_trait]
pub trait SourceLineProvider: Send + Sync {
    /// 按参考单据拉取全部行 (按行号升序)
    async fn fetch_source_lines(&self, reference: &ReferenceKey) -> Result<Vec<SourceLine>, ProviderError>;
}

/// PostgreSQL 实现 (t_sap_document_line)
pub struct PgSourceLineProvider {
    pool: PgPool,
}

impl PgSourceLineProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SourceLineProvider for PgSourceLineProvider {
    async fn fetch_source_lines(&self, reference: &ReferenceKey) -> Result<Vec<SourceLine>, ProviderError> {
        let lines = queries::list_source_lines(&self.pool, &reference.doc_num, &reference.card_code).await?;
        tracing::info!(
            "Fetched {} source lines for document {} ({})",
            lines.len(),
            reference.doc_num,
            reference.card_code
        );
        Ok(lines)
    }
}
