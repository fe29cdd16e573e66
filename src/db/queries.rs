use crate::models::{SourceLine, SourceLineRow};
use futures::TryStreamExt;
use sqlx::PgPool;

/// 查询参考单据的全部行 (按行号升序)
pub async fn list_source_lines(
    pool: &PgPool,
    doc_num: &str,
    card_code: &str,
) -> Result<Vec<SourceLine>, sqlx::Error> {
    sqlx::query_as::<_, SourceLineRow>(
        r#"
        SELECT line_num, price, quantity, line_total, description
        FROM t_sap_document_line
        WHERE doc_num = $1
          AND card_code = $2
        ORDER BY line_num
        "#
    )
    .bind(doc_num)
    .bind(card_code)
    .fetch(pool)
    .map_ok(SourceLine::from)
    .try_collect()
    .await
}
