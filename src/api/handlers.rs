use crate::models::{ReferenceKey, TargetLine};
use crate::service::{export, SessionStore, ViewSnapshot};
use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ApiError;

/// 请求体: 发票行
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub lines: Vec<TargetLine>,
}

/// 请求体: 参考单据 (单据号为空表示清除)
#[derive(Debug, Deserialize)]
pub struct SelectReferenceRequest {
    #[serde(default)]
    pub doc_num: Option<String>,
    #[serde(default)]
    pub card_code: Option<String>,
}

impl SelectReferenceRequest {
    fn into_reference(self) -> Option<ReferenceKey> {
        let doc_num = self.doc_num?;
        Some(ReferenceKey::new(doc_num, self.card_code.unwrap_or_default()))
    }
}

/// 请求体: 交换两个位置的发票行
#[derive(Debug, Deserialize)]
pub struct SwapRequest {
    pub from: usize,
    pub to: usize,
}

/// 响应体
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<ViewSnapshot>,
}

impl SessionResponse {
    fn ok(message: impl Into<String>, session_id: Uuid, view: Option<ViewSnapshot>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            session_id: Some(session_id),
            view,
        })
    }
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 创建对账会话
pub async fn create_session(
    State(store): State<SessionStore>,
    Json(req): Json<CreateSessionRequest>,
) -> Response {
    let (id, view) = store.create(req.lines);
    let message = format!("Session created with {} target lines", view.target_lines.len());
    (StatusCode::CREATED, SessionResponse::ok(message, id, Some(view))).into_response()
}

/// 查询会话快照
pub async fn get_session(
    State(store): State<SessionStore>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let view = store.snapshot(id).ok_or(ApiError::SessionNotFound(id))?;
    Ok(SessionResponse::ok("OK", id, Some(view)))
}

/// 删除会话 (视图卸载)
pub async fn delete_session(
    State(store): State<SessionStore>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    if !store.remove(id) {
        return Err(ApiError::SessionNotFound(id));
    }
    Ok(SessionResponse::ok("Session discarded", id, None))
}

/// 选择参考单据，后台拉取 Source Line
pub async fn select_reference(
    State(store): State<SessionStore>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectReferenceRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let (view, fetch) = store
        .select_reference(id, req.into_reference())
        .ok_or(ApiError::SessionNotFound(id))?;
    let message = if fetch.is_some() {
        "Fetching source lines"
    } else {
        "Reference cleared"
    };
    Ok(SessionResponse::ok(message, id, Some(view)))
}

/// 交换两条发票行并局部修复映射
pub async fn swap_targets(
    State(store): State<SessionStore>,
    Path(id): Path<Uuid>,
    Json(req): Json<SwapRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let view = store
        .with_view(id, |view| {
            view.swap_targets(req.from, req.to)?;
            Ok::<_, ApiError>(view.snapshot())
        })
        .ok_or(ApiError::SessionNotFound(id))??;
    let message = format!("Swapped positions {} and {}", req.from, req.to);
    Ok(SessionResponse::ok(message, id, Some(view)))
}

/// 全量自动匹配
pub async fn auto_match(
    State(store): State<SessionStore>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let view = store
        .with_view(id, |view| {
            view.auto_match();
            view.snapshot()
        })
        .ok_or(ApiError::SessionNotFound(id))?;
    let message = format!("Matched {} of {} source lines", view.mapping.len(), view.source_lines.len());
    Ok(SessionResponse::ok(message, id, Some(view)))
}

/// 切换发票行选中状态
pub async fn toggle_target(
    State(store): State<SessionStore>,
    Path((id, target_id)): Path<(Uuid, String)>,
) -> Result<Json<SessionResponse>, ApiError> {
    let (selected, view) = store
        .with_view(id, |view| {
            let selected = view.toggle_selected(&target_id)?;
            Ok::<_, ApiError>((selected, view.snapshot()))
        })
        .ok_or(ApiError::SessionNotFound(id))??;
    let message = format!("Target {} selected: {}", target_id, selected);
    Ok(SessionResponse::ok(message, id, Some(view)))
}

/// 导出当前配对 (CSV)
pub async fn export_csv(
    State(store): State<SessionStore>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let bytes = store
        .with_view(id, |view| export::to_csv_bytes(view))
        .ok_or(ApiError::SessionNotFound(id))??;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], bytes).into_response())
}
