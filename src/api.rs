use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::{
    cart,
    fonts::FontSet,
    layout,
    render::{self, RenderError, Theme},
    AppState,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StyleOptions {
    /// `"light"` or `"dark"`; anything else means light.
    pub theme: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderImageRequest {
    /// Receipt heading; a localized placeholder is used when absent.
    pub title: Option<String>,
    /// Store id -> `{ storeInfo: { name }, items: [...] }`. Malformed
    /// entries are tolerated and dropped during normalization.
    #[schema(value_type = Object)]
    pub cart: serde_json::Value,
    pub style: Option<StyleOptions>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderImageResponse {
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    /// base64 data URL of the PNG, ready for inline embedding.
    pub data_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[utoipa::path(get, path = "/health", tag = "order-image", responses((status=200, body=HealthResponse)))]
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok".into() })
}

fn cart_is_usable(cart: &serde_json::Value) -> bool {
    cart.as_object().map(|o| !o.is_empty()).unwrap_or(false)
}

#[utoipa::path(
    post,
    path = "/order-image",
    tag = "order-image",
    request_body = OrderImageRequest,
    responses(
        (status=200, body=OrderImageResponse),
        (status=400, description="Cart empty or malformed"),
        (status=500, description="Rendering failed")
    )
)]
pub async fn order_image(
    State(st): State<Arc<AppState>>,
    Json(req): Json<OrderImageRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if !cart_is_usable(&req.cart) {
        return Err((StatusCode::BAD_REQUEST, "购物车数据为空或格式不正确".into()));
    }

    let groups = {
        let _t = crate::perf_scope!("normalize");
        cart::normalize(&req.cart)
    };
    // A cart that normalizes to nothing is a user error, not a blank image.
    if groups.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "购物车数据为空或格式不正确".into()));
    }

    let title = req
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| render::DEFAULT_TITLE.to_string());
    let theme = Theme::parse(req.style.as_ref().and_then(|s| s.theme.as_deref()));

    let plan = {
        let _t = crate::perf_scope!("plan");
        layout::plan(&groups)
    };

    let fonts = FontSet::resolve().map_err(render_failure)?;
    let result = render::render(&groups, &plan, theme, &title, &fonts, &st.icons)
        .map_err(render_failure)?;

    Ok(Json(OrderImageResponse {
        mime_type: result.mime_type.into(),
        width: result.width,
        height: result.height,
        data_url: result.data_url,
    }))
}

fn render_failure(e: RenderError) -> (StatusCode, String) {
    error!("order image rendering failed: {e}");
    // Short diagnostic only, no internals.
    (StatusCode::INTERNAL_SERVER_ERROR, format!("生成订单图片失败: {e}"))
}
