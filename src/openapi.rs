use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health,
        api::order_image,
    ),
    components(
        schemas(
            api::OrderImageRequest,
            api::OrderImageResponse,
            api::StyleOptions,
            api::HealthResponse,
        )
    ),
    tags(
        (name = "order-image", description = "Order-summary receipt image API")
    )
)]
pub struct ApiDoc;
