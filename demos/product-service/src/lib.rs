use axum::body::Body;
use axum::http::Request;
use axum::routing::get;
use axum::{Json, Router};
use plumb_kit::openapi::build_openapi;
use plumb_kit::{ByMethod, Documentation, Raw, ServeMux};
use tower_http::cors::{Any, CorsLayer};
use utoipa_swagger_ui::SwaggerUi;

pub mod dtos;
pub mod handlers;

use handlers::*;

pub const TITLE: &str = "Product Service API";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const INTRODUCTION: &[&str] = &[
    "A small product catalog.",
    "Write operations need an API key
     in the x-api-key header.",
];

/// Registers every endpoint of the service.
pub fn build_mux() -> plumb_kit::Result<ServeMux> {
    let mut mux = ServeMux::new();

    mux.handle(
        "/v1/products",
        ByMethod::new().get(list_products).post(create_product),
    )?
    .doc("List products, optionally by category, or add a new one.");

    mux.handle(
        "/v1/product",
        ByMethod::new()
            .get(get_product)
            .patch(update_product)
            .delete(delete_product),
    )?
    .doc("Read, update or delete a single product.");

    mux.handle("/v1/add", add)?.doc("Add two numbers.");
    mux.handle("/v1/hello", ByMethod::new().get(hello))?
        .doc("Say hello.");
    mux.handle("/v1/legacy", legacy_echo)?
        .doc("Echo a snake_case payload back.");

    mux.handle(
        "/health",
        Raw::new(|_req: Request<Body>| async { "ok" }),
    )?
    .doc("Liveness probe.");

    Ok(mux)
}

pub fn documentation(mux: &ServeMux) -> plumb_kit::Result<Documentation> {
    mux.documentation(INTRODUCTION)
}

pub fn openapi(documentation: &Documentation) -> utoipa::openapi::OpenApi {
    build_openapi(
        documentation,
        TITLE,
        VERSION,
        &documentation.introduction.join(" "),
    )
}

/// The whole application: the routes, the documentation artifact, Swagger UI
/// and a permissive CORS layer.
pub fn build_app() -> plumb_kit::Result<Router> {
    let mux = build_mux()?;
    let documentation = documentation(&mux)?;
    let swagger_ui =
        SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi(&documentation));

    Ok(Router::new()
        .merge(mux.into_router())
        .route(
            "/api-docs/endpoints.json",
            get(move || {
                let documentation = documentation.clone();
                async move { Json(documentation) }
            }),
        )
        .merge(swagger_ui)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        ))
}
