//! Web server for the inventory endpoints
//!
//! Thin axum layer: extracts raw inputs, runs the matching
//! [`InventoryService`] operation on the blocking pool and maps the outcome
//! to an HTTP status.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::services::{
    AddProductRequest, ChangeNameRequest, InventoryService, Outcome, Payload, ServiceResponse,
    UpdateQuantityRequest, Upload,
};

/// Multipart field carrying the CSV file
const UPLOAD_FIELD: &str = "file";

/// Largest accepted request body (CSV uploads)
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

const EXPORT_FILENAME: &str = "inventory_export.csv";

/// Shared application state
#[derive(Clone)]
struct AppState {
    service: Arc<InventoryService>,
}

/// `?items=<json list>` selector
#[derive(Deserialize)]
struct ItemsParams {
    items: Option<String>,
}

/// API response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn status_for(outcome: Outcome) -> StatusCode {
    match outcome {
        Outcome::Success => StatusCode::OK,
        Outcome::ClientError => StatusCode::BAD_REQUEST,
        Outcome::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServiceResponse {
    fn into_response(self) -> Response {
        let status = status_for(self.outcome);
        match self.payload {
            Payload::Message(message) => (status, message).into_response(),
            Payload::Csv(csv) => (
                status,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
                    ),
                ],
                csv,
            )
                .into_response(),
            Payload::Products(products) => (
                status,
                Json(ApiResponse {
                    success: true,
                    data: Some(products),
                    error: None,
                }),
            )
                .into_response(),
        }
    }
}

/// Run a service call off the async workers; database calls block
async fn run_blocking<F>(operation: &'static str, call: F) -> ServiceResponse
where
    F: FnOnce() -> ServiceResponse + Send + 'static,
{
    match tokio::task::spawn_blocking(call).await {
        Ok(response) => response,
        Err(e) => {
            log::error!("{} task failed: {}", operation, e);
            ServiceResponse::server_error("Internal server error.")
        }
    }
}

fn bad_body(operation: &str, rejection: JsonRejection) -> ServiceResponse {
    log::warn!("{} rejected: {}", operation, rejection.body_text());
    ServiceResponse::client_error(rejection.body_text())
}

/// Listing responses are always JSON, failures included
fn listing_response(response: ServiceResponse) -> Response {
    match response.payload {
        Payload::Message(message) => (
            status_for(response.outcome),
            Json(ApiResponse::<()> {
                success: false,
                data: None,
                error: Some(message),
            }),
        )
            .into_response(),
        _ => response.into_response(),
    }
}

/// GET /get-inventory
async fn inventory_handler(State(state): State<AppState>) -> Response {
    let service = state.service;
    listing_response(run_blocking("list products", move || service.list_products()).await)
}

/// GET /export-csv?items=["sku", ...]
async fn export_handler(
    State(state): State<AppState>,
    Query(params): Query<ItemsParams>,
) -> ServiceResponse {
    let service = state.service;
    run_blocking("export", move || service.export_csv(params.items.as_deref())).await
}

/// Pull the `file` field out of a multipart body
async fn read_upload(mut multipart: Multipart) -> Result<Option<Upload>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            let filename = field.file_name().map(str::to_owned);
            let bytes = field.bytes().await?.to_vec();
            return Ok(Some(Upload { filename, bytes }));
        }
    }
    Ok(None)
}

/// POST /import-csv (multipart/form-data with a `file` field)
async fn import_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServiceResponse {
    let upload = match multipart {
        Ok(multipart) => read_upload(multipart).await,
        Err(rejection) => {
            log::warn!("import rejected: {}", rejection.body_text());
            return ServiceResponse::client_error(rejection.body_text());
        }
    };

    let upload = match upload {
        Ok(upload) => upload,
        Err(e) => {
            log::warn!("import rejected: malformed multipart body: {}", e);
            return ServiceResponse::client_error(e.body_text());
        }
    };

    let service = state.service;
    run_blocking("import", move || service.import_csv(upload)).await
}

/// POST /add-product {"sku", "name", "quantity"}
async fn add_product_handler(
    State(state): State<AppState>,
    payload: Result<Json<AddProductRequest>, JsonRejection>,
) -> ServiceResponse {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_body("add product", rejection),
    };

    let service = state.service;
    run_blocking("add product", move || service.add_product(request)).await
}

/// DELETE /delete-products?items=["sku", ...]
async fn delete_products_handler(
    State(state): State<AppState>,
    Query(params): Query<ItemsParams>,
) -> ServiceResponse {
    let service = state.service;
    run_blocking("delete products", move || {
        service.delete_products(params.items.as_deref())
    })
    .await
}

/// POST /change-name {"sku", "new_name"}
async fn change_name_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChangeNameRequest>, JsonRejection>,
) -> ServiceResponse {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_body("change name", rejection),
    };

    let service = state.service;
    run_blocking("change name", move || service.change_name(request)).await
}

/// POST /update-quantity {"sku", "operation", "count"}
async fn update_quantity_handler(
    State(state): State<AppState>,
    payload: Result<Json<UpdateQuantityRequest>, JsonRejection>,
) -> ServiceResponse {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_body("update quantity", rejection),
    };

    let service = state.service;
    run_blocking("update quantity", move || service.update_quantity(request)).await
}

/// Build the web server router
///
/// When `static_dir` is given, unmatched paths are served from it.
pub fn create_router(service: Arc<InventoryService>, static_dir: Option<&Path>) -> Router {
    let state = AppState { service };

    let router = Router::new()
        .route("/get-inventory", get(inventory_handler))
        .route("/export-csv", get(export_handler))
        .route("/import-csv", post(import_handler))
        .route("/add-product", post(add_product_handler))
        .route("/delete-products", delete(delete_products_handler))
        .route("/change-name", post(change_name_handler))
        .route("/update-quantity", post(update_quantity_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state);

    match static_dir {
        Some(dir) => {
            log::info!("Serving static files from {}", dir.display());
            router.fallback_service(ServeDir::new(dir))
        }
        None => router,
    }
}

/// Start the web server and run until Ctrl-C
pub async fn serve(service: Arc<InventoryService>, config: &Config) -> std::io::Result<()> {
    let app = create_router(service, config.static_dir.as_deref());
    let addr = config.bind_addr();

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Inventory server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received, stopping server");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Inventory;
    use crate::models::Product;
    use crate::pool::ConnectionPool;
    use tempfile::TempDir;

    fn create_test_service() -> (Arc<InventoryService>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let inventory = Arc::new(Inventory::open_in_memory().unwrap());
        let service = Arc::new(InventoryService::new(inventory, temp_dir.path()));
        (service, temp_dir)
    }

    #[test]
    fn test_create_router() {
        let (service, _temp_dir) = create_test_service();
        let _router = create_router(service, None);
    }

    #[test]
    fn test_create_router_with_static_dir() {
        let (service, temp_dir) = create_test_service();
        let _router = create_router(service, Some(temp_dir.path()));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(Outcome::Success), StatusCode::OK);
        assert_eq!(status_for(Outcome::ClientError), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(Outcome::ServerError),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_csv_response_headers() {
        let response = ServiceResponse {
            outcome: Outcome::Success,
            payload: Payload::Csv("sku,name,quantity\n".to_string()),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains(EXPORT_FILENAME));
    }

    #[test]
    fn test_client_error_response_status() {
        let response = ServiceResponse::client_error("nope").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_listing_failure_is_json_error() {
        let temp_dir = TempDir::new().unwrap();
        let inventory = Inventory::new(ConnectionPool::in_memory().unwrap(), "never_created");
        let service = InventoryService::new(Arc::new(inventory), temp_dir.path());

        let response = listing_response(service.list_products());

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_listing_success_is_json_data() {
        let (service, _temp_dir) = create_test_service();
        service.inventory().add("S1", "Widget", 2).unwrap();

        let response = listing_response(service.list_products());

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_api_response_serialization() {
        let response = ApiResponse {
            success: true,
            data: Some(vec![Product::new("S1", "Widget", 2)]),
            error: None,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"success\":true"));
        assert!(json.contains("\"sku\":\"S1\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_api_response_error_serialization() {
        let response: ApiResponse<()> = ApiResponse {
            success: false,
            data: None,
            error: Some("Test error".to_string()),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"success\":false"));
        assert!(json.contains("\"error\":\"Test error\""));
        assert!(!json.contains("\"data\""));
    }
}
