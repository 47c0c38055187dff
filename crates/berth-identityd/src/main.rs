use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use berth_client::HttpRegistryClient;
use berth_core::{
    Company, CredentialAuthority, CredentialOutcome, DiscoveryConfig, IdentityStore,
    LifecycleManager, LocalAuthority, SHUTDOWN_GRACE, shutdown_signal,
};
use berth_db::DbIdentityStore;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;
use metrics_exporter_prometheus::PrometheusBuilder;

#[derive(Clone)]
struct AppState {
    store: Arc<DbIdentityStore>,
    authority: Arc<LocalAuthority>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        register_company,
        get_company,
        validate_credentials,
        health_check,
    ),
    components(
        schemas(
            RegisterCompanyRequest,
            ValidateCredentialsRequest,
            ValidateCredentialsResponse,
            berth_core::company::Company,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize metrics
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).ok();

    let db_path = std::env::var("DATABASE_URL").unwrap_or_else(|_| "berth-identity.db".to_string());
    let store = Arc::new(DbIdentityStore::new(&db_path).expect("Failed to open database"));
    let authority = Arc::new(LocalAuthority::new(store.clone()));

    let mut discovery = DiscoveryConfig::from_env();
    if discovery.service_name.is_empty() {
        discovery.service_name = "identity-service".to_string();
    }
    if discovery.health_check_url.is_empty() {
        discovery.health_check_url =
            format!("http://localhost:{}/health", discovery.service_port);
    }
    let service_port = discovery.service_port;

    let registry = Arc::new(HttpRegistryClient::new(&discovery.registry_address));
    let lifecycle = LifecycleManager::new(discovery, registry);

    // A service must never serve traffic believing itself discoverable when
    // it is not: a failed registration aborts startup.
    lifecycle
        .start()
        .await
        .expect("failed to register with the service registry");

    let state = AppState { store, authority };

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health_check))
        .route("/metrics", get(move || {
            let rendered = handle.render();
            async move { rendered }
        }))
        .route("/api/companies", post(register_company))
        .route("/api/companies/:id", get(get_company))
        .route("/api/companies/validate", post(validate_credentials))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], service_port));
    tracing::info!("listening on {}", addr);

    let server = axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        tracing::error!("server error: {}", e);
    }

    // The signal hook races this call; stop is idempotent so whichever path
    // runs second finds nothing left to deregister.
    if tokio::time::timeout(SHUTDOWN_GRACE, lifecycle.stop())
        .await
        .is_err()
    {
        tracing::warn!("deregistration did not finish within the shutdown grace period");
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
struct RegisterCompanyRequest {
    #[schema(example = "Acme Freight")]
    name: String,
}

#[utoipa::path(
    post,
    path = "/api/companies",
    request_body = RegisterCompanyRequest,
    responses(
        (status = 201, description = "Company registered; credentials are returned exactly once", body = Company),
        (status = 400, description = "Blank company name"),
        (status = 500, description = "Store failure")
    )
)]
async fn register_company(
    State(state): State<AppState>,
    Json(payload): Json<RegisterCompanyRequest>,
) -> impl IntoResponse {
    if payload.name.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Company name must not be blank").into_response();
    }

    let company = Company::new(payload.name.trim());
    match state.store.insert(&company) {
        Ok(()) => (StatusCode::CREATED, Json(company)).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to persist company");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed").into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/companies/{id}",
    responses(
        (status = 200, description = "Company found", body = Company),
        (status = 400, description = "Invalid company ID"),
        (status = 404, description = "Company not found")
    ),
    params(("id" = String, Path, description = "Company ID"))
)]
async fn get_company(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let id = match uuid::Uuid::parse_str(&id) {
        Ok(id) => id,
        Err(_) => return (StatusCode::BAD_REQUEST, "Invalid company ID").into_response(),
    };

    match state.store.find_by_id(&id) {
        Ok(Some(company)) => (StatusCode::OK, Json(company)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Company not found").into_response(),
        Err(err) => {
            tracing::error!(error = %err, "company lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed").into_response()
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct ValidateCredentialsRequest {
    api_key: String,
    api_secret: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct ValidateCredentialsResponse {
    company_id: uuid::Uuid,
}

#[utoipa::path(
    post,
    path = "/api/companies/validate",
    request_body = ValidateCredentialsRequest,
    responses(
        (status = 200, description = "Credentials valid", body = ValidateCredentialsResponse),
        (status = 401, description = "Unknown key or wrong secret; the two are not distinguished")
    )
)]
async fn validate_credentials(
    State(state): State<AppState>,
    Json(payload): Json<ValidateCredentialsRequest>,
) -> impl IntoResponse {
    match state
        .authority
        .validate(&payload.api_key, &payload.api_secret)
        .await
    {
        Ok(CredentialOutcome::Authorized { company_id }) => {
            (StatusCode::OK, Json(ValidateCredentialsResponse { company_id })).into_response()
        }
        Ok(CredentialOutcome::Unauthorized) => StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            tracing::error!(error = %err, "credential validation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed").into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "OK"))
)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}
