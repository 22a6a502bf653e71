//! `OpenAPI` documentation for the ops API.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Security scheme modifier for Bearer authentication.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// `OpenAPI` documentation for the comp-leave surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "tabula ops API",
        version = "0.1.0",
        description = "Compensatory-leave ledger and expiry-to-pay conversion"
    ),
    paths(
        tabula_api_leave::handlers::execute_job,
        tabula_api_leave::handlers::job_history,
        tabula_api_leave::handlers::create_grant,
        tabula_api_leave::handlers::list_grants,
        tabula_api_leave::handlers::user_balance,
    ),
    components(schemas(
        tabula_api_leave::ErrorResponse,
        tabula_api_leave::models::ExecuteJobRequest,
        tabula_api_leave::models::ExpiryRunResponse,
        tabula_api_leave::models::ExecutionEntryResponse,
        tabula_api_leave::models::HistoryResponse,
        tabula_api_leave::models::CreateGrantRequest,
        tabula_api_leave::models::GrantResponse,
        tabula_api_leave::models::GrantListResponse,
        tabula_api_leave::models::BalanceResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "cron", description = "Batch job trigger and audit trail"),
        (name = "comp-leave", description = "Comp-hour grants and balances"),
    )
)]
pub struct ApiDoc;
