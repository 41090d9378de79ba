use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use common::models::{Country, HealthResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::list_countries,
        handlers::country_by_name,
        handlers::countries_by_codes,
        handlers::weather,
        handlers::geocode,
        handlers::currency,
    ),
    components(schemas(
        Country,
        HealthResponse,
    )),
    tags(
        (name = "countries", description = "Cached country data"),
        (name = "passthrough", description = "Upstream APIs with server-side keys"),
    ),
)]
struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
