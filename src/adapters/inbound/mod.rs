mod api_server;

pub use api_server::{router, ApiServer, ApiState, ExportQuery, HealthResponse, ROUTE_PREFIX};
