use crate::models::health::HealthResponse;
use async_graphql::{Object, SimpleObject};

/// GraphQL view of [`HealthResponse`].
#[derive(SimpleObject, Debug)]
pub struct Health {
    /// "UP" while the service accepts requests
    pub status: String,
    pub version: String,
    /// RFC 3339 time of the check
    pub timestamp: String,
}

impl From<HealthResponse> for Health {
    fn from(response: HealthResponse) -> Self {
        Self {
            status: response.status,
            version: response.version,
            timestamp: response.timestamp,
        }
    }
}

#[derive(Default)]
pub struct HealthQuery;

#[Object]
impl HealthQuery {
    /// Checks service health status
    async fn health(&self) -> Health {
        Health::from(HealthResponse::up())
    }
}
