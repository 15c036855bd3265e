use crate::error::DomainError;
use crate::models::SmtpDomain;
use crate::service::DomainService;
use async_graphql::{Context, Error, ErrorExtensions, Object, Result};
use std::sync::Arc;

/// Organization the request acts for, resolved by an upstream auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationId(pub String);

impl ErrorExtensions for DomainError {
    fn extend(&self) -> Error {
        Error::new(self.to_string()).extend_with(|_, e| {
            e.set("code", self.code());
            e.set("retryable", self.is_retryable());
        })
    }
}

fn organization<'a>(ctx: &'a Context<'_>) -> Result<&'a str> {
    ctx.data_opt::<OrganizationId>()
        .map(|org| org.0.as_str())
        .ok_or_else(|| {
            Error::new("organization identity missing")
                .extend_with(|_, e| e.set("code", "missing_organization"))
        })
}

fn service<'a>(ctx: &'a Context<'_>) -> Result<&'a Arc<DomainService>> {
    ctx.data::<Arc<DomainService>>()
}

#[derive(Default)]
pub struct DomainQuery;

#[Object]
impl DomainQuery {
    /// Sending domain `host` of the calling organization.
    async fn smtp_domain(&self, ctx: &Context<'_>, host: String) -> Result<SmtpDomain> {
        let org = organization(ctx)?;
        service(ctx)?
            .get_domain(org, &host)
            .await
            .map_err(|e| e.extend())
    }

    /// All sending domains of the calling organization, ordered by host.
    async fn smtp_domains(&self, ctx: &Context<'_>) -> Result<Vec<SmtpDomain>> {
        let org = organization(ctx)?;
        service(ctx)?
            .list_domains(org)
            .await
            .map_err(|e| e.extend())
    }
}

#[derive(Default)]
pub struct DomainMutation;

#[Object]
impl DomainMutation {
    /// Registers a sending domain and checks its DNS records once.
    ///
    /// Registering a host twice returns the existing domain.
    async fn add_domain(
        &self,
        ctx: &Context<'_>,
        host: String,
        region: Option<String>,
    ) -> Result<SmtpDomain> {
        let org = organization(ctx)?;
        service(ctx)?
            .add_domain(org, &host, region.as_deref())
            .await
            .map_err(|e| e.extend())
    }

    /// Re-checks the DNS records of a registered domain.
    async fn verify_domain(&self, ctx: &Context<'_>, host: String) -> Result<SmtpDomain> {
        let org = organization(ctx)?;
        service(ctx)?
            .verify_domain(org, &host)
            .await
            .map_err(|e| e.extend())
    }
}
