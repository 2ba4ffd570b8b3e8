//! Viewer Session Adapter: turns request credentials into an explicit `Viewer`.

use crate::{
    domain::models::{Viewer, ViewerId},
    storage::StoreResult,
};

/// External authentication oracle: a token either maps to a viewer or it doesn't.
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    async fn identify(&self, token: &str) -> StoreResult<Option<ViewerId>>;
}

/// Transport-level credentials carried by a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext<'a> {
    /// Raw `Authorization` header value
    pub authorization: Option<&'a str>,
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Anonymous is the normal answer for unauthenticated requests, never an error.
/// A failing session lookup also degrades to Anonymous, the less privileged state.
#[tracing::instrument(level = "debug", skip_all)]
pub async fn resolve_viewer(auth: &dyn Authenticator, ctx: RequestContext<'_>) -> Viewer {
    let Some(token) = ctx.authorization.and_then(bearer_token) else {
        return Viewer::Anonymous;
    };
    match auth.identify(token).await {
        Ok(Some(viewer_id)) => Viewer::Identified(viewer_id),
        Ok(None) => {
            tracing::debug!("unknown or expired session token");
            Viewer::Anonymous
        }
        Err(e) => {
            tracing::warn!(error = %e, "session lookup failed, treating request as anonymous");
            Viewer::Anonymous
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::storage::StoreError;

    struct FixedAuth(StoreResult<Option<ViewerId>>);

    #[async_trait::async_trait]
    impl Authenticator for FixedAuth {
        async fn identify(&self, token: &str) -> StoreResult<Option<ViewerId>> {
            assert_eq!(token, "tok");
            self.0.clone()
        }
    }

    fn ctx(header: &str) -> RequestContext<'_> {
        RequestContext {
            authorization: Some(header),
        }
    }

    #[test]
    fn bearer_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer   abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer  "), None);
    }

    #[tokio::test]
    async fn known_token_is_identified() {
        let id = Uuid::new_v4();
        let auth = FixedAuth(Ok(Some(id)));
        assert_eq!(resolve_viewer(&auth, ctx("Bearer tok")).await, Viewer::Identified(id));
    }

    #[tokio::test]
    async fn missing_header_is_anonymous() {
        let auth = FixedAuth(Ok(Some(Uuid::new_v4())));
        assert_eq!(
            resolve_viewer(&auth, RequestContext::default()).await,
            Viewer::Anonymous
        );
        assert_eq!(resolve_viewer(&auth, ctx("Token tok")).await, Viewer::Anonymous);
    }

    #[tokio::test]
    async fn unknown_token_is_anonymous() {
        let auth = FixedAuth(Ok(None));
        assert_eq!(resolve_viewer(&auth, ctx("Bearer tok")).await, Viewer::Anonymous);
    }

    #[tokio::test]
    async fn lookup_failure_degrades_to_anonymous() {
        let auth = FixedAuth(Err(StoreError::Unavailable("down".into())));
        assert_eq!(resolve_viewer(&auth, ctx("Bearer tok")).await, Viewer::Anonymous);
    }
}
