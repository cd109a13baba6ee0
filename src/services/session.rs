use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Header carrying the authenticated operator's e-mail address.
///
/// Authentication itself happens upstream (reverse proxy or identity
/// gateway); this backend trusts the forwarded identity and uses it only to
/// scope requests to the operator's organization.
pub const OPERATOR_EMAIL_HEADER: &str = "x-operator-email";

/// Identity of the operator making the request.
#[derive(Debug, Clone)]
pub struct Session {
    /// Normalized (lowercased, trimmed) operator e-mail.
    pub operator_email: String,
}

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(OPERATOR_EMAIL_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized(format!("missing {OPERATOR_EMAIL_HEADER} header"))
            })?;

        if !value.contains('@') {
            return Err(AppError::Unauthorized(
                "malformed operator e-mail".to_string(),
            ));
        }

        Ok(Session {
            operator_email: value.to_ascii_lowercase(),
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<Session, AppError> {
        let (mut parts, _body) = request.into_parts();
        Session::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn extracts_and_normalizes_the_operator_email() {
        let request = Request::builder()
            .header(OPERATOR_EMAIL_HEADER, "  Clinic@Example.COM ")
            .body(())
            .unwrap();
        let session = extract(request).await.unwrap();
        assert_eq!(session.operator_email, "clinic@example.com");
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let request = Request::builder().body(()).unwrap();
        assert!(matches!(
            extract(request).await.unwrap_err(),
            AppError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn a_value_without_an_at_sign_is_rejected() {
        let request = Request::builder()
            .header(OPERATOR_EMAIL_HEADER, "not-an-email")
            .body(())
            .unwrap();
        assert!(matches!(
            extract(request).await.unwrap_err(),
            AppError::Unauthorized(_)
        ));
    }
}
