//! Staff-generated code images

use std::sync::Arc;

use crate::{
    config::VisitsConfig,
    error::AppResult,
    models::{
        qr_code::{CreateQrCode, QrCode},
        user::UserClaims,
    },
    repository::{qr_codes::NewQrCode, Repository},
};

use super::{
    codes::{CodeRenderer, CodeStyle, ErrorCorrection},
    storage::{object_key, ObjectStore},
};

const DEFAULT_SIZE: i32 = 256;

/// Text to encode and the style to render it with.
///
/// Without `data` the code points at the frontend's self-registration page.
pub fn resolve_request(request: &CreateQrCode, frontend_url: &str) -> AppResult<(String, CodeStyle)> {
    let text = request
        .data
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}/visitor", frontend_url.trim_end_matches('/')));

    let defaults = CodeStyle::default();
    let style = CodeStyle {
        size: Some(request.size.unwrap_or(DEFAULT_SIZE).max(1) as u32),
        error_correction: request
            .error_correction
            .as_deref()
            .map(str::parse::<ErrorCorrection>)
            .transpose()?
            .unwrap_or_default(),
        background: request.background.clone().unwrap_or(defaults.background),
        foreground: request.foreground.clone().unwrap_or(defaults.foreground),
    };
    Ok((text, style))
}

#[derive(Clone)]
pub struct QrCodesService {
    repository: Repository,
    codes: Arc<dyn CodeRenderer>,
    store: Arc<dyn ObjectStore>,
    frontend_url: String,
}

impl QrCodesService {
    pub fn new(
        repository: Repository,
        codes: Arc<dyn CodeRenderer>,
        store: Arc<dyn ObjectStore>,
        visits: &VisitsConfig,
    ) -> Self {
        Self {
            repository,
            codes,
            store,
            frontend_url: visits.frontend_url.clone(),
        }
    }

    /// Codes generated by the caller, newest first
    pub async fn list(&self, actor: &UserClaims) -> AppResult<Vec<QrCode>> {
        self.repository.qr_codes.list_by_owner(actor.user_id).await
    }

    /// Render, store and record a code for the caller
    pub async fn create(&self, request: &CreateQrCode, actor: &UserClaims) -> AppResult<QrCode> {
        let (text, style) = resolve_request(request, &self.frontend_url)?;

        let bytes = self.codes.render(&text, &style).await?;
        let key = object_key("qr_codes", &bytes);
        let image = self.store.store(bytes, &key).await?;

        let mut conn = self.repository.pool.acquire().await?;
        let owner = self.repository.users.sync_principal(&mut *conn, actor).await?;
        drop(conn);

        let size = style.size.map(|s| s as i32).unwrap_or(DEFAULT_SIZE);
        let code = self
            .repository
            .qr_codes
            .insert(&NewQrCode {
                text: &text,
                image: &image,
                size,
                error_correction: style.error_correction.as_str(),
                background: &style.background,
                foreground: &style.foreground,
                created_by: owner.id,
            })
            .await?;

        tracing::info!("Code image {} generated by user {}", code.id, owner.id);
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_self_registration() {
        let (text, style) = resolve_request(&CreateQrCode::default(), "https://gate.example.com/").unwrap();
        assert_eq!(text, "https://gate.example.com/visitor");
        assert_eq!(style.size, Some(256));
        assert_eq!(style.error_correction, ErrorCorrection::Medium);
        assert_eq!(style.background, "#ffffff");
        assert_eq!(style.foreground, "#000000");
    }

    #[test]
    fn explicit_options_are_kept() {
        let request = CreateQrCode {
            data: Some("  https://example.com/wifi  ".to_string()),
            size: Some(512),
            error_correction: Some("q".to_string()),
            background: Some("#fafafa".to_string()),
            foreground: Some("#112233".to_string()),
        };
        let (text, style) = resolve_request(&request, "http://localhost:3000").unwrap();
        assert_eq!(text, "https://example.com/wifi");
        assert_eq!(style.size, Some(512));
        assert_eq!(style.error_correction, ErrorCorrection::Quartile);
        assert_eq!(style.foreground, "#112233");
    }
}
