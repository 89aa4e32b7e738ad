//! Scannable code image generation for invites and passes

use async_trait::async_trait;
use reqwest::Client;

use crate::{
    config::CodesConfig,
    error::{AppError, AppResult},
    models::{invite::Invite, visitor::Visitor},
};

use super::storage::{object_key, ObjectStore};

/// Error correction level of a rendered code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorCorrection {
    Low,
    #[default]
    Medium,
    Quartile,
    High,
}

impl ErrorCorrection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCorrection::Low => "L",
            ErrorCorrection::Medium => "M",
            ErrorCorrection::Quartile => "Q",
            ErrorCorrection::High => "H",
        }
    }
}

impl std::str::FromStr for ErrorCorrection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Ok(ErrorCorrection::Low),
            "M" => Ok(ErrorCorrection::Medium),
            "Q" => Ok(ErrorCorrection::Quartile),
            "H" => Ok(ErrorCorrection::High),
            other => Err(AppError::Validation(format!(
                "'{}' is not an error correction level (expected L, M, Q or H)",
                other
            ))),
        }
    }
}

/// Visual options of a rendered code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeStyle {
    /// Edge length in pixels; `None` uses the renderer's configured size
    pub size: Option<u32>,
    pub error_correction: ErrorCorrection,
    /// `#rrggbb`
    pub background: String,
    /// `#rrggbb`
    pub foreground: String,
}

impl Default for CodeStyle {
    fn default() -> Self {
        Self {
            size: None,
            error_correction: ErrorCorrection::default(),
            background: "#ffffff".to_string(),
            foreground: "#000000".to_string(),
        }
    }
}

/// Renders a scannable image encoding a text payload
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeRenderer: Send + Sync {
    async fn render(&self, payload: &str, style: &CodeStyle) -> AppResult<Vec<u8>>;
}

/// Payload encoded in the invite code image
pub fn invite_payload(invite: &Invite) -> String {
    format!(
        "INVITE_ID:{} | CODE:{} | Visitor:{} | Email:{} | Visit:{}",
        invite.id,
        invite.invite_code,
        invite.visitor_name,
        invite.visitor_email,
        invite.visit_time.format("%Y-%m-%d %H:%M")
    )
}

/// Payload encoded in the pass issued once the guest has been captured
pub fn pass_payload(invite: &Invite) -> String {
    format!(
        "PASS | INVITE_ID:{} | CODE:{} | Visitor:{} | Email:{} | Phone:{} | Valid until:{}",
        invite.id,
        invite.invite_code,
        invite.visitor_name,
        invite.visitor_email,
        invite.visitor_phone.as_deref().unwrap_or("-"),
        invite.expiry_time.format("%Y-%m-%d %H:%M")
    )
}

/// Payload encoded in a registered visitor's pass
pub fn visitor_pass_payload(visitor: &Visitor) -> String {
    format!(
        "PASS | VISITOR_ID:{} | Visitor:{} | Email:{} | Phone:{} | Company:{}",
        visitor.id,
        visitor.name,
        visitor.email,
        visitor.phone,
        visitor.company.as_deref().unwrap_or("-")
    )
}

/// Render `payload` and store the image under `prefix`.
///
/// Best-effort: failures are logged and yield `None`.
pub async fn render_and_store(
    codes: &dyn CodeRenderer,
    store: &dyn ObjectStore,
    payload: &str,
    prefix: &str,
) -> Option<String> {
    let result = async {
        let bytes = codes.render(payload, &CodeStyle::default()).await?;
        let key = object_key(prefix, &bytes);
        store.store(bytes, &key).await
    }
    .await;

    match result {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!("Code image generation failed for {}: {}", prefix, e);
            None
        }
    }
}

/// Renderer calling an HTTP image endpoint (`?size=NxN&data=...`)
#[derive(Clone)]
pub struct HttpCodeRenderer {
    client: Client,
    url: String,
    size: u32,
}

impl HttpCodeRenderer {
    pub fn new(config: &CodesConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.renderer_url.clone(),
            size: config.size,
        }
    }
}

#[async_trait]
impl CodeRenderer for HttpCodeRenderer {
    async fn render(&self, payload: &str, style: &CodeStyle) -> AppResult<Vec<u8>> {
        let edge = style.size.unwrap_or(self.size);
        let size = format!("{0}x{0}", edge);
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("size", size.as_str()),
                ("data", payload),
                ("ecc", style.error_correction.as_str()),
                ("color", style.foreground.trim_start_matches('#')),
                ("bgcolor", style.background.trim_start_matches('#')),
            ])
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Code renderer unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Storage(format!(
                "Code renderer returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read rendered code: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::models::status::InviteStatus;

    fn invite() -> Invite {
        let visit = Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap();
        Invite {
            id: 17,
            invited_by: 1,
            visitor_name: "Jane Doe".to_string(),
            visitor_email: "jane@x.com".to_string(),
            visitor_phone: None,
            purpose: Some("Audit".to_string()),
            visit_time: visit,
            expiry_time: visit + chrono::Duration::hours(24),
            invite_code: "AB12CD34".to_string(),
            status: InviteStatus::Created,
            image: None,
            qr_code: None,
            pass_image: None,
            check_in: None,
            checked_out: None,
            created_at: visit,
            updated_at: visit,
        }
    }

    #[test]
    fn invite_payload_lists_id_code_and_contact() {
        assert_eq!(
            invite_payload(&invite()),
            "INVITE_ID:17 | CODE:AB12CD34 | Visitor:Jane Doe | Email:jane@x.com | Visit:2025-06-02 09:30"
        );
    }

    #[test]
    fn pass_payload_marks_missing_phone() {
        let payload = pass_payload(&invite());
        assert!(payload.starts_with("PASS | INVITE_ID:17 | CODE:AB12CD34"));
        assert!(payload.contains("Phone:-"));
        assert!(payload.ends_with("Valid until:2025-06-03 09:30"));
    }

    #[test]
    fn visitor_pass_payload_names_the_visitor() {
        let now = Utc::now();
        let visitor = Visitor {
            id: 8,
            name: "Jane Roe".to_string(),
            email: "jane@x.com".to_string(),
            phone: "+1 555 0100".to_string(),
            company: None,
            purpose: None,
            image: None,
            pass_image: None,
            status: crate::models::status::VisitorStatus::Pending,
            check_in: None,
            check_out: None,
            is_active: true,
            issued_by: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(
            visitor_pass_payload(&visitor),
            "PASS | VISITOR_ID:8 | Visitor:Jane Roe | Email:jane@x.com | Phone:+1 555 0100 | Company:-"
        );
    }

    #[test]
    fn error_correction_levels_parse_case_insensitively() {
        assert_eq!("h".parse::<ErrorCorrection>().unwrap(), ErrorCorrection::High);
        assert_eq!(" L ".parse::<ErrorCorrection>().unwrap().as_str(), "L");
        assert!(matches!("X".parse::<ErrorCorrection>(), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn failed_render_stores_nothing() {
        let mut codes = MockCodeRenderer::new();
        codes
            .expect_render()
            .times(1)
            .returning(|_, _| Err(AppError::Storage("renderer down".to_string())));
        let mut store = crate::services::storage::MockObjectStore::new();
        store.expect_store().never();

        assert_eq!(render_and_store(&codes, &store, "PASS | X", "visitors/pass").await, None);
    }

    #[tokio::test]
    async fn rendered_image_is_stored_under_the_prefix() {
        let mut codes = MockCodeRenderer::new();
        codes
            .expect_render()
            .withf(|_, style| *style == CodeStyle::default())
            .returning(|_, _| Ok(vec![0x89, b'P', b'N', b'G']));
        let mut store = crate::services::storage::MockObjectStore::new();
        store
            .expect_store()
            .withf(|_, key| key.starts_with("visitors/pass/"))
            .times(1)
            .returning(|_, key| Ok(format!("http://media/{}", key)));

        let url = render_and_store(&codes, &store, "PASS | X", "visitors/pass").await;
        assert!(url.unwrap().starts_with("http://media/visitors/pass/"));
    }

    #[tokio::test]
    #[ignore] // Requires network access to the configured renderer
    async fn renders_png_from_public_endpoint() {
        let renderer = HttpCodeRenderer::new(&CodesConfig::default());
        let bytes = renderer
            .render("INVITE_ID:1 | CODE:TEST", &CodeStyle::default())
            .await
            .unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    }
}
