use crate::core::{ImageKind, Session, SessionState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Request types
#[derive(Deserialize, Debug, Clone)]
pub struct SelectForm {
    pub quality: u32,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct DownloadQuery {
    pub quality: Option<u32>,
}

// Response types
#[derive(Serialize, Debug, Clone)]
pub struct SessionReport {
    pub id: String,
    pub state: SessionState,
    pub filename: Option<String>,
    pub format: Option<ImageKind>,
    pub original_size_mb: Option<f64>,
    pub threshold_mb: f64,
    pub needs_optimization: bool,
    pub variants: Vec<VariantReport>,
    pub selected_quality: Option<u8>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone)]
pub struct VariantReport {
    pub quality: u8,
    pub simulated_size_bytes: usize,
    pub simulated_size_mb: f64,
    pub download_url: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct HealthResponse {
    pub status: String,
    pub sessions: usize,
}

impl SessionReport {
    pub fn from_session(session: &Session) -> Self {
        let id = session.id().to_string();
        let variants = session
            .variants()
            .iter()
            .map(|variant| VariantReport {
                quality: variant.quality.percent(),
                simulated_size_bytes: variant.simulated_size_bytes(),
                simulated_size_mb: variant.simulated_size_mb(),
                download_url: format!(
                    "/sessions/{}/download?quality={}",
                    id,
                    variant.quality.percent()
                ),
            })
            .collect::<Vec<_>>();

        Self {
            needs_optimization: !variants.is_empty(),
            state: session.state(),
            filename: session.uploaded().map(|image| image.filename().to_string()),
            format: session.uploaded().map(|image| image.kind()),
            original_size_mb: session.original_size_mb(),
            threshold_mb: session.settings().threshold_mb,
            selected_quality: session.selected_quality().map(|quality| quality.percent()),
            created_at: session.created_at(),
            last_active: session.last_active(),
            variants,
            id,
        }
    }
}
