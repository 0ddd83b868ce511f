use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::{BookingDraft, Catalog};

/// Artificial delay before a demo-mode submission reports success.
pub const DEMO_SEND_DELAY: Duration = Duration::from_millis(700);

#[derive(Debug, Clone, Serialize)]
pub struct LeadPhone {
    #[serde(rename = "VALUE")]
    pub value: String,
    #[serde(rename = "VALUE_TYPE")]
    pub value_type: &'static str,
}

/// Bitrix lead field set. Field names follow the CRM's REST conventions,
/// including the salon's custom `UF_CRM_BOOKING_*` fields.
#[derive(Debug, Clone, Serialize)]
pub struct LeadFields {
    #[serde(rename = "TITLE")]
    pub title: String,
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "PHONE")]
    pub phone: Vec<LeadPhone>,
    #[serde(rename = "COMMENTS")]
    pub comments: String,
    #[serde(rename = "SOURCE_ID")]
    pub source_id: &'static str,
    #[serde(rename = "UF_CRM_BOOKING_DATE")]
    pub booking_date: String,
    #[serde(rename = "UF_CRM_BOOKING_TIME")]
    pub booking_time: String,
    #[serde(rename = "UF_CRM_BOOKING_SERVICE")]
    pub booking_service: String,
    #[serde(rename = "UF_CRM_BOOKING_MASTER")]
    pub booking_master: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadRecord {
    pub fields: LeadFields,
}

impl LeadRecord {
    /// Compose the CRM lead from a draft. Total: missing references fall
    /// back to placeholders rather than failing, since the wizard gates
    /// normally guarantee a complete draft before this runs.
    pub fn from_draft(draft: &BookingDraft, catalog: &Catalog) -> Self {
        let service = draft.service_id.as_deref().and_then(|id| catalog.service(id));
        let master = draft.staff_id.as_deref().and_then(|id| catalog.staff_member(id));

        let service_name = service.map_or("Service", |s| s.name.as_str());
        let master_name = master.map_or("Unassigned", |m| m.name.as_str());
        let duration = service.map_or_else(|| "?".to_string(), |s| s.duration_minutes.to_string());
        let price = service.map_or_else(|| "?".to_string(), |s| s.price_gel.to_string());
        let time = draft.time.as_deref().unwrap_or("");

        let mut comments = vec![
            format!("Service: {service_name} ({duration} min / {price} GEL)"),
            format!("Master: {master_name}"),
            format!("When: {} {time}", draft.date),
        ];
        if !draft.note.trim().is_empty() {
            comments.push(format!("Note: {}", draft.note));
        }

        Self {
            fields: LeadFields {
                title: format!("Online Booking: {service_name} — {} {time}", draft.date),
                name: draft.name.clone(),
                phone: vec![LeadPhone {
                    value: draft.phone.clone(),
                    value_type: "WORK",
                }],
                comments: comments.join("\n"),
                source_id: "WEB",
                booking_date: draft.date.clone(),
                booking_time: time.to_string(),
                booking_service: service.map(|s| s.name.clone()).unwrap_or_default(),
                booking_master: master.map(|m| m.name.clone()).unwrap_or_default(),
            },
        }
    }
}

#[async_trait]
pub trait CrmSink: Send + Sync {
    async fn create_lead(&self, lead: &LeadRecord) -> anyhow::Result<()>;
}

/// One fire-and-forget POST to a Bitrix-style inbound webhook. No retry, no
/// reconciliation; the URL is expected to carry the access token.
pub struct BitrixWebhook {
    url: String,
    client: reqwest::Client,
}

impl BitrixWebhook {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CrmSink for BitrixWebhook {
    async fn create_lead(&self, lead: &LeadRecord) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(lead)
            .send()
            .await
            .context("failed to reach CRM webhook")?
            .error_for_status()
            .context("CRM webhook returned error status")?;

        Ok(())
    }
}
