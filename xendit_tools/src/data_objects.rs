use chrono::{DateTime, Utc};
use cpg_common::{Rupiah, IDR_CURRENCY_CODE};
use serde::{Deserialize, Serialize};

/// One display line on the hosted invoice. Mirrors the order's line items so the payer sees exactly what was
/// priced at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub name: String,
    pub quantity: i64,
    pub price: Rupiah,
}

/// The body of a `POST /v2/invoices` call.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceRequest {
    /// Our correlation id. The provider echoes this back on every webhook for the invoice.
    pub external_id: String,
    pub amount: Rupiah,
    pub currency: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_email: Option<String>,
    pub invoice_duration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_redirect_url: Option<String>,
    pub items: Vec<InvoiceItem>,
}

impl InvoiceRequest {
    pub fn new(external_id: String, amount: Rupiah, description: String) -> Self {
        Self {
            external_id,
            amount,
            currency: IDR_CURRENCY_CODE.to_string(),
            description,
            payer_email: None,
            invoice_duration: 86_400,
            success_redirect_url: None,
            failure_redirect_url: None,
            items: Vec::new(),
        }
    }
}

/// The subset of the provider's invoice representation the gateway cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub external_id: String,
    pub status: String,
    pub invoice_url: String,
    pub amount: Rupiah,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
}
