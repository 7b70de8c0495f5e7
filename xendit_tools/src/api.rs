use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{config::XenditConfig, data_objects::InvoiceRequest, Invoice, XenditApiError};

#[derive(Clone)]
pub struct XenditApi {
    config: XenditConfig,
    client: Arc<Client>,
}

impl XenditApi {
    pub fn new(config: XenditConfig) -> Result<Self, XenditApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| XenditApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Sends one authenticated REST call. Xendit uses HTTP basic auth with the secret key as the username and an
    /// empty password.
    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, XenditApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {url}");
        let mut req =
            self.client.request(method, url).basic_auth(self.config.secret_key.reveal(), Option::<&str>::None);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| XenditApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| XenditApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| XenditApiError::RestResponseError(e.to_string()))?;
            Err(XenditApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// Creates a hosted invoice for an order. The returned invoice carries the provider's invoice id and the URL
    /// the payer is redirected to.
    pub async fn create_invoice(&self, mut request: InvoiceRequest) -> Result<Invoice, XenditApiError> {
        request.invoice_duration = self.config.invoice_duration_secs;
        debug!("Creating invoice for {}", request.external_id);
        let invoice = self.rest_query::<Invoice, InvoiceRequest>(Method::POST, "/v2/invoices", Some(request)).await?;
        info!("Created invoice {} ({})", invoice.id, invoice.external_id);
        Ok(invoice)
    }
}
