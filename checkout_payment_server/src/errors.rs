use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use checkout_payment_engine::PaymentGatewayError;
use thiserror::Error;
use xendit_tools::XenditApiError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Cannot create order. {message}")]
    InvalidOrder { code: &'static str, message: String },
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("The provider event payload was unusable. {0}")]
    MalformedEvent(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Could not complete the call to the payment provider. {0}")]
    ProviderError(String),
    /// Compare-and-swap contention or store unavailability. The provider's own webhook redelivery is the outer
    /// retry loop for this.
    #[error("The order could not be updated right now. {0}")]
    TransientStoreError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidOrder { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::MalformedEvent(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::InvalidApiKey => StatusCode::UNAUTHORIZED,
                AuthError::ForbiddenPeer => StatusCode::FORBIDDEN,
            },
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::ProviderError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::TransientStoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Error bodies carry a message and a stable `code`; raw provider payloads never leak through here.
    fn error_response(&self) -> HttpResponse {
        let code = match self {
            Self::InvalidOrder { code, .. } => *code,
            Self::MalformedEvent(_) => "malformed_event",
            Self::AuthenticationError(_) => "unauthorized",
            Self::NoRecordFound(_) => "not_found",
            Self::ProviderError(_) => "provider_unavailable",
            Self::TransientStoreError(_) => "try_again",
            _ => "internal_error",
        };
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string(), "code": code }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("The admin API key is not valid.")]
    InvalidApiKey,
    #[error("Access denied for this peer.")]
    ForbiddenPeer,
}

impl From<PaymentGatewayError> for ServerError {
    fn from(e: PaymentGatewayError) -> Self {
        match e {
            PaymentGatewayError::InvalidOrder(m) => Self::InvalidOrder { code: "invalid_items", message: m },
            PaymentGatewayError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id} does not exist")),
            PaymentGatewayError::OrderModificationNoOp => {
                Self::InvalidOrder { code: "no_op", message: "The order is already in that state".into() }
            },
            PaymentGatewayError::StaleOrderState(id) => {
                Self::TransientStoreError(format!("Order {id} was modified concurrently"))
            },
            PaymentGatewayError::UnmatchedEvent(ext) => {
                Self::NoRecordFound(format!("No order matches correlation id '{ext}'"))
            },
            PaymentGatewayError::DatabaseError(m) => Self::BackendError(m),
        }
    }
}

impl From<XenditApiError> for ServerError {
    fn from(e: XenditApiError) -> Self {
        Self::ProviderError(e.to_string())
    }
}
