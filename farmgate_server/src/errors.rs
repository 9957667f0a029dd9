use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use farmgate_engine::SettlementError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error. {0}")]
    CouldNotDeserializePayload(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the current state. {0}")]
    Conflict(String),
    #[error("{0}")]
    UnsupportedAction(String),
    #[error("The payment provider is unavailable. {0}")]
    ProviderUnavailable(String),
    #[error("The payment provider rejected the request. {0}")]
    ProviderRejected(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CouldNotDeserializePayload(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedAction(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ProviderRejected(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<SettlementError> for ServerError {
    fn from(e: SettlementError) -> Self {
        match e {
            SettlementError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            SettlementError::TransactionNotFound(_) | SettlementError::OrderNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            SettlementError::OrderAlreadyPaid(_) | SettlementError::NotSettled { .. } => Self::Conflict(e.to_string()),
            SettlementError::ProviderVerificationFailed(ref inner) if inner.is_recoverable() => {
                Self::ProviderUnavailable(e.to_string())
            },
            SettlementError::ProviderVerificationFailed(_) => Self::ConfigurationError(e.to_string()),
            SettlementError::PaymentInitializationFailed(_) => Self::ProviderRejected(e.to_string()),
            SettlementError::UnsupportedAction(_) => Self::UnsupportedAction(e.to_string()),
            SettlementError::InvalidReference(_) => Self::InvalidRequestPath(e.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use gateway_tools::{GatewayError, Provider};

    use super::*;

    #[test]
    fn settlement_errors_map_to_status_codes() {
        let status = |e: SettlementError| ServerError::from(e).status_code();
        assert_eq!(status(SettlementError::TransactionNotFound("FG-1-a".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(SettlementError::OrderAlreadyPaid(1)), StatusCode::CONFLICT);
        assert_eq!(
            status(SettlementError::ProviderVerificationFailed(GatewayError::Timeout(10))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(SettlementError::ProviderVerificationFailed(GatewayError::MissingCredentials(Provider::Paystack))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status(SettlementError::InvalidReference("a b".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(SettlementError::UnsupportedAction("Refunds".into())), StatusCode::BAD_REQUEST);
    }
}
