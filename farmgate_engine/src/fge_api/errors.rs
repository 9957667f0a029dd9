use gateway_tools::GatewayError;
use thiserror::Error;

use crate::{
    db_types::TransactionStatus,
    traits::{CommissionError, InventoryError, SettlementDatabaseError},
};

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("No transaction exists with reference {0}")]
    TransactionNotFound(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Order {0} has already been paid")]
    OrderAlreadyPaid(i64),
    #[error("Transaction {reference} is {status}, not completed")]
    NotSettled { reference: String, status: TransactionStatus },
    #[error("Could not verify the payment with the provider. {0}")]
    ProviderVerificationFailed(GatewayError),
    #[error("Could not initialize the payment with the provider. {0}")]
    PaymentInitializationFailed(GatewayError),
    #[error("{0} are not supported yet")]
    UnsupportedAction(String),
    #[error("Invalid payment reference: {0}")]
    InvalidReference(String),
}

impl SettlementError {
    /// True if the same request may succeed when it is tried again later.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SettlementError::ProviderVerificationFailed(e) => e.is_recoverable(),
            SettlementError::DatabaseError(_) => true,
            _ => false,
        }
    }
}

impl From<SettlementDatabaseError> for SettlementError {
    fn from(e: SettlementDatabaseError) -> Self {
        match e {
            SettlementDatabaseError::OrderNotFound(id) => SettlementError::OrderNotFound(id),
            e => SettlementError::DatabaseError(e.to_string()),
        }
    }
}

impl From<InventoryError> for SettlementError {
    fn from(e: InventoryError) -> Self {
        SettlementError::DatabaseError(e.to_string())
    }
}

impl From<CommissionError> for SettlementError {
    fn from(e: CommissionError) -> Self {
        SettlementError::DatabaseError(e.to_string())
    }
}
