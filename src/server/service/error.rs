use derive_more::{Display, Error, From};
use crate::server::database::store::StoreError;

/// Business rule violations of the payment lifecycle. The display text is
/// the message handed to API callers.
#[derive(Debug, Display, Error, From)]
pub(crate) enum PaymentServiceError {
    #[display("Invalid cash desk")]
    InvalidCashDesk,
    #[display("Invalid employee")]
    InvalidEmployee,
    #[display("Invalid payment type")]
    InvalidPaymentType,
    #[display("Open payment for cashdesk")]
    OpenPaymentForCashDesk,
    #[display("Insufficient rights to create a credit card payment.")]
    InsufficientRights,
    #[display("Payment not found")]
    PaymentNotFound,
    #[display("Payment already confirmed.")]
    AlreadyConfirmed,
    #[display("Invalid price")]
    InvalidPrice,
    #[display("Payment has items. Set deleteItems to true to delete them as well.")]
    PaymentHasItems,
    #[display("{_0}")]
    #[from]
    Store(StoreError),
}

impl PaymentServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PaymentServiceError::PaymentNotFound)
    }
}
