use actix_web::{error, HttpResponse};
use actix_web::http::StatusCode;
use derive_more::{Display, Error};
use serde::Serialize;
use crate::server::database::store::StoreError;
use crate::server::service::error::PaymentServiceError;

const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

#[derive(Debug, Display, Error)]
pub(crate) enum CustomError {
    #[display("server is busy")]
    ServerIsBusy,
    #[display("timeout")]
    Timeout,
    #[display("{_0}")]
    BadRequest(#[error(not(source))] String),
    #[display("resource not found")]
    ResourceNotFound,
    #[display("database error")]
    DbError,
}

impl CustomError {
    /// Every rejection becomes a 400, including unknown payments.
    pub fn bad_request(e: PaymentServiceError) -> Self {
        match e {
            PaymentServiceError::Store(e) => e.into(),
            e => CustomError::BadRequest(e.to_string()),
        }
    }
}

impl From<StoreError> for CustomError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Busy => CustomError::ServerIsBusy,
            StoreError::Timeout => CustomError::Timeout,
            _ => CustomError::DbError,
        }
    }
}

/// Unknown payments become a 404, other rejections a 400.
impl From<PaymentServiceError> for CustomError {
    fn from(e: PaymentServiceError) -> Self {
        if e.is_not_found() {
            return CustomError::ResourceNotFound;
        }
        CustomError::bad_request(e)
    }
}

/// RFC 7807 problem document
#[derive(Debug, Serialize)]
struct Problem<'a> {
    status: u16,
    title: &'a str,
    detail: String,
}

impl error::ResponseError for CustomError {
    fn status_code(&self) -> StatusCode {
        match *self {
            CustomError::ServerIsBusy => StatusCode::SERVICE_UNAVAILABLE,
            CustomError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            CustomError::DbError => StatusCode::INTERNAL_SERVER_ERROR,
            CustomError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CustomError::ResourceNotFound => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let problem = Problem {
            status: status.as_u16(),
            title: status.canonical_reason().unwrap_or_default(),
            detail: self.to_string(),
        };
        HttpResponse::build(status)
            .content_type(PROBLEM_CONTENT_TYPE)
            .body(serde_json::to_string(&problem).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::ResponseError;

    #[test]
    fn service_errors_map_to_status_codes() {
        let cases = [
            (PaymentServiceError::PaymentNotFound, StatusCode::NOT_FOUND),
            (PaymentServiceError::AlreadyConfirmed, StatusCode::BAD_REQUEST),
            (PaymentServiceError::OpenPaymentForCashDesk, StatusCode::BAD_REQUEST),
            (PaymentServiceError::Store(StoreError::Busy), StatusCode::SERVICE_UNAVAILABLE),
            (PaymentServiceError::Store(StoreError::Timeout), StatusCode::GATEWAY_TIMEOUT),
            (PaymentServiceError::InvalidPrice, StatusCode::BAD_REQUEST),
            (PaymentServiceError::Store(StoreError::Conflict), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (e, status) in cases {
            assert_eq!(CustomError::from(e).status_code(), status);
        }
    }

    #[test]
    fn bad_request_keeps_not_found_as_400() {
        let e = CustomError::bad_request(PaymentServiceError::PaymentNotFound);
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(e.to_string(), "Payment not found");
    }

    #[actix_web::test]
    async fn error_body_is_a_problem_document() {
        let resp = CustomError::BadRequest("Open payment for cashdesk".to_string()).error_response();
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            PROBLEM_CONTENT_TYPE
        );
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], 400);
        assert_eq!(json["title"], "Bad Request");
        assert_eq!(json["detail"], "Open payment for cashdesk");
    }
}
