use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use crate::server::controller::error::CustomError;
use crate::server::database::store::PaymentStore;
use crate::server::model::item::NewPaymentItemCommand;
use crate::server::model::payment::NewPaymentCommand;
use crate::server::model::{DeletePaymentParams, PaymentFilter};
use crate::server::service::payment::DeleteOutcome;
use crate::server::state::AppState;

fn payment_location(id: i64) -> String {
    format!("/api/payments/{id}")
}

/// list payments, optionally only of one cash desk and from a given date on
pub(crate) async fn get_payments<S: PaymentStore>(
    req: HttpRequest,
    data: web::Data<AppState<S>>,
) -> Result<HttpResponse, CustomError> {
    let filter = web::Query::<PaymentFilter>::from_query(req.query_string())
        .map_err(|e| CustomError::BadRequest(e.to_string()))?
        .into_inner();
    let payments = data.payments().list_payments(&filter).await?;
    Ok(HttpResponse::Ok().json(payments))
}

/// get one payment with its items
pub(crate) async fn get_payment<S: PaymentStore>(
    id: web::Path<i64>,
    data: web::Data<AppState<S>>,
) -> Result<HttpResponse, CustomError> {
    match data.payments().get_payment(id.into_inner()).await? {
        Some(payment) => Ok(HttpResponse::Ok().json(payment)),
        None => Err(CustomError::ResourceNotFound),
    }
}

/// open a payment on a cash desk
pub(crate) async fn post_payment<S: PaymentStore>(
    body: web::Json<NewPaymentCommand>,
    data: web::Data<AppState<S>>,
) -> Result<HttpResponse, CustomError> {
    let payment = data
        .payments()
        .create_payment(&body)
        .await
        .map_err(CustomError::bad_request)?;
    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, payment_location(payment.id)))
        .json(payment))
}

/// confirm (close) a payment
pub(crate) async fn patch_payment<S: PaymentStore>(
    id: web::Path<i64>,
    data: web::Data<AppState<S>>,
) -> Result<HttpResponse, CustomError> {
    data.payments().confirm_payment(id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// add an item to an open payment
pub(crate) async fn post_payment_item<S: PaymentStore>(
    id: web::Path<i64>,
    body: web::Json<NewPaymentItemCommand>,
    data: web::Data<AppState<S>>,
) -> Result<HttpResponse, CustomError> {
    let id = id.into_inner();
    if id != body.payment_id {
        return Err(CustomError::BadRequest("PaymentId in URL and body must match".to_string()));
    }
    let item = data
        .payments()
        .add_payment_item(&body)
        .await
        .map_err(CustomError::bad_request)?;
    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, payment_location(id)))
        .json(item))
}

/// delete a payment, its items only with `deleteItems=true`
pub(crate) async fn delete_payment<S: PaymentStore>(
    id: web::Path<i64>,
    req: HttpRequest,
    data: web::Data<AppState<S>>,
) -> Result<HttpResponse, CustomError> {
    let DeletePaymentParams { delete_items } = web::Query::<DeletePaymentParams>::from_query(req.query_string())
        .map_err(|e| CustomError::BadRequest(e.to_string()))?
        .into_inner();
    match data.payments().delete_payment(id.into_inner(), delete_items).await? {
        DeleteOutcome::Deleted => Ok(HttpResponse::NoContent().finish()),
        DeleteOutcome::Absent => Err(CustomError::ResourceNotFound),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::body::MessageBody;
    use actix_web::dev::ServiceResponse;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use chrono::{DateTime, Utc};
    use serde_json::{json, Value};
    use crate::server::database::memory::MemoryStore;
    use crate::server::routes::configure;
    use crate::server::util::time::helper::set_utc_now;
    use super::*;

    macro_rules! init_app {
        ($store:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(AppState::new($store)))
                    .configure(configure::<MemoryStore>),
            )
            .await
        };
    }

    async fn read_json<B: MessageBody>(resp: ServiceResponse<B>) -> Value {
        test::read_body_json(resp).await
    }

    fn create_request(cash_desk_id: i32, employee_id: i32, payment_type: &str) -> test::TestRequest {
        test::TestRequest::post().uri("/api/payments").set_json(json!({
            "cashDeskId": cash_desk_id,
            "employeeId": employee_id,
            "paymentType": payment_type,
        }))
    }

    fn item_request(path_id: i64, payment_id: i64) -> test::TestRequest {
        test::TestRequest::post()
            .uri(&format!("/api/payments/{path_id}/items"))
            .set_json(json!({
                "paymentId": payment_id,
                "articleName": "Coffee",
                "amount": 2,
                "price": 3.5,
            }))
    }

    #[actix_web::test]
    async fn post_payment_created() {
        let app = init_app!(MemoryStore::seeded());

        let resp = test::call_service(&app, create_request(1, 1001, "CreditCard").to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/api/payments/1");
        let body = read_json(resp).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["cashDeskNumber"], 1);
        assert_eq!(body["employeeRegistrationNumber"], 1001);
        assert_eq!(body["paymentType"], "CreditCard");
        assert_eq!(body["confirmed"], Value::Null);
    }

    #[actix_web::test]
    async fn post_payment_rejected_with_reason() {
        let app = init_app!(MemoryStore::seeded());

        let resp = test::call_service(&app, create_request(1, 1002, "CreditCard").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = read_json(resp).await;
        assert_eq!(body["detail"], "Insufficient rights to create a credit card payment.");

        let resp = test::call_service(&app, create_request(42, 1002, "Cash").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(resp).await["detail"], "Invalid cash desk");
    }

    #[actix_web::test]
    async fn post_payment_malformed_body() {
        let app = init_app!(MemoryStore::seeded());
        let req = test::TestRequest::post()
            .uri("/api/payments")
            .set_json(json!({ "cashDeskId": "one" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn get_payment_by_id() {
        let app = init_app!(MemoryStore::seeded());
        test::call_service(&app, create_request(1, 1002, "Cash").to_request()).await;
        test::call_service(&app, item_request(1, 1).to_request()).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/payments/1").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = read_json(resp).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["items"][0]["articleName"], "Coffee");

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/payments/999").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn get_payments_with_filters() {
        let app = init_app!(MemoryStore::seeded());
        set_utc_now(DateTime::<Utc>::from_timestamp(1_715_500_000, 0).unwrap()); // 2024-05-12
        test::call_service(&app, create_request(2, 1002, "Cash").to_request()).await;
        set_utc_now(DateTime::<Utc>::from_timestamp(1_715_600_000, 0).unwrap()); // 2024-05-13
        test::call_service(&app, create_request(1, 1001, "Maestro").to_request()).await;

        let cases = [
            ("/api/payments", 2),
            ("/api/payments?cashDesk=1", 1),
            ("/api/payments?dateFrom=2024-05-13", 1),
            ("/api/payments?dateFrom=2024-05-13&cashDesk=1", 1),
            ("/api/payments?dateFrom=2024-05-13&cashDesk=2", 0),
        ];
        for (uri, expected) in cases {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
            let body = read_json(resp).await;
            assert_eq!(body.as_array().unwrap().len(), expected, "{uri}");
        }

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/payments?dateFrom=yesterday").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn patch_payment_status_codes() {
        let app = init_app!(MemoryStore::seeded());
        test::call_service(&app, create_request(1, 1002, "Cash").to_request()).await;

        let patch = |id: i64| test::TestRequest::patch().uri(&format!("/api/payments/{id}")).to_request();
        assert_eq!(test::call_service(&app, patch(1)).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(test::call_service(&app, patch(999)).await.status(), StatusCode::NOT_FOUND);
        let resp = test::call_service(&app, patch(1)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(resp).await["detail"], "Payment already confirmed.");
    }

    #[actix_web::test]
    async fn post_payment_item_status_codes() {
        let app = init_app!(MemoryStore::seeded());
        test::call_service(&app, create_request(1, 1002, "Cash").to_request()).await;

        let resp = test::call_service(&app, item_request(1, 1).to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = read_json(resp).await;
        assert_eq!(body["paymentId"], 1);
        assert_eq!(body["amount"], 2);

        let resp = test::call_service(&app, item_request(1, 2).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(resp).await["detail"], "PaymentId in URL and body must match");

        let resp = test::call_service(&app, item_request(999, 999).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(resp).await["detail"], "Payment not found");

        test::call_service(&app, test::TestRequest::patch().uri("/api/payments/1").to_request()).await;
        let resp = test::call_service(&app, item_request(1, 1).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(resp).await["detail"], "Payment already confirmed.");
    }

    #[actix_web::test]
    async fn post_payment_item_with_unstorable_price() {
        let app = init_app!(MemoryStore::seeded());
        test::call_service(&app, create_request(1, 1002, "Cash").to_request()).await;

        for price in ["3.999", "1000000000"] {
            let req = test::TestRequest::post()
                .uri("/api/payments/1/items")
                .set_json(json!({
                    "paymentId": 1,
                    "articleName": "Coffee",
                    "amount": 1,
                    "price": price,
                }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(read_json(resp).await["detail"], "Invalid price");
        }
    }

    #[actix_web::test]
    async fn delete_payment_status_codes() {
        let app = init_app!(MemoryStore::seeded());
        test::call_service(&app, create_request(1, 1002, "Cash").to_request()).await;
        test::call_service(&app, item_request(1, 1).to_request()).await;
        let delete = |uri: &str| test::TestRequest::delete().uri(uri).to_request();

        let resp = test::call_service(&app, delete("/api/payments/1")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_json(resp).await["detail"],
            "Payment has items. Set deleteItems to true to delete them as well."
        );
        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/payments/1").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(&app, delete("/api/payments/1?deleteItems=true")).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let resp = test::call_service(&app, delete("/api/payments/1")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = test::call_service(&app, delete("/api/payments/999?deleteItems=false")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
