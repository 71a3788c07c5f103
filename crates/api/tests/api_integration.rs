//! Integration tests for the gateway router.

use std::sync::OnceLock;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use clients::{InMemoryCarService, InMemoryPaymentService, InMemoryRentalService};
use common::{CarUid, PaymentUid, RentalUid};
use domain::{PaymentStatus, RentalStatus};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::RetryPolicy;
use serde_json::{Value, json};
use tower::ServiceExt;

const USER: &str = "Test Max";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestGateway {
    app: axum::Router,
    cars: InMemoryCarService,
    rentals: InMemoryRentalService,
    payments: InMemoryPaymentService,
}

impl TestGateway {
    fn new() -> Self {
        let cars = InMemoryCarService::new();
        let rentals = InMemoryRentalService::new();
        let payments = InMemoryPaymentService::new();
        let state = api::create_state(
            cars.clone(),
            rentals.clone(),
            payments.clone(),
            RetryPolicy::default(),
        );
        let app = api::create_app(state, get_metrics_handle());
        Self {
            app,
            cars,
            rentals,
            payments,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn rent(&self, car_uid: CarUid) -> Response {
        self.send(rent_request(car_uid, "2021-10-08", "2021-10-11"))
            .await
    }

    /// Rents a fresh car for three days at 100 per day.
    async fn rented(&self) -> (CarUid, RentalUid, PaymentUid) {
        let car_uid = self.cars.add_car("Mercedes Benz", "GLA 250", 100);
        let response = self.rent(car_uid).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        (
            car_uid,
            body["rentalUid"].as_str().unwrap().parse().unwrap(),
            body["payment"]["paymentUid"].as_str().unwrap().parse().unwrap(),
        )
    }
}

fn rent_request(car_uid: CarUid, from: &str, to: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/rental")
        .header("content-type", "application/json")
        .header("X-User-Name", USER)
        .body(Body::from(
            json!({ "carUid": car_uid, "dateFrom": from, "dateTo": to }).to_string(),
        ))
        .unwrap()
}

fn user_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("X-User-Name", USER)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let gateway = TestGateway::new();

    let response = gateway
        .send(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_metrics_expose_saga_counters() {
    let gateway = TestGateway::new();
    gateway.rented().await;

    let response = gateway
        .send(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("rental_saga_executions_total"));
}

#[tokio::test]
async fn test_list_cars_pages_and_filters() {
    let gateway = TestGateway::new();
    let reserved = gateway.cars.add_car("Audi", "A4", 3000);
    gateway.cars.add_car("BMW", "X5", 5000);
    gateway.cars.add_car("Volvo", "XC90", 4500);
    gateway.rent(reserved).await;

    let response = gateway
        .send(user_request("GET", "/api/v1/cars?page=1&size=10"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["totalElements"], 2);
    assert_eq!(page["pageSize"], 10);

    let response = gateway
        .send(user_request("GET", "/api/v1/cars?page=2&size=2&showAll=true"))
        .await;
    let page = body_json(response).await;
    assert_eq!(page["totalElements"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["items"][0]["brand"], "Volvo");
}

#[tokio::test]
async fn test_rent_car_for_three_days() {
    let gateway = TestGateway::new();
    let car_uid = gateway.cars.add_car("Mercedes Benz", "GLA 250", 100);

    let response = gateway.rent(car_uid).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["carUid"], car_uid.to_string());
    assert_eq!(body["dateFrom"], "2021-10-08");
    assert_eq!(body["dateTo"], "2021-10-11");
    assert_eq!(body["status"], "IN_PROGRESS");
    assert_eq!(body["payment"]["status"], "PAID");
    assert_eq!(body["payment"]["price"], 300);
    assert!(gateway.cars.is_reserved(car_uid));
}

#[tokio::test]
async fn test_rent_with_payment_unavailable_is_503() {
    let gateway = TestGateway::new();
    let car_uid = gateway.cars.add_car("Mercedes Benz", "GLA 250", 100);
    gateway.payments.set_unavailable_on_create(true);

    let response = gateway.rent(car_uid).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "Payment Service unavailable" })
    );
    assert!(!gateway.cars.is_reserved(car_uid));
    assert_eq!(gateway.cars.release_count(car_uid), 1);
}

#[tokio::test]
async fn test_rent_with_payment_unavailable_is_503_even_if_release_fails() {
    let gateway = TestGateway::new();
    let car_uid = gateway.cars.add_car("Mercedes Benz", "GLA 250", 100);
    gateway.payments.set_unavailable_on_create(true);
    gateway.cars.set_fail_on_release(true);

    let response = gateway.rent(car_uid).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "Payment Service unavailable" })
    );
    assert_eq!(gateway.cars.release_count(car_uid), 1);
}

#[tokio::test]
async fn test_rent_with_failing_rental_service_is_500() {
    let gateway = TestGateway::new();
    let car_uid = gateway.cars.add_car("Mercedes Benz", "GLA 250", 100);
    gateway.rentals.set_fail_on_create(true);

    let response = gateway.rent(car_uid).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!gateway.cars.is_reserved(car_uid));
    assert_eq!(gateway.payments.cancel_attempts(), 1);
}

#[tokio::test]
async fn test_rent_unknown_car_is_404() {
    let gateway = TestGateway::new();

    let response = gateway.rent(CarUid::new()).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rent_without_user_header_is_400() {
    let gateway = TestGateway::new();
    let car_uid = gateway.cars.add_car("Mercedes Benz", "GLA 250", 100);

    let response = gateway
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/v1/rental")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "carUid": car_uid, "dateFrom": "2021-10-08", "dateTo": "2021-10-11" })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!gateway.cars.is_reserved(car_uid));
}

#[tokio::test]
async fn test_rent_with_malformed_date_is_400() {
    let gateway = TestGateway::new();
    let car_uid = gateway.cars.add_car("Mercedes Benz", "GLA 250", 100);

    let response = gateway
        .send(rent_request(car_uid, "08.10.2021", "2021-10-11"))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!gateway.cars.is_reserved(car_uid));
}

#[tokio::test]
async fn test_get_rental_joins_car_and_payment() {
    let gateway = TestGateway::new();
    let (car_uid, rental_uid, payment_uid) = gateway.rented().await;

    let response = gateway
        .send(user_request("GET", &format!("/api/v1/rental/{rental_uid}")))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["rentalUid"], rental_uid.to_string());
    assert_eq!(body["car"]["carUid"], car_uid.to_string());
    assert_eq!(body["car"]["brand"], "Mercedes Benz");
    assert_eq!(body["payment"]["paymentUid"], payment_uid.to_string());
}

#[tokio::test]
async fn test_get_rental_omits_unreadable_payment() {
    let gateway = TestGateway::new();
    let (_, rental_uid, _) = gateway.rented().await;
    gateway.payments.set_fail_on_get(true);

    let response = gateway
        .send(user_request("GET", &format!("/api/v1/rental/{rental_uid}")))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body.get("payment").is_none());
    assert_eq!(body["status"], "IN_PROGRESS");
}

#[tokio::test]
async fn test_get_unknown_rental_is_404() {
    let gateway = TestGateway::new();

    let response = gateway
        .send(user_request(
            "GET",
            &format!("/api/v1/rental/{}", RentalUid::new()),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_rental_id_format() {
    let gateway = TestGateway::new();

    let response = gateway
        .send(user_request("GET", "/api/v1/rental/not-a-uuid"))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_user_rentals() {
    let gateway = TestGateway::new();
    gateway.rented().await;
    gateway.rented().await;

    let response = gateway.send(user_request("GET", "/api/v1/rental")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_rentals_without_user_header_is_400() {
    let gateway = TestGateway::new();

    let response = gateway
        .send(
            Request::builder()
                .uri("/api/v1/rental")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_finish_rental() {
    let gateway = TestGateway::new();
    let (car_uid, rental_uid, _) = gateway.rented().await;
    let uri = format!("/api/v1/rental/{rental_uid}/finish");

    let response = gateway.send(user_request("POST", &uri)).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!gateway.cars.is_reserved(car_uid));
    assert_eq!(
        gateway.rentals.rental(rental_uid).unwrap().status,
        RentalStatus::Finished
    );

    // A finished rental cannot be finished again.
    let response = gateway.send(user_request("POST", &uri)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_rental() {
    let gateway = TestGateway::new();
    let (car_uid, rental_uid, payment_uid) = gateway.rented().await;

    let response = gateway
        .send(user_request("DELETE", &format!("/api/v1/rental/{rental_uid}")))
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!gateway.cars.is_reserved(car_uid));
    assert_eq!(
        gateway.payments.payment(payment_uid).unwrap().status,
        PaymentStatus::Canceled
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_with_failing_payment_recovers_in_background() {
    let gateway = TestGateway::new();
    let (car_uid, rental_uid, payment_uid) = gateway.rented().await;
    gateway.payments.fail_next_cancellations(2);

    let response = gateway
        .send(user_request("DELETE", &format!("/api/v1/rental/{rental_uid}")))
        .await;

    // The caller sees the failure, but the car is already back.
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!gateway.cars.is_reserved(car_uid));
    assert_eq!(
        gateway.payments.payment(payment_uid).unwrap().status,
        PaymentStatus::Paid
    );

    // Background attempts at +0s and +10s; the second succeeds.
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(
        gateway.payments.payment(payment_uid).unwrap().status,
        PaymentStatus::Canceled
    );
}

#[tokio::test]
async fn test_cancel_unknown_rental_is_404() {
    let gateway = TestGateway::new();

    let response = gateway
        .send(user_request(
            "DELETE",
            &format!("/api/v1/rental/{}", RentalUid::new()),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
