//! Daily sales summary and the home screen.

mod common;

use chrono::{Duration, Utc};
use common::{decimal, TestApp};
use facturacion_service::models::NewInvoice;
use rust_decimal::Decimal;
use serde_json::{json, Value};

#[tokio::test]
async fn today_counts_only_todays_invoices() {
    let app = TestApp::spawn().await;
    let token = app.signed_in_user("caja@tienda.co").await;
    let client = app.create_client(&token, "Marta Díaz", None).await;
    let product = app.create_product(&token, "Pan tajado", "1000", None).await;

    for cantidad in ["2", "3"] {
        let response = app
            .post(
                &token,
                "/invoices",
                json!({
                    "cliente_id": client["id"],
                    "items": [{ "producto_id": product["id"], "cantidad": cantidad }],
                }),
            )
            .await;
        assert_eq!(response.status(), 201);
    }

    // Two days back in business time is never today.
    let old = (Utc::now() - Duration::days(2)).naive_utc();
    app.storage
        .seed_invoice(&NewInvoice {
            cliente_id: client["id"].as_i64().unwrap(),
            fecha: old,
            cantidad: Decimal::ONE,
            subtotal: Decimal::from(99_000),
            total: Decimal::from(99_000),
            observaciones: None,
            items: vec![],
        })
        .unwrap();

    let response = app.get(&token, "/summary/today").await;
    assert_eq!(response.status(), 200);
    let summary: Value = response.json().await.unwrap();

    assert_eq!(summary["count"], 2);
    assert_eq!(decimal(&summary["total"]), Decimal::from(5000));
    assert_eq!(summary["facturas"][0]["id"], 2);
    assert_eq!(summary["facturas"][1]["id"], 1);
}

#[tokio::test]
async fn empty_day_has_zero_total() {
    let app = TestApp::spawn().await;
    let token = app.signed_in_user("caja@tienda.co").await;

    let summary: Value = app
        .get(&token, "/summary/today")
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(summary["count"], 0);
    assert_eq!(decimal(&summary["total"]), Decimal::ZERO);
    assert!(summary["facturas"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn home_shows_user_and_counts() {
    let app = TestApp::spawn().await;
    let token = app.signed_in_user("caja@tienda.co").await;
    app.create_client(&token, "Marta Díaz", None).await;
    app.create_product(&token, "Pan tajado", "1000", None).await;
    app.create_product(&token, "Leche 1L", "600", None).await;

    let home: Value = app.get(&token, "/home").await.json().await.unwrap();

    assert_eq!(home["user"]["email"], "caja@tienda.co");
    assert_eq!(home["clientes"], 1);
    assert_eq!(home["productos"], 2);
    assert_eq!(home["siguiente_factura"], "0001");
}
