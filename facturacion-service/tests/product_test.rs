//! Product catalog endpoints.

mod common;

use common::{decimal, TestApp};
use rust_decimal::Decimal;
use serde_json::{json, Value};

#[tokio::test]
async fn create_product_with_two_prices() {
    let app = TestApp::spawn().await;
    let token = app.signed_in_user("caja@tienda.co").await;

    let product = app
        .create_product(&token, " Aceite 1L ", "12500", Some("11800.50"))
        .await;

    assert_eq!(product["descripcion"], "Aceite 1L");
    assert_eq!(decimal(&product["precio_venta"]), Decimal::from(12500));
    assert_eq!(
        decimal(&product["precio_venta2"]),
        Decimal::new(1180050, 2)
    );
}

#[tokio::test]
async fn negative_price_or_blank_description_is_rejected() {
    let app = TestApp::spawn().await;
    let token = app.signed_in_user("caja@tienda.co").await;

    let negative = app
        .post(
            &token,
            "/products",
            json!({ "descripcion": "Azúcar", "precio_venta": "-1" }),
        )
        .await;
    assert_eq!(negative.status(), 422);

    let three_decimals = app
        .post(
            &token,
            "/products",
            json!({ "descripcion": "Azúcar", "precio_venta": "1000.005" }),
        )
        .await;
    assert_eq!(three_decimals.status(), 422);

    let too_large = app
        .post(
            &token,
            "/products",
            json!({ "descripcion": "Azúcar", "precio_venta": "1000000000000" }),
        )
        .await;
    assert_eq!(too_large.status(), 422);

    let blank = app
        .post(
            &token,
            "/products",
            json!({ "descripcion": "  ", "precio_venta": "1000" }),
        )
        .await;
    assert_eq!(blank.status(), 422);
}

#[tokio::test]
async fn update_and_delete_product() {
    let app = TestApp::spawn().await;
    let token = app.signed_in_user("caja@tienda.co").await;
    let product = app.create_product(&token, "Sal 1kg", "1800", None).await;
    let path = format!("/products/{}", product["id"]);

    let updated = app
        .patch(&token, &path, json!({ "precio_venta2": "1700" }))
        .await;
    assert_eq!(updated.status(), 200);
    let body: Value = updated.json().await.unwrap();
    assert_eq!(body["descripcion"], "Sal 1kg");
    assert_eq!(decimal(&body["precio_venta"]), Decimal::from(1800));
    assert_eq!(decimal(&body["precio_venta2"]), Decimal::from(1700));

    let cleared: Value = app
        .patch(&token, &path, json!({ "precio_venta2": null }))
        .await
        .json()
        .await
        .unwrap();
    assert!(cleared["precio_venta2"].is_null());
    assert_eq!(decimal(&cleared["precio_venta"]), Decimal::from(1800));

    assert_eq!(app.delete(&token, &path).await.status(), 204);
    assert_eq!(app.get(&token, &path).await.status(), 404);
    assert_eq!(app.delete(&token, &path).await.status(), 404);
}

#[tokio::test]
async fn search_matches_description_or_id() {
    let app = TestApp::spawn().await;
    let token = app.signed_in_user("caja@tienda.co").await;
    for (descripcion, precio) in [
        ("Arroz Diana 500g", "2500"),
        ("Arroz Roa 1kg", "4800"),
        ("Frijol 500g", "5200"),
    ] {
        app.create_product(&token, descripcion, precio, None).await;
    }

    let arroz: Value = app
        .get(&token, "/products/search?q=ARROZ")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(arroz.as_array().unwrap().len(), 2);

    let blank: Value = app
        .get(&token, "/products/search?q=%20")
        .await
        .json()
        .await
        .unwrap();
    assert!(blank.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn search_returns_at_most_ten() {
    let app = TestApp::spawn().await;
    let token = app.signed_in_user("caja@tienda.co").await;
    for i in 0..12 {
        app.create_product(&token, &format!("Galletas sabor {}", i), "900", None)
            .await;
    }

    let found: Value = app
        .get(&token, "/products/search?q=galletas")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(found.as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn list_pages_with_selected_size() {
    let app = TestApp::spawn().await;
    let token = app.signed_in_user("caja@tienda.co").await;
    for i in 0..30 {
        app.create_product(&token, &format!("Producto {}", i), "100", None)
            .await;
    }

    let page: Value = app
        .get(&token, "/products?page_size=25&page=2")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(page["page"], 2);
    assert_eq!(page["page_size"], 25);
    assert_eq!(page["items"].as_array().unwrap().len(), 5);
    assert!(page["next_page"].is_null());

    let beyond: Value = app
        .get(&token, "/products?page=9")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(beyond["page"], 3);
}
