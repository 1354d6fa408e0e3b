//! Router tests driven through `tower::ServiceExt::oneshot` against an
//! in-memory store.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use serde_json::{Value, json};
use tickle_core::{
  mail::{Email, MailSettings},
  person::{NewPerson, Person},
  store::TicketStore,
};
use tickle_kobra::{KobraClient, KobraConfig};
use tickle_store_sqlite::SqliteStore;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tower::ServiceExt as _;
use wiremock::{
  Mock, MockServer, ResponseTemplate,
  matchers::{method, path, query_param},
};

use crate::{AppState, api_router, auth::hash_password};

const PASSWORD: &str = "correct horse";

struct Harness {
  state:  AppState<SqliteStore>,
  outbox: UnboundedReceiver<Email>,
}

async fn harness() -> Harness {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let (tx, outbox) = unbounded_channel();
  let mail = MailSettings {
    from:         "Biljett <biljett@example.com>".into(),
    primary_host: "tickle.example.com".into(),
  };
  Harness { state: AppState::new(Arc::new(store), mail, tx), outbox }
}

async fn add_person(state: &AppState<SqliteStore>, email: &str, staff: bool) -> Person {
  let input = NewPerson {
    password_hash: Some(hash_password(PASSWORD).unwrap()),
    is_staff: staff,
    ..NewPerson::new(email, "Ada", "Lovelace")
  };
  state.store.add_person(input).await.unwrap()
}

fn basic(email: &str) -> String { format!("Basic {}", B64.encode(format!("{email}:{PASSWORD}"))) }

async fn call(
  state: &AppState<SqliteStore>,
  method: &str,
  uri: &str,
  auth: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(email) = auth {
    builder = builder.header(header::AUTHORIZATION, basic(email));
  }
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };

  let resp = api_router(state.clone())
    .oneshot(builder.body(body).unwrap())
    .await
    .unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

fn id(v: &Value, key: &str) -> String { v[key].as_str().unwrap().to_owned() }

/// Staff creates an event and a ticket product admitting to it.
async fn ticket_product(state: &AppState<SqliteStore>, staff: &str) -> (String, String) {
  let (status, event) =
    call(state, "POST", "/events", Some(staff), Some(json!({ "name": "Cortège" }))).await;
  assert_eq!(status, StatusCode::CREATED);
  let event_id = id(&event, "event_id");

  let (status, product) = call(
    state,
    "POST",
    "/products",
    Some(staff),
    Some(json!({
      "name": "Cortège ticket",
      "base_price": "100",
      "ticket_events": [event_id],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{product}");
  (event_id, id(&product, "product_id"))
}

// ─── People and auth ─────────────────────────────────────────────────────────

#[tokio::test]
async fn register_then_me() {
  let h = harness().await;
  let (status, person) = call(
    &h.state,
    "POST",
    "/people",
    None,
    Some(json!({
      "email": "grace@example.com",
      "first_name": "Grace",
      "last_name": "Hopper",
      "password": PASSWORD,
      "pid": "811218-9876",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{person}");
  assert!(person.get("password_hash").is_none());
  assert_eq!(person["pid_code"], "9876");

  let (status, me) = call(&h.state, "GET", "/people/me", Some("grace@example.com"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["first_name"], "Grace");
}

#[tokio::test]
async fn register_rejects_bad_input() {
  let h = harness().await;
  let base = json!({
    "email": "grace@example.com",
    "first_name": "Grace",
    "last_name": "Hopper",
    "password": PASSWORD,
  });

  let mut short = base.clone();
  short["password"] = json!("short");
  let (status, _) = call(&h.state, "POST", "/people", None, Some(short)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let mut bad_pid = base.clone();
  bad_pid["pid"] = json!("811218-9875");
  let (status, body) = call(&h.state, "POST", "/people", None, Some(bad_pid)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());

  let (status, _) = call(&h.state, "POST", "/people", None, Some(base.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  let (status, _) = call(&h.state, "POST", "/people", None, Some(base)).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn missing_or_wrong_credentials_are_401() {
  let h = harness().await;
  add_person(&h.state, "ada@example.com", false).await;

  let (status, _) = call(&h.state, "GET", "/people/me", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let req = Request::builder()
    .uri("/people/me")
    .header(header::AUTHORIZATION, format!("Basic {}", B64.encode("ada@example.com:nope")))
    .body(Body::empty())
    .unwrap();
  let resp = api_router(h.state.clone()).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn inactive_people_are_refused() {
  let h = harness().await;
  let mut person = add_person(&h.state, "ada@example.com", false).await;
  person.is_active = false;
  h.state.store.update_person(person).await.unwrap();

  let (status, _) = call(&h.state, "GET", "/people/me", Some("ada@example.com"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn staff_routes_are_403_for_others() {
  let h = harness().await;
  let ada = add_person(&h.state, "ada@example.com", false).await;
  let bob = add_person(&h.state, "bob@example.com", false).await;
  add_person(&h.state, "staff@example.com", true).await;

  let (status, _) = call(&h.state, "GET", "/people", Some("ada@example.com"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = call(
    &h.state,
    "POST",
    "/events",
    Some("ada@example.com"),
    Some(json!({ "name": "Party" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let bob_uri = format!("/people/{}", bob.person_id);
  let (status, _) = call(&h.state, "GET", &bob_uri, Some("ada@example.com"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let ada_uri = format!("/people/{}", ada.person_id);
  let (status, _) = call(&h.state, "GET", &ada_uri, Some("ada@example.com"), None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = call(&h.state, "GET", &bob_uri, Some("staff@example.com"), None).await;
  assert_eq!(status, StatusCode::OK);
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn product_detail_includes_variations() {
  let h = harness().await;
  add_person(&h.state, "staff@example.com", true).await;
  let staff = Some("staff@example.com");

  let (_, product) = call(
    &h.state,
    "POST",
    "/products",
    staff,
    Some(json!({ "name": "Hoodie", "base_price": "300", "personal_limit": null })),
  )
  .await;
  let product_id = id(&product, "product_id");

  let (status, variation) = call(
    &h.state,
    "POST",
    &format!("/products/{product_id}/variations"),
    staff,
    Some(json!({ "name": "Size" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let (status, _) = call(
    &h.state,
    "POST",
    &format!("/variations/{}/choices", id(&variation, "variation_id")),
    staff,
    Some(json!({ "name": "XL", "delta": "20" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, detail) = call(&h.state, "GET", &format!("/products/{product_id}"), None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(detail["name"], "Hoodie");
  assert_eq!(detail["variations"][0]["choices"][0]["name"], "XL");

  let (status, _) =
    call(&h.state, "GET", &format!("/products/{}", uuid::Uuid::new_v4()), None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn drafts_are_hidden_from_everyone_but_staff() {
  let h = harness().await;
  add_person(&h.state, "staff@example.com", true).await;
  add_person(&h.state, "ada@example.com", false).await;
  let staff = Some("staff@example.com");

  let (_, draft) = call(
    &h.state,
    "POST",
    "/products",
    staff,
    Some(json!({ "name": "Draft", "base_price": "10", "published": false })),
  )
  .await;
  let draft_id = id(&draft, "product_id");
  call(
    &h.state,
    "POST",
    "/products",
    staff,
    Some(json!({ "name": "Live", "base_price": "10" })),
  )
  .await;

  for who in [None, Some("ada@example.com")] {
    let (status, list) = call(&h.state, "GET", "/products?published=false", who, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = list.as_array().unwrap().iter().map(|p| p["name"].clone()).collect();
    assert_eq!(names, vec![json!("Live")]);

    let (status, _) = call(&h.state, "GET", &format!("/products/{draft_id}"), who, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  let (_, list) = call(&h.state, "GET", "/products?published=false", staff, None).await;
  assert_eq!(list[0]["name"], "Draft");
  let (status, _) = call(&h.state, "GET", &format!("/products/{draft_id}"), staff, None).await;
  assert_eq!(status, StatusCode::OK);

  let (status, _) = call(&h.state, "GET", "/products", Some("nobody@example.com"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ─── Cart and purchase ───────────────────────────────────────────────────────

#[tokio::test]
async fn purchase_flow_and_personal_limit() {
  let h = harness().await;
  add_person(&h.state, "staff@example.com", true).await;
  add_person(&h.state, "ada@example.com", false).await;
  let (_, product_id) = ticket_product(&h.state, "staff@example.com").await;
  let ada = Some("ada@example.com");

  let (status, holding) = call(
    &h.state,
    "POST",
    "/cart/holdings",
    ada,
    Some(json!({ "product_id": product_id })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{holding}");

  let (status, cart) = call(&h.state, "GET", "/cart", ada, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(cart["holdings"].as_array().unwrap().len(), 1);
  assert_eq!(cart["total"], "100");

  let (status, purchase) = call(&h.state, "POST", "/cart/purchase", ada, None).await;
  assert_eq!(status, StatusCode::CREATED, "{purchase}");
  assert_eq!(purchase["holdings"][0]["price"]["total"], "100");
  assert_eq!(purchase["purchase"]["valid"], true);

  let (_, cart) = call(&h.state, "GET", "/cart", ada, None).await;
  assert!(cart["holdings"].as_array().unwrap().is_empty());

  // The default personal limit is one.
  let (status, body) = call(
    &h.state,
    "POST",
    "/cart/holdings",
    ada,
    Some(json!({ "product_id": product_id })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT, "{body}");

  let (status, purchases) = call(&h.state, "GET", "/purchases", ada, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(purchases.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn quantity_on_unquantitative_product_is_400() {
  let h = harness().await;
  add_person(&h.state, "staff@example.com", true).await;
  add_person(&h.state, "ada@example.com", false).await;
  let (_, product_id) = ticket_product(&h.state, "staff@example.com").await;

  let (status, _) = call(
    &h.state,
    "POST",
    "/cart/holdings",
    Some("ada@example.com"),
    Some(json!({ "product_id": product_id, "quantity": 2 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_cart_purchase_is_409() {
  let h = harness().await;
  add_person(&h.state, "ada@example.com", false).await;
  let (status, _) = call(&h.state, "POST", "/cart/purchase", Some("ada@example.com"), None).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn purchases_are_private() {
  let h = harness().await;
  add_person(&h.state, "staff@example.com", true).await;
  add_person(&h.state, "ada@example.com", false).await;
  add_person(&h.state, "bob@example.com", false).await;
  let (_, product_id) = ticket_product(&h.state, "staff@example.com").await;

  call(
    &h.state,
    "POST",
    "/cart/holdings",
    Some("ada@example.com"),
    Some(json!({ "product_id": product_id })),
  )
  .await;
  let (_, purchase) = call(&h.state, "POST", "/cart/purchase", Some("ada@example.com"), None).await;
  let uri = format!("/purchases/{}", id(&purchase["purchase"], "purchase_id"));

  let (status, _) = call(&h.state, "GET", &uri, Some("bob@example.com"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, view) = call(&h.state, "GET", &uri, Some("staff@example.com"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(view["total"], "100");
}

// ─── Delivery and lifecycle ──────────────────────────────────────────────────

#[tokio::test]
async fn deliver_queues_ticket_email_and_lists_visitors() {
  let mut h = harness().await;
  add_person(&h.state, "staff@example.com", true).await;
  add_person(&h.state, "ada@example.com", false).await;
  let staff = Some("staff@example.com");
  let (event_id, product_id) = ticket_product(&h.state, "staff@example.com").await;

  call(
    &h.state,
    "POST",
    "/cart/holdings",
    Some("ada@example.com"),
    Some(json!({ "product_id": product_id })),
  )
  .await;
  let (_, purchase) = call(&h.state, "POST", "/cart/purchase", Some("ada@example.com"), None).await;
  let purchase_id = id(&purchase["purchase"], "purchase_id");

  let (status, delivery) =
    call(&h.state, "POST", &format!("/purchases/{purchase_id}/deliver"), staff, None).await;
  assert_eq!(status, StatusCode::OK, "{delivery}");
  assert_eq!(delivery["holding_ids"].as_array().unwrap().len(), 1);

  let email = h.outbox.try_recv().unwrap();
  assert_eq!(email.to, vec!["Ada Lovelace <ada@example.com>".to_owned()]);
  assert!(email.body.contains("tickle.example.com"));
  assert!(h.outbox.try_recv().is_err());

  let (status, visitors) =
    call(&h.state, "GET", &format!("/events/{event_id}/visitors"), staff, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(visitors["emails"], "Ada Lovelace <ada@example.com>");

  let (status, _) =
    call(&h.state, "POST", &format!("/purchases/{purchase_id}/invalidate"), staff, None).await;
  assert_eq!(status, StatusCode::OK);
  let (_, visitors) =
    call(&h.state, "GET", &format!("/events/{event_id}/visitors"), staff, None).await;
  assert!(visitors["visitors"].as_array().unwrap().is_empty());

  let (status, _) =
    call(&h.state, "POST", &format!("/purchases/{purchase_id}/deliver"), staff, None).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn utilize_once_and_transfer() {
  let h = harness().await;
  add_person(&h.state, "staff@example.com", true).await;
  add_person(&h.state, "ada@example.com", false).await;
  let bob = add_person(&h.state, "bob@example.com", false).await;
  let (_, product_id) = ticket_product(&h.state, "staff@example.com").await;

  call(
    &h.state,
    "POST",
    "/cart/holdings",
    Some("ada@example.com"),
    Some(json!({ "product_id": product_id })),
  )
  .await;
  let (_, purchase) = call(&h.state, "POST", "/cart/purchase", Some("ada@example.com"), None).await;
  let holding_id = id(&purchase["holdings"][0], "holding_id");

  let (status, _) = call(
    &h.state,
    "POST",
    &format!("/holdings/{holding_id}/transfer"),
    Some("bob@example.com"),
    Some(json!({ "email": "bob@example.com" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, moved) = call(
    &h.state,
    "POST",
    &format!("/holdings/{holding_id}/transfer"),
    Some("ada@example.com"),
    Some(json!({ "email": "bob@example.com" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{moved}");
  assert_eq!(moved["person_id"], bob.person_id.to_string());

  let (status, price) = call(
    &h.state,
    "GET",
    &format!("/holdings/{holding_id}/price"),
    Some("bob@example.com"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(price["total"], "100");

  let uri = format!("/holdings/{holding_id}/utilize");
  let (status, _) = call(&h.state, "POST", &uri, Some("staff@example.com"), None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = call(&h.state, "POST", &uri, Some("staff@example.com"), None).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

// ─── Orchestras ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn orchestra_registration_fills_cart() {
  let h = harness().await;
  add_person(&h.state, "staff@example.com", true).await;
  add_person(&h.state, "ada@example.com", false).await;
  let staff = Some("staff@example.com");
  let (_, ticket_id) = ticket_product(&h.state, "staff@example.com").await;
  let (_, food) = call(
    &h.state,
    "POST",
    "/products",
    staff,
    Some(json!({ "name": "Food", "base_price": "50" })),
  )
  .await;

  let (status, orchestra) =
    call(&h.state, "POST", "/orchestras", staff, Some(json!({ "name": "Bleckhornen" }))).await;
  assert_eq!(status, StatusCode::CREATED);
  let (status, ticket_type) = call(
    &h.state,
    "POST",
    "/orchestras/ticket-types",
    staff,
    Some(json!({ "product_id": ticket_id, "food_product": id(&food, "product_id") })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{ticket_type}");

  let registration = |dinner: bool| {
    json!({
      "ticket_type_id": id(&ticket_type, "ticket_type_id"),
      "food": true,
      "dinner": dinner,
      "memberships": [{ "orchestra_id": id(&orchestra, "orchestra_id"), "active": true, "primary": true }],
    })
  };

  let (status, _) = call(
    &h.state,
    "POST",
    "/orchestras/register",
    Some("ada@example.com"),
    Some(registration(true)),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, holdings) = call(
    &h.state,
    "POST",
    "/orchestras/register",
    Some("ada@example.com"),
    Some(registration(false)),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{holdings}");
  assert_eq!(holdings.as_array().unwrap().len(), 2);

  let (_, cart) = call(&h.state, "GET", "/cart", Some("ada@example.com"), None).await;
  assert_eq!(cart["total"], "150");
}

// ─── Kobra ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn kobra_without_config_is_502() {
  let h = harness().await;
  let ada = add_person(&h.state, "ada@example.com", false).await;
  add_person(&h.state, "staff@example.com", true).await;

  let (status, _) = call(
    &h.state,
    "POST",
    &format!("/people/{}/kobra", ada.person_id),
    Some("staff@example.com"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn kobra_fill_updates_person_and_union() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/v1/students/"))
    .and(query_param("liu_id", "adalo123"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "first_name": "Augusta",
      "last_name": "King",
      "personal_number": "19811218-9876",
      "liu_id": "adalo123",
      "blocked": false,
      "barcode_number": null,
      "rfid_number": "987654",
      "union": "LinTek"
    })))
    .mount(&server)
    .await;

  let mut h = harness().await;
  let client = KobraClient::new(KobraConfig {
    base_url:     server.uri(),
    api_key:      "secret".into(),
    timeout_secs: 5,
  })
  .unwrap();
  h.state = h.state.with_kobra(client);

  let mut ada = add_person(&h.state, "ada@example.com", false).await;
  ada.liu_id = Some("adalo123".into());
  h.state.store.update_person(ada.clone()).await.unwrap();
  add_person(&h.state, "staff@example.com", true).await;

  let (status, person) = call(
    &h.state,
    "POST",
    &format!("/people/{}/kobra?overwrite_name=true", ada.person_id),
    Some("staff@example.com"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{person}");
  assert_eq!(person["first_name"], "Augusta");
  assert_eq!(person["liu_card_rfid"], "987654");
  assert!(person["student_union_id"].is_string());

  // The staff member has no identifier, so the bulk run skips them.
  let (status, report) =
    call(&h.state, "POST", "/people/kobra", Some("staff@example.com"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(report["filled"], 1);
  assert_eq!(report["skipped"], 1);
}
