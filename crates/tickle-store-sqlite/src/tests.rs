//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tickle_core::{
  Error as CoreError,
  catalog::{NewChoice, NewProduct, ProductKind, ProductQuery},
  discount::{Adjustment, Eligibility, NewDiscount},
  holding::{HoldingOwner, NewHolding},
  orchestra::{MembershipInput, NewOrchestraTicketType, OrchestraRegistration},
  person::NewPerson,
  pid::Pid,
  store::{StoreError as _, TicketStore},
};
use uuid::Uuid;

use crate::{Error, SqliteStore, encode::encode_uuid};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn d(s: &str) -> Decimal { s.parse().unwrap() }

async fn person(s: &SqliteStore, email: &str) -> Uuid {
  s.add_person(NewPerson::new(email, "Ada", "Lovelace"))
    .await
    .unwrap()
    .person_id
}

async fn product(s: &SqliteStore, input: NewProduct) -> Uuid {
  s.add_product(input).await.unwrap().product_id
}

fn core(err: &Error) -> &CoreError { err.as_core().expect("domain error") }

// ─── People ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_find_person() {
  let s = store().await;
  let id = person(&s, "ada@example.com").await;

  let fetched = s.get_person(id).await.unwrap().unwrap();
  assert_eq!(fetched.email, "ada@example.com");
  assert!(fetched.is_active);

  let by_email = s
    .find_person_by_email("ADA@example.com".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(by_email.person_id, id);

  assert!(s.get_person(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn email_is_unique_case_insensitively() {
  let s = store().await;
  person(&s, "ada@example.com").await;

  let err = s
    .add_person(NewPerson::new("Ada@Example.com", "Ada", "Byron"))
    .await
    .unwrap_err();
  assert!(matches!(core(&err), CoreError::EmailTaken(_)));
}

#[tokio::test]
async fn pid_is_unique() {
  let s = store().await;
  let date = NaiveDate::from_ymd_opt(1981, 12, 18).unwrap();
  let mut first = NewPerson::new("a@example.com", "A", "A");
  first.pid = Some(Pid::with_serial(date, 987, false));
  s.add_person(first).await.unwrap();

  let mut second = NewPerson::new("b@example.com", "B", "B");
  second.pid = Some(Pid::with_serial(date, 987, false));
  let err = s.add_person(second).await.unwrap_err();
  assert!(core(&err).is_validation());

  // The same digits with the coordination flag are a different number.
  let mut third = NewPerson::new("c@example.com", "C", "C");
  third.pid = Some(Pid::with_serial(date, 987, true));
  s.add_person(third).await.unwrap();
}

#[tokio::test]
async fn update_person_round_trips_fields() {
  let s = store().await;
  let id = person(&s, "ada@example.com").await;
  let union = s.student_union("LinTek".into()).await.unwrap();
  let vegan = s.add_special_nutrition("Vegan".into()).await.unwrap();

  let mut p = s.get_person(id).await.unwrap().unwrap();
  p.liu_id = Some("adalo123".into());
  p.student_union_id = Some(union.union_id);
  p.special_nutrition = vec![vegan.nutrition_id];
  p.liu_card_rfid = "1234".into();
  s.update_person(p).await.unwrap();

  let p = s.get_person(id).await.unwrap().unwrap();
  assert_eq!(p.liu_id.as_deref(), Some("adalo123"));
  assert_eq!(p.student_union_id, Some(union.union_id));
  assert_eq!(p.special_nutrition, vec![vegan.nutrition_id]);
  assert_eq!(p.liu_card_rfid, "1234");
}

#[tokio::test]
async fn student_union_is_get_or_create() {
  let s = store().await;
  let a = s.student_union("Consensus".into()).await.unwrap();
  let b = s.student_union("Consensus".into()).await.unwrap();
  assert_eq!(a, b);
  assert_eq!(a.slug, "consensus");
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_products_filters_and_orders() {
  let s = store().await;
  let event = s.add_event("Gasque".into()).await.unwrap();

  let mut ticket = NewProduct::new("Entry", d("100"));
  ticket.order = 2;
  ticket.ticket_events = Some(vec![event.event_id]);
  product(&s, ticket).await;

  let mut shirt = NewProduct::new("Shirt", d("150"));
  shirt.order = 1;
  product(&s, shirt).await;

  let mut hidden = NewProduct::new("Hidden", d("1"));
  hidden.published = false;
  product(&s, hidden).await;

  let all = s.list_products(&ProductQuery::default()).await.unwrap();
  assert_eq!(all.len(), 3);

  let published = s
    .list_products(&ProductQuery { published: Some(true), kind: None })
    .await
    .unwrap();
  let names: Vec<_> = published.iter().map(|p| p.name.as_str()).collect();
  assert_eq!(names, ["Shirt", "Entry"]);

  let tickets = s
    .list_products(&ProductQuery { published: None, kind: Some(ProductKind::Ticket) })
    .await
    .unwrap();
  assert_eq!(tickets.len(), 1);
  assert_eq!(tickets[0].ticket_events, Some(vec![event.event_id]));
}

#[tokio::test]
async fn variations_group_choices() {
  let s = store().await;
  let shirt = product(&s, NewProduct::new("Shirt", d("150"))).await;
  let size = s.add_variation(shirt, "size".into()).await.unwrap();
  for (i, name) in ["L", "S"].into_iter().enumerate() {
    s.add_choice(size.variation_id, NewChoice {
      name:  name.into(),
      order: i as u32,
      delta: Decimal::ZERO,
    })
    .await
    .unwrap();
  }

  let err = s.add_variation(shirt, "size".into()).await.unwrap_err();
  assert!(core(&err).is_validation());

  let variations = s.variations(shirt).await.unwrap();
  assert_eq!(variations.len(), 1);
  let names: Vec<_> = variations[0].choices.iter().map(|c| c.name.as_str()).collect();
  assert_eq!(names, ["L", "S"]);
}

// ─── Cart ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn quantity_invariant_is_enforced() {
  let s = store().await;
  let buyer = person(&s, "ada@example.com").await;
  let single = product(&s, NewProduct::new("Ticket", d("100"))).await;

  let err = s
    .add_to_cart(buyer, NewHolding::new(single).with_quantity(2))
    .await
    .unwrap_err();
  assert!(matches!(core(&err), CoreError::QuantityNotOne));

  let mut stickers = NewProduct::new("Sticker", d("5"));
  stickers.quantitative = true;
  stickers.personal_limit = None;
  let stickers = product(&s, stickers).await;
  let h = s
    .add_to_cart(buyer, NewHolding::new(stickers).with_quantity(4))
    .await
    .unwrap();
  assert_eq!(h.quantity, 4);
}

#[tokio::test]
async fn add_and_remove_cart_holdings() {
  let s = store().await;
  let buyer = person(&s, "ada@example.com").await;
  let shirt = product(&s, NewProduct::new("Shirt", d("150"))).await;

  let h = s.add_to_cart(buyer, NewHolding::new(shirt)).await.unwrap();
  let cart = s.cart(buyer).await.unwrap();
  assert_eq!(h.owner, HoldingOwner::Cart(cart.cart_id));
  assert_eq!(s.cart_holdings(buyer).await.unwrap().len(), 1);

  s.remove_from_cart(buyer, h.holding_id).await.unwrap();
  assert!(s.cart_holdings(buyer).await.unwrap().is_empty());
}

#[tokio::test]
async fn unpublished_products_cannot_be_added() {
  let s = store().await;
  let buyer = person(&s, "ada@example.com").await;
  let mut draft = NewProduct::new("Draft", d("10"));
  draft.published = false;
  let draft = product(&s, draft).await;

  let err = s.add_to_cart(buyer, NewHolding::new(draft)).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::Unpublished(_)));
}

#[tokio::test]
async fn foreign_choices_are_rejected() {
  let s = store().await;
  let buyer = person(&s, "ada@example.com").await;
  let shirt = product(&s, NewProduct::new("Shirt", d("150"))).await;

  let err = s
    .add_to_cart(buyer, NewHolding::new(shirt).with_choices(vec![Uuid::new_v4()]))
    .await
    .unwrap_err();
  assert!(matches!(core(&err), CoreError::ForeignChoice(_)));
  assert!(s.cart_holdings(buyer).await.unwrap().is_empty());
}

// ─── Pricing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn price_sums_variations_and_eligible_discounts() {
  let s = store().await;
  let buyer = person(&s, "ada@example.com").await;

  let mut shirt = NewProduct::new("Shirt", d("100"));
  shirt.quantitative = true;
  shirt.personal_limit = None;
  let shirt = product(&s, shirt).await;
  let size = s.add_variation(shirt, "size".into()).await.unwrap();
  let xl = s
    .add_choice(size.variation_id, NewChoice { name: "XL".into(), order: 0, delta: d("20") })
    .await
    .unwrap();

  let everyone = s
    .add_discount(NewDiscount {
      name:        "early bird".into(),
      adjustment:  Adjustment::Amount(d("-10")),
      eligibility: Eligibility::Everyone,
    })
    .await
    .unwrap();
  let staff = s
    .add_discount(NewDiscount {
      name:        "staff".into(),
      adjustment:  Adjustment::Percent(d("-50")),
      eligibility: Eligibility::Staff,
    })
    .await
    .unwrap();
  s.attach_discount(shirt, everyone.discount_id).await.unwrap();
  s.attach_discount(shirt, staff.discount_id).await.unwrap();

  let h = s
    .add_to_cart(
      buyer,
      NewHolding::new(shirt).with_quantity(2).with_choices(vec![xl.choice_id]),
    )
    .await
    .unwrap();

  let price = s.price_holding(h.holding_id).await.unwrap();
  assert_eq!(price.variation_delta, d("20"));
  assert_eq!(price.modifier_delta, d("-10"));
  assert_eq!(price.unit_price, d("110"));
  assert_eq!(price.total, d("220"));
  assert_eq!(price.discounts.len(), 1);
}

#[tokio::test]
async fn frozen_discounts_survive_later_edits() {
  let s = store().await;
  let buyer = person(&s, "ada@example.com").await;
  let ticket = product(&s, NewProduct::new("Ticket", d("200"))).await;
  let mut discount = s
    .add_discount(NewDiscount {
      name:        "member".into(),
      adjustment:  Adjustment::Amount(d("-50")),
      eligibility: Eligibility::Everyone,
    })
    .await
    .unwrap();
  s.attach_discount(ticket, discount.discount_id).await.unwrap();

  let h = s.add_to_cart(buyer, NewHolding::new(ticket)).await.unwrap();
  s.purchase_cart(buyer).await.unwrap();

  discount.adjustment = Adjustment::Amount(d("-150"));
  s.update_discount(discount).await.unwrap();

  let price = s.price_holding(h.holding_id).await.unwrap();
  assert_eq!(price.total, d("150"));
  let frozen = s.holding_discounts(h.holding_id).await.unwrap();
  assert_eq!(frozen.len(), 1);
  assert_eq!(frozen[0].delta, d("-50"));
}

// ─── Purchasing and limits ───────────────────────────────────────────────────

#[tokio::test]
async fn purchase_moves_cart_into_purchase() {
  let s = store().await;
  let buyer = person(&s, "ada@example.com").await;
  let ticket = product(&s, NewProduct::new("Ticket", d("100"))).await;
  let h = s.add_to_cart(buyer, NewHolding::new(ticket)).await.unwrap();

  let purchase = s.purchase_cart(buyer).await.unwrap();
  assert!(purchase.valid);
  assert!(s.cart_holdings(buyer).await.unwrap().is_empty());

  let bought = s.purchase_holdings(purchase.purchase_id).await.unwrap();
  assert_eq!(bought.len(), 1);
  assert_eq!(bought[0].holding_id, h.holding_id);
  assert_eq!(bought[0].owner, HoldingOwner::Purchase(purchase.purchase_id));
  assert!(bought[0].price_snapshot.is_some());

  assert_eq!(s.list_purchases(buyer).await.unwrap(), vec![purchase]);
}

#[tokio::test]
async fn empty_cart_cannot_be_purchased() {
  let s = store().await;
  let buyer = person(&s, "ada@example.com").await;
  let err = s.purchase_cart(buyer).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::EmptyCart));
}

#[tokio::test]
async fn personal_limit_blocks_second_purchase() {
  let s = store().await;
  let buyer = person(&s, "ada@example.com").await;
  let ticket = product(&s, NewProduct::new("Ticket", d("100"))).await;

  s.add_to_cart(buyer, NewHolding::new(ticket)).await.unwrap();
  s.purchase_cart(buyer).await.unwrap();

  let err = s.add_to_cart(buyer, NewHolding::new(ticket)).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::PersonalLimitReached { limit: 1, .. }));

  let status = s.limit_status(ticket, Some(buyer)).await.unwrap();
  assert_eq!(status.personal_purchased, Some(1));
  assert!(status.personal_limit_reached);
  assert!(!status.total_limit_reached);
}

#[tokio::test]
async fn limit_check_sums_the_whole_cart() {
  let s = store().await;
  let buyer = person(&s, "ada@example.com").await;
  let mut pins = NewProduct::new("Pin", d("10"));
  pins.personal_limit = Some(1);
  let pins = product(&s, pins).await;

  s.add_to_cart(buyer, NewHolding::new(pins)).await.unwrap();
  s.add_to_cart(buyer, NewHolding::new(pins)).await.unwrap();

  let err = s.purchase_cart(buyer).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::PersonalLimitReached { .. }));
  assert_eq!(s.cart_holdings(buyer).await.unwrap().len(), 2);
}

#[tokio::test]
async fn failed_purchase_rolls_everything_back() {
  let s = store().await;
  let alice = person(&s, "alice@example.com").await;
  let bob = person(&s, "bob@example.com").await;

  let plenty = product(&s, NewProduct::new("Shirt", d("150"))).await;
  let mut scarce = NewProduct::new("Dinner", d("300"));
  scarce.total_limit = Some(1);
  let scarce = product(&s, scarce).await;

  s.add_to_cart(alice, NewHolding::new(plenty)).await.unwrap();
  s.add_to_cart(alice, NewHolding::new(scarce)).await.unwrap();
  s.add_to_cart(bob, NewHolding::new(scarce)).await.unwrap();

  s.purchase_cart(bob).await.unwrap();

  let err = s.purchase_cart(alice).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::TotalLimitReached { limit: 1, .. }));
  assert!(s.list_purchases(alice).await.unwrap().is_empty());
  let cart = s.cart_holdings(alice).await.unwrap();
  assert_eq!(cart.len(), 2);
  assert!(cart.iter().all(|h| !h.is_purchased() && h.price_snapshot.is_none()));
  assert_eq!(s.purchased_quantity(plenty, None).await.unwrap(), 0);
}

#[tokio::test]
async fn invalidated_purchases_stop_counting() {
  let s = store().await;
  let buyer = person(&s, "ada@example.com").await;
  let event = s.add_event("Kårallen".into()).await.unwrap();
  let mut ticket = NewProduct::new("Entry", d("100"));
  ticket.ticket_events = Some(vec![event.event_id]);
  let ticket = product(&s, ticket).await;

  s.add_to_cart(buyer, NewHolding::new(ticket)).await.unwrap();
  let purchase = s.purchase_cart(buyer).await.unwrap();
  assert_eq!(s.purchased_quantity(ticket, Some(buyer)).await.unwrap(), 1);
  assert_eq!(s.event_visitors(event.event_id).await.unwrap().len(), 1);

  let invalid = s.invalidate_purchase(purchase.purchase_id).await.unwrap();
  assert!(!invalid.valid);
  assert_eq!(s.purchased_quantity(ticket, Some(buyer)).await.unwrap(), 0);
  assert!(s.event_visitors(event.event_id).await.unwrap().is_empty());

  let err = s.invalidate_purchase(purchase.purchase_id).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::AlreadyInvalidated(_)));

  // The limit frees up again.
  s.add_to_cart(buyer, NewHolding::new(ticket)).await.unwrap();
}

// ─── Holding lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn utilize_only_once() {
  let s = store().await;
  let buyer = person(&s, "ada@example.com").await;
  let ticket = product(&s, NewProduct::new("Ticket", d("100"))).await;
  let h = s.add_to_cart(buyer, NewHolding::new(ticket)).await.unwrap();

  let err = s.utilize_holding(h.holding_id).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::NotPurchased(_)));

  s.purchase_cart(buyer).await.unwrap();
  let used = s.utilize_holding(h.holding_id).await.unwrap();
  assert!(used.utilized.is_some());

  let err = s.utilize_holding(h.holding_id).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::AlreadyUtilized(_)));
}

#[tokio::test]
async fn transfer_respects_transferability() {
  let s = store().await;
  let alice = person(&s, "alice@example.com").await;
  let bob = person(&s, "bob@example.com").await;

  let open = product(&s, NewProduct::new("Ticket", d("100"))).await;
  let mut personal = NewProduct::new("Named ticket", d("100"));
  personal.transferable = false;
  let personal = product(&s, personal).await;

  let a = s.add_to_cart(alice, NewHolding::new(open)).await.unwrap();
  let b = s.add_to_cart(alice, NewHolding::new(personal)).await.unwrap();
  s.purchase_cart(alice).await.unwrap();

  let moved = s.transfer_holding(a.holding_id, bob).await.unwrap();
  assert_eq!(moved.person_id, bob);

  let err = s.transfer_holding(b.holding_id, bob).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::NotTransferable(_)));
}

#[tokio::test]
async fn transfer_respects_recipient_limit() {
  let s = store().await;
  let alice = person(&s, "alice@example.com").await;
  let bob = person(&s, "bob@example.com").await;
  let carol = person(&s, "carol@example.com").await;
  // Default personal limit of one.
  let ticket = product(&s, NewProduct::new("Ticket", d("100"))).await;

  let a = s.add_to_cart(alice, NewHolding::new(ticket)).await.unwrap();
  s.purchase_cart(alice).await.unwrap();
  s.add_to_cart(bob, NewHolding::new(ticket)).await.unwrap();
  s.purchase_cart(bob).await.unwrap();

  let err = s.transfer_holding(a.holding_id, bob).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::PersonalLimitReached { limit: 1, .. }));
  assert_eq!(s.get_holding(a.holding_id).await.unwrap().unwrap().person_id, alice);
  assert_eq!(s.purchased_quantity(ticket, Some(bob)).await.unwrap(), 1);

  let moved = s.transfer_holding(a.holding_id, carol).await.unwrap();
  assert_eq!(moved.person_id, carol);
  assert_eq!(s.purchased_quantity(ticket, Some(alice)).await.unwrap(), 0);
  assert_eq!(s.purchased_quantity(ticket, None).await.unwrap(), 2);
}

#[tokio::test]
async fn holding_cannot_belong_to_cart_and_purchase() {
  let s = store().await;
  let buyer = person(&s, "ada@example.com").await;
  let mut input = NewProduct::new("Pin", d("20"));
  input.personal_limit = None;
  let pin = product(&s, input).await;

  s.add_to_cart(buyer, NewHolding::new(pin)).await.unwrap();
  let purchase = s.purchase_cart(buyer).await.unwrap();
  let in_cart = s.add_to_cart(buyer, NewHolding::new(pin)).await.unwrap();

  let (holding_id, purchase_id) = (in_cart.holding_id, purchase.purchase_id);
  let err = s
    .in_transaction(move |tx| {
      tx.execute(
        "UPDATE holdings SET purchase_id = ?2 WHERE holding_id = ?1",
        rusqlite::params![encode_uuid(holding_id), encode_uuid(purchase_id)],
      )?;
      Ok(())
    })
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Sqlite(rusqlite::Error::SqliteFailure(e, _))
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_CHECK
  ));

  let unchanged = s.get_holding(holding_id).await.unwrap().unwrap();
  assert!(matches!(unchanged.owner, HoldingOwner::Cart(_)));
}

#[tokio::test]
async fn deliveries_require_purchased_holdings() {
  let s = store().await;
  let buyer = person(&s, "ada@example.com").await;
  let ticket = product(&s, NewProduct::new("Ticket", d("100"))).await;
  let h = s.add_to_cart(buyer, NewHolding::new(ticket)).await.unwrap();

  let err = s.record_delivery(vec![h.holding_id]).await.unwrap_err();
  assert!(matches!(core(&err), CoreError::NotPurchased(_)));

  s.purchase_cart(buyer).await.unwrap();
  let delivery = s.record_delivery(vec![h.holding_id]).await.unwrap();
  assert_eq!(delivery.holding_ids, vec![h.holding_id]);
}

// ─── Orchestras ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn orchestra_registration_fills_cart_and_memberships() {
  let s = store().await;
  let member = person(&s, "ada@example.com").await;
  let sof = s.add_orchestra("Bleckhornen".into()).await.unwrap();
  let festival = s.add_event("SOF".into()).await.unwrap();

  let mut ticket = NewProduct::new("Festival ticket", d("500"));
  ticket.ticket_events = Some(vec![festival.event_id]);
  let ticket = product(&s, ticket).await;
  let food = product(&s, NewProduct::new("Food", d("300"))).await;

  let ticket_type = s
    .add_orchestra_ticket_type(NewOrchestraTicketType {
      product_id:            ticket,
      food_product:          Some(food),
      accommodation_product: None,
      dinner_product:        None,
    })
    .await
    .unwrap();
  assert_eq!(s.list_orchestra_ticket_types().await.unwrap(), vec![ticket_type.clone()]);

  let holdings = s
    .register_orchestra_member(member, OrchestraRegistration {
      ticket_type_id: ticket_type.ticket_type_id,
      food:           true,
      accommodation:  false,
      dinner:         false,
      memberships:    vec![MembershipInput {
        orchestra_id: sof.orchestra_id,
        active:       true,
        primary:      true,
      }],
    })
    .await
    .unwrap();
  let products: Vec<_> = holdings.iter().map(|h| h.product_id).collect();
  assert_eq!(products, [ticket, food]);

  let memberships = s.memberships(member).await.unwrap();
  assert_eq!(memberships.len(), 1);
  assert!(memberships[0].primary);

  let ctx = s.eligibility_context(member).await.unwrap();
  assert_eq!(ctx.active_orchestras, vec![sof.orchestra_id]);
}

#[tokio::test]
async fn unavailable_extra_leaves_nothing_behind() {
  let s = store().await;
  let member = person(&s, "ada@example.com").await;
  let sof = s.add_orchestra("Bleckhornen".into()).await.unwrap();
  let mut ticket = NewProduct::new("Festival ticket", d("500"));
  ticket.ticket_events = Some(vec![]);
  let ticket = product(&s, ticket).await;
  let ticket_type = s
    .add_orchestra_ticket_type(NewOrchestraTicketType {
      product_id:            ticket,
      food_product:          None,
      accommodation_product: None,
      dinner_product:        None,
    })
    .await
    .unwrap();

  let err = s
    .register_orchestra_member(member, OrchestraRegistration {
      ticket_type_id: ticket_type.ticket_type_id,
      food:           false,
      accommodation:  false,
      dinner:         true,
      memberships:    vec![MembershipInput {
        orchestra_id: sof.orchestra_id,
        active:       true,
        primary:      true,
      }],
    })
    .await
    .unwrap_err();
  assert!(core(&err).is_validation());
  assert!(s.cart_holdings(member).await.unwrap().is_empty());
  assert!(s.memberships(member).await.unwrap().is_empty());
}

#[tokio::test]
async fn memberships_need_one_primary() {
  let s = store().await;
  let member = person(&s, "ada@example.com").await;
  let a = s.add_orchestra("A".into()).await.unwrap();
  let b = s.add_orchestra("B".into()).await.unwrap();

  let err = s
    .set_memberships(member, vec![
      MembershipInput { orchestra_id: a.orchestra_id, active: true, primary: false },
      MembershipInput { orchestra_id: b.orchestra_id, active: true, primary: false },
    ])
    .await
    .unwrap_err();
  assert!(core(&err).is_validation());

  let set = s
    .set_memberships(member, vec![
      MembershipInput { orchestra_id: a.orchestra_id, active: false, primary: true },
      MembershipInput { orchestra_id: b.orchestra_id, active: true, primary: false },
    ])
    .await
    .unwrap();
  assert_eq!(set.len(), 2);
  let ctx = s.eligibility_context(member).await.unwrap();
  assert_eq!(ctx.active_orchestras, vec![b.orchestra_id]);
}
