//! [`SqliteStore`], the SQLite implementation of [`TicketStore`].

use std::path::Path;

use chrono::Utc;
use uuid::Uuid;

use tickle_core::{
  catalog::{
    Category, Event, NewChoice, NewProduct, Product, ProductQuery, ProductVariation,
    VariationChoice,
  },
  discount::{Discount, EligibilityContext, HoldingDiscount, NewDiscount},
  holding::{Delivery, Holding, NewHolding, Purchase, ShoppingCart},
  limits::LimitStatus,
  orchestra::{
    MembershipInput, NewOrchestraTicketType, Orchestra, OrchestraMembership,
    OrchestraRegistration, OrchestraTicketType,
  },
  person::{NewPerson, Person, SpecialNutrition, StudentUnion},
  pricing::PriceBreakdown,
  store::TicketStore,
};

use crate::{Error, Result, cart, catalog, orchestra, people, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tickle store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread.
  pub(crate) async fn with_conn<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Run `f` inside a transaction that commits only if `f` succeeds.
  pub(crate) async fn in_transaction<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T> + Send + 'static,
  {
    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
      })
      .await
  }
}

// ─── TicketStore impl ────────────────────────────────────────────────────────

impl TicketStore for SqliteStore {
  type Error = Error;

  // ── People ────────────────────────────────────────────────────────────────

  async fn add_person(&self, input: NewPerson) -> Result<Person> {
    self.in_transaction(move |tx| people::insert(tx, input)).await
  }

  async fn get_person(&self, id: Uuid) -> Result<Option<Person>> {
    self.with_conn(move |conn| people::load(conn, id)).await
  }

  async fn find_person_by_email(&self, email: String) -> Result<Option<Person>> {
    self.with_conn(move |conn| people::find_by_email(conn, &email)).await
  }

  async fn list_people(&self) -> Result<Vec<Person>> {
    self.with_conn(|conn| people::list(conn)).await
  }

  async fn update_person(&self, person: Person) -> Result<Person> {
    self.in_transaction(move |tx| people::update(tx, person)).await
  }

  async fn student_union(&self, name: String) -> Result<StudentUnion> {
    self.with_conn(move |conn| people::student_union(conn, &name)).await
  }

  async fn add_special_nutrition(&self, name: String) -> Result<SpecialNutrition> {
    self.with_conn(move |conn| people::insert_nutrition(conn, &name)).await
  }

  async fn list_special_nutrition(&self) -> Result<Vec<SpecialNutrition>> {
    self.with_conn(|conn| people::list_nutrition(conn)).await
  }

  async fn eligibility_context(&self, person_id: Uuid) -> Result<EligibilityContext> {
    self.with_conn(move |conn| people::eligibility_context(conn, person_id)).await
  }

  // ── Catalog ───────────────────────────────────────────────────────────────

  async fn add_event(&self, name: String) -> Result<Event> {
    self.with_conn(move |conn| catalog::insert_event(conn, &name)).await
  }

  async fn list_events(&self) -> Result<Vec<Event>> {
    self.with_conn(|conn| catalog::list_events(conn)).await
  }

  async fn event_visitors(&self, event_id: Uuid) -> Result<Vec<Person>> {
    self.with_conn(move |conn| catalog::event_visitors(conn, event_id)).await
  }

  async fn add_category(&self, name: String) -> Result<Category> {
    self.with_conn(move |conn| catalog::insert_category(conn, &name)).await
  }

  async fn add_product(&self, input: NewProduct) -> Result<Product> {
    self.in_transaction(move |tx| catalog::insert_product(tx, input)).await
  }

  async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
    self.with_conn(move |conn| catalog::load_product(conn, id)).await
  }

  async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>> {
    let query = query.clone();
    self.with_conn(move |conn| catalog::list_products(conn, &query)).await
  }

  async fn add_variation(&self, product_id: Uuid, name: String) -> Result<ProductVariation> {
    self.with_conn(move |conn| catalog::insert_variation(conn, product_id, &name)).await
  }

  async fn add_choice(&self, variation_id: Uuid, input: NewChoice) -> Result<VariationChoice> {
    self.with_conn(move |conn| catalog::insert_choice(conn, variation_id, input)).await
  }

  async fn variations(&self, product_id: Uuid) -> Result<Vec<ProductVariation>> {
    self.with_conn(move |conn| catalog::variations(conn, product_id)).await
  }

  // ── Discounts ─────────────────────────────────────────────────────────────

  async fn add_discount(&self, input: NewDiscount) -> Result<Discount> {
    self.with_conn(move |conn| catalog::insert_discount(conn, input)).await
  }

  async fn update_discount(&self, discount: Discount) -> Result<Discount> {
    self.with_conn(move |conn| catalog::update_discount(conn, discount)).await
  }

  async fn attach_discount(&self, product_id: Uuid, discount_id: Uuid) -> Result<()> {
    self
      .with_conn(move |conn| catalog::attach_discount(conn, product_id, discount_id))
      .await
  }

  async fn product_discounts(&self, product_id: Uuid) -> Result<Vec<Discount>> {
    self.with_conn(move |conn| catalog::product_discounts(conn, product_id)).await
  }

  async fn holding_discounts(&self, holding_id: Uuid) -> Result<Vec<HoldingDiscount>> {
    self.with_conn(move |conn| catalog::holding_discounts(conn, holding_id)).await
  }

  // ── Cart ──────────────────────────────────────────────────────────────────

  async fn cart(&self, person_id: Uuid) -> Result<ShoppingCart> {
    self.with_conn(move |conn| cart::ensure_cart(conn, person_id)).await
  }

  async fn add_to_cart(&self, person_id: Uuid, input: NewHolding) -> Result<Holding> {
    self.in_transaction(move |tx| cart::add_to_cart(tx, person_id, input)).await
  }

  async fn remove_from_cart(&self, person_id: Uuid, holding_id: Uuid) -> Result<()> {
    self
      .in_transaction(move |tx| cart::remove_from_cart(tx, person_id, holding_id))
      .await
  }

  async fn cart_holdings(&self, person_id: Uuid) -> Result<Vec<Holding>> {
    self.with_conn(move |conn| cart::cart_holdings(conn, person_id)).await
  }

  async fn purchase_cart(&self, person_id: Uuid) -> Result<Purchase> {
    let (purchase, holdings) =
      self.in_transaction(move |tx| cart::purchase_cart(tx, person_id)).await?;
    tracing::info!(
      purchase_id = %purchase.purchase_id,
      person_id = %person_id,
      holdings,
      "purchase completed"
    );
    Ok(purchase)
  }

  // ── Holdings ──────────────────────────────────────────────────────────────

  async fn get_holding(&self, id: Uuid) -> Result<Option<Holding>> {
    self.with_conn(move |conn| cart::load_holding(conn, id)).await
  }

  async fn price_holding(&self, id: Uuid) -> Result<PriceBreakdown> {
    self
      .with_conn(move |conn| {
        let holding = cart::require_holding(conn, id)?;
        cart::price_holding(conn, &holding)
      })
      .await
  }

  async fn utilize_holding(&self, id: Uuid) -> Result<Holding> {
    self.in_transaction(move |tx| cart::utilize(tx, id)).await
  }

  async fn transfer_holding(&self, id: Uuid, to_person: Uuid) -> Result<Holding> {
    let holding = self.in_transaction(move |tx| cart::transfer(tx, id, to_person)).await?;
    tracing::info!(holding_id = %id, to = %to_person, "holding transferred");
    Ok(holding)
  }

  async fn record_delivery(&self, holding_ids: Vec<Uuid>) -> Result<Delivery> {
    self.in_transaction(move |tx| cart::record_delivery(tx, holding_ids)).await
  }

  // ── Purchases ─────────────────────────────────────────────────────────────

  async fn get_purchase(&self, id: Uuid) -> Result<Option<Purchase>> {
    self.with_conn(move |conn| cart::load_purchase(conn, id)).await
  }

  async fn list_purchases(&self, person_id: Uuid) -> Result<Vec<Purchase>> {
    self.with_conn(move |conn| cart::list_purchases(conn, person_id)).await
  }

  async fn purchase_holdings(&self, purchase_id: Uuid) -> Result<Vec<Holding>> {
    self.with_conn(move |conn| cart::purchase_holdings(conn, purchase_id)).await
  }

  async fn invalidate_purchase(&self, id: Uuid) -> Result<Purchase> {
    let purchase = self.in_transaction(move |tx| cart::invalidate(tx, id)).await?;
    tracing::info!(purchase_id = %id, at = %Utc::now(), "purchase invalidated");
    Ok(purchase)
  }

  // ── Limits ────────────────────────────────────────────────────────────────

  async fn purchased_quantity(&self, product_id: Uuid, person_id: Option<Uuid>) -> Result<u64> {
    self
      .with_conn(move |conn| cart::purchased_quantity(conn, product_id, person_id))
      .await
  }

  async fn limit_status(&self, product_id: Uuid, person_id: Option<Uuid>) -> Result<LimitStatus> {
    self
      .with_conn(move |conn| cart::limit_status(conn, product_id, person_id))
      .await
  }

  // ── Orchestras ────────────────────────────────────────────────────────────

  async fn add_orchestra(&self, name: String) -> Result<Orchestra> {
    self.with_conn(move |conn| orchestra::insert(conn, &name)).await
  }

  async fn list_orchestras(&self) -> Result<Vec<Orchestra>> {
    self.with_conn(|conn| orchestra::list(conn)).await
  }

  async fn set_memberships(
    &self,
    person_id: Uuid,
    memberships: Vec<MembershipInput>,
  ) -> Result<Vec<OrchestraMembership>> {
    self
      .in_transaction(move |tx| orchestra::replace_memberships(tx, person_id, &memberships))
      .await
  }

  async fn memberships(&self, person_id: Uuid) -> Result<Vec<OrchestraMembership>> {
    self.with_conn(move |conn| orchestra::memberships(conn, person_id)).await
  }

  async fn add_orchestra_ticket_type(
    &self,
    input: NewOrchestraTicketType,
  ) -> Result<OrchestraTicketType> {
    self.with_conn(move |conn| orchestra::insert_ticket_type(conn, input)).await
  }

  async fn list_orchestra_ticket_types(&self) -> Result<Vec<OrchestraTicketType>> {
    self.with_conn(|conn| orchestra::list_ticket_types(conn)).await
  }

  async fn register_orchestra_member(
    &self,
    person_id: Uuid,
    registration: OrchestraRegistration,
  ) -> Result<Vec<Holding>> {
    self
      .in_transaction(move |tx| orchestra::register(tx, person_id, registration))
      .await
  }
}
