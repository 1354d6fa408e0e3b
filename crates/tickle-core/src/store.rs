//! The `TicketStore` trait.
//!
//! Implemented by storage backends (e.g. `tickle-store-sqlite`). The HTTP
//! layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
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
};

/// Errors returned by a store, which may wrap a domain rule violation.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The domain error behind this failure, if it is one.
  fn as_core(&self) -> Option<&crate::Error>;
}

impl StoreError for crate::Error {
  fn as_core(&self) -> Option<&crate::Error> { Some(self) }
}

/// Abstraction over a Tickle storage backend.
///
/// Holdings are never deleted once purchased; a purchase is invalidated
/// instead. All methods return `Send` futures so the trait can be used from
/// a multi-threaded runtime.
pub trait TicketStore: Send + Sync {
  type Error: StoreError;

  // ── People ────────────────────────────────────────────────────────────

  /// Fails with [`crate::Error::EmailTaken`] if the email is registered.
  fn add_person(
    &self,
    input: NewPerson,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  fn get_person(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// Case-insensitive lookup by login email.
  fn find_person_by_email(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// Ordered by first name, then last name.
  fn list_people(&self) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  /// Overwrite every mutable field of an existing person.
  fn update_person(
    &self,
    person: Person,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Get or create the union called `name`.
  fn student_union(
    &self,
    name: String,
  ) -> impl Future<Output = Result<StudentUnion, Self::Error>> + Send + '_;

  fn add_special_nutrition(
    &self,
    name: String,
  ) -> impl Future<Output = Result<SpecialNutrition, Self::Error>> + Send + '_;

  fn list_special_nutrition(
    &self,
  ) -> impl Future<Output = Result<Vec<SpecialNutrition>, Self::Error>> + Send + '_;

  /// Gather what discount eligibility rules need to know about a person.
  fn eligibility_context(
    &self,
    person_id: Uuid,
  ) -> impl Future<Output = Result<EligibilityContext, Self::Error>> + Send + '_;

  // ── Catalog ───────────────────────────────────────────────────────────

  fn add_event(&self, name: String) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  fn list_events(&self) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  /// Distinct holders of validly purchased tickets admitting to the event.
  fn event_visitors(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  fn add_category(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  fn add_product(
    &self,
    input: NewProduct,
  ) -> impl Future<Output = Result<Product, Self::Error>> + Send + '_;

  fn get_product(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Product>, Self::Error>> + Send + '_;

  /// Ordered by the product's `order` field.
  fn list_products<'a>(
    &'a self,
    query: &'a ProductQuery,
  ) -> impl Future<Output = Result<Vec<Product>, Self::Error>> + Send + 'a;

  fn add_variation(
    &self,
    product_id: Uuid,
    name: String,
  ) -> impl Future<Output = Result<ProductVariation, Self::Error>> + Send + '_;

  fn add_choice(
    &self,
    variation_id: Uuid,
    input: NewChoice,
  ) -> impl Future<Output = Result<VariationChoice, Self::Error>> + Send + '_;

  /// A product's variations by name, each with its choices by order.
  fn variations(
    &self,
    product_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ProductVariation>, Self::Error>> + Send + '_;

  // ── Discounts ─────────────────────────────────────────────────────────

  fn add_discount(
    &self,
    input: NewDiscount,
  ) -> impl Future<Output = Result<Discount, Self::Error>> + Send + '_;

  /// Replace a discount's name, adjustment and rule. Holdings already
  /// purchased keep their frozen copies.
  fn update_discount(
    &self,
    discount: Discount,
  ) -> impl Future<Output = Result<Discount, Self::Error>> + Send + '_;

  /// Attach a discount to a product. Attaching twice is a no-op.
  fn attach_discount(
    &self,
    product_id: Uuid,
    discount_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn product_discounts(
    &self,
    product_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Discount>, Self::Error>> + Send + '_;

  /// The discounts frozen onto a purchased holding.
  fn holding_discounts(
    &self,
    holding_id: Uuid,
  ) -> impl Future<Output = Result<Vec<HoldingDiscount>, Self::Error>> + Send + '_;

  // ── Cart ──────────────────────────────────────────────────────────────

  /// The person's shopping cart, created on first use.
  fn cart(
    &self,
    person_id: Uuid,
  ) -> impl Future<Output = Result<ShoppingCart, Self::Error>> + Send + '_;

  /// Validate and add a line to the person's cart. Refused when the product
  /// is unpublished or one of its limits is already reached.
  fn add_to_cart(
    &self,
    person_id: Uuid,
    input: NewHolding,
  ) -> impl Future<Output = Result<Holding, Self::Error>> + Send + '_;

  fn remove_from_cart(
    &self,
    person_id: Uuid,
    holding_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn cart_holdings(
    &self,
    person_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Holding>, Self::Error>> + Send + '_;

  /// Turn the person's cart into a purchase, all or nothing: limits are
  /// checked, prices snapshotted, eligible discounts frozen and every holding
  /// moved to the new purchase.
  fn purchase_cart(
    &self,
    person_id: Uuid,
  ) -> impl Future<Output = Result<Purchase, Self::Error>> + Send + '_;

  // ── Holdings ──────────────────────────────────────────────────────────

  fn get_holding(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Holding>, Self::Error>> + Send + '_;

  /// Current price for a cart holding, or the snapshot for a purchased one.
  fn price_holding(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<PriceBreakdown, Self::Error>> + Send + '_;

  /// Mark a purchased holding as used.
  fn utilize_holding(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Holding, Self::Error>> + Send + '_;

  /// Give a purchased, transferable holding to someone else.
  fn transfer_holding(
    &self,
    id: Uuid,
    to_person: Uuid,
  ) -> impl Future<Output = Result<Holding, Self::Error>> + Send + '_;

  fn record_delivery(
    &self,
    holding_ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<Delivery, Self::Error>> + Send + '_;

  // ── Purchases ─────────────────────────────────────────────────────────

  fn get_purchase(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Purchase>, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_purchases(
    &self,
    person_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Purchase>, Self::Error>> + Send + '_;

  fn purchase_holdings(
    &self,
    purchase_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Holding>, Self::Error>> + Send + '_;

  fn invalidate_purchase(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Purchase, Self::Error>> + Send + '_;

  // ── Limits ────────────────────────────────────────────────────────────

  /// Units of a product in valid purchases, for one person or for everyone.
  fn purchased_quantity(
    &self,
    product_id: Uuid,
    person_id: Option<Uuid>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn limit_status(
    &self,
    product_id: Uuid,
    person_id: Option<Uuid>,
  ) -> impl Future<Output = Result<LimitStatus, Self::Error>> + Send + '_;

  // ── Orchestras ────────────────────────────────────────────────────────

  fn add_orchestra(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Orchestra, Self::Error>> + Send + '_;

  fn list_orchestras(&self) -> impl Future<Output = Result<Vec<Orchestra>, Self::Error>> + Send + '_;

  /// Replace the person's memberships.
  fn set_memberships(
    &self,
    person_id: Uuid,
    memberships: Vec<MembershipInput>,
  ) -> impl Future<Output = Result<Vec<OrchestraMembership>, Self::Error>> + Send + '_;

  fn memberships(
    &self,
    person_id: Uuid,
  ) -> impl Future<Output = Result<Vec<OrchestraMembership>, Self::Error>> + Send + '_;

  fn add_orchestra_ticket_type(
    &self,
    input: NewOrchestraTicketType,
  ) -> impl Future<Output = Result<OrchestraTicketType, Self::Error>> + Send + '_;

  fn list_orchestra_ticket_types(
    &self,
  ) -> impl Future<Output = Result<Vec<OrchestraTicketType>, Self::Error>> + Send + '_;

  /// Set memberships and put the ticket and chosen add-ons in the cart, in
  /// one transaction.
  fn register_orchestra_member(
    &self,
    person_id: Uuid,
    registration: OrchestraRegistration,
  ) -> impl Future<Output = Result<Vec<Holding>, Self::Error>> + Send + '_;
}
