//! SQL schema for the Tickle SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── People ──────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS student_unions (
    union_id TEXT PRIMARY KEY,
    name     TEXT NOT NULL UNIQUE,
    slug     TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS people (
    person_id        TEXT PRIMARY KEY,
    email            TEXT NOT NULL UNIQUE COLLATE NOCASE,
    first_name       TEXT NOT NULL,
    last_name        TEXT NOT NULL,
    password_hash    TEXT,
    birth_date       TEXT,               -- ISO 8601 date
    pid_code         TEXT,               -- NULL rather than '' so UNIQUE ignores it
    pid_coordination INTEGER NOT NULL DEFAULT 0,
    liu_id           TEXT UNIQUE,
    liu_id_blocked   INTEGER,
    liu_card_magnet  TEXT NOT NULL DEFAULT '',
    liu_card_rfid    TEXT NOT NULL DEFAULT '',
    student_union_id TEXT REFERENCES student_unions(union_id),
    is_active        INTEGER NOT NULL DEFAULT 1,
    is_staff         INTEGER NOT NULL DEFAULT 0,
    is_superuser     INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL,
    UNIQUE (birth_date, pid_code, pid_coordination)
);

CREATE TABLE IF NOT EXISTS special_nutrition (
    nutrition_id TEXT PRIMARY KEY,
    name         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS person_nutrition (
    person_id    TEXT NOT NULL REFERENCES people(person_id),
    nutrition_id TEXT NOT NULL REFERENCES special_nutrition(nutrition_id),
    PRIMARY KEY (person_id, nutrition_id)
);

-- ── Catalog ─────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS events (
    event_id TEXT PRIMARY KEY,
    name     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    category_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    product_id     TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    public_name    TEXT,
    description    TEXT NOT NULL DEFAULT '',
    base_price     TEXT NOT NULL,    -- decimal string
    quantitative   INTEGER NOT NULL DEFAULT 0,
    published      INTEGER NOT NULL DEFAULT 1,
    transferable   INTEGER NOT NULL DEFAULT 1,
    sort_order     INTEGER NOT NULL DEFAULT 0,
    personal_limit INTEGER,          -- NULL means unlimited
    total_limit    INTEGER,          -- NULL means unlimited
    is_ticket_type INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS product_categories (
    product_id  TEXT NOT NULL REFERENCES products(product_id),
    category_id TEXT NOT NULL REFERENCES categories(category_id),
    PRIMARY KEY (product_id, category_id)
);

-- Events admitted by a ticket-type product.
CREATE TABLE IF NOT EXISTS ticket_type_events (
    product_id TEXT NOT NULL REFERENCES products(product_id),
    event_id   TEXT NOT NULL REFERENCES events(event_id),
    PRIMARY KEY (product_id, event_id)
);

CREATE TABLE IF NOT EXISTS variations (
    variation_id TEXT PRIMARY KEY,
    product_id   TEXT NOT NULL REFERENCES products(product_id),
    name         TEXT NOT NULL,
    UNIQUE (product_id, name)
);

CREATE TABLE IF NOT EXISTS variation_choices (
    choice_id    TEXT PRIMARY KEY,
    variation_id TEXT NOT NULL REFERENCES variations(variation_id),
    name         TEXT NOT NULL,
    sort_order   INTEGER NOT NULL DEFAULT 0,
    delta        TEXT NOT NULL DEFAULT '0',
    UNIQUE (variation_id, name)
);

-- ── Discounts ───────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS discounts (
    discount_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    adjustment  TEXT NOT NULL,   -- JSON Adjustment
    eligibility TEXT NOT NULL    -- JSON Eligibility
);

CREATE TABLE IF NOT EXISTS product_discounts (
    product_id  TEXT NOT NULL REFERENCES products(product_id),
    discount_id TEXT NOT NULL REFERENCES discounts(discount_id),
    PRIMARY KEY (product_id, discount_id)
);

-- ── Carts, purchases, holdings ──────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS carts (
    cart_id   TEXT PRIMARY KEY,
    person_id TEXT NOT NULL UNIQUE REFERENCES people(person_id)
);

CREATE TABLE IF NOT EXISTS purchases (
    purchase_id TEXT PRIMARY KEY,
    person_id   TEXT NOT NULL REFERENCES people(person_id),
    purchased   TEXT NOT NULL,
    valid       INTEGER NOT NULL DEFAULT 1
);

-- Exactly one of cart_id / purchase_id is set.
CREATE TABLE IF NOT EXISTS holdings (
    holding_id     TEXT PRIMARY KEY,
    person_id      TEXT NOT NULL REFERENCES people(person_id),
    product_id     TEXT NOT NULL REFERENCES products(product_id),
    quantity       INTEGER NOT NULL DEFAULT 1 CHECK (quantity >= 1),
    cart_id        TEXT REFERENCES carts(cart_id),
    purchase_id    TEXT REFERENCES purchases(purchase_id),
    transferable   INTEGER,
    utilized       TEXT,
    price_snapshot TEXT,          -- JSON PriceBreakdown, set at purchase
    created_at     TEXT NOT NULL,
    CHECK ((cart_id IS NULL) != (purchase_id IS NULL))
);

CREATE TABLE IF NOT EXISTS holding_choices (
    holding_id TEXT NOT NULL REFERENCES holdings(holding_id),
    choice_id  TEXT NOT NULL REFERENCES variation_choices(choice_id),
    PRIMARY KEY (holding_id, choice_id)
);

-- Discounts frozen at purchase time. No foreign key to discounts: the copy
-- outlives edits to the original.
CREATE TABLE IF NOT EXISTS holding_discounts (
    holding_id  TEXT NOT NULL REFERENCES holdings(holding_id),
    discount_id TEXT NOT NULL,
    name        TEXT NOT NULL,
    adjustment  TEXT NOT NULL,
    delta       TEXT NOT NULL,
    PRIMARY KEY (holding_id, discount_id)
);

CREATE TABLE IF NOT EXISTS deliveries (
    delivery_id TEXT PRIMARY KEY,
    delivered   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS delivery_holdings (
    delivery_id TEXT NOT NULL REFERENCES deliveries(delivery_id),
    holding_id  TEXT NOT NULL REFERENCES holdings(holding_id),
    PRIMARY KEY (delivery_id, holding_id)
);

-- ── Orchestras ──────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS orchestras (
    orchestra_id TEXT PRIMARY KEY,
    name         TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS orchestra_memberships (
    person_id    TEXT NOT NULL REFERENCES people(person_id),
    orchestra_id TEXT NOT NULL REFERENCES orchestras(orchestra_id),
    active       INTEGER NOT NULL DEFAULT 1,
    is_primary   INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (person_id, orchestra_id)
);

CREATE TABLE IF NOT EXISTS orchestra_ticket_types (
    ticket_type_id        TEXT PRIMARY KEY,
    product_id            TEXT NOT NULL UNIQUE REFERENCES products(product_id),
    food_product          TEXT REFERENCES products(product_id),
    accommodation_product TEXT REFERENCES products(product_id),
    dinner_product        TEXT REFERENCES products(product_id)
);

CREATE INDEX IF NOT EXISTS holdings_person_idx   ON holdings(person_id);
CREATE INDEX IF NOT EXISTS holdings_product_idx  ON holdings(product_id);
CREATE INDEX IF NOT EXISTS holdings_cart_idx     ON holdings(cart_id);
CREATE INDEX IF NOT EXISTS holdings_purchase_idx ON holdings(purchase_id);
CREATE INDEX IF NOT EXISTS purchases_person_idx  ON purchases(person_id);

PRAGMA user_version = 1;
";
