//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after a migration changes.

diesel::table! {
    /// Registered users.
    users (id) {
        id -> Uuid,
        /// External login identity; unique.
        open_id -> Varchar,
        /// User display code (12 digits); unique, null only on legacy rows.
        display_no -> Nullable<Varchar>,
        nickname -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Customer orders. Only the columns this service touches are mapped.
    orders (id) {
        id -> Uuid,
        user_id -> Uuid,
        /// Order display code (18 digits); unique.
        display_no -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Refunds raised against an order.
    order_refunds (id) {
        id -> Uuid,
        order_id -> Uuid,
        /// Refund display code (18 digits); unique.
        display_no -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Shipping addresses; at most one per user has `is_default` set.
    addresses (id) {
        id -> Uuid,
        user_id -> Uuid,
        name -> Varchar,
        phone -> Varchar,
        province -> Nullable<Varchar>,
        city -> Nullable<Varchar>,
        district -> Nullable<Varchar>,
        detail -> Varchar,
        postal_code -> Nullable<Varchar>,
        tag -> Nullable<Varchar>,
        is_default -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(addresses -> users (user_id));
diesel::joinable!(orders -> users (user_id));
diesel::joinable!(order_refunds -> orders (order_id));

diesel::allow_tables_to_appear_in_same_query!(addresses, order_refunds, orders, users);
