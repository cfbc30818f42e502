use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub token: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

pub mod schema {
    diesel::table! {
        clients (id) {
            id -> Uuid,
            email -> Text,
            company_name -> Text,
            phone -> Nullable<Text>,
            status -> Text,
            onboarding_status -> Text,
            subscription_id -> Nullable<Uuid>,
            notes -> Nullable<Text>,
            created_at -> Timestamptz,
            updated_at -> Timestamptz,
        }
    }

    diesel::table! {
        subscriptions (id) {
            id -> Uuid,
            name -> Text,
            description -> Nullable<Text>,
            price_cents -> Int4,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        addons (id) {
            id -> Uuid,
            name -> Text,
            description -> Nullable<Text>,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        client_addons (id) {
            id -> Uuid,
            client_id -> Uuid,
            addon_id -> Uuid,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        team_members (id) {
            id -> Uuid,
            client_id -> Uuid,
            email -> Text,
            user_id -> Nullable<Uuid>,
            invitation_status -> Text,
            invited_at -> Timestamptz,
            accepted_at -> Nullable<Timestamptz>,
        }
    }

    diesel::table! {
        files (id) {
            id -> Uuid,
            client_id -> Uuid,
            file_name -> Text,
            storage_key -> Text,
            category -> Nullable<Text>,
            status -> Text,
            verified_at -> Nullable<Timestamptz>,
            uploaded_at -> Timestamptz,
        }
    }

    diesel::table! {
        users (id) {
            id -> Uuid,
            email -> Text,
            token -> Text,
            is_active -> Bool,
            created_at -> Timestamptz,
        }
    }

    diesel::joinable!(clients -> subscriptions (subscription_id));
    diesel::joinable!(client_addons -> clients (client_id));
    diesel::joinable!(client_addons -> addons (addon_id));
    diesel::joinable!(team_members -> clients (client_id));
    diesel::joinable!(files -> clients (client_id));

    diesel::allow_tables_to_appear_in_same_query!(
        clients,
        subscriptions,
        addons,
        client_addons,
        team_members,
        files,
        users,
    );
}

pub use schema::*;
