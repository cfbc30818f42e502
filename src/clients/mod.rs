use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::{Addon, Subscription};
use crate::files::FileRecord;
use crate::session::Session;
use crate::shared::error::ApiError;
use crate::shared::models::schema::{addons, client_addons, clients, files, subscriptions, team_members};
use crate::shared::state::AppState;
use crate::team::{InvitationStatus, TeamMember};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Pending,
    Active,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            _ => None,
        }
    }

    /// Status only moves forward: pending -> active. Same-state writes are no-ops.
    pub fn can_transition(self, to: Self) -> bool {
        !(self == Self::Active && to == Self::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl OnboardingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(Self::NotStarted),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = clients)]
pub struct Client {
    pub id: Uuid,
    pub email: String,
    pub company_name: String,
    pub phone: Option<String>,
    pub status: String,
    pub onboarding_status: String,
    pub subscription_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = client_addons)]
pub struct ClientAddon {
    pub id: Uuid,
    pub client_id: Uuid,
    pub addon_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateClientRequest {
    pub email: String,
    pub company_name: String,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub subscription_id: Option<Uuid>,
    #[serde(default)]
    pub addon_ids: Vec<Uuid>,
    #[serde(default)]
    pub team_member_emails: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateClientRequest {
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
    pub onboarding_status: Option<String>,
    pub subscription_id: Option<Uuid>,
    pub addon_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = clients)]
struct ClientChanges {
    company_name: Option<String>,
    phone: Option<String>,
    notes: Option<String>,
    status: Option<String>,
    onboarding_status: Option<String>,
    subscription_id: Option<Uuid>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreatedClient {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ClientWithDetails {
    pub client: Client,
    pub subscription: Option<Subscription>,
    pub addons: Vec<Addon>,
    pub team_members: Vec<TeamMember>,
    pub files: Vec<FileRecord>,
}

pub fn validate_create(req: &CreateClientRequest) -> Result<(), ApiError> {
    let email = req.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation("a valid email is required".to_string()));
    }
    if req.company_name.trim().is_empty() {
        return Err(ApiError::Validation("company name is required".to_string()));
    }
    for member in &req.team_member_emails {
        if member.trim().is_empty() || !member.contains('@') {
            return Err(ApiError::Validation(format!(
                "invalid team member email: {member:?}"
            )));
        }
    }
    Ok(())
}

/// Creates the client row, its addon associations and its team member rows
/// as three sequential writes. There is no rollback: a failure at any step
/// leaves the earlier writes committed and surfaces immediately.
pub fn insert_client_records(
    conn: &mut PgConnection,
    req: &CreateClientRequest,
) -> Result<Uuid, ApiError> {
    let now = Utc::now();
    let client_id = Uuid::new_v4();

    let client = Client {
        id: client_id,
        email: req.email.trim().to_string(),
        company_name: req.company_name.trim().to_string(),
        phone: req.phone.clone(),
        status: ClientStatus::Pending.as_str().to_string(),
        onboarding_status: OnboardingStatus::InProgress.as_str().to_string(),
        subscription_id: req.subscription_id,
        notes: req.notes.clone(),
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(clients::table)
        .values(&client)
        .execute(conn)?;

    let associations: Vec<ClientAddon> = req
        .addon_ids
        .iter()
        .map(|addon_id| ClientAddon {
            id: Uuid::new_v4(),
            client_id,
            addon_id: *addon_id,
            created_at: now,
        })
        .collect();

    if !associations.is_empty() {
        diesel::insert_into(client_addons::table)
            .values(&associations)
            .execute(conn)?;
    }

    for member_email in &req.team_member_emails {
        let member = TeamMember {
            id: Uuid::new_v4(),
            client_id,
            email: member_email.trim().to_string(),
            user_id: None,
            invitation_status: InvitationStatus::Pending.as_str().to_string(),
            invited_at: now,
            accepted_at: None,
        };
        diesel::insert_into(team_members::table)
            .values(&member)
            .execute(conn)?;
    }

    Ok(client_id)
}

/// Full replacement of a client's addon set: delete everything, then bulk
/// insert the new associations. A failure between the two steps leaves the
/// client with zero addons.
pub fn replace_client_addons(
    conn: &mut PgConnection,
    client_id: Uuid,
    addon_ids: &[Uuid],
) -> Result<usize, ApiError> {
    diesel::delete(client_addons::table.filter(client_addons::client_id.eq(client_id)))
        .execute(conn)?;

    if addon_ids.is_empty() {
        return Ok(0);
    }

    let now = Utc::now();
    let rows: Vec<ClientAddon> = addon_ids
        .iter()
        .map(|addon_id| ClientAddon {
            id: Uuid::new_v4(),
            client_id,
            addon_id: *addon_id,
            created_at: now,
        })
        .collect();

    let inserted = diesel::insert_into(client_addons::table)
        .values(&rows)
        .execute(conn)?;
    Ok(inserted)
}

pub async fn create_client(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Json(req): Json<CreateClientRequest>,
) -> Result<Json<CreatedClient>, ApiError> {
    validate_create(&req)?;

    let mut conn = state.conn.get().map_err(ApiError::db)?;
    let id = insert_client_records(&mut conn, &req)?;
    info!("created client {} ({})", id, req.company_name.trim());
    Ok(Json(CreatedClient { id }))
}

pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Client>>, ApiError> {
    let mut conn = state.conn.get().map_err(ApiError::db)?;

    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let mut q = clients::table.into_boxed();

    if let Some(status) = query.status {
        if ClientStatus::parse(&status).is_none() {
            return Err(ApiError::Validation(format!("unknown status: {status}")));
        }
        q = q.filter(clients::status.eq(status));
    }

    if let Some(search) = query.search {
        let pattern = format!("%{search}%");
        q = q.filter(
            clients::company_name
                .ilike(pattern.clone())
                .or(clients::email.ilike(pattern)),
        );
    }

    let rows: Vec<Client> = q
        .order(clients::created_at.desc())
        .limit(limit)
        .offset(offset)
        .load(&mut conn)?;

    Ok(Json(rows))
}

pub async fn get_client(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<ClientWithDetails>, ApiError> {
    let mut conn = state.conn.get().map_err(ApiError::db)?;

    let client: Client = clients::table
        .find(id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound(format!("client {id} not found")))?;

    let subscription: Option<Subscription> = match client.subscription_id {
        Some(sub_id) => subscriptions::table.find(sub_id).first(&mut conn).optional()?,
        None => None,
    };

    let addon_rows: Vec<Addon> = client_addons::table
        .inner_join(addons::table)
        .filter(client_addons::client_id.eq(id))
        .select(addons::all_columns)
        .load(&mut conn)?;

    let members: Vec<TeamMember> = team_members::table
        .filter(team_members::client_id.eq(id))
        .order(team_members::invited_at.asc())
        .load(&mut conn)?;

    let file_rows: Vec<FileRecord> = files::table
        .filter(files::client_id.eq(id))
        .order(files::uploaded_at.desc())
        .load(&mut conn)?;

    Ok(Json(ClientWithDetails {
        client,
        subscription,
        addons: addon_rows,
        team_members: members,
        files: file_rows,
    }))
}

pub async fn update_client(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateClientRequest>,
) -> Result<Json<Client>, ApiError> {
    let mut conn = state.conn.get().map_err(ApiError::db)?;

    let current: Client = clients::table
        .find(id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound(format!("client {id} not found")))?;

    if let Some(ref status) = req.status {
        let to = ClientStatus::parse(status)
            .ok_or_else(|| ApiError::Validation(format!("unknown status: {status}")))?;
        let from = ClientStatus::parse(&current.status)
            .ok_or_else(|| ApiError::Database(format!("corrupt status on client {id}")))?;
        if !from.can_transition(to) {
            return Err(ApiError::Conflict(format!(
                "client status cannot move from {} to {}",
                current.status, status
            )));
        }
    }

    if let Some(ref onboarding) = req.onboarding_status {
        if OnboardingStatus::parse(onboarding).is_none() {
            return Err(ApiError::Validation(format!(
                "unknown onboarding status: {onboarding}"
            )));
        }
    }

    let changes = ClientChanges {
        company_name: req.company_name.clone(),
        phone: req.phone.clone(),
        notes: req.notes.clone(),
        status: req.status.clone(),
        onboarding_status: req.onboarding_status.clone(),
        subscription_id: req.subscription_id,
        updated_at: Utc::now(),
    };

    diesel::update(clients::table.find(id))
        .set(&changes)
        .execute(&mut conn)?;

    if let Some(ref addon_ids) = req.addon_ids {
        replace_client_addons(&mut conn, id, addon_ids)?;
    }

    let updated: Client = clients::table.find(id).first(&mut conn)?;
    Ok(Json(updated))
}

pub async fn delete_client(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.conn.get().map_err(ApiError::db)?;

    // Dependent rows first, then the client itself.
    diesel::delete(client_addons::table.filter(client_addons::client_id.eq(id)))
        .execute(&mut conn)?;
    diesel::delete(team_members::table.filter(team_members::client_id.eq(id)))
        .execute(&mut conn)?;
    diesel::delete(files::table.filter(files::client_id.eq(id))).execute(&mut conn)?;

    let deleted = diesel::delete(clients::table.find(id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(ApiError::NotFound(format!("client {id} not found")));
    }

    info!("deleted client {id}");
    Ok(Json(serde_json::json!({ "deleted": id })))
}

pub fn configure_client_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/clients", get(list_clients).post(create_client))
        .route(
            "/api/clients/:id",
            get(get_client).put(update_client).delete(delete_client),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateClientRequest {
        CreateClientRequest {
            email: "owner@acme.test".to_string(),
            company_name: "Acme".to_string(),
            phone: None,
            notes: None,
            subscription_id: None,
            addon_ids: vec![],
            team_member_emails: vec![],
        }
    }

    #[test]
    fn create_requires_valid_email() {
        let mut req = request();
        req.email = "".to_string();
        assert!(validate_create(&req).is_err());

        req.email = "not-an-email".to_string();
        assert!(validate_create(&req).is_err());

        req.email = "owner@acme.test".to_string();
        assert!(validate_create(&req).is_ok());
    }

    #[test]
    fn create_requires_company_name() {
        let mut req = request();
        req.company_name = "   ".to_string();
        assert!(validate_create(&req).is_err());
    }

    #[test]
    fn create_rejects_bad_team_emails() {
        let mut req = request();
        req.team_member_emails = vec!["teammate@acme.test".to_string(), "nope".to_string()];
        assert!(validate_create(&req).is_err());
    }

    #[test]
    fn status_never_regresses() {
        assert!(ClientStatus::Pending.can_transition(ClientStatus::Active));
        assert!(ClientStatus::Pending.can_transition(ClientStatus::Pending));
        assert!(ClientStatus::Active.can_transition(ClientStatus::Active));
        assert!(!ClientStatus::Active.can_transition(ClientStatus::Pending));
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [ClientStatus::Pending, ClientStatus::Active] {
            assert_eq!(ClientStatus::parse(status.as_str()), Some(status));
        }
        for status in [
            OnboardingStatus::NotStarted,
            OnboardingStatus::InProgress,
            OnboardingStatus::Completed,
        ] {
            assert_eq!(OnboardingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ClientStatus::parse("archived"), None);
        assert_eq!(OnboardingStatus::parse("done"), None);
    }
}
