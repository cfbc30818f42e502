use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::email;
use crate::session::Session;
use crate::shared::error::ApiError;
use crate::shared::models::schema::{clients, team_members};
use crate::shared::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Sent,
    Accepted,
    Revoked,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Accepted => "accepted",
            Self::Revoked => "revoked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "sent" => Some(Self::Sent),
            "accepted" => Some(Self::Accepted),
            "revoked" => Some(Self::Revoked),
            _ => None,
        }
    }

    /// Invitations only move forward (pending -> sent -> accepted). Revoke is
    /// reachable from pending or sent and is terminal: a revoked invitation
    /// admits no further transition. Accepted members are removed, not revoked.
    pub fn can_transition(self, to: Self) -> bool {
        match (self, to) {
            (Self::Pending, Self::Sent)
            | (Self::Pending, Self::Accepted)
            | (Self::Pending, Self::Revoked)
            | (Self::Sent, Self::Accepted)
            | (Self::Sent, Self::Revoked) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = team_members)]
pub struct TeamMember {
    pub id: Uuid,
    pub client_id: Uuid,
    pub email: String,
    pub user_id: Option<Uuid>,
    pub invitation_status: String,
    pub invited_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct AddTeamMemberRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    pub user_id: Uuid,
}

fn load_member(conn: &mut PgConnection, id: Uuid) -> Result<TeamMember, ApiError> {
    team_members::table
        .find(id)
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound(format!("team member {id} not found")))
}

fn member_status(member: &TeamMember) -> Result<InvitationStatus, ApiError> {
    InvitationStatus::parse(&member.invitation_status)
        .ok_or_else(|| ApiError::Database(format!("corrupt status on team member {}", member.id)))
}

pub async fn list_team(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Vec<TeamMember>>, ApiError> {
    let mut conn = state.conn.get().map_err(ApiError::db)?;
    let rows: Vec<TeamMember> = team_members::table
        .filter(team_members::client_id.eq(client_id))
        .order(team_members::invited_at.asc())
        .load(&mut conn)?;
    Ok(Json(rows))
}

pub async fn add_team_member(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(client_id): Path<Uuid>,
    Json(req): Json<AddTeamMemberRequest>,
) -> Result<Json<TeamMember>, ApiError> {
    let address = req.email.trim().to_string();
    if address.is_empty() || !address.contains('@') {
        return Err(ApiError::Validation("a valid email is required".to_string()));
    }

    let mut conn = state.conn.get().map_err(ApiError::db)?;

    let client_exists: i64 = clients::table
        .filter(clients::id.eq(client_id))
        .count()
        .get_result(&mut conn)?;
    if client_exists == 0 {
        return Err(ApiError::NotFound(format!("client {client_id} not found")));
    }

    let member = TeamMember {
        id: Uuid::new_v4(),
        client_id,
        email: address,
        user_id: None,
        invitation_status: InvitationStatus::Pending.as_str().to_string(),
        invited_at: Utc::now(),
        accepted_at: None,
    };
    diesel::insert_into(team_members::table)
        .values(&member)
        .execute(&mut conn)
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => ApiError::Conflict("member already invited for this client".to_string()),
            other => other.into(),
        })?;

    Ok(Json(member))
}

/// Dispatches the invitation email and advances pending -> sent. Sending
/// again for an already-sent invitation re-delivers without a status change.
pub async fn send_invitation(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<TeamMember>, ApiError> {
    let mut conn = state.conn.get().map_err(ApiError::db)?;
    let member = load_member(&mut conn, id)?;
    let status = member_status(&member)?;

    if !matches!(status, InvitationStatus::Pending | InvitationStatus::Sent) {
        return Err(ApiError::Conflict(format!(
            "invitation is {} and cannot be sent",
            member.invitation_status
        )));
    }

    let company_name: String = clients::table
        .find(member.client_id)
        .select(clients::company_name)
        .first(&mut conn)?;

    if let Err(e) = email::send_invitation(&state.config.mail, &member.email, &company_name) {
        error!("invitation mail to {} failed: {}", member.email, e);
        return Err(ApiError::Mail("failed to send invitation".to_string()));
    }

    if status == InvitationStatus::Pending {
        diesel::update(team_members::table.find(id))
            .set(team_members::invitation_status.eq(InvitationStatus::Sent.as_str()))
            .execute(&mut conn)?;
    }

    info!("invitation sent to {} for client {}", member.email, member.client_id);
    Ok(Json(load_member(&mut conn, id)?))
}

pub async fn accept_invitation(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(id): Path<Uuid>,
    Json(req): Json<AcceptInvitationRequest>,
) -> Result<Json<TeamMember>, ApiError> {
    let mut conn = state.conn.get().map_err(ApiError::db)?;
    let member = load_member(&mut conn, id)?;
    let status = member_status(&member)?;

    if !status.can_transition(InvitationStatus::Accepted) {
        return Err(ApiError::Conflict(format!(
            "invitation is {} and cannot be accepted",
            member.invitation_status
        )));
    }

    diesel::update(team_members::table.find(id))
        .set((
            team_members::invitation_status.eq(InvitationStatus::Accepted.as_str()),
            team_members::user_id.eq(Some(req.user_id)),
            team_members::accepted_at.eq(Some(Utc::now())),
        ))
        .execute(&mut conn)?;

    Ok(Json(load_member(&mut conn, id)?))
}

pub async fn revoke_invitation(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<TeamMember>, ApiError> {
    let mut conn = state.conn.get().map_err(ApiError::db)?;
    let member = load_member(&mut conn, id)?;
    let status = member_status(&member)?;

    if !status.can_transition(InvitationStatus::Revoked) {
        return Err(ApiError::Conflict(format!(
            "invitation is {} and cannot be revoked",
            member.invitation_status
        )));
    }

    diesel::update(team_members::table.find(id))
        .set(team_members::invitation_status.eq(InvitationStatus::Revoked.as_str()))
        .execute(&mut conn)?;

    Ok(Json(load_member(&mut conn, id)?))
}

pub async fn remove_team_member(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.conn.get().map_err(ApiError::db)?;
    let deleted = diesel::delete(team_members::table.find(id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(ApiError::NotFound(format!("team member {id} not found")));
    }
    Ok(Json(serde_json::json!({ "deleted": id })))
}

pub fn configure_team_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/clients/:id/team", get(list_team).post(add_team_member))
        .route("/api/team/:id", delete(remove_team_member))
        .route("/api/team/:id/send", post(send_invitation))
        .route("/api/team/:id/accept", post(accept_invitation))
        .route("/api/team/:id/revoke", post(revoke_invitation))
}

#[cfg(test)]
mod tests {
    use super::InvitationStatus::*;

    #[test]
    fn invitations_only_advance() {
        assert!(Pending.can_transition(Sent));
        assert!(Pending.can_transition(Accepted));
        assert!(Sent.can_transition(Accepted));
        assert!(!Sent.can_transition(Pending));
        assert!(!Accepted.can_transition(Pending));
        assert!(!Accepted.can_transition(Sent));
    }

    #[test]
    fn revoked_is_terminal() {
        for target in [Pending, Sent, Accepted, Revoked] {
            assert!(!Revoked.can_transition(target));
        }
    }

    #[test]
    fn revoke_reachable_before_acceptance() {
        assert!(Pending.can_transition(Revoked));
        assert!(Sent.can_transition(Revoked));
        assert!(!Accepted.can_transition(Revoked));
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [Pending, Sent, Accepted, Revoked] {
            assert_eq!(super::InvitationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(super::InvitationStatus::parse("expired"), None);
    }
}
