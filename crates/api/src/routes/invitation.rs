use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use bson::oid::ObjectId;
use chrono::NaiveDate;
use invitely_db::models::Invitation;
use invitely_services::{Grant, RewardScope, RewardSummary, store::UserStore};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::auth::{AuthResponse, new_account, sign_in};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    pub id: String,
    pub email: String,
    pub key: String,
    pub date_invited: String,
    pub expiration_date: NaiveDate,
    pub is_valid: bool,
}

impl InvitationResponse {
    fn new(state: &AppState, invitation: Invitation) -> Self {
        Self {
            id: invitation.id.map(|id| id.to_hex()).unwrap_or_default(),
            expiration_date: state.invitations.expiration_date(&invitation),
            is_valid: state.invitations.is_valid(&invitation),
            date_invited: invitation.date_invited.to_chrono().to_rfc3339(),
            email: invitation.email,
            key: invitation.key,
        }
    }
}

/// What the invitee sees before registering.
#[derive(Debug, Serialize)]
pub struct KeyResponse {
    pub email: String,
    pub invited_by: String,
    pub expiration_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub available: i64,
    pub sent: i64,
    pub accepted: i64,
    pub performance: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct KeyRegisterRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub display_name: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RewardRequest {
    pub user_id: Option<String>,
    pub bonus: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct GiveRequest {
    pub user_id: Option<String>,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct RewardResponse {
    pub rewarded_users: u64,
    pub invitations_given: i64,
    pub message: String,
}

impl From<RewardSummary> for RewardResponse {
    fn from(summary: RewardSummary) -> Self {
        let message = if summary.rewarded_users > 0 {
            format!(
                "{} users are given a total of {} invitations.",
                summary.rewarded_users, summary.invitations_given
            )
        } else {
            "No user has performance above threshold, no invitations awarded.".to_string()
        };
        Self {
            rewarded_users: summary.rewarded_users,
            invitations_given: summary.invitations_given,
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub deleted: u64,
}

fn parse_scope(user_id: Option<&str>) -> Result<RewardScope, ApiError> {
    let user_id = user_id
        .map(|id| ObjectId::parse_str(id))
        .transpose()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".to_string()))?;
    Ok(user_id.into())
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<InviteRequest>,
) -> Result<(StatusCode, Json<InvitationResponse>), ApiError> {
    body.validate()?;
    let sender = state.users.find_by_id(auth.user_id).await?;

    let invitation = state.invitations.invite(&sender, &body.email).await?;
    state.invitations.send_email(&invitation, None, None).await?;

    Ok((
        StatusCode::CREATED,
        Json(InvitationResponse::new(&state, invitation)),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<InvitationResponse>>, ApiError> {
    let invitations = state.invitations.list_for_user(auth.user_id).await?;
    Ok(Json(
        invitations
            .into_iter()
            .map(|invitation| InvitationResponse::new(&state, invitation))
            .collect(),
    ))
}

pub async fn stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.ledger.stats(auth.user_id).await?;
    Ok(Json(StatsResponse {
        performance: state.ledger.score(&stats),
        available: stats.available,
        sent: stats.sent,
        accepted: stats.accepted,
    }))
}

pub async fn lookup(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<KeyResponse>, ApiError> {
    let invitation = state.invitations.find(&key).await?;
    let sender = state.users.find_by_id(invitation.user_id).await?;

    Ok(Json(KeyResponse {
        expiration_date: state.invitations.expiration_date(&invitation),
        email: invitation.email,
        invited_by: sender.display_name,
    }))
}

/// Registers the invitee. Any email in the body is ignored in favour of
/// the invited address.
pub async fn register(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<KeyRegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ApiError> {
    body.validate()?;
    let account = new_account(&state, body.username, body.display_name, &body.password)?;
    let (user, _) = state
        .registration
        .register_with_invitation(&key, account)
        .await?;

    let (headers, response) = sign_in(&state, user)?;
    Ok((StatusCode::CREATED, headers, response))
}

pub async fn reward(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<RewardRequest>,
) -> Result<Json<RewardResponse>, ApiError> {
    auth.require_staff()?;
    let scope = parse_scope(body.user_id.as_deref())?;
    let summary = state.rewards.reward(scope, body.bonus).await?;
    Ok(Json(summary.into()))
}

pub async fn give(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<GiveRequest>,
) -> Result<Json<RewardResponse>, ApiError> {
    auth.require_staff()?;
    let scope = parse_scope(body.user_id.as_deref())?;
    let summary = state
        .rewards
        .give_invitations(scope, Grant::Fixed(body.count))
        .await?;
    Ok(Json(summary.into()))
}

pub async fn purge(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PurgeResponse>, ApiError> {
    auth.require_staff()?;
    let deleted = state.invitations.purge_expired().await?;
    Ok(Json(PurgeResponse { deleted }))
}
