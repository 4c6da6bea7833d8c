use salvo::http::StatusCode;
use salvo::writing::Json;
use salvo::{Depot, Request, Response, Router, handler};
use serde::Serialize;

use folio_core::constants::{CURSOR_ROUTE_COMPONENT, STATS_ROUTE_COMPONENT, USERS_ROUTE_COMPONENT};
use folio_db::model::document::{Document, DocumentId};
use folio_service::resource::{UserInput, UserService, UserStats};

use super::{parse_input, path_id};
use crate::error::{AppError, AppResult};
use crate::middleware::gate::{AccessGate, GateTarget};
use crate::services::get_services_from_depot;

const RESOURCE: &str = "User";

/// ## Summary
/// Registration response payload
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    #[serde(rename = "_id")]
    pub id: DocumentId,
}

/// ## Summary
/// Cursor listing response payload
#[derive(Debug, Serialize)]
pub struct CursorResponse {
    pub count: usize,
    pub users: Vec<Document>,
}

/// GET /users - List users
#[handler]
async fn list_users(depot: &mut Depot) -> AppResult<Json<Vec<Document>>> {
    let services = get_services_from_depot(depot)?;
    Ok(Json(services.users.list().await?))
}

/// ## Summary
/// POST /users - Register a new member
///
/// ## Side Effects
/// Stores the user with an Argon2 hash of the password and the `member` role.
///
/// ## Errors
/// Returns HTTP 400 if a required field is missing
/// Returns HTTP 409 if the username is taken
#[handler]
async fn create_user(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let services = get_services_from_depot(depot)?;
    let input: UserInput = parse_input(req).await?;

    let id = services.users.register(input).await?;

    res.status_code(StatusCode::CREATED);
    res.render(Json(CreatedResponse { id }));
    Ok(())
}

/// GET /users/cursor/list - Stream names and emails through a cursor
#[handler]
async fn cursor_users(depot: &mut Depot) -> AppResult<Json<CursorResponse>> {
    let services = get_services_from_depot(depot)?;
    let users = services.users.cursor_list().await?;
    Ok(Json(CursorResponse {
        count: users.len(),
        users,
    }))
}

/// GET /users/stats/summary - Total users and mean name length
#[handler]
async fn user_stats(depot: &mut Depot) -> AppResult<Json<UserStats>> {
    let services = get_services_from_depot(depot)?;
    Ok(Json(services.users.stats().await?))
}

/// GET /users/{id} - User detail
#[handler]
async fn get_user(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Document>> {
    let services = get_services_from_depot(depot)?;
    let id = path_id(req, RESOURCE)?;
    render_user(&services.users, id).await
}

async fn render_user(users: &UserService, id: DocumentId) -> AppResult<Json<Document>> {
    users
        .get(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound(RESOURCE))
}

/// ## Summary
/// PUT /users/{id} - Replace the user document
///
/// The role and creation time of the existing user are kept.
///
/// ## Errors
/// Returns HTTP 400 if a required field is missing
/// Returns HTTP 404 if the user does not exist
/// Returns HTTP 409 if the new username is taken
#[handler]
async fn replace_user(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Document>> {
    let services = get_services_from_depot(depot)?;
    let id = path_id(req, RESOURCE)?;
    let input: UserInput = parse_input(req).await?;

    if !services.users.replace(id, input).await? {
        return Err(AppError::NotFound(RESOURCE));
    }
    render_user(&services.users, id).await
}

/// ## Summary
/// PATCH /users/{id} - Update the provided fields
///
/// ## Errors
/// Returns HTTP 404 if the user does not exist
/// Returns HTTP 409 if the new username is taken
#[handler]
async fn update_user(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Document>> {
    let services = get_services_from_depot(depot)?;
    let id = path_id(req, RESOURCE)?;
    let input: UserInput = parse_input(req).await?;

    if !services.users.update(id, input).await? {
        return Err(AppError::NotFound(RESOURCE));
    }
    render_user(&services.users, id).await
}

/// DELETE /users/{id}
#[handler]
async fn delete_user(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let services = get_services_from_depot(depot)?;
    let id = path_id(req, RESOURCE)?;

    if !services.users.delete(id).await? {
        return Err(AppError::NotFound(RESOURCE));
    }
    res.status_code(StatusCode::NO_CONTENT);
    Ok(())
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(USERS_ROUTE_COMPONENT)
        .get(list_users)
        .post(create_user)
        .push(Router::with_path(CURSOR_ROUTE_COMPONENT).get(cursor_users))
        .push(Router::with_path(STATS_ROUTE_COMPONENT).get(user_stats))
        .push(
            Router::with_path("{id}")
                .hoop(AccessGate::new(GateTarget::Users))
                .get(get_user)
                .put(replace_user)
                .patch(update_user)
                .delete(delete_user),
        )
}
