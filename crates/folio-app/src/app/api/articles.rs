use salvo::http::StatusCode;
use salvo::writing::Json;
use salvo::{Depot, Request, Response, Router, handler};
use serde::Serialize;

use folio_core::constants::{
    ARTICLES_ROUTE_COMPONENT, CURSOR_ROUTE_COMPONENT, STATS_ROUTE_COMPONENT,
};
use folio_db::model::document::{Document, DocumentId};
use folio_service::auth::require_principal;
use folio_service::resource::{ArticleInput, ArticleService, AuthorStats};

use super::{parse_input, path_id};
use crate::error::{AppError, AppResult};
use crate::middleware::gate::{AccessGate, GateTarget};
use crate::services::get_services_from_depot;

const RESOURCE: &str = "Article";

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    #[serde(rename = "_id")]
    pub id: DocumentId,
}

#[derive(Debug, Serialize)]
pub struct CursorResponse {
    pub count: usize,
    pub articles: Vec<Document>,
}

/// GET /articles - List articles without their content
#[handler]
async fn list_articles(depot: &mut Depot) -> AppResult<Json<Vec<Document>>> {
    let services = get_services_from_depot(depot)?;
    Ok(Json(services.articles.list().await?))
}

/// ## Summary
/// POST /articles - Create an article owned by the session principal
///
/// The author defaults to the principal's username.
///
/// ## Errors
/// Returns HTTP 401 if the request is anonymous
/// Returns HTTP 400 if the title is missing
#[handler]
async fn create_article(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<()> {
    let services = get_services_from_depot(depot)?;
    let owner = require_principal(depot)?.clone();
    let input: ArticleInput = parse_input(req).await?;

    let id = services.articles.create(input, &owner).await?;

    res.status_code(StatusCode::CREATED);
    res.render(Json(CreatedResponse { id }));
    Ok(())
}

/// GET /articles/cursor/list - Stream titles and authors through a cursor
#[handler]
async fn cursor_articles(depot: &mut Depot) -> AppResult<Json<CursorResponse>> {
    let services = get_services_from_depot(depot)?;
    let articles = services.articles.cursor_list().await?;
    Ok(Json(CursorResponse {
        count: articles.len(),
        articles,
    }))
}

/// GET /articles/stats/summary - Article count and mean title length per author
#[handler]
async fn article_stats(depot: &mut Depot) -> AppResult<Json<Vec<AuthorStats>>> {
    let services = get_services_from_depot(depot)?;
    Ok(Json(services.articles.stats().await?))
}

async fn render_article(articles: &ArticleService, id: DocumentId) -> AppResult<Json<Document>> {
    articles
        .get(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound(RESOURCE))
}

/// GET /articles/{id} - Article detail including its content
#[handler]
async fn get_article(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Document>> {
    let services = get_services_from_depot(depot)?;
    let id = path_id(req, RESOURCE)?;
    render_article(&services.articles, id).await
}

/// ## Summary
/// PUT /articles/{id} - Replace the article
///
/// The owner and creation time are kept whatever the body says.
///
/// ## Errors
/// Returns HTTP 400 if the title is missing
/// Returns HTTP 404 if the article does not exist
#[handler]
async fn replace_article(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Document>> {
    let services = get_services_from_depot(depot)?;
    let id = path_id(req, RESOURCE)?;
    let input: ArticleInput = parse_input(req).await?;

    if !services.articles.replace(id, input).await? {
        return Err(AppError::NotFound(RESOURCE));
    }
    render_article(&services.articles, id).await
}

/// PATCH /articles/{id} - Update the provided fields
#[handler]
async fn update_article(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Document>> {
    let services = get_services_from_depot(depot)?;
    let id = path_id(req, RESOURCE)?;
    let input: ArticleInput = parse_input(req).await?;

    if !services.articles.update(id, input).await? {
        return Err(AppError::NotFound(RESOURCE));
    }
    render_article(&services.articles, id).await
}

/// DELETE /articles/{id}
#[handler]
async fn delete_article(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<()> {
    let services = get_services_from_depot(depot)?;
    let id = path_id(req, RESOURCE)?;

    if !services.articles.delete(id).await? {
        return Err(AppError::NotFound(RESOURCE));
    }
    res.status_code(StatusCode::NO_CONTENT);
    Ok(())
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(ARTICLES_ROUTE_COMPONENT)
        .get(list_articles)
        .post(create_article)
        .push(Router::with_path(CURSOR_ROUTE_COMPONENT).get(cursor_articles))
        .push(Router::with_path(STATS_ROUTE_COMPONENT).get(article_stats))
        .push(
            Router::with_path("{id}")
                .hoop(AccessGate::new(GateTarget::Articles))
                .get(get_article)
                .put(replace_article)
                .patch(update_article)
                .delete(delete_article),
        )
}
