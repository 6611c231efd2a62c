use axum::{
    extract::{Path, Query, State},
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::{error, info, instrument};

use crate::{
    auth::session::SessionUser,
    countries::{
        dto::{CountryFilter, CountryInput, CountryQuery, NewCountry},
        repo::{self, CountryError},
        repo_types::{Country, SubRegion},
    },
    state::AppState,
};

pub fn country_routes() -> Router<AppState> {
    Router::new()
        .route("/countries", get(list_countries).post(create_country))
        .route(
            "/countries/:id",
            get(get_country).put(update_country).delete(delete_country),
        )
        .route("/subregions", get(list_sub_regions))
}

fn reject(e: CountryError) -> (StatusCode, String) {
    match e {
        CountryError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        CountryError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        CountryError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        CountryError::Database(e) => {
            error!(error = %e, "country query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "I'm sorry, but we have encountered a database error".into(),
            )
        }
    }
}

#[instrument(skip(state))]
pub async fn list_countries(
    State(state): State<AppState>,
    Query(q): Query<CountryQuery>,
) -> Result<Json<Vec<Country>>, (StatusCode, String)> {
    let filter = CountryFilter::from(q);
    let countries = repo::list(&state.db, &filter).await.map_err(reject)?;
    Ok(Json(countries))
}

#[instrument(skip(state))]
pub async fn get_country(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Country>, (StatusCode, String)> {
    let country = repo::get_by_id(&state.db, &id).await.map_err(reject)?;
    Ok(Json(country))
}

#[instrument(skip(state, body), fields(id = %body.id))]
pub async fn create_country(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Json(body): Json<NewCountry>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    repo::create(&state.db, &body).await.map_err(reject)?;
    let country = repo::get_by_id(&state.db, &body.id).await.map_err(reject)?;

    info!(id = %country.id, user_name = %user.user_name, "country added");
    Ok((
        StatusCode::CREATED,
        [(LOCATION, format!("/countries/{}", country.id))],
        Json(country),
    ))
}

#[instrument(skip(state, body))]
pub async fn update_country(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<String>,
    Json(body): Json<CountryInput>,
) -> Result<StatusCode, (StatusCode, String)> {
    repo::update(&state.db, &id, &body).await.map_err(reject)?;
    info!(%id, user_name = %user.user_name, "country updated");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn delete_country(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    repo::delete(&state.db, &id).await.map_err(reject)?;
    info!(%id, user_name = %user.user_name, "country deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, _user))]
pub async fn list_sub_regions(
    State(state): State<AppState>,
    _user: SessionUser,
) -> Result<Json<Vec<SubRegion>>, (StatusCode, String)> {
    let sub_regions = repo::list_sub_regions(&state.db).await.map_err(reject)?;
    Ok(Json(sub_regions))
}
