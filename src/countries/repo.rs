use sqlx::PgPool;
use thiserror::Error;

use crate::countries::{
    dto::{CountryFilter, CountryInput, NewCountry},
    repo_types::{Country, CountryRow, SubRegion},
};

#[derive(Debug, Error)]
pub enum CountryError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

const SELECT_COUNTRY: &str = r#"
    SELECT c.id, c.common_name, c.official_name, c.native_name, c.currencies,
           c.capital, c.languages, c.open_street_maps, c.population, c.area,
           c.landlocked, c.coat_of_arms, c.flag, c.sub_region_id,
           s.sub_region, s.region
      FROM countries c
      JOIN sub_regions s ON s.id = c.sub_region_id
"#;

/// `%needle%` for ILIKE with the needle's own wildcards escaped.
pub(crate) fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

/// Turns constraint violations on write into domain errors.
fn write_error(e: sqlx::Error, id: &str, sub_region_id: i32) -> CountryError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            CountryError::Conflict(format!("Country {id} already exists"))
        }
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            CountryError::Validation(format!("Unknown sub-region {sub_region_id}"))
        }
        other => CountryError::Database(other),
    }
}

pub async fn list(db: &PgPool, filter: &CountryFilter) -> Result<Vec<Country>, CountryError> {
    let rows = match filter {
        CountryFilter::All => {
            let sql = format!("{SELECT_COUNTRY} ORDER BY c.common_name");
            sqlx::query_as::<_, CountryRow>(&sql).fetch_all(db).await?
        }
        CountryFilter::Region(region) => {
            let sql = format!("{SELECT_COUNTRY} WHERE s.region = $1 ORDER BY c.common_name");
            sqlx::query_as::<_, CountryRow>(&sql)
                .bind(region)
                .fetch_all(db)
                .await?
        }
        CountryFilter::SubRegion(sub_region) => {
            let sql = format!("{SELECT_COUNTRY} WHERE s.sub_region ILIKE $1 ORDER BY c.common_name");
            sqlx::query_as::<_, CountryRow>(&sql)
                .bind(like_pattern(sub_region))
                .fetch_all(db)
                .await?
        }
    };

    if rows.is_empty() && *filter != CountryFilter::All {
        return Err(CountryError::NotFound("Unable to find requested countries".into()));
    }
    Ok(rows.into_iter().map(Country::from).collect())
}

pub async fn get_by_id(db: &PgPool, id: &str) -> Result<Country, CountryError> {
    let sql = format!("{SELECT_COUNTRY} WHERE c.id = $1");
    sqlx::query_as::<_, CountryRow>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?
        .map(Country::from)
        .ok_or_else(|| CountryError::NotFound("Unable to find requested country".into()))
}

pub async fn create(db: &PgPool, country: &NewCountry) -> Result<(), CountryError> {
    let f = &country.fields;
    sqlx::query(
        r#"
        INSERT INTO countries (id, common_name, official_name, native_name, currencies,
                               capital, languages, open_street_maps, population, area,
                               landlocked, coat_of_arms, flag, sub_region_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(&country.id)
    .bind(&f.common_name)
    .bind(&f.official_name)
    .bind(&f.native_name)
    .bind(&f.currencies)
    .bind(&f.capital)
    .bind(&f.languages)
    .bind(&f.open_street_maps)
    .bind(f.population)
    .bind(f.area)
    .bind(f.landlocked)
    .bind(&f.coat_of_arms)
    .bind(&f.flag)
    .bind(f.sub_region_id)
    .execute(db)
    .await
    .map_err(|e| write_error(e, &country.id, f.sub_region_id))?;
    Ok(())
}

pub async fn update(db: &PgPool, id: &str, f: &CountryInput) -> Result<(), CountryError> {
    let result = sqlx::query(
        r#"
        UPDATE countries
           SET common_name = $2, official_name = $3, native_name = $4, currencies = $5,
               capital = $6, languages = $7, open_street_maps = $8, population = $9,
               area = $10, landlocked = $11, coat_of_arms = $12, flag = $13,
               sub_region_id = $14
         WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&f.common_name)
    .bind(&f.official_name)
    .bind(&f.native_name)
    .bind(&f.currencies)
    .bind(&f.capital)
    .bind(&f.languages)
    .bind(&f.open_street_maps)
    .bind(f.population)
    .bind(f.area)
    .bind(f.landlocked)
    .bind(&f.coat_of_arms)
    .bind(&f.flag)
    .bind(f.sub_region_id)
    .execute(db)
    .await
    .map_err(|e| write_error(e, id, f.sub_region_id))?;

    if result.rows_affected() == 0 {
        return Err(CountryError::NotFound("Unable to update country, not found.".into()));
    }
    Ok(())
}

pub async fn delete(db: &PgPool, id: &str) -> Result<(), CountryError> {
    let result = sqlx::query("DELETE FROM countries WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CountryError::NotFound("Unable to delete country".into()));
    }
    Ok(())
}

pub async fn list_sub_regions(db: &PgPool) -> Result<Vec<SubRegion>, CountryError> {
    let rows = sqlx::query_as::<_, SubRegion>(
        r#"
        SELECT id, sub_region, region
          FROM sub_regions
         ORDER BY id
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}
