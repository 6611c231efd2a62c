use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SubRegion {
    pub id: i32,
    pub sub_region: String,
    pub region: String,
}

/// Row of `countries` joined with its `sub_regions` row.
#[derive(Debug, FromRow)]
pub struct CountryRow {
    pub id: String,
    pub common_name: String,
    pub official_name: String,
    pub native_name: String,
    pub currencies: String,
    pub capital: String,
    pub languages: String,
    pub open_street_maps: String,
    pub population: i32,
    pub area: i32,
    pub landlocked: bool,
    pub coat_of_arms: String,
    pub flag: String,
    pub sub_region_id: i32,
    pub sub_region: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Country {
    pub id: String,
    pub common_name: String,
    pub official_name: String,
    pub native_name: String,
    pub currencies: String,
    pub capital: String,
    pub languages: String,
    pub open_street_maps: String,
    pub population: i32,
    pub area: i32,
    pub landlocked: bool,
    pub coat_of_arms: String,
    pub flag: String,
    pub sub_region_id: i32,
    pub sub_region: SubRegion,
}

impl From<CountryRow> for Country {
    fn from(r: CountryRow) -> Self {
        Self {
            sub_region: SubRegion {
                id: r.sub_region_id,
                sub_region: r.sub_region,
                region: r.region,
            },
            id: r.id,
            common_name: r.common_name,
            official_name: r.official_name,
            native_name: r.native_name,
            currencies: r.currencies,
            capital: r.capital,
            languages: r.languages,
            open_street_maps: r.open_street_maps,
            population: r.population,
            area: r.area,
            landlocked: r.landlocked,
            coat_of_arms: r.coat_of_arms,
            flag: r.flag,
            sub_region_id: r.sub_region_id,
        }
    }
}
