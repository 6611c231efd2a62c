use serde::Deserialize;

/// `?region=` / `?subRegion=` query of the country list.
#[derive(Debug, Default, Deserialize)]
pub struct CountryQuery {
    pub region: Option<String>,
    #[serde(rename = "subRegion", alias = "sub_region")]
    pub sub_region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountryFilter {
    All,
    /// Exact match on the region name.
    Region(String),
    /// Case-insensitive substring of the sub-region name.
    SubRegion(String),
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl From<CountryQuery> for CountryFilter {
    fn from(q: CountryQuery) -> Self {
        if let Some(region) = non_blank(q.region) {
            Self::Region(region)
        } else if let Some(sub_region) = non_blank(q.sub_region) {
            Self::SubRegion(sub_region)
        } else {
            Self::All
        }
    }
}

/// Editable fields of a country.
#[derive(Debug, Clone, Deserialize)]
pub struct CountryInput {
    pub common_name: String,
    #[serde(default)]
    pub official_name: String,
    #[serde(default)]
    pub native_name: String,
    #[serde(default)]
    pub currencies: String,
    #[serde(default)]
    pub capital: String,
    #[serde(default)]
    pub languages: String,
    #[serde(default)]
    pub open_street_maps: String,
    #[serde(default)]
    pub population: i32,
    #[serde(default)]
    pub area: i32,
    #[serde(default)]
    pub landlocked: bool,
    #[serde(default)]
    pub coat_of_arms: String,
    #[serde(default)]
    pub flag: String,
    pub sub_region_id: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCountry {
    pub id: String,
    #[serde(flatten)]
    pub fields: CountryInput,
}
