// handlers/protected/factors/mod.rs - Contributing factor endpoints
//
// Factors are the labels a log's `contributing` list draws from: a fixed
// default set plus whatever the user adds.

use serde::Serialize;

mod add;  // POST /api/factors
mod list; // GET /api/factors

pub use add::add;
pub use list::list;

pub const DEFAULT_FACTORS: &[&str] = &["Grateful", "Stressed", "Productive", "Tired", "Excited"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorList {
    pub default_factors: Vec<&'static str>,
    pub custom_factors: Vec<String>,
}

impl FactorList {
    fn with_custom(custom_factors: Vec<String>) -> Self {
        Self {
            default_factors: DEFAULT_FACTORS.to_vec(),
            custom_factors,
        }
    }
}
