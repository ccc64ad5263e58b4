//! SPARQL plumbing for the structured-data candidate feed.
//!
//! The feed asks one bulk question: for every country carrying an ISO 3166-1
//! alpha-2 code, which official websites are on record (the country's own,
//! and its legislature's)? Responses arrive in the standard SPARQL JSON
//! results format, which this module parses into flat website rows.

use lexhound_shared::{LexhoundError, Result};
use serde::Deserialize;

/// Property chain label: the country's own official website.
pub const PROP_OFFICIAL_WEBSITE: &str = "P856";

/// Property chain label: the legislature's official website.
pub const PROP_LEGISLATURE: &str = "P194";

/// The bulk feed query. Both website clauses are OPTIONAL so countries with
/// partial records still yield what they have.
const FEED_QUERY: &str = "\
SELECT ?iso2 ?countryWebsite ?legislatureWebsite WHERE {
  ?country wdt:P297 ?iso2 .
  OPTIONAL { ?country wdt:P856 ?countryWebsite . }
  OPTIONAL {
    ?country wdt:P194 ?legislature .
    ?legislature wdt:P856 ?legislatureWebsite .
  }
}";

/// Build the GET URL for the feed query against `endpoint`. Deterministic,
/// so fixture transports can key canned responses on it.
pub fn query_url(endpoint: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(FEED_QUERY.as_bytes()).collect();
    format!("{endpoint}?format=json&query={encoded}")
}

// ---------------------------------------------------------------------------
// SPARQL JSON results
// ---------------------------------------------------------------------------

/// One website claim extracted from the results.
#[derive(Debug, Clone, PartialEq)]
pub struct WebsiteRow {
    /// Uppercased two-letter code.
    pub code: String,
    pub url: String,
    /// Which property chain produced the URL.
    pub prop: &'static str,
}

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    #[serde(default)]
    results: SparqlResults,
}

#[derive(Debug, Default, Deserialize)]
struct SparqlResults {
    #[serde(default)]
    bindings: Vec<SparqlBinding>,
}

/// One result row; every variable may be unbound.
#[derive(Debug, Deserialize)]
struct SparqlBinding {
    iso2: Option<SparqlValue>,
    #[serde(rename = "countryWebsite")]
    country_website: Option<SparqlValue>,
    #[serde(rename = "legislatureWebsite")]
    legislature_website: Option<SparqlValue>,
}

/// SPARQL JSON wraps every cell in `{"type": ..., "value": ...}`.
#[derive(Debug, Deserialize)]
struct SparqlValue {
    value: String,
}

/// Parse a SPARQL JSON results body into website rows.
///
/// Rows without a two-letter code are dropped; a row yields up to two
/// websites (country and legislature). No screening happens here.
pub fn parse_website_rows(body: &[u8]) -> Result<Vec<WebsiteRow>> {
    let response: SparqlResponse = serde_json::from_slice(body)
        .map_err(|e| LexhoundError::parse(format!("candidate feed response: {e}")))?;

    let mut rows = Vec::new();
    for binding in response.results.bindings {
        let Some(code) = binding
            .iso2
            .as_ref()
            .map(|cell| cell.value.to_ascii_uppercase())
        else {
            continue;
        };
        if code.len() != 2 {
            continue;
        }
        if let Some(site) = binding.country_website {
            rows.push(WebsiteRow {
                code: code.clone(),
                url: site.value,
                prop: PROP_OFFICIAL_WEBSITE,
            });
        }
        if let Some(site) = binding.legislature_website {
            rows.push(WebsiteRow {
                code,
                url: site.value,
                prop: PROP_LEGISLATURE,
            });
        }
    }
    Ok(rows)
}
