//! Reverse geocoding for address auto-fill
//!
//! Coordinates from the device are turned into a street address by a
//! Nominatim-style `/reverse` endpoint, then folded into the checkout form.

use serde::{Deserialize, Serialize};

use crate::models::Address;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Address part of a `format=jsonv2` reverse lookup
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeocodedAddress {
    #[serde(default)]
    pub house_number: Option<String>,
    #[serde(default)]
    pub road: Option<String>,
    #[serde(default)]
    pub neighbourhood: Option<String>,
    #[serde(default)]
    pub suburb: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReverseGeocodeResponse {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub address: GeocodedAddress,
}

/// Fields a lookup can supply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressPatch {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl From<&ReverseGeocodeResponse> for AddressPatch {
    fn from(response: &ReverseGeocodeResponse) -> Self {
        let a = &response.address;

        let line1 = match (non_empty(&a.house_number), non_empty(&a.road)) {
            (Some(number), Some(road)) => Some(format!("{} {}", number, road)),
            (None, Some(road)) => Some(road),
            _ => response
                .display_name
                .as_deref()
                .and_then(|d| d.split(',').next())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        };

        Self {
            line1,
            line2: non_empty(&a.suburb).or_else(|| non_empty(&a.neighbourhood)),
            city: non_empty(&a.city)
                .or_else(|| non_empty(&a.town))
                .or_else(|| non_empty(&a.village)),
            state: non_empty(&a.state),
            postal_code: non_empty(&a.postcode),
            country: non_empty(&a.country),
        }
    }
}

fn fill(slot: &mut String, value: &Option<String>) -> bool {
    match value {
        Some(v) if slot.trim().is_empty() => {
            *slot = v.clone();
            true
        }
        _ => false,
    }
}

fn fill_opt(slot: &mut Option<String>, value: &Option<String>) -> bool {
    let empty = slot.as_deref().map_or(true, |s| s.trim().is_empty());
    match value {
        Some(v) if empty => {
            *slot = Some(v.clone());
            true
        }
        _ => false,
    }
}

impl AddressPatch {
    /// Fill only the fields the user left empty; returns how many were set
    pub fn apply_to(&self, address: &mut Address) -> usize {
        [
            fill(&mut address.line1, &self.line1),
            fill_opt(&mut address.line2, &self.line2),
            fill(&mut address.city, &self.city),
            fill_opt(&mut address.state, &self.state),
            fill(&mut address.postal_code, &self.postal_code),
            fill(&mut address.country, &self.country),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

/// Reverse-geocoding endpoint settings
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodingConfig {
    pub base_url: String,
    pub user_agent: String,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("bazaar/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl GeocodingConfig {
    pub fn reverse_url(&self, at: Coordinates) -> String {
        format!(
            "{}/reverse?format=jsonv2&lat={}&lon={}",
            self.base_url.trim_end_matches('/'),
            at.latitude,
            at.longitude
        )
    }
}

#[cfg(feature = "native")]
pub use client::GeocodingClient;

#[cfg(feature = "native")]
mod client {
    use super::*;
    use crate::api::{interpret_response, ApiError, ApiResult};

    pub struct GeocodingClient {
        client: reqwest::Client,
        config: GeocodingConfig,
    }

    impl GeocodingClient {
        pub fn new(config: GeocodingConfig) -> ApiResult<Self> {
            let client = reqwest::Client::builder()
                .user_agent(config.user_agent.clone())
                .build()
                .map_err(|e| ApiError::Network(e.to_string()))?;
            Ok(Self { client, config })
        }

        pub async fn reverse(&self, at: Coordinates) -> ApiResult<AddressPatch> {
            let url = self.config.reverse_url(at);
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| ApiError::Network(e.to_string()))?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| ApiError::Network(e.to_string()))?;

            let value = interpret_response(status, &body)?;
            let parsed: ReverseGeocodeResponse = serde_json::from_value(value)?;
            tracing::debug!(lat = at.latitude, lon = at.longitude, "Reverse geocoded");
            Ok(AddressPatch::from(&parsed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAHORE: &str = r#"{
        "display_name": "12, Mall Road, Lahore, Punjab, 54000, Pakistan",
        "address": {
            "house_number": "12",
            "road": "Mall Road",
            "suburb": "Anarkali",
            "city": "Lahore",
            "state": "Punjab",
            "postcode": "54000",
            "country": "Pakistan",
            "country_code": "pk"
        }
    }"#;

    #[test]
    fn test_patch_from_response() {
        let response: ReverseGeocodeResponse = serde_json::from_str(LAHORE).unwrap();
        let patch = AddressPatch::from(&response);
        assert_eq!(patch.line1.as_deref(), Some("12 Mall Road"));
        assert_eq!(patch.line2.as_deref(), Some("Anarkali"));
        assert_eq!(patch.city.as_deref(), Some("Lahore"));
        assert_eq!(patch.postal_code.as_deref(), Some("54000"));
    }

    #[test]
    fn test_town_and_display_name_fallbacks() {
        let response: ReverseGeocodeResponse = serde_json::from_str(
            r#"{"display_name": "Old Mill, Hayle", "address": {"town": "Hayle"}}"#,
        )
        .unwrap();
        let patch = AddressPatch::from(&response);
        assert_eq!(patch.line1.as_deref(), Some("Old Mill"));
        assert_eq!(patch.city.as_deref(), Some("Hayle"));
    }

    #[test]
    fn test_apply_keeps_user_input() {
        let response: ReverseGeocodeResponse = serde_json::from_str(LAHORE).unwrap();
        let patch = AddressPatch::from(&response);

        let mut address = Address {
            city: "Rawalpindi".to_string(),
            ..Default::default()
        };
        let filled = patch.apply_to(&mut address);

        assert_eq!(address.city, "Rawalpindi");
        assert_eq!(address.line1, "12 Mall Road");
        assert_eq!(address.state.as_deref(), Some("Punjab"));
        assert_eq!(filled, 5);
    }

    #[test]
    fn test_reverse_url() {
        let config = GeocodingConfig {
            base_url: "http://geo.local/".to_string(),
            user_agent: "t".to_string(),
        };
        let url = config.reverse_url(Coordinates {
            latitude: 31.5,
            longitude: 74.25,
        });
        assert_eq!(url, "http://geo.local/reverse?format=jsonv2&lat=31.5&lon=74.25");
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn test_client_reverse() {
        use axum::{routing::get, Router};

        let router = Router::new().route(
            "/reverse",
            get(|| async { ([("content-type", "application/json")], LAHORE) }),
        );
        let base_url = crate::api::client_tests::spawn_backend(router).await;
        let client = GeocodingClient::new(GeocodingConfig {
            base_url,
            user_agent: "bazaar-test".to_string(),
        })
        .unwrap();

        let patch = client
            .reverse(Coordinates {
                latitude: 31.56,
                longitude: 74.33,
            })
            .await
            .unwrap();
        assert_eq!(patch.country.as_deref(), Some("Pakistan"));
    }
}
