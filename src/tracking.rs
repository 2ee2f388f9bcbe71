use std::time::Duration;

use crate::config::{Config, ShipmentIdentity};
use crate::error::{Result, TrackerError};
use log::debug;
use reqwest::blocking::Client;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use url::Url;

/// Length of the `null(` wrapper the tracking API puts in front of its JSON.
pub const ENVELOPE_PREFIX_LEN: usize = 5;
/// Length of the closing `)` after the JSON.
pub const ENVELOPE_SUFFIX_LEN: usize = 1;

#[derive(Display, Debug, Clone, Copy)]
pub enum Subsidiary {
    #[strum(to_string = "U")]
    UnitedVanLines,
}

#[derive(Serialize)]
struct ShipmentTrackingQuery<'a> {
    #[serde(rename = "ShipmentTracking")]
    shipment_tracking: ShipmentTrackingRequest<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ShipmentTrackingRequest<'a> {
    name: &'a str,
    order_number: &'a str,
    subsidiary_code: String,
}

/// Decoded state of a shipment as reported by the tracking API.
///
/// Equality covers every field, including the response header and the raw
/// order number list. Two records that differ anywhere are different
/// observations, even if they would render the same notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRecord {
    #[serde(default, deserialize_with = "nullable")]
    pub header: Header,
    #[serde(default, deserialize_with = "nullable")]
    pub order_numbers: Vec<String>,
    pub shipment: Shipment,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Header {
    #[serde(default, deserialize_with = "nullable")]
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    #[serde(default, deserialize_with = "nullable")]
    pub actual_load_date: String,
    pub van: Van,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Van {
    #[serde(default, deserialize_with = "nullable")]
    pub last_reported_city: String,
    #[serde(default, deserialize_with = "nullable")]
    pub last_reported_state: String,
    #[serde(default, deserialize_with = "nullable")]
    pub last_reported_date_time: String,
    #[serde(default, deserialize_with = "nullable")]
    pub tracking_city: String,
    #[serde(default, deserialize_with = "nullable")]
    pub tracking_date: String,
    #[serde(default, deserialize_with = "nullable")]
    pub tracking_direction: String,
    /// Sent as text; anything that isn't a base-10 integer fails the decode.
    #[serde(deserialize_with = "miles_from_text")]
    pub tracking_miles: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub tracking_state: String,
    #[serde(default, deserialize_with = "nullable")]
    pub tracking_time: String,
}

fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn miles_from_text<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    text.parse()
        .map_err(|_| de::Error::custom(format!("trackingMiles is not an integer: {text:?}")))
}

/// Builds the url-escaped `data` query value for a tracking lookup.
pub fn encode_request(identity: &ShipmentIdentity) -> Result<String> {
    let query = ShipmentTrackingQuery {
        shipment_tracking: ShipmentTrackingRequest {
            name: &identity.last_name,
            order_number: &identity.order_number,
            subsidiary_code: Subsidiary::UnitedVanLines.to_string(),
        },
    };
    let json = serde_json::to_string(&query)?;
    Ok(url::form_urlencoded::byte_serialize(json.as_bytes()).collect())
}

fn unwrap_envelope(body: &[u8]) -> Result<&[u8]> {
    let wrapper_len = ENVELOPE_PREFIX_LEN + ENVELOPE_SUFFIX_LEN;
    if body.len() < wrapper_len {
        return Err(TrackerError::Parse(format!(
            "response is {} bytes, shorter than the {wrapper_len} byte envelope",
            body.len()
        )));
    }
    Ok(&body[ENVELOPE_PREFIX_LEN..body.len() - ENVELOPE_SUFFIX_LEN])
}

/// Strips the fixed-size envelope and decodes the JSON inside it.
pub fn decode_response(body: &[u8]) -> Result<TrackingRecord> {
    serde_json::from_slice(unwrap_envelope(body)?).map_err(|e| TrackerError::Parse(e.to_string()))
}

pub trait TrackingSource {
    fn fetch(&self, identity: &ShipmentIdentity) -> Result<TrackingRecord>;
}

pub fn http_client(config: &Config) -> Result<Client> {
    build_client(&config.user_agent, config.request_timeout())
}

fn build_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(|e| TrackerError::Config(format!("failed to build HTTP client: {e}")))
}

pub struct TrackingClient {
    client: Client,
    base_url: Url,
}

impl TrackingClient {
    pub const fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn request_url(&self, identity: &ShipmentIdentity) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.set_query(Some(&format!("data={}", encode_request(identity)?)));
        Ok(url)
    }
}

impl TrackingSource for TrackingClient {
    fn fetch(&self, identity: &ShipmentIdentity) -> Result<TrackingRecord> {
        let url = self.request_url(identity)?;
        debug!("Fetching tracking update from {}", self.base_url);

        let res = self
            .client
            .get(url)
            .send()
            .map_err(|source| TrackerError::Network {
                url: self.base_url.to_string(),
                source: source.without_url(),
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(TrackerError::Http(format!(
                "{} returned {status}",
                self.base_url
            )));
        }

        let body = res
            .bytes()
            .map_err(|e| TrackerError::Http(format!("failed to read response body: {e}")))?;
        debug!("Received {} byte tracking response", body.len());
        decode_response(&body)
    }
}

#[cfg(test)]
pub(crate) const SAMPLE_BODY: &str = r#"null({"header":{"response":"SUCCESS"},"orderNumbers":["123456","123456-01"],"shipment":{"actualLoadDate":"06/01/2016","van":{"lastReportedCity":"Springfield","lastReportedState":"IL","lastReportedDateTime":"06/03/2016 10:15 AM","trackingCity":"Columbus","trackingDate":"06/03/2016","trackingDirection":"north","trackingMiles":"5","trackingState":"OH","trackingTime":"10:15 AM"}}})"#;

#[cfg(test)]
pub(crate) fn sample_record() -> TrackingRecord {
    TrackingRecord {
        header: Header {
            response: "SUCCESS".into(),
        },
        order_numbers: vec!["123456".into(), "123456-01".into()],
        shipment: Shipment {
            actual_load_date: "06/01/2016".into(),
            van: Van {
                last_reported_city: "Springfield".into(),
                last_reported_state: "IL".into(),
                last_reported_date_time: "06/03/2016 10:15 AM".into(),
                tracking_city: "Columbus".into(),
                tracking_date: "06/03/2016".into(),
                tracking_direction: "north".into(),
                tracking_miles: 5,
                tracking_state: "OH".into(),
                tracking_time: "10:15 AM".into(),
            },
        },
    }
}
