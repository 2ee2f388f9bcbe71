use std::io::Write;

use crate::config::ShipmentIdentity;
use crate::error::{Result, TrackerError};
use crate::tracking::{TrackingRecord, Van};
use log::info;
use reqwest::blocking::Client;
use reqwest::header;
use serde::Serialize;
use url::Url;

const BOT_USERNAME: &str = "United Tracker";
const EMOJI_PUSHPIN: &str = ":round_pushpin:";
const COLOR_GOOD: &str = "good";
const MAPS_PLACE_URL: &str = "https://www.google.com/maps/place";
const WEBHOOK_CONTENT_TYPE: &str = "text/json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub text: String,
    pub color: String,
}

/// Body of an incoming-webhook message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub text: String,
    pub username: String,
    pub icon_emoji: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub attachments: Vec<Attachment>,
}

fn maps_link(van: &Van) -> String {
    format!(
        "{MAPS_PLACE_URL}/{}+{}",
        van.last_reported_city, van.last_reported_state
    )
}

fn location(van: &Van) -> String {
    format!(
        "<{} | {}, {}>",
        maps_link(van),
        van.last_reported_city,
        van.last_reported_state
    )
}

/// Renders the one-line status for a record. Anything not strictly positive
/// in `trackingMiles` is treated as being at the reported location.
pub fn status_text(nickname: &str, van: &Van) -> String {
    if van.tracking_miles > 0 {
        format!(
            "{nickname} is {} miles {} of {} {}",
            van.tracking_miles,
            van.tracking_direction,
            location(van),
            van.last_reported_date_time
        )
    } else {
        format!(
            "{nickname} at {} {}",
            location(van),
            van.last_reported_date_time
        )
    }
}

pub fn compose(
    identity: &ShipmentIdentity,
    record: &TrackingRecord,
    channel: Option<&str>,
) -> NotificationPayload {
    NotificationPayload {
        // left empty, the attachment carries the message
        text: String::new(),
        username: BOT_USERNAME.into(),
        icon_emoji: EMOJI_PUSHPIN.into(),
        channel: channel.map(String::from),
        attachments: vec![Attachment {
            text: status_text(&identity.nickname, &record.shipment.van),
            color: COLOR_GOOD.into(),
        }],
    }
}

pub trait Notifier {
    fn deliver(&mut self, payload: &NotificationPayload) -> Result<()>;
}

pub struct WebhookNotifier {
    client: Client,
    webhook_url: Url,
}

impl WebhookNotifier {
    pub const fn new(client: Client, webhook_url: Url) -> Self {
        Self {
            client,
            webhook_url,
        }
    }
}

impl Notifier for WebhookNotifier {
    fn deliver(&mut self, payload: &NotificationPayload) -> Result<()> {
        let body = serde_json::to_vec(payload)?;

        self.client
            .post(self.webhook_url.clone())
            .header(header::CONTENT_TYPE, WEBHOOK_CONTENT_TYPE)
            .body(body)
            .send()
            .and_then(|res| res.error_for_status())
            .map_err(|e| TrackerError::Delivery(e.without_url().to_string()))?;

        info!("Successfully sent webhook notification");
        Ok(())
    }
}

/// Prints the payload as a single JSON line instead of posting it.
pub struct DryRunNotifier<W> {
    out: W,
}

impl<W: Write> DryRunNotifier<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Notifier for DryRunNotifier<W> {
    fn deliver(&mut self, payload: &NotificationPayload) -> Result<()> {
        let line = serde_json::to_string(payload)?;
        writeln!(self.out, "{line}")
            .and_then(|()| self.out.flush())
            .map_err(|e| TrackerError::Delivery(format!("failed to write payload: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::tracking::sample_record;
    use serde_json::json;

    const LINK: &str = "<https://www.google.com/maps/place/Springfield+IL | Springfield, IL>";
    const TIMESTAMP: &str = "06/03/2016 10:15 AM";

    fn identity() -> ShipmentIdentity {
        ShipmentIdentity {
            last_name: "Smith".into(),
            order_number: "123456".into(),
            nickname: "Sofa".into(),
        }
    }

    fn record_with_miles(miles: i64) -> TrackingRecord {
        let mut record = sample_record();
        record.shipment.van.tracking_miles = miles;
        record
    }

    #[test]
    fn in_transit_text() {
        let payload = compose(&identity(), &record_with_miles(5), None);
        assert_eq!(
            payload.attachments[0].text,
            format!("Sofa is 5 miles north of {LINK} {TIMESTAMP}")
        );
    }

    #[test]
    fn arrived_text() {
        let payload = compose(&identity(), &record_with_miles(0), None);
        assert_eq!(payload.attachments[0].text, format!("Sofa at {LINK} {TIMESTAMP}"));
    }

    #[test]
    fn negative_miles_use_arrived_text() {
        let negative = compose(&identity(), &record_with_miles(-3), None);
        let zero = compose(&identity(), &record_with_miles(0), None);
        assert_eq!(negative.attachments, zero.attachments);
    }

    #[test]
    fn link_is_not_escaped() {
        let mut record = sample_record();
        record.shipment.van.last_reported_city = "St. Louis".into();
        record.shipment.van.last_reported_state = "MO".into();
        record.shipment.van.tracking_miles = 0;

        let text = status_text("Piano", &record.shipment.van);
        assert_eq!(
            text,
            format!(
                "Piano at <https://www.google.com/maps/place/St. Louis+MO | St. Louis, MO> {TIMESTAMP}"
            )
        );
    }

    #[test]
    fn payload_fixed_fields() {
        let payload = compose(&identity(), &sample_record(), Some("#moving"));

        assert_eq!(payload.text, "");
        assert_eq!(payload.username, "United Tracker");
        assert_eq!(payload.icon_emoji, ":round_pushpin:");
        assert_eq!(payload.channel.as_deref(), Some("#moving"));
        assert_eq!(payload.attachments.len(), 1);
        assert_eq!(payload.attachments[0].color, "good");
    }

    #[test]
    fn serializes_webhook_body() {
        let payload = compose(&identity(), &sample_record(), Some("#moving"));
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            value,
            json!({
                "text": "",
                "username": "United Tracker",
                "icon_emoji": ":round_pushpin:",
                "channel": "#moving",
                "attachments": [{
                    "text": format!("Sofa is 5 miles north of {LINK} {TIMESTAMP}"),
                    "color": "good"
                }]
            })
        );
    }

    #[test]
    fn absent_channel_is_omitted() {
        let payload = compose(&identity(), &sample_record(), None);
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("channel").is_none());
        assert_eq!(value["text"], "");
    }

    #[test]
    fn dry_run_writes_one_json_line() {
        let payload = compose(&identity(), &sample_record(), None);
        let mut notifier = DryRunNotifier::new(Vec::new());
        notifier.deliver(&payload).unwrap();

        let output = String::from_utf8(notifier.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(output.ends_with('\n'));
        assert_eq!(lines[0], serde_json::to_string(&payload).unwrap());
    }

    fn webhook_for(base: &str) -> WebhookNotifier {
        WebhookNotifier::new(
            testing::client(),
            Url::parse(&format!("{base}/services/T000/B000/XXXX")).unwrap(),
        )
    }

    #[test]
    fn webhook_posts_payload_as_text_json() {
        let (base, server) = testing::serve_once("200 OK", "ok");
        let payload = compose(&identity(), &sample_record(), Some("#moving"));

        webhook_for(&base).deliver(&payload).unwrap();

        let request = server.join().unwrap();
        assert_eq!(request.request_line, "POST /services/T000/B000/XXXX HTTP/1.1");
        assert_eq!(request.header("content-type"), Some("text/json"));
        assert_eq!(
            request.body,
            serde_json::to_string(&payload).unwrap().into_bytes()
        );
    }

    #[test]
    fn webhook_error_status_is_delivery_error() {
        let (base, server) = testing::serve_once("500 Internal Server Error", "");
        let payload = compose(&identity(), &sample_record(), None);

        let err = webhook_for(&base).deliver(&payload).unwrap_err();
        assert!(matches!(err, TrackerError::Delivery(_)), "{err:?}");
        assert!(!err.to_string().contains("XXXX"), "{err}");
        server.join().unwrap();
    }
}
