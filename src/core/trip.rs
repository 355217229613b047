use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Deserialize a label (pickup hour, day of week) from string or int
fn deserialize_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LabelValue {
        Int(i64),
        String(String),
        Null,
    }

    match LabelValue::deserialize(deserializer)? {
        LabelValue::Int(i) => Ok(Some(i.to_string())),
        LabelValue::String(s) => Ok(Some(s)),
        LabelValue::Null => Ok(None),
    }
}

/// Taxi vendor as attached to a trip
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub vendor_id: i64,

    #[serde(default)]
    pub name: Option<String>,
}

impl Vendor {
    pub fn new(vendor_id: i64, name: impl Into<String>) -> Self {
        Self {
            vendor_id,
            name: Some(name.into()),
        }
    }
}

/// Derived per-trip analytics row
///
/// Numeric columns keep the raw JSON value they arrived with. Decimal
/// columns commonly come back as strings (`"5.20"`), and ranking reads them
/// through [`crate::ranking::key`], which owns the fallback rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TripAnalytics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,

    /// Hour of pickup ("0".."23")
    #[serde(default, deserialize_with = "deserialize_label")]
    pub pickup_hour: Option<String>,

    /// Day of week of pickup
    #[serde(default, deserialize_with = "deserialize_label")]
    pub pickup_dayofweek: Option<String>,

    #[serde(default)]
    pub trip_distance_km: Option<Value>,

    #[serde(default)]
    pub trip_duration_hours: Option<Value>,

    #[serde(default)]
    pub trip_speed_kmh: Option<Value>,
}

/// One taxi trip record as stored, with vendor and analytics joined in
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_datetime: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropoff_datetime: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passenger_count: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_longitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropoff_longitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropoff_latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_and_fwd_flag: Option<String>,

    /// Duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_duration: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fare_amount: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<Vendor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics: Option<TripAnalytics>,

    /// Fields this crate does not model, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Trip {
    /// Create a bare trip with only an id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_vendor(mut self, vendor_id: i64, name: impl Into<String>) -> Self {
        self.vendor_id = Some(vendor_id);
        self.vendor = Some(Vendor::new(vendor_id, name));
        self
    }

    pub fn with_times(mut self, pickup: DateTime<Utc>, dropoff: DateTime<Utc>) -> Self {
        self.pickup_datetime = Some(pickup);
        self.dropoff_datetime = Some(dropoff);
        self
    }

    pub fn with_passengers(mut self, count: i64) -> Self {
        self.passenger_count = Some(count);
        self
    }

    pub fn with_duration(mut self, seconds: i64) -> Self {
        self.trip_duration = Some(Value::from(seconds));
        self
    }

    pub fn with_fare(mut self, fare: f64) -> Self {
        self.fare_amount = Some(Value::from(fare));
        self
    }

    /// Attach analytics with distance, speed and pickup hour
    pub fn with_analytics(mut self, distance_km: f64, speed_kmh: f64, pickup_hour: u32) -> Self {
        let hours = self
            .trip_duration
            .as_ref()
            .and_then(Value::as_f64)
            .map(|secs| Value::from(secs / 3600.0));

        self.analytics = Some(TripAnalytics {
            trip_id: None,
            pickup_hour: Some(pickup_hour.to_string()),
            pickup_dayofweek: self
                .pickup_datetime
                .map(|dt| dt.format("%A").to_string()),
            trip_distance_km: Some(Value::from(distance_km)),
            trip_duration_hours: hours,
            trip_speed_kmh: Some(Value::from(speed_kmh)),
        });
        self
    }

    /// Vendor display name, falling back to `Vendor {id}`
    pub fn vendor_name(&self) -> String {
        self.vendor
            .as_ref()
            .and_then(|v| v.name.clone())
            .unwrap_or_else(|| format!("Vendor {}", self.vendor_id.unwrap_or_default()))
    }
}
