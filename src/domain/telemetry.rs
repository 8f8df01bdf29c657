// Telemetry data domain models
use serde::{Deserialize, Deserializer, Serialize};

/// One timestamped reading from (or synthesized for) the turbine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub ts: i64,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub rpm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub t_exhaust_c: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub combustor_p_r: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub load_mw: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub vib_mm_s: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub alarm: Option<String>,
}

// Readings are best-effort: a value of the wrong type reads as absent.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(serde_json::Value::deserialize(deserializer)?.as_f64())
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(serde_json::Value::deserialize(deserializer)?
        .as_str()
        .map(str::to_string))
}

impl TelemetrySample {
    /// Decode one inbound feed message.
    ///
    /// Returns `None` for anything that is not a JSON object with a truthy
    /// numeric `ts`. Other readings are never validated; missing or mistyped
    /// ones decode as absent.
    pub fn from_message(text: &str) -> Option<Self> {
        let mut value: serde_json::Value = serde_json::from_str(text).ok()?;
        let ts = value.get("ts")?.as_f64()?;
        if ts == 0.0 || !ts.is_finite() {
            return None;
        }

        // Fractional timestamps are truncated to whole milliseconds.
        value["ts"] = serde_json::Value::from(ts as i64);
        serde_json::from_value(value).ok()
    }
}

/// Which producer currently owns the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    Connecting,
    Connected,
    Disconnected,
    Demo,
}

impl ConnectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionMode::Connecting => "connecting",
            ConnectionMode::Connected => "connected",
            ConnectionMode::Disconnected => "disconnected",
            ConnectionMode::Demo => "demo",
        }
    }
}

impl std::fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
