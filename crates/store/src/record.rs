use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A durable copy of one authenticated messaging session.
///
/// `data` is opaque to msgbridge; only the messaging client knows how to
/// resume from it.  On the wire and on disk it is base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session: String,
    #[serde(with = "blob")]
    pub data: Vec<u8>,
    pub saved_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(session: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            session: session.into(),
            data,
            saved_at: Utc::now(),
        }
    }
}

mod blob {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(d)?;
        STANDARD.decode(raw.trim()).map_err(serde::de::Error::custom)
    }
}
