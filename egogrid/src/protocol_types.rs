use serde::{Deserialize, Serialize};

use crate::MalformedPayload;

/// One reply from the game: `[state, reward, terminated]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepReply(pub StateRecord, pub f64, pub bool);

impl StepReply {
    pub fn from_json(json: &str) -> Result<Self, MalformedPayload> {
        serde_json::from_str(json).map_err(|err| MalformedPayload::InvalidReply {
            reason: err.to_string(),
        })
    }

    pub fn state(&self) -> &StateRecord {
        &self.0
    }

    pub fn reward(&self) -> f64 {
        self.1
    }

    pub fn terminated(&self) -> bool {
        self.2
    }
}

/// The game state as it is sent over the wire, before any repair.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StateRecord {
    #[serde(default)]
    pub entities: Vec<RawEntity>,
    /// The level rectangle in the game's own notation, see
    /// [`LevelBounds::decode()`](crate::LevelBounds::decode).
    pub bounds: String,
    /// Newline-separated rows of tile characters, `'0'` meaning empty.
    pub solids: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climbing: Option<bool>,
    #[serde(
        rename = "canDash",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub can_dash: Option<bool>,
    /// The velocity as `"vx, vy"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
}

/// An entity as the game reports it.
///
/// The game sends more attributes than these (`X`, `Width`, `Direction`,
/// ...); they are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawEntity {
    /// Possibly namespace-qualified type name, e.g. `Celeste.Spikes`.
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Left", default, skip_serializing_if = "Option::is_none")]
    pub left: Option<WireNumber>,
    #[serde(rename = "Right", default, skip_serializing_if = "Option::is_none")]
    pub right: Option<WireNumber>,
    #[serde(rename = "Top", default, skip_serializing_if = "Option::is_none")]
    pub top: Option<WireNumber>,
    #[serde(rename = "Bottom", default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<WireNumber>,
}

/// A number that may arrive either as a JSON number or as a string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireNumber {
    Number(f64),
    Text(String),
}

impl WireNumber {
    pub fn parse(&self) -> Option<f64> {
        let n = match self {
            WireNumber::Number(n) => *n,
            WireNumber::Text(s) => s.trim().parse().ok()?,
        };
        n.is_finite().then_some(n)
    }
}

impl From<f64> for WireNumber {
    fn from(n: f64) -> Self {
        WireNumber::Number(n)
    }
}

/// The request sent to the game: an action vector, or the reset sentinel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest(pub Vec<f64>);

impl ActionRequest {
    /// The request that starts a new episode, serialized as `[1]`.
    pub fn reset() -> Self {
        ActionRequest(vec![1.0])
    }

    /// Whether the game would treat this request as a reset.
    pub fn is_reset(&self) -> bool {
        self.0 == [1.0]
    }

    pub fn to_json(&self) -> String {
        if self.is_reset() {
            return String::from("[1]");
        }
        // Serializing a Vec<f64> cannot fail (non-finite values become null)
        serde_json::to_string(&self.0).unwrap_or_else(|_| String::from("[]"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reply_with_string_coordinates() {
        let json = r#"[
            {
                "entities": [
                    {"Name": "Celeste.Player", "X": "30",
                     "Left": "28", "Right": "36", "Top": "28", "Bottom": "36"},
                    {"Name": "Monocle.Entity", "Direction": "Up"}
                ],
                "bounds": "{X:0 Y:0 Width:64 Height:64}",
                "solids": "00\n11",
                "climbing": false,
                "canDash": true,
                "speed": "1.5, -2"
            },
            -1.25,
            false
        ]"#;
        let reply = StepReply::from_json(json).unwrap();
        assert_eq!(reply.reward(), -1.25);
        assert!(!reply.terminated());
        let state = reply.state();
        assert_eq!(state.entities.len(), 2);
        assert_eq!(state.entities[0].name, "Celeste.Player");
        assert_eq!(state.entities[0].left.as_ref().and_then(WireNumber::parse), Some(28.0));
        assert_eq!(state.entities[1].left, None);
        assert_eq!(state.can_dash, Some(true));
        assert_eq!(state.speed.as_deref(), Some("1.5, -2"));
    }

    #[test]
    fn numeric_coordinates_and_missing_scalars() {
        let json = r#"[{"entities": [
                            {"Name": "Spikes", "Left": 1, "Right": 2.5, "Top": 0, "Bottom": 8}
                        ],
                        "bounds": "", "solids": ""}, 0, true]"#;
        let reply = StepReply::from_json(json).unwrap();
        assert!(reply.terminated());
        assert_eq!(reply.state().entities[0].right, Some(WireNumber::Number(2.5)));
        assert_eq!(reply.state().climbing, None);
        assert_eq!(reply.state().speed, None);
    }

    #[test]
    fn reject_wrong_shape() {
        assert!(matches!(
            StepReply::from_json(r#"[{"bounds": "", "solids": ""}, 0]"#),
            Err(MalformedPayload::InvalidReply { .. })
        ));
        assert!(StepReply::from_json("not json").is_err());
    }

    #[test]
    fn wire_number_parse() {
        assert_eq!(WireNumber::Text(String::from(" -4.5")).parse(), Some(-4.5));
        assert_eq!(WireNumber::Text(String::from("left")).parse(), None);
        assert_eq!(WireNumber::Text(String::from("inf")).parse(), None);
    }

    #[test]
    fn action_json() {
        assert_eq!(ActionRequest::reset().to_json(), "[1]");
        assert!(ActionRequest::reset().is_reset());
        assert_eq!(ActionRequest(vec![0.5, -1.0]).to_json(), "[0.5,-1.0]");
        assert!(!ActionRequest(vec![1.0, 0.0]).is_reset());
    }
}
