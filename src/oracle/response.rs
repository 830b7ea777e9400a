//! Oracle response parsing
//!
//! The model is asked for bare JSON but may wrap it in prose or a markdown
//! fence, so parsing first cuts out the outermost `{...}` span.

use serde::Deserialize;

use super::OracleError;
use crate::sky::body::{BodyKind, BodyProfile, Spectral};
use crate::sky::constants::placeholder;

/// Longest plain-text answer still accepted as a name
const MAX_NAME_LEN: usize = 60;

/// Slice out the outermost JSON object, or return the text unchanged
pub fn extract_json(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

#[derive(Debug, Deserialize)]
struct NameResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BodyResponse {
    name: String,
    #[serde(alias = "type", alias = "category")]
    kind: String,
    #[serde(default)]
    description: String,
    #[serde(alias = "distance")]
    distance_ly: f64,
    #[serde(default)]
    color: Option<String>,
    #[serde(default, alias = "temperature")]
    temperature_k: Option<f64>,
    #[serde(default)]
    spectral_class: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    analysis: String,
}

/// Parse a constellation name: `{"name": "..."}` or a short bare line
pub fn parse_constellation_name(text: &str) -> Result<String, OracleError> {
    if let Ok(parsed) = serde_json::from_str::<NameResponse>(extract_json(text)) {
        let name = parsed.name.trim();
        if !name.is_empty() {
            return Ok(name.to_string());
        }
        return Err(OracleError::Parse("empty name".to_string()));
    }

    let line = text
        .lines()
        .map(|l| l.trim().trim_matches(|c| c == '"' || c == '*'))
        .find(|l| !l.is_empty())
        .ok_or_else(|| OracleError::Parse("empty response".to_string()))?;

    if line.len() > MAX_NAME_LEN || line.contains('{') {
        return Err(OracleError::Parse(format!("unusable name: {}", line)));
    }
    Ok(line.to_string())
}

/// Parse body metadata. Unknown categories are rejected, not coerced.
pub fn parse_body_profile(text: &str) -> Result<BodyProfile, OracleError> {
    let json = extract_json(text);
    let parsed: BodyResponse = serde_json::from_str(json)
        .map_err(|e| OracleError::Parse(format!("{} - Raw: {}", e, json)))?;

    let kind: BodyKind = parsed
        .kind
        .parse()
        .map_err(|e| OracleError::Parse(format!("{}", e)))?;

    if parsed.name.trim().is_empty() {
        return Err(OracleError::Parse("empty body name".to_string()));
    }
    if !(parsed.distance_ly.is_finite() && parsed.distance_ly > 0.0) {
        return Err(OracleError::Parse(format!("invalid distance: {}", parsed.distance_ly)));
    }

    let spectral = match (parsed.temperature_k, parsed.spectral_class) {
        (None, None) => None,
        (temperature, class) => Some(Spectral {
            temperature_k: temperature
                .filter(|t| t.is_finite() && *t > 0.0)
                .map(|t| t.round() as u32),
            spectral_class: class.filter(|c| !c.trim().is_empty()),
        }),
    };

    Ok(BodyProfile {
        name: parsed.name.trim().to_string(),
        kind,
        description: parsed.description.trim().to_string(),
        distance_ly: parsed.distance_ly as f32,
        color: parsed
            .color
            .filter(|c| c.starts_with('#'))
            .unwrap_or_else(|| placeholder::COLOR.to_string()),
        spectral,
    })
}

/// Parse analysis text: `{"analysis": "..."}` or the raw text itself
pub fn parse_analysis(text: &str) -> Result<String, OracleError> {
    let analysis = match serde_json::from_str::<AnalysisResponse>(extract_json(text)) {
        Ok(parsed) => parsed.analysis,
        Err(_) => text.to_string(),
    };
    let analysis = analysis.trim();
    if analysis.is_empty() {
        return Err(OracleError::Parse("empty analysis".to_string()));
    }
    Ok(analysis.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_wrapped() {
        let wrapped = "Here you go:\n```json\n{\"name\": \"Vela\"}\n```\nEnjoy.";
        assert_eq!(extract_json(wrapped), "{\"name\": \"Vela\"}");
        assert_eq!(extract_json("no json"), "no json");
    }

    #[test]
    fn test_parse_name_json() {
        assert_eq!(parse_constellation_name(r#"{"name": " The Weaver "}"#).unwrap(), "The Weaver");
    }

    #[test]
    fn test_parse_name_plain() {
        assert_eq!(parse_constellation_name("\n\"Corvus Minor\"\n").unwrap(), "Corvus Minor");
        assert!(parse_constellation_name("   \n  ").is_err());
        assert!(parse_constellation_name(r#"{"name": ""}"#).is_err());
    }

    #[test]
    fn test_parse_body_profile() {
        let text = r##"Sure! {
            "name": "Kepler's Lantern",
            "type": "Black Hole",
            "description": "A silent devourer.",
            "distance": 1234.5,
            "color": "#220033",
            "temperature": 0
        }"##;
        let profile = parse_body_profile(text).unwrap();

        assert_eq!(profile.name, "Kepler's Lantern");
        assert_eq!(profile.kind, BodyKind::BlackHole);
        assert!((profile.distance_ly - 1234.5).abs() < 0.01);
        assert_eq!(profile.color, "#220033");
        // Zero temperature is dropped but the spectral block remains
        assert_eq!(profile.spectral.unwrap().temperature_k, None);
    }

    #[test]
    fn test_parse_body_profile_with_spectral() {
        let text = r#"{"name": "Sol Twin", "kind": "star", "distance_ly": 8.6,
                       "temperature_k": 5778.4, "spectral_class": "G2V"}"#;
        let profile = parse_body_profile(text).unwrap();
        let spectral = profile.spectral.unwrap();

        assert_eq!(spectral.temperature_k, Some(5778));
        assert_eq!(spectral.spectral_class.as_deref(), Some("G2V"));
        assert_eq!(profile.color, placeholder::COLOR);
    }

    #[test]
    fn test_parse_body_profile_rejects_unknown_kind() {
        let text = r#"{"name": "Odd", "kind": "quasar", "distance_ly": 10.0}"#;
        assert!(matches!(parse_body_profile(text), Err(OracleError::Parse(_))));
    }

    #[test]
    fn test_parse_body_profile_rejects_bad_distance() {
        let text = r#"{"name": "Odd", "kind": "star", "distance_ly": -3.0}"#;
        assert!(parse_body_profile(text).is_err());
    }

    #[test]
    fn test_parse_analysis() {
        assert_eq!(parse_analysis(r#"{"analysis": "Dusty."}"#).unwrap(), "Dusty.");
        assert_eq!(parse_analysis("  Plain words.  ").unwrap(), "Plain words.");
        assert!(parse_analysis("").is_err());
    }
}
