//! Sensor datagram decoding.
//!
//! Accepted forms (UTF-8, surrounding whitespace ignored):
//!
//! - `distance[:side]`: compact range token, e.g. `23.5` or `23.5:L`
//! - `S:<speed>`: wheel speed in cm/s
//! - `OBS:<side>:<distance>`: tagged obstacle report
//! - JSON object with any of `speed`, `obstacle_detected`,
//!   `obstacle_position`, `distance_obstacle`

use contracts::{ObstacleReading, ObstacleSide, SensorReport};
use serde_json::Value;

use crate::error::{IngestionError, Result};

pub fn parse_datagram(payload: &[u8]) -> Result<SensorReport> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| IngestionError::malformed(format!("not utf-8: {e}")))?
        .trim();
    if text.is_empty() {
        return Err(IngestionError::Empty);
    }

    if text.starts_with('{') {
        return parse_json(text);
    }
    if let Some(rest) = strip_tag(text, "S:") {
        let speed = parse_number(rest)?;
        return Ok(SensorReport {
            speed_cm_s: Some(speed),
            obstacle: None,
        });
    }
    if let Some(rest) = strip_tag(text, "OBS:") {
        return parse_tagged_obstacle(rest);
    }
    parse_compact(text)
}

fn strip_tag<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let head = text.get(..tag.len())?;
    head.eq_ignore_ascii_case(tag).then(|| &text[tag.len()..])
}

fn parse_number(s: &str) -> Result<f64> {
    let v: f64 = s
        .trim()
        .parse()
        .map_err(|_| IngestionError::malformed(format!("not a number: {s:?}")))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(IngestionError::malformed(format!("non-finite number: {s:?}")))
    }
}

fn parse_side(s: &str) -> Result<ObstacleSide> {
    s.parse()
        .map_err(|_| IngestionError::malformed(format!("unknown side tag: {s:?}")))
}

fn parse_compact(text: &str) -> Result<SensorReport> {
    let (dist, side) = match text.split_once(':') {
        Some((d, s)) => (d, Some(parse_side(s)?)),
        None => (text, None),
    };
    let distance_cm = parse_number(dist)?;
    Ok(SensorReport {
        speed_cm_s: None,
        obstacle: Some(ObstacleReading::Ranged { distance_cm, side }),
    })
}

fn parse_tagged_obstacle(rest: &str) -> Result<SensorReport> {
    let (side, dist) = rest
        .split_once(':')
        .ok_or_else(|| IngestionError::malformed("OBS token needs side and distance"))?;
    Ok(SensorReport {
        speed_cm_s: None,
        obstacle: Some(ObstacleReading::Fields {
            detected: Some(true),
            distance_cm: Some(parse_number(dist)?),
            side: Some(parse_side(side)?),
        }),
    })
}

fn json_number(v: &Value, field: &str) -> Result<Option<f64>> {
    match v.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => parse_number(s).map(Some),
        Some(other) => Err(IngestionError::malformed(format!(
            "{field} must be a number, got {other}"
        ))),
    }
}

fn parse_json(text: &str) -> Result<SensorReport> {
    let v: Value = serde_json::from_str(text)
        .map_err(|e| IngestionError::malformed(format!("invalid json: {e}")))?;
    if !v.is_object() {
        return Err(IngestionError::malformed("json payload is not an object"));
    }

    let speed_cm_s = json_number(&v, "speed")?;
    let distance_cm = json_number(&v, "distance_obstacle")?;
    let detected = match v.get("obstacle_detected") {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::Number(n)) => Some(n.as_f64().is_some_and(|x| x != 0.0)),
        Some(other) => {
            return Err(IngestionError::malformed(format!(
                "obstacle_detected must be a bool, got {other}"
            )))
        }
    };
    let side = match v.get("obstacle_position") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(parse_side(s)?),
        Some(other) => {
            return Err(IngestionError::malformed(format!(
                "obstacle_position must be a string, got {other}"
            )))
        }
    };

    let obstacle = (detected.is_some() || distance_cm.is_some() || side.is_some()).then_some(
        ObstacleReading::Fields {
            detected,
            distance_cm,
            side,
        },
    );
    let report = SensorReport {
        speed_cm_s,
        obstacle,
    };
    if report.is_empty() {
        return Err(IngestionError::Empty);
    }
    Ok(report)
}
