use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Serialize, Serializer};
use std::fmt;

/// Percentage change shown in a delta badge. Serializes as its display string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evolution {
    /// No comparison value: `"N/A"`.
    Unavailable,
    /// Comparison value was zero: `"+100%"` if the current value grew, otherwise `"0%"`.
    FromZero { increased: bool },
    /// Signed change in percent, rounded to one decimal.
    Change(f64),
}

impl Evolution {
    pub fn between(previous: Option<f64>, current: f64) -> Self {
        let previous = match previous {
            Some(p) if p.is_finite() => p,
            _ => return Evolution::Unavailable,
        };
        if !current.is_finite() {
            return Evolution::Unavailable;
        }

        if previous == 0.0 {
            return Evolution::FromZero {
                increased: current > 0.0,
            };
        }

        let raw = (current - previous) / previous.abs() * 100.0;
        if !raw.is_finite() {
            return Evolution::Unavailable;
        }

        let rounded = (raw * 10.0).round() / 10.0;
        // Collapse -0.0 so it never renders as "-0.0%".
        Evolution::Change(if rounded == 0.0 { 0.0 } else { rounded })
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            Evolution::Unavailable => None,
            Evolution::FromZero { increased: true } => Some(100.0),
            Evolution::FromZero { increased: false } => Some(0.0),
            Evolution::Change(pct) => Some(*pct),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Evolution::Unavailable)
    }
}

/// Shorthand for [`Evolution::between`].
pub fn evolution(previous: Option<f64>, current: f64) -> Evolution {
    Evolution::between(previous, current)
}

impl fmt::Display for Evolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = match self {
            Evolution::Unavailable => "N/A".to_string(),
            Evolution::FromZero { increased: true } => "+100%".to_string(),
            Evolution::FromZero { increased: false } => "0%".to_string(),
            Evolution::Change(pct) => format!("{:+.1}%", pct),
        };
        f.pad(&rendered)
    }
}

impl Serialize for Evolution {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl JsonSchema for Evolution {
    fn schema_name() -> String {
        "Evolution".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}
