//! Model name decoding
//!
//! Model names carry their simulation metadata:
//!
//! ```text
//! <label>-<tag> [token ...]
//! ```
//!
//! Everything after the last hyphen, trimmed and lower-cased, is a
//! whitespace-separated token list. The first token is the material tag;
//! the rest are bare words (`x`, `y`, `z`, port numbers) or `key=value`
//! pairs (`priority`, `zo`, `epsilon`, `kappa`).

use crate::error::{Error, Result};
use crate::geometry::Axis;
use crate::material::{CustomDielectric, MaterialTag};

/// Priority of a structure without a `priority=` key.
pub const DEFAULT_PRIORITY: i32 = 0;

/// Tokenized material part of a model name.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelName {
    name: String,
    tokens: Vec<String>,
}

impl ModelName {
    pub fn parse(name: &str) -> Self {
        let material = name.rsplit('-').next().unwrap_or(name).trim().to_lowercase();
        let tokens = material.split_whitespace().map(str::to_string).collect();
        Self {
            name: name.to_string(),
            tokens,
        }
    }

    /// The full, undecorated name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn material_tag(&self) -> MaterialTag {
        MaterialTag::from_token(self.tokens.first().map(String::as_str).unwrap_or(""))
    }

    pub fn is_port(&self) -> bool {
        self.tokens.first().is_some_and(|t| t == "port")
    }

    fn value(&self, key: &str) -> Option<&str> {
        self.tokens.iter().find_map(|token| {
            let (k, v) = token.split_once('=')?;
            (k == key).then_some(v)
        })
    }

    /// `priority=<int>`, or [`DEFAULT_PRIORITY`]. Unparseable values are ignored.
    pub fn priority(&self) -> i32 {
        self.value("priority")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PRIORITY)
    }

    /// First token that parses as an integer.
    pub fn port_number(&self) -> Result<u32> {
        let number = self
            .tokens
            .iter()
            .find_map(|t| t.parse::<i64>().ok())
            .ok_or_else(|| Error::MissingPortNumber {
                name: self.name.clone(),
            })?;
        u32::try_from(number)
            .ok()
            .filter(|&n| n >= 1)
            .ok_or_else(|| Error::InvalidPortNumber {
                name: self.name.clone(),
                number,
            })
    }

    /// First bare `x`, `y` or `z`.
    pub fn port_direction(&self) -> Result<Axis> {
        self.tokens
            .iter()
            .find_map(|t| match t.as_str() {
                "x" => Some(Axis::X),
                "y" => Some(Axis::Y),
                "z" => Some(Axis::Z),
                _ => None,
            })
            .ok_or_else(|| Error::MissingPortDirection {
                name: self.name.clone(),
            })
    }

    /// `zo=<int>` in ohms, or `default`.
    pub fn port_impedance(&self, default: f64) -> f64 {
        self.value("zo")
            .and_then(|v| v.parse::<i64>().ok())
            .map(|z| z as f64)
            .unwrap_or(default)
    }

    pub fn custom_dielectric(&self) -> CustomDielectric {
        CustomDielectric {
            epsilon: self.value("epsilon").and_then(|v| v.parse().ok()),
            kappa: self.value("kappa").and_then(|v| v.parse().ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Conductor;

    #[test]
    fn test_material_tag() {
        assert_eq!(ModelName::parse("box-air").material_tag(), MaterialTag::Air);
        assert_eq!(ModelName::parse("patch-PEC priority=2").material_tag(), MaterialTag::Pec);
        assert_eq!(
            ModelName::parse("my-trace- Copper ").material_tag(),
            MaterialTag::Conductor(Conductor::Copper)
        );
        assert_eq!(
            ModelName::parse("sub-fr4 epsilon=4.4").material_tag(),
            MaterialTag::Custom("fr4".into())
        );
    }

    #[test]
    fn test_only_last_hyphen_counts() {
        let name = ModelName::parse("feed-line-port x 2");
        assert!(name.is_port());
        assert_eq!(name.port_number().unwrap(), 2);
        assert!(!ModelName::parse("port-pec").is_port());
    }

    #[test]
    fn test_priority() {
        assert_eq!(ModelName::parse("a-pec priority=7").priority(), 7);
        assert_eq!(ModelName::parse("a-pec").priority(), DEFAULT_PRIORITY);
        assert_eq!(ModelName::parse("a-pec priority=high").priority(), DEFAULT_PRIORITY);

        // a minus sign starts a new material part
        let name = ModelName::parse("a-pec priority=-3");
        assert_eq!(name.priority(), DEFAULT_PRIORITY);
        assert_eq!(name.material_tag(), MaterialTag::Custom("3".into()));
    }

    #[test]
    fn test_port_fields() {
        let name = ModelName::parse("feed-port y zo=75 3 priority=5");
        assert_eq!(name.port_number().unwrap(), 3);
        assert_eq!(name.port_direction().unwrap(), Axis::Y);
        assert_eq!(name.port_impedance(50.0), 75.0);
        assert_eq!(name.priority(), 5);

        let name = ModelName::parse("feed-port z 1 zo=abc");
        assert_eq!(name.port_impedance(50.0), 50.0);
    }

    #[test]
    fn test_port_errors() {
        let err = ModelName::parse("feed-port x").port_number().unwrap_err();
        assert!(matches!(err, Error::MissingPortNumber { .. }));

        let err = ModelName::parse("feed-port x 0").port_number().unwrap_err();
        assert!(matches!(err, Error::InvalidPortNumber { number: 0, .. }));

        let name = ModelName::parse("feed-port x -2");
        assert!(!name.is_port());
        assert_eq!(name.port_number().unwrap(), 2);

        let err = ModelName::parse("feed-port 1").port_direction().unwrap_err();
        assert!(matches!(err, Error::MissingPortDirection { .. }));
    }

    #[test]
    fn test_custom_dielectric() {
        let custom = ModelName::parse("sub-rogers epsilon=3.66 kappa=0.01").custom_dielectric();
        assert_eq!(custom.epsilon, Some(3.66));
        assert_eq!(custom.kappa, Some(0.01));

        let custom = ModelName::parse("sub-rogers epsilon=oops").custom_dielectric();
        assert!(custom.is_empty());
    }
}
