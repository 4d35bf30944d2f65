//! Versioned command/response envelopes for the host bridge.
//!
//! One JSON object per line in each direction. A bare
//! `{"query": "...", "options": {...}}` line is a valid command: every
//! envelope field has a default and the default command is
//! `company.resolve`.

use entity_match::ResolveOptions;
use serde::{Deserialize, Serialize};

/// Contract version for command/response envelopes.
pub const CONTRACT_VERSION: u32 = 1;

fn default_version() -> u32 {
    CONTRACT_VERSION
}

/// Commands understood by the host bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandName {
    #[default]
    #[serde(rename = "company.resolve")]
    CompanyResolve,
    #[serde(rename = "provider.metrics")]
    ProviderMetrics,
    #[serde(rename = "cache.clear")]
    CacheClear,
    #[serde(rename = "host.ping")]
    HostPing,
    #[serde(rename = "host.version")]
    HostVersion,
    #[serde(rename = "host.stop")]
    HostStop,
}

impl CommandName {
    /// Render command name to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CompanyResolve => "company.resolve",
            Self::ProviderMetrics => "provider.metrics",
            Self::CacheClear => "cache.clear",
            Self::HostPing => "host.ping",
            Self::HostVersion => "host.version",
            Self::HostStop => "host.stop",
        }
    }
}

/// A command from the host process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    #[serde(default = "default_version")]
    pub v: u32,
    /// Echoed back in the response; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default)]
    pub command: CommandName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Partial [`ResolveOptions`] layered over the configured defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

impl CommandEnvelope {
    /// Build a v1 resolve command.
    #[must_use]
    pub fn resolve(request_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            v: CONTRACT_VERSION,
            request_id: Some(request_id.into()),
            command: CommandName::CompanyResolve,
            query: Some(query.into()),
            options: None,
        }
    }

    /// Validate the envelope version.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::UnsupportedVersion`] on a version mismatch.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.v != CONTRACT_VERSION {
            return Err(ContractError::UnsupportedVersion {
                got: self.v,
                expected: CONTRACT_VERSION,
            });
        }
        Ok(())
    }

    /// Effective options: `base` with this command's overrides applied
    /// field by field.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InvalidOptions`] if the overrides are not
    /// an object or contain a value of the wrong type.
    pub fn effective_options(&self, base: &ResolveOptions) -> Result<ResolveOptions, ContractError> {
        let Some(overrides) = &self.options else {
            return Ok(base.clone());
        };
        let serde_json::Value::Object(overrides) = overrides else {
            return Err(ContractError::InvalidOptions(
                "options must be a JSON object".into(),
            ));
        };

        let mut merged = serde_json::to_value(base)
            .map_err(|e| ContractError::InvalidOptions(e.to_string()))?;
        if let serde_json::Value::Object(fields) = &mut merged {
            for (key, value) in overrides {
                fields.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(merged).map_err(|e| ContractError::InvalidOptions(e.to_string()))
    }
}

/// A versioned response to one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub v: u32,
    pub request_id: String,
    pub ok: bool,
    pub payload: serde_json::Value,
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Build a successful response envelope.
    #[must_use]
    pub fn ok(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            v: CONTRACT_VERSION,
            request_id: request_id.into(),
            ok: true,
            payload,
            error: None,
        }
    }

    /// Build an error response envelope.
    #[must_use]
    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            v: CONTRACT_VERSION,
            request_id: request_id.into(),
            ok: false,
            payload: serde_json::Value::Null,
            error: Some(message.into()),
        }
    }
}

/// Contract violation in an incoming command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("unsupported contract version {got}; expected {expected}")]
    UnsupportedVersion { got: u32, expected: u32 },

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("{0} requires a query")]
    MissingQuery(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_query_line_is_a_resolve_command() {
        let envelope: CommandEnvelope =
            serde_json::from_str(r#"{"query": "TechCorp"}"#).expect("parse");
        assert_eq!(envelope.v, CONTRACT_VERSION);
        assert_eq!(envelope.command, CommandName::CompanyResolve);
        assert_eq!(envelope.query.as_deref(), Some("TechCorp"));
        assert!(envelope.request_id.is_none());
        assert!(envelope.validate().is_ok());
    }

    #[test]
    fn command_names_use_dotted_wire_format() {
        let envelope: CommandEnvelope =
            serde_json::from_str(r#"{"request_id": "r1", "command": "provider.metrics"}"#)
                .expect("parse");
        assert_eq!(envelope.command, CommandName::ProviderMetrics);
        assert_eq!(
            serde_json::to_value(CommandName::HostStop).expect("serialize"),
            serde_json::json!(CommandName::HostStop.as_str())
        );
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(serde_json::from_str::<CommandEnvelope>(r#"{"command": "runtime.start"}"#).is_err());
    }

    #[test]
    fn wrong_version_fails_validation() {
        let envelope: CommandEnvelope =
            serde_json::from_str(r#"{"v": 2, "query": "x"}"#).expect("parse");
        assert_eq!(
            envelope.validate(),
            Err(ContractError::UnsupportedVersion {
                got: 2,
                expected: CONTRACT_VERSION
            })
        );
    }

    #[test]
    fn options_override_only_named_fields() {
        let base = ResolveOptions {
            max_local_results: 5,
            ..ResolveOptions::default()
        };
        let envelope: CommandEnvelope = serde_json::from_str(
            r#"{"query": "x", "options": {"always_combine": false, "fuzzy_threshold": 0.5}}"#,
        )
        .expect("parse");

        let options = envelope.effective_options(&base).expect("options");
        assert!(!options.always_combine);
        assert!((options.fuzzy_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(options.max_local_results, 5);
    }

    #[test]
    fn malformed_options_are_rejected() {
        let envelope: CommandEnvelope =
            serde_json::from_str(r#"{"query": "x", "options": {"max_local_results": "many"}}"#)
                .expect("parse");
        assert!(matches!(
            envelope.effective_options(&ResolveOptions::default()),
            Err(ContractError::InvalidOptions(_))
        ));

        let envelope: CommandEnvelope =
            serde_json::from_str(r#"{"query": "x", "options": [1, 2]}"#).expect("parse");
        assert!(envelope.effective_options(&ResolveOptions::default()).is_err());
    }

    #[test]
    fn response_envelope_roundtrip_json() {
        let resp = ResponseEnvelope::ok("req-1", serde_json::json!({"pong": true}));
        let json = serde_json::to_string(&resp).expect("serialize in test");
        let parsed: ResponseEnvelope = serde_json::from_str(&json).expect("deserialize in test");
        assert_eq!(parsed, resp);
    }
}
