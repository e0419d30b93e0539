//! Built-in plugins: image loading, color conversion and the NEC latent components.

pub mod cvt;
pub mod neclatent;
pub mod open;

use std::str::FromStr;
use std::sync::Arc;

use neclatent_sdk::LatentSdk;

use crate::config::{Config, ErrorScorePolicy};
use crate::error::{Error, Result};
use crate::expression::Call;
use crate::session::SdkSession;

/// What plugin factories get to build from besides their arguments.
#[derive(Debug, Clone)]
pub struct PluginContext {
    pub session: Arc<SdkSession>,
    pub error_score: ErrorScorePolicy,
}

impl PluginContext {
    pub fn new(sdk: Arc<dyn LatentSdk>, config: &Config) -> Self {
        Self {
            session: Arc::new(
                SdkSession::new(sdk).with_serialized_comparisons(config.serialize_comparisons),
            ),
            error_score: config.error_score,
        }
    }
}

pub(crate) fn invalid(call: &Call, message: impl Into<String>) -> Error {
    Error::InvalidArgument {
        plugin: call.name.clone(),
        message: message.into(),
    }
}

pub(crate) fn check_arity(call: &Call, max: usize) -> Result<()> {
    if call.args.len() > max {
        return Err(invalid(
            call,
            format!("expected at most {} arguments, got {}", max, call.args.len()),
        ));
    }
    Ok(())
}

pub(crate) fn parse_bool(call: &Call, index: usize, default: bool) -> Result<bool> {
    match call.arg(index) {
        None => Ok(default),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(invalid(call, format!("'{}' is not a boolean", other))),
    }
}

pub(crate) fn parse_arg<T>(call: &Call, index: usize, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match call.arg(index) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e| invalid(call, format!("{}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(args: &[&str]) -> Call {
        Call {
            name: "Test".to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool(&call(&["true"]), 0, false).unwrap());
        assert!(!parse_bool(&call(&["0"]), 0, true).unwrap());
        assert!(parse_bool(&call(&[]), 0, true).unwrap());
        assert!(matches!(
            parse_bool(&call(&["yes"]), 0, true),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_check_arity() {
        assert!(check_arity(&call(&["a", "b"]), 2).is_ok());
        assert!(check_arity(&call(&["a", "b", "c"]), 2).is_err());
    }
}
