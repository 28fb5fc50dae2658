use thiserror::Error;

use crate::cib::{IdAllocationError, XmlError};
use crate::config::ConfigError;
use crate::parse::RuleParseError;
use crate::runner::RunnerError;

/// Unified error type covering every fallible layer of the crate.
///
/// Validator findings are not errors; see [`validate`](crate::validate()).
#[derive(Debug, Error)]
pub enum CibRuleError {
    #[error(transparent)]
    Parse(#[from] RuleParseError),

    #[error(transparent)]
    IdAllocation(#[from] IdAllocationError),

    #[error(transparent)]
    Xml(#[from] XmlError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
