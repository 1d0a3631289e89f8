//! Errors reported for malformed controller declarations.

use thiserror::Error;

use crate::container;
use crate::metadata::ParamSource;

/// A controller declaration that cannot be registered.
#[derive(Debug, Error)]
pub enum DecoratorError {
    #[error("invalid resource name {0:?}: expected dot-separated segments of letters, digits, '-' or '_'")]
    InvalidResourceName(String),

    #[error("{controller}: handler '{handler}' is declared more than once")]
    DuplicateHandler { controller: &'static str, handler: String },

    #[error("{controller}: '{handler}' has parameters or middleware but no route")]
    UnknownHandler { controller: &'static str, handler: String },

    #[error("{controller}: handler '{handler}' binds argument {index} more than once")]
    DuplicateParameterIndex { controller: &'static str, handler: String, index: usize },

    #[error("{controller}: handler '{handler}' leaves argument {index} unbound")]
    MissingParameterIndex { controller: &'static str, handler: String, index: usize },

    #[error("{controller}: handler '{handler}' argument {index} needs a name for {kind} bindings")]
    MissingParameterName {
        controller: &'static str,
        handler: String,
        index: usize,
        kind: ParamSource,
    },

    #[error("{controller}: resource action '{action}' requires a resource declaration")]
    ActionWithoutResource { controller: &'static str, action: &'static str },

    #[error("controller nesting forms a cycle: {0}")]
    CyclicNesting(String),

    #[error(transparent)]
    Container(#[from] container::Error),
}
