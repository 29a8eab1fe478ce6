//! Build errors for store builders.

use thiserror::Error;

/// Errors that can occur when building a store.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("Store name is empty. Pass a non-blank name to .name(name) or omit it")]
    EmptyName,
}
