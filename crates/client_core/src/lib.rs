//! Client-side synchronization between an activity editor and the remote activity API.
//!
//! Descriptors name a remote procedure and its arguments, a [`Session`] executes them through an
//! [`ActivityApi`], and every settled call is folded into a [`NormalizedStore`] by [`reduce`].

pub mod actions;
pub mod code_lists;
pub mod error;
pub mod normalize;
pub mod payload;
pub mod reconcile;
pub mod selectors;
pub mod session;
pub mod store;
pub mod transport;
pub mod validation;
pub mod wizard;

pub use actions::{Action, ActionType, Outcome, Phase, RequestDescriptor, ResponseSchema};
pub use code_lists::{reduce_code_lists, CodeLists};
pub use error::{DispatchError, SubmitError};
pub use normalize::{normalize, NormalizedResponse, NormalizedResult};
pub use reconcile::{plan, reconcile, BatchResult, OperationOutcome, PlannedOperation, ReconcilePlan};
pub use selectors::{select_all, select_children, select_for_path, CollectionSelector};
pub use session::{Dispatch, Session};
pub use store::{reduce, NormalizedStore};
pub use transport::{ActivityApi, HttpActivityApi};
pub use validation::{validate, ValidationErrors};
pub use wizard::WizardStep;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
