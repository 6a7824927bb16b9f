//! HTTP helpers for axum handlers built on the CRUD layer

mod form;
mod params;
mod response;

pub use form::FormValues;
pub use params::{ListParams, ListSpec, SortOrder, MAX_PAGE_SIZE};
pub use response::{RestResult, CODE_ERROR, CODE_SUCCESS};
