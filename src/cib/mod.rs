//! Reading and writing rules as CIB XML.

mod element;
mod export;
mod id;
mod import;

pub use element::{Element, XmlError};
pub use export::export;
pub use id::{sanitize_id, DocumentIdProvider, IdAllocationError, IdProvider};
pub use import::to_dto;
