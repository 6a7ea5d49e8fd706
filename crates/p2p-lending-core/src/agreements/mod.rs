pub mod document;
pub mod reference;
pub mod store;

pub use document::{AgreementDocument, AgreementKind, DocumentGenerator, TextDocumentGenerator};
pub use store::{Agreement, AgreementStore};
