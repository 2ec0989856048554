//! Shared contract types for the helpdesk service.
//!
//! Everything that crosses a trust boundary lives here: the structured
//! answer contract with its clamping and validation rules, the inbound
//! request payload with its canonical cache fingerprint, and the wire
//! error bodies. The daemon and any future clients depend on this crate
//! so both sides agree on one schema.

pub mod contract;
pub mod os;
pub mod request;
pub mod validate;

pub use contract::{
    Answer, Citation, DecisionNode, Diagram, RawAnswer, RawCitation, RawDecisionNode, RawDiagram,
    RawStep, Step,
};
pub use os::Os;
pub use request::{AskRequest, ClarificationBody, ErrorBody, ValidRequest};
pub use validate::{has_distinct_sources, registrable_domain, validate, SchemaError};
