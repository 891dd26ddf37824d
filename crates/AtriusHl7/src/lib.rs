//! # Atrius HL7 v2
//!
//! A typed object model for HL7 v2.x messages. Every supported version gets a module of
//! generated views (`v2_1`, `v2_3`, `v2_4`, one cargo feature each) built from the schema
//! tables in `resources/` by the `atrius-hl7-generator` crate. The views are thin wrappers
//! over one untyped storage tree ([`Message`], [`Group`], [`Segment`], [`Field`]) whose
//! layout is described by static tables ([`spec`]).
//!
//! ```rust
//! use atrius_hl7_lib::{ModelRegistry, Parser};
//!
//! let registry = ModelRegistry::with_enabled_versions();
//! let parser = Parser::new(&registry);
//! # #[cfg(feature = "V2_3")]
//! # {
//! use atrius_hl7_lib::v2_3::messages::OruR01;
//!
//! let text = "MSH|^~\\&|LAB|HOSP|||20240101120000||ORU^R01|MSG1|P|2.3\r\
//!             PID|1||12345^^^HOSP||Doe^John\r\
//!             OBR|1|||GLU^Glucose\r\
//!             OBX|1|NM|GLU^Glucose||5.4|mmol/L|||||F\r";
//! let message = parser.parse(text).unwrap();
//! let oru: OruR01 = message.view().unwrap();
//!
//! let result = oru.patient_result_rep(0).unwrap();
//! let pid = result.patient().unwrap().pid().unwrap();
//! let name = pid.patient_name_rep(0).unwrap();
//! assert_eq!(name.family_name().and_then(|f| f.value()), Some("Doe"));
//! assert!(message.validate().is_empty());
//! # }
//! ```
//!
//! Schema errors (a field position a segment does not declare, a repetition beyond a
//! bounded maximum) panic in the plain accessors and are returned by the `try_` forms of
//! [`FieldContainer`] and [`MemberContainer`]. Data that is simply absent is `None`.

pub mod access;
pub mod container;
pub mod date_time;
pub mod er7;
pub mod error;
pub mod model;
pub mod parser;
pub mod registry;
pub mod spec;
pub mod validate;
mod value;

pub use atrius_hl7_schema::{Hl7Version, PrimitiveKind};
pub use rust_decimal::Decimal;

pub use container::{AccessError, FieldContainer, MemberContainer};
pub use error::{Hl7Error, Hl7Result};
pub use model::{Component, Field, Group, Message, RawSegment, Repetition, Segment, Structure};
pub use parser::{ParseOptions, Parser};
pub use registry::ModelRegistry;
pub use validate::{IssueKind, ValidationIssue};
pub use value::ValueRef;

#[cfg(feature = "V2_1")]
#[allow(clippy::all, dead_code, non_camel_case_types)]
pub mod v2_1 {
    include!(concat!(env!("OUT_DIR"), "/v2_1.rs"));
}

#[cfg(feature = "V2_3")]
#[allow(clippy::all, dead_code, non_camel_case_types)]
pub mod v2_3 {
    include!(concat!(env!("OUT_DIR"), "/v2_3.rs"));
}

#[cfg(feature = "V2_4")]
#[allow(clippy::all, dead_code, non_camel_case_types)]
pub mod v2_4 {
    include!(concat!(env!("OUT_DIR"), "/v2_4.rs"));
}
