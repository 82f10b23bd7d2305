//! Query processing over stored versions and ingestion validation.

pub mod temporal;
pub mod validation;
