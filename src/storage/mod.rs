//! Persistence of issued key and certificate material.
//!
//! Issuance itself never touches the filesystem; callers hand the PEM
//! material to this module.

pub mod material;
