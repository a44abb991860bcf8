//! Authorization policies applied in front of every store operation.

pub mod visibility;
