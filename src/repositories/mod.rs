//! Read-side helpers shared by the workflow services.

pub mod lookup;
