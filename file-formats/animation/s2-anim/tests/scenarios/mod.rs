//! End-to-end scenarios: resource data in, skinning matrices out
