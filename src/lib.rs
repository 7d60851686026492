//! HTTP façade for listing Azure VM sizes and images and requesting new VMs.
//!
//! Untrusted create requests are normalized and validated here before any
//! call reaches the provider; the provider itself sits behind the
//! [`provider::CatalogClient`] and [`provider::ProvisioningGateway`] traits.

pub mod api;
pub mod azure;
pub mod cloud;
pub mod config;
pub mod provider;
pub mod service;
pub mod validation;
