//! EV-dealer back-office payment backend.
//!
//! The interesting subsystem is the payment-gateway integration and
//! settlement layer: provider-specific signed payment requests, verified
//! callbacks from two independent providers (VNPay and ZaloPay, each with
//! its own canonicalization and MAC scheme), and exactly-once settlement
//! recording under at-least-once callback delivery.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod payments;
pub mod settlement;
