//! Provider-specific canonicalization, signing and API clients.

pub mod vnpay;
pub mod zalopay;
