//! Payment gateway integration: provider-specific signing, callback
//! verification and checkout orchestration.

pub mod canonical;
pub mod checkout;
pub mod providers;
pub mod reference;
pub mod signature;
pub mod traits;
pub mod types;
