//! Provider order-reference encoding.
//!
//! The reference travels round-trip through the external provider and comes
//! back verbatim in callbacks, so it embeds the invoice id plus a uniqueness
//! token: `INV_<invoiceId>_<token>`. Tokens are alphanumeric only, which
//! keeps the reference clear of `&`, `=` and `|` used by the two
//! canonicalization schemes.

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::{PaymentError, PaymentResult};

const MARKER: &str = "INV_";

/// Encode an invoice id and a uniqueness token into an order reference.
pub fn encode(invoice_id: &str, token: &str) -> String {
    format!("{}{}_{}", MARKER, invoice_id, token)
}

/// Extract the invoice id from an order reference.
///
/// The invoice id is the substring between the first `INV_` marker and the
/// next `_`. Anything that does not fit the format is rejected rather than
/// decoded into a garbage id.
pub fn decode_invoice_id(reference: &str) -> PaymentResult<String> {
    let start = reference
        .find(MARKER)
        .ok_or_else(|| PaymentError::MalformedReference(reference.to_string()))?
        + MARKER.len();

    let rest = &reference[start..];
    let end = rest
        .find('_')
        .ok_or_else(|| PaymentError::MalformedReference(reference.to_string()))?;

    if end == 0 {
        return Err(PaymentError::MalformedReference(reference.to_string()));
    }

    Ok(rest[..end].to_string())
}

/// Fresh uniqueness token: millisecond timestamp plus a random alphanumeric
/// suffix, so concurrent checkouts for the same invoice get distinct
/// references.
pub fn new_token() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{}{}", millis, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let reference = encode("INV-42", "1700000000000Ab3xYz");
        assert_eq!(reference, "INV_INV-42_1700000000000Ab3xYz");
        assert_eq!(decode_invoice_id(&reference).unwrap(), "INV-42");
    }

    #[test]
    fn round_trip_with_generated_token() {
        for _ in 0..16 {
            let token = new_token();
            assert!(!token.contains(['_', '|', '&', '=']));
            let reference = encode("HD-2024-0007", &token);
            assert_eq!(decode_invoice_id(&reference).unwrap(), "HD-2024-0007");
        }
    }

    #[test]
    fn decode_survives_provider_prefixing() {
        // ZaloPay app_trans_id prefixes the reference with a date component.
        assert_eq!(decode_invoice_id("240131_INV_INV-42_99x").unwrap(), "INV-42");
    }

    #[test]
    fn rejects_missing_marker() {
        assert!(matches!(
            decode_invoice_id("ORDER_42_abc"),
            Err(PaymentError::MalformedReference(_))
        ));
    }

    #[test]
    fn rejects_missing_token_separator() {
        assert!(matches!(
            decode_invoice_id("INV_INV-42"),
            Err(PaymentError::MalformedReference(_))
        ));
    }

    #[test]
    fn rejects_empty_invoice_id() {
        assert!(matches!(
            decode_invoice_id("INV__token"),
            Err(PaymentError::MalformedReference(_))
        ));
    }
}
