//! Deterministic canonicalization of parameter sets for signing.
//!
//! Each provider defines its own canonical form and the signing input must
//! be byte-identical on both sides, so these functions are deliberately
//! small and order-explicit. The sorted-query form is VNPay's; ZaloPay's
//! pipe-delimited forms live next to each operation in
//! `providers::zalopay` because the field subsets differ per operation.

/// Canonicalize a flat key/value set into VNPay's signing input.
///
/// Keys are sorted lexicographically ascending, keys and values are
/// percent-encoded (space becomes `%20`, never `+`), pairs are joined as
/// `key=value` with `&`. Iteration order of the input never affects the
/// output.
pub fn sorted_query<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = params.into_iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Join already-ordered fields with `|` and no trailing delimiter.
///
/// Callers own the field order; this only guarantees the join shape.
pub fn pipe_joined(fields: &[&str]) -> String {
    fields.join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn sorted_query_orders_keys() {
        let out = sorted_query(vec![("b", "2"), ("a", "1"), ("c", "3")]);
        assert_eq!(out, "a=1&b=2&c=3");
    }

    #[test]
    fn sorted_query_is_deterministic_across_insertion_orders() {
        let mut m1 = HashMap::new();
        m1.insert("vnp_TxnRef", "INV_X_1");
        m1.insert("vnp_Amount", "15000000");
        m1.insert("vnp_TmnCode", "DEMO");

        let mut m2 = HashMap::new();
        m2.insert("vnp_TmnCode", "DEMO");
        m2.insert("vnp_TxnRef", "INV_X_1");
        m2.insert("vnp_Amount", "15000000");

        let c1 = sorted_query(m1.iter().map(|(k, v)| (*k, *v)));
        let c2 = sorted_query(m2.iter().map(|(k, v)| (*k, *v)));
        assert_eq!(c1, c2);
    }

    #[test]
    fn space_encodes_as_percent_20() {
        let out = sorted_query(vec![("vnp_OrderInfo", "EV deposit INV-42")]);
        assert_eq!(out, "vnp_OrderInfo=EV%20deposit%20INV-42");
        assert!(!out.contains('+'));
    }

    #[test]
    fn reserved_characters_are_encoded() {
        let out = sorted_query(vec![("vnp_ReturnUrl", "https://shop.vn/return?x=1&y=2")]);
        assert_eq!(
            out,
            "vnp_ReturnUrl=https%3A%2F%2Fshop.vn%2Freturn%3Fx%3D1%26y%3D2"
        );
    }

    #[test]
    fn pipe_joined_has_no_trailing_delimiter() {
        assert_eq!(pipe_joined(&["2554", "240101_INV_X_1", "150000"]), "2554|240101_INV_X_1|150000");
        assert_eq!(pipe_joined(&["one"]), "one");
        assert!(!pipe_joined(&["a", "b"]).ends_with('|'));
    }
}
