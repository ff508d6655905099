//! Terminal return codes.
//!
//! Exactly one code means success. Everything else is a rejection whose
//! description comes from the table below. The retry classification is
//! advisory and only surfaces in logs and results.

use serde::{Deserialize, Serialize};

/// The only return code treated as an accepted request.
pub const RETCODE_DONE: u32 = 10009;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetcodeClass {
    Success,
    /// Transient condition; a caller may resubmit later.
    Retryable,
    /// The request itself is wrong or not allowed.
    Fatal,
    Unknown,
}

const RETCODES: &[(u32, &str, RetcodeClass)] = &[
    (10004, "requote", RetcodeClass::Retryable),
    (10006, "request rejected", RetcodeClass::Fatal),
    (10007, "request canceled by trader", RetcodeClass::Fatal),
    (10008, "order placed", RetcodeClass::Unknown),
    (RETCODE_DONE, "request completed", RetcodeClass::Success),
    (10010, "only part of the request was completed", RetcodeClass::Retryable),
    (10011, "request processing error", RetcodeClass::Retryable),
    (10012, "request canceled by timeout", RetcodeClass::Retryable),
    (10013, "invalid request", RetcodeClass::Fatal),
    (10014, "invalid volume in the request", RetcodeClass::Fatal),
    (10015, "invalid price in the request", RetcodeClass::Fatal),
    (10016, "invalid stops in the request", RetcodeClass::Fatal),
    (10017, "trade is disabled", RetcodeClass::Fatal),
    (10018, "market is closed", RetcodeClass::Retryable),
    (10019, "there is not enough money to complete the request", RetcodeClass::Fatal),
    (10020, "prices changed", RetcodeClass::Retryable),
    (10021, "there are no quotes to process the request", RetcodeClass::Retryable),
    (10022, "invalid order expiration date in the request", RetcodeClass::Fatal),
    (10023, "order state changed", RetcodeClass::Retryable),
    (10024, "too frequent requests", RetcodeClass::Retryable),
    (10025, "no changes in request", RetcodeClass::Fatal),
    (10026, "autotrading disabled by server", RetcodeClass::Fatal),
    (10027, "autotrading disabled by client terminal", RetcodeClass::Fatal),
    (10028, "request locked for processing", RetcodeClass::Retryable),
    (10029, "order or position frozen", RetcodeClass::Retryable),
    (10030, "invalid order filling type", RetcodeClass::Fatal),
    (10031, "no connection with the trade server", RetcodeClass::Retryable),
    (10032, "operation is allowed only for live accounts", RetcodeClass::Fatal),
    (10033, "the number of pending orders has reached the limit", RetcodeClass::Fatal),
    (10034, "the volume of orders and positions for the symbol has reached the limit", RetcodeClass::Fatal),
    (10035, "incorrect or prohibited order type", RetcodeClass::Fatal),
    (10036, "position with the specified identifier has already been closed", RetcodeClass::Fatal),
    (10038, "close volume exceeds the current position volume", RetcodeClass::Fatal),
    (10039, "a close order already exists for the specified position", RetcodeClass::Fatal),
    (10040, "the number of open positions has reached the limit", RetcodeClass::Fatal),
    (10041, "pending order activation request rejected, order canceled", RetcodeClass::Fatal),
    (10042, "only long positions are allowed for the symbol", RetcodeClass::Fatal),
    (10043, "only short positions are allowed for the symbol", RetcodeClass::Fatal),
    (10044, "only position closing is allowed for the symbol", RetcodeClass::Fatal),
    (10045, "position closing is allowed only by FIFO rule", RetcodeClass::Fatal),
];

pub fn is_success(code: u32) -> bool {
    code == RETCODE_DONE
}

/// Human-readable description; unknown codes render with their number.
pub fn describe_retcode(code: u32) -> String {
    RETCODES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, text, _)| text.to_string())
        .unwrap_or_else(|| format!("unknown error, code {code}"))
}

pub fn classify_retcode(code: u32) -> RetcodeClass {
    RETCODES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, _, class)| *class)
        .unwrap_or(RetcodeClass::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_done_is_success() {
        assert!(is_success(10009));
        assert!(!is_success(10008));
        assert!(!is_success(10010));
        assert!(!is_success(0));
    }

    #[test]
    fn known_code_has_description() {
        assert_eq!(describe_retcode(10014), "invalid volume in the request");
        assert_eq!(describe_retcode(10004), "requote");
    }

    #[test]
    fn unknown_code_renders_number() {
        assert_eq!(describe_retcode(99999), "unknown error, code 99999");
        assert_eq!(classify_retcode(99999), RetcodeClass::Unknown);
    }

    #[test]
    fn classification_separates_transient_from_fatal() {
        assert_eq!(classify_retcode(10009), RetcodeClass::Success);
        assert_eq!(classify_retcode(10004), RetcodeClass::Retryable);
        assert_eq!(classify_retcode(10031), RetcodeClass::Retryable);
        assert_eq!(classify_retcode(10019), RetcodeClass::Fatal);
    }

    #[test]
    fn order_placed_is_neither_success_nor_fatal() {
        assert!(!is_success(10008));
        assert_eq!(classify_retcode(10008), RetcodeClass::Unknown);
        assert_eq!(describe_retcode(10008), "order placed");
    }

    #[test]
    fn table_has_no_duplicate_codes() {
        let mut codes: Vec<u32> = RETCODES.iter().map(|(c, _, _)| *c).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), RETCODES.len());
    }
}
