use rand::{distributions::Alphanumeric, thread_rng, Rng};

use crate::db_types::TransactionCode;

pub const TRANSACTION_CODE_LEN: usize = 6;

/// Draws a fresh random transaction code. Uniqueness is enforced by the order store; callers retry
/// on collision.
pub fn new_transaction_code() -> TransactionCode {
    let code: String = thread_rng().sample_iter(&Alphanumeric).take(TRANSACTION_CODE_LEN).map(char::from).collect();
    TransactionCode(code)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_are_six_alphanumeric_chars() {
        for _ in 0..100 {
            let code = new_transaction_code();
            assert_eq!(code.as_str().len(), TRANSACTION_CODE_LEN);
            assert!(code.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn codes_vary() {
        let a = new_transaction_code();
        let b = new_transaction_code();
        let c = new_transaction_code();
        // Three identical draws in a row from a 62^6 space means the RNG is broken.
        assert!(!(a == b && b == c));
    }
}
