mod codes;

pub use codes::{new_transaction_code, TRANSACTION_CODE_LEN};
