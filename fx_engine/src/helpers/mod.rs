mod customer_id;
mod retry;

pub use customer_id::{
    customer_identifier,
    customer_identifiers,
    is_valid_email,
    is_valid_phone,
    normalize_customer_id,
};
pub use retry::with_conflict_retry;
