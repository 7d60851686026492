pub mod name;
pub mod normalize;

pub use name::{
    NameCheck, NameViolation, ValidationResult, check_availability, check_syntax,
    is_syntactically_valid,
};
pub use normalize::{REQUIRED_FIELDS, Rejection, RejectionCode, normalize};
