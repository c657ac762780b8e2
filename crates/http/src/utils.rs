//! Internal helper macros.

/// Early-returns with the given error when the predicate does not hold.
///
/// Like `assert!`, but produces an `Err` instead of panicking, so validation
/// chains read as a flat list of requirements.
///
/// ```ignore
/// ensure!(!field_name.is_empty(), ParseError::bad_request("unnamed field"));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
