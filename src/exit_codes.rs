//! Exit code constants for the softlock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, bad config, uninitialized store)
//! - 2: Lock store failure (I/O, corrupt rows, busy store)
//! - 3: Not permitted (release by a non-holder, no such lock)
//! - 4: Lock held by another user

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid state.
pub const USER_ERROR: i32 = 1;

/// The lock store could not be read or written.
pub const STORE_FAILURE: i32 = 2;

/// The caller may not perform the release, or there is nothing to act on.
pub const NOT_PERMITTED: i32 = 3;

/// Lock acquisition failure: another user holds an active lock.
pub const LOCK_FAILURE: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, STORE_FAILURE, NOT_PERMITTED, LOCK_FAILURE];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn exit_codes_fit_in_a_process_status() {
        for code in [SUCCESS, USER_ERROR, STORE_FAILURE, NOT_PERMITTED, LOCK_FAILURE] {
            assert!((0..=255).contains(&code));
        }
    }
}
