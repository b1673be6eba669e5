//! Authorization classification from registration codes.
//!
//! Registration codes look like `SD-B00123`: an issuer prefix, a `-`, then a
//! class letter. Drones whose class letter is `B` are cleared to fly. This is
//! a display classification, not an access control.

const SEGMENT_DELIMITER: char = '-';
const AUTHORIZED_MARKER: char = 'B';

/// Returns true when the second `-`-separated segment starts with `B`.
pub fn is_authorized(registration: &str) -> bool {
    registration
        .split(SEGMENT_DELIMITER)
        .nth(1)
        .is_some_and(|segment| segment.starts_with(AUTHORIZED_MARKER))
}
