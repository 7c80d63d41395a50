use rand::Rng;

/// Generate a displayable booking reference, e.g. `BK-4F3A9C-7D41`.
///
/// 36 bits of randomness: unique with overwhelming probability but not
/// by construction. The bookings table carries a unique constraint and
/// the insert path retries on collision.
pub fn booking_reference() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "BK-{:06X}-{:04X}",
        rng.gen_range(0..0x0100_0000u32),
        rng.gen_range(0..0x1_0000u32)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_format() {
        let r = booking_reference();
        assert_eq!(r.len(), 14);
        assert!(r.starts_with("BK-"));
        let parts: Vec<&str> = r.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].len(), 6);
        assert_eq!(parts[2].len(), 4);
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_references_are_uppercase() {
        let r = booking_reference();
        assert_eq!(r, r.to_uppercase());
    }

    #[test]
    fn test_consecutive_references_differ() {
        let a = booking_reference();
        let b = booking_reference();
        assert_ne!(a, b);
    }
}
