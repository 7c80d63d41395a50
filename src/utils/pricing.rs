/// Smallest increment a displayed fare can take, in minor currency
/// units. Fares are rounded up to a multiple of this.
pub const PRICE_STEP: i64 = 1000;

/// Per-seat fare for a route served by a given bus.
///
/// Always rounds up to the nearest `PRICE_STEP` so rounding can never
/// undercharge.
pub fn trip_price(distance_km: f64, rate_per_km: i64) -> i64 {
    let raw = (distance_km * rate_per_km as f64).ceil().max(0.0) as i64;
    let rem = raw % PRICE_STEP;
    if rem == 0 {
        raw
    } else {
        raw + PRICE_STEP - rem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_multiple_is_unchanged() {
        // 120 km at 500/km = 60_000, already on a step boundary
        assert_eq!(trip_price(120.0, 500), 60_000);
    }

    #[test]
    fn test_rounds_up_never_down() {
        // 120.3 km at 500/km = 60_150 -> next step up
        assert_eq!(trip_price(120.3, 500), 61_000);
        // Just above a boundary still rounds up a full step
        assert_eq!(trip_price(60.001, 1000), 61_000);
    }

    #[test]
    fn test_small_fares_round_to_one_step() {
        assert_eq!(trip_price(1.0, 1), 1_000);
        assert_eq!(trip_price(0.1, 50), 1_000);
    }

    #[test]
    fn test_zero_distance_is_free() {
        assert_eq!(trip_price(0.0, 500), 0);
    }
}
