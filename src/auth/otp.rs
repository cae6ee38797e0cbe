use rand::Rng;
use time::Duration;

pub const VERIFICATION_CODE_TTL: Duration = Duration::minutes(3);
pub const RESET_CODE_TTL: Duration = Duration::minutes(15);

/// Six digit numeric one-time code, no leading zeros.
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..100 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn otp_stays_in_range() {
        for _ in 0..100 {
            let value: u32 = generate_otp().parse().expect("numeric code");
            assert!((100_000..1_000_000).contains(&value));
        }
    }
}
