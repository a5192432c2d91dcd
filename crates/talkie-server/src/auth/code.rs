use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// How long an emailed verification code stays valid.
pub const VERIFY_CODE_TTL_MINUTES: i64 = 60;

/// A fresh 5-digit verification code and the instant it stops being accepted.
pub fn generate_verify_code(now: DateTime<Utc>) -> (String, DateTime<Utc>) {
    let code = rand::thread_rng().gen_range(10_000..100_000u32);
    (
        code.to_string(),
        now + Duration::minutes(VERIFY_CODE_TTL_MINUTES),
    )
}

pub fn is_well_formed_code(code: &str) -> bool {
    code.len() == 5 && code.bytes().all(|b| b.is_ascii_digit())
}
