use rand::{seq::SliceRandom, Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::pools::{COUNTRY_CODES, EMAIL_DOMAINS, FIRST_NAMES, LAST_NAMES, PHONE_GROUPS};

/// Raw form input. Either name may be missing or garbage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeedInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl SeedInput {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
        }
    }
}

/// The synthetic identity a session assembles. Every field is non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeadSeed {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub country: String,
}

/// Keeps letters (any script), digits, `-` and `_`. Everything else, including
/// whitespace, is dropped.
pub fn sanitize_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

pub fn generate_seed(input: &SeedInput, rng: &mut dyn RngCore) -> LeadSeed {
    let first_name = name_or_fallback(input.first_name.as_deref(), FIRST_NAMES, rng);
    let last_name = name_or_fallback(input.last_name.as_deref(), LAST_NAMES, rng);
    let email = derive_email(&first_name, &last_name, rng);
    let (code, country) = COUNTRY_CODES
        .choose(rng)
        .copied()
        .unwrap_or(("+1", "United States"));
    let phone = derive_phone(code, rng);

    LeadSeed {
        first_name,
        last_name,
        email,
        phone,
        country: country.to_string(),
    }
}

fn name_or_fallback(raw: Option<&str>, pool: &[&str], rng: &mut dyn RngCore) -> String {
    let cleaned = raw.map(sanitize_name).unwrap_or_default();
    if cleaned.is_empty() {
        pick(pool, rng).to_string()
    } else {
        cleaned
    }
}

fn email_token(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn derive_email(first_name: &str, last_name: &str, rng: &mut dyn RngCore) -> String {
    let tokens: Vec<String> = [email_token(first_name), email_token(last_name)]
        .into_iter()
        .filter(|token| !token.is_empty())
        .collect();

    let local = if tokens.is_empty() {
        format!("user{}", rng.gen_range(100..1000))
    } else {
        tokens.join(".")
    };
    let suffix = rng.gen_range(10..10_000);
    let domain = pick(EMAIL_DOMAINS, rng);

    format!("{local}{suffix}@{domain}")
}

fn derive_phone(code: &str, rng: &mut dyn RngCore) -> String {
    let mut phone = code.to_string();
    for width in PHONE_GROUPS {
        phone.push(' ');
        for _ in 0..width {
            let digit = rng.gen_range(0..10u8);
            phone.push(char::from(b'0' + digit));
        }
    }
    phone
}

fn pick<'a>(pool: &[&'a str], rng: &mut dyn RngCore) -> &'a str {
    pool.choose(rng).copied().unwrap_or_default()
}
