//! Partial redaction of login identifiers.
//!
//! The raw identifier stays inside the challenge; everything shown to a
//! resident or written to logs uses the masked form.

use concierge_protocol::ChallengeChannel;

/// Number of leading characters of an email's local part left visible.
const EMAIL_VISIBLE_CHARS: usize = 2;

/// Number of trailing digits of a phone number left visible.
const PHONE_VISIBLE_DIGITS: usize = 4;

/// Infers the delivery channel from the identifier's shape.
pub fn infer_channel(identifier: &str) -> ChallengeChannel {
    if identifier.contains('@') {
        ChallengeChannel::Email
    } else {
        ChallengeChannel::Sms
    }
}

/// Masks an email address or phone number for display.
///
/// ```text
/// user@example.com  → us***@example.com
/// +1 555 123 4567   → +* *** *** 4567
/// ```
pub fn mask_identifier(identifier: &str) -> String {
    match infer_channel(identifier) {
        ChallengeChannel::Email => mask_email(identifier),
        ChallengeChannel::Sms => mask_phone(identifier),
    }
}

fn mask_email(email: &str) -> String {
    // `infer_channel` guarantees an '@' is present.
    let at = email.find('@').unwrap_or(email.len());
    let (local, domain) = email.split_at(at);
    let visible: String = local.chars().take(EMAIL_VISIBLE_CHARS).collect();
    format!("{visible}***{domain}")
}

fn mask_phone(phone: &str) -> String {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    // Short numbers are masked entirely.
    let hidden = if digits > PHONE_VISIBLE_DIGITS {
        digits - PHONE_VISIBLE_DIGITS
    } else {
        digits
    };

    let mut seen = 0;
    phone
        .chars()
        .map(|c| {
            if !c.is_ascii_digit() {
                return c;
            }
            seen += 1;
            if seen <= hidden { '*' } else { c }
        })
        .collect()
}
