//! Phone number normalization for WhatsApp providers.

/// Strip everything but ASCII digits.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Twilio WhatsApp address: `whatsapp:+<digits>`.
pub fn twilio_address(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("whatsapp:") {
        return format!("whatsapp:+{}", digits_only(rest));
    }
    format!("whatsapp:+{}", digits_only(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("+1 (555) 010-2030"), "15550102030");
        assert_eq!(digits_only(""), "");
    }

    #[test]
    fn test_twilio_address() {
        assert_eq!(twilio_address("+44 7700 900123"), "whatsapp:+447700900123");
        assert_eq!(twilio_address("whatsapp:+15550102030"), "whatsapp:+15550102030");
    }
}
