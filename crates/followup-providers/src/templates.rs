//! Deterministic fallback copy, used whenever composition fails.

use followup_core::types::Prospect;

/// Static message for a prospect. Same input, same output.
pub fn fallback_message(prospect: &Prospect) -> String {
    if prospect.category.is_hiring_side() {
        format!(
            "Hi {name},\n\n\
             Noticed you're hiring for technical roles at {company}. I'm an SDE with deep \
             experience in {stack}.\n\n\
             Do you have a few minutes this week to see if my background fits any current \
             openings?\n\nBest,",
            name = prospect.name,
            company = prospect.company_or("your company"),
            stack = prospect.tech_stack.as_deref().unwrap_or("modern web stacks"),
        )
    } else {
        format!(
            "Hi {name},\n\n\
             Saw {team} is looking to streamline operations. I build custom AI agents that \
             automate manual outreach and lead processing.\n\n\
             Worth a 10-minute chat to see if we can save your team some time?\n\nBest,",
            name = prospect.name,
            team = prospect.company_or("your team"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use followup_core::types::ContactCategory;

    #[test]
    fn test_client_fallback() {
        let mut p = Prospect::new(1, 1, "Lee", "lee@globex.com");
        p.company = Some("Globex".into());
        let msg = fallback_message(&p);
        assert!(msg.starts_with("Hi Lee,"));
        assert!(msg.contains("Saw Globex is looking"));
    }

    #[test]
    fn test_hiring_fallback_is_deterministic() {
        let mut p = Prospect::new(2, 1, "Dana", "dana@acme.io");
        p.category = ContactCategory::Hr;
        let a = fallback_message(&p);
        let b = fallback_message(&p);
        assert_eq!(a, b);
        assert!(a.contains("hiring for technical roles at your company"));
        assert!(a.contains("modern web stacks"));
    }
}
