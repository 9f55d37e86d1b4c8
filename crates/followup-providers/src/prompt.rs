//! Prompt assembly for outreach copy.

use followup_core::types::{ContextTag, Prospect};

/// Persona and hard rules for every composed message.
pub const SYSTEM_PROMPT: &str = "You write short outbound emails for a solo builder.
Rules:
- 80 to 120 words, plain text, no markdown.
- No hype words and no filler openers such as \"I hope this finds you well\".
- Open with something specific about the recipient's company.
- Name one likely pain point, one line on how the sender helps, one line of proof.
- Close with a single low-friction call to action (a short call or a yes/no reply).
- Match the tone to the task type: a follow-up nudges, a breakup politely closes the loop,
  a cold mail introduces.";

/// Angle of the pitch, chosen by who the prospect is.
pub struct Pitch {
    pub service: &'static str,
    pub pain: &'static str,
    pub proof: String,
}

impl Pitch {
    pub fn for_prospect(prospect: &Prospect) -> Self {
        if prospect.category.is_hiring_side() {
            Self {
                service: "software engineering (SDE) services",
                pain: "finding reliable engineers who already fit the team's stack",
                proof: format!(
                    "Tech stack: {}. Resume: {}",
                    prospect.tech_stack.as_deref().unwrap_or("full-stack development"),
                    prospect.resume_link.as_deref().unwrap_or("available on request"),
                ),
            }
        } else {
            Self {
                service: "AI automation and SaaS development",
                pain: "manual overhead in lead processing and outreach",
                proof: "custom AI agents that remove 40+ hours of manual work per week".into(),
            }
        }
    }
}

/// Build the user prompt for a prospect under a context tag.
pub fn user_prompt(prospect: &Prospect, tag: &ContextTag) -> String {
    let pitch = Pitch::for_prospect(prospect);
    let context = match prospect.company.as_deref().filter(|c| !c.is_empty()) {
        Some(company) => format!("noticed {company} is scaling its tech operations"),
        None => "came across their recent work in the industry".to_string(),
    };

    format!(
        "Recipient: {name}, {category} at {company}\n\
         Context: {context}\n\
         Inferred pain point: {pain}\n\
         Sender's service: {service}\n\
         Proof: {proof}\n\
         Task type: {tag}\n\n\
         Write the email body only.",
        name = prospect.name,
        category = prospect.category,
        company = prospect.company_or("their team"),
        pain = pitch.pain,
        service = pitch.service,
        proof = pitch.proof,
    )
}
