//! crates/onboarding_core/src/extractor.rs
//!
//! Heuristic extraction of a single data field from a free-text answer. Used
//! by the deterministic slot-filling strategy and as the fallback whenever
//! the AI service is unavailable.

use crate::data::{DataField, OnboardingData};
use regex::Regex;
use std::sync::OnceLock;

type Handler = fn(&str) -> OnboardingData;

/// Extracts a best-guess value for `field` from `text`. Never fails; a miss
/// simply yields whatever the handler could make of the text.
pub fn extract(text: &str, field: DataField) -> OnboardingData {
    handler_for(field)(text)
}

/// Like [`extract`], but for a field given by its wire name. Unknown names
/// yield empty data.
pub fn extract_for(text: &str, field: &str) -> OnboardingData {
    match field.parse::<DataField>() {
        Ok(field) => extract(text, field),
        Err(_) => OnboardingData::new(),
    }
}

fn handler_for(field: DataField) -> Handler {
    match field {
        DataField::UserName => extract_user_name,
        DataField::CompanyName => extract_company_name,
        DataField::Role => extract_role,
        DataField::Objective => extract_objective,
        DataField::IndustryConfirmed => extract_industry_confirmed,
        DataField::IdealOutput => extract_ideal_output,
    }
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("extractor pattern is valid"))
}

fn extract_user_name(text: &str) -> OnboardingData {
    static INTRODUCTION: OnceLock<Regex> = OnceLock::new();
    static SINGLE_WORD: OnceLock<Regex> = OnceLock::new();

    let introduction = regex(&INTRODUCTION, r"(?i)(?:name is|i'm|i am)\s+(\w+)");
    let single_word = regex(&SINGLE_WORD, r"^(\w+)$");

    let name = introduction
        .captures(text)
        .or_else(|| single_word.captures(text.trim()))
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| text.split_whitespace().next().unwrap_or_default().to_string());

    OnboardingData::new().with(DataField::UserName, name)
}

fn extract_company_name(text: &str) -> OnboardingData {
    static LEAD_IN: OnceLock<Regex> = OnceLock::new();
    let lead_in = regex(&LEAD_IN, r"(?i)^(?:i work for|i work at|i work in|at|for|in)\s+");

    let company = lead_in.replace(text, "").trim().to_string();
    OnboardingData::new().with(DataField::CompanyName, company)
}

fn extract_role(text: &str) -> OnboardingData {
    static LEAD_IN: OnceLock<Regex> = OnceLock::new();
    // Longest phrases first: "I'm a manager" must leave "manager".
    let lead_in = regex(
        &LEAD_IN,
        r"(?i)^(?:i am a|i'm a|my role is|i work as|i am|i'm|a)\s+",
    );

    let role = lead_in.replace(text, "").trim().to_string();
    OnboardingData::new().with(DataField::Role, role)
}

fn extract_objective(text: &str) -> OnboardingData {
    OnboardingData::new().with(DataField::Objective, text)
}

fn extract_industry_confirmed(text: &str) -> OnboardingData {
    static AFFIRMATIVE: OnceLock<Regex> = OnceLock::new();
    let affirmative = regex(&AFFIRMATIVE, r"(?i)yes|yeah|yep|correct|right|true");

    OnboardingData::new().with(DataField::IndustryConfirmed, affirmative.is_match(text))
}

fn extract_ideal_output(text: &str) -> OnboardingData {
    OnboardingData::new().with(DataField::IdealOutput, text)
}
