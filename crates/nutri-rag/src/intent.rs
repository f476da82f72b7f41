//! Query analysis
//!
//! Rule-based intent classification, keyword extraction and the short
//! paraphrase shown back to the user. Preferences mentioned in the question
//! text fill in request fields the caller left unset.
//!
//! Author: hephaex@gmail.com

use nutri_core::{AnswerRequest, Intent, PreferenceQuery};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::index::FastIndex;

// ============================================================================
// Vocabularies
// ============================================================================

/// Intent buckets, tested in order; first match wins
const INTENT_BUCKETS: &[(Intent, &[&str])] = &[
    (
        Intent::MealPlan,
        &[
            "meal plan",
            "diet plan",
            "what to eat",
            "what should i eat",
            "daily diet",
            "menu",
            "breakfast",
            "lunch",
            "dinner",
            "snack",
        ],
    ),
    (
        Intent::SafetyCheck,
        &[
            "can i eat",
            "is it safe",
            "should i avoid",
            "can i have",
            "safe to eat",
            "okay to eat",
        ],
    ),
    (
        Intent::FoodsToAvoid,
        &[
            "avoid",
            "dont eat",
            "don't eat",
            "not eat",
            "shouldn't eat",
            "dangerous",
            "foods to avoid",
            "what not to",
        ],
    ),
    (
        Intent::Benefits,
        &[
            "benefits",
            "good for",
            "why eat",
            "nutrients",
            "nutritional",
            "advantages",
            "helps with",
            "benefit of",
        ],
    ),
    (Intent::TrimesterSpecific, &["trimester", "1st", "2nd", "3rd"]),
    (Intent::Seasonal, &["summer", "winter", "monsoon", "seasonal", "season"]),
    (Intent::Regional, &["north indian", "south indian", "regional"]),
];

/// Fixed domain terms recognized regardless of the dataset
pub const DOMAIN_TERMS: &[&str] = &[
    "egg", "eggs", "milk", "fish", "meat", "chicken", "vegetables", "fruits", "dairy", "nuts",
    "grains", "rice", "wheat", "lentil", "dal", "papaya", "pineapple", "mango", "banana", "apple",
    "spinach", "orange", "yogurt", "curd", "cheese", "paneer", "ghee", "butter", "potato",
    "tomato", "onion", "garlic", "ginger", "bread", "roti", "chapati", "idli", "dosa", "sweet",
    "chocolate", "coffee", "tea", "juice", "almond", "walnut", "cashew", "dates", "raisins",
    "salmon", "tuna", "shrimp", "prawn", "mutton", "lamb", "pork", "beef", "avocado", "quinoa",
    "tofu", "hummus", "pomegranate", "oats", "broccoli", "carrot", "cucumber", "lettuce", "kale",
    "strawberry", "blueberry", "watermelon", "grapes", "brown rice", "white rice", "coconut",
    "almond milk", "soy milk",
];

/// Question words never treated as keywords
pub const SKIP_WORDS: &[&str] = &[
    "can", "could", "should", "would", "is", "are", "was", "were", "have", "has", "had", "do",
    "does", "did", "will", "shall", "eat", "drink", "consume", "take", "safe", "okay", "good",
    "bad", "during", "pregnancy", "pregnant", "trimester", "women", "woman", "about", "what",
    "which", "when", "where", "who", "how", "why", "the", "a", "an", "and", "or", "but", "in",
    "on", "at", "to", "for", "with", "from", "of", "by", "as", "this", "that", "these", "those",
    "it", "its", "my", "your", "me", "you", "he", "she", "we", "they",
];

/// Minimum length of an index name or token to count as a keyword
const MIN_KEYWORD_CHARS: usize = 3;

static TOKEN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+(?:['’][\p{L}]+)?").ok());

// ============================================================================
// Intent
// ============================================================================

/// Classify a question into one of the closed intents
pub fn classify_intent(question: &str) -> Intent {
    let lower = question.to_lowercase();
    INTENT_BUCKETS
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|p| lower.contains(p)))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::General)
}

// ============================================================================
// Keywords
// ============================================================================

/// Extract keywords in discovery order
///
/// Indexed record names found in the question come first (in the order the
/// indexes are given), then fixed domain terms, then remaining tokens that
/// are not question words.
pub fn extract_keywords(question: &str, indexes: &[&FastIndex]) -> Vec<String> {
    let lower = question.to_lowercase();
    let mut keywords: Vec<String> = Vec::new();

    let mut push = |candidate: &str| {
        if !keywords.iter().any(|k| k == candidate) {
            keywords.push(candidate.to_string());
        }
    };

    for index in indexes {
        for name in index.names() {
            if name.chars().count() >= MIN_KEYWORD_CHARS && lower.contains(name) {
                push(name);
            }
        }
    }

    for term in DOMAIN_TERMS {
        if lower.contains(term) {
            push(term);
        }
    }

    if let Some(tokenizer) = TOKEN.as_ref() {
        for token in tokenizer.find_iter(&lower) {
            let token = token.as_str();
            if token.chars().count() >= MIN_KEYWORD_CHARS && !SKIP_WORDS.contains(&token) {
                push(token);
            }
        }
    }

    keywords
}

// ============================================================================
// Paraphrase
// ============================================================================

/// Short restatement of the question
pub fn paraphrase_query(question: &str, keywords: &[String]) -> String {
    let lower = question.to_lowercase();

    let action = if lower.contains("safe") || lower.contains("can i") || lower.contains("is it") {
        "safety"
    } else if lower.contains("bad") || lower.contains("avoid") || lower.contains("don") {
        "avoid"
    } else if lower.contains("benefit") || lower.contains("good") || lower.contains("help") {
        "benefits"
    } else if lower.contains("meal") || lower.contains("plan") {
        "meal_plan"
    } else {
        "general"
    };

    if keywords.is_empty() {
        return match action {
            "safety" => "You're asking about food safety during pregnancy",
            "avoid" => "You want to know which foods to avoid",
            "benefits" => "You're interested in nutritional benefits for pregnancy",
            "meal_plan" => "You're looking for a meal plan guide",
            _ => "You have questions about pregnancy nutrition",
        }
        .to_string();
    }

    let subject = keywords
        .iter()
        .take(2)
        .map(|k| title_case(k))
        .collect::<Vec<_>>()
        .join(" and ");

    match action {
        "safety" => format!("You're asking about the safety of {subject} during pregnancy"),
        "avoid" => format!("You want to know which foods to avoid, especially {subject}"),
        "benefits" => format!("You're interested in the nutritional benefits of {subject}"),
        "meal_plan" => format!("You're looking for meal planning ideas with {subject}"),
        _ => format!("You have questions about {subject} in pregnancy nutrition"),
    }
}

/// Capitalize the first letter of every word
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

// ============================================================================
// Preferences
// ============================================================================

/// Request preferences, with unset fields filled from the question text
pub fn infer_preferences(request: &AnswerRequest) -> PreferenceQuery {
    let lower = request.question.to_lowercase();
    let mut query = request.preferences();

    if query.region.is_none() {
        if lower.contains("north indian") {
            query.region = Some("north".to_string());
        } else if lower.contains("south indian") {
            query.region = Some("south".to_string());
        }
    }

    if query.diet.is_none() {
        if ["non-veg", "non veg", "nonveg"].iter().any(|d| lower.contains(d)) {
            query.diet = Some("nonveg".to_string());
        } else if lower.contains("vegan") {
            query.diet = Some("vegan".to_string());
        } else if lower.contains("vegetarian") {
            query.diet = Some("veg".to_string());
        }
    }

    if query.season.is_none() {
        query.season = ["summer", "winter", "monsoon"]
            .iter()
            .find(|s| lower.contains(*s))
            .map(|s| s.to_string());
    }

    if query.meal_type.is_none() {
        query.meal_type = ["breakfast", "lunch", "dinner", "snack"]
            .iter()
            .find(|m| lower.contains(*m))
            .map(|m| m.to_string());
    }

    query
}
