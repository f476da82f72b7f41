//! Static guidance used when neither the dataset nor the external model
//! can answer.

use nutri_core::{AdviceItem, Intent};

struct Guideline {
    item: &'static str,
    reason: &'static str,
    details: &'static [(&'static str, &'static str)],
}

struct Topic {
    name: &'static str,
    dos: &'static [Guideline],
    donts: &'static [Guideline],
}

const TOPICS: &[Topic] = &[
    Topic {
        name: "fish",
        dos: &[
            Guideline {
                item: "Low-mercury fish",
                reason: "Safe and beneficial for DHA/Omega-3",
                details: &[
                    ("examples", "Salmon, sardines, trout, anchovies"),
                    ("frequency", "2-3 servings per week"),
                ],
            },
            Guideline {
                item: "Well-cooked fish",
                reason: "Eliminates harmful bacteria",
                details: &[
                    ("cooking", "Bake, boil, or grill until opaque"),
                    ("temp", "63°C minimum"),
                ],
            },
            Guideline {
                item: "Fresh fish",
                reason: "Better nutritional value",
                details: &[("storage", "Store in refrigerator, use within 2 days")],
            },
        ],
        donts: &[
            Guideline {
                item: "High-mercury fish",
                reason: "Mercury can harm fetal development",
                details: &[("avoid", "Shark, swordfish, king mackerel, tilefish")],
            },
            Guideline {
                item: "Raw/undercooked fish",
                reason: "Risk of bacteria and parasites",
                details: &[("avoid", "Sushi, sashimi, ceviche, smoked fish")],
            },
            Guideline {
                item: "Excessive portions",
                reason: "Cumulative mercury exposure",
                details: &[("limit", "Max 340g (12 oz) per week")],
            },
        ],
    },
    Topic {
        name: "papaya",
        dos: &[
            Guideline {
                item: "Ripe papaya",
                reason: "Safe and rich in vitamin C",
                details: &[
                    ("color", "Yellow, soft to touch"),
                    ("benefits", "Improves digestion and immunity"),
                ],
            },
            Guideline {
                item: "Cooked/steamed ripe papaya",
                reason: "Extra safety measure",
                details: &[("cooking", "Light cooking is safe for ripe papaya")],
            },
        ],
        donts: &[
            Guideline {
                item: "Unripe papaya",
                reason: "Contains latex which can trigger contractions",
                details: &[
                    ("risk", "May cause miscarriage"),
                    ("identification", "Green, hard texture"),
                ],
            },
            Guideline {
                item: "Excessive amounts",
                reason: "Too much vitamin A can be harmful",
                details: &[("limit", "Moderate portions only")],
            },
            Guideline {
                item: "Papaya seeds/leaves",
                reason: "Unknown safety profile in pregnancy",
                details: &[("avoid", "Only eat the flesh of ripe fruit")],
            },
        ],
    },
    Topic {
        name: "egg",
        dos: &[
            Guideline {
                item: "Fully cooked eggs",
                reason: "Excellent source of choline for baby brain development",
                details: &[
                    ("cooking", "Both yolk and white must be firm"),
                    ("benefit", "1-2 eggs per day is safe"),
                ],
            },
            Guideline {
                item: "Boiled/scrambled eggs",
                reason: "Safest cooking methods",
                details: &[("methods", "Boil, scramble, bake - avoid runny yolks")],
            },
        ],
        donts: &[
            Guideline {
                item: "Raw/undercooked eggs",
                reason: "Risk of Salmonella infection",
                details: &[("avoid", "Raw cookie dough, mayonnaise, soft-boiled eggs")],
            },
            Guideline {
                item: "Raw egg-based foods",
                reason: "Contamination risk",
                details: &[("avoid", "Homemade ice cream, hollandaise, caesar dressing")],
            },
        ],
    },
    Topic {
        name: "milk",
        dos: &[
            Guideline {
                item: "Pasteurized milk",
                reason: "Rich in calcium and vitamin D for bone development",
                details: &[
                    ("amount", "3 cups per day recommended"),
                    ("benefits", "Supports baby skeleton development"),
                ],
            },
            Guideline {
                item: "Milk products (pasteurized)",
                reason: "Excellent calcium sources",
                details: &[(
                    "examples",
                    "Pasteurized cheese, yogurt, paneer, fortified milk",
                )],
            },
        ],
        donts: &[
            Guideline {
                item: "Unpasteurized/raw milk",
                reason: "Risk of Listeria and other harmful bacteria",
                details: &[("risk", "Can cause miscarriage or stillbirth")],
            },
            Guideline {
                item: "Soft cheeses (unless pasteurized)",
                reason: "May contain Listeria",
                details: &[("avoid", "Feta, brie, camembert, queso fresco")],
            },
            Guideline {
                item: "Aged raw-milk cheeses",
                reason: "Higher bacterial risk",
                details: &[("avoid", "Check label for pasteurization")],
            },
        ],
    },
];

/// Bullet points appended to foods-to-avoid answers
pub const AVOID_GUIDELINES: &[&str] = &[
    "Avoid all raw or undercooked meats, fish, and eggs",
    "Skip unpasteurized milk, cheese, and juices",
    "Limit high-mercury fish (shark, swordfish, king mackerel)",
    "No alcohol, smoking, or recreational drugs",
    "Wash all produce thoroughly before eating",
];

/// Bullet points appended to safety answers
pub const SAFETY_TIPS: &[&str] = &[
    "Always wash fruits and vegetables thoroughly",
    "Cook meat, fish, and eggs completely",
    "Avoid unpasteurized dairy products",
    "Consult your doctor if you have specific concerns",
];

/// Bullet points appended to meal plan answers
pub const MEAL_PLAN_TIPS: &[&str] = &[
    "Eat 5-6 small meals throughout the day",
    "Stay hydrated - drink 8-10 glasses of water",
    "Include variety from all food groups",
    "Take prenatal vitamins as prescribed",
    "Listen to your body and adjust portions",
];

/// Closing line for answers given with a known trimester
pub const DOCTOR_TIP: &str = "Tip: Always consult your doctor before making major dietary changes.";

/// Suffix for answers produced by the external model
pub const AI_NOTE: &str =
    "Note: This is AI-generated advice. Always consult your doctor for personalized guidance.";

/// Nutritional focus for a trimester
pub fn trimester_goal(trimester: u8) -> Option<&'static str> {
    match trimester {
        1 => Some("Focus on managing morning sickness and building foundational nutrition with folic acid and B vitamins."),
        2 => Some("This is the growth phase - increase calories (+300/day), protein, calcium, and iron intake."),
        3 => Some("Prepare for delivery with high protein, fiber for digestion, and continued iron/calcium."),
        _ => None,
    }
}

fn to_advice(guidelines: &[Guideline]) -> Vec<AdviceItem> {
    guidelines
        .iter()
        .map(|g| {
            g.details
                .iter()
                .fold(AdviceItem::new(g.item, g.reason), |item, (k, v)| {
                    item.with_detail(*k, *v)
                })
        })
        .collect()
}

/// Dos and don'ts for the first known topic mentioned in `text`
pub fn topic_guidelines(text: &str) -> Option<(Vec<AdviceItem>, Vec<AdviceItem>)> {
    let lower = text.to_lowercase();
    TOPICS
        .iter()
        .find(|topic| lower.contains(topic.name))
        .map(|topic| (to_advice(topic.dos), to_advice(topic.donts)))
}

/// Dos and don'ts for the first keyword that names a known topic
pub fn guidelines_for_keywords(keywords: &[String]) -> Option<(Vec<AdviceItem>, Vec<AdviceItem>)> {
    keywords.iter().find_map(|k| topic_guidelines(k))
}

/// Generic dos and don'ts for a topic with no specific guidance
pub fn default_guidelines(topic: &str) -> (Vec<AdviceItem>, Vec<AdviceItem>) {
    let dos = vec![
        AdviceItem::new("Consult with your doctor", "Get personalized medical advice")
            .with_detail("about", topic),
        AdviceItem::new(
            "Ensure proper cooking",
            "Most foods are safe when properly prepared",
        )
        .with_detail("temperatures", "Cook meat to 73°C, fish to 63°C, eggs until firm"),
    ];
    let donts = vec![AdviceItem::new(
        "Avoid unprepared foods",
        "Unknown foods should be verified by doctor",
    )
    .with_detail("risk", "Potential contamination or allergen risk")];
    (dos, donts)
}

/// Canned answer per intent
pub fn general_answer(intent: Intent, trimester: Option<u8>) -> String {
    match intent {
        Intent::SafetyCheck => "For safety questions about specific foods, please mention the food name and I'll provide detailed information about whether it's safe during pregnancy.".to_string(),
        Intent::FoodsToAvoid => "During pregnancy, generally avoid: raw/undercooked meats, unpasteurized dairy, high-mercury fish, raw eggs, and unwashed produce. Ask me about specific foods!".to_string(),
        Intent::MealPlan => {
            let trimester = trimester.map_or_else(|| "?".to_string(), |t| t.to_string());
            format!("I can help create a meal plan for you! Tell me your preferences (vegetarian/non-vegetarian), region, and current trimester (you're in Trimester {trimester})")
        }
        Intent::TrimesterSpecific => "Each trimester has specific nutritional needs. Tell me your current trimester and I can provide tailored recommendations.".to_string(),
        Intent::Seasonal => "Seasonal diets help maximize fresh produce benefits. Which season are you in (summer/winter/monsoon)?".to_string(),
        Intent::Benefits => "Ask about specific foods and I'll tell you their nutritional benefits and why they're important during pregnancy.".to_string(),
        Intent::Regional | Intent::General => "I'm your pregnancy nutrition expert! Ask me about:\n  • Food safety (can I eat...?)\n  • Meal plans\n  • Nutritional benefits\n  • Trimester-specific needs\n  • Seasonal diets".to_string(),
    }
}
