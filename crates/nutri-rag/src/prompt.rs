//! Prompt construction for the external model

use nutri_core::{AnswerRequest, Intent};

// ============================================================================
// Prompt Builder
// ============================================================================

/// Builder for constructing fallback prompts
pub struct PromptBuilder {
    context_sections: Vec<String>,
    question: String,
    instructions: Vec<String>,
}

impl PromptBuilder {
    /// Create a new prompt builder
    pub fn new() -> Self {
        Self {
            context_sections: Vec::new(),
            question: String::new(),
            instructions: Vec::new(),
        }
    }

    /// Add a context section
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context_sections.push(context.into());
        self
    }

    /// Set the question
    pub fn question(mut self, q: impl Into<String>) -> Self {
        self.question = q.into();
        self
    }

    /// Add an instruction
    pub fn add_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    /// Build the final prompt
    pub fn build(self) -> String {
        let mut prompt = String::new();

        if !self.context_sections.is_empty() {
            prompt.push_str("<context>\n");
            for section in &self.context_sections {
                prompt.push_str(section);
                prompt.push('\n');
            }
            prompt.push_str("</context>\n\n");
        }

        if !self.question.is_empty() {
            prompt.push_str("<question>\n");
            prompt.push_str(&self.question);
            prompt.push_str("\n</question>\n\n");
        }

        if !self.instructions.is_empty() {
            prompt.push_str("<instructions>\n");
            for (i, inst) in self.instructions.iter().enumerate() {
                prompt.push_str(&format!("{}. {}\n", i + 1, inst));
            }
            prompt.push_str("</instructions>\n");
        }

        prompt
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Prompt for a question the dataset could not answer
///
/// The system instruction is carried by the client, so only the user's
/// context, the question and answer-shape instructions go here.
pub fn fallback_prompt(request: &AnswerRequest, intent: Intent, keywords: &[String]) -> String {
    let mut builder = PromptBuilder::new();

    if let Some(t) = request.trimester {
        builder = builder.add_context(format!("Trimester: {t}"));
    }
    if let Some(region) = &request.region {
        builder = builder.add_context(format!("Region: {region}"));
    }
    if let Some(season) = &request.season {
        builder = builder.add_context(format!("Season: {season}"));
    }
    if let Some(diet) = &request.diet_type {
        builder = builder.add_context(format!("Diet: {diet}"));
    }
    if !request.conditions.is_empty() {
        builder = builder.add_context(format!("Conditions: {}", request.conditions.join(", ")));
    }
    if !keywords.is_empty() {
        builder = builder.add_context(format!("Topics: {}", keywords.join(", ")));
    }

    builder = builder
        .question(request.question.trim())
        .add_instruction("Answer for a pregnant woman in India, in under 150 words");

    builder = match intent {
        Intent::SafetyCheck | Intent::FoodsToAvoid => {
            builder.add_instruction("State clearly whether the food is safe and list the main risks")
        }
        Intent::MealPlan | Intent::Seasonal | Intent::Regional | Intent::TrimesterSpecific => {
            builder.add_instruction("Suggest a few concrete Indian dishes")
        }
        Intent::Benefits | Intent::General => {
            builder.add_instruction("Mention the key nutrients involved")
        }
    };

    builder.build()
}
