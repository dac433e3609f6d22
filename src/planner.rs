use crate::llm::{LlmError, PlanGenerator};
use crate::parser::{parse_plan, DietPlan};
use crate::profile::UserProfile;
use crate::prompt::build_prompt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPlan {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub model: String,
    /// The model's answer, untouched.
    pub content: String,
    pub plan: DietPlan,
}

/// Profile in, parsed plan out: prompt, one model call, parse.
pub struct Planner {
    generator: Arc<dyn PlanGenerator>,
}

impl Planner {
    pub fn new(generator: Arc<dyn PlanGenerator>) -> Self {
        Self { generator }
    }

    pub fn model(&self) -> &str {
        self.generator.model()
    }

    pub async fn generate(&self, profile: &UserProfile) -> Result<GeneratedPlan, LlmError> {
        let id = Uuid::new_v4();
        let prompt = build_prompt(profile);
        tracing::info!(
            %id,
            model = self.model(),
            goal = %profile.goal,
            prompt_chars = prompt.len(),
            "Requesting diet plan"
        );

        let content = self.generator.generate(&prompt).await?;
        let plan = parse_plan(&content);
        if !plan.is_structured() {
            tracing::warn!(%id, "Meal table not found in model output, falling back to raw text");
        }
        tracing::info!(%id, rows = plan.meal_plan.len(), "Diet plan generated");

        Ok(GeneratedPlan {
            id,
            generated_at: Utc::now(),
            model: self.model().to_string(),
            content,
            plan,
        })
    }
}
