use crate::profile::UserProfile;

/// Meal slots the model is asked to fill, three options each.
pub const MEAL_SLOTS: [&str; 5] = [
    "Breakfast",
    "Mid-Morning Snack",
    "Lunch",
    "Evening Snack",
    "Dinner",
];

pub const OPTIONS_PER_MEAL: usize = 3;

pub const TABLE_COLUMNS: [&str; 9] = [
    "Meal",
    "Option",
    "Timing",
    "Ingredients & Portions",
    "Calories",
    "Protein",
    "Carbs",
    "Fat",
    "Preparation",
];

fn or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value.unwrap_or(fallback)
}

fn number_or(value: Option<f32>, fallback: &str) -> String {
    value.map_or_else(|| fallback.to_string(), |v| v.to_string())
}

/// Renders the nutritionist instruction for one profile. Output depends only
/// on the profile.
pub fn build_prompt(profile: &UserProfile) -> String {
    let workout = profile.workout_routine.as_deref();
    let header = format!("| {} |", TABLE_COLUMNS.join(" | "));
    let alignment = format!("|{}", " :--- |".repeat(TABLE_COLUMNS.len()));
    let option_labels = (1..=OPTIONS_PER_MEAL)
        .map(|n| format!("\"Option {n}\""))
        .collect::<Vec<_>>();
    let option_list = match option_labels.split_last() {
        Some((last, rest)) => format!("{}, or {}", rest.join(", "), last),
        None => String::new(),
    };

    format!(
        r#"
You are an expert AI Clinical Nutritionist. Create a comprehensive, personalized diet plan based on the following individual profile:

### USER PROFILE DATA:
- Age/Gender: {age} / {gender}
- Height/Weight: {height}cm / {weight}kg
- Body Fat %: {body_fat}
- Goal: {goal} (Target Weight: {target_weight})
- Activity Level: {activity}
- Workout Routine: {workout}
- Health/Medications: {conditions} / {medications}
- Digestive Health: {digestive}
- Dietary Identity: {identity}
- Allergies: {allergies}
- Preferred Proteins: {proteins}
- Preferred Carbs: {carbs}
- Food Dislikes: {dislikes}
- Cooking Ability: {cooking}
- Meal Frequency: {frequency}
- Cravings: {cravings}
- Water Intake: {water}
- Sleep Hours: {sleep}

---

### OUTPUT REQUIREMENTS:
Please generate the response using the following four-section structure:

1. **DAILY TARGETS**: State the daily Calorie, Protein, Carbohydrate, and Fat targets based on the user's goal and activity level.

2. **DIET PLAN TABLE**: Provide a 1-day meal plan with **{options} OPTIONS for each meal** in a Markdown table with the following columns:
{header}
{alignment}

IMPORTANT: For each meal slot ({slots}), provide exactly {options} different options in separate rows.
- The "Meal" column should contain the meal name ({slots})
- The "Option" column should contain {option_list}
- Each option should be a complete meal that meets similar calorie and macro targets
- Ensure 'Ingredients & Portions' includes specific gram measurements

3. **MICRONUTRIENT & SUPPLEMENT RECOMMENDATIONS**:
Based on the SPECIFIC foods and meals in the diet plan above, analyze:
- Which micronutrients are well-covered by the recommended foods
- Which micronutrients may be lacking based on the user's dietary identity ({identity}) and the specific meals provided
- Provide specific supplement recommendations with dosages based on gaps in the diet plan
- Reference specific foods from the diet plan that contribute to certain nutrients

4. **PRACTICAL ADVICE**:
Provide 5-6 lifestyle and wellness tips the person should ADDITIONALLY follow alongside this diet plan:
- Daily water intake target in liters based on activity level ({activity})
- Recommended sleep hours and sleep quality tips
- Best meal timing relative to workouts ({workout_focus})
- Walking/movement goals (steps per day)
- Stress management tips for better digestion and metabolism
- Screen time and eating habits (mindful eating)

Tone: Professional, clinical, and encouraging. Use plain text without asterisks or markdown bold formatting.
"#,
        age = profile.age,
        gender = profile.gender,
        height = profile.height_cm,
        weight = profile.weight_kg,
        body_fat = number_or(profile.body_fat, "Not provided"),
        goal = profile.goal,
        target_weight = number_or(profile.target_weight_kg, "N/A"),
        activity = profile.activity,
        workout = or(workout, "Not specified"),
        conditions = or(profile.medical_conditions.as_deref(), "None"),
        medications = or(profile.medications.as_deref(), "None"),
        digestive = or(profile.digestive_health.as_deref(), "Normal"),
        identity = profile.dietary_identity,
        allergies = or(profile.allergies.as_deref(), "None"),
        proteins = profile.preferred_proteins,
        carbs = profile.preferred_carbs,
        dislikes = or(profile.disliked_foods.as_deref(), "None"),
        cooking = or(profile.cooking_ability.map(|c| c.label()), "Moderate"),
        frequency = profile.meal_frequency,
        cravings = or(profile.cravings.map(|c| c.label()), "Not specified"),
        water = or(profile.water_intake.map(|w| w.label()), "Not specified"),
        sleep = or(profile.sleep_hours.map(|s| s.label()), "Not specified"),
        options = OPTIONS_PER_MEAL,
        slots = MEAL_SLOTS.join(", "),
        workout_focus = or(workout, "general fitness"),
    )
}
