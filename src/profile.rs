use anyhow::{bail, Context, Result};
use serde::de::{DeserializeOwned, Deserializer, IntoDeserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} must be a positive number, got '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{0}")]
    Malformed(String),
}

/// Declares a questionnaire enum whose wire value and prompt text are the same label.
macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

labelled_enum!(Gender {
    Male => "Male",
    Female => "Female",
    Other => "Other",
});

labelled_enum!(Goal {
    WeightLoss => "Weight Loss",
    MuscleGain => "Muscle Gain",
    Maintenance => "Maintenance",
    BodyRecomposition => "Body Recomposition",
    AthleticPerformance => "Athletic Performance",
    GeneralHealth => "General Health",
});

labelled_enum!(ActivityLevel {
    Sedentary => "Sedentary",
    LightlyActive => "Lightly Active",
    ModeratelyActive => "Moderately Active",
    VeryActive => "Very Active",
    ExtraActive => "Extra Active",
});

labelled_enum!(DietaryIdentity {
    Vegetarian => "Vegetarian",
    NonVegetarian => "Non-Vegetarian",
    Eggetarian => "Eggetarian",
});

labelled_enum!(CookingAbility {
    Minimal => "Minimal (15 mins)",
    Moderate => "Moderate (30 mins)",
    Advanced => "Advanced (60+ mins)",
});

labelled_enum!(MealFrequency {
    TwoMealsFasting => "2 meals (IF)",
    ThreeMeals => "3 meals",
    FourToFiveMeals => "4-5 meals",
    FiveToSixMeals => "5-6 meals",
});

labelled_enum!(Cravings {
    Sweet => "Sweet tooth",
    Salty => "Salty tooth",
    Both => "Both",
    Nothing => "None",
});

labelled_enum!(WaterIntake {
    UnderOneLitre => "Less than 1L",
    OneToTwoLitres => "1-2L",
    TwoToThreeLitres => "2-3L",
    OverThreeLitres => "3L+",
});

labelled_enum!(SleepHours {
    UnderFive => "Less than 5",
    FiveToSix => "5-6 hours",
    SixToSeven => "6-7 hours",
    SevenToEight => "7-8 hours",
    OverEight => "8+ hours",
});

/// Questionnaire exactly as submitted. Every field may be blank; blank and
/// missing are treated the same.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileForm {
    #[serde(deserialize_with = "blank_as_none")]
    pub gender: Option<Gender>,
    #[serde(deserialize_with = "number_or_text")]
    pub age: Option<String>,
    #[serde(deserialize_with = "number_or_text")]
    pub weight: Option<String>,
    #[serde(deserialize_with = "number_or_text")]
    pub height: Option<String>,
    #[serde(deserialize_with = "number_or_text")]
    pub body_fat: Option<String>,
    #[serde(deserialize_with = "number_or_text")]
    pub target_weight: Option<String>,

    #[serde(deserialize_with = "blank_as_none")]
    pub goal: Option<Goal>,
    #[serde(deserialize_with = "blank_as_none")]
    pub activity: Option<ActivityLevel>,
    #[serde(deserialize_with = "blank_as_none")]
    pub workout_routine: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub medical_conditions: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub medications: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub digestive_health: Option<String>,

    #[serde(deserialize_with = "blank_as_none")]
    pub dietary_identity: Option<DietaryIdentity>,
    #[serde(deserialize_with = "blank_as_none")]
    pub allergies: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub preferred_proteins: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub preferred_carbs: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub disliked_foods: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub cooking_ability: Option<CookingAbility>,

    #[serde(deserialize_with = "blank_as_none")]
    pub meal_frequency: Option<MealFrequency>,
    #[serde(deserialize_with = "blank_as_none")]
    pub cravings: Option<Cravings>,
    #[serde(deserialize_with = "blank_as_none")]
    pub water_intake: Option<WaterIntake>,
    #[serde(deserialize_with = "blank_as_none")]
    pub sleep_hours: Option<SleepHours>,
}

/// A questionnaire that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub gender: Gender,
    pub age: u32,
    pub weight_kg: f32,
    pub height_cm: f32,
    pub body_fat: Option<f32>,
    pub target_weight_kg: Option<f32>,

    pub goal: Goal,
    pub activity: ActivityLevel,
    pub workout_routine: Option<String>,
    pub medical_conditions: Option<String>,
    pub medications: Option<String>,
    pub digestive_health: Option<String>,

    pub dietary_identity: DietaryIdentity,
    pub allergies: Option<String>,
    pub preferred_proteins: String,
    pub preferred_carbs: String,
    pub disliked_foods: Option<String>,
    pub cooking_ability: Option<CookingAbility>,

    pub meal_frequency: MealFrequency,
    pub cravings: Option<Cravings>,
    pub water_intake: Option<WaterIntake>,
    pub sleep_hours: Option<SleepHours>,
}

impl ProfileForm {
    /// Loads a questionnaire from a `.json` or `.toml` file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile file: {}", path.display()))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON profile from {}", path.display())),
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML profile from {}", path.display())),
            _ => bail!(
                "Unsupported profile format for {} (expected .json or .toml)",
                path.display()
            ),
        }
    }

    pub fn validate(self) -> Result<UserProfile, ProfileError> {
        Ok(UserProfile {
            gender: required("gender", self.gender)?,
            age: positive_number::<u32>("age", required("age", self.age)?)?,
            weight_kg: positive_number("weight", required("weight", self.weight)?)?,
            height_cm: positive_number("height", required("height", self.height)?)?,
            body_fat: self
                .body_fat
                .map(|v| positive_number("bodyFat", v))
                .transpose()?,
            target_weight_kg: self
                .target_weight
                .map(|v| positive_number("targetWeight", v))
                .transpose()?,
            goal: required("goal", self.goal)?,
            activity: required("activity", self.activity)?,
            workout_routine: self.workout_routine,
            medical_conditions: self.medical_conditions,
            medications: self.medications,
            digestive_health: self.digestive_health,
            dietary_identity: required("dietaryIdentity", self.dietary_identity)?,
            allergies: self.allergies,
            preferred_proteins: required("preferredProteins", self.preferred_proteins)?,
            preferred_carbs: required("preferredCarbs", self.preferred_carbs)?,
            disliked_foods: self.disliked_foods,
            cooking_ability: self.cooking_ability,
            meal_frequency: required("mealFrequency", self.meal_frequency)?,
            cravings: self.cravings,
            water_intake: self.water_intake,
            sleep_hours: self.sleep_hours,
        })
    }
}

fn required<T>(field: &'static str, value: Option<T>) -> Result<T, ProfileError> {
    value.ok_or(ProfileError::Missing { field })
}

fn positive_number<T>(field: &'static str, value: String) -> Result<T, ProfileError>
where
    T: std::str::FromStr + Into<f64> + Copy,
{
    match value.trim().parse::<T>() {
        Ok(n) if n.into().is_finite() && n.into() > 0.0 => Ok(n),
        _ => Err(ProfileError::InvalidNumber { field, value }),
    }
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => T::deserialize(IntoDeserializer::<D::Error>::into_deserializer(s)).map(Some),
    }
}

// Web forms post numbers as strings while hand-written profile files usually don't.
fn number_or_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Int(i64),
        Float(f64),
        Text(String),
    }

    let raw: Option<NumberOrText> = Option::deserialize(deserializer)?;
    Ok(raw
        .map(|v| match v {
            NumberOrText::Int(n) => n.to_string(),
            NumberOrText::Float(n) => n.to_string(),
            NumberOrText::Text(s) => s.trim().to_string(),
        })
        .filter(|s| !s.is_empty()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn sample_form() -> ProfileForm {
        ProfileForm {
            gender: Some(Gender::Female),
            age: Some("29".to_string()),
            weight: Some("68".to_string()),
            height: Some("165".to_string()),
            goal: Some(Goal::WeightLoss),
            activity: Some(ActivityLevel::ModeratelyActive),
            dietary_identity: Some(DietaryIdentity::Vegetarian),
            preferred_proteins: Some("Lentils, Paneer, Tofu".to_string()),
            preferred_carbs: Some("Oats, Brown rice".to_string()),
            meal_frequency: Some(MealFrequency::FourToFiveMeals),
            ..ProfileForm::default()
        }
    }

    #[test]
    fn validates_complete_form() {
        let profile = sample_form().validate().expect("valid profile");
        assert_eq!(profile.age, 29);
        assert_eq!(profile.weight_kg, 68.0);
        assert_eq!(profile.goal, Goal::WeightLoss);
        assert!(profile.body_fat.is_none());
    }

    #[test]
    fn reports_first_missing_required_field() {
        let mut form = sample_form();
        form.preferred_carbs = None;
        let err = form.validate().expect_err("carbs are required");
        assert_eq!(
            err,
            ProfileError::Missing {
                field: "preferredCarbs"
            }
        );
    }

    #[test]
    fn rejects_non_positive_measurements() {
        let mut form = sample_form();
        form.weight = Some("-3".to_string());
        let err = form.validate().expect_err("negative weight");
        assert!(err.to_string().contains("weight"));

        let mut form = sample_form();
        form.age = Some("twenty".to_string());
        assert!(matches!(
            form.validate(),
            Err(ProfileError::InvalidNumber { field: "age", .. })
        ));
    }

    #[test]
    fn rejects_infinite_measurements() {
        for value in ["inf", "infinity", "-inf", "NaN"] {
            let mut form = sample_form();
            form.height = Some(value.to_string());
            assert!(
                matches!(
                    form.validate(),
                    Err(ProfileError::InvalidNumber { field: "height", .. })
                ),
                "height {value} should be rejected"
            );
        }

        let mut form = sample_form();
        form.target_weight = Some("Infinity".to_string());
        assert!(matches!(
            form.validate(),
            Err(ProfileError::InvalidNumber {
                field: "targetWeight",
                ..
            })
        ));
    }

    #[test]
    fn rejects_malformed_optional_numbers() {
        let mut form = sample_form();
        form.body_fat = Some("lots".to_string());
        assert!(matches!(
            form.validate(),
            Err(ProfileError::InvalidNumber {
                field: "bodyFat",
                ..
            })
        ));
    }

    #[test]
    fn deserializes_web_form_payload_with_blank_fields() {
        let payload = serde_json::json!({
            "gender": "Male",
            "age": "34",
            "weight": "82",
            "height": "180",
            "bodyFat": "",
            "targetWeight": "",
            "activity": "Very Active",
            "workoutRoutine": "",
            "medicalConditions": "",
            "medications": "",
            "digestiveHealth": "",
            "dietaryIdentity": "Non-Vegetarian",
            "allergies": "  ",
            "preferredProteins": "Chicken, Eggs",
            "preferredCarbs": "Rice",
            "dislikedFoods": "",
            "cookingAbility": "",
            "mealFrequency": "3 meals",
            "cravings": "",
            "waterIntake": "2-3L",
            "sleepHours": "",
            "goal": "Muscle Gain"
        });

        let form: ProfileForm = serde_json::from_value(payload).expect("form deserializes");
        assert!(form.body_fat.is_none());
        assert!(form.allergies.is_none());
        assert!(form.cooking_ability.is_none());
        assert_eq!(form.water_intake, Some(WaterIntake::TwoToThreeLitres));

        let profile = form.validate().expect("valid");
        assert_eq!(profile.dietary_identity, DietaryIdentity::NonVegetarian);
        assert_eq!(profile.meal_frequency, MealFrequency::ThreeMeals);
    }

    #[test]
    fn unknown_enum_label_is_a_deserialization_error() {
        let payload = serde_json::json!({ "goal": "Get Huge" });
        assert!(serde_json::from_value::<ProfileForm>(payload).is_err());
    }

    #[test]
    fn loads_toml_profile_with_numeric_values() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        write!(
            file,
            r#"
gender = "Other"
age = 41
weight = 74.5
height = 171
goal = "Maintenance"
activity = "Sedentary"
dietaryIdentity = "Eggetarian"
preferredProteins = "Eggs"
preferredCarbs = "Quinoa"
mealFrequency = "2 meals (IF)"
sleepHours = "7-8 hours"
"#
        )
        .expect("write profile");

        let form = ProfileForm::from_path(file.path()).expect("profile loads");
        assert_eq!(form.weight.as_deref(), Some("74.5"));
        let profile = form.validate().expect("valid");
        assert_eq!(profile.age, 41);
        assert_eq!(profile.sleep_hours, Some(SleepHours::SevenToEight));
    }

    #[test]
    fn rejects_unknown_profile_extension() {
        let file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("temp file");
        let err = ProfileForm::from_path(file.path()).expect_err("yaml unsupported");
        assert!(err.to_string().contains("Unsupported profile format"));
    }
}
