//! Best-effort extraction of a diet plan from the model's markdown.
//!
//! The model is asked for four numbered sections and a pipe table, but it is
//! free to decorate headings with `**`, `##`, colons or different casing.
//! Nothing here fails: whatever cannot be located is left empty and callers
//! fall back to the raw text.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

macro_rules! pattern {
    ($name:ident, $re:literal) => {
        #[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($re).expect("valid regex"));
    };
}

pattern!(
    DAILY_TARGETS_HEADING,
    r"(?i)(?:\*\*)?1\.\s*(?:\*\*)?DAILY TARGETS(?:\*\*)?:?(?:\*\*)?"
);
pattern!(DIET_PLAN_HEADING, r"(?i)(?:\*\*)?2\.\s*(?:\*\*)?DIET PLAN");
pattern!(
    MICRONUTRIENT_HEADING,
    r"(?i)(?:\*\*)?3\.\s*(?:\*\*)?MICRONUTRIENT[^\n]*"
);
pattern!(PRACTICAL_HEADING, r"(?i)(?:\*\*)?4\.\s*(?:\*\*)?PRACTICAL");
pattern!(
    PRACTICAL_ADVICE_HEADING,
    r"(?i)(?:\*\*)?4\.\s*(?:\*\*)?PRACTICAL ADVICE(?:\*\*)?:?(?:\*\*)?"
);
pattern!(TABLE_HEADER, r"(?i)\|[^\n]*meal[^\n]*\|");
// Blank line, the micronutrient heading, or any `##` heading.
pattern!(TABLE_END, r"\n(?:[ \t]*\n|(?:\*\*)?3\.|##)");
pattern!(LINE_BULLET, r"(?m)^[ \t]*[-•–][ \t]*");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealRow {
    pub meal: String,
    pub option: String,
    pub timing: String,
    pub ingredients: String,
    pub calories: String,
    pub protein: String,
    pub carbs: String,
    pub fat: String,
    pub preparation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DietPlan {
    pub daily_targets: String,
    pub meal_plan: Vec<MealRow>,
    pub micronutrients: String,
    pub practical_advice: String,
    pub raw_markdown: String,
}

impl DietPlan {
    /// Whether the meal table was recovered. Without it the plan is shown as raw text.
    pub fn is_structured(&self) -> bool {
        !self.meal_plan.is_empty()
    }

    /// Rows grouped by meal slot in the order the slots first appear.
    pub fn meals(&self) -> Vec<(&str, Vec<&MealRow>)> {
        let mut groups: Vec<(&str, Vec<&MealRow>)> = Vec::new();
        for row in &self.meal_plan {
            match groups.iter_mut().find(|(meal, _)| *meal == row.meal) {
                Some((_, rows)) => rows.push(row),
                None => groups.push((row.meal.as_str(), vec![row])),
            }
        }
        groups
    }
}

pub fn parse_plan(markdown: &str) -> DietPlan {
    let text = markdown.replace("\r\n", "\n");

    let plan = DietPlan {
        daily_targets: section_between(&text, &DAILY_TARGETS_HEADING, Some(&DIET_PLAN_HEADING)),
        meal_plan: extract_table(&text).map(table_rows).unwrap_or_default(),
        micronutrients: section_between(&text, &MICRONUTRIENT_HEADING, Some(&PRACTICAL_HEADING)),
        practical_advice: section_between(&text, &PRACTICAL_ADVICE_HEADING, None),
        raw_markdown: markdown.to_string(),
    };

    tracing::debug!(
        rows = plan.meal_plan.len(),
        has_targets = !plan.daily_targets.is_empty(),
        has_micronutrients = !plan.micronutrients.is_empty(),
        has_advice = !plan.practical_advice.is_empty(),
        "Parsed diet plan"
    );

    plan
}

/// Text after the first `start` heading that is followed by `end`, up to that
/// `end`. With no `end`, everything after the heading. Markdown heading marks
/// left dangling before the next heading are dropped.
fn section_between(text: &str, start: &Regex, end: Option<&Regex>) -> String {
    for heading in start.find_iter(text) {
        let rest = &text[heading.end()..];
        let body = match end {
            Some(end) => match end.find(rest) {
                Some(stop) => &rest[..stop.start()],
                None => continue,
            },
            None => rest,
        };
        return body.trim().trim_end_matches('#').trim_end().to_string();
    }
    String::new()
}

fn extract_table(text: &str) -> Option<&str> {
    let header = TABLE_HEADER.find(text)?;
    let stop = TABLE_END
        .find(&text[header.end()..])
        .map_or(text.len(), |m| header.end() + m.start());
    Some(&text[header.start()..stop])
}

/// Data rows of a table slice. The first line is the header whenever a
/// separator row follows it, whatever its first cell says.
fn table_rows(table: &str) -> Vec<MealRow> {
    let mut lines = table.lines().filter(|line| !line.trim().is_empty());
    let mut rows = Vec::new();

    if let Some(first) = lines.next() {
        let mut rest = lines.peekable();
        let followed_by_separator = rest
            .peek()
            .is_some_and(|next| is_separator(&split_cells(next)));
        if !followed_by_separator {
            rows.extend(parse_row(first));
        }
        rows.extend(rest.filter_map(parse_row));
    }
    rows
}

fn split_cells(line: &str) -> Vec<&str> {
    let line = line.trim();
    let line = line.strip_prefix('|').unwrap_or(line);
    let line = line.strip_suffix('|').unwrap_or(line);
    line.split('|').map(str::trim).collect()
}

fn is_separator(cells: &[&str]) -> bool {
    cells.iter().any(|c| c.contains('-'))
        && cells
            .iter()
            .all(|c| c.chars().all(|ch| matches!(ch, '-' | ':' | ' ')))
}

fn is_header(cells: &[&str]) -> bool {
    cells
        .first()
        .is_some_and(|c| c.trim_matches('*').trim().eq_ignore_ascii_case("meal"))
}

fn parse_row(line: &str) -> Option<MealRow> {
    let cells = split_cells(line);
    if cells.iter().all(|c| c.is_empty()) || is_separator(&cells) || is_header(&cells) {
        return None;
    }

    let owned = |i: usize| cells[i].to_string();
    match cells.len() {
        n if n >= 9 => Some(MealRow {
            meal: owned(0),
            option: owned(1),
            timing: owned(2),
            ingredients: owned(3),
            calories: owned(4),
            protein: owned(5),
            carbs: owned(6),
            fat: owned(7),
            preparation: owned(8),
        }),
        // Older prompt without the Option column.
        8 => Some(MealRow {
            meal: owned(0),
            option: String::new(),
            timing: owned(1),
            ingredients: owned(2),
            calories: owned(3),
            protein: owned(4),
            carbs: owned(5),
            fat: owned(6),
            preparation: owned(7),
        }),
        _ => None,
    }
}

/// Strips emphasis markers, leading list bullets and the whitespace around
/// each line.
pub fn clean_text(text: &str) -> String {
    let unstarred = text.replace('*', "");
    LINE_BULLET
        .replace_all(&unstarred, "")
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Cleaned, non-blank lines of a section, one per list item.
pub fn bullet_lines(text: &str) -> Vec<String> {
    clean_text(text)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FULL_RESPONSE: &str = "Here is your personalized plan.

**1. DAILY TARGETS**:
- Calories: 1,650 kcal
- Protein: 110 g
- Carbohydrates: 170 g
- Fat: 55 g

**2. DIET PLAN TABLE**:

| Meal | Option | Timing | Ingredients & Portions | Calories | Protein | Carbs | Fat | Preparation |
| :--- | :--- | :--- | :--- | :--- | :--- | :--- | :--- | :--- |
| Breakfast | Option 1 | 8:00 AM | Rolled oats 50g, whey 30g | 350 | 30g | 40g | 8g | Cook oats in water |
| Breakfast | Option 2 | 8:00 AM | Overnight oatmeal 60g, chia 10g | 360 | 18g | 45g | 10g | Soak overnight |
| Lunch | Option 1 | 1:00 PM | Paneer 100g, brown rice 80g | 520 | 32g | 55g | 18g | Grill paneer |

**3. MICRONUTRIENT & SUPPLEMENT RECOMMENDATIONS**:
- Vitamin B12 may be low; supplement 500 mcg daily.
- **Iron** is covered by lentils and spinach.

**4. PRACTICAL ADVICE**:
- Drink 3 liters of water daily.
- Sleep 7-8 hours.
";

    #[test]
    fn extracts_all_four_sections() {
        let plan = parse_plan(FULL_RESPONSE);

        assert_eq!(
            plan.daily_targets,
            "- Calories: 1,650 kcal\n- Protein: 110 g\n- Carbohydrates: 170 g\n- Fat: 55 g"
        );
        assert_eq!(plan.meal_plan.len(), 3);
        assert_eq!(
            plan.micronutrients,
            "- Vitamin B12 may be low; supplement 500 mcg daily.\n- **Iron** is covered by lentils and spinach."
        );
        assert_eq!(
            plan.practical_advice,
            "- Drink 3 liters of water daily.\n- Sleep 7-8 hours."
        );
        assert_eq!(plan.raw_markdown, FULL_RESPONSE);
        assert!(plan.is_structured());
    }

    #[test]
    fn maps_table_cells_to_columns() {
        let plan = parse_plan(FULL_RESPONSE);
        assert_eq!(
            plan.meal_plan[2],
            MealRow {
                meal: "Lunch".to_string(),
                option: "Option 1".to_string(),
                timing: "1:00 PM".to_string(),
                ingredients: "Paneer 100g, brown rice 80g".to_string(),
                calories: "520".to_string(),
                protein: "32g".to_string(),
                carbs: "55g".to_string(),
                fat: "18g".to_string(),
                preparation: "Grill paneer".to_string(),
            }
        );
    }

    #[test]
    fn keeps_rows_that_mention_meal_in_their_content() {
        let plan = parse_plan(FULL_RESPONSE);
        assert_eq!(
            plan.meal_plan[1].ingredients,
            "Overnight oatmeal 60g, chia 10g"
        );
    }

    #[test]
    fn groups_options_by_meal_slot() {
        let plan = parse_plan(FULL_RESPONSE);
        let meals = plan.meals();
        assert_eq!(meals.len(), 2);
        assert_eq!(meals[0].0, "Breakfast");
        assert_eq!(meals[0].1.len(), 2);
        assert_eq!(meals[1].0, "Lunch");
    }

    #[test]
    fn accepts_markdown_headings_and_lowercase_titles() {
        let response = "## 1. Daily Targets\nCalories: 2,400 kcal\n\n## 2. Diet Plan Table\n\n| meal | option | timing | ingredients | kcal | p | c | f | prep |\n|---|---|---|---|---|---|---|---|---|\n| Dinner | Option 3 | 7 PM | Tofu 150g | 400 | 25g | 30g | 15g | Stir fry |\n\n## 3. Micronutrient notes\nVitamin D\n\n## 4. practical advice\nWalk 8,000 steps.";
        let plan = parse_plan(response);

        assert_eq!(plan.daily_targets, "Calories: 2,400 kcal");
        assert_eq!(plan.meal_plan.len(), 1);
        assert_eq!(plan.meal_plan[0].meal, "Dinner");
        assert_eq!(plan.micronutrients, "Vitamin D");
        assert_eq!(plan.practical_advice, "Walk 8,000 steps.");
    }

    #[test]
    fn reads_legacy_rows_without_option_column() {
        let response = "| Meal | Timing | Ingredients | Calories | Protein | Carbs | Fat | Preparation |\n|---|---|---|---|---|---|---|---|\n| Breakfast | 8:00 AM | Eggs 2 | 150 | 12g | 1g | 10g | Boil |\n\n";
        let plan = parse_plan(response);

        assert_eq!(plan.meal_plan.len(), 1);
        let row = &plan.meal_plan[0];
        assert_eq!(row.option, "");
        assert_eq!(row.timing, "8:00 AM");
        assert_eq!(row.preparation, "Boil");
    }

    #[test]
    fn skips_rows_with_too_few_cells() {
        let response = "| Meal | Option | Timing |\n|---|---|---|\n| Lunch | Option 1 | Noon |\n\n";
        assert!(parse_plan(response).meal_plan.is_empty());
    }

    #[test]
    fn drops_header_row_whatever_its_first_cell() {
        let response = "| Meal Type | Option | Timing | Ingredients | Calories | Protein | Carbs | Fat | Preparation |\n|---|---|---|---|---|---|---|---|---|\n| Dinner | Option 1 | 8 PM | Dal 150g | 300 | 15g | 40g | 5g | Simmer |\n\n";
        let plan = parse_plan(response);

        assert_eq!(plan.meal_plan.len(), 1);
        assert_eq!(plan.meal_plan[0].meal, "Dinner");
        assert_eq!(plan.meals().len(), 1);
    }

    #[test]
    fn skips_rows_with_only_empty_cells() {
        let response = "| Meal | Option | Timing | Ingredients | Calories | Protein | Carbs | Fat | Preparation |\n|---|---|---|---|---|---|---|---|---|\n|  |  |  |  |  |  |  |  |  |\n| Lunch | Option 1 | 1 PM | Rice 80g | 400 | 20g | 60g | 8g | Boil |\n";
        let plan = parse_plan(response);

        assert_eq!(plan.meal_plan.len(), 1);
        assert_eq!(plan.meal_plan[0].meal, "Lunch");
    }

    #[test]
    fn keeps_empty_cells_in_position() {
        let response = "| Meal | Option | Timing | Ingredients | Calories | Protein | Carbs | Fat | Preparation |\n| Snack |  | 4 PM | Almonds 20g | 120 | 4g | 4g | 10g | None |\n";
        let plan = parse_plan(response);

        assert_eq!(plan.meal_plan.len(), 1);
        assert_eq!(plan.meal_plan[0].option, "");
        assert_eq!(plan.meal_plan[0].timing, "4 PM");
        assert_eq!(plan.meal_plan[0].preparation, "None");
    }

    #[test]
    fn table_at_end_of_input_is_still_read() {
        let response = "**2. DIET PLAN TABLE**\n| Meal | Option | Timing | Ingredients | Calories | Protein | Carbs | Fat | Preparation |\n| Dinner | Option 1 | 8 PM | Dal 150g | 300 | 15g | 40g | 5g | Simmer |";
        assert_eq!(parse_plan(response).meal_plan.len(), 1);
    }

    #[test]
    fn table_stops_at_micronutrient_heading_without_blank_line() {
        let response = "| Meal | Option | Timing | Ingredients | Calories | Protein | Carbs | Fat | Preparation |\n| Dinner | Option 1 | 8 PM | Dal 150g | 300 | 15g | 40g | 5g | Simmer |\n**3. MICRONUTRIENT**\n| Iron | a | b | c | d | e | f | g | h |\n**4. PRACTICAL ADVICE**\nRest.";
        let plan = parse_plan(response);
        assert_eq!(plan.meal_plan.len(), 1);
        assert_eq!(plan.practical_advice, "Rest.");
    }

    #[test]
    fn section_without_terminating_heading_is_empty() {
        let response = "1. DAILY TARGETS: 2000 kcal\n\nNo table today.";
        let plan = parse_plan(response);
        assert_eq!(plan.daily_targets, "");
        assert!(!plan.is_structured());
        assert_eq!(plan.raw_markdown, response);
    }

    #[test]
    fn handles_windows_line_endings() {
        let response = FULL_RESPONSE.replace('\n', "\r\n");
        let plan = parse_plan(&response);
        assert_eq!(plan.meal_plan.len(), 3);
        assert_eq!(plan.practical_advice, "- Drink 3 liters of water daily.\n- Sleep 7-8 hours.");
        assert_eq!(plan.raw_markdown, response);
    }

    #[test]
    fn unstructured_text_yields_empty_plan() {
        let plan = parse_plan("I'm sorry, I can't help with that.");
        assert_eq!(
            plan,
            DietPlan {
                raw_markdown: "I'm sorry, I can't help with that.".to_string(),
                ..DietPlan::default()
            }
        );
    }

    #[test]
    fn clean_text_removes_emphasis_and_bullets() {
        assert_eq!(
            clean_text("- **Protein**: 110 g\n  • *Fat*: 55 g\n– Fibre: 30 g"),
            "Protein: 110 g\nFat: 55 g\nFibre: 30 g"
        );
        assert_eq!(clean_text("Sleep 7-8 hours"), "Sleep 7-8 hours");
    }

    #[test]
    fn clean_text_trims_every_line() {
        assert_eq!(
            clean_text("  Vitamin D is low.  \n   Take it with food.\t"),
            "Vitamin D is low.\nTake it with food."
        );
    }

    #[test]
    fn bullet_lines_drops_blank_lines() {
        assert_eq!(
            bullet_lines("- Drink water\n\n- **Walk** daily\n   \n"),
            vec!["Drink water".to_string(), "Walk daily".to_string()]
        );
    }
}
