use crate::parser::{bullet_lines, clean_text, DietPlan, MealRow};
use console::style;
use textwrap::Options;

pub const DISCLAIMER: &str = "Disclaimer: This diet plan is AI-generated and for informational purposes only. Always consult a healthcare professional before making significant dietary changes.";

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: usize,
    pub color: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 100,
            color: false,
        }
    }
}

struct Writer<'a> {
    out: String,
    opts: &'a RenderOptions,
}

impl<'a> Writer<'a> {
    fn heading(&mut self, title: &str) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        let line = "=".repeat(title.chars().count());
        if self.opts.color {
            self.push_line(&style(title).bold().cyan().force_styling(true).to_string());
        } else {
            self.push_line(title);
        }
        self.push_line(&line);
    }

    fn push_line(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn wrapped(&mut self, text: &str, first: &str, rest: &str) {
        let options = Options::new(self.opts.width.max(20))
            .initial_indent(first)
            .subsequent_indent(rest);
        let filled = textwrap::fill(text, options);
        self.push_line(&filled);
    }

    fn paragraph(&mut self, text: &str) {
        for line in clean_text(text).lines() {
            if line.trim().is_empty() {
                self.out.push('\n');
            } else {
                self.wrapped(line.trim(), "", "");
            }
        }
    }

    fn bullets(&mut self, text: &str) {
        for line in bullet_lines(text) {
            self.wrapped(&line, "  • ", "    ");
        }
    }

    fn meal_option(&mut self, row: &MealRow) {
        let label = [clean_text(&row.option), clean_text(&row.timing)]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" · ");
        let label = if label.is_empty() { "-".to_string() } else { label };
        if self.opts.color {
            self.push_line(&format!("  {}", style(label).bold().force_styling(true)));
        } else {
            self.push_line(&format!("  {}", label));
        }

        let macros = format!(
            "Calories: {} | Protein: {} | Carbs: {} | Fat: {}",
            clean_text(&row.calories),
            clean_text(&row.protein),
            clean_text(&row.carbs),
            clean_text(&row.fat)
        );
        self.wrapped(&macros, "    ", "    ");
        self.wrapped(
            &format!("Ingredients: {}", clean_text(&row.ingredients)),
            "    ",
            "      ",
        );
        let preparation = clean_text(&row.preparation);
        if !preparation.is_empty() {
            self.wrapped(&format!("Preparation: {}", preparation), "    ", "      ");
        }
    }
}

/// Renders a parsed plan for a terminal. Plans without a meal table are shown
/// as cleaned raw text after whatever sections were found.
pub fn render_plan(plan: &DietPlan, opts: &RenderOptions) -> String {
    let mut w = Writer {
        out: String::new(),
        opts,
    };

    if !plan.daily_targets.is_empty() {
        w.heading("Daily Targets");
        w.paragraph(&plan.daily_targets);
    }

    if plan.is_structured() {
        w.heading("Your Personalized Meal Plan");
        for (i, (meal, rows)) in plan.meals().into_iter().enumerate() {
            if i > 0 {
                w.out.push('\n');
            }
            let meal = clean_text(meal);
            if opts.color {
                w.push_line(&style(meal).green().bold().force_styling(true).to_string());
            } else {
                w.push_line(&meal);
            }
            for row in rows {
                w.meal_option(row);
            }
        }
    }

    if !plan.micronutrients.is_empty() {
        w.heading("Micronutrient & Supplement Recommendations");
        w.bullets(&plan.micronutrients);
    }

    if !plan.practical_advice.is_empty() {
        w.heading("Practical Advice");
        w.bullets(&plan.practical_advice);
    }

    if !plan.is_structured() {
        w.heading("Your Diet Plan");
        w.paragraph(&plan.raw_markdown);
    }

    w.out.push('\n');
    w.wrapped(DISCLAIMER, "", "");
    w.out
}
