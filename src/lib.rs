pub mod config;
pub mod error;
pub mod llm;
pub mod parser;
pub mod planner;
pub mod profile;
pub mod prompt;
pub mod render;
pub mod server;


pub use config::Config;
pub use parser::{parse_plan, DietPlan, MealRow};
pub use planner::{GeneratedPlan, Planner};
pub use profile::{ProfileForm, UserProfile};
