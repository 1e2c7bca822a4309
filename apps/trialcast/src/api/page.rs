//! The HTML form page.
//!
//! One page: a sidebar with the seven inputs and a main area that shows at
//! most one block, either a verdict, a prediction error, or a validation
//! notice. Submitted values stay selected after a post.

use std::fmt::Display;
use trialcast_core::primitives::{MIN_DURATION, MIN_ENROLLMENT};
use trialcast_core::record::{
    CONDITION, DURATION, ENROLLMENT, GENDER, LOCATION, PHASE, SPONSOR_TYPE,
};
use trialcast_core::render::escape_html;
use trialcast_core::{
    Condition, Gender, InputError, Location, Phase, SponsorType, StyledMessage, TrialForm,
};

pub const PAGE_TITLE: &str = "Clinical Trial Outcome Predictor";
pub const HEADING: &str = "🔬 Clinical Trial Outcome Prediction";
pub const INTRO: &str =
    "Use this app to predict the success of a clinical trial based on study parameters.";

const STYLE: &str = r"
    body { background-color: #f7f9fb; font-family: sans-serif; margin: 0; }
    .stApp { display: flex; min-height: 100vh; }
    .sidebar { width: 300px; padding: 24px; background-color: #eef1f5; }
    .sidebar label { display: block; margin-top: 12px; font-size: 0.9em; }
    .sidebar select, .sidebar input { width: 100%; margin-top: 4px; padding: 6px; }
    .main { flex: 1; padding: 24px 48px; }
    .stButton > button {
        margin-top: 20px;
        background-color: #0072C6;
        color: white;
        font-weight: bold;
        border: none;
        border-radius: 6px;
        padding: 8px 16px;
        cursor: pointer;
    }
    .notice { color: #8a6d3b; background-color: #fcf8e3; padding: 15px; border-radius: 10px; }
";

/// What the main area shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A verdict or prediction error block.
    Message(StyledMessage),
    /// The submission never reached the model.
    Invalid(InputError),
}

/// Form values on first load: the first choice of each select and 1 for the counts.
pub fn initial_form() -> TrialForm {
    TrialForm {
        phase: first(Phase::ALL),
        sponsor_type: first(SponsorType::ALL),
        gender: first(Gender::ALL),
        condition: first(Condition::ALL),
        location: first(Location::ALL),
        enrollment: MIN_ENROLLMENT.to_string(),
        duration: MIN_DURATION.to_string(),
    }
}

fn first<T: Display>(all: &[T]) -> String {
    all.first().map(ToString::to_string).unwrap_or_default()
}

/// Render the full page.
pub fn render_page(form: &TrialForm, notice: Option<&Notice>) -> String {
    let mut html = String::with_capacity(8 * 1024);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{PAGE_TITLE}</title>\n"));
    html.push_str(&format!("<style>{STYLE}</style>\n"));
    html.push_str("</head>\n<body>\n<div class=\"stApp\">\n");

    html.push_str("<form class=\"sidebar\" method=\"post\" action=\"/\">\n");
    html.push_str("<h2>Enter Trial Information</h2>\n");
    html.push_str(&select(PHASE, "Trial Phase", Phase::ALL, &form.phase));
    html.push_str(&select(SPONSOR_TYPE, "Sponsor Type", SponsorType::ALL, &form.sponsor_type));
    html.push_str(&select(GENDER, "Gender", Gender::ALL, &form.gender));
    html.push_str(&select(CONDITION, "Condition", Condition::ALL, &form.condition));
    html.push_str(&select(LOCATION, "Trial Location", Location::ALL, &form.location));
    html.push_str(&number(
        ENROLLMENT,
        "Enrollment (Number of Participants)",
        MIN_ENROLLMENT,
        &form.enrollment,
    ));
    html.push_str(&number(
        DURATION,
        "Trial Duration (in days)",
        MIN_DURATION,
        &form.duration,
    ));
    html.push_str("<div class=\"stButton\"><button type=\"submit\">Predict Outcome</button></div>\n");
    html.push_str("</form>\n");

    html.push_str("<main class=\"main\">\n");
    html.push_str(&format!("<h1>{HEADING}</h1>\n<p>{INTRO}</p>\n"));
    match notice {
        Some(Notice::Message(message)) => {
            html.push_str(&message.to_html());
            html.push('\n');
        }
        Some(Notice::Invalid(err)) => {
            html.push_str(&format!(
                "<div class=\"notice\">⚠️ {}</div>\n",
                escape_html(&err.to_string())
            ));
        }
        None => {}
    }
    html.push_str("</main>\n</div>\n</body>\n</html>\n");
    html
}

fn select<T: Display>(name: &str, label: &str, choices: &[T], current: &str) -> String {
    let mut out = format!("<label for=\"{name}\">{label}</label>\n<select id=\"{name}\" name=\"{name}\">\n");
    for choice in choices {
        let value = escape_html(&choice.to_string());
        let selected = if choice.to_string() == current.trim() {
            " selected"
        } else {
            ""
        };
        out.push_str(&format!("<option value=\"{value}\"{selected}>{value}</option>\n"));
    }
    out.push_str("</select>\n");
    out
}

fn number(name: &str, label: &str, min: u32, current: &str) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\n<input id=\"{name}\" name=\"{name}\" type=\"number\" min=\"{min}\" step=\"1\" value=\"{}\">\n",
        escape_html(current)
    )
}

// =============================================================================
// TESTS
// =============================================================================
