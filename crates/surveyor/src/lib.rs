pub mod service;

pub use service::{
    SurveyOutcome, Surveyor, ALL_REPOS_FILE, INTERESTING_REPOS_FILE, REPORT_CSV_FILE,
    REPORT_JSON_FILE,
};
