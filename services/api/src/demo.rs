use chrono::{Local, NaiveDate};
use clap::Args;
use std::fs::File;
use std::path::PathBuf;
use warden::admission::{
    AdmissionEngine, AttributeReport, FacilityDraft, Origin, SubjectDraft, SubjectId,
};
use warden::config::EngineConfig;
use warden::error::AppError;
use warden::history;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation date for age brackets (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Static admission threshold used while capacity remains.
    #[arg(long, default_value_t = 500.0)]
    pub(crate) threshold: f64,
    /// Write the assignment history as CSV to this path.
    #[arg(long)]
    pub(crate) history_out: Option<PathBuf>,
}

fn subject(
    id: &str,
    name: &str,
    support_level: i8,
    impact_score: u8,
    economic_percentile: u8,
    birth_year: i32,
    origin: Origin,
    elevated: bool,
) -> SubjectDraft {
    SubjectDraft {
        id: id.to_string(),
        name: name.to_string(),
        support_level,
        impact_score,
        economic_percentile,
        birth_date: NaiveDate::from_ymd_opt(birth_year, 3, 15)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(1980, 1, 1).expect("valid fallback date")),
        origin,
        elevated,
    }
}

fn print_rankings(engine: &AdmissionEngine) {
    println!("Ranked subjects:");
    for view in engine.ranked_subjects() {
        println!(
            "  - #{} {:<18} score {:>7.2} | {}{}",
            view.id,
            view.name,
            view.score,
            if view.held { "held" } else { "waiting" },
            if view.overridden { " (override)" } else { "" }
        );
    }
}

fn print_facilities(engine: &AdmissionEngine) {
    println!("Facilities:");
    for view in engine.facilities() {
        let occupants: Vec<&str> = view
            .occupants
            .iter()
            .map(|occupant| occupant.0.as_str())
            .collect();
        println!(
            "  - {:<10} {}/{} occupied [{}]",
            view.id.0,
            view.occupancy,
            view.capacity,
            occupants.join(", ")
        );
    }
}

fn print_threshold(engine: &AdmissionEngine) {
    let snapshot = engine.threshold();
    println!(
        "Effective threshold: {:.2} ({:?})",
        snapshot.value, snapshot.mode
    );
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        threshold,
        history_out,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let config = EngineConfig {
        static_threshold: threshold,
    };
    let mut engine = AdmissionEngine::with_today(config, today);

    println!("Warden admission demo (evaluation date {today})\n");

    engine.add_facility(FacilityDraft {
        id: "north".to_string(),
        name: "North Wing".to_string(),
        capacity: 2,
    })?;
    engine.add_facility(FacilityDraft {
        id: "south".to_string(),
        name: "South Wing".to_string(),
        capacity: 1,
    })?;
    println!("Registered facilities north (2 slots) and south (1 slot).");

    engine.register_subject(subject("2001", "first candidate", 0, 5, 5, 1995, Origin::A, false))?;
    engine.register_subject(subject("2002", "second candidate", 4, 3, 2, 1988, Origin::B, false))?;
    engine.register_subject(subject("2003", "third candidate", -1, 8, 6, 1992, Origin::C, true))?;
    engine.register_subject(subject("2004", "fourth candidate", 7, 2, 1, 1960, Origin::A, false))?;

    println!();
    print_rankings(&engine);
    print_facilities(&engine);
    print_threshold(&engine);

    println!("\nAn impact report arrives for the weakest candidate...");
    engine.report(&SubjectId("2004".to_string()), AttributeReport::ImpactScore(9))?;
    print_rankings(&engine);
    print_threshold(&engine);

    println!("\nA director imposes an urgent hold on the waiting candidate...");
    let held = engine.impose_urgent_hold(&SubjectId("2002".to_string()))?;
    println!(
        "Urgent hold on #2002 {}.",
        if held { "secured a slot" } else { "could not place the subject" }
    );
    print_facilities(&engine);

    println!("\nThe director then grants #2003 a release...");
    let released = engine.grant_release(&SubjectId("2003".to_string()))?;
    println!(
        "Release for #2003 {}.",
        if released { "freed a slot" } else { "was a no-op (not held)" }
    );
    print_rankings(&engine);
    print_facilities(&engine);
    print_threshold(&engine);

    let csv = history::history_csv(engine.history())
        .map_err(|err| AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string())))?;
    println!("\nAssignment history:\n{csv}");

    if let Some(path) = history_out {
        let file = File::create(&path)?;
        history::write_history_csv(engine.history(), file)
            .map_err(|err| AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string())))?;
        println!("History written to {}", path.display());
    }

    Ok(())
}
