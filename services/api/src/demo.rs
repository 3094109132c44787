use crate::infra::{
    parse_year, record_report, InMemoryAccountDirectory, InMemoryAppraisalRepository,
    RecordReport,
};
use clap::Args;
use faculty_appraisal::error::AppError;
use faculty_appraisal::workflows::appraisal::{
    catalog_view, is_well_formed_link, max_possible, AcademicYear, AdminSignup, AppraisalPolicy,
    AppraisalService, CompletionReport, FacultyId, FacultySignup, MemoryClaimStore,
    ReviewerId, Role, SectionCode, SessionContext, Submission, Surface,
};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Appraisal year to file the demo submission under (defaults to the current year)
    #[arg(long, value_parser = parse_year)]
    pub(crate) year: Option<AcademicYear>,
    /// Stop after the faculty submission, skipping reviewer scoring
    #[arg(long)]
    pub(crate) skip_scoring: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Path to a flat submission record (JSON object of l<section>_<n> fields)
    #[arg(long)]
    pub(crate) record: PathBuf,
    /// Faculty identifier, when the record does not carry one
    #[arg(long)]
    pub(crate) faculty_id: Option<String>,
    /// Appraisal year, when the record does not carry one
    #[arg(long, value_parser = parse_year)]
    pub(crate) year: Option<AcademicYear>,
    /// Emit the report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_catalog() {
    println!("Faculty appraisal catalog");
    for section in catalog_view() {
        println!(
            "\n{} {} ({} criteria, scored as {}_*)",
            section.code.code(),
            section.title,
            section.fields.len(),
            section.score_prefix
        );
        for field in &section.fields {
            println!("- {} {}", field.key, field.description);
        }
    }
    println!(
        "\nMaximum possible score: {}",
        max_possible(&SectionCode::ordered())
    );
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        record,
        faculty_id,
        year,
        json,
    } = args;

    let raw = std::fs::read_to_string(&record)?;
    let fields: Map<String, Value> = serde_json::from_str(&raw)?;
    let report = record_report(&fields, faculty_id.map(FacultyId), year);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render_record_report(&report);
    }
    Ok(())
}

fn render_record_report(report: &RecordReport) {
    println!(
        "Completion report for {} ({})",
        report.faculty_id, report.year
    );
    render_completion(&report.completion);
}

fn render_completion(report: &CompletionReport) {
    for entry in &report.sections {
        println!(
            "- {} {}: {}/{} ({}%)",
            entry.section.code(),
            entry.title,
            entry.stat.completed,
            entry.stat.total,
            entry.stat.rounded_percentage()
        );
    }
    println!(
        "Overall: {}/{} ({}%), {} of {} sections complete",
        report.overall.completed,
        report.overall.total,
        report.overall.rounded_percentage(),
        report.sections_completed,
        report.sections.len()
    );
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { year, skip_scoring } = args;
    let year = year.unwrap_or_else(AcademicYear::current);

    println!("Faculty appraisal demo ({year})");
    let service = Arc::new(AppraisalService::new(
        Arc::new(InMemoryAppraisalRepository::default()),
        Arc::new(InMemoryAccountDirectory::default()),
        AppraisalPolicy::default(),
    ));

    service.register_faculty(demo_faculty_signup())?;
    service.register_admin(demo_admin_signup())?;
    println!("- Registered faculty FAC-101 and reviewer ADM-7");

    let mut session = SessionContext::new(MemoryClaimStore::default());
    println!(
        "- Anonymous request for the admin dashboard -> {}",
        session.resolve(Surface::Admin).path()
    );

    let claim = service.login(Role::Faculty, "FAC-101", "portfolio1")?;
    session.init(&claim);
    println!(
        "- Faculty login -> {} (admin dashboard -> {})",
        session.resolve(Surface::Login).path(),
        session.resolve(Surface::Admin).path()
    );

    let faculty_id = FacultyId::from(claim.id());
    let draft = Submission::hydrate(faculty_id.clone(), year, &demo_proofs(), false);

    println!("\nDraft progress");
    render_completion(&CompletionReport::build(&draft));
    for (key, value) in draft.values() {
        let marker = if is_well_formed_link(value) { "link" } else { "text" };
        println!("  {} [{}] {}", key.label(), marker, value);
    }

    let record = service.submit(faculty_id.clone(), year, &draft.to_record())?;
    println!(
        "\nSubmitted {} fields at {}",
        record.fields.len(),
        record.submitted_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    let mut locked = record.to_submission();
    if let Some(key) = locked.values().keys().next().copied() {
        if let Err(err) = locked.set(key, "https://drive.example/late-edit") {
            println!("  Edit after submission rejected: {err}");
        }
    }

    match service.submit(faculty_id.clone(), year, &draft.to_record()) {
        Ok(_) => println!("  Resubmission unexpectedly accepted"),
        Err(err) => println!("  Resubmission rejected: {err}"),
    }

    session.teardown();
    if skip_scoring {
        return Ok(());
    }

    let claim = service.login(Role::Admin, "ADM-7", "reviewer7")?;
    session.init(&claim);
    println!(
        "\nReviewer login -> {}",
        session.resolve(Surface::Login).path()
    );

    for overview in service.list_submissions(Some(year))? {
        println!(
            "- {} submitted {}/{} fields",
            overview.faculty_id, overview.completion.completed, overview.completion.total
        );
    }

    let reviewer = ReviewerId::from(claim.id());
    let mistyped = json!({ "a1_1": "eighty" });
    if let Some(scores) = mistyped.as_object() {
        if let Err(err) = service.submit_scores(faculty_id.clone(), year, reviewer.clone(), scores)
        {
            println!("  Score sheet rejected: {err}");
        }
    }

    let scores = json!({
        "a1_1": 80,
        "a1_2": 72,
        "a2_1": 65,
        "a3_7": 90,
        "a5_2": 55,
    });
    if let Some(scores) = scores.as_object() {
        let stored = service.submit_scores(faculty_id.clone(), year, reviewer, scores)?;
        let view = stored.view();
        println!(
            "  Score sheet recorded: {} / {}",
            view.total_score, view.max_possible
        );
    }

    println!("\nScore export");
    let mut buffer = Vec::new();
    service.export_scores_csv(year, &mut buffer)?;
    print!("{}", String::from_utf8_lossy(&buffer));

    session.teardown();
    Ok(())
}

fn demo_proofs() -> Map<String, Value> {
    let proofs = json!({
        "l1_1": "https://drive.example/fac-101/teaching-methods.pdf",
        "l1_2": "https://drive.example/fac-101/syllabus-coverage.pdf",
        "l2_1": "https://scholar.example/fac-101",
        "l3_7": "https://drive.example/fac-101/fdp-certificates",
        "l4_1": "Exam cell coordinator, odd semester",
        "l5_2": "https://drive.example/fac-101/placement-drive",
    });
    proofs.as_object().cloned().unwrap_or_default()
}

fn demo_faculty_signup() -> FacultySignup {
    FacultySignup {
        faculty_id: "FAC-101".to_string(),
        email: "m.rao@college.edu".to_string(),
        password: "portfolio1".to_string(),
        confirm_password: "portfolio1".to_string(),
        security_code: "4321".to_string(),
        department: "Information Technology".to_string(),
        designation: "Assistant Professor".to_string(),
        joining_date: "2021-06-01".to_string(),
    }
}

fn demo_admin_signup() -> AdminSignup {
    AdminSignup {
        admin_id: "ADM-7".to_string(),
        email: "hod.it@college.edu".to_string(),
        password: "reviewer7".to_string(),
        confirm_password: "reviewer7".to_string(),
        security_code: "7777".to_string(),
        role: "Department Head".to_string(),
        department: "Information Technology".to_string(),
    }
}
