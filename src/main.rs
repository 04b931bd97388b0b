use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use invigilation::config::AppConfig;
use invigilation::directory::DirectorySnapshot;
use invigilation::error::AppError;
use invigilation::telemetry;
use invigilation::workflows::supervision::{
    DegradedCheck, Ledger, SessionId, SessionStatusView, SessionView, TeacherId, TeacherView,
    Verdict,
};
use serde::Serialize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "invigilation",
    about = "Inspect invigilator eligibility and session capacity from a directory snapshot",
    version
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Directory snapshot to load (overrides INVIGILATION_DIRECTORY)
    #[arg(long, global = true)]
    directory: Option<PathBuf>,
    /// Emit JSON instead of plain text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Explain whether a teacher can supervise a session
    Evaluate {
        #[arg(long)]
        teacher: u64,
        #[arg(long)]
        session: u64,
    },
    /// List teachers eligible to supervise a session
    Eligible {
        #[arg(long)]
        session: u64,
    },
    /// Show every session with its verdict for one teacher
    Status {
        #[arg(long)]
        teacher: u64,
    },
    /// Show registered/required counts and over-capacity sessions
    Capacity,
}

#[derive(Debug, Serialize)]
struct EvaluationReport {
    teacher: TeacherView,
    session: SessionView,
    verdict: Verdict,
    reason: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    degraded_checks: Vec<DegradedCheck>,
}

#[derive(Debug, Serialize)]
struct EligibleReport {
    session: SessionView,
    teachers: Vec<TeacherView>,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    teacher: TeacherView,
    sessions: Vec<SessionStatusView>,
}

#[derive(Debug, Serialize)]
struct CapacityReport {
    sessions: Vec<SessionView>,
    over_capacity: Vec<SessionId>,
}

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<(), AppError> {
    let Cli { global, command } = Cli::parse();

    let mut config = AppConfig::load()?;
    if let Some(path) = global.directory {
        config.directory.path = path;
    }

    telemetry::init(&config.telemetry)?;
    info!(
        environment = ?config.environment,
        directory = %config.directory.path.display(),
        "loading directory snapshot"
    );

    let ledger = DirectorySnapshot::from_path(&config.directory.path)?
        .into_ledger(config.directory.default_quota)?;

    match command {
        Command::Evaluate { teacher, session } => {
            run_evaluate(&ledger, TeacherId(teacher), SessionId(session), global.json)
        }
        Command::Eligible { session } => run_eligible(&ledger, SessionId(session), global.json),
        Command::Status { teacher } => run_status(&ledger, TeacherId(teacher), global.json),
        Command::Capacity => run_capacity(&ledger, global.json),
    }
}

fn run_evaluate(
    ledger: &Ledger,
    teacher_id: TeacherId,
    session_id: SessionId,
    json: bool,
) -> Result<(), AppError> {
    let assessment = ledger.assess(teacher_id, session_id)?;
    let report = EvaluationReport {
        teacher: ledger.teacher_view(teacher_id)?,
        session: ledger.session_view(session_id)?,
        verdict: assessment.verdict,
        reason: assessment.verdict.summary(),
        degraded_checks: assessment.degraded_checks.clone(),
    };

    if json {
        return print_json(&report);
    }

    println!(
        "{} ({}) -> {} on {} {}",
        report.teacher.name,
        report.teacher.id,
        report.session.id,
        report.session.date,
        report.session.start.format("%H:%M")
    );
    println!("Verdict: {} ({})", report.verdict.label(), report.reason);
    if let Some(evidence) = &assessment.evidence {
        let note = if evidence.is_degraded() {
            " [degraded match]"
        } else {
            ""
        };
        println!("Evidence: {evidence:?}{note}");
    }
    for check in &report.degraded_checks {
        println!("Start-time-only comparison: {check:?}");
    }
    Ok(())
}

fn run_eligible(ledger: &Ledger, session_id: SessionId, json: bool) -> Result<(), AppError> {
    let session = ledger.session_view(session_id)?;
    let teachers = ledger
        .eligible_teachers(session_id)?
        .into_iter()
        .map(|teacher_id| ledger.teacher_view(teacher_id))
        .collect::<Result<Vec<_>, _>>()?;
    let report = EligibleReport { session, teachers };

    if json {
        return print_json(&report);
    }

    println!(
        "Eligible teachers for {} ({}/{} registered)",
        report.session.id, report.session.registered, report.session.required
    );
    if report.teachers.is_empty() {
        println!("- none");
    }
    for teacher in &report.teachers {
        let quota = match teacher.quota {
            Some(quota) => format!("{}/{}", teacher.load, quota),
            None => format!("{}/-", teacher.load),
        };
        println!("- {} ({}), load {}", teacher.name, teacher.id, quota);
    }
    Ok(())
}

fn run_status(ledger: &Ledger, teacher_id: TeacherId, json: bool) -> Result<(), AppError> {
    let report = StatusReport {
        teacher: ledger.teacher_view(teacher_id)?,
        sessions: ledger.session_statuses(teacher_id)?,
    };

    if json {
        return print_json(&report);
    }

    println!("Session board for {} ({})", report.teacher.name, report.teacher.id);
    for status in &report.sessions {
        println!(
            "- {}: {} ({})",
            status.session_id,
            status.verdict.label(),
            status.reason
        );
    }
    Ok(())
}

fn run_capacity(ledger: &Ledger, json: bool) -> Result<(), AppError> {
    let sessions = ledger.session_views()?;
    let over_capacity = sessions
        .iter()
        .filter(|view| view.over_capacity)
        .map(|view| view.id)
        .collect();
    let report = CapacityReport {
        sessions,
        over_capacity,
    };

    if json {
        return print_json(&report);
    }

    println!("Session capacity");
    for session in &report.sessions {
        let flag = if session.over_capacity {
            " OVER CAPACITY"
        } else if session.saturated {
            " full"
        } else {
            ""
        };
        println!(
            "- {} {} {}: {}/{}{}",
            session.id,
            session.date,
            session.start.format("%H:%M"),
            session.registered,
            session.required,
            flag
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
