mod cli;
mod config;

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use lesson_core::model::{
    ChallengeCode, CompletionOutcome, ExerciseIndex, RequirementReport, SectionIndex,
    SectionVisibility, UnitId, lesson_from_page,
};
use services::{AppServices, ChallengeKind, Clock, Confirmation, SubmitOutcome};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::{ChallengeArgs, Cli, Command};
use crate::config::{normalize_sqlite_url, prepare_sqlite_file};

fn read_editor(path: Option<&Path>) -> Result<String, std::io::Error> {
    path.map_or_else(|| Ok(String::new()), std::fs::read_to_string)
}

/// Editor contents for `check`/`submit`: files, the starter, the saved draft,
/// or the skeleton, in that order.
async fn gather_code(
    services: &AppServices,
    args: &ChallengeArgs,
) -> Result<ChallengeCode, Box<dyn std::error::Error>> {
    let kind = args.challenge;
    if args.starter {
        return Ok(kind.starter());
    }
    if args.html.is_some() || args.css.is_some() || args.js.is_some() {
        return Ok(ChallengeCode::new(
            read_editor(args.html.as_deref())?,
            read_editor(args.css.as_deref())?,
            read_editor(args.js.as_deref())?,
        ));
    }
    let workflow = services.challenge(kind)?;
    Ok(match workflow.restore_draft().await {
        Some(draft) => draft.code,
        None => kind.skeleton(),
    })
}

fn print_report(kind: ChallengeKind, report: &RequirementReport) {
    let labels = kind.requirements();
    for (requirement, outcome) in labels.iter().zip(report.outcomes()) {
        let mark = if outcome.passed { "x" } else { " " };
        println!("[{mark}] {}", requirement.label());
        if let Some(feedback) = &outcome.feedback {
            println!("    {feedback}");
        }
    }
    println!(
        "{}/{} requirements met ({}%)",
        report.met_count(),
        report.total(),
        report.percent()
    );
}

fn describe(outcome: CompletionOutcome) -> String {
    match outcome {
        CompletionOutcome::Completed { current_step } => {
            format!("completed; current step is {current_step}")
        }
        CompletionOutcome::AlreadyComplete => "already complete".to_owned(),
        CompletionOutcome::Locked => "locked; finish the previous unit first".to_owned(),
        CompletionOutcome::OutOfRange => "not part of this path".to_owned(),
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let db_url = normalize_sqlite_url(&cli.db_url)?;
    prepare_sqlite_file(&db_url)?;
    debug!(db = %db_url, site = %cli.site, "opening progress store");

    let services = AppServices::new_sqlite(
        &db_url,
        cli.site,
        Clock::system(),
        Duration::from_millis(cli.save_delay_ms),
    )
    .await?;
    let path = services.path();
    let catalog = services.catalog();

    match cli.command {
        Command::Status => {
            let record = path.snapshot();
            for (unit, state) in path.unit_states() {
                println!("unit {unit}: {state}");
            }
            println!("{:.0}% complete", path.percent());
            if catalog.exercise_total > 0 {
                println!(
                    "exercises: {}/{}",
                    record.counter(lesson_core::catalog::EXERCISES_COUNTER),
                    catalog.exercise_total
                );
            }
            if let Some(saved_at) = record.saved_at() {
                println!("last saved: {saved_at}");
            }
            println!("storage: {:?}", services.persistence());
        }
        Command::Complete { unit } => {
            let outcome = path.mark_unit_complete(unit);
            println!("unit {unit}: {}", describe(outcome));
        }
        Command::Reset { yes } => {
            let confirmation = if yes {
                Confirmation::Confirmed
            } else {
                Confirmation::Declined
            };
            if path.reset(confirmation).await {
                println!("progress reset");
            } else {
                println!("nothing reset; pass --yes to confirm");
            }
        }
        Command::Check(args) => {
            let code = gather_code(&services, &args).await?;
            let workflow = services.challenge(args.challenge)?;
            let report = workflow.check(&code);
            workflow.save_draft(&code).await;
            print_report(args.challenge, &report);
        }
        Command::Submit(args) => {
            let code = gather_code(&services, &args).await?;
            let workflow = services.challenge(args.challenge)?;
            let outcome = workflow.submit(&code).await;
            print_report(args.challenge, outcome.report());
            match outcome {
                SubmitOutcome::Accepted { completion, .. } => {
                    println!("solution accepted");
                    if let Some(completion) = completion {
                        println!("path: {}", describe(completion));
                    }
                }
                SubmitOutcome::Incomplete { report } => {
                    println!(
                        "not accepted: {} of {} requirements met",
                        report.met_count(),
                        report.total()
                    );
                }
            }
        }
        Command::Lesson {
            lesson,
            page,
            sections,
            views,
            reveals,
            seconds,
            finish,
        } => {
            let lesson = match (lesson, page.as_deref()) {
                (Some(lesson), _) => lesson,
                (None, Some(page)) => lesson_from_page(page),
                (None, None) => UnitId::FIRST,
            };
            let tracker = services.lesson(lesson, sections).await?;
            for index in views {
                tracker.observe(SectionVisibility::seen(SectionIndex::new(index)));
            }
            for index in reveals {
                tracker.reveal_solution(ExerciseIndex::new(index)).await;
            }
            if seconds > 0 {
                tracker.tick(seconds).await;
            }
            let progress = tracker.snapshot();
            println!(
                "lesson {lesson}: {:.0}% read, {} exercises revealed, {} min",
                tracker.percent(),
                progress.exercises_viewed_count(),
                progress.time_spent_mins()
            );
            if finish {
                println!("unit {lesson}: {}", describe(tracker.complete_lesson().await));
            } else {
                tracker.save().await;
            }
        }
    }

    path.flush().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_read_as_sentences() {
        assert_eq!(
            describe(CompletionOutcome::Completed {
                current_step: UnitId::new(3)
            }),
            "completed; current step is 3"
        );
        assert!(describe(CompletionOutcome::Locked).starts_with("locked"));
    }

    #[test]
    fn missing_editor_file_reads_empty() {
        assert_eq!(read_editor(None).unwrap(), "");
    }
}
