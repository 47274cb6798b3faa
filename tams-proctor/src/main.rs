//! tams-proctor - command-line proctor assignment
//!
//! Lists exams, shows eligible candidates, and drives the assignment
//! workflow (suggestion, manual selection, insufficient-candidates fallback)
//! against the TAMS backend.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Select};
use tracing::{debug, info};

use tams_common::api::SessionContext;
use tams_common::config::{
    load_toml_config, write_toml_config, ConfigOverrides, ConfigResolver, ResolvedConfig,
};
use tams_common::logging::init_tracing;
use tams_proctor::models::proctor::busiest_workload;
use tams_proctor::models::{ExamId, OverrideFlags, OverrideRule, TaId};
use tams_proctor::services::{rank, CandidateFetcher, ProctorBackend, RestBackend};
use tams_proctor::workflow::{DialogView, InsufficientState, RequestOutcome, SuggestionOutcome};
use tams_proctor::{
    AssignmentWorkflow, ExamListRefresher, ExamTab, PreconditionError, SharedExamList,
    WorkflowError,
};

/// Command-line arguments for tams-proctor
#[derive(Parser, Debug)]
#[command(name = "tams-proctor")]
#[command(about = "Assign teaching assistants to proctor exams")]
#[command(version)]
struct Args {
    /// Path to config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend API base URL (e.g. https://tams.example.edu/api)
    #[arg(long)]
    backend_url: Option<String>,

    /// Bearer access token
    #[arg(long)]
    access_token: Option<String>,

    /// Refresh token used when the access token expires
    #[arg(long)]
    refresh_token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List exams, filtered by status tab
    Exams {
        #[arg(long, value_enum, default_value_t = ExamTab::All)]
        tab: ExamTab,
    },

    /// Show eligible candidates for an exam in suggestion order
    Candidates {
        exam: ExamId,

        /// Relax the academic-level rule
        #[arg(long)]
        override_academic_level: bool,

        /// Relax the consecutive-proctoring rule
        #[arg(long)]
        override_consecutive_proctoring: bool,
    },

    /// Suggest proctors and review them interactively
    Suggest { exam: ExamId },

    /// Assign proctors to an exam
    Assign {
        exam: ExamId,

        /// TA to assign (repeatable); the final selection is exactly this set
        #[arg(long = "ta", required_unless_present = "auto")]
        tas: Vec<TaId>,

        /// Paid proctoring assignment
        #[arg(long)]
        paid: bool,

        /// Replace proctors already assigned to the exam
        #[arg(long)]
        replace: bool,

        /// Use the ranked suggestion instead of --ta
        #[arg(long, conflicts_with = "tas")]
        auto: bool,

        /// Submit even when fewer proctors than required are selected
        #[arg(long)]
        allow_short: bool,

        /// Answer yes to every confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Request cross-department proctors for an understaffed exam
    Escalate {
        exam: ExamId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            backend_url: self.backend_url.clone(),
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigResolver::new(args.overrides())
        .resolve()
        .context("Failed to resolve configuration")?;
    init_tracing(&config.logging.level);

    info!(backend = %config.backend.base_url, "Starting tams-proctor");

    let session = Arc::new(SessionContext::from_config(&config.auth));
    if !session.is_authenticated().await {
        tracing::warn!("No access token configured; the backend will likely reject requests");
    }

    let backend: Arc<dyn ProctorBackend> = Arc::new(
        RestBackend::from_config(&config.backend, Arc::clone(&session))
            .context("Failed to build HTTP client")?,
    );

    let result = run(args.command, backend).await;

    // Tokens may have been refreshed even when the command failed
    if let Err(e) = persist_tokens(&config, &session).await {
        tracing::warn!(error = %e, "Failed to persist refreshed tokens");
    }

    result
}

async fn run(command: Command, backend: Arc<dyn ProctorBackend>) -> Result<()> {
    let exam_list = Arc::new(SharedExamList::new(Arc::clone(&backend)));
    let refresher: Arc<dyn ExamListRefresher> = exam_list.clone();

    match command {
        Command::Exams { tab } => list_exams(&exam_list, tab).await,
        Command::Candidates {
            exam,
            override_academic_level,
            override_consecutive_proctoring,
        } => {
            let flags = OverrideFlags {
                academic_level: override_academic_level,
                consecutive_proctoring: override_consecutive_proctoring,
            };
            show_candidates(&CandidateFetcher::new(backend), exam, flags).await
        }
        Command::Suggest { exam } => {
            let workflow = AssignmentWorkflow::from_backend(backend, Some(refresher));
            let result = suggest_interactive(&workflow, exam).await;
            workflow.close().await;
            result
        }
        Command::Assign {
            exam,
            tas,
            paid,
            replace,
            auto,
            allow_short,
            yes,
        } => {
            let workflow = AssignmentWorkflow::from_backend(backend, Some(refresher));
            let result = assign(&workflow, exam, &tas, paid, replace, auto, allow_short, yes).await;
            workflow.close().await;
            result
        }
        Command::Escalate { exam, yes } => {
            let workflow = AssignmentWorkflow::from_backend(backend, Some(refresher));
            let result = escalate(&workflow, exam, yes).await;
            workflow.close().await;
            result
        }
    }
}

// ----- exams -----

async fn list_exams(exam_list: &SharedExamList, tab: ExamTab) -> Result<()> {
    exam_list.refresh().await.context("Failed to load exams")?;
    exam_list.set_tab(tab).await;

    let snapshot = exam_list.snapshot().await;
    let counts: Vec<String> = snapshot
        .tab_counts()
        .into_iter()
        .map(|(t, n)| format!("{} ({})", t.label(), n))
        .collect();
    println!("{}", counts.join(" | "));
    println!();

    for exam in snapshot.visible() {
        println!(
            "#{:<5} {} {} {:<12} {}/{} proctors  {}",
            exam.id,
            exam.date,
            exam.start_time.format("%H:%M"),
            exam.course.code,
            exam.assigned_proctors,
            exam.required_proctors,
            exam.status
        );
    }
    Ok(())
}

// ----- candidates -----

async fn show_candidates(fetcher: &CandidateFetcher, exam_id: ExamId, flags: OverrideFlags) -> Result<()> {
    let exam = fetcher.fetch_exam(exam_id).await?;
    let list = fetcher.fetch_candidates(exam_id, flags).await?;

    println!(
        "{} on {} at {}: {} of {} proctors assigned, {} eligible",
        exam.course.code,
        exam.date,
        exam.start_time.format("%H:%M"),
        exam.assigned_proctors,
        exam.required_proctors,
        list.len()
    );

    let busiest = busiest_workload(&list.candidates);
    for id in rank(&list.candidates) {
        let Some(c) = list.get(id) else { continue };
        let mut tags = Vec::new();
        if c.is_assigned_to_current_exam {
            tags.push("assigned");
        }
        if c.is_teaching_course_section {
            tags.push("teaches course");
        }
        if c.eligibility.is_cross_department {
            tags.push("cross-department");
        }
        println!(
            "  #{:<5} {:<24} {:<9} load {:>5.1} ({:>3.0}%) {}",
            c.id,
            c.name,
            format!("{:?}", c.academic_level),
            c.current_workload,
            c.workload_percentage(busiest),
            tags.join(", ")
        );
        for violation in &c.eligibility.violations {
            println!("         ! {}", violation);
        }
    }
    Ok(())
}

// ----- workflow commands -----

async fn open_dialog(workflow: &AssignmentWorkflow, exam_id: ExamId) -> Result<DialogView> {
    let view = workflow
        .open(exam_id)
        .await?
        .applied()
        .context("Assignment dialog closed while loading")?;

    if let Some(exam) = &view.exam {
        println!(
            "{} on {}: {} of {} proctors assigned, {} eligible candidates",
            exam.course.code,
            exam.date,
            exam.assigned_proctors,
            exam.required_proctors,
            view.candidates.len()
        );
    }
    Ok(view)
}

async fn suggest_interactive(workflow: &AssignmentWorkflow, exam_id: ExamId) -> Result<()> {
    let view = open_dialog(workflow, exam_id).await?;

    match workflow.request_suggestion().await? {
        SuggestionOutcome::Applied(suggestion) => {
            println!("Suggested proctors:");
            for id in &suggestion.ids {
                if let Some(c) = view.candidates.iter().find(|c| c.id == *id) {
                    println!("  #{:<5} {} (load {:.1})", c.id, c.name, c.current_workload);
                }
            }
            if confirm("Submit these proctors?", false)? {
                submit_with_consent(workflow, false, false).await
            } else {
                workflow.cancel_suggestion().await?;
                println!("Suggestion discarded");
                Ok(())
            }
        }
        SuggestionOutcome::Insufficient {
            available,
            required,
            shortfall,
        } => {
            println!(
                "Only {} eligible candidate(s) for {} required proctors ({} short)",
                available, required, shortfall
            );
            insufficient_menu(workflow).await
        }
    }
}

async fn insufficient_menu(workflow: &AssignmentWorkflow) -> Result<()> {
    loop {
        let view = workflow.view().await.context("Assignment dialog closed")?;
        if view.insufficient == InsufficientState::Normal {
            return Ok(());
        }
        let toggle_label = |rule: OverrideRule| {
            let verb = if view.overrides.is_set(rule) { "Restore" } else { "Override" };
            format!("{} {} rule", verb, rule)
        };
        let items = vec![
            toggle_label(OverrideRule::AcademicLevel),
            toggle_label(OverrideRule::ConsecutiveProctoring),
            format!("Assign the {} found candidate(s)", view.candidates.len()),
            "Request cross-department proctors".to_string(),
            "Close".to_string(),
        ];

        let choice = Select::new()
            .with_prompt(format!(
                "{} eligible, {} short of the required count",
                view.candidates.len(),
                view.shortfall
            ))
            .items(&items)
            .default(items.len() - 1)
            .interact()?;

        match choice {
            0 | 1 => {
                let rule = if choice == 0 {
                    OverrideRule::AcademicLevel
                } else {
                    OverrideRule::ConsecutiveProctoring
                };
                match workflow.toggle_override(rule).await {
                    Ok(RequestOutcome::Applied(requery)) => println!(
                        "{} eligible candidate(s), {} short",
                        requery.available, requery.shortfall
                    ),
                    Ok(RequestOutcome::Abandoned) => {}
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            2 => match workflow.assign_found_candidates().await {
                Ok(RequestOutcome::Applied(request)) => {
                    println!("Assigned {} proctor(s)", request.proctors().len());
                    return Ok(());
                }
                Ok(RequestOutcome::Abandoned) => {}
                Err(e) => eprintln!("Error: {}", e),
            },
            3 => match workflow.request_cross_department().await {
                Ok(RequestOutcome::Applied(())) => {
                    println!("Cross-department proctors requested");
                    return Ok(());
                }
                Ok(RequestOutcome::Abandoned) => {}
                Err(e) => eprintln!("Error: {}", e),
            },
            _ => {
                workflow.dismiss_insufficient().await?;
                return Ok(());
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn assign(
    workflow: &AssignmentWorkflow,
    exam_id: ExamId,
    tas: &[TaId],
    paid: bool,
    replace: bool,
    auto: bool,
    allow_short: bool,
    yes: bool,
) -> Result<()> {
    let view = open_dialog(workflow, exam_id).await?;

    if auto {
        match workflow.request_suggestion().await? {
            SuggestionOutcome::Applied(suggestion) => {
                println!("Suggested proctors: {:?}", suggestion.ids);
            }
            SuggestionOutcome::Insufficient {
                available, required, ..
            } => {
                bail!(
                    "Only {} eligible candidate(s) for {} required proctors; run `suggest {}` to resolve",
                    available,
                    required,
                    exam_id
                );
            }
        }
    } else {
        let wanted: HashSet<TaId> = tas.iter().copied().collect();
        let current: HashSet<TaId> = view.selected.iter().copied().collect();
        for id in current.symmetric_difference(&wanted) {
            workflow.toggle(*id).await?;
        }
    }

    workflow.set_paid(paid).await?;
    workflow.set_replace_existing(replace).await?;
    submit_with_consent(workflow, allow_short, yes).await
}

async fn escalate(workflow: &AssignmentWorkflow, exam_id: ExamId, yes: bool) -> Result<()> {
    open_dialog(workflow, exam_id).await?;

    match workflow.request_suggestion().await? {
        SuggestionOutcome::Applied(_) => {
            bail!(
                "Exam {} has enough eligible candidates; use `suggest` or `assign` instead",
                exam_id
            )
        }
        SuggestionOutcome::Insufficient { shortfall, .. } => {
            if !yes && !confirm(&format!("{} proctor(s) short. Request cross-department proctors?", shortfall), true)? {
                workflow.dismiss_insufficient().await?;
                return Ok(());
            }
            workflow.request_cross_department().await?;
            println!("Cross-department proctors requested for exam {}", exam_id);
            Ok(())
        }
    }
}

/// Submit, asking before a short submission or replacing existing proctors
async fn submit_with_consent(workflow: &AssignmentWorkflow, allow_short: bool, yes: bool) -> Result<()> {
    let mut confirm_short = allow_short;
    loop {
        let outcome = match workflow.submit(confirm_short).await {
            Ok(outcome) => outcome,
            Err(WorkflowError::Precondition(PreconditionError::SelectionBelowRequired {
                selected,
                required,
            })) if !confirm_short => {
                let prompt = format!("Only {} of {} proctors selected. Submit anyway?", selected, required);
                if yes || confirm(&prompt, false)? {
                    confirm_short = true;
                    continue;
                }
                bail!("Submission cancelled");
            }
            Err(e) if e.is_already_assigned() => {
                let armed = workflow.view().await.is_some_and(|v| v.retry_available);
                if !armed || !(yes || confirm("Exam already has proctors. Replace them?", false)?) {
                    return Err(e.into());
                }
                workflow.retry_with_replace().await?
            }
            Err(e) => return Err(e.into()),
        };

        match outcome {
            RequestOutcome::Applied(request) => {
                println!(
                    "Assigned {} proctor(s) ({:?})",
                    request.proctors().len(),
                    request.mode()
                );
            }
            RequestOutcome::Abandoned => println!("Assignment dialog closed before the backend answered"),
        }
        return Ok(());
    }
}

fn confirm(prompt: &str, default: bool) -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()?)
}

/// Write refreshed tokens back to the config file they came from
async fn persist_tokens(config: &ResolvedConfig, session: &SessionContext) -> Result<()> {
    let tokens = session.snapshot().await;
    if tokens.access == config.auth.access_token && tokens.refresh == config.auth.refresh_token {
        return Ok(());
    }

    let Some(path) = &config.source_path else {
        debug!("Tokens refreshed but no config file to persist them to");
        return Ok(());
    };

    let mut file = load_toml_config(path)?;
    file.auth.access_token = tokens.access;
    file.auth.refresh_token = tokens.refresh;
    write_toml_config(&file, path)?;

    info!(path = %path.display(), "Persisted refreshed tokens");
    Ok(())
}
