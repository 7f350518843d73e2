//! learnpath CLI - course progress tracking.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use learnpath_core::{ContentType, CourseId, UserId, WeekNumber};
use learnpath_progress::{
    CourseSummary, MarkOutcome, ProgressPolicy, ProgressService, ServiceError, Session, WatchOutcome,
};
use learnpath_storage::{JsonCurriculum, JsonStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "learnpath")]
#[command(about = "Track course progress: lessons, videos, weeks and quiz gates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory (progress, events, courses)
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Config file (default: <data>/learnpath.json when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Current user
    #[arg(short, long, global = true, default_value = "local")]
    user: String,

    /// Override the progress policy profile
    #[arg(long, global = true, value_enum)]
    profile: Option<Profile>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Profile {
    /// Completing all videos completes the week
    Gated,
    /// Weeks are never marked complete
    Ungated,
}

#[derive(Subcommand)]
enum Commands {
    /// List available courses
    Courses,
    /// Enroll in a course
    Enroll {
        /// Course ID
        course: String,
    },
    /// Mark an item complete
    Mark {
        /// Course ID
        course: String,
        /// Week number
        week: WeekNumber,
        /// lessons | readings | videos | assignments
        content_type: String,
        /// Item identifier (id or title)
        item: String,
    },
    /// Count video views
    Watch {
        /// Course ID
        course: String,
        /// Week number
        week: WeekNumber,
        /// Video identifier (id or title)
        video: String,
        /// Number of views to record
        #[arg(long, default_value = "1")]
        times: u32,
    },
    /// Record the week being opened
    Open {
        /// Course ID
        course: String,
        /// Week number
        week: WeekNumber,
    },
    /// Show course progress
    Status {
        /// Course ID
        course: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Check whether a week's quiz is unlocked
    Quiz {
        /// Course ID
        course: String,
        /// Week number
        week: WeekNumber,
    },
    /// Show the activity log
    Events,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::resolve(cli.config.as_deref(), cli.data.as_deref())?;
    if let Some(profile) = cli.profile {
        config.policy = match profile {
            Profile::Gated => ProgressPolicy::gated(),
            Profile::Ungated => ProgressPolicy::ungated(),
        }
        .with_video_threshold(config.policy.video_completion_threshold)
        .with_quiz_threshold(config.policy.quiz_unlock_threshold);
    }

    let store = JsonStore::new(&config.data_dir).await?;
    let curriculum = JsonCurriculum::new(&config.data_dir);
    let mut service = ProgressService::new(store, curriculum).with_policy(config.policy);
    let session = Session::new(UserId::parse(&cli.user).context("invalid --user")?);

    match cli.command {
        Commands::Courses => {
            let courses = service.courses().await?;
            let progress = service.user_progress(&session).await?;
            println!("Courses ({})", courses.len());
            for course in courses {
                let marker = if progress.is_enrolled(&course.id) { "*" } else { " " };
                println!(
                    " {} {} | {} weeks | {}",
                    marker,
                    course.id,
                    course.weeks.len(),
                    course.title
                );
            }
        }
        Commands::Enroll { course } => {
            let course = parse_course(&course)?;
            let applied = report(service.enroll(&session, &course).await)?;
            if applied.outcome {
                println!("Enrolled in {}", course);
            } else {
                println!("Already enrolled in {}", course);
            }
        }
        Commands::Mark { course, week, content_type, item } => {
            let course = parse_course(&course)?;
            let content_type: ContentType = content_type.parse()?;
            let applied = report(
                service
                    .mark_item_complete(&session, &course, week, content_type, &item)
                    .await,
            )?;
            match applied.outcome {
                MarkOutcome::Completed { week_completed } => {
                    println!("Completed {} {:?} (week {})", content_type, item, week);
                    if week_completed {
                        println!("Week {} complete!", week);
                    }
                }
                MarkOutcome::AlreadyComplete => println!("Already complete"),
                MarkOutcome::MissingReference => {
                    println!("Week {} has no {} item {:?}; nothing recorded", week, content_type, item)
                }
            }
        }
        Commands::Watch { course, week, video, times } => {
            let course = parse_course(&course)?;
            for _ in 0..times.max(1) {
                let applied = report(service.record_video_watch(&session, &course, week, &video).await)?;
                match applied.outcome {
                    WatchOutcome::Counted { count } => {
                        println!("{:?}: {}/{} views", video, count, service.policy().video_threshold())
                    }
                    WatchOutcome::Completed { week_completed } => {
                        println!("{:?} complete", video);
                        if week_completed {
                            println!("Week {} complete!", week);
                        }
                    }
                    WatchOutcome::AlreadyComplete => {
                        println!("{:?} already complete", video);
                        break;
                    }
                    WatchOutcome::MissingReference => {
                        println!("Week {} has no video {:?}; nothing recorded", week, video);
                        break;
                    }
                }
            }
        }
        Commands::Open { course, week } => {
            let course = parse_course(&course)?;
            let applied = report(service.open_week(&session, &course, week).await)?;
            if applied.outcome {
                println!("Opened week {}", week);
            } else {
                println!("Week {} is not part of {}", week, course);
            }
        }
        Commands::Status { course, json } => {
            let course = parse_course(&course)?;
            let summary = service.summary(&session, &course).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Commands::Quiz { course, week } => {
            let course = parse_course(&course)?;
            let summary = service.summary(&session, &course).await?;
            let Some(plan) = summary.weeks.iter().find(|w| w.week == week) else {
                println!("Week {} is not part of {}", week, course);
                return Ok(());
            };
            match &plan.quiz {
                Some(quiz) if quiz.unlocked => println!("Quiz {} unlocked", quiz.quiz_id),
                Some(quiz) => println!(
                    "Quiz {} locked: {}/{} lessons complete (need {}%)",
                    quiz.quiz_id,
                    plan.lessons_completed,
                    plan.total_lessons,
                    service.policy().quiz_threshold()
                ),
                None => println!("Week {} has no quiz", week),
            }
        }
        Commands::Events => {
            let events = service.events(&session).await?;
            println!("Events ({})", events.len());
            for event in events {
                println!(
                    "  {} | {} | {}",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.course_id,
                    event.kind
                );
            }
        }
    }

    Ok(())
}

fn parse_course(s: &str) -> Result<CourseId> {
    CourseId::parse(s).with_context(|| format!("invalid course id {:?}", s))
}

/// Surface a persistence failure as a transient error the user can retry.
fn report<T>(result: std::result::Result<T, ServiceError>) -> Result<T> {
    match result {
        Err(e) if e.is_transient() => {
            info!("Change applied in memory only");
            Err(anyhow::Error::new(e).context("progress was not saved; run the command again"))
        }
        other => Ok(other?),
    }
}

fn print_summary(summary: &CourseSummary) {
    println!("{} - {}", summary.course_id, summary.title);
    println!("  Overall: {}%", summary.overall_percentage);
    if let Some(week) = summary.last_accessed_week {
        println!("  Last accessed: week {}", week);
    }
    for week in &summary.weeks {
        let mark = if summary.completed_weeks.contains(&week.week) { "x" } else { " " };
        println!(
            "  [{}] Week {}: {} | videos {}/{} ({}%) | lessons {}/{}{}",
            mark,
            week.week,
            week.title,
            week.videos.completed_videos,
            week.videos.total_videos,
            week.percentage,
            week.lessons_completed,
            week.total_lessons,
            match &week.quiz {
                Some(quiz) if quiz.unlocked => format!(" | quiz {} unlocked", quiz.quiz_id),
                Some(quiz) => format!(" | quiz {} locked", quiz.quiz_id),
                None => String::new(),
            }
        );
    }
}
