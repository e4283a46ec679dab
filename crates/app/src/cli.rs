use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lesson_core::Site;
use lesson_core::model::UnitId;
use services::ChallengeKind;

use crate::config::DEFAULT_DB_URL;

/// Track learning-path progress and check exercise previews.
#[derive(Parser)]
#[command(name = "lesson-track", version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// SQLite URL or file path of the progress store
    #[arg(long = "db", env = "LESSON_DB_URL", default_value = DEFAULT_DB_URL, global = true)]
    pub db_url: String,

    /// Which site's learning path to operate on (selenium | hig)
    #[arg(long, env = "LESSON_SITE", default_value = "selenium", global = true)]
    pub site: Site,

    /// Quiet period before progress changes are written
    #[arg(long, default_value_t = 500, global = true)]
    pub save_delay_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show unit states, completion percentage and storage health
    Status,

    /// Mark a unit of the learning path complete
    Complete {
        /// Unit number, starting at 1
        unit: UnitId,
    },

    /// Forget all progress on the learning path
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Evaluate challenge code against its requirements and save it as a draft
    Check(ChallengeArgs),

    /// Evaluate challenge code and record it as the solution if everything passes
    Submit(ChallengeArgs),

    /// Replay reading activity on a lesson page
    Lesson {
        /// Lesson number, starting at 1
        #[arg(required_unless_present = "page")]
        lesson: Option<UnitId>,

        /// Lesson page address or path; the number is read from its `lessonN` segment
        #[arg(long, conflicts_with = "lesson")]
        page: Option<String>,

        /// Number of sections on the page
        #[arg(long, default_value_t = 5)]
        sections: u32,

        /// Section seen (zero-based); repeatable
        #[arg(long = "view")]
        views: Vec<u32>,

        /// Exercise whose solution was revealed (zero-based); repeatable
        #[arg(long = "reveal")]
        reveals: Vec<u32>,

        /// Seconds of reading time to add
        #[arg(long, default_value_t = 0)]
        seconds: u64,

        /// Mark the lesson complete on the learning path
        #[arg(long)]
        finish: bool,
    },
}

#[derive(Args)]
pub struct ChallengeArgs {
    /// settings | typography
    #[arg(long)]
    pub challenge: ChallengeKind,

    #[arg(long)]
    pub html: Option<PathBuf>,

    #[arg(long)]
    pub css: Option<PathBuf>,

    #[arg(long)]
    pub js: Option<PathBuf>,

    /// Use the worked example instead of files or the saved draft
    #[arg(long, conflicts_with_all = ["html", "css", "js"])]
    pub starter: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_lesson_replay() {
        let cli = Cli::try_parse_from([
            "lesson-track",
            "--site",
            "selenium",
            "lesson",
            "2",
            "--view",
            "0",
            "--view",
            "3",
            "--reveal",
            "1",
            "--finish",
        ])
        .unwrap();
        match cli.command {
            Command::Lesson {
                lesson,
                views,
                reveals,
                finish,
                ..
            } => {
                assert_eq!(lesson, Some(UnitId::new(2)));
                assert_eq!(views, vec![0, 3]);
                assert_eq!(reveals, vec![1]);
                assert!(finish);
            }
            _ => panic!("expected lesson command"),
        }
    }

    #[test]
    fn lesson_may_be_given_as_a_page() {
        let cli = Cli::try_parse_from([
            "lesson-track",
            "lesson",
            "--page",
            "https://learn.example/lessons/lesson3/index.html",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Lesson {
                lesson: None,
                page: Some(_),
                ..
            }
        ));
        assert!(Cli::try_parse_from(["lesson-track", "lesson"]).is_err());
        assert!(Cli::try_parse_from(["lesson-track", "lesson", "2", "--page", "lesson3"]).is_err());
    }

    #[test]
    fn unit_zero_is_rejected() {
        assert!(Cli::try_parse_from(["lesson-track", "complete", "0"]).is_err());
    }

    #[test]
    fn challenge_names_parse() {
        let cli = Cli::try_parse_from(["lesson-track", "check", "--challenge", "settings"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Check(ChallengeArgs {
                challenge: ChallengeKind::SettingsPage,
                ..
            })
        ));
    }
}
