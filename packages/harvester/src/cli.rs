//! Command-line interface for the harvester.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{validate_credentials, validate_enrollment_date, PortalConfig};
use crate::error::{HarvesterError, Result};
use crate::harvester::harvest_courses;
use crate::homepage::parse_homepage;
use crate::markup::normalize_whitespace;
use crate::portal::{Credentials, PortalClient};
use crate::report::parse_report;
use crate::types::Course;

/// Environment variable holding the portal password for `fetch`.
pub const PASSWORD_ENV: &str = "GRADESYNC_PASSWORD";

/// Gradesync Harvester - Extract courses and marks from the TeachAssist portal.
#[derive(Parser)]
#[command(name = "gradesync-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the open courses on a saved homepage.
    ParseHomepage {
        /// Saved homepage HTML
        file: PathBuf,
    },

    /// Parse a saved course report and print it as JSON.
    ParseReport {
        /// Saved report page HTML
        file: PathBuf,

        /// Account id the marks are attributed to
        #[arg(short, long)]
        student_id: String,

        /// Enrollment month in YYYY-MM format
        #[arg(short, long)]
        date: String,
    },

    /// Log in and print every open course as JSON (password from GRADESYNC_PASSWORD).
    Fetch {
        /// Portal username (student number)
        #[arg(short, long)]
        username: String,

        /// Account id the marks are attributed to (default: username)
        #[arg(short, long)]
        student_id: Option<String>,

        /// Portal base URL
        #[arg(long)]
        portal_url: Option<String>,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::ParseHomepage { file } => parse_homepage_command(&file),
        Commands::ParseReport {
            file,
            student_id,
            date,
        } => parse_report_command(&file, &student_id, &date),
        Commands::Fetch {
            username,
            student_id,
            portal_url,
        } => fetch_command(&username, student_id.as_deref(), portal_url.as_deref()),
    }
}

fn read_page(file: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(file)?;
    Ok(normalize_whitespace(&raw).into_owned())
}

fn parse_homepage_command(file: &Path) -> Result<()> {
    let page = read_page(file)?;
    let links = parse_homepage(&page)?;
    println!("{}", serde_json::to_string_pretty(&links)?);
    Ok(())
}

fn parse_report_command(file: &Path, student_id: &str, date: &str) -> Result<()> {
    validate_enrollment_date(date)?;

    let page = read_page(file)?;
    let course = parse_report(&page, student_id, date)?;

    print_summary(&course);
    println!("{}", serde_json::to_string_pretty(&course)?);
    Ok(())
}

fn fetch_command(username: &str, student_id: Option<&str>, portal_url: Option<&str>) -> Result<()> {
    let password = std::env::var(PASSWORD_ENV)
        .map_err(|_| HarvesterError::InvalidCredentials(username.to_string()))?;
    let credentials = Credentials::new(username, password);

    // Validate before making HTTP requests
    validate_credentials(&credentials.username, &credentials.password)?;

    let mut config = PortalConfig::default();
    if let Some(url) = portal_url {
        config = config.with_base_url(url);
    }
    let portal = PortalClient::new(config)?;

    eprintln!(
        "{} as {}",
        style("Logging in").bold(),
        style(username).cyan(),
    );

    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message("Fetching reports...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let courses = match harvest_courses(&portal, &credentials, student_id.unwrap_or(username)) {
        Ok(courses) => courses,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };
    pb.finish_and_clear();

    for course in &courses {
        print_summary(course);
    }
    println!("{}", serde_json::to_string_pretty(&courses)?);
    Ok(())
}

fn print_summary(course: &Course) {
    let weights = match &course.weights {
        Some(w) => format!("{w:?}"),
        None => style("none").yellow().to_string(),
    };
    let marks = match &course.marks {
        Some(m) => m.len().to_string(),
        None => style("none").yellow().to_string(),
    };
    eprintln!(
        "  {} ({})  weights: {}  marks: {}",
        style(&course.name).green(),
        course.enrollment_date,
        weights,
        marks
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_report_args() {
        let cli = Cli::parse_from([
            "gradesync-harvester",
            "parse-report",
            "report.html",
            "--student-id",
            "uid-1",
            "--date",
            "2024-09",
        ]);

        let Commands::ParseReport {
            file,
            student_id,
            date,
        } = cli.command
        else {
            panic!("expected parse-report");
        };
        assert_eq!(file, PathBuf::from("report.html"));
        assert_eq!(student_id, "uid-1");
        assert_eq!(date, "2024-09");
    }

    #[test]
    fn test_cli_parse_fetch_defaults() {
        let cli = Cli::parse_from(["gradesync-harvester", "fetch", "--username", "340000001"]);

        let Commands::Fetch {
            username,
            student_id,
            portal_url,
        } = cli.command
        else {
            panic!("expected fetch");
        };
        assert_eq!(username, "340000001");
        assert!(student_id.is_none());
        assert!(portal_url.is_none());
    }
}
