//! Command-line driver for the straymap core.
//!
//! # Responsibility
//! - Open the SQLite store named by `--db` / `STRAYMAP_DB`.
//! - Run one façade operation per invocation and print the result as JSON.
//!
//! Exit codes: 0 success, 1 fatal failure, 2 field errors.

use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use straymap_core::{
    core_version, default_log_level, init_logging, open_db, AddTagToIssueRequest, FieldError,
    GetIssuesRequest, GetTagsRequest, IssueSortBy, IssuesService, NewIssueRequest, NewTagRequest,
    RemoveTagFromIssueRequest, TagsService,
};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "straymap", version, about = "Geolocated issue reports and tags")]
struct Cli {
    /// SQLite database file.
    #[arg(long, env = "STRAYMAP_DB", default_value = "straymap.sqlite3")]
    db: PathBuf,
    /// Absolute directory for rolling log files; logging is off when unset.
    #[arg(long, env = "STRAYMAP_LOG_DIR")]
    log_dir: Option<String>,
    #[arg(long, env = "STRAYMAP_LOG_LEVEL")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the core version.
    Version,
    /// Report a new issue at a location.
    Report {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
    /// Show one issue, including soft-deleted ones.
    Show { id: Uuid },
    /// List active issues nearest to a location.
    Nearest {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Only issues within this many meters.
        #[arg(long)]
        radius: Option<f64>,
        #[arg(long, default_value_t = 10)]
        page_size: i64,
        #[arg(long, default_value_t = 1)]
        page: i64,
    },
    /// Soft-delete an issue.
    Resolve { id: Uuid },
    /// Create a tag.
    Tag { name: String },
    /// List active tags by name.
    Tags {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 10)]
        page_size: i64,
        #[arg(long, default_value_t = 1)]
        page: i64,
    },
    /// Attach a tag to an issue.
    Attach { issue_id: Uuid, tag_id: Uuid },
    /// Detach a tag from an issue.
    Detach { issue_id: Uuid, tag_id: Uuid },
}

#[derive(Serialize)]
struct Reply<'a, T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    errors: &'a [FieldError],
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(message) => {
            eprintln!("straymap: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, String> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).map_err(|err| err.to_string())?;
    }

    if let Command::Version = cli.command {
        println!("straymap_core version={}", core_version());
        return Ok(ExitCode::SUCCESS);
    }

    let mut conn = open_db(&cli.db).map_err(|err| err.to_string())?;
    info!(
        "event=cli_command module=cli status=start command={}",
        command_name(&cli.command)
    );

    match cli.command {
        Command::Version => Ok(ExitCode::SUCCESS),
        Command::Report {
            title,
            description,
            lat,
            lon,
        } => {
            let mut service = IssuesService::try_new(&mut conn).map_err(|err| err.to_string())?;
            let id = service
                .new_issue(&NewIssueRequest {
                    title,
                    description,
                    latitude: lat,
                    longitude: lon,
                })
                .map_err(|err| err.to_string())?;
            reply(id, service.errors())
        }
        Command::Show { id } => {
            let mut service = IssuesService::try_new(&mut conn).map_err(|err| err.to_string())?;
            let issue = service
                .get_issue_by_id(id)
                .map_err(|err| err.to_string())?;
            reply(issue, service.errors())
        }
        Command::Nearest {
            lat,
            lon,
            radius,
            page_size,
            page,
        } => {
            let mut service = IssuesService::try_new(&mut conn).map_err(|err| err.to_string())?;
            let page = service
                .get_issues_with_pagination(&GetIssuesRequest {
                    page_size,
                    page_number: page,
                    sort_by: IssueSortBy::Distance,
                    descending: false,
                    current_latitude: Some(lat),
                    current_longitude: Some(lon),
                    radius_meters: radius,
                })
                .map_err(|err| err.to_string())?;
            reply(page, service.errors())
        }
        Command::Resolve { id } => {
            let mut service = IssuesService::try_new(&mut conn).map_err(|err| err.to_string())?;
            service
                .soft_delete_issue(id)
                .map_err(|err| err.to_string())?;
            reply(None::<()>, service.errors())
        }
        Command::Tag { name } => {
            let mut service = TagsService::try_new(&mut conn).map_err(|err| err.to_string())?;
            let id = service
                .new_tag(&NewTagRequest { name })
                .map_err(|err| err.to_string())?;
            reply(id, service.errors())
        }
        Command::Tags {
            search,
            page_size,
            page,
        } => {
            let mut service = TagsService::try_new(&mut conn).map_err(|err| err.to_string())?;
            let page = service
                .get_tags_with_pagination(&GetTagsRequest {
                    page_size,
                    page_number: page,
                    name_search: search,
                    descending: false,
                })
                .map_err(|err| err.to_string())?;
            reply(page, service.errors())
        }
        Command::Attach { issue_id, tag_id } => {
            let mut service = IssuesService::try_new(&mut conn).map_err(|err| err.to_string())?;
            service
                .add_tag_to_issue(&AddTagToIssueRequest { issue_id, tag_id })
                .map_err(|err| err.to_string())?;
            reply(None::<()>, service.errors())
        }
        Command::Detach { issue_id, tag_id } => {
            let mut service = IssuesService::try_new(&mut conn).map_err(|err| err.to_string())?;
            service
                .remove_tag_from_issue(&RemoveTagFromIssueRequest { issue_id, tag_id })
                .map_err(|err| err.to_string())?;
            reply(None::<()>, service.errors())
        }
    }
}

fn reply<T: Serialize>(data: Option<T>, errors: &[FieldError]) -> Result<ExitCode, String> {
    let body = serde_json::to_string_pretty(&Reply { data, errors })
        .map_err(|err| format!("failed to encode reply: {err}"))?;
    println!("{body}");
    if errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(2))
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Version => "version",
        Command::Report { .. } => "report",
        Command::Show { .. } => "show",
        Command::Nearest { .. } => "nearest",
        Command::Resolve { .. } => "resolve",
        Command::Tag { .. } => "tag",
        Command::Tags { .. } => "tags",
        Command::Attach { .. } => "attach",
        Command::Detach { .. } => "detach",
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "straymap", "--db", "x.sqlite3", "nearest", "--lat", "-33.9", "--lon", "18.4",
        ])
        .unwrap();
        match cli.command {
            Command::Nearest { lat, lon, page, .. } => {
                assert_eq!(lat, -33.9);
                assert_eq!(lon, 18.4);
                assert_eq!(page, 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
