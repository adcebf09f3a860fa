use std::{fs, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    actions::{self, Action, Outcome},
    select_all, select_for_path, Dispatch, HttpActivityApi, Session,
};
use serde_json::{json, Value};
use shared::{
    domain::{ActivityId, EntityKind, IndicatorId, ParentPath, PeriodId, PublisherId, ResultId},
    error::ApiException,
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "http://127.0.0.1:2000")]
    server_url: Url,
    /// OIPA API token forwarded as `Authorization: Token ...`.
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Copy)]
struct PathArgs {
    #[arg(long)]
    publisher: i64,
    #[arg(long)]
    activity: Option<i64>,
    #[arg(long)]
    result: Option<i64>,
    #[arg(long)]
    indicator: Option<i64>,
    #[arg(long)]
    period: Option<i64>,
}

impl PathArgs {
    fn parent_path(self) -> ParentPath {
        let mut path = ParentPath::new(PublisherId(self.publisher));
        path.activity = self.activity.map(ActivityId);
        path.result = self.result.map(ResultId);
        path.indicator = self.indicator.map(IndicatorId);
        path.period = self.period.map(PeriodId);
        path
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the records of one entity kind, e.g. `humanitarianScopes`.
    Get {
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,
        #[command(flatten)]
        path: PathArgs,
    },
    /// Validate the JSON array in `file` and reconcile it with the current remote records.
    Submit {
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,
        file: PathBuf,
        #[command(flatten)]
        path: PathArgs,
    },
    Codelist {
        name: String,
    },
    MarkReady {
        #[arg(long)]
        publisher: i64,
        #[arg(long)]
        activity: i64,
    },
    /// List a publisher's activities.
    List {
        #[arg(long)]
        publisher: i64,
        #[arg(long)]
        query: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, conflicts_with = "ready_to_publish")]
        modified: bool,
        #[arg(long)]
        ready_to_publish: bool,
    },
}

fn parse_kind(raw: &str) -> Result<EntityKind, String> {
    EntityKind::from_store_key(raw).ok_or_else(|| {
        let known: Vec<&str> = EntityKind::ALL.iter().map(|kind| kind.store_key()).collect();
        format!("unknown entity kind '{raw}', expected one of: {}", known.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut api = HttpActivityApi::new(cli.server_url);
    if let Some(token) = cli.token {
        api = api.with_token(token);
    }
    let session = Session::new(api);

    match cli.command {
        Command::Get { kind, path } => {
            settled(session.fetch(kind, &path.parent_path()).await?)?;
            print_json(&Value::Array(select_all(&session.snapshot().await, kind)))?;
        }
        Command::Submit { kind, file, path } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let submitted: Vec<Value> = serde_json::from_str(&raw)
                .with_context(|| format!("{} must hold a JSON array of records", file.display()))?;

            let path = path.parent_path();
            settled(session.fetch(kind, &path).await?)?;
            let previous = select_for_path(&session.snapshot().await, kind, &path);

            let batch = session.submit(kind, &path, &previous, &submitted).await?;
            let created: Vec<i64> = batch.created_ids().into_iter().map(|id| id.0).collect();
            print_json(&json!({
                "kind": kind.store_key(),
                "operations": batch.outcomes.len(),
                "created": created,
                "failed": batch.failures().count(),
            }))?;
            if let Some(error) = batch.error() {
                bail!(ApiException::from(error.clone()));
            }
        }
        Command::Codelist { name } => {
            settled(session.dispatch(actions::get_code_list_items(&name)).await)?;
            let code_lists = session.code_lists().await;
            let items = code_lists.get(&name).map(|items| items.as_slice()).unwrap_or(&[]);
            print_json(&serde_json::to_value(items)?)?;
        }
        Command::MarkReady {
            publisher,
            activity,
        } => {
            let descriptor = actions::mark_ready_to_publish(PublisherId(publisher), ActivityId(activity));
            settled(session.dispatch(descriptor).await)?;
            info!(activity, "marked ready to publish");
        }
        Command::List {
            publisher,
            query,
            page,
            modified,
            ready_to_publish,
        } => {
            let publisher = PublisherId(publisher);
            let descriptor = if modified {
                actions::get_modified_activities(publisher)
            } else if ready_to_publish {
                actions::get_ready_to_publish_activities(publisher)
            } else {
                actions::get_activities(publisher, json!({ "q": query }), page)
            };
            match settled(session.dispatch(descriptor).await)? {
                Outcome::Raw(body) => print_json(&body)?,
                _ => print_json(&Value::Array(select_all(
                    &session.snapshot().await,
                    EntityKind::Activity,
                )))?,
            }
        }
    }

    Ok(())
}

fn settled(action: Action) -> Result<Outcome> {
    match action {
        Action::Success { outcome, .. } => Ok(outcome),
        Action::Failure { error, .. } => Err(ApiException::from(error).into()),
        Action::Request { action_type, .. } => bail!("{action_type:?} never settled"),
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
