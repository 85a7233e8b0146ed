use std::{fs, path::PathBuf, sync::Arc};

use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use capa_config::Config;
use capa_domain::QueryContext;
use capa_service::{CapaService, ClosureInput, KnowledgeStore, MemoryStore};
use capa_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = capa_cli::VERSION,
	rename_all = "kebab",
	styles = capa_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Read records from a JSON array instead of Postgres. Writes go back to the same file.
	#[arg(long, value_name = "FILE")]
	pub corpus: Option<PathBuf>,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Recommend past root-cause analyses for an issue.
	Rca {
		#[arg(long)]
		issue: String,
		#[arg(long)]
		machine: Option<String>,
		#[arg(long)]
		limit: Option<usize>,
	},
	/// Recommend past action plans for an issue with a finished why-list.
	Actions {
		#[arg(long)]
		issue: String,
		#[arg(long)]
		machine: Option<String>,
		/// JSON why-list of the issue.
		#[arg(long, value_name = "JSON")]
		whys: Option<String>,
		#[arg(long)]
		limit: Option<usize>,
	},
	/// Store what a closed issue taught.
	Capture {
		#[arg(long)]
		source_id: i64,
		#[arg(long)]
		issue: String,
		#[arg(long)]
		machine: Option<String>,
		#[arg(long, value_name = "JSON")]
		whys: Option<String>,
		/// `{"temp_actions": [...], "prev_actions": [...]}`.
		#[arg(long, value_name = "JSON")]
		actions: Option<String>,
	},
	/// Enable or soft-disable a stored record.
	SetActive {
		#[arg(long)]
		source_id: i64,
		#[arg(long, action = ArgAction::Set)]
		active: bool,
	},
	/// Create the knowledge table in Postgres.
	InitSchema,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = capa_config::load(&args.config)?;

	init_tracing(&config);

	if matches!(args.command, Command::InitSchema) {
		if args.corpus.is_some() {
			return Err(eyre::eyre!("init-schema needs Postgres and cannot be used with --corpus."));
		}

		Db::connect(&config.storage.postgres).await?.ensure_schema().await?;

		tracing::info!("Knowledge schema is ready.");

		return print_json(&serde_json::json!({ "schema": "ready" }));
	}

	let memory = match &args.corpus {
		Some(path) => Some(Arc::new(MemoryStore::from_json(&fs::read_to_string(path)?)?)),
		None => None,
	};
	let store: Arc<dyn KnowledgeStore> = match &memory {
		Some(memory) => memory.clone() as Arc<dyn KnowledgeStore>,
		None => Arc::new(Db::connect(&config.storage.postgres).await?),
	};
	let service = CapaService::new(config, store);
	let output = execute(&service, args.command).await?;

	if let (Some(memory), Some(path)) = (&memory, &args.corpus)
		&& output.mutated
	{
		fs::write(path, serde_json::to_string_pretty(&memory.snapshot())?)?;
	}

	print_json(&output.value)
}

struct Output {
	value: Value,
	mutated: bool,
}

async fn execute(service: &CapaService, command: Command) -> color_eyre::Result<Output> {
	let (value, mutated) = match command {
		Command::Rca { issue, machine, limit } => {
			let query = query(issue, machine, None);

			(serde_json::to_value(service.recommend_root_causes(&query, limit).await?)?, false)
		},
		Command::Actions { issue, machine, whys, limit } => {
			let query = query(issue, machine, whys);

			(serde_json::to_value(service.recommend_action_plans(&query, limit).await?)?, false)
		},
		Command::Capture { source_id, issue, machine, whys, actions } => {
			let input = ClosureInput {
				source_id,
				machine_name: machine,
				issue_description: issue,
				whys_json: whys,
				action_plan_json: actions,
			};

			(serde_json::to_value(service.capture_on_close(input).await?)?, true)
		},
		Command::SetActive { source_id, active } => {
			service.set_active(source_id, active).await?;

			(serde_json::json!({ "source_id": source_id, "active": active }), true)
		},
		Command::InitSchema => return Err(eyre::eyre!("init-schema is handled before dispatch.")),
	};

	Ok(Output { value, mutated })
}

fn query(issue: String, machine: Option<String>, whys: Option<String>) -> QueryContext {
	QueryContext { issue_description: issue, machine_name: machine, whys_json: whys }
}

fn print_json(value: &Value) -> color_eyre::Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);

	Ok(())
}

fn init_tracing(config: &Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
