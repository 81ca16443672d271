use std::{io, path::PathBuf, sync::Arc};

use clap::{
	Args as ClapArgs, Parser, Subcommand,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use trove_config::Config;
use trove_domain::SearchableModel;
use trove_service::{ChangeKind, Indexer, SearchRequest, SearchService};
use trove_storage::{PgSearchStore, db::Db};

#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab", styles = styles())]
pub struct Args {
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Run one search and print the JSON response.
	Search(SearchArgs),
	/// Rebuild the search index from the source relations.
	Reindex(ConfigArgs),
	/// Re-derive the index rows of one changed entity.
	ApplyChange(ApplyChangeArgs),
}

#[derive(Debug, ClapArgs)]
pub struct ConfigArgs {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

#[derive(Debug, ClapArgs)]
pub struct SearchArgs {
	#[command(flatten)]
	pub config: ConfigArgs,
	#[arg(long)]
	pub user_id: i64,
	/// Permission path, e.g. `/collection/5/read/`. Repeatable.
	#[arg(long = "permission", value_name = "PATH")]
	pub permissions: Vec<String>,
	#[arg(long, short = 'q')]
	pub query: Option<String>,
	#[arg(long = "model", value_name = "MODEL")]
	pub models: Vec<String>,
	#[arg(long)]
	pub archived: bool,
	#[arg(long, value_name = "RANGE")]
	pub created_at: Option<String>,
	#[arg(long = "created-by", value_name = "USER_ID")]
	pub created_by: Vec<i64>,
	#[arg(long, value_name = "RANGE")]
	pub last_edited_at: Option<String>,
	#[arg(long = "last-edited-by", value_name = "USER_ID")]
	pub last_edited_by: Vec<i64>,
	/// `only` or `exclude`.
	#[arg(long, value_name = "SCOPE")]
	pub personal_collections: Option<String>,
	#[arg(long)]
	pub table_db_id: Option<i64>,
	#[arg(long)]
	pub search_native_query: bool,
	#[arg(long)]
	pub model_ancestors: bool,
	#[arg(long)]
	pub verified: bool,
	#[arg(long)]
	pub sandboxed: bool,
	#[arg(long)]
	pub limit: Option<u32>,
	#[arg(long)]
	pub offset: Option<u32>,
}
impl SearchArgs {
	pub fn into_request(self) -> SearchRequest {
		SearchRequest {
			q: self.query,
			models: (!self.models.is_empty()).then_some(self.models),
			current_user_id: Some(self.user_id),
			permissions: Some(self.permissions),
			archived: self.archived.then_some(true),
			created_at: self.created_at,
			created_by: (!self.created_by.is_empty()).then_some(self.created_by),
			last_edited_at: self.last_edited_at,
			last_edited_by: (!self.last_edited_by.is_empty()).then_some(self.last_edited_by),
			filter_items_in_personal_collection: self.personal_collections,
			table_db_id: self.table_db_id,
			search_native_query: self.search_native_query,
			model_ancestors: self.model_ancestors,
			verified: self.verified,
			limit: self.limit,
			offset: self.offset,
			is_sandboxed: self.sandboxed,
		}
	}
}

#[derive(Debug, ClapArgs)]
pub struct ApplyChangeArgs {
	#[command(flatten)]
	pub config: ConfigArgs,
	#[arg(long)]
	pub model: String,
	#[arg(long)]
	pub id: i64,
	/// `insert`, `update` or `delete`.
	#[arg(long)]
	pub kind: String,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	match args.command {
		Command::Search(search) => {
			let (config, db) = bootstrap(&search.config).await?;
			let service = SearchService::new(config, Arc::new(PgSearchStore::new(&db)));
			let response = service.search(search.into_request()).await?;

			println!("{}", serde_json::to_string_pretty(&response)?);
		},
		Command::Reindex(config) => {
			let (_, db) = bootstrap(&config).await?;
			let report = Indexer::new(&db).reindex_all().await?;

			println!("{}", serde_json::to_string_pretty(&report)?);
		},
		Command::ApplyChange(change) => {
			let Some(model) = SearchableModel::parse(&change.model) else {
				return Err(eyre::eyre!("Unknown model {:?}.", change.model));
			};
			let kind = ChangeKind::parse(&change.kind)?;
			let (_, db) = bootstrap(&change.config).await?;
			let report = Indexer::new(&db).apply_change(change.id, model, kind).await?;

			println!("{}", serde_json::to_string_pretty(&report)?);
		},
	}

	Ok(())
}

async fn bootstrap(args: &ConfigArgs) -> color_eyre::Result<(Config, Db)> {
	let config = trove_config::load(&args.config)?;

	init_tracing(&config);

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	tracing::info!(engine = %config.search.engine, "Connected to Postgres.");

	Ok((config, db))
}

fn init_tracing(config: &Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	// Stdout carries the JSON output.
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}
