use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use reveal_api::{
    load_files, load_jurisdictions_metadata, load_organizations, load_plan_definitions,
    load_plans, load_plans_by_user, load_practitioner_roles, load_practitioners, ApiConfig,
    CancellationToken, ListParams, LoadOutcome, OpenSrpClient, Service,
};
use reveal_core::ducks::files::{make_files_array_selector, FileFilters};
use reveal_core::ducks::jurisdiction_metadata::{
    make_jurisdictions_metadata_selector, MetadataFilters,
};
use reveal_core::ducks::organizations::{make_organizations_array_selector, OrganizationFilters};
use reveal_core::ducks::plan_definitions::{
    make_plan_definitions_array_selector, PlanDefinitionFilters,
};
use reveal_core::ducks::plans::{
    make_plan_records_array_selector, make_plans_array_selector, PlanFilters,
};
use reveal_core::ducks::plans_by_user::{
    make_plans_by_user_names_selector, no_data_message, NoDataMessage,
};
use reveal_core::ducks::practitioners::{
    make_practitioners_array_selector, unassigned_practitioners, PractitionerFilters,
};
use reveal_core::sort::sort_by_date_desc;
use reveal_core::{FiReason, InterventionType, PlanStatus, ReducerRegistry, Store};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const CLI_CONTRACT_VERSION: &str = "cli.v1";
const DEFAULT_LOG_FILTER: &str = "reveal=info";

#[derive(Debug, Parser)]
#[command(name = "reveal")]
#[command(about = "Reveal entity cache CLI")]
struct Cli {
    /// YAML file with `api_base_url`, `access_token`, `timeout_secs` and `endpoints`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    api_base_url: Option<String>,

    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Plans(PlansArgs),
    PlanDefinitions(PlanDefinitionsArgs),
    Organizations(OrganizationsArgs),
    Practitioners(PractitionersArgs),
    Files(FilesArgs),
    Metadata(MetadataArgs),
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// JSON file holding one fetched batch. Repeat to apply batches in order.
    #[arg(long = "from", value_name = "FILE")]
    from: Vec<PathBuf>,

    /// Fetch from the configured OpenSRP API after any `--from` batches.
    #[arg(long, default_value_t = false)]
    fetch: bool,

    /// Each batch replaces the cached map instead of merging into it.
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

#[derive(Debug, Args)]
struct UserFilterArgs {
    /// Only plans assigned to this user.
    #[arg(long)]
    user: Option<String>,

    /// Plan assignment response for `--user`.
    #[arg(long, value_name = "FILE", requires = "user")]
    assignments: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct PlansArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[command(flatten)]
    user: UserFilterArgs,
    #[arg(long = "intervention-type", value_name = "TYPE")]
    intervention_types: Vec<String>,
    #[arg(long = "status", value_name = "STATUS")]
    statuses: Vec<String>,
    #[arg(long)]
    reason: Option<String>,
    #[arg(long)]
    title: Option<String>,
    #[arg(long = "parent-jurisdiction", value_name = "ID")]
    parent_jurisdiction: Option<String>,
    #[arg(long = "jurisdiction", value_name = "ID")]
    jurisdiction_ids: Vec<String>,
    #[arg(long = "plan-id", value_name = "ID")]
    plan_ids: Vec<String>,
    #[arg(long, default_value_t = false)]
    sort_by_date: bool,
}

#[derive(Debug, Args)]
struct PlanDefinitionsArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[command(flatten)]
    user: UserFilterArgs,
    #[arg(long = "intervention-type", value_name = "TYPE")]
    intervention_types: Vec<String>,
    #[arg(long = "status", value_name = "STATUS")]
    statuses: Vec<String>,
    #[arg(long)]
    title: Option<String>,
    #[arg(long = "jurisdiction", value_name = "ID")]
    jurisdiction_ids: Vec<String>,
    #[arg(long = "plan-id", value_name = "ID")]
    plan_ids: Vec<String>,
    /// Emit the flattened plan records instead of the definitions.
    #[arg(long, default_value_t = false)]
    records: bool,
    #[arg(long, default_value_t = false)]
    sort_by_date: bool,
}

#[derive(Debug, Args)]
struct OrganizationsArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(long)]
    name: Option<String>,
    #[arg(long = "id", value_name = "ID")]
    ids: Vec<String>,
    #[arg(long, default_value_t = false)]
    active_only: bool,
}

#[derive(Debug, Args)]
struct PractitionersArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Organization membership batch, as `ORGANIZATION_ID=FILE`.
    #[arg(long = "roles", value_name = "ORG=FILE")]
    roles: Vec<String>,
    /// Restrict to members of this organization (also what `--fetch` loads roles for).
    #[arg(long)]
    organization: Option<String>,
    /// Substring of the display name or username.
    #[arg(long)]
    name: Option<String>,
    #[arg(long, default_value_t = false)]
    active_only: bool,
    /// Only practitioners without any organization.
    #[arg(long, default_value_t = false, conflicts_with = "organization")]
    unassigned: bool,
}

#[derive(Debug, Args)]
struct FilesArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(long)]
    file_name: Option<String>,
    #[arg(long, default_value_t = false)]
    sort_by_date: bool,
}

#[derive(Debug, Args)]
struct MetadataArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(long)]
    metric: Option<String>,
    #[arg(long = "jurisdiction", value_name = "ID")]
    jurisdiction_ids: Vec<String>,
}

type Loader = fn(&dyn Service, &mut Store, bool, &CancellationToken) -> Result<LoadOutcome>;

/// Read-only [`Service`] over a saved API response.
struct FixtureService {
    path: String,
    rows: Vec<Value>,
}

impl FixtureService {
    fn open(path: &Path) -> Result<Self> {
        let body = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let value: Value = serde_json::from_str(&body)
            .with_context(|| format!("{} is not valid JSON", path.display()))?;
        let rows = match value {
            Value::Array(rows) => rows,
            other => vec![other],
        };
        Ok(Self { path: path.display().to_string(), rows })
    }
}

impl Service for FixtureService {
    fn endpoint(&self) -> &str {
        &self.path
    }

    fn list(&self, _params: &ListParams) -> Result<Vec<Value>> {
        Ok(self.rows.clone())
    }

    fn read(&self, id: &str) -> Result<Value> {
        self.rows
            .iter()
            .find(|row| {
                ["identifier", "id"]
                    .iter()
                    .any(|field| row.get(field).and_then(Value::as_str) == Some(id))
            })
            .cloned()
            .ok_or_else(|| anyhow!("{id} not found in {}", self.path))
    }

    fn create(&self, _payload: &Value) -> Result<Value> {
        bail!("{} is a read-only fixture", self.path)
    }

    fn update(&self, _payload: &Value) -> Result<Value> {
        bail!("{} is a read-only fixture", self.path)
    }

    fn delete(&self, _payload: &Value) -> Result<()> {
        bail!("{} is a read-only fixture", self.path)
    }
}

/// Resolved settings plus the lazily built HTTP client.
struct Session {
    config: ApiConfig,
    client: Option<OpenSrpClient>,
    cancel: CancellationToken,
}

impl Session {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => ApiConfig::from_path(path)?,
            None => ApiConfig::default(),
        };
        if let Some(url) = &cli.api_base_url {
            config.api_base_url.clone_from(url);
        }
        if let Some(token) = &cli.token {
            config.access_token = Some(token.clone());
        }
        Ok(Self { config, client: None, cancel: CancellationToken::new() })
    }

    fn service(&mut self, endpoint: &str) -> Result<Box<dyn Service>> {
        if self.client.is_none() {
            self.client = Some(OpenSrpClient::new(&self.config).context("cannot --fetch")?);
        }
        let client = self.client.as_ref().ok_or_else(|| anyhow!("OpenSRP client unavailable"))?;
        Ok(Box::new(client.service(endpoint)))
    }

    /// Apply every `--from` batch in order, then the live fetch when asked.
    fn populate(
        &mut self,
        source: &SourceArgs,
        store: &mut Store,
        endpoint: Option<String>,
        load: Loader,
    ) -> Result<()> {
        if source.from.is_empty() && !source.fetch {
            bail!("one of --from <FILE> or --fetch is required");
        }
        for path in &source.from {
            let fixture = FixtureService::open(path)?;
            load(&fixture, store, source.overwrite, &self.cancel)?;
        }
        if source.fetch {
            let endpoint =
                endpoint.ok_or_else(|| anyhow!("no endpoint is configured for this resource"))?;
            let service = self.service(&endpoint)?;
            load(service.as_ref(), store, source.overwrite, &self.cancel)?;
        }
        Ok(())
    }

    /// Resolve the `--user` filter: `None` when inactive, the user's plan ids otherwise.
    fn user_plan_ids(
        &mut self,
        user: &UserFilterArgs,
        fetch: bool,
        store: &mut Store,
    ) -> Result<Option<Arc<Vec<String>>>> {
        let Some(user_name) = user.user.as_deref() else {
            return Ok(None);
        };
        for path in &user.assignments {
            load_plans_by_user(&FixtureService::open(path)?, store, user_name, &self.cancel)?;
        }
        if fetch {
            let endpoint = self.config.endpoints.plans_for_user(user_name);
            let service = self.service(&endpoint)?;
            load_plans_by_user(service.as_ref(), store, user_name, &self.cancel)?;
        }
        Ok(make_plans_by_user_names_selector().select(store, Some(user_name))?)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

/// `{count, items, no_data_message?}`; the message only appears for an empty listing.
fn listing<T: Serialize>(items: &[T], empty_message: NoDataMessage) -> Result<Value> {
    let mut object = serde_json::Map::new();
    object.insert("count".to_string(), Value::from(items.len()));
    object.insert("items".to_string(), serde_json::to_value(items)?);
    if items.is_empty() {
        object.insert("no_data_message".to_string(), serde_json::to_value(empty_message)?);
    }
    Ok(Value::Object(object))
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

fn parse_statuses(values: &[String]) -> Option<Vec<PlanStatus>> {
    (!values.is_empty()).then(|| values.iter().cloned().map(PlanStatus::from).collect())
}

fn parse_intervention_types(values: &[String]) -> Option<Vec<InterventionType>> {
    (!values.is_empty()).then(|| values.iter().cloned().map(InterventionType::from).collect())
}

/// Intersect the user's assignments with any explicit `--plan-id` list.
fn combine_plan_ids(
    user_plan_ids: Option<&Arc<Vec<String>>>,
    explicit: &[String],
) -> Option<Vec<String>> {
    match (user_plan_ids, non_empty(explicit)) {
        (None, explicit) => explicit,
        (Some(assigned), None) => Some(assigned.as_ref().clone()),
        (Some(assigned), Some(explicit)) => {
            Some(assigned.iter().filter(|id| explicit.contains(id)).cloned().collect())
        }
    }
}

fn user_empty_message(user_plan_ids: Option<&Arc<Vec<String>>>) -> NoDataMessage {
    no_data_message(user_plan_ids.map(|ids| ids.as_slice()))
}

fn run_plans(args: &PlansArgs, session: &mut Session, store: &mut Store) -> Result<Value> {
    let endpoint = session.config.endpoints.plan_rows.clone();
    session.populate(&args.source, store, endpoint, load_plans)?;
    let user_plan_ids = session.user_plan_ids(&args.user, args.source.fetch, store)?;

    let filters = PlanFilters {
        intervention_types: parse_intervention_types(&args.intervention_types),
        status_list: parse_statuses(&args.statuses),
        reason: args.reason.clone().map(FiReason::from),
        title: args.title.clone(),
        parent_jurisdiction_id: args.parent_jurisdiction.clone(),
        jurisdiction_ids: non_empty(&args.jurisdiction_ids),
        plan_ids: combine_plan_ids(user_plan_ids.as_ref(), &args.plan_ids),
    };
    let mut plans = make_plans_array_selector().select(store, &filters)?.as_ref().clone();
    if args.sort_by_date {
        sort_by_date_desc(&mut plans, |plan| plan.plan_date.as_deref());
    }
    listing(&plans, user_empty_message(user_plan_ids.as_ref()))
}

fn run_plan_definitions(
    args: &PlanDefinitionsArgs,
    session: &mut Session,
    store: &mut Store,
) -> Result<Value> {
    let endpoint = Some(session.config.endpoints.plans.clone());
    session.populate(&args.source, store, endpoint, load_plan_definitions)?;
    let user_plan_ids = session.user_plan_ids(&args.user, args.source.fetch, store)?;
    let plan_ids = combine_plan_ids(user_plan_ids.as_ref(), &args.plan_ids);
    let empty_message = user_empty_message(user_plan_ids.as_ref());

    if args.records {
        let filters = PlanFilters {
            intervention_types: parse_intervention_types(&args.intervention_types),
            status_list: parse_statuses(&args.statuses),
            title: args.title.clone(),
            jurisdiction_ids: non_empty(&args.jurisdiction_ids),
            plan_ids,
            ..PlanFilters::default()
        };
        let mut records = make_plan_records_array_selector().select(store, &filters)?.as_ref().clone();
        if args.sort_by_date {
            sort_by_date_desc(&mut records, |record| record.plan_date.as_deref());
        }
        return listing(&records, empty_message);
    }

    let filters = PlanDefinitionFilters {
        intervention_types: parse_intervention_types(&args.intervention_types),
        status_list: parse_statuses(&args.statuses),
        title: args.title.clone(),
        jurisdiction_ids: non_empty(&args.jurisdiction_ids),
        plan_ids,
    };
    let mut definitions =
        make_plan_definitions_array_selector().select(store, &filters)?.as_ref().clone();
    if args.sort_by_date {
        sort_by_date_desc(&mut definitions, |definition| definition.date.as_deref());
    }
    listing(&definitions, empty_message)
}

fn run_organizations(
    args: &OrganizationsArgs,
    session: &mut Session,
    store: &mut Store,
) -> Result<Value> {
    let endpoint = Some(session.config.endpoints.organizations.clone());
    session.populate(&args.source, store, endpoint, load_organizations)?;
    let filters = OrganizationFilters {
        name: args.name.clone(),
        ids: non_empty(&args.ids),
        active_only: args.active_only,
    };
    let organizations = make_organizations_array_selector().select(store, &filters)?;
    listing(organizations.as_slice(), NoDataMessage::NoDataFound)
}

fn parse_role_batch(raw: &str) -> Result<(String, PathBuf)> {
    let (organization_id, path) = raw
        .split_once('=')
        .filter(|(organization_id, path)| !organization_id.is_empty() && !path.is_empty())
        .ok_or_else(|| anyhow!("--roles expects ORGANIZATION_ID=FILE, got {raw}"))?;
    Ok((organization_id.to_string(), PathBuf::from(path)))
}

fn run_practitioners(
    args: &PractitionersArgs,
    session: &mut Session,
    store: &mut Store,
) -> Result<Value> {
    let endpoint = Some(session.config.endpoints.practitioners.clone());
    session.populate(&args.source, store, endpoint, load_practitioners)?;

    for raw in &args.roles {
        let (organization_id, path) = parse_role_batch(raw)?;
        let fixture = FixtureService::open(&path)?;
        load_practitioner_roles(&fixture, store, &organization_id, &session.cancel)?;
    }
    if let (true, Some(organization_id)) = (args.source.fetch, args.organization.as_deref()) {
        let endpoint = session.config.endpoints.practitioners_for_organization(organization_id);
        let service = session.service(&endpoint)?;
        load_practitioner_roles(service.as_ref(), store, organization_id, &session.cancel)?;
    }

    if args.unassigned {
        let practitioners = unassigned_practitioners(store)?;
        return listing(&practitioners, NoDataMessage::NoDataFound);
    }

    let filters = PractitionerFilters {
        name: args.name.clone(),
        organization_id: args.organization.clone(),
        active_only: args.active_only,
    };
    let practitioners = make_practitioners_array_selector().select(store, &filters)?;
    listing(practitioners.as_slice(), NoDataMessage::NoDataFound)
}

fn run_files(args: &FilesArgs, session: &mut Session, store: &mut Store) -> Result<Value> {
    let endpoint = Some(session.config.endpoints.files.clone());
    session.populate(&args.source, store, endpoint, load_files)?;
    let filters = FileFilters { file_name: args.file_name.clone() };
    let mut files = make_files_array_selector().select(store, &filters)?.as_ref().clone();
    if args.sort_by_date {
        sort_by_date_desc(&mut files, |file| file.upload_date.as_deref());
    }
    listing(&files, NoDataMessage::NoDataFound)
}

fn run_metadata(args: &MetadataArgs, session: &mut Session, store: &mut Store) -> Result<Value> {
    let endpoint = Some(session.config.endpoints.settings.clone());
    session.populate(&args.source, store, endpoint, load_jurisdictions_metadata)?;
    let filters = MetadataFilters {
        metric: args.metric.clone(),
        jurisdiction_ids: non_empty(&args.jurisdiction_ids),
    };
    let metadata = make_jurisdictions_metadata_selector().select(store, &filters)?;
    listing(metadata.as_slice(), NoDataMessage::NoDataFound)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut session = Session::from_cli(&cli)?;
    let mut store = Store::new(ReducerRegistry::with_default_slices());

    let payload = match &cli.command {
        Command::Plans(args) => run_plans(args, &mut session, &mut store),
        Command::PlanDefinitions(args) => run_plan_definitions(args, &mut session, &mut store),
        Command::Organizations(args) => run_organizations(args, &mut session, &mut store),
        Command::Practitioners(args) => run_practitioners(args, &mut session, &mut store),
        Command::Files(args) => run_files(args, &mut session, &mut store),
        Command::Metadata(args) => run_metadata(args, &mut session, &mut store),
    }?;
    emit_json(payload)
}
