use std::{fs::File, io::Write, process::ExitCode, time::Duration};

use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{
    Backend, CredentialResolver, Dashboard, DistributionBase, ExpenseFilter, ExpenseSource,
    PowerBiClient, PowerBiCredentials, PowerBiSource, SeaOrmConnector, SqlSettings, SqlSource,
    export,
};

use crate::{error::Result, settings::Settings};

mod error;
mod render;
mod settings;

#[derive(Parser, Debug)]
#[command(name = "opex")]
#[command(about = "Operating-expenses report from Power BI or the accounting database")]
struct Cli {
    /// Settings file (TOML).
    #[arg(long, env = "OPEX_CONFIG", default_value = settings::DEFAULT_CONFIG_PATH)]
    config: String,
    /// Override the configured backend.
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    PowerBi,
    Sql,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::PowerBi => Backend::PowerBi,
            BackendArg::Sql => Backend::Sql,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the table and print the record count and KPIs.
    Fetch,
    /// Print KPIs and the aggregated tables.
    Report(FilterArgs),
    /// Write the filtered detail table as CSV.
    Export(ExportArgs),
    /// Re-print KPIs periodically, served from the cache until it expires.
    Watch(WatchArgs),
}

#[derive(Args, Debug)]
struct FilterArgs {
    #[arg(long)]
    year: Vec<i32>,
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Vec<u32>,
    #[arg(long)]
    department: Vec<String>,
    #[arg(long, value_parser = render::parse_distribution)]
    distribution: Vec<DistributionBase>,
}

impl From<FilterArgs> for ExpenseFilter {
    fn from(args: FilterArgs) -> Self {
        ExpenseFilter {
            years: args.year,
            months: args.month,
            departments: args.department,
            distribution_bases: args.distribution,
        }
    }
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    filter: FilterArgs,
    #[arg(long, short, default_value = "operating_expenses.csv")]
    output: String,
}

#[derive(Args, Debug)]
struct WatchArgs {
    #[command(flatten)]
    filter: FilterArgs,
    /// Seconds between renders.
    #[arg(long, default_value_t = 60)]
    interval: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = match Settings::new(&cli.config) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("failed to load settings: {err}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "opex={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    match run(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, settings: Settings) -> Result<()> {
    let backend = cli.backend.map(Backend::from).unwrap_or(settings.source.backend);
    let dashboard = Dashboard::builder()
        .source(build_source(&settings, backend))
        .ttl(settings.ttl())
        .build()?;
    tracing::info!(%backend, ttl_secs = settings.cache.ttl_secs, "dashboard ready");

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Fetch => {
            let table = dashboard.expenses().await?;
            render::header(&mut stdout, &table, table.len())?;
            render::kpis(&mut stdout, &table.records)?;
        }
        Command::Report(args) => {
            let table = dashboard.expenses().await?;
            let records = ExpenseFilter::from(args).apply(&table.records);
            render::header(&mut stdout, &table, records.len())?;
            render::report(&mut stdout, &records)?;
        }
        Command::Export(args) => {
            let table = dashboard.expenses().await?;
            let records = ExpenseFilter::from(args.filter).apply(&table.records);
            let file = File::create(&args.output)?;
            export::write_csv(&records, file)?;
            writeln!(stdout, "wrote {} records to {}", records.len(), args.output)?;
        }
        Command::Watch(args) => {
            let filter = ExpenseFilter::from(args.filter);
            let mut ticker = tokio::time::interval(Duration::from_secs(args.interval.max(1)));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = tokio::signal::ctrl_c() => break,
                }
                let table = dashboard.expenses().await?;
                let records = filter.apply(&table.records);
                writeln!(stdout)?;
                render::header(&mut stdout, &table, records.len())?;
                render::kpis(&mut stdout, &records)?;
                stdout.flush()?;
            }
        }
    }
    Ok(())
}

fn build_source(settings: &Settings, backend: Backend) -> ExpenseSource {
    let resolver = CredentialResolver::from_file(&settings.secrets_path);
    match backend {
        Backend::PowerBi => {
            let client = PowerBiClient::default()
                .token_url(&settings.power_bi.token_url)
                .scope(&settings.power_bi.scope)
                .api_base(&settings.power_bi.api_base);
            let mut source = PowerBiSource::new(client, PowerBiCredentials::resolve(&resolver))
                .query(&settings.power_bi.query);
            if let Some(policy) = settings.source.failure_policy {
                source = source.policy(policy);
            }
            source.into()
        }
        Backend::Sql => {
            let connector =
                SeaOrmConnector::default().connect_timeout(settings.sql.connect_timeout());
            let mut source = SqlSource::new(
                connector,
                SqlSettings::resolve(&resolver, settings.sql.dialect),
            )
            .cutoff(settings.sql.cutoff);
            if let Some(policy) = settings.source.failure_policy {
                source = source.policy(policy);
            }
            source.into()
        }
    }
}
