use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use takken_planner::assets::AssetPools;
use takken_planner::config::EngineConfig;
use takken_planner::links::{
    pick_related_link, register_published_link, ContentKey, FileLinkPoolRepository,
    RelatedLinkRequest,
};
use takken_planner::season::seasonal_copy_context;
use takken_planner::traffic::TrafficProfileStore;
use takken_planner::{generate_day_topics, DayTopics};

#[derive(Parser)]
#[command(name = "takken-planner", about = "Deterministic daily content-slot planner")]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Plan(PlanArgs),
    RegisterLink(RegisterLinkArgs),
    RelatedLink(RelatedLinkArgs),
    Season(SeasonArgs),
}

#[derive(Args, Debug, Clone)]
struct PlanArgs {
    #[arg(long)]
    date: String,
    #[arg(long, default_value_t = 0)]
    salt: u32,
    #[arg(long)]
    assets: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct RegisterLinkArgs {
    #[arg(long)]
    url: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    date: String,
    #[arg(long)]
    published_at: Option<String>,
    #[arg(long)]
    variant: bool,
}

#[derive(Args, Debug, Clone)]
struct RelatedLinkArgs {
    #[arg(long)]
    date: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    takkenai_url: String,
    #[arg(long = "exclude")]
    exclude_urls: Vec<String>,
    #[arg(long)]
    cooldown_days: Option<u32>,
    #[arg(long)]
    variant: bool,
}

#[derive(Args, Debug, Clone)]
struct SeasonArgs {
    #[arg(long)]
    date: String,
}

fn main() {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let (config, _) = EngineConfig::load(cli.config.clone())?;

    match cli.command {
        Command::Plan(args) => run_plan(args, &config),
        Command::RegisterLink(args) => run_register_link(args, &config),
        Command::RelatedLink(args) => run_related_link(args, &config),
        Command::Season(args) => run_season(args),
    }
}

fn run_plan(args: PlanArgs, config: &EngineConfig) -> Result<(), String> {
    let pools = match args.assets.as_ref() {
        Some(path) => AssetPools::load(path)?,
        None => AssetPools::builtin(),
    };
    let traffic = TrafficProfileStore::new(PathBuf::from(&config.traffic.profile_file));
    let day = generate_day_topics(&args.date, args.salt, &pools, &traffic)?;

    if args.json {
        let payload = serde_json::to_string_pretty(&day)
            .map_err(|err| format!("failed to serialize day topics: {}", err))?;
        println!("{}", payload);
        return Ok(());
    }

    print_day_topics(&day);
    Ok(())
}

fn print_day_topics(day: &DayTopics) {
    println!("Date: {}", day.date);
    for (topic, plan) in day.topics.iter().zip(day.plans.iter()) {
        println!();
        println!("[{}] {}", topic.platform.label(), topic.topic_label());
        println!("  phase: {}", topic.phase_label);
        println!(
            "  asset: {} ({})",
            topic.asset.title(),
            topic.asset.asset_type().label()
        );
        if let Some(secondary) = topic.secondary_asset.as_ref() {
            println!("  secondary asset: {}", secondary.title());
        }
        println!("  destination: {}", topic.takkenai_url);
        match topic.url_tier {
            Some(tier) => println!("  url selection: traffic profile ({})", tier.label()),
            None => println!("  url selection: asset"),
        }
        if topic.fallback_used {
            println!("  note: fallback slot (destination may collide)");
        }
        println!("  angle: {}", plan.angle);
        println!("  suggested title: {}", plan.suggested_title);
        println!("  target length: {}-{} chars", plan.min_chars, plan.max_chars);
    }
}

fn run_register_link(args: RegisterLinkArgs, config: &EngineConfig) -> Result<(), String> {
    let repo = FileLinkPoolRepository::new(PathBuf::from(&config.links.pool_file));
    let content_key = if args.variant {
        ContentKey::Variant
    } else {
        ContentKey::Standard
    };
    let item = register_published_link(
        &repo,
        &args.url,
        &args.title,
        &args.date,
        args.published_at.as_deref(),
        content_key,
    )?;
    println!("Registered: {} ({})", item.canonical_url, item.account);
    Ok(())
}

fn run_related_link(args: RelatedLinkArgs, config: &EngineConfig) -> Result<(), String> {
    let repo = FileLinkPoolRepository::new(PathBuf::from(&config.links.pool_file));
    let content_key = if args.variant {
        ContentKey::Variant
    } else {
        ContentKey::Standard
    };
    let generated_dir = PathBuf::from(&config.links.generated_dir);
    let request = RelatedLinkRequest {
        date: &args.date,
        content_key,
        title: &args.title,
        takkenai_url: &args.takkenai_url,
        generated_dir: Some(Path::new(&generated_dir)),
        exclude_urls: &args.exclude_urls,
        cooldown_days: args.cooldown_days.unwrap_or(config.links.cooldown_days),
        enabled: config.links.enabled,
    };

    match pick_related_link(&repo, &request)? {
        Some(candidate) => {
            println!("Related link: {}", candidate.url);
            println!("  title: {}", candidate.title);
            println!("  account: {}", candidate.account);
        }
        None => println!("No related link available."),
    }
    Ok(())
}

fn run_season(args: SeasonArgs) -> Result<(), String> {
    let context = seasonal_copy_context(&args.date)?;
    println!("{}", context);
    Ok(())
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}
