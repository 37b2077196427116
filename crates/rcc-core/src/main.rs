//! `rcc` command-line front end

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rcc_core::{
    AssociationLinkRequest, Controller, ControllerConfig, ExpandTarget, FormData, GeneratorKind,
    ResourceId, ResourceRef, TargetSpec,
};
use std::path::PathBuf;

fn resource_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("kind").required(true).help("Resource kind, e.g. Company"))
        .arg(Arg::new("id").required(true).help("Resource id"))
}

fn field_arg() -> Arg {
    Arg::new("field")
        .long("field")
        .action(ArgAction::Append)
        .value_name("KEY=VALUE")
        .help("Form field sent with the request (repeatable)")
}

fn cli() -> Command {
    Command::new("rcc")
        .version(rcc_core::VERSION)
        .about("Resource console controller")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .global(true)
                .help("Server base URL (overrides config and RCC_BASE_URL)"),
        )
        .subcommand(resource_args(Command::new("show").about("Show a resource view")))
        .subcommand(
            Command::new("list")
                .about("Open the list of a resource kind")
                .arg(Arg::new("kind").required(true)),
        )
        .subcommand(Command::new("back").about("Go back one step"))
        .subcommand(resource_args(Command::new("diagram").about("Render the diagram of a resource")))
        .subcommand(
            resource_args(Command::new("edit").about("Update one attribute"))
                .arg(Arg::new("attribute").required(true))
                .arg(Arg::new("value").required(true)),
        )
        .subcommand(
            resource_args(Command::new("link").about("Link an association"))
                .arg(Arg::new("target-kind").required(true))
                .arg(
                    Arg::new("existing")
                        .long("existing")
                        .value_name("ID")
                        .conflicts_with("field")
                        .help("Link an existing target instead of creating one"),
                )
                .arg(Arg::new("association").long("association").help("Association name"))
                .arg(field_arg()),
        )
        .subcommand(
            resource_args(Command::new("generate").about("Run a generator"))
                .arg(
                    Arg::new("generator")
                        .long("generator")
                        .default_value("report")
                        .help("report, graph or comparison"),
                )
                .arg(field_arg()),
        )
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<ControllerConfig> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::new(),
    };
    let mut config = config.apply_env()?;
    if let Some(url) = matches.get_one::<String>("base-url") {
        config = config.with_base_url(url.clone());
    }
    config.validate()?;
    Ok(config)
}

fn resource(args: &ArgMatches) -> anyhow::Result<ResourceRef> {
    let kind = args.get_one::<String>("kind").context("missing kind")?;
    let id = args.get_one::<String>("id").context("missing id")?;
    Ok(ResourceRef::new(kind.as_str(), id.as_str()))
}

fn form(args: &ArgMatches) -> anyhow::Result<FormData> {
    let mut form = FormData::new();
    for pair in args.get_many::<String>("field").into_iter().flatten() {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("--field expects KEY=VALUE, got `{pair}`");
        };
        form.push(key, value);
    }
    Ok(form)
}

async fn run(matches: ArgMatches) -> anyhow::Result<()> {
    let config = load_config(&matches)?;
    tracing::debug!(base_url = %config.base_url, "configuration loaded");
    let controller = Controller::connect(config)?;

    match matches.subcommand() {
        Some(("show", args)) => controller.show_resource(&resource(args)?).await?,
        Some(("list", args)) => {
            let kind = args.get_one::<String>("kind").context("missing kind")?;
            let list = controller.open_resource_list(kind).await?;
            if !list.extra.is_empty() {
                println!("{}", serde_json::to_string_pretty(&list.extra)?);
            }
        }
        Some(("back", _)) => {
            let outcome = controller.go_back().await?;
            tracing::info!(?outcome, "back");
        }
        Some(("diagram", args)) => {
            controller
                .expand_node(&resource(args)?, ExpandTarget::TopLevel)
                .await?;
        }
        Some(("edit", args)) => {
            let target = resource(args)?;
            let attribute = args.get_one::<String>("attribute").context("missing attribute")?;
            let value = args.get_one::<String>("value").context("missing value")?;
            controller.show_resource(&target).await?;
            let field_id = controller
                .bindings()
                .iter()
                .find_map(|(id, binding)| match binding {
                    rcc_core::Binding::Field(f) if f.resource == target && &f.attribute_key == attribute => {
                        Some(id.to_string())
                    }
                    _ => None,
                })
                .with_context(|| format!("{target} has no editable `{attribute}`"))?;
            controller.open_editor(&field_id)?;
            controller.commit_editor(&field_id, value).await?;
        }
        Some(("link", args)) => {
            let source = resource(args)?;
            let target_kind = args.get_one::<String>("target-kind").context("missing target kind")?;
            let target = match args.get_one::<String>("existing") {
                Some(id) => TargetSpec::Existing(ResourceId::new(id.as_str())),
                None => TargetSpec::New(form(args)?),
            };
            let mut request = AssociationLinkRequest::new(source, target_kind.as_str(), target);
            if let Some(name) = args.get_one::<String>("association") {
                request = request.with_association_name(name.as_str());
            }
            let report = controller.link_association(request).await?;
            tracing::info!(saga = %report.id, target = %report.target, "linked");
        }
        Some(("generate", args)) => {
            let generator = args
                .get_one::<String>("generator")
                .context("missing generator")?
                .parse::<GeneratorKind>()
                .map_err(anyhow::Error::msg)?;
            let region = controller.config().results_region.clone();
            controller
                .run_generator(generator, &resource(args)?, form(args)?, &region)
                .await?;
        }
        _ => bail!("unknown command"),
    }

    println!("{}", controller.results_html()?);
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli().get_matches()).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
