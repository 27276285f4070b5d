//! Command dispatch

use std::io;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplyOutcome, EditorState, TreeController};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::{
    ActiveItem, AddCommand, ChainId, DeleteCommand, DragEnd, DropTarget, EditCommand,
    ElementTypeId, MoveCommand, NodeId, TreeNodeConvert,
};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::RemoteOperation;

/// Entry point: commands that need no backend run directly, the rest get a container.
pub async fn execute_command(cli: &Cli) -> CliResult<()> {
    let command = match &cli.command {
        Some(command) => command,
        None => {
            return Err(CliError::Usage(
                "no command given, see --help".to_string(),
            ))
        }
    };

    match command {
        Commands::Completion { shell } => {
            print_completions(*shell);
            Ok(())
        }
        Commands::Config { command } => execute_config(cli, command),
        _ => {
            let container = ServiceContainer::new(load_settings(cli)?)?;
            run(&container, command).await
        }
    }
}

/// Run a backend command against an already wired container.
#[instrument(level = "debug", skip(container))]
pub async fn run(container: &ServiceContainer, command: &Commands) -> CliResult<()> {
    let controller = container.controller.as_ref();
    match command {
        Commands::Show { chain } => {
            let chain_id = chain_arg(chain)?;
            controller.load(&chain_id).await?;
            print_tree(&controller.state());
            Ok(())
        }
        Commands::Types => types(container).await,
        Commands::Add {
            chain,
            element_type,
            parent,
        } => {
            let chain_id = chain_arg(chain)?;
            let command = AddCommand {
                element_type_id: ElementTypeId::from(element_type.as_str()),
                parent_id: parent.as_deref().map(NodeId::from),
                chain_id: chain_id.clone(),
            };
            edit(controller, &chain_id, command.into()).await
        }
        Commands::Move { chain, node, parent } => {
            let command = MoveCommand {
                node_id: NodeId::from(node.as_str()),
                new_parent_id: parent.as_deref().map(NodeId::from),
            };
            edit(controller, &chain_arg(chain)?, command.into()).await
        }
        Commands::Delete { chain, node } => {
            let command = DeleteCommand {
                node_id: NodeId::from(node.as_str()),
            };
            edit(controller, &chain_arg(chain)?, command.into()).await
        }
        Commands::Drop {
            chain,
            active,
            kind,
            target,
        } => {
            let chain_id = chain_arg(chain)?;
            controller.load(&chain_id).await?;
            let event = DragEnd {
                active: ActiveItem {
                    id: active.clone(),
                    kind: (*kind).into(),
                },
                over: target.as_deref().map(DropTarget::new),
            };
            let outcome = controller.handle_drop(&event).await?;
            report(&outcome, &format!("drop {active}"));
            print_tree(&controller.state());
            Ok(())
        }
        Commands::Config { .. } | Commands::Completion { .. } => Err(CliError::Usage(
            "command does not need a backend".to_string(),
        )),
    }
}

fn chain_arg(chain: &str) -> CliResult<ChainId> {
    let chain = chain.trim();
    if chain.is_empty() {
        return Err(CliError::InvalidArgs("chain id must not be empty".to_string()));
    }
    Ok(ChainId::from(chain))
}

async fn edit(
    controller: &TreeController,
    chain_id: &ChainId,
    command: EditCommand,
) -> CliResult<()> {
    controller.load(chain_id).await?;
    let description = command.to_string();
    let outcome = controller.apply(command).await?;
    report(&outcome, &description);
    print_tree(&controller.state());
    Ok(())
}

async fn types(container: &ServiceContainer) -> CliResult<()> {
    let element_types = container
        .gateway
        .fetch_element_types()
        .await
        .map_err(|e| ApplicationError::remote(RemoteOperation::FetchElementTypes, e))?;

    output::header(&format!("{} element types", element_types.len()));
    element_types.iter().for_each(output::element_type);
    Ok(())
}

fn report(outcome: &ApplyOutcome, description: &str) {
    match outcome {
        ApplyOutcome::Unchanged => output::unchanged(description),
        ApplyOutcome::Applied { created } => output::applied(description, created.as_ref()),
    }
}

fn print_tree(state: &EditorState) {
    if let Some(chain) = &state.chain {
        let title = format!("{} (chain {})", chain.name, chain.id);
        output::info(&chain.tree.to_tree_string(&title));
    }
    if let Some(error) = &state.error {
        output::warning(error);
    }
}

/// Layered settings plus the `--api` override.
pub fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(api) = &cli.api {
        debug!("api base url overridden: {}", api);
        settings.api_base_url = api.clone();
    }
    Ok(settings)
}

fn execute_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => match global_config_path() {
            Some(path) => output::config_location("global", &path),
            None => output::warning("cannot determine config directory"),
        },
    }
    Ok(())
}

fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
