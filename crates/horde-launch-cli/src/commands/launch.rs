//! Launch command - pick a model and parameters, then start the server in tmux.

use horde_launch::{
    collect_advanced, collect_gen_length, find_models, name_lookup, resolve_public_name,
    select_context, select_model, Console, ContextCatalog, ContextSizes, LaunchCommand,
    LaunchOutcome, LaunchRequest,
};
use std::path::Path;

use super::{load_config, report, session_manager};

pub(crate) fn run(
    config_path: Option<&Path>,
    detach: bool,
    server_args: &[String],
) -> miette::Result<()> {
    let config = load_config(config_path)?;
    let defaults = config.defaults();

    let candidates =
        find_models(config.models_dir(), &defaults.model_extension).map_err(report)?;

    let mut console = Console::stdio();

    let model = select_model(&mut console, &candidates).map_err(report)?;
    let lookup = name_lookup(&config);
    let public_name = resolve_public_name(
        &mut console,
        lookup.as_ref(),
        &model.path,
        config.reference_db(),
    )
    .map_err(report)?;
    let model = model.with_public_name(public_name);

    let catalog = ContextCatalog::new(defaults.context_sizes.clone());
    let local = select_context(&mut console, &catalog, defaults.context, "Local context size")
        .map_err(report)?;
    let horde = select_context(
        &mut console,
        &catalog,
        defaults.horde_context,
        "Max context advertised to the Horde",
    )
    .map_err(report)?;
    let gen_length = collect_gen_length(&mut console, &defaults.gen_length).map_err(report)?;
    let advanced = collect_advanced(&mut console, defaults).map_err(report)?;

    let command = LaunchCommand::build(&LaunchRequest {
        config: &config,
        model: &model,
        context: ContextSizes { local, horde },
        gen_length: &gen_length,
        advanced: &advanced,
        extra_args: server_args,
    });

    console.say("").map_err(report)?;
    console
        .say(format_args!("Launching {}", model.display_name()))
        .map_err(report)?;
    console
        .say(format_args!("  {}", command.to_redacted_line()))
        .map_err(report)?;

    let mut sessions = session_manager(&config).with_attach(!detach);
    let outcome = sessions.launch(&mut console, &command).map_err(report)?;

    match outcome {
        LaunchOutcome::Created => tracing::info!("Started session '{}'", sessions.name()),
        LaunchOutcome::Replaced => tracing::info!("Replaced session '{}'", sessions.name()),
        LaunchOutcome::Reused => tracing::info!("Reused session '{}'", sessions.name()),
    }

    Ok(())
}
