use std::path::PathBuf;
use crate::cli::commands::ValidateArgs;
use crate::config::parse_config;
use crate::config::parser::build_catalog;
use crate::errors::FlowscopeError;

pub async fn handle_validate(args: ValidateArgs) -> Result<(), FlowscopeError> {
    let path = PathBuf::from(&args.config);
    let config = parse_config(&path).await?;
    let catalog = build_catalog(&config)?;
    println!(
        "Configuration is valid: {} ({} tasks available)",
        args.config,
        catalog.tasks().len()
    );
    Ok(())
}
