//! The `config` command: configuration inspection.

use crate::cli::{ConfigAction, ConfigArgs};
use crate::config::{ConfigService, ProductionConfigService};
use crate::{Result, error::HanToneError};

/// Execute `hantone config`.
pub fn execute(args: ConfigArgs, config_service: &dyn ConfigService) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let config = config_service.get_config()?;
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| HanToneError::config(format!("serialization: {e}")))?;
            println!("{rendered}");
        }
        ConfigAction::Path => {
            let config = config_service.get_config()?;
            match &config.loaded_from {
                Some(path) => println!("{}", path.display()),
                None => println!(
                    "{} (not present, defaults in effect)",
                    ProductionConfigService::default_config_path()?.display()
                ),
            }
        }
    }
    Ok(())
}
