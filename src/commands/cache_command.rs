//! The `cache` command: result cache management.

use crate::cli::{CacheAction, CacheArgs, print_success};
use crate::config::ConfigService;
use crate::core::ComponentFactory;
use crate::Result;

/// Execute `hantone cache`.
pub async fn execute(args: CacheArgs, config_service: &dyn ConfigService) -> Result<()> {
    let factory = ComponentFactory::new(config_service)?;
    let cache = factory.create_result_cache();

    match args.action {
        CacheAction::Clear => {
            let removed = cache.clear().await?;
            print_success(&format!("Removed {removed} cached result(s)"));
        }
        CacheAction::Stats => {
            let config = &factory.config().cache;
            println!("enabled:     {}", config.enabled);
            println!("ttl:         {} s", config.ttl_seconds);
            println!("max entries: {}", config.max_entries);
            match &config.directory {
                Some(dir) => {
                    let files = std::fs::read_dir(dir)
                        .map(|entries| {
                            entries
                                .filter_map(|e| e.ok())
                                .filter(|e| {
                                    e.path().extension().is_some_and(|ext| ext == "json")
                                })
                                .count()
                        })
                        .unwrap_or(0);
                    println!("directory:   {} ({files} persisted entries)", dir.display());
                }
                None => println!("directory:   (memory only)"),
            }
        }
    }
    Ok(())
}
