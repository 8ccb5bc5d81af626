use anyhow::Result;
use gob_config::ConfigManager;

use crate::logger::Logger;

pub fn check(config: &ConfigManager) -> Result<()> {
    let mut logger = Logger::default();
    let settings = config.controller();

    logger.system(&format!(
        "config version {}, controller `{}`, grace period {:?}, stop policy {:?}",
        config.config().version,
        settings.name,
        settings.grace_period,
        settings.stop
    ));

    let services = config.get_all_service_definitions();
    if services.is_empty() {
        logger.error("no services configured");
        return Ok(());
    }

    for (name, definition) in services {
        let line = match &definition.start_command {
            Some(cmd) if name == &settings.name => format!("{cmd} (controller, not supervised)"),
            Some(cmd) => cmd.clone(),
            None => "no start command, listed only".to_owned(),
        };
        logger.log(name, &line);
        if let Some(dir) = &definition.working_dir {
            logger.log(name, &format!("working dir: {}", dir.display()));
        }
        if let Some(stop) = &definition.stop_command {
            logger.log(name, &format!("stop command: {stop}"));
        }
    }

    Ok(())
}
