use std::process::exit;

use ticketing::config;

use crate::cli::{ConfigCommand, UpdateConfiguration};

fn list_and_exit() {
    println!(
        "Configuration file {}:\n",
        config::configuration_file().to_string_lossy()
    );

    match config::load() {
        Ok(config) => match config::application_config_to_string(&config) {
            Ok(toml_as_string) => println!("{toml_as_string}"),
            Err(e) => eprintln!("ERROR: Unable to format the configuration: {e}"),
        },
        Err(_) => {
            println!("Config file does not exist or is empty. Use 'tickets config update --url' to create it");
        }
    }
    exit(0);
}

fn update_and_exit(update: UpdateConfiguration) {
    let mut app_config = match config::load_or_default() {
        Ok(ac) => ac,
        Err(e) => {
            eprintln!(
                "ERROR: Unable to load or create configuration file {}, reason:{}",
                config::configuration_file().to_string_lossy(),
                e
            );
            exit(4);
        }
    };
    if let Some(url) = update.url {
        app_config.server.api.url = url;
    }
    if let Some(timeout) = update.timeout {
        app_config.server.api.request_timeout_secs = timeout;
    }
    if let Some(autosave) = update.autosave {
        app_config.server.autosave_interval_secs = autosave.max(1);
    }
    if let Some(local_db) = update.local_db {
        app_config.application_data.local_db = local_db;
    }
    if let Err(e) = config::save(&app_config) {
        eprintln!("ERROR: Unable to save the application config: {e}");
        exit(4);
    }
    println!(
        "Configuration saved to {}",
        config::configuration_file().to_string_lossy()
    );
    exit(0);
}

pub fn execute(config: ConfigCommand) {
    match config {
        ConfigCommand::List => list_and_exit(),
        ConfigCommand::Update(update) => update_and_exit(update),
        ConfigCommand::Remove => match config::remove() {
            Ok(()) => {
                println!(
                    "Configuration file {} removed",
                    config::configuration_file().to_string_lossy()
                );
            }
            Err(e) => {
                println!(
                    "ERROR:Unable to remove configuration file {} : {}",
                    config::configuration_file().to_string_lossy(),
                    e
                );
            }
        },
    }
}
