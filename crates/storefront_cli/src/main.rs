//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `storefront_core` linkage and print its version.
//! - Optionally open a catalog database and print one attribute with values.
//!
//! Usage: `storefront_cli [<db-path> <attribute-id>]`
//! Set `STOREFRONT_LOG_DIR` to an absolute path to enable file logging.

use std::process::ExitCode;
use storefront_core::db::open_db;
use storefront_core::{
    default_log_level, init_logging, AttributeService, CatalogError, RepoError,
    SqliteCatalogStore,
};

const LOG_DIR_ENV: &str = "STOREFRONT_LOG_DIR";

fn main() -> ExitCode {
    println!("storefront_core version={}", storefront_core::core_version());
    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("warning: logging disabled: {err}");
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => ExitCode::SUCCESS,
        [db_path, attribute_id] => match show_attribute(db_path, attribute_id) {
            Ok(()) => ExitCode::SUCCESS,
            Err(message) => {
                eprintln!("error: {message}");
                ExitCode::FAILURE
            }
        },
        _ => {
            eprintln!("usage: storefront_cli [<db-path> <attribute-id>]");
            ExitCode::from(2)
        }
    }
}

fn show_attribute(db_path: &str, attribute_id: &str) -> Result<(), String> {
    let attribute_id: i64 = attribute_id
        .parse()
        .map_err(|_| format!("attribute id must be an integer, got `{attribute_id}`"))?;
    let conn = open_db(db_path).map_err(|err| err.to_string())?;
    let store = SqliteCatalogStore::try_new(&conn).map_err(|err| err.to_string())?;
    let service = AttributeService::new(store);

    let attribute = service
        .get_attribute_with_values(attribute_id)
        .map_err(|err: CatalogError| {
            if let CatalogError::Repo(RepoError::Db(db_err)) = &err {
                if db_err.is_busy() {
                    return "catalog database is busy; retry later".to_string();
                }
            }
            if err.is_internal() {
                log::error!("event=cli_show module=cli status=error error={err}");
                "internal catalog error".to_string()
            } else {
                err.to_string()
            }
        })?;

    let definition = &attribute.definition;
    println!(
        "attribute id={} name={} classification={} input_kind={} required={} searchable={} visible={} sort_weight={}",
        definition.id,
        definition.name,
        definition.classification.as_str(),
        definition.input_kind.as_str(),
        definition.required,
        definition.searchable,
        definition.visible,
        definition.sort_weight
    );
    for value in &attribute.values {
        println!(
            "  value id={} sort_weight={} value={}",
            value.id, value.sort_weight, value.value
        );
    }
    Ok(())
}
