use clientela_core::config::{LoadOptions, StoreBackend};
use clientela_db::{connect_with_settings, migrations};

use crate::commands::{run_blocking, CommandResult};

pub fn run(options: LoadOptions) -> CommandResult {
    run_blocking("migrate", options, |config| async move {
        if config.store.backend != StoreBackend::Sqlite {
            return CommandResult::success(
                "migrate",
                format!(
                    "store backend `{}` has no schema; nothing to migrate",
                    config.store.backend.as_str()
                ),
            );
        }

        let result = async {
            let pool = connect_with_settings(
                &config.store.database_url,
                config.store.max_connections,
                config.store.timeout_secs,
            )
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
            migrations::run_pending(&pool)
                .await
                .map_err(|error| ("migration", error.to_string(), 7u8))?;
            pool.close().await;
            Ok::<(), (&'static str, String, u8)>(())
        }
        .await;

        match result {
            Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
            Err((error_class, message, exit_code)) => {
                CommandResult::failure("migrate", error_class, message, exit_code)
            }
        }
    })
}
