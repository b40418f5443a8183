mod api;
mod error;
mod models;
mod resources;
mod tools;


use log::info;
use models::config::Config;
use models::context::{Context, ContextPointer};
use rocket::config::LogLevel;
use rocket::{Build, Rocket};
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::sync::Arc;

pub fn build_rocket(context: ContextPointer) -> Rocket<Build> {
    // Logging goes through simplelog, so rocket must not install its own logger
    let figment = rocket::Config::figment()
        .merge(("address", context.config().address()))
        .merge(("port", context.config().port()))
        .merge(("log_level", LogLevel::Off));

    rocket::custom(figment)
        .manage(api::build_schema(context.clone()))
        .manage(context)
        .mount("/", api::routes())
        .register("/", api::catchers())
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    TermLogger::init(
        config.level_filter(),
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    info!("Listening on {}:{}", config.address(), config.port());
    let context: ContextPointer = Arc::new(Context::new(config)?);
    let _sweeper = context.spawn_cache_sweeper();

    build_rocket(context).launch().await?;
    Ok(())
}
