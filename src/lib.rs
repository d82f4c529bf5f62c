pub mod clock;
pub mod oplog;
pub mod rain;
pub mod reveal;
pub mod scan;
pub mod seed;
pub mod session;
pub mod settings;
mod utils;

use std::{env, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use log::warn;
use rand::{rngs::StdRng, SeedableRng};
use tokio::io::{AsyncBufReadExt, BufReader};

use clock::SystemClock;
use seed::SeedInput;
use session::{
    commands::{self, Reply},
    ConsoleSink, EventSink, JsonLinesSink, SessionController, SessionEngine, SessionState,
};
use settings::EngineConfig;

const CONFIG_ENV: &str = "LEAD_ASSEMBLER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "lead-assembler.json";

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("lead assembler starting up...");

    let config_path = env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = EngineConfig::load(&config_path)?;

    let sink: Arc<dyn EventSink> = if env_flag("LEAD_ASSEMBLER_JSON") {
        Arc::new(JsonLinesSink)
    } else {
        Arc::new(ConsoleSink)
    };

    let names: Vec<String> = env::args().skip(1).collect();

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?
        .block_on(serve(config, sink, names))
}

async fn serve(config: EngineConfig, sink: Arc<dyn EventSink>, names: Vec<String>) -> Result<()> {
    let engine = SessionEngine::new(
        config,
        Arc::new(SystemClock::new()),
        Box::new(StdRng::from_entropy()),
    );
    let controller = SessionController::new(engine, sink);
    controller.spawn_idle_loop();

    if !names.is_empty() {
        let mut names = names.into_iter();
        let input = SeedInput {
            first_name: names.next(),
            last_name: Some(names.collect::<Vec<_>>().join(" ")).filter(|s| !s.is_empty()),
        };
        controller.start(input).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut states = controller.subscribe();

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line.context("failed to read stdin")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => match commands::execute(&controller, &line).await {
                        Ok(Reply::Message(message)) => println!("{message}"),
                        Ok(Reply::Quit) => break,
                        Err(err) => eprintln!("{err}"),
                    },
                    None => stdin_open = false,
                }
            }
            changed = states.changed(), if !stdin_open => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted; closing session");
                controller.request_early_close().await;
                break;
            }
        }

        // With stdin gone, nothing can drive the session further once it ends.
        let in_flight = matches!(*states.borrow(), SessionState::Arming | SessionState::Running);
        if !stdin_open && !in_flight {
            break;
        }
    }

    controller.shutdown().await
}
