use std::str::FromStr;

use anyhow::{anyhow, bail};

use crate::seed::SeedInput;

use super::SessionController;

/// Inbound requests from the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start(SeedInput),
    Reset,
    Close,
    Status,
    Resize(u32, u32),
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or_else(|| anyhow!("empty command"))?;

        let command = match verb.to_ascii_lowercase().as_str() {
            "start" => {
                let first_name = words.next().map(str::to_string);
                let rest: Vec<&str> = words.by_ref().collect();
                let last_name = (!rest.is_empty()).then(|| rest.join(" "));
                Command::Start(SeedInput {
                    first_name,
                    last_name,
                })
            }
            "reset" => Command::Reset,
            "close" => Command::Close,
            "status" => Command::Status,
            "resize" => {
                let mut dimension = |name: &str| -> anyhow::Result<u32> {
                    let raw = words.next().ok_or_else(|| anyhow!("resize needs {name}"))?;
                    raw.parse()
                        .map_err(|_| anyhow!("resize {name} must be a number, got `{raw}`"))
                };
                let width = dimension("width")?;
                let height = dimension("height")?;
                Command::Resize(width, height)
            }
            "quit" | "exit" => Command::Quit,
            other => {
                bail!("unknown command `{other}` (try start, reset, close, status, resize, quit)")
            }
        };

        if words.next().is_some() {
            bail!("too many arguments for `{verb}`");
        }
        Ok(command)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Message(String),
    Quit,
}

pub async fn execute(controller: &SessionController, line: &str) -> Result<Reply, String> {
    let command: Command = line.parse().map_err(|e: anyhow::Error| e.to_string())?;

    let reply = match command {
        Command::Start(input) => match controller.start(input).await {
            Some(snapshot) => format!(
                "session {} started",
                snapshot.session_id.unwrap_or_default()
            ),
            None => format!("start ignored ({})", controller.state().await.as_str()),
        },
        Command::Reset => {
            let snapshot = controller.reset().await;
            format!("reset to {}", snapshot.status)
        }
        Command::Close => {
            if controller.request_early_close().await {
                "closed early".to_string()
            } else {
                "nothing to close".to_string()
            }
        }
        Command::Status => {
            let snapshot = controller.snapshot().await;
            format!(
                "{} {} {}% integrity={}\n{}",
                snapshot.status,
                snapshot.countdown,
                snapshot.progress_pct,
                snapshot.integrity,
                snapshot.output
            )
        }
        Command::Resize(width, height) => {
            controller.resize(width, height).await;
            format!("viewport {width}x{height}")
        }
        Command::Quit => return Ok(Reply::Quit),
    };
    Ok(Reply::Message(reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        session::{NullSink, SessionEngine, SessionState},
        settings::EngineConfig,
    };
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::Arc;

    #[test]
    fn parses_start_with_optional_names() {
        assert_eq!(
            "start".parse::<Command>().unwrap(),
            Command::Start(SeedInput::default())
        );
        assert_eq!(
            "START Ann".parse::<Command>().unwrap(),
            Command::Start(SeedInput {
                first_name: Some("Ann".into()),
                last_name: None,
            })
        );
        assert_eq!(
            "start Ann van Lee".parse::<Command>().unwrap(),
            Command::Start(SeedInput::new("Ann", "van Lee"))
        );
    }

    #[test]
    fn rejects_unknown_and_extra_arguments() {
        assert!("".parse::<Command>().is_err());
        assert!("launch".parse::<Command>().is_err());
        assert!("reset now".parse::<Command>().is_err());
        assert_eq!("exit".parse::<Command>().unwrap(), Command::Quit);
        assert!("resize 640".parse::<Command>().is_err());
        assert!("resize wide 480".parse::<Command>().is_err());
        assert!("resize 640 480 60".parse::<Command>().is_err());
        assert_eq!(
            "resize 640 480".parse::<Command>().unwrap(),
            Command::Resize(640, 480)
        );
    }

    #[tokio::test]
    async fn execute_drives_the_controller() {
        let engine = SessionEngine::new(
            EngineConfig::default(),
            Arc::new(ManualClock::new()),
            Box::new(StdRng::seed_from_u64(1)),
        );
        let controller = SessionController::new(engine, Arc::new(NullSink));

        let reply = execute(&controller, "start Ann Lee").await.unwrap();
        assert!(matches!(reply, Reply::Message(ref m) if m.starts_with("session ")));
        assert_eq!(controller.state().await, SessionState::Running);

        let reply = execute(&controller, "start").await.unwrap();
        assert_eq!(reply, Reply::Message("start ignored (RUNNING)".into()));

        assert_eq!(
            execute(&controller, "close").await.unwrap(),
            Reply::Message("closed early".into())
        );
        assert_eq!(
            execute(&controller, "close").await.unwrap(),
            Reply::Message("nothing to close".into())
        );
        assert_eq!(
            execute(&controller, "reset").await.unwrap(),
            Reply::Message("reset to IDLE".into())
        );
        assert_eq!(
            execute(&controller, "resize 420 280").await.unwrap(),
            Reply::Message("viewport 420x280".into())
        );
        assert_eq!(controller.inspect(|engine| engine.surface().cols()).await, 30);
        assert_eq!(execute(&controller, "quit").await.unwrap(), Reply::Quit);
        assert!(execute(&controller, "fly").await.is_err());
        assert_eq!(controller.active_tasks(), 0);
    }
}
