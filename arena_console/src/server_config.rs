use std::time::Duration;

use arena_chess::clock::{TimeControl, DEFAULT_MOVE_TIME_LIMIT};
use serde::Deserialize;


#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_move_time_limit", with = "humantime_serde")]
    pub move_time_limit: Duration,
    #[serde(default)]
    pub time_control: TimeControl,
}

fn default_port() -> u16 { 8888 }

fn default_move_time_limit() -> Duration { DEFAULT_MOVE_TIME_LIMIT }

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: ServerConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.port, 8888);
        assert_eq!(config.move_time_limit, Duration::from_secs(60));
        assert_eq!(config.time_control, TimeControl { initial: 600, increment: 5 });
    }

    #[test]
    fn durations_are_human_readable() {
        let config: ServerConfig = serde_yaml::from_str(
            "port: 9000\nmove_time_limit: 2min\ntime_control: { initial: 300, increment: 2 }\n",
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.move_time_limit, Duration::from_secs(120));
        assert_eq!(config.time_control.initial, 300);
    }
}
