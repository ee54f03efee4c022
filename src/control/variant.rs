use itertools::Itertools;
use crate::util::error::Result;
use crate::util::hue_api::{LightController, LightGroup};
use crate::util::run_log::Logger;

/// the watchers this binary knows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// lights on at sunset
    Twilight,
    /// lights off at a fixed hour
    Night,
}

impl Variant {
    pub const ALL: [Self; 2] = [Self::Twilight, Self::Night];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Twilight => "Twilight",
            Self::Night => "Night",
        }
    }

    /// the command line token selecting this watcher
    pub fn token(self) -> String {
        self.name().to_lowercase()
    }

    /// inside the config directory
    pub const fn config_file_name(self) -> &'static str {
        match self {
            Self::Twilight => "config.json",
            Self::Night => "night_config.json",
        }
    }

    pub const fn trigger(self) -> Trigger {
        match self {
            Self::Twilight => Trigger::LightsOn,
            Self::Night => Trigger::LightsOff,
        }
    }
}

/// every known variant named in `tokens`, in declaration order, each once
pub fn select<S: AsRef<str>>(tokens: &[S]) -> Vec<Variant> {
    Variant::ALL.into_iter()
        .filter(|variant| tokens.iter().any(|token| token.as_ref() == variant.token()))
        .collect_vec()
}

/// what a watcher does once its threshold has passed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    LightsOn,
    LightsOff,
}

impl Trigger {
    pub const fn power(self) -> bool {
        matches!(self, Self::LightsOn)
    }

    pub async fn fire<L: LightController>(self, lights: &L, group: &LightGroup, log: &Logger) -> Result<()> {
        lights.set_power(group, self.power()).await?;
        log.log(if self.power() { "Lights ON" } else { "Lights OFF" });
        log.log("Exiting");
        Ok(())
    }
}
