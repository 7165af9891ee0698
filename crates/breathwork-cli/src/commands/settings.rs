use clap::Subcommand;
use breathwork_core::storage::{ProgressStore, SettingsPatch, Theme};

use super::{parse_enum, print_json, CmdResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print current settings as JSON
    Show,
    /// Change one or more settings
    Set {
        #[arg(long)]
        voice_enabled: Option<bool>,
        /// 0.0 to 1.0
        #[arg(long)]
        voice_volume: Option<f64>,
        #[arg(long)]
        haptic_feedback: Option<bool>,
        #[arg(long)]
        reminder_enabled: Option<bool>,
        /// HH:mm
        #[arg(long)]
        reminder_time: Option<String>,
        /// dark or light
        #[arg(long, value_parser = parse_enum::<Theme>)]
        theme: Option<Theme>,
    },
}

pub fn run(action: SettingsAction) -> CmdResult {
    let store = ProgressStore::open()?;

    match action {
        SettingsAction::Show => print_json(&store.settings()?)?,
        SettingsAction::Set {
            voice_enabled,
            voice_volume,
            haptic_feedback,
            reminder_enabled,
            reminder_time,
            theme,
        } => {
            let patch = SettingsPatch {
                voice_enabled,
                voice_volume,
                haptic_feedback,
                reminder_enabled,
                reminder_time,
                theme,
            };
            if patch == SettingsPatch::default() {
                return Err("nothing to change; pass at least one option".into());
            }
            print_json(&store.update_settings(patch)?)?;
        }
    }
    Ok(())
}
