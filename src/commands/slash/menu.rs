//! # Menu Commands
//!
//! `/start`, `/help` and `/menu`: the entry points into the button UI.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use serenity::builder::CreateApplicationCommand;

pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![
        create_command("start", "Start the assistant and open the main menu"),
        create_command("help", "Show what the assistant can do"),
        create_command("menu", "Open the main menu"),
    ]
}

fn create_command(name: &str, description: &str) -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command.name(name).description(description).dm_permission(true);
    command
}
