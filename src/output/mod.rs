pub mod human;
pub mod json;

use serde::Serialize;

use json::JsonEnvelope;

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for command outputs that can be rendered in both human and JSON
/// formats.
pub trait CommandOutput: Serialize {
    fn human_display(&self) -> String;
}

/// Print a command output in the requested format. JSON output is wrapped in
/// the standard envelope.
pub fn print_output<T: CommandOutput>(output: &T, format: OutputFormat) {
    match format {
        OutputFormat::Human => println!("{}", output.human_display()),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&JsonEnvelope::success(output))
                    .expect("failed to serialize output")
            );
        }
    }
}
