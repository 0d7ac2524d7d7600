// Centralized CLI strings. ASCII-friendly by default.

pub const PROMPT: &str = "| ";
pub const PREFIX_ASSISTANT: &str = "> ";
pub const PREFIX_NOTICE: &str = "[broker] ";

pub const BANNER: &str =
    "relay: Copilot-compatible chat gateway. Type a message and press Enter; /help lists commands.";

pub const HELP: &str = "\
/model <id>        select model (use `custom` together with /custom)
/custom <id>       custom model id used when model is `custom`
/wire <mode>       auto | chat | responses
/token [refresh|reset]  ask the token broker for its status
/clear             forget the conversation so far
/quit              exit
Ctrl-C while streaming stops the current answer; at the prompt it exits.";

pub const NO_BROKER: &str = "no token broker configured (set RELAY_BROKER_URL)";
pub const CANCELED: &str = "[canceled]";

pub fn info_line(msg: &str) -> String {
    format!("[info] {msg}")
}

pub fn error_line(msg: &str) -> String {
    format!("[error] {msg}")
}
