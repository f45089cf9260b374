//! Command-line arguments.

use clap::Parser;

/// Terminal client for the Bazaar realtime service.
#[derive(Debug, Parser)]
#[command(name = "bazaar-client")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Connects to the Bazaar realtime service and relays messages")]
pub struct Cli {
    /// Configuration file, resolved by extension (`client` finds `client.toml`)
    #[arg(long, default_value = "client")]
    pub config: String,

    /// User to connect as
    #[arg(long)]
    pub user_id: String,

    /// Auth token; persisted for reconnects. The stored token is used when omitted
    #[arg(long)]
    pub token: Option<String>,

    /// Message to queue before connecting, as `<conversation_id>:<text>` (repeatable)
    #[arg(long = "say", value_name = "CONVERSATION:TEXT", value_parser = parse_say)]
    pub say: Vec<Outgoing>,
}

/// A message queued from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub conversation_id: String,
    pub text: String,
}

fn parse_say(raw: &str) -> Result<Outgoing, String> {
    let (conversation_id, text) =
        raw.split_once(':').ok_or_else(|| format!("expected <conversation_id>:<text>, got '{raw}'"))?;

    let conversation_id = conversation_id.trim();
    if conversation_id.is_empty() {
        return Err("conversation id must not be empty".to_owned());
    }
    if text.is_empty() {
        return Err("message text must not be empty".to_owned());
    }

    Ok(Outgoing { conversation_id: conversation_id.to_owned(), text: text.to_owned() })
}
