use clap::Parser;

use campus_presence::ActivationInputs;

/// Campus: follow who is present in a meeting.
#[derive(Parser, Debug)]
#[command(name = "campus", version, about)]
pub struct Args {
    /// Meeting to join.
    #[arg(short, long)]
    pub meeting: Option<String>,

    /// Current user id.
    #[arg(short, long)]
    pub user: Option<String>,

    /// Session key issued at login.
    #[arg(long)]
    pub session_key: Option<String>,

    /// Meeting join authorization token.
    #[arg(long)]
    pub token: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Args {
    pub fn activation_inputs(&self) -> ActivationInputs {
        ActivationInputs {
            meeting_id: self.meeting.clone(),
            user_id: self.user.clone(),
            session_key: self.session_key.clone(),
            join_token: self.token.clone(),
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
