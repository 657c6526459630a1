use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "ieltsroom", version, about = "Terminal exam room for IELTS-style mock tests")]
pub struct Cli {
    /// Assigned task to sit
    #[arg(value_name = "TASK_ID", required_unless_present = "mock")]
    pub task_id: Option<i64>,

    /// Practise a single mock as a self-check template instead of a task
    #[arg(long, value_name = "ID", conflicts_with = "task_id")]
    pub mock: Option<i64>,

    /// Practice mode: local timer, free section switching, instant results
    #[arg(long)]
    pub practice: bool,

    /// Backend base URL [env: IELTSROOM_API_URL]
    #[arg(long, value_name = "url")]
    pub api_url: Option<String>,

    /// Bearer token [env: IELTSROOM_TOKEN]
    #[arg(long, value_name = "token")]
    pub token: Option<String>,

    /// Discard the local draft and start fresh
    #[arg(long)]
    pub clear: bool,

    /// Show progress from the local draft without entering the exam room
    #[arg(long)]
    pub status: bool,

    /// Export the local draft to a file (for backup)
    #[arg(long, value_name = "path")]
    pub export: Option<PathBuf>,

    /// Directory for log files
    #[arg(long, value_name = "dir")]
    pub log_dir: Option<PathBuf>,
}
