use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "profile-image-service")]
#[command(about = "Profile image upload service backed by Cloudinary")]
pub struct CliArgs {
    /// Path to TOML configuration file. Falls back to environment variables when omitted.
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    pub check_config: bool,
}
